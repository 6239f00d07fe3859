//! # Controller
//!
//! Core controller modules for the QubeSec controller.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `reconciler`: Core reconciliation logic, one driver per resource kind

pub mod backoff;
pub mod reconciler;
