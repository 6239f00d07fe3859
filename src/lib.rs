//! QubeSec Controller Library
//!
//! Reconciles post-quantum credential resources (`qubesec.io/v1`) into owned
//! Kubernetes Secrets: ML-KEM and ML-DSA key pairs, KEM shared secrets, HKDF
//! derived keys, signatures, verification verdicts and random numbers.
//!
//! ## Quick Start
//!
//! ```rust
//! use qubesec_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod crypto;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
pub mod store;
