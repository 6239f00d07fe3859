//! # Configuration
//!
//! Runtime configuration for the controller, loaded from environment variables.

mod controller;

pub use controller::ControllerConfig;
