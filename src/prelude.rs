//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use qubesec_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types and the resource/status traits
//! - The reconciler context, entry point and error type
//! - The crypto provider trait and its default implementation
//! - The cluster store trait and both stores
//! - `ControllerConfig`

pub use crate::crd::*;

pub use crate::controller::reconciler::{
    reconcile, CredentialReconciler, ObjectKey, Outcome, Reconciler, ReconcilerError,
};

pub use crate::crypto::{CryptoError, CryptoProvider, PqProvider};

pub use crate::store::{ClusterStore, KubeStore, MemoryStore, StoreError};

pub use crate::config::ControllerConfig;
