//! # Types
//!
//! Core types for the reconciler: the shared context, the error taxonomy and
//! the outcome of one reconciliation pass.

use crate::config::ControllerConfig;
use crate::constants::SEED_FETCH_TIMEOUT_SECS;
use crate::controller::backoff::BackoffTracker;
use crate::crypto::{CryptoError, CryptoProvider, PqProvider};
use crate::store::{ClusterStore, StoreError};
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("reference not found: {} {namespace}/{name}", .kinds.join(" or "))]
    ReferenceNotFound {
        kinds: Vec<String>,
        namespace: String,
        name: String,
    },

    #[error("data integrity: {0}")]
    DataIntegrity(String),

    #[error("{operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("invalid spec: {0}")]
    Precondition(String),

    #[error("Secret {secret} is owned by {owner}")]
    OwnershipCollision { secret: String, owner: String },

    #[error("status write conflicted with a concurrent update")]
    Conflict,

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ReconcilerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { .. } => ReconcilerError::Conflict,
            other => ReconcilerError::Store(other),
        }
    }
}

impl ReconcilerError {
    /// Map a provider failure, routing envelope mismatches to `DataIntegrity`
    pub fn provider(operation: &'static str) -> impl FnOnce(CryptoError) -> Self {
        move |source| match source {
            CryptoError::Envelope(message) => ReconcilerError::DataIntegrity(message),
            source => ReconcilerError::Provider { operation, source },
        }
    }

    pub fn reference_not_found(kind: &str, namespace: &str, name: &str) -> Self {
        ReconcilerError::ReferenceNotFound {
            kinds: vec![kind.to_string()],
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Errors that will recur until the user changes something
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ReconcilerError::Precondition(_)
                | ReconcilerError::DataIntegrity(_)
                | ReconcilerError::OwnershipCollision { .. }
        )
    }

    /// Whether the error is rendered into a `Failed` status
    pub fn is_reported(&self) -> bool {
        !matches!(self, ReconcilerError::Conflict)
    }

    /// Short label for logs and metrics
    pub fn class(&self) -> &'static str {
        match self {
            ReconcilerError::NotFound { .. } => "not-found",
            ReconcilerError::ReferenceNotFound { .. } => "reference-not-found",
            ReconcilerError::DataIntegrity(_) => "data-integrity",
            ReconcilerError::Provider { .. } => "provider",
            ReconcilerError::Precondition(_) => "precondition",
            ReconcilerError::OwnershipCollision { .. } => "ownership-collision",
            ReconcilerError::Conflict => "conflict",
            ReconcilerError::Store(_) => "store",
            ReconcilerError::Internal(_) => "internal",
        }
    }
}

/// Result of one successful reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output exists and status reflects it
    Ready,
    /// Waiting on a reference that is not ready yet
    Pending(String),
    /// The resource no longer exists
    Deleted,
}

impl Outcome {
    pub fn into_action(self, config: &ControllerConfig) -> Action {
        match self {
            Outcome::Ready => Action::requeue(config.resync_interval()),
            Outcome::Pending(_) => Action::requeue(config.pending_requeue()),
            Outcome::Deleted => Action::await_change(),
        }
    }
}

/// Identity of one resource instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        Self {
            namespace: resource.namespace().unwrap_or_else(|| "default".to_string()),
            name: resource.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Shared reconciliation context
///
/// One instance is shared by every per-kind controller. It holds no
/// per-resource state apart from error backoff.
pub struct Reconciler<S: ClusterStore> {
    pub store: S,
    pub provider: Arc<dyn CryptoProvider>,
    pub config: ControllerConfig,
    pub backoff: BackoffTracker,
    /// Client for QuantumRandomNumber seed downloads
    pub http: reqwest::Client,
}

impl<S: ClusterStore> fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ClusterStore> Reconciler<S> {
    pub fn new(store: S, provider: Arc<dyn CryptoProvider>, config: ControllerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEED_FETCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            store,
            provider,
            backoff: BackoffTracker::new(config.backoff_min_minutes, config.backoff_max_minutes),
            config,
            http,
        }
    }

    /// Context using the FIPS 203 / FIPS 204 provider
    pub fn with_default_provider(store: S, config: ControllerConfig) -> Self {
        Self::new(store, Arc::new(PqProvider::new()), config)
    }
}
