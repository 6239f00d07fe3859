//! # Status State Machine
//!
//! Read-modify-write of a resource's status, guarded by its resource version.
//!
//! Every write starts from a fresh read so the concurrency token is current.
//! A status that would not change (ignoring `lastUpdateTime`) is not written.
//! A version conflict re-reads and retries a bounded number of times; after
//! that the caller gets [`ReconcilerError::Conflict`] and the resource is
//! requeued instead of overwriting the newer state.

use super::types::{ObjectKey, Reconciler, ReconcilerError};
use crate::crd::{CredentialResource, CredentialStatus};
use crate::observability::metrics;
use crate::store::ClusterStore;
use kube::Resource;
use tracing::{debug, warn};

/// What a status update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
    Written,
    /// The stored status already matched
    Unchanged,
    /// The resource was deleted in the meantime
    Gone,
}

/// Equality that ignores the write timestamp
fn same_status<T: CredentialStatus>(a: &T, b: &T) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set_last_update_time(None);
    b.set_last_update_time(None);
    a == b
}

impl<S: ClusterStore> Reconciler<S> {
    /// Apply `mutate` to the latest status of `resource` and persist it
    ///
    /// `resource` is the object the reconciliation started from; its
    /// `metadata.generation` is recorded as `observedGeneration`. If the spec has
    /// moved on since, the write is abandoned as a conflict so the newer
    /// generation gets its own pass.
    pub async fn update_status<K, F>(
        &self,
        resource: &K,
        mut mutate: F,
    ) -> Result<StatusWrite, ReconcilerError>
    where
        K: CredentialResource,
        F: FnMut(&mut K::Status) + Send,
    {
        let key = ObjectKey::from_resource(resource);
        let generation = resource.meta().generation;
        let attempts = self.config.status_write_attempts.max(1);

        for attempt in 1..=attempts {
            let Some(mut current) = self.store.get::<K>(&key.namespace, &key.name).await? else {
                debug!(resource = %key, "Resource deleted before status write");
                return Ok(StatusWrite::Gone);
            };
            if current.meta().generation != generation {
                debug!(
                    resource = %key,
                    expected = ?generation,
                    found = ?current.meta().generation,
                    "Spec changed during reconciliation, abandoning status write"
                );
                return Err(ReconcilerError::Conflict);
            }

            let previous = current.status().cloned().unwrap_or_default();
            let mut next = previous.clone();
            mutate(&mut next);
            next.set_observed_generation(generation);

            if current.status().is_some() && same_status(&previous, &next) {
                return Ok(StatusWrite::Unchanged);
            }

            next.set_last_update_time(Some(chrono::Utc::now().to_rfc3339()));
            *current.status_mut() = Some(next);

            match self.store.replace_status(&current).await {
                Ok(_) => return Ok(StatusWrite::Written),
                Err(e) if e.is_conflict() => {
                    metrics::increment_status_conflicts();
                    debug!(resource = %key, attempt, "Status write conflicted, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReconcilerError::Conflict)
    }

    /// Best-effort `Failed` status for an error; never fails the caller
    pub async fn record_failure<K: CredentialResource>(&self, resource: &K, error: &ReconcilerError) {
        let message = error.to_string();
        if let Err(write_error) = self
            .update_status(resource, |status: &mut K::Status| {
                status.mark_failed(message.clone())
            })
            .await
        {
            warn!(
                resource = %ObjectKey::from_resource(resource),
                error = %write_error,
                "Failed to record failure in status"
            );
        }
    }
}
