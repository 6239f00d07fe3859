//! # Error Policy
//!
//! Maps reconciliation errors to requeue actions, and classifies errors
//! surfaced by the controller streams themselves.

use crate::controller::reconciler::{ObjectKey, Reconciler, ReconcilerError};
use crate::crd::CredentialResource;
use crate::observability::metrics;
use crate::store::ClusterStore;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Key under which per-resource backoff is tracked
pub fn backoff_key<K: CredentialResource>(key: &ObjectKey) -> String {
    format!("{}/{key}", K::kind(&()))
}

/// Drop the backoff history of a resource that no longer exists
pub fn forget_backoff<K: CredentialResource, S: ClusterStore>(
    ctx: &Reconciler<S>,
    namespace: Option<&str>,
    name: &str,
) {
    let key = ObjectKey::new(namespace.unwrap_or("default"), name);
    debug!(resource = %key, "Forgetting backoff of deleted resource");
    ctx.backoff.reset(&backoff_key::<K>(&key));
}

/// Choose the requeue for a failed reconciliation
///
/// - conflicts retry after the short conflict interval;
/// - permanent errors wait for the user to change the resource, and start
///   from the first backoff step once they do;
/// - everything else backs off per resource along the Fibonacci sequence.
pub fn handle_reconciliation_error<K, S>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<S>>,
) -> Action
where
    K: CredentialResource,
    S: ClusterStore,
{
    let key = ObjectKey::from_resource(obj.as_ref());

    if matches!(error, ReconcilerError::Conflict) {
        debug!(resource = %key, "Requeueing after status conflict");
        metrics::increment_requeues_total("conflict");
        return Action::requeue(ctx.config.conflict_requeue());
    }

    if error.is_permanent() {
        info!(resource = %key, class = error.class(), "Waiting for a spec change before retrying");
        ctx.backoff.reset(&backoff_key::<K>(&key));
        metrics::increment_requeues_total("await-change");
        return Action::await_change();
    }

    let (delay, attempt) = ctx.backoff.next(&backoff_key::<K>(&key));
    info!(
        resource = %key,
        attempt,
        delay_secs = delay.as_secs(),
        "Retrying with Fibonacci backoff"
    );
    metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Broad category of a controller stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

/// Classify a controller stream error by its rendered message
pub fn classify_watch_error(error: &str) -> WatchErrorKind {
    // 404 first: a plain-text 404 body surfaces as a WatchFailed decode error
    let not_found =
        error.contains("ObjectNotFound") || error.contains("404") || error.contains("not found");
    if (error.contains("401") || error.contains("Unauthorized")) && !not_found {
        WatchErrorKind::Unauthorized
    } else if error.contains("410") || error.contains("too old resource version") || error.contains("Expired") {
        WatchErrorKind::Expired
    } else if error.contains("429") || error.contains("TooManyRequests") {
        WatchErrorKind::Throttled
    } else if not_found {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Log a controller stream error, pausing before the stream continues when useful
pub async fn handle_watch_stream_error(kind: &str, error: &str, restart_delay: Duration) {
    match classify_watch_error(error) {
        WatchErrorKind::Unauthorized => {
            error!(
                resource.kind = kind,
                error,
                "Watch unauthorized; check the controller's ClusterRole and ServiceAccount token"
            );
            tokio::time::sleep(restart_delay).await;
        }
        WatchErrorKind::Expired => {
            warn!(resource.kind = kind, "Watch resource version expired, relisting");
        }
        WatchErrorKind::Throttled => {
            warn!(resource.kind = kind, "API server throttling watches, backing off");
            tokio::time::sleep(restart_delay).await;
        }
        WatchErrorKind::NotFound => {
            warn!(resource.kind = kind, error, "Object not found; is the CRD installed?");
        }
        WatchErrorKind::Other => {
            debug!(resource.kind = kind, error, "Controller stream error");
        }
    }
}
