//! # Reconciler
//!
//! Core reconciliation logic for the QubeSec credential resources.
//!
//! Every kind runs the same pass:
//!
//! 1. Fetch the resource (absent means deleted, nothing to do)
//! 2. Validate the spec
//! 3. Ask the idempotency gate whether output storage already exists
//! 4. Resolve references to producers, waiting while they are not ready
//! 5. Call the crypto provider and materialize an owned Secret
//! 6. Record the outcome in status
//!
//! Kind-specific steps live in one driver module per kind; this module wires
//! them to metrics, tracing and failure reporting.

mod certificate;
mod decapsulate;
mod derived_key;
mod encapsulate;
pub mod gate;
mod keypair;
pub mod materializer;
mod random_number;
pub mod resolver;
mod sign;
pub mod status;
pub mod types;
mod verify;

pub use status::StatusWrite;
pub use types::{ObjectKey, Outcome, Reconciler, ReconcilerError};

use crate::crd::{CredentialResource, CredentialStatus};
use crate::crypto::{envelope, KeyKind};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use zeroize::Zeroizing;

/// Kind-specific part of a reconciliation pass
///
/// Implementations receive a freshly fetched resource and return what the pass
/// achieved. `Pending` outcomes and errors are written to status by
/// [`reconcile`]; implementations only write the success status themselves.
#[async_trait]
pub trait CredentialReconciler: CredentialResource {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError>;
}

/// Reconcile one resource of kind `K`
pub async fn reconcile<K, S>(ctx: &Reconciler<S>, key: &ObjectKey) -> Result<Outcome, ReconcilerError>
where
    K: CredentialReconciler,
    S: ClusterStore,
{
    let kind = K::kind(&());
    let span = info_span!(
        "reconcile",
        resource.kind = %kind,
        resource.namespace = %key.namespace,
        resource.name = %key.name
    );

    async {
        metrics::increment_reconciliations(&kind);
        let started = Instant::now();
        let result = reconcile_once::<K, S>(ctx, key).await;
        metrics::observe_reconciliation_duration(&kind, started.elapsed().as_secs_f64());
        result
    }
    .instrument(span)
    .await
}

async fn reconcile_once<K, S>(ctx: &Reconciler<S>, key: &ObjectKey) -> Result<Outcome, ReconcilerError>
where
    K: CredentialReconciler,
    S: ClusterStore,
{
    let kind = K::kind(&());
    let Some(resource) = ctx.store.get::<K>(&key.namespace, &key.name).await? else {
        debug!("Resource not found, nothing to reconcile");
        return Ok(Outcome::Deleted);
    };

    match K::reconcile_resource(ctx, &resource).await {
        Ok(Outcome::Pending(reason)) => {
            info!(reason = %reason, "Waiting on a referenced resource");
            metrics::increment_pending_references(&kind);
            ctx.update_status(&resource, |status: &mut K::Status| {
                status.mark_pending(reason.clone());
            })
            .await?;
            Ok(Outcome::Pending(reason))
        }
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            metrics::increment_reconciliation_errors(&kind);
            if e.is_reported() {
                if e.is_permanent() {
                    warn!(error = %e, class = e.class(), "Reconciliation failed, waiting for a spec change");
                } else {
                    error!(error = %e, class = e.class(), "Reconciliation failed");
                }
                ctx.record_failure(&resource, &e).await;
            } else {
                debug!(error = %e, "Reconciliation lost a race, requeueing");
            }
            Err(e)
        }
    }
}

/// Reject an empty spec field
pub(crate) fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, ReconcilerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReconcilerError::Precondition(format!("{field} must not be empty")));
    }
    Ok(value)
}

/// Open a stored key envelope, insisting on the algorithm and key half
pub(crate) fn open_key(
    blob: &[u8],
    algorithm: &str,
    kind: KeyKind,
) -> Result<Zeroizing<Vec<u8>>, ReconcilerError> {
    envelope::open(blob)
        .and_then(|envelope| envelope.expect(algorithm, kind))
        .map_err(ReconcilerError::provider("open key"))
}

/// Decode an optional hex spec field; absent means empty
pub(crate) fn decode_hex_field(value: Option<&str>, field: &str) -> Result<Vec<u8>, ReconcilerError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Vec::new());
    };
    hex::decode(value)
        .map_err(|e| ReconcilerError::Precondition(format!("{field} is not valid hex: {e}")))
}

/// Unwrap a [`resolver::Resolved`], returning `Outcome::Pending` from the caller
macro_rules! ready_or_pending {
    ($resolved:expr) => {
        match $resolved {
            $crate::controller::reconciler::resolver::Resolved::Ready(value) => value,
            $crate::controller::reconciler::resolver::Resolved::Pending(reason) => {
                return Ok($crate::controller::reconciler::Outcome::Pending(reason));
            }
        }
    };
}
pub(crate) use ready_or_pending;
