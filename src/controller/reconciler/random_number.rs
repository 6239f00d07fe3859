//! Random byte generation for `QuantumRandomNumber`.

use super::gate::{self, StoredOutput};
use super::materializer::{self, SecretPayload};
use super::{non_empty, CredentialReconciler, ObjectKey, Outcome, Reconciler, ReconcilerError};
use crate::constants::{
    MAX_RANDOM_BYTES, MAX_RANDOM_NUMBER_NAME_LEN, MIN_SEED_LEN, RANDOM_NUMBER_FIELD,
    RANDOM_NUMBER_SUFFIX,
};
use crate::crd::{ObjectReference, Phase, QuantumRandomNumber, QuantumRandomNumberSpec, RandomNumberStatus};
use crate::crypto::entropy::{format_entropy, shannon_entropy};
use crate::crypto::random::{self, RandomAlgorithm};
use crate::observability::metrics;
use crate::store::ClusterStore;
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

/// Validated generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Request {
    algorithm: RandomAlgorithm,
    len: usize,
}

fn validate(name: &str, spec: &QuantumRandomNumberSpec) -> Result<Request, ReconcilerError> {
    if name.len() > MAX_RANDOM_NUMBER_NAME_LEN {
        return Err(ReconcilerError::Precondition(format!(
            "name must be at most {MAX_RANDOM_NUMBER_NAME_LEN} characters, got {}",
            name.len()
        )));
    }

    let len = usize::try_from(spec.bytes).unwrap_or(usize::MAX);
    if !(1..=MAX_RANDOM_BYTES).contains(&len) {
        return Err(ReconcilerError::Precondition(format!(
            "spec.bytes must be between 1 and {MAX_RANDOM_BYTES}, got {}",
            spec.bytes
        )));
    }

    let algorithm = non_empty(&spec.algorithm, "spec.algorithm")?
        .parse::<RandomAlgorithm>()
        .map_err(|e| ReconcilerError::Precondition(format!("spec.algorithm: {e}")))?;

    Ok(Request { algorithm, len })
}

/// The seed string: `spec.seed`, else the hex document at `spec.seedURI` re-encoded as base64
async fn resolve_seed<S: ClusterStore>(
    ctx: &Reconciler<S>,
    spec: &QuantumRandomNumberSpec,
) -> Result<Option<String>, ReconcilerError> {
    if let Some(seed) = spec.seed.as_deref().filter(|s| !s.is_empty()) {
        return Ok(Some(seed.to_string()));
    }
    let Some(uri) = spec.seed_uri.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    debug!(uri, "Fetching seed");
    let body = ctx
        .http
        .get(uri)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("failed to fetch seed from {uri}"))?
        .text()
        .await
        .with_context(|| format!("failed to read seed from {uri}"))?;

    let raw = hex::decode(body.trim()).map_err(|e| {
        ReconcilerError::Precondition(format!("seed served by {uri} is not valid hex: {e}"))
    })?;
    Ok(Some(BASE64.encode(raw)))
}

#[async_trait]
impl CredentialReconciler for QuantumRandomNumber {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let key = ObjectKey::from_resource(resource);
        let spec = &resource.spec;
        let request = validate(&key.name, spec)?;
        let name = gate::output_name(spec.secret_name.as_deref(), &key.name, RANDOM_NUMBER_SUFFIX);

        let stored = match gate::check(&ctx.store, resource, &key.namespace, &name).await? {
            Some(stored) => {
                stored.require(&[RANDOM_NUMBER_FIELD])?;
                debug!(secret = %name, "Random number already materialized");
                stored
            }
            None => {
                let seed = resolve_seed(ctx, spec).await?;
                if let Some(seed) = seed.as_deref() {
                    if seed.len() < MIN_SEED_LEN {
                        return Err(ReconcilerError::Precondition(format!(
                            "seed must be at least {MIN_SEED_LEN} bytes, got {}",
                            seed.len()
                        )));
                    }
                } else if request.algorithm == RandomAlgorithm::NistKat {
                    return Err(ReconcilerError::Precondition(
                        "NIST-KAT requires spec.seed or spec.seedURI".to_string(),
                    ));
                }

                debug!(algorithm = request.algorithm.name(), bytes = request.len, "Generating random bytes");
                metrics::increment_crypto_operations("random_bytes");
                let output = random::generate(
                    ctx.provider.as_ref(),
                    request.algorithm,
                    seed.as_deref().map(str::as_bytes),
                    request.len,
                )
                .map_err(ReconcilerError::provider("generate random bytes"))?;

                let payload = SecretPayload::from([(RANDOM_NUMBER_FIELD.to_string(), output)]);
                StoredOutput::new(
                    materializer::create(&ctx.store, resource, &key.namespace, &name, payload)
                        .await?,
                )
            }
        };

        let output = stored.field(RANDOM_NUMBER_FIELD)?;
        let entropy = format_entropy(shannon_entropy(output));
        let bytes = u32::try_from(output.len()).ok();
        let reference = ObjectReference::new(&name, &key.namespace);
        ctx.update_status(resource, |status: &mut RandomNumberStatus| {
            status.status = Phase::Success;
            status.random_number_reference = Some(reference.clone());
            status.bytes = bytes;
            status.algorithm = Some(request.algorithm.name().to_string());
            status.entropy = Some(entropy.clone());
            status.error = None;
        })
        .await?;

        Ok(Outcome::Ready)
    }
}
