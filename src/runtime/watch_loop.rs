//! # Watch Loop
//!
//! One kube-runtime controller per resource kind. Each watches its resources
//! plus the output Secrets they own, so deleting an output re-triggers the
//! owner. All controllers share one [`Reconciler`] context.

use crate::constants::{FIELD_MANAGER, MANAGED_BY_LABEL};
use crate::controller::reconciler::{
    reconcile, CredentialReconciler, ObjectKey, Reconciler, ReconcilerError,
};
use crate::crd::{
    QuantumCertificate, QuantumDecapsulateSecret, QuantumDerivedKey, QuantumEncapsulateSecret, QuantumKEMKeyPair,
    QuantumRandomNumber, QuantumSignMessage, QuantumSignatureKeyPair, QuantumVerifySignature,
};
use crate::runtime::error_policy::{
    backoff_key, forget_backoff, handle_reconciliation_error, handle_watch_stream_error,
};
use crate::server::ServerState;
use crate::store::KubeStore;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::controller::{self as runtime_controller, Action};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Context = Arc<Reconciler<KubeStore>>;

/// Run every controller until shutdown
///
/// Readiness is flipped on once the controllers are started and off again
/// when a shutdown signal arrives, so the pod leaves its Service before
/// in-flight reconciliations finish.
pub async fn run_watch_loop(ctx: Context, server_state: Arc<ServerState>) -> anyhow::Result<()> {
    let shutdown_state = server_state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown_state.set_ready(false);
        }
    });

    server_state.set_ready(true);
    info!(
        namespace = ctx.config.watch_namespace.as_deref().unwrap_or("<all>"),
        concurrency = ctx.config.reconcile_concurrency,
        "Starting controllers"
    );

    tokio::join!(
        run_controller::<QuantumKEMKeyPair>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumSignatureKeyPair>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumEncapsulateSecret>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumDecapsulateSecret>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumDerivedKey>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumSignMessage>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumVerifySignature>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumRandomNumber>(ctx.clone(), server_state.clone()),
        run_controller::<QuantumCertificate>(ctx.clone(), server_state.clone()),
    );

    info!("Controllers stopped gracefully");
    Ok(())
}

fn apis<K: CredentialReconciler>(ctx: &Context) -> (Api<K>, Api<Secret>) {
    let client = ctx.store.client().clone();
    match ctx.config.watch_namespace.as_deref() {
        Some(namespace) => (
            Api::namespaced(client.clone(), namespace),
            Api::namespaced(client, namespace),
        ),
        None => (Api::all(client.clone()), Api::all(client)),
    }
}

/// Drive the controller for kind `K`, restarting its stream if it ends early
async fn run_controller<K: CredentialReconciler>(ctx: Context, server_state: Arc<ServerState>) {
    let kind = K::kind(&()).to_string();
    let (resources, secrets) = apis::<K>(&ctx);
    let owned_secrets =
        watcher::Config::default().labels(&format!("{MANAGED_BY_LABEL}={FIELD_MANAGER}"));
    let restart_delay = ctx.config.watch_restart_delay_after_end();

    loop {
        info!(resource.kind = %kind, "Starting controller");
        Controller::new(resources.clone(), watcher::Config::default().any_semantic())
            .owns(secrets.clone(), owned_secrets.clone())
            .with_config(
                runtime_controller::Config::default().concurrency(ctx.config.reconcile_concurrency),
            )
            .shutdown_on_signal()
            .run(
                reconcile_object::<K>,
                handle_reconciliation_error::<K, KubeStore>,
                ctx.clone(),
            )
            .for_each(|result| {
                let kind = kind.clone();
                let ctx = ctx.clone();
                async move {
                    match result {
                        Ok((object, action)) => {
                            debug!(resource.kind = %kind, resource = %object.name, ?action, "Reconciled");
                        }
                        // a queued retry fired after the object was deleted
                        Err(runtime_controller::Error::ObjectNotFound(object)) => {
                            forget_backoff::<K, KubeStore>(&ctx, object.namespace.as_deref(), &object.name);
                        }
                        Err(e) => {
                            handle_watch_stream_error(&kind, &format!("{e:?}"), restart_delay).await;
                        }
                    }
                }
            })
            .await;

        if !server_state.ready() {
            break;
        }
        warn!(
            resource.kind = %kind,
            delay_secs = restart_delay.as_secs(),
            "Controller stream ended, restarting"
        );
        tokio::time::sleep(restart_delay).await;
    }
}

async fn reconcile_object<K: CredentialReconciler>(
    object: Arc<K>,
    ctx: Context,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::from_resource(object.as_ref());
    let outcome = reconcile::<K, KubeStore>(&ctx, &key).await?;
    ctx.backoff.reset(&backoff_key::<K>(&key));
    Ok(outcome.into_action(&ctx.config))
}
