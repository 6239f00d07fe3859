//! # Initialization
//!
//! Controller bootstrap: rustls setup, tracing, metrics, the probe server, the
//! Kubernetes client and the shared reconciler context.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::crd::{
    CredentialResource, QuantumCertificate, QuantumDecapsulateSecret, QuantumDerivedKey, QuantumEncapsulateSecret,
    QuantumKEMKeyPair, QuantumRandomNumber, QuantumSignMessage, QuantumSignatureKeyPair,
    QuantumVerifySignature,
};
use crate::observability;
use crate::server::{start_server, ServerState};
use crate::store::KubeStore;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub reconciler: Arc<Reconciler<KubeStore>>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything opens a TLS connection
    let rustls_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qubesec_controller=info".into()),
        )
        .init();

    if !rustls_installed {
        warn!("A rustls crypto provider was already installed, keeping it");
    }

    info!("Starting QubeSec controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let config = ControllerConfig::from_env();
    info!(?config, "Loaded configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_port = config.metrics_port;
    let server_state_clone = server_state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    check_crds_installed(&client, config.watch_namespace.as_deref()).await;

    let reconciler = Arc::new(Reconciler::with_default_provider(KubeStore::new(client), config));

    info!("Controller initialized, starting watch loop...");
    Ok(InitializationResult {
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to bind its port
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let startup_timeout = config.server_startup_timeout();
    let poll_interval = config.server_poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.listening() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

async fn check_crd<K: CredentialResource>(client: &Client, namespace: Option<&str>) {
    let api: Api<K> = match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };
    match api.list(&ListParams::default().limit(1)).await {
        Ok(list) => {
            info!(resource.kind = %K::kind(&()), existing = list.items.len(), "CRD is queryable");
        }
        Err(e) => {
            error!(resource.kind = %K::kind(&()), error = %e, "CRD is not queryable. Is it installed?");
            warn!("Install the CRDs with: crdgen | kubectl apply -f -");
        }
    }
}

/// Warn early about missing CRDs; the controllers keep retrying regardless
async fn check_crds_installed(client: &Client, namespace: Option<&str>) {
    check_crd::<QuantumKEMKeyPair>(client, namespace).await;
    check_crd::<QuantumSignatureKeyPair>(client, namespace).await;
    check_crd::<QuantumEncapsulateSecret>(client, namespace).await;
    check_crd::<QuantumDecapsulateSecret>(client, namespace).await;
    check_crd::<QuantumDerivedKey>(client, namespace).await;
    check_crd::<QuantumSignMessage>(client, namespace).await;
    check_crd::<QuantumVerifySignature>(client, namespace).await;
    check_crd::<QuantumRandomNumber>(client, namespace).await;
    check_crd::<QuantumCertificate>(client, namespace).await;
}
