//! # QubeSec Controller
//!
//! A Kubernetes controller that manages the lifecycle of post-quantum
//! credentials declared as `qubesec.io/v1` custom resources.
//!
//! ## Overview
//!
//! 1. **Key pairs** - `QuantumKEMKeyPair` (ML-KEM) and `QuantumSignatureKeyPair` (ML-DSA)
//! 2. **Key exchange** - `QuantumEncapsulateSecret` and `QuantumDecapsulateSecret`
//! 3. **Key derivation** - `QuantumDerivedKey` (HKDF-SHA256)
//! 4. **Signatures** - `QuantumSignMessage` and `QuantumVerifySignature`
//! 5. **Randomness** - `QuantumRandomNumber`
//!
//! Every output lands in a Secret owned by the requesting resource and is
//! never regenerated while that Secret exists.

use anyhow::Result;
use qubesec_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init.reconciler, init.server_state).await
}
