//! # Lifecycle Scenario Tests
//!
//! Idempotence, ownership, garbage collection, storage collisions and
//! optimistic-concurrency conflicts.

mod common;

use common::{kem_key_pair, Harness};
use qubesec_controller::controller::reconciler::{Outcome, ReconcilerError};
use qubesec_controller::crd::*;
use qubesec_controller::store::ClusterStore;

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();

    let secret_before = h.secret("default", "alice-keypair").await.unwrap();
    let resource_before = h.get::<QuantumKEMKeyPair>("default", "alice").await;

    assert_eq!(h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap(), Outcome::Ready);

    let secret_after = h.secret("default", "alice-keypair").await.unwrap();
    let resource_after = h.get::<QuantumKEMKeyPair>("default", "alice").await;
    assert_eq!(secret_before, secret_after);
    // an unchanged status is not rewritten
    assert_eq!(
        resource_before.metadata.resource_version,
        resource_after.metadata.resource_version
    );
    assert_eq!(h.store().secrets("default").await.len(), 1);
}

#[tokio::test]
async fn test_output_is_owned_and_collected() {
    let h = Harness::new();
    let kp = h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();

    let secret = h.secret("default", "alice-keypair").await.unwrap();
    let owners = secret.metadata.owner_references.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "QuantumKEMKeyPair");
    assert_eq!(owners[0].name, "alice");
    assert_eq!(Some(&owners[0].uid), kp.metadata.uid.as_ref());
    assert_eq!(owners[0].controller, Some(true));

    assert!(h.store().delete::<QuantumKEMKeyPair>("default", "alice").await);
    assert!(h.store().secrets("default").await.is_empty());
    assert_eq!(
        h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap(),
        Outcome::Deleted
    );
}

#[tokio::test]
async fn test_deleted_output_is_regenerated() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();
    let first = h.status::<QuantumKEMKeyPair>("default", "alice").await;

    assert!(h.store().delete_secret("default", "alice-keypair").await);
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();

    let second = h.status::<QuantumKEMKeyPair>("default", "alice").await;
    assert!(h.secret("default", "alice-keypair").await.is_some());
    assert_ne!(first.public_key_fingerprint, second.public_key_fingerprint);
}

#[tokio::test]
async fn test_foreign_secret_is_never_overwritten() {
    let h = Harness::new();
    h.put_secret("default", "alice-keypair", "public-key", b"not ours").await;
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;

    let err = h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap_err();
    assert!(matches!(err, ReconcilerError::OwnershipCollision { .. }));
    assert!(err.is_permanent());

    let status = h.status::<QuantumKEMKeyPair>("default", "alice").await;
    assert_eq!(status.status, Phase::Failed);
    assert_eq!(
        h.secret_data("default", "alice-keypair").await["public-key"],
        b"not ours".to_vec()
    );
}

#[tokio::test]
async fn test_damaged_output_is_data_integrity() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();

    let mut secret = h.secret("default", "alice-keypair").await.unwrap();
    secret.data.as_mut().unwrap().remove("private-key");
    h.store().replace_secret(&secret).await.unwrap();

    let err = h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap_err();
    assert!(matches!(err, ReconcilerError::DataIntegrity(ref m) if m.contains("private-key")));
    assert_eq!(
        h.status::<QuantumKEMKeyPair>("default", "alice").await.status,
        Phase::Failed
    );
}

#[tokio::test]
async fn test_conflict_requeues_without_failing() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.store().inject_status_conflicts(10).await;

    let err = h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap_err();
    assert!(matches!(err, ReconcilerError::Conflict));
    // the lost write is not turned into a Failed status
    assert!(h.get::<QuantumKEMKeyPair>("default", "alice").await.status.is_none());
    let generated = h.secret("default", "alice-keypair").await.unwrap();

    h.store().inject_status_conflicts(0).await;
    assert_eq!(h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap(), Outcome::Ready);

    // the retry adopts the Secret from the first pass instead of regenerating
    assert_eq!(h.secret("default", "alice-keypair").await.unwrap().data, generated.data);
    assert_eq!(
        h.status::<QuantumKEMKeyPair>("default", "alice").await.status,
        Phase::Success
    );
}

#[tokio::test]
async fn test_explicit_secret_name_is_used() {
    let h = Harness::new();
    let mut kp = kem_key_pair("alice", "ML-KEM-1024");
    kp.spec.secret_name = Some("alice-kem-keys".to_string());
    h.apply("default", kp).await;
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();

    assert!(h.secret("default", "alice-kem-keys").await.is_some());
    assert!(h.secret("default", "alice-keypair").await.is_none());
    assert_eq!(
        h.status::<QuantumKEMKeyPair>("default", "alice").await.key_pair_reference,
        Some(ObjectReference::new("alice-kem-keys", "default"))
    );
}
