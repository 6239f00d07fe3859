//! # Key Exchange Scenario Tests
//!
//! End-to-end reconciliation of key pairs, encapsulation, decapsulation and
//! key derivation against the in-memory store.

mod common;

use common::{decapsulate, derived_key, encapsulate, kem_key_pair, local, Harness};
use qubesec_controller::controller::reconciler::{Outcome, ReconcilerError};
use qubesec_controller::crd::*;
use qubesec_controller::crypto::fingerprint;

/// Key pair, encapsulation and decapsulation for `alice` in `namespace`
async fn exchange(h: &Harness, namespace: &str) {
    h.apply(namespace, kem_key_pair("alice", "ML-KEM-768")).await;
    h.apply(namespace, encapsulate("alice-enc", local("alice"), "ML-KEM-768"))
        .await;
    h.apply(
        namespace,
        decapsulate("alice-dec", local("alice"), local("alice-enc"), "ML-KEM-768"),
    )
    .await;

    assert_eq!(h.reconcile::<QuantumKEMKeyPair>(namespace, "alice").await.unwrap(), Outcome::Ready);
    assert_eq!(
        h.reconcile::<QuantumEncapsulateSecret>(namespace, "alice-enc").await.unwrap(),
        Outcome::Ready
    );
    assert_eq!(
        h.reconcile::<QuantumDecapsulateSecret>(namespace, "alice-dec").await.unwrap(),
        Outcome::Ready
    );
}

#[tokio::test]
async fn test_kem_round_trip_agrees_on_shared_secret() {
    let h = Harness::new();
    exchange(&h, "default").await;

    let encapsulated = h.secret_data("default", "alice-enc-shared-secret").await;
    let decapsulated = h.secret_data("default", "alice-dec-shared-secret").await;
    assert_eq!(encapsulated["shared-secret"].len(), 32);
    assert_eq!(encapsulated["shared-secret"], decapsulated["shared-secret"]);
    assert!(!decapsulated.contains_key("ciphertext"));

    let enc_status = h.status::<QuantumEncapsulateSecret>("default", "alice-enc").await;
    let dec_status = h.status::<QuantumDecapsulateSecret>("default", "alice-dec").await;
    assert_eq!(enc_status.status, Phase::Success);
    assert_eq!(dec_status.status, Phase::Success);
    assert_eq!(enc_status.ciphertext, Some(hex::encode(&encapsulated["ciphertext"])));
    assert_eq!(enc_status.fingerprint, dec_status.fingerprint);
    assert_eq!(
        enc_status.fingerprint,
        Some(fingerprint::short(&encapsulated["shared-secret"]))
    );
    assert_eq!(
        dec_status.shared_secret_reference,
        Some(ObjectReference::new("alice-dec-shared-secret", "default"))
    );
}

#[tokio::test]
async fn test_inline_ciphertext_decapsulates() {
    let h = Harness::new();
    exchange(&h, "default").await;
    let ciphertext = h
        .status::<QuantumEncapsulateSecret>("default", "alice-enc")
        .await
        .ciphertext
        .unwrap();

    let mut inline = decapsulate("inline-dec", local("alice"), local("unused"), "Kyber768");
    inline.spec.ciphertext_ref = None;
    inline.spec.ciphertext = Some(ciphertext);
    h.apply("default", inline).await;

    assert_eq!(
        h.reconcile::<QuantumDecapsulateSecret>("default", "inline-dec").await.unwrap(),
        Outcome::Ready
    );
    assert_eq!(
        h.secret_data("default", "inline-dec-shared-secret").await["shared-secret"],
        h.secret_data("default", "alice-enc-shared-secret").await["shared-secret"]
    );
}

#[tokio::test]
async fn test_consumer_waits_for_producer() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.apply("default", encapsulate("alice-enc", local("alice"), "ML-KEM-768"))
        .await;

    // encapsulation reconciled before the key pair has produced anything
    let outcome = h
        .reconcile::<QuantumEncapsulateSecret>("default", "alice-enc")
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Pending(_)));
    assert_eq!(
        h.status::<QuantumEncapsulateSecret>("default", "alice-enc").await.status,
        Phase::Pending
    );
    assert!(h.secret("default", "alice-enc-shared-secret").await.is_none());

    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();
    assert_eq!(
        h.reconcile::<QuantumEncapsulateSecret>("default", "alice-enc").await.unwrap(),
        Outcome::Ready
    );
    let status = h.status::<QuantumEncapsulateSecret>("default", "alice-enc").await;
    assert_eq!(status.status, Phase::Success);
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn test_missing_reference_fails() {
    let h = Harness::new();
    h.apply("default", encapsulate("orphan", local("ghost"), "ML-KEM-768"))
        .await;

    let err = h
        .reconcile::<QuantumEncapsulateSecret>("default", "orphan")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcilerError::ReferenceNotFound { .. }));

    let status = h.status::<QuantumEncapsulateSecret>("default", "orphan").await;
    assert_eq!(status.status, Phase::Failed);
    assert!(status.error.unwrap().contains("reference not found"));
    assert!(h.store().secrets("default").await.is_empty());
}

#[tokio::test]
async fn test_reference_namespace_defaults_to_requester() {
    let h = Harness::new();
    h.apply("team-a", kem_key_pair("alice", "ML-KEM-512")).await;
    h.reconcile::<QuantumKEMKeyPair>("team-a", "alice").await.unwrap();

    // no namespace on the reference: looked up in team-b, where nothing exists
    h.apply("team-b", encapsulate("implicit", local("alice"), "ML-KEM-512"))
        .await;
    let err = h
        .reconcile::<QuantumEncapsulateSecret>("team-b", "implicit")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("team-b/alice"));

    h.apply(
        "team-b",
        encapsulate("explicit", ObjectReference::new("alice", "team-a"), "ML-KEM-512"),
    )
    .await;
    assert_eq!(
        h.reconcile::<QuantumEncapsulateSecret>("team-b", "explicit").await.unwrap(),
        Outcome::Ready
    );
    // output lands next to the requester
    assert!(h.secret("team-b", "explicit-shared-secret").await.is_some());
    assert!(h.secret("team-a", "explicit-shared-secret").await.is_none());
}

#[tokio::test]
async fn test_algorithm_mismatch_is_data_integrity() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-512")).await;
    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();
    h.apply("default", encapsulate("wrong", local("alice"), "ML-KEM-1024"))
        .await;

    let err = h
        .reconcile::<QuantumEncapsulateSecret>("default", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcilerError::DataIntegrity(ref m) if m.contains("algorithm mismatch")));
    assert!(h.secret("default", "wrong-shared-secret").await.is_none());
}

#[tokio::test]
async fn test_derived_keys_agree_on_both_sides() {
    let h = Harness::new();
    exchange(&h, "default").await;

    h.apply("default", derived_key("from-enc", local("alice-enc"), Some("00ff"), Some("6170702d6b6579")))
        .await;
    h.apply("default", derived_key("from-dec", local("alice-dec"), Some("00ff"), Some("6170702d6b6579")))
        .await;
    h.apply("default", derived_key("other-info", local("alice-enc"), Some("00ff"), Some("6f74686572")))
        .await;
    for name in ["from-enc", "from-dec", "other-info"] {
        assert_eq!(h.reconcile::<QuantumDerivedKey>("default", name).await.unwrap(), Outcome::Ready);
    }

    let from_enc = h.secret_data("default", "from-enc-derived-key").await;
    let from_dec = h.secret_data("default", "from-dec-derived-key").await;
    let other = h.secret_data("default", "other-info-derived-key").await;
    assert_eq!(from_enc["derived-key"].len(), 32);
    assert_eq!(from_enc["derived-key"], from_dec["derived-key"]);
    assert_ne!(from_enc["derived-key"], other["derived-key"]);
    assert_eq!(from_enc["key-type"], b"AES-256".to_vec());
    assert_eq!(
        from_enc["fingerprint"],
        fingerprint::full(&from_enc["derived-key"]).into_bytes()
    );

    let status = h.status::<QuantumDerivedKey>("default", "from-enc").await;
    assert_eq!(status.key_fingerprint, Some(fingerprint::full(&from_enc["derived-key"])));
    assert_eq!(status.fingerprint_hash, Some(fingerprint::short(&from_enc["derived-key"])));
    assert_eq!(status.used_salt.as_deref(), Some("00ff"));
    assert_eq!(status.used_info.as_deref(), Some("6170702d6b6579"));
}

#[tokio::test]
async fn test_derived_key_missing_producer_names_both_kinds() {
    let h = Harness::new();
    h.apply("default", derived_key("lonely", local("nobody"), None, None))
        .await;

    let err = h.reconcile::<QuantumDerivedKey>("default", "lonely").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("QuantumEncapsulateSecret"));
    assert!(message.contains("QuantumDecapsulateSecret"));
    assert_eq!(
        h.status::<QuantumDerivedKey>("default", "lonely").await.status,
        Phase::Failed
    );
}

#[tokio::test]
async fn test_invalid_salt_is_precondition() {
    let h = Harness::new();
    exchange(&h, "default").await;
    h.apply("default", derived_key("bad-salt", local("alice-enc"), Some("zz"), None))
        .await;

    let err = h.reconcile::<QuantumDerivedKey>("default", "bad-salt").await.unwrap_err();
    assert!(matches!(err, ReconcilerError::Precondition(_)));
    assert!(err.is_permanent());
}

#[tokio::test]
async fn test_derived_key_waits_for_shared_secret() {
    let h = Harness::new();
    h.apply("default", kem_key_pair("alice", "ML-KEM-768")).await;
    h.apply("default", encapsulate("alice-enc", local("alice"), "ML-KEM-768"))
        .await;
    h.apply("default", derived_key("session", local("alice-enc"), None, None))
        .await;

    // the encapsulation exists but has not succeeded yet
    let outcome = h.reconcile::<QuantumDerivedKey>("default", "session").await.unwrap();
    assert!(matches!(outcome, Outcome::Pending(ref reason) if reason.contains("alice-enc")));
    let status = h.status::<QuantumDerivedKey>("default", "session").await;
    assert_eq!(status.status, Phase::Pending);
    assert!(h.secret("default", "session-derived-key").await.is_none());

    // still pending while the encapsulation itself waits on the key pair
    h.reconcile::<QuantumEncapsulateSecret>("default", "alice-enc").await.unwrap();
    assert!(matches!(
        h.reconcile::<QuantumDerivedKey>("default", "session").await.unwrap(),
        Outcome::Pending(_)
    ));

    h.reconcile::<QuantumKEMKeyPair>("default", "alice").await.unwrap();
    h.reconcile::<QuantumEncapsulateSecret>("default", "alice-enc").await.unwrap();
    assert_eq!(
        h.reconcile::<QuantumDerivedKey>("default", "session").await.unwrap(),
        Outcome::Ready
    );
    let status = h.status::<QuantumDerivedKey>("default", "session").await;
    assert_eq!(status.status, Phase::Success);
    assert_eq!(status.error, None);
    assert_eq!(
        status.derived_key_reference,
        Some(ObjectReference::new("session-derived-key", "default"))
    );
}

#[tokio::test]
async fn test_unsalted_derivation_is_deterministic() {
    let h = Harness::new();
    exchange(&h, "default").await;

    h.apply("default", derived_key("first", local("alice-enc"), None, None))
        .await;
    h.apply("default", derived_key("second", local("alice-enc"), None, None))
        .await;
    h.reconcile::<QuantumDerivedKey>("default", "first").await.unwrap();
    h.reconcile::<QuantumDerivedKey>("default", "second").await.unwrap();

    let first = h.secret_data("default", "first-derived-key").await;
    let second = h.secret_data("default", "second-derived-key").await;
    assert_eq!(first["derived-key"].len(), 32);
    assert_eq!(first["derived-key"], second["derived-key"]);

    let status = h.status::<QuantumDerivedKey>("default", "first").await;
    assert_eq!(status.used_salt, None);
    assert_eq!(status.used_info, None);
}
