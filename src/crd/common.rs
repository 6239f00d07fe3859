//! # Shared CRD Types
//!
//! References, status phases and the traits the reconciler uses to treat every
//! QubeSec kind uniformly.

use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Reference to another object by name
///
/// `namespace` is optional in specs and defaults to the namespace of the
/// referencing resource. References written into status always carry it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Name of the referent
    pub name: String,
    /// Namespace of the referent; empty defaults to the current namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Reference with an explicit namespace
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Namespace this reference points into, given the referencing resource's namespace
    pub fn namespace_or<'a>(&'a self, default_namespace: &'a str) -> &'a str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => default_namespace,
        }
    }
}

/// Phase of a credential-producing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum Phase {
    #[default]
    Pending,
    Success,
    Failed,
}

/// Phase of a signature verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum VerificationPhase {
    #[default]
    Pending,
    Valid,
    Invalid,
    Failed,
}

/// Fields every QubeSec status carries
///
/// The status combinator relies on these to stamp timestamps, record the
/// observed generation and render failures without knowing the concrete kind.
pub trait CredentialStatus:
    Default + Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// Record a failure with a human-readable cause
    fn mark_failed(&mut self, message: String);

    /// Record a non-terminal wait with a human-readable cause
    fn mark_pending(&mut self, message: String);

    fn set_observed_generation(&mut self, generation: Option<i64>);

    fn set_last_update_time(&mut self, time: Option<String>);
}

/// A namespaced QubeSec custom resource with a typed status
pub trait CredentialResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Status: CredentialStatus;

    fn status(&self) -> Option<&Self::Status>;

    fn status_mut(&mut self) -> &mut Option<Self::Status>;
}

/// Implements [`CredentialStatus`] for a status struct with the standard field names
macro_rules! impl_credential_status {
    ($status:ty, $phase:ident) => {
        impl $crate::crd::CredentialStatus for $status {
            fn mark_failed(&mut self, message: String) {
                self.status = $phase::Failed;
                self.error = Some(message);
            }

            fn mark_pending(&mut self, message: String) {
                self.status = $phase::Pending;
                self.error = Some(message);
            }

            fn set_observed_generation(&mut self, generation: Option<i64>) {
                self.observed_generation = generation;
            }

            fn set_last_update_time(&mut self, time: Option<String>) {
                self.last_update_time = time;
            }
        }
    };
}

/// Implements [`CredentialResource`] for a `kube::CustomResource` with a status subresource
macro_rules! impl_credential_resource {
    ($kind:ty, $status:ty) => {
        impl $crate::crd::CredentialResource for $kind {
            type Status = $status;

            fn status(&self) -> Option<&Self::Status> {
                self.status.as_ref()
            }

            fn status_mut(&mut self) -> &mut Option<Self::Status> {
                &mut self.status
            }
        }
    };
}

pub(crate) use impl_credential_resource;
pub(crate) use impl_credential_status;
