//! # Capabilities
//!
//! A capability is a named operation one component offers to others. A
//! component publishes its capabilities as a [`TeachingContract`]; another
//! component *learns* the contract into its own [`CapabilityRegistry`] and
//! can then execute those operations by name.
//!
//! Names are `namespace.operation` (`signer.sign`, `credential.issue`, ...).
//! Each entry is a typed function reference, so a caller asking for a
//! signing capability either gets something with a signing signature or a
//! capability-missing failure. There is no positional, untyped dispatch.
//!
//! ## Resolution
//!
//! Registries are plain strategy tables. The policy of "learned override,
//! then bound component, then error" lives with the caller (see
//! [`Identity`](crate::identity::Identity)); the registry only answers
//! whether a name is present and with which shape.
//!
//! Learning is last-writer-wins: teaching a contract whose entries already
//! exist replaces them. That is how an external component supersedes an
//! identity's built-in behaviour for a single operation.

use crate::config::capability_name;
use crate::credential::{IssueRequest, VerifiableCredential};
use crate::outcome::{Failure, Outcome};
use futures::future::BoxFuture;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Signs bytes, returning a hex signature.
pub type SignFn = Arc<dyn Fn(&[u8]) -> Outcome<String> + Send + Sync>;

/// Verifies a hex signature over bytes.
pub type VerifyFn = Arc<dyn Fn(&[u8], &str) -> Outcome<bool> + Send + Sync>;

/// Issues a credential.
pub type IssueFn =
    Arc<dyn Fn(IssueRequest) -> BoxFuture<'static, Outcome<VerifiableCredential>> + Send + Sync>;

/// Verifies a credential's proof.
pub type VerifyCredentialFn =
    Arc<dyn Fn(VerifiableCredential) -> BoxFuture<'static, Outcome<bool>> + Send + Sync>;

/// A typed function reference stored under a capability name.
#[derive(Clone)]
pub enum Capability {
    Sign(SignFn),
    Verify(VerifyFn),
    Issue(IssueFn),
    VerifyCredential(VerifyCredentialFn),
}

impl Capability {
    pub fn sign<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Outcome<String> + Send + Sync + 'static,
    {
        Capability::Sign(Arc::new(f))
    }

    pub fn verify<F>(f: F) -> Self
    where
        F: Fn(&[u8], &str) -> Outcome<bool> + Send + Sync + 'static,
    {
        Capability::Verify(Arc::new(f))
    }

    pub fn issue<F>(f: F) -> Self
    where
        F: Fn(IssueRequest) -> BoxFuture<'static, Outcome<VerifiableCredential>>
            + Send
            + Sync
            + 'static,
    {
        Capability::Issue(Arc::new(f))
    }

    pub fn verify_credential<F>(f: F) -> Self
    where
        F: Fn(VerifiableCredential) -> BoxFuture<'static, Outcome<bool>> + Send + Sync + 'static,
    {
        Capability::VerifyCredential(Arc::new(f))
    }

    /// Short name of the call signature, used in failures and descriptions.
    pub fn shape(&self) -> &'static str {
        match self {
            Capability::Sign(_) => "sign",
            Capability::Verify(_) => "verify",
            Capability::Issue(_) => "issue",
            Capability::VerifyCredential(_) => "verify_credential",
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability::{}", self.shape())
    }
}

// ---------------------------------------------------------------------------
// Teaching contracts
// ---------------------------------------------------------------------------

/// The set of capabilities a component offers, under one namespace.
#[derive(Debug, Clone)]
pub struct TeachingContract {
    namespace: String,
    lessons: Vec<(String, Capability)>,
}

impl TeachingContract {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            lessons: Vec::new(),
        }
    }

    /// Add an operation to the contract.
    pub fn offer(mut self, operation: impl Into<String>, capability: Capability) -> Self {
        self.lessons.push((operation.into(), capability));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fully-qualified names of every offered operation.
    pub fn names(&self) -> Vec<String> {
        self.lessons
            .iter()
            .map(|(op, _)| capability_name(&self.namespace, op))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

/// Implemented by every component that can teach its capabilities.
pub trait Teach {
    fn teaching_contract(&self) -> TeachingContract;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Per-instance table from capability name to typed function reference.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    entries: HashMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import every entry of a contract. Returns how many entries were
    /// learned. Existing entries with the same name are replaced.
    pub fn learn(&mut self, contract: TeachingContract) -> usize {
        let TeachingContract { namespace, lessons } = contract;
        let count = lessons.len();
        for (operation, capability) in lessons {
            let name = capability_name(&namespace, &operation);
            if let Some(previous) = self.entries.insert(name.clone(), capability) {
                warn!(capability = %name, previous = previous.shape(), "capability overridden");
            }
        }
        debug!(namespace = %namespace, count, "learned teaching contract");
        count
    }

    /// Learn directly from a teaching component.
    pub fn learn_from(&mut self, component: &dyn Teach) -> usize {
        self.learn(component.teaching_contract())
    }

    /// Drop a learned capability. Returns whether one was present.
    pub fn forget(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn can(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    /// Sorted capability names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a signing capability. `Ok(None)` when absent; a failure when
    /// the name is bound to a different shape.
    pub fn sign_fn(&self, name: &str) -> Outcome<Option<SignFn>> {
        match self.entries.get(name) {
            None => Ok(None),
            Some(Capability::Sign(f)) => Ok(Some(Arc::clone(f))),
            Some(other) => Err(shape_mismatch(name, "sign", other)),
        }
    }

    pub fn verify_fn(&self, name: &str) -> Outcome<Option<VerifyFn>> {
        match self.entries.get(name) {
            None => Ok(None),
            Some(Capability::Verify(f)) => Ok(Some(Arc::clone(f))),
            Some(other) => Err(shape_mismatch(name, "verify", other)),
        }
    }

    pub fn issue_fn(&self, name: &str) -> Outcome<Option<IssueFn>> {
        match self.entries.get(name) {
            None => Ok(None),
            Some(Capability::Issue(f)) => Ok(Some(Arc::clone(f))),
            Some(other) => Err(shape_mismatch(name, "issue", other)),
        }
    }

    pub fn verify_credential_fn(&self, name: &str) -> Outcome<Option<VerifyCredentialFn>> {
        match self.entries.get(name) {
            None => Ok(None),
            Some(Capability::VerifyCredential(f)) => Ok(Some(Arc::clone(f))),
            Some(other) => Err(shape_mismatch(name, "verify_credential", other)),
        }
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

fn shape_mismatch(name: &str, expected: &str, found: &Capability) -> Failure {
    Failure::capability_missing(format!(
        "capability '{}' is a {} capability, expected {}",
        name,
        found.shape(),
        expected
    ))
    .with_context(json!({
        "capability": name,
        "expected": expected,
        "found": found.shape(),
    }))
}
