//! # Result Envelope
//!
//! Every fallible public operation in SOVID returns an [`Outcome`]: either
//! the produced value, or a [`Failure`] carrying a human-readable message,
//! a [`FailureKind`], the underlying cause when there is one, and optional
//! structured context for callers that want more than a string.
//!
//! Internal errors (`KeyError`, `DidError`, serde, ed25519-dalek) never cross
//! the public boundary raw. They are converted here, with the original kept
//! as the `source()` of the failure.
//!
//! Messages must never contain private-key material. Context values are
//! supplied by the call sites and follow the same rule.

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed, thread-safe cause attached to a [`Failure`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Success/failure envelope returned at every fallible public boundary.
pub type Outcome<T> = Result<T, Failure>;

/// Broad classification of what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Required input was missing, empty, or inconsistent.
    Validation,
    /// Key or identifier encoding/decoding failed.
    Conversion,
    /// A component refused to build from the given material.
    Component,
    /// The credential component could not produce or sign a credential.
    Issuance,
    /// Neither a learned capability nor a usable bound component exists.
    CapabilityMissing,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Validation => "validation failed",
            FailureKind::Conversion => "conversion failed",
            FailureKind::Component => "component construction failed",
            FailureKind::Issuance => "credential issuance failed",
            FailureKind::CapabilityMissing => "capability missing",
        };
        f.write_str(label)
    }
}

/// The failure side of an [`Outcome`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    #[source]
    cause: Option<BoxError>,
    context: Option<serde_json::Value>,
}

impl Failure {
    /// Create a failure with no cause and no context.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            context: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conversion, message)
    }

    pub fn component(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Component, message)
    }

    pub fn issuance(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Issuance, message)
    }

    pub fn capability_missing(message: impl Into<String>) -> Self {
        Self::new(FailureKind::CapabilityMissing, message)
    }

    /// Attach the error that caused this failure.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach structured context (field names, capability names, ...).
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn context(&self) -> Option<&serde_json::Value> {
        self.context.as_ref()
    }

    pub fn is(&self, kind: FailureKind) -> bool {
        self.kind == kind
    }
}

/// Converts foreign `Result`s into an [`Outcome`] without losing the cause.
pub trait OutcomeExt<T> {
    /// Map the error into a [`Failure`] of `kind`, keeping it as the cause.
    fn or_failure(self, kind: FailureKind, message: impl Into<String>) -> Outcome<T>;
}

impl<T, E> OutcomeExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn or_failure(self, kind: FailureKind, message: impl Into<String>) -> Outcome<T> {
        self.map_err(|e| Failure::new(kind, message).with_cause(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Error)]
    #[error("bad hex at offset 3")]
    struct Inner;

    #[test]
    fn display_includes_kind_and_message() {
        let f = Failure::validation("missing required field 'alias'");
        assert_eq!(
            f.to_string(),
            "validation failed: missing required field 'alias'"
        );
        assert!(f.is(FailureKind::Validation));
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let f = Failure::conversion("private key hex is malformed").with_cause(Inner);
        let source = f.source().expect("source attached");
        assert_eq!(source.to_string(), "bad hex at offset 3");
        assert!(f.cause().is_some());
    }

    #[test]
    fn no_cause_means_no_source() {
        let f = Failure::issuance("no signing capability");
        assert!(f.source().is_none());
        assert!(f.context().is_none());
    }

    #[test]
    fn context_round_trips() {
        let f = Failure::capability_missing("no signer")
            .with_context(json!({ "capability": "signer.sign" }));
        assert_eq!(f.context().unwrap()["capability"], "signer.sign");
        assert_eq!(f.kind(), FailureKind::CapabilityMissing);
    }

    #[test]
    fn or_failure_wraps_foreign_errors() {
        let r: Result<(), Inner> = Err(Inner);
        let f = r
            .or_failure(FailureKind::Component, "signer refused key")
            .unwrap_err();
        assert_eq!(f.kind(), FailureKind::Component);
        assert_eq!(f.message(), "signer refused key");
        assert!(f.source().is_some());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let v = serde_json::to_value(FailureKind::CapabilityMissing).unwrap();
        assert_eq!(v, json!("capability_missing"));
    }
}
