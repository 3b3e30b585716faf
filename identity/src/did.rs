//! # DID Component (`did:key`)
//!
//! Derives a W3C Decentralized Identifier from a public key and resolves it
//! back. The `did:key` method needs no registry: the identifier *is* the
//! key, multicodec-tagged and multibase-encoded.
//!
//! ## DID Format
//!
//! ```text
//! did:key:z<base58btc(multicodec(0xed01) || public_key)>
//! ```
//!
//! Example: `did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK`
//!
//! Derivation and resolution are pure functions of their input, with no
//! I/O. That is what lets [`Identity::create`](crate::identity::Identity::create)
//! check a stored DID against its stored public key.
//!
//! ## Standards References
//!
//! - [DID Core v1.0](https://www.w3.org/TR/did-core/)
//! - [did:key method](https://w3c-ccg.github.io/did-method-key/)
//! - [Ed25519VerificationKey2020](https://w3c-ccg.github.io/di-eddsa-2020/)

use crate::config::{
    DID_CONTEXT, DID_METHOD_KEY, DID_SCHEME, ED25519_2020_CONTEXT, MULTIBASE_BASE58BTC,
    PROVIDER_DID_KEY, VERIFICATION_KEY_TYPE,
};
use crate::crypto::keys::{self, KeyType};
use crate::outcome::{Failure, Outcome};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while deriving or resolving a DID.
#[derive(Debug, Error)]
pub enum DidError {
    /// The DID string does not match `did:<method>:<identifier>`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    /// The DID method is not one this component resolves locally.
    #[error("unsupported DID method: expected 'key', got '{0}'")]
    UnsupportedMethod(String),

    /// The identifier is not base58btc multibase.
    #[error("invalid multibase identifier: {0}")]
    InvalidMultibase(String),

    /// The multicodec prefix names a key type we do not handle.
    #[error("unsupported multicodec prefix")]
    UnsupportedKey,

    /// The embedded key bytes are not a valid public key.
    #[error("invalid public key in DID")]
    InvalidKey,

    /// Serialization error during document generation.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<DidError> for Failure {
    fn from(err: DidError) -> Self {
        Failure::conversion(err.to_string()).with_cause(err)
    }
}

// ---------------------------------------------------------------------------
// DidHandle
// ---------------------------------------------------------------------------

/// A `did:key` identifier together with the key it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidHandle {
    did: String,
    key_type: KeyType,
    public_key: VerifyingKey,
}

impl DidHandle {
    /// Derive the DID for a hex public key of the declared type.
    pub fn from_public_key_hex(public_key_hex: &str, key_type: KeyType) -> Outcome<Self> {
        let public_key = keys::verifying_key_from_hex(public_key_hex)?;
        Ok(Self::from_verifying_key(public_key, key_type))
    }

    fn from_verifying_key(public_key: VerifyingKey, key_type: KeyType) -> Self {
        let mut multicodec_bytes = key_type.multicodec().to_vec();
        multicodec_bytes.extend_from_slice(public_key.as_bytes());
        let identifier = format!(
            "{}{}",
            MULTIBASE_BASE58BTC,
            bs58::encode(&multicodec_bytes).into_string()
        );
        Self {
            did: format!("{}:{}:{}", DID_SCHEME, DID_METHOD_KEY, identifier),
            key_type,
            public_key,
        }
    }

    /// Parse a `did:key` string back into a handle.
    ///
    /// A DID URL fragment (`#...`) is ignored, so verification method ids
    /// resolve to their controller.
    pub fn resolve(did: &str) -> Outcome<Self> {
        Ok(Self::parse(did)?)
    }

    fn parse(did: &str) -> Result<Self, DidError> {
        let did = did.split('#').next().unwrap_or_default();
        let parts: Vec<&str> = did.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(DidError::InvalidFormat(
                "DID must have format 'did:<method>:<identifier>'".into(),
            ));
        }

        if parts[0] != DID_SCHEME {
            return Err(DidError::InvalidFormat(format!(
                "expected 'did' prefix, got '{}'",
                parts[0]
            )));
        }

        if parts[1] != DID_METHOD_KEY {
            return Err(DidError::UnsupportedMethod(parts[1].to_string()));
        }

        let encoded = parts[2]
            .strip_prefix(MULTIBASE_BASE58BTC)
            .ok_or_else(|| DidError::InvalidMultibase("expected 'z' (base58btc) prefix".into()))?;
        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| DidError::InvalidMultibase(e.to_string()))?;
        if decoded.len() < 2 {
            return Err(DidError::UnsupportedKey);
        }

        let (prefix, key_bytes) = decoded.split_at(2);
        let key_type = KeyType::from_multicodec(prefix).ok_or(DidError::UnsupportedKey)?;
        if key_bytes.len() != key_type.public_key_length() {
            return Err(DidError::InvalidKey);
        }
        let public_key =
            keys::verifying_key_from_bytes(key_bytes).map_err(|_| DidError::InvalidKey)?;

        Ok(Self::from_verifying_key(public_key, key_type))
    }

    /// The full DID string.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Provider tag recorded on identities using this DID.
    pub fn provider(&self) -> &'static str {
        PROVIDER_DID_KEY
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.to_bytes())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// `did:key:z...#z...`: the method-specific id doubles as the fragment.
    pub fn verification_method_id(&self) -> String {
        let fragment = self.did.rsplit(':').next().unwrap_or_default();
        format!("{}#{}", self.did, fragment)
    }

    /// Build the W3C DID Document this DID resolves to.
    pub fn to_did_document(&self) -> DidDocument {
        let key_id = self.verification_method_id();
        let public_key_multibase = self
            .did
            .rsplit(':')
            .next()
            .unwrap_or_default()
            .to_string();

        DidDocument {
            context: vec![DID_CONTEXT.to_string(), ED25519_2020_CONTEXT.to_string()],
            id: self.did.clone(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                type_: VERIFICATION_KEY_TYPE.to_string(),
                controller: self.did.clone(),
                public_key_multibase,
            }],
            authentication: vec![key_id.clone()],
            assertion_method: vec![key_id],
        }
    }
}

impl std::fmt::Display for DidHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.did)
    }
}

// ---------------------------------------------------------------------------
// DID Document Types
// ---------------------------------------------------------------------------

/// A W3C DID Document for a single-key `did:key` identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    /// JSON-LD context URIs.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// The DID string this document describes.
    pub id: String,

    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,

    pub authentication: Vec<String>,

    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    pub fn to_json(&self) -> Result<String, DidError> {
        serde_json::to_string_pretty(self).map_err(|e| DidError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DidError> {
        serde_json::from_str(json).map_err(|e| DidError::Serialization(e.to_string()))
    }

    /// Check the structural requirements:
    ///
    /// - `id` is a `did:key`
    /// - at least one verification method and one authentication reference
    /// - the DID Core context is present
    pub fn validate(&self) -> Result<(), DidError> {
        if !self.id.starts_with(PROVIDER_DID_KEY) {
            return Err(DidError::InvalidFormat(
                "document ID must start with 'did:key:'".into(),
            ));
        }

        if self.verification_method.is_empty() {
            return Err(DidError::InvalidFormat(
                "document must have at least one verification method".into(),
            ));
        }

        if self.authentication.is_empty() {
            return Err(DidError::InvalidFormat(
                "document must have at least one authentication method".into(),
            ));
        }

        if !self.context.iter().any(|c| c == DID_CONTEXT) {
            return Err(DidError::InvalidFormat(
                "document must include DID Core context".into(),
            ));
        }

        Ok(())
    }
}

/// A verification method entry in a DID Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// DID URL of this method.
    pub id: String,

    #[serde(rename = "type")]
    pub type_: String,

    pub controller: String,

    /// Multibase public key (base58btc with 'z' prefix).
    #[serde(rename = "publicKeyMultibase")]
    pub public_key_multibase: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
