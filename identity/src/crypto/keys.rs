//! # Key Material
//!
//! Ed25519 key generation and the hex <-> PEM conversions the signer needs.
//!
//! Identity records store keys as lowercase hex (64 characters each). The
//! [`Signer`](super::signer::Signer) is built from PEM (PKCS#8 for the
//! private half, SPKI for the public half), so every construction path goes
//! hex -> PEM -> signer. Each hop validates: wrong length, non-hex input,
//! and bytes that are not a valid curve point are all rejected here, before
//! anything downstream sees them.
//!
//! Private-key hex travels in [`SecretHex`] and private PEM in
//! [`PrivateKeyPem`]. Both are wiped on drop, neither prints its contents in
//! `Debug` output, and neither is ever passed to a `tracing` macro.

use crate::config::{MULTICODEC_ED25519_PUB, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use crate::outcome::{Failure, FailureKind, Outcome};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::spki::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Errors raised while decoding or encoding key material.
///
/// Deliberately vague about the bytes involved: an error message is a log
/// line waiting to happen.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("{0} is not valid hex")]
    InvalidHex(&'static str),

    #[error("invalid secret key: expected 32 bytes")]
    InvalidSecretKey,

    #[error("invalid public key: not a 32-byte Ed25519 point")]
    InvalidPublicKey,

    #[error("public key does not match secret key")]
    KeypairMismatch,

    #[error("PEM encoding failed: {0}")]
    Pem(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
}

impl From<KeyError> for Failure {
    fn from(err: KeyError) -> Self {
        let kind = match err {
            KeyError::KeypairMismatch => FailureKind::Component,
            _ => FailureKind::Conversion,
        };
        Failure::new(kind, err.to_string()).with_cause(err)
    }
}

// ---------------------------------------------------------------------------
// Secret wrappers
// ---------------------------------------------------------------------------

/// Hex-encoded private key. Serializes as a plain string, debugs as
/// `SecretHex(..)`, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretHex(String);

impl SecretHex {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The raw hex. Call sites should be few and obvious.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHex(..)")
    }
}

impl From<String> for SecretHex {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretHex {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// PKCS#8 PEM of a private key, zeroized on drop.
#[derive(Clone)]
pub struct PrivateKeyPem(Zeroizing<String>);

impl PrivateKeyPem {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKeyPem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyPem(..)")
    }
}

// ---------------------------------------------------------------------------
// Key types
// ---------------------------------------------------------------------------

/// Declared type of the key a DID is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Ed25519,
}

impl KeyType {
    /// Multicodec prefix written in front of the raw key in a `did:key`.
    pub fn multicodec(&self) -> [u8; 2] {
        match self {
            KeyType::Ed25519 => MULTICODEC_ED25519_PUB,
        }
    }

    /// Inverse of [`multicodec`](Self::multicodec).
    pub fn from_multicodec(prefix: &[u8]) -> Option<Self> {
        (prefix == MULTICODEC_ED25519_PUB).then_some(KeyType::Ed25519)
    }

    pub fn public_key_length(&self) -> usize {
        match self {
            KeyType::Ed25519 => PUBLIC_KEY_LENGTH,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Ed25519 => f.write_str("Ed25519"),
        }
    }
}

impl FromStr for KeyType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            other => Err(KeyError::UnsupportedKeyType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// A freshly generated key pair in hex form.
#[derive(Debug, Clone)]
pub struct KeyPairHex {
    pub public_key_hex: String,
    pub private_key_hex: SecretHex,
}

/// Generate a new Ed25519 key pair from the OS RNG.
pub fn generate_key_pair() -> KeyPairHex {
    let signing_key = SigningKey::generate(&mut OsRng);
    KeyPairHex {
        public_key_hex: hex::encode(signing_key.verifying_key().to_bytes()),
        private_key_hex: SecretHex(hex::encode(signing_key.to_bytes())),
    }
}

// ---------------------------------------------------------------------------
// Hex decoding
// ---------------------------------------------------------------------------

/// Decode a hex private key into an ed25519-dalek signing key.
pub fn signing_key_from_hex(secret: &SecretHex) -> Result<SigningKey, KeyError> {
    let bytes = Zeroizing::new(
        hex::decode(secret.expose().trim()).map_err(|_| KeyError::InvalidHex("private key"))?,
    );
    let arr: Zeroizing<[u8; SECRET_KEY_LENGTH]> = Zeroizing::new(
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?,
    );
    Ok(SigningKey::from_bytes(&arr))
}

/// Decode a hex public key, rejecting bytes that are not a curve point.
pub fn verifying_key_from_hex(public_key_hex: &str) -> Result<VerifyingKey, KeyError> {
    let bytes =
        hex::decode(public_key_hex.trim()).map_err(|_| KeyError::InvalidHex("public key"))?;
    verifying_key_from_bytes(&bytes)
}

/// Decode raw public key bytes.
pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey, KeyError> {
    let arr: [u8; PUBLIC_KEY_LENGTH] =
        bytes.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
    VerifyingKey::from_bytes(&arr).map_err(|_| KeyError::InvalidPublicKey)
}

// ---------------------------------------------------------------------------
// PEM conversion
// ---------------------------------------------------------------------------

/// Convert a hex private key into PKCS#8 PEM.
pub fn private_key_pem_from_hex(secret: &SecretHex) -> Outcome<PrivateKeyPem> {
    let signing_key = signing_key_from_hex(secret)?;
    let pem = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyError::Pem(e.to_string()))?;
    Ok(PrivateKeyPem(pem))
}

/// Convert a hex public key into SPKI PEM.
pub fn public_key_pem_from_hex(public_key_hex: &str) -> Outcome<String> {
    let verifying_key = verifying_key_from_hex(public_key_hex)?;
    let pem = verifying_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::Pem(e.to_string()))?;
    Ok(pem)
}

/// Parse a PKCS#8 PEM private key.
pub fn signing_key_from_pem(pem: &PrivateKeyPem) -> Result<SigningKey, KeyError> {
    SigningKey::from_pkcs8_pem(pem.expose()).map_err(|e| KeyError::Pem(e.to_string()))
}

/// Parse an SPKI PEM public key.
pub fn verifying_key_from_pem(pem: &str) -> Result<VerifyingKey, KeyError> {
    VerifyingKey::from_public_key_pem(pem).map_err(|e| KeyError::Pem(e.to_string()))
}
