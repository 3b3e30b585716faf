//! # Signer
//!
//! The component that owns an identity's private key. It is built from PEM
//! (see [`keys`](super::keys)), signs arbitrary bytes, verifies signatures
//! against its own public key, and hands out a [`KeyHandle`] for components
//! that need to sign on its behalf (the credential issuer, mostly).
//!
//! Signatures travel as lowercase hex: 64 bytes, 128 characters. Ed25519 is
//! deterministic, so the same (key, message) pair always yields the same
//! hex string.

use super::key_handle::KeyHandle;
use super::keys::{self, KeyError, PrivateKeyPem};
use crate::capability::{Capability, Teach, TeachingContract};
use crate::config::{OP_SIGN, OP_VERIFY, SIGNATURE_LENGTH, SIGNER_NAMESPACE};
use crate::outcome::Outcome;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use std::fmt;
use std::sync::Arc;

/// Ed25519 signer bound to one key pair.
#[derive(Clone)]
pub struct Signer {
    signing_key: Arc<SigningKey>,
    verifying_key: VerifyingKey,
}

impl Signer {
    /// Build a signer from a PKCS#8 private key and an SPKI public key.
    ///
    /// Fails with a component failure if the public key is not the one the
    /// private key derives, and with a conversion failure if either PEM
    /// does not parse.
    pub fn from_pem(private_pem: &PrivateKeyPem, public_pem: &str) -> Outcome<Self> {
        let signing_key = keys::signing_key_from_pem(private_pem)?;
        let verifying_key = keys::verifying_key_from_pem(public_pem)?;
        if signing_key.verifying_key() != verifying_key {
            return Err(KeyError::KeypairMismatch.into());
        }
        Ok(Self {
            signing_key: Arc::new(signing_key),
            verifying_key,
        })
    }

    /// Sign `message`, returning the signature as hex.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }

    /// Verify a hex signature against this signer's public key.
    ///
    /// A signature that is not hex or not 64 bytes is simply invalid, not
    /// an error.
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> Outcome<bool> {
        Ok(verify_with(&self.verifying_key, message, signature_hex))
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }

    /// Derive a key handle that signs through this signer.
    pub fn key_handle(&self, kid: impl Into<String>) -> KeyHandle {
        KeyHandle::from_signer(self.clone(), kid)
    }
}

impl Teach for Signer {
    fn teaching_contract(&self) -> TeachingContract {
        let for_sign = self.clone();
        let for_verify = self.clone();
        TeachingContract::new(SIGNER_NAMESPACE)
            .offer(
                OP_SIGN,
                Capability::sign(move |data| Ok(for_sign.sign(data))),
            )
            .offer(
                OP_VERIFY,
                Capability::verify(move |data, sig| for_verify.verify(data, sig)),
            )
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signer(pub={})", self.public_key_hex())
    }
}

/// Check a hex signature against a verifying key. Malformed input is `false`.
pub(crate) fn verify_with(key: &VerifyingKey, message: &[u8], signature_hex: &str) -> bool {
    let Ok(bytes) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(arr) = <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice()) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(&arr)).is_ok()
}
