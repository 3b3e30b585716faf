//! # Public-Key Handle
//!
//! A [`KeyHandle`] is the public face of an identity's key: its key id, its
//! public key, and, when it was derived from a [`Signer`], the ability to
//! sign. Credential issuance signs through a key handle rather than the
//! signer itself, so an identity that only knows its public key (a
//! watch-only reconstruction) still has a handle that verifies.

use super::keys;
use super::signer::{verify_with, Signer};
use crate::capability::{Capability, Teach, TeachingContract};
use crate::config::{KEY_NAMESPACE, OP_SIGN, OP_VERIFY};
use crate::outcome::{Failure, Outcome};
use ed25519_dalek::VerifyingKey;
use serde_json::json;

/// Key id, public key, and an optional signer.
#[derive(Debug, Clone)]
pub struct KeyHandle {
    kid: String,
    verifying_key: VerifyingKey,
    signer: Option<Signer>,
}

impl KeyHandle {
    /// A handle that signs through `signer`.
    pub fn from_signer(signer: Signer, kid: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            verifying_key: signer.verifying_key(),
            signer: Some(signer),
        }
    }

    /// A verify-only handle built from a hex public key.
    pub fn from_public_key_hex(public_key_hex: &str, kid: impl Into<String>) -> Outcome<Self> {
        let verifying_key = keys::verifying_key_from_hex(public_key_hex)?;
        Ok(Self {
            kid: kid.into(),
            verifying_key,
            signer: None,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    /// Sign through the backing signer.
    pub fn sign(&self, message: &[u8]) -> Outcome<String> {
        match &self.signer {
            Some(signer) => Ok(signer.sign(message)),
            None => Err(Failure::capability_missing(format!(
                "key '{}' has no private key material to sign with",
                self.kid
            ))
            .with_context(json!({ "kid": self.kid }))),
        }
    }

    pub fn verify(&self, message: &[u8], signature_hex: &str) -> Outcome<bool> {
        Ok(verify_with(&self.verifying_key, message, signature_hex))
    }
}

impl Teach for KeyHandle {
    /// Offers `key.verify` always and `key.sign` only when signer-backed, so
    /// a learner can tell from `can("key.sign")` whether signing will work.
    fn teaching_contract(&self) -> TeachingContract {
        let for_verify = self.clone();
        let contract = TeachingContract::new(KEY_NAMESPACE).offer(
            OP_VERIFY,
            Capability::verify(move |data, sig| for_verify.verify(data, sig)),
        );
        if self.can_sign() {
            let for_sign = self.clone();
            contract.offer(OP_SIGN, Capability::sign(move |data| for_sign.sign(data)))
        } else {
            contract
        }
    }
}
