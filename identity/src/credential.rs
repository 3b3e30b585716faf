//! # Credential Component
//!
//! Issues and verifies W3C-shaped Verifiable Credentials signed with
//! Ed25519 (`Ed25519Signature2020` proofs).
//!
//! The issuer does not hold keys. It signs through a `key.sign` capability
//! learned from a [`KeyHandle`](crate::crypto::KeyHandle), so the same
//! component can issue for any identity that teaches it. Verification needs
//! no keys at all: the issuer is a `did:key`, which resolves to its public
//! key locally.
//!
//! ## Canonical form
//!
//! The signed bytes are the credential without its `proof`, serialized as
//! compact JSON with object keys in sorted order (the `serde_json::Value`
//! map ordering). Issuer and verifier both go through
//! [`VerifiableCredential::canonical_bytes`], so they cannot disagree.

use crate::capability::{Capability, CapabilityRegistry, Teach, TeachingContract};
use crate::config::{
    CAP_KEY_SIGN, CREDENTIAL_NAMESPACE, ED25519_2020_CONTEXT, IDENTITY_CREDENTIAL_TYPE,
    MULTIBASE_BASE58BTC, OP_ISSUE, OP_VERIFY, PROOF_PURPOSE, PROOF_TYPE, VC_BASE_TYPE,
    VC_CONTEXT,
};
use crate::crypto::signer::verify_with;
use crate::did::DidHandle;
use crate::outcome::{Failure, FailureKind, Outcome, OutcomeExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Credential types
// ---------------------------------------------------------------------------

/// A Verifiable Credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `urn:uuid:<v4>`.
    pub id: String,
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// DID of the issuer.
    pub issuer: String,
    pub issuance_date: DateTime<Utc>,
    pub credential_subject: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<CredentialProof>,
}

/// An `Ed25519Signature2020` proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    /// DID URL of the signing key.
    pub verification_method: String,
    pub proof_purpose: String,
    /// Multibase (base58btc) signature.
    pub proof_value: String,
}

impl VerifiableCredential {
    /// `credentialSubject.id`, if present.
    pub fn subject_id(&self) -> Option<&str> {
        self.credential_subject.get("id")?.as_str()
    }

    /// `credentialSubject.holder.id`, if present.
    pub fn holder_id(&self) -> Option<&str> {
        self.credential_subject.get("holder")?.get("id")?.as_str()
    }

    /// Whether `type` lists `credential_type`.
    pub fn has_type(&self, credential_type: &str) -> bool {
        self.credential_type.iter().any(|t| t == credential_type)
    }

    /// The bytes a proof signs: everything but the proof, keys sorted.
    pub fn canonical_bytes(&self) -> Outcome<Vec<u8>> {
        let unsigned = VerifiableCredential {
            proof: None,
            ..self.clone()
        };
        let value = serde_json::to_value(&unsigned)
            .or_failure(FailureKind::Conversion, "credential is not serializable")?;
        serde_json::to_vec(&value)
            .or_failure(FailureKind::Conversion, "credential is not serializable")
    }
}

/// What to issue: a subject, an issuer DID, and a credential type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub issuer: String,
    pub subject: serde_json::Value,
    pub credential_type: String,
}

impl IssueRequest {
    pub fn new(
        issuer: impl Into<String>,
        subject: serde_json::Value,
        credential_type: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            subject,
            credential_type: credential_type.into(),
        }
    }

    /// The self-attesting request used at identity bootstrap: issuer,
    /// subject, and holder are all `did`.
    pub fn self_attestation(did: &str, alias: &str) -> Self {
        Self::new(
            did,
            json!({
                "id": did,
                "holder": { "id": did, "alias": alias },
            }),
            IDENTITY_CREDENTIAL_TYPE,
        )
    }
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// Issues and verifies credentials, signing through learned capabilities.
#[derive(Debug, Clone, Default)]
pub struct CredentialIssuer {
    capabilities: CapabilityRegistry,
}

impl CredentialIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn a teaching contract (normally a key handle's).
    pub fn learn(&mut self, component: &dyn Teach) -> usize {
        self.capabilities.learn_from(component)
    }

    /// Whether a `key.sign` capability has been learned.
    pub fn can_sign(&self) -> bool {
        self.capabilities.can(CAP_KEY_SIGN)
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Issue a signed credential.
    ///
    /// The issuer must be a resolvable `did:key`, and the learned signing
    /// key must be the one that DID encodes. A credential the issuer's own
    /// DID would not verify is never returned.
    pub fn issue(&self, request: IssueRequest) -> Outcome<VerifiableCredential> {
        if request.credential_type.trim().is_empty() {
            return Err(Failure::issuance("credential type must not be empty"));
        }

        let issuer = DidHandle::resolve(&request.issuer).map_err(|e| {
            Failure::issuance(format!("issuer '{}' cannot be resolved", request.issuer))
                .with_cause(e)
        })?;

        let sign = self.capabilities.sign_fn(CAP_KEY_SIGN)?.ok_or_else(|| {
            Failure::issuance("credential component has not learned a signing capability")
                .with_context(json!({ "capability": CAP_KEY_SIGN }))
        })?;

        let mut credential = VerifiableCredential {
            context: vec![VC_CONTEXT.to_string(), ED25519_2020_CONTEXT.to_string()],
            id: format!("urn:uuid:{}", Uuid::new_v4()),
            credential_type: vec![VC_BASE_TYPE.to_string(), request.credential_type],
            issuer: issuer.did().to_string(),
            issuance_date: Utc::now(),
            credential_subject: request.subject,
            proof: None,
        };

        let payload = credential.canonical_bytes()?;
        let signature_hex = sign(payload.as_slice()).map_err(|e| {
            Failure::issuance("signing capability failed to sign the credential").with_cause(e)
        })?;

        if !verify_with(issuer.verifying_key(), &payload, &signature_hex) {
            return Err(Failure::issuance(format!(
                "signing key does not control issuer '{}'",
                issuer.did()
            )));
        }

        let signature = hex::decode(&signature_hex)
            .or_failure(FailureKind::Issuance, "signature is not hex")?;
        credential.proof = Some(CredentialProof {
            proof_type: PROOF_TYPE.to_string(),
            created: credential.issuance_date,
            verification_method: issuer.verification_method_id(),
            proof_purpose: PROOF_PURPOSE.to_string(),
            proof_value: format!(
                "{}{}",
                MULTIBASE_BASE58BTC,
                bs58::encode(signature).into_string()
            ),
        });

        debug!(id = %credential.id, issuer = %credential.issuer, "credential issued");
        Ok(credential)
    }

    /// Verify a credential's proof against its issuer DID.
    ///
    /// `Ok(false)` for an unsigned credential, a foreign verification
    /// method, or a bad signature. A conversion failure when the issuer
    /// cannot be resolved at all.
    pub fn verify(&self, credential: &VerifiableCredential) -> Outcome<bool> {
        let Some(proof) = &credential.proof else {
            return Ok(false);
        };
        let issuer = DidHandle::resolve(&credential.issuer)?;

        if proof.proof_type != PROOF_TYPE
            || proof.verification_method != issuer.verification_method_id()
        {
            return Ok(false);
        }

        let Some(encoded) = proof.proof_value.strip_prefix(MULTIBASE_BASE58BTC) else {
            return Ok(false);
        };
        let Ok(signature) = bs58::decode(encoded).into_vec() else {
            return Ok(false);
        };

        let payload = credential.canonical_bytes()?;
        Ok(verify_with(
            issuer.verifying_key(),
            &payload,
            &hex::encode(signature),
        ))
    }
}

impl Teach for CredentialIssuer {
    /// Offers `credential.verify` always and `credential.issue` only once a
    /// signing capability has been learned.
    fn teaching_contract(&self) -> TeachingContract {
        let for_verify = self.clone();
        let contract = TeachingContract::new(CREDENTIAL_NAMESPACE).offer(
            OP_VERIFY,
            Capability::verify_credential(move |credential| {
                let result = for_verify.verify(&credential);
                Box::pin(async move { result })
            }),
        );
        if !self.can_sign() {
            return contract;
        }

        let for_issue = self.clone();
        contract.offer(
            OP_ISSUE,
            Capability::issue(move |request| {
                let result = for_issue.issue(request);
                Box::pin(async move { result })
            }),
        )
    }
}
