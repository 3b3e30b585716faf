//! # Identity
//!
//! The composite: a canonical [`IdentityRecord`] plus the components that
//! act for it.
//!
//! - **DID handle**: the `did:key` derived from the public key.
//! - **Signer**: owns the private key. Absent on watch-only identities.
//! - **Key handle**: the public key; signs when backed by the signer.
//! - **Credential issuer**: issues and verifies credentials through the
//!   key handle's learned signing capability.
//!
//! ## Construction
//!
//! | Path | Input | Private key | Credential |
//! |------|-------|-------------|------------|
//! | [`Identity::generate`] | alias | fresh | freshly self-issued |
//! | [`Identity::create`] | [`IdentityConfig`] | required | carried over |
//! | [`Identity::from_public`] | [`PublicIdentity`] | none | carried over |
//!
//! Each path either returns a complete identity or a [`Failure`]; nothing
//! half-built escapes.
//!
//! ## Delegation
//!
//! `sign`, `verify`, `issue_credential` and `verify_credential` all resolve
//! the same way:
//!
//! 1. a capability learned under `signer.sign` / `signer.verify` /
//!    `credential.issue` / `credential.verify`;
//! 2. otherwise the bound component;
//! 3. otherwise a capability-missing failure.
//!
//! Construction pre-learns the bound components' own contracts, so step 1
//! normally hits and behaves exactly like step 2 until something else
//! teaches the identity a replacement.

mod record;

pub use record::{
    IdentityConfig, IdentityPresent, IdentityRecord, Metadata, PublicIdentity, ValidatedConfig,
};

use crate::capability::{CapabilityRegistry, Teach};
use crate::config::{
    CAP_CREDENTIAL_ISSUE, CAP_CREDENTIAL_VERIFY, CAP_SIGNER_SIGN, CAP_SIGNER_VERIFY,
    DEFAULT_KEY_TYPE, PROVIDER_DID_KEY,
};
use crate::credential::{CredentialIssuer, IssueRequest, VerifiableCredential};
use crate::crypto::keys;
use crate::crypto::{KeyHandle, Signer};
use crate::did::DidHandle;
use crate::outcome::{Failure, Outcome};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

/// A self-sovereign identity and the components acting for it.
#[derive(Debug)]
pub struct Identity {
    record: IdentityRecord,
    did: DidHandle,
    signer: Option<Signer>,
    key: KeyHandle,
    credentials: CredentialIssuer,
    capabilities: RwLock<CapabilityRegistry>,
}

impl Identity {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Bootstrap a brand-new identity for `alias`.
    ///
    /// Generates a key pair, builds the signer and key handle, derives the
    /// DID, and has the credential component self-issue an
    /// `IdentityCredential` whose issuer, subject, and holder are the new
    /// DID. The first failing step aborts the whole thing.
    pub fn generate(alias: &str) -> Outcome<Self> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(record::missing_fields(&["alias"]));
        }

        let key_pair = keys::generate_key_pair();
        debug!(alias, "key pair generated");

        let private_pem = keys::private_key_pem_from_hex(&key_pair.private_key_hex)?;
        let public_pem = keys::public_key_pem_from_hex(&key_pair.public_key_hex)?;
        let signer = Signer::from_pem(&private_pem, &public_pem)?;
        let kid = key_pair.public_key_hex.clone();
        let key = signer.key_handle(kid.clone());
        debug!(alias, "signer and key handle built");

        let did = DidHandle::from_public_key_hex(&key_pair.public_key_hex, DEFAULT_KEY_TYPE)?;
        debug!(alias, did = %did, "DID derived");

        let mut credentials = CredentialIssuer::new();
        credentials.learn(&key);
        let credential = credentials.issue(IssueRequest::self_attestation(did.did(), alias))?;
        debug!(alias, credential = %credential.id, "self-attesting credential issued");

        let record = IdentityRecord {
            alias: alias.to_string(),
            did: did.did().to_string(),
            kid,
            public_key_hex: key_pair.public_key_hex,
            private_key_hex: Some(key_pair.private_key_hex),
            provider: did.provider().to_string(),
            credential: Some(credential),
            metadata: Metadata::new(),
            created_at: Utc::now(),
        };

        let identity = Self::assemble(record, did, Some(signer), key, credentials);
        info!(did = %identity.did(), alias, "identity generated");
        Ok(identity)
    }

    /// Rebuild an identity from stored key material.
    ///
    /// No credential is issued; whatever the config carries is kept as-is.
    /// When the provider is `did:key` the stored DID must be the one the
    /// stored public key derives. Other providers cannot be re-derived
    /// locally, so their DID is trusted.
    pub fn create(config: IdentityConfig) -> Outcome<Self> {
        let config = config.validate()?;

        let private_pem = keys::private_key_pem_from_hex(config.private_key_hex())?;
        let public_pem = keys::public_key_pem_from_hex(config.public_key_hex())?;
        let signer = Signer::from_pem(&private_pem, &public_pem)?;
        let key = signer.key_handle(config.kid());

        let did = DidHandle::from_public_key_hex(config.public_key_hex(), DEFAULT_KEY_TYPE)?;
        check_did_consistency(config.provider(), config.did(), &did)?;

        let mut credentials = CredentialIssuer::new();
        credentials.learn(&key);

        let identity = Self::assemble(config.into_record(), did, Some(signer), key, credentials);
        info!(did = %identity.did(), alias = identity.alias(), "identity reconstructed");
        Ok(identity)
    }

    /// Rebuild a watch-only identity from its public projection.
    ///
    /// It verifies signatures and credentials but cannot sign or issue
    /// unless another component teaches it how.
    pub fn from_public(public: PublicIdentity) -> Outcome<Self> {
        let missing: Vec<&str> = [
            ("alias", &public.alias),
            ("did", &public.did),
            ("publicKeyHex", &public.public_key_hex),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
        if !missing.is_empty() {
            return Err(record::missing_fields(&missing));
        }

        let kid = if public.kid.trim().is_empty() {
            public.public_key_hex.clone()
        } else {
            public.kid.clone()
        };
        let key = KeyHandle::from_public_key_hex(&public.public_key_hex, kid.clone())?;
        let did = DidHandle::from_public_key_hex(&public.public_key_hex, DEFAULT_KEY_TYPE)?;
        check_did_consistency(&public.provider, &public.did, &did)?;

        let mut credentials = CredentialIssuer::new();
        credentials.learn(&key);

        let record = IdentityRecord {
            alias: public.alias,
            did: public.did,
            kid,
            public_key_hex: public.public_key_hex,
            private_key_hex: None,
            provider: public.provider,
            credential: public.credential,
            metadata: public.metadata,
            created_at: public.created_at,
        };

        let identity = Self::assemble(record, did, None, key, credentials);
        info!(did = %identity.did(), "watch-only identity reconstructed");
        Ok(identity)
    }

    fn assemble(
        record: IdentityRecord,
        did: DidHandle,
        signer: Option<Signer>,
        key: KeyHandle,
        credentials: CredentialIssuer,
    ) -> Self {
        let mut registry = CapabilityRegistry::new();
        if let Some(signer) = &signer {
            registry.learn_from(signer);
        }
        registry.learn_from(&key);
        registry.learn_from(&credentials);

        Self {
            record,
            did,
            signer,
            key,
            credentials,
            capabilities: RwLock::new(registry),
        }
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    /// Learn another component's teaching contract. Same-named entries
    /// replace what the identity had, which is how a caller overrides one
    /// operation without touching the rest.
    pub fn learn(&self, component: &dyn Teach) -> usize {
        self.capabilities.write().learn_from(component)
    }

    /// Drop a learned capability, falling back to the bound component.
    pub fn forget(&self, name: &str) -> bool {
        self.capabilities.write().forget(name)
    }

    pub fn can(&self, name: &str) -> bool {
        self.capabilities.read().can(name)
    }

    pub fn capability_names(&self) -> Vec<String> {
        self.capabilities.read().names()
    }

    // -----------------------------------------------------------------------
    // Delegated operations
    // -----------------------------------------------------------------------

    /// Sign `data`, returning a hex signature.
    pub fn sign(&self, data: &[u8]) -> Outcome<String> {
        let learned = self.capabilities.read().sign_fn(CAP_SIGNER_SIGN)?;
        if let Some(sign) = learned {
            return sign(data);
        }
        match &self.signer {
            Some(signer) => Ok(signer.sign(data)),
            None => Err(Failure::capability_missing(format!(
                "identity '{}' has no private key and no learned '{}' capability",
                self.record.did, CAP_SIGNER_SIGN
            ))
            .with_context(json!({ "capability": CAP_SIGNER_SIGN, "did": self.record.did }))),
        }
    }

    /// Verify a hex signature over `data`.
    pub fn verify(&self, data: &[u8], signature_hex: &str) -> Outcome<bool> {
        let learned = self.capabilities.read().verify_fn(CAP_SIGNER_VERIFY)?;
        if let Some(verify) = learned {
            return verify(data, signature_hex);
        }
        match &self.signer {
            Some(signer) => signer.verify(data, signature_hex),
            None => self.key.verify(data, signature_hex),
        }
    }

    /// Issue a credential as this identity.
    pub async fn issue_credential(&self, request: IssueRequest) -> Outcome<VerifiableCredential> {
        let learned = self.capabilities.read().issue_fn(CAP_CREDENTIAL_ISSUE)?;
        if let Some(issue) = learned {
            return issue(request).await;
        }
        if !self.credentials.can_sign() {
            return Err(Failure::capability_missing(format!(
                "identity '{}' cannot issue credentials without a signing key",
                self.record.did
            ))
            .with_context(json!({ "capability": CAP_CREDENTIAL_ISSUE, "did": self.record.did })));
        }
        self.credentials.issue(request)
    }

    /// Verify a credential's proof.
    pub async fn verify_credential(&self, credential: &VerifiableCredential) -> Outcome<bool> {
        let learned = self
            .capabilities
            .read()
            .verify_credential_fn(CAP_CREDENTIAL_VERIFY)?;
        match learned {
            Some(verify) => verify(credential.clone()).await,
            None => self.credentials.verify(credential),
        }
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    /// Export form, private key included when present.
    pub fn to_domain(&self) -> IdentityRecord {
        self.record.clone()
    }

    pub fn public(&self) -> PublicIdentity {
        self.record.to_public()
    }

    pub fn present(&self) -> IdentityPresent {
        self.record.to_present()
    }

    /// The public projection as JSON.
    pub fn to_json(&self) -> Outcome<serde_json::Value> {
        serde_json::to_value(self.public()).map_err(|e| {
            Failure::conversion("identity is not serializable").with_cause(e)
        })
    }

    /// A structured description of the identity, its components, and what
    /// it can currently do.
    pub fn describe(&self) -> IdentityDescription {
        let mut components = vec![ComponentDescription {
            name: "did",
            detail: self.did.did().to_string(),
            capabilities: Vec::new(),
        }];
        if let Some(signer) = &self.signer {
            components.push(ComponentDescription {
                name: "signer",
                detail: signer.public_key_hex(),
                capabilities: signer.teaching_contract().names(),
            });
        }
        components.push(ComponentDescription {
            name: "key",
            detail: self.key.kid().to_string(),
            capabilities: self.key.teaching_contract().names(),
        });
        components.push(ComponentDescription {
            name: "credential",
            detail: if self.credentials.can_sign() {
                "issuer".to_string()
            } else {
                "verifier".to_string()
            },
            capabilities: self.credentials.teaching_contract().names(),
        });

        IdentityDescription {
            did: self.record.did.clone(),
            alias: self.record.alias.clone(),
            provider: self.record.provider.clone(),
            kid: self.record.kid.clone(),
            components,
            capabilities: self.capability_names(),
            can_sign: self.signer.is_some() || self.can(CAP_SIGNER_SIGN),
            has_credential: self.record.credential.is_some(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn alias(&self) -> &str {
        &self.record.alias
    }

    pub fn did(&self) -> &str {
        &self.record.did
    }

    pub fn kid(&self) -> &str {
        &self.record.kid
    }

    pub fn public_key_hex(&self) -> &str {
        &self.record.public_key_hex
    }

    pub fn provider(&self) -> &str {
        &self.record.provider
    }

    pub fn credential(&self) -> Option<&VerifiableCredential> {
        self.record.credential.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.record.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    pub fn has_private_key(&self) -> bool {
        self.record.private_key_hex.is_some()
    }

    pub fn did_handle(&self) -> &DidHandle {
        &self.did
    }

    pub fn key_handle(&self) -> &KeyHandle {
        &self.key
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    pub fn credential_issuer(&self) -> &CredentialIssuer {
        &self.credentials
    }
}

/// Output of [`Identity::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDescription {
    pub did: String,
    pub alias: String,
    pub provider: String,
    pub kid: String,
    pub components: Vec<ComponentDescription>,
    /// Everything in the identity's registry, sorted.
    pub capabilities: Vec<String>,
    pub can_sign: bool,
    pub has_credential: bool,
}

/// One bound component and the contract it teaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDescription {
    pub name: &'static str,
    pub detail: String,
    pub capabilities: Vec<String>,
}

/// `did:key` DIDs must match the key; anything else is taken on trust.
fn check_did_consistency(provider: &str, stored: &str, derived: &DidHandle) -> Outcome<()> {
    let locally_derivable =
        provider == PROVIDER_DID_KEY || stored.starts_with(&format!("{}:", PROVIDER_DID_KEY));
    if !locally_derivable {
        warn!(did = stored, provider, "DID cannot be re-derived locally, trusting stored value");
        return Ok(());
    }
    if stored != derived.did() {
        return Err(Failure::validation(format!(
            "DID '{}' does not match the public key (expected '{}')",
            stored,
            derived.did()
        ))
        .with_context(json!({ "did": stored, "derived": derived.did() })));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, TeachingContract};
    use crate::outcome::FailureKind;

    struct Notary;

    impl Teach for Notary {
        fn teaching_contract(&self) -> TeachingContract {
            TeachingContract::new("signer")
                .offer("sign", Capability::sign(|_| Ok("notarized".to_string())))
        }
    }

    #[test]
    fn generate_populates_every_field() {
        let id = Identity::generate("alice").unwrap();
        assert_eq!(id.alias(), "alice");
        assert!(id.did().starts_with("did:key:"));
        assert_eq!(id.public_key_hex().len(), 64);
        assert_eq!(id.kid(), id.public_key_hex());
        assert_eq!(id.provider(), "did:key");
        assert!(id.has_private_key());
        assert!(id.metadata().is_empty());
        assert_eq!(id.did_handle().did(), id.did());
        assert!(id.key_handle().can_sign());
        assert!(id.signer().is_some());
    }

    #[test]
    fn generate_trims_and_rejects_blank_alias() {
        let err = Identity::generate("   ").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(err.message().contains("alias"));
        assert_eq!(Identity::generate("  bob ").unwrap().alias(), "bob");
    }

    #[test]
    fn construction_prelearns_component_contracts() {
        let id = Identity::generate("alice").unwrap();
        assert_eq!(
            id.capability_names(),
            vec![
                "credential.issue",
                "credential.verify",
                "key.sign",
                "key.verify",
                "signer.sign",
                "signer.verify",
            ]
        );
    }

    #[test]
    fn forgetting_falls_back_to_bound_signer() {
        let id = Identity::generate("alice").unwrap();
        assert!(id.forget(CAP_SIGNER_SIGN));
        assert!(!id.can(CAP_SIGNER_SIGN));
        let sig = id.sign(b"data").unwrap();
        assert!(id.verify(b"data", &sig).unwrap());
    }

    #[test]
    fn learned_override_wins_until_forgotten() {
        let id = Identity::generate("alice").unwrap();
        id.learn(&Notary);
        assert_eq!(id.sign(b"data").unwrap(), "notarized");

        id.forget(CAP_SIGNER_SIGN);
        assert_ne!(id.sign(b"data").unwrap(), "notarized");
    }

    #[test]
    fn mismatched_capability_shape_is_reported() {
        struct Confused;
        impl Teach for Confused {
            fn teaching_contract(&self) -> TeachingContract {
                TeachingContract::new("signer")
                    .offer("sign", Capability::verify(|_, _| Ok(true)))
            }
        }

        let id = Identity::generate("alice").unwrap();
        id.learn(&Confused);
        let err = id.sign(b"data").unwrap_err();
        assert_eq!(err.kind(), FailureKind::CapabilityMissing);
    }

    #[test]
    fn create_rejects_did_of_another_key() {
        let a = Identity::generate("a").unwrap();
        let b = Identity::generate("b").unwrap();
        let mut record = a.to_domain();
        record.did = b.did().to_string();

        let err = Identity::create(record.into()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(err.context().unwrap()["derived"], a.did());
    }

    #[test]
    fn create_trusts_foreign_provider_did() {
        let a = Identity::generate("a").unwrap();
        let mut record = a.to_domain();
        record.did = "did:web:example.com".to_string();
        record.provider = "did:web".to_string();

        let id = Identity::create(record.into()).unwrap();
        assert_eq!(id.did(), "did:web:example.com");
        assert_eq!(id.did_handle().did(), a.did());
    }

    #[test]
    fn create_rejects_mismatched_private_key() {
        let a = Identity::generate("a").unwrap();
        let b = Identity::generate("b").unwrap();
        let mut record = a.to_domain();
        record.private_key_hex = b.to_domain().private_key_hex;

        let err = Identity::create(record.into()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Component);
    }

    #[test]
    fn create_rejects_malformed_hex() {
        let a = Identity::generate("a").unwrap();
        let mut record = a.to_domain();
        record.public_key_hex = "xyz".repeat(20);

        let err = Identity::create(record.into()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Conversion);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn describe_reports_components_and_state() {
        let id = Identity::generate("alice").unwrap();
        let d = id.describe();
        assert_eq!(d.did, id.did());
        assert!(d.can_sign);
        assert!(d.has_credential);
        let names: Vec<_> = d.components.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["did", "signer", "key", "credential"]);

        let watch = Identity::from_public(id.public()).unwrap().describe();
        assert!(!watch.can_sign);
        let names: Vec<_> = watch.components.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["did", "key", "credential"]);
        assert_eq!(watch.components[2].detail, "verifier");
    }

    #[test]
    fn to_json_is_public_projection() {
        let id = Identity::generate("alice").unwrap();
        let v = id.to_json().unwrap();
        assert_eq!(v["did"], id.did());
        assert!(v.get("privateKeyHex").is_none());
        assert_eq!(v, serde_json::to_value(id.public()).unwrap());
    }

    #[tokio::test]
    async fn issue_credential_for_another_subject() {
        let id = Identity::generate("issuer").unwrap();
        let vc = id
            .issue_credential(IssueRequest::new(
                id.did(),
                json!({ "id": "did:example:subject", "degree": "BSc" }),
                "DegreeCredential",
            ))
            .await
            .unwrap();
        assert_eq!(vc.issuer, id.did());
        assert!(vc.has_type("DegreeCredential"));
        assert!(id.verify_credential(&vc).await.unwrap());
    }
}
