//! Identity data shapes.
//!
//! - [`IdentityConfig`]: loose construction input; every field optional on
//!   the wire so that missing fields become validation failures rather
//!   than deserialization errors.
//! - [`ValidatedConfig`]: the output of [`IdentityConfig::validate`], the
//!   one place where required fields are checked and defaults applied.
//! - [`IdentityRecord`]: the persisted/export form, private key included.
//! - [`PublicIdentity`]: the record without a private-key field.
//! - [`IdentityPresent`]: DID, public key, and credential only.
//!
//! The last two never declare a private-key field, so no code path can put
//! one there.

use crate::config::PROVIDER_DID_KEY;
use crate::credential::VerifiableCredential;
use crate::crypto::SecretHex;
use crate::outcome::{Failure, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Free-form identity metadata. Keys are unique; ordering is irrelevant
/// but serialization is sorted.
pub type Metadata = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// IdentityConfig
// ---------------------------------------------------------------------------

/// Input to [`Identity::create`](super::Identity::create).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    pub alias: Option<String>,
    pub did: Option<String>,
    pub public_key_hex: Option<String>,
    pub private_key_hex: Option<SecretHex>,
    pub kid: Option<String>,
    pub provider: Option<String>,
    pub credential: Option<VerifiableCredential>,
    pub metadata: Option<Metadata>,
    pub created_at: Option<DateTime<Utc>>,
}

impl IdentityConfig {
    /// A config with the four required fields set.
    pub fn new(
        alias: impl Into<String>,
        did: impl Into<String>,
        public_key_hex: impl Into<String>,
        private_key_hex: impl Into<SecretHex>,
    ) -> Self {
        Self {
            alias: Some(alias.into()),
            did: Some(did.into()),
            public_key_hex: Some(public_key_hex.into()),
            private_key_hex: Some(private_key_hex.into()),
            ..Self::default()
        }
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_credential(mut self, credential: VerifiableCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Check required fields and apply defaults.
    ///
    /// `alias`, `did`, `publicKeyHex`, and `privateKeyHex` must be present
    /// and non-blank; every missing one is named in the failure. The first
    /// three are stored trimmed, as `generate` does for the alias. Defaults:
    /// `kid` = public-key hex, `provider` = `did:key`, `metadata` = empty,
    /// `createdAt` = now.
    pub fn validate(self) -> Outcome<ValidatedConfig> {
        let mut missing = Vec::new();
        let alias = present(self.alias, "alias", &mut missing);
        let did = present(self.did, "did", &mut missing);
        let public_key_hex = present(self.public_key_hex, "publicKeyHex", &mut missing);
        let private_key_hex = self.private_key_hex.filter(|s| !s.is_empty());
        if private_key_hex.is_none() {
            missing.push("privateKeyHex");
        }

        let (Some(alias), Some(did), Some(public_key_hex), Some(private_key_hex)) =
            (alias, did, public_key_hex, private_key_hex)
        else {
            return Err(missing_fields(&missing));
        };

        let kid = self
            .kid
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| public_key_hex.clone());
        let provider = self
            .provider
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| PROVIDER_DID_KEY.to_string());

        Ok(ValidatedConfig {
            alias,
            did,
            kid,
            public_key_hex,
            private_key_hex,
            provider,
            credential: self.credential,
            metadata: self.metadata.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

fn present(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value.is_none() {
        missing.push(field);
    }
    value
}

pub(crate) fn missing_fields(missing: &[&str]) -> Failure {
    Failure::validation(format!(
        "missing required field(s): {}",
        missing.join(", ")
    ))
    .with_context(json!({ "missing": missing }))
}

impl From<IdentityRecord> for IdentityConfig {
    fn from(record: IdentityRecord) -> Self {
        Self {
            alias: Some(record.alias),
            did: Some(record.did),
            public_key_hex: Some(record.public_key_hex),
            private_key_hex: record.private_key_hex,
            kid: Some(record.kid),
            provider: Some(record.provider),
            credential: record.credential,
            metadata: Some(record.metadata),
            created_at: Some(record.created_at),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidatedConfig
// ---------------------------------------------------------------------------

/// A config that passed validation, with every default filled in.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    alias: String,
    did: String,
    kid: String,
    public_key_hex: String,
    private_key_hex: SecretHex,
    provider: String,
    credential: Option<VerifiableCredential>,
    metadata: Metadata,
    created_at: DateTime<Utc>,
}

impl ValidatedConfig {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    pub fn private_key_hex(&self) -> &SecretHex {
        &self.private_key_hex
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn credential(&self) -> Option<&VerifiableCredential> {
        self.credential.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn into_record(self) -> IdentityRecord {
        IdentityRecord {
            alias: self.alias,
            did: self.did,
            kid: self.kid,
            public_key_hex: self.public_key_hex,
            private_key_hex: Some(self.private_key_hex),
            provider: self.provider,
            credential: self.credential,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Persisted form of an identity. Store it keyed by `did`; reload it with
/// `Identity::create(record.into())`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub alias: String,
    pub did: String,
    pub kid: String,
    pub public_key_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_hex: Option<SecretHex>,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<VerifiableCredential>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl IdentityRecord {
    /// Drop the private key.
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            alias: self.alias.clone(),
            did: self.did.clone(),
            kid: self.kid.clone(),
            public_key_hex: self.public_key_hex.clone(),
            provider: self.provider.clone(),
            credential: self.credential.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }

    pub fn to_present(&self) -> IdentityPresent {
        IdentityPresent {
            did: self.did.clone(),
            public_key_hex: self.public_key_hex.clone(),
            credential: self.credential.clone(),
        }
    }
}

/// An identity record with no private-key field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub alias: String,
    pub did: String,
    pub kid: String,
    pub public_key_hex: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<VerifiableCredential>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// The narrow shape shared where alias, metadata, and key ids are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPresent {
    pub did: String,
    pub public_key_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<VerifiableCredential>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;

    fn full() -> IdentityConfig {
        IdentityConfig::new("alice", "did:key:z6Mk", "ab".repeat(32), "cd".repeat(32))
    }

    #[test]
    fn defaults_are_applied() {
        let v = full().validate().unwrap();
        assert_eq!(v.kid(), "ab".repeat(32));
        assert_eq!(v.provider(), "did:key");
        assert!(v.metadata().is_empty());
        assert!(v.credential().is_none());
        assert!(v.created_at() <= Utc::now());
    }

    #[test]
    fn explicit_values_are_kept() {
        let mut meta = Metadata::new();
        meta.insert("role".into(), json!("admin"));
        let at = Utc::now() - chrono::Duration::days(3);
        let v = full()
            .with_kid("key-1")
            .with_provider("did:web")
            .with_metadata(meta.clone())
            .with_created_at(at)
            .validate()
            .unwrap();
        assert_eq!(v.kid(), "key-1");
        assert_eq!(v.provider(), "did:web");
        assert_eq!(v.metadata(), &meta);
        assert_eq!(v.created_at(), at);
    }

    #[test]
    fn required_strings_are_stored_trimmed() {
        let mut config = full();
        config.alias = Some("  bob ".into());
        config.did = Some(" did:key:z6Mk\n".into());
        let v = config.validate().unwrap();
        assert_eq!(v.alias(), "bob");
        assert_eq!(v.did(), "did:key:z6Mk");
    }

    #[test]
    fn blank_optional_values_fall_back_to_defaults() {
        let v = full().with_kid("  ").with_provider("").validate().unwrap();
        assert_eq!(v.kid(), v.public_key_hex());
        assert_eq!(v.provider(), "did:key");
    }

    #[test]
    fn each_required_field_is_enforced() {
        let cases: [(&str, fn(&mut IdentityConfig)); 4] = [
            ("alias", |c| c.alias = None),
            ("did", |c| c.did = Some("   ".into())),
            ("publicKeyHex", |c| c.public_key_hex = None),
            ("privateKeyHex", |c| c.private_key_hex = Some(SecretHex::new(""))),
        ];
        for (field, strip) in cases {
            let mut config = full();
            strip(&mut config);
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), FailureKind::Validation);
            assert!(err.message().contains(field), "{} not named in: {}", field, err);
            assert_eq!(err.context().unwrap()["missing"], json!([field]));
        }
    }

    #[test]
    fn all_missing_fields_are_named() {
        let config = IdentityConfig {
            alias: Some("x".into()),
            provider: Some("did:key".into()),
            ..IdentityConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.context().unwrap()["missing"],
            json!(["did", "publicKeyHex", "privateKeyHex"])
        );
    }

    #[test]
    fn config_deserializes_camel_case_with_missing_fields() {
        let config: IdentityConfig =
            serde_json::from_value(json!({ "alias": "x", "provider": "did:key" })).unwrap();
        assert_eq!(config.alias.as_deref(), Some("x"));
        assert!(config.public_key_hex.is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn public_shapes_never_carry_private_key() {
        let record = full().validate().unwrap().into_record();
        let public = serde_json::to_value(record.to_public()).unwrap();
        let present = serde_json::to_value(record.to_present()).unwrap();
        for v in [&public, &present] {
            assert!(v.get("privateKeyHex").is_none());
            assert!(!v.to_string().contains(&"cd".repeat(32)));
        }
        assert_eq!(present.as_object().unwrap().len(), 2);
    }

    #[test]
    fn record_round_trips_into_config() {
        let record = full().with_kid("k").validate().unwrap().into_record();
        let back = IdentityConfig::from(record.clone()).validate().unwrap().into_record();
        assert_eq!(back, record);
    }
}
