//! # Identity Constants
//!
//! Every identifier, context URI, and capability name used by SOVID lives
//! here. Persisted identity records and issued credentials embed several of
//! these strings, so changing one is a data migration, not a refactor.

use crate::crypto::keys::KeyType;

// ---------------------------------------------------------------------------
// DID Method
// ---------------------------------------------------------------------------

/// Scheme prefix shared by every DID, regardless of method.
pub const DID_SCHEME: &str = "did";

/// The only DID method this crate can derive and resolve locally.
pub const DID_METHOD_KEY: &str = "key";

/// Provider tag recorded on identities whose DID is a `did:key`.
pub const PROVIDER_DID_KEY: &str = "did:key";

/// Multibase prefix for base58btc. `did:key` identifiers and Ed25519 proof
/// values both use it.
pub const MULTIBASE_BASE58BTC: char = 'z';

/// Multicodec varint prefix for an Ed25519 public key (`0xed` as LEB128).
pub const MULTICODEC_ED25519_PUB: [u8; 2] = [0xed, 0x01];

/// Context URI for the W3C DID Core specification.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Context URI for the Ed25519 2020 verification suite.
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// Verification method type for Ed25519 public keys.
pub const VERIFICATION_KEY_TYPE: &str = "Ed25519VerificationKey2020";

// ---------------------------------------------------------------------------
// Key Material
// ---------------------------------------------------------------------------

/// Ed25519 secret key length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Key type assumed for reconstructed identities. Records do not carry one.
pub const DEFAULT_KEY_TYPE: KeyType = KeyType::Ed25519;

// ---------------------------------------------------------------------------
// Verifiable Credentials
// ---------------------------------------------------------------------------

/// Context URI for the W3C Verifiable Credentials data model v1.
pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Base type carried by every credential.
pub const VC_BASE_TYPE: &str = "VerifiableCredential";

/// Type of the self-attesting credential issued by `Identity::generate`.
pub const IDENTITY_CREDENTIAL_TYPE: &str = "IdentityCredential";

/// Proof suite used for every credential this crate signs.
pub const PROOF_TYPE: &str = "Ed25519Signature2020";

/// Proof purpose for issuer assertions.
pub const PROOF_PURPOSE: &str = "assertionMethod";

// ---------------------------------------------------------------------------
// Capability Namespaces
// ---------------------------------------------------------------------------

/// Namespace of the signer's teaching contract.
pub const SIGNER_NAMESPACE: &str = "signer";

/// Namespace of the public-key handle's teaching contract.
pub const KEY_NAMESPACE: &str = "key";

/// Namespace of the credential component's teaching contract.
pub const CREDENTIAL_NAMESPACE: &str = "credential";

/// Operation names. Joined with a namespace as `namespace.operation`.
pub const OP_SIGN: &str = "sign";
pub const OP_VERIFY: &str = "verify";
pub const OP_ISSUE: &str = "issue";

/// Fully-qualified capability names consulted by `Identity`.
pub const CAP_SIGNER_SIGN: &str = "signer.sign";
pub const CAP_SIGNER_VERIFY: &str = "signer.verify";
pub const CAP_CREDENTIAL_ISSUE: &str = "credential.issue";
pub const CAP_CREDENTIAL_VERIFY: &str = "credential.verify";

/// Capability the credential component signs through.
pub const CAP_KEY_SIGN: &str = "key.sign";

/// Joins a namespace and an operation into a capability name.
pub fn capability_name(namespace: &str, operation: &str) -> String {
    format!("{}.{}", namespace, operation)
}
