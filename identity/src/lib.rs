//! # SOVID: Self-Sovereign Identity Core
//!
//! An identity here is a key pair, the `did:key` that key derives, and a
//! self-issued credential binding the two. Nothing is stored on a server;
//! the holder keeps the record and rebuilds the identity from it.
//!
//! ## Architecture
//!
//! - **identity**: The composite. Bootstrap, reconstruction, projections.
//! - **crypto**: Ed25519 keys, the signer, and the key handle.
//! - **did**: `did:key` derivation, resolution, and DID documents.
//! - **credential**: W3C-shaped verifiable credentials and their issuer.
//! - **capability**: Teaching contracts and the registry components learn
//!   into. This is how an identity delegates and how callers override.
//! - **outcome**: The single failure envelope every operation returns.
//! - **logging**: Subscriber setup for binaries and tests.
//! - **config**: Protocol constants and capability names.
//!
//! ## Quick look
//!
//! ```no_run
//! use sovid::Identity;
//!
//! let alice = Identity::generate("alice")?;
//! let sig = alice.sign(b"hello")?;
//! assert!(alice.verify(b"hello", &sig)?);
//!
//! // Persist, then come back later.
//! let again = Identity::create(alice.to_domain().into())?;
//! assert_eq!(again.did(), alice.did());
//! # Ok::<(), sovid::Failure>(())
//! ```

pub mod capability;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod did;
pub mod identity;
pub mod logging;
pub mod outcome;

pub use capability::{Capability, CapabilityRegistry, Teach, TeachingContract};
pub use credential::{CredentialIssuer, CredentialProof, IssueRequest, VerifiableCredential};
pub use did::{DidDocument, DidHandle};
pub use identity::{
    Identity, IdentityConfig, IdentityDescription, IdentityPresent, IdentityRecord,
    PublicIdentity,
};
pub use outcome::{Failure, FailureKind, Outcome, OutcomeExt};
