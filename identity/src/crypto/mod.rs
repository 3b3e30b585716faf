//! # Cryptographic Components
//!
//! Ed25519 everywhere, through `ed25519-dalek`. Nothing here implements a
//! primitive; it is key encoding plus two thin components:
//!
//! - **keys**: generation and hex <-> PEM conversion.
//! - **signer**: owns the private key; signs and verifies.
//! - **key_handle**: the public-key handle; verifies always, signs when
//!   backed by a signer.

pub mod key_handle;
pub mod keys;
pub mod signer;

pub use key_handle::KeyHandle;
pub use keys::{generate_key_pair, KeyError, KeyPairHex, KeyType, PrivateKeyPem, SecretHex};
pub use signer::Signer;
