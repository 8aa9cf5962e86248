//! Signing keys and `did:key` identifiers for the [AT Protocol][atproto].
//!
//! The AT Protocol identifies the signing key of an account with a
//! [did:key][did-key], and permits exactly two curves for it: NIST P-256 and
//! secp256k1. In both cases signatures are ECDSA over a SHA-256 digest of the
//! message. To make signatures non-malleable, the protocol additionally
//! requires the "low-S" form, see [`canonical`].
//!
//! This crate provides:
//! - [`AtKeyPair`], a keypair that knows its own did:key.
//! - [`did_key`], for turning public keys into did:keys and back.
//! - [`crypto`], the sign/verify primitives, parameterized by [`KeyAlgo`].
//! - [`base58`], the base58-btc codec did:keys are built on.
//! - With the `offload` feature (on by default), async wrappers in
//!   [`offload`] that keep signing off of the tokio executor.
//!
//! ```
//! use atproto_crypto::{AtKeyPair, KeyAlgo, Signer, Verifier};
//!
//! let pair = AtKeyPair::generate(KeyAlgo::Secp256k1, false);
//! let sig = pair.sign(b"hello");
//! assert!(atproto_crypto::did_key::verify_did_signature(
//!     pair.did(),
//!     b"hello",
//!     &sig,
//!     Default::default(),
//! ).unwrap());
//! assert!(pair.verify(b"hello", &sig).unwrap());
//! ```
//!
//! [atproto]: https://atproto.com/specs/cryptography
//! [did-key]: https://w3c-ccg.github.io/did-method-key/

#![forbid(unsafe_code)]

pub mod base58;
pub mod canonical;
pub mod crypto;
pub mod did_key;
mod error;
mod key_algos;
mod keypair;
#[cfg(feature = "offload")]
pub mod offload;
mod signer;
mod varint;

// Re-exports
pub use k256;
pub use p256;

pub use crate::canonical::SignatureEncoding;
pub use crate::crypto::{KeyHandle, PrivateKey, PublicKey, SigOpts};
pub use crate::did_key::DidKey;
pub use crate::error::{Error, Result};
pub use crate::key_algos::{KeyAlgo, UnknownAlgoError};
pub use crate::keypair::AtKeyPair;
pub use crate::signer::{Signer, Verifier};
