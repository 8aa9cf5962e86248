//! An implementation of the [did:key] method, restricted to the curves the AT
//! Protocol allows.
//!
//! A did:key is `did:key:` followed by a multibase string. The only base we
//! accept is base58-btc (identified by a leading `z`), and the decoded bytes
//! are a multicodec prefix followed by a SEC1 compressed public key:
//!
//! ```text
//! did:key:z<base58(prefix ‖ compressed point)>
//! ```
//!
//! [did:key]: https://w3c-ccg.github.io/did-method-key/

use std::{fmt::Display, str::FromStr};

use tracing::trace;

use crate::{
	base58,
	crypto::{PublicKey, SigOpts},
	error::{Error, Result},
	signer::Verifier,
	KeyAlgo,
};

const MULTIBASE_BASE58_BTC: &str = "z";

/// A parsed and validated did:key. See the [module](self) docs for more info.
#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub struct DidKey {
	/// The string representation of the DID.
	s: String,
	key: PublicKey,
}

impl DidKey {
	pub const PREFIX: &'static str = "did:key:";

	pub fn from_public_key(key: PublicKey) -> Self {
		let s = format!("{}{}", Self::PREFIX, format_multikey_inner(&key));
		Self { s, key }
	}

	/// Gets the did:key uri as a str.
	pub fn as_str(&self) -> &str {
		&self.s
	}

	pub fn algo(&self) -> KeyAlgo {
		self.key.algo()
	}

	pub fn public_key(&self) -> &PublicKey {
		&self.key
	}

	/// The multibase portion, everything after `did:key:`.
	pub fn multikey(&self) -> &str {
		&self.s[Self::PREFIX.len()..]
	}
}

impl FromStr for DidKey {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let multikey = s.strip_prefix(Self::PREFIX).ok_or(Error::InvalidPrefix {
			expected: Self::PREFIX,
		})?;
		let key = decode_multikey(multikey)?;
		// Re-encode rather than keep `s`, so that equal keys give equal DIDs.
		Ok(Self::from_public_key(key))
	}
}

impl Display for DidKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.as_str().fmt(f)
	}
}

impl From<PublicKey> for DidKey {
	fn from(value: PublicKey) -> Self {
		Self::from_public_key(value)
	}
}

impl Verifier for DidKey {
	fn verify_with(&self, msg: &[u8], sig: &[u8], opts: SigOpts) -> Result<bool> {
		self.key.verify(msg, sig, opts)
	}
}

/// Formats a SEC1 public key (compressed or not) as a did:key. The output
/// always uses the compressed point.
pub fn format_did_key(algo: KeyAlgo, public_key: &[u8]) -> Result<String> {
	let key = PublicKey::from_sec1_bytes(algo, public_key)?;
	Ok(DidKey::from_public_key(key).s)
}

/// Parses a did:key into its algorithm and SEC1 compressed public key.
pub fn parse_did_key(did: &str) -> Result<(KeyAlgo, Vec<u8>)> {
	let did = DidKey::from_str(did)?;
	Ok((did.algo(), did.key.as_bytes().to_vec()))
}

/// Like [`format_did_key`], but without the `did:key:` prefix. This is the
/// form that appears in the `publicKeyMultibase` of a verification method.
pub fn format_multikey(algo: KeyAlgo, public_key: &[u8]) -> Result<String> {
	let key = PublicKey::from_sec1_bytes(algo, public_key)?;
	Ok(format_multikey_inner(&key))
}

/// Like [`parse_did_key`], but without the `did:key:` prefix.
pub fn parse_multikey(multikey: &str) -> Result<(KeyAlgo, Vec<u8>)> {
	let key = decode_multikey(multikey)?;
	Ok((key.algo(), key.as_bytes().to_vec()))
}

/// Verifies `sig` over `msg` with the key that `did` encodes.
pub fn verify_did_signature(
	did: &str,
	msg: &[u8],
	sig: &[u8],
	opts: SigOpts,
) -> Result<bool> {
	let did = DidKey::from_str(did)?;
	let verified = did.verify_with(msg, sig, opts)?;
	trace!(%did, verified, "checked signature");
	Ok(verified)
}

fn format_multikey_inner(key: &PublicKey) -> String {
	let algo = key.algo();
	let mut bytes = Vec::with_capacity(2 + key.as_bytes().len());
	bytes.extend_from_slice(&algo.did_prefix());
	bytes.extend_from_slice(key.as_bytes());
	format!("{MULTIBASE_BASE58_BTC}{}", base58::encode(bytes))
}

fn decode_multikey(multikey: &str) -> Result<PublicKey> {
	let encoded = multikey.strip_prefix(MULTIBASE_BASE58_BTC).ok_or(
		Error::InvalidPrefix {
			expected: MULTIBASE_BASE58_BTC,
		},
	)?;
	let decoded = base58::decode(encoded)?;
	let Some(algo) = KeyAlgo::from_multikey(&decoded) else {
		return Err(Error::UnsupportedKeyType {
			codec: KeyAlgo::read_multicodec(&decoded),
		});
	};
	let point = algo
		.strip_prefix(&decoded)
		.ok_or(Error::InvalidKey { algo })?;
	PublicKey::from_sec1_bytes(algo, point)
}
