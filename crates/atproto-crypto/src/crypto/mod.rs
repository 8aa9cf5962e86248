//! ECDSA over the curves in [`KeyAlgo`]. Messages are always hashed with
//! SHA-256, and nonces are derived deterministically (RFC 6979).
//!
//! Nothing here keeps signer state between calls. Every operation builds what
//! it needs from the key it is given, so all of it is safe to call from many
//! threads at once, and operations on different curves never contend.

mod es256;
mod es256k;

use std::fmt::Debug;

use tracing::trace;
use zeroize::Zeroizing;

use crate::{
	canonical::{self, SignatureEncoding},
	error::{Error, Result},
	key_algos::{self, StaticKeyAlgo},
	KeyAlgo,
};

/// Options for producing and checking signatures.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub struct SigOpts {
	pub encoding: SignatureEncoding,
	/// When signing, normalize `s` to its low form. When verifying, treat a
	/// high-S signature as invalid.
	pub low_s: bool,
}

impl SigOpts {
	/// Raw `r‖s` with low-S enforced, which is what the AT Protocol requires.
	pub const CANONICAL: Self = Self {
		encoding: SignatureEncoding::Raw,
		low_s: true,
	};

	pub const fn with_encoding(self, encoding: SignatureEncoding) -> Self {
		Self { encoding, ..self }
	}

	/// Accept (or produce) either `s`.
	pub const fn allow_high_s(self) -> Self {
		Self {
			low_s: false,
			..self
		}
	}
}

impl Default for SigOpts {
	fn default() -> Self {
		Self::CANONICAL
	}
}

/// A native private key from one of the curve crates, for interop with code
/// that already has one.
#[derive(Clone)]
pub enum KeyHandle {
	P256(p256::SecretKey),
	Secp256k1(k256::SecretKey),
}

impl From<p256::SecretKey> for KeyHandle {
	fn from(value: p256::SecretKey) -> Self {
		Self::P256(value)
	}
}

impl From<k256::SecretKey> for KeyHandle {
	fn from(value: k256::SecretKey) -> Self {
		Self::Secp256k1(value)
	}
}

/// A private scalar on one of the supported curves. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(SigningInner);

#[derive(Clone)]
enum SigningInner {
	P256(p256::ecdsa::SigningKey),
	Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKey {
	/// Picks a uniformly random scalar in `[1, order - 1]` from the OS CSPRNG.
	pub fn generate(algo: KeyAlgo) -> Self {
		let inner = match algo {
			KeyAlgo::P256 => SigningInner::P256(key_algos::P256::random_signing_key()),
			KeyAlgo::Secp256k1 => {
				SigningInner::Secp256k1(key_algos::Secp256k1::random_signing_key())
			}
		};
		trace!(%algo, "generated private key");
		Self(inner)
	}

	/// Imports a big-endian unsigned scalar. Inputs shorter than 32 bytes are
	/// treated as having leading zeros. Fails with [`Error::InvalidKey`] if the
	/// scalar is zero or not below the curve order. Leading zero bytes are
	/// ignored, so a 33 byte input with a zero sign byte is fine.
	pub fn from_scalar(algo: KeyAlgo, bytes: &[u8]) -> Result<Self> {
		let invalid = Error::InvalidKey { algo };
		// big-endian, so leading zeros (like a sign byte) don't change the value
		let leading = bytes.iter().take_while(|b| **b == 0).count();
		let bytes = &bytes[leading..];
		if bytes.is_empty() || bytes.len() > 32 {
			return Err(invalid);
		}
		let mut padded = Zeroizing::new([0u8; 32]);
		padded[32 - bytes.len()..].copy_from_slice(bytes);
		let inner = match algo {
			KeyAlgo::P256 => key_algos::P256::signing_key_from_scalar(&padded)
				.map(SigningInner::P256),
			KeyAlgo::Secp256k1 => {
				key_algos::Secp256k1::signing_key_from_scalar(&padded)
					.map(SigningInner::Secp256k1)
			}
		};
		inner.map(Self).ok_or(invalid)
	}

	/// Imports a PKCS#8 DER encoded private key, which must be for `algo`.
	pub fn from_pkcs8_der(algo: KeyAlgo, der: &[u8]) -> Result<Self> {
		let inner = match algo {
			KeyAlgo::P256 => key_algos::P256::signing_key_from_pkcs8(der)
				.map(SigningInner::P256),
			KeyAlgo::Secp256k1 => key_algos::Secp256k1::signing_key_from_pkcs8(der)
				.map(SigningInner::Secp256k1),
		};
		inner.map(Self).ok_or(Error::InvalidKey { algo })
	}

	pub fn algo(&self) -> KeyAlgo {
		match self.0 {
			SigningInner::P256(_) => KeyAlgo::P256,
			SigningInner::Secp256k1(_) => KeyAlgo::Secp256k1,
		}
	}

	/// Computes `scalar * G`.
	pub fn public_key(&self) -> PublicKey {
		let inner = match &self.0 {
			SigningInner::P256(key) => {
				VerifyingInner::P256(key_algos::P256::verifying_key(key))
			}
			SigningInner::Secp256k1(key) => {
				VerifyingInner::Secp256k1(key_algos::Secp256k1::verifying_key(key))
			}
		};
		PublicKey::from_inner(inner)
	}

	/// Signs the SHA-256 digest of `msg`.
	pub fn sign(&self, msg: &[u8], opts: SigOpts) -> Vec<u8> {
		match &self.0 {
			SigningInner::P256(key) => sign_with::<key_algos::P256>(key, msg, opts),
			SigningInner::Secp256k1(key) => {
				sign_with::<key_algos::Secp256k1>(key, msg, opts)
			}
		}
	}

	/// The scalar as 32 big-endian bytes.
	pub fn to_scalar_bytes(&self) -> Zeroizing<[u8; 32]> {
		match &self.0 {
			SigningInner::P256(key) => key_algos::P256::scalar_bytes(key),
			SigningInner::Secp256k1(key) => key_algos::Secp256k1::scalar_bytes(key),
		}
	}

	/// The key as PKCS#8 DER.
	pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
		let der = match &self.0 {
			SigningInner::P256(key) => key_algos::P256::signing_key_to_pkcs8(key),
			SigningInner::Secp256k1(key) => {
				key_algos::Secp256k1::signing_key_to_pkcs8(key)
			}
		};
		der.ok_or(Error::InvalidKey { algo: self.algo() })
	}
}

impl From<KeyHandle> for PrivateKey {
	fn from(value: KeyHandle) -> Self {
		Self(match value {
			KeyHandle::P256(secret) => {
				SigningInner::P256(p256::ecdsa::SigningKey::from(secret))
			}
			KeyHandle::Secp256k1(secret) => {
				SigningInner::Secp256k1(k256::ecdsa::SigningKey::from(secret))
			}
		})
	}
}

impl Debug for PrivateKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PrivateKey")
			.field("algo", &self.algo())
			.finish_non_exhaustive()
	}
}

/// A public key that is known to be a valid point on its curve.
#[derive(Clone)]
pub struct PublicKey {
	inner: VerifyingInner,
	/// SEC1 compressed form.
	compressed: Vec<u8>,
}

#[derive(Clone)]
enum VerifyingInner {
	P256(p256::ecdsa::VerifyingKey),
	Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
	/// Accepts SEC1 compressed or uncompressed points. Fails with
	/// [`Error::InvalidKey`] if the bytes aren't a point on the curve.
	pub fn from_sec1_bytes(algo: KeyAlgo, bytes: &[u8]) -> Result<Self> {
		let inner = match algo {
			KeyAlgo::P256 => key_algos::P256::verifying_key_from_sec1(bytes)
				.map(VerifyingInner::P256),
			KeyAlgo::Secp256k1 => key_algos::Secp256k1::verifying_key_from_sec1(bytes)
				.map(VerifyingInner::Secp256k1),
		};
		inner
			.map(Self::from_inner)
			.ok_or(Error::InvalidKey { algo })
	}

	fn from_inner(inner: VerifyingInner) -> Self {
		let compressed = match &inner {
			VerifyingInner::P256(key) => key_algos::P256::compressed_point(key),
			VerifyingInner::Secp256k1(key) => {
				key_algos::Secp256k1::compressed_point(key)
			}
		};
		Self { inner, compressed }
	}

	pub fn algo(&self) -> KeyAlgo {
		match self.inner {
			VerifyingInner::P256(_) => KeyAlgo::P256,
			VerifyingInner::Secp256k1(_) => KeyAlgo::Secp256k1,
		}
	}

	/// The SEC1 compressed point.
	pub fn as_bytes(&self) -> &[u8] {
		&self.compressed
	}

	/// Checks `sig` against the SHA-256 digest of `msg`.
	///
	/// A well formed signature that doesn't match gives `Ok(false)`, as does a
	/// high-S signature when `opts.low_s` is set. A signature that can't be
	/// decoded with `opts.encoding` is an [`Error::InvalidSignature`].
	pub fn verify(&self, msg: &[u8], sig: &[u8], opts: SigOpts) -> Result<bool> {
		match &self.inner {
			VerifyingInner::P256(key) => {
				verify_with::<key_algos::P256>(key, msg, sig, opts)
			}
			VerifyingInner::Secp256k1(key) => {
				verify_with::<key_algos::Secp256k1>(key, msg, sig, opts)
			}
		}
	}
}

impl PartialEq for PublicKey {
	fn eq(&self, other: &Self) -> bool {
		self.algo() == other.algo() && self.compressed == other.compressed
	}
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.algo().hash(state);
		self.compressed.hash(state);
	}
}

impl Debug for PublicKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PublicKey")
			.field("algo", &self.algo())
			.field("compressed", &hex::encode(&self.compressed))
			.finish()
	}
}

/// Generates a fresh keypair for `algo`.
pub fn generate(algo: KeyAlgo) -> (PrivateKey, PublicKey) {
	let private = PrivateKey::generate(algo);
	let public = private.public_key();
	(private, public)
}

/// Derives the public key of `private`.
pub fn derive_public(private: &PrivateKey) -> PublicKey {
	private.public_key()
}

/// Signs the SHA-256 digest of `msg`.
pub fn sign(private: &PrivateKey, msg: &[u8], opts: SigOpts) -> Vec<u8> {
	private.sign(msg, opts)
}

/// Verifies `sig` over `msg` with a SEC1 encoded public key for `algo`.
pub fn verify(
	algo: KeyAlgo,
	public_key: &[u8],
	msg: &[u8],
	sig: &[u8],
	opts: SigOpts,
) -> Result<bool> {
	PublicKey::from_sec1_bytes(algo, public_key)?.verify(msg, sig, opts)
}

// ---- internal code ----

/// The primitives each curve provides. Everything else is written once,
/// generically, on top of these.
pub(crate) trait EcdsaCurve: StaticKeyAlgo {
	type SigningKey: Clone;
	type VerifyingKey: Clone;
	type Signature: Clone;

	fn random_signing_key() -> Self::SigningKey;
	fn signing_key_from_scalar(scalar: &[u8; 32]) -> Option<Self::SigningKey>;
	fn signing_key_from_pkcs8(der: &[u8]) -> Option<Self::SigningKey>;
	fn scalar_bytes(key: &Self::SigningKey) -> Zeroizing<[u8; 32]>;
	fn signing_key_to_pkcs8(key: &Self::SigningKey) -> Option<Zeroizing<Vec<u8>>>;
	fn verifying_key(key: &Self::SigningKey) -> Self::VerifyingKey;
	fn verifying_key_from_sec1(bytes: &[u8]) -> Option<Self::VerifyingKey>;
	fn compressed_point(key: &Self::VerifyingKey) -> Vec<u8>;
	fn sign_sha256(key: &Self::SigningKey, msg: &[u8]) -> Self::Signature;
	fn verify_sha256(
		key: &Self::VerifyingKey,
		msg: &[u8],
		sig: &Self::Signature,
	) -> bool;
	fn signature_from_bytes(
		bytes: &[u8],
		encoding: SignatureEncoding,
	) -> Option<Self::Signature>;
	fn signature_to_bytes(sig: &Self::Signature, encoding: SignatureEncoding)
		-> Vec<u8>;
	fn is_high_s(sig: &Self::Signature) -> bool;
	/// `(r, s) -> (r, order - s)`
	fn negate_s(sig: &Self::Signature) -> Option<Self::Signature>;
}

fn sign_with<C: EcdsaCurve>(key: &C::SigningKey, msg: &[u8], opts: SigOpts) -> Vec<u8> {
	let sig = C::sign_sha256(key, msg);
	let sig = if opts.low_s {
		canonical::low_s::<C>(sig)
	} else {
		sig
	};
	C::signature_to_bytes(&sig, opts.encoding)
}

fn verify_with<C: EcdsaCurve>(
	key: &C::VerifyingKey,
	msg: &[u8],
	sig: &[u8],
	opts: SigOpts,
) -> Result<bool> {
	let mut sig = canonical::decode_signature::<C>(sig, opts.encoding)?;
	if C::is_high_s(&sig) {
		if opts.low_s {
			trace!(algo = %C::ALGO, "rejected high-S signature");
			return Ok(false);
		}
		// Both forms verify or neither does, and not every backend accepts
		// the high one.
		sig = canonical::low_s::<C>(sig);
	}
	Ok(C::verify_sha256(key, msg, &sig))
}
