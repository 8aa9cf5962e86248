//! Signature encodings, and the "low-S" rule.
//!
//! For every ECDSA signature `(r, s)`, `(r, order - s)` verifies too. The AT
//! Protocol wants exactly one valid signature per key and message, so it only
//! accepts the form where `s <= order / 2`, as described in
//! [BIP-0062](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#low-s-values-in-signatures).

use std::fmt::Display;

use crate::{
	crypto::EcdsaCurve,
	error::{Error, Result},
	key_algos, KeyAlgo,
};

/// How a signature is laid out in bytes.
#[derive(Debug, Default, Eq, PartialEq, Hash, Clone, Copy)]
pub enum SignatureEncoding {
	/// Fixed width big-endian `r‖s`, 64 bytes for both curves. This is the
	/// only encoding the AT Protocol itself uses.
	#[default]
	Raw,
	/// ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`.
	Der,
}

impl SignatureEncoding {
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Raw => "raw",
			Self::Der => "DER",
		}
	}
}

impl Display for SignatureEncoding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.name().fmt(f)
	}
}

/// Whether `sig` already satisfies the low-S rule.
pub fn is_low_s(
	algo: KeyAlgo,
	sig: &[u8],
	encoding: SignatureEncoding,
) -> Result<bool> {
	match algo {
		KeyAlgo::P256 => is_low_s_inner::<key_algos::P256>(sig, encoding),
		KeyAlgo::Secp256k1 => is_low_s_inner::<key_algos::Secp256k1>(sig, encoding),
	}
}

/// Replaces a high `s` with `order - s`. `r` and low-S signatures are left
/// untouched. The output has the same encoding as the input.
pub fn to_low_s(
	algo: KeyAlgo,
	sig: &[u8],
	encoding: SignatureEncoding,
) -> Result<Vec<u8>> {
	match algo {
		KeyAlgo::P256 => to_low_s_inner::<key_algos::P256>(sig, encoding),
		KeyAlgo::Secp256k1 => to_low_s_inner::<key_algos::Secp256k1>(sig, encoding),
	}
}

/// Converts a raw `r‖s` signature to DER.
pub fn to_der(algo: KeyAlgo, raw: &[u8]) -> Result<Vec<u8>> {
	reencode(algo, raw, SignatureEncoding::Raw, SignatureEncoding::Der)
}

/// Converts a DER signature to raw `r‖s`.
pub fn from_der(algo: KeyAlgo, der: &[u8]) -> Result<Vec<u8>> {
	reencode(algo, der, SignatureEncoding::Der, SignatureEncoding::Raw)
}

fn reencode(
	algo: KeyAlgo,
	sig: &[u8],
	from: SignatureEncoding,
	to: SignatureEncoding,
) -> Result<Vec<u8>> {
	fn inner<C: EcdsaCurve>(
		sig: &[u8],
		from: SignatureEncoding,
		to: SignatureEncoding,
	) -> Result<Vec<u8>> {
		let sig = decode_signature::<C>(sig, from)?;
		Ok(C::signature_to_bytes(&sig, to))
	}
	match algo {
		KeyAlgo::P256 => inner::<key_algos::P256>(sig, from, to),
		KeyAlgo::Secp256k1 => inner::<key_algos::Secp256k1>(sig, from, to),
	}
}

// ---- internal code ----

pub(crate) fn decode_signature<C: EcdsaCurve>(
	sig: &[u8],
	encoding: SignatureEncoding,
) -> Result<C::Signature> {
	C::signature_from_bytes(sig, encoding)
		.ok_or(Error::InvalidSignature { encoding })
}

pub(crate) fn low_s<C: EcdsaCurve>(sig: C::Signature) -> C::Signature {
	if !C::is_high_s(&sig) {
		return sig;
	}
	// Negating a nonzero scalar can't give zero, so this always succeeds.
	C::negate_s(&sig).unwrap_or(sig)
}

fn is_low_s_inner<C: EcdsaCurve>(
	sig: &[u8],
	encoding: SignatureEncoding,
) -> Result<bool> {
	let sig = decode_signature::<C>(sig, encoding)?;
	Ok(!C::is_high_s(&sig))
}

fn to_low_s_inner<C: EcdsaCurve>(
	sig: &[u8],
	encoding: SignatureEncoding,
) -> Result<Vec<u8>> {
	let sig = decode_signature::<C>(sig, encoding)?;
	Ok(C::signature_to_bytes(&low_s::<C>(sig), encoding))
}

/// Flips a low-S signature into its high-S twin.
#[cfg(test)]
pub(crate) fn to_high_s(algo: KeyAlgo, raw: &[u8]) -> Vec<u8> {
	fn inner<C: EcdsaCurve>(raw: &[u8]) -> Vec<u8> {
		let sig = decode_signature::<C>(raw, SignatureEncoding::Raw)
			.expect("valid raw signature");
		assert!(!C::is_high_s(&sig), "expected a low-S input");
		let high = C::negate_s(&sig).expect("nonzero s");
		C::signature_to_bytes(&high, SignatureEncoding::Raw)
	}
	match algo {
		KeyAlgo::P256 => inner::<key_algos::P256>(raw),
		KeyAlgo::Secp256k1 => inner::<key_algos::Secp256k1>(raw),
	}
}
