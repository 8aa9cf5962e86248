use std::{fmt::Display, str::FromStr};

use crate::varint::{decode_varint, encode_varint};

/// The elliptic curves that the AT Protocol permits for signing keys.
///
/// Every signature is ECDSA over a SHA-256 digest of the message, regardless
/// of the curve.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum KeyAlgo {
	/// NIST P-256, aka secp256r1. JWT name `ES256`.
	P256,
	/// secp256k1, the bitcoin curve. JWT name `ES256K`.
	Secp256k1,
}

impl KeyAlgo {
	/// Every supported algorithm.
	pub const ALL: [Self; 2] = [Self::P256, Self::Secp256k1];

	/// Length of a SEC1 compressed public key.
	pub const fn pub_key_len(&self) -> usize {
		match self {
			Self::P256 => P256::PUB_KEY_LEN,
			Self::Secp256k1 => Secp256k1::PUB_KEY_LEN,
		}
	}

	/// The multicodec code for this algorithm's public keys.
	pub const fn multicodec_value(&self) -> u16 {
		match self {
			Self::P256 => P256::MULTICODEC_VALUE,
			Self::Secp256k1 => Secp256k1::MULTICODEC_VALUE,
		}
	}

	/// The varint encoded multicodec, which prefixes the public key in a
	/// did:key multikey.
	pub const fn did_prefix(&self) -> [u8; 2] {
		match self {
			Self::P256 => P256::DID_PREFIX,
			Self::Secp256k1 => Secp256k1::DID_PREFIX,
		}
	}

	/// The JWA `alg` name of ECDSA with SHA-256 over this curve.
	pub const fn jwt_alg(&self) -> &'static str {
		match self {
			Self::P256 => P256::JWT_ALG,
			Self::Secp256k1 => Secp256k1::JWT_ALG,
		}
	}

	/// Short lowercase name.
	pub const fn name(&self) -> &'static str {
		match self {
			Self::P256 => "p256",
			Self::Secp256k1 => "k256",
		}
	}

	/// Whether `multikey` starts with this algorithm's multicodec prefix.
	pub fn prefix_matches(&self, multikey: &[u8]) -> bool {
		multikey.starts_with(&self.did_prefix())
	}

	/// Removes this algorithm's multicodec prefix from `multikey`, or returns
	/// `None` if it isn't present.
	pub fn strip_prefix<'a>(&self, multikey: &'a [u8]) -> Option<&'a [u8]> {
		multikey.strip_prefix(self.did_prefix().as_slice())
	}

	/// Finds the algorithm whose prefix matches the start of `multikey`.
	pub fn from_multikey(multikey: &[u8]) -> Option<Self> {
		Self::ALL.into_iter().find(|algo| algo.prefix_matches(multikey))
	}

	/// Reads the multicodec code at the start of `multikey`, whether or not
	/// it is supported. Used for error reporting.
	pub(crate) fn read_multicodec(multikey: &[u8]) -> Option<u16> {
		decode_varint(multikey).ok().map(|(codec, _len)| codec)
	}
}

impl Display for KeyAlgo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.name().fmt(f)
	}
}

impl FromStr for KeyAlgo {
	type Err = UnknownAlgoError;

	/// Accepts the JWT names as well as the common curve names.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"ES256" | "p256" | "P-256" | "secp256r1" => Self::P256,
			"ES256K" | "k256" | "K-256" | "secp256k1" => Self::Secp256k1,
			_ => return Err(UnknownAlgoError(s.to_owned())),
		})
	}
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
#[error("unknown key algorithm {0:?}")]
pub struct UnknownAlgoError(String);

// ---- internal code ----

/// A key algorithm that is known statically, at compile time.
pub(crate) trait StaticKeyAlgo {
	const ALGO: KeyAlgo;
	const PUB_KEY_LEN: usize;
	const MULTICODEC_VALUE: u16;
	const DID_PREFIX: [u8; 2] = encode_varint(Self::MULTICODEC_VALUE).as_pair();
	const JWT_ALG: &'static str;
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub(crate) struct P256;

impl StaticKeyAlgo for P256 {
	const ALGO: KeyAlgo = KeyAlgo::P256;
	const PUB_KEY_LEN: usize = 33;
	const MULTICODEC_VALUE: u16 = 0x1200;
	const JWT_ALG: &'static str = "ES256";
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub(crate) struct Secp256k1;

impl StaticKeyAlgo for Secp256k1 {
	const ALGO: KeyAlgo = KeyAlgo::Secp256k1;
	const PUB_KEY_LEN: usize = 33;
	const MULTICODEC_VALUE: u16 = 0xe7;
	const JWT_ALG: &'static str = "ES256K";
}

impl PartialEq<P256> for KeyAlgo {
	fn eq(&self, _other: &P256) -> bool {
		*self == KeyAlgo::P256
	}
}

impl PartialEq<Secp256k1> for KeyAlgo {
	fn eq(&self, _other: &Secp256k1) -> bool {
		*self == KeyAlgo::Secp256k1
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_prefixes() {
		assert_eq!(KeyAlgo::P256.did_prefix(), [0x80, 0x24]);
		assert_eq!(KeyAlgo::Secp256k1.did_prefix(), [0xe7, 0x01]);
		assert_ne!(KeyAlgo::P256.did_prefix(), KeyAlgo::Secp256k1.did_prefix());
	}

	#[test]
	fn test_from_multikey() {
		let mut buf = vec![0x80, 0x24];
		buf.extend_from_slice(&[2; 33]);
		assert_eq!(KeyAlgo::from_multikey(&buf), Some(KeyAlgo::P256));
		assert_eq!(KeyAlgo::P256.strip_prefix(&buf), Some([2; 33].as_slice()));
		assert_eq!(KeyAlgo::Secp256k1.strip_prefix(&buf), None);

		buf[..2].copy_from_slice(&[0xe7, 0x01]);
		assert_eq!(KeyAlgo::from_multikey(&buf), Some(KeyAlgo::Secp256k1));

		// ed25519
		buf[..2].copy_from_slice(&[0xed, 0x01]);
		assert_eq!(KeyAlgo::from_multikey(&buf), None);
		assert_eq!(KeyAlgo::read_multicodec(&buf), Some(0xed));

		assert_eq!(KeyAlgo::from_multikey(&[0x80]), None);
		assert_eq!(KeyAlgo::from_multikey(&[]), None);
	}

	#[test]
	fn test_from_str() {
		for algo in KeyAlgo::ALL {
			assert_eq!(algo.jwt_alg().parse(), Ok(algo));
			assert_eq!(algo.name().parse(), Ok(algo));
			assert_eq!(algo.to_string().parse(), Ok(algo));
		}
		assert_eq!(
			"EdDSA".parse::<KeyAlgo>(),
			Err(UnknownAlgoError("EdDSA".to_owned()))
		);
	}

	#[test]
	fn test_static_algos_agree() {
		assert_eq!(KeyAlgo::P256, P256);
		assert_eq!(KeyAlgo::Secp256k1, Secp256k1);
		assert_eq!(P256::ALGO.jwt_alg(), "ES256");
		assert_eq!(Secp256k1::ALGO.jwt_alg(), "ES256K");
	}
}
