use std::fmt::Debug;

use tracing::debug;
use zeroize::Zeroizing;

use crate::{
	base58,
	crypto::{KeyHandle, PrivateKey, PublicKey, SigOpts},
	did_key::DidKey,
	error::{Error, Result},
	signer::{Signer, Verifier},
	KeyAlgo,
};

/// A signing keypair with its did:key.
///
/// The public key is always derived from the private one, and the DID is
/// computed once when the pair is built. Whether the private key may be read
/// back out is decided at construction time and can't be changed afterwards.
#[derive(Clone)]
pub struct AtKeyPair {
	private: PrivateKey,
	did: DidKey,
	exportable: bool,
}

impl AtKeyPair {
	pub fn generate(algo: KeyAlgo, exportable: bool) -> Self {
		Self::from_private(PrivateKey::generate(algo), exportable)
	}

	/// Imports a big-endian private scalar of at most 32 bytes.
	pub fn import_raw(algo: KeyAlgo, bytes: &[u8], exportable: bool) -> Result<Self> {
		PrivateKey::from_scalar(algo, bytes).map(|k| Self::from_private(k, exportable))
	}

	/// Imports a hex encoded private scalar.
	pub fn import_hex(algo: KeyAlgo, s: &str, exportable: bool) -> Result<Self> {
		let bytes = Zeroizing::new(hex::decode(s).map_err(|err| match err {
			hex::FromHexError::InvalidHexCharacter { c, index } => {
				Error::InvalidCharacter {
					character: c,
					index,
				}
			}
			_ => Error::InvalidKey { algo },
		})?);
		Self::import_raw(algo, &bytes, exportable)
	}

	/// Imports a base58 encoded private scalar.
	pub fn import_base58(algo: KeyAlgo, s: &str, exportable: bool) -> Result<Self> {
		let bytes = Zeroizing::new(base58::decode(s)?);
		Self::import_raw(algo, &bytes, exportable)
	}

	/// Imports a PKCS#8 DER encoded private key.
	pub fn import_pkcs8_der(algo: KeyAlgo, der: &[u8], exportable: bool) -> Result<Self> {
		PrivateKey::from_pkcs8_der(algo, der).map(|k| Self::from_private(k, exportable))
	}

	/// Wraps a key that came from the curve crates directly.
	pub fn from_secret_key(key: impl Into<KeyHandle>, exportable: bool) -> Self {
		Self::from_private(PrivateKey::from(key.into()), exportable)
	}

	fn from_private(private: PrivateKey, exportable: bool) -> Self {
		let did = DidKey::from_public_key(private.public_key());
		debug!(%did, exportable, "loaded keypair");
		Self {
			private,
			did,
			exportable,
		}
	}

	/// The did:key of the public key, as a string.
	pub fn did(&self) -> &str {
		self.did.as_str()
	}

	pub fn did_key(&self) -> &DidKey {
		&self.did
	}

	pub fn public_key(&self) -> &PublicKey {
		self.did.public_key()
	}

	pub fn algo(&self) -> KeyAlgo {
		self.private.algo()
	}

	pub fn is_exportable(&self) -> bool {
		self.exportable
	}

	/// The private scalar as 32 big-endian bytes, suitable for
	/// [`Self::import_raw`].
	pub fn export(&self) -> Result<Zeroizing<[u8; 32]>> {
		if !self.exportable {
			return Err(Error::NotExportable);
		}
		Ok(self.private.to_scalar_bytes())
	}

	/// The private key as PKCS#8 DER, suitable for [`Self::import_pkcs8_der`].
	pub fn export_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
		if !self.exportable {
			return Err(Error::NotExportable);
		}
		self.private.to_pkcs8_der()
	}
}

impl Signer for AtKeyPair {
	fn algo(&self) -> KeyAlgo {
		self.private.algo()
	}

	fn sign_with(&self, msg: &[u8], opts: SigOpts) -> Vec<u8> {
		self.private.sign(msg, opts)
	}
}

impl Verifier for AtKeyPair {
	fn verify_with(&self, msg: &[u8], sig: &[u8], opts: SigOpts) -> Result<bool> {
		self.did.verify_with(msg, sig, opts)
	}
}

impl Debug for AtKeyPair {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AtKeyPair")
			.field("did", &self.did.as_str())
			.field("exportable", &self.exportable)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	use eyre::Result;
	use hex_literal::hex;

	const K256_SCALAR_HEX: &str =
		"9085d2bef69286a6cbb51623c8fa258629945cd55ca705cc4e66700396894e0c";
	const K256_DID: &str = "did:key:zQ3shokFTS3brHcDQrn82RUDfCZESWL1ZdCEJwekUDPQiYBme";

	#[test]
	fn test_import_known_keys() -> Result<()> {
		let k256 = AtKeyPair::import_hex(KeyAlgo::Secp256k1, K256_SCALAR_HEX, false)?;
		assert_eq!(k256.did(), K256_DID);
		assert_eq!(k256.algo(), KeyAlgo::Secp256k1);

		// From: https://w3c-ccg.github.io/did-method-key/#p-256
		let p256 = AtKeyPair::import_base58(
			KeyAlgo::P256,
			"9p4VRzdmhsnq869vQjVCTrRry7u4TtfRxhvBFJTGU2Cp",
			false,
		)?;
		assert_eq!(
			p256.did(),
			"did:key:zDnaeTiq1PdzvZXUaMdezchcMJQpBdH2VN4pgrrEhMCCbmwSb"
		);
		Ok(())
	}

	#[test]
	fn test_export_import_same_did() -> Result<()> {
		for algo in KeyAlgo::ALL {
			let original = AtKeyPair::generate(algo, true);
			let exported = original.export()?;
			let imported = AtKeyPair::import_raw(algo, exported.as_slice(), true)?;
			assert_eq!(imported.did(), original.did());
			assert_eq!(*imported.export()?, *exported);

			let der = original.export_pkcs8_der()?;
			let from_der = AtKeyPair::import_pkcs8_der(algo, &der, false)?;
			assert_eq!(from_der.did(), original.did());
		}
		Ok(())
	}

	#[test]
	fn test_not_exportable() {
		for algo in KeyAlgo::ALL {
			let pair = AtKeyPair::generate(algo, false);
			assert!(!pair.is_exportable());
			assert_eq!(pair.export().map(|_| ()), Err(Error::NotExportable));
			assert_eq!(pair.export_pkcs8_der().map(|_| ()), Err(Error::NotExportable));
		}
	}

	#[test]
	fn test_sign_verify() -> Result<()> {
		for algo in KeyAlgo::ALL {
			let pair = AtKeyPair::generate(algo, false);
			let msg = vec![0x5a; 8192];
			let sig = pair.sign(&msg);
			assert!(pair.verify(&msg, &sig)?);
			assert!(pair.did_key().verify(&msg, &sig)?);
			assert!(!pair.verify(&msg[1..], &sig)?);

			let other = AtKeyPair::generate(algo, false);
			assert!(!other.verify(&msg, &sig)?);
		}
		Ok(())
	}

	#[test]
	fn test_from_secret_key() -> Result<()> {
		let scalar = hex!("9085d2bef69286a6cbb51623c8fa258629945cd55ca705cc4e66700396894e0c");
		let secret = k256::SecretKey::from_slice(&scalar)?;
		let pair = AtKeyPair::from_secret_key(secret, true);
		assert_eq!(pair.did(), K256_DID);
		assert_eq!(*pair.export()?, scalar);
		Ok(())
	}

	#[test]
	fn test_import_errors() {
		assert_eq!(
			AtKeyPair::import_hex(KeyAlgo::P256, "zz", false).map(|_| ()),
			Err(Error::InvalidCharacter {
				character: 'z',
				index: 0
			})
		);
		assert_eq!(
			AtKeyPair::import_hex(KeyAlgo::P256, "abc", false).map(|_| ()),
			Err(Error::InvalidKey {
				algo: KeyAlgo::P256
			})
		);
		assert_eq!(
			AtKeyPair::import_base58(KeyAlgo::Secp256k1, "0", false).map(|_| ()),
			Err(Error::InvalidCharacter {
				character: '0',
				index: 0
			})
		);
		assert_eq!(
			AtKeyPair::import_raw(KeyAlgo::Secp256k1, &[0; 32], false).map(|_| ()),
			Err(Error::InvalidKey {
				algo: KeyAlgo::Secp256k1
			})
		);
	}

	#[test]
	fn test_debug_hides_secret() {
		let pair = AtKeyPair::import_hex(KeyAlgo::Secp256k1, K256_SCALAR_HEX, true).unwrap();
		let dbg = format!("{pair:?}");
		assert!(dbg.contains(K256_DID));
		assert!(!dbg.contains("9085d2be"), "{dbg}");
	}
}
