//! ECDSA over secp256k1 with SHA-256.

use k256::{
	ecdsa::{
		signature::{Signer as _, Verifier as _},
		Signature, SigningKey, VerifyingKey,
	},
	elliptic_curve::{ff::PrimeField as _, scalar::IsHigh as _},
	pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _},
	SecretKey,
};
use rand_core::OsRng;
use zeroize::Zeroizing;

use super::EcdsaCurve;
use crate::{canonical::SignatureEncoding, key_algos::Secp256k1};

impl EcdsaCurve for Secp256k1 {
	type SigningKey = SigningKey;
	type VerifyingKey = VerifyingKey;
	type Signature = Signature;

	fn random_signing_key() -> SigningKey {
		SigningKey::random(&mut OsRng)
	}

	fn signing_key_from_scalar(scalar: &[u8; 32]) -> Option<SigningKey> {
		SigningKey::from_slice(scalar).ok()
	}

	fn signing_key_from_pkcs8(der: &[u8]) -> Option<SigningKey> {
		SecretKey::from_pkcs8_der(der).ok().map(SigningKey::from)
	}

	fn scalar_bytes(key: &SigningKey) -> Zeroizing<[u8; 32]> {
		let mut out = Zeroizing::new([0; 32]);
		out.copy_from_slice(&key.to_bytes());
		out
	}

	fn signing_key_to_pkcs8(key: &SigningKey) -> Option<Zeroizing<Vec<u8>>> {
		let secret = SecretKey::from_bytes(&key.to_bytes()).ok()?;
		let document = secret.to_pkcs8_der().ok()?;
		Some(Zeroizing::new(document.as_bytes().to_vec()))
	}

	fn verifying_key(key: &SigningKey) -> VerifyingKey {
		key.verifying_key().clone()
	}

	fn verifying_key_from_sec1(bytes: &[u8]) -> Option<VerifyingKey> {
		VerifyingKey::from_sec1_bytes(bytes).ok()
	}

	fn compressed_point(key: &VerifyingKey) -> Vec<u8> {
		key.to_encoded_point(true).as_bytes().to_vec()
	}

	fn sign_sha256(key: &SigningKey, msg: &[u8]) -> Signature {
		key.sign(msg)
	}

	fn verify_sha256(key: &VerifyingKey, msg: &[u8], sig: &Signature) -> bool {
		key.verify(msg, sig).is_ok()
	}

	fn signature_from_bytes(
		bytes: &[u8],
		encoding: SignatureEncoding,
	) -> Option<Signature> {
		match encoding {
			SignatureEncoding::Raw => Signature::from_slice(bytes).ok(),
			SignatureEncoding::Der => Signature::from_der(bytes).ok(),
		}
	}

	fn signature_to_bytes(sig: &Signature, encoding: SignatureEncoding) -> Vec<u8> {
		match encoding {
			SignatureEncoding::Raw => sig.to_bytes().to_vec(),
			SignatureEncoding::Der => sig.to_der().as_bytes().to_vec(),
		}
	}

	fn is_high_s(sig: &Signature) -> bool {
		sig.s().is_high().into()
	}

	fn negate_s(sig: &Signature) -> Option<Signature> {
		let negated = -*sig.s();
		Signature::from_scalars(sig.r().to_repr(), negated.to_repr()).ok()
	}
}
