use crate::{crypto::SigOpts, error::Result, KeyAlgo};

/// Something that holds a private key and can sign with it.
pub trait Signer {
	fn algo(&self) -> KeyAlgo;

	fn sign_with(&self, msg: &[u8], opts: SigOpts) -> Vec<u8>;

	/// Signs with [`SigOpts::CANONICAL`].
	fn sign(&self, msg: &[u8]) -> Vec<u8> {
		self.sign_with(msg, SigOpts::CANONICAL)
	}
}

/// Something that holds a public key and can check signatures against it.
pub trait Verifier {
	fn verify_with(&self, msg: &[u8], sig: &[u8], opts: SigOpts) -> Result<bool>;

	/// Verifies with [`SigOpts::CANONICAL`].
	fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<bool> {
		self.verify_with(msg, sig, SigOpts::CANONICAL)
	}
}

impl Verifier for crate::crypto::PublicKey {
	fn verify_with(&self, msg: &[u8], sig: &[u8], opts: SigOpts) -> Result<bool> {
		crate::crypto::PublicKey::verify(self, msg, sig, opts)
	}
}

impl Signer for crate::crypto::PrivateKey {
	fn algo(&self) -> KeyAlgo {
		crate::crypto::PrivateKey::algo(self)
	}

	fn sign_with(&self, msg: &[u8], opts: SigOpts) -> Vec<u8> {
		crate::crypto::PrivateKey::sign(self, msg, opts)
	}
}
