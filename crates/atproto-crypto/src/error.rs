use crate::{canonical::SignatureEncoding, KeyAlgo};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong when encoding, decoding, signing, or
/// verifying.
///
/// Note that a signature that is well formed but doesn't verify is *not* an
/// error, verification just returns `false`.
#[derive(thiserror::Error, Debug, Eq, PartialEq, Clone)]
#[non_exhaustive]
pub enum Error {
	#[error("invalid character {character:?} at index {index}")]
	InvalidCharacter { character: char, index: usize },
	#[error("expected the string to start with {expected:?}")]
	InvalidPrefix { expected: &'static str },
	#[error(
		"unsupported key type, multicodec was {}",
		.codec.map(|c| format!("{c:#x}")).unwrap_or_else(|| "unreadable".to_owned())
	)]
	UnsupportedKeyType { codec: Option<u16> },
	#[error("not a valid {algo} key")]
	InvalidKey { algo: KeyAlgo },
	#[error("malformed {encoding} signature")]
	InvalidSignature { encoding: SignatureEncoding },
	#[error("private key is not exportable")]
	NotExportable,
	#[error("the runtime shut down before the offloaded operation could finish")]
	Cancelled,
}
