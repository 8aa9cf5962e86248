//! Base58 with the bitcoin alphabet and no checksum, aka "base58-btc". This
//! is the encoding that multibase identifies with a leading `z`.
//!
//! Leading zero bytes are encoded one-to-one as leading `'1'`s, so the exact
//! length of any zero prefix survives a round trip.

use crate::error::{Error, Result};

pub const ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encodes `bytes` as base58. Empty input gives an empty string.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
	bs58::encode(bytes)
		.with_alphabet(bs58::Alphabet::BITCOIN)
		.into_string()
}

/// Decodes a base58 string. Fails with [`Error::InvalidCharacter`] on anything
/// outside of [`ALPHABET`].
pub fn decode(s: &str) -> Result<Vec<u8>> {
	bs58::decode(s)
		.with_alphabet(bs58::Alphabet::BITCOIN)
		.into_vec()
		.map_err(|err| match err {
			bs58::decode::Error::InvalidCharacter { character, index } => {
				Error::InvalidCharacter { character, index }
			}
			// `index` is a byte offset, and the first non ascii byte always
			// starts a char.
			bs58::decode::Error::NonAsciiCharacter { index } => {
				Error::InvalidCharacter {
					character: s[index..]
						.chars()
						.next()
						.unwrap_or(char::REPLACEMENT_CHARACTER),
					index,
				}
			}
			// `into_vec` sizes its own buffer and we don't use checksums, so
			// nothing else is reachable.
			_ => Error::InvalidCharacter {
				character: char::REPLACEMENT_CHARACTER,
				index: 0,
			},
		})
}
