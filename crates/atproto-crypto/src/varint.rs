//! Unsigned LEB128 varints, which is how multicodec encodes its codes.

/// A `u16` never needs more than 3 varint bytes.
const MAX_LEN: usize = 3;
/// Set on every byte except the last one.
const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = !CONTINUATION;

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub(crate) struct VarintEncoding {
	buf: [u8; MAX_LEN],
	len: u8,
}

impl VarintEncoding {
	#[cfg(test)]
	pub const fn as_slice(&self) -> &[u8] {
		self.buf.split_at(self.len as usize).0
	}

	/// The encoding as a two byte array. Both of the multicodecs that did:key
	/// uses for ECDSA keys happen to encode to exactly two bytes.
	///
	/// Panics if the encoding has any other length. In a const context that
	/// turns into a compile error.
	pub const fn as_pair(&self) -> [u8; 2] {
		assert!(self.len == 2, "varint was not exactly two bytes");
		[self.buf[0], self.buf[1]]
	}
}

/// Encodes a value as a varint.
pub(crate) const fn encode_varint(value: u16) -> VarintEncoding {
	let mut buf = [0; MAX_LEN];
	let mut len = 0;
	let mut remaining = value;
	loop {
		let chunk = (remaining as u8) & PAYLOAD;
		remaining >>= 7;
		if remaining == 0 {
			buf[len] = chunk;
			len += 1;
			break;
		}
		buf[len] = chunk | CONTINUATION;
		len += 1;
	}

	VarintEncoding {
		buf,
		len: len as u8,
	}
}

/// Decodes the varint at the start of `encoded`. Returns the value, and how
/// many bytes of `encoded` it occupied.
pub(crate) const fn decode_varint(
	encoded: &[u8],
) -> Result<(u16, usize), DecodeError> {
	let mut value: u32 = 0;
	let mut idx = 0;
	while idx < encoded.len() && idx < MAX_LEN {
		let byte = encoded[idx];
		value |= ((byte & PAYLOAD) as u32) << (7 * idx);
		idx += 1;
		if byte & CONTINUATION == 0 {
			if value > u16::MAX as u32 {
				return Err(DecodeError::WouldOverflow);
			}
			return Ok((value as u16, idx));
		}
	}
	if idx == MAX_LEN {
		Err(DecodeError::WouldOverflow)
	} else {
		Err(DecodeError::MissingBytes)
	}
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum DecodeError {
	#[error("expected more bytes than what were provided")]
	MissingBytes,
	#[error(
		"the decoded number is too large to fit into the type without overflowing"
	)]
	WouldOverflow,
}
