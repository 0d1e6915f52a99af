//! Byte-wise XOR helpers. XOR is its own inverse, so the last plaintext byte at
//! a position is forced once every other one is chosen.

use crate::error::{Error, Result};

/// The byte the remaining slot must hold so that all slots XOR to `cipher_byte`.
pub fn forced_byte(cipher_byte: u8, chosen: &[u8]) -> u8 {
	chosen.iter().fold(cipher_byte, |acc, &byte| acc ^ byte)
}

/// Returns `true` if the bytes of one position XOR to `cipher_byte`.
pub fn is_consistent(bytes: &[u8], cipher_byte: u8) -> bool {
	forced_byte(cipher_byte, bytes) == 0
}

/// XORs equal-length plaintexts into one ciphertext.
///
/// # Errors
/// Returns an error if fewer than two plaintexts are given or lengths differ.
pub fn combine<T: AsRef<[u8]>>(plaintexts: &[T]) -> Result<Vec<u8>> {
	let (first, rest) = plaintexts
		.split_first()
		.filter(|(_, rest)| !rest.is_empty())
		.ok_or_else(|| Error::InvalidConfig("at least two plaintexts are needed".to_owned()))?;

	let mut output = first.as_ref().to_vec();
	for plaintext in rest {
		let plaintext = plaintext.as_ref();
		if plaintext.len() != output.len() {
			return Err(Error::InvalidConfig("Lengths must match!".to_owned()));
		}
		for (out, byte) in output.iter_mut().zip(plaintext) {
			*out ^= byte;
		}
	}
	Ok(output)
}
