//! The fixed printable alphabet candidate plaintexts are drawn from.

/// Number of symbols in [`ALPHABET`].
pub const ALPHABET_SIZE: usize = 96;

/// Carriage return followed by printable ASCII from space (32) to `~` (126).
pub const ALPHABET: [u8; ALPHABET_SIZE] = build_alphabet();

const fn build_alphabet() -> [u8; ALPHABET_SIZE] {
	let mut symbols = [0u8; ALPHABET_SIZE];
	symbols[0] = b'\r';
	let mut i = 1;
	while i < ALPHABET_SIZE {
		symbols[i] = 31 + i as u8;
		i += 1;
	}
	symbols
}

/// Returns `true` if `byte` belongs to the alphabet.
pub fn contains(byte: u8) -> bool {
	byte == b'\r' || (32..=126).contains(&byte)
}
