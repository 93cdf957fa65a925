//! Encodings applied to credential values before they reach a catalog row.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;

/// Prefix marking a value that is already in the Kettle obfuscated form.
pub const KETTLE_PREFIX: &str = "Encrypted ";

/// Big-endian bytes of the fixed Kettle seed 933910847463829827159347601486730416058.
const KETTLE_SEED: [u8; 17] = [
    0x02, 0xbe, 0x98, 0xaf, 0xc8, 0x6a, 0xa7, 0xf2, 0xe4, 0xcb, 0x79, 0xce, 0x10, 0xbe, 0xf2, 0xcf,
    0xba,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEncoding {
    /// Standard base64 with padding, used by the platform's own tables.
    Base64,
    /// Kettle's reversible XOR obfuscation, `Encrypted <hex>`.
    KettleObfuscated,
}

impl CredentialEncoding {
    pub fn encode(self, plaintext: &str) -> String {
        match self {
            CredentialEncoding::Base64 => STANDARD.encode(plaintext.as_bytes()),
            CredentialEncoding::KettleObfuscated => kettle_obfuscate(plaintext),
        }
    }
}

/// XORs the UTF-8 bytes, read as one unsigned big-endian integer, with the
/// seed and prints the result as lower-case hex without leading zeros.
///
/// Empty values and values that already carry [`KETTLE_PREFIX`] are returned
/// as they are, so encoding is idempotent.
fn kettle_obfuscate(plaintext: &str) -> String {
    if plaintext.is_empty() || plaintext.starts_with(KETTLE_PREFIX) {
        return plaintext.to_string();
    }

    let bytes = plaintext.as_bytes();
    let width = bytes.len().max(KETTLE_SEED.len());
    let byte_at = |source: &[u8], from_end: usize| -> u8 {
        source
            .len()
            .checked_sub(from_end + 1)
            .map_or(0, |index| source[index])
    };

    let mut mixed = vec![0u8; width];
    for (from_end, slot) in mixed.iter_mut().rev().enumerate() {
        *slot = byte_at(bytes, from_end) ^ byte_at(&KETTLE_SEED, from_end);
    }

    let digits = hex::encode(mixed);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        format!("{KETTLE_PREFIX}0")
    } else {
        format!("{KETTLE_PREFIX}{digits}")
    }
}
