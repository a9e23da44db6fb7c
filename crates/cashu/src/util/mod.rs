//! Small shared utilities (hex encode/decode) used throughout the wire types.

use thiserror::Error;

/// Hex utilities
pub mod hex {
    use super::Error;

    /// Decode a hex string into bytes
    pub fn decode<T: AsRef<[u8]>>(s: T) -> Result<Vec<u8>, Error> {
        let s = s.as_ref();
        if s.len() % 2 != 0 {
            return Err(Error::InvalidLength);
        }

        (0..s.len())
            .step_by(2)
            .map(|i| {
                let byte_str = std::str::from_utf8(&s[i..i + 2]).map_err(|_| Error::InvalidHex)?;
                u8::from_str_radix(byte_str, 16).map_err(|_| Error::InvalidHex)
            })
            .collect()
    }

    /// Encode bytes as a lowercase hex string
    pub fn encode<T: AsRef<[u8]>>(bytes: T) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Hex parsing error
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid hex character
    #[error("Invalid hex character")]
    InvalidHex,
    /// Odd-length hex string
    #[error("Invalid hex length")]
    InvalidLength,
}
