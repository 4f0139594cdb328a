//! Contract call encoding and decoding
//!
//! Calls are encoded from a minimal fragment for exactly the function being
//! invoked. Return data, event bodies and revert payloads are decoded with the
//! same codec.

mod codec;
mod fragment;
pub mod registry;

pub use codec::{decode, encode, uint_word, word_to_uint, ParamType, Token};
pub use fragment::{keccak256, Event, EventParam, Function};

/// `Error(string)`
const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// `Panic(uint256)`
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Decoded revert payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertData {
    /// `require`/`revert` with a reason string
    Message(String),
    /// Compiler-inserted panic with its code (0x11 overflow, 0x32 out-of-bounds, ...)
    Panic(u64),
}

/// Decode a revert payload; `None` for empty or custom-error payloads
pub fn decode_revert(data: &[u8]) -> Option<RevertData> {
    if data.len() < 4 {
        return None;
    }
    let (selector, body) = data.split_at(4);

    if selector == ERROR_SELECTOR {
        let mut tokens = decode(&[ParamType::String], body).ok()?;
        return tokens.pop()?.into_string().ok().map(RevertData::Message);
    }
    if selector == PANIC_SELECTOR {
        let mut tokens = decode(&[ParamType::Uint(256)], body).ok()?;
        return tokens.pop()?.into_u64().ok().map(RevertData::Panic);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_string() {
        let mut data = ERROR_SELECTOR.to_vec();
        data.extend(encode(&[Token::String("Not owner".to_string())]));
        assert_eq!(decode_revert(&data), Some(RevertData::Message("Not owner".to_string())));
    }

    #[test]
    fn test_decode_panic_code() {
        let mut data = PANIC_SELECTOR.to_vec();
        data.extend(uint_word(0x11));
        assert_eq!(decode_revert(&data), Some(RevertData::Panic(0x11)));
    }

    #[test]
    fn test_empty_or_custom_payload() {
        assert_eq!(decode_revert(&[]), None);
        assert_eq!(decode_revert(&[0xde, 0xad, 0xbe, 0xef]), None);
    }

    #[test]
    fn test_error_selector_matches_signature() {
        let hash = keccak256(b"Error(string)");
        assert_eq!(&hash[..4], &ERROR_SELECTOR);
        let hash = keccak256(b"Panic(uint256)");
        assert_eq!(&hash[..4], &PANIC_SELECTOR);
    }
}
