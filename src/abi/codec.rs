//! Head/tail ABI encoding for the handful of types the registry uses

use crate::error::{RegistryError, Result};
use crate::types::Address;

const WORD: usize = 32;

/// Parameter types understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    /// Unsigned integer of the given bit width
    Uint(u16),
    String,
    /// Dynamic array of the inner type
    Array(&'static ParamType),
}

impl ParamType {
    /// Canonical name as used in signatures (`uint256`, `string[]`)
    pub fn canonical(&self) -> String {
        match self {
            Self::Address => "address".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Uint(bits) => format!("uint{}", bits),
            Self::String => "string".to_string(),
            Self::Array(inner) => format!("{}[]", inner.canonical()),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::String | Self::Array(_))
    }
}

/// A decoded or to-be-encoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Bool(bool),
    /// Values wider than 128 bits are rejected on decode
    Uint(u128),
    String(String),
    Array(Vec<Token>),
}

impl Token {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::String(_) | Self::Array(_))
    }

    fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Self::Address(_), ParamType::Address) => true,
            (Self::Bool(_), ParamType::Bool) => true,
            (Self::Uint(v), ParamType::Uint(bits)) => *bits >= 128 || *v >> *bits == 0,
            (Self::String(_), ParamType::String) => true,
            (Self::Array(items), ParamType::Array(inner)) => items.iter().all(|t| t.matches(inner)),
            _ => false,
        }
    }

    pub fn into_uint(self) -> Result<u128> {
        match self {
            Self::Uint(v) => Ok(v),
            other => Err(unexpected("uint", &other)),
        }
    }

    pub fn into_u64(self) -> Result<u64> {
        let value = self.into_uint()?;
        u64::try_from(value)
            .map_err(|_| RegistryError::Decode(format!("value {} does not fit in u64", value)))
    }

    pub fn into_u8(self) -> Result<u8> {
        let value = self.into_uint()?;
        u8::try_from(value)
            .map_err(|_| RegistryError::Decode(format!("value {} does not fit in u8", value)))
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(v),
            other => Err(unexpected("bool", &other)),
        }
    }

    pub fn into_address(self) -> Result<Address> {
        match self {
            Self::Address(v) => Ok(v),
            other => Err(unexpected("address", &other)),
        }
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Self::String(v) => Ok(v),
            other => Err(unexpected("string", &other)),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>> {
        match self {
            Self::Array(v) => Ok(v),
            other => Err(unexpected("array", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Token) -> RegistryError {
    RegistryError::Decode(format!("expected {}, got {:?}", expected, got))
}

/// Check tokens against their declared types
pub fn type_check(types: &[ParamType], tokens: &[Token]) -> Result<()> {
    if types.len() != tokens.len() {
        return Err(RegistryError::Validation(format!(
            "expected {} arguments, got {}",
            types.len(),
            tokens.len()
        )));
    }
    for (i, (ty, token)) in types.iter().zip(tokens).enumerate() {
        if !token.matches(ty) {
            return Err(RegistryError::Validation(format!(
                "argument {} is not a valid {}",
                i,
                ty.canonical()
            )));
        }
    }
    Ok(())
}

/// Encode tokens as a tuple
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_dynamic(token));
        } else {
            head.extend_from_slice(&encode_static(token));
        }
    }

    head.extend(tail);
    head
}

fn encode_static(token: &Token) -> [u8; WORD] {
    match token {
        Token::Address(addr) => addr.to_word(),
        Token::Bool(v) => uint_word(*v as u128),
        Token::Uint(v) => uint_word(*v),
        Token::String(_) | Token::Array(_) => unreachable!("dynamic token in static position"),
    }
}

fn encode_dynamic(token: &Token) -> Vec<u8> {
    match token {
        Token::String(s) => {
            let bytes = s.as_bytes();
            let mut out = uint_word(bytes.len() as u128).to_vec();
            out.extend_from_slice(bytes);
            let padding = (WORD - bytes.len() % WORD) % WORD;
            out.extend(std::iter::repeat(0u8).take(padding));
            out
        }
        Token::Array(items) => {
            let mut out = uint_word(items.len() as u128).to_vec();
            out.extend(encode(items));
            out
        }
        other => encode_static(other).to_vec(),
    }
}

/// Big-endian 32-byte word holding an unsigned value
pub fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Read a word as an unsigned value, rejecting anything above 128 bits
pub fn word_to_uint(word: &[u8]) -> Result<u128> {
    if word.len() != WORD {
        return Err(RegistryError::Decode(format!("word has {} bytes", word.len())));
    }
    if word[..16].iter().any(|b| *b != 0) {
        return Err(RegistryError::Decode("value exceeds 128 bits".to_string()));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decode a tuple of the given types
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    if data.len() < types.len() * WORD {
        return Err(RegistryError::Decode(format!(
            "expected at least {} bytes, got {}",
            types.len() * WORD,
            data.len()
        )));
    }

    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let head = &data[i * WORD..(i + 1) * WORD];
            if ty.is_dynamic() {
                let offset = to_usize(word_to_uint(head)?)?;
                let body = data.get(offset..).ok_or_else(|| {
                    RegistryError::Decode(format!("offset {} out of bounds", offset))
                })?;
                decode_dynamic(ty, body)
            } else {
                decode_static(ty, head)
            }
        })
        .collect()
}

fn decode_static(ty: &ParamType, word: &[u8]) -> Result<Token> {
    match ty {
        ParamType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(RegistryError::Decode("dirty address padding".to_string()));
            }
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address(addr)))
        }
        ParamType::Bool => match word_to_uint(word)? {
            0 => Ok(Token::Bool(false)),
            1 => Ok(Token::Bool(true)),
            other => Err(RegistryError::Decode(format!("invalid bool {}", other))),
        },
        ParamType::Uint(_) => Ok(Token::Uint(word_to_uint(word)?)),
        ParamType::String | ParamType::Array(_) => {
            Err(RegistryError::Decode("dynamic type in static position".to_string()))
        }
    }
}

fn decode_dynamic(ty: &ParamType, body: &[u8]) -> Result<Token> {
    let len_word = body
        .get(..WORD)
        .ok_or_else(|| RegistryError::Decode("missing length word".to_string()))?;
    let len = to_usize(word_to_uint(len_word)?)?;
    let rest = &body[WORD..];

    match ty {
        ParamType::String => {
            let bytes = rest
                .get(..len)
                .ok_or_else(|| RegistryError::Decode("string body truncated".to_string()))?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|e| RegistryError::Decode(e.to_string()))
        }
        ParamType::Array(inner) => {
            if len > rest.len() / WORD {
                return Err(RegistryError::Decode(format!("array of {} items truncated", len)));
            }
            let types = vec![**inner; len];
            decode(&types, rest).map(Token::Array)
        }
        other => decode_static(other, len_word),
    }
}

fn to_usize(value: u128) -> Result<usize> {
    usize::try_from(value).map_err(|_| RegistryError::Decode(format!("length {} too large", value)))
}
