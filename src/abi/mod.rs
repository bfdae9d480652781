//! Solidity ABI encoding for contract calls and event payloads.
//!
//! Covers the parameter kinds the governance, timelock, token and credential
//! contracts use:
//! - `address`, `uintN`, `bool`, `bytesN` (static, one word each)
//! - `string`, `bytes`, `T[]` (dynamic, head offset + tail)
//!
//! Tuples and fixed-size arrays are not needed by any consumed interface.

pub mod interface;
pub mod json;

use alloy_primitives::{keccak256, Address, B256, U256};
use std::fmt;
use thiserror::Error;

pub use interface::{Function, Interface};
pub use json::tokens_from_json;

const WORD: usize = 32;

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// ABI errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("argument mismatch: {0}")]
    Argument(String),

    #[error("data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("malformed data: {0}")]
    Malformed(String),
}

/// Parameter type of a function input or event field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint(usize),
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Array(Box<ParamType>),
}

impl ParamType {
    /// Parse a canonical or shorthand type name (`uint` is `uint256`).
    pub fn parse(name: &str) -> Result<Self, AbiError> {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix("[]") {
            return Ok(ParamType::Array(Box::new(ParamType::parse(inner)?)));
        }

        match name {
            "address" => Ok(ParamType::Address),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::String),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            _ => {
                let unsupported = || AbiError::UnsupportedType(name.to_string());
                if let Some(bits) = name.strip_prefix("uint") {
                    let bits: usize = bits.parse().map_err(|_| unsupported())?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(unsupported());
                    }
                    Ok(ParamType::Uint(bits))
                } else if let Some(len) = name.strip_prefix("bytes") {
                    let len: usize = len.parse().map_err(|_| unsupported())?;
                    if len == 0 || len > WORD {
                        return Err(unsupported());
                    }
                    Ok(ParamType::FixedBytes(len))
                } else {
                    Err(unsupported())
                }
            }
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Bytes | ParamType::Array(_)
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::String => write!(f, "string"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::FixedBytes(len) => write!(f, "bytes{}", len),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// A decoded (or to-be-encoded) ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<Token>),
}

impl Token {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_) | Token::Bytes(_) | Token::Array(_))
    }

    /// Whether this token can be encoded as `ty`.
    pub fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Token::Address(_), ParamType::Address) => true,
            (Token::Uint(value), ParamType::Uint(bits)) => {
                *bits >= 256 || value.bit_len() <= *bits
            }
            (Token::Bool(_), ParamType::Bool) => true,
            (Token::String(_), ParamType::String) => true,
            (Token::Bytes(_), ParamType::Bytes) => true,
            (Token::FixedBytes(bytes), ParamType::FixedBytes(len)) => bytes.len() == *len,
            (Token::Array(items), ParamType::Array(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            _ => false,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Token::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_fixed_bytes(self) -> Option<Vec<u8>> {
        match self {
            Token::FixedBytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// 4-byte function selector of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Topic 0 of an event with the given canonical signature.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Encode a parameter list (head/tail layout).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_dynamic(token));
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend(tail);
    head
}

/// Encode a call: selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode(tokens));
    out
}

fn encode_dynamic(token: &Token) -> Vec<u8> {
    match token {
        Token::String(text) => encode_byte_string(text.as_bytes()),
        Token::Bytes(bytes) => encode_byte_string(bytes),
        Token::Array(items) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode(items));
            out
        }
        other => static_word(other).to_vec(),
    }
}

fn encode_byte_string(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = usize_word(bytes.len()).to_vec();
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn static_word(token: &Token) -> [u8; WORD] {
    match token {
        Token::Address(address) => address.into_word().0,
        Token::Uint(value) => value.to_be_bytes::<WORD>(),
        Token::Bool(flag) => usize_word(usize::from(*flag)),
        Token::FixedBytes(bytes) => {
            let mut word = [0u8; WORD];
            let len = bytes.len().min(WORD);
            word[..len].copy_from_slice(&bytes[..len]);
            word
        }
        // Dynamic tokens never occupy a static slot.
        Token::String(_) | Token::Bytes(_) | Token::Array(_) => [0u8; WORD],
    }
}

fn usize_word(value: usize) -> [u8; WORD] {
    U256::from(value).to_be_bytes::<WORD>()
}

/// Decode a parameter list laid out as `encode` produces it.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_at(types, data, 0)
}

fn decode_at(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let slot = advance(data, base, i.saturating_mul(WORD))?;
            if ty.is_dynamic() {
                let offset = read_usize(data, slot)?;
                decode_dynamic(ty, data, advance(data, base, offset)?)
            } else {
                Ok(decode_static(ty, read_word(data, slot)?))
            }
        })
        .collect()
}

fn decode_dynamic(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, AbiError> {
    let len = read_usize(data, at)?;
    let body = advance(data, at, WORD)?;
    match ty {
        ParamType::String => {
            let bytes = read_slice(data, body, len)?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|e| AbiError::Malformed(format!("string is not UTF-8: {}", e)))
        }
        ParamType::Bytes => Ok(Token::Bytes(read_slice(data, body, len)?.to_vec())),
        ParamType::Array(inner) => {
            // Every element needs at least one head word.
            read_slice(data, body, len.saturating_mul(WORD))?;
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_at(&types, data, body)?))
        }
        _ => Ok(decode_static(ty, read_word(data, at)?)),
    }
}

fn decode_static(ty: &ParamType, word: &[u8; WORD]) -> Token {
    match ty {
        ParamType::Address => Token::Address(Address::from_slice(&word[12..])),
        ParamType::Bool => Token::Bool(word[WORD - 1] != 0),
        ParamType::FixedBytes(len) => Token::FixedBytes(word[..*len].to_vec()),
        _ => Token::Uint(U256::from_be_bytes(*word)),
    }
}

/// `base + by`, where either part may come from untrusted input.
fn advance(data: &[u8], base: usize, by: usize) -> Result<usize, AbiError> {
    base.checked_add(by).ok_or(AbiError::OutOfBounds {
        offset: base,
        needed: by,
        len: data.len(),
    })
}

fn read_slice(data: &[u8], offset: usize, needed: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(needed)
        .and_then(|end| data.get(offset..end))
        .ok_or(AbiError::OutOfBounds {
            offset,
            needed,
            len: data.len(),
        })
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8; WORD], AbiError> {
    read_slice(data, offset, WORD)?
        .try_into()
        .map_err(|_| AbiError::Malformed("word slice".to_string()))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let word = read_word(data, offset)?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::Malformed(format!(
            "offset or length at {} does not fit in 64 bits",
            offset
        )));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| AbiError::Malformed(format!("length at {} overflows usize", offset)))
}

/// Build the `Error(string)` revert payload for a reason.
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    encode_call(ERROR_SELECTOR, &[Token::String(reason.to_string())])
}

/// Extract the reason from an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_SELECTOR[..])?;
    decode(&[ParamType::String], payload)
        .ok()?
        .pop()?
        .into_string()
}
