//! Coercion of operator-supplied JSON arguments into ABI tokens.

use super::{AbiError, ParamType, Token};
use alloy_primitives::{Address, U256};
use serde_json::Value;
use std::str::FromStr;

/// Convert a JSON array of arguments into tokens for `types`.
///
/// Only structure is validated (arity, kinds, widths); whether the values
/// make sense to the target contract is for the contract to decide.
pub fn tokens_from_json(types: &[ParamType], args: &Value) -> Result<Vec<Token>, AbiError> {
    let items = args
        .as_array()
        .ok_or_else(|| AbiError::Argument("arguments must be a JSON array".to_string()))?;

    if items.len() != types.len() {
        return Err(AbiError::Argument(format!(
            "expected {} arguments, got {}",
            types.len(),
            items.len()
        )));
    }

    types
        .iter()
        .zip(items)
        .enumerate()
        .map(|(i, (ty, value))| {
            coerce(ty, value).map_err(|reason| {
                AbiError::Argument(format!("argument {} ({}): {}", i, ty, reason))
            })
        })
        .collect()
}

fn coerce(ty: &ParamType, value: &Value) -> Result<Token, String> {
    match ty {
        ParamType::Address => {
            let text = value.as_str().ok_or("expected an address string")?;
            Address::from_str(text)
                .map(Token::Address)
                .map_err(|e| format!("invalid address {:?}: {}", text, e))
        }
        ParamType::Uint(bits) => {
            let number = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("{} is not an unsigned integer", n))?,
                Value::String(text) => U256::from_str(text.trim())
                    .map_err(|e| format!("invalid integer {:?}: {}", text, e))?,
                _ => return Err("expected an integer".to_string()),
            };
            if *bits < 256 && number.bit_len() > *bits {
                return Err(format!("{} does not fit in uint{}", number, bits));
            }
            Ok(Token::Uint(number))
        }
        ParamType::Bool => match value {
            Value::Bool(flag) => Ok(Token::Bool(*flag)),
            Value::String(text) if text == "true" => Ok(Token::Bool(true)),
            Value::String(text) if text == "false" => Ok(Token::Bool(false)),
            _ => Err("expected a boolean".to_string()),
        },
        ParamType::String => value
            .as_str()
            .map(|text| Token::String(text.to_string()))
            .ok_or_else(|| "expected a string".to_string()),
        ParamType::Bytes => decode_hex(value).map(Token::Bytes),
        ParamType::FixedBytes(len) => {
            let bytes = decode_hex(value)?;
            if bytes.len() != *len {
                return Err(format!("expected {} bytes, got {}", len, bytes.len()));
            }
            Ok(Token::FixedBytes(bytes))
        }
        ParamType::Array(inner) => {
            let items = value.as_array().ok_or("expected an array")?;
            items
                .iter()
                .map(|item| coerce(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Token::Array)
        }
    }
}

fn decode_hex(value: &Value) -> Result<Vec<u8>, String> {
    let text = value.as_str().ok_or("expected a 0x-prefixed hex string")?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| format!("{:?} is missing the 0x prefix", text))?;
    hex::decode(digits).map_err(|e| format!("invalid hex {:?}: {}", text, e))
}
