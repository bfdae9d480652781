//! Contract interfaces: named functions with typed inputs.
//!
//! An interface comes either from human-readable signatures
//! (`issue(string,string,string,string)`) or from the `abi` array of a
//! compiled contract artifact.

use super::{encode_call, selector, AbiError, ParamType, Token};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<ParamType>,
}

impl Function {
    /// Parse `name(type,type,...)`.
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        let signature = signature.trim();
        let invalid = || AbiError::InvalidSignature(signature.to_string());

        let open = signature.find('(').ok_or_else(invalid)?;
        let inner = signature[open + 1..]
            .strip_suffix(')')
            .ok_or_else(invalid)?;
        let name = signature[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }

        let inputs = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(|part| {
                    // Tolerate named parameters: "string name"
                    let ty = part.split_whitespace().next().ok_or_else(invalid)?;
                    ParamType::parse(ty)
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            inputs,
        })
    }

    /// Canonical signature used for the selector.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }

    /// Encode call data, checking arity and types first.
    pub fn encode_input(&self, tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
        if tokens.len() != self.inputs.len() {
            return Err(AbiError::Argument(format!(
                "{} expects {} arguments, got {}",
                self.signature(),
                self.inputs.len(),
                tokens.len()
            )));
        }

        for (i, (token, ty)) in tokens.iter().zip(&self.inputs).enumerate() {
            if !token.matches(ty) {
                return Err(AbiError::Argument(format!(
                    "argument {} of {} is not a valid {}",
                    i,
                    self.signature(),
                    ty
                )));
            }
        }

        Ok(encode_call(self.selector(), tokens))
    }

    /// Decode call data produced by `encode_input`.
    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        let payload = data
            .strip_prefix(&self.selector()[..])
            .ok_or_else(|| AbiError::Malformed(format!("selector mismatch for {}", self.name)))?;
        super::decode(&self.inputs, payload)
    }
}

#[derive(Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
}

#[derive(Deserialize)]
struct AbiParam {
    #[serde(rename = "type")]
    kind: String,
}

/// A set of functions callable on one contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    functions: BTreeMap<String, Vec<Function>>,
}

impl Interface {
    /// Build from human-readable signatures.
    pub fn from_signatures<I, S>(signatures: I) -> Result<Self, AbiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut interface = Self::default();
        for signature in signatures {
            interface.insert(Function::parse(signature.as_ref())?);
        }
        Ok(interface)
    }

    /// Build from a compiled artifact (`{"abi": [...]}`) or a bare ABI array.
    pub fn from_artifact_json(json: &str) -> Result<Self, AbiError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| AbiError::Malformed(format!("artifact is not JSON: {}", e)))?;
        let abi = match value {
            serde_json::Value::Object(mut map) => map
                .remove("abi")
                .ok_or_else(|| AbiError::Malformed("artifact has no abi field".to_string()))?,
            other => other,
        };
        let entries: Vec<AbiEntry> = serde_json::from_value(abi)
            .map_err(|e| AbiError::Malformed(format!("invalid abi array: {}", e)))?;

        let mut interface = Self::default();
        for entry in entries.into_iter().filter(|e| e.kind == "function") {
            let inputs = entry
                .inputs
                .iter()
                .map(|param| ParamType::parse(&param.kind))
                .collect::<Result<Vec<_>, _>>();
            match inputs {
                Ok(inputs) => interface.insert(Function {
                    name: entry.name,
                    inputs,
                }),
                // Functions with tuple inputs cannot be proposed from text; skip them.
                Err(e) => tracing::debug!(function = %entry.name, error = %e, "skipping abi entry"),
            }
        }
        Ok(interface)
    }

    fn insert(&mut self, function: Function) {
        let overloads = self.functions.entry(function.name.clone()).or_default();
        if !overloads.contains(&function) {
            overloads.push(function);
        }
    }

    /// Look up by bare name or by full signature for overloaded functions.
    pub fn function(&self, name: &str) -> Result<&Function, AbiError> {
        let name = name.trim();
        if name.contains('(') {
            let wanted = Function::parse(name)?;
            return self
                .functions
                .get(&wanted.name)
                .and_then(|overloads| overloads.iter().find(|f| **f == wanted))
                .ok_or_else(|| AbiError::UnknownFunction(name.to_string()));
        }

        match self.functions.get(name).map(Vec::as_slice) {
            Some([only]) => Ok(only),
            Some([]) | None => Err(AbiError::UnknownFunction(name.to_string())),
            Some(overloads) => Err(AbiError::UnknownFunction(format!(
                "{} is overloaded; use one of: {}",
                name,
                overloads
                    .iter()
                    .map(Function::signature)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Canonical signatures of every function, sorted by name.
    pub fn signatures(&self) -> Vec<String> {
        self.functions
            .values()
            .flatten()
            .map(Function::signature)
            .collect()
    }

    /// Encode a call from a JSON argument array.
    pub fn encode_json_call(
        &self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>, AbiError> {
        let function = self.function(name)?;
        let tokens = super::tokens_from_json(&function.inputs, args)?;
        function.encode_input(&tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_function_signature() {
        let function = Function::parse("issue(string,string,string,string)").unwrap();
        assert_eq!(function.name, "issue");
        assert_eq!(function.inputs, vec![ParamType::String; 4]);
        assert_eq!(function.signature(), "issue(string,string,string,string)");
    }

    #[test]
    fn test_parse_signature_with_names_and_shorthand() {
        let function = Function::parse("grantRole(bytes32 role, address account)").unwrap();
        assert_eq!(function.signature(), "grantRole(bytes32,address)");

        let function = Function::parse("mint(address,uint)").unwrap();
        assert_eq!(function.signature(), "mint(address,uint256)");
    }

    #[test]
    fn test_parse_invalid_signatures() {
        assert!(Function::parse("issue").is_err());
        assert!(Function::parse("(string)").is_err());
        assert!(Function::parse("issue(string").is_err());
        assert!(Function::parse("issue(tuple)").is_err());
    }

    #[test]
    fn test_interface_from_artifact() {
        let artifact = json!({
            "contractName": "Cert",
            "abi": [
                {"type": "constructor", "inputs": []},
                {"type": "function", "name": "issue", "inputs": [
                    {"name": "name", "type": "string"},
                    {"name": "course", "type": "string"},
                    {"name": "grade", "type": "string"},
                    {"name": "date", "type": "string"}
                ]},
                {"type": "event", "name": "CertificateIssued", "inputs": [
                    {"name": "certificateId", "type": "uint256", "indexed": true}
                ]}
            ]
        });

        let interface = Interface::from_artifact_json(&artifact.to_string()).unwrap();
        assert_eq!(
            interface.signatures(),
            vec!["issue(string,string,string,string)".to_string()]
        );
    }

    #[test]
    fn test_overloaded_lookup_requires_signature() {
        let interface =
            Interface::from_signatures(["issue(string)", "issue(string,string)"]).unwrap();
        assert!(interface.function("issue").is_err());
        assert_eq!(
            interface.function("issue(string)").unwrap().inputs,
            vec![ParamType::String]
        );
    }

    #[test]
    fn test_encode_json_call() {
        let interface = Interface::from_signatures(["issue(string,string,string,string)"]).unwrap();
        let data = interface
            .encode_json_call("issue", &json!(["Alice", "Rust 101", "A", "2024-06-01"]))
            .unwrap();

        let function = interface.function("issue").unwrap();
        assert_eq!(&data[..4], &function.selector());
        let decoded = function.decode_input(&data).unwrap();
        assert_eq!(decoded[0], Token::String("Alice".to_string()));
    }

    #[test]
    fn test_encode_input_arity_mismatch() {
        let function = Function::parse("issue(string,string)").unwrap();
        let result = function.encode_input(&[Token::String("Alice".to_string())]);
        assert!(matches!(result, Err(AbiError::Argument(_))));
    }
}
