//! Decoding contexts and the internal function table
//!
//! A decoding context ties a contract's bytecode to its identity and ABI,
//! so that code found at an address can be recognized. The function table
//! maps program counters to the internal functions that start there.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::Selector;
use serde::{Deserialize, Serialize};

use super::types::{ContractKind, ContractType};

/// Width in hex characters of a library link placeholder (20 bytes)
const PLACEHOLDER_HEX_LEN: usize = 40;

/// An ABI function entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    /// Function name (e.g., "transfer")
    pub name: String,
    /// Full signature (e.g., "transfer(address,uint256)")
    pub signature: String,
}

/// One known piece of bytecode and the contract it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodingContext {
    /// Registry key
    pub context_hash: String,
    /// Bytecode as lowercase hex without 0x, possibly with link placeholders
    pub binary: String,
    /// Whether `binary` is constructor (init) code rather than deployed code
    pub is_constructor: bool,
    pub contract_id: Option<String>,
    pub contract_name: Option<String>,
    pub contract_kind: Option<ContractKind>,
    pub payable: Option<bool>,
    /// Functions indexed by 4-byte selector
    #[serde(default)]
    pub abi: HashMap<Selector, AbiEntry>,
}

impl DecodingContext {
    /// Contract type this context describes, if it names a contract
    pub fn contract_type(&self) -> Option<ContractType> {
        Some(ContractType {
            id: self.contract_id.clone()?,
            type_name: self.contract_name.clone()?,
            contract_kind: self.contract_kind,
            payable: self.payable,
        })
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: Selector) -> Option<&AbiEntry> {
        self.abi.get(&selector)
    }

    /// Check whether `code` (lowercase hex, no 0x) is an instance of this context.
    ///
    /// Deployed code must match in full. Constructor code may carry trailing
    /// constructor arguments, so it only has to start with the binary. Link
    /// placeholders in the binary match any 20 bytes.
    fn matches(&self, code: &str) -> bool {
        let pattern = self.binary.as_bytes();
        let code = code.as_bytes();

        if pattern.is_empty() {
            return false;
        }

        let mut i = 0;
        while i < pattern.len() {
            if pattern[i..].starts_with(b"__") && i + PLACEHOLDER_HEX_LEN <= pattern.len() {
                if code.len() < i + PLACEHOLDER_HEX_LEN {
                    return false;
                }
                i += PLACEHOLDER_HEX_LEN;
                continue;
            }
            if i >= code.len() || pattern[i] != code[i] {
                return false;
            }
            i += 1;
        }

        if self.is_constructor {
            code.len() >= pattern.len()
        } else {
            code.len() == pattern.len()
        }
    }
}

/// Registry of decoding contexts keyed by context hash
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Contexts {
    contexts: BTreeMap<String, DecodingContext>,
}

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a context. The binary is normalized to lowercase hex without 0x.
    ///
    /// Note: First context for a given hash wins (no overwrite)
    pub fn insert(&mut self, mut context: DecodingContext) {
        context.binary = normalize_hex(&context.binary);
        self.contexts
            .entry(context.context_hash.clone())
            .or_insert(context);
    }

    pub fn get(&self, context_hash: &str) -> Option<&DecodingContext> {
        self.contexts.get(context_hash)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecodingContext> {
        self.contexts.values()
    }

    /// Merge another registry into this one (first wins)
    pub fn merge(&mut self, other: Self) {
        for (hash, context) in other.contexts {
            self.contexts.entry(hash).or_insert(context);
        }
    }

    /// Find the context whose bytecode matches `code`.
    ///
    /// Deployed contexts are tried before constructor contexts; within each
    /// group the lowest context hash wins, so the result is deterministic.
    pub fn find_context(&self, code: &[u8]) -> Option<&DecodingContext> {
        let code = hex::encode(code);
        self.iter()
            .filter(|context| !context.is_constructor)
            .chain(self.iter().filter(|context| context.is_constructor))
            .find(|context| context.matches(&code))
    }

    /// Find the deployed context of the contract with the given id
    pub fn find_deployed_by_id(&self, contract_id: &str) -> Option<&DecodingContext> {
        self.iter().find(|context| {
            !context.is_constructor && context.contract_id.as_deref() == Some(contract_id)
        })
    }
}

/// Lowercase hex without 0x prefix
pub(crate) fn normalize_hex(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_lowercase()
}

/// Internal function metadata for one program counter
///
/// Designated-invalid entries mark jump destinations that only revert; their
/// name and contract fields are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionTableEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub contract_name: String,
    #[serde(default)]
    pub contract_kind: Option<ContractKind>,
    #[serde(default)]
    pub contract_payable: Option<bool>,
    #[serde(default)]
    pub is_designated_invalid: bool,
}

impl FunctionTableEntry {
    /// The entry for a designated-invalid jump destination
    pub fn designated_invalid() -> Self {
        Self {
            is_designated_invalid: true,
            ..Self::default()
        }
    }

    /// Contract the function is defined in
    pub fn defining_contract(&self) -> ContractType {
        ContractType {
            id: self.contract_id.clone(),
            type_name: self.contract_name.clone(),
            contract_kind: self.contract_kind,
            payable: self.contract_payable,
        }
    }
}

/// Program counter -> internal function table
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionTable {
    entries: HashMap<u32, FunctionTableEntry>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pc: u32, entry: FunctionTableEntry) {
        self.entries.insert(pc, entry);
    }

    pub fn get(&self, pc: u32) -> Option<&FunctionTableEntry> {
        self.entries.get(&pc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(hash: &str, binary: &str, is_constructor: bool) -> DecodingContext {
        DecodingContext {
            context_hash: hash.to_string(),
            binary: binary.to_string(),
            is_constructor,
            contract_id: Some("1".to_string()),
            contract_name: Some("Token".to_string()),
            contract_kind: Some(ContractKind::Contract),
            payable: Some(false),
            abi: HashMap::new(),
        }
    }

    #[test]
    fn test_exact_match() {
        let mut contexts = Contexts::new();
        contexts.insert(context("a", "0x6080AB", false));

        assert!(contexts.find_context(&[0x60, 0x80, 0xab]).is_some());
        assert!(contexts.find_context(&[0x60, 0x80]).is_none());
        assert!(contexts.find_context(&[0x60, 0x80, 0xab, 0x00]).is_none());
    }

    #[test]
    fn test_constructor_prefix_match() {
        let mut contexts = Contexts::new();
        contexts.insert(context("c", "6080", true));

        let found = contexts.find_context(&[0x60, 0x80, 0x00, 0x2a]).unwrap();
        assert!(found.is_constructor);
    }

    #[test]
    fn test_placeholder_match() {
        let binary = format!("73{}5f", "__$0123456789abcdef0123456789abcdef01$__");
        assert_eq!(binary.len(), 2 + PLACEHOLDER_HEX_LEN + 2);

        let mut contexts = Contexts::new();
        contexts.insert(context("p", &binary, false));

        let mut code = vec![0x73];
        code.extend([0x11; 20]);
        code.push(0x5f);
        assert!(contexts.find_context(&code).is_some());

        code[21] = 0x60;
        assert!(contexts.find_context(&code).is_none());
    }

    #[test]
    fn test_contexts_json_round_trip() {
        let selector = Selector::from([0xa9, 0x05, 0x9c, 0xbb]);
        let mut token = context("t", "6080ab", false);
        token.abi.insert(
            selector,
            AbiEntry {
                name: "transfer".to_string(),
                signature: "transfer(address,uint256)".to_string(),
            },
        );
        let mut contexts = Contexts::new();
        contexts.insert(token.clone());
        contexts.insert(context("c", "6080", true));

        let json = serde_json::to_string(&contexts).unwrap();
        let restored: Contexts = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("t"), Some(&token));
        assert_eq!(
            restored
                .find_context(&[0x60, 0x80, 0xab])
                .and_then(|found| found.lookup(selector))
                .map(|entry| entry.name.as_str()),
            Some("transfer")
        );
    }

    #[test]
    fn test_empty_binary_never_matches() {
        let mut contexts = Contexts::new();
        contexts.insert(context("i", "0x", false));
        assert!(contexts.find_context(&[]).is_none());
    }

    #[test]
    fn test_find_deployed_by_id() {
        let mut contexts = Contexts::new();
        contexts.insert(context("ctor", "6080", true));
        contexts.insert(context("dep", "6081", false));

        let found = contexts.find_deployed_by_id("1").unwrap();
        assert_eq!(found.context_hash, "dep");
        assert!(contexts.find_deployed_by_id("2").is_none());
    }

    #[test]
    fn test_function_table_from_json() {
        let json = r#"{
            "10": { "name": "add", "contractId": "3", "contractName": "Math", "contractKind": "library" },
            "20": { "isDesignatedInvalid": true }
        }"#;
        let table: FunctionTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.len(), 2);
        let add = table.get(10).unwrap();
        assert_eq!(add.name, "add");
        assert_eq!(add.defining_contract().contract_kind, Some(ContractKind::Library));
        assert!(table.get(20).unwrap().is_designated_invalid);
        assert!(table.get(30).is_none());
    }
}
