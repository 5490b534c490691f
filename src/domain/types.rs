//! Solidity type descriptors
//!
//! A [`Type`] tells the decoder how to interpret the raw bytes behind a
//! pointer. Descriptors for user-defined types (contracts, enums) may be
//! partial; [`Type::full`] fills in the missing pieces from a
//! [`UserDefinedTypes`] registry.

use std::collections::HashMap;
use std::fmt;

use alloy_dyn_abi::DynSolType;
use serde::{Deserialize, Serialize};

/// Kind of a contract-like type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Contract,
    Interface,
    Library,
}

/// Whether a `bytes` type is fixed-size (`bytes1`..`bytes32`) or dynamic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BytesKind {
    Static { length: u8 },
    Dynamic,
}

/// Function reference visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    External,
    Internal,
}

/// A contract type, as declared in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractType {
    /// Compiler-assigned identifier (AST id or similar)
    pub id: String,
    /// Contract name (e.g., "ERC20")
    pub type_name: String,
    /// Contract kind, if known
    #[serde(default)]
    pub contract_kind: Option<ContractKind>,
    /// Whether the contract has a payable fallback or receive function
    #[serde(default)]
    pub payable: Option<bool>,
}

/// An enum type, as declared in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    /// Compiler-assigned identifier
    pub id: String,
    /// Enum name (e.g., "State")
    pub type_name: String,
    /// Name of the contract the enum is declared in (None for file-level enums)
    #[serde(default)]
    pub defining_contract_name: Option<String>,
    /// Declared options, in declaration order. None until resolved.
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

impl EnumType {
    /// Qualified name (e.g., "Token.State")
    pub fn qualified_name(&self) -> String {
        match &self.defining_contract_name {
            Some(contract) => format!("{}.{}", contract, self.type_name),
            None => self.type_name.clone(),
        }
    }
}

/// A Solidity-level type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typeClass", rename_all = "lowercase")]
pub enum Type {
    Bool,
    Uint { bits: u16 },
    Int { bits: u16 },
    Address { payable: bool },
    Contract(ContractType),
    Bytes { kind: BytesKind },
    String,
    Function { visibility: Visibility },
    Enum(EnumType),
    Fixed { bits: u16, places: u8 },
    Ufixed { bits: u16, places: u8 },
}

impl Type {
    /// Type class name, used in diagnostics
    pub fn type_class(&self) -> &'static str {
        match self {
            Type::Bool => "bool",
            Type::Uint { .. } => "uint",
            Type::Int { .. } => "int",
            Type::Address { .. } => "address",
            Type::Contract(_) => "contract",
            Type::Bytes { .. } => "bytes",
            Type::String => "string",
            Type::Function { .. } => "function",
            Type::Enum(_) => "enum",
            Type::Fixed { .. } => "fixed",
            Type::Ufixed { .. } => "ufixed",
        }
    }

    /// Resolve the descriptor against the user-defined type registry.
    ///
    /// Enum options and contract kind/payability missing from the descriptor
    /// are taken from the registry entry with the same id. Descriptors the
    /// registry knows nothing about are returned unchanged.
    pub fn full(&self, registry: &UserDefinedTypes) -> Type {
        match self {
            Type::Enum(ty) if ty.options.is_none() => match registry.get(&ty.id) {
                Some(UserDefinedType::Enum(definition)) => Type::Enum(definition.clone()),
                _ => self.clone(),
            },
            Type::Contract(ty) => match registry.get(&ty.id) {
                Some(UserDefinedType::Contract(definition)) => Type::Contract(ContractType {
                    id: ty.id.clone(),
                    type_name: ty.type_name.clone(),
                    contract_kind: ty.contract_kind.or(definition.contract_kind),
                    payable: ty.payable.or(definition.payable),
                }),
                _ => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Parse an elementary ABI type string (e.g., "uint8", "bytes32", "function")
    ///
    /// ABI `function` types are always external function references.
    pub fn from_abi_type(abi_type: &str) -> Result<Type, TypeParseError> {
        let parsed = DynSolType::parse(abi_type.trim()).map_err(|e| TypeParseError::Invalid {
            input: abi_type.to_string(),
            reason: e.to_string(),
        })?;

        let ty = match parsed {
            DynSolType::Bool => Type::Bool,
            DynSolType::Uint(bits) => Type::Uint { bits: bits as u16 },
            DynSolType::Int(bits) => Type::Int { bits: bits as u16 },
            DynSolType::Address => Type::Address { payable: false },
            DynSolType::FixedBytes(length) => Type::Bytes {
                kind: BytesKind::Static {
                    length: length as u8,
                },
            },
            DynSolType::Bytes => Type::Bytes {
                kind: BytesKind::Dynamic,
            },
            DynSolType::String => Type::String,
            DynSolType::Function => Type::Function {
                visibility: Visibility::External,
            },
            _ => {
                return Err(TypeParseError::NotElementary {
                    input: abi_type.to_string(),
                })
            }
        };

        Ok(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Uint { bits } => write!(f, "uint{}", bits),
            Type::Int { bits } => write!(f, "int{}", bits),
            Type::Address { payable: true } => write!(f, "address payable"),
            Type::Address { payable: false } => write!(f, "address"),
            Type::Contract(ty) => write!(f, "contract {}", ty.type_name),
            Type::Bytes {
                kind: BytesKind::Static { length },
            } => write!(f, "bytes{}", length),
            Type::Bytes {
                kind: BytesKind::Dynamic,
            } => write!(f, "bytes"),
            Type::String => write!(f, "string"),
            Type::Function {
                visibility: Visibility::External,
            } => write!(f, "function external"),
            Type::Function {
                visibility: Visibility::Internal,
            } => write!(f, "function internal"),
            Type::Enum(ty) => write!(f, "enum {}", ty.qualified_name()),
            Type::Fixed { bits, places } => write!(f, "fixed{}x{}", bits, places),
            Type::Ufixed { bits, places } => write!(f, "ufixed{}x{}", bits, places),
        }
    }
}

/// Errors from [`Type::from_abi_type`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    #[error("invalid ABI type '{input}': {reason}")]
    Invalid { input: String, reason: String },
    #[error("'{input}' is not an elementary type")]
    NotElementary { input: String },
}

/// A user-defined type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typeClass", rename_all = "lowercase")]
pub enum UserDefinedType {
    Contract(ContractType),
    Enum(EnumType),
}

impl UserDefinedType {
    pub fn id(&self) -> &str {
        match self {
            UserDefinedType::Contract(ty) => &ty.id,
            UserDefinedType::Enum(ty) => &ty.id,
        }
    }
}

/// Registry of user-defined types indexed by id
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UserDefinedTypes {
    types: HashMap<String, UserDefinedType>,
}

impl UserDefinedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing any previous one with the same id
    pub fn insert(&mut self, definition: UserDefinedType) {
        self.types.insert(definition.id().to_string(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&UserDefinedType> {
        self.types.get(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
