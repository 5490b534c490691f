//! Decoded values and embedded decoding errors
//!
//! Every decode produces a [`DecoderResult`]: either a value or an error
//! result, both tagged with the type they were decoded against. Errors are
//! data here; the caller decides whether to render, skip, or reject them.

use std::fmt;

use alloy_primitives::{Address, Bytes, Selector, I256, U256};
use serde::Serialize;

use super::context::AbiEntry;
use super::evm::ReadError;
use super::types::{ContractType, Type};

/// Outcome of decoding one value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecoderResult {
    Value(TypedValue),
    Error(ErrorResult),
}

impl DecoderResult {
    pub fn ty(&self) -> &Type {
        match self {
            DecoderResult::Value(value) => &value.ty,
            DecoderResult::Error(error) => &error.ty,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            DecoderResult::Value(value) => Some(&value.value),
            DecoderResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DecodingError> {
        match self {
            DecoderResult::Value(_) => None,
            DecoderResult::Error(error) => Some(&error.error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DecoderResult::Error(_))
    }
}

impl fmt::Display for DecoderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderResult::Value(value) => value.fmt(f),
            DecoderResult::Error(error) => error.fmt(f),
        }
    }
}

/// A successfully decoded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedValue {
    pub ty: Type,
    pub value: Value,
}

/// A decoding error, embedded as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{ty}: {error}")]
pub struct ErrorResult {
    pub ty: Type,
    pub error: DecodingError,
}

/// The decoded datum, one variant per type class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    Bool(bool),
    Uint(U256),
    Int(I256),
    Address(Address),
    Contract(ContractValueInfo),
    Bytes(Bytes),
    String(RawString),
    FunctionExternal(FunctionExternalValueInfo),
    FunctionInternal(FunctionInternalValueInfo),
    Enum { numeric: U256, name: String },
}

/// Text whose code units are the raw bytes, one per byte.
///
/// Nothing is validated: invalid UTF-8 is kept as-is, so decoding a string
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawString(Vec<u8>);

impl RawString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// One char per byte, with the byte's value as its code point
    pub fn text(&self) -> String {
        self.0.iter().map(|&byte| char::from(byte)).collect()
    }

    /// The bytes read as UTF-8, with invalid sequences replaced
    pub fn to_utf8_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// A contract reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContractValueInfo {
    /// Code at the address matched a known context
    Known { address: Address, class: ContractType },
    Unknown { address: Address },
}

impl ContractValueInfo {
    pub fn address(&self) -> Address {
        match self {
            ContractValueInfo::Known { address, .. } | ContractValueInfo::Unknown { address } => {
                *address
            }
        }
    }
}

/// An external function reference (address + selector)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FunctionExternalValueInfo {
    Known {
        contract: ContractValueInfo,
        selector: Selector,
        abi: AbiEntry,
    },
    /// The contract is known, but has no function with this selector
    Invalid {
        contract: ContractValueInfo,
        selector: Selector,
    },
    Unknown {
        contract: ContractValueInfo,
        selector: Selector,
    },
}

/// An internal function reference (pair of program counters)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FunctionInternalValueInfo {
    Function {
        context: ContractType,
        deployed_pc: u32,
        constructor_pc: u32,
        name: String,
        defined_in: ContractType,
    },
    /// Null function pointer, or a jump to a designated-invalid destination
    Exception {
        context: ContractType,
        deployed_pc: u32,
        constructor_pc: u32,
    },
    /// No function table was available to resolve the pointer
    Unknown {
        context: ContractType,
        deployed_pc: u32,
        constructor_pc: u32,
    },
}

/// Errors embedded in an [`ErrorResult`], one variant per type class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum DecodingError {
    #[error(transparent)]
    Bool(#[from] BoolError),
    #[error(transparent)]
    Uint(#[from] UintError),
    #[error(transparent)]
    Int(#[from] IntError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    BytesStatic(#[from] BytesStaticError),
    #[error(transparent)]
    FunctionExternal(#[from] FunctionExternalError),
    #[error(transparent)]
    FunctionInternal(#[from] FunctionInternalError),
    #[error(transparent)]
    Enum(#[from] EnumError),
    #[error(transparent)]
    Fixed(#[from] FixedError),
    #[error(transparent)]
    Ufixed(#[from] UfixedError),
    /// The pointer could not be read at all
    #[error("read error: {0}")]
    Read(#[from] ReadError),
}

/// A raw numeric read as it appears in a diagnostic
///
/// Reads wider than one word whose high bytes are set cannot be shown as a
/// number, so they keep their hex form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawNumber {
    Word(U256),
    Wide(String),
}

impl From<U256> for RawNumber {
    fn from(value: U256) -> Self {
        Self::Word(value)
    }
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(value) => write!(f, "{}", value),
            Self::Wide(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum BoolError {
    #[error("bool padding error: {raw}")]
    Padding { raw: String },
    #[error("bool out of range: {raw_as_number}")]
    OutOfRange { raw_as_number: RawNumber },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum UintError {
    #[error("uint padding error: {raw}")]
    Padding { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum IntError {
    #[error("int padding error: {raw}")]
    Padding { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum AddressError {
    #[error("address padding error: {raw}")]
    Padding { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ContractError {
    #[error("contract address padding error: {raw}")]
    Padding { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum BytesStaticError {
    #[error("static bytes padding error: {raw}")]
    Padding { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum FunctionExternalError {
    /// Padding lies on the right, unlike other word-sized values
    #[error("external function padding error: {raw}")]
    NonStackPadding { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum FunctionInternalError {
    #[error("internal function padding error: {raw}")]
    Padding { raw: String },
    #[error(
        "malformed internal function pointer (deployed pc {deployed_pc}, constructor pc {constructor_pc})"
    )]
    Malformed {
        context: ContractType,
        deployed_pc: u32,
        constructor_pc: u32,
    },
    #[error("deployed-code function pointer {deployed_pc} used in constructor of {}", .context.type_name)]
    DeployedFunctionInConstructor {
        context: ContractType,
        deployed_pc: u32,
        constructor_pc: u32,
    },
    #[error(
        "no internal function at pc (deployed {deployed_pc}, constructor {constructor_pc}) in {}",
        .context.type_name
    )]
    NoSuchInternalFunction {
        context: ContractType,
        deployed_pc: u32,
        constructor_pc: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum EnumError {
    #[error("enum padding error: {raw}")]
    Padding { raw: String },
    #[error("enum out of range: {raw_as_number}")]
    OutOfRange { raw_as_number: RawNumber },
    /// The enum's options could not be resolved
    #[error("enum definition not found (raw value {raw_as_number})")]
    NotFound { raw_as_number: RawNumber },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum FixedError {
    #[error("fixed-point decoding is not yet supported: {raw}")]
    NotYetSupported { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum UfixedError {
    #[error("ufixed-point decoding is not yet supported: {raw}")]
    NotYetSupported { raw: String },
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Int(i) => write!(f, "{}", i),
            Value::Address(address) => write!(f, "{}", address.to_checksum(None)),
            Value::Contract(contract) => write!(f, "{}", display_contract(contract)),
            Value::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Value::String(s) => write!(f, "\"{}\"", s.text()),
            Value::FunctionExternal(info) => match info {
                FunctionExternalValueInfo::Known { contract, abi, .. } => {
                    write!(f, "{}.{}", display_contract(contract), abi.name)
                }
                FunctionExternalValueInfo::Invalid { contract, selector } => {
                    write!(f, "{}.{} (invalid)", display_contract(contract), selector)
                }
                FunctionExternalValueInfo::Unknown { contract, selector } => {
                    write!(f, "{}.{}", display_contract(contract), selector)
                }
            },
            Value::FunctionInternal(info) => match info {
                FunctionInternalValueInfo::Function {
                    name, defined_in, ..
                } => write!(f, "{}.{}", defined_in.type_name, name),
                FunctionInternalValueInfo::Exception { .. } => write!(f, "<exception>"),
                FunctionInternalValueInfo::Unknown {
                    deployed_pc,
                    constructor_pc,
                    ..
                } => write!(
                    f,
                    "<unknown internal function: deployed pc {}, constructor pc {}>",
                    deployed_pc, constructor_pc
                ),
            },
            Value::Enum { name, .. } => match &self.ty {
                Type::Enum(ty) => write!(f, "{}.{}", ty.qualified_name(), name),
                _ => write!(f, "{}", name),
            },
        }
    }
}

fn display_contract(contract: &ContractValueInfo) -> String {
    match contract {
        ContractValueInfo::Known { address, class } => {
            format!("{}({})", class.type_name, address.to_checksum(None))
        }
        ContractValueInfo::Unknown { address } => address.to_checksum(None),
    }
}

/// Render raw bytes for diagnostics
pub(crate) fn raw_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
