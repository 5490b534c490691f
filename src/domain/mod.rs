//! Domain models for value decoding
//!
//! This module defines the type descriptors, pointers, decoded values and
//! registries, independent of where the bytes come from.

mod context;
mod evm;
mod pointer;
mod types;
mod values;

pub(crate) use context::normalize_hex;
pub(crate) use values::raw_hex;

pub use context::{AbiEntry, Contexts, DecodingContext, FunctionTable, FunctionTableEntry};
pub use evm::{CurrentContext, EvmInfo, ReadError, StateReader};
pub use pointer::DataPointer;
pub use types::{
    BytesKind, ContractKind, ContractType, EnumType, Type, TypeParseError, UserDefinedType,
    UserDefinedTypes, Visibility,
};
pub use values::{
    AddressError, BoolError, BytesStaticError, ContractError, ContractValueInfo, DecoderResult,
    DecodingError, EnumError, ErrorResult, FixedError, FunctionExternalError,
    FunctionExternalValueInfo, FunctionInternalError, FunctionInternalValueInfo, IntError,
    RawNumber, RawString, TypedValue, UfixedError, UintError, Value,
};
