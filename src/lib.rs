//! Typed decoding of raw EVM values
//!
//! Given a pointer into stack, memory, storage, calldata or code and the
//! Solidity type that should live there, [`decode`] produces a typed value or
//! a precise, diagnosable error.
//!
//! ```no_run
//! use poke_decode::{decode_blocking, DataPointer, DecodeMode, Type};
//! # fn example(info: &poke_decode::EvmInfo<'_>) -> Result<(), poke_decode::DecodeError> {
//! let result = decode_blocking(
//!     &Type::Uint { bits: 8 },
//!     &DataPointer::stack_word(0),
//!     info,
//!     DecodeMode::Normal,
//! )?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decode;
pub mod domain;
pub mod infrastructure;

pub use decode::{decode, decode_blocking, DecodeError, DecodeMode, StopDecodingError};
pub use domain::{
    ContractType, Contexts, CurrentContext, DataPointer, DecoderResult, DecodingError, EvmInfo,
    FunctionTable, StateReader, Type, TypedValue, UserDefinedTypes, Value,
};
pub use infrastructure::{ArtifactScanner, MemoryState};
