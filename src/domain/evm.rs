//! EVM info passed through every decode, and the state read protocol

use alloy_primitives::{Address, Bytes};

use super::context::{Contexts, FunctionTable};
use super::pointer::DataPointer;
use super::types::{ContractType, UserDefinedTypes};

/// Reads bytes out of a snapshot of EVM state.
///
/// Both methods are suspension points of a decode. Implementations may
/// answer immediately (an in-memory snapshot) or go to the network.
#[async_trait::async_trait]
pub trait StateReader: Send + Sync {
    /// Read the bytes a pointer refers to
    async fn read(&self, pointer: &DataPointer) -> Result<Bytes, ReadError>;

    /// Fetch the deployed code at an address (empty if there is none)
    async fn code(&self, address: Address) -> Result<Bytes, ReadError>;
}

/// A read that falls outside the available state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
pub enum ReadError {
    #[error("stack words {from}..={to} out of range (stack depth {depth})")]
    Stack { from: usize, to: usize, depth: usize },
    #[error("invalid storage byte range {from}..={to}")]
    StorageRange { from: u8, to: u8 },
    #[error("{location} range starting at {start} with length {length} overflows")]
    Overflow {
        location: &'static str,
        start: usize,
        length: usize,
    },
    #[error("failed to fetch code at {address}: {reason}")]
    Code { address: Address, reason: String },
}

/// The contract whose execution is being inspected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentContext {
    pub contract: ContractType,
    /// Whether execution is inside the constructor
    pub is_constructor: bool,
}

/// Read-only context for a decode
///
/// May be shared by any number of decodes, provided the state behind it does
/// not change while they run.
pub struct EvmInfo<'a> {
    pub state: &'a dyn StateReader,
    pub contexts: &'a Contexts,
    pub user_defined_types: &'a UserDefinedTypes,
    /// Internal function table, when one was built for the current contract
    pub function_table: Option<&'a FunctionTable>,
    pub current_context: CurrentContext,
}

impl std::fmt::Debug for EvmInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmInfo")
            .field("contexts", &self.contexts.len())
            .field("user_defined_types", &self.user_defined_types.len())
            .field("function_table", &self.function_table.map(FunctionTable::len))
            .field("current_context", &self.current_context)
            .finish_non_exhaustive()
    }
}
