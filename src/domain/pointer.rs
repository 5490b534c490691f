//! Data pointers into EVM state

use std::fmt;

use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

/// Locates the raw bytes of one value inside EVM state.
///
/// The decoder never inspects a pointer; it only hands it to the
/// [`StateReader`](crate::domain::StateReader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "location", rename_all = "lowercase")]
pub enum DataPointer {
    /// Stack words `from..=to`, counted from the bottom of the stack
    Stack { from: usize, to: usize },
    /// Bytes already taken off the stack (or otherwise known up front)
    #[serde(rename = "stackliteral")]
    StackLiteral { literal: Bytes },
    Memory { start: usize, length: usize },
    Calldata { start: usize, length: usize },
    /// Bytes of the code currently executing
    Code { start: usize, length: usize },
    /// Bytes `from..=to` of one storage slot
    Storage { slot: U256, from: u8, to: u8 },
}

impl DataPointer {
    /// Pointer to a whole storage slot
    pub fn storage_slot(slot: U256) -> Self {
        DataPointer::Storage {
            slot,
            from: 0,
            to: 31,
        }
    }

    /// Pointer to a single stack word
    pub fn stack_word(index: usize) -> Self {
        DataPointer::Stack {
            from: index,
            to: index,
        }
    }

    /// Pointer to literal bytes
    pub fn literal(bytes: impl Into<Bytes>) -> Self {
        DataPointer::StackLiteral {
            literal: bytes.into(),
        }
    }
}

impl fmt::Display for DataPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPointer::Stack { from, to } => write!(f, "stack[{}..={}]", from, to),
            DataPointer::StackLiteral { literal } => {
                write!(f, "literal(0x{})", hex::encode(literal))
            }
            DataPointer::Memory { start, length } => write!(f, "memory[{}; {}]", start, length),
            DataPointer::Calldata { start, length } => {
                write!(f, "calldata[{}; {}]", start, length)
            }
            DataPointer::Code { start, length } => write!(f, "code[{}; {}]", start, length),
            DataPointer::Storage { slot, from, to } => {
                write!(f, "storage[{:#x}][{}..={}]", slot, from, to)
            }
        }
    }
}
