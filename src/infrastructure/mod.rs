//! Infrastructure layer - concrete collaborators for the decoder
//!
//! This layer contains:
//! - An in-memory EVM state snapshot implementing the read protocol
//! - Build artifact scanning into decoding contexts

mod artifacts;
mod state;

pub use artifacts::{load_function_table, ArtifactScan, ArtifactScanner};
pub use state::{MemoryState, MAX_READ_LENGTH};
