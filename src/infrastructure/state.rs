//! In-memory snapshot of EVM state

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::domain::{DataPointer, ReadError, StateReader};

/// A captured EVM state that answers reads immediately
///
/// Memory, calldata and code reads past the end are zero-filled, as the EVM
/// does for MLOAD, CALLDATALOAD and CODECOPY. Missing storage slots read as
/// zero and accounts without code have empty code.
#[derive(Debug, Default, Clone)]
pub struct MemoryState {
    /// Stack words, bottom first
    stack: Vec<B256>,
    memory: Vec<u8>,
    calldata: Vec<u8>,
    /// Code of the contract currently executing
    code: Vec<u8>,
    storage: HashMap<U256, B256>,
    /// Deployed code of other accounts
    accounts: HashMap<Address, Bytes>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a word on top of the stack
    pub fn push(mut self, word: B256) -> Self {
        self.stack.push(word);
        self
    }

    pub fn with_memory(mut self, memory: impl Into<Vec<u8>>) -> Self {
        self.memory = memory.into();
        self
    }

    pub fn with_calldata(mut self, calldata: impl Into<Vec<u8>>) -> Self {
        self.calldata = calldata.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<Vec<u8>>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_storage(mut self, slot: U256, word: B256) -> Self {
        self.storage.insert(slot, word);
        self
    }

    pub fn with_account_code(mut self, address: Address, code: impl Into<Bytes>) -> Self {
        self.accounts.insert(address, code.into());
        self
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    fn read_stack(&self, from: usize, to: usize) -> Result<Bytes, ReadError> {
        if from > to || to >= self.stack.len() {
            return Err(ReadError::Stack {
                from,
                to,
                depth: self.stack.len(),
            });
        }
        let bytes: Vec<u8> = self.stack[from..=to]
            .iter()
            .flat_map(|word| word.0)
            .collect();
        Ok(bytes.into())
    }

    fn read_storage(&self, slot: U256, from: u8, to: u8) -> Result<Bytes, ReadError> {
        if from > to || to >= 32 {
            return Err(ReadError::StorageRange { from, to });
        }
        let word = self.storage.get(&slot).copied().unwrap_or(B256::ZERO);
        Ok(Bytes::copy_from_slice(
            &word[usize::from(from)..=usize::from(to)],
        ))
    }
}

/// Largest memory, calldata or code range a single read may request
pub const MAX_READ_LENGTH: usize = 1 << 24;

/// Read `length` bytes at `start`, zero-filling past the end of `region`
fn read_padded(
    region: &[u8],
    location: &'static str,
    start: usize,
    length: usize,
) -> Result<Bytes, ReadError> {
    let overflow = ReadError::Overflow {
        location,
        start,
        length,
    };
    if length > MAX_READ_LENGTH {
        return Err(overflow);
    }
    let end = start.checked_add(length).ok_or(overflow)?;

    let mut bytes = vec![0u8; length];
    if start < region.len() {
        let available = &region[start..end.min(region.len())];
        bytes[..available.len()].copy_from_slice(available);
    }
    Ok(bytes.into())
}

#[async_trait::async_trait]
impl StateReader for MemoryState {
    async fn read(&self, pointer: &DataPointer) -> Result<Bytes, ReadError> {
        match pointer {
            DataPointer::Stack { from, to } => self.read_stack(*from, *to),
            DataPointer::StackLiteral { literal } => Ok(literal.clone()),
            DataPointer::Memory { start, length } => {
                read_padded(&self.memory, "memory", *start, *length)
            }
            DataPointer::Calldata { start, length } => {
                read_padded(&self.calldata, "calldata", *start, *length)
            }
            DataPointer::Code { start, length } => read_padded(&self.code, "code", *start, *length),
            DataPointer::Storage { slot, from, to } => self.read_storage(*slot, *from, *to),
        }
    }

    async fn code(&self, address: Address) -> Result<Bytes, ReadError> {
        Ok(self.accounts.get(&address).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stack_reads() {
        let state = MemoryState::new()
            .push(B256::repeat_byte(0x11))
            .push(B256::repeat_byte(0x22));

        let top = state.read(&DataPointer::stack_word(1)).await.unwrap();
        assert_eq!(&top[..], &[0x22; 32]);

        let both = state
            .read(&DataPointer::Stack { from: 0, to: 1 })
            .await
            .unwrap();
        assert_eq!(both.len(), 64);

        let err = state.read(&DataPointer::stack_word(2)).await.unwrap_err();
        assert_eq!(
            err,
            ReadError::Stack {
                from: 2,
                to: 2,
                depth: 2
            }
        );
    }

    #[tokio::test]
    async fn test_memory_zero_fills() {
        let state = MemoryState::new().with_memory(vec![1, 2, 3]);

        let bytes = state
            .read(&DataPointer::Memory {
                start: 1,
                length: 4,
            })
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[2, 3, 0, 0]);

        let beyond = state
            .read(&DataPointer::Memory {
                start: 10,
                length: 2,
            })
            .await
            .unwrap();
        assert_eq!(&beyond[..], &[0, 0]);

        let overflow = state
            .read(&DataPointer::Calldata {
                start: usize::MAX,
                length: 2,
            })
            .await;
        assert!(matches!(overflow, Err(ReadError::Overflow { .. })));
    }

    #[tokio::test]
    async fn test_oversized_read_is_rejected() {
        let state = MemoryState::new()
            .with_memory(vec![1, 2, 3, 4])
            .with_code(vec![0x60]);

        let huge = state
            .read(&DataPointer::Memory {
                start: 0,
                length: usize::MAX / 2,
            })
            .await
            .unwrap_err();
        assert_eq!(
            huge,
            ReadError::Overflow {
                location: "memory",
                start: 0,
                length: usize::MAX / 2
            }
        );

        let code = state
            .read(&DataPointer::Code {
                start: 0,
                length: MAX_READ_LENGTH + 1,
            })
            .await;
        assert!(matches!(code, Err(ReadError::Overflow { location: "code", .. })));

        let largest = state
            .read(&DataPointer::Calldata {
                start: 0,
                length: MAX_READ_LENGTH,
            })
            .await
            .unwrap();
        assert_eq!(largest.len(), MAX_READ_LENGTH);
    }

    #[tokio::test]
    async fn test_storage_ranges() {
        let mut word = [0u8; 32];
        word[31] = 0xaa;
        word[30] = 0xbb;
        let state = MemoryState::new().with_storage(U256::from(3), B256::from(word));

        let slot = state
            .read(&DataPointer::storage_slot(U256::from(3)))
            .await
            .unwrap();
        assert_eq!(slot[31], 0xaa);

        let part = state
            .read(&DataPointer::Storage {
                slot: U256::from(3),
                from: 30,
                to: 31,
            })
            .await
            .unwrap();
        assert_eq!(&part[..], &[0xbb, 0xaa]);

        let empty = state
            .read(&DataPointer::storage_slot(U256::from(4)))
            .await
            .unwrap();
        assert_eq!(&empty[..], &[0u8; 32]);

        let err = state
            .read(&DataPointer::Storage {
                slot: U256::ZERO,
                from: 4,
                to: 32,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ReadError::StorageRange { from: 4, to: 32 });
    }

    #[tokio::test]
    async fn test_account_code() {
        let address = Address::repeat_byte(0x42);
        let state = MemoryState::new().with_account_code(address, vec![0x60, 0x80]);

        assert_eq!(&state.code(address).await.unwrap()[..], &[0x60, 0x80]);
        assert!(state.code(Address::ZERO).await.unwrap().is_empty());
    }
}
