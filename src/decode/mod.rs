//! Value decode dispatcher
//!
//! [`decode`] reads the bytes behind a pointer and interprets them according
//! to a type descriptor. Reading, and fetching contract code for contract and
//! external function values, are the only points where a decode waits on
//! the [`StateReader`](crate::domain::StateReader).

mod contract;
mod internal;
mod padding;

use alloy_primitives::{Address, Bytes, I256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{
    raw_hex, AddressError, BoolError, BytesKind, BytesStaticError, ContractError, DataPointer,
    DecoderResult, DecodingError, EnumError, EnumType, ErrorResult, EvmInfo, FixedError,
    FunctionExternalError, FunctionInternalError, IntError, RawNumber, RawString, ReadError, Type,
    TypedValue, UfixedError, UintError, Value, Visibility,
};

pub use contract::{resolve_contract, resolve_external_function};
pub use internal::resolve_internal_function;
pub use padding::{check_padding_left, check_padding_right, check_padding_signed};

/// Size of an EVM word in bytes
pub const WORD_SIZE: usize = 32;
/// Size of an address in bytes
pub const ADDRESS_SIZE: usize = 20;
/// Size of a function selector in bytes
pub const SELECTOR_SIZE: usize = 4;
/// Size of one program counter in an internal function pointer
pub const PC_SIZE: usize = 4;

/// How strictly to decode
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Enforce padding, embed errors in the result
    #[default]
    Normal,
    /// Skip padding checks, embed errors in the result
    Permissive,
    /// Enforce padding, stop at the first error
    Strict,
}

/// A decode that could not produce a [`DecoderResult`]
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Strict mode hit an error
    #[error(transparent)]
    Stopped(#[from] StopDecodingError),
    /// The state reader could not provide the code at an address
    #[error("failed to fetch code at {address}")]
    CodeFetch {
        address: Address,
        #[source]
        source: ReadError,
    },
    /// A contract matched a context, but no deployed context carries its id
    #[error("contract {contract_id} was recognized but has no deployed context")]
    InconsistentRegistry { contract_id: String },
}

/// The strict-mode abort, carrying the error that caused it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decoding stopped: {0}")]
pub struct StopDecodingError(pub Box<ErrorResult>);

impl StopDecodingError {
    pub fn error_result(&self) -> &ErrorResult {
        &self.0
    }
}

/// Decode the value of type `ty` found at `pointer`.
///
/// In normal and permissive mode every problem with the bytes themselves is
/// returned as [`DecoderResult::Error`]. In strict mode the same problems
/// become [`DecodeError::Stopped`].
pub async fn decode(
    ty: &Type,
    pointer: &DataPointer,
    info: &EvmInfo<'_>,
    mode: DecodeMode,
) -> Result<DecoderResult, DecodeError> {
    trace!(target: "poke_decode::decode", %ty, %pointer, ?mode, "decoding value");

    let bytes = match info.state.read(pointer).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(target: "poke_decode::decode", %pointer, error = %err, "read failed");
            return fail(mode, ty.clone(), err.into());
        }
    };
    let bytes = &bytes[..];
    let check_padding = mode != DecodeMode::Permissive;

    match ty {
        Type::Bool => {
            if check_padding && !check_padding_left(bytes, 1) {
                return fail(mode, ty.clone(), BoolError::Padding { raw: raw_hex(bytes) }.into());
            }
            match to_u256(bytes) {
                Some(n) if n.is_zero() => ok(ty.clone(), Value::Bool(false)),
                Some(n) if n == U256::from(1) => ok(ty.clone(), Value::Bool(true)),
                _ => fail(
                    mode,
                    ty.clone(),
                    BoolError::OutOfRange {
                        raw_as_number: raw_number(bytes),
                    }
                    .into(),
                ),
            }
        }

        Type::Uint { bits } => {
            let length = width_in_bytes(*bits);
            if check_padding && !check_padding_left(bytes, length) {
                return fail(mode, ty.clone(), UintError::Padding { raw: raw_hex(bytes) }.into());
            }
            let value = U256::from_be_slice(rightmost_slice(bytes, length));
            ok(ty.clone(), Value::Uint(value))
        }

        Type::Int { bits } => {
            let length = width_in_bytes(*bits);
            if check_padding && !check_padding_signed(bytes, length) {
                return fail(mode, ty.clone(), IntError::Padding { raw: raw_hex(bytes) }.into());
            }
            ok(ty.clone(), Value::Int(to_i256(rightmost_slice(bytes, length))))
        }

        Type::Address { .. } => {
            if check_padding && !check_padding_left(bytes, ADDRESS_SIZE) {
                return fail(mode, ty.clone(), AddressError::Padding { raw: raw_hex(bytes) }.into());
            }
            let address = Address::from(rightmost::<ADDRESS_SIZE>(bytes));
            ok(ty.clone(), Value::Address(address))
        }

        Type::Contract(_) => {
            let full = ty.full(info.user_defined_types);
            if check_padding && !check_padding_left(bytes, ADDRESS_SIZE) {
                return fail(mode, full, ContractError::Padding { raw: raw_hex(bytes) }.into());
            }
            let contract = resolve_contract(bytes, info).await?;
            ok(full, Value::Contract(contract))
        }

        Type::Bytes {
            kind: BytesKind::Static { length },
        } => {
            let length = usize::from(*length);
            if check_padding && !check_padding_right(bytes, length) {
                return fail(
                    mode,
                    ty.clone(),
                    BytesStaticError::Padding { raw: raw_hex(bytes) }.into(),
                );
            }
            let value = Bytes::copy_from_slice(&bytes[..length.min(bytes.len())]);
            ok(ty.clone(), Value::Bytes(value))
        }

        Type::Bytes {
            kind: BytesKind::Dynamic,
        } => ok(ty.clone(), Value::Bytes(Bytes::copy_from_slice(bytes))),

        Type::String => ok(ty.clone(), Value::String(RawString::new(bytes))),

        Type::Function {
            visibility: Visibility::External,
        } => {
            if check_padding && !check_padding_right(bytes, ADDRESS_SIZE + SELECTOR_SIZE) {
                return fail(
                    mode,
                    ty.clone(),
                    FunctionExternalError::NonStackPadding { raw: raw_hex(bytes) }.into(),
                );
            }
            let word = leftmost::<{ ADDRESS_SIZE + SELECTOR_SIZE }>(bytes);
            let (address, selector) = word.split_at(ADDRESS_SIZE);
            let function = resolve_external_function(address, selector, info).await?;
            ok(ty.clone(), Value::FunctionExternal(function))
        }

        Type::Function {
            visibility: Visibility::Internal,
        } => {
            if check_padding && !check_padding_left(bytes, 2 * PC_SIZE) {
                return fail(
                    mode,
                    ty.clone(),
                    FunctionInternalError::Padding { raw: raw_hex(bytes) }.into(),
                );
            }
            let word = rightmost::<{ 2 * PC_SIZE }>(bytes);
            let constructor_pc = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            let deployed_pc = u32::from_be_bytes([word[4], word[5], word[6], word[7]]);
            match resolve_internal_function(deployed_pc, constructor_pc, info) {
                Ok(function) => ok(ty.clone(), Value::FunctionInternal(function)),
                Err(err) => fail(mode, ty.clone(), err.into()),
            }
        }

        Type::Enum(_) => {
            let full = ty.full(info.user_defined_types);
            let options = match &full {
                Type::Enum(EnumType {
                    options: Some(options),
                    ..
                }) => options,
                _ => {
                    return fail(
                        mode,
                        full.clone(),
                        EnumError::NotFound {
                            raw_as_number: raw_number(bytes),
                        }
                        .into(),
                    )
                }
            };
            if check_padding && !check_padding_left(bytes, enum_width(options.len())) {
                return fail(mode, full.clone(), EnumError::Padding { raw: raw_hex(bytes) }.into());
            }
            let option = to_u256(bytes).and_then(|n| {
                let index = usize::try_from(u64::try_from(n).ok()?).ok()?;
                options.get(index).map(|name| (n, name))
            });
            match option {
                Some((numeric, name)) => {
                    let value = Value::Enum {
                        numeric,
                        name: name.clone(),
                    };
                    ok(full.clone(), value)
                }
                None => fail(
                    mode,
                    full.clone(),
                    EnumError::OutOfRange {
                        raw_as_number: raw_number(bytes),
                    }
                    .into(),
                ),
            }
        }

        Type::Fixed { .. } => fail(
            mode,
            ty.clone(),
            FixedError::NotYetSupported { raw: raw_hex(bytes) }.into(),
        ),

        Type::Ufixed { .. } => fail(
            mode,
            ty.clone(),
            UfixedError::NotYetSupported { raw: raw_hex(bytes) }.into(),
        ),
    }
}

/// Run [`decode`] to completion on the current thread.
///
/// For callers without an async runtime; the state reader's futures are
/// polled in place.
pub fn decode_blocking(
    ty: &Type,
    pointer: &DataPointer,
    info: &EvmInfo<'_>,
    mode: DecodeMode,
) -> Result<DecoderResult, DecodeError> {
    futures::executor::block_on(decode(ty, pointer, info, mode))
}

fn ok(ty: Type, value: Value) -> Result<DecoderResult, DecodeError> {
    Ok(DecoderResult::Value(TypedValue { ty, value }))
}

fn fail(mode: DecodeMode, ty: Type, error: DecodingError) -> Result<DecoderResult, DecodeError> {
    let result = ErrorResult { ty, error };
    if mode == DecodeMode::Strict {
        debug!(target: "poke_decode::decode", error = %result, "stopping decode");
        return Err(StopDecodingError(Box::new(result)).into());
    }
    trace!(target: "poke_decode::decode", error = %result, "embedding decoding error");
    Ok(DecoderResult::Error(result))
}

/// Bytes occupied by an integer of `bits` bits, at most one word
fn width_in_bytes(bits: u16) -> usize {
    usize::from(bits / 8).min(WORD_SIZE)
}

/// Bytes needed to hold the index of any of `count` enum options
fn enum_width(count: usize) -> usize {
    let bits = usize::BITS - count.saturating_sub(1).leading_zeros();
    (bits as usize).div_ceil(8)
}

/// Numeric value of big-endian bytes, or None if it needs more than 256 bits
fn to_u256(bytes: &[u8]) -> Option<U256> {
    let (high, low) = bytes.split_at(bytes.len().saturating_sub(WORD_SIZE));
    high.iter()
        .all(|&b| b == 0)
        .then(|| U256::from_be_slice(low))
}

/// Diagnostic form of a numeric read; hex when it does not fit a word
fn raw_number(bytes: &[u8]) -> RawNumber {
    match to_u256(bytes) {
        Some(value) => RawNumber::Word(value),
        None => RawNumber::Wide(raw_hex(bytes)),
    }
}

/// Two's complement value of big-endian bytes (at most one word)
fn to_i256(bytes: &[u8]) -> I256 {
    let negative = bytes.first().is_some_and(|b| b & 0x80 != 0);
    let mut word = if negative { [0xff; WORD_SIZE] } else { [0; WORD_SIZE] };
    word[WORD_SIZE - bytes.len()..].copy_from_slice(bytes);
    I256::from_raw(U256::from_be_bytes(word))
}

fn rightmost_slice(bytes: &[u8], length: usize) -> &[u8] {
    &bytes[bytes.len().saturating_sub(length)..]
}

/// The last `N` bytes, zero-extended on the left if there are fewer
pub(crate) fn rightmost<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let tail = rightmost_slice(bytes, N);
    let mut out = [0u8; N];
    out[N - tail.len()..].copy_from_slice(tail);
    out
}

/// The first `N` bytes, zero-extended on the right if there are fewer
pub(crate) fn leftmost<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let head = &bytes[..N.min(bytes.len())];
    let mut out = [0u8; N];
    out[..head.len()].copy_from_slice(head);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_width() {
        assert_eq!(enum_width(1), 0);
        assert_eq!(enum_width(2), 1);
        assert_eq!(enum_width(3), 1);
        assert_eq!(enum_width(256), 1);
        assert_eq!(enum_width(257), 2);
    }

    #[test]
    fn test_to_u256_rejects_wide_values() {
        let mut bytes = vec![0u8; 33];
        bytes[32] = 7;
        assert_eq!(to_u256(&bytes), Some(U256::from(7)));

        bytes[0] = 1;
        assert_eq!(to_u256(&bytes), None);
        assert_eq!(raw_number(&bytes).to_string(), format!("0x01{}07", "00".repeat(31)));
    }

    #[test]
    fn test_to_i256_sign_extends() {
        assert_eq!(to_i256(&[0xff]), I256::MINUS_ONE);
        assert_eq!(to_i256(&[0x7f]), "127".parse::<I256>().unwrap());
        assert_eq!(to_i256(&[0xff, 0x38]), "-200".parse::<I256>().unwrap());
    }

    #[test]
    fn test_windows() {
        assert_eq!(rightmost::<4>(&[1, 2]), [0, 0, 1, 2]);
        assert_eq!(rightmost::<2>(&[1, 2, 3]), [2, 3]);
        assert_eq!(leftmost::<4>(&[1, 2]), [1, 2, 0, 0]);
        assert_eq!(leftmost::<2>(&[1, 2, 3]), [1, 2]);
    }
}
