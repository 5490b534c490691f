//! Contract and external function resolution

use alloy_primitives::{Address, Selector};
use tracing::{trace, warn};

use super::{rightmost, DecodeError, ADDRESS_SIZE, SELECTOR_SIZE};
use crate::domain::{ContractValueInfo, DecodingContext, EvmInfo, FunctionExternalValueInfo};

/// Identify the contract at an address by the code deployed there.
///
/// Code that matches a context naming a contract gives a known contract;
/// anything else gives an unknown one. Only a failed code fetch is an error.
pub async fn resolve_contract(
    address_bytes: &[u8],
    info: &EvmInfo<'_>,
) -> Result<ContractValueInfo, DecodeError> {
    let address = Address::from(rightmost::<ADDRESS_SIZE>(address_bytes));

    let code = info
        .state
        .code(address)
        .await
        .map_err(|source| DecodeError::CodeFetch { address, source })?;

    let class = info
        .contexts
        .find_context(&code)
        .and_then(DecodingContext::contract_type);

    trace!(
        target: "poke_decode::contract",
        %address,
        code_len = code.len(),
        contract = class.as_ref().map(|c| c.type_name.as_str()),
        "resolved contract"
    );

    Ok(match class {
        Some(class) => ContractValueInfo::Known { address, class },
        None => ContractValueInfo::Unknown { address },
    })
}

/// Classify an external function reference.
///
/// An unknown contract gives an unknown function. A known contract gives a
/// known function if its ABI has the selector, and an invalid one otherwise.
pub async fn resolve_external_function(
    address_bytes: &[u8],
    selector_bytes: &[u8],
    info: &EvmInfo<'_>,
) -> Result<FunctionExternalValueInfo, DecodeError> {
    let contract = resolve_contract(address_bytes, info).await?;
    let selector = Selector::from(rightmost::<SELECTOR_SIZE>(selector_bytes));

    let class = match &contract {
        ContractValueInfo::Unknown { .. } => {
            return Ok(FunctionExternalValueInfo::Unknown { contract, selector })
        }
        ContractValueInfo::Known { class, .. } => class,
    };

    let Some(context) = info.contexts.find_deployed_by_id(&class.id) else {
        warn!(
            target: "poke_decode::contract",
            contract_id = %class.id,
            "recognized contract has no deployed context"
        );
        return Err(DecodeError::InconsistentRegistry {
            contract_id: class.id.clone(),
        });
    };

    Ok(match context.lookup(selector) {
        Some(abi) => FunctionExternalValueInfo::Known {
            abi: abi.clone(),
            contract,
            selector,
        },
        None => FunctionExternalValueInfo::Invalid { contract, selector },
    })
}
