//! Internal function pointer resolution

use tracing::trace;

use crate::domain::{EvmInfo, FunctionInternalError, FunctionInternalValueInfo};

/// Resolve an internal function pointer against the function table.
///
/// Rules, in order:
/// 1. no table: unknown function
/// 2. both pcs zero: the null function (exception)
/// 3. only the constructor pc set: malformed
/// 4. in a constructor with no constructor pc: deployed-code pointer in constructor
/// 5. otherwise look up the pc for the current code (constructor or deployed)
pub fn resolve_internal_function(
    deployed_pc: u32,
    constructor_pc: u32,
    info: &EvmInfo<'_>,
) -> Result<FunctionInternalValueInfo, FunctionInternalError> {
    let context = info.current_context.contract.clone();
    let is_constructor = info.current_context.is_constructor;

    let Some(table) = info.function_table else {
        return Ok(FunctionInternalValueInfo::Unknown {
            context,
            deployed_pc,
            constructor_pc,
        });
    };

    if deployed_pc == 0 && constructor_pc == 0 {
        return Ok(FunctionInternalValueInfo::Exception {
            context,
            deployed_pc,
            constructor_pc,
        });
    }

    if deployed_pc == 0 {
        return Err(FunctionInternalError::Malformed {
            context,
            deployed_pc,
            constructor_pc,
        });
    }

    if is_constructor && constructor_pc == 0 {
        return Err(FunctionInternalError::DeployedFunctionInConstructor {
            context,
            deployed_pc,
            constructor_pc,
        });
    }

    let pc = if is_constructor {
        constructor_pc
    } else {
        deployed_pc
    };

    let Some(entry) = table.get(pc) else {
        trace!(target: "poke_decode::internal", pc, "no function table entry");
        return Err(FunctionInternalError::NoSuchInternalFunction {
            context,
            deployed_pc,
            constructor_pc,
        });
    };

    if entry.is_designated_invalid {
        return Ok(FunctionInternalValueInfo::Exception {
            context,
            deployed_pc,
            constructor_pc,
        });
    }

    Ok(FunctionInternalValueInfo::Function {
        context,
        deployed_pc,
        constructor_pc,
        name: entry.name.clone(),
        defined_in: entry.defining_contract(),
    })
}
