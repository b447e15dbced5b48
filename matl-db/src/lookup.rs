#![forbid(unsafe_code)]

use matl_ir::{DefinitionKind, ExpressionList, Module, Tag, strip_signature};

use crate::Transaction;

pub fn module_function_tag(txn: &dyn Transaction, module: &Module, index: usize) -> Option<Tag> {
    txn.name_to_tag(module.function_name(index)?)
}

pub fn module_material_tag(txn: &dyn Transaction, module: &Module, index: usize) -> Option<Tag> {
    txn.name_to_tag(module.material_name(index)?)
}

/// Registry names of the functions of `module` named `name` (with or without a signature).
///
/// With `arguments`, only overloads that accept them are returned: every argument must name a
/// parameter whose type it matches, and every parameter without a default must be supplied.
pub fn function_overloads(
    txn: &dyn Transaction,
    module: &Module,
    name: &str,
    arguments: Option<&ExpressionList>,
) -> Vec<String> {
    let prefix = strip_signature(name);
    let mut result = Vec::new();

    for f in &module.functions {
        if strip_signature(f) != prefix {
            continue;
        }
        let Some(arguments) = arguments else {
            result.push(f.clone());
            continue;
        };
        let Some(def) = txn.name_to_tag(f).and_then(|t| txn.definition(t)) else {
            continue;
        };
        if def.kind != DefinitionKind::Function {
            continue;
        }
        let args_fit = arguments.iter().all(|(arg_name, expr)| {
            def.parameter(arg_name)
                .is_some_and(|p| expr.ty().matches_parameter(&p.ty))
        });
        let required_present = def
            .parameters
            .iter()
            .all(|p| p.default.is_some() || arguments.get(&p.name).is_some());
        if args_fit && required_present {
            result.push(f.clone());
        }
    }
    result
}
