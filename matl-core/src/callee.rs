#![forbid(unsafe_code)]

use matl_db::Transaction;
use matl_ir::{DefinitionKind, ElementKind, ExpressionList, Tag, Type};

use crate::error::ModuleError;

/// A stored function call or material instance, flattened for synthesis.
#[derive(Clone, Debug)]
pub struct Callee {
    pub kind: DefinitionKind,
    /// Absolute name of the called definition, without signature.
    pub name: String,
    pub arguments: ExpressionList,
    pub parameter_types: Vec<(String, Type)>,
}

impl Callee {
    pub fn from_instance(txn: &dyn Transaction, tag: Tag) -> Result<Self, ModuleError> {
        match txn.kind_of(tag) {
            Some(ElementKind::FunctionCall | ElementKind::MaterialInstance) => {}
            _ => {
                return Err(ModuleError::InvalidPrototype(format!(
                    "tag {} is not a function call or material instance",
                    tag.0
                )));
            }
        }
        let instance = txn
            .instance(tag)
            .ok_or_else(|| ModuleError::Internal(format!("instance {} vanished", tag.0)))?;
        let definition = txn.definition(instance.definition).ok_or_else(|| {
            ModuleError::InvalidPrototype(format!(
                "definition {} of instance {} not found",
                instance.definition.0, tag.0
            ))
        })?;
        Ok(Self {
            kind: instance.kind,
            name: definition.name_without_signature().to_string(),
            arguments: instance.arguments.clone(),
            parameter_types: definition.parameter_types(),
        })
    }

    pub fn parameter_type(&self, name: &str) -> Option<&Type> {
        self.parameter_types
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}
