#![forbid(unsafe_code)]

//! Shapes produced by the compiler and the DAG generator.

use std::sync::Arc;

use matl_ast::MdlVersion;

use crate::{
    AnnotationBlock, Message, Parameter, ResourceKind, Semantic, Type, Value, error_count,
};

/// Declaration of an annotation, as found in the module that defines it.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationDefinition {
    /// Absolute name without signature, e.g. `::anno::description`.
    pub name: String,
    pub parameters: Vec<(String, Type)>,
}

impl AnnotationDefinition {
    /// Comma-separated parameter type names, e.g. `string,int`.
    pub fn signature(&self) -> String {
        self.parameters
            .iter()
            .map(|(_, t)| t.mdl_name())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn parameter_type(&self, name: &str) -> Option<&Type> {
        self.parameters.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReferencedResource {
    pub url: String,
    pub kind: ResourceKind,
}

/// A module after loading and semantic analysis.
#[derive(Clone, Debug, Default)]
pub struct CompiledModule {
    /// Absolute name, e.g. `::pkg::metals`.
    pub name: String,
    pub filename: Option<String>,
    pub version: MdlVersion,
    pub stdlib: bool,
    pub valid: bool,
    pub messages: Vec<Message>,
    /// Direct imports, resolved.
    pub imports: Vec<Arc<CompiledModule>>,
    pub referenced_resources: Vec<ReferencedResource>,
    pub annotation_definitions: Vec<AnnotationDefinition>,
}

impl CompiledModule {
    pub fn find_annotation(&self, name: &str, signature: &str) -> Option<&AnnotationDefinition> {
        self.annotation_definitions
            .iter()
            .find(|a| a.name == name && a.signature() == signature)
    }
}

/// A function or material as emitted by the DAG generator.
#[derive(Clone, Debug, PartialEq)]
pub struct DagEntity {
    /// Absolute name with signature.
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub semantic: Semantic,
    pub exported: bool,
    pub varying: bool,
    /// For clones: the absolute name (with signature) of the re-exported entity.
    pub prototype: Option<String>,
    pub annotations: Option<AnnotationBlock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DagType {
    /// Simple name within the module.
    pub name: String,
    pub ty: Type,
    pub annotations: Option<AnnotationBlock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DagConstant {
    pub name: String,
    pub ty: Type,
    pub value: Value,
}

/// A resource literal occurring somewhere in the generated code.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceLiteral {
    pub url: String,
    pub kind: ResourceKind,
    pub gamma: Option<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct GeneratedDag {
    pub messages: Vec<Message>,
    pub types: Vec<DagType>,
    pub constants: Vec<DagConstant>,
    pub module_annotations: Option<AnnotationBlock>,
    pub functions: Vec<DagEntity>,
    pub materials: Vec<DagEntity>,
    pub resource_literals: Vec<ResourceLiteral>,
}

impl GeneratedDag {
    pub fn error_count(&self) -> usize {
        error_count(&self.messages)
    }
}
