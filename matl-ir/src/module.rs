#![forbid(unsafe_code)]

use std::sync::Arc;

use matl_ast::MdlVersion;

use crate::{
    AnnotationBlock, AnnotationDefinition, CompiledModule, Tag, TextureShape, Type, TypeKind,
    Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture(TextureShape),
    LightProfile,
    BsdfMeasurement,
}

impl ResourceKind {
    pub fn ty(self) -> Type {
        match self {
            ResourceKind::Texture(shape) => Type::new(TypeKind::Texture(shape)),
            ResourceKind::LightProfile => Type::new(TypeKind::LightProfile),
            ResourceKind::BsdfMeasurement => Type::new(TypeKind::BsdfMeasurement),
        }
    }
}

/// A registered texture, light profile or measured BSDF.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Absolute file path (or module-relative url as written in the source).
    pub file_path: String,
    pub gamma: Option<f32>,
    pub shared: bool,
}

/// Resource url referenced by a module and the identities it resolved to.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceReference {
    pub url: String,
    pub kind: ResourceKind,
    pub tags: Vec<Tag>,
}

/// Registry record of a compiled module.
#[derive(Clone, Debug)]
pub struct Module {
    /// Absolute name, e.g. `::pkg::metals`. Never changes after creation.
    pub name: String,
    pub filename: Option<String>,
    /// For archive members the archive itself, otherwise the same as `filename`.
    pub api_filename: Option<String>,
    pub version: MdlVersion,
    pub stdlib: bool,
    /// Direct imports, in the order the compiler reported them.
    pub imports: Vec<Tag>,
    pub types: Vec<(String, Type)>,
    pub constants: Vec<(String, Value)>,
    pub annotations: Option<AnnotationBlock>,
    pub annotation_definitions: Vec<AnnotationDefinition>,
    /// Registry names of the function definitions.
    pub functions: Vec<String>,
    /// Registry names of the material definitions.
    pub materials: Vec<String>,
    pub resources: Vec<ResourceReference>,
    /// The compiled form, kept so later compilations can reuse it as an import.
    pub compiled: Arc<CompiledModule>,
}

impl Module {
    pub fn import_count(&self) -> usize {
        self.imports.len()
    }

    pub fn import(&self, index: usize) -> Option<Tag> {
        self.imports.get(index).copied()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn function_name(&self, index: usize) -> Option<&str> {
        self.functions.get(index).map(String::as_str)
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn material_name(&self, index: usize) -> Option<&str> {
        self.materials.get(index).map(String::as_str)
    }

    pub fn is_standard_module(&self) -> bool {
        self.stdlib
    }

    pub fn resources_count(&self) -> usize {
        self.resources.len()
    }

    pub fn resource_url(&self, index: usize) -> Option<&str> {
        self.resources.get(index).map(|r| r.url.as_str())
    }

    /// The first identity the resource at `index` resolved to.
    pub fn resource_tag(&self, index: usize) -> Option<Tag> {
        self.resources.get(index).and_then(|r| r.tags.first().copied())
    }

    pub fn resource_type(&self, index: usize) -> Option<Type> {
        self.resources.get(index).map(|r| r.kind.ty())
    }
}
