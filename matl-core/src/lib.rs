#![forbid(unsafe_code)]

//! Compilation and registration of material modules, plus synthesis of new modules from
//! registered definitions (variants) and calls (parameter-promoting materials).

mod annotations;
mod ast_builder;
mod callee;
mod config;
mod driver;
mod error;
mod importer;
mod path;
mod resources;
mod service;
mod synth;
mod uniform;

pub use annotations::{add_annotation, create_annotations};
pub use ast_builder::AstBuilder;
pub use callee::Callee;
pub use config::{ConfigError, DagOptions, DriverConfig};
pub use driver::ModuleCompiler;
pub use error::{Created, ModuleError, ResourceError, UniformError, status_code};
pub use importer::SymbolImporter;
pub use path::find_path;
pub use resources::{
    RegistryResources, ResourceResolver, create_bsdf_measurement, create_light_profile,
    create_texture,
};
pub use service::{Compiler, DagGenerator, ModuleCache, ModuleLookup, is_mdl_identifier};
pub use synth::{MaterialData, ParameterData, VariantData, add_material, add_variant};
pub use uniform::{UniformAnalyzer, can_enforce_uniform};
