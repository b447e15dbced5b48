#![forbid(unsafe_code)]

pub mod compiled;
pub mod definition;
pub mod expr;
pub mod message;
pub mod module;
pub mod names;
pub mod types;
pub mod value;

pub use compiled::*;
pub use definition::*;
pub use expr::*;
pub use message::*;
pub use module::*;
pub use names::*;
pub use types::*;
pub use value::*;

pub use matl_ast::MdlVersion;

/// Identity of an element in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u32);

/// Element kinds the registry distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Module,
    FunctionDefinition,
    MaterialDefinition,
    FunctionCall,
    MaterialInstance,
    Resource,
}
