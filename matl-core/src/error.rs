#![forbid(unsafe_code)]

use matl_ir::Tag;
use miette::Diagnostic;
use thiserror::Error;

/// Successful outcome of a module creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Created {
    /// The module was compiled and registered under the given identity.
    New(Tag),
    /// A module of that name was already registered; nothing changed.
    AlreadyExists(Tag),
}

impl Created {
    pub fn tag(self) -> Tag {
        match self {
            Created::New(tag) | Created::AlreadyExists(tag) => tag,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Created::New(_) => 0,
            Created::AlreadyExists(_) => 1,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ModuleError {
    #[error("invalid module name \"{0}\"")]
    #[diagnostic(code(matl::module::invalid_name))]
    InvalidName(String),

    #[error("failed to load module \"{0}\"")]
    #[diagnostic(code(matl::module::load))]
    LoadFailed(String),

    #[error("registry name \"{0}\" is already in use by an element of another kind")]
    #[diagnostic(code(matl::module::name_in_use))]
    NameInUse(String),

    #[error("registry name \"{0}\" for an exported definition is already in use")]
    #[diagnostic(code(matl::module::export_collision))]
    ExportCollision(String),

    #[error("failed to restore the imports of module \"{0}\"")]
    #[diagnostic(code(matl::module::import_restore))]
    ImportRestoreFailed(String),

    #[error("failed to initialize module \"{import}\" imported by \"{module}\"")]
    #[diagnostic(code(matl::module::import))]
    ImportFailed { module: String, import: String },

    #[error("invalid prototype: {0}")]
    #[diagnostic(code(matl::synth::prototype))]
    InvalidPrototype(String),

    #[error("\"{0}\" is not a parameter of the prototype")]
    #[diagnostic(code(matl::synth::unknown_parameter))]
    UnknownParameter(String),

    #[error("the callee of \"{0}\" has no arguments to promote")]
    #[diagnostic(code(matl::synth::missing_arguments))]
    MissingArguments(String),

    #[error("type mismatch for argument \"{0}\"")]
    #[diagnostic(code(matl::synth::type_mismatch))]
    TypeMismatch(String),

    #[error("cannot convert to source: {0}")]
    #[diagnostic(code(matl::synth::conversion))]
    DefaultConversion(String),

    #[error("synthesized module \"{0}\" failed semantic analysis")]
    #[diagnostic(code(matl::synth::invalid_module))]
    InvalidModule(String),

    #[error("invalid argument \"{argument}\" for annotation \"{annotation}\"")]
    #[diagnostic(code(matl::anno::argument))]
    AnnotationArgument { annotation: String, argument: String },

    #[error("malformed annotation name \"{0}\"")]
    #[diagnostic(code(matl::anno::name))]
    AnnotationName(String),

    #[error("annotation definition \"{0}\" not found")]
    #[diagnostic(code(matl::anno::not_found))]
    AnnotationNotFound(String),

    #[error("parameter path \"{0}\" does not resolve to an argument")]
    #[diagnostic(code(matl::synth::path))]
    PathNotFound(String),

    #[error("parameter path \"{path}\" cannot be made uniform: {reason}")]
    #[diagnostic(code(matl::synth::uniform))]
    UniformConflict { path: String, reason: String },

    #[error("internal error: {0}")]
    #[diagnostic(code(matl::internal))]
    Internal(String),
}

impl ModuleError {
    /// Stable numeric code of the failure, for callers that report integers.
    pub fn code(&self) -> i32 {
        match self {
            ModuleError::InvalidName(_) => -1,
            ModuleError::LoadFailed(_) => -2,
            ModuleError::NameInUse(_) | ModuleError::ExportCollision(_) => -3,
            ModuleError::ImportRestoreFailed(_) | ModuleError::ImportFailed { .. } => -4,
            ModuleError::InvalidPrototype(_) => -5,
            ModuleError::UnknownParameter(_) | ModuleError::MissingArguments(_) => -6,
            ModuleError::TypeMismatch(_) => -7,
            ModuleError::DefaultConversion(_) | ModuleError::InvalidModule(_) => -8,
            ModuleError::AnnotationArgument { .. } => -9,
            ModuleError::AnnotationName(_) | ModuleError::AnnotationNotFound(_) => -10,
            ModuleError::PathNotFound(_) => -13,
            ModuleError::UniformConflict { .. } => -15,
            ModuleError::Internal(_) => -16,
        }
    }
}

/// Collapses a creation result into the integer status convention (0, 1, or a negative code).
pub fn status_code(result: &Result<Created, ModuleError>) -> i32 {
    match result {
        Ok(created) => created.code(),
        Err(err) => err.code(),
    }
}

/// Failure of the uniform propagation analysis.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum UniformError {
    /// A uniform value is required from something that can never be uniform.
    #[error("{0}")]
    #[diagnostic(code(matl::uniform::conflict))]
    Conflict(String),

    #[error("{0}")]
    #[diagnostic(code(matl::uniform::internal))]
    Internal(String),
}

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource path \"{0}\" is not absolute")]
    #[diagnostic(code(matl::resource::relative_path))]
    RelativePath(String),

    #[error("resource \"{0}\" could not be resolved")]
    #[diagnostic(code(matl::resource::unresolved))]
    Unresolved(String),
}

impl ResourceError {
    pub fn code(&self) -> i32 {
        match self {
            ResourceError::RelativePath(_) => -2,
            ResourceError::Unresolved(_) => -3,
        }
    }
}
