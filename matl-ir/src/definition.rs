#![forbid(unsafe_code)]

use crate::{AnnotationBlock, ExprRef, ExpressionList, Tag, Type};
use crate::names::{simple_name, strip_signature};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Positive,
    Negative,
    LogicalNot,
    BitwiseComplement,
    Multiply,
    Divide,
    Modulo,
    Plus,
    Minus,
    ShiftLeft,
    ShiftRight,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    /// `cond ? a : b`
    Ternary,
    /// Member selection `s.m`.
    Select,
}

/// What a definition is, beyond its declared signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Semantic {
    /// An ordinary user or library definition.
    #[default]
    Unknown,
    Operator(Operator),
    FieldAccess,
    ArrayConstructor,
    IndexAccess,
    ArrayLength,
    SetObjectId,
    SetTransforms,
    /// Struct, vector and color constructors.
    Constructor,
    /// A library intrinsic without a body.
    Intrinsic,
}

impl Semantic {
    /// Built-ins whose result is uniform whenever their inputs are: field access, the array
    /// helpers, the object-id/transform setters and every operator except member selection.
    pub fn is_uniform_builtin(self) -> bool {
        match self {
            Semantic::FieldAccess
            | Semantic::ArrayConstructor
            | Semantic::IndexAccess
            | Semantic::ArrayLength
            | Semantic::SetObjectId
            | Semantic::SetTransforms => true,
            Semantic::Operator(op) => op != Operator::Select,
            _ => false,
        }
    }

    pub fn is_ternary(self) -> bool {
        self == Semantic::Operator(Operator::Ternary)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Function,
    Material,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub default: Option<ExprRef>,
    pub annotations: Option<AnnotationBlock>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            annotations: None,
        }
    }

    pub fn with_default(mut self, default: ExprRef) -> Self {
        self.default = Some(default);
        self
    }
}

/// A function or material definition owned by a module.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub module: Tag,
    /// Absolute name with parameter signature, e.g. `::pkg::tint(color,float)`.
    pub mdl_name: String,
    pub parameters: Vec<Parameter>,
    /// `Type::material()` for materials.
    pub return_type: Type,
    pub semantic: Semantic,
    pub exported: bool,
    /// The body may produce different results within one evaluation batch even for uniform
    /// arguments (e.g. it reads renderer state).
    pub varying: bool,
    /// Set on variants: the definition this one re-exports.
    pub prototype: Option<Tag>,
    pub annotations: Option<AnnotationBlock>,
}

impl Definition {
    pub fn is_material(&self) -> bool {
        self.kind == DefinitionKind::Material
    }

    /// The absolute name without the parameter signature.
    pub fn name_without_signature(&self) -> &str {
        strip_signature(&self.mdl_name)
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.mdl_name)
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_types(&self) -> Vec<(String, Type)> {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect()
    }

    pub fn defaults(&self) -> ExpressionList {
        let mut list = ExpressionList::new();
        for p in &self.parameters {
            if let Some(d) = &p.default {
                list.add(p.name.clone(), d.clone());
            }
        }
        list
    }

    /// Whether calling this function yields a uniform result for uniform arguments.
    pub fn is_uniform_function(&self) -> bool {
        if self.semantic.is_uniform_builtin() {
            return true;
        }
        !self.varying
    }
}

/// A stored call: a definition plus bound arguments, keyed by parameter name.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub kind: DefinitionKind,
    pub definition: Tag,
    pub arguments: ExpressionList,
}
