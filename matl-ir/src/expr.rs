#![forbid(unsafe_code)]

use std::sync::Arc;

use crate::{Tag, Type, Value};

/// Shared handle to an expression node. Node identity (`Arc::ptr_eq`) is meaningful: analyses
/// that look for "this particular occurrence" compare handles, not contents.
pub type ExprRef = Arc<Expression>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpressionKind {
    Constant,
    Call,
    DirectCall,
    Parameter,
    Temporary,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Constant {
        ty: Type,
        value: Value,
    },
    /// Call through a stored function call or material instance.
    Call {
        ty: Type,
        call: Tag,
    },
    /// Call of a definition with inline arguments.
    DirectCall {
        ty: Type,
        definition: Tag,
        arguments: ExpressionList,
    },
    Parameter {
        ty: Type,
        index: usize,
    },
    Temporary {
        ty: Type,
        index: usize,
    },
}

impl Expression {
    pub fn constant(ty: Type, value: Value) -> ExprRef {
        Arc::new(Expression::Constant { ty, value })
    }

    pub fn call(ty: Type, call: Tag) -> ExprRef {
        Arc::new(Expression::Call { ty, call })
    }

    pub fn direct_call(ty: Type, definition: Tag, arguments: ExpressionList) -> ExprRef {
        Arc::new(Expression::DirectCall {
            ty,
            definition,
            arguments,
        })
    }

    pub fn ty(&self) -> &Type {
        match self {
            Expression::Constant { ty, .. }
            | Expression::Call { ty, .. }
            | Expression::DirectCall { ty, .. }
            | Expression::Parameter { ty, .. }
            | Expression::Temporary { ty, .. } => ty,
        }
    }

    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Constant { .. } => ExpressionKind::Constant,
            Expression::Call { .. } => ExpressionKind::Call,
            Expression::DirectCall { .. } => ExpressionKind::DirectCall,
            Expression::Parameter { .. } => ExpressionKind::Parameter,
            Expression::Temporary { .. } => ExpressionKind::Temporary,
        }
    }
}

/// Ordered list of named expressions (call arguments, defaults, annotation arguments).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionList {
    items: Vec<(String, ExprRef)>,
}

impl ExpressionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name`, or replaces the expression if `name` is already present.
    pub fn add(&mut self, name: impl Into<String>, expr: ExprRef) {
        let name = name.into();
        match self.items.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = expr,
            None => self.items.push((name, expr)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, expr: ExprRef) -> Self {
        self.add(name, expr);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ExprRef> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn get_index(&self, index: usize) -> Option<&ExprRef> {
        self.items.get(index).map(|(_, e)| e)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(|(n, _)| n.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExprRef)> {
        self.items.iter().map(|(n, e)| (n.as_str(), e))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Full annotation name including signature, e.g. `::anno::description(string)`.
    pub name: String,
    pub arguments: ExpressionList,
}

pub type AnnotationBlock = Vec<Annotation>;
