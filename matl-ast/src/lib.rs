#![forbid(unsafe_code)]

//! Source-level syntax tree for synthesized material modules.
//!
//! Nothing in here is parsed from text: the synthesizer builds these nodes directly and hands the
//! finished [`Module`] to the compiler service for semantic analysis.

mod fmt;

pub use fmt::{format_expr, format_module};

/// Language version of a module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MdlVersion {
    #[default]
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
}

impl MdlVersion {
    pub const LATEST: MdlVersion = MdlVersion::V1_5;

    /// Maps a `(major, minor)` pair to a known version.
    ///
    /// Combinations that are not known round up to [`MdlVersion::LATEST`].
    pub fn from_major_minor(major: u32, minor: u32) -> Self {
        match (major, minor) {
            (1, 0) => MdlVersion::V1_0,
            (1, 1) => MdlVersion::V1_1,
            (1, 2) => MdlVersion::V1_2,
            (1, 3) => MdlVersion::V1_3,
            (1, 4) => MdlVersion::V1_4,
            _ => MdlVersion::LATEST,
        }
    }

    pub fn major_minor(self) -> (u32, u32) {
        match self {
            MdlVersion::V1_0 => (1, 0),
            MdlVersion::V1_1 => (1, 1),
            MdlVersion::V1_2 => (1, 2),
            MdlVersion::V1_3 => (1, 3),
            MdlVersion::V1_4 => (1, 4),
            MdlVersion::V1_5 => (1, 5),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub absolute: bool,
    pub components: Vec<String>,
}

impl QualifiedName {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            absolute: false,
            components: vec![name.into()],
        }
    }

    /// Splits `::a::b::c` (or `a::b`) into its components.
    pub fn parse(name: &str) -> Self {
        let absolute = name.starts_with("::");
        let body = if absolute { &name[2..] } else { name };
        Self {
            absolute,
            components: body
                .split("::")
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The absolute module part, e.g. `::df` for `::df::diffuse_reflection_bsdf`.
    pub fn module_part(&self) -> Option<String> {
        if !self.absolute || self.components.len() < 2 {
            return None;
        }
        let n = self.components.len() - 1;
        Some(format!("::{}", self.components[..n].join("::")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Qualifier {
    #[default]
    None,
    Uniform,
    Varying,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArraySize {
    Immediate(usize),
    /// Size-deferred arrays, e.g. `float[<N>]` or `float[]` in a constructor.
    Deferred,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub qualifier: Qualifier,
    pub name: QualifiedName,
    pub array: Option<ArraySize>,
}

impl TypeName {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            qualifier: Qualifier::None,
            name,
            array: None,
        }
    }

    pub fn builtin(name: &str) -> Self {
        Self::new(QualifiedName::simple(name))
    }

    /// The pseudo return type of every material declaration.
    pub fn material() -> Self {
        Self::builtin("material")
    }

    pub fn set_qualifier(&mut self, q: Qualifier) {
        self.qualifier = q;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

impl Argument {
    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }

    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub ty: TypeName,
    pub name: String,
    pub init: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A reference to a named entity: a parameter, a temporary, an enum value, a constant, or the
    /// callee of a call. Constructors and array constructors reference a type name.
    Reference(TypeName),
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Field {
        base: Box<Expr>,
        member: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Let {
        decls: Vec<VarDecl>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn reference(name: QualifiedName) -> Self {
        Expr::Reference(TypeName::new(name))
    }

    pub fn local(name: &str) -> Self {
        Expr::reference(QualifiedName::simple(name))
    }

    pub fn call(callee: Expr, args: Vec<Argument>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub name: QualifiedName,
    pub args: Vec<Argument>,
}

pub type AnnotationBlock = Vec<Annotation>;

#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub ty: TypeName,
    pub name: String,
    pub default: Option<Expr>,
    pub annotations: Option<AnnotationBlock>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub ret: TypeName,
    pub name: String,
    pub params: Vec<ParamDecl>,
    /// A clone re-exports the signature of the function or material its body calls.
    pub is_clone: bool,
    pub body: Stmt,
    pub annotations: Option<AnnotationBlock>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    pub name: QualifiedName,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Import(ImportDecl),
    Function(FunctionDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub name: String,
    pub version: MdlVersion,
    pub decls: Vec<Decl>,
}

impl Module {
    pub fn new(name: impl Into<String>, version: MdlVersion) -> Self {
        Self {
            name: name.into(),
            version,
            decls: Vec::new(),
        }
    }

    pub fn add_declaration(&mut self, decl: Decl) {
        self.decls.push(decl);
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Import(i) => Some(i),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Function(f) => Some(f),
            _ => None,
        })
    }
}
