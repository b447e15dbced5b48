#![forbid(unsafe_code)]

use std::fmt;

use crate::{
    Annotation, AnnotationBlock, Argument, ArraySize, BinOp, Decl, Expr, FunctionDecl, Literal,
    Module, ParamDecl, QualifiedName, Qualifier, Stmt, TypeName, UnaryOp,
};

const INDENT: &str = "    ";

/// Renders a module as MDL source text.
pub fn format_module(module: &Module) -> String {
    let mut out = String::new();
    let (major, minor) = module.version.major_minor();
    out.push_str(&format!("mdl {major}.{minor};\n"));

    let mut imports = module.imports().peekable();
    if imports.peek().is_some() {
        out.push('\n');
    }
    for import in imports {
        out.push_str("import ");
        fmt_qualified(&mut out, &import.name);
        out.push_str(";\n");
    }

    for decl in &module.decls {
        if let Decl::Function(f) = decl {
            out.push('\n');
            fmt_function(&mut out, f);
        }
    }
    out
}

pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    fmt_expr(&mut out, expr, Prec::Lowest);
    out
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_module(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_expr(self))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        fmt_qualified(&mut out, self);
        f.write_str(&out)
    }
}

fn fmt_function(out: &mut String, f: &FunctionDecl) {
    if f.exported {
        out.push_str("export ");
    }
    fmt_type_name(out, &f.ret);
    out.push(' ');
    out.push_str(&f.name);

    if f.is_clone {
        out.push_str("(*)");
    } else if f.params.is_empty() {
        out.push_str("()");
    } else {
        out.push_str("(\n");
        for (i, p) in f.params.iter().enumerate() {
            out.push_str(INDENT);
            fmt_param(out, p);
            if i + 1 < f.params.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push(')');
    }

    if let Some(annos) = &f.annotations {
        out.push('\n');
        fmt_annotation_block(out, annos);
    }

    let Stmt::Expr(body) = &f.body;
    out.push_str("\n= ");
    fmt_expr(out, body, Prec::Lowest);
    out.push_str(";\n");
}

fn fmt_param(out: &mut String, p: &ParamDecl) {
    fmt_type_name(out, &p.ty);
    out.push(' ');
    out.push_str(&p.name);
    if let Some(d) = &p.default {
        out.push_str(" = ");
        fmt_expr(out, d, Prec::Lowest);
    }
    if let Some(annos) = &p.annotations {
        out.push(' ');
        fmt_annotation_block(out, annos);
    }
}

fn fmt_annotation_block(out: &mut String, block: &AnnotationBlock) {
    out.push_str("[[ ");
    for (i, a) in block.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        fmt_annotation(out, a);
    }
    out.push_str(" ]]");
}

fn fmt_annotation(out: &mut String, a: &Annotation) {
    fmt_qualified(out, &a.name);
    fmt_args(out, &a.args);
}

fn fmt_qualified(out: &mut String, q: &QualifiedName) {
    if q.absolute {
        out.push_str("::");
    }
    out.push_str(&q.components.join("::"));
}

fn fmt_type_name(out: &mut String, t: &TypeName) {
    match t.qualifier {
        Qualifier::None => {}
        Qualifier::Uniform => out.push_str("uniform "),
        Qualifier::Varying => out.push_str("varying "),
    }
    fmt_qualified(out, &t.name);
    match &t.array {
        None => {}
        Some(ArraySize::Immediate(n)) => out.push_str(&format!("[{n}]")),
        Some(ArraySize::Deferred) => out.push_str("[]"),
    }
}

fn fmt_args(out: &mut String, args: &[Argument]) {
    out.push('(');
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(name) = &a.name {
            out.push_str(name);
            out.push_str(": ");
        }
        fmt_expr(out, &a.value, Prec::Lowest);
    }
    out.push(')');
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Cond,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Cmp,
    Shift,
    Add,
    Mul,
    Unary,
    Postfix,
}

fn bin_prec(op: BinOp) -> Prec {
    match op {
        BinOp::Or => Prec::Or,
        BinOp::And => Prec::And,
        BinOp::BitOr => Prec::BitOr,
        BinOp::BitXor => Prec::BitXor,
        BinOp::BitAnd => Prec::BitAnd,
        BinOp::Eq | BinOp::Ne => Prec::Eq,
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Prec::Cmp,
        BinOp::Shl | BinOp::Shr => Prec::Shift,
        BinOp::Add | BinOp::Sub => Prec::Add,
        BinOp::Mul | BinOp::Div | BinOp::Rem => Prec::Mul,
    }
}

fn bin_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::BitAnd => "&",
        BinOp::BitXor => "^",
        BinOp::BitOr => "|",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}

fn fmt_literal(out: &mut String, lit: &Literal) {
    match lit {
        Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Int(i) => out.push_str(&i.to_string()),
        Literal::Float(f) => out.push_str(&format!("{f:?}")),
        Literal::Double(d) => out.push_str(&format!("{d:?}d")),
        Literal::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
    }
}

fn fmt_expr(out: &mut String, expr: &Expr, min: Prec) {
    let prec = expr_prec(expr);
    let paren = prec < min;
    if paren {
        out.push('(');
    }
    match expr {
        Expr::Literal(lit) => fmt_literal(out, lit),
        Expr::Reference(t) => fmt_type_name(out, t),
        Expr::Call { callee, args } => {
            fmt_expr(out, callee, Prec::Postfix);
            fmt_args(out, args);
        }
        Expr::Unary { op, expr } => {
            out.push_str(match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
                UnaryOp::BitNot => "~",
            });
            fmt_expr(out, expr, Prec::Unary);
        }
        Expr::Binary { op, left, right } => {
            let p = bin_prec(*op);
            fmt_expr(out, left, p);
            out.push(' ');
            out.push_str(bin_op_str(*op));
            out.push(' ');
            // Left-associative: a right operand of equal precedence needs parentheses.
            fmt_expr(out, right, next_prec(p));
        }
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            fmt_expr(out, cond, Prec::Or);
            out.push_str(" ? ");
            fmt_expr(out, then_expr, Prec::Cond);
            out.push_str(" : ");
            fmt_expr(out, else_expr, Prec::Cond);
        }
        Expr::Field { base, member } => {
            fmt_expr(out, base, Prec::Postfix);
            out.push('.');
            out.push_str(member);
        }
        Expr::Index { base, index } => {
            fmt_expr(out, base, Prec::Postfix);
            out.push('[');
            fmt_expr(out, index, Prec::Lowest);
            out.push(']');
        }
        Expr::Let { decls, body } => {
            out.push_str("let {\n");
            for d in decls {
                out.push_str(INDENT);
                fmt_type_name(out, &d.ty);
                out.push(' ');
                out.push_str(&d.name);
                out.push_str(" = ");
                fmt_expr(out, &d.init, Prec::Lowest);
                out.push_str(";\n");
            }
            out.push_str("} in ");
            fmt_expr(out, body, Prec::Lowest);
        }
    }
    if paren {
        out.push(')');
    }
}

fn expr_prec(expr: &Expr) -> Prec {
    match expr {
        Expr::Literal(_) | Expr::Reference(_) => Prec::Postfix,
        Expr::Call { .. } | Expr::Field { .. } | Expr::Index { .. } => Prec::Postfix,
        Expr::Unary { .. } => Prec::Unary,
        Expr::Binary { op, .. } => bin_prec(*op),
        Expr::Conditional { .. } => Prec::Cond,
        Expr::Let { .. } => Prec::Lowest,
    }
}

fn next_prec(p: Prec) -> Prec {
    match p {
        Prec::Lowest => Prec::Cond,
        Prec::Cond => Prec::Or,
        Prec::Or => Prec::And,
        Prec::And => Prec::BitOr,
        Prec::BitOr => Prec::BitXor,
        Prec::BitXor => Prec::BitAnd,
        Prec::BitAnd => Prec::Eq,
        Prec::Eq => Prec::Cmp,
        Prec::Cmp => Prec::Shift,
        Prec::Shift => Prec::Add,
        Prec::Add => Prec::Mul,
        Prec::Mul => Prec::Unary,
        Prec::Unary | Prec::Postfix => Prec::Postfix,
    }
}
