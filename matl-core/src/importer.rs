#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use matl_ast::{AnnotationBlock, Decl, Expr, ImportDecl, QualifiedName, TypeName};

/// Collects the absolute names a synthesized module refers to and turns them into imports.
#[derive(Debug, Default)]
pub struct SymbolImporter {
    names: BTreeSet<QualifiedName>,
}

impl SymbolImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Reference(t) => self.collect_type_name(t),
            Expr::Call { callee, args } => {
                self.collect_expr(callee);
                for a in args {
                    self.collect_expr(&a.value);
                }
            }
            Expr::Unary { expr, .. } => self.collect_expr(expr),
            Expr::Binary { left, right, .. } => {
                self.collect_expr(left);
                self.collect_expr(right);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.collect_expr(cond);
                self.collect_expr(then_expr);
                self.collect_expr(else_expr);
            }
            Expr::Field { base, .. } => self.collect_expr(base),
            Expr::Index { base, index } => {
                self.collect_expr(base);
                self.collect_expr(index);
            }
            Expr::Let { decls, body } => {
                for d in decls {
                    self.collect_type_name(&d.ty);
                    self.collect_expr(&d.init);
                }
                self.collect_expr(body);
            }
        }
    }

    pub fn collect_type_name(&mut self, ty: &TypeName) {
        self.add_name(&ty.name);
    }

    pub fn collect_annotations(&mut self, block: &AnnotationBlock) {
        for anno in block {
            self.add_name(&anno.name);
            for a in &anno.args {
                self.collect_expr(&a.value);
            }
        }
    }

    /// Records `name` if it is absolute and lives in some module. Local names are ignored.
    pub fn add_name(&mut self, name: &QualifiedName) {
        if name.module_part().is_some() {
            self.names.insert(name.clone());
        }
    }

    pub fn add_names<'a>(&mut self, names: impl IntoIterator<Item = &'a QualifiedName>) {
        for name in names {
            self.add_name(name);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.names.iter()
    }

    /// Prepends one import per collected name to `module`, skipping names of the module itself.
    pub fn add_imports(&self, module: &mut matl_ast::Module) {
        let own = format!("::{}", QualifiedName::parse(&module.name).components.join("::"));
        let imports = self
            .names
            .iter()
            .filter(|n| n.module_part().as_deref() != Some(own.as_str()))
            .map(|n| Decl::Import(ImportDecl { name: n.clone() }));
        let rest = std::mem::take(&mut module.decls);
        module.decls = imports.chain(rest).collect();
    }
}
