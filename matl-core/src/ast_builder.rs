#![forbid(unsafe_code)]

//! Turns registry expressions and values back into source AST.

use std::collections::BTreeSet;
use std::sync::Arc;

use matl_ast::{
    ArraySize, Argument, BinOp, Expr, Literal, QualifiedName, Qualifier, TypeName, UnaryOp,
};
use matl_db::Transaction;
use matl_ir::{
    Definition, ExprRef, Expression, ExpressionList, Operator, Semantic, Tag, Type, TypeKind,
    Value,
};

use crate::error::ModuleError;

pub struct AstBuilder<'t> {
    txn: &'t dyn Transaction,
    /// Expressions (by identity) that are replaced by a reference to a new parameter.
    parameters: Vec<(ExprRef, String)>,
    next_temporary: usize,
    used_user_types: BTreeSet<QualifiedName>,
}

impl<'t> AstBuilder<'t> {
    pub fn new(txn: &'t dyn Transaction) -> Self {
        Self {
            txn,
            parameters: Vec::new(),
            next_temporary: 0,
            used_user_types: BTreeSet::new(),
        }
    }

    /// From now on, `init` converts to a reference to the parameter `name`.
    pub fn declare_parameter(&mut self, name: &str, init: &ExprRef) {
        self.parameters.push((init.clone(), name.to_string()));
    }

    pub fn remove_parameters(&mut self) {
        self.parameters.clear();
    }

    pub fn is_parameter(&self, expr: &ExprRef) -> bool {
        self.parameter_name(expr).is_some()
    }

    fn parameter_name(&self, expr: &ExprRef) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(e, _)| Arc::ptr_eq(e, expr))
            .map(|(_, n)| n.as_str())
    }

    pub fn next_temporary_name(&mut self) -> String {
        let name = format!("__tmp{}", self.next_temporary);
        self.next_temporary += 1;
        name
    }

    /// User enum and struct types referenced by everything converted so far.
    pub fn used_user_types(&self) -> &BTreeSet<QualifiedName> {
        &self.used_user_types
    }

    pub fn type_name(&mut self, ty: &Type) -> TypeName {
        let mut name = match &ty.kind {
            TypeKind::Array { elem, size } => {
                let mut name = self.type_name(&elem.skip_modifiers());
                name.array = Some(match size {
                    Some(n) => ArraySize::Immediate(*n),
                    None => ArraySize::Deferred,
                });
                name
            }
            TypeKind::Enum(user) | TypeKind::Struct(user) => {
                let qualified = QualifiedName::parse(user);
                self.used_user_types.insert(qualified.clone());
                TypeName::new(qualified)
            }
            _ => TypeName::builtin(&ty.mdl_name()),
        };
        if ty.is_uniform() {
            name.set_qualifier(Qualifier::Uniform);
        } else if ty.is_varying() {
            name.set_qualifier(Qualifier::Varying);
        }
        name
    }

    pub fn transform_expr(&mut self, expr: &ExprRef) -> Result<Expr, ModuleError> {
        if let Some(name) = self.parameter_name(expr) {
            return Ok(Expr::local(name));
        }
        match expr.as_ref() {
            Expression::Constant { value, .. } => self.transform_value(value),
            Expression::Call { call, .. } => {
                let instance = self.txn.instance(*call).ok_or_else(|| {
                    ModuleError::Internal(format!("unsupported entity kind in call (tag {})", call.0))
                })?;
                let def = self.definition(instance.definition)?;
                self.transform_call(&def, &instance.arguments)
            }
            Expression::DirectCall {
                definition,
                arguments,
                ..
            } => {
                let def = self.definition(*definition)?;
                self.transform_call(&def, arguments)
            }
            Expression::Parameter { .. } | Expression::Temporary { .. } => {
                Err(ModuleError::DefaultConversion(format!(
                    "{:?} references have no meaning outside their definition",
                    expr.kind()
                )))
            }
        }
    }

    fn definition(&self, tag: Tag) -> Result<Arc<Definition>, ModuleError> {
        self.txn
            .definition(tag)
            .ok_or_else(|| ModuleError::Internal(format!("definition {} not found", tag.0)))
    }

    fn operand(&mut self, args: &ExpressionList, index: usize) -> Result<Box<Expr>, ModuleError> {
        let arg = args.get_index(index).ok_or_else(|| {
            ModuleError::DefaultConversion(format!("missing operand {index}"))
        })?;
        Ok(Box::new(self.transform_expr(arg)?))
    }

    fn transform_call(
        &mut self,
        def: &Definition,
        args: &ExpressionList,
    ) -> Result<Expr, ModuleError> {
        if matches!(
            def.return_type.kind,
            TypeKind::Enum(_) | TypeKind::Struct(_)
        ) {
            self.type_name(&def.return_type);
        }

        match def.semantic {
            Semantic::Operator(op) => self.transform_operator(def, op, args),
            Semantic::FieldAccess => Ok(Expr::Field {
                base: self.operand(args, 0)?,
                member: field_name(def).to_string(),
            }),
            Semantic::IndexAccess => Ok(Expr::Index {
                base: self.operand(args, 0)?,
                index: self.operand(args, 1)?,
            }),
            Semantic::ArrayConstructor => {
                let TypeKind::Array { elem, .. } = &def.return_type.kind else {
                    return Err(ModuleError::DefaultConversion(format!(
                        "array constructor \"{}\" does not return an array",
                        def.mdl_name
                    )));
                };
                let mut callee = self.type_name(&elem.skip_modifiers());
                callee.array = Some(ArraySize::Deferred);
                let mut items = Vec::with_capacity(args.len());
                for (_, arg) in args.iter() {
                    items.push(Argument::positional(self.transform_expr(arg)?));
                }
                Ok(Expr::call(Expr::Reference(callee), items))
            }
            _ => {
                let callee = Expr::reference(QualifiedName::parse(def.name_without_signature()));
                let mut named = Vec::with_capacity(args.len());
                for (name, arg) in args.iter() {
                    named.push(Argument::named(name, self.transform_expr(arg)?));
                }
                Ok(Expr::call(callee, named))
            }
        }
    }

    fn transform_operator(
        &mut self,
        def: &Definition,
        op: Operator,
        args: &ExpressionList,
    ) -> Result<Expr, ModuleError> {
        let binary = match op {
            Operator::Positive => return Ok(*self.operand(args, 0)?),
            Operator::Negative => return self.unary(UnaryOp::Neg, args),
            Operator::LogicalNot => return self.unary(UnaryOp::Not, args),
            Operator::BitwiseComplement => return self.unary(UnaryOp::BitNot, args),
            Operator::Ternary => {
                return Ok(Expr::Conditional {
                    cond: self.operand(args, 0)?,
                    then_expr: self.operand(args, 1)?,
                    else_expr: self.operand(args, 2)?,
                });
            }
            Operator::Select => {
                return Ok(Expr::Field {
                    base: self.operand(args, 0)?,
                    member: field_name(def).to_string(),
                });
            }
            Operator::Multiply => BinOp::Mul,
            Operator::Divide => BinOp::Div,
            Operator::Modulo => BinOp::Rem,
            Operator::Plus => BinOp::Add,
            Operator::Minus => BinOp::Sub,
            Operator::ShiftLeft => BinOp::Shl,
            Operator::ShiftRight => BinOp::Shr,
            Operator::Less => BinOp::Lt,
            Operator::LessOrEqual => BinOp::Le,
            Operator::Greater => BinOp::Gt,
            Operator::GreaterOrEqual => BinOp::Ge,
            Operator::Equal => BinOp::Eq,
            Operator::NotEqual => BinOp::Ne,
            Operator::BitwiseAnd => BinOp::BitAnd,
            Operator::BitwiseXor => BinOp::BitXor,
            Operator::BitwiseOr => BinOp::BitOr,
            Operator::LogicalAnd => BinOp::And,
            Operator::LogicalOr => BinOp::Or,
        };
        Ok(Expr::Binary {
            op: binary,
            left: self.operand(args, 0)?,
            right: self.operand(args, 1)?,
        })
    }

    fn unary(&mut self, op: UnaryOp, args: &ExpressionList) -> Result<Expr, ModuleError> {
        Ok(Expr::Unary {
            op,
            expr: self.operand(args, 0)?,
        })
    }

    pub fn transform_value(&mut self, value: &Value) -> Result<Expr, ModuleError> {
        let expr = match value {
            Value::Bool(b) => Expr::Literal(Literal::Bool(*b)),
            Value::Int(i) => Expr::Literal(Literal::Int(*i)),
            Value::Float(f) => Expr::Literal(Literal::Float(*f)),
            Value::Double(d) => Expr::Literal(Literal::Double(*d)),
            Value::String(s) => Expr::Literal(Literal::String(s.clone())),
            Value::Color(rgb) => constructor(
                TypeName::builtin("color"),
                rgb.iter().map(|c| Expr::Literal(Literal::Float(*c))).collect(),
            ),
            Value::Vector(items) => {
                let name = self.type_name(&value.ty());
                let items = self.transform_values(items)?;
                constructor(name, items)
            }
            Value::Enum {
                type_name, name, ..
            } => {
                let ty = QualifiedName::parse(type_name);
                let mut reference = ty.clone();
                reference.components.pop();
                reference.components.push(name.clone());
                self.used_user_types.insert(ty);
                Expr::reference(reference)
            }
            Value::Struct { type_name, fields } => {
                let ty = QualifiedName::parse(type_name);
                self.used_user_types.insert(ty.clone());
                let mut args = Vec::with_capacity(fields.len());
                for (field, v) in fields {
                    args.push(Argument::named(field, self.transform_value(v)?));
                }
                Expr::call(Expr::reference(ty), args)
            }
            Value::Array { elem, items } => {
                let mut callee = self.type_name(&elem.skip_modifiers());
                callee.array = Some(ArraySize::Deferred);
                let items = self.transform_values(items)?;
                constructor(callee, items)
            }
            Value::Texture {
                shape,
                resource,
                gamma,
            } => {
                let mut args = Vec::new();
                if let Some(path) = self.resource_path(*resource)? {
                    args.push(Expr::Literal(Literal::String(path)));
                    args.push(Expr::reference(QualifiedName::parse(gamma_mode(*gamma))));
                }
                constructor(TypeName::builtin(shape.type_name()), args)
            }
            Value::LightProfile(resource) => {
                let args = self.resource_args(*resource)?;
                constructor(TypeName::builtin("light_profile"), args)
            }
            Value::BsdfMeasurement(resource) => {
                let args = self.resource_args(*resource)?;
                constructor(TypeName::builtin("bsdf_measurement"), args)
            }
            Value::InvalidDf(kind) => {
                let name = Type::new(kind.clone()).mdl_name();
                constructor(TypeName::builtin(&name), Vec::new())
            }
        };
        Ok(expr)
    }

    fn transform_values(&mut self, values: &[Value]) -> Result<Vec<Expr>, ModuleError> {
        values.iter().map(|v| self.transform_value(v)).collect()
    }

    fn resource_args(&self, resource: Option<Tag>) -> Result<Vec<Expr>, ModuleError> {
        Ok(self
            .resource_path(resource)?
            .map(|p| Expr::Literal(Literal::String(p)))
            .into_iter()
            .collect())
    }

    /// File path of a resource value; `None` for the invalid resource.
    fn resource_path(&self, resource: Option<Tag>) -> Result<Option<String>, ModuleError> {
        let Some(tag) = resource else {
            return Ok(None);
        };
        let resource = self.txn.resource(tag).ok_or_else(|| {
            ModuleError::DefaultConversion(format!("resource {} not found", tag.0))
        })?;
        Ok(Some(resource.file_path.clone()))
    }
}

fn constructor(ty: TypeName, items: Vec<Expr>) -> Expr {
    Expr::call(
        Expr::Reference(ty),
        items.into_iter().map(Argument::positional).collect(),
    )
}

/// `::pkg::layer.weight(::pkg::layer)` -> `weight`
fn field_name(def: &Definition) -> &str {
    let base = def.name_without_signature();
    match base.rfind('.') {
        Some(pos) => &base[pos + 1..],
        None => def.simple_name(),
    }
}

fn gamma_mode(gamma: f32) -> &'static str {
    if gamma == 1.0 {
        "::tex::gamma_linear"
    } else if gamma == 2.2 {
        "::tex::gamma_srgb"
    } else {
        "::tex::gamma_default"
    }
}
