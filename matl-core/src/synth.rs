#![forbid(unsafe_code)]

//! Synthesis of new declarations from registered definitions and calls.

use matl_ast::{
    Argument, Decl, Expr, FunctionDecl, ParamDecl, QualifiedName, Qualifier, Stmt, TypeName,
    VarDecl,
};
use matl_db::Transaction;
use matl_ir::{AnnotationBlock, ExprRef, ExpressionList, Tag};
use tracing::debug;

use crate::annotations::create_annotations;
use crate::ast_builder::AstBuilder;
use crate::callee::Callee;
use crate::error::{ModuleError, UniformError};
use crate::importer::SymbolImporter;
use crate::path::find_path;
use crate::uniform::can_enforce_uniform;

/// A re-export of `prototype` under `name` with some defaults replaced.
#[derive(Clone, Debug)]
pub struct VariantData {
    /// A function or material definition.
    pub prototype: Tag,
    pub name: String,
    pub defaults: ExpressionList,
    pub annotations: Option<AnnotationBlock>,
}

/// Promotion of one nested argument of the callee to a parameter of the new material.
#[derive(Clone, Debug)]
pub struct ParameterData {
    pub name: String,
    /// Dotted path into the callee's arguments, e.g. `surface.scattering.tint`.
    pub path: String,
    pub enforce_uniform: bool,
    pub annotations: Option<AnnotationBlock>,
}

#[derive(Clone, Debug)]
pub struct MaterialData {
    /// A function call or material instance.
    pub callee: Tag,
    pub name: String,
    pub parameters: Vec<ParameterData>,
    pub annotations: Option<AnnotationBlock>,
}

struct NewParameter<'a> {
    data: &'a ParameterData,
    init: ExprRef,
    uniform: bool,
}

/// Adds a variant of `data.prototype` to `module`.
pub fn add_variant(
    txn: &dyn Transaction,
    importer: &mut SymbolImporter,
    module: &mut matl_ast::Module,
    data: &VariantData,
) -> Result<(), ModuleError> {
    let mut prototype = txn.definition(data.prototype).ok_or_else(|| {
        ModuleError::InvalidPrototype(format!("tag {} is not a definition", data.prototype.0))
    })?;
    if let Some(underlying) = prototype.prototype {
        let resolved = txn
            .definition(underlying)
            .filter(|d| d.kind == prototype.kind)
            .ok_or_else(|| {
                ModuleError::InvalidPrototype(format!(
                    "variant \"{}\" refers to an unusable prototype",
                    prototype.mdl_name
                ))
            })?;
        prototype = resolved;
    }

    for (name, expr) in data.defaults.iter() {
        let param = prototype
            .parameter(name)
            .ok_or_else(|| ModuleError::UnknownParameter(name.to_string()))?;
        if !expr.ty().matches_parameter(&param.ty) {
            return Err(ModuleError::TypeMismatch(name.to_string()));
        }
    }

    let mut builder = AstBuilder::new(txn);
    let mut args = Vec::with_capacity(data.defaults.len());
    for param in &prototype.parameters {
        if let Some(expr) = data.defaults.get(&param.name) {
            args.push(Argument::named(&param.name, builder.transform_expr(expr)?));
        }
    }
    let call = Expr::call(
        Expr::reference(QualifiedName::parse(prototype.name_without_signature())),
        args,
    );
    let annotations = create_annotations(txn, data.annotations.as_ref(), importer)?;

    let ret = if prototype.is_material() {
        TypeName::material()
    } else {
        builder.type_name(&prototype.return_type)
    };
    importer.collect_expr(&call);
    importer.collect_type_name(&ret);
    importer.add_names(builder.used_user_types());

    debug!(variant = %data.name, prototype = %prototype.mdl_name, "adding variant");
    module.add_declaration(Decl::Function(FunctionDecl {
        ret,
        name: data.name.clone(),
        params: Vec::new(),
        is_clone: true,
        body: Stmt::Expr(call),
        annotations,
        exported: true,
    }));
    Ok(())
}

/// Adds a material to `module` that calls `callee` with the requested nested arguments exposed
/// as parameters.
pub fn add_material(
    txn: &dyn Transaction,
    importer: &mut SymbolImporter,
    module: &mut matl_ast::Module,
    callee: &Callee,
    data: &MaterialData,
) -> Result<(), ModuleError> {
    let args = &callee.arguments;
    if args.is_empty() && !data.parameters.is_empty() {
        return Err(ModuleError::MissingArguments(data.name.clone()));
    }

    let mut new_params = Vec::with_capacity(data.parameters.len());
    for request in &data.parameters {
        let init = find_path(txn, &request.path, args)
            .ok_or_else(|| ModuleError::PathNotFound(request.path.clone()))?;
        let must_be_uniform =
            can_enforce_uniform(txn, callee, &request.path, &init).map_err(|e| match e {
                UniformError::Conflict(reason) => ModuleError::UniformConflict {
                    path: request.path.clone(),
                    reason,
                },
                UniformError::Internal(reason) => ModuleError::Internal(reason),
            })?;
        let uniform = must_be_uniform || request.enforce_uniform || init.ty().is_resource();
        debug!(parameter = %request.name, path = %request.path, uniform, "promoting argument");
        new_params.push(NewParameter {
            data: request,
            init,
            uniform,
        });
    }

    let annotations = create_annotations(txn, data.annotations.as_ref(), importer)?;

    let mut builder = AstBuilder::new(txn);
    for p in &new_params {
        builder.declare_parameter(&p.data.name, &p.init);
    }

    let callee_ref = Expr::reference(QualifiedName::parse(&callee.name));
    let body = if args.iter().all(|(_, arg)| builder.is_parameter(arg)) {
        let mut call_args = Vec::with_capacity(args.len());
        for (name, arg) in args.iter() {
            call_args.push(Argument::named(name, builder.transform_expr(arg)?));
        }
        Expr::call(callee_ref, call_args)
    } else {
        // Bind every original argument so all of them are still evaluated.
        let mut decls = Vec::with_capacity(args.len());
        let mut call_args = Vec::with_capacity(args.len());
        for (name, arg) in args.iter() {
            let ty = builder.type_name(&arg.ty().skip_modifiers());
            let init = builder.transform_expr(arg)?;
            let tmp = builder.next_temporary_name();
            call_args.push(Argument::named(name, Expr::local(&tmp)));
            decls.push(VarDecl { ty, name: tmp, init });
        }
        Expr::Let {
            decls,
            body: Box::new(Expr::call(callee_ref, call_args)),
        }
    };
    importer.collect_expr(&body);

    // Defaults are the original expressions themselves.
    builder.remove_parameters();
    let mut params = Vec::with_capacity(new_params.len());
    for p in &new_params {
        let mut ty = builder.type_name(&p.init.ty().skip_modifiers());
        if p.uniform {
            ty.set_qualifier(Qualifier::Uniform);
        }
        let default = builder.transform_expr(&p.init)?;
        let annotations = create_annotations(txn, p.data.annotations.as_ref(), importer)?;
        importer.collect_type_name(&ty);
        importer.collect_expr(&default);
        params.push(ParamDecl {
            ty,
            name: p.data.name.clone(),
            default: Some(default),
            annotations,
        });
    }
    importer.add_names(builder.used_user_types());

    module.add_declaration(Decl::Function(FunctionDecl {
        ret: TypeName::material(),
        name: data.name.clone(),
        params,
        is_clone: false,
        body: Stmt::Expr(body),
        annotations,
        exported: true,
    }));
    Ok(())
}
