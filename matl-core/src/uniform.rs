#![forbid(unsafe_code)]

//! Uniform propagation over an instantiated argument tree.
//!
//! The analysis answers two questions for a promotion candidate: can the uniform requirements
//! along the path from the root argument be met at all, and does the candidate itself have to be
//! uniform. The walk is a breadth-first queue of `(expression, uniform required)` entries; the
//! same subtree may be queued more than once, it is shared by handle and never copied.

use std::collections::VecDeque;
use std::sync::Arc;

use matl_db::Transaction;
use matl_ir::{Definition, DefinitionKind, ExprRef, Expression, ExpressionList, Type};
use tracing::{debug, trace};

use crate::callee::Callee;
use crate::error::UniformError;

struct Pending {
    expr: ExprRef,
    uniform: bool,
}

pub struct UniformAnalyzer<'t> {
    txn: &'t dyn Transaction,
}

impl<'t> UniformAnalyzer<'t> {
    pub fn new(txn: &'t dyn Transaction) -> Self {
        Self { txn }
    }

    /// Walks `root` under the given requirement and reports whether `target` (compared by
    /// identity) is reached while a uniform value is required.
    pub fn analyze(
        &self,
        root: &ExprRef,
        root_uniform: bool,
        target: &ExprRef,
    ) -> Result<bool, UniformError> {
        let mut must_be_uniform = false;
        let mut queue = VecDeque::new();
        queue.push_back(Pending {
            expr: root.clone(),
            uniform: root_uniform,
        });

        while let Some(Pending { expr, uniform }) = queue.pop_front() {
            if uniform && Arc::ptr_eq(&expr, target) {
                must_be_uniform = true;
            }
            trace!(kind = ?expr.kind(), uniform, "uniform analysis step");

            match expr.as_ref() {
                Expression::Constant { .. } => {}
                Expression::Call { ty, call } => {
                    let instance = self.txn.instance(*call).ok_or_else(|| {
                        UniformError::Internal(format!(
                            "unsupported entity kind in call (tag {})",
                            call.0
                        ))
                    })?;
                    if instance.kind == DefinitionKind::Material {
                        if uniform {
                            return Err(material_conflict());
                        }
                        continue;
                    }
                    let def = self.definition(instance.definition)?;
                    self.expand(&mut queue, &def, ty, &instance.arguments, uniform)?;
                }
                Expression::DirectCall {
                    ty,
                    definition,
                    arguments,
                } => {
                    let def = self.definition(*definition)?;
                    // Unlike a stored material instance, a direct material call is never allowed.
                    if def.is_material() {
                        return Err(material_conflict());
                    }
                    self.expand(&mut queue, &def, ty, arguments, uniform)?;
                }
                Expression::Parameter { .. } | Expression::Temporary { .. } => {
                    return Err(UniformError::Internal(format!(
                        "unexpected {:?} node in an argument tree",
                        expr.kind()
                    )));
                }
            }
        }

        debug!(must_be_uniform, "uniform analysis finished");
        Ok(must_be_uniform)
    }

    fn definition(&self, tag: matl_ir::Tag) -> Result<Arc<Definition>, UniformError> {
        self.txn
            .definition(tag)
            .ok_or_else(|| UniformError::Internal(format!("definition {} not found", tag.0)))
    }

    fn expand(
        &self,
        queue: &mut VecDeque<Pending>,
        def: &Definition,
        ret: &Type,
        arguments: &ExpressionList,
        uniform: bool,
    ) -> Result<(), UniformError> {
        let mut auto = false;
        if uniform && !ret.is_uniform() {
            if !def.is_uniform_function() {
                return Err(UniformError::Conflict(format!(
                    "a uniform result is required from \"{}\", which is not uniform",
                    def.name_without_signature()
                )));
            }
            auto = true;
        }
        let ternary = def.semantic.is_ternary();

        for (index, (name, arg)) in arguments.iter().enumerate() {
            let param = def
                .parameter(name)
                .or_else(|| def.parameters.get(index))
                .map(|p| &p.ty);
            let (mut p_uniform, mut p_varying) =
                param.map_or((false, false), |t| (t.is_uniform(), t.is_varying()));
            if ternary && index == 0 {
                p_uniform = true;
                p_varying = false;
            }
            queue.push_back(Pending {
                expr: arg.clone(),
                uniform: !p_varying && (auto || p_uniform),
            });
        }
        Ok(())
    }
}

fn material_conflict() -> UniformError {
    UniformError::Conflict("a material is never uniform".to_string())
}

/// Runs the analysis for a promotion at `path` inside the arguments of `callee`: the root is the
/// argument named by the first path segment, required uniform when its parameter is declared
/// uniform.
pub fn can_enforce_uniform(
    txn: &dyn Transaction,
    callee: &Callee,
    path: &str,
    target: &ExprRef,
) -> Result<bool, UniformError> {
    let root_name = path.split('.').next().unwrap_or(path);
    let root = callee
        .arguments
        .get(root_name)
        .ok_or_else(|| UniformError::Internal(format!("no argument \"{root_name}\"")))?;
    let root_uniform = callee
        .parameter_type(root_name)
        .is_some_and(Type::is_uniform);

    UniformAnalyzer::new(txn).analyze(root, root_uniform, target)
}
