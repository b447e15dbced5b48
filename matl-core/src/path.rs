#![forbid(unsafe_code)]

use matl_db::Transaction;
use matl_ir::{ExprRef, Expression, ExpressionList};
use tracing::trace;

/// Locates the expression at a dotted `path` (e.g. `surface.scattering.tint`) inside `args`.
///
/// The first segment names a top-level argument. Every further segment names an argument of the
/// call reached so far, either through a stored function call / material instance or a direct
/// call. Any other expression kind, or an unknown name, ends the walk with `None`.
pub fn find_path(txn: &dyn Transaction, path: &str, args: &ExpressionList) -> Option<ExprRef> {
    let mut segments = path.split('.');
    let mut expr = args.get(segments.next()?)?.clone();

    for segment in segments {
        let next = match expr.as_ref() {
            Expression::Call { call, .. } => {
                let instance = txn.instance(*call)?;
                instance.arguments.get(segment).cloned()
            }
            Expression::DirectCall { arguments, .. } => arguments.get(segment).cloned(),
            _ => None,
        };
        let Some(next) = next else {
            trace!(path, segment, "path segment not found");
            return None;
        };
        expr = next;
    }
    Some(expr)
}
