#![forbid(unsafe_code)]

/// Prefix that separates material-language entities from other registry names.
pub const DB_PREFIX: &str = "mdl";

/// Registry name for an absolute entity name: `::pkg::m` becomes `mdl::pkg::m`.
pub fn add_mdl_db_prefix(name: &str) -> String {
    if name.starts_with("::") {
        format!("{DB_PREFIX}{name}")
    } else {
        format!("{DB_PREFIX}::{name}")
    }
}

/// Inverse of [`add_mdl_db_prefix`]; names without the prefix are returned unchanged.
pub fn strip_mdl_db_prefix(name: &str) -> &str {
    match name.strip_prefix(DB_PREFIX) {
        Some(rest) if rest.starts_with("::") => rest,
        _ => name,
    }
}

/// `::pkg::f(float,int)` -> `::pkg::f`
pub fn strip_signature(name: &str) -> &str {
    match name.find('(') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// `::pkg::f(float,int)` -> `f`
pub fn simple_name(name: &str) -> &str {
    let base = strip_signature(name);
    match base.rfind("::") {
        Some(pos) => &base[pos + 2..],
        None => base,
    }
}
