#![forbid(unsafe_code)]

mod database;
mod lookup;
mod transaction;

pub use database::Database;
pub use lookup::{function_overloads, module_function_tag, module_material_tag};
pub use transaction::{Element, Transaction, Visibility};
