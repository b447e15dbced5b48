#![forbid(unsafe_code)]

//! Contracts of the external compiler collaborators.

use std::io::Read;
use std::sync::Arc;

use matl_ast::MdlVersion;
use matl_db::Transaction;
use matl_ir::{CompiledModule, GeneratedDag, Message, add_mdl_db_prefix};

use crate::config::DagOptions;

/// Resolution cache the compiler consults for modules that are already registered.
pub trait ModuleLookup {
    fn lookup(&self, name: &str) -> Option<Arc<CompiledModule>>;
}

/// [`ModuleLookup`] over the registry of a transaction.
pub struct ModuleCache<'t> {
    txn: &'t dyn Transaction,
}

impl<'t> ModuleCache<'t> {
    pub fn new(txn: &'t dyn Transaction) -> Self {
        Self { txn }
    }
}

impl ModuleLookup for ModuleCache<'_> {
    fn lookup(&self, name: &str) -> Option<Arc<CompiledModule>> {
        let tag = self.txn.name_to_tag(&add_mdl_db_prefix(name))?;
        self.txn.module(tag).map(|m| m.compiled.clone())
    }
}

/// Loader and semantic analyzer of material modules.
///
/// Failures come back as the diagnostics the compiler produced; a returned module may still be
/// invalid (see `CompiledModule::valid`) and carry its own messages.
pub trait Compiler {
    fn is_valid_identifier(&self, ident: &str) -> bool {
        is_mdl_identifier(ident)
    }

    /// Builtin modules have no origin file.
    fn is_builtin_module(&self, name: &str) -> bool;

    fn load_module(
        &self,
        name: &str,
        cache: &dyn ModuleLookup,
    ) -> Result<Arc<CompiledModule>, Vec<Message>>;

    fn load_module_from_stream(
        &self,
        name: &str,
        source: &mut dyn Read,
        cache: &dyn ModuleLookup,
    ) -> Result<Arc<CompiledModule>, Vec<Message>>;

    fn create_module(&self, name: &str, version: MdlVersion) -> matl_ast::Module {
        matl_ast::Module::new(name, version)
    }

    /// Runs semantic analysis on a module assembled in memory.
    fn analyze(
        &self,
        module: matl_ast::Module,
        cache: &dyn ModuleLookup,
    ) -> Result<Arc<CompiledModule>, Vec<Message>>;

    /// Makes the imports of `module` available for DAG generation. Every successful call is
    /// paired with one [`Compiler::drop_imports`].
    fn restore_imports(&self, module: &CompiledModule, cache: &dyn ModuleLookup) -> bool;

    fn drop_imports(&self, module: &CompiledModule);
}

pub trait DagGenerator {
    fn compile(
        &self,
        module: &CompiledModule,
        options: &DagOptions,
    ) -> Result<GeneratedDag, Vec<Message>>;
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_mdl_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
