#![forbid(unsafe_code)]

//! Module creation: validation, loading or synthesis, compilation and registration.

use std::io::Read;
use std::sync::Arc;

use matl_ast::MdlVersion;
use matl_db::{Element, Transaction};
use matl_ir::{
    CompiledModule, DagEntity, Definition, DefinitionKind, ElementKind, GeneratedDag, Message,
    Module, ResourceReference, Tag, TextureShape, Value, add_mdl_db_prefix,
};
use tracing::{error, info};

use crate::callee::Callee;
use crate::config::DriverConfig;
use crate::error::{Created, ModuleError, ResourceError};
use crate::importer::SymbolImporter;
use crate::resources::{self, RegistryResources, ResourceResolver};
use crate::service::{Compiler, DagGenerator, ModuleCache};
use crate::synth::{self, MaterialData, VariantData};

static REGISTRY_RESOURCES: RegistryResources = RegistryResources;

/// Creates modules in a registry with the help of an external compiler and DAG generator.
pub struct ModuleCompiler<'a> {
    compiler: &'a dyn Compiler,
    dag: &'a dyn DagGenerator,
    resources: &'a dyn ResourceResolver,
    config: DriverConfig,
}

impl<'a> ModuleCompiler<'a> {
    pub fn new(compiler: &'a dyn Compiler, dag: &'a dyn DagGenerator) -> Self {
        Self {
            compiler,
            dag,
            resources: &REGISTRY_RESOURCES,
            config: DriverConfig::default(),
        }
    }

    pub fn with_resources(mut self, resources: &'a dyn ResourceResolver) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// `::a::b` or `a::b` where every component is a valid identifier.
    pub fn is_valid_module_name(&self, name: &str) -> bool {
        let body = name.strip_prefix("::").unwrap_or(name);
        body.split("::")
            .all(|component| self.compiler.is_valid_identifier(component))
    }

    /// Loads the module `name` through the compiler and registers it with its imports.
    pub fn create_module(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        messages: &mut Vec<Message>,
    ) -> Result<Created, ModuleError> {
        let result = self.create_module_by_name(txn, name, messages);
        report(result, messages)
    }

    fn create_module_by_name(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        messages: &mut Vec<Message>,
    ) -> Result<Created, ModuleError> {
        if !self.is_valid_module_name(name) {
            return Err(ModuleError::InvalidName(name.to_string()));
        }
        if let Some(tag) = existing_module(txn, name)? {
            return Ok(Created::AlreadyExists(tag));
        }
        let module = self
            .compiler
            .load_module(name, &ModuleCache::new(txn))
            .map_err(|diagnostics| {
                messages.extend(diagnostics);
                ModuleError::LoadFailed(name.to_string())
            })?;
        self.finalize(txn, &module, messages, &mut Vec::new())
    }

    /// Like [`ModuleCompiler::create_module`], with the source read from `source`.
    pub fn create_module_from_stream(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        source: &mut dyn Read,
        messages: &mut Vec<Message>,
    ) -> Result<Created, ModuleError> {
        let result = self.create_module_from_source(txn, name, source, messages);
        report(result, messages)
    }

    fn create_module_from_source(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        source: &mut dyn Read,
        messages: &mut Vec<Message>,
    ) -> Result<Created, ModuleError> {
        if name != self.config.stream_module_name && !self.is_valid_module_name(name) {
            return Err(ModuleError::InvalidName(name.to_string()));
        }
        if let Some(tag) = existing_module(txn, name)? {
            return Ok(Created::AlreadyExists(tag));
        }
        let module = self
            .compiler
            .load_module_from_stream(name, source, &ModuleCache::new(txn))
            .map_err(|diagnostics| {
                messages.extend(diagnostics);
                ModuleError::LoadFailed(name.to_string())
            })?;
        self.finalize(txn, &module, messages, &mut Vec::new())
    }

    /// Creates the module `name` holding one variant per entry of `variants`.
    pub fn create_module_from_variants(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        variants: &[VariantData],
        messages: &mut Vec<Message>,
    ) -> Result<Created, ModuleError> {
        let result = self.check_new_module(txn, name).and_then(|existing| match existing {
            Some(tag) => Ok(Created::AlreadyExists(tag)),
            None => {
                let prototypes = variants.iter().map(|v| v.prototype);
                let version = self.prototype_versions(txn, prototypes, false)?;
                self.synthesize(txn, name, version, messages, |txn, importer, module| {
                    for variant in variants {
                        synth::add_variant(txn, importer, module, variant).inspect_err(|e| {
                            error!(variant = %variant.name, "failed to add variant: {e}");
                        })?;
                    }
                    Ok(())
                })
            }
        });
        report(result, messages)
    }

    /// Creates the module `name` holding one parameter-promoting material per entry of
    /// `materials`.
    pub fn create_module_from_materials(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        materials: &[MaterialData],
        messages: &mut Vec<Message>,
    ) -> Result<Created, ModuleError> {
        let result = self.check_new_module(txn, name).and_then(|existing| match existing {
            Some(tag) => Ok(Created::AlreadyExists(tag)),
            None => {
                let callees = materials.iter().map(|m| m.callee);
                let version = self.prototype_versions(txn, callees, true)?;
                self.synthesize(txn, name, version, messages, |txn, importer, module| {
                    for material in materials {
                        let callee = Callee::from_instance(txn, material.callee)?;
                        synth::add_material(txn, importer, module, &callee, material)
                            .inspect_err(|e| {
                                error!(material = %material.name, "failed to add material: {e}");
                            })?;
                    }
                    Ok(())
                })
            }
        });
        report(result, messages)
    }

    /// Name validation and existence check of a module to be synthesized. Runs before any
    /// prototype is looked at.
    fn check_new_module(
        &self,
        txn: &dyn Transaction,
        name: &str,
    ) -> Result<Option<Tag>, ModuleError> {
        if !self.is_valid_module_name(name) {
            return Err(ModuleError::InvalidName(name.to_string()));
        }
        existing_module(txn, name)
    }

    /// The newest language version among the modules defining the given prototypes.
    fn prototype_versions(
        &self,
        txn: &dyn Transaction,
        prototypes: impl Iterator<Item = Tag>,
        instances: bool,
    ) -> Result<MdlVersion, ModuleError> {
        let mut newest = MdlVersion::V1_0.major_minor();
        for tag in prototypes {
            let definition = match txn.kind_of(tag) {
                Some(ElementKind::FunctionDefinition | ElementKind::MaterialDefinition)
                    if !instances =>
                {
                    txn.definition(tag)
                }
                Some(ElementKind::FunctionCall | ElementKind::MaterialInstance) if instances => txn
                    .instance(tag)
                    .and_then(|i| txn.definition(i.definition)),
                _ => None,
            };
            let version = definition
                .and_then(|d| txn.module(d.module))
                .map(|m| m.version.major_minor())
                .ok_or_else(|| {
                    ModuleError::InvalidPrototype(format!("tag {} is not usable here", tag.0))
                })?;
            newest = newest.max(version);
        }
        Ok(MdlVersion::from_major_minor(newest.0, newest.1))
    }

    /// Builds, analyzes and registers a new module; `name` has passed `check_new_module`.
    fn synthesize(
        &self,
        txn: &mut dyn Transaction,
        name: &str,
        version: MdlVersion,
        messages: &mut Vec<Message>,
        build: impl FnOnce(
            &dyn Transaction,
            &mut SymbolImporter,
            &mut matl_ast::Module,
        ) -> Result<(), ModuleError>,
    ) -> Result<Created, ModuleError> {
        let mut module = self.compiler.create_module(name, version);
        let mut importer = SymbolImporter::new();
        build(&*txn, &mut importer, &mut module)?;
        importer.add_imports(&mut module);

        let compiled = self
            .compiler
            .analyze(module, &ModuleCache::new(txn))
            .map_err(|diagnostics| {
                messages.extend(diagnostics);
                error!(module = name, "failed to create a valid module");
                ModuleError::InvalidModule(name.to_string())
            })?;
        if !compiled.valid {
            messages.extend(compiled.messages.iter().cloned());
            error!(module = name, "failed to create a valid module");
            return Err(ModuleError::InvalidModule(name.to_string()));
        }
        self.finalize(txn, &compiled, messages, &mut Vec::new())
    }

    /// Registers a loaded module. Imports that are not registered yet are finalized first;
    /// `resolving` holds the modules currently being finalized further up.
    fn finalize(
        &self,
        txn: &mut dyn Transaction,
        module: &Arc<CompiledModule>,
        messages: &mut Vec<Message>,
        resolving: &mut Vec<String>,
    ) -> Result<Created, ModuleError> {
        messages.extend(module.messages.iter().cloned());
        if !module.valid {
            return Err(ModuleError::LoadFailed(module.name.clone()));
        }
        if let Some(tag) = existing_module(txn, &module.name)? {
            return Ok(Created::AlreadyExists(tag));
        }

        if !self
            .compiler
            .restore_imports(module, &ModuleCache::new(txn))
        {
            error!(module = %module.name, "failed to restore imports");
            return Err(ModuleError::ImportRestoreFailed(module.name.clone()));
        }
        resolving.push(module.name.clone());
        let result = self.compile_and_register(txn, module, messages, resolving);
        resolving.pop();
        self.compiler.drop_imports(module);
        result
    }

    fn compile_and_register(
        &self,
        txn: &mut dyn Transaction,
        module: &Arc<CompiledModule>,
        messages: &mut Vec<Message>,
        resolving: &mut Vec<String>,
    ) -> Result<Created, ModuleError> {
        let dag = self
            .dag
            .compile(module, &self.config.dag)
            .map_err(|diagnostics| {
                messages.extend(diagnostics);
                ModuleError::LoadFailed(module.name.clone())
            })?;
        messages.extend(dag.messages.iter().cloned());
        if dag.error_count() > 0 {
            return Err(ModuleError::LoadFailed(module.name.clone()));
        }

        let mut imports = Vec::with_capacity(module.imports.len());
        for import in &module.imports {
            imports.push(self.register_import(txn, module, import, messages, resolving)?);
        }

        let function_names = registry_names(&dag.functions);
        let material_names = registry_names(&dag.materials);
        for name in function_names.iter().chain(&material_names) {
            if txn.name_to_tag(name).is_some() {
                error!(definition = %name, "registry name already in use");
                return Err(ModuleError::ExportCollision(name.clone()));
            }
        }

        let resources = self.resolve_resources(txn, module, &dag);
        let builtin = self.compiler.is_builtin_module(&module.name);
        let filename = if builtin { None } else { module.filename.clone() };
        if !builtin && self.config.log_module_loads {
            match &filename {
                Some(file) => info!("loading module \"{}\" from \"{file}\"", module.name),
                None => info!("loading module \"{}\"", module.name),
            }
        }

        let module_tag = txn.reserve_tag();
        let record = Module {
            name: module.name.clone(),
            api_filename: filename.as_deref().map(api_filename),
            filename,
            version: module.version,
            stdlib: module.stdlib,
            imports,
            types: dag
                .types
                .iter()
                .map(|t| (format!("{}::{}", module.name, t.name), t.ty.clone()))
                .collect(),
            constants: dag
                .constants
                .iter()
                .map(|c| (format!("{}::{}", module.name, c.name), c.value.clone()))
                .collect(),
            annotations: dag.module_annotations.clone(),
            annotation_definitions: module.annotation_definitions.clone(),
            functions: function_names.clone(),
            materials: material_names.clone(),
            resources,
            compiled: module.clone(),
        };
        txn.store(
            module_tag,
            Element::Module(Arc::new(record)),
            &add_mdl_db_prefix(&module.name),
            matl_db::Visibility::Browsable,
        );

        let entities = dag
            .functions
            .iter()
            .zip(&function_names)
            .map(|(e, n)| (DefinitionKind::Function, e, n))
            .chain(
                dag.materials
                    .iter()
                    .zip(&material_names)
                    .map(|(e, n)| (DefinitionKind::Material, e, n)),
            );
        for (kind, entity, name) in entities {
            let definition = Definition {
                kind,
                module: module_tag,
                mdl_name: entity.name.clone(),
                parameters: entity.parameters.clone(),
                return_type: entity.return_type.clone(),
                semantic: entity.semantic,
                exported: entity.exported,
                varying: entity.varying,
                prototype: entity
                    .prototype
                    .as_deref()
                    .and_then(|p| txn.name_to_tag(&add_mdl_db_prefix(p))),
                annotations: entity.annotations.clone(),
            };
            let tag = txn.reserve_tag();
            let element = Element::Definition(Arc::new(definition));
            if entity.exported {
                txn.store(tag, element, name, matl_db::Visibility::Browsable);
            } else {
                txn.store_for_reference_counting(tag, element, name);
            }
        }

        Ok(Created::New(module_tag))
    }

    fn register_import(
        &self,
        txn: &mut dyn Transaction,
        module: &CompiledModule,
        import: &Arc<CompiledModule>,
        messages: &mut Vec<Message>,
        resolving: &mut Vec<String>,
    ) -> Result<Tag, ModuleError> {
        let import_failed = || ModuleError::ImportFailed {
            module: module.name.clone(),
            import: import.name.clone(),
        };
        if let Some(tag) = existing_module(txn, &import.name)? {
            return Ok(tag);
        }
        if resolving.contains(&import.name) {
            error!(module = %module.name, import = %import.name, "import cycle");
            return Err(import_failed());
        }
        match self.finalize(txn, import, messages, resolving) {
            Ok(created) => Ok(created.tag()),
            Err(e) => {
                error!(module = %module.name, import = %import.name, "failed to initialize imported module: {e}");
                messages.push(Message::error(e.to_string()));
                Err(import_failed())
            }
        }
    }

    /// Resolves the resource literals of the generated code and groups the tags by the urls the
    /// module references.
    fn resolve_resources(
        &self,
        txn: &mut dyn Transaction,
        module: &CompiledModule,
        dag: &GeneratedDag,
    ) -> Vec<ResourceReference> {
        let mut references: Vec<ResourceReference> = module
            .referenced_resources
            .iter()
            .map(|r| ResourceReference {
                url: r.url.clone(),
                kind: r.kind,
                tags: Vec::new(),
            })
            .collect();
        for literal in &dag.resource_literals {
            let Some(reference) = references.iter_mut().find(|r| r.url == literal.url) else {
                continue;
            };
            let tag = self.resources.resolve(
                txn,
                literal.kind,
                &literal.url,
                literal.gamma,
                false,
                module.filename.as_deref(),
            );
            if let Some(tag) = tag.filter(|t| !reference.tags.contains(t)) {
                reference.tags.push(tag);
            }
        }
        references
    }

    pub fn create_texture(
        &self,
        txn: &mut dyn Transaction,
        path: &str,
        shape: TextureShape,
        gamma: f32,
        shared: bool,
    ) -> Result<Value, ResourceError> {
        resources::create_texture(txn, self.resources, path, shape, gamma, shared)
    }

    pub fn create_light_profile(
        &self,
        txn: &mut dyn Transaction,
        path: &str,
        shared: bool,
    ) -> Result<Value, ResourceError> {
        resources::create_light_profile(txn, self.resources, path, shared)
    }

    pub fn create_bsdf_measurement(
        &self,
        txn: &mut dyn Transaction,
        path: &str,
        shared: bool,
    ) -> Result<Value, ResourceError> {
        resources::create_bsdf_measurement(txn, self.resources, path, shared)
    }
}

/// The tag of a registered module `name`, or an error if the name belongs to something else.
fn existing_module(txn: &dyn Transaction, name: &str) -> Result<Option<Tag>, ModuleError> {
    let db_name = add_mdl_db_prefix(name);
    match txn.name_to_tag(&db_name) {
        None => Ok(None),
        Some(tag) if txn.kind_of(tag) == Some(ElementKind::Module) => Ok(Some(tag)),
        Some(_) => {
            error!("registry name for module \"{db_name}\" already in use");
            Err(ModuleError::NameInUse(db_name))
        }
    }
}

fn registry_names(entities: &[DagEntity]) -> Vec<String> {
    entities
        .iter()
        .map(|e| add_mdl_db_prefix(&e.name))
        .collect()
}

/// `/lib/pkg.mdr:pkg/metals.mdl` -> `/lib/pkg.mdr`; plain files map to themselves.
fn api_filename(filename: &str) -> String {
    match filename.find(".mdr:") {
        Some(pos) => filename[..pos + 4].to_string(),
        None => filename.to_string(),
    }
}

fn report<T>(result: Result<T, ModuleError>, messages: &mut Vec<Message>) -> Result<T, ModuleError> {
    if let Err(e) = &result {
        messages.push(Message::error(e.to_string()));
    }
    result
}
