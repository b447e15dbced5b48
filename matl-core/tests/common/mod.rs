#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use matl_core::{Compiler, DagGenerator, DagOptions, ModuleLookup};
use matl_db::{Database, Element, Transaction};
use matl_ir::{
    AnnotationDefinition, CompiledModule, DagEntity, DefinitionKind, ExprRef, Expression,
    ExpressionList, GeneratedDag, Instance, Message, MdlVersion, Operator, Parameter, Semantic,
    Tag, Type, Value, add_mdl_db_prefix,
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Scripted compiler and DAG generator. Modules "on disk" are the entries of `modules`; DAGs of
/// loaded modules come from `dags`, DAGs of synthesized modules are derived from their AST.
#[derive(Default)]
pub struct FakeToolchain {
    pub modules: HashMap<String, Arc<CompiledModule>>,
    pub dags: HashMap<String, GeneratedDag>,
    pub builtins: HashSet<String>,
    pub refuse_restore: HashSet<String>,
    pub reject_analysis: bool,
    pub analyzed: RefCell<Vec<matl_ast::Module>>,
    pub restored: Cell<usize>,
    pub dropped: Cell<usize>,
    pub last_options: Cell<Option<DagOptions>>,
}

impl FakeToolchain {
    pub fn add(&mut self, module: CompiledModule, dag: GeneratedDag) -> Arc<CompiledModule> {
        let module = Arc::new(module);
        self.dags.insert(module.name.clone(), dag);
        self.modules.insert(module.name.clone(), module.clone());
        module
    }

    pub fn last_analyzed(&self) -> matl_ast::Module {
        self.analyzed.borrow().last().cloned().expect("nothing analyzed")
    }
}

impl Compiler for FakeToolchain {
    fn is_builtin_module(&self, name: &str) -> bool {
        self.builtins.contains(name)
    }

    fn load_module(
        &self,
        name: &str,
        _cache: &dyn ModuleLookup,
    ) -> Result<Arc<CompiledModule>, Vec<Message>> {
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| vec![Message::compiler_error(format!("module {name} not found"))])
    }

    fn load_module_from_stream(
        &self,
        name: &str,
        source: &mut dyn Read,
        _cache: &dyn ModuleLookup,
    ) -> Result<Arc<CompiledModule>, Vec<Message>> {
        let mut text = String::new();
        source
            .read_to_string(&mut text)
            .map_err(|e| vec![Message::compiler_error(e.to_string())])?;
        if !text.starts_with("mdl ") {
            return Err(vec![Message::compiler_error("expected a version declaration")]);
        }
        Ok(Arc::new(CompiledModule {
            name: name.to_string(),
            valid: true,
            ..CompiledModule::default()
        }))
    }

    fn analyze(
        &self,
        module: matl_ast::Module,
        cache: &dyn ModuleLookup,
    ) -> Result<Arc<CompiledModule>, Vec<Message>> {
        let mut imports: Vec<Arc<CompiledModule>> = Vec::new();
        for import in module.imports() {
            let Some(owner) = import.name.module_part() else {
                continue;
            };
            if imports.iter().any(|m| m.name == owner) {
                continue;
            }
            match cache.lookup(&owner) {
                Some(m) => imports.push(m),
                None => {
                    return Err(vec![Message::compiler_error(format!(
                        "unknown import {owner}"
                    ))]);
                }
            }
        }
        let compiled = CompiledModule {
            name: module.name.clone(),
            version: module.version,
            valid: !self.reject_analysis,
            messages: if self.reject_analysis {
                vec![Message::compiler_error("analysis rejected")]
            } else {
                Vec::new()
            },
            imports,
            ..CompiledModule::default()
        };
        self.analyzed.borrow_mut().push(module);
        Ok(Arc::new(compiled))
    }

    fn restore_imports(&self, module: &CompiledModule, _cache: &dyn ModuleLookup) -> bool {
        if self.refuse_restore.contains(&module.name) {
            return false;
        }
        self.restored.set(self.restored.get() + 1);
        true
    }

    fn drop_imports(&self, _module: &CompiledModule) {
        self.dropped.set(self.dropped.get() + 1);
    }
}

impl DagGenerator for FakeToolchain {
    fn compile(
        &self,
        module: &CompiledModule,
        options: &DagOptions,
    ) -> Result<GeneratedDag, Vec<Message>> {
        self.last_options.set(Some(*options));
        if let Some(dag) = self.dags.get(&module.name) {
            return Ok(dag.clone());
        }
        let analyzed = self.analyzed.borrow();
        let Some(ast) = analyzed.iter().rev().find(|m| m.name == module.name) else {
            return Ok(GeneratedDag::default());
        };
        let mut dag = GeneratedDag::default();
        for f in ast.functions() {
            let signature: Vec<String> = f.params.iter().map(|p| p.ty.name.to_string()).collect();
            let entity = DagEntity {
                name: format!("{}::{}({})", module.name, f.name, signature.join(",")),
                parameters: Vec::new(),
                return_type: Type::material(),
                semantic: Semantic::Unknown,
                exported: f.exported,
                varying: false,
                prototype: None,
                annotations: None,
            };
            if f.ret == matl_ast::TypeName::material() {
                dag.materials.push(entity);
            } else {
                dag.functions.push(entity);
            }
        }
        Ok(dag)
    }
}

pub fn module(name: &str) -> CompiledModule {
    CompiledModule {
        name: name.to_string(),
        filename: Some(format!("/lib{}.mdl", name.replace("::", "/"))),
        version: MdlVersion::V1_3,
        valid: true,
        ..CompiledModule::default()
    }
}

pub fn function(name: &str, params: Vec<Parameter>, ret: Type) -> DagEntity {
    DagEntity {
        name: name.to_string(),
        parameters: params,
        return_type: ret,
        semantic: Semantic::Unknown,
        exported: true,
        varying: false,
        prototype: None,
        annotations: None,
    }
}

pub fn material(name: &str, params: Vec<Parameter>) -> DagEntity {
    function(name, params, Type::material())
}

pub fn float(v: f32) -> ExprRef {
    Expression::constant(Type::float(), Value::Float(v))
}

pub fn red() -> ExprRef {
    Expression::constant(Type::color(), Value::Color([1.0, 0.0, 0.0]))
}

/// A toolchain that knows `::base` (functions and materials used by the synthesis tests) and the
/// builtin `::anno`.
pub fn base_toolchain() -> FakeToolchain {
    let mut tc = FakeToolchain::default();

    let mut ternary = function(
        "::base::choose(bool,float,float)",
        vec![
            Parameter::new("cond", Type::bool()),
            Parameter::new("a", Type::float()),
            Parameter::new("b", Type::float()),
        ],
        Type::float(),
    );
    ternary.semantic = Semantic::Operator(Operator::Ternary);
    let mut position = function("::base::position()", vec![], Type::float());
    position.varying = true;
    let mut helper = function(
        "::base::helper(float)",
        vec![Parameter::new("x", Type::float())],
        Type::float(),
    );
    helper.exported = false;

    let dag = GeneratedDag {
        functions: vec![
            function(
                "::base::scale(float)",
                vec![Parameter::new("x", Type::float())],
                Type::float(),
            ),
            function(
                "::base::uniform_scale(float)",
                vec![Parameter::new("x", Type::float().uniform())],
                Type::float().uniform(),
            ),
            ternary,
            position,
            helper,
        ],
        materials: vec![
            material(
                "::base::M(int,color)",
                vec![
                    Parameter::new("a", Type::int()),
                    Parameter::new("b", Type::color()).with_default(red()),
                ],
            ),
            material(
                "::base::glossy(float)",
                vec![Parameter::new("roughness", Type::float().uniform())],
            ),
            material(
                "::base::textured(texture_2d)",
                vec![Parameter::new("tex", Type::texture_2d())],
            ),
            material(
                "::base::diffuse(float)",
                vec![Parameter::new("weight", Type::float())],
            ),
        ],
        ..GeneratedDag::default()
    };
    tc.add(module("::base"), dag);

    let mut anno = module("::anno");
    anno.filename = None;
    anno.stdlib = true;
    anno.annotation_definitions = vec![AnnotationDefinition {
        name: "::anno::description".to_string(),
        parameters: vec![("description".to_string(), Type::string())],
    }];
    tc.add(anno, GeneratedDag::default());
    tc.builtins.insert("::anno".to_string());
    tc
}

pub fn tag_of(db: &Database, name: &str) -> Tag {
    db.name_to_tag(&add_mdl_db_prefix(name))
        .unwrap_or_else(|| panic!("{name} is not registered"))
}

pub fn instance(db: &mut Database, definition: &str, arguments: ExpressionList) -> Tag {
    let def_tag = tag_of(db, definition);
    let kind = db.definition(def_tag).map(|d| d.kind).unwrap_or(DefinitionKind::Function);
    db.store_new(
        Element::Instance(Arc::new(Instance {
            kind,
            definition: def_tag,
            arguments,
        })),
        &format!("instance_{}_{definition}", db.len()),
    )
}
