use std::sync::Arc;

use matl_core::{Created, DriverConfig, ModuleCompiler, ModuleError, status_code};
use matl_db::{Database, Element, Transaction, Visibility, function_overloads, module_function_tag};
use matl_ir::{
    DagType, ElementKind, ExpressionList, GeneratedDag, Message, Parameter,
    ReferencedResource, Resource, ResourceKind, ResourceLiteral, TextureShape, Type,
};

mod common;
use common::{base_toolchain, float, function, init_tracing, module, tag_of, FakeToolchain};

fn texture_record(path: &str) -> Element {
    Element::Resource(Arc::new(Resource {
        kind: ResourceKind::Texture(TextureShape::TwoD),
        file_path: path.to_string(),
        gamma: None,
        shared: false,
    }))
}

#[test]
fn creating_twice_is_idempotent() {
    init_tracing();
    let tc = base_toolchain();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    let mut messages = Vec::new();

    let first = driver.create_module(&mut db, "::base", &mut messages).unwrap();
    assert!(matches!(first, Created::New(_)));
    let records = db.len();

    let second = driver.create_module(&mut db, "::base", &mut messages);
    assert_eq!(status_code(&second), 1);
    assert_eq!(second.unwrap().tag(), first.tag());
    assert_eq!(db.len(), records);
    assert!(messages.is_empty(), "{messages:?}");
}

#[test]
fn registers_module_and_definitions() {
    let tc = base_toolchain();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    let mut messages = Vec::new();

    let tag = driver
        .create_module(&mut db, "::base", &mut messages)
        .unwrap()
        .tag();
    let record = db.module(tag).unwrap();
    assert_eq!(record.name, "::base");
    assert_eq!(record.filename.as_deref(), Some("/lib/base.mdl"));
    assert_eq!(record.api_filename, record.filename);
    assert_eq!(record.function_count(), 5);
    assert_eq!(record.material_count(), 4);
    assert_eq!(record.function_name(0), Some("mdl::base::scale(float)"));
    assert!(!record.is_standard_module());

    let scale = module_function_tag(&db, &record, 0).unwrap();
    let def = db.definition(scale).unwrap();
    assert_eq!(def.module, tag);
    assert_eq!(db.kind_of(tag_of(&db, "::base::M(int,color)")), Some(ElementKind::MaterialDefinition));

    // Local definitions resolve by name but are not browsable.
    let helper = tag_of(&db, "::base::helper(float)");
    assert_eq!(db.visibility(helper), Some(Visibility::ReferenceCounted));
    assert!(!db.visible_names().contains(&"mdl::base::helper(float)".to_string()));
    assert!(db.visible_names().contains(&"mdl::base".to_string()));

    assert_eq!(tc.restored.get(), tc.dropped.get());
    let options = tc.last_options.get().unwrap();
    assert!(options.allow_local_calls && options.include_local_entities);
}

#[test]
fn overloads_filter_by_argument_types() {
    let tc = base_toolchain();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    let tag = driver
        .create_module(&mut db, "::base", &mut Vec::new())
        .unwrap()
        .tag();
    let record = db.module(tag).unwrap();

    assert_eq!(
        function_overloads(&db, &record, "mdl::base::scale", None),
        vec!["mdl::base::scale(float)".to_string()]
    );
    let float_arg = ExpressionList::new().with("x", float(1.0));
    assert_eq!(
        function_overloads(&db, &record, "mdl::base::scale(int)", Some(&float_arg)).len(),
        1
    );
    let wrong_name = ExpressionList::new().with("y", float(1.0));
    assert!(function_overloads(&db, &record, "mdl::base::scale", Some(&wrong_name)).is_empty());
}

#[test]
fn invalid_names_are_rejected_before_loading() {
    let tc = base_toolchain();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    let mut messages = Vec::new();

    for name in ["::1base", "::a::::b", "::a-b", ""] {
        let result = driver.create_module(&mut db, name, &mut messages);
        assert_eq!(status_code(&result), -1, "{name}");
    }
    assert!(db.is_empty());
    assert_eq!(messages.len(), 4);
}

#[test]
fn name_used_by_another_kind_conflicts() {
    let tc = base_toolchain();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    db.store_new(texture_record("/x.png"), "mdl::base");

    let result = driver.create_module(&mut db, "::base", &mut Vec::new());
    assert!(matches!(result, Err(ModuleError::NameInUse(ref n)) if n == "mdl::base"));
    assert_eq!(status_code(&result), -3);

    // Same outcome when the module would not even load.
    db.store_new(texture_record("/y.png"), "mdl::missing");
    let result = driver.create_module(&mut db, "::missing", &mut Vec::new());
    assert_eq!(status_code(&result), -3);
}

#[test]
fn load_and_dag_errors_block_registration() {
    let mut tc = base_toolchain();
    let mut broken = module("::broken");
    broken.valid = false;
    broken.messages = vec![Message::compiler_error("unexpected token")];
    tc.add(broken, GeneratedDag::default());
    tc.add(
        module("::bad_dag"),
        GeneratedDag {
            messages: vec![Message::compiler_error("cannot generate code")],
            functions: vec![function("::bad_dag::f()", vec![], Type::float())],
            ..GeneratedDag::default()
        },
    );
    tc.add(
        module("::warned"),
        GeneratedDag {
            messages: vec![Message::compiler_warning("unused variable")],
            ..GeneratedDag::default()
        },
    );
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();

    let mut messages = Vec::new();
    let result = driver.create_module(&mut db, "::broken", &mut messages);
    assert_eq!(status_code(&result), -2);
    assert!(messages.iter().any(|m| m.text == "unexpected token"));

    let mut messages = Vec::new();
    let result = driver.create_module(&mut db, "::nowhere", &mut messages);
    assert_eq!(status_code(&result), -2);
    assert!(messages.iter().any(|m| m.text.contains("not found")));

    let result = driver.create_module(&mut db, "::bad_dag", &mut Vec::new());
    assert_eq!(status_code(&result), -2);
    assert!(db.name_to_tag("mdl::bad_dag::f()").is_none());
    assert!(db.is_empty());

    let mut messages = Vec::new();
    let result = driver.create_module(&mut db, "::warned", &mut messages);
    assert_eq!(status_code(&result), 0);
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].is_error());
}

#[test]
fn export_collision_registers_nothing() {
    let mut tc = FakeToolchain::default();
    tc.add(
        module("::dup"),
        GeneratedDag {
            functions: vec![
                function("::dup::g()", vec![], Type::float()),
                function(
                    "::dup::f(float)",
                    vec![Parameter::new("x", Type::float())],
                    Type::float(),
                ),
            ],
            ..GeneratedDag::default()
        },
    );
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    db.store_new(texture_record("/f.png"), "mdl::dup::f(float)");
    let before = db.len();

    let result = driver.create_module(&mut db, "::dup", &mut Vec::new());
    assert!(matches!(result, Err(ModuleError::ExportCollision(_))));
    assert_eq!(status_code(&result), -3);
    assert_eq!(db.len(), before);
    assert!(db.name_to_tag("mdl::dup").is_none());
    assert!(db.name_to_tag("mdl::dup::g()").is_none());
    assert_eq!(tc.restored.get(), tc.dropped.get());
}

#[test]
fn imports_are_registered_first_and_kept_on_failure() {
    let mut tc = FakeToolchain::default();
    let leaf = tc.add(
        module("::leaf"),
        GeneratedDag {
            functions: vec![function("::leaf::f()", vec![], Type::float())],
            ..GeneratedDag::default()
        },
    );
    let mut mid = module("::mid");
    mid.imports = vec![leaf.clone()];
    let mid = tc.add(mid, GeneratedDag::default());
    let mut top = module("::top");
    top.imports = vec![mid.clone(), leaf.clone()];
    tc.add(top, GeneratedDag::default());

    let mut broken = module("::broken");
    broken.valid = false;
    let broken = tc.add(broken, GeneratedDag::default());
    let mut fragile = module("::fragile");
    fragile.imports = vec![leaf.clone(), broken];
    tc.add(fragile, GeneratedDag::default());

    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();

    let mut messages = Vec::new();
    let result = driver.create_module(&mut db, "::fragile", &mut messages);
    assert!(matches!(
        result,
        Err(ModuleError::ImportFailed { ref module, ref import }) if module == "::fragile" && import == "::broken"
    ));
    assert_eq!(status_code(&result), -4);
    // The import that succeeded stays registered.
    assert!(db.name_to_tag("mdl::leaf").is_some());
    assert!(db.name_to_tag("mdl::fragile").is_none());

    let top = driver
        .create_module(&mut db, "::top", &mut Vec::new())
        .unwrap()
        .tag();
    let top = db.module(top).unwrap();
    assert_eq!(top.import_count(), 2);
    assert_eq!(top.import(0), Some(tag_of(&db, "::mid")));
    assert_eq!(top.import(1), Some(tag_of(&db, "::leaf")));
    let mid = db.module(tag_of(&db, "::mid")).unwrap();
    assert_eq!(mid.imports, vec![tag_of(&db, "::leaf")]);
    assert_eq!(tc.restored.get(), tc.dropped.get());
}

#[test]
fn restore_failure_and_cycles_are_import_errors() {
    let mut tc = FakeToolchain::default();
    tc.add(module("::stuck"), GeneratedDag::default());
    tc.refuse_restore.insert("::stuck".to_string());

    let inner = Arc::new(module("::a"));
    let mut b = module("::b");
    b.imports = vec![inner];
    let b = tc.add(b, GeneratedDag::default());
    let mut a = module("::a");
    a.imports = vec![b];
    tc.add(a, GeneratedDag::default());

    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();

    let result = driver.create_module(&mut db, "::stuck", &mut Vec::new());
    assert!(matches!(result, Err(ModuleError::ImportRestoreFailed(_))));
    assert_eq!(status_code(&result), -4);

    let result = driver.create_module(&mut db, "::a", &mut Vec::new());
    assert_eq!(status_code(&result), -4);
    assert!(db.is_empty());
    assert_eq!(tc.restored.get(), tc.dropped.get());
}

#[test]
fn stream_modules_accept_the_placeholder_name() {
    let tc = FakeToolchain::default();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();

    let mut source: &[u8] = b"mdl 1.3;\n";
    let created = driver
        .create_module_from_stream(&mut db, "::<memory>", &mut source, &mut Vec::new())
        .unwrap();
    assert!(db.module(created.tag()).unwrap().filename.is_none());

    let mut garbage: &[u8] = b"material";
    let mut messages = Vec::new();
    let result = driver.create_module_from_stream(&mut db, "::scratch", &mut garbage, &mut messages);
    assert_eq!(status_code(&result), -2);
    assert!(messages.iter().any(|m| m.text.contains("version declaration")));

    let mut source: &[u8] = b"mdl 1.3;\n";
    let result = driver.create_module_from_stream(&mut db, "::<other>", &mut source, &mut Vec::new());
    assert_eq!(status_code(&result), -1);
}

#[test]
fn builtin_modules_have_no_origin() {
    let tc = base_toolchain();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();
    let tag = driver
        .create_module(&mut db, "::anno", &mut Vec::new())
        .unwrap()
        .tag();
    let record = db.module(tag).unwrap();
    assert!(record.filename.is_none());
    assert!(record.is_standard_module());
    assert_eq!(record.annotation_definitions.len(), 1);
}

#[test]
fn types_constants_and_resources_are_recorded() {
    let mut tc = FakeToolchain::default();
    let mut wood = module("::wood");
    wood.referenced_resources = vec![ReferencedResource {
        url: "textures/grain.png".to_string(),
        kind: ResourceKind::Texture(TextureShape::TwoD),
    }];
    tc.add(
        wood,
        GeneratedDag {
            types: vec![DagType {
                name: "grain".to_string(),
                ty: Type::new(matl_ir::TypeKind::Struct("::wood::grain".to_string())),
                annotations: None,
            }],
            resource_literals: vec![
                ResourceLiteral {
                    url: "textures/grain.png".to_string(),
                    kind: ResourceKind::Texture(TextureShape::TwoD),
                    gamma: Some(2.2),
                },
                ResourceLiteral {
                    url: "textures/unlisted.png".to_string(),
                    kind: ResourceKind::Texture(TextureShape::TwoD),
                    gamma: None,
                },
            ],
            ..GeneratedDag::default()
        },
    );
    let config =
        DriverConfig::from_toml_str("log_module_loads = false\n[dag]\nallow_local_calls = false\n")
            .unwrap();
    let driver = ModuleCompiler::new(&tc, &tc).with_config(config);
    let mut db = Database::new();

    let tag = driver
        .create_module(&mut db, "::wood", &mut Vec::new())
        .unwrap()
        .tag();
    let record = db.module(tag).unwrap();
    assert_eq!(record.types[0].0, "::wood::grain");
    assert_eq!(record.resources_count(), 1);
    assert_eq!(record.resource_url(0), Some("textures/grain.png"));
    assert_eq!(record.resource_type(0), Some(Type::texture_2d()));
    let texture = db.resource(record.resource_tag(0).unwrap()).unwrap();
    assert_eq!(texture.file_path, "/lib/textures/grain.png");
    assert!(!tc.last_options.get().unwrap().allow_local_calls);
}

#[test]
fn resource_factories_go_through_the_driver_resolver() {
    let tc = FakeToolchain::default();
    let driver = ModuleCompiler::new(&tc, &tc);
    let mut db = Database::new();

    let texture = driver
        .create_texture(&mut db, "/tex/a.png", TextureShape::TwoD, 1.0, false)
        .unwrap();
    assert!(texture.resource_tag().is_some());
    assert_eq!(
        driver
            .create_light_profile(&mut db, "spot.ies", false)
            .unwrap_err()
            .code(),
        -2
    );
    assert!(driver.create_bsdf_measurement(&mut db, "/m.mbsdf", true).is_ok());
    assert_eq!(db.len(), 2);
}
