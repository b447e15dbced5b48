#![forbid(unsafe_code)]

use matl_ast::{Argument, QualifiedName};
use matl_db::Transaction;
use matl_ir::{Annotation, AnnotationBlock, Expression, add_mdl_db_prefix, strip_signature};

use crate::ast_builder::AstBuilder;
use crate::error::ModuleError;
use crate::importer::SymbolImporter;

/// Converts a caller-supplied annotation block into source form and records its names for
/// import. `None` and empty blocks produce no block.
pub fn create_annotations(
    txn: &dyn Transaction,
    block: Option<&AnnotationBlock>,
    importer: &mut SymbolImporter,
) -> Result<Option<matl_ast::AnnotationBlock>, ModuleError> {
    let Some(block) = block.filter(|b| !b.is_empty()) else {
        return Ok(None);
    };
    let converted = block
        .iter()
        .map(|anno| add_annotation(txn, anno))
        .collect::<Result<matl_ast::AnnotationBlock, _>>()?;
    importer.collect_annotations(&converted);
    Ok(Some(converted))
}

/// Checks one annotation (`::anno::description(string)` style name plus constant arguments)
/// against its definition and converts it.
pub fn add_annotation(
    txn: &dyn Transaction,
    anno: &Annotation,
) -> Result<matl_ast::Annotation, ModuleError> {
    let full_name = anno.name.as_str();
    let malformed = || ModuleError::AnnotationName(full_name.to_string());
    if !full_name.starts_with("::") {
        return Err(malformed());
    }
    let paren = full_name.find('(').ok_or_else(malformed)?;
    let name = strip_signature(full_name);
    let signature = full_name[paren + 1..].trim_end_matches(')');
    let module_name = match name.rfind("::") {
        Some(pos) if pos > 0 => &name[..pos],
        _ => return Err(malformed()),
    };

    let not_found = || ModuleError::AnnotationNotFound(full_name.to_string());
    let module = txn
        .name_to_tag(&add_mdl_db_prefix(module_name))
        .and_then(|tag| txn.module(tag))
        .ok_or_else(not_found)?;
    let definition = module
        .compiled
        .find_annotation(name, signature)
        .ok_or_else(not_found)?;

    let mut builder = AstBuilder::new(txn);
    let mut args = Vec::with_capacity(anno.arguments.len());
    for (arg_name, expr) in anno.arguments.iter() {
        let bad_argument = || ModuleError::AnnotationArgument {
            annotation: full_name.to_string(),
            argument: arg_name.to_string(),
        };
        let Expression::Constant { value, .. } = expr.as_ref() else {
            return Err(bad_argument());
        };

        // Older callers pass the single string of a one-parameter annotation as "argument".
        let mut param_name = arg_name;
        if arg_name == "argument"
            && anno.arguments.len() == 1
            && definition.parameters.len() == 1
            && matches!(value, matl_ir::Value::String(_))
        {
            param_name = definition.parameters[0].0.as_str();
        }

        let param_ty = definition
            .parameter_type(param_name)
            .ok_or_else(bad_argument)?;
        let converted = value.convert_to(param_ty).ok_or_else(bad_argument)?;
        args.push(Argument::named(
            param_name,
            builder.transform_value(&converted)?,
        ));
    }

    Ok(matl_ast::Annotation {
        name: QualifiedName::parse(name),
        args,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use matl_db::{Database, Element};
    use matl_ir::{
        AnnotationDefinition, CompiledModule, ExpressionList, MdlVersion, Module, Type, Value,
    };

    use super::*;

    fn anno_module(db: &mut Database) {
        let compiled = CompiledModule {
            name: "::anno".to_string(),
            stdlib: true,
            valid: true,
            annotation_definitions: vec![
                AnnotationDefinition {
                    name: "::anno::description".to_string(),
                    parameters: vec![("description".to_string(), Type::string())],
                },
                AnnotationDefinition {
                    name: "::anno::soft_range".to_string(),
                    parameters: vec![
                        ("min".to_string(), Type::float()),
                        ("max".to_string(), Type::float()),
                    ],
                },
            ],
            ..CompiledModule::default()
        };
        db.store_new(
            Element::Module(Arc::new(Module {
                name: "::anno".to_string(),
                filename: None,
                api_filename: None,
                version: MdlVersion::V1_0,
                stdlib: true,
                imports: vec![],
                types: vec![],
                constants: vec![],
                annotations: None,
                annotation_definitions: compiled.annotation_definitions.clone(),
                functions: vec![],
                materials: vec![],
                resources: vec![],
                compiled: Arc::new(compiled),
            })),
            "mdl::anno",
        );
    }

    fn string(s: &str) -> matl_ir::ExprRef {
        Expression::constant(Type::string(), Value::String(s.to_string()))
    }

    #[test]
    fn converts_and_widens_arguments() {
        let mut db = Database::new();
        anno_module(&mut db);
        let anno = Annotation {
            name: "::anno::soft_range(float,float)".to_string(),
            arguments: ExpressionList::new()
                .with("min", Expression::constant(Type::int(), Value::Int(0)))
                .with("max", Expression::constant(Type::float(), Value::Float(2.5))),
        };
        let converted = add_annotation(&db, &anno).unwrap();
        assert_eq!(converted.name.to_string(), "::anno::soft_range");
        assert_eq!(converted.args[0].name.as_deref(), Some("min"));
        assert_eq!(
            converted.args[0].value,
            matl_ast::Expr::Literal(matl_ast::Literal::Float(0.0))
        );
    }

    #[test]
    fn legacy_argument_name_is_renamed() {
        let mut db = Database::new();
        anno_module(&mut db);
        let anno = Annotation {
            name: "::anno::description(string)".to_string(),
            arguments: ExpressionList::new().with("argument", string("shiny")),
        };
        let converted = add_annotation(&db, &anno).unwrap();
        assert_eq!(converted.args[0].name.as_deref(), Some("description"));

        let mut importer = SymbolImporter::new();
        let block = create_annotations(&db, Some(&vec![anno]), &mut importer)
            .unwrap()
            .unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(importer.names().count(), 1);
    }

    #[test]
    fn rejects_bad_names_and_arguments() {
        let mut db = Database::new();
        anno_module(&mut db);
        let cases = [
            ("anno::description(string)", -10),
            ("::anno::description", -10),
            ("::description(string)", -10),
            ("::anno::hidden(bool)", -10),
            ("::missing::x(int)", -10),
        ];
        for (name, code) in cases {
            let anno = Annotation {
                name: name.to_string(),
                arguments: ExpressionList::new(),
            };
            assert_eq!(add_annotation(&db, &anno).unwrap_err().code(), code, "{name}");
        }

        let wrong_type = Annotation {
            name: "::anno::description(string)".to_string(),
            arguments: ExpressionList::new()
                .with("description", Expression::constant(Type::int(), Value::Int(3))),
        };
        assert_eq!(add_annotation(&db, &wrong_type).unwrap_err().code(), -9);

        let unknown = Annotation {
            name: "::anno::description(string)".to_string(),
            arguments: ExpressionList::new().with("text", string("x")),
        };
        assert!(matches!(
            add_annotation(&db, &unknown),
            Err(ModuleError::AnnotationArgument { .. })
        ));
    }

    #[test]
    fn empty_blocks_are_dropped() {
        let db = Database::new();
        let mut importer = SymbolImporter::new();
        assert!(create_annotations(&db, None, &mut importer).unwrap().is_none());
        assert!(create_annotations(&db, Some(&vec![]), &mut importer).unwrap().is_none());
    }
}
