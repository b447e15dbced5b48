#![forbid(unsafe_code)]

use std::sync::Arc;

use matl_db::{Element, Transaction};
use matl_ir::{ElementKind, Resource, ResourceKind, Tag, TextureShape, Value};
use tracing::trace;

use crate::error::ResourceError;

/// Maps resource file paths to registry identities.
pub trait ResourceResolver {
    /// Returns the tag of a resource for `path`, creating the record if needed. Relative paths
    /// are resolved against `owner`, the origin file of the referring module.
    fn resolve(
        &self,
        txn: &mut dyn Transaction,
        kind: ResourceKind,
        path: &str,
        gamma: Option<f32>,
        shared: bool,
        owner: Option<&str>,
    ) -> Option<Tag>;
}

/// Stores one `Resource` record per distinct (kind, path, gamma) and hands out its tag.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryResources;

impl RegistryResources {
    fn record_name(kind: ResourceKind, path: &str, gamma: Option<f32>) -> String {
        let prefix = match kind {
            ResourceKind::Texture(shape) => shape.type_name(),
            ResourceKind::LightProfile => "light_profile",
            ResourceKind::BsdfMeasurement => "bsdf_measurement",
        };
        match gamma {
            Some(g) => format!("mdlr::{prefix}::{path}::{g}"),
            None => format!("mdlr::{prefix}::{path}"),
        }
    }
}

impl ResourceResolver for RegistryResources {
    fn resolve(
        &self,
        txn: &mut dyn Transaction,
        kind: ResourceKind,
        path: &str,
        gamma: Option<f32>,
        shared: bool,
        owner: Option<&str>,
    ) -> Option<Tag> {
        let file_path = if path.starts_with('/') {
            path.to_string()
        } else {
            let owner = owner?;
            let dir = owner.rfind('/').map_or("", |pos| &owner[..pos]);
            format!("{dir}/{path}")
        };

        let name = Self::record_name(kind, &file_path, gamma);
        if let Some(tag) = txn.name_to_tag(&name) {
            return (txn.kind_of(tag) == Some(ElementKind::Resource)).then_some(tag);
        }
        trace!(path = %file_path, "registering resource");
        Some(txn.store_new(
            Element::Resource(Arc::new(Resource {
                kind,
                file_path,
                gamma,
                shared,
            })),
            &name,
        ))
    }
}

fn resolve_absolute(
    txn: &mut dyn Transaction,
    resolver: &dyn ResourceResolver,
    kind: ResourceKind,
    path: &str,
    gamma: Option<f32>,
    shared: bool,
) -> Result<Tag, ResourceError> {
    if !path.starts_with('/') {
        return Err(ResourceError::RelativePath(path.to_string()));
    }
    resolver
        .resolve(txn, kind, path, gamma, shared, None)
        .ok_or_else(|| ResourceError::Unresolved(path.to_string()))
}

pub fn create_texture(
    txn: &mut dyn Transaction,
    resolver: &dyn ResourceResolver,
    path: &str,
    shape: TextureShape,
    gamma: f32,
    shared: bool,
) -> Result<Value, ResourceError> {
    let tag = resolve_absolute(
        txn,
        resolver,
        ResourceKind::Texture(shape),
        path,
        Some(gamma),
        shared,
    )?;
    Ok(Value::Texture {
        shape,
        resource: Some(tag),
        gamma,
    })
}

pub fn create_light_profile(
    txn: &mut dyn Transaction,
    resolver: &dyn ResourceResolver,
    path: &str,
    shared: bool,
) -> Result<Value, ResourceError> {
    let tag = resolve_absolute(txn, resolver, ResourceKind::LightProfile, path, None, shared)?;
    Ok(Value::LightProfile(Some(tag)))
}

pub fn create_bsdf_measurement(
    txn: &mut dyn Transaction,
    resolver: &dyn ResourceResolver,
    path: &str,
    shared: bool,
) -> Result<Value, ResourceError> {
    let tag = resolve_absolute(
        txn,
        resolver,
        ResourceKind::BsdfMeasurement,
        path,
        None,
        shared,
    )?;
    Ok(Value::BsdfMeasurement(Some(tag)))
}
