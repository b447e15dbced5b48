#![forbid(unsafe_code)]

use crate::{Scalar, Tag, TextureShape, Type, TypeKind};

/// Constant values. Compound values carry the type names they need so nested values can be
/// turned back into source without a separate type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    Color([f32; 3]),
    /// Two to four scalar components of one kind.
    Vector(Vec<Value>),
    /// Enum value of the enum `type_name` by its simple name plus numeric value.
    Enum {
        type_name: String,
        name: String,
        value: i32,
    },
    Struct {
        type_name: String,
        fields: Vec<(String, Value)>,
    },
    Array {
        elem: Type,
        items: Vec<Value>,
    },
    /// `resource == None` is the invalid (unset) texture.
    Texture {
        shape: TextureShape,
        resource: Option<Tag>,
        gamma: f32,
    },
    LightProfile(Option<Tag>),
    BsdfMeasurement(Option<Tag>),
    /// The default-constructed (invalid) distribution function of the given kind.
    InvalidDf(TypeKind),
}

impl Value {
    /// The unqualified type of the value.
    pub fn ty(&self) -> Type {
        let kind = match self {
            Value::Bool(_) => TypeKind::Bool,
            Value::Int(_) => TypeKind::Int,
            Value::Float(_) => TypeKind::Float,
            Value::Double(_) => TypeKind::Double,
            Value::String(_) => TypeKind::String,
            Value::Color(_) => TypeKind::Color,
            Value::Vector(items) => {
                let elem = match items.first() {
                    Some(Value::Bool(_)) => Scalar::Bool,
                    Some(Value::Int(_)) => Scalar::Int,
                    Some(Value::Double(_)) => Scalar::Double,
                    _ => Scalar::Float,
                };
                // Out-of-range lengths saturate and so never match a declared vector type.
                TypeKind::Vector {
                    elem,
                    size: u8::try_from(items.len()).unwrap_or(u8::MAX),
                }
            }
            Value::Enum { type_name, .. } => TypeKind::Enum(type_name.clone()),
            Value::Struct { type_name, .. } => TypeKind::Struct(type_name.clone()),
            Value::Array { elem, items } => TypeKind::Array {
                elem: Box::new(elem.clone()),
                size: Some(items.len()),
            },
            Value::Texture { shape, .. } => TypeKind::Texture(*shape),
            Value::LightProfile(_) => TypeKind::LightProfile,
            Value::BsdfMeasurement(_) => TypeKind::BsdfMeasurement,
            Value::InvalidDf(kind) => kind.clone(),
        };
        Type::new(kind)
    }

    /// Converts `self` into a value of type `target`. Ints widen to float and double, floats
    /// widen to double; everything else must already have the target's type.
    pub fn convert_to(&self, target: &Type) -> Option<Value> {
        match (&target.kind, self) {
            (TypeKind::Float, Value::Int(i)) => Some(Value::Float(*i as f32)),
            (TypeKind::Double, Value::Int(i)) => Some(Value::Double(f64::from(*i))),
            (TypeKind::Double, Value::Float(f)) => Some(Value::Double(f64::from(*f))),
            _ if self.ty().matches_parameter(&target.skip_modifiers()) => Some(self.clone()),
            _ => None,
        }
    }

    /// The registry identity a resource value points at, if any.
    pub fn resource_tag(&self) -> Option<Tag> {
        match self {
            Value::Texture { resource, .. } => *resource,
            Value::LightProfile(r) | Value::BsdfMeasurement(r) => *r,
            _ => None,
        }
    }
}
