#![forbid(unsafe_code)]

use bitflags::bitflags;

bitflags! {
    /// Type qualifiers. A type with neither bit set is "auto": uniform or varying depending on
    /// where it is used.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const UNIFORM = 1 << 0;
        const VARYING = 1 << 1;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Int,
    Float,
    Double,
}

impl Scalar {
    pub fn name(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::Int => "int",
            Scalar::Float => "float",
            Scalar::Double => "double",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureShape {
    TwoD,
    ThreeD,
    Cube,
    Ptex,
}

impl TextureShape {
    pub fn type_name(self) -> &'static str {
        match self {
            TextureShape::TwoD => "texture_2d",
            TextureShape::ThreeD => "texture_3d",
            TextureShape::Cube => "texture_cube",
            TextureShape::Ptex => "texture_ptex",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    Int,
    Float,
    Double,
    String,
    Color,
    Vector { elem: Scalar, size: u8 },
    /// User enum, by absolute name (`::pkg::mode`).
    Enum(String),
    /// User struct, by absolute name (`::pkg::layer`).
    Struct(String),
    /// `size == None` is a size-deferred array.
    Array { elem: Box<Type>, size: Option<usize> },
    Texture(TextureShape),
    LightProfile,
    BsdfMeasurement,
    Bsdf,
    Edf,
    Vdf,
    Material,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub kind: TypeKind,
    pub modifiers: Modifiers,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn bool() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub fn int() -> Self {
        Self::new(TypeKind::Int)
    }

    pub fn float() -> Self {
        Self::new(TypeKind::Float)
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub fn color() -> Self {
        Self::new(TypeKind::Color)
    }

    pub fn material() -> Self {
        Self::new(TypeKind::Material)
    }

    pub fn texture_2d() -> Self {
        Self::new(TypeKind::Texture(TextureShape::TwoD))
    }

    pub fn uniform(mut self) -> Self {
        self.modifiers.remove(Modifiers::VARYING);
        self.modifiers.insert(Modifiers::UNIFORM);
        self
    }

    pub fn varying(mut self) -> Self {
        self.modifiers.remove(Modifiers::UNIFORM);
        self.modifiers.insert(Modifiers::VARYING);
        self
    }

    pub fn is_uniform(&self) -> bool {
        self.modifiers.contains(Modifiers::UNIFORM)
    }

    pub fn is_varying(&self) -> bool {
        self.modifiers.contains(Modifiers::VARYING)
    }

    pub fn skip_modifiers(&self) -> Type {
        Type::new(self.kind.clone())
    }

    /// Textures, light profiles and measured BSDFs.
    pub fn is_resource(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Texture(_) | TypeKind::LightProfile | TypeKind::BsdfMeasurement
        )
    }

    /// MDL spelling of the type without qualifiers, as used in signatures.
    pub fn mdl_name(&self) -> String {
        match &self.kind {
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Int => "int".to_string(),
            TypeKind::Float => "float".to_string(),
            TypeKind::Double => "double".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Color => "color".to_string(),
            TypeKind::Vector { elem, size } => format!("{}{}", elem.name(), size),
            TypeKind::Enum(name) | TypeKind::Struct(name) => name.clone(),
            TypeKind::Array { elem, size } => match size {
                Some(n) => format!("{}[{}]", elem.mdl_name(), n),
                None => format!("{}[]", elem.mdl_name()),
            },
            TypeKind::Texture(shape) => shape.type_name().to_string(),
            TypeKind::LightProfile => "light_profile".to_string(),
            TypeKind::BsdfMeasurement => "bsdf_measurement".to_string(),
            TypeKind::Bsdf => "bsdf".to_string(),
            TypeKind::Edf => "edf".to_string(),
            TypeKind::Vdf => "vdf".to_string(),
            TypeKind::Material => "material".to_string(),
        }
    }

    /// Whether a value of this type may be passed to a parameter of type `expected`.
    ///
    /// Qualifiers are ignored except that a varying value never satisfies a uniform parameter.
    /// A size-deferred parameter array accepts arrays of any length with a matching element type.
    pub fn matches_parameter(&self, expected: &Type) -> bool {
        if expected.is_uniform() && self.is_varying() {
            return false;
        }
        match (&self.kind, &expected.kind) {
            (
                TypeKind::Array { elem: a, size: sa },
                TypeKind::Array { elem: e, size: se },
            ) => {
                if a.skip_modifiers() != e.skip_modifiers() {
                    return false;
                }
                se.is_none() || sa == se
            }
            (a, e) => a == e,
        }
    }
}
