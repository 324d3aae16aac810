//! Reflection metadata recorded while translating a class.

use serde::{Deserialize, Serialize};
use tessera_core::{Attribute, AttributeList, Expr, FieldKey, FunctionKey, Span, TypeRef};

use crate::ShaderStages;

/// Which pipeline stage a class was declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum FragmentType {
    #[default]
    None,
    Vertex,
    Geometry,
    Pixel,
    Compute,
}

impl FragmentType {
    pub const STAGES: [FragmentType; 4] = [
        FragmentType::Vertex,
        FragmentType::Geometry,
        FragmentType::Pixel,
        FragmentType::Compute,
    ];

    pub fn stage(self) -> ShaderStages {
        match self {
            Self::None => ShaderStages::empty(),
            Self::Vertex => ShaderStages::VERTEX,
            Self::Geometry => ShaderStages::GEOMETRY,
            Self::Pixel => ShaderStages::PIXEL,
            Self::Compute => ShaderStages::COMPUTE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Vertex => "Vertex",
            Self::Geometry => "Geometry",
            Self::Pixel => "Pixel",
            Self::Compute => "Compute",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub owner: String,
    pub name: String,
    pub ty: TypeRef,
    pub attributes: Vec<Attribute>,
    pub is_static: bool,
    /// Default value, kept so composites can forward it.
    pub initializer: Option<Expr>,
    pub span: Span,
}

impl FieldMeta {
    /// Linking key for the field under the given in/out attribute: the
    /// attribute's `name` parameter when present, otherwise the field name.
    pub fn key_for(&self, attribute: &str) -> FieldKey {
        let name = self
            .attributes
            .find_attribute(attribute)
            .and_then(|a| a.string_param("name"))
            .unwrap_or(&self.name);
        FieldKey::new(name, self.ty.to_string())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.has_attribute(name)
    }

    pub fn attributes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attribute> {
        self.attributes.iter().filter(move |a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMeta {
    pub key: FunctionKey,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeMeta {
    pub name: String,
    pub fragment_type: FragmentType,
    pub attributes: Vec<Attribute>,
    pub fields: Vec<FieldMeta>,
    pub functions: Vec<FunctionMeta>,
    pub span: Span,
}

impl TypeMeta {
    pub fn find_field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.has_attribute(name)
    }
}
