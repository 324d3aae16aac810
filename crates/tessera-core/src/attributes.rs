//! Attributes attached to classes, fields, properties and functions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Span;

/// `[Name(param : value, ...)]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub params: Vec<AttributeParam>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeParam {
    #[serde(default)]
    pub name: Option<String>,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Boolean",
            Self::Int(_) => "Integer",
            Self::Real(_) => "Real",
            Self::String(_) => "String",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v:?}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.params.push(AttributeParam {
            name: Some(name.into()),
            value,
        });
        self
    }

    pub fn with_positional(mut self, value: AttributeValue) -> Self {
        self.params.push(AttributeParam { name: None, value });
        self
    }

    /// Looks a parameter up by name, falling back to position for unnamed params.
    pub fn param(&self, name: &str, position: usize) -> Option<&AttributeValue> {
        if let Some(p) = self.params.iter().find(|p| p.name.as_deref() == Some(name)) {
            return Some(&p.value);
        }
        match self.params.get(position) {
            Some(p) if p.name.is_none() => Some(&p.value),
            _ => None,
        }
    }

    pub fn string_param(&self, name: &str) -> Option<&str> {
        self.param(name, 0).and_then(AttributeValue::as_str)
    }

    pub fn int_param(&self, name: &str, position: usize) -> Option<i64> {
        self.param(name, position).and_then(AttributeValue::as_int)
    }
}

/// Lookup helpers over an attribute list.
pub trait AttributeList {
    fn find_attribute(&self, name: &str) -> Option<&Attribute>;

    fn has_attribute(&self, name: &str) -> bool {
        self.find_attribute(name).is_some()
    }
}

impl AttributeList for [Attribute] {
    fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.iter().find(|a| a.name == name)
    }
}

impl AttributeList for Vec<Attribute> {
    fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.as_slice().find_attribute(name)
    }
}
