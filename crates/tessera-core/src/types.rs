//! Structural symbol keys.
//!
//! The host type-checker resolves every name before the tree reaches us, so
//! symbols are identified structurally: a type by its (possibly templated)
//! name, a function by owner + name + parameter types, a field by its
//! in/out name + type name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reference to a source-language type, e.g. `Real4` or `FixedArray[Real, 4]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TemplateArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateArg {
    Type(TypeRef),
    Value(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeRefError {
    #[error("empty type name")]
    Empty,
    #[error("unbalanced `[` in `{0}`")]
    Unbalanced(String),
    #[error("unexpected trailing text in `{0}`")]
    Trailing(String),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn template(name: impl Into<String>, args: Vec<TemplateArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn void() -> Self {
        Self::named("Void")
    }

    pub fn is_void(&self) -> bool {
        self.name == "Void" && self.args.is_empty()
    }

    pub fn is_template(&self) -> bool {
        !self.args.is_empty()
    }

    /// First type argument of a template instance.
    pub fn type_arg(&self, index: usize) -> Option<&TypeRef> {
        match self.args.get(index)? {
            TemplateArg::Type(ty) => Some(ty),
            TemplateArg::Value(_) => None,
        }
    }

    pub fn value_arg(&self, index: usize) -> Option<i64> {
        match self.args.get(index)? {
            TemplateArg::Value(v) => Some(*v),
            TemplateArg::Type(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match arg {
                TemplateArg::Type(ty) => write!(f, "{ty}")?,
                TemplateArg::Value(v) => write!(f, "{v}")?,
            }
        }
        f.write_str("]")
    }
}

impl FromStr for TypeRef {
    type Err = TypeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, rest) = parse_type_ref(s.trim(), s)?;
        if !rest.trim().is_empty() {
            return Err(TypeRefError::Trailing(s.to_string()));
        }
        Ok(ty)
    }
}

fn parse_type_ref<'a>(input: &'a str, whole: &str) -> Result<(TypeRef, &'a str), TypeRefError> {
    let input = input.trim_start();
    let end = input
        .find(|c: char| c == '[' || c == ']' || c == ',')
        .unwrap_or(input.len());
    let name = input[..end].trim();
    if name.is_empty() {
        return Err(TypeRefError::Empty);
    }
    let mut rest = &input[end..];
    let mut args = Vec::new();
    if let Some(after) = rest.strip_prefix('[') {
        rest = after;
        loop {
            let trimmed = rest.trim_start();
            let arg_end = trimmed
                .find(|c: char| c == ',' || c == ']' || c == '[')
                .ok_or_else(|| TypeRefError::Unbalanced(whole.to_string()))?;
            let token = trimmed[..arg_end].trim();
            if let Ok(value) = token.parse::<i64>() {
                args.push(TemplateArg::Value(value));
                rest = &trimmed[arg_end..];
            } else {
                let (ty, after_ty) = parse_type_ref(trimmed, whole)?;
                args.push(TemplateArg::Type(ty));
                rest = after_ty;
            }
            let trimmed = rest.trim_start();
            if let Some(after) = trimmed.strip_prefix(',') {
                rest = after;
            } else if let Some(after) = trimmed.strip_prefix(']') {
                rest = after;
                break;
            } else {
                return Err(TypeRefError::Unbalanced(whole.to_string()));
            }
        }
    }
    Ok((TypeRef::template(name, args), rest))
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl From<&str> for TypeRef {
    /// Plain names only; use `parse` for template syntax.
    fn from(value: &str) -> Self {
        TypeRef::named(value)
    }
}

/// Identifies a function (or constructor, or property accessor) by signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionKey {
    pub owner: TypeRef,
    pub name: String,
    #[serde(default)]
    pub params: Vec<TypeRef>,
}

impl FunctionKey {
    pub fn new(owner: impl Into<TypeRef>, name: impl Into<String>, params: Vec<TypeRef>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params,
        }
    }

    pub fn getter(owner: &TypeRef, property: &str) -> Self {
        Self::new(owner.clone(), format!("get_{property}"), Vec::new())
    }

    pub fn setter(owner: &TypeRef, property: &str, ty: &TypeRef) -> Self {
        Self::new(owner.clone(), format!("set_{property}"), vec![ty.clone()])
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

/// A field identified by its linking name and type (e.g. `Color : Real4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    pub name: String,
    pub type_name: String,
}

impl FieldKey {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name, self.type_name)
    }
}
