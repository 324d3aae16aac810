//! Hardware stage sets and per-symbol stage requirements.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tessera_core::{FunctionKey, Span, TypeRef};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const GEOMETRY = 1 << 1;
        const PIXEL = 1 << 2;
        const COMPUTE = 1 << 3;
    }
}

impl ShaderStages {
    /// Attribute-style name of the first stage in the set.
    pub fn first_name(self) -> &'static str {
        if self.contains(Self::VERTEX) {
            "Vertex"
        } else if self.contains(Self::GEOMETRY) {
            "Geometry"
        } else if self.contains(Self::PIXEL) {
            "Pixel"
        } else if self.contains(Self::COMPUTE) {
            "Compute"
        } else {
            "None"
        }
    }
}

/// A symbol that can carry a stage requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageSymbol {
    /// Functions, constructors and property accessors.
    Function(FunctionKey),
    Field { owner: TypeRef, name: String },
    PreConstructor(TypeRef),
}

impl StageSymbol {
    pub fn owner(&self) -> &TypeRef {
        match self {
            Self::Function(key) => &key.owner,
            Self::Field { owner, .. } | Self::PreConstructor(owner) => owner,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Function(key) => &key.name,
            Self::Field { name, .. } => name,
            Self::PreConstructor(_) => "PreConstructor",
        }
    }
}

impl fmt::Display for StageSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner(), self.name())
    }
}

/// Stages a symbol requires, and what first imposed the requirement.
///
/// Requirements only accumulate: merging never removes a stage, and the
/// recorded cause is the first dependency that contributed a non-empty set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageRequirementsData {
    pub required: ShaderStages,
    pub dependency: Option<StageSymbol>,
    pub call_span: Span,
}

impl StageRequirementsData {
    pub fn with_stages(required: ShaderStages) -> Self {
        Self {
            required,
            ..Self::default()
        }
    }

    pub fn combine(&mut self, dependency: &StageSymbol, span: Span, stages: ShaderStages) {
        if self.dependency.is_none() && !stages.is_empty() {
            self.dependency = Some(dependency.clone());
            self.call_span = span;
        }
        self.required |= stages;
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}
