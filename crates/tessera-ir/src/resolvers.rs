//! Table-driven translation strategies.
//!
//! Each library registers how source-language symbols of its types lower to
//! IR. The translator looks a symbol up (local library first, then the
//! dependency module in order) and interprets the resolver it finds.

use std::collections::HashMap;

use rspirv::spirv::Op as SpirvOp;
use tessera_core::{BinaryOp, TypeRef, UnaryOp};

use crate::ExtImportId;

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionResolver {
    /// Emit the op over the value operands (receiver first for members).
    Op(SpirvOp),
    /// Same with the two operands swapped.
    OpSwapped(SpirvOp),
    /// `OpExtInst` into an extended instruction set.
    ExtInst { import: ExtImportId, instruction: u32 },
    /// Composite construction; a single scalar argument is splatted.
    Construct,
    /// Null constant of the result type.
    DefaultConstruct,
    /// Vector component access by swizzle name (`XY`, `W`, ...).
    Swizzle,
    /// Conversion op for casts.
    Convert(SpirvOp),
    /// The operand value unchanged.
    Identity,
    /// Combine image and sampler, then sample with the given op.
    SampleImage { op: SpirvOp, lod: bool },
    ImageQuery(SpirvOp),
    ArrayLength,
    /// Geometry output-stream append; bound per composite.
    Append,
    EmitVertex,
    RestartStrip,
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnaryOperatorKey {
    pub operand: TypeRef,
    pub op: UnaryOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOperatorKey {
    pub lhs: TypeRef,
    pub rhs: TypeRef,
    pub op: BinaryOp,
}

impl BinaryOperatorKey {
    pub fn new(lhs: TypeRef, rhs: TypeRef, op: BinaryOp) -> Self {
        Self { lhs, rhs, op }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeCastKey {
    pub from: TypeRef,
    pub to: TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    Triangles,
}

impl Primitive {
    /// Vertices per input primitive.
    pub fn size(self) -> u32 {
        match self {
            Self::Points => 1,
            Self::Lines => 2,
            Self::Triangles => 3,
        }
    }
}

/// How a template base name instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateResolver {
    FixedArray,
    RuntimeArray,
    InputStream(Primitive),
    OutputStream(Primitive),
}

/// Per-type member resolvers.
#[derive(Debug, Clone, Default)]
pub struct TypeResolvers {
    pub fields: HashMap<String, InstructionResolver>,
    pub field_backup: Option<InstructionResolver>,
    pub setters: HashMap<String, InstructionResolver>,
    pub setter_backup: Option<InstructionResolver>,
    pub constructors: HashMap<Vec<TypeRef>, InstructionResolver>,
    pub default_constructor: Option<InstructionResolver>,
}

impl TypeResolvers {
    pub fn field(&self, name: &str) -> Option<&InstructionResolver> {
        self.fields.get(name).or(self.field_backup.as_ref())
    }

    pub fn setter(&self, name: &str) -> Option<&InstructionResolver> {
        self.setters.get(name).or(self.setter_backup.as_ref())
    }
}

/// All resolver tables of one library.
#[derive(Debug, Clone, Default)]
pub struct ResolverTables {
    pub types: HashMap<TypeRef, TypeResolvers>,
    pub functions: HashMap<tessera_core::FunctionKey, InstructionResolver>,
    pub unary: HashMap<UnaryOperatorKey, InstructionResolver>,
    pub binary: HashMap<BinaryOperatorKey, InstructionResolver>,
    pub casts: HashMap<TypeCastKey, InstructionResolver>,
    pub templates: HashMap<String, TemplateResolver>,
}
