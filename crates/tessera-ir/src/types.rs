//! IR types.

use std::collections::HashMap;

use rspirv::spirv::{Op as SpirvOp, StorageClass};
use tessera_core::FieldKey;

use crate::{Operand, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    Float,
    Int,
    Uint,
    Vector,
    Matrix,
    Struct,
    Image,
    Sampler,
    SampledImage,
    FixedArray,
    RuntimeArray,
    Void,
    Function,
    Pointer,
    Unknown,
}

impl TypeKind {
    /// Declaring opcode. `Unknown` has none.
    pub fn opcode(self) -> Option<SpirvOp> {
        Some(match self {
            Self::Bool => SpirvOp::TypeBool,
            Self::Float => SpirvOp::TypeFloat,
            Self::Int | Self::Uint => SpirvOp::TypeInt,
            Self::Vector => SpirvOp::TypeVector,
            Self::Matrix => SpirvOp::TypeMatrix,
            Self::Struct => SpirvOp::TypeStruct,
            Self::Image => SpirvOp::TypeImage,
            Self::Sampler => SpirvOp::TypeSampler,
            Self::SampledImage => SpirvOp::TypeSampledImage,
            Self::FixedArray => SpirvOp::TypeArray,
            Self::RuntimeArray => SpirvOp::TypeRuntimeArray,
            Self::Void => SpirvOp::TypeVoid,
            Self::Function => SpirvOp::TypeFunction,
            Self::Pointer => SpirvOp::TypePointer,
            Self::Unknown => return None,
        })
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, Self::Bool | Self::Float | Self::Int | Self::Uint)
    }

    /// Kinds that cannot live inside a struct or be copied by value.
    pub fn is_opaque(self) -> bool {
        matches!(self, Self::Image | Self::Sampler | Self::SampledImage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct Type {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    /// Declaration operands following the result id, in wire order.
    pub parameters: Vec<Operand>,
    /// Scalar of a vector, column of a matrix, element of an array.
    pub component_type: Option<TypeId>,
    pub component_count: u32,
    pub members: Vec<Member>,
    member_by_name: HashMap<String, usize>,
    member_by_key: HashMap<FieldKey, usize>,
    pub storage_class: Option<StorageClass>,
    /// Function-storage pointer to this value type.
    pub pointer_type: Option<TypeId>,
    /// Pointee, for pointer types.
    pub value_type: Option<TypeId>,
    pub has_main: bool,
    pub non_copyable: bool,
}

impl Type {
    pub fn new(id: TypeId, name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            parameters: Vec::new(),
            component_type: None,
            component_count: 0,
            members: Vec::new(),
            member_by_name: HashMap::new(),
            member_by_key: HashMap::new(),
            storage_class: None,
            pointer_type: None,
            value_type: None,
            has_main: false,
            non_copyable: kind.is_opaque(),
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.kind == TypeKind::Pointer
    }

    pub fn is_scalar(&self) -> bool {
        self.kind.is_scalar()
    }

    /// Appends a struct member; its operand is added to `parameters`.
    pub fn add_member(
        &mut self,
        name: impl Into<String>,
        ty: TypeId,
        key: Option<FieldKey>,
    ) -> usize {
        let name = name.into();
        let index = self.members.len();
        self.member_by_name.insert(name.clone(), index);
        if let Some(key) = key {
            self.member_by_key.insert(key, index);
        }
        self.members.push(Member { name, ty });
        self.parameters.push(Operand::Type(ty));
        index
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.member_by_name.get(name).copied()
    }

    pub fn member_index_by_key(&self, key: &FieldKey) -> Option<usize> {
        self.member_by_key.get(key).copied()
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.member_index(name).map(|i| &self.members[i])
    }
}
