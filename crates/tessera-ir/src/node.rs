//! Instructions, blocks and functions.

use rspirv::spirv::{Decoration as SpirvDecoration, Op as SpirvOp};
use tessera_core::FunctionKey;

use crate::{BlockId, ExtImportId, FunctionId, OpId, TypeId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Op(OpId),
    Type(TypeId),
    Function(FunctionId),
    Block(BlockId),
    ExtImport(ExtImportId),
    Literal(u32),
    String(String),
}

impl Operand {
    pub fn as_op(&self) -> Option<OpId> {
        match self {
            Self::Op(id) => Some(*id),
            _ => None,
        }
    }
}

/// One instruction. Constants and variables are ops too.
#[derive(Debug, Clone)]
pub struct Op {
    pub id: OpId,
    pub opcode: SpirvOp,
    pub result_type: Option<TypeId>,
    pub operands: Vec<Operand>,
    pub debug_name: Option<String>,
}

impl Op {
    pub fn is_terminator(&self) -> bool {
        is_terminator(self.opcode)
    }

    /// Whether emission assigns this op a result id.
    pub fn has_result(&self) -> bool {
        self.result_type.is_some() || self.opcode == SpirvOp::ExtInstImport
    }
}

pub fn is_terminator(opcode: SpirvOp) -> bool {
    matches!(
        opcode,
        SpirvOp::Return
            | SpirvOp::ReturnValue
            | SpirvOp::Branch
            | SpirvOp::BranchConditional
            | SpirvOp::Switch
            | SpirvOp::Kill
            | SpirvOp::Unreachable
    )
}

pub fn is_constant(opcode: SpirvOp) -> bool {
    matches!(
        opcode,
        SpirvOp::Constant
            | SpirvOp::ConstantTrue
            | SpirvOp::ConstantFalse
            | SpirvOp::ConstantComposite
            | SpirvOp::ConstantNull
            | SpirvOp::SpecConstant
            | SpirvOp::SpecConstantTrue
            | SpirvOp::SpecConstantFalse
            | SpirvOp::SpecConstantComposite
            | SpirvOp::SpecConstantOp
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    Direct,
    Selection,
    Loop,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// `OpVariable`s; only meaningful in a function's first block.
    pub locals: Vec<OpId>,
    pub lines: Vec<OpId>,
    pub merge: Option<BlockId>,
    pub continue_target: Option<BlockId>,
    pub debug_name: Option<String>,
}

impl Block {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            kind: BlockKind::Direct,
            locals: Vec::new(),
            lines: Vec::new(),
            merge: None,
            continue_target: None,
            debug_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// The `OpTypeFunction`.
    pub ty: TypeId,
    pub return_type: TypeId,
    /// `OpFunctionParameter`s.
    pub params: Vec<OpId>,
    pub blocks: Vec<BlockId>,
    pub key: Option<FunctionKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtImport {
    pub id: ExtImportId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationTarget {
    Type(TypeId),
    Op(OpId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub target: DecorationTarget,
    /// Member index for `OpMemberDecorate`.
    pub member: Option<u32>,
    pub decoration: SpirvDecoration,
    pub operands: Vec<u32>,
}
