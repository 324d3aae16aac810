//! Human-readable rendering of IR functions.
//!
//! Op numbers are local to one dump, so output does not depend on
//! process-wide library ids.

use std::collections::HashMap;
use std::fmt::Write;

use rspirv::spirv::Op as SpirvOp;

use crate::{BlockKind, FunctionId, Library, OpId, Operand, TypeKind};

pub fn dump_function(library: &Library, id: FunctionId) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = FunctionDump::new(library, id).format(&mut out);
    out
}

struct FunctionDump<'a> {
    library: &'a Library,
    function: FunctionId,
    numbers: HashMap<OpId, usize>,
}

impl<'a> FunctionDump<'a> {
    fn new(library: &'a Library, function: FunctionId) -> Self {
        Self {
            library,
            function,
            numbers: HashMap::new(),
        }
    }

    fn format(&mut self, w: &mut impl Write) -> std::fmt::Result {
        let lib = self.library;
        let function = lib.function(self.function);

        write!(w, "function {}(", function.name)?;
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                write!(w, ", ")?;
            }
            let n = self.number(*param);
            let ty = lib.op(*param).result_type.map(|t| lib.ty(t).name.as_str()).unwrap_or("?");
            write!(w, "%{n}: {ty}")?;
        }
        writeln!(w, ") -> {}", lib.ty(function.return_type).name)?;

        for (index, block_id) in function.blocks.iter().enumerate() {
            let block = lib.block(*block_id);
            write!(w, "block{index}:")?;
            match block.kind {
                BlockKind::Direct => {}
                BlockKind::Selection => {
                    write!(w, " selection merge={}", self.block_name(block.merge))?
                }
                BlockKind::Loop => write!(
                    w,
                    " loop merge={} continue={}",
                    self.block_name(block.merge),
                    self.block_name(block.continue_target)
                )?,
            }
            writeln!(w)?;
            for op in block.locals.iter().chain(block.lines.iter()) {
                self.format_op(*op, w)?;
            }
        }
        Ok(())
    }

    fn format_op(&mut self, id: OpId, w: &mut impl Write) -> std::fmt::Result {
        let lib = self.library;
        let op = lib.op(id);
        write!(w, "  ")?;
        if let Some(ty) = op.result_type {
            let n = self.number(id);
            write!(w, "%{n} = {:?} {}", op.opcode, lib.ty(ty).name)?;
        } else {
            write!(w, "{:?}", op.opcode)?;
        }
        for (i, operand) in op.operands.iter().enumerate() {
            if op.opcode == SpirvOp::Variable && i == 0 {
                continue;
            }
            write!(w, " {}", self.operand_text(operand))?;
        }
        writeln!(w)
    }

    fn number(&mut self, id: OpId) -> usize {
        let next = self.numbers.len();
        *self.numbers.entry(id).or_insert(next)
    }

    fn block_name(&self, block: Option<crate::BlockId>) -> String {
        let function = self.library.function(self.function);
        match block.and_then(|b| function.blocks.iter().position(|x| *x == b)) {
            Some(index) => format!("block{index}"),
            None => "block?".to_string(),
        }
    }

    fn operand_text(&mut self, operand: &Operand) -> String {
        let lib = self.library;
        match operand {
            Operand::Op(id) => self.op_text(*id),
            Operand::Type(t) => lib.ty(*t).name.clone(),
            Operand::Function(f) => lib.function(*f).name.clone(),
            Operand::Block(b) => self.block_name(Some(*b)),
            Operand::ExtImport(x) => lib.ext_import(*x).name.clone(),
            Operand::Literal(v) => v.to_string(),
            Operand::String(s) => format!("{s:?}"),
        }
    }

    fn op_text(&mut self, id: OpId) -> String {
        let lib = self.library;
        let op = lib.op(id);
        let literal = op.operands.first().and_then(|o| match o {
            Operand::Literal(v) => Some(*v),
            _ => None,
        });
        match (op.opcode, literal) {
            (SpirvOp::ConstantTrue, _) => return "true".to_string(),
            (SpirvOp::ConstantFalse, _) => return "false".to_string(),
            (SpirvOp::ConstantNull, _) => return "null".to_string(),
            (SpirvOp::Constant, Some(bits)) => {
                if let Some(ty) = op.result_type {
                    let ty = lib.ty(ty);
                    return match ty.kind {
                        TypeKind::Float => format!("{}({:?})", ty.name, f32::from_bits(bits)),
                        TypeKind::Int => format!("{}({})", ty.name, bits as i32),
                        _ => format!("{}({bits})", ty.name),
                    };
                }
            }
            (SpirvOp::Variable, _) if lib.globals_contains(id) => {
                return format!("@{}", op.debug_name.as_deref().unwrap_or("global"));
            }
            _ => {}
        }
        format!("%{}", self.number(id))
    }
}

impl Library {
    pub(crate) fn globals_contains(&self, id: OpId) -> bool {
        self.library(id.library)
            .is_some_and(|lib| lib.globals().contains(&id))
    }
}
