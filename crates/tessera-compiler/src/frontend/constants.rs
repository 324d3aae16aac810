//! Literals, constant folding of initializers, specialization constants.

use tessera_core::{Expr, ExprKind, Literal, UnaryOp};
use tessera_ir::spirv::Op as SpirvOp;
use tessera_ir::{OpId, Operand, SpecConstantKey, TypeId, TypeKind};

use super::{IrResult, Translator, Value};

impl Translator<'_> {
    pub(super) fn literal(&mut self, literal: Literal) -> IrResult<Value> {
        let ty = match literal {
            Literal::Bool(_) => self.core.boolean,
            Literal::Int(_) => self.core.integer,
            Literal::Real(_) => self.core.real,
        };
        let op = self.lib.constant(ty, vec![literal_word(literal)])?;
        Ok(Value::new(op, ty))
    }

    /// `1` of a scalar or vector type, for increments.
    pub(super) fn one(&mut self, ty: TypeId) -> IrResult<OpId> {
        let t = self.lib.ty(ty);
        let scalar = t.component_type.filter(|_| t.kind == TypeKind::Vector);
        match scalar {
            Some(component) => {
                let one = self.one(component)?;
                let count = self.lib.ty(ty).component_count as usize;
                self.lib.composite_constant(ty, vec![one; count])
            }
            None => {
                let word = if self.lib.ty(ty).kind == TypeKind::Float {
                    1.0f32.to_bits()
                } else {
                    1
                };
                self.lib.constant(ty, vec![word])
            }
        }
    }

    /// Scalar words of a constant initializer: literals, negated literals
    /// and constructors over those. A single scalar splats to `count`.
    pub(super) fn constant_words(&self, expr: &Expr, count: usize) -> Option<Vec<u32>> {
        let words = self.fold(expr)?;
        match words.len() {
            1 if count > 1 => Some(vec![words[0]; count]),
            n if n == count => Some(words),
            _ => None,
        }
    }

    fn fold(&self, expr: &Expr) -> Option<Vec<u32>> {
        match &expr.kind {
            ExprKind::Literal { value } => Some(vec![literal_word(*value)]),
            ExprKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => match operand.kind {
                ExprKind::Literal {
                    value: Literal::Int(i),
                } => Some(vec![i.wrapping_neg() as u32]),
                ExprKind::Literal {
                    value: Literal::Real(r),
                } => Some(vec![(-r).to_bits()]),
                _ => None,
            },
            ExprKind::Construct { args } => {
                let mut out = Vec::new();
                for arg in args {
                    out.extend(self.fold(arg)?);
                }
                Some(out)
            }
            _ => None,
        }
    }

    /// Declares a specialization constant named `symbol`. Vectors get one
    /// scalar constant per component, keyed as children of the root.
    pub(super) fn declare_spec_constant(
        &mut self,
        symbol: &str,
        ty: TypeId,
        initializer: Option<&Expr>,
    ) -> IrResult<OpId> {
        let key = SpecConstantKey::new(symbol);
        let is_vector = self.lib.ty(ty).kind == TypeKind::Vector;
        let count = if is_vector { self.lib.ty(ty).component_count as usize } else { 1 };
        let defaults = initializer
            .and_then(|init| self.constant_words(init, count))
            .unwrap_or_else(|| vec![0; count]);

        if !is_vector {
            let op = self.spec_scalar(ty, defaults[0])?;
            self.lib.set_debug_name(op, symbol)?;
            self.lib.add_spec_constant(key, op)?;
            return Ok(op);
        }

        let component = self.lib.ty(ty).component_type.unwrap_or(self.core.real);
        let mut components = Vec::with_capacity(count);
        for (i, word) in defaults.iter().enumerate() {
            let op = self.spec_scalar(component, *word)?;
            self.lib.set_debug_name(op, format!("{symbol}_{i}"))?;
            self.lib.add_spec_constant(key.child(i as u32), op)?;
            components.push(Operand::Op(op));
        }
        let op = self.lib.add_op(SpirvOp::SpecConstantComposite, Some(ty), components)?;
        self.lib.set_debug_name(op, symbol)?;
        self.lib.add_spec_constant(key, op)?;
        Ok(op)
    }

    fn spec_scalar(&mut self, ty: TypeId, word: u32) -> IrResult<OpId> {
        if self.lib.ty(ty).kind == TypeKind::Bool {
            let opcode = if word != 0 {
                SpirvOp::SpecConstantTrue
            } else {
                SpirvOp::SpecConstantFalse
            };
            return self.lib.add_op(opcode, Some(ty), Vec::new());
        }
        self.lib.add_op(SpirvOp::SpecConstant, Some(ty), vec![Operand::Literal(word)])
    }
}

fn literal_word(literal: Literal) -> u32 {
    match literal {
        Literal::Bool(b) => u32::from(b),
        Literal::Int(i) => i as u32,
        Literal::Real(r) => r.to_bits(),
    }
}
