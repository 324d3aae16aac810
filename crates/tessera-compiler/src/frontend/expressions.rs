//! Expression lowering: member access, operators, construction, lvalues.

use tessera_core::printer::expr_text;
use tessera_core::{BinaryOp, Expr, ExprKind, FunctionKey, MemberKind, TypeRef, UnaryOp};
use tessera_ir::spirv::{Op as SpirvOp, StorageClass};
use tessera_ir::{InstructionResolver, Operand, TypeId, TypeKind};

use super::{FunctionContext, IrResult, Translator, Value};
use crate::diagnostics::DiagnosticKind;

impl Translator<'_> {
    pub(super) fn translate_expr(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
    ) -> IrResult<Value> {
        match &expr.kind {
            ExprKind::Literal { value } => self.literal(*value),
            ExprKind::Local { name } => match f.lookup(name) {
                Some(value) => Ok(value),
                None => self.unresolved(f, expr, name),
            },
            ExprKind::This => match f.receiver {
                Some(value) => Ok(value),
                None => {
                    let ty = self.require_type(&expr.ty, expr.span)?;
                    let message = "`this` in a static context";
                    self.report(DiagnosticKind::Unsupported, expr.span, message);
                    self.dummy(f, ty)
                }
            },
            ExprKind::TypeName { target } => {
                let ty = self.require_type(target, expr.span)?;
                let message = format!("type `{target}` used as a value");
                self.report(DiagnosticKind::Unsupported, expr.span, message);
                self.dummy(f, ty)
            }
            ExprKind::Member { target, name, kind } => match kind {
                MemberKind::Property => self.read_property(f, expr, target, name),
                MemberKind::Field => self.translate_field(f, expr, target, name),
            },
            ExprKind::Call {
                target,
                function,
                args,
                is_static,
            } => {
                let target = target.as_deref().filter(|_| !is_static);
                self.translate_call(f, expr, target, function, args)
            }
            ExprKind::Construct { args } => self.translate_construct(f, expr, args),
            ExprKind::Binary { op, lhs, rhs } => self.translate_binary(f, expr, *op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.translate_unary(f, expr, *op, operand),
            ExprKind::Cast { operand } => self.translate_cast(f, expr, operand),
            ExprKind::Index { target, index } => self.translate_index(f, expr, target, index),
        }
    }

    /// Reports an unresolved symbol and continues with an undefined value.
    pub(super) fn unresolved(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        what: &str,
    ) -> IrResult<Value> {
        self.report(DiagnosticKind::UnresolvedSymbol, expr.span, what);
        let ty = self.resolve_type(&expr.ty)?.unwrap_or(self.core.void);
        self.dummy(f, ty)
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn translate_field(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        target: &Expr,
        name: &str,
    ) -> IrResult<Value> {
        if let ExprKind::TypeName { target: owner } = &target.kind {
            return self.static_field(f, expr, owner, name);
        }
        let base = self.translate_expr(f, target)?;
        let base_ty = self.lib.value_type(base.ty);

        if let Some(index) = self.lib.ty(base_ty).member_index(name) {
            let member_ty = self.lib.ty(base_ty).members[index].ty;
            return self.member_access(f, base, index as u32, member_ty);
        }
        if let Some(global) = self.lib.find_field_global(&target.ty, name) {
            return Ok(self.global_value(global));
        }
        match self.lib.find_field_resolver(&target.ty, name).cloned() {
            Some(InstructionResolver::Swizzle) => self.swizzle(f, expr, base, name),
            Some(resolver) => self.apply_resolver(f, expr, &resolver, vec![base]),
            None => self.unresolved(f, expr, &format!("{}.{name}", target.ty)),
        }
    }

    fn static_field(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        owner: &TypeRef,
        name: &str,
    ) -> IrResult<Value> {
        if let Some(op) = self.lib.find_enum_value(&owner.to_string(), name) {
            return Ok(Value::new(op, self.core.integer));
        }
        match self.lib.find_field_global(owner, name) {
            Some(global) => Ok(self.global_value(global)),
            None => self.unresolved(f, expr, &format!("{owner}.{name}")),
        }
    }

    /// A global variable is a pointer value; a specialization constant is
    /// an immediate.
    pub(super) fn global_value(&self, global: tessera_ir::OpId) -> Value {
        Value::new(global, self.lib.op(global).result_type.unwrap_or(self.core.void))
    }

    fn swizzle(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        base: Value,
        name: &str,
    ) -> IrResult<Value> {
        let vector = self.lib.value_type(base.ty);
        let count = self.lib.ty(vector).component_count;
        let indices = match swizzle_indices(name) {
            Some(indices) if indices.iter().all(|i| *i < count) => indices,
            _ => {
                let vector_name = self.lib.ty(vector).name.clone();
                return self.unresolved(f, expr, &format!("{vector_name}.{name}"));
            }
        };
        let component = self.lib.ty(vector).component_type.unwrap_or(self.core.real);
        if let [index] = indices[..] {
            return self.member_access(f, base, index, component);
        }
        let result = self.require_type(&expr.ty, expr.span)?;
        let value = self.to_value(f, base)?;
        let mut operands = vec![Operand::Op(value.op), Operand::Op(value.op)];
        operands.extend(indices.iter().map(|i| Operand::Literal(*i)));
        let op = self.emit(f, SpirvOp::VectorShuffle, Some(result), operands)?;
        Ok(Value::new(op, result))
    }

    /// Property owner and receiver pointer; static properties have none.
    fn property_receiver(
        &mut self,
        f: &mut FunctionContext,
        target: &Expr,
    ) -> IrResult<(TypeRef, Option<Value>)> {
        if let ExprKind::TypeName { target: owner } = &target.kind {
            return Ok((owner.clone(), None));
        }
        let value = self.translate_expr(f, target)?;
        Ok((target.ty.clone(), Some(value)))
    }

    fn read_property(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        target: &Expr,
        name: &str,
    ) -> IrResult<Value> {
        let (owner, receiver) = self.property_receiver(f, target)?;
        let key = FunctionKey::getter(&owner, name);
        match self.lib.find_function(&key) {
            Some(getter) => self.call_user(f, getter, receiver, Vec::new()),
            None => self.unresolved(f, expr, &key.to_string()),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn translate_binary(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> IrResult<Value> {
        if op == BinaryOp::Assign {
            let value = self.translate_expr(f, rhs)?;
            let value = self.to_value(f, value)?;
            self.assign(f, lhs, value)?;
            return Ok(value);
        }
        if let Some(base) = op.compound_base() {
            let current = self.translate_expr(f, lhs)?;
            let operand = self.translate_expr(f, rhs)?;
            let value = self.binary_op(f, expr, base, &lhs.ty, &rhs.ty, current, operand)?;
            self.assign(f, lhs, value)?;
            return Ok(value);
        }
        let l = self.translate_expr(f, lhs)?;
        let r = self.translate_expr(f, rhs)?;
        self.binary_op(f, expr, op, &lhs.ty, &rhs.ty, l, r)
    }

    #[allow(clippy::too_many_arguments)]
    fn binary_op(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        op: BinaryOp,
        lhs_ty: &TypeRef,
        rhs_ty: &TypeRef,
        lhs: Value,
        rhs: Value,
    ) -> IrResult<Value> {
        match self.lib.find_binary_resolver(lhs_ty, rhs_ty, op).cloned() {
            Some(resolver) => self.apply_resolver(f, expr, &resolver, vec![lhs, rhs]),
            None => self.unresolved(f, expr, &format!("{lhs_ty} {} {rhs_ty}", op.symbol())),
        }
    }

    fn translate_unary(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        op: UnaryOp,
        operand: &Expr,
    ) -> IrResult<Value> {
        let value = self.translate_expr(f, operand)?;
        match op {
            UnaryOp::Increment | UnaryOp::Decrement => {
                let ty = self.lib.value_type(value.ty);
                let one = self.one(ty)?;
                let base = if op == UnaryOp::Increment {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                let one = Value::new(one, ty);
                let result =
                    self.binary_op(f, expr, base, &operand.ty, &operand.ty, value, one)?;
                self.assign(f, operand, result)?;
                Ok(result)
            }
            UnaryOp::Negate | UnaryOp::Not => {
                match self.lib.find_unary_resolver(&operand.ty, op).cloned() {
                    Some(resolver) => self.apply_resolver(f, expr, &resolver, vec![value]),
                    None => self.unresolved(f, expr, &format!("{}{}", op.symbol(), operand.ty)),
                }
            }
        }
    }

    fn translate_cast(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        operand: &Expr,
    ) -> IrResult<Value> {
        let value = self.translate_expr(f, operand)?;
        if operand.ty == expr.ty {
            return self.to_value(f, value);
        }
        match self.lib.find_cast_resolver(&operand.ty, &expr.ty).cloned() {
            Some(resolver) => self.apply_resolver(f, expr, &resolver, vec![value]),
            None => self.unresolved(f, expr, &format!("cast {} -> {}", operand.ty, expr.ty)),
        }
    }

    fn translate_index(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        target: &Expr,
        index: &Expr,
    ) -> IrResult<Value> {
        let base = self.translate_expr(f, target)?;
        let index = self.translate_expr(f, index)?;
        let index = self.to_value(f, index)?;
        let element = self.require_type(&expr.ty, expr.span)?;
        let base = self.to_pointer(f, base)?;
        let storage = self.lib.ty(base.ty).storage_class.unwrap_or(StorageClass::Function);
        let ptr = self.lib.get_or_create_pointer_type(element, storage)?;
        let op = self.emit(
            f,
            SpirvOp::AccessChain,
            Some(ptr),
            vec![Operand::Op(base.op), Operand::Op(index.op)],
        )?;
        Ok(Value::new(op, ptr))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn translate_construct(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        args: &[Expr],
    ) -> IrResult<Value> {
        let ty = self.require_type(&expr.ty, expr.span)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.translate_expr(f, arg)?);
        }
        let arg_types: Vec<TypeRef> = args.iter().map(|a| a.ty.clone()).collect();

        if self.lib.type_meta(ty).is_some() {
            let temp = self.local(f, ty, None)?;
            self.default_initialize(f, temp, ty)?;
            let key = FunctionKey::new(expr.ty.clone(), expr.ty.name.clone(), arg_types);
            match self.lib.find_function(&key) {
                Some(ctor) => {
                    self.call_user(f, ctor, Some(temp), values)?;
                }
                None if values.is_empty() => {}
                None => return self.unresolved(f, expr, &key.to_string()),
            }
            return Ok(temp);
        }

        match self.lib.find_constructor_resolver(&expr.ty, &arg_types).cloned() {
            Some(resolver) => self.apply_resolver(f, expr, &resolver, values),
            None if values.is_empty() => {
                let null = self.lib.null_constant(ty)?;
                Ok(Value::new(null, ty))
            }
            None => {
                let args: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
                self.unresolved(f, expr, &format!("{}({})", expr.ty, args.join(", ")))
            }
        }
    }

    /// Composite construction; a lone scalar splats, all-constant parts
    /// fold into a constant composite.
    pub(super) fn construct_composite(
        &mut self,
        f: &mut FunctionContext,
        ty: TypeId,
        values: Vec<Value>,
    ) -> IrResult<Value> {
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            parts.push(self.to_value(f, value)?);
        }
        let count = self.lib.ty(ty).component_count as usize;
        let splat = parts.len() == 1 && count > 1 && self.lib.ty(parts[0].ty).is_scalar();
        let ops: Vec<tessera_ir::OpId> = if splat {
            vec![parts[0].op; count]
        } else {
            parts.iter().map(|p| p.op).collect()
        };

        let foldable = ops.len() == count
            && ops.iter().all(|op| {
                let opcode = self.lib.op(*op).opcode;
                matches!(
                    opcode,
                    SpirvOp::Constant
                        | SpirvOp::ConstantTrue
                        | SpirvOp::ConstantFalse
                        | SpirvOp::ConstantComposite
                )
            });
        if foldable {
            let op = self.lib.composite_constant(ty, ops)?;
            return Ok(Value::new(op, ty));
        }
        let operands = ops.into_iter().map(Operand::Op).collect();
        let op = self.emit(f, SpirvOp::CompositeConstruct, Some(ty), operands)?;
        Ok(Value::new(op, ty))
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Writes `value` through an lvalue expression: properties call their
    /// setter, multi-component swizzles shuffle, everything else stores.
    pub(super) fn assign(
        &mut self,
        f: &mut FunctionContext,
        target: &Expr,
        value: Value,
    ) -> IrResult<()> {
        if let ExprKind::Member { target: owner, name, kind } = &target.kind {
            if *kind == MemberKind::Property {
                let (owner_ty, receiver) = self.property_receiver(f, owner)?;
                let key = FunctionKey::setter(&owner_ty, name, &target.ty);
                match self.lib.find_function(&key) {
                    Some(setter) => {
                        self.call_user(f, setter, receiver, vec![value])?;
                    }
                    None => {
                        self.unresolved(f, target, &key.to_string())?;
                    }
                }
                return Ok(());
            }
            if self.is_swizzle_write(owner, name) {
                return self.assign_swizzle(f, target, owner, name, value);
            }
        }

        let place = self.translate_expr(f, target)?;
        if !self.is_writable(place) {
            self.report(DiagnosticKind::NotAnLValue, target.span, expr_text(target));
            return Ok(());
        }
        self.store(f, place, value)
    }

    fn is_writable(&self, place: Value) -> bool {
        let ty = self.lib.ty(place.ty);
        ty.is_pointer()
            && !matches!(
                ty.storage_class,
                Some(
                    StorageClass::Input
                        | StorageClass::Uniform
                        | StorageClass::UniformConstant
                        | StorageClass::PushConstant
                )
            )
    }

    fn is_swizzle_write(&self, owner: &Expr, name: &str) -> bool {
        name.len() > 1
            && self.lib.find_setter_resolver(&owner.ty, name) == Some(&InstructionResolver::Swizzle)
            && self
                .lib
                .find_type(&owner.ty.to_string(), true)
                .is_some_and(|ty| self.lib.ty(ty).kind == TypeKind::Vector)
    }

    fn assign_swizzle(
        &mut self,
        f: &mut FunctionContext,
        target: &Expr,
        owner: &Expr,
        name: &str,
        value: Value,
    ) -> IrResult<()> {
        let place = self.translate_expr(f, owner)?;
        if !self.is_writable(place) {
            self.report(DiagnosticKind::NotAnLValue, target.span, expr_text(target));
            return Ok(());
        }
        let vector = self.lib.value_type(place.ty);
        let count = self.lib.ty(vector).component_count;
        let Some(indices) = swizzle_indices(name).filter(|i| i.iter().all(|c| *c < count)) else {
            self.unresolved(f, target, &format!("{}.{name}", owner.ty))?;
            return Ok(());
        };
        let current = self.to_value(f, place)?;
        let value = self.to_value(f, value)?;
        let mut operands = vec![Operand::Op(current.op), Operand::Op(value.op)];
        for component in 0..count {
            let lane = match indices.iter().position(|i| *i == component) {
                Some(position) => count + position as u32,
                None => component,
            };
            operands.push(Operand::Literal(lane));
        }
        let op = self.emit(f, SpirvOp::VectorShuffle, Some(vector), operands)?;
        self.store(f, place, Value::new(op, vector))
    }
}

/// Component indices of a swizzle name: `XYZW` or `RGBA`, one to four.
pub(super) fn swizzle_indices(name: &str) -> Option<Vec<u32>> {
    if name.is_empty() || name.len() > 4 {
        return None;
    }
    name.chars()
        .map(|c| match c.to_ascii_uppercase() {
            'X' | 'R' => Some(0),
            'Y' | 'G' => Some(1),
            'Z' | 'B' => Some(2),
            'W' | 'A' => Some(3),
            _ => None,
        })
        .collect()
}
