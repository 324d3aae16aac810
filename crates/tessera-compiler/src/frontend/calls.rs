//! Calls: user functions and resolver-driven intrinsics.

use tessera_core::{Expr, ExprKind, FunctionKey};
use tessera_ir::spirv::{ImageOperands, Op as SpirvOp, StorageClass};
use tessera_ir::{FunctionId, InstructionResolver, Operand, TypeKind};

use super::{FunctionContext, IrResult, Translator, Value};
use crate::diagnostics::DiagnosticKind;

impl Translator<'_> {
    pub(super) fn translate_call(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        target: Option<&Expr>,
        function: &FunctionKey,
        args: &[Expr],
    ) -> IrResult<Value> {
        // Template owners register their resolvers on instantiation.
        self.resolve_type(&function.owner)?;
        let target = target.filter(|t| !matches!(t.kind, ExprKind::TypeName { .. }));

        if let Some(id) = self.lib.find_function(function) {
            let has_receiver = self.lib.function(id).params.len() > function.params.len();
            let receiver = match (has_receiver, target) {
                (false, _) => None,
                (true, Some(target)) => Some(self.translate_expr(f, target)?),
                (true, None) => match f.receiver {
                    Some(receiver) => Some(receiver),
                    None => {
                        self.report(
                            DiagnosticKind::Unsupported,
                            expr.span,
                            format!("instance function `{function}` called without a receiver"),
                        );
                        let ty = self.require_type(&expr.ty, expr.span)?;
                        return self.dummy(f, ty);
                    }
                },
            };
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.translate_expr(f, arg)?);
            }
            return self.call_user(f, id, receiver, values);
        }

        let Some(resolver) = self.lib.find_function_resolver(function).cloned() else {
            return self.unresolved(f, expr, &function.to_string());
        };
        let mut values = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            values.push(self.translate_expr(f, target)?);
        }
        for arg in args {
            values.push(self.translate_expr(f, arg)?);
        }
        self.apply_resolver(f, expr, &resolver, values)
    }

    /// Calls an IR function. Copyable arguments are copied into fresh
    /// temporaries so callees see value semantics. A receiver that is not a
    /// function variable is copied in and written back after the call.
    pub(crate) fn call_user(
        &mut self,
        f: &mut FunctionContext,
        function: FunctionId,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> IrResult<Value> {
        let params = self.lib.function(function).params.clone();
        let ret = self.lib.function(function).return_type;
        let mut operands = vec![Operand::Function(function)];
        let mut params = params.iter();
        let mut write_back = None;

        if let Some(receiver) = receiver {
            params.next();
            let (pointer, origin) = self.call_pointer(f, receiver)?;
            operands.push(Operand::Op(pointer.op));
            write_back = origin.map(|origin| (pointer, origin));
        }

        for (arg, param) in args.into_iter().zip(params) {
            let param_ty = self.lib.op(*param).result_type.unwrap_or(self.core.void);
            if self.lib.ty(param_ty).is_pointer() {
                let temp = self.local(f, self.lib.value_type(param_ty), None)?;
                self.store(f, temp, arg)?;
                operands.push(Operand::Op(temp.op));
            } else {
                let value = self.to_value(f, arg)?;
                operands.push(Operand::Op(value.op));
            }
        }

        let op = self.emit(f, SpirvOp::FunctionCall, Some(ret), operands)?;
        if let Some((temp, origin)) = write_back {
            self.store(f, origin, temp)?;
        }
        Ok(Value::new(op, ret))
    }

    /// Pointer operand for a receiver: function variables pass directly;
    /// anything else goes through a temporary, returning the writable
    /// origin to copy back into.
    fn call_pointer(
        &mut self,
        f: &mut FunctionContext,
        value: Value,
    ) -> IrResult<(Value, Option<Value>)> {
        let op = self.lib.op(value.op);
        let is_variable = matches!(op.opcode, SpirvOp::Variable | SpirvOp::FunctionParameter);
        let storage = self.lib.ty(value.ty).storage_class;
        if is_variable && storage == Some(StorageClass::Function) {
            return Ok((value, None));
        }
        let value_ty = self.lib.value_type(value.ty);
        let temp = self.local(f, value_ty, None)?;
        self.store(f, temp, value)?;
        let writable = matches!(
            storage,
            Some(
                StorageClass::Function
                    | StorageClass::Private
                    | StorageClass::Output
                    | StorageClass::Workgroup
            )
        );
        Ok((temp, writable.then_some(value)))
    }

    // ========================================================================
    // Resolvers
    // ========================================================================

    /// Interprets a resolver over already translated operands (receiver
    /// first). The result has the expression's type.
    pub(super) fn apply_resolver(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        resolver: &InstructionResolver,
        values: Vec<Value>,
    ) -> IrResult<Value> {
        let result_ty = self.require_type(&expr.ty, expr.span)?;
        let result = (result_ty != self.core.void).then_some(result_ty);
        match resolver {
            InstructionResolver::Op(opcode) | InstructionResolver::Convert(opcode) => {
                let operands = self.operands(f, values)?;
                let op = self.emit(f, *opcode, result, operands)?;
                Ok(Value::new(op, result_ty))
            }
            InstructionResolver::OpSwapped(opcode) => {
                let mut operands = self.operands(f, values)?;
                operands.reverse();
                let op = self.emit(f, *opcode, result, operands)?;
                Ok(Value::new(op, result_ty))
            }
            InstructionResolver::ExtInst { import, instruction } => {
                let mut operands =
                    vec![Operand::ExtImport(*import), Operand::Literal(*instruction)];
                operands.extend(self.operands(f, values)?);
                let op = self.emit(f, SpirvOp::ExtInst, result, operands)?;
                Ok(Value::new(op, result_ty))
            }
            InstructionResolver::Construct => self.construct_composite(f, result_ty, values),
            InstructionResolver::DefaultConstruct => {
                let null = self.lib.null_constant(result_ty)?;
                Ok(Value::new(null, result_ty))
            }
            InstructionResolver::Identity => match values.into_iter().next() {
                Some(value) => self.to_value(f, value),
                None => {
                    let null = self.lib.null_constant(result_ty)?;
                    Ok(Value::new(null, result_ty))
                }
            },
            InstructionResolver::SampleImage { op, lod } => {
                self.sample(f, expr, result_ty, *op, *lod, values)
            }
            InstructionResolver::ImageQuery(opcode) => {
                let mut operands = self.operands(f, values)?;
                if *opcode == SpirvOp::ImageFetch && operands.len() == 3 {
                    let lod = operands.remove(2);
                    operands.push(Operand::Literal(ImageOperands::LOD.bits()));
                    operands.push(lod);
                }
                let op = self.emit(f, *opcode, result, operands)?;
                Ok(Value::new(op, result_ty))
            }
            InstructionResolver::Append => self.append(f, expr, values),
            InstructionResolver::EmitVertex => {
                let op = self.emit(f, SpirvOp::EmitVertex, None, Vec::new())?;
                Ok(Value::new(op, result_ty))
            }
            InstructionResolver::RestartStrip => {
                let op = self.emit(f, SpirvOp::EndPrimitive, None, Vec::new())?;
                Ok(Value::new(op, result_ty))
            }
            InstructionResolver::Swizzle | InstructionResolver::ArrayLength => {
                self.report(
                    DiagnosticKind::Unsupported,
                    expr.span,
                    format!("`{}` cannot be lowered here", tessera_core::printer::expr_text(expr)),
                );
                self.dummy(f, result_ty)
            }
            InstructionResolver::Unsupported(reason) => {
                self.report(DiagnosticKind::Unsupported, expr.span, reason.clone());
                self.dummy(f, result_ty)
            }
        }
    }

    fn operands(&mut self, f: &mut FunctionContext, values: Vec<Value>) -> IrResult<Vec<Operand>> {
        let mut operands = Vec::with_capacity(values.len());
        for value in values {
            operands.push(Operand::Op(self.to_value(f, value)?.op));
        }
        Ok(operands)
    }

    /// `Sample*(image, sampler, coords[, lod | dref])` or
    /// `Sample*(sampledImage, coords[, ...])`.
    fn sample(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        result_ty: tessera_ir::TypeId,
        opcode: SpirvOp,
        lod: bool,
        values: Vec<Value>,
    ) -> IrResult<Value> {
        let mut args = Vec::with_capacity(values.len());
        for value in values {
            args.push(self.to_value(f, value)?);
        }
        let first = match args.first() {
            Some(first) => *first,
            None => return self.unresolved(f, expr, "sample without an image"),
        };

        let (sampled, rest) = if self.lib.ty(first.ty).kind == TypeKind::SampledImage {
            (first, &args[1..])
        } else {
            let image_name = self.lib.ty(first.ty).name.clone();
            let sampled_ty = self.lib.find_type(&format!("Sampled{image_name}"), true);
            let (Some(sampled_ty), Some(sampler)) = (sampled_ty, args.get(1)) else {
                return self.unresolved(f, expr, &format!("Sampled{image_name}"));
            };
            let op = self.emit(
                f,
                SpirvOp::SampledImage,
                Some(sampled_ty),
                vec![Operand::Op(first.op), Operand::Op(sampler.op)],
            )?;
            (Value::new(op, sampled_ty), &args[2..])
        };

        let Some(coords) = rest.first() else {
            return self.unresolved(f, expr, "sample coordinates");
        };
        let mut operands = vec![Operand::Op(sampled.op), Operand::Op(coords.op)];
        match rest.get(1) {
            Some(extra) if lod => {
                operands.push(Operand::Literal(ImageOperands::LOD.bits()));
                operands.push(Operand::Op(extra.op));
            }
            Some(dref) if opcode == SpirvOp::ImageSampleDrefImplicitLod => {
                operands.push(Operand::Op(dref.op))
            }
            _ => {}
        }
        let op = self.emit(f, opcode, Some(result_ty), operands)?;
        Ok(Value::new(op, result_ty))
    }

    /// `stream.Append(vertex[, index])` calls the stream's placeholder,
    /// which the owning composite later replaces with a specialized copy.
    fn append(
        &mut self,
        f: &mut FunctionContext,
        expr: &Expr,
        mut values: Vec<Value>,
    ) -> IrResult<Value> {
        let Some(stream) = values.first().copied() else {
            return self.unresolved(f, expr, "Append");
        };
        let stream_ty = self.lib.value_type(stream.ty);
        let Some(placeholder) = self.lib.late_bound(stream_ty) else {
            let name = self.lib.ty(stream_ty).name.clone();
            return self.unresolved(f, expr, &format!("{name}.Append"));
        };
        if values.len() == 2 {
            let zero = self.int_const(0)?;
            values.push(Value::new(zero, self.core.integer));
        }
        let args = values.split_off(1);
        self.call_user(f, placeholder, Some(stream), args)
    }
}
