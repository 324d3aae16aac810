//! Walk pass: function bodies and structured control flow.
//!
//! Selections and loops are lowered to SPIR-V's structured form: headers
//! carry their merge (and continue) block, and `break`/`continue` branch to
//! the innermost loop's merge/continue block.

use tessera_core::{Expr, FunctionKey, Span, Stmt, TypeRef};
use tessera_ir::spirv::Op as SpirvOp;
use tessera_ir::{BlockKind, FunctionId, Operand};

use super::{
    ClassInfo, FunctionContext, IrResult, LoopTargets, Translator, Value, pre_constructor_key,
};
use crate::diagnostics::DiagnosticKind;

/// Loop shapes share one lowering.
struct LoopParts<'s> {
    cond: Option<&'s Expr>,
    step: Option<&'s Expr>,
    body: &'s [Stmt],
    /// `do { } while (cond)`: the condition sits in the continue block.
    test_after: bool,
}

impl<'a> Translator<'a> {
    pub(super) fn walk(&mut self) -> IrResult<()> {
        for info in self.class_infos() {
            self.walk_class(info)?;
        }
        Ok(())
    }

    fn walk_class(&mut self, info: ClassInfo<'a>) -> IrResult<()> {
        let owner = info.type_ref();
        let decl = info.decl;

        if let Some(pre) = self.lib.find_function(&pre_constructor_key(&owner)) {
            self.walk_pre_constructor(info, pre)?;
        }

        for field in decl.fields.iter().filter(|f| f.is_static) {
            let Some(init) = &field.initializer else {
                continue;
            };
            let Some(global) = self.lib.find_field_global(&owner, &field.name) else {
                continue;
            };
            if self.lib.op(global).opcode != SpirvOp::Variable {
                // Specialization constants take their initializer as default.
                continue;
            }
            let mut f = self.take_globals_initializer()?;
            let value = self.translate_expr(&mut f, init)?;
            let ty = self.lib.op(global).result_type.unwrap_or(self.core.void);
            self.store(&f, Value::new(global, ty), value)?;
            self.globals_init = Some(f);
        }

        for ctor in &decl.constructors {
            let params: Vec<&str> = ctor.params.iter().map(|p| p.name.as_str()).collect();
            self.walk_body(ctor.key(&owner), &params, &ctor.body)?;
        }
        for property in &decl.properties {
            if let Some(get) = &property.get {
                self.walk_body(FunctionKey::getter(&owner, &property.name), &[], get)?;
            }
            if let Some(set) = &property.set {
                let key = FunctionKey::setter(&owner, &property.name, &property.ty);
                self.walk_body(key, &["value"], set)?;
            }
        }
        for function in &decl.functions {
            let params: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
            self.walk_body(function.key(&owner), &params, &function.body)?;
        }
        Ok(())
    }

    /// Instance field initializers run in declaration order; class-typed
    /// members without one are pre-constructed in place.
    fn walk_pre_constructor(&mut self, info: ClassInfo<'a>, pre: FunctionId) -> IrResult<()> {
        let receiver = self.receiver_param(pre);
        let mut f = self.begin_function(pre, receiver)?;
        let Some(this) = receiver else {
            return self.finish_function(f);
        };
        for field in info.decl.fields.iter().filter(|f| !f.is_static) {
            let Some(index) = self.lib.ty(info.ty).member_index(&field.name) else {
                continue;
            };
            let member_ty = self.lib.ty(info.ty).members[index].ty;
            let place = self.member_access(&f, this, index as u32, member_ty)?;
            match &field.initializer {
                Some(init) => {
                    let value = self.translate_expr(&mut f, init)?;
                    self.store(&f, place, value)?;
                }
                None if self.lib.type_meta(member_ty).is_some() => {
                    let temp = self.local(&f, member_ty, None)?;
                    self.default_initialize(&mut f, temp, member_ty)?;
                    self.store(&f, place, temp)?;
                }
                None => {}
            }
        }
        self.finish_function(f)
    }

    fn receiver_param(&self, function: FunctionId) -> Option<Value> {
        let params = &self.lib.function(function).params;
        let key = self.lib.function(function).key.as_ref()?;
        if params.len() <= key.params.len() {
            return None;
        }
        let op = params[0];
        let ty = self.lib.op(op).result_type?;
        Some(Value::new(op, ty))
    }

    fn walk_body(&mut self, key: FunctionKey, names: &[&str], body: &[Stmt]) -> IrResult<()> {
        let Some(id) = self.lib.find_function(&key) else {
            return Ok(());
        };
        let receiver = self.receiver_param(id);
        let mut f = self.begin_function(id, receiver)?;
        let params = self.lib.function(id).params.clone();
        let skip = usize::from(receiver.is_some());
        for (name, op) in names.iter().zip(params.iter().skip(skip)) {
            let ty = self.lib.op(*op).result_type.unwrap_or(self.core.void);
            f.bind(*name, Value::new(*op, ty));
        }
        self.translate_block(&mut f, body)?;
        self.finish_function(f)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub(super) fn translate_block(
        &mut self,
        f: &mut FunctionContext,
        body: &[Stmt],
    ) -> IrResult<()> {
        f.push_scope();
        for stmt in body {
            self.translate_statement(f, stmt)?;
        }
        f.pop_scope();
        Ok(())
    }

    fn translate_statement(&mut self, f: &mut FunctionContext, stmt: &Stmt) -> IrResult<()> {
        match stmt {
            Stmt::Var { name, ty, init, span } => {
                self.translate_var(f, name, ty, init.as_ref(), *span)
            }
            Stmt::Expr { expr, .. } => self.translate_expr(f, expr).map(|_| ()),
            Stmt::If {
                cond, then, else_body, ..
            } => self.translate_if(f, cond, then, else_body.as_deref()),
            Stmt::While { cond, body, .. } => self.translate_loop(
                f,
                LoopParts {
                    cond: Some(cond),
                    step: None,
                    body,
                    test_after: false,
                },
            ),
            Stmt::DoWhile { body, cond, .. } => self.translate_loop(
                f,
                LoopParts {
                    cond: Some(cond),
                    step: None,
                    body,
                    test_after: true,
                },
            ),
            Stmt::For {
                init, cond, step, body, ..
            } => {
                f.push_scope();
                if let Some(init) = init {
                    self.translate_statement(f, init)?;
                }
                self.translate_loop(
                    f,
                    LoopParts {
                        cond: cond.as_ref(),
                        step: step.as_ref(),
                        body,
                        test_after: false,
                    },
                )?;
                f.pop_scope();
                Ok(())
            }
            Stmt::Loop { body, .. } => self.translate_loop(
                f,
                LoopParts {
                    cond: None,
                    step: None,
                    body,
                    test_after: false,
                },
            ),
            Stmt::Break { span } => self.jump(f, *span, "break", |t| t.break_to),
            Stmt::Continue { span } => self.jump(f, *span, "continue", |t| t.continue_to),
            Stmt::Return { value, .. } => {
                match value {
                    Some(expr) => {
                        let value = self.translate_expr(f, expr)?;
                        let value = self.to_value(f, value)?;
                        self.emit(f, SpirvOp::ReturnValue, None, vec![Operand::Op(value.op)])?;
                    }
                    None => {
                        self.emit(f, SpirvOp::Return, None, Vec::new())?;
                    }
                }
                Ok(())
            }
            Stmt::Scope { body, .. } => self.translate_block(f, body),
        }
    }

    fn translate_var(
        &mut self,
        f: &mut FunctionContext,
        name: &str,
        ty: &TypeRef,
        init: Option<&Expr>,
        span: Span,
    ) -> IrResult<()> {
        let value_ty = self.require_type(ty, span)?;

        // Opaque handles have no storage; the name aliases the value.
        if self.lib.ty(value_ty).non_copyable {
            let value = match init {
                Some(expr) => self.translate_expr(f, expr)?,
                None => {
                    self.report(
                        DiagnosticKind::Unsupported,
                        span,
                        format!("`{name}` of non-copyable type `{ty}` needs an initializer"),
                    );
                    self.dummy(f, value_ty)?
                }
            };
            f.bind(name, value);
            return Ok(());
        }

        let var = self.local(f, value_ty, Some(name))?;
        match init {
            Some(expr) => {
                let value = self.translate_expr(f, expr)?;
                self.store(f, var, value)?;
            }
            None => self.default_initialize(f, var, value_ty)?,
        }
        f.bind(name, var);
        Ok(())
    }

    fn translate_if(
        &mut self,
        f: &mut FunctionContext,
        cond: &Expr,
        then: &[Stmt],
        else_body: Option<&[Stmt]>,
    ) -> IrResult<()> {
        // Code after `return`/`break` still needs a header of its own; the
        // dead block keeps its single terminator.
        if self.is_terminated(f.current) {
            let unreachable = self.new_block()?;
            self.start_block(f, unreachable)?;
        }
        let cond = self.translate_expr(f, cond)?;
        let cond = self.to_value(f, cond)?;
        let then_block = self.new_block()?;
        let merge = self.new_block()?;
        let else_block = match else_body {
            Some(_) => self.new_block()?,
            None => merge,
        };

        let header = self.lib.block_mut(f.current)?;
        header.kind = BlockKind::Selection;
        header.merge = Some(merge);
        self.emit(
            f,
            SpirvOp::BranchConditional,
            None,
            vec![Operand::Op(cond.op), Operand::Block(then_block), Operand::Block(else_block)],
        )?;

        self.start_block(f, then_block)?;
        self.translate_block(f, then)?;
        self.branch(f, merge)?;

        if let Some(body) = else_body {
            self.start_block(f, else_block)?;
            self.translate_block(f, body)?;
            self.branch(f, merge)?;
        }
        self.start_block(f, merge)
    }

    fn translate_loop(&mut self, f: &mut FunctionContext, parts: LoopParts<'_>) -> IrResult<()> {
        let header = self.new_block()?;
        let body = self.new_block()?;
        let continue_block = self.new_block()?;
        let merge = self.new_block()?;

        self.branch(f, header)?;
        self.start_block(f, header)?;
        let block = self.lib.block_mut(header)?;
        block.kind = BlockKind::Loop;
        block.merge = Some(merge);
        block.continue_target = Some(continue_block);

        match parts.cond.filter(|_| !parts.test_after) {
            Some(cond) => {
                let test = self.new_block()?;
                self.branch(f, test)?;
                self.start_block(f, test)?;
                let cond = self.translate_expr(f, cond)?;
                let cond = self.to_value(f, cond)?;
                self.emit(
                    f,
                    SpirvOp::BranchConditional,
                    None,
                    vec![Operand::Op(cond.op), Operand::Block(body), Operand::Block(merge)],
                )?;
            }
            None => self.branch(f, body)?,
        }

        self.start_block(f, body)?;
        f.loops.push(LoopTargets {
            break_to: merge,
            continue_to: continue_block,
        });
        self.translate_block(f, parts.body)?;
        f.loops.pop();
        self.branch(f, continue_block)?;

        self.start_block(f, continue_block)?;
        if let Some(step) = parts.step {
            self.translate_expr(f, step)?;
        }
        match parts.cond.filter(|_| parts.test_after) {
            Some(cond) => {
                let cond = self.translate_expr(f, cond)?;
                let cond = self.to_value(f, cond)?;
                self.emit(
                    f,
                    SpirvOp::BranchConditional,
                    None,
                    vec![Operand::Op(cond.op), Operand::Block(header), Operand::Block(merge)],
                )?;
            }
            None => self.branch(f, header)?,
        }
        self.start_block(f, merge)
    }

    fn jump(
        &mut self,
        f: &mut FunctionContext,
        span: Span,
        keyword: &str,
        target: impl Fn(&LoopTargets) -> tessera_ir::BlockId,
    ) -> IrResult<()> {
        match f.loops.last() {
            Some(targets) => {
                let block = target(targets);
                self.emit(f, SpirvOp::Branch, None, vec![Operand::Block(block)])?;
            }
            None => {
                let message = format!("`{keyword}` outside of a loop");
                self.report(DiagnosticKind::Unsupported, span, message)
            }
        }
        Ok(())
    }
}
