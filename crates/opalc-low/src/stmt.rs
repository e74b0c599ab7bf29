//! Statement lowering.
//!
//! Control flow lowers to explicit basic blocks: `if`/`else` with a merge
//! block, `while` with a body-header and an exit block and the condition
//! tested both on entry and after each completed body pass. `break` and
//! `continue` branch to the innermost loop's exit and body-header
//! respectively. `import` runs the imported file's front end with the shared
//! handler and lowers its statements into the current block.

use std::path::PathBuf;

use opalc_lex::{sanitize, Lexer};
use opalc_par::{
    AssignOp, AssignStmt, Expr, ExprStmt, IfStmt, ImportStmt, Parser, ReturnStmt, Stmt, Ty,
    VarStmt, WhileStmt,
};
use opalc_util::Span;

use crate::env::Binding;
use crate::error::{LowerError, Result};
use crate::expr::ValueClass;
use crate::Lowerer;

impl<'ctx, 'a> Lowerer<'ctx, 'a> {
    /// Lowers one statement into the current block.
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Var(s) => self.lower_var(s),
            Stmt::Assign(s) => self.lower_assign(s),
            Stmt::Function(s) => self.lower_function(s),
            Stmt::Return(s) => self.lower_return(s),
            Stmt::If(s) => self.lower_if(s),
            Stmt::While(s) => self.lower_while(s),
            Stmt::Break(span) => self.lower_break(*span),
            Stmt::Continue(span) => self.lower_continue(*span),
            Stmt::Import(s) => self.lower_import(s),
            Stmt::Expr(s) => self.lower_expr_stmt(s),
        }
    }

    /// `var NAME: TYPE (= expr)?;`
    ///
    /// Without an initializer the per-type default is used (`0`, `0.0`,
    /// `false`, `""`); `void` has no default. Re-declaring a name already
    /// bound in the current frame stores into the existing slot instead of
    /// allocating a new one. At module scope the slot is an LLVM global so
    /// that module names stay reachable from inside functions.
    fn lower_var(&mut self, stmt: &VarStmt) -> Result<()> {
        let (value, ty) = match &stmt.init {
            Some(init) => self.lower_expr(init)?,
            None => self.default_value(stmt.ty, stmt.span)?,
        };

        let name = &stmt.name.name;
        match self.env.lookup_local(name) {
            Some(Binding::Slot { ptr, .. }) => {
                // Same-frame re-declaration reuses the slot.
                self.builder.build_store(ptr, value)?;
            },
            Some(Binding::Function { .. }) => {
                return Err(self.report(
                    stmt.name.span,
                    "Name Error",
                    format!("'{}' is already defined as a function", name),
                ));
            },
            None => {
                let llvm_ty = self.basic_type(ty).ok_or_else(|| {
                    LowerError::Internal("value expression produced void".into())
                })?;

                let ptr = if self.env.in_module_frame() {
                    let global = self.module.add_global(llvm_ty, None, name);
                    global.set_initializer(&llvm_ty.const_zero());
                    global.as_pointer_value()
                } else {
                    self.builder.build_alloca(llvm_ty, name)?
                };
                self.builder.build_store(ptr, value)?;
                self.env.define(name, Binding::Slot { ptr, ty });
            },
        }
        Ok(())
    }

    /// The default initializer for a declared type.
    fn default_value(
        &mut self,
        ty: Ty,
        span: Span,
    ) -> Result<(inkwell::values::BasicValueEnum<'ctx>, Ty)> {
        match ty {
            Ty::Int => Ok((self.context.i64_type().const_int(0, false).into(), Ty::Int)),
            Ty::Float => Ok((self.context.f64_type().const_float(0.0).into(), Ty::Float)),
            Ty::Bool => Ok((self.context.bool_type().const_int(0, false).into(), Ty::Bool)),
            Ty::Str => self.build_heap_string(""),
            Ty::Void => Err(self.report(
                span,
                "Type Error",
                "No default value for a variable of type 'void'",
            )),
        }
    }

    /// `NAME op expr;` - the target must already exist in an enclosing
    /// scope. Int and float operands are cross-promoted; `+=` on two
    /// strings concatenates through the runtime.
    fn lower_assign(&mut self, stmt: &AssignStmt) -> Result<()> {
        let name = &stmt.target.name;

        let (ptr, slot_ty) = match self.env.lookup(name) {
            Some((Binding::Slot { ptr, ty }, frame)) => {
                self.check_capture(name, frame, stmt.target.span)?;
                (ptr, ty)
            },
            Some((Binding::Function { .. }, _)) => {
                return Err(self.report(
                    stmt.target.span,
                    "Name Error",
                    format!("Cannot assign to function '{}'", name),
                ));
            },
            None => {
                return Err(self.report(
                    stmt.target.span,
                    "Name Error",
                    format!("Variable '{}' not defined", name),
                ));
            },
        };

        let (mut rhs, mut rhs_ty) = self.lower_expr(&stmt.value)?;

        self.basic_type(slot_ty)
            .ok_or_else(|| LowerError::Internal("void slot type".into()))?;
        let mut current = self.builder.build_load(ptr, name)?;
        let mut current_ty = slot_ty;

        // Cross-promote int and float before dispatching on the operator.
        if current_ty == Ty::Int && rhs_ty == Ty::Float {
            current = self.int_to_float(current)?;
            current_ty = Ty::Float;
        }
        if current_ty == Ty::Float && rhs_ty == Ty::Int {
            rhs = self.int_to_float(rhs)?;
            rhs_ty = Ty::Float;
        }

        let lhs_class = ValueClass::of(current_ty);
        let rhs_class = ValueClass::of(rhs_ty);

        let result = match stmt.op {
            AssignOp::Assign => rhs,
            AssignOp::AddAssign => match (lhs_class, rhs_class) {
                (ValueClass::Integer, ValueClass::Integer) => self
                    .builder
                    .build_int_add(current.into_int_value(), rhs.into_int_value(), "add")?
                    .into(),
                (ValueClass::Pointer, ValueClass::Pointer) => {
                    self.string_concat(current, rhs)?
                },
                (ValueClass::Floating, ValueClass::Floating) => self
                    .builder
                    .build_float_add(current.into_float_value(), rhs.into_float_value(), "fadd")?
                    .into(),
                _ => return Err(self.unsupported_assign(stmt, current_ty, rhs_ty)),
            },
            AssignOp::SubAssign => match (lhs_class, rhs_class) {
                (ValueClass::Integer, ValueClass::Integer) => self
                    .builder
                    .build_int_sub(current.into_int_value(), rhs.into_int_value(), "sub")?
                    .into(),
                (ValueClass::Floating, ValueClass::Floating) => self
                    .builder
                    .build_float_sub(current.into_float_value(), rhs.into_float_value(), "fsub")?
                    .into(),
                _ => return Err(self.unsupported_assign(stmt, current_ty, rhs_ty)),
            },
            AssignOp::MulAssign => match (lhs_class, rhs_class) {
                (ValueClass::Integer, ValueClass::Integer) => self
                    .builder
                    .build_int_mul(current.into_int_value(), rhs.into_int_value(), "mul")?
                    .into(),
                (ValueClass::Floating, ValueClass::Floating) => self
                    .builder
                    .build_float_mul(current.into_float_value(), rhs.into_float_value(), "fmul")?
                    .into(),
                _ => return Err(self.unsupported_assign(stmt, current_ty, rhs_ty)),
            },
            AssignOp::DivAssign => match (lhs_class, rhs_class) {
                (ValueClass::Integer, ValueClass::Integer) => self
                    .builder
                    .build_int_signed_div(current.into_int_value(), rhs.into_int_value(), "div")?
                    .into(),
                (ValueClass::Floating, ValueClass::Floating) => self
                    .builder
                    .build_float_div(current.into_float_value(), rhs.into_float_value(), "fdiv")?
                    .into(),
                _ => return Err(self.unsupported_assign(stmt, current_ty, rhs_ty)),
            },
            AssignOp::ModAssign => match (lhs_class, rhs_class) {
                (ValueClass::Integer, ValueClass::Integer) => self
                    .builder
                    .build_int_signed_rem(current.into_int_value(), rhs.into_int_value(), "rem")?
                    .into(),
                (ValueClass::Floating, ValueClass::Floating) => self
                    .builder
                    .build_float_rem(current.into_float_value(), rhs.into_float_value(), "frem")?
                    .into(),
                _ => return Err(self.unsupported_assign(stmt, current_ty, rhs_ty)),
            },
            AssignOp::PowAssign => match (lhs_class, rhs_class) {
                (
                    ValueClass::Integer | ValueClass::Floating,
                    ValueClass::Integer | ValueClass::Floating,
                ) => self.builtin_pow(current, rhs)?,
                _ => return Err(self.unsupported_assign(stmt, current_ty, rhs_ty)),
            },
        };

        self.builder.build_store(ptr, result)?;
        Ok(())
    }

    fn unsupported_assign(&self, stmt: &AssignStmt, lhs: Ty, rhs: Ty) -> LowerError {
        self.report(
            stmt.span,
            "Type Error",
            format!("Unsupported operand types for '{}': {} and {}", stmt.op, lhs, rhs),
        )
    }

    /// `if cond: ... (else: ...)? end` with a merge block; each arm falls
    /// through to the merge unless it already terminated.
    fn lower_if(&mut self, stmt: &IfStmt) -> Result<()> {
        let test = self.lower_condition(&stmt.cond)?;
        let function = self.current_function()?;
        let index = self.next_counter();

        if stmt.else_body.is_empty() {
            let then_block = self
                .context
                .append_basic_block(function, &format!("if_then_{}", index));
            let merge_block = self
                .context
                .append_basic_block(function, &format!("if_merge_{}", index));

            self.builder
                .build_conditional_branch(test, then_block, merge_block)?;

            self.builder.position_at_end(then_block);
            self.lower_block(&stmt.body)?;
            if self.block_needs_terminator() {
                self.builder.build_unconditional_branch(merge_block)?;
            }

            self.builder.position_at_end(merge_block);
        } else {
            let then_block = self
                .context
                .append_basic_block(function, &format!("if_then_{}", index));
            let else_block = self
                .context
                .append_basic_block(function, &format!("if_else_{}", index));
            let merge_block = self
                .context
                .append_basic_block(function, &format!("if_merge_{}", index));

            self.builder
                .build_conditional_branch(test, then_block, else_block)?;

            self.builder.position_at_end(then_block);
            self.lower_block(&stmt.body)?;
            if self.block_needs_terminator() {
                self.builder.build_unconditional_branch(merge_block)?;
            }

            self.builder.position_at_end(else_block);
            self.lower_block(&stmt.else_body)?;
            if self.block_needs_terminator() {
                self.builder.build_unconditional_branch(merge_block)?;
            }

            self.builder.position_at_end(merge_block);
        }

        Ok(())
    }

    /// `while cond: ... end`
    ///
    /// The condition is tested on entry and again after each completed body
    /// pass. `break` targets the exit block, `continue` the body-header.
    fn lower_while(&mut self, stmt: &WhileStmt) -> Result<()> {
        let test = self.lower_condition(&stmt.cond)?;
        let function = self.current_function()?;
        let index = self.next_counter();

        let body_block = self
            .context
            .append_basic_block(function, &format!("while_loop_entry_{}", index));
        let exit_block = self
            .context
            .append_basic_block(function, &format!("while_loop_otherwise_{}", index));

        self.break_targets.push(exit_block);
        self.continue_targets.push(body_block);

        self.builder
            .build_conditional_branch(test, body_block, exit_block)?;
        self.builder.position_at_end(body_block);

        let result = self.lower_block(&stmt.body).and_then(|()| {
            let test = self.lower_condition(&stmt.cond)?;
            self.builder
                .build_conditional_branch(test, body_block, exit_block)?;
            Ok(())
        });

        self.break_targets.pop();
        self.continue_targets.pop();
        self.builder.position_at_end(exit_block);

        result
    }

    /// Evaluates a loop/branch condition down to an `i1`.
    fn lower_condition(&mut self, cond: &Expr) -> Result<inkwell::values::IntValue<'ctx>> {
        let (value, ty) = self.lower_expr(cond)?;
        if ty != Ty::Bool {
            return Err(self.report(
                cond.span(),
                "Type Error",
                format!("Condition must be 'bool', got '{}'", ty),
            ));
        }
        Ok(value.into_int_value())
    }

    fn lower_break(&mut self, span: Span) -> Result<()> {
        match self.break_targets.last().copied() {
            Some(target) => {
                self.builder.build_unconditional_branch(target)?;
                self.start_dead_block("after_break")
            },
            None => Err(self.report(span, "Control-flow Error", "Break statement outside of loop")),
        }
    }

    fn lower_continue(&mut self, span: Span) -> Result<()> {
        match self.continue_targets.last().copied() {
            Some(target) => {
                self.builder.build_unconditional_branch(target)?;
                self.start_dead_block("after_continue")
            },
            None => Err(self.report(
                span,
                "Control-flow Error",
                "Continue statement outside of loop",
            )),
        }
    }

    /// `return expr;` - nothing else is emitted into the same block.
    fn lower_return(&mut self, stmt: &ReturnStmt) -> Result<()> {
        let (value, _) = self.lower_expr(&stmt.value)?;
        self.builder.build_return(Some(&value))?;
        self.start_dead_block("after_return")
    }

    /// `import "path";`
    ///
    /// Paths are tracked by canonical form; a repeat import warns and emits
    /// no code, an import currently in progress is a cycle. The imported
    /// file is lexed, sanitized and parsed with the shared handler and its
    /// statements are lowered into the current block, so they execute where
    /// the import appears. A front-end failure in the imported file aborts
    /// the importing compilation.
    fn lower_import(&mut self, stmt: &ImportStmt) -> Result<()> {
        let path: PathBuf = match std::fs::canonicalize(&stmt.path) {
            Ok(path) => path,
            Err(err) => {
                return Err(self.report(
                    stmt.span,
                    "Import Error",
                    format!("Cannot read '{}': {}", stmt.path, err),
                ));
            },
        };

        if self.imported.contains(&path) {
            self.handler.warning(
                stmt.span,
                "Import Warning",
                format!("'{}' is already imported globally", stmt.path),
            );
            return Ok(());
        }

        if self.importing.contains(&path) {
            return Err(self.report(
                stmt.span,
                "Import Error",
                format!("cyclic import of '{}'", stmt.path),
            ));
        }

        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                return Err(self.report(
                    stmt.span,
                    "Import Error",
                    format!("Cannot read '{}': {}", stmt.path, err),
                ));
            },
        };

        let errors_before = self.handler.error_count();
        let file_id = self.sources.add(path.display().to_string(), source.clone());
        let tokens = sanitize(Lexer::new(&source, file_id, self.handler).tokenize());
        let program = Parser::new(tokens, self.handler).parse_program();

        if self.handler.error_count() > errors_before {
            self.handler.error(
                stmt.span,
                "Import Error",
                format!("Imported file '{}' failed to compile", stmt.path),
            );
            return Err(LowerError::ImportFailed(stmt.path.clone()));
        }

        self.importing.insert(path.clone());
        let result = self.lower_block(&program);
        self.importing.shift_remove(&path);
        self.imported.insert(path);

        result
    }

    /// A bare expression; a call to a `void` function is allowed here.
    fn lower_expr_stmt(&mut self, stmt: &ExprStmt) -> Result<()> {
        match &stmt.expr {
            Expr::Call(call) => {
                self.lower_call(call)?;
                Ok(())
            },
            expr => {
                self.lower_expr(expr)?;
                Ok(())
            },
        }
    }
}
