//! opalc-low - AST-to-IR lowering engine.
//!
//! Owns the LLVM module, the instruction builder, the scoped environment and
//! the break/continue target stacks, and walks the AST performing
//! type-driven instruction selection: numeric promotion, string-heap
//! management, structured control-flow lowering and function emission.
//!
//! The program's statements are lowered into a synthetic entry function
//! `.main : () -> i64` that defaults to `ret 0` at end of source. User
//! functions become module-level symbols; recursion works because a
//! function's name is bound inside its own scope frame before its body is
//! lowered.

pub mod env;
mod error;
mod expr;
mod stmt;

pub use error::{LowerError, Result};

use indexmap::IndexSet;
use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::FunctionValue;
use inkwell::AddressSpace;
use std::path::PathBuf;

use opalc_par::{FnStmt, Program, Stmt, Ty};
use opalc_util::{Handler, SourceMap, Span};

use crate::env::{Binding, Environment, FrameKind};

/// The lowering engine.
///
/// Type handles: `int` is `i64`, `float` is `f64`, `bool` is `i1`, `str` is
/// a heap `i8*`, `void` has no value type.
pub struct Lowerer<'ctx, 'a> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) env: Environment<'ctx>,
    pub(crate) handler: &'a Handler,
    pub(crate) sources: &'a mut SourceMap,

    /// Innermost-first stack of loop exit blocks.
    pub(crate) break_targets: Vec<BasicBlock<'ctx>>,
    /// Innermost-first stack of loop body-header blocks.
    pub(crate) continue_targets: Vec<BasicBlock<'ctx>>,

    /// Counter for unique block names.
    counter: u32,

    /// Canonical paths of files already imported, in import order.
    pub(crate) imported: IndexSet<PathBuf>,
    /// Canonical paths of imports currently being lowered (cycle detection).
    pub(crate) importing: IndexSet<PathBuf>,
}

impl<'ctx, 'a> Lowerer<'ctx, 'a> {
    /// Creates a lowering engine with the built-ins pre-installed.
    pub fn new(context: &'ctx Context, handler: &'a Handler, sources: &'a mut SourceMap) -> Self {
        let module = context.create_module("main");
        let builder = context.create_builder();

        let mut lowerer = Self {
            context,
            module,
            builder,
            env: Environment::new(),
            handler,
            sources,
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
            counter: 0,
            imported: IndexSet::new(),
            importing: IndexSet::new(),
        };
        lowerer.declare_builtins();
        lowerer
    }

    /// Consumes the lowerer and hands the finished module to the driver.
    pub fn finish(self) -> Module<'ctx> {
        self.module
    }

    /// Declares the runtime/libc functions and the `true`/`false` globals,
    /// and installs them in the root environment frame.
    fn declare_builtins(&mut self) {
        let i64_type = self.context.i64_type();
        let f64_type = self.context.f64_type();
        let bool_type = self.context.bool_type();
        let ptr_type = self.context.i8_type().ptr_type(AddressSpace::default());

        // printf(i8*, ...) -> i64
        let printf_type = i64_type.fn_type(&[ptr_type.into()], true);
        let printf = self
            .module
            .add_function("printf", printf_type, Some(Linkage::External));

        // alloc(i64) -> i8*
        let alloc_type = ptr_type.fn_type(&[i64_type.into()], false);
        let alloc = self
            .module
            .add_function("alloc", alloc_type, Some(Linkage::External));

        // memcpy(i8*, i8*, i64) -> i8*
        let memcpy_type =
            ptr_type.fn_type(&[ptr_type.into(), ptr_type.into(), i64_type.into()], false);
        let memcpy = self
            .module
            .add_function("memcpy", memcpy_type, Some(Linkage::External));

        // _strcat(i8*, i8*) -> i8*
        let strcat_type = ptr_type.fn_type(&[ptr_type.into(), ptr_type.into()], false);
        let strcat = self
            .module
            .add_function("_strcat", strcat_type, Some(Linkage::External));

        // pow(f64, f64) -> f64
        let pow_type = f64_type.fn_type(&[f64_type.into(), f64_type.into()], false);
        let pow = self
            .module
            .add_function("pow", pow_type, Some(Linkage::External));

        // strlen(i8*) -> i64
        let strlen_type = i64_type.fn_type(&[ptr_type.into()], false);
        let strlen = self
            .module
            .add_function("strlen", strlen_type, Some(Linkage::External));

        // Global boolean constants.
        let true_var = self.module.add_global(bool_type, None, "true");
        true_var.set_initializer(&bool_type.const_int(1, false));
        true_var.set_constant(true);

        let false_var = self.module.add_global(bool_type, None, "false");
        false_var.set_initializer(&bool_type.const_int(0, false));
        false_var.set_constant(true);

        self.env.define(
            "print",
            Binding::Function {
                value: printf,
                ret: Ty::Int,
            },
        );
        self.env.define(
            "_alloc",
            Binding::Function {
                value: alloc,
                ret: Ty::Str,
            },
        );
        self.env.define(
            "_memcpy",
            Binding::Function {
                value: memcpy,
                ret: Ty::Str,
            },
        );
        self.env.define(
            "_strcat",
            Binding::Function {
                value: strcat,
                ret: Ty::Str,
            },
        );
        self.env.define(
            "pow",
            Binding::Function {
                value: pow,
                ret: Ty::Float,
            },
        );
        self.env.define(
            "len",
            Binding::Function {
                value: strlen,
                ret: Ty::Int,
            },
        );
        self.env.define(
            "true",
            Binding::Slot {
                ptr: true_var.as_pointer_value(),
                ty: Ty::Bool,
            },
        );
        self.env.define(
            "false",
            Binding::Slot {
                ptr: false_var.as_pointer_value(),
                ty: Ty::Bool,
            },
        );
    }

    /// Lowers the whole program into the synthetic `.main` entry function.
    pub fn lower_program(&mut self, program: &Program) -> Result<()> {
        let fn_type = self.context.i64_type().fn_type(&[], false);
        let main_fn = self.module.add_function(".main", fn_type, None);
        let entry = self.context.append_basic_block(main_fn, ".main_entry");
        self.builder.position_at_end(entry);

        self.lower_block(program)?;

        // Default exit code at end of source.
        if self.block_needs_terminator() {
            let zero = self.context.i64_type().const_int(0, false);
            self.builder.build_return(Some(&zero))?;
        }

        Ok(())
    }

    /// Lowers a list of statements, continuing past statements whose errors
    /// were already reported to the handler. Internal failures abort.
    pub(crate) fn lower_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            match self.lower_stmt(stmt) {
                Ok(()) | Err(LowerError::Reported) => {},
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Builds the LLVM function for a `def`, spills its parameters into
    /// fresh slots, and lowers its body in a child frame.
    pub(crate) fn lower_function(&mut self, stmt: &FnStmt) -> Result<()> {
        let name = &stmt.name.name;

        let mut param_types: Vec<BasicMetadataTypeEnum<'ctx>> =
            Vec::with_capacity(stmt.params.len());
        for param in &stmt.params {
            match self.basic_type(param.ty) {
                Some(ty) => param_types.push(ty.into()),
                None => {
                    self.handler.error(
                        param.span,
                        "Type Error",
                        format!("Parameter '{}' cannot have type 'void'", param.name),
                    );
                    return Err(LowerError::Reported);
                },
            }
        }

        let fn_type = match self.basic_type(stmt.ret) {
            Some(ty) => ty.fn_type(&param_types, false),
            None => self.context.void_type().fn_type(&param_types, false),
        };
        let function = self.module.add_function(name, fn_type, None);
        let entry = self
            .context
            .append_basic_block(function, &format!("{}_entry", name));

        let saved_block = self.builder.get_insert_block();
        self.builder.position_at_end(entry);
        self.env.push_frame(FrameKind::Function);

        for (i, param) in stmt.params.iter().enumerate() {
            let llvm_ty = self
                .basic_type(param.ty)
                .ok_or_else(|| LowerError::Internal("void parameter slipped through".into()))?;
            let arg = function.get_nth_param(i as u32).ok_or_else(|| {
                LowerError::Internal(format!("missing LLVM argument {} of '{}'", i, name))
            })?;
            let ptr = self.builder.build_alloca(llvm_ty, &param.name)?;
            self.builder.build_store(ptr, arg)?;
            self.env.define(
                &param.name,
                Binding::Slot {
                    ptr,
                    ty: param.ty,
                },
            );
        }

        // Make the function visible inside itself for recursion.
        self.env.define(
            name,
            Binding::Function {
                value: function,
                ret: stmt.ret,
            },
        );

        let result = self.lower_block(&stmt.body);

        // A body that falls off the end gets a default return so every
        // block is terminated.
        if result.is_ok() && self.block_needs_terminator() {
            match self.basic_type(stmt.ret) {
                Some(ty) => {
                    let zero = ty.const_zero();
                    self.builder.build_return(Some(&zero))?;
                },
                None => {
                    self.builder.build_return(None)?;
                },
            }
        }

        self.env.pop_frame();

        // Bind the name in the enclosing scope so subsequent code can call
        // it.
        self.env.define(
            name,
            Binding::Function {
                value: function,
                ret: stmt.ret,
            },
        );
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }

        result
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    /// Maps a language type to its LLVM value type; `void` has none.
    pub(crate) fn basic_type(&self, ty: Ty) -> Option<BasicTypeEnum<'ctx>> {
        match ty {
            Ty::Int => Some(self.context.i64_type().into()),
            Ty::Float => Some(self.context.f64_type().into()),
            Ty::Bool => Some(self.context.bool_type().into()),
            Ty::Str => Some(self.context.i8_type().ptr_type(AddressSpace::default()).into()),
            Ty::Void => None,
        }
    }

    /// The function containing the builder's current block.
    pub(crate) fn current_function(&self) -> Result<FunctionValue<'ctx>> {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| LowerError::Internal("builder is not positioned in a function".into()))
    }

    /// True if the current block still needs a terminator.
    pub(crate) fn block_needs_terminator(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|block| block.get_terminator().is_none())
    }

    /// Opens a fresh block after a `ret`/`break`/`continue` so that any
    /// following (unreachable) statements never append to a terminated
    /// block.
    pub(crate) fn start_dead_block(&mut self, label: &str) -> Result<()> {
        let function = self.current_function()?;
        let block = self
            .context
            .append_basic_block(function, &format!("{}_{}", label, self.next_counter()));
        self.builder.position_at_end(block);
        Ok(())
    }

    /// Generates a unique counter value for naming.
    pub(crate) fn next_counter(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Fetches a pre-installed builtin from the root frame.
    pub(crate) fn builtin_fn(&self, name: &str) -> Result<FunctionValue<'ctx>> {
        match self.env.lookup(name) {
            Some((Binding::Function { value, .. }, _)) => Ok(value),
            _ => Err(LowerError::Internal(format!("missing builtin '{}'", name))),
        }
    }

    /// Records a user-level error diagnostic and returns the marker that
    /// abandons the current statement.
    pub(crate) fn report(
        &self,
        span: Span,
        kind: &str,
        message: impl Into<String>,
    ) -> LowerError {
        self.handler.error(span, kind, message);
        LowerError::Reported
    }
}

#[cfg(test)]
mod tests;
