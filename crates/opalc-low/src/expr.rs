//! Expression lowering.
//!
//! Type-driven instruction selection: integer operands get integer
//! instructions, float operands get float instructions, mixed int/float
//! promotes the integer side, `str + str` concatenates through the runtime,
//! and `**` always goes through `pow` on doubles. Comparisons produce `i1`.
//!
//! String literals are decoded here (escape sequences were kept verbatim by
//! the lexer), null-terminated, staged in a stack slot and copied into a
//! fresh heap buffer from `alloc` - every evaluation of a string literal
//! allocates, even inside a loop.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};
use inkwell::{AddressSpace, FloatPredicate, IntPredicate};

use opalc_par::{BinOp, CallExpr, Expr, Ident, PrefixExpr, PrefixOp, Ty};
use opalc_util::Span;

use crate::env::{Binding, FrameKind};
use crate::error::{LowerError, Result};
use crate::Lowerer;

/// How a value participates in instruction selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ValueClass {
    /// `int` and `bool` - integer instructions.
    Integer,
    /// `float` - floating instructions.
    Floating,
    /// `str` - pointer values.
    Pointer,
    /// `void` - no value.
    None,
}

impl ValueClass {
    pub(crate) fn of(ty: Ty) -> ValueClass {
        match ty {
            Ty::Int | Ty::Bool => ValueClass::Integer,
            Ty::Float => ValueClass::Floating,
            Ty::Str => ValueClass::Pointer,
            Ty::Void => ValueClass::None,
        }
    }
}

impl<'ctx, 'a> Lowerer<'ctx, 'a> {
    /// Lowers an expression to an LLVM value and its language type.
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        match expr {
            Expr::Int(lit) => Ok((
                self.context.i64_type().const_int(lit.value as u64, true).into(),
                Ty::Int,
            )),
            Expr::Float(lit) => Ok((
                self.context.f64_type().const_float(lit.value).into(),
                Ty::Float,
            )),
            Expr::Bool(lit) => Ok((
                self.context
                    .bool_type()
                    .const_int(lit.value as u64, false)
                    .into(),
                Ty::Bool,
            )),
            Expr::Str(lit) => self.build_heap_string(&lit.value),
            Expr::Ident(ident) => self.lower_ident(ident),
            Expr::Prefix(prefix) => self.lower_prefix(prefix),
            Expr::Infix(infix) => {
                let (lhs, lhs_ty) = self.lower_expr(&infix.lhs)?;
                let (rhs, rhs_ty) = self.lower_expr(&infix.rhs)?;
                self.lower_binary(infix.op, lhs, lhs_ty, rhs, rhs_ty, infix.span)
            },
            Expr::Call(call) => match self.lower_call(call)? {
                (Some(value), ty) => Ok((value, ty)),
                (None, _) => Err(self.report(
                    call.span,
                    "Type Error",
                    format!("void function '{}' used as a value", call.callee.name),
                )),
            },
        }
    }

    /// Loads an identifier's slot. Functions are not values, and locals of
    /// an enclosing function are not capturable.
    fn lower_ident(&mut self, ident: &Ident) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        match self.env.lookup(&ident.name) {
            Some((Binding::Slot { ptr, ty }, frame)) => {
                self.check_capture(&ident.name, frame, ident.span)?;
                self.basic_type(ty)
                    .ok_or_else(|| LowerError::Internal("void slot type".into()))?;
                let value = self.builder.build_load(ptr, &ident.name)?;
                Ok((value, ty))
            },
            Some((Binding::Function { .. }, _)) => Err(self.report(
                ident.span,
                "Name Error",
                format!("'{}' is a function, not a variable", ident.name),
            )),
            None => Err(self.report(
                ident.span,
                "Name Error",
                format!("Variable '{}' not defined", ident.name),
            )),
        }
    }

    /// Rejects references from a nested function to an enclosing function's
    /// locals: nested functions are emitted at module scope and capture
    /// nothing.
    pub(crate) fn check_capture(&self, name: &str, frame: usize, span: Span) -> Result<()> {
        if self.env.frame_kind(frame) == FrameKind::Function
            && frame != self.env.current_index()
        {
            return Err(self.report(
                span,
                "Name Error",
                format!(
                    "Cannot use '{}' from an enclosing function: closures are not supported",
                    name
                ),
            ));
        }
        Ok(())
    }

    /// Unary `-` negates by multiplying with -1; `not x` compares against
    /// zero.
    fn lower_prefix(&mut self, prefix: &PrefixExpr) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        let (value, ty) = self.lower_expr(&prefix.rhs)?;

        match (ValueClass::of(ty), prefix.op) {
            (ValueClass::Floating, PrefixOp::Neg) => {
                let minus_one = self.context.f64_type().const_float(-1.0);
                let result =
                    self.builder
                        .build_float_mul(value.into_float_value(), minus_one, "neg")?;
                Ok((result.into(), Ty::Float))
            },
            (ValueClass::Floating, PrefixOp::Not) => {
                let zero = self.context.f64_type().const_float(0.0);
                let result = self.builder.build_float_compare(
                    FloatPredicate::OEQ,
                    value.into_float_value(),
                    zero,
                    "not",
                )?;
                Ok((result.into(), Ty::Bool))
            },
            (ValueClass::Integer, PrefixOp::Neg) => {
                let int_value = value.into_int_value();
                let minus_one = int_value.get_type().const_all_ones();
                let result = self.builder.build_int_mul(int_value, minus_one, "neg")?;
                Ok((result.into(), Ty::Int))
            },
            (ValueClass::Integer, PrefixOp::Not) => {
                let int_value = value.into_int_value();
                let zero = int_value.get_type().const_zero();
                let result =
                    self.builder
                        .build_int_compare(IntPredicate::EQ, int_value, zero, "not")?;
                Ok((result.into(), Ty::Bool))
            },
            _ => Err(self.report(
                prefix.span,
                "Type Error",
                format!("Unsupported operand type for '{}': {}", prefix.op, ty),
            )),
        }
    }

    /// Binary operator dispatch with numeric promotion.
    pub(crate) fn lower_binary(
        &mut self,
        op: BinOp,
        mut lhs: BasicValueEnum<'ctx>,
        lhs_ty: Ty,
        mut rhs: BasicValueEnum<'ctx>,
        rhs_ty: Ty,
        span: Span,
    ) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        match (ValueClass::of(lhs_ty), ValueClass::of(rhs_ty)) {
            (ValueClass::Integer, ValueClass::Integer) => self.int_binary(op, lhs, rhs),
            (ValueClass::Floating, ValueClass::Floating) => self.float_binary(op, lhs, rhs),
            (ValueClass::Integer, ValueClass::Floating) => {
                lhs = self.int_to_float(lhs)?;
                self.float_binary(op, lhs, rhs)
            },
            (ValueClass::Floating, ValueClass::Integer) => {
                rhs = self.int_to_float(rhs)?;
                self.float_binary(op, lhs, rhs)
            },
            (ValueClass::Pointer, ValueClass::Pointer) if op == BinOp::Add => {
                let result = self.string_concat(lhs, rhs)?;
                Ok((result, Ty::Str))
            },
            _ => Err(self.report(
                span,
                "Type Error",
                format!(
                    "Unsupported operand types for '{}': {} and {}",
                    op, lhs_ty, rhs_ty
                ),
            )),
        }
    }

    /// Integer instruction selection; comparisons are signed.
    fn int_binary(
        &mut self,
        op: BinOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        let l = lhs.into_int_value();
        let r = rhs.into_int_value();

        let (value, ty): (BasicValueEnum<'ctx>, Ty) = match op {
            BinOp::Add => (self.builder.build_int_add(l, r, "add")?.into(), Ty::Int),
            BinOp::Sub => (self.builder.build_int_sub(l, r, "sub")?.into(), Ty::Int),
            BinOp::Mul => (self.builder.build_int_mul(l, r, "mul")?.into(), Ty::Int),
            BinOp::Div => (
                self.builder.build_int_signed_div(l, r, "div")?.into(),
                Ty::Int,
            ),
            BinOp::Mod => (
                self.builder.build_int_signed_rem(l, r, "rem")?.into(),
                Ty::Int,
            ),
            // Integer exponentiation still goes through pow; the result
            // stays f64 (2 ** 10 is 1024.0, not 1024).
            BinOp::Pow => {
                let value = self.builtin_pow(lhs, rhs)?;
                (value, Ty::Float)
            },
            comparison => {
                let predicate = match comparison {
                    BinOp::EqEq => IntPredicate::EQ,
                    BinOp::NotEq => IntPredicate::NE,
                    BinOp::Lt => IntPredicate::SLT,
                    BinOp::Gt => IntPredicate::SGT,
                    BinOp::LtEq => IntPredicate::SLE,
                    BinOp::GtEq => IntPredicate::SGE,
                    _ => unreachable!("arithmetic handled above"),
                };
                (
                    self.builder.build_int_compare(predicate, l, r, "cmp")?.into(),
                    Ty::Bool,
                )
            },
        };
        Ok((value, ty))
    }

    /// Float instruction selection; comparisons are ordered.
    fn float_binary(
        &mut self,
        op: BinOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        let l = lhs.into_float_value();
        let r = rhs.into_float_value();

        let (value, ty): (BasicValueEnum<'ctx>, Ty) = match op {
            BinOp::Add => (self.builder.build_float_add(l, r, "fadd")?.into(), Ty::Float),
            BinOp::Sub => (self.builder.build_float_sub(l, r, "fsub")?.into(), Ty::Float),
            BinOp::Mul => (self.builder.build_float_mul(l, r, "fmul")?.into(), Ty::Float),
            BinOp::Div => (self.builder.build_float_div(l, r, "fdiv")?.into(), Ty::Float),
            BinOp::Mod => (self.builder.build_float_rem(l, r, "frem")?.into(), Ty::Float),
            BinOp::Pow => {
                let value = self.builtin_pow(lhs, rhs)?;
                (value, Ty::Float)
            },
            comparison => {
                let predicate = match comparison {
                    BinOp::EqEq => FloatPredicate::OEQ,
                    BinOp::NotEq => FloatPredicate::ONE,
                    BinOp::Lt => FloatPredicate::OLT,
                    BinOp::Gt => FloatPredicate::OGT,
                    BinOp::LtEq => FloatPredicate::OLE,
                    BinOp::GtEq => FloatPredicate::OGE,
                    _ => unreachable!("arithmetic handled above"),
                };
                (
                    self.builder
                        .build_float_compare(predicate, l, r, "fcmp")?
                        .into(),
                    Ty::Bool,
                )
            },
        };
        Ok((value, ty))
    }

    /// Widens a signed integer to `f64`.
    pub(crate) fn int_to_float(
        &mut self,
        value: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let result = self.builder.build_signed_int_to_float(
            value.into_int_value(),
            self.context.f64_type(),
            "promote",
        )?;
        Ok(result.into())
    }

    /// Calls the runtime's `_strcat`, yielding a fresh heap string.
    pub(crate) fn string_concat(
        &mut self,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let strcat = self.builtin_fn("_strcat")?;
        let call = self
            .builder
            .build_call(strcat, &[lhs.into(), rhs.into()], "concat")?;
        Ok(call.try_as_basic_value().unwrap_basic())
    }

    /// `pow(f64, f64) -> f64`; integer operands are promoted first.
    pub(crate) fn builtin_pow(
        &mut self,
        mut lhs: BasicValueEnum<'ctx>,
        mut rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        if lhs.is_int_value() {
            lhs = self.int_to_float(lhs)?;
        }
        if rhs.is_int_value() {
            rhs = self.int_to_float(rhs)?;
        }

        let pow = self.builtin_fn("pow")?;
        let call = self
            .builder
            .build_call(pow, &[lhs.into(), rhs.into()], "pow")?;
        Ok(call.try_as_basic_value().unwrap_basic())
    }

    /// Lowers a call; returns `None` for the value when the callee returns
    /// `void`.
    pub(crate) fn lower_call(
        &mut self,
        call: &CallExpr,
    ) -> Result<(Option<BasicValueEnum<'ctx>>, Ty)> {
        let mut args = Vec::with_capacity(call.args.len());
        let mut arg_tys = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let (value, ty) = self.lower_expr(arg)?;
            args.push(value);
            arg_tys.push(ty);
        }

        match call.callee.name.as_str() {
            "print" => {
                let value = self.builtin_print(call, &args, &arg_tys)?;
                Ok((Some(value), Ty::Int))
            },
            "pow" => {
                self.check_builtin_arity(call, 2)?;
                let value = self.builtin_pow(args[0], args[1])?;
                Ok((Some(value), Ty::Float))
            },
            "len" => {
                self.check_builtin_arity(call, 1)?;
                if arg_tys[0] != Ty::Str {
                    return Err(self.report(
                        call.span,
                        "Type Error",
                        format!("len() expects 'str', got '{}'", arg_tys[0]),
                    ));
                }
                let strlen = self.builtin_fn("len")?;
                let result = self
                    .builder
                    .build_call(strlen, &[args[0].into()], "len")?;
                Ok((Some(result.try_as_basic_value().unwrap_basic()), Ty::Int))
            },
            name => match self.env.lookup(name) {
                Some((Binding::Function { value, ret }, _)) => {
                    let expected = value.count_params() as usize;
                    if args.len() != expected {
                        return Err(self.report(
                            call.span,
                            "Type Error",
                            format!(
                                "Function '{}' expects {} argument(s), got {}",
                                name,
                                expected,
                                args.len()
                            ),
                        ));
                    }

                    let meta: Vec<BasicMetadataValueEnum<'ctx>> =
                        args.iter().map(|v| (*v).into()).collect();
                    let result = self.builder.build_call(value, &meta, name)?;

                    match ret {
                        Ty::Void => Ok((None, Ty::Void)),
                        ty => Ok((Some(result.try_as_basic_value().unwrap_basic()), ty)),
                    }
                },
                Some((Binding::Slot { .. }, _)) => Err(self.report(
                    call.span,
                    "Type Error",
                    format!("'{}' is a variable, not a function", name),
                )),
                None => Err(self.report(
                    call.span,
                    "Name Error",
                    format!("Function '{}' not defined", name),
                )),
            },
        }
    }

    fn check_builtin_arity(&self, call: &CallExpr, expected: usize) -> Result<()> {
        if call.args.len() != expected {
            return Err(self.report(
                call.span,
                "Type Error",
                format!(
                    "{}() expects {} argument(s), got {}",
                    call.callee.name,
                    expected,
                    call.args.len()
                ),
            ));
        }
        Ok(())
    }

    /// `print(fmt, args...)` forwards to libc `printf`. The first argument
    /// must be a format string; trailing arguments are passed through
    /// unchanged (their contents are not checked against the format).
    fn builtin_print(
        &mut self,
        call: &CallExpr,
        args: &[BasicValueEnum<'ctx>],
        arg_tys: &[Ty],
    ) -> Result<BasicValueEnum<'ctx>> {
        if args.is_empty() {
            return Err(self.report(
                call.span,
                "Type Error",
                "print() requires a format string argument",
            ));
        }
        if arg_tys[0] != Ty::Str {
            return Err(self.report(
                call.args[0].span(),
                "Type Error",
                format!("print() format must be 'str', got '{}'", arg_tys[0]),
            ));
        }

        let printf = self.builtin_fn("print")?;
        let mut call_args: Vec<BasicMetadataValueEnum<'ctx>> = vec![args[0].into()];
        call_args.extend(
            args[1..]
                .iter()
                .map(|v| BasicMetadataValueEnum::from(*v)),
        );

        let result = self.builder.build_call(printf, &call_args, "printf")?;
        Ok(result.try_as_basic_value().unwrap_basic())
    }

    /// Decodes a string literal, null-terminates it, and copies it into a
    /// fresh heap buffer: `alloc(len)` for the buffer, the decoded bytes
    /// staged in a stack slot, then `memcpy` onto the heap. The value of
    /// the expression is the heap pointer.
    pub(crate) fn build_heap_string(&mut self, raw: &str) -> Result<(BasicValueEnum<'ctx>, Ty)> {
        let mut bytes = decode_escapes(raw);
        if bytes.last() != Some(&0) {
            bytes.push(0);
        }

        let i64_type = self.context.i64_type();
        let size = i64_type.const_int(bytes.len() as u64, false);

        let alloc = self.builtin_fn("_alloc")?;
        let heap = self
            .builder
            .build_call(alloc, &[size.into()], "str_alloc")?
            .try_as_basic_value()
            .unwrap_basic();

        let constant = self.context.const_string(&bytes, false);
        let staging = self.builder.build_alloca(constant.get_type(), "str_stage")?;
        self.builder.build_store(staging, constant)?;

        let memcpy = self.builtin_fn("_memcpy")?;
        let i8_ptr_type = self.context.i8_type().ptr_type(AddressSpace::default());
        let staging_ptr = self
            .builder
            .build_pointer_cast(staging, i8_ptr_type, "str_stage_ptr")?;
        self.builder.build_call(
            memcpy,
            &[heap.into(), staging_ptr.into(), size.into()],
            "str_copy",
        )?;

        Ok((heap, Ty::Str))
    }
}

/// Translates the escape sequences `\n \t \r \\ \" \' \0 \b \f \v` to their
/// byte values; an unrecognized escape keeps both characters.
fn decode_escapes(raw: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('\\') => bytes.push(b'\\'),
            Some('"') => bytes.push(b'"'),
            Some('\'') => bytes.push(b'\''),
            Some('0') => bytes.push(0),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some(other) => {
                bytes.push(b'\\');
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            },
            None => bytes.push(b'\\'),
        }
    }

    bytes
}
