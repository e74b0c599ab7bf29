//! AST node definitions.
//!
//! Two tagged variant trees, [`Stmt`] and [`Expr`], with struct payloads per
//! node. Operators are their own enums so downstream matching is exhaustive,
//! and every node carries a [`Span`] usable for diagnostics.

use std::fmt;

use opalc_util::Span;

/// A parsed program: the list of top-level statements.
pub type Program = Vec<Stmt>;

/// The language's type names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// boolean
    Bool,
    /// heap string
    Str,
    /// no value
    Void,
}

impl Ty {
    /// Parses a type name as written in source.
    pub fn from_name(name: &str) -> Option<Ty> {
        match name {
            "int" => Some(Ty::Int),
            "float" => Some(Ty::Float),
            "bool" => Some(Ty::Bool),
            "str" => Some(Ty::Str),
            "void" => Some(Ty::Void),
            _ => None,
        }
    }

    /// The source-level name of this type.
    pub fn name(self) -> &'static str {
        match self {
            Ty::Int => "int",
            Ty::Float => "float",
            Ty::Bool => "bool",
            Ty::Str => "str",
            Ty::Void => "void",
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// `var NAME: TYPE (= expr)? ;`
    Var(VarStmt),
    /// `NAME op expr ;` where op is `=` or a compound assignment
    Assign(AssignStmt),
    /// `def NAME(params) -> TYPE : body end`
    Function(FnStmt),
    /// `return expr ;`
    Return(ReturnStmt),
    /// `if cond : body (elif ...)* (else : body)? end`
    If(IfStmt),
    /// `while cond : body end`
    While(WhileStmt),
    /// `break ;`
    Break(Span),
    /// `continue ;`
    Continue(Span),
    /// `import "path" ;`
    Import(ImportStmt),
    /// A bare expression terminated by `;`
    Expr(ExprStmt),
}

impl Stmt {
    /// The source range of this statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Function(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::Import(s) => s.span,
            Stmt::Expr(s) => s.span,
        }
    }
}

/// Variable declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct VarStmt {
    pub name: Ident,
    pub ty: Ty,
    /// Absent means the per-type default is used.
    pub init: Option<Expr>,
    pub span: Span,
}

/// Assignment to an existing name.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub target: Ident,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

/// Function declaration. Bodies may contain nested functions; those are
/// hoisted to module scope during lowering.
#[derive(Clone, Debug, PartialEq)]
pub struct FnStmt {
    pub name: Ident,
    pub params: Vec<Param>,
    pub ret: Ty,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// One `NAME: TYPE` function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
    pub span: Span,
}

/// Return statement.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub value: Expr,
    pub span: Span,
}

/// If statement. `elif` chains are parsed as a single nested `If` inside
/// `else_body`; an empty `else_body` means no else branch.
#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
    pub span: Span,
}

/// While loop.
#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Textual import of another source file.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportStmt {
    pub path: String,
    pub span: Span,
}

/// Expression statement.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(IntLit),
    Float(FloatLit),
    Str(StrLit),
    Bool(BoolLit),
    Ident(Ident),
    Prefix(Box<PrefixExpr>),
    Infix(Box<InfixExpr>),
    Call(Box<CallExpr>),
}

impl Expr {
    /// The source range of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(e) => e.span,
            Expr::Float(e) => e.span,
            Expr::Str(e) => e.span,
            Expr::Bool(e) => e.span,
            Expr::Ident(e) => e.span,
            Expr::Prefix(e) => e.span,
            Expr::Infix(e) => e.span,
            Expr::Call(e) => e.span,
        }
    }
}

/// Integer literal.
#[derive(Clone, Debug, PartialEq)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

/// Float literal.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatLit {
    pub value: f64,
    pub span: Span,
}

/// String literal. Escape sequences are still verbatim here; decoding
/// happens at lowering.
#[derive(Clone, Debug, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub span: Span,
}

/// Boolean literal.
#[derive(Clone, Debug, PartialEq)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

/// Identifier reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Unary operator application.
#[derive(Clone, Debug, PartialEq)]
pub struct PrefixExpr {
    pub op: PrefixOp,
    pub rhs: Expr,
    pub span: Span,
}

/// Binary operator application.
#[derive(Clone, Debug, PartialEq)]
pub struct InfixExpr {
    pub lhs: Expr,
    pub op: BinOp,
    pub rhs: Expr,
    pub span: Span,
}

/// Function call. The callee must be a plain identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub callee: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl BinOp {
    /// Comparisons produce `bool` regardless of operand types.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::EqEq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::EqEq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
        };
        f.write_str(text)
    }
}

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    /// Numeric negation
    Neg,
    /// Logical not
    Not,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Neg => f.write_str("-"),
            PrefixOp::Not => f.write_str("not"),
        }
    }
}

/// Assignment operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::PowAssign => "**=",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Expr {
    /// Fully parenthesized rendering; handy for precedence tests and
    /// `--emit-ast` output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(e) => write!(f, "{}", e.value),
            Expr::Float(e) => write!(f, "{}", e.value),
            Expr::Str(e) => write!(f, "\"{}\"", e.value),
            Expr::Bool(e) => write!(f, "{}", e.value),
            Expr::Ident(e) => f.write_str(&e.name),
            Expr::Prefix(e) => match e.op {
                PrefixOp::Neg => write!(f, "(-{})", e.rhs),
                PrefixOp::Not => write!(f, "(not {})", e.rhs),
            },
            Expr::Infix(e) => write!(f, "({} {} {})", e.lhs, e.op, e.rhs),
            Expr::Call(e) => {
                write!(f, "{}(", e.callee.name)?;
                for (i, arg) in e.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            },
        }
    }
}
