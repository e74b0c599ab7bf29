//! Error types for AST-to-IR lowering.
//!
//! User-level problems (undefined names, bad operand types, control flow
//! outside loops) go through the shared diagnostic handler and surface here
//! only as [`LowerError::Reported`], letting the lowering engine continue
//! best-effort through the rest of the function. The other variants are
//! hard failures that abort lowering.

use thiserror::Error;

/// Error type for lowering operations.
#[derive(Debug, Error)]
pub enum LowerError {
    /// A diagnostic was already recorded in the handler; the current
    /// statement is abandoned and lowering continues.
    #[error("diagnostic already reported")]
    Reported,

    /// An LLVM builder operation failed.
    #[error("LLVM builder operation failed: {0}")]
    Builder(#[from] inkwell::builder::BuilderError),

    /// An imported file failed its own lex/parse; the importing compilation
    /// aborts immediately.
    #[error("imported file '{0}' failed to compile")]
    ImportFailed(String),

    /// Internal error - indicates a bug.
    #[error("internal lowering error: {0}")]
    Internal(String),
}

/// Result type alias for lowering operations.
pub type Result<T> = std::result::Result<T, LowerError>;
