//! opalc-util - Foundation types shared by every compiler phase.
//!
//! This crate provides source-location tracking ([`Pos`], [`Span`],
//! [`FileId`]), the registry of loaded source files ([`SourceMap`]), and the
//! diagnostic infrastructure ([`Diagnostic`], [`Handler`]) that the lexer,
//! parser and lowering engine all report into.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use span::{FileId, Pos, SourceFile, SourceMap, Span};
