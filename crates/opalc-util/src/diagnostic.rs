//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! Every compiler stage reports into a single shared [`Handler`], threaded by
//! reference through the pipeline. Diagnostics are value types; nothing is
//! thrown across stage boundaries. The driver queries the handler after each
//! stage and aborts the pipeline on the first stage that produced errors.
//!
//! # Examples
//!
//! ```
//! use opalc_util::{Handler, Span};
//!
//! let handler = Handler::new();
//! handler.error(Span::DUMMY, "Syntax Error", "unexpected token");
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::span::{SourceMap, Span};

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that fails the stage that produced it.
    Error,
    /// A warning that doesn't prevent compilation.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with severity, taxonomy kind and location.
///
/// `kind` names the error class the language reports ("Lexical Error",
/// "Syntax Error", "Name Error", "Type Error", "Control-flow Error",
/// "Import Error"); `message` carries the detail.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// Taxonomy name, e.g. "Syntax Error".
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
    /// Source location.
    pub span: Span,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        level: Level,
        span: Span,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            kind: kind.into(),
            message: message.into(),
            span,
        }
    }

    /// Create an error diagnostic.
    pub fn error(span: Span, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, span, kind, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(span: Span, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, span, kind, message)
    }

    /// Render this diagnostic against the given source map, with a caret
    /// excerpt pointing at the offending range.
    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = format!("{}: {}\n", self.kind, self.message);

        let (name, line_text) = match sources.get(self.span.file) {
            Some(file) => (file.name.as_str(), file.line_text(self.span.start.line)),
            None => ("<unknown>", ""),
        };
        out.push_str(&format!(
            "File {}, line {}, column {}\n",
            name, self.span.start.line, self.span.start.column
        ));

        if !line_text.is_empty() {
            let col = self.span.start.column as usize;
            let width = if self.span.end.line == self.span.start.line {
                (self.span.end.column as usize).saturating_sub(col).max(1)
            } else {
                line_text.chars().count().saturating_sub(col).max(1)
            };
            out.push_str(&format!("\n    {}\n", line_text));
            out.push_str(&format!("    {}{}\n", " ".repeat(col), "^".repeat(width)));
        }

        out
    }
}

/// Shared sink for diagnostics.
///
/// The handler accumulates errors and warnings across stages behind a
/// `RefCell`, so it is shared as `&Handler` rather than passed mutably. The
/// `has_errors` flag is sticky: once any stage errors, every later boundary
/// check fails. [`report`](Handler::report) keeps a cursor over what it has
/// already rendered, so the driver can call it at every stage boundary
/// without reprinting earlier diagnostics.
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    /// Index of the first diagnostic not yet rendered by `report`.
    reported: Cell<usize>,
}

impl Handler {
    /// Create a new handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a pre-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Report an error.
    pub fn error(&self, span: Span, kind: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::error(span, kind, message));
    }

    /// Report a warning.
    pub fn warning(&self, span: Span, kind: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::warning(span, kind, message));
    }

    /// Check if any errors have been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Get a copy of all diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Drop all diagnostics and reset the report cursor.
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
        self.reported.set(0);
    }

    /// Renders the diagnostics added since the last report, warnings first,
    /// then errors, and advances the cursor past them. Returns an empty
    /// string when nothing new was recorded.
    fn render_unreported(&self, sources: &SourceMap) -> String {
        let diagnostics = self.diagnostics.borrow();
        let fresh = &diagnostics[self.reported.get()..];
        self.reported.set(diagnostics.len());

        let mut out = String::new();

        let warnings: Vec<_> = fresh.iter().filter(|d| d.level == Level::Warning).collect();
        if !warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &warnings {
                out.push_str(&format!(" {}\n", warning.render(sources)));
            }
        }

        let errors: Vec<_> = fresh.iter().filter(|d| d.level == Level::Error).collect();
        if !errors.is_empty() {
            out.push_str("\nErrors:\n");
            for error in &errors {
                out.push_str(&format!(" {}\n", error.render(sources)));
            }
        }

        out
    }

    /// Prints any not-yet-reported diagnostics to stderr, warnings before
    /// errors. Returns whether the stage succeeded (no errors so far, new
    /// or old). Safe to call at every stage boundary: each diagnostic is
    /// printed exactly once.
    pub fn report(&self, sources: &SourceMap) -> bool {
        let rendered = self.render_unreported(sources);
        if !rendered.is_empty() {
            eprint!("{}", rendered);
        }
        !self.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{FileId, Pos};

    #[test]
    fn test_handler_starts_clean() {
        let handler = Handler::new();
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
        assert_eq!(handler.warning_count(), 0);
    }

    #[test]
    fn test_handler_error_is_sticky() {
        let handler = Handler::new();
        handler.error(Span::DUMMY, "Syntax Error", "unexpected token");
        assert!(handler.has_errors());
        handler.warning(Span::DUMMY, "Import Error", "already imported");
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.warning_count(), 1);
    }

    #[test]
    fn test_warnings_alone_do_not_fail() {
        let handler = Handler::new();
        handler.warning(Span::DUMMY, "Import Error", "already imported");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_render_points_at_range() {
        let mut sources = SourceMap::new();
        let file = sources.add("main.opal", "var x: int = ;\n");
        let span = Span::new(Pos::new(13, 1, 13), Pos::new(14, 1, 14), file);
        let diag = Diagnostic::error(span, "Syntax Error", "expected expression");
        let rendered = diag.render(&sources);

        assert!(rendered.contains("Syntax Error: expected expression"));
        assert!(rendered.contains("File main.opal, line 1, column 13"));
        assert!(rendered.contains("var x: int = ;"));
        // Caret sits under the semicolon.
        assert!(rendered.contains(&format!("    {}^", " ".repeat(13))));
    }

    #[test]
    fn test_diagnostics_snapshot() {
        let handler = Handler::new();
        handler.error(Span::DUMMY, "Name Error", "x not defined");
        let diags = handler.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, "Name Error");
    }

    #[test]
    fn test_report_renders_each_diagnostic_once() {
        let sources = SourceMap::new();
        let handler = Handler::new();
        handler.error(Span::DUMMY, "Syntax Error", "unexpected token");

        let first = handler.render_unreported(&sources);
        assert!(first.contains("Syntax Error"));

        // A second boundary check with nothing new renders nothing.
        assert!(handler.render_unreported(&sources).is_empty());

        // Later diagnostics render without repeating the earlier ones.
        handler.error(Span::DUMMY, "Name Error", "x not defined");
        let second = handler.render_unreported(&sources);
        assert!(second.contains("Name Error"));
        assert!(!second.contains("Syntax Error"));
    }

    #[test]
    fn test_report_prints_new_warnings_after_earlier_errors() {
        let sources = SourceMap::new();
        let handler = Handler::new();
        handler.error(Span::DUMMY, "Syntax Error", "unexpected token");
        let _ = handler.render_unreported(&sources);

        handler.warning(Span::DUMMY, "Import Warning", "already imported");
        let rendered = handler.render_unreported(&sources);
        assert!(rendered.contains("already imported"));
        assert!(!rendered.contains("Syntax Error"));
    }

    #[test]
    fn test_warnings_render_before_errors_within_a_batch() {
        let sources = SourceMap::new();
        let handler = Handler::new();
        handler.error(Span::DUMMY, "Type Error", "bad operand");
        handler.warning(Span::DUMMY, "Import Warning", "already imported");

        let rendered = handler.render_unreported(&sources);
        let warning_at = rendered.find("Warnings:").expect("warnings section");
        let error_at = rendered.find("Errors:").expect("errors section");
        assert!(warning_at < error_at);
    }

    #[test]
    fn test_clear_resets_report_cursor() {
        let sources = SourceMap::new();
        let handler = Handler::new();
        handler.error(Span::DUMMY, "Syntax Error", "unexpected token");
        let _ = handler.render_unreported(&sources);

        handler.clear();
        assert!(!handler.has_errors());
        handler.error(Span::DUMMY, "Name Error", "x not defined");
        assert!(handler.render_unreported(&sources).contains("Name Error"));
    }
}
