//! Registry of loaded source files.
//!
//! Imports pull additional files into a compilation, so diagnostics carry a
//! [`FileId`](super::FileId) and are rendered against the file registered
//! here rather than against whatever text a stage happened to be looking at.

use super::FileId;

/// A single loaded source file.
#[derive(Debug)]
pub struct SourceFile {
    /// Display name (usually the path the file was read from).
    pub name: String,
    /// Full source text.
    pub src: String,
}

impl SourceFile {
    /// Returns the text of the given 1-based line, without its trailing
    /// newline. Returns an empty string for out-of-range lines.
    pub fn line_text(&self, line: u32) -> &str {
        self.src
            .lines()
            .nth(line.saturating_sub(1) as usize)
            .unwrap_or("")
    }
}

/// All source files loaded during one compilation.
///
/// Files are registered as they are read (the root file first, then each
/// import) and addressed by the [`FileId`] handed back from [`add`].
///
/// [`add`]: SourceMap::add
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn add(&mut self, name: impl Into<String>, src: impl Into<String>) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(SourceFile {
            name: name.into(),
            src: src.into(),
        });
        id
    }

    /// Look up a file by id.
    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no files have been registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
