//! The injected callback that turns a resolved path into a parsed AST.
//! YAML surface parsing lives outside the core (§1); the core only needs
//! this trait's contract.

use crate::error::LinkError;
use asdl_ir::ast::FileAst;
use std::path::Path;

/// Loads and parses one ASDL source file. Implementations own file-handle
/// lifetime: handles are released before `load` returns (§5 "Resource
/// acquisition is scoped").
pub trait Loader {
    fn load(&self, path: &Path) -> Result<FileAst, LinkError>;
}

/// A `Loader` backed by an in-memory map, used by tests and by the CLI's
/// `query` subcommands when operating on an already-parsed fixture.
#[derive(Debug, Default)]
pub struct MockLoader {
    files: std::collections::HashMap<std::path::PathBuf, FileAst>,
}

impl MockLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<std::path::PathBuf>, ast: FileAst) -> Self {
        self.files.insert(path.into(), ast);
        self
    }
}

impl Loader for MockLoader {
    fn load(&self, path: &Path) -> Result<FileAst, LinkError> {
        self.files.get(path).cloned().ok_or_else(|| LinkError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not in MockLoader"),
        })
    }
}
