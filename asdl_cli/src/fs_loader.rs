//! Filesystem-backed `asdl_link::Loader`: reads a `.asdl` file from disk
//! and parses it via `crate::yaml`.

use crate::yaml::parse_file_ast;
use asdl_ir::ast::FileAst;
use asdl_ir::ids::FileId;
use asdl_link::{LinkError, Loader};
use std::path::Path;

/// The AST this loader hands back carries only synthetic spans (§1: YAML
/// surface parsing, including byte-offset tracking, is outside the
/// core's contract); the loader doesn't yet know the stable `FileId` the
/// Import Resolver will assign this file, so every span is stamped
/// against `FileId::from_raw(0)` and carries no real offsets.
#[derive(Debug, Default)]
pub struct FsLoader;

impl FsLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Loader for FsLoader {
    fn load(&self, path: &Path) -> Result<FileAst, LinkError> {
        let source = std::fs::read_to_string(path).map_err(|source| LinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_file_ast(path, &source, FileId::from_raw(0)).map_err(|err| LinkError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}
