//! Boundary failures that prevent the Import Resolver from even starting
//! a DFS step — distinct from the `E04xx` compiler diagnostics the
//! resolver otherwise accumulates in the shared sink (§7).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
