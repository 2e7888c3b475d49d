//! Library search root resolution (§4.1, §6).
//!
//! Precedence, highest first: (1) the directory of the importing file;
//! (2) CLI `--lib` roots; (3) `.asdlrc` `lib_roots`; (4) `ASDL_LIB_PATH`.

use std::path::{Path, PathBuf};

/// The ordered list of roots an import is probed against, excluding the
/// importing file's own directory (added per-import by the resolver).
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    pub cli_roots: Vec<PathBuf>,
    pub asdlrc_roots: Vec<PathBuf>,
    pub env_roots: Vec<PathBuf>,
}

impl SearchRoots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cli_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.cli_roots = roots;
        self
    }

    #[must_use]
    pub fn with_asdlrc_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.asdlrc_roots = roots;
        self
    }

    /// Reads `ASDL_LIB_PATH`, splitting on the platform path-list separator.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Ok(raw) = std::env::var("ASDL_LIB_PATH") {
            self.env_roots = std::env::split_paths(&raw).collect();
        }
        self
    }

    /// The full probe list for an import declared inside `importing_file`,
    /// in precedence order: importing file's directory, CLI, `.asdlrc`, env.
    #[must_use]
    pub fn probe_list(&self, importing_file: &Path) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(dir) = importing_file.parent() {
            roots.push(dir.to_path_buf());
        }
        roots.extend(self.cli_roots.iter().cloned());
        roots.extend(self.asdlrc_roots.iter().cloned());
        roots.extend(self.env_roots.iter().cloned());
        roots
    }

    /// Resolves `import_path` against every root in `probe_list`, returning
    /// every root under which the file exists (possibly empty, possibly
    /// more than one — ambiguity is `E0447`, not-found is `E0441`).
    #[must_use]
    pub fn candidates(&self, importing_file: &Path, import_path: &str) -> Vec<PathBuf> {
        self.probe_list(importing_file)
            .into_iter()
            .map(|root| root.join(import_path))
            .filter(|candidate| candidate.exists())
            .collect()
    }
}
