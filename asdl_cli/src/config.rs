//! `.asdlrc` discovery and backend/view config loading (§6).
//!
//! Library search order: CLI `--lib` → `.asdlrc` `lib_roots` →
//! `ASDL_LIB_PATH`. Backend config precedence: CLI → `ASDL_BACKEND_CONFIG`
//! → `.asdlrc` → built-in default.

use asdl_ir::config::{AsdlrcConfig, BackendConfig, ViewConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Walks upward from `start`'s ancestors looking for `.asdlrc`, returning
/// the first one found (closest wins).
#[must_use]
pub fn discover_asdlrc(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() { Some(start) } else { start.parent() };
    while let Some(d) = dir {
        let candidate = d.join(".asdlrc");
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

pub fn load_asdlrc(path: &Path) -> Result<AsdlrcConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_backend_config(path: &Path) -> Result<BackendConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_view_config(path: &Path) -> Result<ViewConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the backend config path per §6 precedence: CLI flag →
/// `ASDL_BACKEND_CONFIG` → `.asdlrc`'s `backend_config` → `None` (caller
/// falls back to a built-in default).
#[must_use]
pub fn resolve_backend_config_path(cli_flag: Option<&str>, asdlrc: Option<&AsdlrcConfig>) -> Option<PathBuf> {
    if let Some(flag) = cli_flag {
        return Some(PathBuf::from(flag));
    }
    if let Ok(env) = std::env::var("ASDL_BACKEND_CONFIG") {
        return Some(PathBuf::from(env));
    }
    asdlrc.and_then(|rc| rc.backend_config.as_ref()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn tempdir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("asdl_cli_test_{name}_{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn discovers_asdlrc_in_ancestor_directory() {
        let root = tempdir("discover");
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(".asdlrc"), "lib_roots: []\n").unwrap();

        let found = discover_asdlrc(&nested).unwrap();
        assert_eq!(found, root.join(".asdlrc"));
    }

    #[test]
    fn returns_none_when_no_asdlrc_exists() {
        let root = tempdir("discover_none");
        assert!(discover_asdlrc(&root).is_none());
    }

    #[test]
    fn cli_flag_takes_precedence_over_asdlrc() {
        let rc = AsdlrcConfig {
            lib_roots: vec![],
            backend_config: Some("rc_backend.yaml".into()),
            env: Default::default(),
        };
        let resolved = resolve_backend_config_path(Some("cli_backend.yaml"), Some(&rc));
        assert_eq!(resolved, Some(PathBuf::from("cli_backend.yaml")));
    }

    #[test]
    fn falls_back_to_asdlrc_backend_config() {
        let rc = AsdlrcConfig {
            lib_roots: vec![],
            backend_config: Some("rc_backend.yaml".into()),
            env: Default::default(),
        };
        let resolved = resolve_backend_config_path(None, Some(&rc));
        assert_eq!(resolved, Some(PathBuf::from("rc_backend.yaml")));
    }

    #[rstest]
    #[case(Some("cli.yaml"), Some("rc.yaml"), Some("cli.yaml"))]
    #[case(None, Some("rc.yaml"), Some("rc.yaml"))]
    #[case(None, None, None)]
    #[case(Some("cli.yaml"), None, Some("cli.yaml"))]
    fn resolve_backend_config_path_precedence(
        #[case] cli_flag: Option<&str>,
        #[case] rc_backend: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let rc = rc_backend.map(|b| AsdlrcConfig {
            lib_roots: vec![],
            backend_config: Some(b.to_string()),
            env: Default::default(),
        });
        let resolved = resolve_backend_config_path(cli_flag, rc.as_ref());
        assert_eq!(resolved, expected.map(PathBuf::from));
    }
}
