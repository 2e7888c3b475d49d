//! `model_alias` resolution and the three-step instance-reference lookup
//! (§4.1).

use asdl_ir::ids::FileId;
use indexmap::IndexMap;

/// Where a `model_alias` target points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// A module/device defined in the same file.
    Local(String),
    /// `lib_alias.module_name`, resolved through an `imports` alias.
    Qualified { import_alias: String, module: String },
}

/// Parses a `model_alias` RHS (e.g. `"nfet"` or `"analog_lib.nfet_03v3"`)
/// without resolving it yet.
#[must_use]
pub fn parse_alias_target(raw: &str) -> AliasTarget {
    match raw.split_once('.') {
        Some((alias, module)) => AliasTarget::Qualified {
            import_alias: alias.to_string(),
            module: module.to_string(),
        },
        None => AliasTarget::Local(raw.to_string()),
    }
}

/// A file's resolved name environment (§4.1): its `imports` alias table
/// and its `model_alias` table, both fully resolved before any instance
/// reference in the file is looked up.
#[derive(Debug, Clone, Default)]
pub struct NameEnv {
    /// `import alias -> resolved file`.
    pub imports: IndexMap<String, FileId>,
    /// `model_alias key -> target`.
    pub model_alias: IndexMap<String, AliasTarget>,
}

/// Outcome of the three-step instance-reference lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    /// Resolved to a module/device in `file` named `name`.
    In { file: FileId, name: String },
}

impl NameEnv {
    /// Step 1+2+3 of §4.1's instance-reference resolution, given a
    /// predicate telling whether a name exists locally in a file (modules
    /// and devices share a namespace for this purpose).
    pub fn resolve_ref(
        &self,
        self_file: FileId,
        ref_raw: &str,
        exists_in_file: impl Fn(FileId, &str) -> bool,
    ) -> Option<ResolvedRef> {
        // Step 1: local modules/devices in the same file.
        if exists_in_file(self_file, ref_raw) {
            return Some(ResolvedRef::In {
                file: self_file,
                name: ref_raw.to_string(),
            });
        }

        // Step 2: model_alias indirection.
        if let Some(target) = self.model_alias.get(ref_raw) {
            return self.resolve_alias_target(self_file, target, &exists_in_file);
        }

        // Step 3: `alias.module` qualified form via imports.
        if let AliasTarget::Qualified { import_alias, module } = parse_alias_target(ref_raw) {
            if let Some(&file) = self.imports.get(&import_alias) {
                if exists_in_file(file, &module) {
                    return Some(ResolvedRef::In { file, name: module });
                }
            }
        }

        None
    }

    fn resolve_alias_target(
        &self,
        self_file: FileId,
        target: &AliasTarget,
        exists_in_file: &impl Fn(FileId, &str) -> bool,
    ) -> Option<ResolvedRef> {
        match target {
            // A `model_alias` pointing at a bare name lives in the same file.
            AliasTarget::Local(name) => exists_in_file(self_file, name).then(|| ResolvedRef::In {
                file: self_file,
                name: name.clone(),
            }),
            AliasTarget::Qualified { import_alias, module } => {
                let file = *self.imports.get(import_alias)?;
                exists_in_file(file, module).then(|| ResolvedRef::In {
                    file,
                    name: module.clone(),
                })
            }
        }
    }
}
