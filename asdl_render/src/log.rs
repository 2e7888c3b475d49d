//! Compile Log (§4.8): a JSON sidecar artifact capturing view bindings,
//! the emission name map, warnings, and diagnostics for one compile.

use asdl_ir::diagnostics::{Diagnostic, Diagnostics, Severity};
use serde::{Deserialize, Serialize};

/// Bumped whenever the on-disk shape of the compile log changes in a
/// way a downstream consumer needs to branch on.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewBindingEntry {
    pub path: String,
    pub inst: String,
    pub cell: String,
    pub view: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionNameEntry {
    pub cell: String,
    pub view: Option<String>,
    pub emitted_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileLog {
    pub schema_version: u32,
    pub view_bindings: Vec<ViewBindingEntry>,
    pub emission_name_map: Vec<EmissionNameEntry>,
    pub warnings: Vec<Diagnostic>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileLog {
    #[must_use]
    pub fn new(
        view_bindings: Vec<ViewBindingEntry>,
        emission_name_map: Vec<EmissionNameEntry>,
        diagnostics: &Diagnostics,
    ) -> Self {
        let sorted = diagnostics.sorted();
        let warnings = sorted.iter().filter(|d| d.severity == Severity::Warning).cloned().collect();
        Self {
            schema_version: SCHEMA_VERSION,
            view_bindings,
            emission_name_map,
            warnings,
            diagnostics: sorted,
        }
    }

    /// Serializes to the on-disk JSON form (`<entry>.log.json` by default,
    /// §4.8; path selection is the CLI's job).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
