//! Configuration shapes loaded once into read-only maps (§5): the backend
//! system-device template table (§4.7) and the view-binding profile table
//! (§4.5). Parsing the surrounding YAML is `asdl_cli`'s job; this crate
//! only defines what a valid config looks like once parsed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single backend system-device template, e.g. `__subckt_header__`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDeviceTemplate {
    pub template: String,
}

/// `backend -> {system_devices: {<key>: {template: <string>}}}` (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub backend: String,
    pub system_devices: BTreeMap<String, SystemDeviceTemplate>,
    /// When set, an atom whose `pattern_origin` shows an integer
    /// `pattern_part` renders as `base[n]` at emission time only (§4.7
    /// ADR-0018); identity is unaffected.
    #[serde(default)]
    pub bracketed_numeric_rendering: bool,
}

/// Keys §4.7 requires to be present for a selected backend. Missing any of
/// these is fatal (`E-BACKEND-MISS`); missing optional keys is not.
pub const REQUIRED_SYSTEM_DEVICE_KEYS: &[&str] = &[
    "__netlist_header__",
    "__netlist_footer__",
    "__subckt_header__",
    "__subckt_footer__",
    "__subckt_call__",
];

impl BackendConfig {
    #[must_use]
    pub fn template(&self, key: &str) -> Option<&str> {
        self.system_devices.get(key).map(|t| t.template.as_str())
    }

    /// Validates that every key in `REQUIRED_SYSTEM_DEVICE_KEYS` is present
    /// with a `template` string. Returns the first missing key, if any.
    #[must_use]
    pub fn missing_required_key(&self) -> Option<&'static str> {
        REQUIRED_SYSTEM_DEVICE_KEYS
            .iter()
            .find(|key| !self.system_devices.contains_key(**key))
            .copied()
    }
}

/// One ordered rule inside a view profile (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRule {
    pub id: Option<String>,
    #[serde(rename = "match")]
    pub matcher: ViewRuleMatch,
    pub view: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewRuleMatch {
    pub path: Option<String>,
    pub inst: Option<String>,
    pub module: Option<String>,
}

/// A named view profile: a baseline `view_order` per logical cell plus
/// optional ordered override rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewProfile {
    pub view_order: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub rules: Vec<ViewRule>,
}

/// `profiles -> {<name>: {view_order, rules}}` (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    pub profiles: BTreeMap<String, ViewProfile>,
}

impl ViewConfig {
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&ViewProfile> {
        self.profiles.get(name)
    }
}

/// `.asdlrc` contents (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsdlrcConfig {
    #[serde(default)]
    pub lib_roots: Vec<String>,
    pub backend_config: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
