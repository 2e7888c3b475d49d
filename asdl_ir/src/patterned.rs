//! `PatternedGraph` — the root of the linked program (§3). Every
//! pattern-bearing string has been registered in a module's
//! `PatternTable` under a fresh `ExprId`, but no pattern has been
//! expanded yet.

use crate::ids::{DeviceId, EndpointId, ExprId, FileId, InstId, ModuleId, NetId};
use crate::pattern::{NamedPatternDef, PatternTable};
use crate::span::SourceSpan;
use crate::value::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An instance-parameter value before pattern expansion: either already a
/// concrete `ParamValue`, or a pattern expression that will expand to one
/// value per atom (broadcasting if it expands to exactly one, §4.3 ADR-0010).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamBinding {
    Value(ParamValue),
    Pattern(ExprId),
}

/// How an instance's `ref_raw` resolved (§4.1). `ref_raw` is retained
/// solely for diagnostics (§9 "Instance references").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    Module,
    Device,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub inst_id: InstId,
    pub name_expr_id: ExprId,
    pub ref_kind: RefKind,
    pub ref_raw: String,
    pub ref_module: Option<ModuleId>,
    pub ref_device: Option<DeviceId>,
    pub parameters: IndexMap<String, ParamBinding>,
    pub span: SourceSpan,
}

impl Instance {
    /// The resolved target, as a `(kind, module-or-device)` pair. Populated
    /// by the Import Resolver's three-step lookup (§4.1); unresolved
    /// instances never make it into a `PatternedGraph` (resolution failure
    /// is `E0448` and aborts before this graph is built, §4.9).
    #[must_use]
    pub fn resolved_module(&self) -> Option<ModuleId> {
        self.ref_module
    }

    #[must_use]
    pub fn resolved_device(&self) -> Option<DeviceId> {
        self.ref_device
    }
}

/// A `$`-prefixed net name marks it as port-introducing (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    pub net_id: NetId,
    pub name_expr_id: ExprId,
    pub port_introducing: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub endpoint_id: EndpointId,
    pub net_id: NetId,
    pub port_expr_id: ExprId,
    pub conn_label: Option<String>,
    pub suppress_default_warning: bool,
    pub span: SourceSpan,
}

/// A module-level default connection (§4.4): any instance in the module
/// exposing `port` and lacking an explicit endpoint for it is connected to
/// `net` during atomization. An instance that *does* connect the port
/// explicitly overrides the default instead, surfacing a warning unless
/// the connection is `!`-prefixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDefault {
    pub port_expr_id: ExprId,
    pub net_id: NetId,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub module_id: ModuleId,
    pub name: String,
    pub view: Option<String>,
    pub file_id: FileId,
    /// Source of port order; never re-sorted by any later pass.
    pub ports: Vec<String>,
    pub nets: Vec<Net>,
    pub instances: Vec<Instance>,
    pub parameters: IndexMap<String, ParamValue>,
    pub variables: IndexMap<String, String>,
    pub endpoints: Vec<Endpoint>,
    pub instance_defaults: Vec<InstanceDefault>,
    pub pattern_table: PatternTable,
    pub named_patterns: IndexMap<String, NamedPatternDef>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: DeviceId,
    pub name: String,
    pub ports: Vec<String>,
    pub parameters: IndexMap<String, ParamValue>,
    pub variables: IndexMap<String, String>,
    pub spice_template: String,
    pub pdk: Option<String>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub file_id: FileId,
    pub path: String,
    pub modules: IndexMap<ModuleId, Module>,
    pub devices: IndexMap<DeviceId, Device>,
}

/// The root of the linked program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternedGraph {
    pub program: Vec<File>,
    /// Entry-file global parameters (§4.6), carried through unchanged.
    pub global_parameters: IndexMap<String, ParamValue>,
}

impl PatternedGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a module by id across all files.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.program.iter().find_map(|f| f.modules.get(&id))
    }

    /// Finds a device by id across all files.
    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.program.iter().find_map(|f| f.devices.get(&id))
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.program.iter().flat_map(|f| f.modules.values())
    }
}
