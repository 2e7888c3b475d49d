//! `AtomizedGraph` — identical shape to `PatternedGraph`, but every
//! expression has been expanded into single-atom entities (§3). Each atom
//! carries `pattern_origin` as provenance only: identity is the expanded
//! literal, never the origin.

use crate::ids::{DeviceId, EndpointId, ExprId, FileId, InstId, ModuleId, NetId};
use crate::patterned::RefKind;
use crate::span::SourceSpan;
use crate::value::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single part of a pattern substitution, preserved as a typed sum so
/// downstream renderers can detect numeric semantics without re-parsing
/// (§4.3, ADR-0015/0017/0026).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternPart {
    Str(String),
    Int(i64),
}

/// Provenance for one expanded atom: which expression, which segment,
/// which position, and the substitution values that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternOrigin {
    pub expr_id: ExprId,
    pub segment_index: usize,
    pub atom_index: usize,
    pub base_name: String,
    pub pattern_parts: Vec<PatternPart>,
}

impl PatternOrigin {
    /// A literal atom has no groups at all: origin is itself, trivially.
    #[must_use]
    pub fn literal(expr_id: ExprId, base_name: impl Into<String>) -> Self {
        Self {
            expr_id,
            segment_index: 0,
            atom_index: 0,
            base_name: base_name.into(),
            pattern_parts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomNet {
    pub net_id: NetId,
    pub literal: String,
    pub port_introducing: bool,
    pub origin: PatternOrigin,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomInstance {
    pub inst_id: InstId,
    pub literal: String,
    pub ref_kind: RefKind,
    pub ref_module: Option<ModuleId>,
    pub ref_device: Option<DeviceId>,
    /// Fully expanded/broadcast parameter values, one per atom.
    pub parameters: IndexMap<String, ParamValue>,
    pub origin: PatternOrigin,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomEndpoint {
    pub endpoint_id: EndpointId,
    /// Literal of the net atom this endpoint resolved to after broadcast
    /// binding (§4.3 ADR-0019/0020).
    pub net_literal: String,
    pub inst_literal: String,
    pub port_literal: String,
    pub conn_label: Option<String>,
    /// Carried from the authored `!`-prefix (§4.4); an instance-default
    /// application checks this before tagging an explicit connection as
    /// an override.
    pub suppress_default_warning: bool,
    pub origin: PatternOrigin,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomizedModule {
    pub module_id: ModuleId,
    pub name: String,
    pub view: Option<String>,
    pub file_id: FileId,
    pub ports: Vec<String>,
    pub nets: Vec<AtomNet>,
    pub instances: Vec<AtomInstance>,
    pub parameters: IndexMap<String, ParamValue>,
    pub endpoints: Vec<AtomEndpoint>,
    pub span: SourceSpan,
}

impl AtomizedModule {
    /// Looks up an instance atom by its expanded literal name.
    #[must_use]
    pub fn instance(&self, literal: &str) -> Option<&AtomInstance> {
        self.instances.iter().find(|inst| inst.literal == literal)
    }

    #[must_use]
    pub fn net(&self, literal: &str) -> Option<&AtomNet> {
        self.nets.iter().find(|net| net.literal == literal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomizedFile {
    pub file_id: FileId,
    pub path: String,
    pub modules: IndexMap<ModuleId, AtomizedModule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomizedGraph {
    pub program: Vec<AtomizedFile>,
    pub global_parameters: IndexMap<String, ParamValue>,
}

impl AtomizedGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&AtomizedModule> {
        self.program.iter().find_map(|f| f.modules.get(&id))
    }

    pub fn modules(&self) -> impl Iterator<Item = &AtomizedModule> {
        self.program.iter().flat_map(|f| f.modules.values())
    }
}
