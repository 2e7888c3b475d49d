//! `NetlistIR` — the flat, backend-focused DAG the Renderer consumes (§3,
//! §4.6). Orientation (ADR-0029) is deliberately absent: it is
//! visualizer-facing and has no place in this IR.

use crate::value::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A concrete `(cell, view)` pair chosen by the View Binder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realization {
    pub cell: String,
    pub view: Option<String>,
}

impl Realization {
    #[must_use]
    pub fn new(cell: impl Into<String>, view: Option<String>) -> Self {
        Self {
            cell: cell.into(),
            view,
        }
    }

    /// Default/undecorated realizations and `cell@default` are the same
    /// thing (§4.5): emit as `cell`.
    #[must_use]
    pub fn is_default_view(&self) -> bool {
        matches!(self.view.as_deref(), None | Some("default"))
    }
}

/// One statement in a module's body, in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetlistStmt {
    /// A primitive device instantiation, rendered via a backend template keyed
    /// by device name.
    DeviceCall {
        template_key: String,
        /// `{placeholder} -> value`, already rendered to text.
        bindings: BTreeMap<String, String>,
        conn_label: Option<String>,
    },
    /// A hierarchical instance call, rendered via `__subckt_call__` or
    /// `__subckt_call_params__` depending on whether `parameters` is empty
    /// (ADR-0040).
    SubcktCall {
        instance_name: String,
        target_emitted_name: String,
        connections: Vec<String>,
        parameters: Vec<(String, String)>,
    },
    /// `.param` style declaration for an entry-file global parameter (§4.6 ADR-0042).
    GlobalParamDecl { name: String, value: ParamValue },
}

/// Carries enough of an atom's `pattern_origin` (ADR-0026) forward into
/// `NetlistIR` for the Renderer to apply bracketed numeric rendering
/// (§4.7 ADR-0018) without re-deriving it from the atomized graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomRenderInfo {
    pub base_name: String,
    /// Integer substitution values from the atom's `pattern_parts`, in
    /// order; empty if the atom's pattern carried no numeric group.
    pub int_parts: Vec<i64>,
}

/// One realized module, ready to hand to a backend template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistModule {
    pub emitted_name: String,
    pub realization: Realization,
    pub ports: Vec<String>,
    /// Deterministic key order: rendered in lexical order at emission time.
    pub parameters: BTreeMap<String, ParamValue>,
    pub body: Vec<NetlistStmt>,
    pub is_top: bool,
    /// `literal -> pattern origin summary`, for every net/instance atom
    /// this module's body or port list can reference by literal (§4.6
    /// "atomized `pattern_origin` metadata flows unchanged").
    pub atom_origins: BTreeMap<String, AtomRenderInfo>,
}

/// The whole program, ready for the Renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistProgram {
    pub top: String,
    pub modules: Vec<NetlistModule>,
    pub globals: BTreeMap<String, ParamValue>,
}

impl NetlistProgram {
    #[must_use]
    pub fn module(&self, emitted_name: &str) -> Option<&NetlistModule> {
        self.modules.iter().find(|m| m.emitted_name == emitted_name)
    }
}
