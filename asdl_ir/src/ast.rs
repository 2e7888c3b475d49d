//! The parsed AST tree the core consumes (§1: "The core consumes ... a
//! parsed AST tree keyed to source spans"). YAML surface parsing is an
//! external collaborator; this module only defines the shape a loader
//! callback must hand back.
//!
//! Pattern-bearing strings (instance names, net names, endpoint lists,
//! parameter values) are kept as raw authoring text here — lexing into
//! `asdl_ir::pattern::PatternExpr` happens in `asdl_atomize`, after
//! `asdl_link`'s module-variable substitution (§4.2).

use crate::span::SourceSpan;
use crate::value::ParamValue;
use std::collections::BTreeMap;

/// A raw parameter value as authored: either a literal or a string that
/// may still contain a pattern or a `{variable}` reference.
#[derive(Debug, Clone, PartialEq)]
pub enum RawParamValue {
    Value(ParamValue),
    Pattern(String),
}

/// One file's worth of parsed AST, as handed back by the loader callback.
#[derive(Debug, Clone, Default)]
pub struct FileAst {
    pub path: String,
    /// `alias -> import path`, in declaration order.
    pub imports: Vec<(String, String)>,
    /// `alias -> module_name` (`model_alias` block, §4.1).
    pub model_alias: Vec<(String, String)>,
    pub modules: Vec<ModuleAst>,
    pub devices: Vec<DeviceAst>,
    /// Entry-file-only `global_parameters` (§4.6).
    pub global_parameters: BTreeMap<String, ParamValue>,
}

/// `cell` or `cell@view` (ADR-0032): identity is `cell`, `view` is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSymbol {
    pub cell: String,
    pub view: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModuleAst {
    pub symbol: ModuleSymbol,
    pub span: SourceSpan,
    /// Source of port order (§4.2); `ports: []` is valid, `ports:` (absent) is not.
    pub ports: Vec<PortAst>,
    pub nets: Vec<NetAst>,
    pub instances: Vec<InstanceAst>,
    /// Raw `{v}`-substitutable variables, resolved before pattern expansion.
    pub variables: BTreeMap<String, String>,
    /// Named pattern definitions referenced via `<@name>`.
    pub patterns: BTreeMap<String, PatternDefAst>,
    /// `$`-introduced nets contributed by `instance_defaults`, in module order (§4.4).
    pub instance_defaults: Vec<InstanceDefaultAst>,
}

#[derive(Debug, Clone)]
pub struct PortAst {
    pub name: String,
    pub span: SourceSpan,
}

/// A named pattern definition, optionally carrying a tagged axis id (ADR-0020).
#[derive(Debug, Clone)]
pub struct PatternDefAst {
    pub expr: String,
    pub axis_id: Option<String>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct NetAst {
    pub name_raw: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct InstanceAst {
    pub name_raw: String,
    pub ref_raw: String,
    pub parameters: BTreeMap<String, RawParamValue>,
    pub endpoints: Vec<EndpointAst>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct EndpointAst {
    /// The endpoint expression string, e.g. `M<P|N>.G`.
    pub expr_raw: String,
    pub net_raw: String,
    pub conn_label: Option<String>,
    /// `!`-prefixed tokens suppress the `instance_defaults` override warning (§4.4).
    pub suppress_default_warning: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct InstanceDefaultAst {
    pub port_raw: String,
    pub net_raw: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct DeviceAst {
    pub name: String,
    pub span: SourceSpan,
    pub ports: Vec<PortAst>,
    pub parameters: BTreeMap<String, RawParamValue>,
    pub variables: BTreeMap<String, String>,
    pub spice_template: String,
    pub pdk: Option<String>,
}
