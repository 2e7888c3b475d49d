//! YAML authoring-surface parsing (§1 "out of scope / external
//! collaborators"). This module owns the one thing the core explicitly
//! does not: turning a `.asdl` YAML document into the `FileAst` shape
//! `asdl_link::Loader` hands the core. Structured and inline-shorthand
//! instance/endpoint forms both normalize to the same `FileAst` fields
//! (ADR-0031).

use asdl_ir::ast::{
    DeviceAst, EndpointAst, FileAst, InstanceAst, InstanceDefaultAst, ModuleAst, ModuleSymbol, NetAst, PatternDefAst,
    PortAst, RawParamValue,
};
use asdl_ir::ids::FileId;
use asdl_ir::span::SourceSpan;
use asdl_ir::value::ParamValue;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YamlError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("module `{0}` has an invalid symbol: at most one `@` is allowed")]
    InvalidModuleSymbol(String),
}

#[derive(Debug, Deserialize)]
struct DocAst {
    #[serde(default)]
    imports: IndexMap<String, String>,
    #[serde(default)]
    model_alias: IndexMap<String, String>,
    #[serde(default)]
    global_parameters: BTreeMap<String, ParamValue>,
    #[serde(default)]
    modules: IndexMap<String, ModuleDoc>,
    #[serde(default)]
    devices: IndexMap<String, DeviceDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct ModuleDoc {
    ports: Vec<String>,
    #[serde(default)]
    nets: Vec<String>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    #[serde(default)]
    patterns: IndexMap<String, PatternDefDoc>,
    #[serde(default)]
    instance_defaults: IndexMap<String, String>,
    #[serde(default)]
    instances: IndexMap<String, InstanceDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatternDefDoc {
    Bare(String),
    Tagged { expr: String, tag: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstanceDoc {
    /// `ref param=value ...` inline shorthand (ADR-0031).
    Inline(String),
    Structured {
        #[serde(rename = "ref")]
        reference: String,
        #[serde(default)]
        parameters: BTreeMap<String, RawValueDoc>,
        #[serde(default)]
        endpoints: Vec<EndpointDoc>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValueDoc {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EndpointDoc {
    /// `"M<P|N>.G : IN"`, optionally suffixed with `#label`.
    Inline(String),
    Structured {
        expr: String,
        net: String,
        label: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct DeviceDoc {
    #[serde(default)]
    ports: Vec<String>,
    #[serde(default)]
    parameters: BTreeMap<String, RawValueDoc>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    spice_template: String,
    pdk: Option<String>,
}

impl From<RawValueDoc> for RawParamValue {
    fn from(doc: RawValueDoc) -> Self {
        match doc {
            RawValueDoc::Int(v) => RawParamValue::Value(ParamValue::Int(v)),
            RawValueDoc::Float(v) => RawParamValue::Value(ParamValue::Float(v)),
            RawValueDoc::Bool(v) => RawParamValue::Value(ParamValue::Bool(v)),
            RawValueDoc::Str(s) => {
                if s.contains('<') || s.contains('{') {
                    RawParamValue::Pattern(s)
                } else {
                    RawParamValue::Value(ParamValue::String(s))
                }
            }
        }
    }
}

/// Parses a `.asdl` YAML document's bytes into a `FileAst`, assigning a
/// zero-width span per entity (YAML parsers in this pack don't carry
/// byte offsets through `serde_yaml`; a real implementation would swap
/// to a span-preserving parser here).
pub fn parse_file_ast(path: &Path, source: &str, file_id: FileId) -> Result<FileAst, YamlError> {
    let doc: DocAst = serde_yaml::from_str(source).map_err(|source| YamlError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let span = SourceSpan::synthetic(file_id);

    let mut modules = Vec::with_capacity(doc.modules.len());
    for (symbol_raw, module_doc) in doc.modules {
        modules.push(build_module(&symbol_raw, module_doc, span)?);
    }

    let mut devices = Vec::with_capacity(doc.devices.len());
    for (name, device_doc) in doc.devices {
        devices.push(DeviceAst {
            name,
            span,
            ports: device_doc.ports.into_iter().map(|name| PortAst { name, span }).collect(),
            parameters: device_doc.parameters.into_iter().map(|(k, v)| (k, v.into())).collect(),
            variables: device_doc.variables,
            spice_template: device_doc.spice_template,
            pdk: device_doc.pdk,
        });
    }

    Ok(FileAst {
        path: path.to_string_lossy().to_string(),
        imports: doc.imports.into_iter().collect(),
        model_alias: doc.model_alias.into_iter().collect(),
        modules,
        devices,
        global_parameters: doc.global_parameters,
    })
}

fn build_module(symbol_raw: &str, doc: ModuleDoc, span: SourceSpan) -> Result<ModuleAst, YamlError> {
    let symbol = parse_symbol(symbol_raw)?;

    let mut instances = Vec::with_capacity(doc.instances.len());
    for (name_raw, inst_doc) in doc.instances {
        instances.push(build_instance(name_raw, inst_doc, span));
    }

    Ok(ModuleAst {
        symbol,
        span,
        ports: doc.ports.into_iter().map(|name| PortAst { name, span }).collect(),
        nets: doc.nets.into_iter().map(|name_raw| NetAst { name_raw, span }).collect(),
        instances,
        variables: doc.variables,
        patterns: doc
            .patterns
            .into_iter()
            .map(|(name, def)| {
                let (expr, axis_id) = match def {
                    PatternDefDoc::Bare(expr) => (expr, None),
                    PatternDefDoc::Tagged { expr, tag } => (expr, tag),
                };
                (name, PatternDefAst { expr, axis_id, span })
            })
            .collect(),
        instance_defaults: doc
            .instance_defaults
            .into_iter()
            .map(|(port_raw, net_raw)| InstanceDefaultAst {
                port_raw,
                net_raw,
                span,
            })
            .collect(),
    })
}

fn build_instance(name_raw: String, doc: InstanceDoc, span: SourceSpan) -> InstanceAst {
    match doc {
        InstanceDoc::Inline(inline) => {
            let (reference, parameters) = parse_inline_instance(&inline);
            InstanceAst {
                name_raw,
                ref_raw: reference,
                parameters,
                endpoints: Vec::new(),
                span,
            }
        }
        InstanceDoc::Structured {
            reference,
            parameters,
            endpoints,
        } => InstanceAst {
            name_raw,
            ref_raw: reference,
            parameters: parameters.into_iter().map(|(k, v)| (k, v.into())).collect(),
            endpoints: endpoints.into_iter().map(|ep| build_endpoint(ep, span)).collect(),
            span,
        },
    }
}

fn build_endpoint(doc: EndpointDoc, span: SourceSpan) -> EndpointAst {
    match doc {
        EndpointDoc::Inline(inline) => {
            let (expr_raw, rest) = inline.split_once(':').unwrap_or((inline.as_str(), ""));
            let (net_part, label) = match rest.split_once('#') {
                Some((net, label)) => (net.trim(), Some(label.trim().to_string())),
                None => (rest.trim(), None),
            };
            let expr_trimmed = expr_raw.trim();
            let suppress_default_warning = expr_trimmed.starts_with('!');
            EndpointAst {
                expr_raw: expr_trimmed.trim_start_matches('!').to_string(),
                net_raw: net_part.to_string(),
                conn_label: label,
                suppress_default_warning,
                span,
            }
        }
        EndpointDoc::Structured { expr, net, label } => {
            let suppress_default_warning = expr.starts_with('!');
            EndpointAst {
                expr_raw: expr.trim_start_matches('!').to_string(),
                net_raw: net,
                conn_label: label,
                suppress_default_warning,
                span,
            }
        }
    }
}

/// `ref k=v k2=v2` shorthand (ADR-0031). Values are parsed as `int |
/// float | bool`, falling back to string/pattern.
fn parse_inline_instance(inline: &str) -> (String, BTreeMap<String, RawParamValue>) {
    let mut parts = inline.split_whitespace();
    let reference = parts.next().unwrap_or_default().to_string();
    let mut parameters = BTreeMap::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            parameters.insert(key.to_string(), parse_inline_value(value));
        }
    }
    (reference, parameters)
}

fn parse_inline_value(value: &str) -> RawParamValue {
    if let Ok(v) = value.parse::<i64>() {
        return RawParamValue::Value(ParamValue::Int(v));
    }
    if let Ok(v) = value.parse::<f64>() {
        return RawParamValue::Value(ParamValue::Float(v));
    }
    if let Ok(v) = value.parse::<bool>() {
        return RawParamValue::Value(ParamValue::Bool(v));
    }
    if value.contains('<') || value.contains('{') {
        return RawParamValue::Pattern(value.to_string());
    }
    RawParamValue::Value(ParamValue::String(value.to_string()))
}

/// `cell` or `cell@view` (ADR-0032).
fn parse_symbol(raw: &str) -> Result<ModuleSymbol, YamlError> {
    let mut parts = raw.splitn(3, '@');
    let cell = parts.next().unwrap_or_default().to_string();
    let view = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return Err(YamlError::InvalidModuleSymbol(raw.to_string()));
    }
    Ok(ModuleSymbol { cell, view })
}
