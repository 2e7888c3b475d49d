//! NetlistIR Lowerer (§4.6): projects the reachable, view-bound
//! realizations into a flat `NetlistProgram` with deterministic orderings.

use crate::error::BindError;
use crate::view::BoundGraph;
use asdl_ir::atomized::{AtomInstance, AtomizedGraph, AtomizedModule, PatternOrigin, PatternPart};
use asdl_ir::ids::DeviceId;
use asdl_ir::netlist::{AtomRenderInfo, NetlistModule, NetlistProgram, NetlistStmt};
use asdl_ir::patterned::{Device, RefKind};
use asdl_ir::value::ParamValue;
use std::collections::{BTreeMap, HashMap};

/// Device definitions, keyed by id, supplied by the caller from the
/// linked `PatternedGraph` (devices are never pattern-expanded, so they
/// have no home on `AtomizedGraph`).
pub type DeviceTable<'a> = HashMap<DeviceId, &'a Device>;

/// Lowers every realization in `bound` into a `NetlistModule`, in the
/// same DFS order the View Binder produced (children emitted before
/// parents).
pub fn lower_graph(
    graph: &AtomizedGraph,
    devices: &DeviceTable<'_>,
    bound: &BoundGraph,
) -> Result<NetlistProgram, BindError> {
    let mut modules = Vec::with_capacity(bound.realizations.len());
    for realized in &bound.realizations {
        let Some(module) = graph.module(realized.module_id) else {
            continue;
        };
        modules.push(lower_module(
            graph,
            devices,
            bound,
            module,
            &realized.emitted_name,
            realized.is_top,
            &graph.global_parameters,
        )?);
    }

    Ok(NetlistProgram {
        top: bound.top_emitted_name.clone(),
        modules,
        globals: graph
            .global_parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}

#[allow(clippy::too_many_arguments)]
fn lower_module(
    graph: &AtomizedGraph,
    devices: &DeviceTable<'_>,
    bound: &BoundGraph,
    module: &AtomizedModule,
    emitted_name: &str,
    is_top: bool,
    globals: &indexmap::IndexMap<String, ParamValue>,
) -> Result<NetlistModule, BindError> {
    let mut connections: HashMap<&str, BTreeMap<&str, &str>> = HashMap::new();
    for ep in &module.endpoints {
        connections
            .entry(ep.inst_literal.as_str())
            .or_default()
            .insert(ep.port_literal.as_str(), ep.net_literal.as_str());
    }

    let mut body = Vec::with_capacity(module.instances.len());
    for inst in &module.instances {
        body.push(lower_instance(graph, devices, bound, inst, &connections, globals)?);
    }

    let parameters = module
        .parameters
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut atom_origins = BTreeMap::new();
    for net in &module.nets {
        atom_origins.insert(net.literal.clone(), render_info(&net.origin));
    }
    for inst in &module.instances {
        atom_origins.insert(inst.literal.clone(), render_info(&inst.origin));
    }

    Ok(NetlistModule {
        emitted_name: emitted_name.to_string(),
        realization: asdl_ir::netlist::Realization::new(module.name.clone(), module.view.clone()),
        ports: module.ports.clone(),
        parameters,
        body,
        is_top,
        atom_origins,
    })
}

/// Projects a `pattern_origin`'s integer substitution values forward for
/// the Renderer's bracketed-numeric-rendering policy (ADR-0018); string
/// parts carry no bracketing information and are dropped.
fn render_info(origin: &PatternOrigin) -> AtomRenderInfo {
    AtomRenderInfo {
        base_name: origin.base_name.clone(),
        int_parts: origin
            .pattern_parts
            .iter()
            .filter_map(|p| match p {
                PatternPart::Int(n) => Some(*n),
                PatternPart::Str(_) => None,
            })
            .collect(),
    }
}

fn lower_instance(
    graph: &AtomizedGraph,
    devices: &DeviceTable<'_>,
    bound: &BoundGraph,
    inst: &AtomInstance,
    connections: &HashMap<&str, BTreeMap<&str, &str>>,
    globals: &indexmap::IndexMap<String, ParamValue>,
) -> Result<NetlistStmt, BindError> {
    let empty = BTreeMap::new();
    let pins = connections.get(inst.literal.as_str()).unwrap_or(&empty);

    match inst.ref_kind {
        RefKind::Device => {
            let device = inst.ref_device.and_then(|id| devices.get(&id));
            let template_key = device.map_or_else(|| inst.literal.clone(), |d| d.name.clone());

            let mut bindings: BTreeMap<String, String> = BTreeMap::new();
            bindings.insert("name".to_string(), inst.literal.clone());
            for (port, net) in pins {
                bindings.insert((*port).to_string(), (*net).to_string());
            }
            for (pname, pvalue) in &inst.parameters {
                bindings.insert(pname.clone(), resolve_global_refs(pvalue, globals)?);
            }

            Ok(NetlistStmt::DeviceCall {
                template_key,
                bindings,
                conn_label: None,
            })
        }
        RefKind::Module => {
            let target_module = inst.ref_module.and_then(|id| graph.module(id));
            let target_emitted_name = inst
                .ref_module
                .and_then(|id| bound.emitted_name_for(id))
                .map(str::to_string)
                .ok_or_else(|| BindError::UnresolvedRealization {
                    inst: inst.literal.clone(),
                    cell: target_module.map(|m| m.name.clone()).unwrap_or_default(),
                    view: target_module.and_then(|m| m.view.clone()),
                })?;

            let port_order: Vec<&str> = target_module
                .map(|m| m.ports.iter().map(String::as_str).collect())
                .unwrap_or_default();
            let connections_out: Vec<String> = port_order
                .iter()
                .map(|port| pins.get(port).map(|n| (*n).to_string()).unwrap_or_default())
                .collect();

            let mut parameters = Vec::with_capacity(inst.parameters.len());
            let mut sorted: Vec<_> = inst.parameters.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            for (pname, pvalue) in sorted {
                parameters.push((pname.clone(), resolve_global_refs(pvalue, globals)?));
            }

            Ok(NetlistStmt::SubcktCall {
                instance_name: inst.literal.clone(),
                target_emitted_name,
                connections: connections_out,
                parameters,
            })
        }
    }
}

/// Resolves `!{name}` global-parameter references inside a parameter
/// value's textual form (§4.6 ADR-0042). Non-string values never contain
/// references and pass through unchanged.
fn resolve_global_refs(value: &ParamValue, globals: &indexmap::IndexMap<String, ParamValue>) -> Result<String, BindError> {
    let ParamValue::String(s) = value else {
        return Ok(value.to_string());
    };
    if !s.contains("!{") {
        return Ok(s.clone());
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s.as_str();
    while let Some(start) = rest.find("!{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = &after[..end];
        if !globals.contains_key(name) {
            return Err(BindError::UndefinedGlobal(name.to_string()));
        }
        out.push('{');
        out.push_str(name);
        out.push('}');
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
