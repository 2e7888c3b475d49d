//! Compile driver state machine (§4.9):
//! `Parsed -> Linked -> Patterned -> Atomized -> Verified -> Bound ->
//! Lowered -> Rendered -> Logged`. Every transition is total: failure
//! produces `DriverOutcome::Aborted` with the diagnostics accumulated so
//! far and the last graph successfully built, never a panic or a
//! propagated exception.

use asdl_atomize::{atomize_graph, verify_graph, DeviceTable as AtomizeDeviceTable};
use asdl_bind::{bind_views, lower_graph, BoundGraph, DeviceTable as BindDeviceTable};
use asdl_ir::atomized::AtomizedGraph;
use asdl_ir::config::{BackendConfig, ViewProfile};
use asdl_ir::diagnostics::Diagnostics;
use asdl_ir::ids::DeviceId;
use asdl_ir::netlist::NetlistProgram;
use asdl_ir::patterned::{Device, PatternedGraph};
use asdl_link::{link, Loader, SearchRoots};
use asdl_render::{render_program, CompileLog, EmissionNameEntry, ViewBindingEntry};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// The last graph the driver successfully produced before aborting, kept
/// around for inspection tooling (Query/Visualizer, §4.9).
pub enum PartialGraph {
    None,
    Patterned(PatternedGraph),
    Atomized(AtomizedGraph),
    Bound {
        atomized: AtomizedGraph,
        bound: BoundGraph,
    },
    Lowered(NetlistProgram),
}

pub enum DriverOutcome {
    Logged {
        netlist_text: String,
        log: CompileLog,
    },
    Aborted {
        stage: &'static str,
        diagnostics: Diagnostics,
        partial: PartialGraph,
    },
}

pub struct CompileRequest<'a> {
    pub entry_path: &'a Path,
    pub loader: &'a dyn Loader,
    pub roots: SearchRoots,
    pub backend_config: &'a BackendConfig,
    pub view_profile: &'a ViewProfile,
    pub top_cell: &'a str,
    pub top_view: Option<&'a str>,
}

/// Runs the full pipeline for `request`, producing rendered text and a
/// compile log on success or an `Aborted` outcome with the deepest
/// partial graph reached.
pub fn compile(request: CompileRequest<'_>) -> DriverOutcome {
    info!(entry = %request.entry_path.display(), "starting compile");

    let (patterned, mut diags) = link(request.entry_path, request.loader, &request.roots);
    let Some(patterned) = patterned else {
        warn!(errors = diags.len(), "link stage failed");
        return DriverOutcome::Aborted {
            stage: "Linked",
            diagnostics: diags,
            partial: PartialGraph::None,
        };
    };

    let mut atomized = atomize_graph(&patterned, &mut diags);
    if diags.has_errors() {
        warn!(errors = diags.len(), "atomize stage failed");
        return DriverOutcome::Aborted {
            stage: "Atomized",
            diagnostics: diags,
            partial: PartialGraph::Patterned(patterned),
        };
    }

    let devices = device_table(&patterned);
    let atomize_devices: AtomizeDeviceTable<'_> = devices.clone();
    verify_graph(&mut atomized, &atomize_devices, &mut diags);
    if diags.has_errors() {
        warn!(errors = diags.len(), "verify stage failed");
        return DriverOutcome::Aborted {
            stage: "Verified",
            diagnostics: diags,
            partial: PartialGraph::Atomized(atomized),
        };
    }

    let bound = match bind_views(&atomized, request.top_cell, request.top_view, request.view_profile) {
        Ok(bound) => bound,
        Err(err) => {
            warn!(%err, "bind stage failed");
            diags.push(asdl_ir::diagnostics::Diagnostic::error("G01", 6, err.to_string()));
            return DriverOutcome::Aborted {
                stage: "Bound",
                diagnostics: diags,
                partial: PartialGraph::Atomized(atomized),
            };
        }
    };

    let bind_devices: BindDeviceTable<'_> = devices.clone();
    let program = match lower_graph(&atomized, &bind_devices, &bound) {
        Ok(program) => program,
        Err(err) => {
            warn!(%err, "lower stage failed");
            diags.push(asdl_ir::diagnostics::Diagnostic::error("G03", 7, err.to_string()));
            return DriverOutcome::Aborted {
                stage: "Lowered",
                diagnostics: diags,
                partial: PartialGraph::Bound { atomized, bound },
            };
        }
    };

    let netlist_text = match render_program(&program, request.backend_config) {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "render stage failed");
            diags.push(asdl_ir::diagnostics::Diagnostic::error("G07", 8, err.to_string()));
            return DriverOutcome::Aborted {
                stage: "Rendered",
                diagnostics: diags,
                partial: PartialGraph::Lowered(program),
            };
        }
    };

    let view_bindings: Vec<ViewBindingEntry> = bound
        .view_bindings
        .iter()
        .map(|b| ViewBindingEntry {
            path: b.path.clone(),
            inst: b.inst_literal.clone(),
            cell: b.cell.clone(),
            view: b.view.clone(),
        })
        .collect();
    let emission_name_map: Vec<EmissionNameEntry> = bound
        .realizations
        .iter()
        .map(|r| EmissionNameEntry {
            cell: r.realization.cell.clone(),
            view: r.realization.view.clone(),
            emitted_name: r.emitted_name.clone(),
        })
        .collect();

    let log = CompileLog::new(view_bindings, emission_name_map, &diags);
    info!("compile finished");
    DriverOutcome::Logged { netlist_text, log }
}

/// Builds a flat `DeviceId -> &Device` lookup from every file in the
/// linked program (devices never get pattern-expanded, so there's no
/// atomized equivalent). `pub(crate)` so `query`'s stage builder can reuse
/// it instead of duplicating the same scan.
pub(crate) fn device_table(graph: &PatternedGraph) -> HashMap<DeviceId, &Device> {
    let mut out = HashMap::new();
    for file in &graph.program {
        for device in file.devices.values() {
            out.insert(device.device_id, device);
        }
    }
    out
}
