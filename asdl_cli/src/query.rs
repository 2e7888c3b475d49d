//! `asdl query` (§6): read-only inspection of one pipeline stage, reusing
//! whatever graph the driver already built rather than re-running passes.

use crate::args::{QueryKind, QueryStage};
use asdl_bind::BoundGraph;
use asdl_ir::atomized::AtomizedGraph;
use asdl_ir::netlist::{NetlistProgram, NetlistStmt};
use asdl_ir::patterned::PatternedGraph;
use std::collections::HashSet;

/// Everything a query might need, built once by the caller and handed in
/// by reference; not every stage has every field (§6: `authored` only
/// needs `patterned`, `emitted` needs all three).
pub struct QueryContext<'a> {
    pub patterned: &'a PatternedGraph,
    pub atomized: Option<&'a AtomizedGraph>,
    pub bound: Option<&'a BoundGraph>,
    pub program: Option<&'a NetlistProgram>,
}

pub fn run_query(ctx: &QueryContext<'_>, kind: &QueryKind, stage: QueryStage) -> String {
    match kind {
        QueryKind::Tree => tree(ctx, stage),
        QueryKind::Bindings => bindings(ctx),
        QueryKind::EmitPlan => emit_plan(ctx),
        QueryKind::Refs { cell } => refs(ctx, cell),
        QueryKind::Instance { path } => instance(ctx, stage, path),
        QueryKind::Net { path } => net(ctx, stage, path),
        QueryKind::NetTrace { path } => net_trace(ctx, path),
    }
}

fn tree(ctx: &QueryContext<'_>, stage: QueryStage) -> String {
    let mut out = String::new();
    match stage {
        QueryStage::Authored => {
            for file in &ctx.patterned.program {
                out.push_str(&format!("{}\n", file.path));
                for module in file.modules.values() {
                    out.push_str(&format!("  {} ({} instances)\n", module.name, module.instances.len()));
                    for inst in &module.instances {
                        out.push_str(&format!("    {} -> {}\n", inst.name_expr_id.raw(), inst.ref_raw));
                    }
                }
            }
        }
        QueryStage::Resolved => {
            let Some(atomized) = ctx.atomized else {
                return "no atomized graph available for this stage".to_string();
            };
            for file in &atomized.program {
                out.push_str(&format!("{}\n", file.path));
                for module in file.modules.values() {
                    out.push_str(&format!("  {} ({} atoms)\n", module.name, module.instances.len()));
                    for inst in &module.instances {
                        out.push_str(&format!("    {}\n", inst.literal));
                    }
                }
            }
        }
        QueryStage::Emitted => {
            let Some(bound) = ctx.bound else {
                return "no bound graph available for this stage".to_string();
            };
            for realization in &bound.realizations {
                out.push_str(&format!(
                    "{} ({}{})\n",
                    realization.emitted_name,
                    realization.realization.cell,
                    realization
                        .realization
                        .view
                        .as_deref()
                        .map(|v| format!("@{v}"))
                        .unwrap_or_default(),
                ));
            }
        }
    }
    out
}

fn bindings(ctx: &QueryContext<'_>) -> String {
    let Some(bound) = ctx.bound else {
        return "no bound graph available; run the `netlist` stage first".to_string();
    };
    let mut out = String::new();
    for binding in &bound.view_bindings {
        out.push_str(&format!(
            "{} {} -> {}{}\n",
            binding.path,
            binding.inst_literal,
            binding.cell,
            binding.view.as_deref().map(|v| format!("@{v}")).unwrap_or_default(),
        ));
    }
    out
}

fn emit_plan(ctx: &QueryContext<'_>) -> String {
    let Some(bound) = ctx.bound else {
        return "no bound graph available; run the `netlist` stage first".to_string();
    };
    let mut out = String::new();
    for realization in &bound.realizations {
        out.push_str(&format!(
            "{}{} -> {}\n",
            realization.realization.cell,
            realization
                .realization
                .view
                .as_deref()
                .map(|v| format!("@{v}"))
                .unwrap_or_default(),
            realization.emitted_name,
        ));
    }
    out
}

fn refs(ctx: &QueryContext<'_>, cell: &str) -> String {
    let mut out = String::new();
    for file in &ctx.patterned.program {
        for module in file.modules.values() {
            for inst in &module.instances {
                if inst.ref_raw == cell || inst.ref_raw.starts_with(&format!("{cell}.")) {
                    out.push_str(&format!("{}:{} -> {}\n", file.path, module.name, inst.ref_raw));
                }
            }
        }
    }
    if out.is_empty() {
        out.push_str(&format!("no references to `{cell}` found\n"));
    }
    out
}

fn instance(ctx: &QueryContext<'_>, stage: QueryStage, path: &str) -> String {
    if matches!(stage, QueryStage::Resolved | QueryStage::Emitted) {
        if let Some(atomized) = ctx.atomized {
            for module in atomized.modules() {
                if let Some(inst) = module.instance(path) {
                    return format!(
                        "{} ref_kind={:?} params={}\n",
                        inst.literal,
                        inst.ref_kind,
                        inst.parameters.len()
                    );
                }
            }
        }
    }
    format!("instance `{path}` not found at this stage\n")
}

fn net(ctx: &QueryContext<'_>, stage: QueryStage, path: &str) -> String {
    if matches!(stage, QueryStage::Resolved | QueryStage::Emitted) {
        if let Some(atomized) = ctx.atomized {
            for module in atomized.modules() {
                if let Some(n) = module.net(path) {
                    return format!("{} port_introducing={}\n", n.literal, n.port_introducing);
                }
            }
        }
    }
    format!("net `{path}` not found at this stage\n")
}

/// Walks `NetlistIR` connections outward from `path` (read as a net
/// literal in the program's top module), following `SubcktCall`
/// connections into the target module's corresponding port and recursing
/// — the same DFS-with-visited-set shape the View Binder uses to walk
/// the instance graph (ADR-0036), just over the lowered program instead
/// of the atomized one. `DeviceCall` hits are leaves: a primitive pin has
/// nothing further to recurse into.
fn net_trace(ctx: &QueryContext<'_>, path: &str) -> String {
    let Some(program) = ctx.program else {
        return "no lowered netlist available; run the `netlist` stage first".to_string();
    };

    let mut out = String::new();
    let mut visited: HashSet<(String, String)> = HashSet::new();
    let mut stack = vec![(program.top.clone(), path.to_string())];

    while let Some((module_name, net_literal)) = stack.pop() {
        if !visited.insert((module_name.clone(), net_literal.clone())) {
            continue;
        }
        let Some(module) = program.module(&module_name) else {
            continue;
        };

        if module.ports.iter().any(|p| p == &net_literal) {
            out.push_str(&format!("{module_name}.<port> {net_literal}\n"));
        }

        for stmt in &module.body {
            match stmt {
                NetlistStmt::DeviceCall { bindings, .. } => {
                    let inst = bindings.get("name").map(String::as_str).unwrap_or("?");
                    for (pin, net) in bindings {
                        if pin != "name" && net == &net_literal {
                            out.push_str(&format!("{module_name}: {inst}.{pin} -> {net_literal}\n"));
                        }
                    }
                }
                NetlistStmt::SubcktCall {
                    instance_name,
                    target_emitted_name,
                    connections,
                    ..
                } => {
                    let Some(target) = program.module(target_emitted_name) else {
                        continue;
                    };
                    for (i, conn) in connections.iter().enumerate() {
                        if conn != &net_literal {
                            continue;
                        }
                        let Some(target_port) = target.ports.get(i) else {
                            continue;
                        };
                        out.push_str(&format!(
                            "{module_name}: {instance_name} -> {target_emitted_name}.{target_port}\n"
                        ));
                        stack.push((target_emitted_name.clone(), target_port.clone()));
                    }
                }
                NetlistStmt::GlobalParamDecl { .. } => {}
            }
        }
    }

    if out.is_empty() {
        out.push_str(&format!("net `{path}` has no reachable connections\n"));
    }
    out
}

/// Counts device-call statements in a lowered program, used by `emit-plan`
/// when a full netlist has already been rendered.
#[must_use]
pub fn device_call_count(program: &NetlistProgram) -> usize {
    program
        .modules
        .iter()
        .flat_map(|m| m.body.iter())
        .filter(|stmt| matches!(stmt, NetlistStmt::DeviceCall { .. }))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ir::netlist::{NetlistModule, Realization};
    use std::collections::BTreeMap;

    fn leaf_module() -> NetlistModule {
        let mut bindings = BTreeMap::new();
        bindings.insert("name".to_string(), "M1".to_string());
        bindings.insert("G".to_string(), "IN".to_string());
        NetlistModule {
            emitted_name: "amp".into(),
            realization: Realization::new("amp", None),
            ports: vec!["IN".into()],
            parameters: BTreeMap::new(),
            body: vec![NetlistStmt::DeviceCall {
                template_key: "nfet".into(),
                bindings,
                conn_label: None,
            }],
            is_top: false,
            atom_origins: BTreeMap::new(),
        }
    }

    fn top_module() -> NetlistModule {
        NetlistModule {
            emitted_name: "top".into(),
            realization: Realization::new("top", None),
            ports: vec![],
            parameters: BTreeMap::new(),
            body: vec![NetlistStmt::SubcktCall {
                instance_name: "U1".into(),
                target_emitted_name: "amp".into(),
                connections: vec!["VIN".into()],
                parameters: vec![],
            }],
            is_top: true,
            atom_origins: BTreeMap::new(),
        }
    }

    fn program() -> NetlistProgram {
        NetlistProgram {
            top: "top".into(),
            modules: vec![top_module(), leaf_module()],
            globals: BTreeMap::new(),
        }
    }

    #[test]
    fn net_trace_walks_through_a_subckt_call_into_the_target_module() {
        let patterned = PatternedGraph::default();
        let program = program();
        let ctx = QueryContext {
            patterned: &patterned,
            atomized: None,
            bound: None,
            program: Some(&program),
        };
        let out = net_trace(&ctx, "VIN");
        assert!(out.contains("top: U1 -> amp.IN"));
        assert!(out.contains("amp: M1.G -> IN"));
    }

    #[test]
    fn net_trace_reports_no_connections_for_an_unknown_net() {
        let patterned = PatternedGraph::default();
        let program = program();
        let ctx = QueryContext {
            patterned: &patterned,
            atomized: None,
            bound: None,
            program: Some(&program),
        };
        let out = net_trace(&ctx, "NOWHERE");
        assert!(out.contains("has no reachable connections"));
    }
}
