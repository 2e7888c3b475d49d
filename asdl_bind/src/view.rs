//! View Binder (§4.5): resolves a per-instance `(cell, view)` map and a
//! reachability-only realization set rooted at the resolved top
//! (ADR-0036), with DFS-stable emitted-name collision handling
//! (ADR-0034).

use crate::error::BindError;
use asdl_ir::atomized::AtomizedGraph;
use asdl_ir::config::{ViewProfile, ViewRuleMatch};
use asdl_ir::ids::ModuleId;
use asdl_ir::netlist::Realization;
use asdl_ir::patterned::RefKind;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// One module instance path resolved to a concrete realization, in DFS
/// visitation order (children after their parent's edge, but a module is
/// only ever realized once — the first DFS edge that reaches it wins).
#[derive(Debug, Clone)]
pub struct ResolvedRealization {
    pub module_id: ModuleId,
    pub realization: Realization,
    pub emitted_name: String,
    pub is_top: bool,
}

/// A single instance edge's resolved binding, recorded for the compile
/// log (§4.8 `view_bindings[]`).
#[derive(Debug, Clone)]
pub struct ViewBinding {
    pub path: String,
    pub inst_literal: String,
    pub cell: String,
    pub view: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BoundGraph {
    /// Realizations in DFS order: children before the parents that
    /// reference them (ADR-0034's emission order), with the top last.
    pub realizations: Vec<ResolvedRealization>,
    pub view_bindings: Vec<ViewBinding>,
    pub top_emitted_name: String,
}

impl BoundGraph {
    #[must_use]
    pub fn emitted_name_for(&self, module_id: ModuleId) -> Option<&str> {
        self.realizations
            .iter()
            .find(|r| r.module_id == module_id)
            .map(|r| r.emitted_name.as_str())
    }
}

/// Resolves the reachable realization set for `graph`, starting from
/// `top_cell` (and optional `top_view`), applying `profile`'s
/// `view_order` baseline and ordered rules.
pub fn bind_views(
    graph: &AtomizedGraph,
    top_cell: &str,
    top_view: Option<&str>,
    profile: &ViewProfile,
) -> Result<BoundGraph, BindError> {
    let by_cell_view = index_by_cell_view(graph);

    let top_view = top_view
        .map(str::to_string)
        .or_else(|| profile.view_order.get(top_cell).and_then(|order| order.first().cloned()));

    let top_id = resolve_cell_view(&by_cell_view, top_cell, top_view.as_deref())
        .ok_or_else(|| BindError::TopNotFound(top_cell.to_string()))?;

    let mut realized: IndexMap<ModuleId, (Realization, bool)> = IndexMap::new();
    let mut view_bindings = Vec::new();
    let mut visiting: HashSet<ModuleId> = HashSet::new();

    visit(
        graph,
        &by_cell_view,
        profile,
        top_id,
        Realization::new(top_cell, top_view.clone()),
        "",
        &mut realized,
        &mut view_bindings,
        &mut visiting,
    )?;

    let emitted = assign_emitted_names(&realized);

    let mut realizations = Vec::with_capacity(realized.len());
    for (module_id, (realization, _)) in &realized {
        realizations.push(ResolvedRealization {
            module_id: *module_id,
            realization: realization.clone(),
            emitted_name: emitted[module_id].clone(),
            is_top: *module_id == top_id,
        });
    }

    let top_emitted_name = emitted[&top_id].clone();

    Ok(BoundGraph {
        realizations,
        view_bindings,
        top_emitted_name,
    })
}

#[allow(clippy::too_many_arguments)]
fn visit(
    graph: &AtomizedGraph,
    by_cell_view: &HashMap<(String, Option<String>), ModuleId>,
    profile: &ViewProfile,
    module_id: ModuleId,
    realization: Realization,
    path: &str,
    realized: &mut IndexMap<ModuleId, (Realization, bool)>,
    view_bindings: &mut Vec<ViewBinding>,
    visiting: &mut HashSet<ModuleId>,
) -> Result<(), BindError> {
    if realized.contains_key(&module_id) {
        return Ok(());
    }
    if !visiting.insert(module_id) {
        // A cycle in the instance graph; the atomized module set is
        // finite, so silently stop rather than recursing forever. The
        // NetlistIR Lowerer will surface a missing-target error if this
        // ever matters downstream.
        return Ok(());
    }

    let Some(module) = graph.module(module_id) else {
        visiting.remove(&module_id);
        return Ok(());
    };

    for inst in &module.instances {
        if inst.ref_kind != RefKind::Module {
            continue;
        }
        let Some(target_id) = inst.ref_module else { continue };
        let Some(target_module) = graph.module(target_id) else {
            continue;
        };
        let cell = target_module.name.clone();
        let inst_path = if path.is_empty() {
            format!("/{}", inst.literal)
        } else {
            format!("{path}/{}", inst.literal)
        };

        let view = resolve_view(profile, &cell, &inst.literal, &inst_path);
        view_bindings.push(ViewBinding {
            path: inst_path.clone(),
            inst_literal: inst.literal.clone(),
            cell: cell.clone(),
            view: view.clone(),
        });

        let resolved_id = resolve_cell_view(by_cell_view, &cell, view.as_deref()).ok_or_else(|| {
            BindError::UnresolvedRealization {
                inst: inst.literal.clone(),
                cell: cell.clone(),
                view: view.clone(),
            }
        })?;

        visit(
            graph,
            by_cell_view,
            profile,
            resolved_id,
            Realization::new(cell, view),
            &inst_path,
            realized,
            view_bindings,
            visiting,
        )?;
    }

    visiting.remove(&module_id);
    realized.insert(module_id, (realization, true));
    Ok(())
}

/// Determines `(cell, view)` for one instance edge (§4.5 step 2): start
/// from `view_order`'s head, then apply matching rules in declaration
/// order, last match wins.
fn resolve_view(profile: &ViewProfile, cell: &str, inst_literal: &str, path: &str) -> Option<String> {
    let mut view = profile.view_order.get(cell).and_then(|order| order.first().cloned());
    for rule in &profile.rules {
        if rule_matches(&rule.matcher, cell, inst_literal, path) {
            view = Some(rule.view.clone());
        }
    }
    view
}

fn rule_matches(matcher: &ViewRuleMatch, cell: &str, inst_literal: &str, path: &str) -> bool {
    if let Some(p) = &matcher.path {
        if p != path {
            return false;
        }
    }
    if let Some(i) = &matcher.inst {
        if i != inst_literal {
            return false;
        }
    }
    if let Some(m) = &matcher.module {
        if m != cell {
            return false;
        }
    }
    true
}

fn index_by_cell_view(graph: &AtomizedGraph) -> HashMap<(String, Option<String>), ModuleId> {
    let mut map = HashMap::new();
    for module in graph.modules() {
        map.insert((module.name.clone(), normalize_view(module.view.as_deref())), module.module_id);
    }
    map
}

fn resolve_cell_view(
    by_cell_view: &HashMap<(String, Option<String>), ModuleId>,
    cell: &str,
    view: Option<&str>,
) -> Option<ModuleId> {
    by_cell_view
        .get(&(cell.to_string(), normalize_view(view)))
        .copied()
        .or_else(|| by_cell_view.get(&(cell.to_string(), None)).copied())
}

fn normalize_view(view: Option<&str>) -> Option<String> {
    match view {
        None | Some("default") => None,
        Some(v) => Some(v.to_string()),
    }
}

/// Assigns emitted names in DFS-insertion order (ADR-0034): default views
/// emit as `cell`, non-default as `cell_<view>` (sanitized); global
/// collisions get ordinal suffixes `__2, __3, …` in that same order.
fn assign_emitted_names(realized: &IndexMap<ModuleId, (Realization, bool)>) -> HashMap<ModuleId, String> {
    let mut used: HashMap<String, u32> = HashMap::new();
    let mut out = HashMap::new();
    for (module_id, (realization, _)) in realized {
        let base = if realization.is_default_view() {
            realization.cell.clone()
        } else {
            format!("{}_{}", realization.cell, sanitize(realization.view.as_deref().unwrap_or_default()))
        };
        let count = used.entry(base.clone()).or_insert(0);
        *count += 1;
        let name = if *count == 1 { base } else { format!("{base}__{count}") };
        out.insert(*module_id, name);
    }
    out
}

fn sanitize(view: &str) -> String {
    view.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
