//! Pattern Expander / Atomizer (§4.3): lowers a `PatternedGraph` into an
//! `AtomizedGraph` of single-atom entities, detecting literal collisions
//! (ADR-0011) and resolving broadcast binding between nets and endpoints
//! (ADR-0019/0020).

use crate::expand::{expand_pattern_expr, ExpandError, ExpandedAtom};
use asdl_ir::atomized::{AtomEndpoint, AtomInstance, AtomNet, AtomizedFile, AtomizedGraph, AtomizedModule, PatternOrigin};
use asdl_ir::diagnostics::{Diagnostic, Diagnostics};
use asdl_ir::ids::{IdGen, NetId};
use asdl_ir::patterned::{Module, PatternedGraph, RefKind};
use asdl_ir::span::SourceSpan;
use asdl_ir::value::ParamValue;
use indexmap::IndexMap;
use std::collections::HashMap;

const COMPONENT: u8 = 2;

/// Atomizes every file in `graph`, accumulating diagnostics from every
/// module rather than bailing on the first failure.
pub fn atomize_graph(graph: &PatternedGraph, diags: &mut Diagnostics) -> AtomizedGraph {
    let id_gen = IdGen::new();
    let mut program = Vec::new();
    for file in &graph.program {
        let modules = atomize_file_modules(graph, file, &id_gen, diags);
        program.push(AtomizedFile {
            file_id: file.file_id,
            path: file.path.clone(),
            modules,
        });
    }
    AtomizedGraph {
        program,
        global_parameters: graph.global_parameters.clone(),
    }
}

/// Modules within a file are independent units of work (each only reads
/// `graph` and mints ids off the shared atomic counter in `id_gen`), so
/// the `rayon` feature fans this out across a thread pool. Diagnostics
/// never go to a shared sink directly (§9): each task gets its own buffer,
/// merged back in input order once every task completes.
#[cfg(not(feature = "rayon"))]
fn atomize_file_modules(
    graph: &PatternedGraph,
    file: &asdl_ir::patterned::File,
    id_gen: &IdGen,
    diags: &mut Diagnostics,
) -> IndexMap<asdl_ir::ids::ModuleId, AtomizedModule> {
    let mut modules = IndexMap::new();
    for module in file.modules.values() {
        let atomized = atomize_module(graph, module, id_gen, diags);
        modules.insert(atomized.module_id, atomized);
    }
    modules
}

#[cfg(feature = "rayon")]
fn atomize_file_modules(
    graph: &PatternedGraph,
    file: &asdl_ir::patterned::File,
    id_gen: &IdGen,
    diags: &mut Diagnostics,
) -> IndexMap<asdl_ir::ids::ModuleId, AtomizedModule> {
    use rayon::prelude::*;

    let results: Vec<(AtomizedModule, Diagnostics)> = file
        .modules
        .values()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|module| {
            let mut local_diags = Diagnostics::new();
            let atomized = atomize_module(graph, module, id_gen, &mut local_diags);
            (atomized, local_diags)
        })
        .collect();

    let mut modules = IndexMap::new();
    for (atomized, local_diags) in results {
        diags.extend(local_diags);
        modules.insert(atomized.module_id, atomized);
    }
    modules
}

fn atomize_module(graph: &PatternedGraph, module: &Module, id_gen: &IdGen, diags: &mut Diagnostics) -> AtomizedModule {
    let mut net_atoms: IndexMap<NetId, Vec<ExpandedAtom>> = IndexMap::new();
    let mut out_nets = Vec::new();

    for net in &module.nets {
        let Some(entry) = module.pattern_table.get(net.name_expr_id) else {
            continue;
        };
        match expand_pattern_expr(&entry.parsed, &module.named_patterns) {
            Ok(atoms) => {
                for (segment_index, atom_index, atom) in &atoms {
                    out_nets.push(AtomNet {
                        net_id: id_gen.next_net(),
                        literal: atom.literal.clone(),
                        port_introducing: net.port_introducing,
                        origin: PatternOrigin {
                            expr_id: net.name_expr_id,
                            segment_index: *segment_index,
                            atom_index: *atom_index,
                            base_name: atom.base_name.clone(),
                            pattern_parts: atom.pattern_parts.clone(),
                        },
                        span: net.span,
                    });
                }
                net_atoms.insert(net.net_id, atoms.into_iter().map(|(_, _, a)| a).collect());
            }
            Err(e) => diags.push(expand_error_diagnostic(&e, net.span)),
        }
    }
    check_collisions(&out_nets, "E-COLL-NET", diags, |n| &n.literal, |n| n.span);

    let mut out_instances = Vec::new();
    for inst in &module.instances {
        let Some(name_entry) = module.pattern_table.get(inst.name_expr_id) else {
            continue;
        };
        let inst_atoms = match expand_pattern_expr(&name_entry.parsed, &module.named_patterns) {
            Ok(atoms) => atoms,
            Err(e) => {
                diags.push(expand_error_diagnostic(&e, inst.span));
                continue;
            }
        };
        let n = inst_atoms.len();

        let mut param_values: IndexMap<String, Vec<ParamValue>> = IndexMap::new();
        for (pname, binding) in &inst.parameters {
            match binding {
                asdl_ir::patterned::ParamBinding::Value(v) => {
                    param_values.insert(pname.clone(), vec![v.clone()]);
                }
                asdl_ir::patterned::ParamBinding::Pattern(expr_id) => {
                    let Some(entry) = module.pattern_table.get(*expr_id) else {
                        continue;
                    };
                    match expand_pattern_expr(&entry.parsed, &module.named_patterns) {
                        Ok(atoms) => {
                            let values: Vec<ParamValue> =
                                atoms.into_iter().map(|(_, _, a)| literal_to_param_value(&a.literal)).collect();
                            if values.len() != 1 && values.len() != n {
                                diags.push(
                                    Diagnostic::error(
                                        "E-PARAM-LEN",
                                        COMPONENT,
                                        format!(
                                            "parameter `{pname}` expands to {} atoms, expected 1 or {n}",
                                            values.len()
                                        ),
                                    )
                                    .with_span(inst.span),
                                );
                                continue;
                            }
                            param_values.insert(pname.clone(), values);
                        }
                        Err(e) => diags.push(expand_error_diagnostic(&e, inst.span)),
                    }
                }
            }
        }

        for (i, (segment_index, atom_index, atom)) in inst_atoms.into_iter().enumerate() {
            let mut parameters = IndexMap::new();
            for (pname, values) in &param_values {
                let v = if values.len() == 1 { values[0].clone() } else { values[i].clone() };
                parameters.insert(pname.clone(), v);
            }
            out_instances.push(AtomInstance {
                inst_id: id_gen.next_inst(),
                literal: atom.literal,
                ref_kind: inst.ref_kind,
                ref_module: inst.ref_module,
                ref_device: inst.ref_device,
                parameters,
                origin: PatternOrigin {
                    expr_id: inst.name_expr_id,
                    segment_index,
                    atom_index,
                    base_name: atom.base_name,
                    pattern_parts: atom.pattern_parts,
                },
                span: inst.span,
            });
        }
    }
    check_collisions(&out_instances, "E-COLL-INST", diags, |i| &i.literal, |i| i.span);

    let mut out_endpoints = Vec::new();
    for ep in &module.endpoints {
        let Some(entry) = module.pattern_table.get(ep.port_expr_id) else {
            continue;
        };
        let atoms = match expand_pattern_expr(&entry.parsed, &module.named_patterns) {
            Ok(atoms) => atoms,
            Err(e) => {
                diags.push(expand_error_diagnostic(&e, ep.span));
                continue;
            }
        };
        let empty = Vec::new();
        let net_atoms_for_ep = net_atoms.get(&ep.net_id).unwrap_or(&empty);
        let endpoint_total_len = atoms.len();
        let ep_axis_lens = axis_lengths(atoms.iter().map(|(_, _, a)| a));
        let net_axis_lens = axis_lengths(net_atoms_for_ep.iter());

        for (position, (segment_index, atom_index, atom)) in atoms.into_iter().enumerate() {
            let Some(dot) = atom.literal.rfind('.') else {
                diags.push(
                    Diagnostic::error(
                        "E-ENDPOINT-SHAPE",
                        COMPONENT,
                        format!("endpoint atom `{}` has no instance/pin separator", atom.literal),
                    )
                    .with_span(ep.span),
                );
                continue;
            };
            let inst_literal = atom.literal[..dot].to_string();
            let port_literal = atom.literal[dot + 1..].to_string();

            let net_literal = match resolve_net_atom(
                net_atoms_for_ep,
                &net_axis_lens,
                &atom,
                &ep_axis_lens,
                position,
                endpoint_total_len,
            ) {
                Ok(literal) => literal,
                Err(e) => {
                    diags.push(
                        Diagnostic::error(e.code(), COMPONENT, e.message()).with_span(ep.span),
                    );
                    continue;
                }
            };

            out_endpoints.push(AtomEndpoint {
                endpoint_id: id_gen.next_endpoint(),
                net_literal,
                inst_literal,
                port_literal,
                conn_label: ep.conn_label.clone(),
                suppress_default_warning: ep.suppress_default_warning,
                origin: PatternOrigin {
                    expr_id: ep.port_expr_id,
                    segment_index,
                    atom_index,
                    base_name: atom.base_name,
                    pattern_parts: atom.pattern_parts,
                },
                span: ep.span,
            });
        }
    }

    apply_instance_defaults(graph, module, &out_instances, &net_atoms, id_gen, &mut out_endpoints, diags);

    AtomizedModule {
        module_id: module.module_id,
        name: module.name.clone(),
        view: module.view.clone(),
        file_id: module.file_id,
        ports: module.ports.clone(),
        nets: out_nets,
        instances: out_instances,
        parameters: module.parameters.clone(),
        endpoints: out_endpoints,
        span: module.span,
    }
}

/// Applies §4.4 `instance_defaults`: every instance atom exposing a
/// defaulted port and lacking an explicit connection for it gets one
/// synthesized; an instance that already connects the port explicitly
/// overrides the default instead, tagging that endpoint so the Binding
/// Verifier can warn (unless the connection was `!`-suppressed).
#[allow(clippy::too_many_arguments)]
fn apply_instance_defaults(
    graph: &PatternedGraph,
    module: &Module,
    instances: &[AtomInstance],
    net_atoms: &IndexMap<NetId, Vec<ExpandedAtom>>,
    id_gen: &IdGen,
    out_endpoints: &mut Vec<AtomEndpoint>,
    diags: &mut Diagnostics,
) {
    for default in &module.instance_defaults {
        let Some(port_entry) = module.pattern_table.get(default.port_expr_id) else {
            continue;
        };
        let port_atoms = match expand_pattern_expr(&port_entry.parsed, &module.named_patterns) {
            Ok(atoms) => atoms,
            Err(e) => {
                diags.push(expand_error_diagnostic(&e, default.span));
                continue;
            }
        };
        let empty = Vec::new();
        let net_atoms_for_default = net_atoms.get(&default.net_id).unwrap_or(&empty);
        let default_total_len = port_atoms.len();
        let default_axis_lens = axis_lengths(port_atoms.iter().map(|(_, _, a)| a));
        let net_axis_lens = axis_lengths(net_atoms_for_default.iter());

        for (position, (segment_index, atom_index, port_atom)) in port_atoms.iter().enumerate() {
            let net_literal = match resolve_net_atom(
                net_atoms_for_default,
                &net_axis_lens,
                port_atom,
                &default_axis_lens,
                position,
                default_total_len,
            ) {
                Ok(literal) => literal,
                Err(e) => {
                    diags.push(Diagnostic::error(e.code(), COMPONENT, e.message()).with_span(default.span));
                    continue;
                }
            };

            for inst in instances {
                if !instance_exposes_port(graph, inst, &port_atom.literal) {
                    continue;
                }
                if let Some(existing) =
                    out_endpoints.iter_mut().find(|e| e.inst_literal == inst.literal && e.port_literal == port_atom.literal)
                {
                    if !existing.suppress_default_warning {
                        existing.conn_label = Some("instance_default_override".to_string());
                    }
                    continue;
                }
                out_endpoints.push(AtomEndpoint {
                    endpoint_id: id_gen.next_endpoint(),
                    net_literal: net_literal.clone(),
                    inst_literal: inst.literal.clone(),
                    port_literal: port_atom.literal.clone(),
                    conn_label: None,
                    suppress_default_warning: false,
                    origin: PatternOrigin {
                        expr_id: default.port_expr_id,
                        segment_index: *segment_index,
                        atom_index: *atom_index,
                        base_name: port_atom.base_name.clone(),
                        pattern_parts: port_atom.pattern_parts.clone(),
                    },
                    span: default.span,
                });
            }
        }
    }
}

/// Whether `inst`'s resolved target exposes `port`, looked up from the
/// still-patterned graph since port lists never change under atomization.
fn instance_exposes_port(graph: &PatternedGraph, inst: &AtomInstance, port: &str) -> bool {
    match inst.ref_kind {
        RefKind::Device => inst
            .ref_device
            .and_then(|id| graph.device(id))
            .map(|d| d.ports.iter().any(|p| p == port))
            .unwrap_or(false),
        RefKind::Module => inst
            .ref_module
            .and_then(|id| graph.module(id))
            .map(|m| m.ports.iter().any(|p| p == port))
            .unwrap_or(false),
    }
}

enum NetResolveError {
    AxisLen(String),
    Broadcast,
}

impl NetResolveError {
    fn code(&self) -> &'static str {
        match self {
            Self::AxisLen(_) => "E-AXIS-LEN",
            Self::Broadcast => "E-ENDPOINT-BROADCAST",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::AxisLen(axis) => format!("tagged axis `{axis}` has mismatched length between net and endpoint"),
            Self::Broadcast => "endpoint expression length does not broadcast against its net".to_string(),
        }
    }
}

/// Resolves which net atom an endpoint atom binds to (§4.3 ADR-0019/0020).
///
/// A single-atom net broadcasts to every endpoint atom. Otherwise: if
/// every group on both sides is named, binding is allowed only when the
/// net's named-axis sequence is a left-to-right subsequence of the
/// endpoint's axis sequence (tagged axes let differently-ranged groups
/// share identity); shared axes must agree in length, and the endpoint
/// atom is projected onto the net atom whose coordinates agree on every
/// shared axis. If any group on either side is unnamed, strict
/// equal-length binding is required: the endpoint's total atom count
/// must equal the net's, and atoms bind purely by position.
#[allow(clippy::too_many_arguments)]
fn resolve_net_atom(
    net_atoms: &[ExpandedAtom],
    net_axis_lens: &HashMap<String, usize>,
    endpoint_atom: &ExpandedAtom,
    endpoint_axis_lens: &HashMap<String, usize>,
    position: usize,
    endpoint_total_len: usize,
) -> Result<String, NetResolveError> {
    if net_atoms.is_empty() {
        return Err(NetResolveError::Broadcast);
    }
    if net_atoms.len() == 1 {
        return Ok(net_atoms[0].literal.clone());
    }

    let all_named = |a: &ExpandedAtom| a.pattern_parts.len() == a.axis_index.len();
    let net_all_named = net_atoms.iter().all(all_named);
    let endpoint_all_named = all_named(endpoint_atom);

    if net_all_named && endpoint_all_named {
        let net_axes: Vec<&String> = net_atoms[0].axis_index.keys().collect();
        let ep_axes: Vec<&String> = endpoint_atom.axis_index.keys().collect();
        if !is_subsequence(&net_axes, &ep_axes) {
            return Err(NetResolveError::Broadcast);
        }
        for axis in &net_axes {
            let net_len = net_axis_lens.get(axis.as_str()).copied().unwrap_or(0);
            let ep_len = endpoint_axis_lens.get(axis.as_str()).copied().unwrap_or(0);
            if net_len != ep_len {
                return Err(NetResolveError::AxisLen((*axis).clone()));
            }
        }
        return net_atoms
            .iter()
            .find(|na| {
                net_axes.iter().all(|axis| {
                    let net_val = na.axis_index.get(axis.as_str());
                    let ep_val = endpoint_atom.axis_index.get(axis.as_str());
                    net_val.is_some() && net_val == ep_val
                })
            })
            .map(|na| na.literal.clone())
            .ok_or_else(|| NetResolveError::AxisLen(net_axes.first().map(|s| (*s).clone()).unwrap_or_default()));
    }

    if endpoint_total_len != net_atoms.len() {
        return Err(NetResolveError::Broadcast);
    }
    net_atoms
        .get(position)
        .map(|a| a.literal.clone())
        .ok_or(NetResolveError::Broadcast)
}

/// Whether `needle`'s elements appear, in order, somewhere within
/// `haystack` (not necessarily contiguous).
fn is_subsequence(needle: &[&String], haystack: &[&String]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|n| rest.any(|h| h == n))
}

/// For every axis id seen across `atoms`, the axis's length (one past the
/// highest index any atom occupies on it).
fn axis_lengths<'a>(atoms: impl Iterator<Item = &'a ExpandedAtom>) -> HashMap<String, usize> {
    let mut lens: HashMap<String, usize> = HashMap::new();
    for atom in atoms {
        for (axis, &idx) in &atom.axis_index {
            let entry = lens.entry(axis.clone()).or_insert(0);
            if idx + 1 > *entry {
                *entry = idx + 1;
            }
        }
    }
    lens
}

fn literal_to_param_value(s: &str) -> ParamValue {
    if let Ok(i) = s.parse::<i64>() {
        ParamValue::Int(i)
    } else if let Ok(f) = s.parse::<f64>() {
        ParamValue::Float(f)
    } else {
        ParamValue::String(s.to_string())
    }
}

fn check_collisions<T>(
    items: &[T],
    code: &'static str,
    diags: &mut Diagnostics,
    literal: impl Fn(&T) -> &str,
    span: impl Fn(&T) -> SourceSpan,
) {
    let mut seen: HashMap<&str, SourceSpan> = HashMap::new();
    for item in items {
        let lit = literal(item);
        if let Some(&prev_span) = seen.get(lit) {
            diags.push(
                Diagnostic::error(code, COMPONENT, format!("literal `{lit}` collides with an earlier atom"))
                    .with_span(span(item)),
            );
            diags.push(
                Diagnostic::error(code, COMPONENT, format!("literal `{lit}` collides with a later atom"))
                    .with_span(prev_span),
            );
        } else {
            seen.insert(lit, span(item));
        }
    }
}

fn expand_error_diagnostic(err: &ExpandError, span: SourceSpan) -> Diagnostic {
    match err {
        ExpandError::UndefinedNamedPattern(name) => Diagnostic::error(
            "E-PAT-NAMED-UNDEF",
            COMPONENT,
            format!("reference to undefined named pattern `<@{name}>`"),
        )
        .with_span(span),
        ExpandError::DuplicateAxisId(id) => {
            Diagnostic::error("E-AXIS-DUP", COMPONENT, format!("axis id `{id}` used twice in one expression"))
                .with_span(span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ir::ids::FileId;
    use asdl_ir::pattern::{Group, PatternEntry, PatternExpr, PatternKind, PatternTable, Segment, Token};
    use asdl_ir::patterned::{Endpoint, Instance, Net, ParamBinding, RefKind};
    use rstest::rstest;

    fn span() -> SourceSpan {
        SourceSpan::new(FileId::from_raw(0), 0, 1, 1, 1)
    }

    fn enum_expr(prefix: &str, alts: &[&str]) -> PatternExpr {
        PatternExpr::new(vec![Segment::new(vec![
            Token::Literal(prefix.to_string()),
            Token::Group {
                group: Group::Enum(alts.iter().map(|s| s.to_string()).collect()),
                axis_id: None,
            },
        ])])
    }

    #[test]
    fn s1_enum_expansion_with_broadcast_endpoint() {
        let id_gen = IdGen::new();
        let mut table = PatternTable::new();

        let inst_name_id = id_gen.next_expr();
        table.insert(
            inst_name_id,
            PatternEntry {
                raw: "M<P|N>".into(),
                kind: PatternKind::Inst,
                parsed: enum_expr("M", &["P", "N"]),
                source_span: None,
            },
        );
        let param_id = id_gen.next_expr();
        table.insert(
            param_id,
            PatternEntry {
                raw: "<1|2>".into(),
                kind: PatternKind::Param,
                parsed: PatternExpr::new(vec![Segment::new(vec![Token::Group {
                    group: Group::Enum(vec!["1".into(), "2".into()]),
                    axis_id: None,
                }])]),
                source_span: None,
            },
        );
        let net_name_id = id_gen.next_expr();
        table.insert(
            net_name_id,
            PatternEntry {
                raw: "IN".into(),
                kind: PatternKind::Net,
                parsed: PatternExpr::new(vec![Segment::new(vec![Token::Literal("IN".into())])]),
                source_span: None,
            },
        );
        let ep_expr_id = id_gen.next_expr();
        table.insert(
            ep_expr_id,
            PatternEntry {
                raw: "M<P|N>.G".into(),
                kind: PatternKind::Endpoint,
                parsed: enum_expr_suffixed("M", &["P", "N"], ".G"),
                source_span: None,
            },
        );

        let mut parameters = IndexMap::new();
        parameters.insert("m".to_string(), ParamBinding::Pattern(param_id));

        let net = Net {
            net_id: id_gen.next_net(),
            name_expr_id: net_name_id,
            port_introducing: false,
            span: span(),
        };

        let module = Module {
            module_id: id_gen.next_module(),
            name: "test".into(),
            view: None,
            file_id: FileId::from_raw(0),
            ports: vec!["VDD".into(), "VSS".into(), "IN".into(), "OUT".into()],
            nets: vec![net.clone()],
            instances: vec![Instance {
                inst_id: id_gen.next_inst(),
                name_expr_id: inst_name_id,
                ref_kind: RefKind::Device,
                ref_raw: "nfet".into(),
                ref_module: None,
                ref_device: None,
                parameters,
                span: span(),
            }],
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            endpoints: vec![Endpoint {
                endpoint_id: id_gen.next_endpoint(),
                net_id: net.net_id,
                port_expr_id: ep_expr_id,
                conn_label: None,
                suppress_default_warning: false,
                span: span(),
            }],
            instance_defaults: vec![],
            pattern_table: table,
            named_patterns: IndexMap::new(),
            span: span(),
        };

        let mut diags = Diagnostics::new();
        let graph = PatternedGraph::new();
        let atomized = atomize_module(&graph, &module, &id_gen, &mut diags);
        assert!(!diags.has_errors());

        let literals: Vec<_> = atomized.instances.iter().map(|i| i.literal.clone()).collect();
        assert_eq!(literals, vec!["MP", "MN"]);
        assert_eq!(atomized.instances[0].parameters.get("m"), Some(&ParamValue::Int(1)));
        assert_eq!(atomized.instances[1].parameters.get("m"), Some(&ParamValue::Int(2)));

        assert_eq!(atomized.endpoints.len(), 2);
        assert!(atomized.endpoints.iter().all(|e| e.net_literal == "IN"));
    }

    fn enum_expr_suffixed(prefix: &str, alts: &[&str], suffix: &str) -> PatternExpr {
        PatternExpr::new(vec![Segment::new(vec![
            Token::Literal(prefix.to_string()),
            Token::Group {
                group: Group::Enum(alts.iter().map(|s| s.to_string()).collect()),
                axis_id: None,
            },
            Token::Literal(suffix.to_string()),
        ])])
    }

    #[test]
    fn s2_range_reversal() {
        let id_gen = IdGen::new();
        let mut table = PatternTable::new();
        let expr_id = id_gen.next_expr();
        table.insert(
            expr_id,
            PatternEntry {
                raw: "R<3:0>".into(),
                kind: PatternKind::Inst,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("R".into()),
                    Token::Group {
                        group: Group::Range { start: 3, end: 0 },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );
        let module = Module {
            module_id: id_gen.next_module(),
            name: "t".into(),
            view: None,
            file_id: FileId::from_raw(0),
            ports: vec![],
            nets: vec![],
            instances: vec![Instance {
                inst_id: id_gen.next_inst(),
                name_expr_id: expr_id,
                ref_kind: RefKind::Device,
                ref_raw: "r".into(),
                ref_module: None,
                ref_device: None,
                parameters: IndexMap::new(),
                span: span(),
            }],
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            endpoints: vec![],
            instance_defaults: vec![],
            pattern_table: table,
            named_patterns: IndexMap::new(),
            span: span(),
        };
        let mut diags = Diagnostics::new();
        let graph = PatternedGraph::new();
        let atomized = atomize_module(&graph, &module, &id_gen, &mut diags);
        let literals: Vec<_> = atomized.instances.iter().map(|i| i.literal.clone()).collect();
        assert_eq!(literals, vec!["R3", "R2", "R1", "R0"]);
    }

    #[test]
    fn s4_literal_collision_is_fatal() {
        let id_gen = IdGen::new();
        let mut table = PatternTable::new();
        let a_id = id_gen.next_expr();
        table.insert(
            a_id,
            PatternEntry {
                raw: "M_<1>".into(),
                kind: PatternKind::Inst,
                parsed: PatternExpr::new(vec![Segment::new(vec![Token::Literal("M_1".into())])]),
                source_span: None,
            },
        );
        let b_id = id_gen.next_expr();
        table.insert(
            b_id,
            PatternEntry {
                raw: "M_<1:1>".into(),
                kind: PatternKind::Inst,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("M_".into()),
                    Token::Group {
                        group: Group::Range { start: 1, end: 1 },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );
        let module = Module {
            module_id: id_gen.next_module(),
            name: "t".into(),
            view: None,
            file_id: FileId::from_raw(0),
            ports: vec![],
            nets: vec![],
            instances: vec![
                Instance {
                    inst_id: id_gen.next_inst(),
                    name_expr_id: a_id,
                    ref_kind: RefKind::Device,
                    ref_raw: "nfet".into(),
                    ref_module: None,
                    ref_device: None,
                    parameters: IndexMap::new(),
                    span: span(),
                },
                Instance {
                    inst_id: id_gen.next_inst(),
                    name_expr_id: b_id,
                    ref_kind: RefKind::Device,
                    ref_raw: "nfet".into(),
                    ref_module: None,
                    ref_device: None,
                    parameters: IndexMap::new(),
                    span: span(),
                },
            ],
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            endpoints: vec![],
            instance_defaults: vec![],
            pattern_table: table,
            named_patterns: IndexMap::new(),
            span: span(),
        };
        let mut diags = Diagnostics::new();
        let graph = PatternedGraph::new();
        atomize_module(&graph, &module, &id_gen, &mut diags);
        assert!(diags.iter().any(|d| d.code == "E-COLL-INST"));
    }

    fn literal_pattern(id_gen: &IdGen, table: &mut PatternTable, kind: PatternKind, literal: &str) -> asdl_ir::ids::ExprId {
        let id = id_gen.next_expr();
        table.insert(
            id,
            PatternEntry {
                raw: literal.to_string(),
                kind,
                parsed: PatternExpr::new(vec![Segment::new(vec![Token::Literal(literal.to_string())])]),
                source_span: None,
            },
        );
        id
    }

    #[test]
    fn instance_default_connects_unconnected_port_and_flags_explicit_override() {
        use asdl_ir::patterned::{Device, InstanceDefault};

        let id_gen = IdGen::new();
        let mut table = PatternTable::new();

        let m1_id = literal_pattern(&id_gen, &mut table, PatternKind::Inst, "M1");
        let m2_id = literal_pattern(&id_gen, &mut table, PatternKind::Inst, "M2");
        let m2_port_id = literal_pattern(&id_gen, &mut table, PatternKind::Endpoint, "M2.B");
        let default_port_id = literal_pattern(&id_gen, &mut table, PatternKind::Param, "B");

        let device_id = id_gen.next_device();
        let device = Device {
            device_id,
            name: "nfet".into(),
            ports: vec!["D".into(), "G".into(), "S".into(), "B".into()],
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            spice_template: "M{name} {D} {G} {S} {B} nfet".into(),
            pdk: None,
            span: span(),
        };
        let mut devices = IndexMap::new();
        devices.insert(device_id, device);
        let graph = PatternedGraph {
            program: vec![asdl_ir::patterned::File {
                file_id: FileId::from_raw(0),
                path: "/t.asdl".into(),
                modules: IndexMap::new(),
                devices,
            }],
            global_parameters: IndexMap::new(),
        };

        let vdd_net_id = id_gen.next_net();
        let vdd_net_expr = literal_pattern(&id_gen, &mut table, PatternKind::Net, "VDD");

        let default_net_id = id_gen.next_net();
        let default_net_expr = literal_pattern(&id_gen, &mut table, PatternKind::Net, "VSS");

        let module = Module {
            module_id: id_gen.next_module(),
            name: "t".into(),
            view: None,
            file_id: FileId::from_raw(0),
            ports: vec![],
            nets: vec![
                Net {
                    net_id: vdd_net_id,
                    name_expr_id: vdd_net_expr,
                    port_introducing: false,
                    span: span(),
                },
                Net {
                    net_id: default_net_id,
                    name_expr_id: default_net_expr,
                    port_introducing: false,
                    span: span(),
                },
            ],
            instances: vec![
                Instance {
                    inst_id: id_gen.next_inst(),
                    name_expr_id: m1_id,
                    ref_kind: RefKind::Device,
                    ref_raw: "nfet".into(),
                    ref_module: None,
                    ref_device: Some(device_id),
                    parameters: IndexMap::new(),
                    span: span(),
                },
                Instance {
                    inst_id: id_gen.next_inst(),
                    name_expr_id: m2_id,
                    ref_kind: RefKind::Device,
                    ref_raw: "nfet".into(),
                    ref_module: None,
                    ref_device: Some(device_id),
                    parameters: IndexMap::new(),
                    span: span(),
                },
            ],
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            endpoints: vec![Endpoint {
                endpoint_id: id_gen.next_endpoint(),
                net_id: vdd_net_id,
                port_expr_id: m2_port_id,
                conn_label: None,
                suppress_default_warning: false,
                span: span(),
            }],
            instance_defaults: vec![InstanceDefault {
                port_expr_id: default_port_id,
                net_id: default_net_id,
                span: span(),
            }],
            pattern_table: table,
            named_patterns: IndexMap::new(),
            span: span(),
        };

        let mut diags = Diagnostics::new();
        let atomized = atomize_module(&graph, &module, &id_gen, &mut diags);
        assert!(!diags.has_errors());

        let m1_bulk = atomized
            .endpoints
            .iter()
            .find(|e| e.inst_literal == "M1" && e.port_literal == "B")
            .expect("M1.B should get the default connection");
        assert_eq!(m1_bulk.net_literal, "VSS");
        assert_eq!(m1_bulk.conn_label, None);

        let m2_bulk = atomized
            .endpoints
            .iter()
            .find(|e| e.inst_literal == "M2" && e.port_literal == "B")
            .expect("M2.B keeps its explicit connection");
        assert_eq!(m2_bulk.net_literal, "VDD");
        assert_eq!(m2_bulk.conn_label.as_deref(), Some("instance_default_override"));
    }

    fn named_group(start: i64, end: i64, tag: Option<&str>) -> NamedPatternDef {
        NamedPatternDef {
            group: Group::Range { start, end },
            axis_id: tag.map(str::to_string),
            source_span: None,
        }
    }

    fn base_module(id_gen: &IdGen, table: PatternTable, net: Net, ep_expr_id: asdl_ir::ids::ExprId) -> Module {
        Module {
            module_id: id_gen.next_module(),
            name: "t".into(),
            view: None,
            file_id: FileId::from_raw(0),
            ports: vec![],
            nets: vec![net.clone()],
            instances: vec![],
            parameters: IndexMap::new(),
            variables: IndexMap::new(),
            endpoints: vec![Endpoint {
                endpoint_id: id_gen.next_endpoint(),
                net_id: net.net_id,
                port_expr_id: ep_expr_id,
                conn_label: None,
                suppress_default_warning: false,
                span: span(),
            }],
            instance_defaults: vec![],
            pattern_table: table,
            named_patterns: IndexMap::new(),
            span: span(),
        }
    }

    /// S3-equivalent: a tagged axis (`BUS`) shared between a 3-wide net
    /// pattern and a 3-wide endpoint pattern group lets them bind by
    /// position on that axis, even though an unrelated untagged `ROW`
    /// axis also varies on the endpoint side (§4.3 ADR-0019/0020).
    #[test]
    fn s3_tagged_axis_broadcast_binding() {
        let id_gen = IdGen::new();
        let mut table = PatternTable::new();

        let net_expr_id = id_gen.next_expr();
        table.insert(
            net_expr_id,
            PatternEntry {
                raw: "BUS<@BUS25>".into(),
                kind: PatternKind::Net,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("BUS".into()),
                    Token::Group {
                        group: Group::Named { name: "BUS25".into() },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );
        let ep_expr_id = id_gen.next_expr();
        table.insert(
            ep_expr_id,
            PatternEntry {
                raw: "sw_row<@ROW>.BUS<@BUS0>".into(),
                kind: PatternKind::Endpoint,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("sw_row".into()),
                    Token::Group {
                        group: Group::Named { name: "ROW".into() },
                        axis_id: None,
                    },
                    Token::Literal(".BUS".into()),
                    Token::Group {
                        group: Group::Named { name: "BUS0".into() },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );

        let net = Net {
            net_id: id_gen.next_net(),
            name_expr_id: net_expr_id,
            port_introducing: false,
            span: span(),
        };
        let mut module = base_module(&id_gen, table, net, ep_expr_id);
        module.named_patterns.insert("ROW".into(), named_group(2, 1, None));
        module.named_patterns.insert("BUS25".into(), named_group(3, 1, Some("BUS")));
        module.named_patterns.insert("BUS0".into(), named_group(2, 0, Some("BUS")));

        let mut diags = Diagnostics::new();
        let graph = PatternedGraph::new();
        let atomized = atomize_module(&graph, &module, &id_gen, &mut diags);
        assert!(!diags.has_errors());
        assert_eq!(atomized.endpoints.len(), 6);

        let net_for = |inst: &str, port: &str| -> &str {
            atomized
                .endpoints
                .iter()
                .find(|e| e.inst_literal == inst && e.port_literal == port)
                .map(|e| e.net_literal.as_str())
                .unwrap_or_else(|| panic!("no endpoint for {inst}.{port}"))
        };
        assert_eq!(net_for("sw_row2", "BUS2"), "BUS3");
        assert_eq!(net_for("sw_row2", "BUS0"), "BUS1");
        assert_eq!(net_for("sw_row1", "BUS1"), "BUS2");
    }

    /// Mismatched lengths on a shared tagged axis are fatal (`E-AXIS-LEN`),
    /// not a silent truncation.
    #[test]
    fn tagged_axis_length_mismatch_is_axis_len_error() {
        let id_gen = IdGen::new();
        let mut table = PatternTable::new();

        let net_expr_id = id_gen.next_expr();
        table.insert(
            net_expr_id,
            PatternEntry {
                raw: "BUS<@BUS25>".into(),
                kind: PatternKind::Net,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("BUS".into()),
                    Token::Group {
                        group: Group::Named { name: "BUS25".into() },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );
        let ep_expr_id = id_gen.next_expr();
        table.insert(
            ep_expr_id,
            PatternEntry {
                raw: "sw.BUS<@BUS0>".into(),
                kind: PatternKind::Endpoint,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("sw.BUS".into()),
                    Token::Group {
                        group: Group::Named { name: "BUS0".into() },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );

        let net = Net {
            net_id: id_gen.next_net(),
            name_expr_id: net_expr_id,
            port_introducing: false,
            span: span(),
        };
        let mut module = base_module(&id_gen, table, net, ep_expr_id);
        module.named_patterns.insert("BUS25".into(), named_group(3, 1, Some("BUS")));
        module.named_patterns.insert("BUS0".into(), named_group(1, 0, Some("BUS")));

        let mut diags = Diagnostics::new();
        let graph = PatternedGraph::new();
        atomize_module(&graph, &module, &id_gen, &mut diags);
        assert!(diags.iter().any(|d| d.code == "E-AXIS-LEN"));
    }

    /// Plain same-length unnamed bus-to-bus wiring (no tags at all) binds
    /// positionally under strict equal-length binding (spec.md §4.3, final
    /// sentence of the broadcast-binding paragraph).
    #[test]
    fn unnamed_equal_length_bus_binds_positionally() {
        let id_gen = IdGen::new();
        let mut table = PatternTable::new();

        let net_expr_id = id_gen.next_expr();
        table.insert(
            net_expr_id,
            PatternEntry {
                raw: "BUS<2:0>".into(),
                kind: PatternKind::Net,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("BUS".into()),
                    Token::Group {
                        group: Group::Range { start: 2, end: 0 },
                        axis_id: None,
                    },
                ])]),
                source_span: None,
            },
        );
        let ep_expr_id = id_gen.next_expr();
        table.insert(
            ep_expr_id,
            PatternEntry {
                raw: "inst<2:0>.G".into(),
                kind: PatternKind::Endpoint,
                parsed: PatternExpr::new(vec![Segment::new(vec![
                    Token::Literal("inst".into()),
                    Token::Group {
                        group: Group::Range { start: 2, end: 0 },
                        axis_id: None,
                    },
                    Token::Literal(".G".into()),
                ])]),
                source_span: None,
            },
        );

        let net = Net {
            net_id: id_gen.next_net(),
            name_expr_id: net_expr_id,
            port_introducing: false,
            span: span(),
        };
        let module = base_module(&id_gen, table, net, ep_expr_id);

        let mut diags = Diagnostics::new();
        let graph = PatternedGraph::new();
        let atomized = atomize_module(&graph, &module, &id_gen, &mut diags);
        assert!(!diags.has_errors());

        let net_for = |inst: &str, port: &str| -> &str {
            atomized
                .endpoints
                .iter()
                .find(|e| e.inst_literal == inst && e.port_literal == port)
                .map(|e| e.net_literal.as_str())
                .unwrap_or_else(|| panic!("no endpoint for {inst}.{port}"))
        };
        assert_eq!(net_for("inst2", "G"), "BUS2");
        assert_eq!(net_for("inst1", "G"), "BUS1");
        assert_eq!(net_for("inst0", "G"), "BUS0");
    }

    #[rstest]
    #[case(vec!["A"], vec!["A", "B"], true)]
    #[case(vec!["B"], vec!["A", "B"], true)]
    #[case(vec!["A", "B"], vec!["A", "X", "B"], true)]
    #[case(vec!["B", "A"], vec!["A", "B"], false)]
    #[case(Vec::<&str>::new(), vec!["A"], true)]
    #[case(vec!["C"], vec!["A", "B"], false)]
    fn is_subsequence_cases(#[case] needle: Vec<&str>, #[case] haystack: Vec<&str>, #[case] expected: bool) {
        let needle: Vec<String> = needle.into_iter().map(String::from).collect();
        let haystack: Vec<String> = haystack.into_iter().map(String::from).collect();
        let needle_refs: Vec<&String> = needle.iter().collect();
        let haystack_refs: Vec<&String> = haystack.iter().collect();
        assert_eq!(is_subsequence(&needle_refs, &haystack_refs), expected);
    }

    quickcheck::quickcheck! {
        /// A sequence is always a subsequence of itself with anything interspersed.
        fn is_subsequence_of_self_with_interleaving(base: Vec<u8>, noise: Vec<u8>) -> bool {
            let needle: Vec<String> = base.iter().map(|n| n.to_string()).collect();
            let mut merged = needle.clone();
            for (i, n) in noise.iter().enumerate() {
                merged.insert(i.min(merged.len()), format!("noise{n}"));
            }
            let needle_refs: Vec<&String> = needle.iter().collect();
            let merged_refs: Vec<&String> = merged.iter().collect();
            is_subsequence(&needle_refs, &merged_refs)
        }

        /// Reversing a needle longer than one distinct element is never still a
        /// subsequence of the original ascending order (round-trip break check).
        fn is_subsequence_breaks_on_reversal_of_distinct_run(run: Vec<u8>) -> bool {
            let mut distinct: Vec<u8> = run;
            distinct.sort_unstable();
            distinct.dedup();
            if distinct.len() < 2 {
                return true;
            }
            let forward: Vec<String> = distinct.iter().map(|n| n.to_string()).collect();
            let mut backward = forward.clone();
            backward.reverse();
            let backward_refs: Vec<&String> = backward.iter().collect();
            let forward_refs: Vec<&String> = forward.iter().collect();
            !is_subsequence(&backward_refs, &forward_refs)
        }
    }
}
