//! Binding Verifier (§4.4): runs on the `AtomizedGraph`, checking endpoint
//! resolution, port existence, and `$`-port declaration order. Checks run
//! in the order given in the specification so diagnostics are produced in
//! a stable sequence even before the final `(file, start, component, code)`
//! sort is applied.

use asdl_ir::atomized::{AtomInstance, AtomizedGraph, AtomizedModule};
use asdl_ir::diagnostics::{Diagnostic, Diagnostics};
use asdl_ir::ids::DeviceId;
use asdl_ir::patterned::{Device, RefKind};
use std::collections::{HashMap, HashSet};

const COMPONENT: u8 = 3;

/// Device port lists live on the linked `PatternedGraph` (devices are
/// never pattern-expanded, §3), so the verifier takes a flat lookup built
/// once by the caller from every `File::devices` map in the linked
/// program.
pub type DeviceTable<'a> = HashMap<DeviceId, &'a Device>;

/// Verifies every module in `graph`, pushing diagnostics for every
/// violation found rather than stopping at the first, then appends each
/// module's `$`-introduced port-introducing nets to its emitted port list
/// (§4.4 point 4) so downstream binding/lowering sees them as real ports.
pub fn verify_graph(graph: &mut AtomizedGraph, devices: &DeviceTable<'_>, diags: &mut Diagnostics) {
    for module in graph.modules() {
        verify_module(graph, devices, module, diags);
    }
    for file in &mut graph.program {
        for module in file.modules.values_mut() {
            apply_port_introducing_nets(module);
        }
    }
}

fn verify_module(graph: &AtomizedGraph, devices: &DeviceTable<'_>, module: &AtomizedModule, diags: &mut Diagnostics) {
    let mut seen_pins: HashSet<(&str, &str)> = HashSet::new();

    for ep in &module.endpoints {
        let Some(inst) = module.instance(&ep.inst_literal) else {
            diags.push(
                Diagnostic::error(
                    "E-END-INST",
                    COMPONENT,
                    format!(
                        "endpoint references instance `{}`, which has no atom in module `{}`",
                        ep.inst_literal, module.name
                    ),
                )
                .with_span(ep.span),
            );
            continue;
        };

        let key = (ep.inst_literal.as_str(), ep.port_literal.as_str());
        if !seen_pins.insert(key) {
            diags.push(
                Diagnostic::error(
                    "E-END-DUP",
                    COMPONENT,
                    format!("pin `{}.{}` is connected more than once", ep.inst_literal, ep.port_literal),
                )
                .with_span(ep.span),
            );
        }

        if !instance_exposes_port(graph, devices, inst, &ep.port_literal) {
            diags.push(
                Diagnostic::error(
                    "E-PORT-MISS",
                    COMPONENT,
                    format!(
                        "instance `{}` (referencing `{}`) has no port `{}`",
                        ep.inst_literal,
                        inst.ref_kind_name(),
                        ep.port_literal
                    ),
                )
                .with_span(ep.span),
            );
        }
    }

    for ep in &module.endpoints {
        if ep.conn_label.as_deref() == Some("instance_default_override") {
            diags.push(
                Diagnostic::warning(
                    "P-INSTANCE-DEFAULT-OVERRIDE",
                    COMPONENT,
                    format!(
                        "endpoint `{}.{}` overrides an instance default; prefix with `!` to silence this warning",
                        ep.inst_literal, ep.port_literal
                    ),
                )
                .with_span(ep.span),
            );
        }
    }
}

fn instance_exposes_port(graph: &AtomizedGraph, devices: &DeviceTable<'_>, inst: &AtomInstance, port: &str) -> bool {
    match inst.ref_kind {
        RefKind::Device => inst
            .ref_device
            .and_then(|id| devices.get(&id))
            .map(|dev| dev.ports.iter().any(|p| p == port))
            .unwrap_or(false),
        RefKind::Module => inst
            .ref_module
            .and_then(|id| graph.module(id))
            .map(|m| m.ports.iter().any(|p| p == port))
            .unwrap_or(false),
    }
}

/// Collects the module's `$`-introduced ports in declaration order
/// (ADR-0007): `nets:` entries first, then any net introduced later by an
/// `instance_defaults` entry, exactly as they appear in `module.nets` (the
/// builder appends new nets in the order it encounters them, and the
/// atomizer never reorders `nets`).
fn collect_port_introducing_nets(module: &AtomizedModule) -> Vec<&str> {
    module
        .nets
        .iter()
        .filter(|n| n.port_introducing)
        .map(|n| n.literal.as_str())
        .collect()
}

/// Appends `module`'s port-introducing net literals to its port list,
/// skipping any already present (an authored `ports:` entry sharing the
/// same name as a `$`-net, or a second pass over an already-fixed-up
/// module).
fn apply_port_introducing_nets(module: &mut AtomizedModule) {
    let extra: Vec<String> = collect_port_introducing_nets(module).into_iter().map(str::to_string).collect();
    for literal in extra {
        if !module.ports.contains(&literal) {
            module.ports.push(literal);
        }
    }
}

trait RefKindName {
    fn ref_kind_name(&self) -> &'static str;
}

impl RefKindName for AtomInstance {
    fn ref_kind_name(&self) -> &'static str {
        match self.ref_kind {
            RefKind::Module => "module",
            RefKind::Device => "device",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ir::atomized::{AtomEndpoint, AtomNet, PatternOrigin};
    use asdl_ir::ids::{FileId, IdGen};
    use asdl_ir::span::SourceSpan;
    use indexmap::IndexMap;

    fn span() -> SourceSpan {
        SourceSpan::new(FileId::from_raw(0), 0, 1, 1, 1)
    }

    fn origin(id_gen: &IdGen) -> PatternOrigin {
        PatternOrigin::literal(id_gen.next_expr(), "x")
    }

    fn module_with_endpoint(inst_literal: &str, port_literal: &str, id_gen: &IdGen) -> AtomizedModule {
        AtomizedModule {
            module_id: id_gen.next_module(),
            name: "top".into(),
            view: None,
            file_id: FileId::from_raw(0),
            ports: vec![],
            nets: vec![AtomNet {
                net_id: id_gen.next_net(),
                literal: "IN".into(),
                port_introducing: true,
                origin: origin(id_gen),
                span: span(),
            }],
            instances: vec![AtomInstance {
                inst_id: id_gen.next_inst(),
                literal: "M1".into(),
                ref_kind: RefKind::Module,
                ref_module: None,
                ref_device: None,
                parameters: IndexMap::new(),
                origin: origin(id_gen),
                span: span(),
            }],
            parameters: IndexMap::new(),
            endpoints: vec![AtomEndpoint {
                endpoint_id: id_gen.next_endpoint(),
                net_literal: "IN".into(),
                inst_literal: inst_literal.into(),
                port_literal: port_literal.into(),
                conn_label: None,
                suppress_default_warning: false,
                origin: origin(id_gen),
                span: span(),
            }],
            span: span(),
        }
    }

    #[test]
    fn unresolved_instance_literal_is_end_inst() {
        let id_gen = IdGen::new();
        let module = module_with_endpoint("MISSING", "G", &id_gen);
        let graph = AtomizedGraph {
            program: vec![],
            global_parameters: IndexMap::new(),
        };
        let devices = DeviceTable::new();
        let mut diags = Diagnostics::new();
        verify_module(&graph, &devices, &module, &mut diags);
        assert!(diags.iter().any(|d| d.code == "E-END-INST"));
    }

    #[test]
    fn unresolvable_port_is_port_miss() {
        let id_gen = IdGen::new();
        let module = module_with_endpoint("M1", "G", &id_gen);
        let graph = AtomizedGraph {
            program: vec![],
            global_parameters: IndexMap::new(),
        };
        let devices = DeviceTable::new();
        let mut diags = Diagnostics::new();
        verify_module(&graph, &devices, &module, &mut diags);
        assert!(diags.iter().any(|d| d.code == "E-PORT-MISS"));
    }

    #[test]
    fn duplicate_pin_connection_is_end_dup() {
        let id_gen = IdGen::new();
        let mut module = module_with_endpoint("M1", "G", &id_gen);
        let mut second = module.endpoints[0].clone();
        second.endpoint_id = id_gen.next_endpoint();
        module.endpoints.push(second);
        let graph = AtomizedGraph {
            program: vec![],
            global_parameters: IndexMap::new(),
        };
        let devices = DeviceTable::new();
        let mut diags = Diagnostics::new();
        verify_module(&graph, &devices, &module, &mut diags);
        assert!(diags.iter().any(|d| d.code == "E-END-DUP"));
    }

    #[test]
    fn port_introducing_nets_collected_in_declaration_order() {
        let id_gen = IdGen::new();
        let module = module_with_endpoint("M1", "G", &id_gen);
        let order = collect_port_introducing_nets(&module);
        assert_eq!(order, vec!["IN"]);
    }

    #[test]
    fn verify_graph_appends_port_introducing_nets_to_ports() {
        use asdl_ir::atomized::AtomizedFile;

        let id_gen = IdGen::new();
        let module = module_with_endpoint("M1", "G", &id_gen);
        assert!(module.ports.is_empty());
        let module_id = module.module_id;

        let mut modules = IndexMap::new();
        modules.insert(module_id, module);
        let mut graph = AtomizedGraph {
            program: vec![AtomizedFile {
                file_id: FileId::from_raw(0),
                path: "top.asdl".into(),
                modules,
            }],
            global_parameters: IndexMap::new(),
        };

        let devices = DeviceTable::new();
        let mut diags = Diagnostics::new();
        verify_graph(&mut graph, &devices, &mut diags);

        assert_eq!(graph.module(module_id).unwrap().ports, vec!["IN".to_string()]);
    }

    #[test]
    fn apply_port_introducing_nets_is_idempotent() {
        let id_gen = IdGen::new();
        let mut module = module_with_endpoint("M1", "G", &id_gen);
        apply_port_introducing_nets(&mut module);
        apply_port_introducing_nets(&mut module);
        assert_eq!(module.ports, vec!["IN".to_string()]);
    }
}
