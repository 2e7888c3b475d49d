//! Renderer (§4.7): emits textual netlist output by applying backend
//! system-device templates for headers, footers, and instance calls.

use crate::error::RenderError;
use crate::template::{collapse_empty_placeholder_whitespace, render};
use asdl_ir::config::{BackendConfig, REQUIRED_SYSTEM_DEVICE_KEYS};
use asdl_ir::netlist::{AtomRenderInfo, NetlistModule, NetlistProgram, NetlistStmt};
use asdl_ir::value::ParamValue;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Validates `config` against `REQUIRED_SYSTEM_DEVICE_KEYS`, then emits
/// the full netlist as one string. Fails fast on a missing required
/// template (`E-BACKEND-MISS`) before any module is emitted (§8 S7).
pub fn render_program(program: &NetlistProgram, config: &BackendConfig) -> Result<String, RenderError> {
    if let Some(missing) = config.missing_required_key() {
        return Err(RenderError::MissingTemplate {
            backend: config.backend.clone(),
            key: missing,
        });
    }

    let mut out = String::new();

    out.push_str(&render_system(config, "__netlist_header__", &base_bindings(config, program))?);

    for (name, value) in &program.globals {
        out.push_str(&render_stmt(
            config,
            &NetlistStmt::GlobalParamDecl {
                name: name.clone(),
                value: value.clone(),
            },
        )?);
    }

    for module in &program.modules {
        out.push_str(&render_module(config, module)?);
    }

    out.push_str(&render_system(config, "__netlist_footer__", &base_bindings(config, program))?);

    Ok(out)
}

fn base_bindings(config: &BackendConfig, program: &NetlistProgram) -> BTreeMap<String, String> {
    let mut bindings = BTreeMap::new();
    bindings.insert("backend".to_string(), config.backend.clone());
    bindings.insert("top".to_string(), program.top.clone());
    bindings
}

fn render_system(config: &BackendConfig, key: &'static str, bindings: &BTreeMap<String, String>) -> Result<String, RenderError> {
    let template = config.template(key).ok_or(RenderError::MissingTemplate {
        backend: config.backend.clone(),
        key,
    })?;
    Ok(render(template, bindings))
}

fn render_module(config: &BackendConfig, module: &NetlistModule) -> Result<String, RenderError> {
    let ports = module
        .ports
        .iter()
        .map(|p| bracket_literal(p, &module.atom_origins, config.bracketed_numeric_rendering))
        .join(" ");
    let params = render_params_tokens(module.parameters.iter().map(|(k, v)| (k.as_str(), v)));

    let header_key = if module.is_top {
        "__top_header__"
    } else if params.is_empty() {
        "__subckt_header__"
    } else {
        "__subckt_header_params__"
    };
    let footer_key = if module.is_top { "__top_footer__" } else { "__subckt_footer__" };

    let mut bindings = BTreeMap::new();
    bindings.insert("name".to_string(), module.emitted_name.clone());
    bindings.insert("ports".to_string(), collapse_empty_placeholder_whitespace(&ports));
    bindings.insert("params".to_string(), collapse_empty_placeholder_whitespace(&params));

    let mut out = String::new();
    out.push_str(&render_system_or_fallback(config, header_key, "__subckt_header__", &bindings)?);

    for stmt in &module.body {
        out.push_str(&render_stmt(config, stmt, &module.atom_origins)?);
    }

    out.push_str(&render_system_or_fallback(config, footer_key, "__subckt_footer__", &bindings)?);
    Ok(out)
}

/// Renders `literal` as `base[n1][n2]...` when the backend declares
/// bracketed numeric rendering and `literal`'s pattern origin carries at
/// least one integer substitution value (§4.7 ADR-0018); identity is
/// unaffected, this only changes the emitted text.
fn bracket_literal(literal: &str, origins: &BTreeMap<String, AtomRenderInfo>, enabled: bool) -> String {
    if !enabled {
        return literal.to_string();
    }
    let Some(info) = origins.get(literal) else {
        return literal.to_string();
    };
    if info.int_parts.is_empty() {
        return literal.to_string();
    }
    let mut out = info.base_name.clone();
    for n in &info.int_parts {
        out.push('[');
        out.push_str(&n.to_string());
        out.push(']');
    }
    out
}

/// Optional keys (`__subckt_header_params__`, `__top_header__`,
/// `__top_footer__`) fall back to their always-required sibling when a
/// backend doesn't declare them.
fn render_system_or_fallback(
    config: &BackendConfig,
    key: &'static str,
    fallback: &'static str,
    bindings: &BTreeMap<String, String>,
) -> Result<String, RenderError> {
    if let Some(template) = config.template(key) {
        return Ok(render(template, bindings));
    }
    render_system(config, fallback, bindings)
}

fn render_stmt(config: &BackendConfig, stmt: &NetlistStmt, origins: &BTreeMap<String, AtomRenderInfo>) -> Result<String, RenderError> {
    let enabled = config.bracketed_numeric_rendering;
    match stmt {
        NetlistStmt::DeviceCall {
            template_key,
            bindings,
            ..
        } => {
            let template = config
                .template(template_key)
                .ok_or_else(|| RenderError::MissingDeviceTemplate(template_key.clone()))?;
            let bracketed: BTreeMap<String, String> = bindings
                .iter()
                .map(|(k, v)| (k.clone(), bracket_literal(v, origins, enabled)))
                .collect();
            Ok(render(template, &bracketed))
        }
        NetlistStmt::SubcktCall {
            instance_name,
            target_emitted_name,
            connections,
            parameters,
        } => {
            let params = render_params_tokens(parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let key = if params.is_empty() { "__subckt_call__" } else { "__subckt_call_params__" };
            let ports = connections.iter().map(|c| bracket_literal(c, origins, enabled)).join(" ");
            let mut bindings = BTreeMap::new();
            bindings.insert("name".to_string(), bracket_literal(instance_name, origins, enabled));
            bindings.insert("ref".to_string(), target_emitted_name.clone());
            bindings.insert("ports".to_string(), collapse_empty_placeholder_whitespace(&ports));
            bindings.insert("params".to_string(), collapse_empty_placeholder_whitespace(&params));
            render_system(config, key, &bindings)
        }
        NetlistStmt::GlobalParamDecl { name, value } => {
            Ok(format!(".param {name}={value}\n"))
        }
    }
}

/// Renders parameters as deterministic, space-delimited `key=value`
/// tokens in lexical key order (§4.6/§4.7).
fn render_params_tokens<'a>(params: impl Iterator<Item = (&'a str, impl std::fmt::Display + 'a)>) -> String {
    let mut sorted: Vec<_> = params.collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted.into_iter().map(|(k, v)| format!("{k}={v}")).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ir::config::SystemDeviceTemplate;
    use asdl_ir::netlist::Realization;
    use rstest::rstest;

    fn ngspice_config() -> BackendConfig {
        let mut system_devices = BTreeMap::new();
        for key in REQUIRED_SYSTEM_DEVICE_KEYS {
            system_devices.insert(
                (*key).to_string(),
                SystemDeviceTemplate {
                    template: format!("[{key}:{{name}}:{{ports}}:{{params}}]"),
                },
            );
        }
        system_devices.insert(
            "nfet".to_string(),
            SystemDeviceTemplate {
                template: "M{name} {D} {G} {S} {B} nfet {params}".to_string(),
            },
        );
        BackendConfig {
            backend: "ngspice".into(),
            system_devices,
            bracketed_numeric_rendering: false,
        }
    }

    #[test]
    fn s7_missing_required_key_is_fatal_before_emission() {
        let config = BackendConfig {
            backend: "ngspice".into(),
            system_devices: BTreeMap::new(),
            bracketed_numeric_rendering: false,
        };
        let program = NetlistProgram {
            top: "top".into(),
            modules: vec![],
            globals: BTreeMap::new(),
        };
        let err = render_program(&program, &config).unwrap_err();
        assert!(matches!(err, RenderError::MissingTemplate { .. }));
    }

    #[test]
    fn device_call_renders_via_device_template() {
        let config = ngspice_config();
        let mut bindings = BTreeMap::new();
        bindings.insert("name".to_string(), "M1".to_string());
        bindings.insert("D".to_string(), "OUT".to_string());
        bindings.insert("G".to_string(), "IN".to_string());
        bindings.insert("S".to_string(), "VSS".to_string());
        bindings.insert("B".to_string(), "VSS".to_string());
        let stmt = NetlistStmt::DeviceCall {
            template_key: "nfet".into(),
            bindings,
            conn_label: None,
        };
        let rendered = render_stmt(&config, &stmt, &BTreeMap::new()).unwrap();
        assert_eq!(rendered, "MM1 OUT IN VSS VSS nfet {params}");
    }

    #[test]
    fn subckt_call_picks_params_variant_when_parameters_present() {
        let config = ngspice_config();
        let stmt = NetlistStmt::SubcktCall {
            instance_name: "X1".into(),
            target_emitted_name: "amp".into(),
            connections: vec!["A".into(), "B".into()],
            parameters: vec![("w".into(), "2".into())],
        };
        let rendered = render_stmt(&config, &stmt, &BTreeMap::new()).unwrap();
        assert!(rendered.contains("__subckt_call_params__"));
        assert!(rendered.contains("w=2"));
    }

    #[test]
    fn realization_default_view_is_unaffected_by_render() {
        let r = Realization::new("amp", None);
        assert!(r.is_default_view());
    }

    #[test]
    fn bracketed_numeric_rendering_wraps_integer_pattern_atoms() {
        let mut config = ngspice_config();
        config.bracketed_numeric_rendering = true;

        let mut origins = BTreeMap::new();
        origins.insert(
            "BUS3".to_string(),
            AtomRenderInfo {
                base_name: "BUS".to_string(),
                int_parts: vec![3],
            },
        );
        origins.insert(
            "VSS".to_string(),
            AtomRenderInfo {
                base_name: "VSS".to_string(),
                int_parts: vec![],
            },
        );

        let mut bindings = BTreeMap::new();
        bindings.insert("name".to_string(), "M1".to_string());
        bindings.insert("D".to_string(), "BUS3".to_string());
        bindings.insert("G".to_string(), "VSS".to_string());
        bindings.insert("S".to_string(), "VSS".to_string());
        bindings.insert("B".to_string(), "VSS".to_string());
        let stmt = NetlistStmt::DeviceCall {
            template_key: "nfet".into(),
            bindings,
            conn_label: None,
        };

        let rendered = render_stmt(&config, &stmt, &origins).unwrap();
        assert_eq!(rendered, "MM1 BUS[3] VSS VSS nfet {params}");
    }

    #[test]
    fn bracketed_numeric_rendering_off_by_default_leaves_literals_alone() {
        let config = ngspice_config();
        assert!(!config.bracketed_numeric_rendering);

        let mut origins = BTreeMap::new();
        origins.insert(
            "BUS3".to_string(),
            AtomRenderInfo {
                base_name: "BUS".to_string(),
                int_parts: vec![3],
            },
        );
        assert_eq!(bracket_literal("BUS3", &origins, config.bracketed_numeric_rendering), "BUS3");
    }

    #[rstest]
    #[case(vec![], true, "VSS")]
    #[case(vec![3], true, "BUS[3]")]
    #[case(vec![1, 2], true, "BUS[1][2]")]
    #[case(vec![3], false, "VSS")]
    fn bracket_literal_cases(#[case] int_parts: Vec<i64>, #[case] enabled: bool, #[case] expected: &str) {
        let mut origins = BTreeMap::new();
        origins.insert(
            "VSS".to_string(),
            AtomRenderInfo {
                base_name: "BUS".to_string(),
                int_parts,
            },
        );
        assert_eq!(bracket_literal("VSS", &origins, enabled), expected);
    }
}
