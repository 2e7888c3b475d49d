//! `PatternedGraph` Builder (§4.2).
//!
//! Lowers a resolved `FileAst` forest into `asdl_ir::patterned::{File,
//! Module, Device}`: every entity gets a stable id and a retained source
//! span, every pattern-bearing string is lexed and registered in its
//! module's `PatternTable`, and module-local variables are substituted
//! into instance-parameter values before their patterns are registered.
//!
//! Instance references are left unresolved here (`ref_kind`/`ref_module`/
//! `ref_device` are placeholders) — `resolver` fills them in once every
//! file in the import graph has been built and a `NameEnv` exists.

use crate::lexer::{lex_pattern, LexError};
use crate::vars::{resolve_module_variables, substitute, VarError};
use asdl_ir::ast::{DeviceAst, FileAst, ModuleAst, RawParamValue};
use asdl_ir::diagnostics::{Diagnostic, Diagnostics};
use asdl_ir::ids::{FileId, IdGen};
use asdl_ir::pattern::{Group, NamedPatternDef, PatternEntry, PatternExpr, PatternKind, PatternTable, Token};
use asdl_ir::patterned::{Device, Endpoint, File, Instance, InstanceDefault, Module, Net, ParamBinding, RefKind};
use asdl_ir::span::SourceSpan;
use asdl_ir::value::ParamValue;
use indexmap::IndexMap;

const COMPONENT: u8 = 1;

/// Lowers every module and device in `ast` into a `patterned::File`.
/// Never fails outright: an entity whose own pattern or variable table is
/// malformed is dropped and diagnosed, but its siblings still build.
pub fn build_file(ast: &FileAst, file_id: FileId, id_gen: &IdGen, diags: &mut Diagnostics) -> File {
    let mut modules = IndexMap::new();
    for module_ast in &ast.modules {
        if let Some(module) = build_module(module_ast, file_id, id_gen, diags) {
            modules.insert(module.module_id, module);
        }
    }

    let mut devices = IndexMap::new();
    for device_ast in &ast.devices {
        let device = build_device(device_ast, id_gen, diags);
        devices.insert(device.device_id, device);
    }

    File {
        file_id,
        path: ast.path.clone(),
        modules,
        devices,
    }
}

fn build_module(ast: &ModuleAst, file_id: FileId, id_gen: &IdGen, diags: &mut Diagnostics) -> Option<Module> {
    let variables = match resolve_module_variables(&ast.variables) {
        Ok(v) => v,
        Err(e) => {
            diags.push(var_error_diagnostic(&e, ast.span));
            IndexMap::new()
        }
    };

    let mut pattern_table = PatternTable::new();
    let named_patterns = build_named_patterns(ast, id_gen, diags);

    let mut net_lookup: IndexMap<String, asdl_ir::ids::NetId> = IndexMap::new();
    let mut nets = Vec::new();
    for net in &ast.nets {
        if let Some(n) = register_net(&net.name_raw, net.span, id_gen, &mut pattern_table, diags) {
            net_lookup.insert(net.name_raw.clone(), n.net_id);
            nets.push(n);
        }
    }

    let mut instances = Vec::new();
    let mut endpoints = Vec::new();
    for inst_ast in &ast.instances {
        let name_expr_id = match register_pattern(
            &inst_ast.name_raw,
            PatternKind::Inst,
            inst_ast.span,
            id_gen,
            &mut pattern_table,
            diags,
        ) {
            Some(id) => id,
            None => continue,
        };

        let mut parameters = IndexMap::new();
        for (pname, raw_value) in &inst_ast.parameters {
            match raw_value {
                RawParamValue::Value(v) => {
                    parameters.insert(pname.clone(), ParamBinding::Value(v.clone()));
                }
                RawParamValue::Pattern(raw) => {
                    let substituted = match substitute(raw, &variables) {
                        Ok(s) => s,
                        Err(e) => {
                            diags.push(var_error_diagnostic(&e, inst_ast.span));
                            continue;
                        }
                    };
                    if let Some(expr_id) = register_pattern(
                        &substituted,
                        PatternKind::Param,
                        inst_ast.span,
                        id_gen,
                        &mut pattern_table,
                        diags,
                    ) {
                        parameters.insert(pname.clone(), ParamBinding::Pattern(expr_id));
                    }
                }
            }
        }

        let inst_id = id_gen.next_inst();
        instances.push(Instance {
            inst_id,
            name_expr_id,
            ref_kind: RefKind::Module,
            ref_raw: inst_ast.ref_raw.clone(),
            ref_module: None,
            ref_device: None,
            parameters,
            span: inst_ast.span,
        });

        for ep in &inst_ast.endpoints {
            let Some(port_expr_id) = register_pattern(
                &ep.expr_raw,
                PatternKind::Endpoint,
                ep.span,
                id_gen,
                &mut pattern_table,
                diags,
            ) else {
                continue;
            };
            let net_id = match net_lookup.get(&ep.net_raw) {
                Some(id) => *id,
                None => {
                    let Some(n) = register_net(&ep.net_raw, ep.span, id_gen, &mut pattern_table, diags) else {
                        continue;
                    };
                    let id = n.net_id;
                    net_lookup.insert(ep.net_raw.clone(), id);
                    nets.push(n);
                    id
                }
            };
            endpoints.push(Endpoint {
                endpoint_id: id_gen.next_endpoint(),
                net_id,
                port_expr_id,
                conn_label: ep.conn_label.clone(),
                suppress_default_warning: ep.suppress_default_warning,
                span: ep.span,
            });
        }
    }

    let mut instance_defaults = Vec::new();
    for default in &ast.instance_defaults {
        let Some(port_expr_id) =
            register_pattern(&default.port_raw, PatternKind::Param, default.span, id_gen, &mut pattern_table, diags)
        else {
            continue;
        };
        let net_id = match net_lookup.get(&default.net_raw) {
            Some(id) => *id,
            None => {
                let Some(n) = register_net(&default.net_raw, default.span, id_gen, &mut pattern_table, diags) else {
                    continue;
                };
                let id = n.net_id;
                net_lookup.insert(default.net_raw.clone(), id);
                nets.push(n);
                id
            }
        };
        instance_defaults.push(InstanceDefault {
            port_expr_id,
            net_id,
            span: default.span,
        });
    }

    Some(Module {
        module_id: id_gen.next_module(),
        name: ast.symbol.cell.clone(),
        view: ast.symbol.view.clone(),
        file_id,
        ports: ast.ports.iter().map(|p| p.name.clone()).collect(),
        nets,
        instances,
        parameters: IndexMap::new(),
        variables,
        endpoints,
        instance_defaults,
        pattern_table,
        named_patterns,
        span: ast.span,
    })
}

fn build_named_patterns(
    ast: &ModuleAst,
    id_gen: &IdGen,
    diags: &mut Diagnostics,
) -> IndexMap<String, NamedPatternDef> {
    let mut named_patterns = IndexMap::new();
    for (name, def) in &ast.patterns {
        match lex_pattern(&def.expr, PatternKind::Param) {
            Ok(parsed) => match single_group(&parsed) {
                Some(group) => {
                    named_patterns.insert(
                        name.clone(),
                        NamedPatternDef {
                            group,
                            axis_id: def.axis_id.clone(),
                            source_span: Some(def.span),
                        },
                    );
                }
                None => diags.push(
                    Diagnostic::error(
                        "E-PAT-NAMED-SHAPE",
                        COMPONENT,
                        format!("named pattern `{name}` must expand to a single bracketed group"),
                    )
                    .with_span(def.span),
                ),
            },
            Err(e) => diags.push(lex_error_diagnostic(&e, def.span)),
        }
        let _ = id_gen; // named patterns don't mint an ExprId of their own
    }
    named_patterns
}

/// A `PatternExpr` counts as a single bare group when it is exactly one
/// segment holding exactly one `Token::Group`.
fn single_group(expr: &PatternExpr) -> Option<Group> {
    if expr.segments.len() != 1 {
        return None;
    }
    let tokens = expr.segments[0].tokens();
    match tokens {
        [Token::Group { group, .. }] => Some(group.clone()),
        _ => None,
    }
}

fn register_net(
    name_raw: &str,
    span: SourceSpan,
    id_gen: &IdGen,
    pattern_table: &mut PatternTable,
    diags: &mut Diagnostics,
) -> Option<Net> {
    if name_raw.contains(';') {
        diags.push(
            Diagnostic::error(
                "E-NET-SPLICE",
                COMPONENT,
                format!("net name `{name_raw}` may not contain `;`"),
            )
            .with_span(span),
        );
        return None;
    }
    let name_expr_id = register_pattern(name_raw, PatternKind::Net, span, id_gen, pattern_table, diags)?;
    Some(Net {
        net_id: id_gen.next_net(),
        name_expr_id,
        port_introducing: name_raw.starts_with('$'),
        span,
    })
}

/// Lexes `raw` and registers it in `pattern_table` under a fresh `ExprId`,
/// pushing a diagnostic and returning `None` on a lex failure.
fn register_pattern(
    raw: &str,
    kind: PatternKind,
    span: SourceSpan,
    id_gen: &IdGen,
    pattern_table: &mut PatternTable,
    diags: &mut Diagnostics,
) -> Option<asdl_ir::ids::ExprId> {
    match lex_pattern(raw, kind) {
        Ok(parsed) => {
            let expr_id = id_gen.next_expr();
            pattern_table.insert(
                expr_id,
                PatternEntry {
                    raw: raw.to_string(),
                    kind,
                    parsed,
                    source_span: Some(span),
                },
            );
            Some(expr_id)
        }
        Err(e) => {
            diags.push(lex_error_diagnostic(&e, span));
            None
        }
    }
}

fn build_device(ast: &DeviceAst, id_gen: &IdGen, diags: &mut Diagnostics) -> Device {
    let variables = match resolve_module_variables(&ast.variables) {
        Ok(v) => v,
        Err(e) => {
            diags.push(var_error_diagnostic(&e, ast.span));
            IndexMap::new()
        }
    };

    let mut parameters = IndexMap::new();
    for (name, raw_value) in &ast.parameters {
        let value = match raw_value {
            RawParamValue::Value(v) => v.clone(),
            RawParamValue::Pattern(raw) => match substitute(raw, &variables) {
                Ok(s) => ParamValue::String(s),
                Err(e) => {
                    diags.push(var_error_diagnostic(&e, ast.span));
                    ParamValue::String(raw.clone())
                }
            },
        };
        parameters.insert(name.clone(), value);
    }

    Device {
        device_id: id_gen.next_device(),
        name: ast.name.clone(),
        ports: ast.ports.iter().map(|p| p.name.clone()).collect(),
        parameters,
        variables,
        spice_template: ast.spice_template.clone(),
        pdk: ast.pdk.clone(),
        span: ast.span,
    }
}

fn lex_error_diagnostic(err: &LexError, span: SourceSpan) -> Diagnostic {
    let (code, message) = match err {
        LexError::SpliceNotAllowed => ("E-PAT-SPLICE", "`;` is only allowed in endpoint expressions".to_string()),
        LexError::WhitespaceAroundSeparator => (
            "E-PAT-WS",
            "whitespace is not allowed directly around `|` or `;`".to_string(),
        ),
        LexError::MixedGroupSyntax(g) => ("E-PAT-MIXED", format!("group `<{g}>` mixes `|` and `:` syntax")),
        LexError::MultipleColonsInGroup(g) => ("E-PAT-RANGE", format!("group `<{g}>` has more than one `:`")),
        LexError::InvalidRange(g) => ("E-PAT-RANGE", format!("group `<{g}>` has non-integer range bounds")),
        LexError::UnterminatedGroup => ("E-PAT-UNTERMINATED", "`<` without a matching `>`".to_string()),
    };
    Diagnostic::error(code, COMPONENT, message).with_span(span)
}

fn var_error_diagnostic(err: &VarError, span: SourceSpan) -> Diagnostic {
    match err {
        VarError::Undefined(name) => {
            Diagnostic::error("E-VAR-UNDEF", COMPONENT, format!("undefined variable `{name}`")).with_span(span)
        }
        VarError::Cycle(chain) => Diagnostic::error(
            "E-VAR-CYCLE",
            COMPONENT,
            format!("variable cycle: {}", chain.join(" -> ")),
        )
        .with_span(span),
    }
}
