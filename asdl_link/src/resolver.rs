//! Import Resolver (§4.1): DFS's the file dependency graph from an entry
//! file, resolves `model_alias` and instance references, and drives the
//! `PatternedGraph` Builder over every file it visits.

use crate::alias::{self, AliasTarget, NameEnv, ResolvedRef};
use crate::builder::build_file;
use crate::error::LinkError;
use crate::loader::Loader;
use crate::roots::SearchRoots;
use asdl_ir::diagnostics::{Diagnostic, Diagnostics};
use asdl_ir::ids::{DeviceId, FileId, IdGen, ModuleId};
use asdl_ir::patterned::{PatternedGraph, RefKind};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const COMPONENT: u8 = 0;

struct LoadedFile {
    file_id: FileId,
    ast: asdl_ir::ast::FileAst,
    import_files: IndexMap<String, FileId>,
}

/// Resolves and lowers the file dependency graph rooted at `entry_path`.
/// Returns `(None, diagnostics)` if any fatal diagnostic was raised;
/// `diagnostics` always carries every warning and error seen along the way.
pub fn link(entry_path: &Path, loader: &dyn Loader, roots: &SearchRoots) -> (Option<PatternedGraph>, Diagnostics) {
    let mut diags = Diagnostics::new();
    let id_gen = IdGen::new();
    let mut visited: HashMap<PathBuf, FileId> = HashMap::new();
    let mut loaded: Vec<LoadedFile> = Vec::new();

    let entry_id = visit(
        entry_path,
        loader,
        roots,
        &id_gen,
        &mut visited,
        &mut Vec::new(),
        &mut loaded,
        &mut diags,
    );

    if entry_id.is_none() || diags.has_errors() {
        return (None, diags);
    }

    // Phase 1: a global name index so instance references can resolve
    // across files without rebuilding anything.
    let mut name_index: HashMap<(FileId, String), RefTarget> = HashMap::new();
    for lf in &loaded {
        for m in &lf.ast.modules {
            name_index.insert(
                (lf.file_id, m.symbol.cell.clone()),
                RefTarget::Module,
            );
        }
        for d in &lf.ast.devices {
            name_index.insert((lf.file_id, d.name.clone()), RefTarget::Device);
        }
    }
    let exists_in_file = |file: FileId, name: &str| name_index.contains_key(&(file, name.to_string()));

    // Phase 2: build a NameEnv per file and validate model_alias targets
    // up front (E0444/E0445), independent of whether any instance uses them.
    let mut envs: HashMap<FileId, NameEnv> = HashMap::new();
    for lf in &loaded {
        let mut env = NameEnv {
            imports: lf.import_files.clone(),
            model_alias: IndexMap::new(),
        };
        for (key, raw_target) in &lf.ast.model_alias {
            let target = alias::parse_alias_target(raw_target);
            match &target {
                AliasTarget::Local(name) => {
                    if !exists_in_file(lf.file_id, name) {
                        diags.push(Diagnostic::error(
                            "E0444",
                            COMPONENT,
                            format!("model_alias `{key}` targets undefined module/device `{name}`"),
                        ));
                    }
                }
                AliasTarget::Qualified { import_alias, module } => match lf.import_files.get(import_alias) {
                    Some(&file) if exists_in_file(file, module) => {}
                    _ => diags.push(Diagnostic::error(
                        "E0445",
                        COMPONENT,
                        format!("model_alias `{key}` targets unresolved `{import_alias}.{module}`"),
                    )),
                },
            }
            env.model_alias.insert(key.clone(), target);
        }
        envs.insert(lf.file_id, env);
    }

    // Phase 3: lower every file into the patterned shape.
    let mut program = Vec::new();
    for lf in &loaded {
        program.push(build_file(&lf.ast, lf.file_id, &id_gen, &mut diags));
    }

    // Phase 4: resolve every instance reference via the three-step lookup
    // (§4.1), now that every module/device across the graph has an id.
    let mut resolved_index: HashMap<(FileId, String), RefTarget2> = HashMap::new();
    for file in &program {
        for module in file.modules.values() {
            resolved_index.insert(
                (file.file_id, module.name.clone()),
                RefTarget2::Module(module.module_id),
            );
        }
        for device in file.devices.values() {
            resolved_index.insert(
                (file.file_id, device.name.clone()),
                RefTarget2::Device(device.device_id),
            );
        }
    }

    for file in &mut program {
        let env = envs.get(&file.file_id).expect("every file has a NameEnv");
        for module in file.modules.values_mut() {
            for inst in &mut module.instances {
                match env.resolve_ref(file.file_id, &inst.ref_raw, &exists_in_file) {
                    Some(ResolvedRef::In { file: target_file, name }) => {
                        match resolved_index.get(&(target_file, name)) {
                            Some(RefTarget2::Module(id)) => {
                                inst.ref_kind = RefKind::Module;
                                inst.ref_module = Some(*id);
                            }
                            Some(RefTarget2::Device(id)) => {
                                inst.ref_kind = RefKind::Device;
                                inst.ref_device = Some(*id);
                            }
                            None => diags.push(
                                Diagnostic::error(
                                    "E0448",
                                    COMPONENT,
                                    format!("instance reference `{}` could not be resolved", inst.ref_raw),
                                )
                                .with_span(inst.span),
                            ),
                        }
                    }
                    None => diags.push(
                        Diagnostic::error(
                            "E0448",
                            COMPONENT,
                            format!("instance reference `{}` could not be resolved", inst.ref_raw),
                        )
                        .with_span(inst.span),
                    ),
                }
            }
        }
    }

    if diags.has_errors() {
        return (None, diags);
    }

    let entry_id = entry_id.expect("checked Some above");
    let global_parameters = loaded
        .iter()
        .find(|lf| lf.file_id == entry_id)
        .map(|lf| lf.ast.global_parameters.clone().into_iter().collect())
        .unwrap_or_default();

    (
        Some(PatternedGraph {
            program,
            global_parameters,
        }),
        diags,
    )
}

#[derive(Clone, Copy)]
enum RefTarget {
    Module,
    Device,
}

#[derive(Clone, Copy)]
enum RefTarget2 {
    Module(ModuleId),
    Device(DeviceId),
}

#[allow(clippy::too_many_arguments)]
fn visit(
    path: &Path,
    loader: &dyn Loader,
    roots: &SearchRoots,
    id_gen: &IdGen,
    visited: &mut HashMap<PathBuf, FileId>,
    visiting: &mut Vec<PathBuf>,
    loaded: &mut Vec<LoadedFile>,
    diags: &mut Diagnostics,
) -> Option<FileId> {
    let canonical = path.to_path_buf();

    if let Some(&id) = visited.get(&canonical) {
        return Some(id);
    }
    if visiting.contains(&canonical) {
        let mut cycle: Vec<String> = visiting.iter().map(|p| p.display().to_string()).collect();
        cycle.push(canonical.display().to_string());
        diags.push(Diagnostic::error(
            "E0442",
            COMPONENT,
            format!("import cycle: {}", cycle.join(" -> ")),
        ));
        return None;
    }

    let ast = match loader.load(&canonical) {
        Ok(ast) => ast,
        Err(LinkError::Io { path, source }) => {
            diags.push(Diagnostic::error(
                "E0441",
                COMPONENT,
                format!("failed to read {}: {source}", path.display()),
            ));
            return None;
        }
        Err(LinkError::Parse { path, message }) => {
            diags.push(Diagnostic::error(
                "E0441",
                COMPONENT,
                format!("failed to parse {}: {message}", path.display()),
            ));
            return None;
        }
    };

    let file_id = id_gen.next_file();
    visited.insert(canonical.clone(), file_id);
    visiting.push(canonical.clone());

    let mut import_files = IndexMap::new();
    for (alias, import_path) in &ast.imports {
        if import_path.contains("${") {
            diags.push(Diagnostic::error(
                "E0449",
                COMPONENT,
                format!("import path `{import_path}` may not contain a `${{...}}` substitution"),
            ));
            continue;
        }
        let candidates = roots.candidates(&canonical, import_path);
        match candidates.as_slice() {
            [] => {
                diags.push(Diagnostic::error(
                    "E0441",
                    COMPONENT,
                    format!("import `{import_path}` not found from {}", canonical.display()),
                ));
            }
            [single] => {
                if let Some(child_id) = visit(single, loader, roots, id_gen, visited, visiting, loaded, diags) {
                    import_files.insert(alias.clone(), child_id);
                }
            }
            many => {
                diags.push(Diagnostic::error(
                    "E0447",
                    COMPONENT,
                    format!(
                        "import `{import_path}` is ambiguous across {} roots: {}",
                        many.len(),
                        many.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
                    ),
                ));
            }
        }
    }

    visiting.pop();
    loaded.push(LoadedFile {
        file_id,
        ast,
        import_files,
    });
    Some(file_id)
}
