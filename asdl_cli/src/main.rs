//! Entrypoint: wires the clap CLI surface onto the compile driver, the
//! `query` inspector, and the `schema` printer.

mod args;
mod config;
mod driver;
mod fs_loader;
mod query;
mod schema;
mod yaml;

use args::{Args, Command};
use asdl_ir::config::{AsdlrcConfig, BackendConfig, ViewConfig, ViewProfile};
use asdl_link::SearchRoots;
use clap::Parser;
use driver::{CompileRequest, DriverOutcome};
use fs_loader::FsLoader;
use query::QueryContext;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "asdl failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match &args.command {
        Command::Netlist {
            entry,
            top,
            top_view,
            view_config,
            view_profile,
            backend: _,
            log,
        } => run_netlist(args, entry, top, top_view.as_deref(), view_config.as_deref(), view_profile, log.as_deref()),
        Command::Query { entry, what, stage, top } => run_query_command(args, entry, what, *stage, top.as_deref()),
        Command::Schema { kind, json } => {
            println!("{}", schema::render_schema(*kind, *json));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_netlist(
    args: &Args,
    entry: &str,
    top: &str,
    top_view: Option<&str>,
    view_config_path: Option<&str>,
    view_profile_name: &str,
    log_path: Option<&str>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let entry_path = Path::new(entry);
    let asdlrc = config::discover_asdlrc(entry_path).map(|p| config::load_asdlrc(&p)).transpose()?;

    let roots = build_search_roots(args, asdlrc.as_ref());
    let backend_config = load_backend_config(args, asdlrc.as_ref())?;
    let view_profile = load_view_profile(view_config_path, view_profile_name)?;

    let loader = FsLoader::new();
    let outcome = driver::compile(CompileRequest {
        entry_path,
        loader: &loader,
        roots,
        backend_config: &backend_config,
        view_profile: &view_profile,
        top_cell: top,
        top_view,
    });

    match outcome {
        DriverOutcome::Logged { netlist_text, log } => {
            print!("{netlist_text}");
            let log_json = log.to_json()?;
            match log_path {
                Some(path) => std::fs::write(path, log_json)?,
                None => eprintln!("{log_json}"),
            }
            info!("netlist compiled for top `{top}`");
            Ok(ExitCode::SUCCESS)
        }
        DriverOutcome::Aborted { stage, diagnostics, partial } => {
            for diag in diagnostics.sorted() {
                eprintln!("{:?} [{}] {}", diag.severity, diag.code, diag.message);
            }
            eprintln!("compile aborted at stage `{stage}`");
            let _ = partial;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_query_command(
    args: &Args,
    entry: &str,
    what: &args::QueryKind,
    stage: args::QueryStage,
    top: Option<&str>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let entry_path = Path::new(entry);
    let asdlrc = config::discover_asdlrc(entry_path).map(|p| config::load_asdlrc(&p)).transpose()?;
    let roots = build_search_roots(args, asdlrc.as_ref());
    let loader = FsLoader::new();

    let (patterned, diags) = asdl_link::link(entry_path, &loader, &roots);
    let Some(patterned) = patterned else {
        for diag in diags.sorted() {
            eprintln!("{:?} [{}] {}", diag.severity, diag.code, diag.message);
        }
        return Ok(ExitCode::FAILURE);
    };

    let mut diags = diags;
    let mut atomized = asdl_atomize::atomize_graph(&patterned, &mut diags);
    if diags.has_errors() {
        let ctx = QueryContext {
            patterned: &patterned,
            atomized: None,
            bound: None,
            program: None,
        };
        println!("{}", query::run_query(&ctx, what, stage));
        return Ok(ExitCode::FAILURE);
    }

    let devices = driver::device_table(&patterned);
    asdl_atomize::verify_graph(&mut atomized, &devices, &mut diags);

    let bound = match top {
        Some(top_cell) => {
            let profile = ViewProfile::default();
            asdl_bind::bind_views(&atomized, top_cell, None, &profile).ok()
        }
        None => None,
    };

    let program = bound
        .as_ref()
        .and_then(|bound| asdl_bind::lower_graph(&atomized, &devices, bound).ok());

    let ctx = QueryContext {
        patterned: &patterned,
        atomized: Some(&atomized),
        bound: bound.as_ref(),
        program: program.as_ref(),
    };
    println!("{}", query::run_query(&ctx, what, stage));
    Ok(ExitCode::SUCCESS)
}

fn build_search_roots(args: &Args, asdlrc: Option<&AsdlrcConfig>) -> SearchRoots {
    let cli_roots = args.lib_roots.iter().map(std::path::PathBuf::from).collect();
    let asdlrc_roots = asdlrc
        .map(|rc| rc.lib_roots.iter().map(std::path::PathBuf::from).collect())
        .unwrap_or_default();
    SearchRoots::new().with_cli_roots(cli_roots).with_asdlrc_roots(asdlrc_roots).with_env()
}

fn load_backend_config(args: &Args, asdlrc: Option<&AsdlrcConfig>) -> Result<BackendConfig, Box<dyn std::error::Error>> {
    match config::resolve_backend_config_path(args.backend_config.as_deref(), asdlrc) {
        Some(path) => Ok(config::load_backend_config(&path)?),
        None => Ok(BackendConfig::default()),
    }
}

fn load_view_profile(view_config_path: Option<&str>, profile_name: &str) -> Result<ViewProfile, Box<dyn std::error::Error>> {
    match view_config_path {
        Some(path) => {
            let view_config: ViewConfig = config::load_view_config(Path::new(path))?;
            view_config
                .profile(profile_name)
                .cloned()
                .ok_or_else(|| format!("no view profile named `{profile_name}` in {path}").into())
        }
        None => Ok(ViewProfile::default()),
    }
}
