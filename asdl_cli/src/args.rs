//! Command-line interface (§6): `netlist`, `query`, and `schema`
//! subcommands, plus the shared library/backend resolution flags.

use clap::{Parser, Subcommand, ValueEnum};

/// ASDL compiler: expands patterned analog hardware descriptions into
/// backend netlists.
#[derive(Parser, Debug)]
#[command(name = "asdl")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Additional library search roots, highest precedence after the
    /// importing file's own directory.
    #[arg(long = "lib", global = true)]
    pub lib_roots: Vec<String>,

    /// Path to a backend system-device template file, overriding
    /// `.asdlrc` and `ASDL_BACKEND_CONFIG`.
    #[arg(long, global = true)]
    pub backend_config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile an entry file into a rendered netlist plus a compile log.
    Netlist {
        /// Entry `.asdl` file.
        entry: String,

        /// Top-level cell name.
        #[arg(long)]
        top: String,

        /// Top-level view, defaulting to the profile's baseline.
        #[arg(long)]
        top_view: Option<String>,

        /// Path to a view-binding profile file.
        #[arg(long)]
        view_config: Option<String>,

        /// Name of the profile to use within `--view-config`.
        #[arg(long, default_value = "default")]
        view_profile: String,

        /// Backend name, used only for log/diagnostic display.
        #[arg(long)]
        backend: Option<String>,

        /// Write the JSON compile log to this path instead of stdout.
        #[arg(long)]
        log: Option<String>,
    },
    /// Inspect an intermediate stage of the compiled graph.
    Query {
        /// Entry `.asdl` file.
        entry: String,

        #[command(subcommand)]
        what: QueryKind,

        /// Which pipeline stage to query against.
        #[arg(long, value_enum, default_value = "resolved")]
        stage: QueryStage,

        /// Top-level cell name, required for stages at or after binding.
        #[arg(long)]
        top: Option<String>,
    },
    /// Print the JSON schema for a config file kind.
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,

        /// Emit as a single-line JSON value instead of pretty-printed.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum QueryKind {
    /// Print the module/instance tree.
    Tree,
    /// Print resolved view bindings.
    Bindings,
    /// Print the planned emission name map.
    EmitPlan,
    /// List references to a given cell.
    Refs { cell: String },
    /// Describe a single instance.
    Instance { path: String },
    /// Describe a single net.
    Net { path: String },
    /// Trace a net's endpoints across pattern expansion.
    NetTrace { path: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QueryStage {
    /// Patterns as authored, before import resolution.
    Authored,
    /// After linking and atomization, before view binding.
    Resolved,
    /// After view binding and lowering, as emitted.
    Emitted,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemaKind {
    Asdlrc,
    BackendConfig,
    ViewConfig,
}
