//! Renderer and Compile Log (§4.7, §4.8).
//!
//! Consumes a `NetlistProgram` plus a `BackendConfig` and emits textual
//! netlist output, and builds the JSON compile-log sidecar from a
//! `Diagnostics` sink plus the View Binder's bindings/name map.

pub mod error;
pub mod log;
pub mod renderer;
pub mod template;

pub use error::RenderError;
pub use log::{CompileLog, EmissionNameEntry, ViewBindingEntry};
pub use renderer::render_program;
