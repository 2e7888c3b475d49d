//! Shared data model for the ASDL compiler core.
//!
//! This crate has no knowledge of YAML surface syntax, the filesystem, or
//! the CLI. It defines the immutable graphs each compiler pass produces
//! (`PatternedGraph` -> `AtomizedGraph` -> `NetlistIR`), the primitive
//! value types they're built from, and the diagnostics sink every pass
//! writes into.

pub mod ast;
pub mod atomized;
pub mod config;
pub mod diagnostics;
pub mod ids;
pub mod netlist;
pub mod pattern;
pub mod patterned;
pub mod span;
pub mod value;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use ids::{DeviceId, EndpointId, ExprId, FileId, InstId, ModuleId, NetId};
pub use pattern::{Group, PatternExpr, PatternKind, Segment, Token};
pub use span::SourceSpan;
pub use value::{ParamMap, ParamValue};
