//! View Binder and NetlistIR Lowerer (§4.5, §4.6).
//!
//! Consumes an `AtomizedGraph` plus a view-binding profile and produces a
//! flat `NetlistProgram`, ready for the Renderer. Both stages are pure
//! projections: neither mutates the graph they're given.

pub mod error;
pub mod lower;
pub mod view;

pub use error::BindError;
pub use lower::{lower_graph, DeviceTable};
pub use view::{bind_views, BoundGraph, ResolvedRealization, ViewBinding};
