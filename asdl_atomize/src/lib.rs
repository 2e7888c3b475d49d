//! Pattern Expander / Atomizer and Binding Verifier (§4.3, §4.4).
//!
//! Consumes a `PatternedGraph` (built by `asdl_link`) and produces an
//! `AtomizedGraph` of single-atom entities, then runs the Binding
//! Verifier over it. Both stages are pure: they only append to the
//! `Diagnostics` sink passed in, never panic on malformed-but-parseable
//! input.

pub mod atomizer;
pub mod expand;
pub mod verify;

pub use atomizer::atomize_graph;
pub use verify::{verify_graph, DeviceTable};
