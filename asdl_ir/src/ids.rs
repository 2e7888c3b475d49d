//! Stable identifiers assigned during construction and preserved across passes.
//!
//! Every entity born in the `PatternedGraph` builder keeps its id through
//! atomization, binding, and lowering, so diagnostics raised by a later
//! pass can still point back at the original source span.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

macro_rules! stable_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from a raw integer. Callers are responsible for uniqueness
            /// within the scope the id is used (a single `IdGen` guarantees this).
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw integer backing this id.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

stable_id!(FileId, "file");
stable_id!(ModuleId, "mod");
stable_id!(DeviceId, "dev");
stable_id!(InstId, "inst");
stable_id!(NetId, "net");
stable_id!(EndpointId, "ep");
stable_id!(ExprId, "expr");

/// Monotonic id generator. One `IdGen` per construction pass keeps ids stable
/// and unique within that pass without requiring global mutable state.
#[derive(Debug, Default)]
pub struct IdGen {
    next: AtomicU32,
}

impl IdGen {
    /// Creates a fresh generator starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    fn bump(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Mints the next id of the given stable-id type.
    pub fn next_file(&self) -> FileId {
        FileId::from_raw(self.bump())
    }

    /// Mints the next module id.
    pub fn next_module(&self) -> ModuleId {
        ModuleId::from_raw(self.bump())
    }

    /// Mints the next device id.
    pub fn next_device(&self) -> DeviceId {
        DeviceId::from_raw(self.bump())
    }

    /// Mints the next instance id.
    pub fn next_inst(&self) -> InstId {
        InstId::from_raw(self.bump())
    }

    /// Mints the next net id.
    pub fn next_net(&self) -> NetId {
        NetId::from_raw(self.bump())
    }

    /// Mints the next endpoint id.
    pub fn next_endpoint(&self) -> EndpointId {
        EndpointId::from_raw(self.bump())
    }

    /// Mints the next pattern-expression id.
    pub fn next_expr(&self) -> ExprId {
        ExprId::from_raw(self.bump())
    }
}
