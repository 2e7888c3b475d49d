use thiserror::Error;

/// Fatal failures raised by the View Binder or NetlistIR Lowerer that
/// abort the driver outright rather than accumulating as diagnostics —
/// reserved for conditions that make it meaningless to keep lowering
/// (an unresolvable top, a dangling realization reference).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("no module named `{0}` found for the requested top")]
    TopNotFound(String),
    #[error("top `{0}` is ambiguous: multiple modules match")]
    TopAmbiguous(String),
    #[error("instance `{inst}` resolves to cell `{cell}` view `{view:?}`, which has no realized module")]
    UnresolvedRealization {
        inst: String,
        cell: String,
        view: Option<String>,
    },
    #[error("global parameter reference `!{{{0}}}` has no matching entry in `global_parameters`")]
    UndefinedGlobal(String),
}
