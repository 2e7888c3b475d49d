use thiserror::Error;

/// Fatal Renderer failures (§4.7). Unknown placeholders and empty
/// `{ports}`/`{params}` are handled inline, never raised as errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("backend `{backend}` is missing required system-device template `{key}`")]
    MissingTemplate { backend: String, key: &'static str },
    #[error("no template registered for device `{0}`")]
    MissingDeviceTemplate(String),
}
