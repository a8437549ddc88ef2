use thiserror::Error;
use xr::sys;

/// Why a resume or pause request did not reach the runtime, or what the runtime said about it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("META simultaneous hands and controllers extension is not available")]
    ExtensionUnavailable,
    #[error("System does not support simultaneous hands and controllers tracking")]
    Unsupported,
    #[error("{action} simultaneous hands and controllers tracking failed: {message}")]
    Runtime {
        action: &'static str,
        result: sys::Result,
        message: String,
    },
    #[error("No method named {0} on simultaneous hands and controllers")]
    UnknownMethod(String),
}

/// Failure to bind an extension function at instance creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("Runtime did not provide {name} ({result:?})")]
    MissingFunction {
        name: &'static str,
        result: sys::Result,
    },
}
