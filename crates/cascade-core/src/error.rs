#![forbid(unsafe_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConnectError>;

/// Fatal misconfiguration of a consumer, raised before any notification runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error(
        "Invalid value of type {kind} for {argument} argument when connecting component {display_name}."
    )]
    InvalidProjectionArgument {
        kind: &'static str,
        argument: &'static str,
        display_name: String,
    },
}

impl ConnectError {
    #[must_use]
    pub fn invalid_projection(
        kind: &'static str,
        argument: &'static str,
        display_name: impl Into<String>,
    ) -> Self {
        Self::InvalidProjectionArgument {
            kind,
            argument,
            display_name: display_name.into(),
        }
    }
}

/// Developer-facing diagnostics. These never change behavior.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("{method}() in {display_name} must return a plain object. Instead received {received}.")]
    NonPlainResult {
        method: &'static str,
        display_name: String,
        received: &'static str,
    },

    #[error(
        "<Provider> does not support changing `store` on the fly. \
         The original store stays attached to every mounted consumer."
    )]
    DuplicateStore,
}
