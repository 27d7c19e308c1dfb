//! Error taxonomy shared by every layer.
//!
//! Each layer fails fast: a single failed attempt is surfaced immediately,
//! and no layer retries on its own. The orchestrator wraps a failing step
//! in [`Error::Step`] so the user sees which named step of a sequence died.

/// Errors returned by the router client stack.
#[derive(Debug)]
pub enum Error {
    /// HTTP transport failure (connection refused, timeout, DNS failure, etc.).
    Network(reqwest::Error),
    /// The device answered with something we could not parse.
    Protocol(String),
    /// The login endpoint returned a non-zero code.
    Auth { code: i64, message: String },
    /// The scene-scheduling call returned a non-zero code.
    Schedule { code: i64, message: String },
    /// The scene-trigger call returned a non-zero code.
    Trigger { code: i64, message: String },
    /// A named step of a multi-step sequence failed; the rest was aborted.
    Step {
        name: &'static str,
        position: usize,
        total: usize,
        source: Box<Error>,
    },
    /// No client implementation exists for the requested model.
    UnsupportedModel(String),
    /// The selected model's client does not implement this operation.
    Unsupported {
        model: &'static str,
        operation: &'static str,
    },
    /// An empty serial number was given for password derivation.
    EmptySerial,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Network(e) => write!(f, "HTTP request failed: {}", e),
            Error::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Error::Auth { code, message } => {
                write!(f, "Login failed (code {}): {}", code, message)
            }
            Error::Schedule { code, message } => {
                write!(f, "Scheduling task failed (code {}): {}", code, message)
            }
            Error::Trigger { code, message } => {
                write!(f, "Triggering task failed (code {}): {}", code, message)
            }
            Error::Step {
                name,
                position,
                total,
                source,
            } => write!(f, "Step [{}/{}] {} failed: {}", position, total, name, source),
            Error::UnsupportedModel(model) => {
                write!(f, "Unsupported router model: {}", model)
            }
            Error::Unsupported { model, operation } => {
                write!(f, "Model {} does not support {}", model, operation)
            }
            Error::EmptySerial => write!(f, "Serial number is empty"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Network(e) => Some(e),
            Error::Step { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e)
    }
}
