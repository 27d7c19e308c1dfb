//! Router client trait and model registry.
//!
//! Each supported model gets its own client type implementing
//! [`RouterClient`]. Capabilities a model does not implement fall through
//! to the default methods, which return an explicit unsupported error
//! instead of pretending to work.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::auth::{self, HashKind};
use crate::error::Error;
use crate::routers::ax5400pro::Ax5400Pro;

/// Capability set shared by all router models.
#[async_trait]
pub trait RouterClient: Send + Sync {
    /// Model identifier this client was registered under.
    fn model(&self) -> &'static str;

    /// SSH connection command suited to this model's daemon.
    fn ssh_command(&self) -> String;

    /// Telnet connection command for this model.
    fn telnet_command(&self) -> String;

    /// Run an arbitrary shell command on the device.
    async fn execute_command(&self, _command: &str) -> Result<(), Error> {
        Err(Error::Unsupported {
            model: self.model(),
            operation: "execute_command",
        })
    }

    /// Enable the SSH/Telnet daemons persistently and verify.
    async fn enable_ssh(&self) -> Result<(), Error> {
        Err(Error::Unsupported {
            model: self.model(),
            operation: "enable_ssh",
        })
    }

    /// Disable the SSH/Telnet daemons persistently.
    async fn disable_ssh(&self) -> Result<(), Error> {
        Err(Error::Unsupported {
            model: self.model(),
            operation: "disable_ssh",
        })
    }

    /// Check SSH/Telnet status. Returns the overall verdict and a
    /// human-readable report.
    async fn check_shell_status(&self) -> Result<(bool, String), Error> {
        Err(Error::Unsupported {
            model: self.model(),
            operation: "check_shell_status",
        })
    }
}

/// Model identifiers with a client implementation.
pub fn supported_models() -> &'static [&'static str] {
    &["redmi_ax5400pro"]
}

/// Log in to the device and build the client for the requested model.
///
/// The hash policy for the login handshake is part of the model entry —
/// it is fixed per firmware generation, never negotiated at runtime.
pub async fn connect(
    host: &str,
    password: &str,
    model: &str,
) -> Result<Box<dyn RouterClient>, Error> {
    debug!("creating router client: model={}, host={}", model, host);

    match model.to_ascii_lowercase().as_str() {
        "redmi_ax5400pro" => {
            let stok = auth::login(host, password, HashKind::Sha256).await?;
            info!("login succeeded, session token acquired");
            Ok(Box::new(Ax5400Pro::new(host, stok)))
        }
        _ => Err(Error::UnsupportedModel(model.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_reference_model() {
        assert!(supported_models().contains(&"redmi_ax5400pro"));
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_any_network_io() {
        // The host is unroutable on purpose; an unsupported model must fail
        // before login is even attempted.
        match connect("192.0.2.1", "pw", "mystery_box").await {
            Err(Error::UnsupportedModel(m)) => assert_eq!(m, "mystery_box"),
            other => panic!("expected UnsupportedModel, got {:?}", other.map(|_| ())),
        }
    }
}
