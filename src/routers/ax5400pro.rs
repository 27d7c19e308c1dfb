//! Redmi AX5400 Pro client.
//!
//! The reference model: SHA-256 login, scene-scheduler command channel,
//! and an SSH daemon old enough to need legacy host-key algorithm flags.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tracing::{info, warn};

use crate::client::RouterClient;
use crate::cursor::CursorStore;
use crate::error::Error;
use crate::scene;
use crate::status::{self, SSH_PORT, TELNET_PORT};
use crate::transport::Transport;

/// Pause between orchestration steps, giving the device time to finish the
/// previous command. An assumption about device speed, not a guarantee.
const STEP_DELAY: Duration = Duration::from_secs(2);

/// Ordered command sequence that unlocks and starts the daemons. The
/// dropbear init script gates startup on a release/debug channel check;
/// flipping it is what makes `ssh_en`/`telnet_en` take effect.
const ENABLE_STEPS: &[(&str, &str)] = &[
    (
        "unlock dropbear config",
        "sed -i s/release/debug/g /etc/init.d/dropbear",
    ),
    ("enable SSH flag", "nvram set ssh_en=1"),
    ("enable Telnet flag", "nvram set telnet_en=1"),
    ("commit NVRAM changes", "nvram commit"),
    ("restart dropbear", "/etc/init.d/dropbear restart"),
];

/// Symmetric teardown sequence.
const DISABLE_STEPS: &[(&str, &str)] = &[
    ("disable SSH flag", "nvram set ssh_en=0"),
    ("disable Telnet flag", "nvram set telnet_en=0"),
    ("commit NVRAM changes", "nvram commit"),
    (
        "relock dropbear config",
        "sed -i s/debug/release/g /etc/init.d/dropbear",
    ),
    ("restart dropbear", "/etc/init.d/dropbear restart"),
];

pub struct Ax5400Pro {
    transport: Transport,
    cursor: CursorStore,
}

impl Ax5400Pro {
    pub fn new(host: &str, stok: String) -> Self {
        Ax5400Pro {
            transport: Transport::new(host, stok),
            cursor: CursorStore::at_default_location(),
        }
    }

    /// Run a named command sequence through the scene channel, aborting on
    /// the first failure with that step's name and ordinal.
    async fn run_steps(&self, steps: &[(&'static str, &'static str)]) -> Result<(), Error> {
        let total = steps.len();
        for (i, (name, command)) in steps.iter().copied().enumerate() {
            info!("[{}/{}] {}...", i + 1, total, name);
            scene::execute_command(&self.transport, &self.cursor, command)
                .await
                .map_err(|e| Error::Step {
                    name,
                    position: i + 1,
                    total,
                    source: Box::new(e),
                })?;
            tokio::time::sleep(STEP_DELAY).await;
        }
        Ok(())
    }

    /// Set the device clock through the management API. The scene timer
    /// compares against the device clock, so a badly skewed clock can make
    /// scheduled tasks misbehave.
    async fn set_system_time(&self) -> Result<(), Error> {
        let time = Local::now().format("%Y-%-m-%-d %-H:%-M:%-S").to_string();
        info!("setting device clock to {}", time);

        let path = format!(
            "api/misystem/set_sys_time?time={}&timezone=CST-8",
            urlencoding::encode(&time)
        );
        let body = self.transport.get(&path).await?;

        // This endpoint's response shape varies; check loosely and carry on.
        let text = String::from_utf8_lossy(&body);
        if !text.contains(r#""code":0"#) && !text.contains(r#""success":true"#) {
            warn!("set_sys_time response not recognized as success: {}", text);
        }
        Ok(())
    }

    /// Push the local wall-clock onto the device with `date -s` via the
    /// command channel (the API-based clock set does not survive on all
    /// builds).
    async fn sync_router_time(&self) -> Result<(), Error> {
        let time = Local::now().format("%Y.%m.%d-%H:%M:%S").to_string();
        info!("syncing router clock to {}", time);
        scene::execute_command(
            &self.transport,
            &self.cursor,
            &format!("date -s '{}'", time),
        )
        .await
    }

    /// Verify status after an enable/disable run. Network trouble during
    /// verification is a warning, never a failure of the enclosing
    /// operation — the flags may well have been applied.
    async fn verify(&self, expect_enabled: bool) -> Option<bool> {
        match status::check_shell_status(&self.transport, SSH_PORT, TELNET_PORT).await {
            Ok(s) => {
                let report = s.report(&self.ssh_command(), &self.telnet_command());
                if s.overall() == expect_enabled {
                    info!("status verified");
                } else {
                    warn!("status does not match intent yet, see report");
                }
                println!("\n{}", report);
                Some(s.overall())
            }
            Err(e) => {
                warn!("status verification inconclusive: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl RouterClient for Ax5400Pro {
    fn model(&self) -> &'static str {
        "redmi_ax5400pro"
    }

    fn ssh_command(&self) -> String {
        // Dropbear on this firmware only offers ssh-rsa host keys
        format!(
            "ssh -o HostKeyAlgorithms=+ssh-rsa -o PubkeyAcceptedKeyTypes=+ssh-rsa root@{}",
            self.transport.host()
        )
    }

    fn telnet_command(&self) -> String {
        format!("telnet {}", self.transport.host())
    }

    async fn execute_command(&self, command: &str) -> Result<(), Error> {
        info!("executing command: {}", command);
        scene::execute_command(&self.transport, &self.cursor, command).await
    }

    async fn enable_ssh(&self) -> Result<(), Error> {
        self.set_system_time().await?;
        self.run_steps(ENABLE_STEPS).await?;

        info!("verifying SSH/Telnet status...");
        if self.verify(true).await == Some(true) {
            // Clock drift makes dropbear key exchange flaky on this model
            if let Err(e) = self.sync_router_time().await {
                warn!("router clock sync failed: {}", e);
            }
        }
        Ok(())
    }

    async fn disable_ssh(&self) -> Result<(), Error> {
        info!("disabling SSH and Telnet...");
        self.run_steps(DISABLE_STEPS).await?;

        info!("verifying SSH/Telnet status...");
        let _ = self.verify(false).await;
        Ok(())
    }

    async fn check_shell_status(&self) -> Result<(bool, String), Error> {
        let s = status::check_shell_status(&self.transport, SSH_PORT, TELNET_PORT).await?;
        Ok((
            s.overall(),
            s.report(&self.ssh_command(), &self.telnet_command()),
        ))
    }
}
