//! # xqshell
//!
//! Enable SSH/Telnet on Xiaomi/Redmi routers through the stock management
//! API. Logs in with the admin password, then drives the router's
//! smart-home scene scheduler as an indirect shell-command channel to flip
//! the NVRAM flags that gate the dropbear daemons.
//!
//! ## Architecture
//!
//! ```text
//! main.rs      — entry point, clap flags, tracing init, dispatch
//! error.rs     — error taxonomy shared by all layers
//! auth.rs      — nonce-challenge login, stok acquisition
//! transport.rs — token-scoped GET/POST, TCP port probes
//! cursor.rs    — persisted task-time cursor (fresh schedule times)
//! scene.rs     — command execution via the scene scheduler
//! status.rs    — declared-state parsing + port probe fusion
//! password.rs  — factory SSH password derivation from the serial number
//! client.rs    — RouterClient trait, model registry
//! routers/
//!   ax5400pro.rs — Redmi AX5400 Pro client + enable/disable orchestration
//! ```

mod auth;
mod client;
mod cursor;
mod error;
mod password;
mod routers;
mod scene;
mod status;
#[cfg(test)]
mod testutil;
mod transport;

use clap::Parser;
use tracing::{error, info, warn};

use error::Error;

/// Enable SSH/Telnet on Xiaomi/Redmi routers through the stock management API.
#[derive(Parser)]
#[command(name = "xqshell", version)]
struct Cli {
    /// Router IP address or host
    #[arg(long)]
    host: Option<String>,

    /// Router admin password
    #[arg(long)]
    password: Option<String>,

    /// Router model identifier (see --list-models)
    #[arg(long)]
    model: Option<String>,

    /// Router serial number, used to derive the factory SSH password
    #[arg(long)]
    sn: Option<String>,

    /// Only derive and print the SSH password, then exit
    #[arg(long)]
    calc_password: bool,

    /// Execute a custom command on the router
    #[arg(long, value_name = "CMD")]
    exec: Option<String>,

    /// Enable SSH and Telnet
    #[arg(long)]
    enable_shell: bool,

    /// Disable SSH and Telnet
    #[arg(long)]
    disable_shell: bool,

    /// Check SSH/Telnet status
    #[arg(long)]
    shell_status: bool,

    /// List supported router models
    #[arg(long)]
    list_models: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| if cli.verbose { "debug".into() } else { "info".into() });
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    if cli.list_models {
        println!("Supported router models:");
        for model in client::supported_models() {
            println!("- {}", model);
        }
        return;
    }

    // Derive the factory SSH password when a serial number is given
    if let Some(sn) = cli.sn.as_deref() {
        let ssh_password = password::derive_ssh_password(sn);
        if ssh_password.is_empty() {
            error!("{}", Error::EmptySerial);
            std::process::exit(1);
        }
        println!("Serial number: {}", sn);
        println!("Derived SSH password: {}", ssh_password);
        if cli.calc_password {
            return;
        }
    } else if cli.calc_password {
        eprintln!("xqshell: --calc-password requires --sn");
        std::process::exit(1);
    }

    let (Some(host), Some(pwd), Some(model)) = (&cli.host, &cli.password, &cli.model) else {
        eprintln!("xqshell: --host, --password and --model are required");
        eprintln!("example: xqshell --model redmi_ax5400pro --host 192.168.31.1 --password PASS --enable-shell");
        std::process::exit(1);
    };

    let host = normalize_host(host);

    if let Err(e) = run(&cli, &host, pwd, model).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, host: &str, pwd: &str, model: &str) -> Result<(), Error> {
    let router = client::connect(host, pwd, model).await?;

    if cli.shell_status {
        info!("checking SSH/Telnet status on {}...", model);
        let (overall, report) = router.check_shell_status().await?;
        if overall {
            info!("SSH/Telnet: enabled and reachable");
        } else {
            warn!("SSH/Telnet: not fully enabled or not reachable");
        }
        println!("\n{}", report);
    } else if let Some(command) = &cli.exec {
        info!("executing custom command: {}", command);
        router.execute_command(command).await?;
        info!("command executed");
    } else if cli.enable_shell {
        info!("enabling SSH and Telnet on {}...", model);
        router.enable_ssh().await?;

        if let Some(sn) = cli.sn.as_deref() {
            let ssh_password = password::derive_ssh_password(sn);
            println!("\nLogin credentials:");
            println!("  user: root");
            println!("  password: {}", ssh_password);
            println!("\nConnection commands:");
            println!("  SSH: {}", router.ssh_command());
            println!("  Telnet: {}", router.telnet_command());
        } else {
            println!("\nHint: pass --sn YOUR_SERIAL to derive the root SSH password");
        }
    } else if cli.disable_shell {
        info!("disabling SSH and Telnet on {}...", model);
        router.disable_ssh().await?;
        info!("disable operation finished");
    } else {
        eprintln!("xqshell: nothing to do — pass --enable-shell, --disable-shell, --shell-status or --exec");
        std::process::exit(1);
    }

    Ok(())
}

/// Strip a protocol prefix and trailing slash from the user-supplied host.
fn normalize_host(host: &str) -> String {
    host.trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_scheme_and_slash() {
        assert_eq!(normalize_host("http://192.168.31.1/"), "192.168.31.1");
        assert_eq!(normalize_host("https://router.local"), "router.local");
        assert_eq!(normalize_host("192.168.31.1"), "192.168.31.1");
    }
}
