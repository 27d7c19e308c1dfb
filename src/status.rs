//! SSH/Telnet status verification.
//!
//! Fuses two independent evidence sources: the configuration intent the
//! device reports through `api/xqsystem/fac_info` (seen in at least three
//! response shapes across firmware builds) and live TCP probes of the
//! service ports. A service only counts as working when both agree.

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::transport::Transport;

const FAC_INFO_PATH: &str = "api/xqsystem/fac_info";

pub const SSH_PORT: u16 = 22;
pub const TELNET_PORT: u16 = 23;

/// Result of a shell status check. The `*_enabled` pair is the device's
/// declared configuration; the `*_port_open` pair is observed
/// reachability. Orthogonal signals, never conflated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellStatus {
    pub ssh_enabled: bool,
    pub telnet_enabled: bool,
    pub ssh_port_open: bool,
    pub telnet_port_open: bool,
}

impl ShellStatus {
    /// A service is working only when configured *and* reachable.
    pub fn overall(&self) -> bool {
        (self.ssh_enabled && self.ssh_port_open)
            || (self.telnet_enabled && self.telnet_port_open)
    }

    /// Human-readable report: each signal, a per-service verdict, and the
    /// connection command for services that check out.
    pub fn report(&self, ssh_command: &str, telnet_command: &str) -> String {
        let mut out = String::new();

        out.push_str("SSH status:\n");
        out.push_str(&format!("  - enabled in configuration: {}\n", self.ssh_enabled));
        out.push_str(&format!("  - port 22 open: {}\n", self.ssh_port_open));
        out.push_str(&format!(
            "  - verdict: {}\n",
            verdict(self.ssh_enabled, self.ssh_port_open)
        ));

        out.push_str("\nTelnet status:\n");
        out.push_str(&format!("  - enabled in configuration: {}\n", self.telnet_enabled));
        out.push_str(&format!("  - port 23 open: {}\n", self.telnet_port_open));
        out.push_str(&format!(
            "  - verdict: {}\n",
            verdict(self.telnet_enabled, self.telnet_port_open)
        ));

        out.push_str("\nConnection info:\n");
        if self.ssh_enabled && self.ssh_port_open {
            out.push_str(&format!("  - SSH command: {}\n", ssh_command));
        }
        if self.telnet_enabled && self.telnet_port_open {
            out.push_str(&format!("  - Telnet command: {}\n", telnet_command));
        }
        out
    }
}

fn verdict(enabled: bool, port_open: bool) -> &'static str {
    match (enabled, port_open) {
        (true, true) => "enabled and reachable",
        (true, false) => "enabled in configuration but port not reachable",
        (false, true) => "port reachable but not enabled in configuration",
        (false, false) => "disabled",
    }
}

/// Extract the declared SSH/Telnet state from a `fac_info` body.
///
/// Three shapes are accepted: top-level booleans (`ssh`/`telnet`), nested
/// `data.ssh_en`/`data.telnet_en` as string `"1"` or boolean, and a raw
/// substring scan as a last resort for bodies that don't parse cleanly.
/// Flags default to false and are never reset once set.
pub fn parse_declared(body: &[u8]) -> (bool, bool) {
    let mut ssh = false;
    let mut telnet = false;

    match serde_json::from_slice::<Value>(body) {
        Ok(v) => {
            // A non-zero code means the API refused the query; nothing in
            // the body is trustworthy then.
            if let Some(code) = v["code"].as_i64() {
                if code != 0 {
                    debug!("fac_info returned code {}", code);
                    return (false, false);
                }
            }

            if let Some(b) = v["ssh"].as_bool() {
                ssh = ssh || b;
            }
            if let Some(b) = v["telnet"].as_bool() {
                telnet = telnet || b;
            }

            ssh = ssh || en_flag_set(&v["data"]["ssh_en"]);
            telnet = telnet || en_flag_set(&v["data"]["telnet_en"]);
        }
        Err(e) => debug!("fac_info body is not valid JSON: {}", e),
    }

    // Substring fallback tolerates malformed or partially-unparseable bodies
    let text = String::from_utf8_lossy(body);
    ssh = ssh || body_claims_enabled(&text, "ssh");
    telnet = telnet || body_claims_enabled(&text, "telnet");

    (ssh, telnet)
}

/// `ssh_en`/`telnet_en` appear as string `"1"` on some builds and as a
/// boolean on others.
fn en_flag_set(v: &Value) -> bool {
    v.as_str() == Some("1") || v.as_bool() == Some(true)
}

fn body_claims_enabled(body: &str, service: &str) -> bool {
    let needles = [
        format!(r#""{}":true"#, service),
        format!(r#""{}": true"#, service),
        format!(r#""{}_en":"1""#, service),
        format!(r#""{}_en": "1""#, service),
        format!(r#""{}_en":1"#, service),
        format!(r#""{}_en": 1"#, service),
    ];
    needles.iter().any(|n| body.contains(n.as_str()))
}

/// Query the declared state, probe the given ports, and fuse the signals.
/// Ports are parameters so tests can point probes at local sockets; real
/// callers pass [`SSH_PORT`] and [`TELNET_PORT`].
pub async fn check_shell_status(
    transport: &Transport,
    ssh_port: u16,
    telnet_port: u16,
) -> Result<ShellStatus, Error> {
    let body = transport.get(FAC_INFO_PATH).await?;
    let (ssh_enabled, telnet_enabled) = parse_declared(&body);

    let ssh_port_open = transport.probe_port(ssh_port).await;
    let telnet_port_open = transport.probe_port(telnet_port).await;

    Ok(ShellStatus {
        ssh_enabled,
        telnet_enabled,
        ssh_port_open,
        telnet_port_open,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{json_response, spawn_http_fixture};

    #[test]
    fn fusion_truth_table() {
        // overall == (ssh_enabled && ssh_port_open) || (telnet_enabled && telnet_port_open)
        for bits in 0..16u8 {
            let s = ShellStatus {
                ssh_enabled: bits & 1 != 0,
                ssh_port_open: bits & 2 != 0,
                telnet_enabled: bits & 4 != 0,
                telnet_port_open: bits & 8 != 0,
            };
            let expected = (s.ssh_enabled && s.ssh_port_open)
                || (s.telnet_enabled && s.telnet_port_open);
            assert_eq!(s.overall(), expected, "bits={:04b}", bits);
        }
    }

    #[test]
    fn parse_top_level_booleans() {
        let (ssh, telnet) = parse_declared(br#"{"code":0,"ssh":true,"telnet":false}"#);
        assert!(ssh);
        assert!(!telnet);
    }

    #[test]
    fn parse_nested_string_flags() {
        let (ssh, telnet) =
            parse_declared(br#"{"code":0,"data":{"ssh_en":"1","telnet_en":"0"}}"#);
        assert!(ssh);
        assert!(!telnet);
    }

    #[test]
    fn parse_nested_boolean_flags() {
        let (ssh, telnet) =
            parse_declared(br#"{"code":0,"data":{"ssh_en":true,"telnet_en":true}}"#);
        assert!(ssh);
        assert!(telnet);
    }

    #[test]
    fn parse_substring_fallback_on_malformed_body() {
        // Truncated JSON — only the substring scan can see the flag
        let (ssh, telnet) = parse_declared(br#"{"data":{"ssh_en":1,"#);
        assert!(ssh);
        assert!(!telnet);
    }

    #[test]
    fn parse_unrelated_body_yields_all_false() {
        assert_eq!(parse_declared(br#"{"code":0,"uptime":1234}"#), (false, false));
        assert_eq!(parse_declared(b""), (false, false));
        assert_eq!(parse_declared(b"<html>error</html>"), (false, false));
    }

    #[test]
    fn parse_nonzero_code_yields_all_false() {
        let (ssh, telnet) = parse_declared(br#"{"code":1,"msg":"denied"}"#);
        assert!(!ssh);
        assert!(!telnet);
    }

    #[test]
    fn report_lists_commands_only_for_working_services() {
        let s = ShellStatus {
            ssh_enabled: true,
            ssh_port_open: true,
            telnet_enabled: true,
            telnet_port_open: false,
        };
        let report = s.report("ssh root@router", "telnet router");
        assert!(report.contains("ssh root@router"));
        assert!(!report.contains("telnet router"));
        assert!(report.contains("enabled and reachable"));
        assert!(report.contains("enabled in configuration but port not reachable"));
    }

    #[tokio::test]
    async fn end_to_end_fuses_api_state_with_port_probes() {
        let host = spawn_http_fixture(|req| {
            assert!(req.contains("api/xqsystem/fac_info"));
            json_response(r#"{"code":0,"ssh":true,"telnet":false}"#)
        })
        .await;

        // "SSH port" listening, "Telnet port" closed
        let open = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = open.local_addr().unwrap().port();
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed_port = closed.local_addr().unwrap().port();
        drop(closed);

        let transport = Transport::new(host, "tok123");
        let status = check_shell_status(&transport, open_port, closed_port)
            .await
            .unwrap();

        assert!(status.ssh_enabled);
        assert!(status.ssh_port_open);
        assert!(!status.telnet_enabled);
        assert!(!status.telnet_port_open);
        assert!(status.overall());

        let report = status.report("ssh root@host", "telnet host");
        assert!(report.contains("enabled and reachable"));
        assert!(report.contains("- verdict: disabled"));
        drop(open);
    }
}
