//! Token-scoped HTTP transport and raw TCP reachability probes.
//!
//! Every authenticated call goes to
//! `http://{host}/cgi-bin/luci/;stok={token}/{path}` with a fixed 30 s
//! timeout. No retries live in this layer — a single failed attempt is
//! surfaced immediately and the caller decides what to do.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::error::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP transport bound to one device session (host + `stok` token).
pub struct Transport {
    http: reqwest::Client,
    host: String,
    stok: String,
}

impl Transport {
    pub fn new(host: impl Into<String>, stok: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Transport {
            http,
            host: host.into(),
            stok: stok.into(),
        }
    }

    /// The device host as given at construction (may carry a port).
    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/cgi-bin/luci/;stok={}/{}", self.host, self.stok, path)
    }

    /// `GET` an authenticated API path, returning the raw body.
    pub async fn get(&self, path: &str) -> Result<Vec<u8>, Error> {
        let url = self.url(path);
        debug!("GET {}", url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!("GET response [{}]: {}", status, String::from_utf8_lossy(&body));
        Ok(body.to_vec())
    }

    /// `POST` a form-urlencoded body to an authenticated API path.
    pub async fn post_form(&self, path: &str, body: String) -> Result<Vec<u8>, Error> {
        let url = self.url(path);
        debug!("POST {} body: {}", url, body);
        let resp = self
            .http
            .post(&url)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!("POST response [{}]: {}", status, String::from_utf8_lossy(&body));
        Ok(body.to_vec())
    }

    /// TCP-connect to `port` on the device, true iff the connection opens
    /// within 3 s. Absorbs every failure into `false`.
    pub async fn probe_port(&self, port: u16) -> bool {
        // The management host may carry a port of its own; probe the bare host.
        let bare_host = self.host.split(':').next().unwrap_or(&self.host);
        let addr = format!("{}:{}", bare_host, port);
        debug!("probing {}", addr);
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await,
            Ok(Ok(_))
        )
    }
}
