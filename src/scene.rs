//! Command execution through the smart-home scene scheduler.
//!
//! The device has no direct "run command" API. It does expose a scene
//! scheduler for IoT automations whose task `name` ends up in a
//! shell-evaluated context on certain firmware builds. Scheduling a
//! one-shot task whose name wraps the command, then firing it immediately
//! with `scene_start_by_crontab`, executes the command as a side effect.
//! Every privileged operation in this tool goes through this sequence.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cursor::{CursorStore, TaskTime};
use crate::error::Error;
use crate::transport::Transport;

const SMART_CONTROLLER_PATH: &str = "api/xqsmarthome/request_smartcontroller";

/// Post-trigger settle time. The device executes the task asynchronously;
/// this is an assumption about device speed, not a protocol guarantee.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Generic smart-controller response.
#[derive(Deserialize)]
struct SceneResponse {
    code: i64,
    #[serde(default)]
    msg: String,
}

fn parse_response(body: &[u8]) -> Result<SceneResponse, Error> {
    serde_json::from_slice(body).map_err(|e| {
        Error::Protocol(format!(
            "invalid smart controller response: {} (body: {})",
            e,
            String::from_utf8_lossy(body)
        ))
    })
}

async fn post_payload(transport: &Transport, payload: &serde_json::Value) -> Result<Vec<u8>, Error> {
    let encoded = urlencoding::encode(&payload.to_string()).into_owned();
    transport
        .post_form(SMART_CONTROLLER_PATH, format!("payload={}", encoded))
        .await
}

/// Schedule a one-shot scene task. The command of interest rides in the
/// task `name`; the action itself is a no-op `wan_block` on a null MAC.
pub async fn schedule_task(
    transport: &Transport,
    name: &str,
    time: &TaskTime,
) -> Result<(), Error> {
    let payload = serde_json::json!({
        "command": "scene_setting",
        "name": name,
        "action_list": [{
            "thirdParty": "xmrouter",
            "delay": 17,
            "type": "wan_block",
            "payload": { "command": "wan_block", "mac": "00:00:00:00:00:00" }
        }],
        "launch": {
            "timer": { "time": time.to_string(), "repeat": "0", "enabled": true }
        }
    });
    debug!("scheduling scene task at {}", time);

    let resp = parse_response(&post_payload(transport, &payload).await?)?;
    if resp.code != 0 {
        return Err(Error::Schedule {
            code: resp.code,
            message: resp.msg,
        });
    }
    Ok(())
}

/// Fire a scheduled task immediately instead of waiting for the real-time
/// clock to reach its minute.
pub async fn fire_task(transport: &Transport, time: &TaskTime, week: u32) -> Result<(), Error> {
    let payload = serde_json::json!({
        "command": "scene_start_by_crontab",
        "time": time.to_string(),
        "week": week,
    });
    debug!("firing scene task at {}", time);

    let resp = parse_response(&post_payload(transport, &payload).await?)?;
    if resp.code != 0 {
        return Err(Error::Trigger {
            code: resp.code,
            message: resp.msg,
        });
    }
    Ok(())
}

/// Execute a shell command on the device: wrap it for shell expansion,
/// schedule it under a fresh task time, fire it, and give the device a
/// second to run it.
pub async fn execute_command(
    transport: &Transport,
    cursor: &CursorStore,
    command: &str,
) -> Result<(), Error> {
    let wrapped = format!("'$({})'", command);
    let time = cursor.next();

    schedule_task(transport, &wrapped, &time).await?;
    fire_task(transport, &time, 0).await?;
    tokio::time::sleep(SETTLE_DELAY).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{json_response, spawn_http_fixture};

    fn store_in(dir: &std::path::Path) -> CursorStore {
        let path = dir.join(crate::cursor::CURSOR_FILE);
        CursorStore::new(path.clone(), path)
    }

    fn decoded_payload(req: &str) -> String {
        let body = req.split("\r\n\r\n").nth(1).unwrap_or("");
        let encoded = body.strip_prefix("payload=").unwrap_or(body);
        urlencoding::decode(encoded).unwrap().into_owned()
    }

    #[tokio::test]
    async fn execute_schedules_then_fires_with_wrapped_command() {
        let host = spawn_http_fixture(|req| {
            let payload = decoded_payload(req);
            if payload.contains("scene_setting") {
                assert!(payload.contains(r#""name":"'$(nvram commit)'""#));
                assert!(payload.contains(r#""repeat":"0""#));
                assert!(payload.contains("00:00:00:00:00:00"));
            } else {
                assert!(payload.contains("scene_start_by_crontab"));
                assert!(payload.contains(r#""week":0"#));
            }
            json_response(r#"{"code":0,"msg":"ok"}"#)
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::new(host, "tok");
        execute_command(&transport, &store_in(dir.path()), "nvram commit")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn schedule_failure_is_schedule_error() {
        let host = spawn_http_fixture(|req| {
            let payload = decoded_payload(req);
            assert!(payload.contains("scene_setting"), "trigger must not be reached");
            json_response(r#"{"code":1503,"msg":"scene limit"}"#)
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::new(host, "tok");
        match execute_command(&transport, &store_in(dir.path()), "true").await {
            Err(Error::Schedule { code, message }) => {
                assert_eq!(code, 1503);
                assert_eq!(message, "scene limit");
            }
            other => panic!("expected Schedule error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn trigger_failure_is_trigger_error() {
        let host = spawn_http_fixture(|req| {
            let payload = decoded_payload(req);
            if payload.contains("scene_setting") {
                json_response(r#"{"code":0,"msg":"ok"}"#)
            } else {
                json_response(r#"{"code":1600,"msg":"no such task"}"#)
            }
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::new(host, "tok");
        match execute_command(&transport, &store_in(dir.path()), "true").await {
            Err(Error::Trigger { code, .. }) => assert_eq!(code, 1600),
            other => panic!("expected Trigger error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn non_json_scene_response_is_protocol_error() {
        let host = spawn_http_fixture(|_| json_response("<html>login expired</html>")).await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::new(host, "tok");
        match execute_command(&transport, &store_in(dir.path()), "true").await {
            Err(Error::Protocol(_)) => {}
            other => panic!("expected Protocol error, got {:?}", other.map(|_| ())),
        }
    }
}
