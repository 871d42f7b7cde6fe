//! Client for the capture/voice-output backend.
//!
//! The backend owns webcam capture, quote generation and TTS; this side only
//! starts and stops it, polls its status and forwards voice transcripts.

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::step::Step;

/// Acknowledgement returned by start/stop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub quotes_generated: Option<u32>,
    #[serde(default)]
    pub tts_enabled: Option<bool>,
}

impl Ack {
    pub fn already_running(&self) -> bool {
        self.status == "already_running"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub latest_time: f64,
}

/// Status as reported by `GET /api/session/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    #[serde(default)]
    pub session_active: bool,
    #[serde(rename = "webcam_running", default)]
    pub capture_running: bool,
    #[serde(rename = "tts_enabled", default)]
    pub voice_output_enabled: bool,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub session_active: bool,
    #[serde(default)]
    pub webcam_running: bool,
}

/// Start/stop/poll the capture and voice-output side of a session
pub trait CaptureController: Send + Sync {
    fn start_session(&self, timeline: &[Step], session_id: &str) -> Result<Ack>;
    fn stop_session(&self) -> Result<Ack>;
    fn get_status(&self) -> Result<ControllerStatus>;
    fn health(&self) -> Result<Health>;
}

/// Turn the cook's speech into a chef's reply
pub trait SpeechResponder: Send + Sync {
    fn respond(&self, transcript: &str, current_step: Option<&str>) -> Result<Option<String>>;
}

/// Everything the app needs from the backend
pub trait Backend: CaptureController + SpeechResponder {}

impl<T: CaptureController + SpeechResponder> Backend for T {}

/// Backend reached over HTTP. Polls and health probes get a short bound;
/// start/stop/respond wait on quote generation and process shutdown, so they
/// get a longer one.
pub struct HttpController {
    url: String,
    agent: ureq::Agent,
    poll_timeout: Duration,
    command_timeout: Duration,
}

impl HttpController {
    pub fn new(base_url: &str, poll_timeout: Duration, command_timeout: Duration) -> Self {
        let url = base_url.trim_end_matches('/').to_string();
        log::info!(
            "HttpController: endpoint {url}, poll timeout {poll_timeout:?}, command timeout {command_timeout:?}"
        );
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(poll_timeout)
            .build();
        Self {
            url,
            agent,
            poll_timeout,
            command_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let result = self
            .agent
            .get(&format!("{}{path}", self.url))
            .timeout(self.poll_timeout)
            .call();
        read_json(path, result)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let result = self
            .agent
            .post(&format!("{}{path}", self.url))
            .timeout(self.command_timeout)
            .send_json(body);
        read_json(path, result)
    }
}

/// Decode a JSON body, turning HTTP error statuses into errors that carry the
/// backend's `error` message when it sent one.
fn read_json<T: DeserializeOwned>(
    path: &str,
    result: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<T> {
    match result {
        Ok(resp) => resp
            .into_json::<T>()
            .with_context(|| format!("{path}: unexpected response body")),
        Err(ureq::Error::Status(code, resp)) => {
            let detail = resp
                .into_json::<serde_json::Value>()
                .ok()
                .and_then(|body| body["error"].as_str().map(str::to_string));
            match detail {
                Some(detail) => bail!("{path}: HTTP {code}: {detail}"),
                None => bail!("{path}: HTTP {code}"),
            }
        }
        Err(err) => Err(anyhow!(err).context(format!("{path}: backend unreachable"))),
    }
}

impl CaptureController for HttpController {
    fn start_session(&self, timeline: &[Step], session_id: &str) -> Result<Ack> {
        let ack: Ack = self.post(
            "/api/session/start",
            json!({ "timeline": timeline, "session_id": session_id }),
        )?;
        log::debug!("start ack: {ack:?}");
        Ok(ack)
    }

    fn stop_session(&self) -> Result<Ack> {
        let ack: Ack = self.post("/api/session/stop", json!({}))?;
        log::debug!("stop ack: {ack:?}");
        Ok(ack)
    }

    fn get_status(&self) -> Result<ControllerStatus> {
        self.get("/api/session/status")
    }

    fn health(&self) -> Result<Health> {
        self.get("/api/health")
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    response: Option<String>,
}

impl SpeechResponder for HttpController {
    fn respond(&self, transcript: &str, current_step: Option<&str>) -> Result<Option<String>> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Ok(None);
        }
        let reply: Reply = self.post(
            "/api/voice/respond",
            json!({ "transcript": transcript, "context": current_step }),
        )?;
        Ok(reply.response.filter(|r| !r.trim().is_empty()))
    }
}
