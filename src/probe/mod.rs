//! Availability probes
//!
//! A [`Prober`] performs one availability check per call. Three results are
//! possible:
//!
//! - `Ok` with a slot count: a real reading, zero included
//! - `Ok` with [`crate::DETECTION_ERROR`]: the probe ran but the count could
//!   not be determined
//! - `Err`: the probe itself failed, nothing was observed

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::Outcome;
use crate::clock::Clock;
use crate::config::ProbeConfig;

pub type ProbeResult<T> = Result<T, ProbeError>;

#[derive(Debug)]
pub enum ProbeError {
    /// Request could not be sent or timed out
    Transport(String),
    /// Non-success HTTP status
    Status(u16),
    /// Body is not valid JSON
    Decode(String),
    /// Probe cannot be built from its configuration
    InvalidConfig(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Transport(msg) => write!(f, "request failed: {}", msg),
            ProbeError::Status(status) => write!(f, "unexpected status {}", status),
            ProbeError::Decode(msg) => write!(f, "invalid response body: {}", msg),
            ProbeError::InvalidConfig(msg) => write!(f, "invalid probe configuration: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait Prober: Send {
    /// Label reported in every outcome.
    fn method(&self) -> &str;

    async fn check(&mut self) -> ProbeResult<Outcome>;

    /// Release held resources. Called once when the monitor exits.
    async fn close(&mut self) {}
}

/// Reads the slot count from a JSON document served over HTTP.
pub struct HttpProber {
    client: Client,
    url: String,
    slots_pointer: String,
    method: String,
    target_date: String,
    clock: Arc<dyn Clock>,
}

impl HttpProber {
    pub fn new(
        config: &ProbeConfig,
        target_date: impl ToString,
        clock: Arc<dyn Clock>,
    ) -> ProbeResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProbeError::InvalidConfig(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProbeError::InvalidConfig(format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            slots_pointer: config.slots_pointer.clone(),
            method: config.method.clone(),
            target_date: target_date.to_string(),
            clock,
        })
    }
}

/// Slot count at `pointer`, if it holds a non-negative integer.
fn read_slots(document: &Value, pointer: &str) -> Option<u64> {
    match document.pointer(pointer)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl Prober for HttpProber {
    fn method(&self) -> &str {
        &self.method
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn check(&mut self) -> ProbeResult<Outcome> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let document: Value =
            serde_json::from_str(&body).map_err(|e| ProbeError::Decode(e.to_string()))?;
        let now = self.clock.now();

        match read_slots(&document, &self.slots_pointer) {
            Some(slots) => {
                debug!("{slots} slots at {}", self.slots_pointer);
                Ok(Outcome::new(
                    i64::try_from(slots).unwrap_or(i64::MAX),
                    now,
                    &self.target_date,
                    &self.method,
                ))
            }
            None => {
                warn!("no slot count at {}", self.slots_pointer);
                Ok(Outcome::detection_error(now, &self.target_date, &self.method))
            }
        }
    }
}
