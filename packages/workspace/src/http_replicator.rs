//! Blocking HTTP client for the history endpoints

use reqwest::blocking::Client;
use reqwest::StatusCode;
use scribe_editor::{ReplicationError, Replicator, Step};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Replicates steps through a history server at `base_url`
pub struct HttpReplicator {
    base_url: String,
    client: Client,
}

impl HttpReplicator {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ReplicationError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn transport(err: reqwest::Error) -> ReplicationError {
    ReplicationError::Transport(err.to_string())
}

impl Replicator for HttpReplicator {
    fn fetch(&mut self, after: Option<&str>) -> Result<Vec<Step>, ReplicationError> {
        let url = format!("{}/history-get/{}", self.base_url, after.unwrap_or("0"));
        let response = self.client.get(&url).send().map_err(transport)?;
        if !response.status().is_success() {
            return Err(ReplicationError::Status(response.status().as_u16()));
        }
        let body = response.text().map_err(transport)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn push(&mut self, step: &Step) -> Result<(), ReplicationError> {
        let url = format!("{}/history-push", self.base_url);
        let response = self.client.post(&url).json(step).send().map_err(transport)?;
        match response.status() {
            StatusCode::CONFLICT => Err(ReplicationError::Duplicate(step.id.clone())),
            status if status.is_success() => Ok(()),
            status => Err(ReplicationError::Status(status.as_u16())),
        }
    }
}
