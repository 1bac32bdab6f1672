use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use orbit_model::{Command, CommandResult, OrchestratorCommandResult};

use super::{Orchestrator, OrchestratorError};

/// Header carrying the orchestrator's function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Orchestrator reached over HTTP.
///
/// `POST {base}/api/command` submits, `GET {base}/api/command/{commandId}`
/// reads the latest result.
#[derive(Debug, Clone)]
pub struct HttpOrchestrator {
    client: reqwest::Client,
    base_url: String,
    function_key: Option<String>,
}

impl HttpOrchestrator {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            function_key: None,
        }
    }

    pub fn with_function_key(mut self, key: impl Into<String>) -> Self {
        self.function_key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn command_url(&self) -> String {
        format!("{}/api/command", self.base_url)
    }

    pub fn command_status_url(&self, command: &Command) -> String {
        format!("{}/api/command/{}", self.base_url, command.command_id())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.function_key {
            Some(key) => request.header(FUNCTION_KEY_HEADER, key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<OrchestratorCommandResult, OrchestratorError> {
        let response = self.authorize(request).send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body: ResponseBody = response
            .json()
            .await
            .map_err(|e| OrchestratorError::Decode(e.to_string()))?;
        Ok(body.into())
    }
}

/// The orchestrator answers either with the aggregated view or, for commands
/// that never reach a provider, with the bare primary result.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Aggregated(OrchestratorCommandResult),
    Single(CommandResult),
}

impl From<ResponseBody> for OrchestratorCommandResult {
    fn from(value: ResponseBody) -> Self {
        match value {
            ResponseBody::Aggregated(result) => result,
            ResponseBody::Single(result) => OrchestratorCommandResult::aggregate(result, []),
        }
    }
}

fn status_error(status: StatusCode, body: String) -> OrchestratorError {
    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            OrchestratorError::Transient(format!("{status}"))
        }
        _ => OrchestratorError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

fn transport_error(error: reqwest::Error) -> OrchestratorError {
    if error.is_connect() || error.is_timeout() {
        OrchestratorError::Transient(error.to_string())
    } else {
        OrchestratorError::Transport(error.to_string())
    }
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    async fn invoke(&self, command: &Command) -> Result<OrchestratorCommandResult, OrchestratorError> {
        debug!(command_id = %command.command_id(), kind = ?command.kind(), "submitting command");
        self.send(self.client.post(self.command_url()).json(command)).await
    }

    async fn query(&self, command: &Command) -> Result<OrchestratorCommandResult, OrchestratorError> {
        debug!(command_id = %command.command_id(), "querying command status");
        self.send(self.client.get(self.command_status_url(command))).await
    }
}
