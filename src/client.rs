use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::{AgentBackend, EventStream};
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{AgentInfo, HealthStatus, RunAgentInput};

/// Agent endpoint used when neither an argument nor `AULA_AGENT_URL` names one.
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8000/";
/// Environment variable consulted for the agent endpoint.
pub const AGENT_URL_ENV: &str = "AULA_AGENT_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for an AG-UI agent endpoint.
#[derive(Clone)]
pub struct AgentClient {
    client: ReqwestClient,
    agent_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentClient")
            .field("agent_url", &self.agent_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl AgentClient {
    /// Create a new agent client.
    ///
    /// The endpoint can be provided directly or read from the `AULA_AGENT_URL`
    /// environment variable; otherwise [`DEFAULT_AGENT_URL`] is used.
    pub fn new(agent_url: Option<String>) -> Result<Self> {
        Self::with_options(agent_url, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds a whole run, including the time spent streaming the
    /// response.
    pub fn with_options(agent_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let agent_url = agent_url
            .or_else(|| env::var(AGENT_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string());
        let agent_url = normalize_agent_url(&agent_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            agent_url,
            timeout,
            logger: None,
        })
    }

    /// Attaches a logger that sees every run request and stream event.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The agent endpoint runs are posted to.
    pub fn agent_url(&self) -> &Url {
        &self.agent_url
    }

    /// The per-run timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a path relative to the agent endpoint.
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.agent_url.join(path)?)
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process error responses and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        // FastAPI reports {"detail": ...}; other servers {"message": ...}.
        #[derive(Deserialize)]
        struct ErrorBody {
            detail: Option<serde_json::Value>,
            message: Option<String>,
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| {
                parsed.message.or_else(|| {
                    parsed.detail.map(|detail| match detail {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                })
            })
            .unwrap_or(body);

        match status_code {
            408 | 504 => Error::timeout(message, None),
            _ => Error::api(status_code, message),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Probes the agent's health endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("health").await
    }

    /// Fetches the agent's self-description.
    pub async fn info(&self) -> Result<AgentInfo> {
        self.get_json("info").await
    }

    /// Posts a run and returns its event stream.
    pub async fn stream(&self, input: RunAgentInput) -> Result<EventStream> {
        CLIENT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_run_input(&input);
        }

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let started = Instant::now();
        let response = self
            .client
            .post(self.agent_url.clone())
            .headers(headers)
            .json(&input)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        tracing::debug!(
            thread_id = %input.thread_id,
            run_id = %input.run_id,
            messages = input.messages.len(),
            "agent run started"
        );

        let events = process_sse(response.bytes_stream());
        match self.logger.clone() {
            Some(logger) => {
                let run_id = input.run_id;
                Ok(Box::pin(events.inspect(move |item| {
                    if let Ok(event) = item {
                        logger.log_event(&run_id, event);
                    }
                })))
            }
            None => Ok(Box::pin(events)),
        }
    }
}

#[async_trait::async_trait]
impl AgentBackend for AgentClient {
    async fn run(&self, input: RunAgentInput) -> Result<EventStream> {
        self.stream(input).await
    }
}

/// Parses an endpoint and makes sure relative paths resolve beneath it.
fn normalize_agent_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::url(
            format!("unsupported scheme '{}' in agent URL", url.scheme()),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = AgentClient::new(Some("http://localhost:8000".to_string())).unwrap();
        assert_eq!(client.agent_url().as_str(), "http://localhost:8000/");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = AgentClient::with_options(
            Some("https://agents.example.com/fisica".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.agent_url().as_str(), "https://agents.example.com/fisica/");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn endpoints_resolve_beneath_agent_url() {
        let client = AgentClient::new(Some("http://localhost:8000/agent".to_string())).unwrap();
        assert_eq!(
            client.endpoint("health").unwrap().as_str(),
            "http://localhost:8000/agent/health"
        );
        assert_eq!(
            client.endpoint("info").unwrap().as_str(),
            "http://localhost:8000/agent/info"
        );
    }

    #[test]
    fn rejects_bad_urls() {
        let err = AgentClient::new(Some("not a url".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));

        let err = AgentClient::new(Some("ftp://example.com/".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }
}
