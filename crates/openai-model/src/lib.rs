//! A model provider for OpenAI-compatible APIs.
//!
//! Requests go to the chat completions endpoint without streaming. JSON
//! requests ask for the `json_object` response format. Rate limited
//! requests and server errors are retried with exponential backoff.

#[macro_use]
extern crate tracing;

mod config;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use backoff::ExponentialBackoff;
use mime::Mime;
use reqwest::{Client, StatusCode, header};
use verdict_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use proto::{ChatCompletion, ChatCompletionRequest};
use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req, &self.config);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);

        async move {
            let mut attempts = 0;
            let completion = backoff::future::retry(
                ExponentialBackoff::default(),
                || {
                    attempts += 1;
                    let last_attempt = attempts > config.max_retries;
                    let fut = send_once(&client, &config, &openai_req);
                    async move {
                        fut.await.map_err(|(err, retryable)| {
                            if retryable && !last_attempt {
                                warn!("request failed, retrying: {err}");
                                backoff::Error::transient(err)
                            } else {
                                backoff::Error::permanent(err)
                            }
                        })
                    }
                },
            )
            .await?;
            OpenAIResponse::from_completion(completion)
        }
    }
}

/// Sends one request. The flag of an error tells whether retrying may help.
fn send_once(
    client: &Client,
    config: &OpenAIConfig,
    openai_req: &ChatCompletionRequest,
) -> impl Future<Output = Result<ChatCompletion, (Error, bool)>> + Send + 'static
{
    let resp_fut = client
        .post(format!("{}{}", config.base_url, "/chat/completions"))
        .header(header::AUTHORIZATION, format!("Bearer {}", config.api_key))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .json(openai_req)
        .send();

    async move {
        let resp = resp_fut.await.map_err(|err| {
            (Error::new(format!("{err}"), ErrorKind::Other), true)
        })?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err((
                Error::new("rate limit exceeded", ErrorKind::RateLimitExceeded),
                true,
            ));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = Error::new(format!("{status}: {body}"), ErrorKind::Other);
            return Err((err, status.is_server_error()));
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let is_json = content_type
            .and_then(|v| v.parse().ok())
            .map(|m: Mime| m.subtype() == mime::JSON)
            .unwrap_or(false);
        if !is_json {
            return Err((
                Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ),
                false,
            ));
        }

        resp.json::<ChatCompletion>().await.map_err(|err| {
            (Error::new(format!("{err}"), ErrorKind::Other), false)
        })
    }
}
