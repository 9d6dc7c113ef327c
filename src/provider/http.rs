use crate::config;
use crate::error::{ScreenError, ScreenResult};
use anyhow::{Context, Result};
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

// -----------------------------------------------
// SHARED HTTP CLIENT
// -----------------------------------------------
/// Cheap to clone; every adapter holds one.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

/// Failed attempt, tagged with whether another try could help
struct Attempt {
    retryable: bool,
    error: ScreenError,
}

impl Attempt {
    fn fatal(error: ScreenError) -> Self {
        Self { retryable: false, error }
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and return the body, which must look like JSON.
    pub async fn fetch_json(&self, url: &str, bearer: Option<&str>) -> ScreenResult<String> {
        self.fetch(url, bearer, true).await
    }

    /// GET `url` and return the body as-is
    pub async fn fetch_text(&self, url: &str) -> ScreenResult<String> {
        self.fetch(url, None, false).await
    }

    /// Retries 429 and 5xx with exponential backoff; fails fast on
    /// anything else.
    async fn fetch(&self, url: &str, bearer: Option<&str>, expect_json: bool) -> ScreenResult<String> {
        let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
            .factor(config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(config::RETRY_MAX_ATTEMPTS);

        let result = RetryIf::spawn(
            backoff,
            || async {
                let mut req = self.client.get(url);
                if let Some(token) = bearer {
                    req = req
                        .bearer_auth(token)
                        .header(header::ACCEPT, "application/json");
                }

                let res = req.send().await.map_err(|e| Attempt {
                    retryable: e.is_connect(),
                    error: ScreenError::from(e),
                })?;
                let status = res.status();
                tracing::debug!(url, status = status.as_u16(), "provider response");

                if status.is_success() {
                    let text = res
                        .text()
                        .await
                        .map_err(|e| Attempt::fatal(ScreenError::from(e)))?;

                    if expect_json {
                        let trimmed = text.trim();
                        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                            let preview: String = text.chars().take(200).collect();
                            return Err(Attempt::fatal(ScreenError::Parse(format!(
                                "Non-JSON response: {}",
                                preview
                            ))));
                        }
                    }
                    Ok(text)
                } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    Err(Attempt {
                        retryable: true,
                        error: ScreenError::Request(format!("Retryable error: {}", status)),
                    })
                } else if status == StatusCode::NOT_FOUND {
                    Err(Attempt::fatal(ScreenError::DataUnavailable(format!(
                        "Not found: {}",
                        url
                    ))))
                } else {
                    let body = res.text().await.unwrap_or_default();
                    let preview: String = body.chars().take(200).collect();
                    Err(Attempt::fatal(ScreenError::Request(format!(
                        "Client error {}: {}",
                        status, preview
                    ))))
                }
            },
            |attempt: &Attempt| attempt.retryable,
        )
        .await;

        result.map_err(|attempt| attempt.error)
    }
}

/// Parse a JSON body, mapping failures to `ScreenError::Parse`
pub fn parse_json<T: serde::de::DeserializeOwned>(text: &str, what: &str) -> ScreenResult<T> {
    serde_json::from_str(text)
        .map_err(|e| ScreenError::Parse(format!("Failed to parse {}: {}", what, e)))
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_str(lang)?);
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .user_agent(config::USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}
