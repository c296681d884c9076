//! Cookie-aware HTTP transport

use std::sync::Arc;
use std::time::Duration;

use encore_domain::EncoreError;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// HTTP transport with a shared cookie jar.
///
/// Cookies set by the backend are stored in the jar and attached to every
/// later request automatically. Sends are single-shot: retry policy belongs to
/// the layers above.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    jar: Arc<Jar>,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, EncoreError> {
        let request = builder.build().map_err(|err| EncoreError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, path = url.path(), "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, path = url.path(), status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, path = url.path(), error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }

    /// Cookie jar shared by every request sent through this client.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Per-request timeout configured on the underlying client.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    content_type: Option<String>,
    cookie_jar: Option<Arc<Jar>>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            content_type: None,
            cookie_jar: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout; defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` sent with every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// `Content-Type` attached to requests that do not set their own.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Share an existing cookie jar instead of creating an empty one.
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Build the client. Fails if the content type is not a valid header value.
    pub fn build(self) -> Result<HttpClient, EncoreError> {
        let jar = self.cookie_jar.unwrap_or_default();
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .cookie_provider(Arc::clone(&jar))
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let mut headers = HeaderMap::new();
        if let Some(content_type) = self.content_type {
            let value = HeaderValue::from_str(&content_type).map_err(|err| {
                EncoreError::Config(format!("Invalid content type '{content_type}': {err}"))
            })?;
            headers.entry(CONTENT_TYPE).or_insert(value);
        }
        if !headers.is_empty() {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| EncoreError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, jar, timeout: self.timeout })
    }
}
