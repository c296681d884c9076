//! API client with transparent session continuity
//!
//! Every call goes through the request pipeline: logging, anti-forgery
//! decoration, any caller-supplied middleware, and finally the session layer,
//! which refreshes an expired session once and replays the call.

use std::sync::Arc;
use std::time::Duration;

use encore_domain::constants::{HEALTH_CHECK_TIMEOUT_MS, HEALTH_PATH};
use encore_domain::Config;
use reqwest::cookie::Jar;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::csrf::CsrfDecorator;
use super::errors::ApiError;
use super::logging::RequestLogger;
use super::navigation::{BroadcastNavigator, Navigator};
use super::pipeline::{HttpTransport, Middleware, Outcome, Pipeline};
use super::request::RequestDescriptor;
use super::session::{PipelineRefresher, SessionGuard, SessionRefresher};
use crate::http::{CookieSource, HttpClient, JarCookieSource};

/// Client for the Encore backend
pub struct ApiClient {
    config: Config,
    http: HttpClient,
    transport: Arc<HttpTransport>,
    pipeline: Pipeline,
    session: Arc<SessionGuard>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client with default collaborators for `config`
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be created
    pub fn new(config: Config) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Send a request through the pipeline.
    ///
    /// Any HTTP status is returned as `Ok`; `Err` means no response was
    /// obtained. A `401` seen here means the session could not be restored.
    pub async fn send(&self, request: RequestDescriptor) -> Outcome {
        self.pipeline.dispatch(request).await
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the backend answers with a
    /// non-success status, or the response cannot be deserialized
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(RequestDescriptor::get(path)).await
    }

    /// Execute a POST request with a JSON body
    ///
    /// # Errors
    ///
    /// Returns error if the body cannot be serialized, the request fails, or
    /// the response is not a success
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestDescriptor::post(path).json(body)?).await
    }

    /// Execute a PUT request with a JSON body
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::post`]
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestDescriptor::put(path).json(body)?).await
    }

    /// Execute a PATCH request with a JSON body
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::post`]
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestDescriptor::patch(path).json(body)?).await
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`]
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.call(RequestDescriptor::delete(path)).await
    }

    /// Health check for the backend, outside the pipeline.
    ///
    /// # Returns
    ///
    /// `true` if the backend is reachable and healthy
    ///
    /// # Errors
    ///
    /// Returns error on timeout or transport failure
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let url = self.transport.url_for(HEALTH_PATH);

        debug!(url = %url, "Health check");

        let timeout = Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS);
        let request = self.http.request(Method::GET, &url);

        let response = tokio::time::timeout(timeout, self.http.send(request)).await.map_err(|_| {
            warn!("Health check timeout");
            ApiError::Timeout(timeout)
        })?;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("API is healthy");
                Ok(true)
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "API returned non-success status");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                Err(ApiError::from(e))
            }
        }
    }

    /// Validated configuration the client was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cookie jar shared with the transport.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.http.cookie_jar()
    }

    /// Navigator receiving redirects to the auth entry path.
    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.navigator)
    }

    /// The middleware stack every call goes through.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Whether a session refresh is pending right now.
    pub fn is_refreshing(&self) -> bool {
        self.session.is_refreshing()
    }

    async fn call<R: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<R, ApiError> {
        let method = request.method().clone();
        let response = self.send(request).await?.error_for_status()?;
        let result = response.json()?;

        info!(method = %method, "request successful");
        Ok(result)
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<Config>,
    cookie_jar: Option<Arc<Jar>>,
    cookie_source: Option<Arc<dyn CookieSource>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresher: Option<Arc<dyn SessionRefresher>>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl ApiClientBuilder {
    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing cookie jar with the transport
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Read the anti-forgery cookie from somewhere other than the jar
    pub fn cookie_source(mut self, source: Arc<dyn CookieSource>) -> Self {
        self.cookie_source = Some(source);
        self
    }

    /// Where to send the user when the session cannot be restored.
    /// Defaults to a [`BroadcastNavigator`] at `/`.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Replace the default refresh call.
    pub fn refresher(mut self, refresher: Arc<dyn SessionRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Add a layer between the anti-forgery decorator and the session layer
    pub fn middleware(mut self, layer: Arc<dyn Middleware>) -> Self {
        self.middleware.push(layer);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or client creation fails
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let origin = Url::parse(&config.api.base_url)
            .map_err(|e| ApiError::Config(format!("Invalid base URL '{}': {}", config.api.base_url, e)))?;

        let jar = self.cookie_jar.unwrap_or_default();
        let mut http = HttpClient::builder()
            .timeout(Duration::from_millis(config.api.timeout_ms))
            .content_type(config.api.content_type.clone())
            .cookie_jar(Arc::clone(&jar));
        if let Some(agent) = &config.api.user_agent {
            http = http.user_agent(agent.clone());
        }
        let http = http.build()?;

        let cookies = self
            .cookie_source
            .unwrap_or_else(|| Arc::new(JarCookieSource::new(jar, origin)));
        let navigator: Arc<dyn Navigator> =
            self.navigator.unwrap_or_else(|| Arc::new(BroadcastNavigator::default()));
        let refresher = self
            .refresher
            .unwrap_or_else(|| Arc::new(PipelineRefresher::new(config.session.refresh_path.clone())));

        let csrf = CsrfDecorator::new(
            cookies,
            config.session.csrf_cookie.clone(),
            &config.session.csrf_header,
        )?;
        let session =
            Arc::new(SessionGuard::from_config(&config.session, refresher, Arc::clone(&navigator)));
        let transport = Arc::new(HttpTransport::new(http.clone(), config.api.base_url.clone()));

        let mut pipeline = Pipeline::builder(transport.clone())
            .layer(Arc::new(RequestLogger))
            .layer(Arc::new(csrf));
        for layer in self.middleware {
            pipeline = pipeline.layer(layer);
        }
        let pipeline = pipeline.innermost(session.clone()).build();

        info!(base_url = %config.api.base_url, "API client ready");

        Ok(ApiClient { config, http, transport, pipeline, session, navigator })
    }
}
