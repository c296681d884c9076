//! Middleware pipeline around the HTTP transport
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] wrapped around a
//! [`Transport`]. For every dispatch:
//!
//! 1. `on_request` runs for each layer in registration order.
//! 2. The transport sends the request.
//! 3. `on_response` runs for each layer in reverse order, so the last
//!    registered layer is the innermost and sees the raw transport outcome.
//!
//! A response transform may re-dispatch through [`Next`]. A re-dispatch runs
//! every request transform again, then only the response transforms from the
//! calling layer inward; outer layers see the final outcome once.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use tracing::debug;

use super::errors::ApiError;
use super::request::{ApiResponse, RequestDescriptor};
use crate::http::HttpClient;

/// Result of one trip through the pipeline. Any HTTP status is `Ok`; `Err`
/// means no response was obtained.
pub type Outcome = Result<ApiResponse, ApiError>;

/// Sends a fully decorated request and buffers the response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` once. Transport failures come back as `Err`.
    async fn send(&self, request: &RequestDescriptor) -> Outcome;
}

/// One (request transform, response transform) pair.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    /// Adjust an outgoing request. Runs in registration order, on every
    /// dispatch including replays.
    fn on_request(&self, _request: &mut RequestDescriptor) {}

    /// Inspect or replace the outcome. Runs in reverse registration order;
    /// `next` re-dispatches from this layer inward.
    async fn on_response(
        &self,
        _request: &mut RequestDescriptor,
        outcome: Outcome,
        _next: &Next,
    ) -> Outcome {
        outcome
    }
}

/// Handle for re-dispatching from a given layer.
#[derive(Clone)]
pub struct Next {
    inner: Arc<PipelineInner>,
    depth: usize,
}

impl Next {
    /// Send `request` through every request transform, the transport, and the
    /// response transforms from this layer inward.
    pub async fn dispatch(&self, request: RequestDescriptor) -> Outcome {
        PipelineInner::run(Arc::clone(&self.inner), request, self.depth).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("depth", &self.depth).finish()
    }
}

struct PipelineInner {
    layers: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl PipelineInner {
    fn run(inner: Arc<Self>, mut request: RequestDescriptor, floor: usize) -> BoxFuture<'static, Outcome> {
        Box::pin(async move {
            for layer in &inner.layers {
                layer.on_request(&mut request);
            }

            let mut outcome = inner.transport.send(&request).await;

            for depth in (floor..inner.layers.len()).rev() {
                let next = Next { inner: Arc::clone(&inner), depth };
                outcome = inner.layers[depth].on_response(&mut request, outcome, &next).await;
            }

            outcome
        })
    }
}

/// Ordered middleware stack around a transport.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    /// Start a pipeline around `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder { transport, layers: Vec::new(), innermost: None }
    }

    /// Send a request through the whole pipeline.
    pub async fn dispatch(&self, request: RequestDescriptor) -> Outcome {
        PipelineInner::run(Arc::clone(&self.inner), request, 0).await
    }

    /// Layer names, outermost first.
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.inner.layers.iter().map(|layer| layer.name()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("layers", &self.layer_names()).finish()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    layers: Vec<Arc<dyn Middleware>>,
    innermost: Option<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    /// Append a layer inside all previously added ones.
    pub fn layer(mut self, layer: Arc<dyn Middleware>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Pin a layer below every other layer regardless of registration order.
    pub fn innermost(mut self, layer: Arc<dyn Middleware>) -> Self {
        self.innermost = Some(layer);
        self
    }

    /// Finish the stack.
    pub fn build(self) -> Pipeline {
        let mut layers = self.layers;
        layers.extend(self.innermost);
        debug!(
            layers = ?layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
            "built request pipeline"
        );
        Pipeline { inner: Arc::new(PipelineInner { layers, transport: self.transport }) }
    }
}

/// Transport backed by [`HttpClient`] against a fixed backend origin.
pub struct HttpTransport {
    http: HttpClient,
    base_url: String,
}

impl HttpTransport {
    /// Transport sending to `base_url`.
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Absolute URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Outcome {
        let url = self.url_for(request.path());

        let mut builder =
            self.http.request(request.method().clone(), &url).headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let timeout = self.http.timeout();
        let response = match tokio::time::timeout(timeout, self.http.send(builder)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(ApiError::from(err)),
            Err(_) => return Err(ApiError::Timeout(timeout)),
        };

        let status = response.status();
        let headers: HeaderMap = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse::new(url, status, headers, body.to_vec()))
    }
}
