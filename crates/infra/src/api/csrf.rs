//! Anti-forgery header decoration

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::{trace, warn};

use super::errors::ApiError;
use super::pipeline::Middleware;
use super::request::RequestDescriptor;
use crate::http::CookieSource;

/// Copies the anti-forgery cookie into a request header.
///
/// Fails open: when the cookie is missing (or not a valid header value) the
/// request goes out undecorated and the backend decides whether to reject it.
pub struct CsrfDecorator {
    cookies: Arc<dyn CookieSource>,
    cookie_name: String,
    header: HeaderName,
}

impl CsrfDecorator {
    /// # Errors
    /// Returns `ApiError::Config` if `header` is not a valid header name.
    pub fn new(
        cookies: Arc<dyn CookieSource>,
        cookie_name: impl Into<String>,
        header: &str,
    ) -> Result<Self, ApiError> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| ApiError::Config(format!("Invalid CSRF header name '{}': {}", header, e)))?;

        Ok(Self { cookies, cookie_name: cookie_name.into(), header })
    }

    /// Apply the header to `request` from the current cookie snapshot.
    pub fn decorate(&self, request: &mut RequestDescriptor) {
        let Some(token) = self.cookies.cookie(&self.cookie_name) else {
            trace!(path = request.path(), "no anti-forgery cookie; sending undecorated");
            return;
        };

        match HeaderValue::from_str(&token) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(self.header.clone(), value);
            }
            Err(_) => {
                warn!(cookie = %self.cookie_name, "anti-forgery cookie is not a valid header value");
            }
        }
    }
}

#[async_trait]
impl Middleware for CsrfDecorator {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn on_request(&self, request: &mut RequestDescriptor) {
        self.decorate(request);
    }
}
