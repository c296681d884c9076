//! Request and response values carried through the pipeline

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::ApiError;
use crate::errors::InfraError;

/// One logical API call.
///
/// Owned by the call that issues it. `retried` is set at most once, when the
/// session layer replays the call after a successful refresh.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    retried: bool,
    issued_at: Instant,
}

impl RequestDescriptor {
    /// `path` is relative to the backend origin and may carry a query string.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
            issued_at: Instant::now(),
        }
    }

    /// `GET` to `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` to `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` to `path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `PATCH` to `path`.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE` to `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::Client` if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::from(InfraError::from(e).0))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set a header, replacing any existing value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the backend origin, query included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Headers set so far, including those added by middleware.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers, for middleware decoration.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Whether this is the replay of a call that hit an expired session.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the call as replayed. Replays are never refreshed again.
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Time since the logical call was created, replays included.
    pub fn elapsed(&self) -> Duration {
        self.issued_at.elapsed()
    }
}

/// Fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    /// Response to `url` with an already buffered body.
    pub fn new(url: impl Into<String>, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self { url: url.into(), status, headers, body }
    }

    /// URL the response came from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON. An empty body deserializes from `null`.
    ///
    /// # Errors
    /// Returns `ApiError::Client` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.is_empty() {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Client(format!(
                    "Empty response ({}), but response type cannot be deserialized from empty body",
                    self.status.as_u16()
                ))
            });
        }

        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::Client(format!("Failed to parse response: {}", e)))
    }

    /// Turn non-2xx statuses into a classified [`ApiError`].
    ///
    /// # Errors
    /// Returns the classification of [`ApiError::from_status`].
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.url, &self.text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::CONTENT_TYPE;

    use super::*;

    #[test]
    fn descriptor_starts_unretried() {
        let mut request = RequestDescriptor::get("/api/liked-songs?limit=20&offset=0");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/api/liked-songs?limit=20&offset=0");
        assert!(!request.is_retried());

        request.mark_retried();
        assert!(request.is_retried());
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let request = RequestDescriptor::post("/api/reviews")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        assert_eq!(request.headers().get("Content-Type").unwrap(), "text/plain");
        assert_eq!(request.headers().get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn json_body_is_serialized() {
        #[derive(Serialize)]
        struct Review<'a> {
            rating: u8,
            text: &'a str,
        }

        let request =
            RequestDescriptor::post("/api/reviews").json(&Review { rating: 5, text: "great" }).unwrap();

        assert_eq!(request.body().unwrap()["rating"], 5);
    }

    #[test]
    fn empty_body_deserializes_unit() {
        let response = ApiResponse::new("u", StatusCode::NO_CONTENT, HeaderMap::new(), Vec::new());
        let unit: Result<(), ApiError> = response.json();
        assert!(unit.is_ok());

        let list: Result<Vec<u32>, ApiError> = response.json();
        assert!(matches!(list, Err(ApiError::Client(_))));
    }

    #[test]
    fn error_for_status_classifies() {
        let response =
            ApiResponse::new("/api/x", StatusCode::NOT_FOUND, HeaderMap::new(), b"missing".to_vec());
        assert!(matches!(response.error_for_status(), Err(ApiError::Client(msg)) if msg.contains("missing")));

        let ok = ApiResponse::new("/api/x", StatusCode::OK, HeaderMap::new(), b"[1,2]".to_vec());
        let values: Vec<u32> = ok.error_for_status().unwrap().json().unwrap();
        assert_eq!(values, vec![1, 2]);
    }
}
