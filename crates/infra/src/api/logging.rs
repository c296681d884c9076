//! Request logging layer

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::navigation::strip_query;
use super::pipeline::{Middleware, Next, Outcome};
use super::request::RequestDescriptor;

/// Outermost layer: logs every dispatch and the final outcome of each call.
///
/// Query strings, header values and bodies are never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn on_request(&self, request: &mut RequestDescriptor) {
        debug!(
            method = %request.method(),
            path = %strip_query(request.path()),
            retried = request.is_retried(),
            "dispatching request"
        );
    }

    async fn on_response(
        &self,
        request: &mut RequestDescriptor,
        outcome: Outcome,
        _next: &Next,
    ) -> Outcome {
        let elapsed_ms = millis(request.elapsed());
        let path = strip_query(request.path());

        match &outcome {
            Ok(response) if response.is_success() => info!(
                method = %request.method(),
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms,
                retried = request.is_retried(),
                "request completed"
            ),
            Ok(response) => warn!(
                method = %request.method(),
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms,
                retried = request.is_retried(),
                "request returned error status"
            ),
            Err(err) => warn!(
                method = %request.method(),
                path = %path,
                error = %err,
                elapsed_ms,
                "request failed"
            ),
        }

        outcome
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
