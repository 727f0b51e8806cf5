//! Outbound request logging for the Google HTTP client.

use std::time::Instant;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

/// Logs method, host, path, status and latency of every outbound request.
///
/// Query strings and headers are left out so tokens and codes never reach the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogging;

#[async_trait::async_trait]
impl Middleware for RequestLogging {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let host = req.url().host_str().unwrap_or_default().to_owned();
        let path = req.url().path().to_owned();
        let started = Instant::now();

        let result = next.run(req, extensions).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %host,
                %path,
                status = response.status().as_u16(),
                elapsed_ms,
                "Google request completed"
            ),
            Err(e) => tracing::warn!(
                %method,
                %host,
                %path,
                error = %e,
                elapsed_ms,
                "Google request failed"
            ),
        }

        result
    }
}
