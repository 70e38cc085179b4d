//! Blocking HTTP transport backed by ureq.

use std::time::Duration;

use board_core::{HttpRequest, HttpResponse, Transport, TransportError};

const TIMEOUT: Duration = Duration::from_secs(30);

/// Sends board requests with ureq. Non-2xx statuses come back as responses
/// so `BoardClient` can classify them.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TIMEOUT))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::new(format!("reading response body: {e}")))?;
        tracing::debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}
