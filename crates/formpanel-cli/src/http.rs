//! HTTP transport for the checker test endpoint.

use formpanel_core::{CheckRequest, CheckResponse, CheckTransport, TransportError};
use tracing::debug;
use ureq::Agent;

use crate::settings::EndpointSettings;

/// Posts form-encoded batches to one endpoint.
pub struct HttpTransport {
    agent: Agent,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, endpoint: &EndpointSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(endpoint.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl CheckTransport for HttpTransport {
    fn send(&mut self, request: &CheckRequest) -> Result<CheckResponse, TransportError> {
        let body = request
            .encode_form()
            .map_err(|err| TransportError::Body(err.to_string().into()))?;
        debug!(url = %self.url, checkers = request.checkers.len(), "posting check batch");
        let mut response = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send(body)
            .map_err(|err| TransportError::Network(err.to_string().into()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| TransportError::Body(err.to_string().into()))?;
        CheckResponse::from_xml(&text).map_err(|err| TransportError::Body(err.to_string().into()))
    }
}
