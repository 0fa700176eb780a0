//! Wire format of the checker test endpoint.
//!
//! A batch is posted form-encoded as `fieldCheckersInfo=<json>&formValues=<json>`.
//! The endpoint answers with an XML document holding one element per failing
//! checker, named by the checker key, whose text is the failure message.

#![allow(missing_docs)]

use formpanel_schema::Value;
use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::error::FormError;

/// Test inputs of one checker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerInfo {
    pub raw_test_values: Vec<Value>,
    pub test_params_names: Vec<SmolStr>,
}

/// One batch sent to the test endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckRequest {
    /// Keyed by checker key, in launch order.
    pub checkers: IndexMap<SmolStr, CheckerInfo>,
    pub form_values: IndexMap<SmolStr, Value>,
}

impl CheckRequest {
    /// Form-encoded request body.
    pub fn encode_form(&self) -> Result<String, FormError> {
        let info = serde_json::to_string(&self.checkers)
            .map_err(|err| FormError::Encode(err.to_string().into()))?;
        let values = serde_json::to_string(&self.form_values)
            .map_err(|err| FormError::Encode(err.to_string().into()))?;
        Ok(format!(
            "fieldCheckersInfo={}&formValues={}",
            urlencoding::encode(&info),
            urlencoding::encode(&values)
        ))
    }

    /// Checker keys of the batch.
    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.checkers.keys()
    }
}

/// Failure messages of a batch; a checker without one succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResponse {
    failures: IndexMap<SmolStr, String>,
}

impl CheckResponse {
    /// Reads the endpoint's XML answer. Any element with non-empty text is a
    /// failure keyed by its tag; the first one per tag wins.
    pub fn from_xml(body: &str) -> Result<Self, FormError> {
        let doc = roxmltree::Document::parse(body)
            .map_err(|err| FormError::InvalidResponse(err.to_string().into()))?;
        let mut failures = IndexMap::new();
        for node in doc.root_element().descendants().filter(|node| node.is_element()) {
            if node.children().any(|child| child.is_element()) {
                continue;
            }
            let text = node.text().map(str::trim).unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            failures
                .entry(SmolStr::new(node.tag_name().name()))
                .or_insert_with(|| text.to_string());
        }
        Ok(Self { failures })
    }

    #[must_use]
    pub fn from_failures<K, M>(failures: impl IntoIterator<Item = (K, M)>) -> Self
    where
        K: Into<SmolStr>,
        M: Into<String>,
    {
        Self {
            failures: failures
                .into_iter()
                .map(|(key, message)| (key.into(), message.into()))
                .collect(),
        }
    }

    /// Failure message for `key`, if it failed.
    #[must_use]
    pub fn message(&self, key: &str) -> Option<&str> {
        self.failures.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// The test endpoint could not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("test endpoint answered with status {0}")]
    Status(u16),

    #[error("test endpoint unreachable: {0}")]
    Network(SmolStr),

    #[error("unreadable test endpoint answer: {0}")]
    Body(SmolStr),
}

/// Delivers a batch to the test endpoint.
pub trait CheckTransport {
    fn send(&mut self, request: &CheckRequest) -> Result<CheckResponse, TransportError>;
}

impl<F> CheckTransport for F
where
    F: FnMut(&CheckRequest) -> Result<CheckResponse, TransportError>,
{
    fn send(&mut self, request: &CheckRequest) -> Result<CheckResponse, TransportError> {
        self(request)
    }
}
