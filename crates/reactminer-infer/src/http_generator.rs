//! Generation over HTTP against a text-generation server.
//!
//! Speaks the `POST /generate` protocol: `{"inputs", "parameters"}` in,
//! `{"generated_text"}` out. The server returns the continuation only, so the
//! prompt is prepended locally to keep full-sequence decode semantics.

use std::time::Duration;

use reactminer_core::{Error, GenerationRequest, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::generator::TextGenerator;
use crate::markers::strip_control_markers;

pub struct HttpGenerator {
    endpoint: String,
    http: Client,
}

impl HttpGenerator {
    /// Create a client for `endpoint`. `timeout` of `None` waits indefinitely.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn generate_url(&self) -> String {
        format!("{}/generate", self.endpoint.trim_end_matches('/'))
    }
}

/// Request body for one generation call. Extra options sit next to the
/// named parameters, unmodified.
pub fn build_payload(request: &GenerationRequest) -> Value {
    let sampling = &request.sampling;
    let mut parameters = json!({
        "temperature": sampling.temperature,
        "top_p": sampling.top_p,
        "top_k": sampling.top_k,
        "do_sample": sampling.do_sample,
        "max_new_tokens": sampling.max_new_tokens,
        "return_full_text": false,
    });
    for (key, value) in sampling.options() {
        parameters[key] = json!(value);
    }

    json!({
        "inputs": request.prompt,
        "parameters": parameters,
    })
}

/// Pull `generated_text` out of an object or a one-element array response.
pub fn parse_response(body: &Value) -> Result<String> {
    let item = match body {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    item.get("generated_text")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Generation("response has no generated_text field".into()))
}

impl TextGenerator for HttpGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = self.generate_url();
        debug!(
            "Generating via {} (max_new_tokens={})",
            url, request.sampling.max_new_tokens
        );

        let response = self
            .http
            .post(&url)
            .json(&build_payload(request))
            .send()
            .map_err(|e| Error::Generation(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Generation(format!("API error {}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .map_err(|e| Error::Generation(format!("Unreadable generation response: {}", e)))?;
        let continuation = parse_response(&body)?;

        Ok(strip_control_markers(&format!(
            "{}{}",
            request.prompt, continuation
        )))
    }

    fn name(&self) -> &str {
        "http"
    }
}
