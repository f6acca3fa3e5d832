//! Remote-call plumbing
//!
//! - [`RemoteClient`] is the seam between the palette and the network; the
//!   ureq-backed [`UreqClient`] is the production implementation
//! - [`build_request_body`] assembles `{prompt, metadata, ...context}`
//! - [`render_template`] fills `{{placeholder}}`s in prompt templates
//! - [`buffered_text`] extracts text from a non-streamed response body

use std::collections::HashMap;
use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{json, Map, Value};

/// Accept header advertising every framing the ingestor understands
const ACCEPT_STREAMING: &str =
    "text/event-stream, application/x-ndjson, application/jsonl, application/json;q=0.9";

/// One outgoing POST.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub endpoint: String,
    pub body: Value,
    pub headers: Vec<(String, String)>,
    /// Deadline for the request and the whole body read
    pub timeout: Duration,
}

/// A response whose body has not been read yet.
pub struct RemoteResponse {
    pub content_type: Option<String>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for RemoteResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResponse")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Issues remote calls. Implementations must be usable from worker threads.
pub trait RemoteClient: Send + Sync {
    /// Send the request and return once headers have arrived.
    ///
    /// An `Err` means nothing was received (connect failure, timeout, HTTP
    /// error status).
    fn post(&self, request: &RemoteRequest) -> Result<RemoteResponse>;
}

/// Production client over ureq.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqClient;

impl RemoteClient for UreqClient {
    fn post(&self, request: &RemoteRequest) -> Result<RemoteResponse> {
        tracing::debug!(
            endpoint = %request.endpoint,
            timeout_ms = request.timeout.as_millis() as u64,
            header_count = request.headers.len(),
            "Sending remote request"
        );

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(request.timeout))
            .build()
            .into();

        let mut builder = agent
            .post(&request.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", ACCEPT_STREAMING);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send_json(&request.body)
            .with_context(|| format!("Failed to send request to {}", request.endpoint))?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            status = response.status().as_u16(),
            content_type = content_type.as_deref().unwrap_or(""),
            "Remote response headers received"
        );

        Ok(RemoteResponse {
            content_type,
            body: Box::new(response.into_body().into_reader()),
        })
    }
}

/// Whether a remote failure was a deadline expiry rather than a hard error.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(ureq::Error::Timeout(_)) = cause.downcast_ref::<ureq::Error>() {
            return true;
        }
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        let message = cause.to_string().to_ascii_lowercase();
        message.contains("timed out") || message.contains("timeout")
    })
}

/// Structured context attached to outgoing requests by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Identifier of the enclosing record (ticket, document, ...)
    pub context_id: Option<String>,
    /// Extra top-level body fields; also available as `{{key}}` placeholders
    pub fields: Map<String, Value>,
}

impl RequestContext {
    pub fn with_context_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Values available to `{{placeholder}}` substitution.
pub fn template_vars(query: &str, title: &str, context: &RequestContext) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = context
        .fields
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect();
    if let Some(id) = &context.context_id {
        vars.insert("contextId".to_string(), id.clone());
    }
    vars.insert("query".to_string(), query.to_string());
    vars.insert("title".to_string(), title.to_string());
    vars
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("Invalid regex"))
}

/// Replace `{{name}}` placeholders; unknown names are left untouched.
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// `{prompt, metadata: {paletteId, command, timestamp, contextId}, ...context}`
pub fn build_request_body(
    prompt: &str,
    palette_id: &str,
    command_title: &str,
    context: &RequestContext,
) -> Value {
    let mut body = Map::new();
    for (key, value) in &context.fields {
        body.insert(key.clone(), value.clone());
    }
    body.insert("prompt".to_string(), Value::String(prompt.to_string()));
    body.insert(
        "metadata".to_string(),
        json!({
            "paletteId": palette_id,
            "command": command_title,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "contextId": context.context_id,
        }),
    );
    Value::Object(body)
}

/// Text of a response that wasn't consumed as a stream.
///
/// Prefers a `response`, `text` or `result` string field, then a bare JSON
/// string, then the raw body. Returns `None` when nothing but whitespace
/// remains.
pub fn buffered_text(raw: &str) -> Option<String> {
    let extracted = match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => Some(s),
        Ok(Value::Object(obj)) => ["response", "text", "result"].iter().find_map(|field| {
            obj.get(*field)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        }),
        _ => None,
    };
    let text = extracted.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| raw.to_string());
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
