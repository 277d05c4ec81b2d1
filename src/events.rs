//! Agent event stream types.
//!
//! The upstream agent emits a flat sequence of tagged events per turn.
//! This module defines the wire schema plus the parsed tool-call shape
//! the renderer correlates against results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminant tag of an agent event.
///
/// Tags the schema does not know yet deserialize as `Unknown` so a newer
/// agent never crashes an older renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    User,
    Intent,
    Think,
    Respond,
    Call,
    Execute,
    Result,
    End,
    Error,
    Interrupt,
    Metric,
    #[serde(other)]
    Unknown,
}

/// One item of the agent's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Free-form text. Token deltas for `think`/`respond`, the raw call
    /// JSON for `call`, the message for `error`/`interrupt`.
    #[serde(default)]
    pub content: String,

    /// Structured side-channel data (result outcomes, diffs, metrics).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,

    #[serde(default = "Utc::now", rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_payload(
        kind: EventKind,
        content: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            payload: Some(payload),
            timestamp: Utc::now(),
        }
    }

    /// Outcome text of a `result`: an error message in the payload wins,
    /// then an explicit `outcome` field, then the event content.
    pub fn outcome_text(&self) -> &str {
        let from_payload = self.payload.as_ref().and_then(|p| {
            p.get("error")
                .and_then(Value::as_str)
                .or_else(|| p.get("outcome").and_then(Value::as_str))
        });
        from_payload.unwrap_or(&self.content)
    }

    /// True when a `result` payload is flagged as an error, either with
    /// a boolean flag or an error-message string.
    pub fn is_error_outcome(&self) -> bool {
        match self.payload.as_ref().and_then(|p| p.get("error")) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(_)) => true,
            _ => false,
        }
    }

    /// Unified diff text carried by an edit `result` payload.
    pub fn diff_text(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("diff"))
            .and_then(Value::as_str)
    }
}

/// A parsed tool invocation from a `call` event's content.
///
/// The argument map preserves the order the agent emitted (serde_json
/// `preserve_order`), which keeps correlation keys stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Parses the content of a `call` event.
    ///
    /// # Errors
    /// Returns an error when the content is not a well-formed call object.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let call: ToolCall = serde_json::from_str(content)?;
        Ok(call)
    }

    /// Derived identity used to match a result back to this call.
    ///
    /// Unique within one open turn as long as the agent does not issue
    /// the same call with identical arguments concurrently; the renderer
    /// de-duplicates that case with a suffix.
    pub fn correlation_key(&self) -> String {
        let args = serde_json::to_string(&self.args).unwrap_or_else(|_| "{}".to_string());
        format!("{}({args})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_tags_round_trip() {
        for (tag, kind) in [
            ("user", EventKind::User),
            ("think", EventKind::Think),
            ("respond", EventKind::Respond),
            ("call", EventKind::Call),
            ("execute", EventKind::Execute),
            ("result", EventKind::Result),
            ("end", EventKind::End),
            ("error", EventKind::Error),
            ("interrupt", EventKind::Interrupt),
            ("metric", EventKind::Metric),
        ] {
            let json = format!(r#"{{"type":"{tag}","content":"x"}}"#);
            let event: AgentEvent = serde_json::from_str(&json).expect("valid event");
            assert_eq!(event.kind, kind);
            assert_eq!(event.content, "x");
        }
    }

    #[test]
    fn test_unknown_tag_degrades_gracefully() {
        let event: AgentEvent =
            serde_json::from_str(r#"{"type":"telemetry_v2","content":""}"#).expect("valid event");
        assert_eq!(event.kind, EventKind::Unknown);
    }

    #[test]
    fn test_missing_content_defaults_empty() {
        let event: AgentEvent = serde_json::from_str(r#"{"type":"end"}"#).expect("valid event");
        assert!(event.content.is_empty());
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_tool_call_parse_and_key() {
        let call = ToolCall::parse(r#"{"name":"ls","args":{"path":"."}}"#).expect("valid call");
        assert_eq!(call.name, "ls");
        assert_eq!(call.correlation_key(), r#"ls({"path":"."})"#);
    }

    #[test]
    fn test_tool_call_parse_rejects_garbage() {
        assert!(ToolCall::parse("not json").is_err());
        assert!(ToolCall::parse(r#"{"args":{}}"#).is_err());
    }

    #[test]
    fn test_result_payload_helpers() {
        let mut payload = Map::new();
        payload.insert("outcome".to_string(), json!("12 items"));
        payload.insert("error".to_string(), json!(false));
        let event = AgentEvent::with_payload(EventKind::Result, "", payload);
        assert_eq!(event.outcome_text(), "12 items");
        assert!(!event.is_error_outcome());
        assert!(event.diff_text().is_none());
    }

    #[test]
    fn test_error_payload_string_wins() {
        let mut payload = Map::new();
        payload.insert("error".to_string(), json!("no such file"));
        let event = AgentEvent::with_payload(EventKind::Result, "ignored", payload);
        assert!(event.is_error_outcome());
        assert_eq!(event.outcome_text(), "no such file");
    }

    #[test]
    fn test_outcome_falls_back_to_content() {
        let event = AgentEvent::new(EventKind::Result, "12 items");
        assert_eq!(event.outcome_text(), "12 items");
        assert!(!event.is_error_outcome());
    }
}
