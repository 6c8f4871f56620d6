//! JSON message types for MCP requests and responses.
//!
//! Machine documents and result documents keep the boundary shape of the
//! simulation service: PascalCase keys, `{Accepted, Path, RemainingInput}`
//! results. The envelope around them is protocol-level and uses snake_case.

use crate::error::ErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    // Session management
    Ping,
    Info,
    Bye,

    // Schema
    GetSchema,

    // Synchronous simulation
    Do,

    // Interactive simulation
    Start,
    Step,
    Stat,
    Result,
    End,
}

/// Request message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Message type, always "request".
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Unique request ID for correlation.
    pub id: String,

    /// Operation to perform.
    pub op: Operation,

    /// Operation-specific parameters.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<String>, op: Operation) -> Self {
        Self {
            msg_type: "request".to_string(),
            id: id.into(),
            op,
            params: Value::Object(Default::default()),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    /// Stable error code.
    pub code: ErrorCode,

    /// Human-readable error message.
    pub message: String,

    /// Whether this error is retryable.
    pub retryable: bool,
}

impl ResponseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            retryable: code.is_retryable(),
            code,
            message: message.into(),
        }
    }
}

/// Response metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Server timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_time: Option<DateTime<Utc>>,
}

impl ResponseMeta {
    fn is_empty(&self) -> bool {
        self.server_time.is_none()
    }
}

/// Response message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Message type, always "response".
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Request ID this response correlates to.
    pub id: String,

    /// Response status.
    pub status: ResponseStatus,

    /// Result payload (for successful responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error details (for error responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,

    /// Response metadata.
    #[serde(default, skip_serializing_if = "ResponseMeta::is_empty")]
    pub meta: ResponseMeta,
}

impl Response {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            msg_type: "response".to_string(),
            id: id.into(),
            status: ResponseStatus::Ok,
            result: Some(result),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    pub fn error(id: impl Into<String>, error: ResponseError) -> Self {
        Self {
            msg_type: "response".to_string(),
            id: id.into(),
            status: ResponseStatus::Error,
            result: None,
            error: Some(error),
            meta: ResponseMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

// ============================================================================
// Operation-specific parameter types
// ============================================================================

/// Parameters for DO: run a machine over a tape from start to finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoParams {
    /// The input tape.
    pub tape: String,

    /// The machine document, in the boundary shape.
    pub machine: Value,
}

/// Parameters for START: open an interactive simulation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartParams {
    /// The input tape.
    pub tape: String,

    /// The machine document, in the boundary shape.
    pub machine: Value,
}

/// Result for START responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResult {
    /// Session id for subsequent STEP/STAT/RESULT/END calls.
    pub id: u64,
}

/// Parameters for the session-keyed operations STEP, STAT, RESULT, END.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    pub id: u64,
}

/// Result for STEP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the simulation can still advance.
    pub done: bool,

    /// Progress snapshot after the step, in the boundary shape.
    pub report: Value,
}

/// Result for END responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndResult {
    pub id: u64,
    pub ended: bool,
}

/// Result for INFO responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResult {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: u16,
    pub max_message_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = Request::new("1", Operation::Ping);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""op":"PING""#));
        assert!(json.contains(r#""type":"request""#));
    }

    #[test]
    fn test_operation_wire_names() {
        for (op, wire) in [
            (Operation::GetSchema, "\"GET_SCHEMA\""),
            (Operation::Do, "\"DO\""),
            (Operation::Start, "\"START\""),
            (Operation::Step, "\"STEP\""),
            (Operation::Stat, "\"STAT\""),
            (Operation::Result, "\"RESULT\""),
            (Operation::End, "\"END\""),
        ] {
            assert_eq!(serde_json::to_string(&op).unwrap(), wire);
        }
    }

    #[test]
    fn test_request_params_may_be_omitted() {
        let req: Request = serde_json::from_str(
            r#"{"type":"request","id":"9","op":"PING"}"#,
        )
        .unwrap();
        assert!(req.params.is_null());
    }

    #[test]
    fn test_response_ok_serialization() {
        let resp = Response::ok("1", json!({"pong": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""status":"ok""#));
        assert!(json.contains(r#""pong":true"#));
        // Empty meta stays off the wire.
        assert!(!json.contains("meta"));
    }

    #[test]
    fn test_response_error_serialization() {
        let err = ResponseError::new(ErrorCode::SessionNotFound, "session not found: 3");
        let resp = Response::error("1", err);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""code":"SESSION_NOT_FOUND""#));
        assert!(json.contains(r#""retryable":false"#));
        assert!(resp.is_error());
    }

    #[test]
    fn test_do_params_round_trip() {
        let params = DoParams {
            tape: "aaba".to_string(),
            machine: json!({"Type": "DFA"}),
        };
        let value = serde_json::to_value(&params).unwrap();
        let back: DoParams = serde_json::from_value(value).unwrap();
        assert_eq!(back.tape, "aaba");
        assert_eq!(back.machine["Type"], "DFA");
    }
}
