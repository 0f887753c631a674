//! Uniform response document for outward-facing events

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome classes carried by a [`ResponseEnvelope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Pending,
    Failure,
}

impl Status {
    /// Integer value serialized into the `code` field
    pub fn code(&self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Pending => 1,
            Status::Failure => 2,
        }
    }

    /// Lowercase word form serialized into the `status` field
    pub fn word(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Pending => "pending",
            Status::Failure => "failure",
        }
    }
}

/// Fixed-shape reply document: `{ status, code, message, container }`.
///
/// Built once per outward event and never reused. The C-FIND success path
/// serializes the result array directly instead; everything else (errors,
/// C-ECHO confirmation) goes through this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: String,
    pub code: i32,
    pub message: String,
    pub container: Option<Value>,
}

impl ResponseEnvelope {
    /// Build an envelope for the given status
    pub fn new(status: Status, message: impl Into<String>, container: Option<Value>) -> Self {
        Self {
            status: status.word().to_string(),
            code: status.code(),
            message: message.into(),
            container,
        }
    }

    /// Build a success envelope without a payload
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message, None)
    }

    /// Build a failure envelope without a payload
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(Status::Failure, message, None)
    }

    /// Serialize to a JSON string. The shape is infallible to serialize.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // cannot happen for this struct, but never panic on the error path
            format!("{{\"status\":\"failure\",\"code\":2,\"message\":{:?},\"container\":null}}", self.message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_shape() {
        let env = ResponseEnvelope::failure("Find-scu request failed");
        let v: Value = serde_json::from_str(&env.to_json()).unwrap();
        assert_eq!(v["status"], "failure");
        assert_eq!(v["code"], 2);
        assert_eq!(v["message"], "Find-scu request failed");
        assert_eq!(v["container"], Value::Null);
    }

    #[test]
    fn test_success_with_container() {
        let env = ResponseEnvelope::new(Status::Success, "ok", Some(json!({"echoed": true})));
        let v: Value = serde_json::from_str(&env.to_json()).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["code"], 0);
        assert_eq!(v["container"]["echoed"], true);
    }

    #[test]
    fn test_status_words_and_codes() {
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Pending.code(), 1);
        assert_eq!(Status::Failure.code(), 2);
        assert_eq!(Status::Pending.word(), "pending");
    }
}
