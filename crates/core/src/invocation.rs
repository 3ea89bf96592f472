use serde::{Deserialize, Deserializer, Serialize};

/// How the runtime answers an invocation.
///
/// | Mode    | Behaviour                                                      |
/// |---------|----------------------------------------------------------------|
/// | `sync`  | The response carries the finished summary result.              |
/// | `async` | The runtime acknowledges at once and summarizes in the background. |
///
/// Deserializes case-insensitively through [`InvocationMode::from_name`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    #[default]
    Sync,
    Async,
}

impl InvocationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }

    /// Parse a mode name (case-insensitive).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Some(Self::Sync),
            "async" | "asynchronous" => Some(Self::Async),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for InvocationMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name).ok_or_else(|| {
            serde::de::Error::unknown_variant(&name, &["sync", "synchronous", "async", "asynchronous"])
        })
    }
}

/// Payload the proxy sends to the runtime's `/invocations` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<InvocationMode>,
}

impl InvocationRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, mode: InvocationMode) -> Self {
        Self {
            bucket: Some(bucket.into()),
            key: Some(key.into()),
            mode: Some(mode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted for background processing.
    Accepted,
    /// Finished within the request.
    Completed,
}

/// Result of one invocation, returned by the runtime and read by the proxy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_key: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl InvocationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn completed(summary_key: String, session_id: String, message: impl Into<String>) -> Self {
        Self {
            success: true,
            summary_key: Some(summary_key),
            message: message.into(),
            session_id: Some(session_id),
            task_id: None,
            status: Some(TaskStatus::Completed),
        }
    }

    pub fn accepted(task_id: u64, summary_key: String, session_id: String) -> Self {
        Self {
            success: true,
            summary_key: Some(summary_key),
            message: "accepted for background processing".to_string(),
            session_id: Some(session_id),
            task_id: Some(task_id),
            status: Some(TaskStatus::Accepted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse_case_insensitively() {
        assert_eq!(InvocationMode::from_name("ASYNC"), Some(InvocationMode::Async));
        assert_eq!(InvocationMode::from_name(" sync "), Some(InvocationMode::Sync));
        assert_eq!(InvocationMode::from_name("later"), None);
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let req: InvocationRequest = serde_json::from_str(r#"{"key":"a/uploads/b.txt"}"#).unwrap();
        assert!(req.bucket.is_none());
        assert_eq!(req.key.as_deref(), Some("a/uploads/b.txt"));
        assert!(req.mode.is_none());
    }

    #[test]
    fn request_mode_deserializes_case_insensitively() {
        let req: InvocationRequest = serde_json::from_str(r#"{"mode":"ASYNC"}"#).unwrap();
        assert_eq!(req.mode, Some(InvocationMode::Async));
        let req: InvocationRequest = serde_json::from_str(r#"{"mode":"Synchronous"}"#).unwrap();
        assert_eq!(req.mode, Some(InvocationMode::Sync));
        assert!(serde_json::from_str::<InvocationRequest>(r#"{"mode":"later"}"#).is_err());
    }

    #[test]
    fn request_serializes_mode_lowercase() {
        let req = InvocationRequest::new("bkt", "a/uploads/b.txt", InvocationMode::Async);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["mode"], "async");
    }

    #[test]
    fn failure_omits_optional_fields() {
        let json = serde_json::to_value(InvocationResult::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "message": "nope"}));
    }

    #[test]
    fn result_reads_minimal_runtime_reply() {
        let result: InvocationResult =
            serde_json::from_str(r#"{"success": true, "summary_key": "a/summaries/b.txt.summary.txt"}"#)
                .unwrap();
        assert!(result.success);
        assert!(result.message.is_empty());
        assert!(result.status.is_none());
    }
}
