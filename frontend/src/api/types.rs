use leptos::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored leave request as returned by `GET /requests/{id}`.
///
/// `leave_type` stays a raw string: the dialog must be able to detect a record
/// whose type it does not know instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub id: String,
    pub leave_type: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl LeaveRecord {
    /// The record as one JSON object, the shape variant decoders read from.
    pub fn to_payload(&self) -> Value {
        let mut object = self.attributes.clone();
        object.insert("id".into(), Value::String(self.id.clone()));
        object.insert("leave_type".into(), Value::String(self.leave_type.clone()));
        if let Some(status) = &self.status {
            object.insert("status".into(), Value::String(status.clone()));
        }
        Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedRecord {
    pub id: String,
    pub leave_type: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "pending".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for String {
    fn from(error: ApiError) -> Self {
        error.error
    }
}

impl IntoView for ApiError {
    fn into_view(self) -> View {
        self.error.into_view()
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "VALIDATION_ERROR".to_string(),
            details: None,
        }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "UNKNOWN".to_string(),
            details: None,
        }
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "REQUEST_FAILED".to_string(),
            details: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "NOT_FOUND".to_string(),
            details: None,
        }
    }

    /// Fallback used when the server answered with an error status but no
    /// readable error body.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::not_found("申請が見つかりません。"),
            400 | 422 => Self::validation("申請内容がサーバーで受け付けられませんでした。"),
            _ => Self::unknown(format!("サーバーエラーが発生しました (HTTP {})", status)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == "NOT_FOUND"
    }

    pub fn is_validation(&self) -> bool {
        self.code == "VALIDATION_ERROR"
    }
}
