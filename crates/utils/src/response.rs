use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Envelope returned by every JSON endpoint that is not a list or stats call.
///
/// Failures carry a human readable `error` and, for typed errors, a short
/// machine readable `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn error_with_kind(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            kind: Some(kind.into()),
        }
    }
}

/// Envelope of the dashboard statistics calls: `{success, stats}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct StatsResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> StatsResponse<T> {
    pub fn ok(stats: T) -> Self {
        Self {
            success: true,
            stats: Some(stats),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            stats: None,
            error: Some(message.into()),
        }
    }
}
