use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Feedback workflow status. Any status is reachable from any other;
/// there is deliberately no transition graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Active,
    InProgress,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tg: Option<String>,
    pub message: String,
    pub status: FeedbackStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackBody {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tel: Option<String>,
    #[serde(default)]
    pub tg: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeedbackStatusBody {
    pub status: FeedbackStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total: i64,
    pub active: i64,
    pub in_progress: i64,
    pub closed: i64,
}
