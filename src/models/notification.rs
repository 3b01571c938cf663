use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Recorded notification intent. Delivery is an external concern; this
/// service only persists the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub priority: String,
    pub target_audience: JsonValue,
    pub related_assessment_id: Option<Uuid>,
    pub sent_by: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAudience {
    pub grade: String,
    #[serde(default)]
    pub sections: Vec<String>,
    pub school_id: Uuid,
}
