use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Mentor record for a directory user. The first entry of `assigned_schools`
/// is the owning school for assessments the mentor creates.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mentor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assigned_schools: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
