use sqlx::prelude::FromRow;
use uuid::Uuid;

/// A two-party conversation. `participant_a < participant_b` always holds.
#[allow(unused)]
#[derive(Debug, Clone, FromRow)]
pub struct ConversationEntity {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
