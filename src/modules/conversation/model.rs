use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::error,
    constants::TOMBSTONE_TEXT,
    modules::{message::schema::AttachmentKind, user::model::UserProfile},
};

/// Unordered pair of users stored in sorted order, so that a pair maps to
/// exactly one conversation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    first: Uuid,
    second: Uuid,
}

impl ParticipantPair {
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, error::SystemError> {
        if a == b {
            return Err(error::SystemError::invalid_operation("Cannot message yourself"));
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    pub fn first(&self) -> Uuid {
        self.first
    }

    pub fn second(&self) -> Uuid {
        self.second
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ConversationSummaryRow {
    pub id: Uuid,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,

    pub other_user_id: Uuid,
    pub other_username: String,
    pub other_display_name: Option<String>,
    pub other_avatar_url: Option<String>,
    pub other_tags: Vec<String>,

    pub last_content: Option<String>,
    pub last_attachment_type: Option<AttachmentKind>,
    pub last_is_deleted: Option<bool>,

    pub unread_count: i64,
}

impl ConversationSummaryRow {
    /// One-line text shown under the conversation in the inbox.
    pub fn preview(&self) -> String {
        match (self.last_is_deleted, &self.last_content, self.last_attachment_type) {
            // no messages yet
            (None, _, _) => String::new(),
            (Some(true), _, _) => TOMBSTONE_TEXT.to_string(),
            (Some(false), Some(content), _) => content.clone(),
            (Some(false), None, Some(kind)) => kind.preview_label().to_string(),
            (Some(false), None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user: UserProfile,
    pub last_message: String,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub unread_count: i64,
}

impl From<ConversationSummaryRow> for ConversationSummary {
    fn from(row: ConversationSummaryRow) -> Self {
        let last_message = row.preview();
        ConversationSummary {
            id: row.id,
            other_user: UserProfile {
                id: row.other_user_id,
                username: row.other_username,
                display_name: row.other_display_name,
                avatar_url: row.other_avatar_url,
                tags: row.other_tags,
            },
            last_message,
            last_activity_at: row.last_activity_at,
            created_at: row.created_at,
            unread_count: row.unread_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationResponse {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}
