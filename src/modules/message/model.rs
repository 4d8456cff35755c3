use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::message::schema::{AttachmentKind, MessageEditEntity, MessageRow};

/// A stored media file referenced by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    /// Client-supplied file name, kept for display only.
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub conversation_id: Uuid,
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: i64,
}

/// Result of applying an edit under the message row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    Unchanged,
    Deleted,
    AttachmentOnly,
    Missing,
}

/// Client view of a message. Deleted messages keep their metadata but never
/// expose content or attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub content: Option<String>,
    pub sender_id: Uuid,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_deleted: bool,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<AttachmentKind>,
    pub attachment_name: Option<String>,
    pub sender_username: String,
    pub sender_display_name: Option<String>,
    pub sender_avatar_url: Option<String>,
}

impl From<MessageRow> for MessageResponse {
    fn from(row: MessageRow) -> Self {
        let m = row.message;
        let (content, attachment_url, attachment_type, attachment_name) = if m.is_deleted {
            (None, None, None, None)
        } else {
            (m.content, m.attachment_url, m.attachment_type, m.attachment_name)
        };

        MessageResponse {
            id: m.id,
            content,
            sender_id: m.sender_id,
            is_read: m.is_read,
            created_at: m.created_at,
            edited_at: m.edited_at,
            is_deleted: m.is_deleted,
            attachment_url,
            attachment_type,
            attachment_name,
            sender_username: row.sender_username,
            sender_display_name: row.sender_display_name,
            sender_avatar_url: row.sender_avatar_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageEnvelope {
    pub message: MessageResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GetMessagesQuery {
    /// Only messages created strictly before this instant are returned.
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, message = "Message content cannot be empty"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryEntry {
    pub previous_content: String,
    pub edited_at: chrono::DateTime<chrono::Utc>,
}

impl From<MessageEditEntity> for EditHistoryEntry {
    fn from(entity: MessageEditEntity) -> Self {
        EditHistoryEntry { previous_content: entity.previous_content, edited_at: entity.edited_at }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditHistoryResponse {
    pub history: Vec<EditHistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}
