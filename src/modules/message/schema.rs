use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "attachment_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
}

impl AttachmentKind {
    /// Maps a normalised MIME type onto the accepted kinds. Anything outside
    /// the allow-list is `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/png" | "image/gif" | "image/webp" => Some(Self::Image),
            "video/mp4" | "video/webm" | "video/quicktime" => Some(Self::Video),
            "audio/mpeg" | "audio/wav" | "audio/ogg" | "audio/webm" | "audio/mp4" => {
                Some(Self::Audio)
            }
            _ => None,
        }
    }

    pub fn preview_label(&self) -> &'static str {
        match self {
            Self::Image => "📷 Image",
            Self::Video => "🎬 Video",
            Self::Audio => "🎵 Audio",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<AttachmentKind>,
    pub attachment_name: Option<String>,
    pub is_read: bool,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A message joined with the sender's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    #[sqlx(flatten)]
    pub message: MessageEntity,
    pub sender_username: String,
    pub sender_display_name: Option<String>,
    pub sender_avatar_url: Option<String>,
}

#[allow(unused)]
#[derive(Debug, Clone, FromRow)]
pub struct MessageEditEntity {
    pub id: Uuid,
    pub message_id: Uuid,
    pub previous_content: String,
    pub edited_at: chrono::DateTime<chrono::Utc>,
}
