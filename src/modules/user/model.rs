use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::user::schema::UserEntity;

/// Public identity of a user as shown next to conversations and messages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Self-declared activity tags; the client uses them to decide whether a
    /// safety disclaimer is shown above a conversation.
    pub tags: Vec<String>,
}

impl From<UserEntity> for UserProfile {
    fn from(entity: UserEntity) -> Self {
        UserProfile {
            id: entity.id,
            username: entity.username,
            display_name: entity.display_name,
            avatar_url: entity.avatar_url,
            tags: entity.tags,
        }
    }
}
