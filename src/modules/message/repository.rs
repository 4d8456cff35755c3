use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::{EditOutcome, InsertMessage, MessageQuery},
        schema::{MessageEditEntity, MessageEntity, MessageRow},
    },
};

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Inserts the message and bumps the conversation's `last_activity_at` as
    /// one unit. `created_at` is strictly increasing within a conversation.
    async fn append(&self, message: &InsertMessage) -> Result<MessageRow, error::SystemError>;

    /// Newest first, at most `query.limit` rows.
    async fn find_page(&self, query: &MessageQuery) -> Result<Vec<MessageRow>, error::SystemError>;

    /// Marks every message in the conversation not sent by `reader_id` as read
    /// and returns how many changed.
    async fn mark_conversation_read(
        &self,
        conversation_id: &Uuid,
        reader_id: &Uuid,
    ) -> Result<u64, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError>;

    async fn find_row_by_id(&self, id: &Uuid) -> Result<Option<MessageRow>, error::SystemError>;

    /// Replaces the content and records the replaced text in the edit log,
    /// unless the message is gone, deleted, attachment-only or unchanged.
    async fn apply_edit(
        &self,
        id: &Uuid,
        new_content: &str,
    ) -> Result<EditOutcome, error::SystemError>;

    /// `false` when the message was already deleted.
    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError>;

    /// Oldest edit first.
    async fn find_edit_history(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<MessageEditEntity>, error::SystemError>;

    async fn count_unread_for_user(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;
}
