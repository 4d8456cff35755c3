use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    constants::{DEFAULT_PAGE_SIZE, MAX_MESSAGE_LENGTH, MAX_PAGE_SIZE},
    modules::{
        conversation::service::ConversationService,
        message::{
            model::{
                Attachment, EditHistoryEntry, EditOutcome, InsertMessage, MessageQuery,
                MessageResponse,
            },
            repository::MessageRepository,
            schema::MessageEntity,
        },
    },
};

/// Trims the body and enforces the length limit. Whitespace-only bodies come
/// back as `None`.
pub fn normalize_content(content: Option<&str>) -> Result<Option<String>, error::SystemError> {
    let Some(trimmed) = content.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(error::SystemError::validation(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    Ok(Some(trimmed.to_string()))
}

#[derive(Clone)]
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository + Send + Sync>,
    conversation_service: ConversationService,
}

impl MessageService {
    pub fn with_dependencies(
        message_repo: Arc<dyn MessageRepository + Send + Sync>,
        conversation_service: ConversationService,
    ) -> Self {
        MessageService { message_repo, conversation_service }
    }

    /// Returns one page in ascending order. Everything the requester received
    /// in this conversation is marked read first, so the page already reflects
    /// the new read state.
    pub async fn list_page(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
        before: Option<chrono::DateTime<chrono::Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<MessageResponse>, error::SystemError> {
        self.conversation_service.require_participant(conversation_id, requester_id).await?;

        let marked =
            self.message_repo.mark_conversation_read(&conversation_id, &requester_id).await?;
        if marked > 0 {
            tracing::debug!(%conversation_id, reader = %requester_id, marked, "messages marked read");
        }

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let mut rows =
            self.message_repo.find_page(&MessageQuery { conversation_id, before, limit }).await?;
        rows.reverse();

        Ok(rows.into_iter().map(MessageResponse::from).collect())
    }

    /// Appends a text and/or attachment message. Retrying after an unknown
    /// outcome can create a duplicate.
    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: Option<&str>,
        attachment: Option<Attachment>,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = normalize_content(content)?;
        if content.is_none() && attachment.is_none() {
            return Err(error::SystemError::validation("Message content or attachment is required"));
        }

        self.conversation_service.require_participant(conversation_id, sender_id).await?;

        let row = self
            .message_repo
            .append(&InsertMessage { conversation_id, sender_id, content, attachment })
            .await?;

        tracing::info!(
            message_id = %row.message.id,
            %conversation_id,
            sender = %sender_id,
            attachment = ?row.message.attachment_type,
            "message appended"
        );

        Ok(MessageResponse::from(row))
    }

    pub async fn edit(
        &self,
        message_id: Uuid,
        requester_id: Uuid,
        new_content: &str,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = normalize_content(Some(new_content))?
            .ok_or_else(|| error::SystemError::validation("Message content cannot be empty"))?;

        self.require_sender(message_id, requester_id).await?;

        match self.message_repo.apply_edit(&message_id, &content).await? {
            EditOutcome::Edited => {
                tracing::info!(%message_id, editor = %requester_id, "message edited");
            }
            EditOutcome::Unchanged => {}
            EditOutcome::Deleted => {
                return Err(error::SystemError::invalid_operation(
                    "Cannot edit a deleted message",
                ));
            }
            EditOutcome::AttachmentOnly => {
                return Err(error::SystemError::invalid_operation(
                    "Attachment-only messages cannot be edited",
                ));
            }
            EditOutcome::Missing => return Err(error::SystemError::not_found("Message not found")),
        }

        let row = self
            .message_repo
            .find_row_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        Ok(MessageResponse::from(row))
    }

    /// Deleting an already deleted message succeeds without changes.
    pub async fn delete(&self, message_id: Uuid, requester_id: Uuid) -> Result<(), error::SystemError> {
        self.require_sender(message_id, requester_id).await?;

        if self.message_repo.soft_delete(&message_id).await? {
            tracing::info!(%message_id, sender = %requester_id, "message deleted");
        }

        Ok(())
    }

    /// Either participant may read the history, including after deletion.
    pub async fn edit_history(
        &self,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Vec<EditHistoryEntry>, error::SystemError> {
        self.require_visible(message_id, requester_id).await?;

        let edits = self.message_repo.find_edit_history(&message_id).await?;

        Ok(edits.into_iter().map(EditHistoryEntry::from).collect())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, error::SystemError> {
        self.message_repo.count_unread_for_user(&user_id).await
    }

    /// Outsiders see `NotFound`, never the message's existence.
    async fn require_visible(
        &self,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> Result<MessageEntity, error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        self.conversation_service
            .require_participant(message.conversation_id, requester_id)
            .await
            .map_err(|e| match e {
                error::SystemError::NotFound(_) => error::SystemError::not_found("Message not found"),
                other => other,
            })?;

        Ok(message)
    }

    async fn require_sender(
        &self,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> Result<MessageEntity, error::SystemError> {
        let message = self.require_visible(message_id, requester_id).await?;

        if message.sender_id != requester_id {
            return Err(error::SystemError::forbidden("You can only modify your own messages"));
        }

        Ok(message)
    }
}
