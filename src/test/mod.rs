//! Shared fixtures: an in-memory store standing in for PostgreSQL behind the
//! repository traits, user fixtures and token helpers.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Mutex, Once},
};
use uuid::Uuid;

use crate::{
    ENV,
    api::error,
    modules::{
        conversation::{
            model::{ConversationSummaryRow, ParticipantPair},
            repository::ConversationRepository,
            schema::ConversationEntity,
        },
        message::{
            model::{EditOutcome, InsertMessage, MessageQuery},
            repository::MessageRepository,
            schema::{MessageEditEntity, MessageEntity, MessageRow},
        },
        user::{repository::UserRepository, schema::UserEntity},
    },
    utils::Claims,
};


static INIT_ENV: Once = Once::new();

/// Sets the variables `ENV` requires. Must run before `ENV` is first read.
pub fn init_env() {
    INIT_ENV.call_once(|| {
        std::env::set_var("SECRET_KEY", "test-secret-key");
        std::env::set_var("DATABASE_URL", "postgres://localhost/gallery_test");
    });
}

pub fn bearer(user_id: Uuid) -> String {
    init_env();
    let token = Claims::new(&user_id, 3600)
        .encode(ENV.jwt_secret.as_bytes())
        .expect("token encoding");
    format!("Bearer {}", token)
}

fn has_participant(conversation: &ConversationEntity, user_id: &Uuid) -> bool {
    conversation.participant_a == *user_id || conversation.participant_b == *user_id
}

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, UserEntity>>,
    conversations: Mutex<Vec<ConversationEntity>>,
    messages: Mutex<Vec<MessageEntity>>,
    edits: Mutex<Vec<MessageEditEntity>>,
}

impl MemoryStore {
    pub fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.users.lock().unwrap().insert(
            id,
            UserEntity {
                id,
                username: username.to_string(),
                display_name: None,
                avatar_url: None,
                tags: vec![],
                is_active: true,
                created_at: chrono::Utc::now(),
            },
        );
        id
    }

    pub fn deactivate_user(&self, id: Uuid) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = false;
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.lock().unwrap().len()
    }

    /// Pins `last_activity_at`, so listing order can be checked on ties.
    pub fn set_last_activity(&self, conversation_id: Uuid, at: chrono::DateTime<chrono::Utc>) {
        if let Some(c) =
            self.conversations.lock().unwrap().iter_mut().find(|c| c.id == conversation_id)
        {
            c.last_activity_at = at;
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn hydrate(&self, message: MessageEntity) -> Result<MessageRow, error::SystemError> {
        let users = self.users.lock().unwrap();
        let sender = users
            .get(&message.sender_id)
            .ok_or_else(|| error::SystemError::not_found("Sender not found"))?;

        Ok(MessageRow {
            sender_username: sender.username.clone(),
            sender_display_name: sender.display_name.clone(),
            sender_avatar_url: sender.avatar_url.clone(),
            message,
        })
    }

    fn participant_conversations(&self, user_id: &Uuid) -> Vec<ConversationEntity> {
        self.conversations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| has_participant(c, user_id))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn find_active_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.users.lock().unwrap().get(id).filter(|u| u.is_active).cloned())
    }
}

#[async_trait::async_trait]
impl ConversationRepository for MemoryStore {
    async fn find_or_create(
        &self,
        pair: &ParticipantPair,
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut conversations = self.conversations.lock().unwrap();

        if let Some(existing) = conversations
            .iter()
            .find(|c| c.participant_a == pair.first() && c.participant_b == pair.second())
        {
            return Ok(existing.clone());
        }

        let now = chrono::Utc::now();
        let conversation = ConversationEntity {
            id: Uuid::now_v7(),
            participant_a: pair.first(),
            participant_b: pair.second(),
            last_activity_at: now,
            created_at: now,
        };
        conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn find_for_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == *conversation_id && has_participant(c, user_id))
            .cloned())
    }

    async fn find_summaries_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationSummaryRow>, error::SystemError> {
        let conversations = self.participant_conversations(user_id);
        let users = self.users.lock().unwrap().clone();
        let messages = self.messages.lock().unwrap().clone();

        let mut rows: Vec<ConversationSummaryRow> = conversations
            .into_iter()
            .filter_map(|c| {
                let other_id =
                    if c.participant_a == *user_id { c.participant_b } else { c.participant_a };
                let other = users.get(&other_id)?;
                let in_conversation = messages.iter().filter(|m| m.conversation_id == c.id);
                let last = in_conversation.clone().max_by_key(|m| (m.created_at, m.id));
                let unread_count = in_conversation
                    .filter(|m| m.sender_id != *user_id && !m.is_read)
                    .count() as i64;

                Some(ConversationSummaryRow {
                    id: c.id,
                    last_activity_at: c.last_activity_at,
                    created_at: c.created_at,
                    other_user_id: other.id,
                    other_username: other.username.clone(),
                    other_display_name: other.display_name.clone(),
                    other_avatar_url: other.avatar_url.clone(),
                    other_tags: other.tags.clone(),
                    last_content: last.and_then(|m| m.content.clone()),
                    last_attachment_type: last.and_then(|m| m.attachment_type),
                    last_is_deleted: last.map(|m| m.is_deleted),
                    unread_count,
                })
            })
            .collect();

        rows.sort_by(|a, b| (b.last_activity_at, b.id).cmp(&(a.last_activity_at, a.id)));
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl MessageRepository for MemoryStore {
    async fn append(&self, message: &InsertMessage) -> Result<MessageRow, error::SystemError> {
        let entity = {
            let mut conversations = self.conversations.lock().unwrap();
            let conversation = conversations
                .iter_mut()
                .find(|c| c.id == message.conversation_id)
                .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

            let created_at = chrono::Utc::now()
                .max(conversation.last_activity_at + chrono::Duration::microseconds(1));
            conversation.last_activity_at = created_at;

            let attachment = message.attachment.as_ref();
            let entity = MessageEntity {
                id: Uuid::now_v7(),
                conversation_id: message.conversation_id,
                sender_id: message.sender_id,
                content: message.content.clone(),
                attachment_url: attachment.map(|a| a.url.clone()),
                attachment_type: attachment.map(|a| a.kind),
                attachment_name: attachment.map(|a| a.name.clone()),
                is_read: false,
                edited_at: None,
                is_deleted: false,
                created_at,
            };
            self.messages.lock().unwrap().push(entity.clone());
            entity
        };

        self.hydrate(entity)
    }

    async fn find_page(&self, query: &MessageQuery) -> Result<Vec<MessageRow>, error::SystemError> {
        let mut page: Vec<MessageEntity> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == query.conversation_id)
            .filter(|m| query.before.map_or(true, |before| m.created_at < before))
            .cloned()
            .collect();

        page.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        page.truncate(query.limit.max(0) as usize);

        page.into_iter().map(|m| self.hydrate(m)).collect()
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: &Uuid,
        reader_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let mut marked = 0;
        for m in self.messages.lock().unwrap().iter_mut() {
            if m.conversation_id == *conversation_id && m.sender_id != *reader_id && !m.is_read {
                m.is_read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        Ok(self.messages.lock().unwrap().iter().find(|m| m.id == *id).cloned())
    }

    async fn find_row_by_id(&self, id: &Uuid) -> Result<Option<MessageRow>, error::SystemError> {
        let message = self.messages.lock().unwrap().iter().find(|m| m.id == *id).cloned();
        message.map(|m| self.hydrate(m)).transpose()
    }

    async fn apply_edit(
        &self,
        id: &Uuid,
        new_content: &str,
    ) -> Result<EditOutcome, error::SystemError> {
        let mut messages = self.messages.lock().unwrap();

        let Some(message) = messages.iter_mut().find(|m| m.id == *id) else {
            return Ok(EditOutcome::Missing);
        };
        if message.is_deleted {
            return Ok(EditOutcome::Deleted);
        }
        let Some(previous) = message.content.clone() else {
            return Ok(EditOutcome::AttachmentOnly);
        };
        if previous == new_content {
            return Ok(EditOutcome::Unchanged);
        }

        let edited_at = chrono::Utc::now();
        message.content = Some(new_content.to_string());
        message.edited_at = Some(edited_at);

        self.edits.lock().unwrap().push(MessageEditEntity {
            id: Uuid::now_v7(),
            message_id: *id,
            previous_content: previous,
            edited_at,
        });

        Ok(EditOutcome::Edited)
    }

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|m| m.id == *id && !m.is_deleted) {
            Some(message) => {
                message.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_edit_history(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<MessageEditEntity>, error::SystemError> {
        let mut edits: Vec<MessageEditEntity> = self
            .edits
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message_id == *message_id)
            .cloned()
            .collect();

        edits.sort_by(|a, b| (a.edited_at, a.id).cmp(&(b.edited_at, b.id)));
        Ok(edits)
    }

    async fn count_unread_for_user(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let conversations: Vec<Uuid> =
            self.participant_conversations(user_id).into_iter().map(|c| c.id).collect();

        let count = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| conversations.contains(&m.conversation_id))
            .filter(|m| m.sender_id != *user_id && !m.is_read)
            .count();

        Ok(count as i64)
    }
}
