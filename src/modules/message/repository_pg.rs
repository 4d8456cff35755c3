use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::{EditOutcome, InsertMessage, MessageQuery},
        repository::MessageRepository,
        schema::{MessageEditEntity, MessageEntity, MessageRow},
    },
};

const MESSAGE_ROW_SELECT: &str = r#"
    SELECT
        m.*,
        u.username AS sender_username,
        u.display_name AS sender_display_name,
        u.avatar_url AS sender_avatar_url
    FROM messages m
    JOIN users u ON u.id = m.sender_id
"#;

pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn append(&self, message: &InsertMessage) -> Result<MessageRow, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // Locks the conversation row, so appends to one conversation are
        // serialised and each gets a later timestamp than the previous one.
        let created_at = sqlx::query_scalar::<_, chrono::DateTime<chrono::Utc>>(
            r#"
            UPDATE conversations
            SET last_activity_at = GREATEST(clock_timestamp(), last_activity_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING last_activity_at
            "#,
        )
        .bind(message.conversation_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        let attachment = message.attachment.as_ref();
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, content,
                attachment_url, attachment_type, attachment_name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(attachment.map(|a| a.url.as_str()))
        .bind(attachment.map(|a| a.kind))
        .bind(attachment.map(|a| a.name.as_str()))
        .bind(created_at)
        .fetch_one(tx.as_mut())
        .await?;

        let sql = format!("{MESSAGE_ROW_SELECT} WHERE m.id = $1");
        let row = sqlx::query_as::<_, MessageRow>(&sql).bind(id).fetch_one(tx.as_mut()).await?;

        tx.commit().await?;

        Ok(row)
    }

    async fn find_page(&self, query: &MessageQuery) -> Result<Vec<MessageRow>, error::SystemError> {
        // index on (conversation_id, created_at DESC, id DESC)

        let rows = if let Some(before) = query.before {
            let sql = format!(
                "{MESSAGE_ROW_SELECT} WHERE m.conversation_id = $1 AND m.created_at < $2 \
                 ORDER BY m.created_at DESC, m.id DESC LIMIT $3"
            );
            sqlx::query_as::<_, MessageRow>(&sql)
                .bind(query.conversation_id)
                .bind(before)
                .bind(query.limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "{MESSAGE_ROW_SELECT} WHERE m.conversation_id = $1 \
                 ORDER BY m.created_at DESC, m.id DESC LIMIT $2"
            );
            sqlx::query_as::<_, MessageRow>(&sql)
                .bind(query.conversation_id)
                .bind(query.limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(rows)
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: &Uuid,
        reader_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn find_row_by_id(&self, id: &Uuid) -> Result<Option<MessageRow>, error::SystemError> {
        let sql = format!("{MESSAGE_ROW_SELECT} WHERE m.id = $1");
        let row =
            sqlx::query_as::<_, MessageRow>(&sql).bind(id).fetch_optional(&self.pool).await?;

        Ok(row)
    }

    async fn apply_edit(
        &self,
        id: &Uuid,
        new_content: &str,
    ) -> Result<EditOutcome, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let current =
            sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(tx.as_mut())
                .await?;

        let Some(current) = current else {
            return Ok(EditOutcome::Missing);
        };
        if current.is_deleted {
            return Ok(EditOutcome::Deleted);
        }
        let Some(previous) = current.content else {
            return Ok(EditOutcome::AttachmentOnly);
        };
        if previous == new_content {
            return Ok(EditOutcome::Unchanged);
        }

        let edited_at = sqlx::query_scalar::<_, chrono::DateTime<chrono::Utc>>(
            "UPDATE messages SET content = $2, edited_at = clock_timestamp() WHERE id = $1 RETURNING edited_at",
        )
        .bind(id)
        .bind(new_content)
        .fetch_one(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO message_edits (id, message_id, previous_content, edited_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(id)
        .bind(&previous)
        .bind(edited_at)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(EditOutcome::Edited)
    }

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let result =
            sqlx::query("UPDATE messages SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_edit_history(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<MessageEditEntity>, error::SystemError> {
        let edits = sqlx::query_as::<_, MessageEditEntity>(
            "SELECT * FROM message_edits WHERE message_id = $1 ORDER BY edited_at ASC, id ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(edits)
    }

    async fn count_unread_for_user(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE (c.participant_a = $1 OR c.participant_b = $1)
                AND m.sender_id <> $1
                AND m.is_read = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
