use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::{ConversationSummaryRow, ParticipantPair},
        repository::ConversationRepository,
        schema::ConversationEntity,
    },
};

#[derive(Clone)]
pub struct ConversationPgRepository {
    pool: sqlx::PgPool,
}

impl ConversationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationPgRepository {
    async fn find_or_create(
        &self,
        pair: &ParticipantPair,
    ) -> Result<ConversationEntity, error::SystemError> {
        // ON CONFLICT DO NOTHING returns no row when another request won the
        // race, in which case the winner's row is read back.
        let inserted = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, participant_a, participant_b)
            VALUES ($1, $2, $3)
            ON CONFLICT (participant_a, participant_b) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(pair.first())
        .bind(pair.second())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(conversation) = inserted {
            return Ok(conversation);
        }

        let existing = sqlx::query_as::<_, ConversationEntity>(
            "SELECT * FROM conversations WHERE participant_a = $1 AND participant_b = $2",
        )
        .bind(pair.first())
        .bind(pair.second())
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    async fn find_for_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT * FROM conversations
            WHERE id = $1 AND (participant_a = $2 OR participant_b = $2)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find_summaries_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationSummaryRow>, error::SystemError> {
        let rows = sqlx::query_as::<_, ConversationSummaryRow>(
            r#"
            SELECT
                c.id,
                c.last_activity_at,
                c.created_at,

                u.id AS other_user_id,
                u.username AS other_username,
                u.display_name AS other_display_name,
                u.avatar_url AS other_avatar_url,
                u.tags AS other_tags,

                m.content AS last_content,
                m.attachment_type AS last_attachment_type,
                m.is_deleted AS last_is_deleted,

                (
                    SELECT COUNT(*)
                    FROM messages um
                    WHERE um.conversation_id = c.id
                        AND um.sender_id <> $1
                        AND um.is_read = FALSE
                ) AS unread_count
            FROM conversations c
            JOIN users u
                ON u.id = CASE WHEN c.participant_a = $1 THEN c.participant_b ELSE c.participant_a END
            LEFT JOIN LATERAL (
                SELECT content, attachment_type, is_deleted
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) m ON true
            WHERE c.participant_a = $1 OR c.participant_b = $1
            ORDER BY c.last_activity_at DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
