use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            model::{ConversationSummary, ParticipantPair},
            repository::ConversationRepository,
            schema::ConversationEntity,
        },
        user::service::UserService,
    },
};

#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
    user_service: UserService,
}

impl ConversationService {
    pub fn with_dependencies(
        conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
        user_service: UserService,
    ) -> Self {
        ConversationService { conversation_repo, user_service }
    }

    /// Returns the id of the single conversation between the two users,
    /// creating it on first contact. Both orders of the pair resolve to the
    /// same conversation.
    pub async fn get_or_create(
        &self,
        requester_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Uuid, error::SystemError> {
        let pair = ParticipantPair::new(requester_id, other_user_id)?;

        self.user_service.get_profile(requester_id).await?;
        self.user_service.get_profile(other_user_id).await?;

        let conversation = self.conversation_repo.find_or_create(&pair).await?;

        tracing::info!(
            conversation_id = %conversation.id,
            requester = %requester_id,
            other = %other_user_id,
            "conversation resolved"
        );

        Ok(conversation.id)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, error::SystemError> {
        let rows = self.conversation_repo.find_summaries_by_user(&user_id).await?;

        Ok(rows.into_iter().map(ConversationSummary::from).collect())
    }

    /// Non-participants get the same answer as for a missing conversation.
    pub async fn require_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        self.conversation_repo
            .find_for_participant(&conversation_id, &user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))
    }
}
