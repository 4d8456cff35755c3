use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::{ConversationSummaryRow, ParticipantPair},
        schema::ConversationEntity,
    },
};

#[async_trait::async_trait]
pub trait ConversationRepository {
    /// Returns the conversation for `pair`, creating it if none exists. Must be
    /// safe against concurrent callers racing on the same pair.
    async fn find_or_create(
        &self,
        pair: &ParticipantPair,
    ) -> Result<ConversationEntity, error::SystemError>;

    /// `None` when the conversation does not exist or `user_id` is not in it.
    async fn find_for_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Every conversation of `user_id`, newest activity first.
    async fn find_summaries_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationSummaryRow>, error::SystemError>;
}
