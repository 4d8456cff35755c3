use uuid::Uuid;

use crate::{api::error, modules::user::schema::UserEntity};

#[async_trait::async_trait]
pub trait UserRepository {
    /// Looks up a user that exists and has not been deactivated.
    async fn find_active_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;
}
