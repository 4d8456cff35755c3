use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::RedisCache;
use crate::constants::USER_CACHE_TTL;
use crate::modules::user::{model::UserProfile, repository::UserRepository};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Option<Arc<RedisCache>>,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Option<Arc<RedisCache>>,
    ) -> Self {
        info!("UserService initialized (profile cache {})", if cache.is_some() { "on" } else { "off" });
        UserService { repo, cache }
    }

    /// Returns the profile of an existing, active user. Cache failures fall
    /// back to the database.
    pub async fn get_profile(&self, id: Uuid) -> Result<UserProfile, error::SystemError> {
        let key = format!("user:{}", id);

        if let Some(cache) = &self.cache {
            match cache.get::<UserProfile>(&key).await {
                Ok(Some(profile)) => return Ok(profile),
                Ok(None) => {}
                Err(e) => warn!("Profile cache read failed for {}: {}", id, e),
            }
        }

        let profile = self
            .repo
            .find_active_by_id(&id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &profile, USER_CACHE_TTL).await {
                warn!("Profile cache write failed for {}: {}", id, e);
            }
        }

        Ok(profile)
    }
}
