pub mod user_service_client;

pub use user_service_client::UserServiceClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Profile of a user as known by the external user service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

/// Lookup of user identities, used to resolve share targets by email.
/// Identity is owned by the external user service; this crate only reads.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String>;
}

/// Directory used when no user service is configured. Every lookup misses,
/// so share-by-email reports the target user as not found.
pub struct NullUserDirectory;

#[async_trait]
impl UserDirectory for NullUserDirectory {
    async fn find_by_email(&self, _email: &str) -> Result<Option<UserProfile>, String> {
        Ok(None)
    }
}
