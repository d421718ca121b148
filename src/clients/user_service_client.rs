use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use moka::future::Cache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{UserDirectory, UserProfile};

/// Client for the external user service, authenticated with a short-lived
/// service JWT. Lookups are cached so repeated shares of the same target do
/// not hammer the service.
pub struct UserServiceClient {
    client: Client,
    base_url: String,
    jwt_secret: String,
    service_name: String,
    cache: Cache<String, Option<UserProfile>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

impl UserServiceClient {
    pub fn new(base_url: String, jwt_secret: String, service_name: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            jwt_secret,
            service_name,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(std::time::Duration::from_secs(300))
                .build(),
        }
    }

    fn generate_token(&self) -> String {
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(60)) // 1 minute expiration
            .expect("valid timestamp")
            .timestamp();

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .expect("Failed to generate JWT")
    }

    async fn fetch_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        let token = self.generate_token();
        let url = format!("{}/users/lookup", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| format!("User service request failed: {}", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let profile: UserProfile = response
                    .json()
                    .await
                    .map_err(|e| format!("Failed to parse user service response: {}", e))?;
                info!("Resolved user {} for email lookup", profile.user_id);
                Ok(Some(profile))
            }
            status => {
                error!("User service returned {} for email lookup", status);
                Err(format!("User service returned {}", status))
            }
        }
    }
}

#[async_trait]
impl UserDirectory for UserServiceClient {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        if let Some(cached) = self.cache.get(email).await {
            return Ok(cached);
        }
        let profile = self.fetch_by_email(email).await?;
        self.cache.insert(email.to_string(), profile.clone()).await;
        Ok(profile)
    }
}
