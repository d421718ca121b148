use axum::http;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use tracing::info;

use crate::config;
use crate::models::AuthError;

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, AuthError> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::InvalidCredential("Invalid Authorization header".to_string()))?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = req
            .headers()
            .get(http::header::COOKIE)
            .ok_or(AuthError::MissingCredential)?
            .to_str()
            .map_err(|_| AuthError::InvalidCredential("Invalid Cookie header".to_string()))?;

        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == "auth_token" {
                return Ok(cookie.value().to_string());
            }
        }
        Err(AuthError::MissingCredential)
    }
}

// Validate a JWT token and return the token data
pub fn validate_jwt(
    token: &str,
    secret: &str,
) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

/// Verify a bearer credential and return the user id it vouches for.
/// Must succeed before any room join is accepted on a connection.
pub fn verify_credential(token: &str) -> Result<String, AuthError> {
    let config = config::get_config();
    let secret = config
        .auth_jwt_secret
        .as_ref()
        .ok_or(AuthError::NotConfigured)?;

    let token_data =
        validate_jwt(token, secret).map_err(|e| AuthError::InvalidCredential(e.to_string()))?;

    match token_data.claims.get("sub").and_then(|v| v.as_str()) {
        Some(uid) => {
            info!("JWT token validated successfully for user: {}", uid);
            Ok(uid.to_string())
        }
        None => Err(AuthError::InvalidCredential(
            "Token does not contain a 'sub' claim".to_string(),
        )),
    }
}
