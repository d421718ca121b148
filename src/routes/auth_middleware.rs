use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::error;

use crate::services::auth_service::{get_auth_token, verify_credential};

/// Require a verified bearer credential on every request; the verified user
/// id is placed in request extensions for the handlers.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    // 2. Validate it and extract the user id
    let user_id = match verify_credential(&token) {
        Ok(user_id) => user_id,
        Err(e) => {
            error!("Credential verification failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 3. Expose the user id to downstream handlers
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}
