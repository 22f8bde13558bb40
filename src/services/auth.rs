use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::scrape::ScrapeResponse;

/// JWT claims carried by API bearer tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub team_id: String,
    pub exp: usize,
}

/// Key material for verifying bearer tokens, built once at startup.
pub struct AuthKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Mint a token for a team. Used by provisioning scripts and the
/// live-infrastructure tests.
pub fn issue_token(
    secret: &str,
    team_id: &str,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        team_id: team_id.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Authenticated team identity, extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct TeamContext {
    pub team_id: String,
}

impl FromRequestParts<AppState> for TeamContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingToken)?;

        let claims = state.auth.verify(token)?;
        Ok(TeamContext {
            team_id: claims.team_id,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ScrapeResponse::error("Unauthorized")),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_tokens_it_issued() {
        let secret = "test-secret";
        let token = issue_token(secret, "team-1", chrono::Duration::minutes(5)).unwrap();
        let claims = AuthKeys::new(secret).verify(&token).unwrap();
        assert_eq!(claims.team_id, "team-1");
    }

    #[test]
    fn rejects_tokens_signed_with_other_secret() {
        let token = issue_token("secret-a", "team-1", chrono::Duration::minutes(5)).unwrap();
        assert!(AuthKeys::new("secret-b").verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_tokens() {
        let secret = "test-secret";
        let token = issue_token(secret, "team-1", chrono::Duration::minutes(-5)).unwrap();
        assert!(AuthKeys::new(secret).verify(&token).is_err());
    }
}
