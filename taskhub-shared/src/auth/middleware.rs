/// Actor resolution
///
/// Turns the `Authorization` header of a request into an [`Actor`]:
///
/// - no header: [`Actor::Anonymous`]
/// - `Bearer <access token>` for an existing user: [`Actor::User`] with the
///   role as currently stored
/// - anything else: an [`AuthError`], surfaced as 401
///
/// The HTTP layer calls [`resolve_actor`] once per request and stores the
/// result in the request extensions.

use axum::http::{header, HeaderMap};

use super::authorization::{Actor, Principal};
use super::jwt::{validate_access_token, JwtError};
use crate::store::{EntityStore, StoreError};

/// Error type for actor resolution
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its user no longer exists
    #[error("User not found")]
    UnknownAccount,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extracts the bearer token, if an `Authorization` header is present
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Invalid Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    Ok(Some(token))
}

/// Resolves the actor of a request
///
/// # Errors
///
/// - `AuthError::InvalidFormat` for a malformed header
/// - `AuthError::InvalidToken` for a bad, expired or refresh token
/// - `AuthError::UnknownAccount` when the token's user was deleted
pub async fn resolve_actor(
    store: &dyn EntityStore,
    headers: &HeaderMap,
    secret: &str,
) -> Result<Actor, AuthError> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(Actor::Anonymous);
    };

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let user = store
        .get_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownAccount)?;

    Ok(Actor::User(Principal {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use crate::models::user::{CreateUser, Role};
    use crate::store::memory::MemoryStore;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn store_with_manager() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                username: "mia".to_string(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                role: Role::Manager,
                profile_picture: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let (store, _) = store_with_manager().await;
        let actor = resolve_actor(&store, &HeaderMap::new(), SECRET).await.unwrap();
        assert_eq!(actor, Actor::Anonymous);
    }

    #[tokio::test]
    async fn test_valid_token_resolves_current_role() {
        let (store, id) = store_with_manager().await;
        let token = create_token(&Claims::new(id, TokenType::Access), SECRET).unwrap();

        let actor = resolve_actor(&store, &headers(&format!("Bearer {token}")), SECRET)
            .await
            .unwrap();

        let principal = actor.principal().unwrap();
        assert_eq!(principal.id, id);
        assert_eq!(principal.role, Role::Manager);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_errors() {
        let (store, id) = store_with_manager().await;

        let err = resolve_actor(&store, &headers("Basic abc"), SECRET).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));

        let err = resolve_actor(&store, &headers("Bearer not-a-jwt"), SECRET)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        let refresh = create_token(&Claims::new(id, TokenType::Refresh), SECRET).unwrap();
        let err = resolve_actor(&store, &headers(&format!("Bearer {refresh}")), SECRET)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        let ghost = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        let err = resolve_actor(&store, &headers(&format!("Bearer {ghost}")), SECRET)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownAccount));
    }
}
