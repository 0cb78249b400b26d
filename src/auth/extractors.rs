use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;

/// Identity of the user making a request under optional authentication.
///
/// Absent, malformed, or expired credentials downgrade to `Anonymous`;
/// this extractor never rejects a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Identified(Uuid),
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Identified(id) => Some(*id),
        }
    }
}

/// Extracts and validates the bearer token, rejecting the request with 401
/// when it is missing or invalid.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthenticated
        })?;
        Ok(AuthUser(claims.sub))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let viewer = bearer_token(parts)
            .and_then(|token| keys.verify(token).ok())
            .map(|claims| Viewer::Identified(claims.sub))
            .unwrap_or(Viewer::Anonymous);
        Ok(viewer)
    }
}

#[cfg(test)]
mod extractor_tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    fn parts(auth_header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/articles");
        if let Some(value) = auth_header {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn signed_token(state: &AppState) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(state).sign(user_id).expect("sign");
        (user_id, token)
    }

    #[tokio::test]
    async fn required_rejects_missing_header() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn required_rejects_wrong_scheme() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts(Some("Token abc")), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn required_rejects_invalid_token() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts(Some("Bearer garbage")), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn required_accepts_valid_token() {
        let state = AppState::fake();
        let (user_id, token) = signed_token(&state);
        let AuthUser(extracted) =
            AuthUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &state)
                .await
                .expect("extract");
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn optional_downgrades_missing_and_invalid_to_anonymous() {
        let state = AppState::fake();
        for header in [None, Some("Bearer garbage"), Some("Token abc")] {
            let viewer = Viewer::from_request_parts(&mut parts(header), &state)
                .await
                .unwrap();
            assert_eq!(viewer, Viewer::Anonymous);
        }
    }

    #[tokio::test]
    async fn optional_identifies_valid_token() {
        let state = AppState::fake();
        let (user_id, token) = signed_token(&state);
        let viewer =
            Viewer::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &state)
                .await
                .unwrap();
        assert_eq!(viewer, Viewer::Identified(user_id));
    }
}
