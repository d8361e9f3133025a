use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use blogger_common::model::{
    Id,
    auth::{SessionToken, TokenHash},
    user::{UserHandle, UserMarker},
};
use blogger_db::Store;
use headers::{Authorization, Cookie, HeaderMapExt, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

/// Cookie carrying the session token of a browser.
pub const SESSION_COOKIE: &str = "session";

/// The signed-in user of a request.
///
/// The token is read from an `Authorization: Bearer` header, falling back to
/// the [`SESSION_COOKIE`]. Extract `Option<AuthenticatedUser>` for pages
/// guests may see: missing, unreadable, unknown or expired tokens all yield
/// `None` there, while the plain extractor rejects them.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    pub id: Id<UserMarker>,
    pub handle: UserHandle,
    pub token_hash: TokenHash,
}

fn request_token(parts: &Parts) -> Result<Option<SessionToken>, ServerError> {
    if let Some(Authorization(bearer)) = parts.headers.typed_get::<Authorization<Bearer>>() {
        return Ok(Some(bearer.token().parse()?));
    }

    let cookie = parts.headers.typed_get::<Cookie>();
    match cookie.as_ref().and_then(|cookie| cookie.get(SESSION_COOKIE)) {
        Some(token) => Ok(Some(token.parse()?)),
        None => Ok(None),
    }
}

async fn authenticate(
    store: &dyn Store,
    token: &SessionToken,
) -> Result<AuthenticatedUser, ServerError> {
    let token_hash = token.hash()?;

    let authentication = store
        .fetch_auth(&token_hash)
        .await?
        .ok_or(ServerError::InvalidToken)?;

    if authentication.user != token.user_id || authentication.is_expired_at(UtcDateTime::now()) {
        return Err(ServerError::InvalidToken);
    }

    let user = store
        .fetch_user(authentication.user)
        .await?
        .ok_or(ServerError::InvalidToken)?;

    Ok(AuthenticatedUser {
        id: user.id,
        handle: user.handle,
        token_hash,
    })
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = request_token(parts)?.ok_or(ServerError::SignInRequired)?;

        let store = Arc::<dyn Store>::from_ref(state);
        authenticate(store.as_ref(), &token).await
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let token = match request_token(parts) {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(None),
            Err(err) => {
                debug!(%err, "Treating unreadable session token as guest");
                return Ok(None);
            }
        };

        let store = Arc::<dyn Store>::from_ref(state);
        match authenticate(store.as_ref(), &token).await {
            Ok(user) => Ok(Some(user)),
            Err(ServerError::InvalidToken) => {
                debug!(user_id = %token.user_id, "Treating stale session as guest");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
