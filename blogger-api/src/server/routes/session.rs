use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, SESSION_COOKIE},
    extract::Form,
    settings::Settings,
    views,
};
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Redirect},
};
use axum_extra::routing::{RouterExt, TypedPath};
use blogger_common::model::{
    auth::{Authentication, PasswordDigest, SessionToken},
    user::{CreateUser, UserHandle},
};
use blogger_db::Store;
use serde::Deserialize;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(login_page)
        .typed_post(login)
        .typed_post(logout)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login", rejection(ServerError))]
struct LoginPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/logout", rejection(ServerError))]
struct LogoutPath();

#[derive(Deserialize)]
struct LoginForm {
    handle: String,
    password: String,
}

fn session_cookie(token: &str, settings: &Settings) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(ttl) = settings.session_ttl {
        cookie.push_str(&format!("; Max-Age={}", ttl.get().whole_seconds()));
    }
    cookie
}

async fn login_page(LoginPath(): LoginPath) -> Html<String> {
    Html(views::login_page().into_string())
}

/// Signs in with handle and password. The first sign-in under a handle
/// registers it with the given password.
async fn login(
    LoginPath(): LoginPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse> {
    let handle = UserHandle::new(form.handle)?;
    if form.password.is_empty() {
        return Err(ServerError::MissingPassword);
    }

    let user = match store.fetch_user_by_handle(&handle).await? {
        Some(user) => user,
        None => {
            let create = CreateUser {
                handle,
                password: PasswordDigest::hash(&form.password)?,
            };
            store.upsert_user(&create).await?
        }
    };
    if !user.password.verify(&form.password)? {
        return Err(ServerError::WrongPassword(user.handle));
    }

    let now = UtcDateTime::now();
    let purged = store.delete_expired_auths(now).await?;
    if purged > 0 {
        debug!(purged, "Deleted expired sessions");
    }

    let token = SessionToken::generate_random(user.id);
    let authentication = Authentication {
        user: user.id,
        token_hash: token.hash()?,
        created_at: now,
        expires_after: settings.session_ttl,
    };
    store.create_auth(&authentication).await?;
    info!(id = %user.id, handle = user.handle.get(), "Signed in");

    let cookie = session_cookie(&token.as_token_str(), &settings);
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")))
}

async fn logout(
    LogoutPath(): LogoutPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse> {
    store.delete_auth(&user.token_hash).await?;
    info!(id = %user.id, "Signed out");

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")))
}
