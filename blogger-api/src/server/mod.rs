use axum::{
    Router,
    extract::{
        FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use blobs::{BLOB_ROUTE, BlobError, BlobStore};
use blogger_common::{
    feed::FeedError,
    model::{
        Id,
        auth::{PasswordHashError, TokenDecodeError, TokenHashError},
        blog::{BlogName, InvalidBlogNameError},
        post::PostMarker,
        user::{InvalidUserHandleError, UserHandle},
    },
};
use blogger_db::{DbError, Store};
use settings::Settings;
use std::{num::ParseIntError, path::Path, sync::Arc};
use thiserror::Error;
use tower_http::services::ServeDir;
use tracing::error;

pub mod auth;
pub mod blobs;
mod extract;
mod routes;
pub mod settings;
mod views;


pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub settings: Arc<Settings>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// The whole site: pages plus the uploaded files in `blob_dir`.
pub fn app(state: ServerState, blob_dir: &Path) -> Router {
    routes()
        .with_state(state)
        .nest_service(BLOB_ROUTE, ServeDir::new(blob_dir))
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error("Multipart body rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Multipart body could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Page number is not an integer: {0}")]
    InvalidPage(ParseIntError),
    #[error("Post id is not an integer: {0}")]
    InvalidPostId(ParseIntError),
    #[error(transparent)]
    InvalidBlogName(#[from] InvalidBlogNameError),
    #[error(transparent)]
    InvalidUserHandle(#[from] InvalidUserHandleError),
    #[error("The provided session token could not be decoded: {0}")]
    InvalidSessionToken(#[from] TokenDecodeError),
    #[error(transparent)]
    TokenHash(#[from] TokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("A password is required")]
    MissingPassword,
    #[error("Wrong password for user {0:?}")]
    WrongPassword(UserHandle),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Signing in is required")]
    SignInRequired,
    #[error("The user may not write to blog {0:?}")]
    NotAnEditor(BlogName),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("Blog with name {0:?} was not found.")]
    BlogByNameNotFound(BlogName),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::BlogByNameNotFound(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::QueryRejection(_)
            | ServerError::FormRejection(_)
            | ServerError::MultipartRejection(_)
            | ServerError::Multipart(_)
            | ServerError::InvalidPage(_)
            | ServerError::InvalidPostId(_)
            | ServerError::InvalidBlogName(_)
            | ServerError::InvalidUserHandle(_)
            | ServerError::InvalidSessionToken(_)
            | ServerError::MissingPassword => StatusCode::BAD_REQUEST,
            ServerError::InvalidToken
            | ServerError::SignInRequired
            | ServerError::WrongPassword(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotAnEditor(_) => StatusCode::FORBIDDEN,
            ServerError::TokenHash(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_)
            | ServerError::Blob(_)
            | ServerError::Feed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        (status, Html(views::error_page(status).into_string())).into_response()
    }
}
