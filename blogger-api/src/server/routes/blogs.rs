use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, extract::Form};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use blogger_common::model::blog::{BlogName, CreateBlog};
use blogger_db::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(create_blog)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create", rejection(ServerError))]
struct CreateBlogPath();

/// The owner always is the signed-in user, so a submitted `user_name` is
/// left unread.
#[derive(Deserialize)]
struct CreateBlogForm {
    #[serde(default)]
    newblog_name: String,
}

async fn create_blog(
    CreateBlogPath(): CreateBlogPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Form(form): Form<CreateBlogForm>,
) -> Result<Redirect> {
    if !form.newblog_name.is_empty() {
        let create = CreateBlog {
            owner: user.handle,
            name: BlogName::new(form.newblog_name)?,
        };

        match store.create_blog(&create).await? {
            Some(blog) => info!(
                id = %blog.id,
                name = %blog.name,
                owner = blog.owner.get(),
                "Created blog"
            ),
            None => debug!(name = %create.name, "Blog name already taken"),
        }
    }

    Ok(Redirect::to("/"))
}
