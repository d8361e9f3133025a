use crate::server::{Result, ServerRouter, auth::AuthenticatedUser};
use axum::Router;
use blogger_common::{
    listing::merge_tags,
    model::blog::{Blog, BlogName},
};
use blogger_db::Store;

mod blogs;
mod feed;
mod listing;
mod posts;
mod session;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(listing::routes())
        .merge(blogs::routes())
        .merge(posts::routes())
        .merge(feed::routes())
        .merge(session::routes())
}

/// Blog list and tag sidebar shown around every page.
struct Sidebars {
    blogs: Vec<Blog>,
    tags: Vec<String>,
}

impl Sidebars {
    async fn load(store: &dyn Store) -> Result<Self> {
        let blogs = store.fetch_blogs().await?;
        let tags = merge_tags(&store.fetch_post_tags().await?);

        Ok(Self { blogs, tags })
    }
}

/// Guests and unknown blogs are never editors.
async fn is_editor(
    store: &dyn Store,
    blog_name: Option<&BlogName>,
    user: Option<&AuthenticatedUser>,
) -> Result<bool> {
    match (blog_name, user) {
        (Some(blog_name), Some(user)) => Ok(store.is_editor(blog_name, &user.handle).await?),
        _ => Ok(false),
    }
}

/// Query flags are set by any non-empty value.
fn flag_set(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}
