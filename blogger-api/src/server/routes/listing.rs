use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::Query,
    routes::{Sidebars, flag_set, is_editor},
    settings::Settings,
    views::{self, Chrome, PostForm},
};
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use blogger_common::{links::blog_path, listing::paginate, model::blog::BlogName};
use blogger_db::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(front_page)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct FrontPagePath();

#[derive(Deserialize)]
struct FrontPageQuery {
    #[serde(default)]
    blog_name: String,
    tag: Option<String>,
    page: Option<String>,
    create_blog: Option<String>,
}

/// Missing and empty page numbers mean the first page.
fn parse_page(page: Option<&str>) -> Result<i64> {
    match page {
        None | Some("") => Ok(0),
        Some(page) => page.parse().map_err(ServerError::InvalidPage),
    }
}

async fn front_page(
    FrontPagePath(): FrontPagePath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<FrontPageQuery>,
) -> Result<Response> {
    let page_number = parse_page(query.page.as_deref())?;
    let blog_name = BlogName::new(query.blog_name.clone()).ok();
    let tag = query.tag.as_deref().filter(|tag| !tag.is_empty());

    let posts = match (tag, &blog_name) {
        (Some(tag), _) => store.fetch_tagged_posts(tag).await?,
        (None, Some(blog_name)) => store.fetch_blog_posts(blog_name).await?,
        (None, None) => Vec::new(),
    };

    let Some(page) = paginate(posts, page_number, settings.page_bound) else {
        debug!(page = page_number, blog_name = %query.blog_name, "Page out of bounds");
        return Ok(Redirect::to(&blog_path(&query.blog_name)).into_response());
    };

    let is_editor = is_editor(store.as_ref(), blog_name.as_ref(), user.as_ref()).await?;
    let sidebars = Sidebars::load(store.as_ref()).await?;

    let chrome = Chrome {
        user: user.as_ref(),
        blog_name: &query.blog_name,
        blogs: &sidebars.blogs,
        tags: &sidebars.tags,
        create_blog: flag_set(query.create_blog.as_deref()),
    };
    let form = is_editor.then(|| PostForm {
        blog_name: &query.blog_name,
        current_user: user.as_ref().map(|user| user.handle.get()).unwrap_or_default(),
        post: None,
    });

    let markup = views::listing(&chrome, tag, &page, form.as_ref());
    Ok(Html(markup.into_string()).into_response())
}
