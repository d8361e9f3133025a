use crate::server::{Result, ServerError, ServerRouter, extract::Query, settings::Settings};
use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use axum_extra::routing::{RouterExt, TypedPath};
use blogger_common::{feed::build_feed, model::blog::BlogName};
use blogger_db::Store;
use serde::Deserialize;
use std::sync::Arc;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(blog_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/rssgen", rejection(ServerError))]
struct BlogFeedPath();

#[derive(Deserialize)]
struct BlogFeedQuery {
    #[serde(default)]
    blog_name: String,
}

async fn blog_feed(
    BlogFeedPath(): BlogFeedPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    Query(query): Query<BlogFeedQuery>,
) -> Result<impl IntoResponse> {
    let blog_name = BlogName::new(query.blog_name)?;
    let blog = store
        .fetch_blog_by_name(&blog_name)
        .await?
        .ok_or(ServerError::BlogByNameNotFound(blog_name))?;
    let posts = store.fetch_blog_posts(&blog.name).await?;

    let channel = build_feed(&settings.public_url, &blog, &posts)?;

    Ok(([(CONTENT_TYPE, RSS_CONTENT_TYPE)], channel.to_string()))
}
