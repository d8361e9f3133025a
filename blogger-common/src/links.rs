//! Query strings and paths for the public routes.

use crate::model::{Id, post::PostMarker};
use url::form_urlencoded::Serializer;

#[must_use]
pub fn blog_query(blog_name: &str) -> String {
    Serializer::new(String::new())
        .append_pair("blog_name", blog_name)
        .finish()
}

#[must_use]
pub fn post_query(blog_name: &str, post_id: Id<PostMarker>) -> String {
    Serializer::new(String::new())
        .append_pair("blog_name", blog_name)
        .append_pair("post_id", &post_id.to_string())
        .finish()
}

/// Front page filtered to one blog.
#[must_use]
pub fn blog_path(blog_name: &str) -> String {
    format!("/?{}", blog_query(blog_name))
}

#[must_use]
pub fn feed_path(blog_name: &str) -> String {
    format!("/rssgen?{}", blog_query(blog_name))
}

/// Front page filtered to posts carrying `tag`.
#[must_use]
pub fn tag_path(tag: &str) -> String {
    let query = Serializer::new(String::new())
        .append_pair("tag", tag)
        .finish();
    format!("/?{query}")
}

/// Front page at `page`, filtered by `tag` when given.
#[must_use]
pub fn listing_path(blog_name: &str, tag: Option<&str>, page: usize) -> String {
    let mut query = Serializer::new(String::new());
    query.append_pair("blog_name", blog_name);
    if let Some(tag) = tag {
        query.append_pair("tag", tag);
    }
    query.append_pair("page", &page.to_string());

    format!("/?{}", query.finish())
}

#[must_use]
pub fn post_path(blog_name: &str, post_id: Id<PostMarker>) -> String {
    format!("/viewpost?{}", post_query(blog_name, post_id))
}

/// The post page with its edit form open.
#[must_use]
pub fn edit_post_path(blog_name: &str, post_id: Id<PostMarker>) -> String {
    let query = Serializer::new(post_query(blog_name, post_id))
        .append_pair("edit_mode", "true")
        .finish();
    format!("/viewpost?{query}")
}
