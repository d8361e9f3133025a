//! HTML pages.

use crate::server::auth::AuthenticatedUser;
use axum::http::StatusCode;
use blogger_common::{
    links::{blog_path, edit_post_path, feed_path, listing_path, post_path, tag_path},
    listing::Page,
    model::{blog::Blog, post::Post},
};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use time::{UtcDateTime, macros::format_description};

/// Parts shared by every page: header and tag sidebar.
pub struct Chrome<'a> {
    pub user: Option<&'a AuthenticatedUser>,
    pub blog_name: &'a str,
    pub blogs: &'a [Blog],
    pub tags: &'a [String],
    pub create_blog: bool,
}

/// Values the post form starts out with.
#[derive(Default)]
pub struct PostForm<'a> {
    pub blog_name: &'a str,
    pub current_user: &'a str,
    pub post: Option<&'a Post>,
}

fn document(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body { (body) }
        }
    }
}

fn header(chrome: &Chrome<'_>) -> Markup {
    html! {
        header {
            p {
                @match chrome.user {
                    Some(user) => {
                        "Signed in as " b { (user.handle.get()) } " "
                        form method="post" action="/logout" style="display:inline" {
                            button type="submit" { "Logout" }
                        }
                    }
                    None => {
                        "Guest " a href="/login" { "Login" }
                    }
                }
            }
            nav {
                h2 { "Blogs" }
                ul {
                    @for blog in chrome.blogs {
                        li {
                            a href=(blog_path(blog.name.get())) { (blog.name.get()) }
                            @if blog.name.get() == chrome.blog_name {
                                " "
                                a href=(feed_path(blog.name.get())) { "rss" }
                            }
                        }
                    }
                }
                @if let Some(user) = chrome.user {
                    @if chrome.create_blog {
                        form method="post" action="/create" {
                            input type="hidden" name="user_name" value=(user.handle.get());
                            input type="text" name="newblog_name" placeholder="Blog name";
                            button type="submit" { "Create blog" }
                        }
                    } @else {
                        a href="/?create_blog=true" { "New blog" }
                    }
                }
            }
        }
    }
}

fn tag_sidebar(tags: &[String]) -> Markup {
    html! {
        aside {
            h3 { "Tags" }
            ul {
                @for tag in tags {
                    li { a href=(tag_path(tag)) { (tag) } }
                }
            }
        }
    }
}

fn timestamp(at: UtcDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

fn post_body(post: &Post) -> Markup {
    html! {
        p.meta {
            "by " (post.author.get()) " on " (timestamp(post.created_at))
            @if post.edited_at != post.created_at {
                ", edited " (timestamp(post.edited_at))
            }
        }
        div.content { (PreEscaped(post.content.as_str())) }
        @for image_url in &post.image_urls {
            img src=(image_url);
        }
        p.tags {
            @for tag in post.tags.iter().filter(|tag| !tag.is_empty()) {
                a href=(tag_path(tag)) { (tag) } " "
            }
        }
    }
}

/// Multipart form creating a post, or editing `form.post` when set.
fn post_form(form: &PostForm<'_>) -> Markup {
    let title = form.post.map(|post| post.title.as_str()).unwrap_or_default();
    let source = form.post.map(|post| post.source.as_str()).unwrap_or_default();
    let tags = form.post.map(Post::joined_tags).unwrap_or_default();

    html! {
        form method="post" action="/upload" enctype="multipart/form-data" {
            input type="hidden" name="blog_name" value=(form.blog_name);
            input type="hidden" name="current_user" value=(form.current_user);
            @if let Some(post) = form.post {
                input type="hidden" name="post_id" value=(post.id.to_string());
            }
            p { input type="text" name="title" placeholder="Title" value=(title); }
            p { textarea name="content" rows="8" cols="60" { (source) } }
            p { input type="text" name="tags" placeholder="tag,tag" value=(tags); }
            p {
                input type="file" name="img1" accept="image/*";
                input type="file" name="img2" accept="image/*";
                input type="file" name="img3" accept="image/*";
            }
            button type="submit" {
                @if form.post.is_some() { "Save post" } @else { "Publish" }
            }
        }
    }
}

#[must_use]
pub fn listing(
    chrome: &Chrome<'_>,
    tag: Option<&str>,
    page: &Page<Post>,
    form: Option<&PostForm<'_>>,
) -> Markup {
    let body = html! {
        (header(chrome))
        (tag_sidebar(chrome.tags))
        main {
            @if !chrome.blog_name.is_empty() {
                h1 { (chrome.blog_name) }
            }
            @for post in &page.items {
                article {
                    h2 { a href=(post_path(post.blog_name.get(), post.id)) { (post.title) } }
                    (post_body(post))
                }
            }
            p.pages {
                @if page.newer_pages {
                    a href=(listing_path(chrome.blog_name, tag, page.page - 1)) { "Newer posts" }
                    " "
                }
                @if page.older_pages {
                    a href=(listing_path(chrome.blog_name, tag, page.page + 1)) { "Older posts" }
                }
            }
            @if let Some(form) = form {
                h2 { "New post" }
                (post_form(form))
            }
        }
    };

    let title = if chrome.blog_name.is_empty() {
        "Blogs"
    } else {
        chrome.blog_name
    };
    document(title, body)
}

#[must_use]
pub fn post_page(
    chrome: &Chrome<'_>,
    post: &Post,
    is_editor: bool,
    form: Option<&PostForm<'_>>,
) -> Markup {
    let body = html! {
        (header(chrome))
        (tag_sidebar(chrome.tags))
        main {
            article {
                h1 { (post.title) }
                (post_body(post))
                @if let Some(views) = post.views {
                    p.views { (views) " views" }
                }
            }
            @if let Some(form) = form {
                h2 { "Edit post" }
                (post_form(form))
            } @else if is_editor {
                a href=(edit_post_path(post.blog_name.get(), post.id)) { "Edit" }
            }
        }
    };

    document(&post.title, body)
}

#[must_use]
pub fn login_page() -> Markup {
    let body = html! {
        main {
            h1 { "Sign in" }
            p { "Signing in with a new handle registers it." }
            form method="post" action="/login" {
                input type="text" name="handle" placeholder="Handle" required;
                input type="password" name="password" placeholder="Password" required;
                button type="submit" { "Sign in" }
            }
        }
    };

    document("Sign in", body)
}

#[must_use]
pub fn error_page(status: StatusCode) -> Markup {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = html! {
        main {
            h1 { (status.as_u16()) " " (reason) }
            p { a href="/" { "Back to the front page" } }
        }
    };

    document(reason, body)
}
