use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    blobs::BlobStore,
    extract::Query,
    routes::{Sidebars, flag_set, is_editor},
    views::{self, Chrome, PostForm},
};
use axum::{
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    response::{Html, Redirect},
};
use axum_extra::routing::{RouterExt, TypedPath};
use blogger_common::{
    links::blog_path,
    model::{
        Id,
        blog::BlogName,
        post::{CreatePost, MAX_SUBMITTED_IMAGES, PostDraft, PostMarker},
    },
};
use blogger_db::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(submit_post)
        .typed_get(view_post)
}

fn parse_post_id(post_id: &str) -> Result<Id<PostMarker>> {
    post_id.parse().map_err(ServerError::InvalidPostId)
}

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

/// The fields of a post form. Unknown fields such as `current_user` are
/// skipped.
#[derive(Default)]
struct PostSubmission {
    title: String,
    post_id: String,
    blog_name: String,
    content: String,
    tags: String,
    images: [Option<Upload>; MAX_SUBMITTED_IMAGES],
}

impl PostSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "title" => submission.title = field.text().await?,
                "post_id" => submission.post_id = field.text().await?,
                "blog_name" => submission.blog_name = field.text().await?,
                "content" => submission.content = field.text().await?,
                "tags" => submission.tags = field.text().await?,
                "img1" | "img2" | "img3" => {
                    let slot = match name.as_str() {
                        "img1" => 0,
                        "img2" => 1,
                        _ => 2,
                    };
                    let file_name = field.file_name().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        submission.images[slot] = Some(Upload { file_name, bytes });
                    }
                }
                _ => {}
            }
        }

        Ok(submission)
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/upload", rejection(ServerError))]
struct SubmitPostPath();

/// Creates a post, or edits the one named by `post_id`. Does nothing without
/// a title.
async fn submit_post(
    SubmitPostPath(): SubmitPostPath,
    State(store): State<Arc<dyn Store>>,
    State(blobs): State<Arc<dyn BlobStore>>,
    user: AuthenticatedUser,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Redirect> {
    let submission = PostSubmission::read(multipart?).await?;

    if submission.title.is_empty() {
        debug!("Post submission without title ignored");
        return Ok(Redirect::to(&blog_path(&submission.blog_name)));
    }

    let post_id = if submission.post_id.is_empty() {
        None
    } else {
        Some(parse_post_id(&submission.post_id)?)
    };

    // Edited posts stay in their own blog whatever the form says.
    let blog_name = match post_id {
        Some(post_id) => {
            store
                .fetch_post(post_id)
                .await?
                .ok_or(ServerError::PostByIdNotFound(post_id))?
                .blog_name
        }
        None => BlogName::new(submission.blog_name)?,
    };

    let blog = store
        .fetch_blog_by_name(&blog_name)
        .await?
        .ok_or_else(|| ServerError::BlogByNameNotFound(blog_name.clone()))?;
    if !blog.has_author(&user.handle) {
        return Err(ServerError::NotAnEditor(blog_name));
    }

    let mut image_urls = Vec::new();
    for upload in submission.images.into_iter().flatten() {
        image_urls.push(blobs.store(upload.file_name.as_deref(), upload.bytes).await?);
    }

    let draft = PostDraft::from_submission(
        submission.title,
        user.handle,
        submission.content,
        &submission.tags,
        image_urls,
    );

    let post = match post_id {
        Some(post_id) => store
            .update_post(post_id, &draft)
            .await?
            .ok_or(ServerError::PostByIdNotFound(post_id))?,
        None => {
            let create = CreatePost {
                blog: blog.id,
                blog_name: blog_name.clone(),
                draft,
            };
            store.create_post(&create).await?
        }
    };
    info!(id = %post.id, blog = %post.blog_name, author = post.author.get(), "Saved post");

    Ok(Redirect::to(&blog_path(blog_name.get())))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/viewpost", rejection(ServerError))]
struct ViewPostPath();

#[derive(Deserialize)]
struct ViewPostQuery {
    #[serde(default)]
    post_id: String,
    edit_mode: Option<String>,
    create_blog: Option<String>,
}

/// Shows one post and counts the view.
async fn view_post(
    ViewPostPath(): ViewPostPath,
    State(store): State<Arc<dyn Store>>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<ViewPostQuery>,
) -> Result<Html<String>> {
    let post_id = parse_post_id(&query.post_id)?;
    let post = store
        .record_post_view(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;

    let is_editor = is_editor(store.as_ref(), Some(&post.blog_name), user.as_ref()).await?;
    let sidebars = Sidebars::load(store.as_ref()).await?;

    let chrome = Chrome {
        user: user.as_ref(),
        blog_name: post.blog_name.get(),
        blogs: &sidebars.blogs,
        tags: &sidebars.tags,
        create_blog: flag_set(query.create_blog.as_deref()),
    };
    let edit_mode = query.edit_mode.as_deref() == Some("true");
    let form = (edit_mode && is_editor).then(|| PostForm {
        blog_name: post.blog_name.get(),
        current_user: user.as_ref().map(|user| user.handle.get()).unwrap_or_default(),
        post: Some(&post),
    });

    let markup = views::post_page(&chrome, &post, is_editor, form.as_ref());
    Ok(Html(markup.into_string()))
}
