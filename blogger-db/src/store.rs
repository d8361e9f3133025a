use crate::Result;
use async_trait::async_trait;
use blogger_common::model::{
    Id,
    auth::{Authentication, TokenHash},
    blog::{Blog, BlogName, CreateBlog},
    post::{CreatePost, Post, PostDraft, PostMarker},
    user::{CreateUser, User, UserHandle, UserMarker},
};
use time::UtcDateTime;

/// Persistence used by the request handlers.
///
/// Post listings are ordered by `edited_at`, newest first.
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>>;

    /// Creates the user, or returns the one already holding the handle
    /// unchanged.
    async fn upsert_user(&self, user: &CreateUser) -> Result<User>;

    async fn create_auth(&self, authentication: &Authentication) -> Result<()>;

    /// Removes sessions that expired before `now` and returns how many.
    async fn delete_expired_auths(&self, now: UtcDateTime) -> Result<u64>;

    async fn fetch_auth(&self, token_hash: &TokenHash) -> Result<Option<Authentication>>;

    async fn delete_auth(&self, token_hash: &TokenHash) -> Result<()>;

    async fn fetch_blogs(&self) -> Result<Vec<Blog>>;

    async fn fetch_blog_by_name(&self, name: &BlogName) -> Result<Option<Blog>>;

    /// Returns `None` and changes nothing when the name is taken. The check
    /// and the insert are one atomic step.
    async fn create_blog(&self, blog: &CreateBlog) -> Result<Option<Blog>>;

    async fn fetch_blog_posts(&self, blog_name: &BlogName) -> Result<Vec<Post>>;

    async fn fetch_tagged_posts(&self, tag: &str) -> Result<Vec<Post>>;

    /// Tag lists of every post that has tags, oldest post first.
    async fn fetch_post_tags(&self) -> Result<Vec<Vec<String>>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// New posts start with zero views.
    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    async fn update_post(&self, post_id: Id<PostMarker>, draft: &PostDraft)
    -> Result<Option<Post>>;

    /// Atomically adds one view and returns the post. A `None` counter stays
    /// `None`.
    async fn record_post_view(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn is_editor(&self, blog_name: &BlogName, handle: &UserHandle) -> Result<bool> {
        let blog = self.fetch_blog_by_name(blog_name).await?;
        Ok(blog.is_some_and(|blog| blog.has_author(handle)))
    }
}
