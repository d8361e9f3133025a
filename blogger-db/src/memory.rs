//! In-process [`Store`] for development and tests. Nothing survives a
//! restart.

use crate::{DbError, Result, store::Store};
use async_trait::async_trait;
use blogger_common::model::{
    BloggerSnowflakeGenerator, Id,
    auth::{Authentication, TokenHash},
    blog::{Blog, BlogMarker, BlogName, CreateBlog},
    post::{CreatePost, Post, PostDraft, PostMarker},
    user::{CreateUser, User, UserHandle, UserMarker},
};
use blogger_common::snowflake::{ProcessId, WorkerId};
use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};
use time::UtcDateTime;

#[derive(Debug)]
struct MemoryState {
    snowflake_generator: BloggerSnowflakeGenerator,
    users: BTreeMap<Id<UserMarker>, User>,
    authentications: HashMap<TokenHash, Authentication>,
    blogs: BTreeMap<Id<BlogMarker>, Blog>,
    posts: BTreeMap<Id<PostMarker>, Post>,
}

impl MemoryState {
    fn next_id<Marker>(&mut self) -> Result<Id<Marker>> {
        Ok(self.snowflake_generator.generate()?.into())
    }

    /// Matching posts, newest edit first. Ids break ties.
    fn sorted_posts(&self, filter: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .values()
            .filter(|post| filter(post))
            .cloned()
            .collect();
        posts.sort_by_key(|post| Reverse((post.edited_at, post.id)));
        posts
    }
}

/// Every operation runs under one lock, which makes the check-and-write
/// operations atomic.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snowflake_generator: BloggerSnowflakeGenerator::new(worker_id, process_id),
                users: BTreeMap::new(),
                authentications: HashMap::new(),
                blogs: BTreeMap::new(),
                posts: BTreeMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `post` verbatim, e.g. to seed fixtures with fixed timestamps.
    #[cfg(test)]
    pub fn insert_post(&self, post: Post) {
        self.state().posts.insert(post.id, post);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        let state = self.state();
        Ok(state.users.values().find(|user| &user.handle == handle).cloned())
    }

    async fn upsert_user(&self, user: &CreateUser) -> Result<User> {
        let mut state = self.state();
        if let Some(existing) = state.users.values().find(|existing| existing.handle == user.handle)
        {
            return Ok(existing.clone());
        }

        let created = User {
            id: state.next_id()?,
            handle: user.handle.clone(),
            password: user.password.clone(),
            follows: Vec::new(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        self.state().authentications.insert(
            authentication.token_hash.clone(),
            authentication.clone(),
        );
        Ok(())
    }

    async fn delete_expired_auths(&self, now: UtcDateTime) -> Result<u64> {
        let mut state = self.state();
        let before = state.authentications.len();
        state
            .authentications
            .retain(|_, authentication| !authentication.is_expired_at(now));
        Ok((before - state.authentications.len()) as u64)
    }

    async fn fetch_auth(&self, token_hash: &TokenHash) -> Result<Option<Authentication>> {
        Ok(self.state().authentications.get(token_hash).cloned())
    }

    async fn delete_auth(&self, token_hash: &TokenHash) -> Result<()> {
        self.state().authentications.remove(token_hash);
        Ok(())
    }

    async fn fetch_blogs(&self) -> Result<Vec<Blog>> {
        let mut blogs: Vec<Blog> = self.state().blogs.values().cloned().collect();
        blogs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blogs)
    }

    async fn fetch_blog_by_name(&self, name: &BlogName) -> Result<Option<Blog>> {
        let state = self.state();
        Ok(state.blogs.values().find(|blog| &blog.name == name).cloned())
    }

    async fn create_blog(&self, blog: &CreateBlog) -> Result<Option<Blog>> {
        let mut state = self.state();
        if state.blogs.values().any(|existing| existing.name == blog.name) {
            return Ok(None);
        }

        let created = Blog {
            id: state.next_id()?,
            owner: blog.owner.clone(),
            authors: blog.initial_authors(),
            name: blog.name.clone(),
        };
        state.blogs.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn fetch_blog_posts(&self, blog_name: &BlogName) -> Result<Vec<Post>> {
        Ok(self.state().sorted_posts(|post| &post.blog_name == blog_name))
    }

    async fn fetch_tagged_posts(&self, tag: &str) -> Result<Vec<Post>> {
        Ok(self
            .state()
            .sorted_posts(|post| post.tags.iter().any(|post_tag| post_tag == tag)))
    }

    async fn fetch_post_tags(&self) -> Result<Vec<Vec<String>>> {
        let state = self.state();
        Ok(state
            .posts
            .values()
            .filter(|post| !post.tags.is_empty())
            .map(|post| post.tags.clone())
            .collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.state().posts.get(&post_id).cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.state();
        if !state.blogs.contains_key(&post.blog) {
            return Err(DbError::MissingBlog);
        }

        let now = UtcDateTime::now();
        let created = Post {
            id: state.next_id()?,
            blog: post.blog,
            blog_name: post.blog_name.clone(),
            title: post.draft.title.clone(),
            author: post.draft.author.clone(),
            content: post.draft.content.clone(),
            source: post.draft.source.clone(),
            image_urls: post.draft.image_urls.clone(),
            created_at: now,
            edited_at: now,
            tags: post.draft.tags.clone(),
            views: Some(0),
        };
        state.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        draft: &PostDraft,
    ) -> Result<Option<Post>> {
        let mut state = self.state();
        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };

        post.apply(draft, UtcDateTime::now());
        Ok(Some(post.clone()))
    }

    async fn record_post_view(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let mut state = self.state();
        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };

        if let Some(views) = post.views.as_mut() {
            *views += 1;
        }
        Ok(Some(post.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::{DbError, store::Store};
    use blogger_common::{
        model::{
            Id,
            auth::{Authentication, PasswordDigest, SessionToken},
            blog::{BlogName, CreateBlog},
            post::{CreatePost, Post, PostDraft},
            user::{CreateUser, UserHandle},
        },
        util::PositiveDuration,
    };
    use time::{Duration, macros::utc_datetime};

    fn handle(name: &str) -> UserHandle {
        UserHandle::new(name.to_owned()).unwrap()
    }

    fn blog_name(name: &str) -> BlogName {
        BlogName::new(name.to_owned()).unwrap()
    }

    fn draft(title: &str, tags: &[&str]) -> PostDraft {
        PostDraft {
            title: title.to_owned(),
            author: handle("ada"),
            content: String::new(),
            source: String::new(),
            image_urls: Vec::new(),
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn blog_names_are_unique() {
        let store = MemoryStore::default();
        let create = CreateBlog {
            owner: handle("ada"),
            name: blog_name("engines"),
        };

        let first = store.create_blog(&create).await.unwrap().unwrap();
        let second = CreateBlog {
            owner: handle("charles"),
            name: blog_name("engines"),
        };
        assert!(store.create_blog(&second).await.unwrap().is_none());

        let stored = store.fetch_blog_by_name(&blog_name("engines")).await.unwrap();
        assert_eq!(stored, Some(first));
        assert_eq!(store.fetch_blogs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn editors_are_blog_authors() {
        let store = MemoryStore::default();
        let create = CreateBlog {
            owner: handle("ada"),
            name: blog_name("engines"),
        };
        store.create_blog(&create).await.unwrap();

        assert!(store.is_editor(&blog_name("engines"), &handle("ada")).await.unwrap());
        assert!(!store.is_editor(&blog_name("engines"), &handle("charles")).await.unwrap());
        assert!(!store.is_editor(&blog_name("looms"), &handle("ada")).await.unwrap());
    }

    #[tokio::test]
    async fn upsert_user_keeps_existing() {
        let store = MemoryStore::default();
        let create = CreateUser {
            handle: handle("ada"),
            password: PasswordDigest::hash("first").unwrap(),
        };
        let first = store.upsert_user(&create).await.unwrap();

        let again = CreateUser {
            handle: handle("ada"),
            password: PasswordDigest::hash("second").unwrap(),
        };
        let second = store.upsert_user(&again).await.unwrap();
        assert_eq!(first, second);
        assert!(second.password.verify("first").unwrap());

        assert_eq!(store.fetch_user(first.id).await.unwrap(), Some(first.clone()));
        assert_eq!(store.fetch_user_by_handle(&handle("ada")).await.unwrap(), Some(first));
        assert!(store.fetch_user_by_handle(&handle("bob")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_purged() {
        let store = MemoryStore::default();
        let created_at = utc_datetime!(2025-03-03 03:00);
        let session = |hours: Option<i64>| {
            let token = SessionToken::generate_random(Id::from(9_u64));
            Authentication {
                user: token.user_id,
                token_hash: token.hash().unwrap(),
                created_at,
                expires_after: hours.and_then(|hours| PositiveDuration::new(Duration::hours(hours))),
            }
        };
        let short = session(Some(1));
        let long = session(Some(24));
        let forever = session(None);
        for authentication in [&short, &long, &forever] {
            store.create_auth(authentication).await.unwrap();
        }

        let now = created_at + Duration::hours(2);
        assert_eq!(store.delete_expired_auths(now).await.unwrap(), 1);
        assert!(store.fetch_auth(&short.token_hash).await.unwrap().is_none());
        assert_eq!(store.fetch_auth(&long.token_hash).await.unwrap(), Some(long.clone()));
        assert_eq!(store.fetch_auth(&forever.token_hash).await.unwrap(), Some(forever));

        store.delete_auth(&long.token_hash).await.unwrap();
        assert!(store.fetch_auth(&long.token_hash).await.unwrap().is_none());
        assert_eq!(store.delete_expired_auths(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn posts_need_a_blog() {
        let store = MemoryStore::default();
        let create = CreatePost {
            blog: Id::from(5_u64),
            blog_name: blog_name("ghost"),
            draft: draft("A", &[]),
        };

        assert!(matches!(
            store.create_post(&create).await,
            Err(DbError::MissingBlog)
        ));
    }

    #[tokio::test]
    async fn create_update_and_view() {
        let store = MemoryStore::default();
        let blog = store
            .create_blog(&CreateBlog {
                owner: handle("ada"),
                name: blog_name("engines"),
            })
            .await
            .unwrap()
            .unwrap();

        let mut first_draft = draft("A", &["x"]);
        first_draft.image_urls = vec!["one.png".to_owned()];
        let post = store
            .create_post(&CreatePost {
                blog: blog.id,
                blog_name: blog.name.clone(),
                draft: first_draft,
            })
            .await
            .unwrap();
        assert_eq!(post.views, Some(0));
        assert_eq!(post.created_at, post.edited_at);

        let viewed = store.record_post_view(post.id).await.unwrap().unwrap();
        assert_eq!(viewed.views, Some(1));

        let mut second_draft = draft("B", &["y", "z"]);
        second_draft.image_urls = vec!["two.png".to_owned()];
        let updated = store.update_post(post.id, &second_draft).await.unwrap().unwrap();
        assert_eq!(updated.title, "B");
        assert_eq!(updated.tags, ["y", "z"]);
        assert_eq!(updated.image_urls, ["one.png", "two.png"]);
        assert_eq!(updated.views, Some(1));
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.edited_at >= post.edited_at);

        assert!(store.update_post(Id::from(1_u64), &second_draft).await.unwrap().is_none());
        assert!(store.record_post_view(Id::from(1_u64)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unset_view_counter_stays_unset() {
        let store = MemoryStore::default();
        let time = utc_datetime!(2025-02-02 02:02);
        store.insert_post(Post {
            id: Id::from(77_u64),
            blog: Id::from(1_u64),
            blog_name: blog_name("engines"),
            title: "old".to_owned(),
            author: handle("ada"),
            content: String::new(),
            source: String::new(),
            image_urls: Vec::new(),
            created_at: time,
            edited_at: time,
            tags: Vec::new(),
            views: None,
        });

        let viewed = store.record_post_view(Id::from(77_u64)).await.unwrap().unwrap();
        assert_eq!(viewed.views, None);
        assert_eq!(store.fetch_post(Id::from(77_u64)).await.unwrap().unwrap().views, None);
    }

    #[tokio::test]
    async fn listings_order_by_edit_time() {
        let store = MemoryStore::default();
        for (id, day, tags) in [(1_u64, 1, vec!["x"]), (2, 3, vec![]), (3, 2, vec!["x", "y"])] {
            let time = utc_datetime!(2025-02-01 00:00) + Duration::days(day);
            store.insert_post(Post {
                id: Id::from(id),
                blog: Id::from(1_u64),
                blog_name: blog_name("engines"),
                title: id.to_string(),
                author: handle("ada"),
                content: String::new(),
                source: String::new(),
                image_urls: Vec::new(),
                created_at: time,
                edited_at: time,
                tags: tags.into_iter().map(str::to_owned).collect(),
                views: Some(0),
            });
        }

        let ids = |posts: Vec<Post>| posts.iter().map(|post| u64::from(post.id)).collect::<Vec<_>>();
        assert_eq!(ids(store.fetch_blog_posts(&blog_name("engines")).await.unwrap()), [2, 3, 1]);
        assert_eq!(ids(store.fetch_tagged_posts("x").await.unwrap()), [3, 1]);
        assert!(store.fetch_blog_posts(&blog_name("looms")).await.unwrap().is_empty());
        assert_eq!(
            store.fetch_post_tags().await.unwrap(),
            [vec!["x".to_owned()], vec!["x".to_owned(), "y".to_owned()]]
        );
    }
}
