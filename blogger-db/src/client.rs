use crate::{
    DbError, Result,
    record::{AuthenticationRecord, BlogRecord, PostRecord, UserRecord, to_primitive},
    store::Store,
};
use async_trait::async_trait;
use blogger_common::model::{
    BloggerSnowflakeGenerator, Id,
    auth::{Authentication, TokenHash},
    blog::{Blog, BlogMarker, BlogName, CreateBlog},
    post::{CreatePost, Post, PostDraft, PostMarker},
    user::{CreateUser, User, UserHandle, UserMarker},
};
use blogger_common::snowflake::{ProcessId, WorkerId};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as};
use std::sync::{Mutex, PoisonError};
use time::UtcDateTime;
use tracing::info;

macro_rules! post_columns {
    () => {
        "posts.post_snowflake, posts.blog_snowflake, posts.blog_name, posts.title, \
        posts.author, posts.content, posts.source, posts.image_urls, posts.created_at, \
        posts.edited_at, posts.tags, posts.views"
    };
}

macro_rules! user_columns {
    () => {
        "users.user_snowflake, users.handle, users.password_hash, users.follows"
    };
}

macro_rules! blog_columns {
    () => {
        "blogs.blog_snowflake, blogs.owner, blogs.authors, blogs.name"
    };
}

/// PostgreSQL backed [`Store`].
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<BloggerSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(BloggerSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");

        Ok(Self::new(pool, worker_id, process_id))
    }

    fn next_id<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;
        Ok(snowflake.into())
    }
}

fn signed<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

fn into_posts(records: Vec<PostRecord>) -> Result<Vec<Post>> {
    records
        .into_iter()
        .map(|record| Post::try_from(record).map_err(DbError::from))
        .collect()
}

#[async_trait]
impl Store for DbClient {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users.users WHERE users.user_snowflake = $1"
        ))
        .bind(signed(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users.users WHERE users.handle = $1"
        ))
        .bind(handle.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn upsert_user(&self, user: &CreateUser) -> Result<User> {
        let user_id: Id<UserMarker> = self.next_id()?;

        // The no-op update makes RETURNING yield the existing row.
        let record = query_as::<_, UserRecord>(concat!(
            "INSERT INTO users.users AS users (user_snowflake, handle, password_hash) ",
            "VALUES ($1, $2, $3) ON CONFLICT (handle) DO UPDATE SET handle = EXCLUDED.handle ",
            "RETURNING ",
            user_columns!()
        ))
        .bind(signed(user_id))
        .bind(user.handle.get())
        .bind(user.password.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(User::try_from(record)?)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(authentication.token_hash.0.as_slice())
        .bind(signed(authentication.user))
        .bind(to_primitive(authentication.created_at))
        .bind(
            authentication
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_expired_auths(&self, now: UtcDateTime) -> Result<u64> {
        let result = query(
            "
            DELETE FROM users.authentications
            WHERE expires_after_seconds IS NOT NULL
                AND created_at + expires_after_seconds * INTERVAL '1 second' < $1
            ",
        )
        .bind(to_primitive(now))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_auth(&self, token_hash: &TokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM users.authentications
            WHERE authentications.token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn delete_auth(&self, token_hash: &TokenHash) -> Result<()> {
        query("DELETE FROM users.authentications WHERE token_hash = $1")
            .bind(token_hash.0.as_slice())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fetch_blogs(&self) -> Result<Vec<Blog>> {
        let records = query_as::<_, BlogRecord>(concat!(
            "SELECT ",
            blog_columns!(),
            " FROM blogs.blogs ORDER BY blogs.name"
        ))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Blog::try_from(record).map_err(DbError::from))
            .collect()
    }

    async fn fetch_blog_by_name(&self, name: &BlogName) -> Result<Option<Blog>> {
        let record = query_as::<_, BlogRecord>(concat!(
            "SELECT ",
            blog_columns!(),
            " FROM blogs.blogs WHERE blogs.name = $1"
        ))
        .bind(name.get())
        .fetch_optional(&self.pool)
        .await?;

        let blog = record.map(Blog::try_from).transpose()?;
        Ok(blog)
    }

    async fn create_blog(&self, blog: &CreateBlog) -> Result<Option<Blog>> {
        let blog_id: Id<BlogMarker> = self.next_id()?;

        let record = query_as::<_, BlogRecord>(concat!(
            "INSERT INTO blogs.blogs AS blogs (blog_snowflake, owner, authors, name) ",
            "VALUES ($1, $2, $3, $4) ON CONFLICT (name) DO NOTHING RETURNING ",
            blog_columns!()
        ))
        .bind(signed(blog_id))
        .bind(blog.owner.get())
        .bind(blog.initial_authors())
        .bind(blog.name.get())
        .fetch_optional(&self.pool)
        .await?;

        let blog = record.map(Blog::try_from).transpose()?;
        Ok(blog)
    }

    async fn fetch_blog_posts(&self, blog_name: &BlogName) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts.posts WHERE posts.blog_name = $1 ",
            "ORDER BY posts.edited_at DESC, posts.post_snowflake DESC"
        ))
        .bind(blog_name.get())
        .fetch_all(&self.pool)
        .await?;

        into_posts(records)
    }

    async fn fetch_tagged_posts(&self, tag: &str) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts.posts WHERE $1 = ANY(posts.tags) ",
            "ORDER BY posts.edited_at DESC, posts.post_snowflake DESC"
        ))
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        into_posts(records)
    }

    async fn fetch_post_tags(&self) -> Result<Vec<Vec<String>>> {
        let tags = sqlx::query_scalar::<_, Vec<String>>(
            "
            SELECT posts.tags
            FROM posts.posts
            WHERE cardinality(posts.tags) > 0
            ORDER BY posts.post_snowflake
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts.posts WHERE posts.post_snowflake = $1"
        ))
        .bind(signed(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id: Id<PostMarker> = self.next_id()?;
        let now = to_primitive(UtcDateTime::now());
        let draft = &post.draft;

        let record = query_as::<_, PostRecord>(concat!(
            "INSERT INTO posts.posts AS posts (post_snowflake, blog_snowflake, blog_name, ",
            "title, author, content, source, image_urls, created_at, edited_at, tags, views) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, 0) RETURNING ",
            post_columns!()
        ))
        .bind(signed(post_id))
        .bind(signed(post.blog))
        .bind(post.blog_name.get())
        .bind(&draft.title)
        .bind(draft.author.get())
        .bind(&draft.content)
        .bind(&draft.source)
        .bind(draft.image_urls.as_slice())
        .bind(now)
        .bind(draft.tags.as_slice())
        .fetch_one(&self.pool)
        .await?;

        Ok(Post::try_from(record)?)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        draft: &PostDraft,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(concat!(
            "UPDATE posts.posts AS posts SET title = $2, author = $3, content = $4, ",
            "source = $5, image_urls = posts.image_urls || $6, tags = $7, edited_at = $8 ",
            "WHERE posts.post_snowflake = $1 RETURNING ",
            post_columns!()
        ))
        .bind(signed(post_id))
        .bind(&draft.title)
        .bind(draft.author.get())
        .bind(&draft.content)
        .bind(&draft.source)
        .bind(draft.image_urls.as_slice())
        .bind(draft.tags.as_slice())
        .bind(to_primitive(UtcDateTime::now()))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn record_post_view(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        // NULL + 1 stays NULL.
        let record = query_as::<_, PostRecord>(concat!(
            "UPDATE posts.posts AS posts SET views = posts.views + 1 ",
            "WHERE posts.post_snowflake = $1 RETURNING ",
            post_columns!()
        ))
        .bind(signed(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }
}
