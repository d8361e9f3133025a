use blogger_common::model::{
    ModelValidationError,
    auth::{Authentication, PasswordDigest},
    blog::{Blog, BlogName},
    post::Post,
    user::{User, UserHandle},
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime, UtcDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
    pub password_hash: String,
    pub follows: Vec<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct BlogRecord {
    pub blog_snowflake: i64,
    pub owner: String,
    pub authors: Vec<String>,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub blog_snowflake: i64,
    pub blog_name: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub source: String,
    pub image_urls: Vec<String>,
    pub created_at: PrimitiveDateTime,
    pub edited_at: PrimitiveDateTime,
    pub tags: Vec<String>,
    pub views: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

/// Timestamps are stored as UTC `TIMESTAMP` columns.
pub(crate) fn to_primitive(time: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(time.date(), time.time())
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            handle: UserHandle::new(value.handle)?,
            password: PasswordDigest::from_stored(value.password_hash)?,
            follows: value.follows,
        })
    }
}

impl TryFrom<BlogRecord> for Blog {
    type Error = ModelValidationError;

    fn try_from(value: BlogRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.blog_snowflake.cast_unsigned().into(),
            owner: UserHandle::new(value.owner)?,
            authors: value.authors,
            name: BlogName::new(value.name)?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            blog: value.blog_snowflake.cast_unsigned().into(),
            blog_name: BlogName::new(value.blog_name)?,
            title: value.title,
            author: UserHandle::new(value.author)?,
            content: value.content,
            source: value.source,
            image_urls: value.image_urls,
            created_at: value.created_at.as_utc(),
            edited_at: value.edited_at.as_utc(),
            tags: value.tags,
            views: value.views,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PostRecord, UserRecord, to_primitive};
    use blogger_common::model::{post::Post, user::User};
    use time::macros::utc_datetime;

    #[test]
    fn timestamps_survive_storage() {
        let time = utc_datetime!(2025-05-05 05:05:05.5);
        assert_eq!(to_primitive(time).as_utc(), time);
    }

    #[test]
    fn rows_convert_to_models() {
        let record = UserRecord {
            user_snowflake: 1,
            handle: String::new(),
            password_hash: String::new(),
            follows: Vec::new(),
        };
        assert!(User::try_from(record).is_err());

        let time = to_primitive(utc_datetime!(2025-05-05 05:05));
        let record = PostRecord {
            post_snowflake: -1,
            blog_snowflake: 2,
            blog_name: "engines".to_owned(),
            title: "t".to_owned(),
            author: "ada".to_owned(),
            content: String::new(),
            source: String::new(),
            image_urls: Vec::new(),
            created_at: time,
            edited_at: time,
            tags: Vec::new(),
            views: None,
        };
        let post = Post::try_from(record).unwrap();
        assert_eq!(u64::from(post.id), u64::MAX);
        assert_eq!(post.views, None);
    }
}
