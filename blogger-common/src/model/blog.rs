use crate::model::{Id, user::UserHandle};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::Display;
use thiserror::Error;

pub const BLOG_NAME_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BlogMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Blog {
    pub id: Id<BlogMarker>,
    pub owner: UserHandle,
    /// Handles allowed to write posts.
    pub authors: Vec<String>,
    pub name: BlogName,
}

impl Blog {
    /// Whether `handle` may create and edit posts in this blog.
    #[must_use]
    pub fn has_author(&self, handle: &UserHandle) -> bool {
        self.authors.iter().any(|author| author == handle.get())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreateBlog {
    pub owner: UserHandle,
    pub name: BlogName,
}

impl CreateBlog {
    /// The author list a new blog starts out with: its owner.
    #[must_use]
    pub fn initial_authors(&self) -> Vec<String> {
        vec![self.owner.get().to_owned()]
    }
}

/// Unique lookup key of a blog.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct BlogName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The blog name is invalid: {0:?}")]
pub struct InvalidBlogNameError(String);

impl BlogName {
    pub fn new(name: String) -> Result<Self, InvalidBlogNameError> {
        if (1..=BLOG_NAME_MAX_LEN).contains(&name.chars().count()) {
            Ok(BlogName(name))
        } else {
            Err(InvalidBlogNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for BlogName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlogName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        BlogName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"BlogName"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        blog::{BLOG_NAME_MAX_LEN, Blog, BlogName, CreateBlog},
        user::UserHandle,
    };

    #[test]
    fn blog_name_bounds() {
        assert!(BlogName::new("travel".to_owned()).is_ok());
        assert!(BlogName::new("b".repeat(BLOG_NAME_MAX_LEN)).is_ok());
        assert!(BlogName::new(String::new()).is_err());
        assert!(BlogName::new("b".repeat(BLOG_NAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn owner_is_first_author() {
        let owner = UserHandle::new("ada".to_owned()).unwrap();
        let create = CreateBlog {
            owner: owner.clone(),
            name: BlogName::new("engines".to_owned()).unwrap(),
        };
        let blog = Blog {
            authors: create.initial_authors(),
            owner,
            name: create.name.clone(),
            ..Blog::default()
        };

        assert!(blog.has_author(&UserHandle::new("ada".to_owned()).unwrap()));
        assert!(!blog.has_author(&UserHandle::new("charles".to_owned()).unwrap()));
    }
}
