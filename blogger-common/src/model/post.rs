use crate::{
    autolink::autolink,
    model::{
        Id,
        blog::{BlogMarker, BlogName},
        user::UserHandle,
    },
};
use time::UtcDateTime;

/// Most images one submission can attach.
pub const MAX_SUBMITTED_IMAGES: usize = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub blog: Id<BlogMarker>,
    pub blog_name: BlogName,
    pub title: String,
    pub author: UserHandle,
    /// Markup shown to readers.
    pub content: String,
    /// The text as typed, before URLs were turned into markup. Edit forms
    /// start from this.
    pub source: String,
    pub image_urls: Vec<String>,
    pub created_at: UtcDateTime,
    pub edited_at: UtcDateTime,
    pub tags: Vec<String>,
    /// `None` only for posts written before counting existed.
    pub views: Option<i64>,
}

impl Post {
    /// Overwrites the editable fields with `draft`. Images accumulate.
    pub fn apply(&mut self, draft: &PostDraft, edited_at: UtcDateTime) {
        self.title.clone_from(&draft.title);
        self.author = draft.author.clone();
        self.content.clone_from(&draft.content);
        self.source.clone_from(&draft.source);
        self.image_urls.extend(draft.image_urls.iter().cloned());
        self.tags.clone_from(&draft.tags);
        self.edited_at = edited_at;
    }

    /// The tag list in the form the edit form expects back.
    #[must_use]
    pub fn joined_tags(&self) -> String {
        self.tags.join(",")
    }
}

/// What one submission of the post form writes.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostDraft {
    pub title: String,
    pub author: UserHandle,
    pub content: String,
    pub source: String,
    pub image_urls: Vec<String>,
    pub tags: Vec<String>,
}

impl PostDraft {
    #[must_use]
    pub fn from_submission(
        title: String,
        author: UserHandle,
        source: String,
        raw_tags: &str,
        image_urls: Vec<String>,
    ) -> Self {
        Self {
            title,
            author,
            content: autolink(&source),
            source,
            image_urls,
            tags: split_tags(raw_tags),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub blog: Id<BlogMarker>,
    pub blog_name: BlogName,
    pub draft: PostDraft,
}

/// Splits on every comma. Whitespace and duplicates are kept as typed.
#[must_use]
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_owned).collect()
}
