//! Builds the RSS 2.0 channel of a blog.

use crate::{
    links::{blog_query, post_query},
    model::{blog::Blog, post::Post},
};
use rss::{Category, Channel, Enclosure, Guid, Item};
use time::format_description::well_known::Rfc2822;
use url::Url;

pub const FEED_TITLE: &str = "Rss blog feed";

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed link could not be built: {0}")]
    Link(#[from] url::ParseError),
}

/// One item per post, in the order given. Callers pass posts newest edit
/// first.
pub fn build_feed(public_url: &Url, blog: &Blog, posts: &[Post]) -> Result<Channel> {
    let name = blog.name.get();

    let mut channel = Channel::default();
    channel.set_title(FEED_TITLE);
    channel.set_link(public_url.join(&format!("?{}", blog_query(name)))?.to_string());
    channel.set_description(format!("This is a simple feed of blog {name}"));
    channel.set_managing_editor(blog.authors.first().cloned());

    let items = posts
        .iter()
        .map(|post| feed_item(public_url, post))
        .collect::<Result<Vec<_>>>()?;
    channel.set_items(items);

    Ok(channel)
}

fn feed_item(public_url: &Url, post: &Post) -> Result<Item> {
    let link = public_url
        .join(&format!("viewpost?{}", post_query(post.blog_name.get(), post.id)))?
        .to_string();

    let mut guid = Guid::default();
    guid.set_value(post.id.to_string());
    guid.set_permalink(false);

    let mut item = Item::default();
    item.set_title(post.title.clone());
    item.set_link(link);
    item.set_guid(guid);
    item.set_author(post.author.get().to_owned());
    item.set_description(post.content.clone());
    item.set_pub_date(post.created_at.format(&Rfc2822).ok());
    item.set_categories(
        post.tags
            .iter()
            .filter(|tag| !tag.is_empty())
            .map(|tag| {
                let mut category = Category::default();
                category.set_name(tag.clone());
                category
            })
            .collect::<Vec<_>>(),
    );
    item.set_enclosure(post.image_urls.first().map(|url| image_enclosure(url)));

    Ok(item)
}

fn image_enclosure(url: &str) -> Enclosure {
    let extension = url.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    };

    let mut enclosure = Enclosure::default();
    enclosure.set_url(url);
    enclosure.set_length("0");
    enclosure.set_mime_type(mime_type);
    enclosure
}

#[cfg(test)]
mod tests {
    use super::{FEED_TITLE, build_feed};
    use crate::model::{
        Id,
        blog::{Blog, BlogName},
        post::Post,
        user::UserHandle,
    };
    use time::macros::utc_datetime;
    use url::Url;

    fn blog() -> Blog {
        Blog {
            id: Id::from(1_u64),
            owner: UserHandle::new("ada".to_owned()).unwrap(),
            authors: vec!["ada".to_owned(), "charles".to_owned()],
            name: BlogName::new("engines".to_owned()).unwrap(),
        }
    }

    fn post(id: u64, title: &str) -> Post {
        Post {
            id: Id::from(id),
            blog: Id::from(1_u64),
            blog_name: BlogName::new("engines".to_owned()).unwrap(),
            title: title.to_owned(),
            author: UserHandle::new("ada".to_owned()).unwrap(),
            content: "<b>hi</b>".to_owned(),
            source: "<b>hi</b>".to_owned(),
            image_urls: vec!["http://localhost/blobs/a.png".to_owned()],
            created_at: utc_datetime!(2025-03-01 09:30),
            edited_at: utc_datetime!(2025-03-02 09:30),
            tags: vec!["x".to_owned(), String::new()],
            views: Some(0),
        }
    }

    #[test]
    fn channel_describes_blog() {
        let public_url = Url::parse("http://localhost:8080/").unwrap();
        let channel = build_feed(&public_url, &blog(), &[post(9, "B"), post(3, "A")]).unwrap();

        assert_eq!(channel.title(), FEED_TITLE);
        assert_eq!(channel.link(), "http://localhost:8080/?blog_name=engines");
        assert_eq!(channel.description(), "This is a simple feed of blog engines");
        assert_eq!(channel.managing_editor(), Some("ada"));

        let titles: Vec<_> = channel.items().iter().map(|item| item.title()).collect();
        assert_eq!(titles, [Some("B"), Some("A")]);
    }

    #[test]
    fn item_fields() {
        let public_url = Url::parse("http://localhost:8080/").unwrap();
        let channel = build_feed(&public_url, &blog(), &[post(9, "B")]).unwrap();
        let item = &channel.items()[0];

        assert_eq!(
            item.link(),
            Some("http://localhost:8080/viewpost?blog_name=engines&post_id=9")
        );
        assert_eq!(item.guid().map(|guid| guid.value()), Some("9"));
        assert_eq!(item.description(), Some("<b>hi</b>"));
        assert_eq!(item.pub_date(), Some("Sat, 01 Mar 2025 09:30:00 +0000"));
        assert_eq!(item.categories().len(), 1);
        assert_eq!(
            item.enclosure().map(|enclosure| enclosure.mime_type()),
            Some("image/png")
        );
    }

    #[test]
    fn empty_blog_has_no_items() {
        let public_url = Url::parse("http://localhost:8080/").unwrap();
        let channel = build_feed(&public_url, &blog(), &[]).unwrap();

        assert!(channel.items().is_empty());
        assert!(channel.to_string().contains("<title>Rss blog feed</title>"));
    }
}
