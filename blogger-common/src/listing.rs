//! Paging of post listings and the tag sidebar.

use serde::Deserialize;

pub const PAGE_SIZE: usize = 10;

/// Rule deciding which page numbers are served rather than redirected.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageBound {
    /// Pages up to `(total % 10) + 1`. Historical behaviour: it rejects real
    /// pages once a listing grows past 20 posts and accepts empty ones.
    #[default]
    Legacy,
    /// Pages up to the last one holding posts. Page 0 is always served.
    PageCount,
}

impl PageBound {
    /// Largest page number served for a listing of `total` posts.
    #[must_use]
    pub fn max_page(self, total: usize) -> usize {
        match self {
            PageBound::Legacy => total % PAGE_SIZE + 1,
            PageBound::PageCount => total.div_ceil(PAGE_SIZE).saturating_sub(1),
        }
    }
}

/// One page of a listing.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub newer_pages: bool,
    pub older_pages: bool,
}

/// Cuts page `page` out of `items`, which must already be ordered newest
/// first. Returns `None` when `bound` rejects the page number.
#[must_use]
pub fn paginate<T>(mut items: Vec<T>, page: i64, bound: PageBound) -> Option<Page<T>> {
    let total = items.len();
    let page = usize::try_from(page).ok()?;
    if page > bound.max_page(total) {
        return None;
    }

    let start = page.saturating_mul(PAGE_SIZE).min(total);
    let end = start.saturating_add(PAGE_SIZE).min(total);
    let older_pages = total > PAGE_SIZE.saturating_mul(page + 1);

    items.truncate(end);
    let items = items.split_off(start);

    Some(Page {
        items,
        page,
        newer_pages: page > 0,
        older_pages,
    })
}

/// Every distinct non-empty tag across `tag_lists`, in first-seen order.
#[must_use]
pub fn merge_tags<'a, I, L>(tag_lists: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = &'a String>,
{
    let mut merged: Vec<String> = Vec::new();
    for tag in tag_lists.into_iter().flatten() {
        if !tag.is_empty() && !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{PAGE_SIZE, PageBound, merge_tags, paginate};

    fn numbers(count: usize) -> Vec<usize> {
        (0..count).collect()
    }

    #[test]
    fn pages_are_slices_of_ten() {
        let page = paginate(numbers(25), 1, PageBound::Legacy).unwrap();
        assert_eq!(page.items, (10..20).collect::<Vec<_>>());
        assert!(page.newer_pages);
        assert!(page.older_pages);

        let last = paginate(numbers(25), 2, PageBound::Legacy).unwrap();
        assert_eq!(last.items, (20..25).collect::<Vec<_>>());
        assert!(last.newer_pages);
        assert!(!last.older_pages);
    }

    #[test]
    fn first_page_flags() {
        let page = paginate(numbers(10), 0, PageBound::Legacy).unwrap();
        assert_eq!(page.items.len(), PAGE_SIZE);
        assert!(!page.newer_pages);
        assert!(!page.older_pages);

        let page = paginate(numbers(11), 0, PageBound::Legacy).unwrap();
        assert!(page.older_pages);
    }

    #[test]
    fn empty_listing_serves_first_page() {
        for bound in [PageBound::Legacy, PageBound::PageCount] {
            let page = paginate(Vec::<u8>::new(), 0, bound).unwrap();
            assert!(page.items.is_empty());
            assert!(!page.newer_pages);
            assert!(!page.older_pages);
        }
    }

    #[test]
    fn negative_page_is_rejected() {
        assert!(paginate(numbers(5), -1, PageBound::Legacy).is_none());
        assert!(paginate(numbers(5), -1, PageBound::PageCount).is_none());
    }

    #[test]
    fn legacy_bound_uses_remainder() {
        // 30 posts: 30 % 10 + 1 = 1, so the real page 2 is refused.
        assert!(paginate(numbers(30), 1, PageBound::Legacy).is_some());
        assert!(paginate(numbers(30), 2, PageBound::Legacy).is_none());
        // 5 posts: pages up to 6 are served even though only page 0 has posts.
        let empty = paginate(numbers(5), 6, PageBound::Legacy).unwrap();
        assert!(empty.items.is_empty());
        assert!(paginate(numbers(5), 7, PageBound::Legacy).is_none());
    }

    #[test]
    fn page_count_bound_serves_every_real_page() {
        assert!(paginate(numbers(30), 2, PageBound::PageCount).is_some());
        assert!(paginate(numbers(30), 3, PageBound::PageCount).is_none());
        assert!(paginate(numbers(31), 3, PageBound::PageCount).is_some());
        assert!(paginate(numbers(5), 1, PageBound::PageCount).is_none());
    }

    #[test]
    fn tags_merge_in_first_seen_order() {
        let lists = [
            vec!["rust".to_owned(), "web".to_owned()],
            vec![],
            vec!["web".to_owned(), String::new(), "db".to_owned()],
            vec!["rust".to_owned()],
        ];

        assert_eq!(merge_tags(&lists), ["rust", "web", "db"]);
    }
}
