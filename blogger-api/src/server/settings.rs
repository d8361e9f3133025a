use blogger_common::{listing::PageBound, util::PositiveDuration};
use url::Url;

/// Runtime knobs the handlers read.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Settings {
    /// Absolute base of links leaving the site, ending in `/`.
    pub public_url: Url,
    pub page_bound: PageBound,
    /// `None` keeps sessions until sign-out.
    pub session_ttl: Option<PositiveDuration>,
}

impl Settings {
    #[must_use]
    pub fn new(
        mut public_url: Url,
        page_bound: PageBound,
        session_ttl: Option<PositiveDuration>,
    ) -> Self {
        if !public_url.path().ends_with('/') {
            let path = format!("{}/", public_url.path());
            public_url.set_path(&path);
        }

        Self {
            public_url,
            page_bound,
            session_ttl,
        }
    }
}
