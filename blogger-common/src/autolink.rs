//! Turns bare URLs in submitted post text into markup.
//!
//! Image URLs become `<img>` tags. Only when the text has no image URL at all
//! are the remaining URLs wrapped in `<a>` tags, so an image URL is never
//! linked as well.

use once_cell::sync::Lazy;
use regex::Regex;

/// URL characters are word characters, `.` and `/`.
static IMAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://[A-Za-z0-9_./]+(png|PNG|jpg|JPG|gif|GIF))")
        .expect("invalid image url regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://[A-Za-z0-9_./]+)").expect("invalid url regex"));

#[must_use]
pub fn autolink(raw: &str) -> String {
    if IMAGE_URL_RE.is_match(raw) {
        IMAGE_URL_RE
            .replace_all(raw, r#"<img src="${1}">"#)
            .into_owned()
    } else {
        URL_RE
            .replace_all(raw, r#"<a href="${1}">${1}</a>"#)
            .into_owned()
    }
}
