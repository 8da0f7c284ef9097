//! URL helpers for Card-Harvest
//!
//! The target site emits root-relative links (`/Cards/E53-021`) and image
//! sources; this module resolves them against the configured base and derives
//! the filesystem-safe identifiers used by the page store.

use url::Url;

/// Resolves a root-relative href against the site base
///
/// Absolute URLs and non-root-relative values are returned trimmed but
/// otherwise untouched, so `data:` sources and foreign hosts survive as-is.
///
/// # Examples
///
/// ```
/// use card_harvest::url::absolutize;
/// use url::Url;
///
/// let base = Url::parse("https://cards.example.com").unwrap();
/// assert_eq!(absolutize(&base, "/Cards/E53-021"), "https://cards.example.com/Cards/E53-021");
/// assert_eq!(absolutize(&base, "https://cdn.example.com/a.png"), "https://cdn.example.com/a.png");
/// ```
pub fn absolutize(base: &Url, href: &str) -> String {
    let href = href.trim();

    if href.starts_with('/') {
        if let Ok(joined) = base.join(href) {
            return joined.to_string();
        }
    }

    href.to_string()
}

/// Replaces every character outside `[A-Za-z0-9]` with `_`
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Last non-empty path segment of a URL, ignoring query and fragment
pub fn last_path_segment(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or("");
    let without_query = without_fragment.split('?').next().unwrap_or("");
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}

/// Identifier of a package page, e.g. `B01` for `https://site/Package/B01#top`
pub fn package_id(url: &str) -> String {
    sanitize_segment(last_path_segment(url))
}

/// Filename stem for a detail page cache entry
///
/// Prefers the card number; falls back to a slug of the URL's last segment and
/// finally to `detail`.
pub fn detail_stem(detail_url: &str, card_number: &str) -> String {
    let number: String = card_number
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !number.is_empty() {
        return number;
    }

    let slug = sanitize_segment(last_path_segment(detail_url));
    if slug.is_empty() {
        "detail".to_string()
    } else {
        slug
    }
}
