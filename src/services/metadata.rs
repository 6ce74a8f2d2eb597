//! Best-effort page metadata derivation.
//!
//! Titles and favicon URLs are derived from the URL itself rather than
//! fetched from the page; the presentation layer may substitute a richer
//! fetcher. Nothing here ever fails: on any parse problem the URL string
//! itself becomes the title.

use url::Url;

/// Page metadata derived from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub favicon_url: Option<String>,
}

/// Returns true when `s` parses as an absolute http/https URL.
pub fn is_valid_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => url.scheme() == "http" || url.scheme() == "https",
        Err(_) => false,
    }
}

/// Host of the URL with a leading `www.` stripped, e.g.
/// `https://www.rust-lang.org/learn` → `rust-lang.org`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Derives display metadata for a URL. Best-effort and total: a URL that
/// does not parse yields itself as the title and no favicon.
pub fn fetch_metadata(url: &str) -> PageMetadata {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => {
            return PageMetadata {
                title: url.to_string(),
                favicon_url: None,
            }
        }
    };

    let host = match parsed.host_str() {
        Some(host) => host,
        None => {
            return PageMetadata {
                title: url.to_string(),
                favicon_url: None,
            }
        }
    };

    PageMetadata {
        title: host.strip_prefix("www.").unwrap_or(host).to_string(),
        favicon_url: Some(format!(
            "https://www.google.com/s2/favicons?domain={}&sz=64",
            host
        )),
    }
}
