/// Text processing utilities
pub mod text {
    use crate::types::{SUMMARY_MAX_CHARS, TRUNCATION_MARKER};
    use scraper::{Html, Selector};

    /// Text nodes of an HTML fragment, entities decoded and whitespace
    /// collapsed.
    pub fn html_to_text(html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let words: Vec<&str> = fragment
            .root_element()
            .text()
            .flat_map(str::split_whitespace)
            .collect();
        words.join(" ")
    }

    /// Cap a summary at `SUMMARY_MAX_CHARS` characters, ending truncated
    /// text with `TRUNCATION_MARKER`.
    pub fn truncate_summary(text: &str) -> String {
        if text.chars().count() <= SUMMARY_MAX_CHARS {
            return text.to_string();
        }

        let keep = SUMMARY_MAX_CHARS - TRUNCATION_MARKER.chars().count();
        let mut truncated: String = text.chars().take(keep).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    }

    /// `src` of the first `<img>` in an HTML fragment that has one.
    pub fn first_img_src(html: &str) -> Option<String> {
        let selector = Selector::parse("img[src]").ok()?;
        let fragment = Html::parse_fragment(html);
        let src = fragment
            .select(&selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string);
        src
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract host from URL
    pub fn extract_host(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }

    pub fn is_http_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}

/// Hashing helpers for stable object names
pub mod hash {
    use sha2::{Digest, Sha256};

    /// Hex SHA-256 of `text`, shortened to `len` hex characters.
    pub fn short_sha256(text: &str, len: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..len.min(digest.len())].to_string()
    }
}
