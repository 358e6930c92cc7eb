use crate::processing::RecencyFilter;
use crate::types::{Candidate, PipelineError, Result};
use crate::utils::text::{first_img_src, html_to_text, truncate_summary};
use chrono::FixedOffset;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

/// Turns raw RSS/Atom documents into normalised `Candidate`s. Nothing
/// feed-shaped leaves this module.
pub struct FeedParser {
    display_offset: FixedOffset,
}

impl FeedParser {
    pub fn new(display_offset: FixedOffset) -> Self {
        Self { display_offset }
    }

    /// Parse `content`, keeping at most `max_items` entries that pass
    /// `recency`. Entries without a title are dropped.
    pub fn parse_candidates(
        &self,
        content: &str,
        source_id: &str,
        max_items: usize,
        recency: &RecencyFilter,
    ) -> Result<Vec<Candidate>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut seen_links = HashSet::new();
        let mut candidates = Vec::new();
        let mut stale = 0;

        for entry in feed.entries {
            if candidates.len() >= max_items {
                break;
            }

            let Some(candidate) = self.normalize_entry(entry, source_id) else {
                continue;
            };

            if !recency.admits(&candidate) {
                stale += 1;
                continue;
            }

            if !candidate.link.is_empty() && !seen_links.insert(candidate.link.clone()) {
                debug!("Skipping duplicate entry with link: {}", candidate.link);
                continue;
            }

            candidates.push(candidate);
        }

        info!(
            "Parsed {} candidates from {} ({} stale skipped)",
            candidates.len(),
            source_id,
            stale
        );
        Ok(candidates)
    }

    fn normalize_entry(&self, entry: feed_rs::model::Entry, source_id: &str) -> Option<Candidate> {
        let title = entry
            .title
            .as_ref()
            .map(|t| html_to_text(&t.content))
            .unwrap_or_default();
        if title.is_empty() {
            debug!("Dropping entry without title from {}", source_id);
            return None;
        }

        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default();

        let summary_html = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .unwrap_or_default();
        let summary = truncate_summary(&html_to_text(&summary_html));

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&self.display_offset));

        let image_ref = Self::image_from_media(&entry)
            .or_else(|| first_img_src(&summary_html))
            .unwrap_or_default();

        Some(Candidate {
            source_id: source_id.to_string(),
            title,
            summary,
            link,
            published_at,
            image_ref,
        })
    }

    /// Image-typed media content, then thumbnails. RSS enclosures arrive
    /// here as media content.
    fn image_from_media(entry: &feed_rs::model::Entry) -> Option<String> {
        let content = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find(|c| {
                c.content_type
                    .as_ref()
                    .map(|ct| ct.essence_str().starts_with("image/"))
                    .unwrap_or(false)
            })
            .and_then(|c| c.url.as_ref().map(|u| u.to_string()));

        content.or_else(|| {
            entry
                .media
                .iter()
                .flat_map(|m| m.thumbnails.iter())
                .map(|t| t.image.uri.clone())
                .find(|uri| !uri.is_empty())
        })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf")
            || content_lower.contains("<channel")
    }
}
