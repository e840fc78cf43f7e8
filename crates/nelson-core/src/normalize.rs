//! Raw record to canonical [`NewsItem`] conversion.
//!
//! Markup is reduced to plain text with paragraph breaks kept, image
//! references are resolved to absolute `http(s)` URLs, and every item gets a
//! deterministic fingerprint that identifies it within its provider.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Html;
use sha2::{Digest, Sha256};
use url::Url;

use crate::item::{NewsItem, RawRecord};
use crate::provider::Provider;

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid br regex"))
}

fn paragraph_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</p\s*>").expect("valid paragraph regex"))
}

fn image_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<img[^>]*>").expect("valid img regex"))
}

fn image_src_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<img[^>]+src\s*=\s*["']([^"']+)["']"#).expect("valid img src regex")
    })
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid blank line regex"))
}

/// Reduce an HTML fragment to readable plain text.
///
/// `<br>` becomes a line break and `</p>` a paragraph break; images are
/// dropped, remaining tags stripped and entities decoded. Runs of blank lines
/// collapse into a single empty line.
#[must_use]
pub fn clean_html(input: &str) -> String {
    let without_cdata = input.replace("<![CDATA[", "").replace("]]>", "");
    let with_breaks = line_break_re().replace_all(&without_cdata, "\n");
    let with_paragraphs = paragraph_end_re().replace_all(&with_breaks, "\n\n");
    let without_images = image_tag_re().replace_all(&with_paragraphs, "");

    let fragment = Html::parse_fragment(&without_images);
    let text: String = fragment.root_element().text().collect();

    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end_matches(|c: char| c.is_whitespace()))
        .collect();
    let joined = lines.join("\n").replace('\u{a0}', " ");

    blank_lines_re()
        .replace_all(joined.trim(), "\n\n")
        .into_owned()
}

/// The `src` of the first `<img>` in an HTML fragment.
#[must_use]
pub fn extract_image_url(html: &str) -> Option<String> {
    image_src_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|src| !src.is_empty())
}

/// Resolve an image reference against the item's link.
///
/// Protocol-relative references get `https:`. Returns `None` for empty,
/// `data:` or otherwise unusable references.
#[must_use]
pub fn resolve_image_url(base: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    let resolved = if let Some(rest) = raw.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else {
        match Url::parse(raw) {
            Ok(url) => url,
            Err(_) => Url::parse(base.trim()).ok()?.join(raw).ok()?,
        }
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Canonical form of an item link: trimmed, fragment removed.
#[must_use]
pub fn canonical_link(link: &str) -> String {
    let trimmed = link.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Deterministic fingerprint of an item: SHA-256 (hex) of the provider's native
/// identifier when present, otherwise of the canonical link.
#[must_use]
pub fn fingerprint(native_id: Option<&str>, link: &str) -> String {
    let key = match native_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => canonical_link(link),
    };
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Parse a feed date in RFC 2822 or RFC 3339 form.
///
/// # Errors
///
/// Returns the RFC 3339 parse error when neither format matches.
pub fn parse_published(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize a single raw record.
///
/// Returns `None` when the record has no title or no link. A date that fails to
/// parse is logged and left empty.
#[must_use]
pub fn normalize_record(raw: RawRecord) -> Option<NewsItem> {
    let title = clean_html(&raw.title).replace('\n', " ");
    let link = raw.link.trim().to_string();
    if title.is_empty() || link.is_empty() {
        tracing::debug!(
            provider = %raw.provider,
            title = %raw.title,
            link = %raw.link,
            "normalize: discarding record without title or link"
        );
        return None;
    }

    let published_at = raw.published.as_deref().and_then(|value| {
        parse_published(value)
            .map_err(|e| {
                tracing::warn!(
                    provider = %raw.provider,
                    value,
                    error = %e,
                    "normalize: unparseable publication date"
                );
            })
            .ok()
    });

    Some(NewsItem {
        provider: raw.provider,
        fingerprint: fingerprint(raw.native_id.as_deref(), &link),
        title,
        body: clean_html(&raw.description),
        images: dedup_preserving_order(
            raw.images
                .iter()
                .filter_map(|img| resolve_image_url(&link, img)),
        ),
        tags: dedup_preserving_order(
            raw.tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        ),
        url: link,
        published_at,
    })
}

/// Normalize every record of a provider, dropping the ones that cannot be.
#[must_use]
pub fn normalize_batch(provider: Provider, records: Vec<RawRecord>) -> Vec<NewsItem> {
    let total = records.len();
    let items: Vec<NewsItem> = records.into_iter().filter_map(normalize_record).collect();
    if items.len() < total {
        tracing::debug!(
            provider = %provider,
            discarded = total - items.len(),
            "normalize: discarded incomplete records"
        );
    }
    items
}

fn dedup_preserving_order(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
