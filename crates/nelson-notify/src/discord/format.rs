use nelson_core::NewsItem;

use crate::format::{exceeds_chars, truncate_chars};

/// Forum thread names are capped well below Discord's hard limit.
pub const TITLE_LIMIT: usize = 95;
pub const BODY_LIMIT: usize = 3800;

/// A news item laid out as a forum thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumPost {
    pub title: String,
    pub content: String,
}

/// Lay out `item` as a thread. When `with_image` is set the source link is
/// wrapped in `<>` so Discord does not add its own preview next to the
/// attachment.
#[must_use]
pub fn format_post(item: &NewsItem, with_image: bool) -> ForumPost {
    let mut content = String::new();

    if !item.tags.is_empty() {
        content.push_str(&format!("**Tags**: {}\n\n", item.tags.join(", ")));
    }
    if exceeds_chars(&item.title, TITLE_LIMIT) {
        content.push_str(&format!("**Full title**: {}\n\n", item.title));
    }
    content.push_str(&truncate_chars(&item.body, BODY_LIMIT));

    let link = if with_image {
        format!("<{}>", item.url)
    } else {
        item.url.clone()
    };
    content.push_str(&format!(
        "\n\n**Source**: {} \u{2014} {link}",
        item.provider.display_name()
    ));

    ForumPost {
        title: truncate_chars(&item.title, TITLE_LIMIT),
        content,
    }
}
