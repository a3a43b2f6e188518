use std::sync::LazyLock;

use regex::Regex;

use super::Article;

/// Characters Telegram's MarkdownV2 treats as markup
static MARKDOWN_SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([_*\[\]()~`>#+\-=|{}.!\\])").expect("valid regex"));

pub const PARSE_MODE: &str = "MarkdownV2";

/// Longest escaped title or source name kept in a message
pub const MAX_HEADER_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub source_name: String,
    pub title: String,
    pub summary: String,
    pub link: String,
}

impl Notification {
    pub fn from_article(article: &Article, summary: &str) -> Self {
        Self {
            source_name: article.source_name.clone(),
            title: article.title.trim().to_string(),
            summary: summary.trim().to_string(),
            link: article.link.clone(),
        }
    }

    /// MarkdownV2 message of at most `max_chars` characters:
    /// bold title, italic source, summary, link.
    ///
    /// The link is never shortened. Title and source are capped at
    /// [`MAX_HEADER_CHARS`] and the summary takes whatever room is left.
    pub fn format(&self, max_chars: usize) -> String {
        let footer = escape_markdown(&self.link);
        let footer_len = footer.chars().count();
        // blank line between each section
        let room = max_chars.saturating_sub(footer_len + 2);

        let mut head = String::new();
        let title = truncate_escaped(
            &escape_markdown(&self.title),
            MAX_HEADER_CHARS.min(room.saturating_sub(2)),
        );
        if !title.is_empty() {
            head = format!("*{}*", title);
        }

        let source_room = room.saturating_sub(head.chars().count() + 3);
        let source = truncate_escaped(
            &escape_markdown(&self.source_name),
            MAX_HEADER_CHARS.min(source_room),
        );
        if !source.is_empty() {
            if !head.is_empty() {
                head.push('\n');
            }
            head.push_str(&format!("_{}_", source));
        }

        let mut sections = Vec::with_capacity(3);
        if !head.is_empty() {
            sections.push(head);
        }

        if !self.summary.is_empty() {
            let used: usize = sections.iter().map(|s| s.chars().count() + 2).sum();
            let budget = room.saturating_sub(used);
            let summary = truncate_escaped(&escape_markdown(&self.summary), budget);
            if !summary.is_empty() {
                sections.push(summary);
            }
        }

        sections.push(footer);
        sections.join("\n\n")
    }
}

pub fn escape_markdown(text: &str) -> String {
    MARKDOWN_SPECIAL.replace_all(text, r"\$1").into_owned()
}

/// Cut already escaped text to `max_chars`, never leaving a dangling escape
fn truncate_escaped(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let mut cut: String = text.chars().take(max_chars - 1).collect();
    let trailing_slashes = cut.chars().rev().take_while(|c| *c == '\\').count();
    if trailing_slashes % 2 == 1 {
        cut.pop();
    }
    cut.push('…');
    cut
}
