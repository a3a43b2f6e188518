use chrono::{DateTime, Utc};
use scraper::Html;
use serde::{Deserialize, Serialize};

/// A feed entry as returned by a source, before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub categories: Vec<String>,
    pub link: String,
    pub pub_date: DateTime<Utc>,
    pub summary: String,
    pub source_name: String,
}

impl Item {
    pub fn new(link: impl Into<String>, title: impl Into<String>, pub_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            categories: Vec::new(),
            link: link.into(),
            pub_date,
            summary: String::new(),
            source_name: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }
}

/// A stored item tracked through summarization and publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub source_name: String,
    pub title: String,
    pub categories: Vec<String>,
    pub link: String,
    pub pub_date: DateTime<Utc>,
    pub summary: String,
    pub published: bool,
    pub generated_summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Plain text handed to the summarizer. Falls back to the title when the
    /// feed carried no excerpt.
    pub fn text_for_summary(&self) -> String {
        let text = html_to_text(&self.summary);
        if text.is_empty() {
            self.title.trim().to_string()
        } else {
            text
        }
    }
}

/// Extract plain text from HTML content, preserving word boundaries
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_fragment(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        if let Some(text_node) = node.value().as_text() {
            text.push_str(text_node);
        }
        // Block elements separate words even without whitespace in the markup
        if let Some(element) = node.value().as_element() {
            match element.name() {
                "p" | "br" | "div" | "li" => text.push(' '),
                _ => {}
            }
        }
    }

    // Collapse whitespace and trim
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
