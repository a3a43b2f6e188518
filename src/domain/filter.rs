use super::Item;

/// Case-insensitive keyword filter over an item's title, summary and categories.
///
/// An empty filter accepts everything.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, item: &Item) -> bool {
        if self.keywords.is_empty() {
            return true;
        }

        let title = item.title.to_lowercase();
        let summary = item.summary.to_lowercase();
        let categories: Vec<String> = item.categories.iter().map(|c| c.to_lowercase()).collect();

        self.keywords.iter().any(|keyword| {
            title.contains(keyword.as_str())
                || summary.contains(keyword.as_str())
                || categories.iter().any(|c| c.contains(keyword.as_str()))
        })
    }
}
