pub mod source;
pub mod article;
pub mod filter;
pub mod window;
pub mod notification;

pub use source::{NewSource, Source};
pub use article::{html_to_text, Article, Item};
pub use filter::KeywordFilter;
pub use window::FreshnessWindow;
pub use notification::Notification;
