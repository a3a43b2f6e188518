pub mod traits;
pub mod rss;
pub mod registry;

pub use traits::{FeedMetadata, FeedSource, SourceBuilder};
pub use rss::RssSource;
pub use registry::SourceRegistry;
