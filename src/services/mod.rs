pub mod fetch_service;
pub mod notification_service;
pub mod publisher;
pub mod source_service;

pub use fetch_service::{FetchReport, FetchService};
pub use notification_service::{NotificationService, TickOutcome};
pub use publisher::{ChannelPublisher, MessageSender};
pub use source_service::SourceService;
