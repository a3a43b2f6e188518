use std::time::Duration;

use chrono::{DateTime, Utc};

/// How far back the notifier looks for unpublished articles.
///
/// An article dated `t` is eligible at `now` iff `now - t <= width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    width: Duration,
}

impl FreshnessWindow {
    pub fn new(width: Duration) -> Self {
        Self { width }
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Oldest publication time still inside the window
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.width)
            .ok()
            .and_then(|width| now.checked_sub_signed(width))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn contains(&self, pub_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        pub_date >= self.start(now)
    }
}
