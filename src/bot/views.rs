use channels::Message;

use crate::bot::CommandView;

/// Reply to `/start` and `/help`
pub fn start_view() -> CommandView {
    std::sync::Arc::new(|_message: &Message| {
        "Hello! I watch a set of news feeds, summarize fresh articles and post \
         them to the channel one at a time.\n\nCommands:\n/start - show this message\n/help - show this message"
            .to_string()
    })
}
