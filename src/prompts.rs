//! Fixed texts shown in place of backend content.

/// Seeds every fresh conversation and replaces history that could not be loaded.
pub const GREETING: &str =
    "Hey there! I'm here to listen. Do you feel like sharing a memory or telling me a story?";

/// Shown as the assistant's reply when a query could not be answered.
pub const APOLOGY: &str = "I apologize, but I encountered an error. Please try again.";

pub const COMPOSER_PLACEHOLDER: &str = "Type a message and press Enter...";

pub const COMPOSER_TITLE: &str = "💬 Message - / for commands, Tab for chats";
