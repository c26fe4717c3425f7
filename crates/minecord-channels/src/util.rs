//! Common utilities for the chat side

/// Maximum length of text to log
pub const MAX_LOG_TEXT_LENGTH: usize = 50;

/// Discord chunk size in characters (the hard limit is 2000; leave room for formatting)
pub const DISCORD_MESSAGE_LIMIT: usize = 1800;

/// Patterns that indicate potentially sensitive content
pub const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "bearer",
    "authorization",
    "/login",
    "/register",
];

/// Mask potentially sensitive text for logging
///
/// Chat relayed into the game may carry in-game passwords (`/login <pw>`),
/// so matching lines are redacted and long lines truncated.
///
/// # Examples
/// ```
/// use minecord_channels::util::mask_for_logging;
///
/// assert!(mask_for_logging("!mc cmd /login hunter2").contains("REDACTED"));
/// assert_eq!(mask_for_logging("!mc bots"), "!mc bots");
/// ```
#[must_use]
pub fn mask_for_logging(text: &str) -> String {
    let lower = text.to_lowercase();

    for pattern in SENSITIVE_PATTERNS {
        if lower.contains(pattern) {
            return "[REDACTED - potentially sensitive content]".to_string();
        }
    }

    if text.chars().count() > MAX_LOG_TEXT_LENGTH {
        let head: String = text.chars().take(MAX_LOG_TEXT_LENGTH).collect();
        format!("{}...[truncated]", head)
    } else {
        text.to_string()
    }
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Splits on character boundaries, never inside a UTF-8 sequence. Empty text
/// yields no chunks.
///
/// # Examples
/// ```
/// use minecord_channels::util::split_into_chunks;
///
/// assert_eq!(split_into_chunks("abcdef", 4), vec!["abcd", "ef"]);
/// assert!(split_into_chunks("", 4).is_empty());
/// ```
#[must_use]
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
