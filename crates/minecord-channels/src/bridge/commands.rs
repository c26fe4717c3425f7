/// Prefix of every bridge command (matched case-insensitively)
pub const COMMAND_PREFIX: &str = "!mc";

/// A parsed `!mc` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    /// `bots` / `list`: every endpoint with its phase
    List,
    /// `status`: detail for the channel's endpoint
    Status,
    /// `reconnect`: reconnect the channel's endpoint now
    Reconnect,
    /// `say [name] <text>`: send chat
    Say {
        /// Explicit endpoint, when the first word names one
        target: Option<String>,
        /// Chat text (may be empty)
        text: String,
    },
    /// `cmd [name] </command>`: send a slash command
    Cmd {
        /// Explicit endpoint, when the first word names one
        target: Option<String>,
        /// Command text (may be empty)
        text: String,
    },
    /// Anything else after the prefix
    Unknown,
}

/// Whether `content` starts with the command prefix as a separate word
#[must_use]
pub fn is_command(content: &str) -> bool {
    strip_prefix(content).is_some()
}

fn strip_prefix(content: &str) -> Option<&str> {
    let content = content.trim_start();
    let head = content.get(..COMMAND_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(COMMAND_PREFIX) {
        return None;
    }
    let rest = &content[COMMAND_PREFIX.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        Some(_) => None,
    }
}

/// Parse a chat message into a [`BridgeCommand`].
///
/// Returns `None` when the message is not a bridge command. For `say` and
/// `cmd`, the first word is taken as the target only when `is_endpoint`
/// accepts it; otherwise the whole remainder is the body.
pub fn parse_command(content: &str, is_endpoint: impl Fn(&str) -> bool) -> Option<BridgeCommand> {
    let rest = strip_prefix(content)?;
    let (sub, args) = split_word(rest);

    let command = match sub.to_ascii_lowercase().as_str() {
        "bots" | "list" => BridgeCommand::List,
        "status" => BridgeCommand::Status,
        "reconnect" => BridgeCommand::Reconnect,
        "say" => {
            let (target, text) = split_target(args, &is_endpoint);
            BridgeCommand::Say { target, text }
        }
        "cmd" => {
            let (target, text) = split_target(args, &is_endpoint);
            BridgeCommand::Cmd { target, text }
        }
        _ => BridgeCommand::Unknown,
    };
    Some(command)
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn split_target(args: &str, is_endpoint: &impl Fn(&str) -> bool) -> (Option<String>, String) {
    let (first, rest) = split_word(args);
    if !first.is_empty() && is_endpoint(first) {
        (Some(first.to_string()), rest.to_string())
    } else {
        (None, args.trim().to_string())
    }
}
