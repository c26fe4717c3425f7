//! Reply and relay text

use chrono::{DateTime, Utc};
use minecord_core::{ConnectionEvent, ConnectionStatus, Phase};

/// Reply after chat was delivered
pub const SENT_CHAT: &str = "✅ Sent to Minecraft chat.";
/// Reply after a command was delivered
pub const SENT_COMMAND: &str = "✅ Command sent to Minecraft.";
/// Reply when a `cmd` body is not a slash command
pub const COMMAND_NEEDS_SLASH: &str = "❌ Commands must start with `/` (example: `!mc cmd /list`).";

/// Compact duration, e.g. `45s`, `3m 05s`, `2h 07m`, `1d 04h`
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1_000;
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3_600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{}d {:02}h", days, hours)
    } else if hours > 0 {
        format!("{}h {:02}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Chat text for a bus event, or `None` when the event is not relayed
#[must_use]
pub fn relay_text(event: &ConnectionEvent) -> Option<String> {
    match event {
        ConnectionEvent::Chat { text } => Some(format!("🟩 {}", text)),
        ConnectionEvent::Status { text } => Some(format!("**{}**", text)),
        ConnectionEvent::PhaseChanged { .. } => None,
    }
}

fn phase_icon(phase: Phase) -> &'static str {
    match phase {
        Phase::Connected => "🟢",
        Phase::Connecting => "🟡",
        Phase::Disconnected => "🔴",
        Phase::Idle | Phase::Stopped => "⚪",
    }
}

/// One line of the `bots` listing
#[must_use]
pub fn list_line(status: &ConnectionStatus, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "{} **{}**: {}",
        phase_icon(status.phase),
        status.name,
        status.phase
    );
    if status.phase == Phase::Connected {
        line.push_str(&format!(" (up {})", format_duration(status.up_for_ms)));
    } else if let Some(ms) = status.retry_in_ms(now) {
        line.push_str(&format!(" (retry in {})", format_duration(ms)));
    }
    line
}

/// The `bots` listing, config order
#[must_use]
pub fn list_reply(statuses: &[ConnectionStatus], now: DateTime<Utc>) -> String {
    if statuses.is_empty() {
        return "No bots configured.".to_string();
    }
    let mut out = format!("**Bots ({})**", statuses.len());
    for status in statuses {
        out.push('\n');
        out.push_str(&list_line(status, now));
    }
    out
}

/// The `status` block for one endpoint
#[must_use]
pub fn status_block(status: &ConnectionStatus, now: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("{} **{}**: {}", phase_icon(status.phase), status.name, status.phase),
        format!("Server: `{}:{}`", status.host, status.port),
    ];
    if status.phase == Phase::Connected {
        lines.push(format!("Uptime: {}", format_duration(status.up_for_ms)));
    } else if let Some(ms) = status.retry_in_ms(now) {
        lines.push(format!(
            "Next retry: in {} (attempt {})",
            format_duration(ms),
            status.reconnect_count
        ));
    }
    if let Some(reason) = &status.last_kick_reason {
        lines.push(format!("Last kick: {}", reason));
    }
    if let Some(error) = &status.last_error {
        lines.push(format!("Last error: {}", error));
    }
    if status.queued > 0 {
        lines.push(format!("Queued: {}", status.queued));
    }
    lines.join("\n")
}

/// Usage summary listing every subcommand
#[must_use]
pub fn usage() -> String {
    [
        "**MineCord commands**",
        "- `!mc bots` (or `!mc list`): all bots and their state",
        "- `!mc status`: state of this channel's bot",
        "- `!mc reconnect`: reconnect this channel's bot now",
        "- `!mc say [bot] <text>`: send chat",
        "- `!mc cmd [bot] /command`: run a command",
    ]
    .join("\n")
}

/// Usage line for `say`
#[must_use]
pub fn say_usage() -> String {
    "Usage: `!mc say [bot] <text>`".to_string()
}

/// Usage line for `cmd`
#[must_use]
pub fn cmd_usage() -> String {
    "Usage: `!mc cmd [bot] /command`".to_string()
}

/// Reply when the channel maps to no endpoint
#[must_use]
pub fn not_linked() -> String {
    "❌ This channel is not linked to a bot. Name one explicitly, e.g. `!mc say <bot> <text>`."
        .to_string()
}

/// Reply when the channel maps to several endpoints
#[must_use]
pub fn ambiguous(names: &[String]) -> String {
    format!(
        "❌ This channel is linked to several bots ({}). Name one explicitly, e.g. `!mc say <bot> <text>`.",
        names.join(", ")
    )
}
