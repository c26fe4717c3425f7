//! Bridge - chat commands in, game events out
//!
//! [`parse_command`] turns a `!mc` message into a [`BridgeCommand`],
//! [`ChannelMap`] decides which endpoint a channel talks to, and
//! [`BridgeRouter`] dispatches commands and relays manager events.

pub mod commands;
pub mod format;
pub mod mapping;
pub mod router;

pub use commands::{is_command, parse_command, BridgeCommand, COMMAND_PREFIX};
pub use mapping::{ChannelMap, Resolution};
pub use router::BridgeRouter;
