//! MineCord Channels - chat side of the bridge
//!
//! This crate connects the chat platform to the connection fleet:
//! - `bridge`: command parsing, channel mapping, reply formatting and the router
//! - `discord`: the serenity adapter (message intake and [`ChatSink`] delivery)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
pub mod discord;
pub mod error;
pub mod message;
pub mod util;

pub use error::{Error, Result};

pub use bridge::{parse_command, BridgeCommand, BridgeRouter, ChannelMap, Resolution};
pub use discord::{DiscordAdapter, DiscordConfig};
pub use message::{ChatSink, InboundMessage};
