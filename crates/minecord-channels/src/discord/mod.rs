//! Discord - serenity adapter

pub mod adapter;
pub mod config;
pub mod handler;

pub use adapter::DiscordAdapter;
pub use config::DiscordConfig;
