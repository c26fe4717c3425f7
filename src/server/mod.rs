//! Server module for MineCord
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `bots`: Bots file persistence
//! - `shutdown`: Signal handling
//! - `init`: Main server initialization and run loop

pub mod bots;
pub mod config;
mod init;
mod loader;
pub mod shutdown;

// Re-export public API
pub use init::run;
pub use loader::{load_config, resolve_endpoints};
