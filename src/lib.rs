//! Polls a Minecraft server status API and posts a Discord notification
//! whenever the server goes up or down, changes version or gamemode, or
//! players join and leave.

pub mod compose;
pub mod config;
pub mod debounce;
pub mod detector;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod roster;
pub mod snapshot;
pub mod store;
pub mod worker;

pub use config::Config;
pub use error::Error;
pub use worker::monitor_server;
