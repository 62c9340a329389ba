//! # chat-cli
//!
//! Terminal front-end: signs in the configured identity, prints the roster
//! and the message feed as they change, and turns stdin lines into commands.

pub mod app;
pub mod commands;
pub mod render;

pub use app::run;
pub use commands::Command;
