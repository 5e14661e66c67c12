//! Telegram front end for the aurora Kp alert engine.
//!
//! Wires [`aurora_alerts`] to the Bot API: chat commands are answered from
//! the live feeds and storm alerts are pushed to a configured channel.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod error;
pub mod poller;
pub mod telegram;

pub use commands::{Command, CommandRouter};
pub use config::Cli;
pub use error::{BotError, Result};
pub use poller::{PollerHandle, UpdatePoller};
pub use telegram::{TelegramClient, Update, UpdateSource};
