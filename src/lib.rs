//! Parlance is a terminal chat client with streamed replies, local
//! conversation history, and trial-plan message quotas.

pub mod account;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod provider;
pub mod storage;

pub use cli::{Cli, Commands, HistoryCommand};
pub use config::Config;
pub use error::{ParlanceError, Result};
