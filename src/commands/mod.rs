//! Command handlers for the CLI subcommands

pub mod account;
pub mod chat;
pub mod history;
pub mod special_commands;
