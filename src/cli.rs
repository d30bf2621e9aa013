//! Command-line interface definition for Parlance
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for account management, plan selection, interactive
//! chat, and conversation history.

use clap::{Parser, Subcommand};

/// Parlance - Terminal chat client
///
/// Chat with a hosted AI completion endpoint, with local accounts,
/// subscription plans, and persistent named conversations.
#[derive(Parser, Debug, Clone)]
#[command(name = "parlance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the completion endpoint URL
    #[arg(long, env = "PARLANCE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Override the conversation database path
    #[arg(long, env = "PARLANCE_DB")]
    pub db_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parlance
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new account
    Signup {
        /// Email address for the new account
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Log in to an existing account
    Login {
        /// Email address of the account
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Log out of the current account
    Logout,

    /// Select a subscription plan (free or pro)
    Plan {
        /// Plan tier to select
        tier: String,
    },

    /// Start interactive chat mode
    Chat {
        /// Resume a stored conversation by ID (or 8-char prefix)
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Manage conversation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Conversation history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations
    List,

    /// Delete a conversation by ID (or 8-char prefix)
    Delete {
        /// Conversation ID
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
