//! Slash-command parser for interactive chat
//!
//! Commands manage the conversation collection from inside the chat loop:
//! starting a new chat, listing and switching conversations, deleting,
//! and checking quota status.

use colored::Colorize;
use std::fmt;

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a fresh conversation (`/new`)
    NewChat,

    /// List stored conversations (`/list`)
    ListChats,

    /// Switch to a stored conversation (`/switch <id>`)
    Switch(String),

    /// Delete a stored conversation (`/delete <id>`)
    DeleteChat(String),

    /// Show quota status for the current user (`/quota`)
    Quota,

    /// Display help information (`/help`)
    Help,

    /// Leave the chat loop (`exit` or `quit`)
    Exit,

    /// Not a command; treat the input as a chat message
    None,
}

/// Errors from command parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A command that requires an argument was given none
    MissingArgument {
        /// The command name
        command: String,
        /// Usage string shown to the user
        usage: String,
    },

    /// Input started with `/` but matched no known command
    UnknownCommand(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { command, usage } => {
                write!(f, "{} requires an argument. Usage: {}", command, usage)
            }
            Self::UnknownCommand(command) => {
                write!(f, "Unknown command: {}. Type /help for a list.", command)
            }
        }
    }
}

/// Parse user input into a special command
///
/// Input that does not start with `/` (and is not `exit`/`quit`) is
/// `SpecialCommand::None` and should be submitted as a chat message.
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        "/new" => Ok(SpecialCommand::NewChat),
        "/list" => Ok(SpecialCommand::ListChats),
        "/quota" => Ok(SpecialCommand::Quota),
        "/help" => Ok(SpecialCommand::Help),

        "/switch" => Err(CommandError::MissingArgument {
            command: "/switch".to_string(),
            usage: "/switch <id>".to_string(),
        }),
        _ if lower.starts_with("/switch ") => {
            let id = trimmed[8..].trim().to_string();
            Ok(SpecialCommand::Switch(id))
        }

        "/delete" => Err(CommandError::MissingArgument {
            command: "/delete".to_string(),
            usage: "/delete <id>".to_string(),
        }),
        _ if lower.starts_with("/delete ") => {
            let id = trimmed[8..].trim().to_string();
            Ok(SpecialCommand::DeleteChat(id))
        }

        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Print the in-chat command reference
pub fn print_help() {
    println!("\n{}", "Available commands:".bold());
    println!("  {}            Start a new conversation", "/new".cyan());
    println!("  {}           List stored conversations", "/list".cyan());
    println!("  {}    Switch to a conversation", "/switch <id>".cyan());
    println!("  {}    Delete a conversation", "/delete <id>".cyan());
    println!("  {}          Show your quota status", "/quota".cyan());
    println!("  {}           Show this help", "/help".cyan());
    println!("  {}            Leave the chat\n", "exit".cyan());
}
