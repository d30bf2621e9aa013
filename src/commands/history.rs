//! Conversation history command handlers

use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStorage;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let storage = match &config.storage.db_path {
        Some(path) => SqliteStorage::new_with_path(path)?,
        None => SqliteStorage::new()?,
    };

    match command {
        HistoryCommand::List => {
            let conversations = storage.list_conversations()?;

            if conversations.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            for conversation in conversations {
                let id_short = &conversation.id[..8.min(conversation.id.len())];
                let title = if conversation.title.chars().count() > 40 {
                    let cut: String = conversation.title.chars().take(37).collect();
                    format!("{}...", cut)
                } else {
                    conversation.title
                };
                let updated = conversation.updated_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    title,
                    conversation.message_count,
                    updated
                ]);
            }

            println!("\nConversation History:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume a conversation.",
                "parlance chat --resume <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Delete { id } => {
            storage.delete_conversation(&id)?;
            println!("{}", format!("Deleted conversation {}", id).green());
        }
    }

    Ok(())
}
