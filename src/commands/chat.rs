//! Interactive chat mode handler
//!
//! Loads the session user, builds the streaming client and chat session,
//! and runs a readline loop. Rendering happens through the session's
//! observer seam: the loop never touches network code, and the session
//! never prints.

use crate::account::PlanTier;
use crate::chat::{ChatSession, MessageRole, SessionEvent, SessionObserver, SessionState};
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::error::{ParlanceError, Result};
use crate::provider::HttpCompletionClient;
use crate::storage::SqliteStorage;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;

/// Renderer subscribed to session events
///
/// Prints streamed fragments as they arrive and quota denials inline.
struct CliRenderer;

impl SessionObserver for CliRenderer {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::MessageAppended {
                role: MessageRole::Assistant,
                ..
            } => {
                print!("{} ", "assistant>".blue().bold());
                let _ = std::io::stdout().flush();
            }
            SessionEvent::MessageUpdated { fragment, .. } => {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            }
            SessionEvent::StateChanged(SessionState::Idle) => {
                println!();
            }
            SessionEvent::QuotaDenied { reason } => {
                println!("{}", reason.yellow());
            }
            _ => {}
        }
    }
}

/// Start interactive chat mode
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `resume` - Optional conversation ID (or 8-char prefix) to resume
///
/// # Errors
///
/// Returns error if no user is logged in or storage cannot be opened.
/// In-loop failures (quota denials, transport errors) are surfaced inline
/// and never end the loop.
pub async fn run_chat(config: Config, resume: Option<String>) -> Result<()> {
    let storage = match &config.storage.db_path {
        Some(path) => Arc::new(SqliteStorage::new_with_path(path)?),
        None => Arc::new(SqliteStorage::new()?),
    };

    let user = storage.load_user()?.ok_or(ParlanceError::NotLoggedIn)?;
    if !user.has_selected_plan {
        println!(
            "Please select a plan first: {} or {}",
            "parlance plan free".cyan(),
            "parlance plan pro".cyan()
        );
        return Ok(());
    }

    let client = Arc::new(HttpCompletionClient::new(&config.provider)?);
    let mut session = ChatSession::init(user, storage, client, &config.chat.greeting)?;

    if let Some(id) = resume {
        if !session.switch_to(&id)? {
            println!("{}", format!("No conversation matches '{}'.", id).yellow());
        }
    }

    session.subscribe(Box::new(CliRenderer));

    print_welcome_banner(&session);
    render_transcript(&session);

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(&format!("{} ", "you>".green().bold())) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let command = match parse_special_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e.to_string().red());
                        continue;
                    }
                };

                match command {
                    SpecialCommand::Exit => break,
                    SpecialCommand::Help => {
                        print_help();
                        continue;
                    }
                    SpecialCommand::NewChat => {
                        session.new_chat();
                        println!("{}", "Started a new conversation.".green());
                        render_transcript(&session);
                        continue;
                    }
                    SpecialCommand::ListChats => {
                        print_chat_list(&session)?;
                        continue;
                    }
                    SpecialCommand::Switch(id) => {
                        if session.switch_to(&id)? {
                            render_transcript(&session);
                        } else {
                            println!(
                                "{}",
                                format!("No conversation matches '{}'.", id).yellow()
                            );
                        }
                        continue;
                    }
                    SpecialCommand::DeleteChat(id) => {
                        session.delete_chat(&id)?;
                        println!("{}", format!("Deleted conversation {}.", id).green());
                        render_transcript(&session);
                        continue;
                    }
                    SpecialCommand::Quota => {
                        print_quota_status(&session);
                        continue;
                    }
                    SpecialCommand::None => {}
                }

                rl.add_history_entry(trimmed)?;

                if let Err(e) = session.submit(trimmed).await {
                    eprintln!("{}", format!("Error: {}", e).red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Display welcome banner at the start of interactive chat mode
fn print_welcome_banner(session: &ChatSession) {
    let user = session.user();
    let name = crate::commands::account::display_name(user);
    let plan = user
        .plan
        .map(|p| p.to_string())
        .unwrap_or_else(|| "none".to_string());

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║              Parlance Interactive Chat - Welcome!            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("User: {} ({} plan)", name.bold(), plan);
    if user.plan == Some(PlanTier::Free) {
        let decision = session.quota_status();
        if let (Some(messages), Some(days)) =
            (decision.remaining_messages, decision.remaining_days)
        {
            println!("Quota: {} messages left today, {} trial days remaining", messages, days);
        }
    }
    println!("\nType '/help' for available commands, 'exit' to quit\n");
}

/// Print the active conversation's messages
fn render_transcript(session: &ChatSession) {
    let conversation = session.conversation();
    println!("{}", format!("── {} ──", conversation.derive_title()).dimmed());
    for message in &conversation.messages {
        match message.role {
            MessageRole::User => println!("{} {}", "you>".green().bold(), message.content),
            MessageRole::Assistant => {
                println!("{} {}", "assistant>".blue().bold(), message.content)
            }
        }
    }
}

/// Print stored conversations, most recent first
fn print_chat_list(session: &ChatSession) -> Result<()> {
    let conversations = session.list_chats()?;
    if conversations.is_empty() {
        println!("{}", "No stored conversations yet.".yellow());
        return Ok(());
    }

    for conversation in conversations {
        let marker = if conversation.id == session.conversation().id {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}  ({} messages, {})",
            marker,
            short_id(&conversation.id).cyan(),
            conversation.title,
            conversation.message_count,
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Print the quota decision for the session user
fn print_quota_status(session: &ChatSession) {
    let user = session.user();
    if user.plan != Some(PlanTier::Free) {
        println!("{}", "Unlimited messages on your plan.".green());
        return;
    }

    let decision = session.quota_status();
    if decision.can_send {
        println!(
            "{} messages left today, {} trial days remaining.",
            decision.remaining_messages.unwrap_or(0),
            decision.remaining_days.unwrap_or(0)
        );
    } else if let Some(reason) = decision.reason {
        println!("{}", reason.yellow());
    }
}

/// Display prefix of a conversation id, tolerating ids shorter than
/// the usual UUID length.
fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}
