//! Account command handlers: signup, login, logout, plan selection

use crate::account::{AuthService, PlanTier, User};
use crate::config::Config;
use crate::error::{ParlanceError, Result};
use crate::storage::SqliteStorage;
use colored::Colorize;
use dialoguer::{Input, Password};
use std::sync::Arc;

fn open_storage(config: &Config) -> Result<Arc<SqliteStorage>> {
    let storage = match &config.storage.db_path {
        Some(path) => SqliteStorage::new_with_path(path)?,
        None => SqliteStorage::new()?,
    };
    Ok(Arc::new(storage))
}

fn prompt_email(preset: Option<String>) -> Result<String> {
    match preset {
        Some(email) => Ok(email),
        None => Ok(Input::new().with_prompt("Email").interact_text()?),
    }
}

/// Create a new account
///
/// Prompts for email (unless given), password, and confirmation, then
/// runs the signup simulation. Validation failures are printed inline.
pub async fn run_signup(config: Config, email: Option<String>) -> Result<()> {
    let storage = open_storage(&config)?;
    let auth = AuthService::new(storage, &config.account);

    let email = prompt_email(email)?;
    let password = Password::new().with_prompt("Password").interact()?;
    let confirm = Password::new().with_prompt("Confirm password").interact()?;

    match auth.signup(&email, &password, &confirm).await {
        Ok(user) => {
            println!(
                "{}",
                format!("Account created for {}.", user.email).green()
            );
            println!(
                "Next, pick a plan: {} or {}",
                "parlance plan free".cyan(),
                "parlance plan pro".cyan()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", e.to_string().red());
            Ok(())
        }
    }
}

/// Log in to an existing account
pub async fn run_login(config: Config, email: Option<String>) -> Result<()> {
    let storage = open_storage(&config)?;
    let auth = AuthService::new(storage, &config.account);

    let email = prompt_email(email)?;
    let password = Password::new().with_prompt("Password").interact()?;

    match auth.login(&email, &password).await {
        Ok(user) => {
            println!("{}", format!("Welcome back, {}.", display_name(&user)).green());
            if !user.has_selected_plan {
                println!(
                    "You haven't picked a plan yet: {} or {}",
                    "parlance plan free".cyan(),
                    "parlance plan pro".cyan()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", e.to_string().red());
            Ok(())
        }
    }
}

/// Clear the current session
pub fn run_logout(config: Config) -> Result<()> {
    let storage = open_storage(&config)?;
    let auth = AuthService::new(storage, &config.account);
    auth.logout()?;
    println!("Logged out.");
    Ok(())
}

/// Select a subscription plan for the logged-in user
pub fn run_plan(config: Config, tier: &str) -> Result<()> {
    let tier = PlanTier::parse_str(tier).map_err(ParlanceError::Config)?;

    let storage = open_storage(&config)?;
    let auth = AuthService::new(storage, &config.account);

    let mut user = auth.current_user()?.ok_or(ParlanceError::NotLoggedIn)?;
    auth.select_plan(&mut user, tier)?;

    match tier {
        PlanTier::Free => {
            println!("{}", "Free plan selected.".green());
            println!("Your 14-day trial starts now: up to 50 messages per day.");
        }
        PlanTier::Pro => {
            println!("{}", "Pro plan selected: unlimited messages.".green());
        }
    }
    Ok(())
}

pub(crate) fn display_name(user: &User) -> String {
    user.name.clone().unwrap_or_else(|| user.email.clone())
}
