//! Local login/signup simulation
//!
//! Accounts live entirely in the local store; there is no authentication
//! backend. Validation mirrors a hosted flow (password length, confirm
//! match, email shape, duplicate detection) and a short artificial delay
//! stands in for the network round-trip.

use crate::account::user::{PlanTier, RegisteredUser, User};
use crate::config::AccountConfig;
use crate::error::{ParlanceError, Result};
use crate::storage::SqliteStorage;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 6;

/// Account management over the local store
///
/// All failures are `ParlanceError::Auth` validation errors meant to be
/// shown inline; none are fatal.
pub struct AuthService {
    storage: Arc<SqliteStorage>,
    simulated_latency: Duration,
}

impl AuthService {
    /// Create an auth service over the given storage
    pub fn new(storage: Arc<SqliteStorage>, config: &AccountConfig) -> Self {
        Self {
            storage,
            simulated_latency: Duration::from_millis(config.simulated_latency_ms),
        }
    }

    /// Create a new account and make it the current user
    ///
    /// Validation order: password length, password confirmation, email
    /// shape, duplicate email. On success the account is written to the
    /// registered-users collection and to the current-user slot.
    ///
    /// # Errors
    ///
    /// Returns `ParlanceError::Auth` when any validation fails
    pub async fn signup(&self, email: &str, password: &str, confirm: &str) -> Result<User> {
        self.simulate_latency().await;

        if password.len() < MIN_PASSWORD_LEN {
            return Err(auth_err("Password must be at least 6 characters"));
        }

        if password != confirm {
            return Err(auth_err("Passwords do not match"));
        }

        if !email.contains('@') {
            return Err(auth_err("Please enter a valid email address"));
        }

        if self.storage.find_registered_user(email)?.is_some() {
            return Err(auth_err("User already exists. Please log in instead."));
        }

        let user = User::new(email);
        self.storage.save_registered_user(&RegisteredUser {
            profile: user.clone(),
            password: password.to_string(),
        })?;
        self.storage.save_user(&user)?;

        tracing::info!(email = %user.email, "account created");
        Ok(user)
    }

    /// Log in to an existing account
    ///
    /// # Errors
    ///
    /// Returns `ParlanceError::Auth` for a short password, unknown email,
    /// or wrong password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.simulate_latency().await;

        if password.len() < MIN_PASSWORD_LEN {
            return Err(auth_err("Password must be at least 6 characters"));
        }

        let record = self
            .storage
            .find_registered_user(email)?
            .ok_or_else(|| auth_err("User not found. Please sign up first."))?;

        if record.password != password {
            return Err(auth_err("Invalid password"));
        }

        let user = record.profile;
        self.storage.save_user(&user)?;

        tracing::info!(email = %user.email, "logged in");
        Ok(user)
    }

    /// Clear the current-user slot
    ///
    /// Registered accounts are never deleted; only the session is cleared.
    pub fn logout(&self) -> Result<()> {
        self.storage.clear_user()?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Select a subscription plan for the current user
    ///
    /// Choosing the free tier starts the 14-day trial clock and zeroes the
    /// daily counter. Both the current-user slot and the registered record
    /// are updated.
    pub fn select_plan(&self, user: &mut User, tier: PlanTier) -> Result<()> {
        let now = Utc::now();

        user.plan = Some(tier);
        user.has_selected_plan = true;
        if tier == PlanTier::Free {
            user.plan_start_date = Some(now);
            user.daily_message_count = 0;
            user.last_message_date = Some(now.date_naive());
        }

        self.storage.persist_user(user)?;
        tracing::info!(email = %user.email, plan = %tier, "plan selected");
        Ok(())
    }

    /// Load the current user from the store, if any
    pub fn current_user(&self) -> Result<Option<User>> {
        self.storage.load_user()
    }

    async fn simulate_latency(&self) {
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
    }
}

fn auth_err(message: &str) -> anyhow::Error {
    ParlanceError::Auth(message.to_string()).into()
}
