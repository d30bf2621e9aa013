//! User account data model
//!
//! Defines the user identity, subscription plan, and the free-tier quota
//! fields. Quota fields are meaningful only on the free tier; `pro` is
//! unlimited.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subscription plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Free tier: 14-day trial, 50 messages per day
    Free,
    /// Pro tier: unlimited messages
    Pro,
}

impl PlanTier {
    /// Parse a plan tier from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::account::PlanTier;
    ///
    /// assert_eq!(PlanTier::parse_str("free").unwrap(), PlanTier::Free);
    /// assert!(PlanTier::parse_str("enterprise").is_err());
    /// ```
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            other => Err(format!("Unknown plan tier: {}", other)),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

/// A user account
///
/// Created at signup, mutated at login, plan selection, and each free-tier
/// send. Never hard-deleted; logout only clears the current-user slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: String,

    /// Email address (also the key of the registered-users collection)
    pub email: String,

    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,

    /// Selected plan, if any
    #[serde(default)]
    pub plan: Option<PlanTier>,

    /// Whether the user has gone through plan selection
    #[serde(default)]
    pub has_selected_plan: bool,

    /// When the plan was chosen (start of the free trial window)
    #[serde(default)]
    pub plan_start_date: Option<DateTime<Utc>>,

    /// Messages sent on `last_message_date` (free tier only)
    #[serde(default)]
    pub daily_message_count: u32,

    /// Calendar date of the most recent send (free tier only)
    #[serde(default)]
    pub last_message_date: Option<NaiveDate>,
}

impl User {
    /// Create a fresh account for the given email
    ///
    /// The display name defaults to the local part of the email address,
    /// and no plan is selected yet.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        let name = email.split('@').next().map(|s| s.to_string());
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            plan: None,
            has_selected_plan: false,
            plan_start_date: None,
            daily_message_count: 0,
            last_message_date: None,
        }
    }

    /// Returns true when the user is on the free tier
    pub fn is_free_tier(&self) -> bool {
        self.plan == Some(PlanTier::Free)
    }
}

/// A stored credential record, keyed by email
///
/// Used only by the self-contained login/signup simulation. Holds the
/// password alongside the profile so login can restore plan and quota state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    /// The profile and plan fields
    #[serde(flatten)]
    pub profile: User,

    /// Stored password (plain text; this is a local simulation, not real auth)
    pub password: String,
}
