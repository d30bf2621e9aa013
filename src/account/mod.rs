//! Account management for Parlance
//!
//! This module contains the user data model, the local login/signup
//! simulation, and the free-tier quota policy.

pub mod auth;
pub mod quota;
pub mod user;

pub use auth::AuthService;
pub use quota::{evaluate, record_send, QuotaDecision, DAILY_MESSAGE_LIMIT, TRIAL_DAYS};
pub use user::{PlanTier, RegisteredUser, User};
