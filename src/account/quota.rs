//! Free-tier quota policy
//!
//! Pure evaluation of whether a user may send another message, based on
//! plan tier, trial start date, and the per-day counter. The day rollover
//! is lazy: no background job resets the counter, it is recomputed inline
//! from `last_message_date` at evaluation time.

use crate::account::user::User;
use chrono::{DateTime, Utc};

/// Length of the free trial window, in days
pub const TRIAL_DAYS: i64 = 14;

/// Maximum free-tier messages per calendar day
pub const DAILY_MESSAGE_LIMIT: u32 = 50;

/// Outcome of a quota evaluation
///
/// Derived, never stored: recomputed from the user's fields and wall-clock
/// time on every send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether a send is permitted
    pub can_send: bool,
    /// Human-readable denial reason, present when `can_send` is false
    pub reason: Option<String>,
    /// Messages left today (free tier only)
    pub remaining_messages: Option<u32>,
    /// Trial days left (free tier only)
    pub remaining_days: Option<i64>,
}

impl QuotaDecision {
    fn unlimited() -> Self {
        Self {
            can_send: true,
            reason: None,
            remaining_messages: None,
            remaining_days: None,
        }
    }
}

/// Evaluate whether the user may send a message right now
///
/// Pure read: no fields are mutated. Users with no plan or on the pro
/// tier are always allowed. Free-tier users are denied once the 14-day
/// trial has elapsed (terminal, regardless of daily count) or once 50
/// messages have been sent today.
///
/// # Examples
///
/// ```
/// use parlance::account::{evaluate, User};
/// use chrono::Utc;
///
/// let user = User::new("a@b.com");
/// let decision = evaluate(&user, Utc::now());
/// assert!(decision.can_send);
/// ```
pub fn evaluate(user: &User, now: DateTime<Utc>) -> QuotaDecision {
    if !user.is_free_tier() {
        return QuotaDecision::unlimited();
    }

    // Missing start date is treated as starting now, matching plan selection.
    let plan_start = user.plan_start_date.unwrap_or(now);
    let days_since_plan_start = (now - plan_start).num_days();

    if days_since_plan_start >= TRIAL_DAYS {
        return QuotaDecision {
            can_send: false,
            reason: Some(
                "Your 14-day free trial has expired. Please upgrade to Pro to continue chatting."
                    .to_string(),
            ),
            remaining_messages: None,
            remaining_days: Some(0),
        };
    }

    let daily_count = daily_count_for(user, now);
    let remaining_days = TRIAL_DAYS - days_since_plan_start;

    if daily_count >= DAILY_MESSAGE_LIMIT {
        return QuotaDecision {
            can_send: false,
            reason: Some(
                "You've reached your daily limit of 50 messages. Try again tomorrow or upgrade to Pro for unlimited messages."
                    .to_string(),
            ),
            remaining_messages: Some(0),
            remaining_days: Some(remaining_days),
        };
    }

    QuotaDecision {
        can_send: true,
        reason: None,
        remaining_messages: Some(DAILY_MESSAGE_LIMIT - daily_count),
        remaining_days: Some(remaining_days),
    }
}

/// Record one accepted send against the user's daily counter
///
/// Must be called exactly once per accepted send, after the quota check
/// passes. The counter restarts at 1 when the calendar date has rolled
/// over since the last send. No-op for users who are not on the free tier.
///
/// Note: this runs before the remote call is confirmed, so a failed send
/// still consumes quota.
pub fn record_send(user: &mut User, now: DateTime<Utc>) {
    if !user.is_free_tier() {
        return;
    }

    let today = now.date_naive();
    user.daily_message_count = if user.last_message_date == Some(today) {
        user.daily_message_count + 1
    } else {
        1
    };
    user.last_message_date = Some(today);
}

fn daily_count_for(user: &User, now: DateTime<Utc>) -> u32 {
    let today = now.date_naive();
    match user.last_message_date {
        Some(date) if date == today => user.daily_message_count,
        _ => 0,
    }
}
