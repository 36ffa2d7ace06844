//! Email queue monitoring math: success rates, provider rate limits,
//! hourly buckets, health roll-up and operator actions.

use std::fmt;
use std::str::FromStr;

use chrono::{DurationRound, TimeDelta};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const MAX_WINDOW_DAYS: i64 = 90;

/// Most recent failures shown in the overview.
pub const RECENT_ERRORS_LIMIT: i64 = 10;
/// Display length of a failure message before it is cut.
pub const ERROR_PREVIEW_CHARS: usize = 100;

/// `retry-failed` never looks at more rows than this.
pub const RETRY_BATCH_LIMIT: i64 = 10;
/// `retry-failed` only considers failures younger than this.
pub const RETRY_WINDOW_HOURS: i64 = 24;
/// Priority given to re-enqueued emails.
pub const RETRY_PRIORITY: i32 = 5;
/// Attempt budget given to re-enqueued emails.
pub const RETRY_MAX_ATTEMPTS: i32 = 2;

/// `clear-errors` deletes failures older than this.
pub const CLEAR_ERRORS_AFTER_DAYS: i64 = 7;

/// Share of the daily cap at which a provider is flagged.
pub const PROVIDER_WARNING_RATIO: f64 = 0.9;

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// `sent / total * 100` rounded to two decimals; `0.0` when nothing was sent.
pub fn success_rate(sent: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(sent as f64 / total as f64 * 100.0)
}

/// Display form of [`success_rate`]: `"70.00%"`, or `"0%"` for an empty window.
pub fn format_success_rate(sent: i64, total: i64) -> String {
    if total <= 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", success_rate(sent, total))
}

/// `used / limit * 100` with two decimals, as a string.
pub fn usage_percentage(used: i64, limit: i64) -> String {
    if limit <= 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", used as f64 / limit as f64 * 100.0)
}

/// Mean of the given durations in whole milliseconds; `0` when empty.
pub fn average_processing_ms(durations_ms: &[i64]) -> i64 {
    if durations_ms.is_empty() {
        return 0;
    }
    let total: i64 = durations_ms.iter().sum();
    (total as f64 / durations_ms.len() as f64).round() as i64
}

/// Clamp the `days` query parameter to a sane window.
pub fn clamp_window_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, MAX_WINDOW_DAYS)
}

/// Cut a failure message for display, marking the cut with `...`.
pub fn truncate_error(message: &str) -> String {
    if message.chars().count() <= ERROR_PREVIEW_CHARS {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(ERROR_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Provider limits
// ---------------------------------------------------------------------------

/// Sending caps of an email provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderLimits {
    pub daily: i64,
    pub hourly: i64,
}

const SMTP_LIMITS: ProviderLimits = ProviderLimits {
    daily: 1000,
    hourly: 100,
};

const PROVIDER_LIMITS: &[(&str, ProviderLimits)] = &[
    ("gmail", ProviderLimits { daily: 500, hourly: 50 }),
    ("outlook", ProviderLimits { daily: 300, hourly: 30 }),
    ("yahoo", ProviderLimits { daily: 100, hourly: 10 }),
    ("smtp", SMTP_LIMITS),
    ("resend", ProviderLimits { daily: 100, hourly: 10 }),
];

/// Caps for `provider`; unknown providers get the generic SMTP caps.
pub fn provider_limits(provider: &str) -> ProviderLimits {
    let provider = provider.to_ascii_lowercase();
    PROVIDER_LIMITS
        .iter()
        .find(|(name, _)| *name == provider)
        .map_or(SMTP_LIMITS, |(_, limits)| *limits)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Healthy,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageWindow {
    pub used: i64,
    pub limit: i64,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderUsageWindows {
    pub daily: UsageWindow,
    pub hourly: UsageWindow,
}

/// Provider usage against its caps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderUsage {
    pub provider: String,
    pub limits: ProviderLimits,
    pub usage: ProviderUsageWindows,
    pub status: ProviderStatus,
}

impl ProviderUsage {
    pub fn compute(provider: &str, sent_today: i64, sent_last_hour: i64) -> Self {
        let limits = provider_limits(provider);
        let status = if sent_today as f64 >= limits.daily as f64 * PROVIDER_WARNING_RATIO {
            ProviderStatus::Warning
        } else {
            ProviderStatus::Healthy
        };
        Self {
            provider: provider.to_string(),
            limits,
            usage: ProviderUsageWindows {
                daily: UsageWindow {
                    used: sent_today,
                    limit: limits.daily,
                    percentage: usage_percentage(sent_today, limits.daily),
                },
                hourly: UsageWindow {
                    used: sent_last_hour,
                    limit: limits.hourly,
                    percentage: usage_percentage(sent_last_hour, limits.hourly),
                },
            },
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// Hourly buckets
// ---------------------------------------------------------------------------

/// Send counts for one clock hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyBucket {
    pub hour: Timestamp,
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
}

/// Delivery outcome of a single log row, for bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Sent,
    Failed,
}

/// Group `(created_at, outcome)` rows into hour buckets, newest first.
///
/// Only hours that saw at least one row are returned.
pub fn bucket_hourly(rows: impl IntoIterator<Item = (Timestamp, Outcome)>) -> Vec<HourlyBucket> {
    let mut buckets: Vec<HourlyBucket> = Vec::new();
    for (at, outcome) in rows {
        let hour = at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at);
        let idx = match buckets.iter().position(|b| b.hour == hour) {
            Some(idx) => idx,
            None => {
                buckets.push(HourlyBucket {
                    hour,
                    total: 0,
                    sent: 0,
                    failed: 0,
                });
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[idx];
        bucket.total += 1;
        match outcome {
            Outcome::Sent => bucket.sent += 1,
            Outcome::Failed => bucket.failed += 1,
            Outcome::Pending => {}
        }
    }
    buckets.sort_by(|a, b| b.hour.cmp(&a.hour));
    buckets
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// The four independent health probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    pub database: bool,
    pub email_provider: bool,
    pub queue: bool,
    pub redis: bool,
}

impl HealthChecks {
    pub fn all_healthy(&self) -> bool {
        self.database && self.email_provider && self.queue && self.redis
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub checks: HealthChecks,
    pub last_checked: Timestamp,
}

impl SystemHealth {
    pub fn from_checks(checks: HealthChecks, now: Timestamp) -> Self {
        let status = if checks.all_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            checks,
            last_checked: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Operator actions on the email queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    RetryFailed,
    ClearErrors,
    PauseQueue,
    ResumeQueue,
}

impl MonitorAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitorAction::RetryFailed => "retry-failed",
            MonitorAction::ClearErrors => "clear-errors",
            MonitorAction::PauseQueue => "pause-queue",
            MonitorAction::ResumeQueue => "resume-queue",
        }
    }
}

impl fmt::Display for MonitorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry-failed" => Ok(MonitorAction::RetryFailed),
            "clear-errors" => Ok(MonitorAction::ClearErrors),
            "pause-queue" => Ok(MonitorAction::PauseQueue),
            "resume-queue" => Ok(MonitorAction::ResumeQueue),
            other => Err(CoreError::InvalidAction(other.to_string())),
        }
    }
}

/// Result of an operator action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub affected: i64,
}

impl ActionResult {
    pub fn retried(count: i64) -> Self {
        Self {
            success: true,
            message: format!("Retried {count} failed emails"),
            affected: count,
        }
    }

    pub fn cleared(count: i64) -> Self {
        Self {
            success: true,
            message: format!("Cleared {count} old error logs"),
            affected: count,
        }
    }

    pub fn paused(was_paused: bool) -> Self {
        Self {
            success: true,
            message: "Email queue paused".to_string(),
            affected: i64::from(!was_paused),
        }
    }

    pub fn resumed(was_paused: bool) -> Self {
        Self {
            success: true,
            message: "Email queue resumed".to_string(),
            affected: i64::from(was_paused),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn success_rate_of_empty_window_is_zero() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(format_success_rate(0, 0), "0%");
    }

    #[test]
    fn success_rate_formats_two_decimals() {
        assert_eq!(success_rate(7, 10), 70.0);
        assert_eq!(format_success_rate(7, 10), "70.00%");
        assert_eq!(format_success_rate(2, 3), "66.67%");
    }

    #[test]
    fn average_processing_rounds() {
        assert_eq!(average_processing_ms(&[]), 0);
        assert_eq!(average_processing_ms(&[100, 201]), 151);
    }

    #[test]
    fn window_days_are_clamped() {
        assert_eq!(clamp_window_days(None), 7);
        assert_eq!(clamp_window_days(Some(0)), 1);
        assert_eq!(clamp_window_days(Some(365)), 90);
    }

    #[test]
    fn long_errors_are_cut() {
        let long = "x".repeat(150);
        let cut = truncate_error(&long);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn provider_limits_fall_back_to_smtp() {
        assert_eq!(provider_limits("gmail"), ProviderLimits { daily: 500, hourly: 50 });
        assert_eq!(provider_limits("Outlook").daily, 300);
        assert_eq!(provider_limits("carrier-pigeon"), ProviderLimits { daily: 1000, hourly: 100 });
    }

    #[test]
    fn provider_warns_at_ninety_percent() {
        assert_eq!(ProviderUsage::compute("gmail", 449, 3).status, ProviderStatus::Healthy);
        let usage = ProviderUsage::compute("gmail", 450, 10);
        assert_eq!(usage.status, ProviderStatus::Warning);
        assert_eq!(usage.usage.daily.percentage, "90.00");
        assert_eq!(usage.usage.hourly.percentage, "20.00");
    }

    #[test]
    fn hourly_buckets_group_and_sort() {
        let at = |h, m| chrono::Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap();
        let buckets = bucket_hourly(vec![
            (at(9, 5), Outcome::Sent),
            (at(10, 59), Outcome::Failed),
            (at(9, 40), Outcome::Failed),
            (at(9, 41), Outcome::Pending),
        ]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].hour, at(10, 0));
        assert_eq!((buckets[0].total, buckets[0].sent, buckets[0].failed), (1, 0, 1));
        assert_eq!((buckets[1].total, buckets[1].sent, buckets[1].failed), (3, 1, 1));
    }

    #[test]
    fn one_failing_check_degrades() {
        let mut checks = HealthChecks {
            database: true,
            email_provider: true,
            queue: true,
            redis: true,
        };
        assert_eq!(
            SystemHealth::from_checks(checks, chrono::Utc::now()).status,
            HealthStatus::Healthy
        );
        checks.queue = false;
        assert_eq!(
            SystemHealth::from_checks(checks, chrono::Utc::now()).status,
            HealthStatus::Degraded
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert_eq!("pause-queue".parse::<MonitorAction>().unwrap(), MonitorAction::PauseQueue);
        assert_matches!(
            "reboot".parse::<MonitorAction>(),
            Err(CoreError::InvalidAction(a)) if a == "reboot"
        );
    }

    #[test]
    fn action_messages() {
        assert_eq!(ActionResult::retried(3).message, "Retried 3 failed emails");
        assert_eq!(ActionResult::cleared(0).message, "Cleared 0 old error logs");
        assert_eq!(ActionResult::paused(true).affected, 0);
        assert_eq!(ActionResult::resumed(true).affected, 1);
    }
}
