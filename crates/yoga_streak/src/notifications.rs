//! Practice reminder scheduling.
//!
//! Preferences store a local reminder time and the weekdays it applies to.
//! A periodic caller asks which users are due at a given instant; delivery
//! itself happens elsewhere.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::streak::{DateKey, StreakStatus};
use crate::validation::{
    ObjectValidation, Validator, compose_validators, integer_range, matches, optional, required,
    trim, validate_object, validator,
};

/// Widest offset in use today (UTC+14 / UTC-12 rounded up).
pub const MAX_TIMEZONE_OFFSET_MINUTES: i32 = 840;

static REMINDER_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("reminder time pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    pub user_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Local `HH:MM`.
    pub reminder_time: String,
    /// Empty means every day.
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub timezone_offset_minutes: i32,
    #[serde(default)]
    pub last_sent_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReminderMessage {
    pub title: String,
    pub body: String,
}

fn local_time(instant: DateTime<Utc>, offset_minutes: i32) -> chrono::NaiveDateTime {
    (instant - Duration::minutes(i64::from(offset_minutes))).naive_utc()
}

/// Whether `pref` should fire at `now`.
///
/// The local time must fall in `[reminder_time, reminder_time + tolerance)`
/// for a reminder scheduled on one of the selected weekdays, and nothing may
/// have been sent yet on that reminder's local day. A window may run past
/// local midnight, in which case the weekday and sent-day checks use the day
/// the reminder was scheduled for. An unparseable reminder time never fires.
pub fn is_notification_due(
    pref: &NotificationPreference,
    now: DateTime<Utc>,
    tolerance_minutes: u32,
) -> bool {
    if !pref.enabled {
        return false;
    }
    let Ok(reminder) = NaiveTime::parse_from_str(pref.reminder_time.trim(), "%H:%M") else {
        return false;
    };

    let local = local_time(now, pref.timezone_offset_minutes);
    let tolerance = Duration::minutes(i64::from(tolerance_minutes.max(1)));
    // today's reminder, or yesterday's if its window spans midnight
    let Some(day) = [Some(local.date()), local.date().pred_opt()]
        .into_iter()
        .flatten()
        .find(|day| {
            let anchor = day.and_time(reminder);
            anchor <= local && local < anchor + tolerance
        })
    else {
        return false;
    };

    if !pref.days.is_empty() && !pref.days.contains(&day.weekday()) {
        return false;
    }
    match pref.last_sent_at {
        Some(sent) => DateKey::from_instant(sent, pref.timezone_offset_minutes) != DateKey::new(day),
        None => true,
    }
}

/// User ids whose reminders are due at `now`, in input order.
pub fn select_due_notifications(
    prefs: &[NotificationPreference],
    now: DateTime<Utc>,
    tolerance_minutes: u32,
) -> Vec<String> {
    let due: Vec<String> = prefs
        .iter()
        .filter(|p| is_notification_due(p, now, tolerance_minutes))
        .map(|p| p.user_id.clone())
        .collect();
    tracing::debug!(checked = prefs.len(), due = due.len(), "selected due reminders");
    due
}

pub fn build_reminder_message(status: &StreakStatus) -> ReminderMessage {
    let n = status.current_streak;
    let days = if n == 1 { "day" } else { "days" };
    if status.is_at_risk {
        ReminderMessage {
            title: "Keep your streak alive".to_string(),
            body: format!("Your {n}-day streak ends at midnight. A short practice keeps it going."),
        }
    } else if status.is_active_today {
        ReminderMessage {
            title: "Practice logged".to_string(),
            body: format!("You're on a {n} {days} streak. See you on the mat tomorrow."),
        }
    } else {
        ReminderMessage {
            title: "Time to practice".to_string(),
            body: "Roll out your mat and start a new streak today.".to_string(),
        }
    }
}

fn weekday_list() -> Validator {
    validator(|raw| {
        let mut out = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day: Weekday = part
                .parse()
                .map_err(|_| format!("Unknown weekday: {part}"))?;
            if !out.contains(&day) {
                out.push(day);
            }
        }
        Ok(out
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(","))
    })
}

/// Validate a reminder-preference form payload.
pub fn validate_preference_input(input: &serde_json::Value) -> ObjectValidation {
    let schema = [
        (
            "reminderTime",
            compose_validators(vec![
                trim(),
                required("Reminder time is required"),
                matches(REMINDER_TIME_RE.clone(), "Reminder time must be HH:MM"),
            ]),
        ),
        (
            "timezoneOffsetMinutes",
            optional(integer_range(
                i64::from(-MAX_TIMEZONE_OFFSET_MINUTES),
                i64::from(MAX_TIMEZONE_OFFSET_MINUTES),
                "Timezone offset must be between -840 and 840 minutes",
            )),
        ),
        ("days", weekday_list()),
    ];
    validate_object(input, &schema)
}
