//! Activity streak calculation.
//!
//! Timestamps are bucketed into local calendar days ([`DateKey`]) using a
//! caller-supplied timezone offset in minutes. The offset follows the
//! JavaScript `Date.getTimezoneOffset` convention: it is UTC minus local
//! time, so UTC+2 is `-120` and UTC-5 is `300`.
//!
//! Every function here is pure and total. Empty input yields zero-valued
//! results rather than an error.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ActivityKind;
use crate::goals::{NextGoal, build_next_goal_from_activity_streak};

/// A local calendar day, rendered as `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The local day that `instant` falls on for a user at `timezone_offset_minutes`.
    pub fn from_instant(instant: DateTime<Utc>, timezone_offset_minutes: i32) -> Self {
        let local = instant - Duration::minutes(i64::from(timezone_offset_minutes));
        Self(local.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn previous(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map(Self)
    }
}

/// One practice record reduced to what matters for streaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityTimestamp {
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
}

impl ActivityTimestamp {
    pub fn new(kind: ActivityKind, at: DateTime<Utc>) -> Self {
        Self { kind, at }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStatus {
    pub current_streak: u32,
    pub is_active_today: bool,
    pub is_at_risk: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStreakSummary {
    pub status: StreakStatus,
    pub longest_streak: u32,
    pub next_goal: NextGoal,
}

pub fn get_today_date_key(timezone_offset_minutes: i32, now: DateTime<Utc>) -> DateKey {
    DateKey::from_instant(now, timezone_offset_minutes)
}

/// Local day keys for `timestamps`, in first-seen order, without duplicates.
pub fn get_unique_activity_date_keys(
    timestamps: &[ActivityTimestamp],
    timezone_offset_minutes: i32,
) -> Vec<DateKey> {
    let mut seen = HashSet::with_capacity(timestamps.len());
    timestamps
        .iter()
        .map(|ts| DateKey::from_instant(ts.at, timezone_offset_minutes))
        .filter(|key| seen.insert(*key))
        .collect()
}

pub fn calculate_current_activity_streak_from_date_keys(
    date_keys: &[DateKey],
    timezone_offset_minutes: i32,
    now: DateTime<Utc>,
) -> StreakStatus {
    if date_keys.is_empty() {
        return StreakStatus::default();
    }

    let days: HashSet<DateKey> = date_keys.iter().copied().collect();
    let today = get_today_date_key(timezone_offset_minutes, now);
    let yesterday = today.previous();

    let is_active_today = days.contains(&today);
    let is_active_yesterday = yesterday.is_some_and(|y| days.contains(&y));

    let anchor = if is_active_today {
        Some(today)
    } else if is_active_yesterday {
        yesterday
    } else {
        None
    };

    let mut current_streak = 0u32;
    let mut cursor = anchor;
    while let Some(day) = cursor {
        if !days.contains(&day) {
            break;
        }
        current_streak += 1;
        cursor = day.previous();
    }

    StreakStatus {
        current_streak,
        is_active_today,
        is_at_risk: current_streak > 0 && is_active_yesterday && !is_active_today,
    }
}

pub fn calculate_longest_activity_streak_from_date_keys(date_keys: &[DateKey]) -> u32 {
    let sorted: BTreeSet<NaiveDate> = date_keys.iter().map(DateKey::date).collect();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in sorted {
        run = match previous.and_then(|p| p.succ_opt()) {
            Some(expected) if expected == day => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

pub fn calculate_activity_streak_summary_from_date_keys(
    date_keys: &[DateKey],
    timezone_offset_minutes: i32,
    now: DateTime<Utc>,
) -> ActivityStreakSummary {
    let status =
        calculate_current_activity_streak_from_date_keys(date_keys, timezone_offset_minutes, now);
    ActivityStreakSummary {
        status,
        longest_streak: calculate_longest_activity_streak_from_date_keys(date_keys),
        next_goal: build_next_goal_from_activity_streak(status.current_streak),
    }
}

/// Convenience wrapper that buckets raw timestamps before summarizing.
pub fn calculate_activity_streak_summary(
    timestamps: &[ActivityTimestamp],
    timezone_offset_minutes: i32,
    now: DateTime<Utc>,
) -> ActivityStreakSummary {
    let keys = get_unique_activity_date_keys(timestamps, timezone_offset_minutes);
    calculate_activity_streak_summary_from_date_keys(&keys, timezone_offset_minutes, now)
}
