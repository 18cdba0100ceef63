//! Practice streak tracking for the yoga practice service.
//!
//! The core is a set of pure functions in [`streak`] and [`goals`] that turn
//! raw practice timestamps into calendar-day keys and derive the current
//! streak, the longest streak and the next milestone. Around it sit the
//! business utilities the service needs: [`validation`] combinators, a
//! fixed-window [`rate_limit`]er, [`notifications`] scheduling, and the
//! [`ActivitySource`] seam used to fetch timestamps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod goals;
pub mod http_client;
pub mod notifications;
pub mod rate_limit;
pub mod retry;
pub mod sources;
pub mod streak;
pub mod utils;
pub mod validation;

pub use goals::{NextGoal, build_next_goal_from_activity_streak};
pub use sources::{StreakService, collect_activity_timestamps};
pub use streak::{
    ActivityStreakSummary, ActivityTimestamp, DateKey, StreakStatus,
    calculate_activity_streak_summary, calculate_activity_streak_summary_from_date_keys,
    calculate_current_activity_streak_from_date_keys,
    calculate_longest_activity_streak_from_date_keys, get_today_date_key,
    get_unique_activity_date_keys,
};

#[derive(Debug, Error)]
pub enum StreakError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl StreakError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => StreakError::NotFound(body),
            401 | 403 => StreakError::Auth(body),
            400 | 422 => StreakError::InvalidInput(body),
            _ => StreakError::Api { status, body },
        }
    }
}

/// The three practice record families that count towards a streak.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Asana,
    Series,
    Sequence,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::Asana,
        ActivityKind::Series,
        ActivityKind::Sequence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Asana => "asana",
            ActivityKind::Series => "series",
            ActivityKind::Sequence => "sequence",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single practice record as returned by the activity API.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRecord {
    pub id: String,
    pub performed_at: String,
}

#[async_trait]
pub trait ActivitySource: Send + Sync + 'static {
    /// Raw timestamps for every practice record of `kind` logged by `user_id`.
    async fn fetch_activity_timestamps(
        &self,
        user_id: &str,
        kind: ActivityKind,
    ) -> Result<Vec<String>, StreakError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_known_codes() {
        assert!(matches!(
            StreakError::from_status(404, "gone".into()),
            StreakError::NotFound(_)
        ));
        assert!(matches!(
            StreakError::from_status(403, String::new()),
            StreakError::Auth(_)
        ));
        assert!(matches!(
            StreakError::from_status(422, String::new()),
            StreakError::InvalidInput(_)
        ));
        match StreakError::from_status(503, "busy".into()) {
            StreakError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn activity_kind_serializes_lowercase() {
        let v = serde_json::to_value(ActivityKind::Sequence).unwrap();
        assert_eq!(v, serde_json::json!("sequence"));
        assert_eq!(ActivityKind::Asana.to_string(), "asana");
    }

    #[test]
    fn practice_record_uses_camel_case() {
        let rec: PracticeRecord =
            serde_json::from_value(serde_json::json!({"id": "r1", "performedAt": "2026-02-24T08:00:00Z"}))
                .unwrap();
        assert_eq!(rec.performed_at, "2026-02-24T08:00:00Z");
    }
}
