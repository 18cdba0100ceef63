//! Gathering practice timestamps from the three activity families.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::streak::{
    ActivityStreakSummary, ActivityTimestamp, DateKey, calculate_activity_streak_summary_from_date_keys,
    get_unique_activity_date_keys,
};
use crate::utils::parse_activity_timestamp;
use crate::{ActivityKind, ActivitySource};

/// Fetch asana, series and sequence records concurrently.
///
/// A failed fetch counts as "no activity" for that family so one broken
/// endpoint never hides the others. Timestamps that do not parse are dropped.
pub async fn collect_activity_timestamps<S>(source: &S, user_id: &str) -> Vec<ActivityTimestamp>
where
    S: ActivitySource + ?Sized,
{
    let (asana, series, sequence) = tokio::join!(
        fetch_or_empty(source, user_id, ActivityKind::Asana),
        fetch_or_empty(source, user_id, ActivityKind::Series),
        fetch_or_empty(source, user_id, ActivityKind::Sequence),
    );

    let mut all = asana;
    all.extend(series);
    all.extend(sequence);
    all
}

async fn fetch_or_empty<S>(source: &S, user_id: &str, kind: ActivityKind) -> Vec<ActivityTimestamp>
where
    S: ActivitySource + ?Sized,
{
    let raw = match source.fetch_activity_timestamps(user_id, kind).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(%kind, user_id, error = %e, "activity fetch failed; treating as empty");
            metrics::counter!("activity_fetch_failures_total", "kind" => kind.as_str()).increment(1);
            return Vec::new();
        }
    };

    raw.iter()
        .filter_map(|s| match parse_activity_timestamp(s) {
            Some(at) => Some(ActivityTimestamp::new(kind, at)),
            None => {
                tracing::debug!(%kind, value = %s, "skipping malformed activity timestamp");
                None
            }
        })
        .collect()
}

/// Streak queries for a user, backed by an [`ActivitySource`].
#[derive(Clone)]
pub struct StreakService {
    source: Arc<dyn ActivitySource>,
}

impl StreakService {
    pub fn new(source: Arc<dyn ActivitySource>) -> Self {
        Self { source }
    }

    pub async fn date_keys_for(&self, user_id: &str, timezone_offset_minutes: i32) -> Vec<DateKey> {
        let timestamps = collect_activity_timestamps(self.source.as_ref(), user_id).await;
        get_unique_activity_date_keys(&timestamps, timezone_offset_minutes)
    }

    pub async fn summary_for(
        &self,
        user_id: &str,
        timezone_offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> ActivityStreakSummary {
        let keys = self.date_keys_for(user_id, timezone_offset_minutes).await;
        let summary =
            calculate_activity_streak_summary_from_date_keys(&keys, timezone_offset_minutes, now);
        tracing::debug!(
            user_id,
            days = keys.len(),
            current = summary.status.current_streak,
            longest = summary.longest_streak,
            "computed streak summary"
        );
        summary
    }
}
