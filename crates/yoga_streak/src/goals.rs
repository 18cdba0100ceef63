//! Milestone tiers for practice streaks.

use serde::{Deserialize, Serialize};

/// Ascending streak milestones. The last entry closes one full cycle; once
/// a streak passes it the tiers repeat on top of the completed cycles.
pub const STREAK_TIERS: [StreakTier; 4] = [
    StreakTier {
        target: 30,
        name: "Monthly Practice",
    },
    StreakTier {
        target: 90,
        name: "Seasonal Devotion",
    },
    StreakTier {
        target: 180,
        name: "Half-Year Dedication",
    },
    StreakTier {
        target: 365,
        name: "Year of Practice",
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakTier {
    pub target: u32,
    pub name: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextGoal {
    pub text: String,
    pub current: u32,
    pub target: u32,
    pub progress: u32,
    pub tiers_achieved: u32,
    pub tier_name: String,
    pub ultimate_goals_completed: u32,
}

fn ultimate_target() -> u32 {
    STREAK_TIERS[STREAK_TIERS.len() - 1].target
}

pub fn build_next_goal_from_activity_streak(current_streak: u32) -> NextGoal {
    let cycle = ultimate_target();
    let ultimate_goals_completed = current_streak / cycle;
    let in_cycle = current_streak % cycle;

    // in_cycle < cycle, so the last tier always qualifies
    let last = STREAK_TIERS.len() - 1;
    let (index, tier) = STREAK_TIERS
        .iter()
        .copied()
        .enumerate()
        .find(|(_, tier)| tier.target > in_cycle)
        .unwrap_or((last, STREAK_TIERS[last]));

    // saturates for streaks within one tier of u32::MAX
    let target = u64::from(ultimate_goals_completed) * u64::from(cycle) + u64::from(tier.target);
    let target = u32::try_from(target).unwrap_or(u32::MAX);
    let progress = target - current_streak;
    let unit = if progress == 1 { "Day" } else { "Days" };

    NextGoal {
        text: format!("Practice {progress} More {unit}"),
        current: current_streak,
        target,
        progress,
        tiers_achieved: index as u32,
        tier_name: tier.name.to_string(),
        ultimate_goals_completed,
    }
}
