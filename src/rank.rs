use crate::achievements;
use crate::aggregate;
use crate::models::{Analysis, InteractionRecord, RankedUser, SummaryStats, UserAggregate};

/// Users at or above this point total count as high performers in the
/// cohort summary. These cohort thresholds are unrelated to any per-user
/// tier badges shown elsewhere.
pub const HIGH_PERFORMER_MIN_POINTS: u32 = 101;
pub const MEDIUM_PERFORMER_MIN_POINTS: u32 = 20;

/// Sort aggregates by total points descending and assign dense 1-based
/// ranks. The sort is stable, so ties keep the order in which the emails
/// were first encountered in the input.
pub fn rank_users(aggregates: Vec<UserAggregate>) -> Vec<RankedUser> {
    let mut users = aggregates;
    users.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    users
        .into_iter()
        .enumerate()
        .map(|(index, user)| RankedUser {
            rank: index + 1,
            achievements: achievements::classify(&user),
            user,
        })
        .collect()
}

pub fn summarize(users: &[RankedUser]) -> SummaryStats {
    let total_users = users.len();
    let total_points: u64 = users.iter().map(|u| u64::from(u.user.total_points)).sum();
    let avg_points_per_user = if total_users == 0 {
        0.0
    } else {
        total_points as f64 / total_users as f64
    };

    SummaryStats {
        total_users,
        total_interactions: users.iter().map(|u| u.user.total_interactions).sum(),
        total_credits: users.iter().map(|u| u.user.total_credits).sum(),
        avg_points_per_user,
        high_performers: users
            .iter()
            .filter(|u| u.user.total_points >= HIGH_PERFORMER_MIN_POINTS)
            .count(),
        medium_performers: users
            .iter()
            .filter(|u| {
                (MEDIUM_PERFORMER_MIN_POINTS..HIGH_PERFORMER_MIN_POINTS)
                    .contains(&u.user.total_points)
            })
            .count(),
        light_users: users
            .iter()
            .filter(|u| u.user.total_points < MEDIUM_PERFORMER_MIN_POINTS)
            .count(),
    }
}

/// Run the whole pipeline over one snapshot of the interaction log. Pure
/// and re-runnable: identical input yields an identical leaderboard.
pub fn analyze(records: &[InteractionRecord]) -> Analysis {
    let ranked_users = rank_users(aggregate::aggregate_users(records));
    let summary_stats = summarize(&ranked_users);
    Analysis {
        ranked_users,
        summary_stats,
    }
}
