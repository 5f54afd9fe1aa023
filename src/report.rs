use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::models::{Analysis, Badge, RankedUser};

const LEADERBOARD_ROWS: usize = 10;

/// Count how many students earned each badge, in badge-definition order.
/// Badges nobody earned are dropped.
pub fn summarize_achievements(users: &[RankedUser]) -> Vec<(Badge, usize)> {
    [
        Badge::DeepDiver,
        Badge::StudyStrategist,
        Badge::BugHunter,
        Badge::PathwayPro,
    ]
    .into_iter()
    .map(|badge| {
        let count = users
            .iter()
            .filter(|u| u.achievements.contains(&badge))
            .count();
        (badge, count)
    })
    .filter(|(_, count)| *count > 0)
    .collect()
}

pub fn build_report(analysis: &Analysis) -> String {
    let stats = &analysis.summary_stats;
    let mut output = String::new();

    let _ = writeln!(output, "# AI Assistant Engagement Leaderboard");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Summary");
    let _ = writeln!(output, "- Students ranked: {}", stats.total_users);
    let _ = writeln!(
        output,
        "- Interactions analyzed: {}",
        stats.total_interactions
    );
    let _ = writeln!(output, "- Credits consumed: {}", stats.total_credits);
    let _ = writeln!(
        output,
        "- Average points per student: {:.1}",
        stats.avg_points_per_user
    );
    let _ = writeln!(
        output,
        "- High / medium / light engagement: {} / {} / {}",
        stats.high_performers, stats.medium_performers, stats.light_users
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");

    if analysis.ranked_users.is_empty() {
        let _ = writeln!(output, "No student interactions to rank.");
    } else {
        for user in analysis.ranked_users.iter().take(LEADERBOARD_ROWS) {
            let _ = writeln!(
                output,
                "- #{} {} ({}) {} pts across {} interactions, {} follow-ups, {:.1}% success",
                user.rank,
                user.user.name,
                user.user.email,
                user.user.total_points,
                user.user.total_interactions,
                user.user.follow_ups,
                user.user.success_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Achievements Awarded");

    let awarded = summarize_achievements(&analysis.ranked_users);
    if awarded.is_empty() {
        let _ = writeln!(output, "No achievements earned yet.");
    } else {
        for (badge, count) in awarded {
            let _ = writeln!(output, "- {}: {} students", badge.label(), count);
        }
    }

    output
}

#[derive(Serialize)]
struct ExportRow<'a> {
    rank: usize,
    name: &'a str,
    email: &'a str,
    #[serde(rename = "totalPoints")]
    total_points: u32,
    #[serde(rename = "totalInteractions")]
    total_interactions: usize,
    #[serde(rename = "totalCredits")]
    total_credits: i64,
    #[serde(rename = "followUps")]
    follow_ups: u32,
    #[serde(rename = "uniqueCourses")]
    unique_courses: usize,
    #[serde(rename = "uniqueAssistants")]
    unique_assistants: usize,
    #[serde(rename = "successRate")]
    success_rate: String,
    achievements: String,
}

/// Re-encode the ranking as CSV for download, one row per student.
pub fn write_ranking_csv(users: &[RankedUser], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for user in users {
        let achievements = user
            .achievements
            .iter()
            .map(|b| b.label())
            .collect::<Vec<_>>()
            .join("; ");
        writer.serialize(ExportRow {
            rank: user.rank,
            name: &user.user.name,
            email: &user.user.email,
            total_points: user.user.total_points,
            total_interactions: user.user.total_interactions,
            total_credits: user.user.total_credits,
            follow_ups: user.user.follow_ups,
            unique_courses: user.user.unique_courses,
            unique_assistants: user.user.unique_assistants,
            success_rate: format!("{:.1}", user.user.success_rate),
            achievements,
        })?;
    }
    writer.flush()?;
    Ok(())
}
