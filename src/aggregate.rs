use std::collections::{HashMap, HashSet};

use crate::models::{Criterion, InteractionRecord, ScoreReason, UserAggregate};
use crate::scoring;

/// Staff and internal accounts share this domain and never appear in
/// student rankings.
pub const INTERNAL_EMAIL_DOMAIN: &str = "perscholas.org";

pub const PATHWAY_PRO_POINTS: u32 = 5;
pub const PATHWAY_PRO_MIN_COURSES: usize = 3;

const UNKNOWN_USER: &str = "Unknown User";

fn is_internal(email: &str) -> bool {
    email.to_lowercase().contains(INTERNAL_EMAIL_DOMAIN)
}

/// Group records by student email and accumulate quality points, the
/// follow-up bonus, achievement-eligibility metrics, and success/latency
/// statistics. Records without an email are skipped; internal accounts are
/// excluded. The returned aggregates keep the order in which each email was
/// first encountered, which is also the tie-break order for ranking.
pub fn aggregate_users(records: &[InteractionRecord]) -> Vec<UserAggregate> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&InteractionRecord>> = HashMap::new();

    for record in records {
        if record.email.is_empty() || is_internal(&record.email) {
            continue;
        }
        grouped
            .entry(record.email.as_str())
            .or_insert_with(|| {
                order.push(record.email.as_str());
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .map(|email| aggregate_one(email, &grouped[email]))
        .collect()
}

fn aggregate_one(email: &str, records: &[&InteractionRecord]) -> UserAggregate {
    let total_interactions = records.len();
    let total_credits: i64 = records.iter().map(|r| r.credits).sum();

    let mut total_points: u32 = 0;
    let mut criteria_met: Vec<Criterion> = Vec::new();
    for record in records {
        let quality = scoring::score_question(&record.input, &record.outputs);
        total_points += quality.points;
        criteria_met.extend(quality.criteria);
    }

    let follow_ups = scoring::follow_ups_in(records.iter().copied());
    let follow_up_points = follow_ups * scoring::FOLLOW_UP_POINTS;
    total_points += follow_up_points;
    if follow_ups > 0 {
        criteria_met.push(Criterion {
            reason: ScoreReason::FollowUp { count: follow_ups },
            label: format!("Follow-up questions: {follow_ups} (+{follow_up_points} pts)"),
        });
    }

    let unique_courses = distinct_non_empty(records.iter().map(|r| r.course_name.as_str()));
    let unique_assistants =
        distinct_non_empty(records.iter().map(|r| r.instance_ai_name.as_str()));

    let pathway_pro = unique_courses >= PATHWAY_PRO_MIN_COURSES;
    if pathway_pro {
        total_points += PATHWAY_PRO_POINTS;
        criteria_met.push(Criterion {
            reason: ScoreReason::PathwayPro,
            label: "Pathway Pro achievement (+5 pts)".to_string(),
        });
    }

    // The identity set is derived from at least one record, so the
    // divisors below are never zero.
    let avg_duration_ms =
        records.iter().map(|r| r.query_duration_ms).sum::<i64>() as f64 / total_interactions as f64;
    let avg_ttft_ms =
        records.iter().map(|r| r.ttft_ms).sum::<i64>() as f64 / total_interactions as f64;

    let success_count = records.iter().filter(|r| r.success).count();
    let success_rate = success_count as f64 / total_interactions as f64 * 100.0;

    let first = records[0];
    let name = format!("{} {}", first.first, first.last);
    let name = name.trim();
    let name = if name.is_empty() {
        UNKNOWN_USER.to_string()
    } else {
        name.to_string()
    };

    UserAggregate {
        email: email.to_string(),
        name,
        total_points,
        total_interactions,
        total_credits,
        follow_ups,
        unique_courses,
        unique_assistants,
        avg_duration_ms,
        avg_ttft_ms,
        success_rate,
        pathway_pro,
        criteria_met,
    }
}

fn distinct_non_empty<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect::<HashSet<_>>()
        .len()
}
