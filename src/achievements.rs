use crate::models::{Badge, ScoreReason, UserAggregate};

pub const DEEP_DIVER_MIN_FOLLOW_UPS: u32 = 5;
pub const STUDY_STRATEGIST_MIN_GOAL_ALIGNED: usize = 3;
pub const BUG_HUNTER_MIN_TROUBLESHOOTING: usize = 3;
pub const BUG_HUNTER_KEYWORD: &str = "troubleshooting";

/// Map one user's aggregate to the badges they earned. Badges are
/// independent of each other and always emitted in definition order.
pub fn classify(user: &UserAggregate) -> Vec<Badge> {
    let mut badges = Vec::new();

    if user.follow_ups >= DEEP_DIVER_MIN_FOLLOW_UPS {
        badges.push(Badge::DeepDiver);
    }

    let goal_aligned = user
        .criteria_met
        .iter()
        .filter(|c| c.reason == ScoreReason::GoalAligned)
        .count();
    if goal_aligned >= STUDY_STRATEGIST_MIN_GOAL_ALIGNED {
        badges.push(Badge::StudyStrategist);
    }

    let troubleshooting = user
        .criteria_met
        .iter()
        .filter(|c| match &c.reason {
            ScoreReason::TopicKeyword { keywords } => keywords
                .iter()
                .any(|k| k.eq_ignore_ascii_case(BUG_HUNTER_KEYWORD)),
            _ => false,
        })
        .count();
    if troubleshooting >= BUG_HUNTER_MIN_TROUBLESHOOTING {
        badges.push(Badge::BugHunter);
    }

    if user.pathway_pro {
        badges.push(Badge::PathwayPro);
    }

    badges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Criterion;

    fn empty_user() -> UserAggregate {
        UserAggregate {
            email: "alice@x.com".to_string(),
            name: "Alice Nguyen".to_string(),
            total_points: 0,
            total_interactions: 0,
            total_credits: 0,
            follow_ups: 0,
            unique_courses: 0,
            unique_assistants: 0,
            avg_duration_ms: 0.0,
            avg_ttft_ms: 0.0,
            success_rate: 0.0,
            pathway_pro: false,
            criteria_met: Vec::new(),
        }
    }

    fn goal_criterion() -> Criterion {
        Criterion {
            reason: ScoreReason::GoalAligned,
            label: "Goal-aligned question (+2 pts)".to_string(),
        }
    }

    fn topic_criterion(keywords: &[&str]) -> Criterion {
        Criterion {
            reason: ScoreReason::TopicKeyword {
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            },
            label: "Specific topic/keyword (+1 pt)".to_string(),
        }
    }

    #[test]
    fn no_activity_earns_no_badges() {
        assert!(classify(&empty_user()).is_empty());
    }

    #[test]
    fn deep_diver_needs_five_follow_ups() {
        let mut user = empty_user();
        user.follow_ups = 4;
        assert!(classify(&user).is_empty());
        user.follow_ups = 5;
        assert_eq!(classify(&user), [Badge::DeepDiver]);
    }

    #[test]
    fn study_strategist_needs_three_goal_aligned_questions() {
        let mut user = empty_user();
        user.criteria_met = vec![goal_criterion(), goal_criterion()];
        assert!(classify(&user).is_empty());
        user.criteria_met.push(goal_criterion());
        assert_eq!(classify(&user), [Badge::StudyStrategist]);
    }

    #[test]
    fn bug_hunter_counts_troubleshooting_questions() {
        let mut user = empty_user();
        user.criteria_met = vec![
            topic_criterion(&["troubleshooting"]),
            topic_criterion(&["networking", "troubleshooting"]),
            topic_criterion(&["hardware"]),
        ];
        assert!(classify(&user).is_empty());
        user.criteria_met.push(topic_criterion(&["troubleshooting"]));
        assert_eq!(classify(&user), [Badge::BugHunter]);
    }

    #[test]
    fn pathway_pro_follows_the_aggregate_flag() {
        let mut user = empty_user();
        user.pathway_pro = true;
        assert_eq!(classify(&user), [Badge::PathwayPro]);
    }

    #[test]
    fn badges_come_out_in_definition_order() {
        let mut user = empty_user();
        user.follow_ups = 7;
        user.pathway_pro = true;
        user.criteria_met = vec![
            goal_criterion(),
            goal_criterion(),
            goal_criterion(),
            topic_criterion(&["troubleshooting"]),
            topic_criterion(&["troubleshooting"]),
            topic_criterion(&["troubleshooting"]),
        ];
        assert_eq!(
            classify(&user),
            [
                Badge::DeepDiver,
                Badge::StudyStrategist,
                Badge::BugHunter,
                Badge::PathwayPro,
            ]
        );
    }
}
