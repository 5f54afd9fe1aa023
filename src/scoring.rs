use std::collections::HashMap;

use crate::models::{Criterion, InteractionRecord, QualityScore, ScoreReason};

/// Exam-prep and coursework phrases; any match marks a question goal-aligned.
pub const GOAL_KEYWORDS: [&str; 12] = [
    "exam",
    "test",
    "certification",
    "comptia",
    "class",
    "course",
    "assignment",
    "homework",
    "study",
    "cert prep",
    "calendar",
    "upcoming",
];

/// Curriculum topics; any match marks a question as topic-specific.
pub const TOPIC_KEYWORDS: [&str; 10] = [
    "subnetting",
    "networking",
    "security",
    "hardware",
    "troubleshooting",
    "attendance",
    "health check",
    "assistant",
    "coach",
    "tutor",
];

pub const BASE_POINTS: u32 = 1;
pub const GOAL_ALIGNED_POINTS: u32 = 2;
pub const TOPIC_KEYWORD_POINTS: u32 = 1;
pub const DETAILED_RESPONSE_POINTS: u32 = 1;
pub const DETAILED_RESPONSE_MIN_WORDS: usize = 50;
pub const FOLLOW_UP_POINTS: u32 = 2;

/// Score one interaction in isolation. An exchange with an empty question
/// or an empty answer earns nothing; otherwise the base point plus every
/// applicable bonus (the checks are independent and stack).
pub fn score_question(input: &str, output: &str) -> QualityScore {
    if input.is_empty() || output.is_empty() {
        return QualityScore::default();
    }

    let mut points = BASE_POINTS;
    let mut criteria = Vec::new();
    let lowered = input.to_lowercase();

    if GOAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        points += GOAL_ALIGNED_POINTS;
        criteria.push(Criterion {
            reason: ScoreReason::GoalAligned,
            label: "Goal-aligned question (+2 pts)".to_string(),
        });
    }

    let matched_topics: Vec<String> = TOPIC_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .map(|k| k.to_string())
        .collect();
    if !matched_topics.is_empty() {
        points += TOPIC_KEYWORD_POINTS;
        criteria.push(Criterion {
            reason: ScoreReason::TopicKeyword {
                keywords: matched_topics,
            },
            label: "Specific topic/keyword (+1 pt)".to_string(),
        });
    }

    if output.split_whitespace().count() > DETAILED_RESPONSE_MIN_WORDS {
        points += DETAILED_RESPONSE_POINTS;
        criteria.push(Criterion {
            reason: ScoreReason::DetailedResponse,
            label: "Detailed response received (+1 pt)".to_string(),
        });
    }

    QualityScore { points, criteria }
}

/// Count follow-up questions for one student across the full interaction
/// log: within each course, every interaction after the first one counts.
pub fn count_follow_ups(records: &[InteractionRecord], email: &str) -> u32 {
    follow_ups_in(records.iter().filter(|r| r.email == email))
}

/// Same count over an already-gathered set of one student's records. Only
/// per-course group sizes matter, so no ordering of the input is required.
pub fn follow_ups_in<'a, I>(records: I) -> u32
where
    I: IntoIterator<Item = &'a InteractionRecord>,
{
    let mut per_course: HashMap<&str, u32> = HashMap::new();
    for record in records {
        *per_course.entry(record.course_id.as_str()).or_insert(0) += 1;
    }
    per_course.values().map(|n| n.saturating_sub(1)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, course_id: &str) -> InteractionRecord {
        InteractionRecord {
            email: email.to_string(),
            course_id: course_id.to_string(),
            ..InteractionRecord::default()
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn empty_input_or_output_scores_zero() {
        assert_eq!(score_question("", "an answer"), QualityScore::default());
        assert_eq!(score_question("a question", ""), QualityScore::default());
        assert_eq!(score_question("", ""), QualityScore::default());
    }

    #[test]
    fn plain_question_earns_base_point() {
        let score = score_question("what is the weather", "cloudy");
        assert_eq!(score.points, 1);
        assert!(score.criteria.is_empty());
    }

    #[test]
    fn exam_question_with_long_answer_earns_four_points() {
        let score = score_question(
            "I have an exam tomorrow, can you help?",
            &words(51),
        );
        assert_eq!(score.points, 4);
        assert_eq!(score.criteria.len(), 2);
        assert_eq!(score.criteria[0].reason, ScoreReason::GoalAligned);
        assert_eq!(score.criteria[1].reason, ScoreReason::DetailedResponse);
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let score = score_question("CompTIA CERT PREP plan?", "short");
        assert_eq!(score.points, 3);
    }

    #[test]
    fn goal_and_topic_bonuses_stack() {
        let score = score_question(
            "help me study subnetting for the exam",
            &words(60),
        );
        assert_eq!(score.points, 1 + 2 + 1 + 1);
        let topics: Vec<_> = score
            .criteria
            .iter()
            .filter_map(|c| match &c.reason {
                ScoreReason::TopicKeyword { keywords } => Some(keywords.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(topics, vec![vec!["subnetting".to_string()]]);
    }

    #[test]
    fn fifty_word_answer_is_not_detailed() {
        let score = score_question("hello there", &words(50));
        assert_eq!(score.points, 1);
        let score = score_question("hello there", &words(51));
        assert_eq!(score.points, 2);
    }

    #[test]
    fn topic_criterion_records_every_matched_keyword() {
        let score = score_question(
            "troubleshooting a networking issue with our security lab",
            "ok",
        );
        assert_eq!(score.points, 2);
        match &score.criteria[0].reason {
            ScoreReason::TopicKeyword { keywords } => {
                assert_eq!(keywords, &["networking", "security", "troubleshooting"]);
            }
            other => panic!("unexpected reason {other:?}"),
        }
    }

    #[test]
    fn three_records_in_one_course_yield_two_follow_ups() {
        let records = vec![
            record("a@x.com", "c1"),
            record("a@x.com", "c1"),
            record("a@x.com", "c1"),
        ];
        assert_eq!(count_follow_ups(&records, "a@x.com"), 2);
    }

    #[test]
    fn distinct_courses_yield_no_follow_ups() {
        let records = vec![
            record("a@x.com", "c1"),
            record("a@x.com", "c2"),
            record("a@x.com", "c3"),
        ];
        assert_eq!(count_follow_ups(&records, "a@x.com"), 0);
    }

    #[test]
    fn follow_ups_ignore_other_students() {
        let records = vec![
            record("a@x.com", "c1"),
            record("b@x.com", "c1"),
            record("a@x.com", "c1"),
        ];
        assert_eq!(count_follow_ups(&records, "a@x.com"), 1);
        assert_eq!(count_follow_ups(&records, "b@x.com"), 0);
    }

    #[test]
    fn records_without_course_id_group_together() {
        let records = vec![record("a@x.com", ""), record("a@x.com", "")];
        assert_eq!(count_follow_ups(&records, "a@x.com"), 1);
    }
}
