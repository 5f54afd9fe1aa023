use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Analysis, InteractionRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Columns of the assistant platform's CSV export. Everything is text at
/// the source; numeric, boolean, and timestamp fields are coerced here so
/// the scoring pipeline only sees normalized values.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    email: String,
    #[serde(default)]
    first: String,
    #[serde(default)]
    last: String,
    #[serde(default)]
    input: String,
    #[serde(default)]
    outputs: String,
    #[serde(default)]
    course_id: String,
    #[serde(default)]
    course_name: String,
    #[serde(default, rename = "instance_ainame")]
    instance_ai_name: String,
    #[serde(default, deserialize_with = "de_lenient_count")]
    credits: i64,
    #[serde(default, deserialize_with = "de_lenient_count")]
    query_duration_ms: i64,
    #[serde(default, rename = "ttft", deserialize_with = "de_lenient_count")]
    ttft_ms: i64,
    #[serde(default, deserialize_with = "de_lenient_success")]
    success: bool,
    #[serde(default, deserialize_with = "de_lenient_timestamp")]
    created: Option<DateTime<Utc>>,
}

impl From<CsvRow> for InteractionRecord {
    fn from(row: CsvRow) -> Self {
        InteractionRecord {
            email: row.email,
            first: row.first,
            last: row.last,
            input: row.input,
            outputs: row.outputs,
            course_id: row.course_id,
            course_name: row.course_name,
            instance_ai_name: row.instance_ai_name,
            credits: row.credits,
            query_duration_ms: row.query_duration_ms,
            ttft_ms: row.ttft_ms,
            success: row.success,
            created: row.created,
        }
    }
}

/// Non-numeric or missing values coerce to 0; negatives clamp to 0.
pub fn coerce_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return value.max(0);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => (value as i64).max(0),
        _ => 0,
    }
}

/// The export writes booleans as the literal `TRUE`/`FALSE`.
pub fn coerce_success(raw: &str) -> bool {
    matches!(raw.trim(), "TRUE" | "true")
}

pub fn coerce_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn de_lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(coerce_count).unwrap_or(0))
}

fn de_lenient_success<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(coerce_success).unwrap_or(false))
}

fn de_lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(coerce_timestamp))
}

async fn insert_interaction(pool: &PgPool, record: &InteractionRecord) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO engagement_leaderboard.interactions
        (id, email, first_name, last_name, input, outputs, course_id, course_name,
         instance_ai_name, credits, query_duration_ms, ttft_ms, success, created)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.email)
    .bind(&record.first)
    .bind(&record.last)
    .bind(&record.input)
    .bind(&record.outputs)
    .bind(&record.course_id)
    .bind(&record.course_name)
    .bind(&record.instance_ai_name)
    .bind(record.credits)
    .bind(record.query_duration_ms)
    .bind(record.ttft_ms)
    .bind(record.success)
    .bind(record.created)
    .execute(pool)
    .await?;
    Ok(())
}

/// Append rows from a platform CSV export to the interaction log,
/// preserving file order. With `replace`, the previous dataset is dropped
/// first, matching how each upload replaced the stored dataset upstream.
pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    replace: bool,
) -> anyhow::Result<usize> {
    if replace {
        sqlx::query("DELETE FROM engagement_leaderboard.interactions")
            .execute(pool)
            .await?;
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let record: InteractionRecord = result?.into();
        insert_interaction(pool, &record).await?;
        inserted += 1;
    }

    Ok(inserted)
}

/// The full interaction log in upload order, the order the pipeline's
/// tie-breaking depends on.
pub async fn fetch_interactions(pool: &PgPool) -> anyhow::Result<Vec<InteractionRecord>> {
    let rows = sqlx::query(
        "SELECT email, first_name, last_name, input, outputs, course_id, course_name, \
         instance_ai_name, credits, query_duration_ms, ttft_ms, success, created \
         FROM engagement_leaderboard.interactions \
         ORDER BY position",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(InteractionRecord {
            email: row.get("email"),
            first: row.get("first_name"),
            last: row.get("last_name"),
            input: row.get("input"),
            outputs: row.get("outputs"),
            course_id: row.get("course_id"),
            course_name: row.get("course_name"),
            instance_ai_name: row.get("instance_ai_name"),
            credits: row.get("credits"),
            query_duration_ms: row.get("query_duration_ms"),
            ttft_ms: row.get("ttft_ms"),
            success: row.get("success"),
            created: row.get("created"),
        });
    }

    Ok(records)
}

pub async fn save_analysis(
    pool: &PgPool,
    analysis: &Analysis,
    raw_data_count: i64,
) -> anyhow::Result<DateTime<Utc>> {
    let created_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO engagement_leaderboard.analysis_results
        (id, created_at, summary_stats, ranking_data, raw_data_count)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(created_at)
    .bind(serde_json::to_value(&analysis.summary_stats)?)
    .bind(serde_json::to_value(&analysis.ranked_users)?)
    .bind(raw_data_count)
    .execute(pool)
    .await?;
    Ok(created_at)
}

#[derive(Debug)]
pub struct StoredAnalysis {
    pub analysis: Analysis,
    pub created_at: DateTime<Utc>,
    pub raw_data_count: i64,
}

pub async fn fetch_latest_analysis(pool: &PgPool) -> anyhow::Result<Option<StoredAnalysis>> {
    let row = sqlx::query(
        "SELECT created_at, summary_stats, ranking_data, raw_data_count \
         FROM engagement_leaderboard.analysis_results \
         ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let summary_stats: serde_json::Value = row.get("summary_stats");
    let ranking_data: serde_json::Value = row.get("ranking_data");
    Ok(Some(StoredAnalysis {
        analysis: Analysis {
            ranked_users: serde_json::from_value(ranking_data)
                .context("stored ranking payload did not match the expected shape")?,
            summary_stats: serde_json::from_value(summary_stats)
                .context("stored summary payload did not match the expected shape")?,
        },
        created_at: row.get("created_at"),
        raw_data_count: row.get("raw_data_count"),
    }))
}

/// Drop stored interactions and analysis snapshots. Returns how many of
/// each were removed.
pub async fn clear_all(pool: &PgPool) -> anyhow::Result<(u64, u64)> {
    let interactions = sqlx::query("DELETE FROM engagement_leaderboard.interactions")
        .execute(pool)
        .await?
        .rows_affected();
    let snapshots = sqlx::query("DELETE FROM engagement_leaderboard.analysis_results")
        .execute(pool)
        .await?
        .rows_affected();
    Ok((interactions, snapshots))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let rows: Vec<(&str, &str, &str, &str, &str, &str, &str, &str, i64, i64, i64, bool, &str)> = vec![
        (
            "maria.lopez@gmail.com",
            "Maria",
            "Lopez",
            "Can you help me study subnetting for the CompTIA exam?",
            "Sure. Subnetting splits a network into smaller segments. Start with the \
             subnet mask: it marks which bits identify the network and which identify \
             hosts. Practice converting masks to prefix lengths, then work through a \
             few /26 and /27 examples until the borrowing pattern feels natural. \
             After that, timed drills are the fastest way to build exam speed, so \
             set a five minute timer and run address blocks until they stick.",
            "net-101",
            "Networking Fundamentals",
            "study-coach",
            3,
            1800,
            240,
            true,
            "2026-07-01T10:00:00Z",
        ),
        (
            "maria.lopez@gmail.com",
            "Maria",
            "Lopez",
            "Follow-up: how many hosts fit in a /26?",
            "A /26 leaves six host bits, so 62 usable addresses.",
            "net-101",
            "Networking Fundamentals",
            "study-coach",
            1,
            900,
            180,
            true,
            "2026-07-01T10:12:00Z",
        ),
        (
            "devon.carter@outlook.com",
            "Devon",
            "Carter",
            "My lab VM will not boot, can you walk me through troubleshooting it?",
            "Check the hypervisor log first, then confirm the disk image path.",
            "hw-210",
            "Hardware Essentials",
            "lab-assistant",
            2,
            2400,
            310,
            true,
            "2026-07-02T09:30:00Z",
        ),
        (
            "priya.shah@gmail.com",
            "Priya",
            "Shah",
            "What should I review before the security certification test?",
            "Focus on the CIA triad, common attack types, and port numbers.",
            "sec-301",
            "Security Foundations",
            "study-coach",
            2,
            1500,
            200,
            true,
            "2026-07-02T14:05:00Z",
        ),
        (
            "priya.shah@gmail.com",
            "Priya",
            "Shah",
            "Explain VLAN trunking for my networking class",
            "Trunk links carry traffic for multiple VLANs between switches.",
            "net-101",
            "Networking Fundamentals",
            "tutor",
            2,
            1700,
            220,
            false,
            "2026-07-03T11:40:00Z",
        ),
        (
            "priya.shah@gmail.com",
            "Priya",
            "Shah",
            "Is my attendance on track this month?",
            "You have attended nine of ten sessions so far.",
            "ops-001",
            "Program Operations",
            "attendance-bot",
            1,
            600,
            150,
            true,
            "2026-07-05T08:20:00Z",
        ),
        (
            "coach@perscholas.org",
            "Jordan",
            "Reyes",
            "Which students asked about the upcoming exam this week?",
            "Twelve students asked exam related questions this week.",
            "ops-001",
            "Program Operations",
            "staff-console",
            1,
            800,
            170,
            true,
            "2026-07-05T16:45:00Z",
        ),
    ];

    for (email, first, last, input, outputs, course_id, course_name, assistant, credits, duration, ttft, success, created) in rows {
        let record = InteractionRecord {
            email: email.to_string(),
            first: first.to_string(),
            last: last.to_string(),
            input: input.to_string(),
            outputs: outputs.to_string(),
            course_id: course_id.to_string(),
            course_name: course_name.to_string(),
            instance_ai_name: assistant.to_string(),
            credits,
            query_duration_ms: duration,
            ttft_ms: ttft,
            success,
            created: Some(
                created
                    .parse::<DateTime<Utc>>()
                    .context("invalid seed timestamp")?,
            ),
        };
        insert_interaction(pool, &record).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_coerce_non_numeric_to_zero() {
        assert_eq!(coerce_count("42"), 42);
        assert_eq!(coerce_count(" 42 "), 42);
        assert_eq!(coerce_count("12.9"), 12);
        assert_eq!(coerce_count("-5"), 0);
        assert_eq!(coerce_count("n/a"), 0);
        assert_eq!(coerce_count(""), 0);
    }

    #[test]
    fn success_accepts_only_true_literals() {
        assert!(coerce_success("TRUE"));
        assert!(coerce_success("true"));
        assert!(!coerce_success("FALSE"));
        assert!(!coerce_success("yes"));
        assert!(!coerce_success(""));
    }

    #[test]
    fn timestamps_parse_common_export_formats() {
        assert!(coerce_timestamp("2026-07-01T10:00:00Z").is_some());
        assert!(coerce_timestamp("2026-07-01T10:00:00+02:00").is_some());
        assert!(coerce_timestamp("2026-07-01 10:00:00").is_some());
        assert!(coerce_timestamp("2026-07-01 10:00:00.250").is_some());
        assert!(coerce_timestamp("last tuesday").is_none());
        assert!(coerce_timestamp("").is_none());
    }

    #[test]
    fn csv_rows_coerce_into_normalized_records() {
        let data = "email,first,last,input,outputs,course_id,course_name,instance_ainame,credits,query_duration_ms,ttft,success,created\n\
                    a@x.com,Ada,Lovelace,hello,world,c1,Course One,coach,3,oops,120,TRUE,2026-07-01T10:00:00Z\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<CsvRow> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("csv should parse");
        let record: InteractionRecord = rows.into_iter().next().unwrap().into();
        assert_eq!(record.email, "a@x.com");
        assert_eq!(record.instance_ai_name, "coach");
        assert_eq!(record.credits, 3);
        assert_eq!(record.query_duration_ms, 0);
        assert_eq!(record.ttft_ms, 120);
        assert!(record.success);
        assert!(record.created.is_some());
    }
}
