use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod achievements;
mod aggregate;
mod db;
mod models;
mod rank;
mod report;
mod scoring;

use crate::models::Analysis;

#[derive(Parser)]
#[command(name = "engagement-leaderboard")]
#[command(about = "Gamification leaderboard for student AI-assistant engagement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small realistic sample dataset
    Seed,
    /// Import interaction records from a platform CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Drop previously imported records first
        #[arg(long)]
        replace: bool,
    },
    /// Score the cohort, persist a snapshot, and print the leaderboard
    Rank {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the most recent persisted snapshot without recomputing
    Results {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the current ranking as a CSV download
    Export {
        #[arg(long, default_value = "ranking.csv")]
        out: PathBuf,
    },
    /// Delete stored interactions and analysis snapshots
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv, replace } => {
            let inserted = db::import_csv(&pool, &csv, replace).await?;
            println!("Imported {inserted} interactions from {}.", csv.display());
        }
        Commands::Rank { limit } => {
            let records = db::fetch_interactions(&pool).await?;
            let analysis = rank::analyze(&records);
            let created_at = db::save_analysis(&pool, &analysis, records.len() as i64).await?;
            if analysis.ranked_users.is_empty() {
                println!("No student interactions to rank.");
                return Ok(());
            }
            println!("Snapshot saved at {created_at}.");
            print_leaderboard(&analysis, limit);
        }
        Commands::Results { limit } => match db::fetch_latest_analysis(&pool).await? {
            Some(stored) => {
                println!(
                    "Snapshot from {} covering {} raw records.",
                    stored.created_at, stored.raw_data_count
                );
                print_leaderboard(&stored.analysis, limit);
            }
            None => println!("No analysis results stored yet."),
        },
        Commands::Report { out } => {
            let records = db::fetch_interactions(&pool).await?;
            let analysis = rank::analyze(&records);
            std::fs::write(&out, report::build_report(&analysis))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let records = db::fetch_interactions(&pool).await?;
            let analysis = rank::analyze(&records);
            report::write_ranking_csv(&analysis.ranked_users, &out)?;
            println!("Ranking written to {}.", out.display());
        }
        Commands::Clear => {
            let (interactions, snapshots) = db::clear_all(&pool).await?;
            println!("Removed {interactions} interactions and {snapshots} snapshots.");
        }
    }

    Ok(())
}

fn print_leaderboard(analysis: &Analysis, limit: usize) {
    let stats = &analysis.summary_stats;
    println!(
        "{} students, {} interactions, {:.1} avg points per student",
        stats.total_users, stats.total_interactions, stats.avg_points_per_user
    );
    for user in analysis.ranked_users.iter().take(limit) {
        let badges = if user.achievements.is_empty() {
            String::new()
        } else {
            let labels: Vec<_> = user.achievements.iter().map(|b| b.label()).collect();
            format!(" [{}]", labels.join(", "))
        };
        println!(
            "- #{} {} ({}) {} pts across {} interactions, {:.1}% success{}",
            user.rank,
            user.user.name,
            user.user.email,
            user.user.total_points,
            user.user.total_interactions,
            user.user.success_rate,
            badges
        );
    }
}
