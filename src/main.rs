use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod db;
mod leaderboard;
mod models;
mod progress;
mod report;

use models::{LeaderboardQuery, Period, Scope, StudentProgress};

#[derive(Parser)]
#[command(name = "eco-leaderboard")]
#[command(about = "Eco points leaderboard and progress tracker for EcoLearn", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import a student roster from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank students for a period and scope
    #[command(group(
        ArgGroup::new("scope")
            .args(["school", "state", "national"])
            .multiple(false)
    ))]
    Rank {
        /// Email of the student whose standing to highlight
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = Period::AllTime)]
        period: Period,
        /// Rank against the student's own school
        #[arg(long)]
        school: bool,
        /// Rank against the student's own state
        #[arg(long)]
        state: bool,
        /// Rank nationally (the default)
        #[arg(long)]
        national: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Emit the full leaderboard as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Record a completed lesson or challenge and award its points
    #[command(group(
        ArgGroup::new("item")
            .args(["lesson", "challenge"])
            .required(true)
            .multiple(false)
    ))]
    Complete {
        #[arg(long)]
        email: String,
        #[arg(long)]
        lesson: Option<String>,
        #[arg(long)]
        challenge: Option<String>,
        #[arg(long)]
        points: i64,
    },
    /// Generate a markdown standings report
    #[command(group(
        ArgGroup::new("scope")
            .args(["school", "state", "national"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = Period::AllTime)]
        period: Period,
        #[arg(long)]
        school: bool,
        #[arg(long)]
        state: bool,
        #[arg(long)]
        national: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn selected_scope(school: bool, state: bool) -> Scope {
    if school {
        Scope::School
    } else if state {
        Scope::State
    } else {
        Scope::National
    }
}

/// Resolves the scope selection to a roster snapshot. The engine itself
/// never filters, so the subset is decided here, against the current
/// student's own school or state.
async fn scoped_roster(
    pool: &PgPool,
    current: &StudentProgress,
    scope: Scope,
) -> anyhow::Result<Vec<StudentProgress>> {
    match scope {
        Scope::School => db::fetch_roster(pool, Some(&current.school), None).await,
        Scope::State => db::fetch_roster(pool, None, Some(&current.state)).await,
        Scope::National => db::fetch_roster(pool, None, None).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

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
        Commands::Import { csv } => {
            let upserted = db::import_csv(&pool, &csv).await?;
            println!("Upserted {upserted} students from {}.", csv.display());
        }
        Commands::Rank {
            email,
            period,
            school,
            state,
            national: _,
            limit,
            json,
        } => {
            let scope = selected_scope(school, state);
            let current = db::fetch_student(&pool, &email).await?;
            let roster = scoped_roster(&pool, &current, scope).await?;

            let query = LeaderboardQuery { period, scope };
            let board = leaderboard::rank(&roster, &query, current.id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
                return Ok(());
            }

            if board.entries.is_empty() {
                println!("No students in this view.");
                return Ok(());
            }

            println!(
                "{} standings, {} scope:",
                report::period_heading(period),
                scope.label()
            );
            for entry in board.entries.iter().take(limit) {
                let marker = if entry.student.id == current.id {
                    " (you)"
                } else {
                    ""
                };
                println!(
                    "- #{} {}{} ({}, {}) {} pts",
                    entry.rank,
                    entry.student.name,
                    marker,
                    entry.student.school,
                    entry.student.state,
                    entry.projected_points
                );
            }

            match board.current_rank {
                Some(rank) => {
                    println!("Your current rank: #{rank}");
                    if let Some(gap) = leaderboard::points_behind_leader(&board, current.id) {
                        if gap > 0 {
                            println!("{gap} points behind the leader.");
                        }
                    }
                }
                None => println!("{} is not ranked in this view.", current.name),
            }
        }
        Commands::Complete {
            email,
            lesson,
            challenge,
            points,
        } => {
            let awarded = match (lesson, challenge) {
                (Some(lesson_id), _) => {
                    db::record_lesson(&pool, &email, &lesson_id, points).await?
                }
                (_, Some(challenge_id)) => {
                    db::record_challenge(&pool, &email, &challenge_id, points).await?
                }
                _ => anyhow::bail!("one of --lesson or --challenge is required"),
            };

            if awarded {
                println!("Recorded completion and awarded {points} eco points.");
            } else {
                println!("Already completed; no points awarded.");
            }
        }
        Commands::Report {
            email,
            period,
            school,
            state,
            national: _,
            out,
        } => {
            let scope = selected_scope(school, state);
            let current = db::fetch_student(&pool, &email).await?;
            let roster = scoped_roster(&pool, &current, scope).await?;

            let query = LeaderboardQuery { period, scope };
            let board = leaderboard::rank(&roster, &query, current.id)?;
            let total_lessons = db::count_lessons(&pool).await?;
            let report = report::build_report(&current, &query, &board, total_lessons);

            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
