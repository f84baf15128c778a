use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct StudentProgress {
    pub id: Uuid,
    pub name: String,
    pub school: String,
    pub state: String,
    pub grade: String,
    pub eco_points: i64,
    pub level: i32,
    pub streak: i32,
    pub completed_lessons: Vec<String>,
    pub completed_challenges: Vec<String>,
    pub weekly_points: Option<i64>,
    pub monthly_points: Option<i64>,
    pub weekly_goal: i64,
    pub monthly_goal: i64,
    pub join_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    Weekly,
    Monthly,
    AllTime,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::AllTime => "all-time",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    School,
    State,
    National,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::School => "school",
            Scope::State => "state",
            Scope::National => "national",
        }
    }
}

/// One leaderboard computation request. The engine only reads `period`;
/// `scope` is carried so output can say which roster subset it describes.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardQuery {
    pub period: Period,
    pub scope: Scope,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub student: StudentProgress,
    pub projected_points: i64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub entries: Vec<RankedEntry>,
    /// 1-based rank of the requested student, `None` when that student is
    /// not in the supplied roster (e.g. filtered out by scope).
    pub current_rank: Option<usize>,
}
