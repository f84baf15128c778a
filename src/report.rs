use std::fmt::Write;

use crate::models::{Leaderboard, LeaderboardQuery, Period, StudentProgress};
use crate::{leaderboard, progress};

const STANDINGS_LIMIT: usize = 10;

pub fn build_report(
    current: &StudentProgress,
    query: &LeaderboardQuery,
    board: &Leaderboard,
    total_lessons: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Eco Leaderboard Report");
    let _ = writeln!(
        output,
        "Period: {} | Scope: {}",
        query.period.label(),
        query.scope.label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");

    if board.entries.is_empty() {
        let _ = writeln!(output, "No students in this view.");
    } else {
        for entry in board.entries.iter().take(3) {
            let _ = writeln!(
                output,
                "{}. {} ({}) with {} pts",
                entry.rank, entry.student.name, entry.student.school, entry.projected_points
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Full Standings");

    if board.entries.is_empty() {
        let _ = writeln!(output, "No students in this view.");
    } else {
        for entry in board.entries.iter().take(STANDINGS_LIMIT) {
            let marker = if entry.student.id == current.id {
                " (you)"
            } else {
                ""
            };
            let _ = writeln!(
                output,
                "- #{} {}{} | {} pts | level {} | {}-day streak",
                entry.rank,
                entry.student.name,
                marker,
                entry.projected_points,
                entry.student.level,
                entry.student.streak
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Your Standing");

    match board.current_rank {
        Some(rank) if rank == 1 => {
            let _ = writeln!(output, "{} leads this board at #1.", current.name);
        }
        Some(rank) => {
            let _ = writeln!(output, "{} is ranked #{}.", current.name, rank);
            if let Some(gap) = leaderboard::points_behind_leader(board, current.id) {
                let _ = writeln!(output, "{gap} points behind the leader.");
            }
        }
        None => {
            let _ = writeln!(output, "{} is not ranked in this view.", current.name);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Goal Progress");

    if let Some(weekly) = current.weekly_points {
        let _ = writeln!(
            output,
            "- Weekly goal: {}/{} ({:.0}%)",
            weekly,
            current.weekly_goal,
            progress::goal_progress(weekly, current.weekly_goal)
        );
    }
    if let Some(monthly) = current.monthly_points {
        let _ = writeln!(
            output,
            "- Monthly goal: {}/{} ({:.0}%)",
            monthly,
            current.monthly_goal,
            progress::goal_progress(monthly, current.monthly_goal)
        );
    }
    let _ = writeln!(
        output,
        "- Lessons completed: {}/{} ({:.0}%)",
        current.completed_lessons.len(),
        total_lessons,
        progress::lesson_completion(current, total_lessons)
    );
    let _ = writeln!(
        output,
        "- Challenges completed: {}",
        current.completed_challenges.len()
    );

    output
}

pub fn period_heading(period: Period) -> &'static str {
    match period {
        Period::Weekly => "This Week",
        Period::Monthly => "This Month",
        Period::AllTime => "All Time",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Scope, StudentProgress};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn student(name: &str, eco_points: i64) -> StudentProgress {
        StudentProgress {
            id: Uuid::new_v4(),
            name: name.to_string(),
            school: "Green Valley School".to_string(),
            state: "Gujarat".to_string(),
            grade: "9th".to_string(),
            eco_points,
            level: 6,
            streak: 9,
            completed_lessons: vec!["lesson-1".to_string()],
            completed_challenges: vec!["challenge-1".to_string()],
            weekly_points: Some(180),
            monthly_points: Some(720),
            weekly_goal: 200,
            monthly_goal: 800,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        }
    }

    #[test]
    fn report_marks_the_current_student_and_the_gap() {
        let roster = vec![student("Priya", 1380), student("Arjun", 1250)];
        let current = roster[1].clone();
        let query = LeaderboardQuery {
            period: Period::AllTime,
            scope: Scope::School,
        };
        let board = crate::leaderboard::rank(&roster, &query, current.id).unwrap();

        let report = build_report(&current, &query, &board, 4);
        assert!(report.contains("Arjun (you)"));
        assert!(report.contains("Arjun is ranked #2."));
        assert!(report.contains("130 points behind the leader."));
        assert!(report.contains("Weekly goal: 180/200 (90%)"));
    }

    #[test]
    fn empty_view_reports_not_ranked() {
        let current = student("Arjun", 1250);
        let query = LeaderboardQuery {
            period: Period::AllTime,
            scope: Scope::State,
        };
        let board = crate::leaderboard::rank(&[], &query, current.id).unwrap();

        let report = build_report(&current, &query, &board, 4);
        assert!(report.contains("No students in this view."));
        assert!(report.contains("Arjun is not ranked in this view."));
    }
}
