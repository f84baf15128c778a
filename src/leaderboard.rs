use uuid::Uuid;

use crate::models::{Leaderboard, LeaderboardQuery, RankedEntry, StudentProgress};
use crate::progress::{self, ProjectionError};

/// Orders a roster snapshot for one query and locates the requested
/// student within it. The roster is expected to already be scoped; this
/// function never filters.
pub fn rank(
    roster: &[StudentProgress],
    query: &LeaderboardQuery,
    current_id: Uuid,
) -> Result<Leaderboard, ProjectionError> {
    let mut projected = Vec::with_capacity(roster.len());
    for student in roster {
        let points = progress::project(student, query.period)?;
        projected.push((student.clone(), points));
    }

    // sort_by is stable, so equal scores keep their roster order.
    projected.sort_by(|a, b| b.1.cmp(&a.1));

    let entries: Vec<RankedEntry> = projected
        .into_iter()
        .enumerate()
        .map(|(index, (student, projected_points))| RankedEntry {
            student,
            projected_points,
            rank: index + 1,
        })
        .collect();

    let current_rank = entries
        .iter()
        .find(|entry| entry.student.id == current_id)
        .map(|entry| entry.rank);

    Ok(Leaderboard {
        entries,
        current_rank,
    })
}

/// Gap between the leader and the requested student, for display.
/// `Some(0)` when the student leads; `None` when either is absent.
pub fn points_behind_leader(board: &Leaderboard, current_id: Uuid) -> Option<i64> {
    let leader = board.entries.first()?;
    let current = board
        .entries
        .iter()
        .find(|entry| entry.student.id == current_id)?;
    Some(leader.projected_points - current.projected_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Period, Scope};
    use chrono::NaiveDate;

    fn student(name: &str, eco_points: i64, weekly: Option<i64>) -> StudentProgress {
        StudentProgress {
            id: Uuid::new_v4(),
            name: name.to_string(),
            school: "Green Valley School".to_string(),
            state: "Gujarat".to_string(),
            grade: "9th".to_string(),
            eco_points,
            level: 5,
            streak: 6,
            completed_lessons: vec!["lesson-1".to_string()],
            completed_challenges: Vec::new(),
            weekly_points: weekly,
            monthly_points: None,
            weekly_goal: 200,
            monthly_goal: 800,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        }
    }

    fn all_time_query() -> LeaderboardQuery {
        LeaderboardQuery {
            period: Period::AllTime,
            scope: Scope::National,
        }
    }

    #[test]
    fn orders_by_points_descending_with_one_based_ranks() {
        let roster = vec![
            student("Arjun", 1380, None),
            student("Sneha", 1320, None),
            student("Rahul", 1180, None),
        ];
        let current = roster[1].id;

        let board = rank(&roster, &all_time_query(), current).unwrap();

        let points: Vec<i64> = board.entries.iter().map(|e| e.projected_points).collect();
        assert_eq!(points, vec![1380, 1320, 1180]);
        let ranks: Vec<usize> = board.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(board.current_rank, Some(2));
    }

    #[test]
    fn weekly_period_ranks_by_weekly_figures() {
        let roster = vec![
            student("Avni", 1380, Some(180)),
            student("Bala", 980, Some(220)),
        ];
        let current = roster[0].id;

        let query = LeaderboardQuery {
            period: Period::Weekly,
            scope: Scope::School,
        };
        let board = rank(&roster, &query, current).unwrap();

        assert_eq!(board.entries[0].student.name, "Bala");
        assert_eq!(board.entries[0].projected_points, 220);
        assert_eq!(board.entries[1].projected_points, 180);
        assert_eq!(board.current_rank, Some(2));
    }

    #[test]
    fn equal_scores_keep_roster_order() {
        let roster = vec![student("Xavi", 100, None), student("Yash", 100, None)];

        let board = rank(&roster, &all_time_query(), roster[0].id).unwrap();

        assert_eq!(board.entries[0].student.name, "Xavi");
        assert_eq!(board.entries[1].student.name, "Yash");
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[1].rank, 2);
    }

    #[test]
    fn empty_roster_yields_empty_board() {
        let board = rank(&[], &all_time_query(), Uuid::new_v4()).unwrap();
        assert!(board.entries.is_empty());
        assert_eq!(board.current_rank, None);
    }

    #[test]
    fn unknown_student_is_not_found_rather_than_an_error() {
        let roster = vec![student("Arjun", 500, None)];
        let board = rank(&roster, &all_time_query(), Uuid::new_v4()).unwrap();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.current_rank, None);
    }

    #[test]
    fn missing_period_figure_aborts_the_ranking() {
        let roster = vec![
            student("Avni", 1380, Some(180)),
            student("Bala", 980, None),
        ];
        let query = LeaderboardQuery {
            period: Period::Weekly,
            scope: Scope::National,
        };
        assert!(rank(&roster, &query, roster[0].id).is_err());
    }

    #[test]
    fn ranking_is_deterministic_across_calls() {
        let roster = vec![
            student("Arjun", 1380, Some(155)),
            student("Sneha", 1320, Some(155)),
            student("Rahul", 1180, Some(195)),
        ];
        let query = LeaderboardQuery {
            period: Period::Weekly,
            scope: Scope::State,
        };

        let first = rank(&roster, &query, roster[2].id).unwrap();
        let second = rank(&roster, &query, roster[2].id).unwrap();

        let first_ids: Vec<Uuid> = first.entries.iter().map(|e| e.student.id).collect();
        let second_ids: Vec<Uuid> = second.entries.iter().map(|e| e.student.id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.current_rank, second.current_rank);

        for pair in first.entries.windows(2) {
            assert!(pair[0].projected_points >= pair[1].projected_points);
        }
    }

    #[test]
    fn ranked_position_points_back_at_the_current_student() {
        let roster = vec![
            student("Arjun", 1380, None),
            student("Sneha", 1320, None),
            student("Rahul", 1180, None),
        ];
        let current = roster[2].id;

        let board = rank(&roster, &all_time_query(), current).unwrap();
        let rank_index = board.current_rank.unwrap() - 1;
        assert_eq!(board.entries[rank_index].student.id, current);
    }

    #[test]
    fn points_behind_leader_measures_the_gap() {
        let roster = vec![
            student("Arjun", 1380, None),
            student("Sneha", 1320, None),
        ];
        let current = roster[1].id;

        let board = rank(&roster, &all_time_query(), current).unwrap();
        assert_eq!(points_behind_leader(&board, current), Some(60));
        assert_eq!(points_behind_leader(&board, roster[0].id), Some(0));
        assert_eq!(points_behind_leader(&board, Uuid::new_v4()), None);
    }
}
