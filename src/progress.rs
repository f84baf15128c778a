use thiserror::Error;
use uuid::Uuid;

use crate::models::{Period, StudentProgress};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("no {period} point figure recorded for student {student_id}")]
    MissingPeriodData { student_id: Uuid, period: Period },
}

/// Maps a student's stored state to the point figure used for ranking
/// under `period`. Period figures are tracked upstream as their own
/// quantities, so this is a lookup, never a transform of the lifetime
/// total.
pub fn project(student: &StudentProgress, period: Period) -> Result<i64, ProjectionError> {
    let points = match period {
        Period::AllTime => Some(student.eco_points),
        Period::Weekly => student.weekly_points,
        Period::Monthly => student.monthly_points,
    };

    let points = points.ok_or(ProjectionError::MissingPeriodData {
        student_id: student.id,
        period,
    })?;
    assert!(
        points >= 0,
        "negative point figure for student {}",
        student.id
    );
    Ok(points)
}

/// Percent progress toward a goal, capped at 100. Used by reporting only.
pub fn goal_progress(points: i64, goal: i64) -> f64 {
    if goal <= 0 {
        return 0.0;
    }
    ((points as f64 / goal as f64) * 100.0).min(100.0)
}

/// Percent of the lesson catalog the student has completed.
pub fn lesson_completion(student: &StudentProgress, total_lessons: usize) -> f64 {
    if total_lessons == 0 {
        return 0.0;
    }
    (student.completed_lessons.len() as f64 / total_lessons as f64) * 100.0
}
