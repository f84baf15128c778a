use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::StudentProgress;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    struct SeedStudent {
        id: &'static str,
        name: &'static str,
        email: &'static str,
        school: &'static str,
        state: &'static str,
        grade: &'static str,
        eco_points: i64,
        level: i32,
        streak: i32,
        weekly_points: i64,
        monthly_points: i64,
        join_date: (i32, u32, u32),
        lessons: &'static [&'static str],
        challenges: &'static [&'static str],
    }

    let students = vec![
        SeedStudent {
            id: "7c3f2b1a-5e64-4f8e-9b01-1a2b3c4d5e6f",
            name: "Arjun Mehta",
            email: "arjun.mehta@greenvalley.edu.in",
            school: "Green Valley School",
            state: "Gujarat",
            grade: "9th",
            eco_points: 1250,
            level: 7,
            streak: 12,
            weekly_points: 180,
            monthly_points: 720,
            join_date: (2024, 1, 5),
            lessons: &["lesson-1", "lesson-2"],
            challenges: &["challenge-1", "challenge-2"],
        },
        SeedStudent {
            id: "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc",
            name: "Priya Patel",
            email: "priya.patel@greenvalley.edu.in",
            school: "Green Valley School",
            state: "Gujarat",
            grade: "10th",
            eco_points: 1380,
            level: 8,
            streak: 15,
            weekly_points: 220,
            monthly_points: 850,
            join_date: (2023, 12, 15),
            lessons: &["lesson-1", "lesson-2"],
            challenges: &["challenge-1", "challenge-2", "challenge-3", "challenge-4"],
        },
        SeedStudent {
            id: "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            name: "Rahul Kumar",
            email: "rahul.kumar@greenvalley.edu.in",
            school: "Green Valley School",
            state: "Bihar",
            grade: "9th",
            eco_points: 1180,
            level: 6,
            streak: 8,
            weekly_points: 165,
            monthly_points: 650,
            join_date: (2024, 1, 10),
            lessons: &["lesson-1"],
            challenges: &["challenge-1", "challenge-5"],
        },
        SeedStudent {
            id: "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2",
            name: "Sneha Reddy",
            email: "sneha.reddy@ecowarriors.edu.in",
            school: "Eco Warriors High",
            state: "Telangana",
            grade: "10th",
            eco_points: 1320,
            level: 7,
            streak: 11,
            weekly_points: 195,
            monthly_points: 780,
            join_date: (2023, 11, 20),
            lessons: &["lesson-1", "lesson-2"],
            challenges: &["challenge-1", "challenge-2", "challenge-3"],
        },
        SeedStudent {
            id: "9e8d7c6b-5a49-4382-b1c0-d9e8f7a6b5c4",
            name: "Aarav Singh",
            email: "aarav.singh@naturelovers.edu.in",
            school: "Nature Lovers Academy",
            state: "Rajasthan",
            grade: "8th",
            eco_points: 980,
            level: 5,
            streak: 6,
            weekly_points: 155,
            monthly_points: 620,
            join_date: (2024, 2, 1),
            lessons: &["lesson-1"],
            challenges: &["challenge-1", "challenge-4"],
        },
    ];

    for student in students {
        let id = Uuid::parse_str(student.id)?;
        let (year, month, day) = student.join_date;
        let join_date = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;

        sqlx::query(
            r#"
            INSERT INTO eco_leaderboard.students
            (id, name, email, school, state, grade, eco_points, level, streak,
             weekly_points, monthly_points, weekly_goal, monthly_goal, join_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 200, 800, $12)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                school = EXCLUDED.school,
                state = EXCLUDED.state,
                grade = EXCLUDED.grade,
                eco_points = EXCLUDED.eco_points,
                level = EXCLUDED.level,
                streak = EXCLUDED.streak,
                weekly_points = EXCLUDED.weekly_points,
                monthly_points = EXCLUDED.monthly_points
            "#,
        )
        .bind(id)
        .bind(student.name)
        .bind(student.email)
        .bind(student.school)
        .bind(student.state)
        .bind(student.grade)
        .bind(student.eco_points)
        .bind(student.level)
        .bind(student.streak)
        .bind(student.weekly_points)
        .bind(student.monthly_points)
        .bind(join_date)
        .execute(pool)
        .await?;

        for lesson in student.lessons {
            sqlx::query(
                r#"
                INSERT INTO eco_leaderboard.completed_lessons (student_id, lesson_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(lesson)
            .execute(pool)
            .await?;
        }

        for challenge in student.challenges {
            sqlx::query(
                r#"
                INSERT INTO eco_leaderboard.completed_challenges (student_id, challenge_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(challenge)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        email: String,
        school: String,
        state: String,
        grade: String,
        eco_points: i64,
        level: i32,
        streak: i32,
        weekly_points: Option<i64>,
        monthly_points: Option<i64>,
        weekly_goal: i64,
        monthly_goal: i64,
        join_date: NaiveDate,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut upserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        anyhow::ensure!(
            row.eco_points >= 0,
            "negative eco_points for {} in CSV",
            row.email
        );

        let affected = sqlx::query(
            r#"
            INSERT INTO eco_leaderboard.students
            (id, name, email, school, state, grade, eco_points, level, streak,
             weekly_points, monthly_points, weekly_goal, monthly_goal, join_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                school = EXCLUDED.school,
                state = EXCLUDED.state,
                grade = EXCLUDED.grade,
                eco_points = EXCLUDED.eco_points,
                level = EXCLUDED.level,
                streak = EXCLUDED.streak,
                weekly_points = EXCLUDED.weekly_points,
                monthly_points = EXCLUDED.monthly_points,
                weekly_goal = EXCLUDED.weekly_goal,
                monthly_goal = EXCLUDED.monthly_goal
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.school)
        .bind(&row.state)
        .bind(&row.grade)
        .bind(row.eco_points)
        .bind(row.level)
        .bind(row.streak)
        .bind(row.weekly_points)
        .bind(row.monthly_points)
        .bind(row.weekly_goal)
        .bind(row.monthly_goal)
        .bind(row.join_date)
        .execute(pool)
        .await?;

        if affected.rows_affected() > 0 {
            upserted += 1;
        }
    }

    Ok(upserted)
}

pub async fn fetch_student(pool: &PgPool, email: &str) -> anyhow::Result<StudentProgress> {
    let row = sqlx::query(
        "SELECT id, name, school, state, grade, eco_points, level, streak, \
         weekly_points, monthly_points, weekly_goal, monthly_goal, join_date \
         FROM eco_leaderboard.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student found for {email}"))?;

    let id: Uuid = row.get("id");
    let mut student = student_from_row(&row);
    student.completed_lessons = fetch_memberships(
        pool,
        "SELECT lesson_id AS item FROM eco_leaderboard.completed_lessons \
         WHERE student_id = $1 ORDER BY lesson_id",
        id,
    )
    .await?;
    student.completed_challenges = fetch_memberships(
        pool,
        "SELECT challenge_id AS item FROM eco_leaderboard.completed_challenges \
         WHERE student_id = $1 ORDER BY challenge_id",
        id,
    )
    .await?;

    Ok(student)
}

pub async fn fetch_roster(
    pool: &PgPool,
    school: Option<&str>,
    state: Option<&str>,
) -> anyhow::Result<Vec<StudentProgress>> {
    let mut query = String::from(
        "SELECT id, name, school, state, grade, eco_points, level, streak, \
         weekly_points, monthly_points, weekly_goal, monthly_goal, join_date \
         FROM eco_leaderboard.students",
    );

    if school.is_some() {
        query.push_str(" WHERE school = $1");
    } else if state.is_some() {
        query.push_str(" WHERE state = $1");
    }
    // Stable fetch order keeps tie-breaking deterministic across runs.
    query.push_str(" ORDER BY name, id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = school {
        rows = rows.bind(value);
    } else if let Some(value) = state {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut roster: Vec<StudentProgress> =
        records.iter().map(student_from_row).collect();

    let mut lessons = fetch_all_memberships(
        pool,
        "SELECT student_id, lesson_id AS item FROM eco_leaderboard.completed_lessons",
    )
    .await?;
    let mut challenges = fetch_all_memberships(
        pool,
        "SELECT student_id, challenge_id AS item FROM eco_leaderboard.completed_challenges",
    )
    .await?;

    for student in roster.iter_mut() {
        if let Some(items) = lessons.remove(&student.id) {
            student.completed_lessons = items;
        }
        if let Some(items) = challenges.remove(&student.id) {
            student.completed_challenges = items;
        }
    }

    Ok(roster)
}

/// Records a completion and awards its points to the lifetime total and to
/// both open period figures. A repeat completion awards nothing.
pub async fn record_lesson(
    pool: &PgPool,
    email: &str,
    lesson_id: &str,
    points: i64,
) -> anyhow::Result<bool> {
    record_completion(pool, email, lesson_id, points, "completed_lessons", "lesson_id").await
}

pub async fn record_challenge(
    pool: &PgPool,
    email: &str,
    challenge_id: &str,
    points: i64,
) -> anyhow::Result<bool> {
    record_completion(
        pool,
        email,
        challenge_id,
        points,
        "completed_challenges",
        "challenge_id",
    )
    .await
}

async fn record_completion(
    pool: &PgPool,
    email: &str,
    item_id: &str,
    points: i64,
    table: &str,
    column: &str,
) -> anyhow::Result<bool> {
    anyhow::ensure!(points >= 0, "point award must be non-negative");

    let student_id: Uuid = sqlx::query("SELECT id FROM eco_leaderboard.students WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no student found for {email}"))?
        .get("id");

    let insert = format!(
        "INSERT INTO eco_leaderboard.{table} (student_id, {column}) \
         VALUES ($1, $2) ON CONFLICT DO NOTHING"
    );
    let result = sqlx::query(&insert)
        .bind(student_id)
        .bind(item_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE eco_leaderboard.students
        SET eco_points = eco_points + $2,
            weekly_points = COALESCE(weekly_points, 0) + $2,
            monthly_points = COALESCE(monthly_points, 0) + $2
        WHERE id = $1
        "#,
    )
    .bind(student_id)
    .bind(points)
    .execute(pool)
    .await?;

    Ok(true)
}

/// Distinct lessons anyone has completed, used as the catalog size when
/// reporting completion percentages.
pub async fn count_lessons(pool: &PgPool) -> anyhow::Result<usize> {
    let row = sqlx::query(
        "SELECT COUNT(DISTINCT lesson_id) AS total FROM eco_leaderboard.completed_lessons",
    )
    .fetch_one(pool)
    .await?;
    let total: i64 = row.get("total");
    Ok(total as usize)
}

fn student_from_row(row: &sqlx::postgres::PgRow) -> StudentProgress {
    StudentProgress {
        id: row.get("id"),
        name: row.get("name"),
        school: row.get("school"),
        state: row.get("state"),
        grade: row.get("grade"),
        eco_points: row.get("eco_points"),
        level: row.get("level"),
        streak: row.get("streak"),
        completed_lessons: Vec::new(),
        completed_challenges: Vec::new(),
        weekly_points: row.get("weekly_points"),
        monthly_points: row.get("monthly_points"),
        weekly_goal: row.get("weekly_goal"),
        monthly_goal: row.get("monthly_goal"),
        join_date: row.get("join_date"),
    }
}

async fn fetch_memberships(
    pool: &PgPool,
    query: &str,
    student_id: Uuid,
) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(query).bind(student_id).fetch_all(pool).await?;
    Ok(rows.iter().map(|row| row.get("item")).collect())
}

async fn fetch_all_memberships(
    pool: &PgPool,
    query: &str,
) -> anyhow::Result<HashMap<Uuid, Vec<String>>> {
    let rows = sqlx::query(query).fetch_all(pool).await?;
    let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in rows {
        let student_id: Uuid = row.get("student_id");
        map.entry(student_id).or_default().push(row.get("item"));
    }
    Ok(map)
}
