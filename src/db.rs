use std::path::Path;

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::dataset::{self, Dataset};
use crate::models::{AttendanceRecord, Exam, ExamRegistration, FeeStatus};

/// Which table a CSV import feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportKind {
    Exams,
    Registrations,
    Attendance,
    FeeStatus,
}

pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let url = settings.url()?;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(settings.acquire_timeout_secs))
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let reference = Dataset::reference()?;

    for exam in &reference.exams {
        upsert_exam(pool, exam).await?;
    }
    for registration in &reference.registrations {
        upsert_registration(pool, registration).await?;
    }
    for record in &reference.attendance {
        upsert_attendance(pool, record).await?;
    }
    for status in &reference.fee_statuses {
        upsert_fee_status(pool, status).await?;
    }

    info!(
        exams = reference.exams.len(),
        registrations = reference.registrations.len(),
        "reference dataset seeded"
    );
    Ok(())
}

pub async fn import_csv(pool: &PgPool, kind: ImportKind, csv_path: &Path) -> anyhow::Result<u64> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0u64;

    match kind {
        ImportKind::Exams => {
            for exam in dataset::read_exams(file)? {
                written += upsert_exam(pool, &exam).await?;
            }
        }
        ImportKind::Registrations => {
            for registration in dataset::read_registrations(file)? {
                written += upsert_registration(pool, &registration).await?;
            }
        }
        ImportKind::Attendance => {
            for record in dataset::read_attendance(file)? {
                written += upsert_attendance(pool, &record).await?;
            }
        }
        ImportKind::FeeStatus => {
            for status in dataset::read_fee_statuses(file)? {
                written += upsert_fee_status(pool, &status).await?;
            }
        }
    }

    info!(?kind, path = %csv_path.display(), written, "CSV import finished");
    Ok(written)
}

async fn upsert_exam(pool: &PgPool, exam: &Exam) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exam_entry.exams
        (id, course_code, course_title, exam_date, exam_time, room, semester)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE
        SET course_code = EXCLUDED.course_code,
            course_title = EXCLUDED.course_title,
            exam_date = EXCLUDED.exam_date,
            exam_time = EXCLUDED.exam_time,
            room = EXCLUDED.room,
            semester = EXCLUDED.semester
        "#,
    )
    .bind(&exam.id)
    .bind(&exam.course_code)
    .bind(&exam.course_title)
    .bind(exam.date)
    .bind(&exam.time)
    .bind(&exam.room)
    .bind(&exam.semester)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_registration(pool: &PgPool, registration: &ExamRegistration) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exam_entry.registrations (id, student_email, exam_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (student_email, exam_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&registration.student_email)
    .bind(&registration.exam_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_attendance(pool: &PgPool, record: &AttendanceRecord) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exam_entry.attendance (id, student_email, course_code, percentage)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_email, course_code) DO UPDATE
        SET percentage = EXCLUDED.percentage
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.student_email)
    .bind(&record.course_code)
    .bind(record.percentage)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_fee_status(pool: &PgPool, status: &FeeStatus) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exam_entry.fee_status (student_email, is_defaulter)
        VALUES ($1, $2)
        ON CONFLICT (student_email) DO UPDATE
        SET is_defaulter = EXCLUDED.is_defaulter
        "#,
    )
    .bind(&status.student_email)
    .bind(status.is_defaulter)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

const EXAM_COLUMNS: &str =
    "e.id, e.course_code, e.course_title, e.exam_date, e.exam_time, e.room, e.semester";

fn exam_from_row(row: &PgRow) -> Exam {
    Exam {
        id: row.get("id"),
        course_code: row.get("course_code"),
        course_title: row.get("course_title"),
        date: row.get("exam_date"),
        time: row.get("exam_time"),
        room: row.get("room"),
        semester: row.get("semester"),
    }
}

fn attendance_from_row(row: &PgRow) -> AttendanceRecord {
    AttendanceRecord {
        student_email: row.get("student_email"),
        course_code: row.get("course_code"),
        percentage: row.get("percentage"),
    }
}

fn registration_from_row(row: &PgRow) -> ExamRegistration {
    ExamRegistration {
        student_email: row.get("student_email"),
        exam_id: row.get("exam_id"),
    }
}

fn fee_status_from_row(row: &PgRow) -> FeeStatus {
    FeeStatus {
        student_email: row.get("student_email"),
        is_defaulter: row.get("is_defaulter"),
    }
}

/// Loads the rows one scan needs. The four lookups run concurrently; the
/// attendance lookup joins on the exam so it does not wait for the exam row.
pub async fn load_snapshot(
    pool: &PgPool,
    exam_id: &str,
    student_email: &str,
) -> anyhow::Result<Dataset> {
    let exam_query = format!("SELECT {EXAM_COLUMNS} FROM exam_entry.exams e WHERE e.id = $1");
    let exam = sqlx::query(&exam_query).bind(exam_id).fetch_optional(pool);

    let registrations = sqlx::query(
        "SELECT student_email, exam_id FROM exam_entry.registrations \
         WHERE student_email = $1 AND exam_id = $2",
    )
    .bind(student_email)
    .bind(exam_id)
    .fetch_all(pool);

    let attendance = sqlx::query(
        "SELECT a.student_email, a.course_code, a.percentage \
         FROM exam_entry.attendance a \
         JOIN exam_entry.exams e ON e.course_code = a.course_code \
         WHERE e.id = $1 AND a.student_email = $2",
    )
    .bind(exam_id)
    .bind(student_email)
    .fetch_all(pool);

    let fee_status = sqlx::query(
        "SELECT student_email, is_defaulter FROM exam_entry.fee_status WHERE student_email = $1",
    )
    .bind(student_email)
    .fetch_optional(pool);

    let (exam, registrations, attendance, fee_status) =
        tokio::try_join!(exam, registrations, attendance, fee_status)
            .context("failed to load eligibility snapshot")?;

    debug!(
        exam_id,
        student_email,
        exam_found = exam.is_some(),
        registrations = registrations.len(),
        attendance = attendance.len(),
        fee_record = fee_status.is_some(),
        "snapshot loaded"
    );

    Ok(Dataset {
        exams: exam.iter().map(exam_from_row).collect(),
        registrations: registrations.iter().map(registration_from_row).collect(),
        attendance: attendance.iter().map(attendance_from_row).collect(),
        fee_statuses: fee_status.iter().map(fee_status_from_row).collect(),
    })
}

/// Loads every exam plus one student's registrations, attendance and fee row.
pub async fn load_student_snapshot(pool: &PgPool, student_email: &str) -> anyhow::Result<Dataset> {
    let exam_query = format!("SELECT {EXAM_COLUMNS} FROM exam_entry.exams e ORDER BY e.exam_date, e.id");
    let exams = sqlx::query(&exam_query).fetch_all(pool);

    let registrations = sqlx::query(
        "SELECT student_email, exam_id FROM exam_entry.registrations WHERE student_email = $1",
    )
    .bind(student_email)
    .fetch_all(pool);

    let attendance = sqlx::query(
        "SELECT student_email, course_code, percentage FROM exam_entry.attendance \
         WHERE student_email = $1",
    )
    .bind(student_email)
    .fetch_all(pool);

    let fee_status = sqlx::query(
        "SELECT student_email, is_defaulter FROM exam_entry.fee_status WHERE student_email = $1",
    )
    .bind(student_email)
    .fetch_optional(pool);

    let (exams, registrations, attendance, fee_status) =
        tokio::try_join!(exams, registrations, attendance, fee_status)
            .context("failed to load student snapshot")?;

    Ok(Dataset {
        exams: exams.iter().map(exam_from_row).collect(),
        registrations: registrations.iter().map(registration_from_row).collect(),
        attendance: attendance.iter().map(attendance_from_row).collect(),
        fee_statuses: fee_status.iter().map(fee_status_from_row).collect(),
    })
}
