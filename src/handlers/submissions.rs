// src/handlers/submissions.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::submission::{NewSubmission, Submission, SubmissionEntry, SubmissionListParams},
};

/// Stores the terminal record of one quiz attempt.
///
/// Public: students are not authenticated, they identify themselves through
/// the participant fields.
pub async fn create_submission(
    State(pool): State<PgPool>,
    Json(payload): Json<NewSubmission>,
) -> Result<impl IntoResponse, AppError> {
    payload.check().map_err(AppError::BadRequest)?;

    let submission = sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (
            quiz_id, student_name, student_email, roll_number, faculty, year,
            score, total_questions, is_cheated, submission_type
        )
        SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
        WHERE EXISTS (SELECT 1 FROM quizzes WHERE id = $1)
        RETURNING
            id, quiz_id, student_name, student_email, roll_number, faculty, year,
            score, total_questions, is_cheated, submission_type, created_at
        "#,
    )
    .bind(payload.quiz_id)
    .bind(&payload.student_name)
    .bind(&payload.student_email)
    .bind(&payload.roll_number)
    .bind(&payload.faculty)
    .bind(&payload.year)
    .bind(payload.score)
    .bind(payload.total_questions)
    .bind(payload.is_cheated)
    .bind(payload.submission_type.as_str())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    tracing::info!(
        "Submission {} for quiz {}: {}/{} ({}, cheated: {})",
        submission.id,
        submission.quiz_id,
        submission.score,
        submission.total_questions,
        submission.submission_type,
        submission.is_cheated
    );

    Ok((StatusCode::CREATED, Json(submission)))
}

/// Lists submissions newest first, with optional quiz/faculty/year filters.
/// Admin only.
pub async fn list_submissions(
    State(pool): State<PgPool>,
    Query(params): Query<SubmissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut query_builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT
            s.id, s.student_name, s.student_email, s.roll_number, s.faculty, s.year,
            s.score, s.total_questions, s.is_cheated, s.submission_type, s.created_at,
            q.title AS quiz_title
        FROM submissions s
        LEFT JOIN quizzes q ON q.id = s.quiz_id
        WHERE 1 = 1
        "#,
    );

    if let Some(quiz_id) = params.quiz_id {
        query_builder.push(" AND s.quiz_id = ").push_bind(quiz_id);
    }
    if let Some(faculty) = params.faculty_filter() {
        query_builder.push(" AND s.faculty = ").push_bind(faculty.to_string());
    }
    if let Some(year) = params.year_filter() {
        query_builder.push(" AND s.year = ").push_bind(year.to_string());
    }

    query_builder.push(" ORDER BY s.created_at DESC, s.id DESC");

    let submissions: Vec<SubmissionEntry> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list submissions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(submissions))
}
