// src/handlers/quizzes.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{Question, QuestionRequest},
        quiz::{
            CreateQuizRequest, Quiz, QuizDetail, QuizListParams, QuizSummary, UpdateQuizRequest,
            normalize_time_limit,
        },
    },
    utils::{
        html::{clean_html, clean_optional},
        jwt::Claims,
    },
};

const QUIZ_COLUMNS: &str =
    "id, title, description, subject_id, user_id, time_limit, is_active, created_at";

pub(crate) const QUESTION_COLUMNS: &str =
    "id, quiz_id, text, options, correct_answer, explanation, position, created_at";

/// Loads a quiz and its questions ordered by position.
pub(crate) async fn fetch_quiz_detail(
    pool: &PgPool,
    id: i64,
) -> Result<Option<QuizDetail>, sqlx::Error> {
    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {} FROM quizzes WHERE id = $1",
        QUIZ_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(quiz) = quiz else {
        return Ok(None);
    };

    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE quiz_id = $1 ORDER BY position, id",
        QUESTION_COLUMNS
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(QuizDetail::from_parts(quiz, questions)))
}

async fn ensure_subject_exists(pool: &PgPool, subject_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE id = $1")
        .bind(subject_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;
    Ok(())
}

/// Lists quizzes, newest first, with their question counts.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut query_builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT
            q.id, q.title, q.description, q.subject_id,
            s.name AS subject_name,
            q.time_limit, q.is_active, q.created_at,
            COUNT(qs.id) AS question_count
        FROM quizzes q
        LEFT JOIN subjects s ON s.id = q.subject_id
        LEFT JOIN questions qs ON qs.quiz_id = q.id
        "#,
    );

    if let Some(subject_id) = params.subject_id {
        query_builder.push(" WHERE q.subject_id = ").push_bind(subject_id);
    }

    query_builder.push(" GROUP BY q.id, s.name ORDER BY q.id DESC");

    let quizzes: Vec<QuizSummary> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(quizzes))
}

/// Creates an empty, inactive quiz owned by the calling instructor.
/// Admin only.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(subject_id) = payload.subject_id {
        ensure_subject_exists(&pool, subject_id).await?;
    }

    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        r#"
        INSERT INTO quizzes (title, description, subject_id, user_id, time_limit)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        QUIZ_COLUMNS
    ))
    .bind(&payload.title)
    .bind(clean_optional(payload.description.as_deref()))
    .bind(payload.subject_id)
    .bind(claims.user_id())
    .bind(normalize_time_limit(payload.time_limit))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Quiz {} created", quiz.id);

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Returns a quiz with its ordered questions.
///
/// This is what a quiz-taking session loads.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz_detail(&pool, id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Appends a question at the end of the quiz.
/// Admin only.
pub async fn add_question(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.check().map_err(AppError::BadRequest)?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions (quiz_id, text, options, correct_answer, explanation, position)
        VALUES (
            $1, $2, $3, $4, $5,
            (SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE quiz_id = $1)
        )
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(quiz_id)
    .bind(clean_html(&payload.text))
    .bind(&payload.options)
    .bind(&payload.correct_answer)
    .bind(clean_html(&payload.explanation))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to add question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates quiz settings. Fields missing from the body are left as they are.
/// Admin only.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(Some(subject_id)) = payload.subject_id {
        ensure_subject_exists(&pool, subject_id).await?;
    }

    let mut tx = pool.begin().await?;

    let updated = sqlx::query("UPDATE quizzes SET title = $1 WHERE id = $2")
        .bind(&payload.title)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    if let Some(description) = payload.description.as_deref() {
        sqlx::query("UPDATE quizzes SET description = $1 WHERE id = $2")
            .bind(clean_html(description))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(subject_id) = payload.subject_id {
        sqlx::query("UPDATE quizzes SET subject_id = $1 WHERE id = $2")
            .bind(subject_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(is_active) = payload.is_active {
        sqlx::query("UPDATE quizzes SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tracing::info!("Quiz {} is now {}", id, if is_active { "active" } else { "inactive" });
    }

    if payload.time_limit.is_some() {
        sqlx::query("UPDATE quizzes SET time_limit = $1 WHERE id = $2")
            .bind(normalize_time_limit(payload.time_limit))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {} FROM quizzes WHERE id = $1",
        QUIZ_COLUMNS
    ))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(quiz))
}

/// Deletes a quiz together with its questions and submissions.
/// Admin only.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
