// src/handlers/subjects.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::subject::{Subject, SubjectRequest},
    utils::html::clean_optional,
};

/// Lists all subjects alphabetically.
pub async fn list_subjects(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, name, description, created_at FROM subjects ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list subjects: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(subjects))
}

/// Creates a subject. Names are unique.
/// Admin only.
pub async fn create_subject(
    State(pool): State<PgPool>,
    Json(payload): Json<SubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let subject = sqlx::query_as::<_, Subject>(
        r#"
        INSERT INTO subjects (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(clean_optional(payload.description.as_deref()))
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::from_unique(e, format!("Subject '{}' already exists", payload.name)))?;

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Renames or re-describes a subject.
/// Admin only.
pub async fn update_subject(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<SubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let subject = sqlx::query_as::<_, Subject>(
        r#"
        UPDATE subjects
        SET name = $1, description = $2
        WHERE id = $3
        RETURNING id, name, description, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(clean_optional(payload.description.as_deref()))
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::from_unique(e, format!("Subject '{}' already exists", payload.name)))?
    .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    Ok(Json(subject))
}

/// Deletes a subject. Its quizzes are kept and become uncategorized.
/// Admin only.
pub async fn delete_subject(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE quizzes SET subject_id = NULL WHERE subject_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete subject: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        // Dropping the transaction rolls back the no-op update above.
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "message": "Subject deleted and quizzes uncategorized"
    })))
}
