// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::quizzes::QUESTION_COLUMNS,
    models::question::{Question, QuestionRequest, ReorderDirection, ReorderRequest},
    utils::html::clean_html,
};

/// Replaces a question's text, options, answer and explanation.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.check().map_err(AppError::BadRequest)?;

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        UPDATE questions
        SET text = $1, options = $2, correct_answer = $3, explanation = $4
        WHERE id = $5
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(clean_html(&payload.text))
    .bind(&payload.options)
    .bind(&payload.correct_answer)
    .bind(clean_html(&payload.explanation))
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Moves a question one slot up or down within its quiz.
///
/// Positions of the whole quiz are rewritten as 0..n, so gaps left by
/// deletions disappear on the first reorder.
/// Admin only.
pub async fn reorder_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<ReorderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let quiz_id = sqlx::query_scalar::<_, i64>("SELECT quiz_id FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let mut order = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE quiz_id = $1 ORDER BY position, id FOR UPDATE",
    )
    .bind(quiz_id)
    .fetch_all(&mut *tx)
    .await?;

    let index = order
        .iter()
        .position(|question_id| *question_id == id)
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let neighbor = match payload.direction {
        ReorderDirection::Up if index == 0 => {
            return Err(AppError::BadRequest(
                "Question is already at the top".to_string(),
            ));
        }
        ReorderDirection::Up => index - 1,
        ReorderDirection::Down if index + 1 == order.len() => {
            return Err(AppError::BadRequest(
                "Question is already at the bottom".to_string(),
            ));
        }
        ReorderDirection::Down => index + 1,
    };

    order.swap(index, neighbor);

    for (position, question_id) in order.iter().enumerate() {
        sqlx::query("UPDATE questions SET position = $1 WHERE id = $2")
            .bind(position as i32)
            .bind(*question_id)
            .execute(&mut *tx)
            .await?;
    }

    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE quiz_id = $1 ORDER BY position, id",
        QUESTION_COLUMNS
    ))
    .bind(quiz_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Question {} moved {:?} in quiz {}", id, payload.direction, quiz_id);

    Ok(Json(questions))
}
