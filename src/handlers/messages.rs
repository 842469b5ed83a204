use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{current_user, posts::fetch_post},
    models::{
        conversation::{
            Conversation, ConversationSummary, CreateConversationRequest,
            DeleteConversationsRequest, Message, SendMessageRequest,
        },
        user::User,
    },
    utils::{html::clean_text_field, jwt::Claims},
};

/// Loads a conversation the caller takes part in.
/// 404 if it does not exist, 403 if it belongs to others.
async fn participant_conversation(
    pool: &PgPool,
    conversation_id: i64,
    user_id: i64,
) -> Result<Conversation, AppError> {
    let conversation = sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
        .bind(conversation_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Conversation not found".to_string()))?;

    if !conversation.has_participant(user_id) {
        return Err(AppError::Forbidden(
            "You are not a participant in this conversation".to_string(),
        ));
    }

    Ok(conversation)
}

/// The caller's inbox, most recently active first.
pub async fn list_conversations(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let conversations = sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT c.*,
               u.id AS other_user_id,
               u.username AS other_username,
               u.profile_picture AS other_profile_picture,
               last.content AS last_message,
               last.sender_id AS last_message_sender_id,
               (
                   SELECT COUNT(*) FROM messages m
                   WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND NOT m.is_read
               ) AS unread_count
        FROM conversations c
        JOIN users u
          ON u.id = CASE WHEN c.participant1_id = $1 THEN c.participant2_id ELSE c.participant1_id END
        LEFT JOIN LATERAL (
            SELECT m.content, m.sender_id FROM messages m
            WHERE m.conversation_id = c.id
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT 1
        ) last ON TRUE
        WHERE c.participant1_id = $1 OR c.participant2_id = $1
        ORDER BY c.last_message_at DESC, c.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(conversations))
}

/// Opens a conversation with another user, or returns the one that already
/// exists for the pair.
pub async fn create_conversation(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&pool, &claims).await?;

    if payload.participant_id == user.id {
        return Err(AppError::BadRequest(
            "You cannot start a conversation with yourself".to_string(),
        ));
    }
    User::get(&pool, payload.participant_id).await?;
    if let Some(post_id) = payload.post_id {
        fetch_post(&pool, post_id).await?;
    }

    let created = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (participant1_id, participant2_id, post_id)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(payload.participant_id)
    .bind(payload.post_id)
    .fetch_optional(&pool)
    .await?;

    if let Some(conversation) = created {
        return Ok((StatusCode::CREATED, Json(conversation)));
    }

    let existing = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT * FROM conversations
        WHERE LEAST(participant1_id, participant2_id) = LEAST($1::BIGINT, $2::BIGINT)
          AND GREATEST(participant1_id, participant2_id) = GREATEST($1::BIGINT, $2::BIGINT)
        "#,
    )
    .bind(user.id)
    .bind(payload.participant_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::OK, Json(existing)))
}

pub async fn list_messages(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    participant_conversation(&pool, conversation_id, user_id).await?;

    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(conversation_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(messages))
}

pub async fn send_message(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let content = clean_text_field(&payload.content);
    if content.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let user = current_user(&pool, &claims).await?;
    participant_conversation(&pool, payload.conversation_id, user.id).await?;

    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (conversation_id, sender_id, content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(payload.conversation_id)
    .bind(user.id)
    .bind(&content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
        .bind(payload.conversation_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Marks the other participant's messages as read.
pub async fn mark_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    participant_conversation(&pool, conversation_id, user_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE messages SET is_read = TRUE
        WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_read
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .execute(&pool)
    .await?;

    Ok(Json(json!({ "marked": result.rows_affected() })))
}

/// Deletes several conversations at once. Either every id belongs to the
/// caller and all are removed, or nothing is.
pub async fn delete_conversations(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DeleteConversationsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut ids = payload.conversation_ids;
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(AppError::BadRequest("No conversations selected".to_string()));
    }

    let mut tx = pool.begin().await?;

    let owned: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM conversations
        WHERE id = ANY($1) AND (participant1_id = $2 OR participant2_id = $2)
        "#,
    )
    .bind(&ids)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if owned != ids.len() as i64 {
        return Err(AppError::Forbidden(
            "You can only delete your own conversations".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM conversations WHERE id = ANY($1)")
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id, count = deleted.rows_affected(), "conversations deleted");

    Ok(Json(json!({ "deleted": deleted.rows_affected() })))
}

pub async fn unread_count(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM messages m
        JOIN conversations c ON c.id = m.conversation_id
        WHERE (c.participant1_id = $1 OR c.participant2_id = $1)
          AND m.sender_id <> $1
          AND NOT m.is_read
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({ "count": count })))
}
