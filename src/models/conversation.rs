use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'conversations' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub participant1_id: i64,
    pub participant2_id: i64,
    /// The listing the conversation was started from, if any.
    pub post_id: Option<i64>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participant1_id == user_id || self.participant2_id == user_id
    }
}

/// Represents the 'messages' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Inbox row: a conversation seen from one participant's side.
#[derive(Debug, Serialize, FromRow)]
pub struct ConversationSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user_id: i64,
    pub other_username: String,
    pub other_profile_picture: Option<String>,
    pub last_message: Option<String>,
    pub last_message_sender_id: Option<i64>,
    pub unread_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub participant_id: i64,
    pub post_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub conversation_id: i64,
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Message must be between 1 and 5000 characters"
    ))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteConversationsRequest {
    pub conversation_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_side_is_a_participant() {
        let now = Utc::now();
        let conversation = Conversation {
            id: 1,
            participant1_id: 10,
            participant2_id: 20,
            post_id: None,
            last_message_at: now,
            created_at: now,
        };
        assert!(conversation.has_participant(10));
        assert!(conversation.has_participant(20));
        assert!(!conversation.has_participant(30));
    }
}
