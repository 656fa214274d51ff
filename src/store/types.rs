//! Message store row types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Author recorded when a new message does not name one.
pub const DEFAULT_AUTHOR: &str = "system";

/// A single row of the `messages` table.
///
/// Rows are written once by the seed step and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Message {
    /// Primary key assigned by the store.
    pub id: i64,
    /// Message body, never empty.
    pub text: String,
    /// Author name, `"system"` unless given.
    pub author: String,
    /// Insertion time, serialized as RFC 3339.
    pub created_at: DateTime<Utc>,
}

/// A message that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: String,
    pub author: Option<String>,
}

impl NewMessage {
    /// Message with an explicit author.
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: Some(author.into()),
        }
    }

    /// Message attributed to [`DEFAULT_AUTHOR`].
    pub fn anonymous(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: None,
        }
    }

    /// Author that will be stored for this message.
    pub fn author_or_default(&self) -> &str {
        self.author.as_deref().unwrap_or(DEFAULT_AUTHOR)
    }
}
