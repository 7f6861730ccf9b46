//! Storage models for workspaces, channels, messages and users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A workspace row. Workspace names are globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique workspace name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last rename.
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    /// Creates a new workspace record stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A channel row. Channel names are unique within their workspace; the
/// workspace back-reference is by name, not ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Name of the owning workspace.
    pub workspace: String,
    /// Channel name, unique within the workspace.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last rename or description update.
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// Creates a new channel record stamped with the current time.
    #[must_use]
    pub fn new(
        workspace: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            workspace: workspace.into(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored chat message. Immutable once written; removed only by the
/// channel/workspace cascade delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Workspace the message was sent in.
    pub workspace: String,
    /// Channel the message was sent in.
    pub channel: String,
    /// Sender name as supplied by the client.
    pub sender: String,
    /// Message content.
    pub content: String,
    /// Client-supplied date string (`YYYY-MM-DD`).
    pub date: String,
    /// Client-supplied time string (`HH:MM:SS`).
    pub time: String,
    /// Server-assigned storage timestamp, used for ordering.
    pub stored_at: DateTime<Utc>,
}

/// A user row, created lazily on first message or registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user record stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Filter for [`super::Store::search_messages`].
///
/// `query` matches case-insensitively as a substring of the message
/// content. The date bounds are inclusive and compare against the
/// client-supplied `date` string (ISO dates order lexicographically).
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Substring to match against message content (case-insensitive).
    pub query: String,
    /// Restrict to one workspace.
    pub workspace: Option<String>,
    /// Restrict to one channel.
    pub channel: Option<String>,
    /// Restrict to one sender.
    pub sender: Option<String>,
    /// Inclusive lower date bound (`YYYY-MM-DD`).
    pub from_date: Option<String>,
    /// Inclusive upper date bound (`YYYY-MM-DD`).
    pub to_date: Option<String>,
    /// Maximum number of results, newest first.
    pub limit: usize,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn workspace_timestamps_equal_on_create() {
        let ws = Workspace::new("acme");
        assert_eq!(ws.created_at, ws.updated_at);
    }

    #[test]
    fn channel_description_optional() {
        let ch = Channel::new("acme", "general", None);
        assert!(ch.description.is_none());
        let ch = Channel::new("acme", "social", Some("water cooler".to_string()));
        assert_eq!(ch.description.as_deref(), Some("water cooler"));
    }
}
