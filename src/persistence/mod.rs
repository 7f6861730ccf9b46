//! Persistence gateway: storage for workspaces, channels, messages, users.
//!
//! The core depends on storage only through the [`Store`] trait — a small
//! find/insert/update/delete operation set over the four collections.
//! Two implementations are provided: [`postgres::PostgresStore`] backed by
//! `sqlx::PgPool` for production, and [`memory::MemoryStore`] for tests
//! and persistence-disabled development runs.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::error::RelayError;
pub use memory::MemoryStore;
pub use models::{Channel, Message, SearchQuery, User, Workspace};
pub use postgres::PostgresStore;

/// Operation set the relay core consumes from storage.
///
/// Every listing method has a defined order: workspaces and channels by
/// name ascending, messages by storage timestamp ascending (arrival
/// order). Cascade deletes are issued by the caller as ordered sequences
/// of these primitives; the store itself never cascades.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Looks up a workspace by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_workspace(&self, name: &str) -> Result<Option<Workspace>, RelayError>;

    /// Returns all workspaces ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, RelayError>;

    /// Inserts a workspace. The caller checks for duplicates first.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn insert_workspace(&self, workspace: Workspace) -> Result<(), RelayError>;

    /// Renames a workspace, updating the back-references held by its
    /// channels and messages in the same call.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn rename_workspace(&self, old: &str, new: &str) -> Result<(), RelayError>;

    /// Deletes a workspace row. Children are removed separately by the
    /// caller's cascade sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn delete_workspace(&self, name: &str) -> Result<(), RelayError>;

    /// Looks up a channel by workspace and name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_channel(&self, workspace: &str, name: &str)
    -> Result<Option<Channel>, RelayError>;

    /// Returns a workspace's channels ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn list_channels(&self, workspace: &str) -> Result<Vec<Channel>, RelayError>;

    /// Inserts a batch of channels (used for default-channel seeding).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn insert_channels(&self, channels: Vec<Channel>) -> Result<(), RelayError>;

    /// Renames a channel within a workspace and updates its messages'
    /// back-references; optionally replaces the description.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn rename_channel(
        &self,
        workspace: &str,
        old: &str,
        new: &str,
        description: Option<&str>,
    ) -> Result<(), RelayError>;

    /// Deletes one channel row.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn delete_channel(&self, workspace: &str, name: &str) -> Result<(), RelayError>;

    /// Deletes all channels of a workspace, returning the removed count.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn delete_channels(&self, workspace: &str) -> Result<u64, RelayError>;

    /// Appends a message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn insert_message(&self, message: Message) -> Result<(), RelayError>;

    /// Returns a channel's messages ordered by storage timestamp
    /// ascending (arrival order at the relay).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn list_messages(&self, workspace: &str, channel: &str)
    -> Result<Vec<Message>, RelayError>;

    /// Deletes messages for a workspace, or for one of its channels when
    /// `channel` is given. Returns the removed count.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn delete_messages(
        &self,
        workspace: &str,
        channel: Option<&str>,
    ) -> Result<u64, RelayError>;

    /// Case-insensitive substring search over message content with
    /// optional workspace/channel/sender filters and an inclusive date
    /// range. Newest first, capped at `query.limit`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn search_messages(&self, query: &SearchQuery) -> Result<Vec<Message>, RelayError>;

    /// Looks up a user by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_user(&self, name: &str) -> Result<Option<User>, RelayError>;

    /// Inserts a user. The caller checks for duplicates first; a
    /// concurrent duplicate insert is treated as already-exists, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn insert_user(&self, user: User) -> Result<(), RelayError>;
}
