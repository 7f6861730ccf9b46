//! Directory service: workspace/channel snapshots and structural changes.
//!
//! Builds the workspace → channel-name listing used for list responses
//! and update-notification payloads, and orchestrates create, rename and
//! delete with default-channel seeding. Cascade deletes run as ordered
//! store calls (children first, parent last); the sequence is not
//! transactional, so a crash mid-sequence can leave orphaned messages.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RelayError;
use crate::persistence::{Channel, Store, Workspace};

/// Channels seeded into every newly created workspace.
pub const DEFAULT_CHANNELS: [&str; 2] = ["general", "social"];

/// Orchestration layer for all workspace/channel structure operations.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    store: Arc<dyn Store>,
}

impl DirectoryService {
    /// Creates a directory service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Builds the full workspace → channel-name snapshot, both levels
    /// ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    pub async fn workspace_snapshot(&self) -> Result<BTreeMap<String, Vec<String>>, RelayError> {
        let mut snapshot = BTreeMap::new();
        for workspace in self.store.list_workspaces().await? {
            let channels = self.channel_names(&workspace.name).await?;
            snapshot.insert(workspace.name, channels);
        }
        Ok(snapshot)
    }

    /// Returns one workspace's channel names ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    pub async fn channel_names(&self, workspace: &str) -> Result<Vec<String>, RelayError> {
        Ok(self
            .store
            .list_channels(workspace)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Creates a workspace and seeds it with [`DEFAULT_CHANNELS`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Conflict`] if the name is taken, or
    /// [`RelayError::Persistence`] on storage failure.
    pub async fn create_workspace(&self, name: &str) -> Result<(), RelayError> {
        if self.store.find_workspace(name).await?.is_some() {
            return Err(RelayError::Conflict(format!(
                "workspace {name} already exists"
            )));
        }
        self.store.insert_workspace(Workspace::new(name)).await?;
        let defaults = DEFAULT_CHANNELS
            .iter()
            .map(|ch| Channel::new(name, *ch, None))
            .collect();
        self.store.insert_channels(defaults).await?;
        tracing::info!(workspace = name, "workspace created");
        Ok(())
    }

    /// Creates a channel inside an existing workspace.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if the workspace is missing,
    /// [`RelayError::Conflict`] on a duplicate channel name, or
    /// [`RelayError::Persistence`] on storage failure.
    pub async fn create_channel(
        &self,
        workspace: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<(), RelayError> {
        self.require_workspace(workspace).await?;
        if self.store.find_channel(workspace, name).await?.is_some() {
            return Err(RelayError::Conflict(format!(
                "channel {name} already exists in {workspace}"
            )));
        }
        self.store
            .insert_channels(vec![Channel::new(workspace, name, description)])
            .await?;
        tracing::info!(workspace, channel = name, "channel created");
        Ok(())
    }

    /// Cascade-deletes a workspace: channels, then messages, then the
    /// workspace itself.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if the workspace is missing, or
    /// [`RelayError::Persistence`] on storage failure.
    pub async fn delete_workspace(&self, name: &str) -> Result<(), RelayError> {
        self.require_workspace(name).await?;
        let channels = self.store.delete_channels(name).await?;
        let messages = self.store.delete_messages(name, None).await?;
        self.store.delete_workspace(name).await?;
        tracing::info!(workspace = name, channels, messages, "workspace deleted");
        Ok(())
    }

    /// Cascade-deletes a channel: messages first, then the channel.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if the workspace or channel is
    /// missing, or [`RelayError::Persistence`] on storage failure.
    pub async fn delete_channel(&self, workspace: &str, name: &str) -> Result<(), RelayError> {
        self.require_workspace(workspace).await?;
        self.require_channel(workspace, name).await?;
        let messages = self.store.delete_messages(workspace, Some(name)).await?;
        self.store.delete_channel(workspace, name).await?;
        tracing::info!(workspace, channel = name, messages, "channel deleted");
        Ok(())
    }

    /// Renames a workspace. Renaming to the current name is a no-op
    /// success; any other taken name is a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`], [`RelayError::Conflict`], or
    /// [`RelayError::Persistence`].
    pub async fn rename_workspace(&self, old: &str, new: &str) -> Result<(), RelayError> {
        self.require_workspace(old).await?;
        if old == new {
            return Ok(());
        }
        if self.store.find_workspace(new).await?.is_some() {
            return Err(RelayError::Conflict(format!(
                "workspace {new} already exists"
            )));
        }
        self.store.rename_workspace(old, new).await?;
        tracing::info!(from = old, to = new, "workspace renamed");
        Ok(())
    }

    /// Renames a channel and optionally replaces its description.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`], [`RelayError::Conflict`], or
    /// [`RelayError::Persistence`].
    pub async fn rename_channel(
        &self,
        workspace: &str,
        old: &str,
        new: &str,
        description: Option<&str>,
    ) -> Result<(), RelayError> {
        self.require_workspace(workspace).await?;
        self.require_channel(workspace, old).await?;
        if old != new && self.store.find_channel(workspace, new).await?.is_some() {
            return Err(RelayError::Conflict(format!(
                "channel {new} already exists in {workspace}"
            )));
        }
        self.store
            .rename_channel(workspace, old, new, description)
            .await?;
        tracing::info!(workspace, from = old, to = new, "channel renamed");
        Ok(())
    }

    async fn require_workspace(&self, name: &str) -> Result<(), RelayError> {
        self.store
            .find_workspace(name)
            .await?
            .map(|_| ())
            .ok_or_else(|| RelayError::NotFound(format!("workspace {name}")))
    }

    async fn require_channel(&self, workspace: &str, name: &str) -> Result<(), RelayError> {
        self.store
            .find_channel(workspace, name)
            .await?
            .map(|_| ())
            .ok_or_else(|| RelayError::NotFound(format!("channel {name} in {workspace}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn service() -> DirectoryService {
        DirectoryService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_workspace_seeds_default_channels() {
        let dir = service();
        let Ok(()) = dir.create_workspace("acme").await else {
            panic!("create failed");
        };

        let Ok(channels) = dir.channel_names("acme").await else {
            panic!("list failed");
        };
        assert_eq!(channels, vec!["general", "social"]);
    }

    #[tokio::test]
    async fn duplicate_workspace_is_a_conflict_and_keeps_channels() {
        let dir = service();
        let Ok(()) = dir.create_workspace("acme").await else {
            panic!("create failed");
        };
        let Ok(()) = dir.create_channel("acme", "dev", None).await else {
            panic!("create channel failed");
        };

        let result = dir.create_workspace("acme").await;
        assert!(matches!(result, Err(RelayError::Conflict(_))));

        // The existing workspace's channels were not reset.
        let Ok(channels) = dir.channel_names("acme").await else {
            panic!("list failed");
        };
        assert_eq!(channels, vec!["dev", "general", "social"]);
    }

    #[tokio::test]
    async fn snapshot_orders_workspaces_and_channels_by_name() {
        let dir = service();
        for ws in ["zeta", "acme"] {
            let Ok(()) = dir.create_workspace(ws).await else {
                panic!("create failed");
            };
        }

        let Ok(snapshot) = dir.workspace_snapshot().await else {
            panic!("snapshot failed");
        };
        let names: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["acme", "zeta"]);
    }

    #[tokio::test]
    async fn create_channel_requires_workspace() {
        let dir = service();
        let result = dir.create_channel("ghost", "general", None).await;
        assert!(matches!(result, Err(RelayError::NotFound(_))));
    }

    #[tokio::test]
    async fn rename_workspace_to_same_name_is_accepted() {
        let dir = service();
        let Ok(()) = dir.create_workspace("acme").await else {
            panic!("create failed");
        };
        let Ok(()) = dir.rename_workspace("acme", "acme").await else {
            panic!("self-rename rejected");
        };
    }

    #[tokio::test]
    async fn rename_channel_conflict_detected() {
        let dir = service();
        let Ok(()) = dir.create_workspace("acme").await else {
            panic!("create failed");
        };
        let result = dir.rename_channel("acme", "general", "social", None).await;
        assert!(matches!(result, Err(RelayError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_workspace_removes_it_from_snapshot() {
        let dir = service();
        let Ok(()) = dir.create_workspace("acme").await else {
            panic!("create failed");
        };
        let Ok(()) = dir.delete_workspace("acme").await else {
            panic!("delete failed");
        };

        let Ok(snapshot) = dir.workspace_snapshot().await else {
            panic!("snapshot failed");
        };
        assert!(snapshot.is_empty());
    }
}
