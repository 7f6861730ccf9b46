//! In-memory implementation of the persistence gateway.
//!
//! Used by the test suite and by persistence-disabled development runs
//! (`PERSISTENCE_ENABLED=false`). All state is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{Channel, Message, SearchQuery, User, Workspace};
use super::Store;
use crate::error::RelayError;

#[derive(Debug, Default)]
struct Inner {
    workspaces: Vec<Workspace>,
    channels: Vec<Channel>,
    // Kept in insertion order, which is storage-timestamp order.
    messages: Vec<Message>,
    users: HashMap<String, User>,
}

/// Process-local store backed by a single `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_workspace(&self, name: &str) -> Result<Option<Workspace>, RelayError> {
        let inner = self.inner.read().await;
        Ok(inner.workspaces.iter().find(|w| w.name == name).cloned())
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, RelayError> {
        let inner = self.inner.read().await;
        let mut workspaces = inner.workspaces.clone();
        workspaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workspaces)
    }

    async fn insert_workspace(&self, workspace: Workspace) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        inner.workspaces.push(workspace);
        Ok(())
    }

    async fn rename_workspace(&self, old: &str, new: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        let now = chrono::Utc::now();
        for ws in inner.workspaces.iter_mut().filter(|w| w.name == old) {
            ws.name = new.to_string();
            ws.updated_at = now;
        }
        for ch in inner.channels.iter_mut().filter(|c| c.workspace == old) {
            ch.workspace = new.to_string();
        }
        for msg in inner.messages.iter_mut().filter(|m| m.workspace == old) {
            msg.workspace = new.to_string();
        }
        Ok(())
    }

    async fn delete_workspace(&self, name: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        inner.workspaces.retain(|w| w.name != name);
        Ok(())
    }

    async fn find_channel(
        &self,
        workspace: &str,
        name: &str,
    ) -> Result<Option<Channel>, RelayError> {
        let inner = self.inner.read().await;
        Ok(inner
            .channels
            .iter()
            .find(|c| c.workspace == workspace && c.name == name)
            .cloned())
    }

    async fn list_channels(&self, workspace: &str) -> Result<Vec<Channel>, RelayError> {
        let inner = self.inner.read().await;
        let mut channels: Vec<Channel> = inner
            .channels
            .iter()
            .filter(|c| c.workspace == workspace)
            .cloned()
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    async fn insert_channels(&self, channels: Vec<Channel>) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        inner.channels.extend(channels);
        Ok(())
    }

    async fn rename_channel(
        &self,
        workspace: &str,
        old: &str,
        new: &str,
        description: Option<&str>,
    ) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        let now = chrono::Utc::now();
        for ch in inner
            .channels
            .iter_mut()
            .filter(|c| c.workspace == workspace && c.name == old)
        {
            ch.name = new.to_string();
            if let Some(desc) = description {
                ch.description = Some(desc.to_string());
            }
            ch.updated_at = now;
        }
        for msg in inner
            .messages
            .iter_mut()
            .filter(|m| m.workspace == workspace && m.channel == old)
        {
            msg.channel = new.to_string();
        }
        Ok(())
    }

    async fn delete_channel(&self, workspace: &str, name: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        inner
            .channels
            .retain(|c| !(c.workspace == workspace && c.name == name));
        Ok(())
    }

    async fn delete_channels(&self, workspace: &str) -> Result<u64, RelayError> {
        let mut inner = self.inner.write().await;
        let before = inner.channels.len();
        inner.channels.retain(|c| c.workspace != workspace);
        Ok((before - inner.channels.len()) as u64)
    }

    async fn insert_message(&self, message: Message) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        inner.messages.push(message);
        Ok(())
    }

    async fn list_messages(
        &self,
        workspace: &str,
        channel: &str,
    ) -> Result<Vec<Message>, RelayError> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.workspace == workspace && m.channel == channel)
            .cloned()
            .collect())
    }

    async fn delete_messages(
        &self,
        workspace: &str,
        channel: Option<&str>,
    ) -> Result<u64, RelayError> {
        let mut inner = self.inner.write().await;
        let before = inner.messages.len();
        match channel {
            Some(ch) => inner
                .messages
                .retain(|m| !(m.workspace == workspace && m.channel == ch)),
            None => inner.messages.retain(|m| m.workspace != workspace),
        }
        Ok((before - inner.messages.len()) as u64)
    }

    async fn search_messages(&self, query: &SearchQuery) -> Result<Vec<Message>, RelayError> {
        let needle = query.query.to_lowercase();
        let inner = self.inner.read().await;
        let results = inner
            .messages
            .iter()
            .rev()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .filter(|m| query.workspace.as_deref().is_none_or(|w| m.workspace == w))
            .filter(|m| query.channel.as_deref().is_none_or(|c| m.channel == c))
            .filter(|m| query.sender.as_deref().is_none_or(|s| m.sender == s))
            .filter(|m| query.from_date.as_deref().is_none_or(|d| m.date.as_str() >= d))
            .filter(|m| query.to_date.as_deref().is_none_or(|d| m.date.as_str() <= d))
            .take(query.limit)
            .cloned()
            .collect();
        Ok(results)
    }

    async fn find_user(&self, name: &str) -> Result<Option<User>, RelayError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(name).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        inner.users.entry(user.name.clone()).or_insert(user);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn msg(workspace: &str, channel: &str, sender: &str, content: &str, date: &str) -> Message {
        Message {
            workspace: workspace.to_string(),
            channel: channel.to_string(),
            sender: sender.to_string(),
            content: content.to_string(),
            date: date.to_string(),
            time: "12:00:00".to_string(),
            stored_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn workspaces_listed_in_name_order() {
        let store = MemoryStore::new();
        let Ok(()) = store.insert_workspace(Workspace::new("zeta")).await else {
            panic!("insert failed");
        };
        let Ok(()) = store.insert_workspace(Workspace::new("acme")).await else {
            panic!("insert failed");
        };

        let Ok(list) = store.list_workspaces().await else {
            panic!("list failed");
        };
        let names: Vec<&str> = list.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["acme", "zeta"]);
    }

    #[tokio::test]
    async fn messages_preserve_arrival_order() {
        let store = MemoryStore::new();
        for content in ["first", "second", "third"] {
            let Ok(()) = store
                .insert_message(msg("acme", "general", "ana", content, "2026-08-07"))
                .await
            else {
                panic!("insert failed");
            };
        }

        let Ok(list) = store.list_messages("acme", "general").await else {
            panic!("list failed");
        };
        let contents: Vec<&str> = list.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn delete_messages_scopes_to_channel() {
        let store = MemoryStore::new();
        let Ok(()) = store
            .insert_message(msg("acme", "general", "ana", "keep", "2026-08-07"))
            .await
        else {
            panic!("insert failed");
        };
        let Ok(()) = store
            .insert_message(msg("acme", "social", "ana", "drop", "2026-08-07"))
            .await
        else {
            panic!("insert failed");
        };

        let Ok(removed) = store.delete_messages("acme", Some("social")).await else {
            panic!("delete failed");
        };
        assert_eq!(removed, 1);

        let Ok(remaining) = store.list_messages("acme", "general").await else {
            panic!("list failed");
        };
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn rename_workspace_updates_children() {
        let store = MemoryStore::new();
        let Ok(()) = store.insert_workspace(Workspace::new("acme")).await else {
            panic!("insert failed");
        };
        let Ok(()) = store
            .insert_channels(vec![Channel::new("acme", "general", None)])
            .await
        else {
            panic!("insert failed");
        };
        let Ok(()) = store
            .insert_message(msg("acme", "general", "ana", "hello", "2026-08-07"))
            .await
        else {
            panic!("insert failed");
        };

        let Ok(()) = store.rename_workspace("acme", "umbrella").await else {
            panic!("rename failed");
        };

        let Ok(channels) = store.list_channels("umbrella").await else {
            panic!("list failed");
        };
        assert_eq!(channels.len(), 1);
        let Ok(messages) = store.list_messages("umbrella", "general").await else {
            panic!("list failed");
        };
        assert_eq!(messages.len(), 1);
        let Ok(old) = store.find_workspace("acme").await else {
            panic!("find failed");
        };
        assert!(old.is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_newest_first() {
        let store = MemoryStore::new();
        let Ok(()) = store
            .insert_message(msg("acme", "general", "ana", "Hi there", "2026-08-06"))
            .await
        else {
            panic!("insert failed");
        };
        let Ok(()) = store
            .insert_message(msg("acme", "general", "bob", "bye", "2026-08-07"))
            .await
        else {
            panic!("insert failed");
        };
        let Ok(()) = store
            .insert_message(msg("acme", "general", "ana", "HI again", "2026-08-07"))
            .await
        else {
            panic!("insert failed");
        };

        let query = SearchQuery {
            query: "hi".to_string(),
            limit: 100,
            ..SearchQuery::default()
        };
        let Ok(results) = store.search_messages(&query).await else {
            panic!("search failed");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.first().map(|m| m.content.as_str()),
            Some("HI again")
        );
    }

    #[tokio::test]
    async fn search_date_range_is_inclusive() {
        let store = MemoryStore::new();
        for date in ["2026-08-01", "2026-08-05", "2026-08-09"] {
            let Ok(()) = store
                .insert_message(msg("acme", "general", "ana", "hello", date))
                .await
            else {
                panic!("insert failed");
            };
        }

        let query = SearchQuery {
            query: "hello".to_string(),
            from_date: Some("2026-08-01".to_string()),
            to_date: Some("2026-08-05".to_string()),
            limit: 100,
            ..SearchQuery::default()
        };
        let Ok(results) = store.search_messages(&query).await else {
            panic!("search failed");
        };
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn insert_user_is_idempotent() {
        let store = MemoryStore::new();
        let first = User::new("ana");
        let created_at = first.created_at;
        let Ok(()) = store.insert_user(first).await else {
            panic!("insert failed");
        };
        let Ok(()) = store.insert_user(User::new("ana")).await else {
            panic!("insert failed");
        };

        let Ok(found) = store.find_user("ana").await else {
            panic!("find failed");
        };
        let Some(user) = found else {
            panic!("user missing");
        };
        assert_eq!(user.created_at, created_at);
    }
}
