//! Action router: inbound frame parsing, validation and dispatch.
//!
//! One handler per [`Action`] variant. The router owns no session state;
//! it reads and writes through the persistence gateway, mutates
//! subscription state in the registry, and hands notifications to the
//! broadcast engine. Every error is caught at this boundary and turned
//! into an error-status envelope — nothing here can kill a connection.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{SessionId, SessionRegistry};
use crate::error::RelayError;
use crate::persistence::{Message, SearchQuery, Store, User};
use crate::service::DirectoryService;

use super::broadcast::Broadcaster;
use super::messages::{Action, Envelope, SYSTEM_SENDER};

/// Hard cap on search results, newest first.
const SEARCH_RESULT_LIMIT: usize = 100;

/// Dispatcher for all inbound envelopes.
#[derive(Debug, Clone)]
pub struct ActionRouter {
    store: Arc<dyn Store>,
    registry: Arc<SessionRegistry>,
    broadcaster: Broadcaster,
    directory: DirectoryService,
}

impl ActionRouter {
    /// Creates a router over the shared store and registry.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, registry: Arc<SessionRegistry>) -> Self {
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let directory = DirectoryService::new(Arc::clone(&store));
        Self {
            store,
            registry,
            broadcaster,
            directory,
        }
    }

    /// Handles one raw inbound frame for `session_id`, returning the
    /// direct responses owed to that session. Broadcasts to other
    /// sessions are issued internally.
    ///
    /// Unparsable frames and unknown actions produce no response:
    /// malformed payloads are logged and dropped, unknown actions are
    /// logged no-ops.
    pub async fn handle(&self, session_id: SessionId, raw: &str) -> Vec<Envelope> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                let err = RelayError::Malformed(e.to_string());
                tracing::warn!(session_id = %session_id, error = %err, "dropping frame");
                return Vec::new();
            }
        };

        let Some(action) = value.get("action").and_then(|v| v.as_str()) else {
            tracing::debug!(session_id = %session_id, "frame without action, ignoring");
            return Vec::new();
        };
        if !Action::NAMES.contains(&action) {
            tracing::debug!(session_id = %session_id, action, "unknown action, ignoring");
            return Vec::new();
        }
        let action = action.to_string();

        // Lazy user creation: any non-system sender on any action binds
        // a user record to the session before dispatch.
        if let Some(sender) = value.get("sender").and_then(|v| v.as_str())
            && sender != SYSTEM_SENDER
            && !sender.is_empty()
            && let Err(e) = self.ensure_user(session_id, sender).await
        {
            tracing::warn!(session_id = %session_id, sender, error = %e, "user binding failed");
        }

        let command: Action = match serde_json::from_value(value) {
            Ok(command) => command,
            Err(e) => {
                let err = RelayError::Validation(e.to_string());
                tracing::debug!(session_id = %session_id, action, error = %err, "rejected");
                return vec![Envelope::failure(&action, &err)];
            }
        };

        match self.dispatch(session_id, command).await {
            Ok(responses) => responses,
            Err(err) => {
                tracing::debug!(session_id = %session_id, action, error = %err, "command failed");
                vec![Envelope::failure(&action, &err)]
            }
        }
    }

    async fn dispatch(
        &self,
        session_id: SessionId,
        command: Action,
    ) -> Result<Vec<Envelope>, RelayError> {
        match command {
            Action::SendMessage {
                workspace,
                channel,
                message,
                sender,
                date,
                time,
            } => {
                self.send_message(session_id, &workspace, &channel, message, sender, date, time)
                    .await
            }
            Action::RegisterUser { username } => self.register_user(session_id, username).await,
            Action::GetWorkspaceList => self.workspace_list().await,
            Action::GetChannelList { workspace } => {
                self.channel_list(session_id, &workspace).await
            }
            Action::GetChannelData { workspace, channel } => {
                self.channel_data(&workspace, &channel).await
            }
            Action::CreateWorkspace { workspace } => {
                self.directory.create_workspace(&workspace).await?;
                self.notify_workspaces().await?;
                Ok(vec![Envelope::success(
                    "create_workspace",
                    serde_json::json!({ "workspace": workspace }),
                )])
            }
            Action::CreateChannel {
                workspace,
                channel,
                description,
            } => {
                let channel = normalize_channel(&channel).to_string();
                self.directory
                    .create_channel(&workspace, &channel, description)
                    .await?;
                self.notify_channels(&workspace).await?;
                Ok(vec![
                    Envelope::success(
                        "create_channel",
                        serde_json::json!({ "channel": channel }),
                    )
                    .with_workspace(&workspace),
                ])
            }
            Action::DeleteWorkspace { workspace } => {
                self.directory.delete_workspace(&workspace).await?;
                self.notify_workspaces().await?;
                Ok(vec![Envelope::success(
                    "delete_workspace",
                    serde_json::json!({ "workspace": workspace }),
                )])
            }
            Action::DeleteChannel { workspace, channel } => {
                let channel = normalize_channel(&channel).to_string();
                self.directory.delete_channel(&workspace, &channel).await?;
                self.notify_channels(&workspace).await?;
                Ok(vec![
                    Envelope::success(
                        "delete_channel",
                        serde_json::json!({ "channel": channel }),
                    )
                    .with_workspace(&workspace),
                ])
            }
            Action::UpdateWorkspace {
                workspace,
                new_name,
            } => {
                self.directory
                    .rename_workspace(&workspace, &new_name)
                    .await?;
                self.notify_workspaces().await?;
                Ok(vec![Envelope::success(
                    "update_workspace",
                    serde_json::json!({ "workspace": new_name }),
                )])
            }
            Action::UpdateChannel {
                workspace,
                channel,
                new_name,
                description,
            } => {
                let channel = normalize_channel(&channel).to_string();
                let new_name = normalize_channel(&new_name).to_string();
                self.directory
                    .rename_channel(&workspace, &channel, &new_name, description.as_deref())
                    .await?;
                self.notify_channels(&workspace).await?;
                Ok(vec![
                    Envelope::success(
                        "update_channel",
                        serde_json::json!({ "channel": new_name }),
                    )
                    .with_workspace(&workspace),
                ])
            }
            Action::Search {
                query,
                workspace,
                channel,
                sender,
                from_date,
                to_date,
            } => {
                self.search(query, workspace, channel, sender, from_date, to_date)
                    .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_message(
        &self,
        session_id: SessionId,
        workspace: &str,
        channel: &str,
        content: String,
        sender: String,
        date: String,
        time: String,
    ) -> Result<Vec<Envelope>, RelayError> {
        let channel = normalize_channel(channel);
        self.require_workspace(workspace).await?;
        self.require_channel(workspace, channel).await?;

        // Stamp server-side when the client omitted its clock.
        let now = chrono::Local::now();
        let date = if date.is_empty() {
            now.format("%Y-%m-%d").to_string()
        } else {
            date
        };
        let time = if time.is_empty() {
            now.format("%H:%M:%S").to_string()
        } else {
            time
        };

        self.store
            .insert_message(Message {
                workspace: workspace.to_string(),
                channel: channel.to_string(),
                sender: sender.clone(),
                content: content.clone(),
                date: date.clone(),
                time: time.clone(),
                stored_at: Utc::now(),
            })
            .await?;

        // Rebroadcast the original envelope shape to every other session.
        let envelope = Envelope {
            date,
            time,
            sender,
            action: "send_message".to_string(),
            status: None,
            workspace: Some(workspace.to_string()),
            channel: Some(channel.to_string()),
            message: serde_json::Value::String(content),
        };
        self.broadcaster
            .broadcast_all(&envelope, Some(session_id))
            .await;
        Ok(Vec::new())
    }

    async fn register_user(
        &self,
        session_id: SessionId,
        username: String,
    ) -> Result<Vec<Envelope>, RelayError> {
        if username.is_empty() {
            return Err(RelayError::Validation("missing username".to_string()));
        }
        self.ensure_user(session_id, &username).await?;
        Ok(vec![Envelope::success(
            "register_user",
            serde_json::json!({ "username": username }),
        )])
    }

    async fn workspace_list(&self) -> Result<Vec<Envelope>, RelayError> {
        let snapshot = self.directory.workspace_snapshot().await?;
        Ok(vec![Envelope::server(
            "workspace_list",
            serde_json::json!(snapshot),
        )])
    }

    async fn channel_list(
        &self,
        session_id: SessionId,
        workspace: &str,
    ) -> Result<Vec<Envelope>, RelayError> {
        self.require_workspace(workspace).await?;
        let channels = self.directory.channel_names(workspace).await?;
        self.registry.set_subscription(session_id, workspace).await;
        Ok(vec![
            Envelope::server("channel_list", serde_json::json!(channels))
                .with_workspace(workspace),
        ])
    }

    async fn channel_data(
        &self,
        workspace: &str,
        channel: &str,
    ) -> Result<Vec<Envelope>, RelayError> {
        let channel = normalize_channel(channel);
        self.require_workspace(workspace).await?;
        self.require_channel(workspace, channel).await?;
        let messages: Vec<serde_json::Value> = self
            .store
            .list_messages(workspace, channel)
            .await?
            .into_iter()
            .map(|m| {
                serde_json::json!({
                    "date": m.date,
                    "time": m.time,
                    "sender": m.sender,
                    "message": m.content,
                })
            })
            .collect();
        Ok(vec![
            Envelope::server("channel_data", serde_json::json!(messages))
                .with_workspace(workspace)
                .with_channel(channel),
        ])
    }

    async fn search(
        &self,
        query: String,
        workspace: Option<String>,
        channel: Option<String>,
        sender: Option<String>,
        from_date: Option<String>,
        to_date: Option<String>,
    ) -> Result<Vec<Envelope>, RelayError> {
        if query.trim().is_empty() {
            return Err(RelayError::Validation("empty search query".to_string()));
        }
        let results = self
            .store
            .search_messages(&SearchQuery {
                query,
                workspace,
                channel: channel.as_deref().map(|c| normalize_channel(c).to_string()),
                sender,
                from_date,
                to_date,
                limit: SEARCH_RESULT_LIMIT,
            })
            .await?;
        let hits: Vec<serde_json::Value> = results
            .iter()
            .map(|m| {
                serde_json::json!({
                    "workspace": m.workspace,
                    "channel": m.channel,
                    "date": m.date,
                    "time": m.time,
                    "sender": m.sender,
                    "message": m.content,
                })
            })
            .collect();
        Ok(vec![Envelope::server(
            "search_response",
            serde_json::json!({ "count": hits.len(), "results": hits }),
        )])
    }

    /// Get-or-create the user record and bind it to the session.
    async fn ensure_user(&self, session_id: SessionId, name: &str) -> Result<(), RelayError> {
        if self.store.find_user(name).await?.is_none() {
            self.store.insert_user(User::new(name)).await?;
            tracing::debug!(user = name, "user created");
        }
        self.registry.bind_user(session_id, name).await;
        Ok(())
    }

    /// Rebuilds the directory snapshot and notifies every live session.
    async fn notify_workspaces(&self) -> Result<(), RelayError> {
        let snapshot = self.directory.workspace_snapshot().await?;
        let envelope = Envelope::server("workspace_update", serde_json::json!(snapshot));
        self.broadcaster.broadcast_all(&envelope, None).await;
        Ok(())
    }

    /// Rebuilds one workspace's channel list and notifies its subscribers.
    async fn notify_channels(&self, workspace: &str) -> Result<(), RelayError> {
        let channels = self.directory.channel_names(workspace).await?;
        let envelope = Envelope::server("channel_update", serde_json::json!(channels))
            .with_workspace(workspace);
        self.broadcaster.broadcast_scoped(&envelope, workspace).await;
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

/// Strips the leading `#` some clients prefix channel names with.
fn normalize_channel(channel: &str) -> &str {
    channel.trim_start_matches('#')
}
