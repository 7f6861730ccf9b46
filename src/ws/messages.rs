//! WebSocket message types: inbound actions and outbound envelopes.

use serde::{Deserialize, Serialize};

/// Reserved sender name for server-originated envelopes. Inbound frames
/// carrying this sender never create or bind a user record.
pub const SYSTEM_SENDER: &str = "Server";

/// Outcome discriminator carried by command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The command was applied.
    Success,
    /// The command was rejected; `message` carries the reason.
    Error,
}

/// One outbound message unit.
///
/// Server-originated envelopes carry the [`SYSTEM_SENDER`] name and the
/// current wall-clock date/time; rebroadcast chat envelopes preserve the
/// original client-supplied fields verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Date string (`YYYY-MM-DD`).
    pub date: String,
    /// Time string (`HH:MM:SS`).
    pub time: String,
    /// Originating sender name.
    pub sender: String,
    /// Response or update-notification name (e.g. `channel_list`,
    /// `create_workspace_response`, `workspace_update`).
    pub action: String,
    /// Command outcome, present on direct command responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Workspace echo, where the action is workspace-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    /// Channel echo, where the action is channel-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Action-specific payload.
    pub message: serde_json::Value,
}

impl Envelope {
    /// Creates a server-originated envelope stamped with the current
    /// local date and time.
    #[must_use]
    pub fn server(action: &str, message: serde_json::Value) -> Self {
        let now = chrono::Local::now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            sender: SYSTEM_SENDER.to_string(),
            action: action.to_string(),
            status: None,
            workspace: None,
            channel: None,
            message,
        }
    }

    /// Creates a success response for `action` (`<action>_response`).
    #[must_use]
    pub fn success(action: &str, message: serde_json::Value) -> Self {
        Self::server(&format!("{action}_response"), message).with_status(Status::Success)
    }

    /// Creates an error response for `action` from a relay error.
    #[must_use]
    pub fn failure(action: &str, error: &crate::error::RelayError) -> Self {
        Self::server(
            &format!("{action}_response"),
            serde_json::json!({
                "error": error.kind(),
                "detail": error.to_string(),
            }),
        )
        .with_status(Status::Error)
    }

    /// Sets the status field.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the workspace echo field.
    #[must_use]
    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    /// Sets the channel echo field.
    #[must_use]
    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }
}

/// Inbound commands, dispatched on the `action` field.
///
/// Deserialization is the validation boundary: a known action with a
/// missing required field fails here and is answered with an
/// error-status envelope. Unknown actions never reach this enum — the
/// router screens them against [`Action::NAMES`] first and drops them
/// as logged no-ops.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Persist a chat message and rebroadcast it to every other session.
    SendMessage {
        /// Target workspace.
        workspace: String,
        /// Target channel.
        channel: String,
        /// Message content.
        message: String,
        /// Sender name.
        sender: String,
        /// Client-supplied date; stamped by the server when absent.
        #[serde(default)]
        date: String,
        /// Client-supplied time; stamped by the server when absent.
        #[serde(default)]
        time: String,
    },
    /// Get-or-create a user and bind it to the session.
    RegisterUser {
        /// User name to register.
        username: String,
    },
    /// Request the full workspace → channel-name directory snapshot.
    GetWorkspaceList,
    /// Request one workspace's channel names; subscribes the session to
    /// that workspace's channel updates.
    GetChannelList {
        /// Workspace to list.
        workspace: String,
    },
    /// Request a channel's messages in arrival order.
    GetChannelData {
        /// Owning workspace.
        workspace: String,
        /// Channel to read.
        channel: String,
    },
    /// Create a workspace seeded with the default channels.
    CreateWorkspace {
        /// Workspace name.
        workspace: String,
    },
    /// Create a channel inside an existing workspace.
    CreateChannel {
        /// Owning workspace.
        workspace: String,
        /// Channel name.
        channel: String,
        /// Optional description.
        #[serde(default)]
        description: Option<String>,
    },
    /// Delete a workspace and cascade its channels and messages.
    DeleteWorkspace {
        /// Workspace name.
        workspace: String,
    },
    /// Delete a channel and cascade its messages.
    DeleteChannel {
        /// Owning workspace.
        workspace: String,
        /// Channel name.
        channel: String,
    },
    /// Rename a workspace.
    UpdateWorkspace {
        /// Current name.
        workspace: String,
        /// New name.
        new_name: String,
    },
    /// Rename a channel and optionally replace its description.
    UpdateChannel {
        /// Owning workspace.
        workspace: String,
        /// Current channel name.
        channel: String,
        /// New channel name.
        new_name: String,
        /// Replacement description, when present.
        #[serde(default)]
        description: Option<String>,
    },
    /// Search message content.
    Search {
        /// Substring to match, case-insensitive.
        query: String,
        /// Optional workspace filter.
        #[serde(default)]
        workspace: Option<String>,
        /// Optional channel filter.
        #[serde(default)]
        channel: Option<String>,
        /// Optional sender filter.
        #[serde(default)]
        sender: Option<String>,
        /// Optional inclusive lower date bound.
        #[serde(default)]
        from_date: Option<String>,
        /// Optional inclusive upper date bound.
        #[serde(default)]
        to_date: Option<String>,
    },
}

impl Action {
    /// Every action name this relay dispatches on. Frames whose `action`
    /// is not in this list are logged no-ops.
    pub const NAMES: [&'static str; 12] = [
        "send_message",
        "register_user",
        "get_workspace_list",
        "get_channel_list",
        "get_channel_data",
        "create_workspace",
        "create_channel",
        "delete_workspace",
        "delete_channel",
        "update_workspace",
        "update_channel",
        "search",
    ];
}
