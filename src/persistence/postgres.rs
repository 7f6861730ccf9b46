//! PostgreSQL implementation of the persistence gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, QueryBuilder};

use super::models::{Channel, Message, SearchQuery, User, Workspace};
use super::Store;
use crate::config::RelayConfig;
use crate::error::RelayError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL using the pool settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::Persistence`] if the connection fails.
    pub async fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(|e| RelayError::Persistence(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Runs pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::Persistence`] on migration failure.
    pub async fn migrate(&self) -> Result<(), RelayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RelayError::Persistence(e.to_string()))
    }
}

fn persistence_err(e: sqlx::Error) -> RelayError {
    RelayError::Persistence(e.to_string())
}

type MessageRow = (String, String, String, String, String, String, DateTime<Utc>);

fn message_from_row(row: MessageRow) -> Message {
    let (workspace, channel, sender, content, date, time, stored_at) = row;
    Message {
        workspace,
        channel,
        sender,
        content,
        date,
        time,
        stored_at,
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn find_workspace(&self, name: &str) -> Result<Option<Workspace>, RelayError> {
        let row = sqlx::query_as::<_, (String, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT name, created_at, updated_at FROM workspaces WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(row.map(|(name, created_at, updated_at)| Workspace {
            name,
            created_at,
            updated_at,
        }))
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, RelayError> {
        let rows = sqlx::query_as::<_, (String, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT name, created_at, updated_at FROM workspaces ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(rows
            .into_iter()
            .map(|(name, created_at, updated_at)| Workspace {
                name,
                created_at,
                updated_at,
            })
            .collect())
    }

    async fn insert_workspace(&self, workspace: Workspace) -> Result<(), RelayError> {
        sqlx::query("INSERT INTO workspaces (name, created_at, updated_at) VALUES ($1, $2, $3)")
            .bind(&workspace.name)
            .bind(workspace.created_at)
            .bind(workspace.updated_at)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(())
    }

    async fn rename_workspace(&self, old: &str, new: &str) -> Result<(), RelayError> {
        sqlx::query("UPDATE workspaces SET name = $1, updated_at = $2 WHERE name = $3")
            .bind(new)
            .bind(Utc::now())
            .bind(old)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        sqlx::query("UPDATE channels SET workspace = $1 WHERE workspace = $2")
            .bind(new)
            .bind(old)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        sqlx::query("UPDATE messages SET workspace = $1 WHERE workspace = $2")
            .bind(new)
            .bind(old)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(())
    }

    async fn delete_workspace(&self, name: &str) -> Result<(), RelayError> {
        sqlx::query("DELETE FROM workspaces WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(())
    }

    async fn find_channel(
        &self,
        workspace: &str,
        name: &str,
    ) -> Result<Option<Channel>, RelayError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT workspace, name, description, created_at, updated_at \
             FROM channels WHERE workspace = $1 AND name = $2",
        )
        .bind(workspace)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(
            row.map(|(workspace, name, description, created_at, updated_at)| Channel {
                workspace,
                name,
                description,
                created_at,
                updated_at,
            }),
        )
    }

    async fn list_channels(&self, workspace: &str) -> Result<Vec<Channel>, RelayError> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT workspace, name, description, created_at, updated_at \
             FROM channels WHERE workspace = $1 ORDER BY name ASC",
        )
        .bind(workspace)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(rows
            .into_iter()
            .map(|(workspace, name, description, created_at, updated_at)| Channel {
                workspace,
                name,
                description,
                created_at,
                updated_at,
            })
            .collect())
    }

    async fn insert_channels(&self, channels: Vec<Channel>) -> Result<(), RelayError> {
        for channel in channels {
            sqlx::query(
                "INSERT INTO channels (workspace, name, description, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&channel.workspace)
            .bind(&channel.name)
            .bind(&channel.description)
            .bind(channel.created_at)
            .bind(channel.updated_at)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        }
        Ok(())
    }

    async fn rename_channel(
        &self,
        workspace: &str,
        old: &str,
        new: &str,
        description: Option<&str>,
    ) -> Result<(), RelayError> {
        match description {
            Some(desc) => {
                sqlx::query(
                    "UPDATE channels SET name = $1, description = $2, updated_at = $3 \
                     WHERE workspace = $4 AND name = $5",
                )
                .bind(new)
                .bind(desc)
                .bind(Utc::now())
                .bind(workspace)
                .bind(old)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "UPDATE channels SET name = $1, updated_at = $2 \
                     WHERE workspace = $3 AND name = $4",
                )
                .bind(new)
                .bind(Utc::now())
                .bind(workspace)
                .bind(old)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(persistence_err)?;

        sqlx::query("UPDATE messages SET channel = $1 WHERE workspace = $2 AND channel = $3")
            .bind(new)
            .bind(workspace)
            .bind(old)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(())
    }

    async fn delete_channel(&self, workspace: &str, name: &str) -> Result<(), RelayError> {
        sqlx::query("DELETE FROM channels WHERE workspace = $1 AND name = $2")
            .bind(workspace)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(())
    }

    async fn delete_channels(&self, workspace: &str) -> Result<u64, RelayError> {
        let result = sqlx::query("DELETE FROM channels WHERE workspace = $1")
            .bind(workspace)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(result.rows_affected())
    }

    async fn insert_message(&self, message: Message) -> Result<(), RelayError> {
        sqlx::query(
            "INSERT INTO messages (workspace, channel, sender, content, date, time, stored_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&message.workspace)
        .bind(&message.channel)
        .bind(&message.sender)
        .bind(&message.content)
        .bind(&message.date)
        .bind(&message.time)
        .bind(message.stored_at)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(())
    }

    async fn list_messages(
        &self,
        workspace: &str,
        channel: &str,
    ) -> Result<Vec<Message>, RelayError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT workspace, channel, sender, content, date, time, stored_at \
             FROM messages WHERE workspace = $1 AND channel = $2 \
             ORDER BY stored_at ASC, id ASC",
        )
        .bind(workspace)
        .bind(channel)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn delete_messages(
        &self,
        workspace: &str,
        channel: Option<&str>,
    ) -> Result<u64, RelayError> {
        let result = if let Some(ch) = channel {
            sqlx::query("DELETE FROM messages WHERE workspace = $1 AND channel = $2")
                .bind(workspace)
                .bind(ch)
                .execute(&self.pool)
                .await
        } else {
            sqlx::query("DELETE FROM messages WHERE workspace = $1")
                .bind(workspace)
                .execute(&self.pool)
                .await
        }
        .map_err(persistence_err)?;
        Ok(result.rows_affected())
    }

    async fn search_messages(&self, query: &SearchQuery) -> Result<Vec<Message>, RelayError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT workspace, channel, sender, content, date, time, stored_at \
             FROM messages WHERE content ILIKE ",
        );
        builder.push_bind(format!("%{}%", query.query));
        if let Some(workspace) = &query.workspace {
            builder.push(" AND workspace = ").push_bind(workspace);
        }
        if let Some(channel) = &query.channel {
            builder.push(" AND channel = ").push_bind(channel);
        }
        if let Some(sender) = &query.sender {
            builder.push(" AND sender = ").push_bind(sender);
        }
        if let Some(from_date) = &query.from_date {
            builder.push(" AND date >= ").push_bind(from_date);
        }
        if let Some(to_date) = &query.to_date {
            builder.push(" AND date <= ").push_bind(to_date);
        }
        builder.push(" ORDER BY stored_at DESC, id DESC LIMIT ");
        builder.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<MessageRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(persistence_err)?;

        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn find_user(&self, name: &str) -> Result<Option<User>, RelayError> {
        let row = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            "SELECT name, created_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(row.map(|(name, created_at)| User { name, created_at }))
    }

    async fn insert_user(&self, user: User) -> Result<(), RelayError> {
        sqlx::query(
            "INSERT INTO users (name, created_at) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(&user.name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(())
    }
}
