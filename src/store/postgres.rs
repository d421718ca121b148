//! Postgres note store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{NoteStore, StoreError};
use crate::models::{Collaborator, Note, NotePage, Permission};

/// Note row from the database, without its collaborator list
#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: Uuid,
    title: String,
    content: String,
    owner: String,
    revision: i64,
    last_modified_by: Option<String>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CollaboratorRow {
    user_id: String,
    permission: String,
}

pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    /// Connect to the database and ensure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Postgres note store initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                owner TEXT NOT NULL,
                revision BIGINT NOT NULL,
                last_modified_by TEXT,
                archived BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS note_collaborators (
                note_id UUID NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                permission TEXT NOT NULL,
                PRIMARY KEY (note_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_owner ON notes (owner, revision DESC)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_note_collaborators_user ON note_collaborators (user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_collaborators(&self, note_id: Uuid) -> Result<Vec<Collaborator>, StoreError> {
        let rows = sqlx::query_as::<_, CollaboratorRow>(
            "SELECT user_id, permission FROM note_collaborators WHERE note_id = $1",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Collaborator {
                    user_id: row.user_id,
                    permission: parse_permission(&row.permission)?,
                })
            })
            .collect()
    }
}

fn parse_permission(raw: &str) -> Result<Permission, StoreError> {
    match raw {
        "read" => Ok(Permission::Read),
        "write" => Ok(Permission::Write),
        other => Err(StoreError::Backend(format!(
            "Unknown permission level '{}'",
            other
        ))),
    }
}

fn permission_str(permission: Permission) -> &'static str {
    match permission {
        Permission::Read => "read",
        Permission::Write => "write",
    }
}

fn assemble(row: NoteRow, collaborators: Vec<Collaborator>) -> Note {
    Note {
        id: row.id,
        title: row.title,
        content: row.content,
        owner: row.owner,
        collaborators,
        revision: row.revision,
        last_modified_by: row.last_modified_by,
        archived: row.archived,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, title, content, owner, revision, last_modified_by,
                   archived, created_at, updated_at
            FROM notes WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let collaborators = self.load_collaborators(row.id).await?;
                Ok(Some(assemble(row, collaborators)))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, note: &Note) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO notes (id, title, content, owner, revision, last_modified_by,
                               archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                revision = EXCLUDED.revision,
                last_modified_by = EXCLUDED.last_modified_by,
                archived = EXCLUDED.archived,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.owner)
        .bind(note.revision)
        .bind(&note.last_modified_by)
        .bind(note.archived)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM note_collaborators WHERE note_id = $1")
            .bind(note.id)
            .execute(&mut *tx)
            .await?;

        for collaborator in &note.collaborators {
            sqlx::query(
                "INSERT INTO note_collaborators (note_id, user_id, permission) VALUES ($1, $2, $3)",
            )
            .bind(note.id)
            .bind(&collaborator.user_id)
            .bind(permission_str(collaborator.permission))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<NotePage, StoreError> {
        let limit = limit.max(1);
        let page = page.max(1);
        let offset = (page as i64 - 1) * limit as i64;

        let total_notes: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notes
            WHERE NOT archived
              AND (owner = $1 OR EXISTS (
                  SELECT 1 FROM note_collaborators c
                  WHERE c.note_id = notes.id AND c.user_id = $1))
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, title, content, owner, revision, last_modified_by,
                   archived, created_at, updated_at
            FROM notes
            WHERE NOT archived
              AND (owner = $1 OR EXISTS (
                  SELECT 1 FROM note_collaborators c
                  WHERE c.note_id = notes.id AND c.user_id = $1))
            ORDER BY revision DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in rows {
            let collaborators = self.load_collaborators(row.id).await?;
            notes.push(assemble(row, collaborators));
        }

        let total_pages = ((total_notes as u64 + limit as u64 - 1) / limit as u64) as u32;
        Ok(NotePage {
            notes,
            current_page: page,
            total_pages,
            total_notes: total_notes as u64,
        })
    }
}
