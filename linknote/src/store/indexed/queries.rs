use crate::errors::StoreError;
use crate::record::{Link, LinkID, Note, NoteID};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{query, query_as, query_scalar, Sqlite, Transaction};

/// Schema steps, the step at index `i` brings the schema to version `i + 1`.
///
/// Every statement checks before it creates, so steps can run again on a database that
/// already has them without touching existing records.
pub(super) const MIGRATIONS: &[&[&str]] = &[
    &[
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            reminder TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS notes_title ON notes(title)",
        "CREATE INDEX IF NOT EXISTS notes_updated_at ON notes(updated_at)",
        "CREATE INDEX IF NOT EXISTS notes_reminder ON notes(reminder)",
    ],
    &[
        r#"
        CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        "CREATE UNIQUE INDEX IF NOT EXISTS links_url ON links(url)",
        "CREATE INDEX IF NOT EXISTS links_created_at ON links(created_at)",
    ],
];

#[derive(sqlx::FromRow)]
pub(super) struct NoteRow {
    id: i64,
    title: String,
    content: String,
    reminder: Option<NaiveDateTime>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: NoteID::from(row.id),
            title: row.title,
            content: row.content,
            reminder: row.reminder,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct LinkRow {
    id: i64,
    title: String,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: LinkID::from(row.id),
            title: row.title,
            url: row.url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(super) struct NoteColumns {
    pub(super) title: String,
    pub(super) content: String,
    pub(super) reminder: Option<NaiveDateTime>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
}

pub(super) async fn user_version(
    transaction: &mut Transaction<'_, Sqlite>,
) -> Result<i64, StoreError> {
    Ok(query_scalar::<_, i64>("PRAGMA user_version")
        .fetch_one(&mut **transaction)
        .await?)
}

pub(super) async fn set_user_version(
    transaction: &mut Transaction<'_, Sqlite>,
    version: i64,
) -> Result<(), StoreError> {
    // PRAGMA arguments can't be bound
    query(&format!("PRAGMA user_version = {}", version))
        .execute(&mut **transaction)
        .await?;
    Ok(())
}

pub(super) async fn run_migrations(
    transaction: &mut Transaction<'_, Sqlite>,
    from: i64,
) -> Result<(), StoreError> {
    for step in MIGRATIONS.iter().skip(from.max(0) as usize) {
        for statement in step.iter() {
            query(statement).execute(&mut **transaction).await?;
        }
    }
    Ok(())
}

pub(super) async fn select_notes(
    transaction: &mut Transaction<'_, Sqlite>,
) -> Result<Vec<Note>, StoreError> {
    let rows: Vec<NoteRow> = query_as(
        r#"
        SELECT id, title, content, reminder, created_at, updated_at
        FROM notes
        ORDER BY updated_at DESC
        "#,
    )
    .fetch_all(&mut **transaction)
    .await?;
    Ok(rows.into_iter().map(Note::from).collect())
}

pub(super) async fn select_note(
    transaction: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<Option<Note>, StoreError> {
    let row: Option<NoteRow> = query_as(
        r#"
        SELECT id, title, content, reminder, created_at, updated_at
        FROM notes
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(row.map(Note::from))
}

pub(super) async fn insert_note(
    transaction: &mut Transaction<'_, Sqlite>,
    n: NoteColumns,
) -> Result<i64, StoreError> {
    let res = query(
        r#"
        INSERT INTO notes (title, content, reminder, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(n.title)
    .bind(n.content)
    .bind(n.reminder)
    .bind(n.created_at)
    .bind(n.updated_at)
    .execute(&mut **transaction)
    .await?;
    Ok(res.last_insert_rowid())
}

pub(super) async fn update_note(
    transaction: &mut Transaction<'_, Sqlite>,
    id: i64,
    n: NoteColumns,
) -> Result<(), StoreError> {
    query(
        r#"
        UPDATE notes
        SET title = ?1, content = ?2, reminder = ?3, updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(n.title)
    .bind(n.content)
    .bind(n.reminder)
    .bind(n.updated_at)
    .bind(id)
    .execute(&mut **transaction)
    .await?;
    Ok(())
}

pub(super) async fn delete_note(
    transaction: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<(), StoreError> {
    query("DELETE FROM notes WHERE id = ?1")
        .bind(id)
        .execute(&mut **transaction)
        .await?;
    Ok(())
}

pub(super) async fn select_links(
    transaction: &mut Transaction<'_, Sqlite>,
) -> Result<Vec<Link>, StoreError> {
    let rows: Vec<LinkRow> = query_as(
        r#"
        SELECT id, title, url, created_at, updated_at
        FROM links
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&mut **transaction)
    .await?;
    Ok(rows.into_iter().map(Link::from).collect())
}

pub(super) async fn select_link(
    transaction: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<Option<Link>, StoreError> {
    let row: Option<LinkRow> = query_as(
        r#"
        SELECT id, title, url, created_at, updated_at
        FROM links
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(row.map(Link::from))
}

/// Look a link up through the unique url index.
pub(super) async fn select_link_by_url(
    transaction: &mut Transaction<'_, Sqlite>,
    url: &str,
) -> Result<Option<Link>, StoreError> {
    let row: Option<LinkRow> = query_as(
        r#"
        SELECT id, title, url, created_at, updated_at
        FROM links
        WHERE url = ?1
        "#,
    )
    .bind(url)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(row.map(Link::from))
}

pub(super) async fn insert_link(
    transaction: &mut Transaction<'_, Sqlite>,
    title: &str,
    url: &str,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let res = query(
        r#"
        INSERT INTO links (title, url, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        "#,
    )
    .bind(title)
    .bind(url)
    .bind(now)
    .execute(&mut **transaction)
    .await?;
    Ok(res.last_insert_rowid())
}

pub(super) async fn update_link(
    transaction: &mut Transaction<'_, Sqlite>,
    id: i64,
    title: &str,
    url: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    query(
        r#"
        UPDATE links
        SET title = ?1, url = ?2, updated_at = ?3
        WHERE id = ?4
        "#,
    )
    .bind(title)
    .bind(url)
    .bind(updated_at)
    .bind(id)
    .execute(&mut **transaction)
    .await?;
    Ok(())
}

pub(super) async fn delete_link(
    transaction: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<(), StoreError> {
    query("DELETE FROM links WHERE id = ?1")
        .bind(id)
        .execute(&mut **transaction)
        .await?;
    Ok(())
}
