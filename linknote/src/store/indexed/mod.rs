//! Indexed storage of notes and links in a SQLite database.
use super::{Backend, BackendKind};
use crate::errors::StoreError;
use crate::record::*;
use crate::url::format_url;
use chrono::Utc;
use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{info, warn};

mod queries;
use queries::*;


/// Version of the schema written by this build, kept in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = queries::MIGRATIONS.len() as i64;

/// SQLite primary result codes for a database another connection holds a lock on.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Ids of the indexed store are integers, anything else can't name a record.
fn parse_id(id: &str) -> Option<i64> {
    id.parse().ok()
}

/// Turn lock contention into [`StoreError::Blocked`].
fn reclassified<'a, T: Send + 'a>(
    fut: BoxFuture<'a, Result<T, StoreError>>,
) -> BoxFuture<'a, Result<T, StoreError>> {
    Box::pin(async move { fut.await.map_err(reclassify) })
}

fn reclassify(e: StoreError) -> StoreError {
    if let StoreError::SQLiteError(sqlx::Error::Database(ref db)) = e {
        // Extended codes keep the primary code in the low byte
        let primary = db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff);
        if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
            return StoreError::Blocked(db.message().to_owned());
        }
    }
    e
}

pub struct IndexedStoreBuilder {
    db_options: SqliteConnectOptions,
    in_memory: bool,
}

impl IndexedStoreBuilder {
    pub fn new(db_options: SqliteConnectOptions) -> Self {
        Self {
            db_options,
            in_memory: false,
        }
    }

    /// A database file, created if missing.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self::new(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        )
    }

    /// A private in-memory database, gone when the store is dropped.
    pub fn in_memory() -> Self {
        Self {
            db_options: SqliteConnectOptions::new().filename(":memory:"),
            in_memory: true,
        }
    }

    /// Open the database and bring its schema up to [`SCHEMA_VERSION`].
    ///
    /// Fails with [`StoreError::Unavailable`] if the database can't be opened, or if it was
    /// written by a newer schema.
    pub async fn build(self) -> Result<IndexedStore, StoreError> {
        // One connection: transactions are serialized, and an in-memory database lives
        // exactly as long as its connection.
        let mut pool_options = SqlitePoolOptions::new().max_connections(1);
        if self.in_memory {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let db_pool = pool_options
            .connect_with(self.db_options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        migrate(&db_pool).await.map_err(|e| match e {
            StoreError::SQLiteError(e) => StoreError::Unavailable(e.to_string()),
            e => e,
        })?;
        Ok(IndexedStore {
            db_pool,
            schema_version: AtomicI64::new(SCHEMA_VERSION),
        })
    }
}

async fn migrate(db_pool: &SqlitePool) -> Result<(), StoreError> {
    let mut transaction = db_pool.begin().await?;
    let stored = user_version(&mut transaction).await?;
    if stored > SCHEMA_VERSION {
        transaction.rollback().await?;
        return Err(StoreError::Unavailable(format!(
            "database schema version {} is newer than {}",
            stored, SCHEMA_VERSION
        )));
    }
    if stored < SCHEMA_VERSION {
        info!(
            "Migrating database schema from version {} to {}",
            stored, SCHEMA_VERSION
        );
        run_migrations(&mut transaction, stored).await?;
        set_user_version(&mut transaction, SCHEMA_VERSION).await?;
    }
    transaction.commit().await?;
    Ok(())
}

/// Indexed storage.
///
/// Every operation runs in its own short transaction. The schema version is checked at the
/// start of each transaction: once another session has changed it, this store refuses
/// every further operation with [`StoreError::VersionChange`].
pub struct IndexedStore {
    db_pool: SqlitePool,
    /// Last schema version seen, differs from [`SCHEMA_VERSION`] once invalidated.
    schema_version: AtomicI64,
}

impl IndexedStore {
    async fn begin(&self) -> Result<Transaction<'_, Sqlite>, StoreError> {
        let seen = self.schema_version.load(Ordering::SeqCst);
        if seen != SCHEMA_VERSION {
            return Err(StoreError::VersionChange {
                expected: SCHEMA_VERSION,
                found: seen,
            });
        }
        let mut transaction = self.db_pool.begin().await?;
        let found = user_version(&mut transaction).await?;
        if found != SCHEMA_VERSION {
            warn!(
                "Database schema changed to version {} by another session",
                found
            );
            self.schema_version.store(found, Ordering::SeqCst);
            transaction.rollback().await?;
            return Err(StoreError::VersionChange {
                expected: SCHEMA_VERSION,
                found,
            });
        }
        Ok(transaction)
    }

    /// Close the connection. Every later operation fails as unavailable.
    pub async fn close(&self) {
        self.db_pool.close().await;
    }

    /// Overwrite the stored schema version, as another session would.
    #[cfg(test)]
    pub(crate) async fn force_user_version(&self, version: i64) {
        sqlx::query(&format!("PRAGMA user_version = {}", version))
            .execute(&self.db_pool)
            .await
            .unwrap();
    }
}

impl Backend for IndexedStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
    }

    fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, StoreError>> {
        reclassified(Box::pin(async move {
            let mut transaction = self.begin().await?;
            let notes = select_notes(&mut transaction).await?;
            transaction.commit().await?;
            Ok(notes)
        }))
    }

    fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Option<Note>, StoreError>> {
        reclassified(Box::pin(async move {
            let id = match parse_id(id.as_ref()) {
                Some(id) => id,
                None => return Ok(None),
            };
            let mut transaction = self.begin().await?;
            let note = select_note(&mut transaction, id).await?;
            transaction.commit().await?;
            Ok(note)
        }))
    }

    fn save_note(&self, draft: NoteDraft) -> BoxFuture<Result<NoteID, StoreError>> {
        reclassified(Box::pin(async move {
            let now = Utc::now();
            let mut transaction = self.begin().await?;
            let existing = match draft.id.as_ref().and_then(|id| parse_id(id.as_ref())) {
                Some(id) => select_note(&mut transaction, id).await?,
                None => None,
            };
            let id = match existing {
                Some(old_note) => {
                    let id = parse_id(old_note.id.as_ref())
                        .ok_or_else(|| StoreError::Corrupted(old_note.id.to_string()))?;
                    let n = NoteColumns {
                        title: draft.title,
                        content: draft.content,
                        reminder: draft.reminder,
                        created_at: old_note.created_at,
                        updated_at: next_updated_at(now, old_note.updated_at),
                    };
                    update_note(&mut transaction, id, n).await?;
                    id
                }
                None => {
                    if let Some(ref unknown) = draft.id {
                        warn!("note `{}` doesn't exist, saving as a new note", unknown);
                    }
                    let created_at = draft.created_at.unwrap_or(now);
                    let n = NoteColumns {
                        title: draft.title,
                        content: draft.content,
                        reminder: draft.reminder,
                        created_at,
                        updated_at: next_updated_at(now, created_at),
                    };
                    insert_note(&mut transaction, n).await?
                }
            };
            transaction.commit().await?;
            Ok(NoteID::from(id))
        }))
    }

    fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), StoreError>> {
        reclassified(Box::pin(async move {
            let id = match parse_id(id.as_ref()) {
                Some(id) => id,
                None => return Ok(()),
            };
            let mut transaction = self.begin().await?;
            delete_note(&mut transaction, id).await?;
            transaction.commit().await?;
            Ok(())
        }))
    }

    fn list_links(&self) -> BoxFuture<Result<Vec<Link>, StoreError>> {
        reclassified(Box::pin(async move {
            let mut transaction = self.begin().await?;
            let links = select_links(&mut transaction).await?;
            transaction.commit().await?;
            Ok(links)
        }))
    }

    fn get_link<'a>(&'a self, id: &'a LinkID) -> BoxFuture<'a, Result<Option<Link>, StoreError>> {
        reclassified(Box::pin(async move {
            let id = match parse_id(id.as_ref()) {
                Some(id) => id,
                None => return Ok(None),
            };
            let mut transaction = self.begin().await?;
            let link = select_link(&mut transaction, id).await?;
            transaction.commit().await?;
            Ok(link)
        }))
    }

    fn save_link(&self, draft: LinkDraft) -> BoxFuture<Result<LinkID, StoreError>> {
        reclassified(Box::pin(async move {
            let url = format_url(&draft.url);
            let now = Utc::now();
            // Lookup and write share one transaction
            let mut transaction = self.begin().await?;
            let id = match select_link_by_url(&mut transaction, &url).await? {
                Some(old_link) => {
                    let id = parse_id(old_link.id.as_ref())
                        .ok_or_else(|| StoreError::Corrupted(old_link.id.to_string()))?;
                    let updated_at = next_updated_at(now, old_link.updated_at);
                    update_link(&mut transaction, id, &draft.title, &url, updated_at).await?;
                    id
                }
                None => insert_link(&mut transaction, &draft.title, &url, now).await?,
            };
            transaction.commit().await?;
            Ok(LinkID::from(id))
        }))
    }

    fn update_link<'a>(
        &'a self,
        id: &'a LinkID,
        title: String,
        url: String,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        reclassified(Box::pin(async move {
            let row_id = parse_id(id.as_ref()).ok_or_else(|| StoreError::LinkNotExist(id.clone()))?;
            let url = format_url(&url);
            let mut transaction = self.begin().await?;
            let old_link = select_link(&mut transaction, row_id)
                .await?
                .ok_or_else(|| StoreError::LinkNotExist(id.clone()))?;
            if let Some(other) = select_link_by_url(&mut transaction, &url).await? {
                if &other.id != id {
                    transaction.rollback().await?;
                    return Err(StoreError::UrlConflict(url));
                }
            }
            let updated_at = next_updated_at(Utc::now(), old_link.updated_at);
            update_link(&mut transaction, row_id, &title, &url, updated_at).await?;
            transaction.commit().await?;
            Ok(())
        }))
    }

    fn delete_link<'a>(&'a self, id: &'a LinkID) -> BoxFuture<'a, Result<(), StoreError>> {
        reclassified(Box::pin(async move {
            let id = match parse_id(id.as_ref()) {
                Some(id) => id,
                None => return Ok(()),
            };
            let mut transaction = self.begin().await?;
            delete_link(&mut transaction, id).await?;
            transaction.commit().await?;
            Ok(())
        }))
    }
}
