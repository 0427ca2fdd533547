//! Storage backends of notes and links.
use crate::errors::StoreError;
use crate::record::*;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;

mod flat;
mod indexed;

pub use flat::{DirectoryMedium, FlatMedium, FlatStore, MemoryMedium};
pub use indexed::{IndexedStore, IndexedStoreBuilder, SCHEMA_VERSION};

#[cfg(test)]
pub(crate) mod tests;

/// The concrete persistence strategy behind a [`Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Indexed,
    Flat,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Indexed => write!(f, "indexed"),
            BackendKind::Flat => write!(f, "flat"),
        }
    }
}

/// An abstraction for storage backends.
///
/// Backends own the per-record invariants: they assign ids, stamp `created_at` once and
/// `updated_at` on every save, normalize link urls and keep them unique.
/// Ordering and filtering of lists happen in [`crate::query`], so backends may return
/// records in any order.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;
    /// Get every note.
    fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, StoreError>>;
    /// Get a note, `None` if there is no note with this id.
    fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Option<Note>, StoreError>>;
    /// Create or update a note.
    ///
    /// A draft with the id of an existing note updates that note and keeps its `created_at`.
    /// A draft without an id, or with an id the backend doesn't know, creates a new note
    /// with a freshly assigned id.
    fn save_note(&self, draft: NoteDraft) -> BoxFuture<Result<NoteID, StoreError>>;
    /// Delete a note. Deleting a note that doesn't exist is a no-op.
    fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), StoreError>>;
    /// Get every link.
    fn list_links(&self) -> BoxFuture<Result<Vec<Link>, StoreError>>;
    /// Get a link, `None` if there is no link with this id.
    fn get_link<'a>(&'a self, id: &'a LinkID) -> BoxFuture<'a, Result<Option<Link>, StoreError>>;
    /// Insert or update a link by its normalized url.
    ///
    /// If a link with the same url exists, its title, url and `updated_at` are overwritten
    /// and its id and `created_at` are kept.
    /// The lookup and the write must not be interleaved with another writer.
    fn save_link(&self, draft: LinkDraft) -> BoxFuture<Result<LinkID, StoreError>>;
    /// Update title and url of an existing link.
    ///
    /// Fails with [`StoreError::LinkNotExist`] if the link doesn't exist, and with
    /// [`StoreError::UrlConflict`] if the new url belongs to another link.
    fn update_link<'a>(
        &'a self,
        id: &'a LinkID,
        title: String,
        url: String,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
    /// Delete a link. Deleting a link that doesn't exist is a no-op.
    fn delete_link<'a>(&'a self, id: &'a LinkID) -> BoxFuture<'a, Result<(), StoreError>>;
}

pub type BoxedBackend = Box<dyn Backend>;
