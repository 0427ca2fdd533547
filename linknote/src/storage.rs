//! The storage facade the rest of the application talks to.
use crate::codec::{self, ImportDocument};
use crate::errors::{CodecError, StoreError};
use crate::query::{filter_and_sort_notes, sort_links, SearchRequest};
use crate::record::*;
use crate::settings::{BackendPreference, StorageSettings};
use crate::store::{Backend, BackendKind, BoxedBackend, FlatStore, IndexedStoreBuilder};
use chrono::{Local, Utc};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Owns the backends and picks the one in use.
///
/// The indexed backend is used when it could be opened at startup. Once it reports itself
/// unavailable, the flat backend takes over for the rest of the session; there is no way
/// back. A schema change by another session is returned to the caller as is, see
/// [`StoreError::requires_reload`].
pub struct Storage {
    indexed: Option<BoxedBackend>,
    flat: BoxedBackend,
    fell_back: AtomicBool,
}

impl Storage {
    pub fn new(indexed: Option<BoxedBackend>, flat: BoxedBackend) -> Self {
        Storage {
            indexed,
            flat,
            fell_back: AtomicBool::new(false),
        }
    }

    /// Open the backends described by `settings`.
    ///
    /// Failing to open the indexed backend is not an error, the flat backend is used
    /// instead. The flat backend touches the filesystem only once it is written to.
    pub async fn initialize(settings: &StorageSettings) -> Result<Storage, StoreError> {
        let flat: BoxedBackend = if settings.inmemory {
            Box::new(FlatStore::in_memory())
        } else {
            Box::new(FlatStore::open(&settings.flatdir))
        };
        let indexed = match settings.backend {
            BackendPreference::Flat => None,
            BackendPreference::Indexed => {
                let builder = if settings.inmemory {
                    IndexedStoreBuilder::in_memory()
                } else {
                    IndexedStoreBuilder::file(&settings.databasepath)
                };
                match builder.build().await {
                    Ok(store) => Some(Box::new(store) as BoxedBackend),
                    Err(e) => {
                        warn!("Indexed store unavailable, using the flat store: {}", e);
                        None
                    }
                }
            }
        };
        let storage = Storage::new(indexed, flat);
        info!("Using the {} backend", storage.kind());
        Ok(storage)
    }

    fn active(&self) -> &dyn Backend {
        match self.indexed {
            Some(ref indexed) if !self.fell_back.load(Ordering::SeqCst) => indexed.as_ref(),
            _ => self.flat.as_ref(),
        }
    }

    /// The backend in use.
    pub fn kind(&self) -> BackendKind {
        self.active().kind()
    }

    /// Run `op` on the active backend, moving to the flat backend for good if the indexed
    /// one turns out to be unavailable.
    async fn run<'a, T, F>(&'a self, op: F) -> Result<T, StoreError>
    where
        F: Fn(&'a dyn Backend) -> BoxFuture<'a, Result<T, StoreError>>,
    {
        let backend = self.active();
        match op(backend).await {
            Err(e) if e.is_unavailable() && backend.kind() == BackendKind::Indexed => {
                if !self.fell_back.swap(true, Ordering::SeqCst) {
                    warn!("Indexed store became unavailable, using the flat store: {}", e);
                }
                op(self.flat.as_ref()).await
            }
            res => res,
        }
    }

    /// Notes matching `search`, past-due reminders first, then most recently updated.
    pub async fn list_notes(
        &self,
        search: impl Into<SearchRequest>,
    ) -> Result<Vec<Note>, StoreError> {
        let search = search.into();
        let notes = self.run(|b| b.list_notes()).await?;
        Ok(filter_and_sort_notes(
            notes,
            &search,
            Local::now().naive_local(),
        ))
    }

    pub async fn get_note(&self, id: &NoteID) -> Result<Option<Note>, StoreError> {
        self.run(|b| b.get_note(id)).await
    }

    pub async fn save_note(&self, draft: NoteDraft) -> Result<NoteID, StoreError> {
        if draft.is_empty() {
            return Err(StoreError::EmptyNote);
        }
        self.run(|b| b.save_note(draft.clone())).await
    }

    pub async fn delete_note(&self, id: &NoteID) -> Result<(), StoreError> {
        self.run(|b| b.delete_note(id)).await
    }

    /// Every link, newest first.
    pub async fn list_links(&self) -> Result<Vec<Link>, StoreError> {
        Ok(sort_links(self.run(|b| b.list_links()).await?))
    }

    pub async fn get_link(&self, id: &LinkID) -> Result<Option<Link>, StoreError> {
        self.run(|b| b.get_link(id)).await
    }

    /// Insert a link, or update the link that already has this url.
    pub async fn save_link(&self, draft: LinkDraft) -> Result<LinkID, StoreError> {
        if draft.url.trim().is_empty() {
            return Err(StoreError::EmptyUrl);
        }
        self.run(|b| b.save_link(draft.clone())).await
    }

    pub async fn update_link(
        &self,
        id: &LinkID,
        title: String,
        url: String,
    ) -> Result<(), StoreError> {
        if url.trim().is_empty() {
            return Err(StoreError::EmptyUrl);
        }
        self.run(|b| b.update_link(id, title.clone(), url.clone()))
            .await
    }

    pub async fn delete_link(&self, id: &LinkID) -> Result<(), StoreError> {
        self.run(|b| b.delete_link(id)).await
    }

    /// Export every note, encrypted if a password is given.
    pub async fn export_notes(&self, password: Option<&str>) -> Result<String, CodecError> {
        let notes = self.list_notes(SearchRequest::all()).await?;
        codec::write_export(&notes, password, Utc::now())
    }

    /// Import an export file, returns the number of notes created.
    ///
    /// Nothing is saved unless the whole file could be read and decrypted.
    pub async fn import_notes(
        &self,
        text: &str,
        password: Option<&str>,
    ) -> Result<usize, CodecError> {
        let doc = codec::read_export(text)?.open(password)?;
        self.import_document(doc).await
    }

    /// Save every note of `doc` through the normal save path.
    ///
    /// Notes with neither title nor content are skipped.
    pub async fn import_document(&self, doc: ImportDocument) -> Result<usize, CodecError> {
        let now = Utc::now();
        let mut imported = 0;
        for note in doc.notes {
            let draft = note.into_draft(now);
            if draft.is_empty() {
                continue;
            }
            self.save_note(draft).await?;
            imported += 1;
        }
        info!("Imported {} notes", imported);
        Ok(imported)
    }
}
