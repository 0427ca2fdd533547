//! What a user has open, and the operations that act on it.
//!
//! This is the entry point for an interactive front end that keeps one note or link open
//! for editing. Stateless front ends, such as the JSON API of `linknote-web`, call
//! [`Storage`] directly since every request names the record it acts on.
use crate::errors::StoreError;
use crate::query::SearchRequest;
use crate::record::*;
use crate::storage::Storage;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::debug;

/// A link being edited. `id` is `None` until the link is first saved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkSelection {
    pub id: Option<LinkID>,
    pub title: String,
    pub url: String,
}

impl From<&Link> for LinkSelection {
    fn from(link: &Link) -> Self {
        LinkSelection {
            id: Some(link.id.clone()),
            title: link.title.clone(),
            url: link.url.clone(),
        }
    }
}

/// At most one note or link is open at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Nothing,
    Note(NoteDraft),
    Link(LinkSelection),
}

/// A user's view of the storage.
///
/// The selection only changes once the storage operation behind it has succeeded.
pub struct Session {
    storage: Arc<Storage>,
    selection: Selection,
    search: SearchRequest,
}

impl Session {
    pub fn new(storage: Arc<Storage>) -> Self {
        Session {
            storage,
            selection: Selection::Nothing,
            search: SearchRequest::all(),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Open an unsaved, empty note.
    pub fn create_blank_note(&mut self) {
        self.selection = Selection::Note(NoteDraft::new("", ""));
    }

    /// Open an unsaved, empty link.
    pub fn create_blank_link(&mut self) {
        self.selection = Selection::Link(LinkSelection::default());
    }

    /// Open a stored note. Returns `false` and keeps the selection if it doesn't exist.
    pub async fn open_note(&mut self, id: &NoteID) -> Result<bool, StoreError> {
        match self.storage.get_note(id).await? {
            Some(note) => {
                self.selection = Selection::Note(NoteDraft::from(&note));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Open a stored link. Returns `false` and keeps the selection if it doesn't exist.
    pub async fn open_link(&mut self, id: &LinkID) -> Result<bool, StoreError> {
        match self.storage.get_link(id).await? {
            Some(link) => {
                self.selection = Selection::Link(LinkSelection::from(&link));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn close(&mut self) {
        self.selection = Selection::Nothing;
    }

    /// Save the open note with new fields, opening a blank one first if needed.
    ///
    /// The note stays open with the id it was saved under.
    pub async fn save_current_note(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        reminder: Option<NaiveDateTime>,
    ) -> Result<NoteID, StoreError> {
        let mut draft = match self.selection {
            Selection::Note(ref draft) => draft.clone(),
            _ => NoteDraft::new("", ""),
        };
        draft.title = title.into();
        draft.content = content.into();
        draft.reminder = reminder;
        let id = self.storage.save_note(draft.clone()).await?;
        debug!("Saved note `{}`", id);
        draft.id = Some(id.clone());
        self.selection = Selection::Note(draft);
        Ok(id)
    }

    /// Save the open link with new fields, opening a blank one first if needed.
    ///
    /// A link that was never saved goes through the upsert by url, a stored one is
    /// updated in place.
    pub async fn save_current_link(
        &mut self,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<LinkID, StoreError> {
        let title = title.into();
        let url = url.into();
        let id = match self.selection {
            Selection::Link(LinkSelection { id: Some(ref id), .. }) => {
                self.storage
                    .update_link(id, title.clone(), url.clone())
                    .await?;
                id.clone()
            }
            _ => {
                self.storage
                    .save_link(LinkDraft::new(title.clone(), url.clone()))
                    .await?
            }
        };
        debug!("Saved link `{}`", id);
        // Show the url as stored
        let url = match self.storage.get_link(&id).await? {
            Some(link) => link.url,
            None => url,
        };
        self.selection = Selection::Link(LinkSelection {
            id: Some(id.clone()),
            title,
            url,
        });
        Ok(id)
    }

    /// Delete whatever is open and close it. Unsaved selections are just closed.
    pub async fn delete_current(&mut self) -> Result<(), StoreError> {
        match self.selection {
            Selection::Note(NoteDraft { id: Some(ref id), .. }) => {
                self.storage.delete_note(id).await?
            }
            Selection::Link(LinkSelection { id: Some(ref id), .. }) => {
                self.storage.delete_link(id).await?
            }
            _ => {}
        }
        self.selection = Selection::Nothing;
        Ok(())
    }

    /// Remember `text` as the current search and list the matching notes.
    pub async fn search(&mut self, text: &str) -> Result<Vec<Note>, StoreError> {
        self.search = SearchRequest::from(text);
        self.refresh().await
    }

    /// The notes matching the current search, in display order.
    pub async fn refresh(&self) -> Result<Vec<Note>, StoreError> {
        self.storage.list_notes(self.search.clone()).await
    }

    pub async fn links(&self) -> Result<Vec<Link>, StoreError> {
        self.storage.list_links().await
    }
}
