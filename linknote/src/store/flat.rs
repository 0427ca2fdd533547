//! Flat storage of notes and links.
//!
//! Each collection is one JSON array stored under a fixed key of a string key-value
//! medium. Every operation reads the whole array, changes it in memory, and writes the whole
//! array back. This is O(n) per operation and needs neither transactions nor indexes.
use super::{Backend, BackendKind};
use crate::errors::StoreError;
use crate::record::*;
use crate::url::format_url;
use chrono::Utc;
use futures::future::BoxFuture;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::warn;

const NOTES_KEY: &str = "notes";
const LINKS_KEY: &str = "links";

/// A synchronous store of string values under string keys.
pub trait FlatMedium: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Values kept in process memory, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Default::default()
    }
}

impl FlatMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_owned(), value);
        Ok(())
    }
}

/// One file per key, `<dir>/<key>.json`.
///
/// `dir` is created by the first write, a missing directory reads as empty.
#[derive(Debug)]
pub struct DirectoryMedium {
    dir: PathBuf,
}

impl DirectoryMedium {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        DirectoryMedium {
            dir: dir.as_ref().to_owned(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl FlatMedium for DirectoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::IOError(e)),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        // Write aside and rename
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        let mut f = fs::File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.sync_all()?;
        fs::rename(tmp, self.path(key))?;
        Ok(())
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Generate a new id from the current time and a random component.
///
/// There is no central sequence in a flat store, so the id is unique with overwhelming
/// probability rather than by construction.
fn get_new_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random: u64 = rand::thread_rng().gen();
    format!("{}-{}", to_base36(millis), to_base36(random))
}

struct FlatStoreInner {
    medium: Box<dyn FlatMedium>,
}

impl FlatStoreInner {
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.medium.get(key)? {
            None => Ok(Vec::new()),
            Some(s) if s.trim().is_empty() => Ok(Vec::new()),
            Some(s) => serde_json::from_str(&s)
                .map_err(|e| StoreError::Corrupted(format!("key `{}`: {}", key, e))),
        }
    }

    fn write<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), StoreError> {
        self.medium.set(key, serde_json::to_string(records)?)
    }

    // The methods above are helper methods
    // The methods below are to implement the Backend interface
    fn save_note(&self, draft: NoteDraft) -> Result<NoteID, StoreError> {
        let mut notes: Vec<Note> = self.read(NOTES_KEY)?;
        let now = Utc::now();
        let position = draft
            .id
            .as_ref()
            .and_then(|id| notes.iter().position(|n| &n.id == id));
        let id = match position {
            Some(i) => {
                let note = &mut notes[i];
                note.title = draft.title;
                note.content = draft.content;
                note.reminder = draft.reminder;
                note.updated_at = next_updated_at(now, note.updated_at);
                note.id.clone()
            }
            None => {
                if let Some(ref unknown) = draft.id {
                    warn!("note `{}` doesn't exist, saving as a new note", unknown);
                }
                let id = loop {
                    let id = NoteID::new(get_new_id());
                    if !notes.iter().any(|n| n.id == id) {
                        break id;
                    }
                };
                let created_at = draft.created_at.unwrap_or(now);
                notes.push(Note {
                    id: id.clone(),
                    title: draft.title,
                    content: draft.content,
                    reminder: draft.reminder,
                    created_at,
                    updated_at: next_updated_at(now, created_at),
                });
                id
            }
        };
        self.write(NOTES_KEY, &notes)?;
        Ok(id)
    }

    fn delete_note(&self, id: &NoteID) -> Result<(), StoreError> {
        let mut notes: Vec<Note> = self.read(NOTES_KEY)?;
        let before = notes.len();
        notes.retain(|n| &n.id != id);
        if notes.len() != before {
            self.write(NOTES_KEY, &notes)?;
        }
        Ok(())
    }

    fn save_link(&self, draft: LinkDraft) -> Result<LinkID, StoreError> {
        let mut links: Vec<Link> = self.read(LINKS_KEY)?;
        let url = format_url(&draft.url);
        let now = Utc::now();
        let id = match links.iter().position(|l| l.url == url) {
            Some(i) => {
                let link = &mut links[i];
                link.title = draft.title;
                link.url = url;
                link.updated_at = next_updated_at(now, link.updated_at);
                link.id.clone()
            }
            None => {
                let id = loop {
                    let id = LinkID::new(get_new_id());
                    if !links.iter().any(|l| l.id == id) {
                        break id;
                    }
                };
                links.push(Link {
                    id: id.clone(),
                    title: draft.title,
                    url,
                    created_at: now,
                    updated_at: now,
                });
                id
            }
        };
        self.write(LINKS_KEY, &links)?;
        Ok(id)
    }

    fn update_link(&self, id: &LinkID, title: String, url: String) -> Result<(), StoreError> {
        let mut links: Vec<Link> = self.read(LINKS_KEY)?;
        let url = format_url(&url);
        let position = links
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| StoreError::LinkNotExist(id.clone()))?;
        if links.iter().any(|l| l.url == url && &l.id != id) {
            return Err(StoreError::UrlConflict(url));
        }
        let link = &mut links[position];
        link.title = title;
        link.url = url;
        link.updated_at = next_updated_at(Utc::now(), link.updated_at);
        self.write(LINKS_KEY, &links)
    }

    fn delete_link(&self, id: &LinkID) -> Result<(), StoreError> {
        let mut links: Vec<Link> = self.read(LINKS_KEY)?;
        let before = links.len();
        links.retain(|l| &l.id != id);
        if links.len() != before {
            self.write(LINKS_KEY, &links)?;
        }
        Ok(())
    }
}

/// Flat storage.
///
/// Completes every operation synchronously; the futures it returns are ready on first poll
/// unless another operation holds the lock.
pub struct FlatStore {
    fs: RwLock<FlatStoreInner>,
}

impl FlatStore {
    pub fn new(medium: Box<dyn FlatMedium>) -> Self {
        FlatStore {
            fs: RwLock::new(FlatStoreInner { medium }),
        }
    }

    /// A flat store in process memory.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryMedium::new()))
    }

    /// A flat store with one file per collection in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(Box::new(DirectoryMedium::new(dir)))
    }
}

impl Backend for FlatStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, StoreError>> {
        Box::pin(async move {
            let fs = self.fs.read().await;
            fs.read(NOTES_KEY)
        })
    }

    fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Option<Note>, StoreError>> {
        Box::pin(async move {
            let fs = self.fs.read().await;
            let notes: Vec<Note> = fs.read(NOTES_KEY)?;
            Ok(notes.into_iter().find(|n| &n.id == id))
        })
    }

    fn save_note(&self, draft: NoteDraft) -> BoxFuture<Result<NoteID, StoreError>> {
        Box::pin(async move {
            let fs = self.fs.write().await;
            fs.save_note(draft)
        })
    }

    fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let fs = self.fs.write().await;
            fs.delete_note(id)
        })
    }

    fn list_links(&self) -> BoxFuture<Result<Vec<Link>, StoreError>> {
        Box::pin(async move {
            let fs = self.fs.read().await;
            fs.read(LINKS_KEY)
        })
    }

    fn get_link<'a>(&'a self, id: &'a LinkID) -> BoxFuture<'a, Result<Option<Link>, StoreError>> {
        Box::pin(async move {
            let fs = self.fs.read().await;
            let links: Vec<Link> = fs.read(LINKS_KEY)?;
            Ok(links.into_iter().find(|l| &l.id == id))
        })
    }

    fn save_link(&self, draft: LinkDraft) -> BoxFuture<Result<LinkID, StoreError>> {
        Box::pin(async move {
            let fs = self.fs.write().await;
            fs.save_link(draft)
        })
    }

    fn update_link<'a>(
        &'a self,
        id: &'a LinkID,
        title: String,
        url: String,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let fs = self.fs.write().await;
            fs.update_link(id, title, url)
        })
    }

    fn delete_link<'a>(&'a self, id: &'a LinkID) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let fs = self.fs.write().await;
            fs.delete_link(id)
        })
    }
}
