//! Linknote: notes and links kept in a local store.
pub mod codec;
pub mod errors;
pub mod query;
pub mod record;
pub mod reminder;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
pub mod url;

pub use record::{Link, LinkDraft, LinkID, Note, NoteDraft, NoteID};
pub use session::{Selection, Session};
pub use settings::{BackendPreference, StorageSettings};
pub use storage::Storage;
pub use store::{Backend, BackendKind, FlatStore, IndexedStore};
