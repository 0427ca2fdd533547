use crate::errors::StoreError;
use crate::store::Backend;
use crate::{LinkDraft, LinkID, NoteDraft, NoteID};

pub(crate) async fn unique_id(store: impl Backend) {
    let id1 = store.save_note(NoteDraft::new("", "Foo")).await.unwrap();
    let id2 = store.save_note(NoteDraft::new("", "Bar")).await.unwrap();
    assert_ne!(id1, id2);
    store.delete_note(&id2).await.unwrap();
    let id3 = store.save_note(NoteDraft::new("", "Baz")).await.unwrap();
    assert_ne!(id3, id1);
    assert_ne!(id3, id2);
}

pub(crate) async fn new_note_retrieve(store: impl Backend) {
    let reminder = chrono::NaiveDate::from_ymd_opt(2030, 1, 2)
        .unwrap()
        .and_hms_opt(8, 15, 0)
        .unwrap();
    let id = store
        .save_note(NoteDraft::new("Title", "Content").with_reminder(reminder))
        .await
        .unwrap();
    let note = store.get_note(&id).await.unwrap().unwrap();
    assert_eq!(note.id, id);
    assert_eq!(note.title, "Title");
    assert_eq!(note.content, "Content");
    assert_eq!(note.reminder, Some(reminder));
    assert_eq!(note.created_at, note.updated_at);
    assert_eq!(store.list_notes().await.unwrap(), vec![note]);
    assert!(store
        .get_note(&NoteID::from("does-not-exist"))
        .await
        .unwrap()
        .is_none());
}

pub(crate) async fn update_note(store: impl Backend) {
    let id = store.save_note(NoteDraft::new("Foo", "")).await.unwrap();
    let before = store.get_note(&id).await.unwrap().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let updated_id = store
        .save_note(NoteDraft::new("Foo1", "body").with_id(id.clone()))
        .await
        .unwrap();
    assert_eq!(updated_id, id);
    let after = store.get_note(&id).await.unwrap().unwrap();
    assert_eq!(after.title, "Foo1");
    assert_eq!(after.content, "body");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
    assert_eq!(store.list_notes().await.unwrap().len(), 1);
    // A created_at on an update draft is ignored
    let mut draft = NoteDraft::from(&after);
    draft.created_at = Some(chrono::Utc::now());
    store.save_note(draft).await.unwrap();
    let again = store.get_note(&id).await.unwrap().unwrap();
    assert_eq!(again.created_at, before.created_at);
    assert!(again.updated_at >= after.updated_at);
}

pub(crate) async fn save_unknown_id(store: impl Backend) {
    let unknown = NoteID::from("12345678");
    let id = store
        .save_note(NoteDraft::new("Foo", "").with_id(unknown.clone()))
        .await
        .unwrap();
    assert_ne!(id, unknown);
    assert!(store.get_note(&unknown).await.unwrap().is_none());
    assert_eq!(store.get_note(&id).await.unwrap().unwrap().title, "Foo");
}

pub(crate) async fn delete_note(store: impl Backend) {
    let id1 = store.save_note(NoteDraft::new("A", "")).await.unwrap();
    let id2 = store.save_note(NoteDraft::new("B", "")).await.unwrap();
    store.delete_note(&id1).await.unwrap();
    assert!(store.get_note(&id1).await.unwrap().is_none());
    assert!(store.get_note(&id2).await.unwrap().is_some());
    // Deleting twice, or deleting something that never existed, is a no-op
    store.delete_note(&id1).await.unwrap();
    store.delete_note(&NoteID::from("nope")).await.unwrap();
    assert_eq!(store.list_notes().await.unwrap().len(), 1);
}

pub(crate) async fn link_upsert_by_url(store: impl Backend) {
    let id1 = store
        .save_link(LinkDraft::new("Example", "example.com"))
        .await
        .unwrap();
    let first = store.get_link(&id1).await.unwrap().unwrap();
    assert_eq!(first.url, "http://example.com");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let id2 = store
        .save_link(LinkDraft::new("Example again", "http://example.com"))
        .await
        .unwrap();
    assert_eq!(id1, id2);
    let links = store.list_links().await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].title, "Example again");
    assert_eq!(links[0].created_at, first.created_at);
    assert!(links[0].updated_at > first.updated_at);
    let id3 = store
        .save_link(LinkDraft::new("Other", "https://example.com"))
        .await
        .unwrap();
    assert_ne!(id3, id1);
    assert_eq!(store.list_links().await.unwrap().len(), 2);
}

pub(crate) async fn update_link(store: impl Backend) {
    let id1 = store.save_link(LinkDraft::new("A", "a.com")).await.unwrap();
    let id2 = store.save_link(LinkDraft::new("B", "b.com")).await.unwrap();
    let created = store.get_link(&id1).await.unwrap().unwrap().created_at;
    store
        .update_link(&id1, "A2".to_owned(), "a2.com".to_owned())
        .await
        .unwrap();
    let link = store.get_link(&id1).await.unwrap().unwrap();
    assert_eq!(link.title, "A2");
    assert_eq!(link.url, "http://a2.com");
    assert_eq!(link.created_at, created);
    // Keeping its own url is fine
    store
        .update_link(&id1, "A3".to_owned(), "http://a2.com".to_owned())
        .await
        .unwrap();
    assert!(matches!(
        store
            .update_link(&id1, "A".to_owned(), "b.com".to_owned())
            .await
            .err()
            .unwrap(),
        StoreError::UrlConflict(_)
    ));
    assert_eq!(store.get_link(&id2).await.unwrap().unwrap().title, "B");
    assert!(matches!(
        store
            .update_link(&LinkID::from("999"), "X".to_owned(), "x.com".to_owned())
            .await
            .err()
            .unwrap(),
        StoreError::LinkNotExist(_)
    ));
    // A missing link is reported before a url clash
    assert!(matches!(
        store
            .update_link(&LinkID::from("999"), "X".to_owned(), "b.com".to_owned())
            .await
            .err()
            .unwrap(),
        StoreError::LinkNotExist(_)
    ));
}

pub(crate) async fn delete_link(store: impl Backend) {
    let id = store.save_link(LinkDraft::new("A", "a.com")).await.unwrap();
    store.delete_link(&id).await.unwrap();
    assert!(store.get_link(&id).await.unwrap().is_none());
    store.delete_link(&id).await.unwrap();
    // The url is free again
    let id2 = store.save_link(LinkDraft::new("A", "a.com")).await.unwrap();
    assert_ne!(id, id2);
}
