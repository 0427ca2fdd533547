use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{Duration, Local, NaiveDateTime};
use linknote::errors::{CodecError, StoreError};
use linknote::record::reminder_format;
use linknote::reminder::{is_due, past_due};
use linknote::{LinkDraft, LinkID, Note, NoteDraft, NoteID, Storage};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn store_error_handler(e: &StoreError) -> HttpResponse {
    match e {
        StoreError::LinkNotExist(_) => HttpResponse::NotFound().body(e.to_string()),
        StoreError::UrlConflict(_) => HttpResponse::Conflict().body(e.to_string()),
        StoreError::EmptyNote | StoreError::EmptyUrl => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        StoreError::VersionChange { .. } | StoreError::Blocked(_) => {
            warn!("Storage requires a reload: {}", e);
            HttpResponse::ServiceUnavailable().body(e.to_string())
        }
        StoreError::Unavailable(_)
        | StoreError::Corrupted(_)
        | StoreError::IOError(_)
        | StoreError::SerdeError(_)
        | StoreError::SQLiteError(_) => {
            error!("Storage internal error {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn codec_error_handler(e: &CodecError) -> HttpResponse {
    match e {
        CodecError::Decryption => HttpResponse::Forbidden().body(e.to_string()),
        CodecError::PasswordRequired | CodecError::Malformed(_) => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        CodecError::Store(e) => store_error_handler(e),
        CodecError::Encryption | CodecError::SerdeError(_) => {
            error!("Export internal error {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/backend")]
#[instrument(skip(storage))]
async fn get_backend(storage: web::Data<Storage>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "backend": storage.kind() }))
}

#[derive(Deserialize, Debug)]
struct SearchQuery {
    q: Option<String>,
}

#[get("/notes")]
#[instrument(skip(storage, search))]
async fn list_notes(
    storage: web::Data<Storage>,
    search: web::Query<SearchQuery>,
) -> impl Responder {
    let search = search.into_inner();
    match storage.list_notes(search.q.as_deref()).await {
        Ok(notes) => HttpResponse::Ok().json(notes),
        Err(e) => store_error_handler(&e),
    }
}

#[get("/note/{note_id}")]
#[instrument(
    skip(storage, params),
    fields(
        note_id = %params.0
    )
)]
async fn get_note(storage: web::Data<Storage>, params: web::Path<(String,)>) -> impl Responder {
    let (note_id,) = params.into_inner();
    let id = NoteID::from(note_id);
    match storage.get_note(&id).await {
        Ok(Some(note)) => HttpResponse::Ok().json(note),
        Ok(None) => HttpResponse::NotFound().body(format!("note `{}` doesn't exist", id)),
        Err(e) => store_error_handler(&e),
    }
}

#[derive(Deserialize)]
struct NotePostData {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default, with = "reminder_format")]
    reminder: Option<NaiveDateTime>,
}

impl From<NotePostData> for NoteDraft {
    fn from(note: NotePostData) -> Self {
        NoteDraft {
            id: note.id.filter(|id| !id.is_empty()).map(NoteID::from),
            title: note.title,
            content: note.content,
            reminder: note.reminder,
            created_at: None,
        }
    }
}

#[post("/note")]
#[instrument(skip(storage, note))]
async fn save_note(storage: web::Data<Storage>, note: web::Json<NotePostData>) -> impl Responder {
    match storage.save_note(note.into_inner().into()).await {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => store_error_handler(&e),
    }
}

#[delete("/note/{note_id}")]
#[instrument(
    skip(storage, params),
    fields(
        note_id = %params.0
    )
)]
async fn delete_note(storage: web::Data<Storage>, params: web::Path<(String,)>) -> impl Responder {
    let (note_id,) = params.into_inner();
    match storage.delete_note(&note_id.into()).await {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => store_error_handler(&e),
    }
}

#[get("/links")]
#[instrument(skip(storage))]
async fn list_links(storage: web::Data<Storage>) -> impl Responder {
    match storage.list_links().await {
        Ok(links) => HttpResponse::Ok().json(links),
        Err(e) => store_error_handler(&e),
    }
}

#[get("/link/{link_id}")]
#[instrument(
    skip(storage, params),
    fields(
        link_id = %params.0
    )
)]
async fn get_link(storage: web::Data<Storage>, params: web::Path<(String,)>) -> impl Responder {
    let (link_id,) = params.into_inner();
    let id = LinkID::from(link_id);
    match storage.get_link(&id).await {
        Ok(Some(link)) => HttpResponse::Ok().json(link),
        Ok(None) => store_error_handler(&StoreError::LinkNotExist(id)),
        Err(e) => store_error_handler(&e),
    }
}

#[derive(Deserialize)]
struct LinkPostData {
    #[serde(default)]
    title: String,
    url: String,
}

#[post("/link")]
#[instrument(skip(storage, link))]
async fn save_link(storage: web::Data<Storage>, link: web::Json<LinkPostData>) -> impl Responder {
    let link = link.into_inner();
    match storage.save_link(LinkDraft::new(link.title, link.url)).await {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => store_error_handler(&e),
    }
}

#[put("/link/{link_id}")]
#[instrument(
    skip(storage, params, link),
    fields(
        link_id = %params.0
    )
)]
async fn update_link(
    storage: web::Data<Storage>,
    params: web::Path<(String,)>,
    link: web::Json<LinkPostData>,
) -> impl Responder {
    let (link_id,) = params.into_inner();
    let link = link.into_inner();
    match storage
        .update_link(&link_id.into(), link.title, link.url)
        .await
    {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => store_error_handler(&e),
    }
}

#[delete("/link/{link_id}")]
#[instrument(
    skip(storage, params),
    fields(
        link_id = %params.0
    )
)]
async fn delete_link(storage: web::Data<Storage>, params: web::Path<(String,)>) -> impl Responder {
    let (link_id,) = params.into_inner();
    match storage.delete_link(&link_id.into()).await {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => store_error_handler(&e),
    }
}

#[derive(Deserialize, Default)]
struct ExportPostData {
    password: Option<String>,
}

#[post("/export")]
#[instrument(skip(storage, body))]
async fn export_notes(
    storage: web::Data<Storage>,
    body: Option<web::Json<ExportPostData>>,
) -> impl Responder {
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    match storage.export_notes(body.password.as_deref()).await {
        Ok(text) => HttpResponse::Ok()
            .content_type("application/json")
            .body(text),
        Err(e) => codec_error_handler(&e),
    }
}

#[derive(Deserialize)]
struct ImportPostData {
    file: String,
    password: Option<String>,
}

#[post("/import")]
#[instrument(skip(storage, body))]
async fn import_notes(
    storage: web::Data<Storage>,
    body: web::Json<ImportPostData>,
) -> impl Responder {
    let body = body.into_inner();
    match storage
        .import_notes(&body.file, body.password.as_deref())
        .await
    {
        Ok(imported) => HttpResponse::Ok().json(json!({ "imported": imported })),
        Err(e) => codec_error_handler(&e),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemindersResponse {
    due: Vec<Note>,
    past_due: Vec<NoteID>,
}

/// Notes falling due within the next minute, and ids of the past-due ones.
#[get("/reminders")]
#[instrument(skip(storage))]
async fn get_reminders(storage: web::Data<Storage>) -> impl Responder {
    let notes = match storage.list_notes("").await {
        Ok(notes) => notes,
        Err(e) => return store_error_handler(&e),
    };
    let now = Local::now().naive_local();
    let past_due = past_due(&notes, now);
    let due = notes
        .into_iter()
        .filter(|n| is_due(n, now, Duration::seconds(60)))
        .collect();
    HttpResponse::Ok().json(RemindersResponse { due, past_due })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(get_backend)
        .service(list_notes)
        .service(get_note)
        .service(save_note)
        .service(delete_note)
        .service(list_links)
        .service(get_link)
        .service(save_link)
        .service(update_link)
        .service(delete_link)
        .service(export_notes)
        .service(import_notes)
        .service(get_reminders);
}
