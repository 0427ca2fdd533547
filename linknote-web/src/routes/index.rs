use actix_web::{get, web, HttpResponse};
use linknote::Storage;
use serde_json::json;

#[get("/health_check")]
#[instrument(skip(storage))]
async fn health_check(storage: web::Data<Storage>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "backend": storage.kind() }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check);
}
