use lazy_static::lazy_static;
use linknote::{BackendPreference, Storage, StorageSettings};
use linknote_web::configuration::CONFIGURATION;
use linknote_web::startup::run;
use linknote_web::telemetry::{get_subscriber, init_tracing};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_subscriber::fmt::TestWriter;

lazy_static! {
    static ref TRACING: () = {
        init_tracing(get_subscriber(&CONFIGURATION, TestWriter::default()));
    };
}

pub struct TestApp {
    pub address: String,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(BackendPreference::Flat).await
}

pub async fn spawn_app_with(backend: BackendPreference) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    // We retrieve the port assigned to us by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);
    lazy_static::initialize(&TRACING);

    let storage = Storage::initialize(&StorageSettings::in_memory(backend))
        .await
        .expect("Failed to initialize storage");
    // No static assets in tests
    let server = run(listener, Arc::new(storage), true).expect("Failed to bind address");
    let _ = tokio::spawn(server);
    TestApp { address }
}
