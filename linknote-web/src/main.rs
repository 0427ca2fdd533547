use linknote::reminder::{self, ReminderEvent};
use linknote_web::configuration::CONFIGURATION;
use linknote_web::startup::run;
use linknote_web::telemetry::{get_subscriber, init_tracing};
use std::net::TcpListener;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

async fn log_reminders(mut events: mpsc::Receiver<ReminderEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ReminderEvent::Due(note) => {
                info!(note_id = %note.id, title = %note.title, "Reminder due")
            }
            ReminderEvent::Refresh { notes, past_due } => {
                info!(notes = notes.len(), past_due = past_due.len(), "Notes refreshed")
            }
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing(get_subscriber(&CONFIGURATION, std::io::stdout));

    let storage = match CONFIGURATION.get_storage().await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
        }
    };

    let (tx, rx) = mpsc::channel(16);
    reminder::spawn(storage.clone(), CONFIGURATION.reminder_interval(), tx);
    tokio::spawn(log_reminders(rx));

    let address = format!("{}:{}", CONFIGURATION.host, CONFIGURATION.port);
    let listener = TcpListener::bind(&address)?;
    info!("Listening on {}", address);
    run(listener, storage, CONFIGURATION.debug)?.await
}
