//! Periodic sweep over the notes for reminders that are about to fall due.
use crate::query::SearchRequest;
use crate::record::{Note, NoteID};
use crate::storage::Storage;
use chrono::{Duration, Local, NaiveDateTime};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default time between two sweeps, and how far ahead a sweep looks.
pub const SCAN_PERIOD: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Clone)]
pub enum ReminderEvent {
    /// The reminder of this note falls due within the next window.
    Due(Note),
    /// Sent after every sweep, with every note in display order.
    Refresh {
        notes: Vec<Note>,
        past_due: Vec<NoteID>,
    },
}

/// Ids of the notes whose reminder is at or before `now`.
pub fn past_due(notes: &[Note], now: NaiveDateTime) -> Vec<NoteID> {
    notes
        .iter()
        .filter(|n| n.is_past_due(now))
        .map(|n| n.id.clone())
        .collect()
}

/// Whether the reminder of `note` is strictly after `now` and at most `window` after it.
pub fn is_due(note: &Note, now: NaiveDateTime, window: Duration) -> bool {
    match note.reminder {
        Some(reminder) => reminder > now && reminder <= now + window,
        None => false,
    }
}

/// Decides what each sweep reports.
///
/// A reminder fires at most once per scanner, even when two sweeps overlap its window.
/// A sweep that runs late can still miss one.
#[derive(Debug)]
pub struct ReminderScanner {
    window: Duration,
    fired: HashSet<(NoteID, NaiveDateTime)>,
}

impl ReminderScanner {
    pub fn new(window: Duration) -> Self {
        ReminderScanner {
            window,
            fired: HashSet::new(),
        }
    }

    /// Events for one sweep over `notes`, which are expected in display order.
    pub fn scan(&mut self, notes: Vec<Note>, now: NaiveDateTime) -> Vec<ReminderEvent> {
        // Reminders in the past can't fire again
        self.fired.retain(|(_, reminder)| *reminder > now);
        let mut events = vec![];
        for note in notes.iter().filter(|n| is_due(n, now, self.window)) {
            if let Some(reminder) = note.reminder {
                if self.fired.insert((note.id.clone(), reminder)) {
                    events.push(ReminderEvent::Due(note.clone()));
                }
            }
        }
        let past_due = past_due(&notes, now);
        events.push(ReminderEvent::Refresh { notes, past_due });
        events
    }
}

impl Default for ReminderScanner {
    fn default() -> Self {
        ReminderScanner::new(Duration::seconds(60))
    }
}

/// Sweep right away and then every `period`, until `events` is closed.
pub fn spawn(
    storage: Arc<Storage>,
    period: std::time::Duration,
    events: mpsc::Sender<ReminderEvent>,
) -> JoinHandle<()> {
    let period = if period.is_zero() { SCAN_PERIOD } else { period };
    let window = Duration::from_std(period).unwrap_or_else(|_| Duration::seconds(60));
    tokio::spawn(async move {
        let mut scanner = ReminderScanner::new(window);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Reminder scanner started, every {:?}", period);
        loop {
            interval.tick().await;
            let notes = match storage.list_notes(SearchRequest::all()).await {
                Ok(notes) => notes,
                Err(e) => {
                    warn!("Reminder sweep failed: {}", e);
                    continue;
                }
            };
            let now = Local::now().naive_local();
            for event in scanner.scan(notes, now) {
                if let ReminderEvent::Due(ref note) = event {
                    debug!("Reminder due for note `{}`", note.id);
                }
                if events.send(event).await.is_err() {
                    info!("Reminder scanner stopped");
                    return;
                }
            }
        }
    })
}
