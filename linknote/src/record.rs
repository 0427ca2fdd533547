//! Core types of Linknote.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Hash, PartialOrd, Ord)]
        #[serde(into = "String", from = "String")]
        pub struct $name {
            id: String,
        }

        impl $name {
            pub fn new(id: String) -> Self {
                $name { id }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.id
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> $name {
                $name::new(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> $name {
                $name::new(id.to_owned())
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> $name {
                $name::new(id.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.id
            }
        }
    };
}

record_id!(
    /// ID of notes.
    ///
    /// Assigned by the backend when a note is first saved and never reused.
    /// The format is opaque: the indexed backend uses integers, the flat backend
    /// uses time-based strings.
    NoteID
);

record_id!(
    /// ID of links.
    LinkID
);

/// A note as persisted by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteID,
    pub title: String,
    pub content: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "reminder_format"
    )]
    pub reminder: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Whether the reminder is set and not later than `now`.
    pub fn is_past_due(&self, now: NaiveDateTime) -> bool {
        matches!(self.reminder, Some(r) if r <= now)
    }

    /// Case-insensitive substring match on title or content.
    ///
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }
}

/// Input of a note save.
///
/// Without an id, the save creates a note.
/// `created_at` is only honored on creation, and defaults to the time of the save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub id: Option<NoteID>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, with = "reminder_format")]
    pub reminder: Option<NaiveDateTime>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        NoteDraft {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: NoteID) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_reminder(mut self, reminder: NaiveDateTime) -> Self {
        self.reminder = Some(reminder);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        NoteDraft {
            id: Some(note.id.clone()),
            title: note.title.clone(),
            content: note.content.clone(),
            reminder: note.reminder,
            created_at: Some(note.created_at),
        }
    }
}

/// A link as persisted by a backend.
///
/// `url` is always normalized, see [`crate::url::format_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkID,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input of a link save, which inserts or updates by url.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDraft {
    pub title: String,
    pub url: String,
}

impl LinkDraft {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        LinkDraft {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// `updatedAt` of a record saved at `now` that was last updated at `previous`.
///
/// Never moves backwards, even if the wall clock does.
pub(crate) fn next_updated_at(now: DateTime<Utc>, previous: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous)
}

/// Reminders are local date-times as produced by a `datetime-local` input,
/// e.g. `2024-05-01T09:30`.
pub mod reminder_format {
    use chrono::{NaiveDateTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    const MINUTES: &str = "%Y-%m-%dT%H:%M";
    const SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn format(reminder: &NaiveDateTime) -> String {
        if reminder.second() == 0 && reminder.nanosecond() == 0 {
            reminder.format(MINUTES).to_string()
        } else {
            reminder.format(SECONDS).to_string()
        }
    }

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, MINUTES)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    pub fn serialize<S: Serializer>(
        reminder: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match reminder {
            Some(r) => serializer.serialize_str(&format(r)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid reminder `{s}`"))),
        }
    }
}
