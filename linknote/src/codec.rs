//! Export and import of notes.
//!
//! An export is a JSON document `{"exportDate": ..., "notes": [...]}`.
//! With a password, the document is encrypted and wrapped in an envelope
//! `{"encrypted": true, "data": "<base64 of salt ‖ nonce ‖ ciphertext>"}`:
//! the key is derived with PBKDF2-HMAC-SHA256 from the password and a random salt,
//! and the document is sealed with AES-256-GCM under a random nonce.
use crate::errors::CodecError;
use crate::record::{reminder_format, Note, NoteDraft};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::Sha256;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
/// Length of the AES-GCM authentication tag appended to the ciphertext.
const TAG_LEN: usize = 16;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    export_date: DateTime<Utc>,
    notes: &'a [Note],
}

#[derive(Serialize)]
struct Envelope {
    encrypted: bool,
    data: String,
}

/// A parsed export, ready to be imported.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub export_date: Option<DateTime<Utc>>,
    pub notes: Vec<ImportedNote>,
}

/// A note as found in an export file.
///
/// Every field is optional, ids are ignored: imported notes are always created anew.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedNote {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_reminder")]
    pub reminder: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ImportedNote {
    /// A draft for the normal save path, with `created_at` defaulting to `now`.
    pub fn into_draft(self, now: DateTime<Utc>) -> NoteDraft {
        NoteDraft {
            id: None,
            title: self.title,
            content: self.content,
            reminder: self.reminder,
            created_at: Some(self.created_at.unwrap_or(now)),
        }
    }
}

/// Strings as they are, `null` as empty, other scalars in their JSON form.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        other => other.to_string(),
    })
}

/// A reminder that doesn't parse reads as absent.
fn lenient_reminder<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => reminder_format::parse(&s),
        _ => None,
    })
}

/// Accept RFC 3339 strings and millisecond epochs; anything else reads as absent.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}

/// The content of an import file, before any password is involved.
#[derive(Debug)]
pub enum ImportPayload {
    Plain(ImportDocument),
    /// Base64 of salt ‖ nonce ‖ ciphertext.
    Encrypted(String),
}

impl ImportPayload {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ImportPayload::Encrypted(_))
    }

    /// Decrypt if needed and return the document.
    pub fn open(self, password: Option<&str>) -> Result<ImportDocument, CodecError> {
        match self {
            ImportPayload::Plain(doc) => Ok(doc),
            ImportPayload::Encrypted(data) => {
                let password = password
                    .filter(|p| !p.is_empty())
                    .ok_or(CodecError::PasswordRequired)?;
                let plaintext = decrypt(&data, password)?;
                // Authenticated, so garbage here means a wrong key rather than a bad file
                let value: Value =
                    serde_json::from_slice(&plaintext).map_err(|_| CodecError::Decryption)?;
                parse_document(value)
            }
        }
    }
}

fn parse_document(value: Value) -> Result<ImportDocument, CodecError> {
    serde_json::from_value(value).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Sniff the format of an import file.
///
/// A JSON object with `"encrypted": true` is an envelope, other JSON is a plaintext export.
/// Text that isn't JSON at all is taken to be a bare encrypted payload.
pub fn read_export(text: &str) -> Result<ImportPayload, CodecError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            if value.get("encrypted").and_then(Value::as_bool) == Some(true) {
                let data = value
                    .get("data")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CodecError::Malformed("encrypted file without data".into()))?;
                Ok(ImportPayload::Encrypted(data.to_owned()))
            } else {
                Ok(ImportPayload::Plain(parse_document(value)?))
            }
        }
        Err(_) => {
            let raw = text.trim();
            if raw.is_empty() {
                return Err(CodecError::Malformed("empty file".into()));
            }
            Ok(ImportPayload::Encrypted(raw.to_owned()))
        }
    }
}

/// Serialize notes for export, encrypted when a password is given.
pub fn write_export(
    notes: &[Note],
    password: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, CodecError> {
    let doc = serde_json::to_string_pretty(&ExportDocument {
        export_date: now,
        notes,
    })?;
    match password {
        None => Ok(doc),
        Some("") => Err(CodecError::PasswordRequired),
        Some(password) => {
            let data = encrypt(doc.as_bytes(), password)?;
            Ok(serde_json::to_string_pretty(&Envelope {
                encrypted: true,
                data,
            })?)
        }
    }
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt with a fresh salt and nonce, returns base64 of salt ‖ nonce ‖ ciphertext.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<String, CodecError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::Encryption)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CodecError::Encryption)?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Reverse [`encrypt`]. Any failure, including bad base64, is [`CodecError::Decryption`].
pub fn decrypt(data: &str, password: &str) -> Result<Vec<u8>, CodecError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| CodecError::Decryption)?;
    if bytes.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(CodecError::Decryption);
    }
    let (salt, rest) = bytes.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(password, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CodecError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_notes() -> Vec<Note> {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        vec![
            Note {
                id: "1".into(),
                title: "Groceries".to_owned(),
                content: "milk\neggs".to_owned(),
                reminder: reminder_format::parse("2024-05-02T09:00"),
                created_at: t,
                updated_at: t,
            },
            Note {
                id: "2".into(),
                title: String::new(),
                content: "ünïcödé ✓".to_owned(),
                reminder: None,
                created_at: t,
                updated_at: t,
            },
        ]
    }

    fn assert_same_notes(doc: &ImportDocument, notes: &[Note]) {
        assert_eq!(doc.notes.len(), notes.len());
        for (imported, note) in doc.notes.iter().zip(notes) {
            assert_eq!(imported.title, note.title);
            assert_eq!(imported.content, note.content);
            assert_eq!(imported.reminder, note.reminder);
            assert_eq!(imported.created_at, Some(note.created_at));
        }
    }

    #[test]
    fn plaintext_round_trip() {
        let notes = sample_notes();
        let text = write_export(&notes, None, Utc::now()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["exportDate"].is_string());
        assert_eq!(value["notes"][0]["createdAt"], "2024-05-01T12:00:00Z");
        let payload = read_export(&text).unwrap();
        assert!(!payload.is_encrypted());
        assert_same_notes(&payload.open(None).unwrap(), &notes);
    }

    #[test]
    fn encrypted_round_trip() {
        let notes = sample_notes();
        let text = write_export(&notes, Some("hunter2"), Utc::now()).unwrap();
        assert!(!text.contains("Groceries"));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["encrypted"], true);
        let payload = read_export(&text).unwrap();
        assert!(payload.is_encrypted());
        assert_same_notes(&payload.open(Some("hunter2")).unwrap(), &notes);
    }

    #[test]
    fn wrong_password() {
        let text = write_export(&sample_notes(), Some("right"), Utc::now()).unwrap();
        let payload = read_export(&text).unwrap();
        assert!(matches!(
            payload.open(Some("wrong")).err().unwrap(),
            CodecError::Decryption
        ));
    }

    #[test]
    fn password_required() {
        let text = write_export(&sample_notes(), Some("pw"), Utc::now()).unwrap();
        assert!(matches!(
            read_export(&text).unwrap().open(None).err().unwrap(),
            CodecError::PasswordRequired
        ));
        assert!(matches!(
            write_export(&sample_notes(), Some(""), Utc::now())
                .err()
                .unwrap(),
            CodecError::PasswordRequired
        ));
    }

    #[test]
    fn raw_payload_fallback() {
        let data = encrypt(br#"{"notes":[{"title":"raw"}]}"#, "pw").unwrap();
        let payload = read_export(&format!("{}\n", data)).unwrap();
        assert!(payload.is_encrypted());
        let doc = payload.open(Some("pw")).unwrap();
        assert_eq!(doc.notes[0].title, "raw");
        assert_eq!(doc.notes[0].created_at, None);
    }

    #[test]
    fn tampered_payload() {
        let data = encrypt(b"secret", "pw").unwrap();
        let mut bytes = STANDARD.decode(&data).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        assert!(matches!(
            decrypt(&STANDARD.encode(bytes), "pw").err().unwrap(),
            CodecError::Decryption
        ));
        assert!(matches!(
            decrypt("not base64!", "pw").err().unwrap(),
            CodecError::Decryption
        ));
        assert!(matches!(
            decrypt(&STANDARD.encode(b"short"), "pw").err().unwrap(),
            CodecError::Decryption
        ));
    }

    #[test]
    fn malformed_files() {
        assert!(matches!(
            read_export(r#"{"foo": 1}"#).err().unwrap(),
            CodecError::Malformed(_)
        ));
        assert!(matches!(
            read_export(r#"{"encrypted": true}"#).err().unwrap(),
            CodecError::Malformed(_)
        ));
        assert!(matches!(
            read_export("  ").err().unwrap(),
            CodecError::Malformed(_)
        ));
    }

    #[test]
    fn lenient_notes() {
        let doc = read_export(
            r#"{"exportDate": "2024-05-01T12:00:00.000Z", "notes": [
                {"id": 7, "title": "a", "createdAt": 1714564800000},
                {"content": "b", "createdAt": "yesterday", "reminder": ""}
            ]}"#,
        )
        .unwrap()
        .open(None)
        .unwrap();
        assert_eq!(
            doc.export_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(
            doc.notes[0].created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        let now = Utc::now();
        let draft = doc.notes[1].clone().into_draft(now);
        assert_eq!(draft.id, None);
        assert_eq!(draft.content, "b");
        assert_eq!(draft.created_at, Some(now));
    }

    #[test]
    fn odd_fields_do_not_reject_the_file() {
        let doc = read_export(
            r#"{"notes": [
                {"title": null, "content": "kept", "reminder": "tomorrow"},
                {"title": 42, "content": ["x"], "reminder": 5},
                {"title": "r", "reminder": "2024-05-01T09:30"}
            ]}"#,
        )
        .unwrap()
        .open(None)
        .unwrap();
        assert_eq!(doc.notes.len(), 3);
        assert_eq!(doc.notes[0].title, "");
        assert_eq!(doc.notes[0].content, "kept");
        assert_eq!(doc.notes[0].reminder, None);
        assert_eq!(doc.notes[1].title, "42");
        assert_eq!(doc.notes[1].content, "");
        assert_eq!(doc.notes[1].reminder, None);
        assert_eq!(
            doc.notes[2].reminder,
            Some(
                chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap()
            )
        );
    }
}
