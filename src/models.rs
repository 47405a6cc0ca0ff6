use chrono::{DateTime, TimeZone, Utc};
use sqlx::FromRow;

use crate::content::unescape;

/// Format used for human-readable expiry times.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row of the `paste` table. Title and body are in escaped storage form.
#[derive(Debug, Clone, FromRow)]
pub struct PasteRow {
    pub id: String,
    pub title: String,
    pub content_hash: String,
    pub body: String,
    pub delete_key: String,
    /// Unix seconds; `None` never expires.
    pub expires_at: Option<i64>,
}

impl PasteRow {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn is_expired(&self, now: &DateTime<Utc>) -> bool {
        self.expires_at
            .map_or(false, |expires_at| now.timestamp() >= expires_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    Created,
    Existing,
}

impl PutStatus {
    pub fn message(self) -> &'static str {
        match self {
            PutStatus::Created => "Successfully saved paste.",
            PutStatus::Existing => "Paste data already exists ...",
        }
    }
}

/// Result of a put, either a fresh row or the row already holding the content.
#[derive(Debug, Clone)]
pub struct StoredPaste {
    pub id: String,
    pub title: String,
    pub content_hash: String,
    pub size: usize,
    pub url: String,
    /// Only present when the row was just created.
    pub delete_key: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: PutStatus,
}

/// A live paste, unescaped for display.
#[derive(Debug, Clone)]
pub struct FetchedPaste {
    pub id: String,
    pub title: String,
    pub body: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FetchedPaste {
    pub fn from_row(row: PasteRow) -> Self {
        FetchedPaste {
            expires_at: row.expires_at(),
            title: unescape(&row.title).into_owned(),
            body: unescape(&row.body).into_owned(),
            id: row.id,
        }
    }

    pub fn expiry_label(&self) -> String {
        expiry_label(self.expires_at.as_ref())
    }
}

pub fn expiry_label(expires_at: Option<&DateTime<Utc>>) -> String {
    match expires_at {
        Some(expires_at) => expires_at.format(EXPIRY_FORMAT).to_string(),
        None => "Never".to_owned(),
    }
}

/// Outcome of a delete request.
///
/// `found` is for logging only; callers must not reveal it, since it would
/// tell a wrong key apart from a missing paste.
#[derive(Debug, Clone, Copy)]
pub struct Deleted {
    pub found: bool,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn row(expires_at: Option<i64>) -> PasteRow {
        PasteRow {
            id: "abc".into(),
            title: "a &amp; b".into(),
            content_hash: "hash".into(),
            body: "&lt;p&gt;".into(),
            delete_key: "key".into(),
            expires_at,
        }
    }

    #[test]
    fn never_expires_without_timestamp() {
        let now = Utc::now();
        assert!(!row(None).is_expired(&now));
        assert_eq!(FetchedPaste::from_row(row(None)).expiry_label(), "Never");
    }

    #[test]
    fn expired_at_the_boundary() {
        let now = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        let expires = now.timestamp();

        assert!(!row(Some(expires)).is_expired(&(now - Duration::seconds(1))));
        assert!(row(Some(expires)).is_expired(&now));
        assert!(row(Some(expires)).is_expired(&(now + Duration::seconds(1))));
    }

    #[test]
    fn fetched_paste_is_unescaped() {
        let now = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        let paste = FetchedPaste::from_row(row(Some(now.timestamp())));

        assert_eq!(paste.title, "a & b");
        assert_eq!(paste.body, "<p>");
        assert_eq!(paste.expiry_label(), "2023-05-01 12:00:00");
    }
}
