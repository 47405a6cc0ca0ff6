use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{FetchedPaste, StoredPaste};

/// Body of `POST /api`.
#[derive(Debug, Deserialize)]
pub struct SavePaste {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub paste: String,
    /// Seconds until the paste expires, 0 for never.
    #[serde(default, deserialize_with = "deserialize_ttl")]
    pub expiry: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub delkey: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PasteResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paste: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    pub size: usize,
    pub expiry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delkey: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<StoredPaste> for PasteResponse {
    fn from(stored: StoredPaste) -> Self {
        PasteResponse {
            expiry: crate::models::expiry_label(stored.expires_at.as_ref()),
            status: stored.status.message().to_owned(),
            id: stored.id,
            title: stored.title,
            paste: None,
            sha: Some(stored.content_hash),
            size: stored.size,
            delkey: stored.delete_key,
            url: Some(stored.url),
        }
    }
}

impl From<FetchedPaste> for PasteResponse {
    fn from(fetched: FetchedPaste) -> Self {
        PasteResponse {
            expiry: fetched.expiry_label(),
            status: "Success".to_owned(),
            size: fetched.body.len(),
            id: fetched.id,
            title: fetched.title,
            paste: Some(fetched.body),
            sha: None,
            delkey: None,
            url: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Accept the ttl either as a JSON number or as a numeric string.
fn deserialize_ttl<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ttl {
        Secs(u64),
        Text(String),
    }

    match Ttl::deserialize(deserializer)? {
        Ttl::Secs(secs) => Ok(secs),
        Ttl::Text(text) if text.trim().is_empty() => Ok(0),
        Ttl::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_as_number_or_string() {
        let number: SavePaste = serde_json::from_str(r#"{"paste": "x", "expiry": 60}"#).unwrap();
        assert_eq!(number.expiry, 60);

        let text: SavePaste = serde_json::from_str(r#"{"paste": "x", "expiry": "60"}"#).unwrap();
        assert_eq!(text.expiry, 60);

        let missing: SavePaste = serde_json::from_str(r#"{"paste": "x"}"#).unwrap();
        assert_eq!(missing.expiry, 0);
        assert_eq!(missing.title, "");

        assert!(serde_json::from_str::<SavePaste>(r#"{"paste": "x", "expiry": "soon"}"#).is_err());
        assert!(serde_json::from_str::<SavePaste>(r#"{"paste": "x", "expiry": -5}"#).is_err());
    }
}
