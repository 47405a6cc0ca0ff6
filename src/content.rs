//! Canonical storage form of paste content.
//!
//! Titles and bodies are stored HTML-escaped and hashed in that form, so the
//! same raw input always lands on the same `content_hash`.

use std::borrow::Cow;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Escape raw user input for storage.
pub fn escape(raw: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(raw)
}

/// Reverse [`escape`] for display.
pub fn unescape(stored: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(stored)
}

/// Digest of an escaped body, base64-url encoded.
pub fn content_hash(escaped_body: &str) -> String {
    let digest = Sha256::digest(escaped_body.as_bytes());
    URL_SAFE.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_roundtrip() {
        let raw = r#"<script>alert("hi & 'bye'")</script> &amp; stays"#;
        let escaped = escape(raw);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('"'));
        assert_eq!(unescape(&escaped), raw);
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(escape("fn main() {}"), "fn main() {}");
    }

    #[test]
    fn hash_is_deterministic_and_url_safe() {
        let a = content_hash("hello world");
        let b = content_hash("hello world");
        let c = content_hash("hello world!");

        assert_eq!(a, b);
        assert_ne!(a, c);
        // 32 bytes of digest
        assert_eq!(a.len(), 44);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')));
    }
}
