//! S3 object key conventions.
//!
//! Uploads live at `{actor_id}/uploads/{filename}` and their summaries are
//! written to `{actor_id}/summaries/{filename}.summary.txt`.  Only keys that
//! pass [`is_supported_extension`] and [`is_upload_key`] enter the pipeline,
//! so a freshly written summary never triggers another run.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// File extensions (lowercase, with the leading dot) the summarizer accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".txt", ".md"];

const UPLOADS_SEGMENT: &str = "/uploads/";
const SUMMARIES_DIR: &str = "summaries";
const SUMMARY_SUFFIX: &str = ".summary.txt";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid S3 key format: {key} (expected {{user_id}}/uploads/{{filename}})")]
    InvalidFormat { key: String },
}

/// Lowercase extension of the final path segment, including the dot.
///
/// Returns an empty string when the filename has no extension.
///
/// ```
/// use docsum_core::file_extension;
/// assert_eq!(file_extension("path/to/file.txt"), ".txt");
/// assert_eq!(file_extension("path/to/file.MD"), ".md");
/// assert_eq!(file_extension("path/to/file"), "");
/// ```
pub fn file_extension(key: &str) -> String {
    let filename = key.rsplit('/').next().unwrap_or(key);
    match filename.rsplit_once('.') {
        Some((_, ext)) => format!(".{}", ext.to_lowercase()),
        None => String::new(),
    }
}

pub fn is_supported_extension(key: &str) -> bool {
    let ext = file_extension(key);
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_upload_key(key: &str) -> bool {
    key.contains(UPLOADS_SEGMENT)
}

/// Decode a key as delivered in an S3 event notification.
///
/// Notification keys are form-encoded: `+` stands for a space and everything
/// else is percent-encoded.  Invalid UTF-8 sequences are replaced.
pub fn decode_event_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Memory namespace holding the extracted facts for one actor.
pub fn memory_namespace(actor_id: &str) -> String {
    format!("/facts/{actor_id}")
}

/// A validated upload key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    key: String,
    actor_id: String,
    filename: String,
}

impl ObjectKey {
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = key.split('/').collect();
        let invalid = || KeyError::InvalidFormat {
            key: key.to_string(),
        };

        if parts.len() < 3 {
            return Err(invalid());
        }
        let actor_id = parts[0];
        let filename = parts[parts.len() - 1];
        if actor_id.is_empty() || filename.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            key: key.to_string(),
            actor_id: actor_id.to_string(),
            filename: filename.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The user the document belongs to (first path segment).
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Filename without its last extension.
    pub fn file_stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }

    pub fn summary_key(&self) -> String {
        format!(
            "{}/{SUMMARIES_DIR}/{}{SUMMARY_SUFFIX}",
            self.actor_id, self.filename
        )
    }

    pub fn memory_namespace(&self) -> String {
        memory_namespace(&self.actor_id)
    }

    /// `{stem}_{YYYYmmdd_HHMMSS}`, restricted to characters accepted as a
    /// memory session id.
    pub fn session_id(&self, now: DateTime<Utc>) -> String {
        let stem: String = self
            .file_stem()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("{stem}_{}", now.format("%Y%m%d_%H%M%S"))
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn extension_is_lowercased_and_dotted() {
        assert_eq!(file_extension("alice/uploads/report.TXT"), ".txt");
        assert_eq!(file_extension("alice/uploads/notes.tar.md"), ".md");
        assert_eq!(file_extension("alice/uploads/README"), "");
    }

    #[test]
    fn extension_ignores_dots_in_directories() {
        assert_eq!(file_extension("alice/v1.2/uploads/README"), "");
        assert_eq!(file_extension("alice.smith/uploads/a.md"), ".md");
    }

    #[test]
    fn supported_extensions() {
        assert!(is_supported_extension("a/uploads/x.txt"));
        assert!(is_supported_extension("a/uploads/x.Md"));
        assert!(!is_supported_extension("a/uploads/x.pdf"));
        assert!(!is_supported_extension("a/uploads/x"));
    }

    #[test]
    fn upload_directory_convention() {
        assert!(is_upload_key("alice/uploads/report.txt"));
        assert!(is_upload_key("alice/uploads/2024/report.txt"));
        assert!(!is_upload_key("alice/summaries/report.txt.summary.txt"));
        assert!(!is_upload_key("uploads/report.txt"));
    }

    #[test]
    fn event_keys_are_form_decoded() {
        assert_eq!(
            decode_event_key("alice/uploads/monthly+report%281%29.txt"),
            "alice/uploads/monthly report(1).txt"
        );
        assert_eq!(decode_event_key("a/uploads/c%2B%2B.md"), "a/uploads/c++.md");
        assert_eq!(
            decode_event_key("a/uploads/%E5%A0%B1%E5%91%8A.txt"),
            "a/uploads/報告.txt"
        );
    }

    #[test]
    fn parse_extracts_actor_and_filename() {
        let key = ObjectKey::parse("alice/uploads/report.txt").unwrap();
        assert_eq!(key.actor_id(), "alice");
        assert_eq!(key.filename(), "report.txt");
        assert_eq!(key.file_stem(), "report");
        assert_eq!(key.memory_namespace(), "/facts/alice");
    }

    #[test]
    fn parse_rejects_short_or_empty_segments() {
        for bad in ["report.txt", "alice/report.txt", "/uploads/report.txt", "alice/uploads/"] {
            let err = ObjectKey::parse(bad).unwrap_err();
            assert!(err.to_string().contains("{user_id}/uploads/{filename}"), "{bad}");
        }
    }

    #[test]
    fn summary_key_lands_outside_uploads() {
        let key = ObjectKey::parse("alice/uploads/2024/report.md").unwrap();
        let summary = key.summary_key();
        assert_eq!(summary, "alice/summaries/report.md.summary.txt");
        assert!(!is_upload_key(&summary));
    }

    #[test]
    fn session_id_uses_stem_and_utc_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        let key = ObjectKey::parse("alice/uploads/monthly report.v2.txt").unwrap();
        assert_eq!(key.session_id(now), "monthly-report-v2_20250309_070501");
    }

    #[test]
    fn stem_of_dotfile_is_whole_name() {
        let key = ObjectKey::parse("alice/uploads/.txt").unwrap();
        assert_eq!(key.file_stem(), ".txt");
    }
}
