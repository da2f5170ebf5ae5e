//! Commit frame codec
//!
//! A commit is stored as a single UTF-8 blob whose first line is a
//! structured header:
//!
//! ```text
//! COMMIT:<hash>|<short_hash>|<author>|<date>|<subject>
//! <ingest content ...>
//! ```
//!
//! The subject is the trailing header field, so it may contain the `|`
//! delimiter and still round-trip. Decoding never fails: content without a
//! usable header comes back as a degraded hit that still carries its score.

use crate::store::FrameMetadata;
use crate::types::{Commit, SearchHit};

/// Prefix marking a frame produced by [`encode`]
pub const HEADER_PREFIX: &str = "COMMIT:";

/// Header field separator
pub const DELIMITER: &str = "|";

/// Stand-in for a delimiter found inside a fixed-position header field
const DELIMITER_REPLACEMENT: &str = "¦";

/// Number of delimiter-separated fields in a well-formed header
const HEADER_FIELDS: usize = 5;

/// Serialize a commit into frame content
pub fn encode(commit: &Commit) -> String {
    let mut content = String::with_capacity(
        HEADER_PREFIX.len()
            + commit.hash.len()
            + commit.short_hash.len()
            + commit.author.len()
            + commit.date.len()
            + commit.subject.len()
            + commit.ingest_content.len()
            + 6,
    );

    content.push_str(HEADER_PREFIX);
    for field in [
        &commit.hash,
        &commit.short_hash,
        &commit.author,
        &commit.date,
    ] {
        content.push_str(&fixed_field(field));
        content.push_str(DELIMITER);
    }
    content.push_str(&single_line(&commit.subject));
    content.push('\n');
    content.push_str(&commit.ingest_content);
    content
}

/// Reconstruct a search hit from frame content. Total: never fails.
pub fn decode(text: &str, score: f32) -> SearchHit {
    DecodedFrame::parse(text).into_hit(score)
}

/// Key/value metadata attached to a stored commit frame
pub fn frame_metadata(commit: &Commit, repo_name: &str) -> FrameMetadata {
    let mut metadata = FrameMetadata::new();
    metadata.insert("kind".to_string(), "git-commit".to_string());
    metadata.insert("repo".to_string(), repo_name.to_string());
    metadata.insert("hash".to_string(), commit.hash.clone());
    metadata.insert("short_hash".to_string(), commit.short_hash.clone());
    metadata.insert("author".to_string(), commit.author.clone());
    metadata.insert("date".to_string(), commit.date.clone());
    metadata.insert("subject".to_string(), commit.subject.clone());
    metadata
}

/// Structured view of a frame's header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

/// Outcome of parsing frame content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// Header recognized; `body` is everything after the header line
    FullyParsed { header: CommitHeader, body: String },
    /// No usable header; `subject` is a best-effort title, `text` the input
    Degraded { subject: String, text: String },
}

impl DecodedFrame {
    pub fn parse(text: &str) -> Self {
        let Some(rest) = text.strip_prefix(HEADER_PREFIX) else {
            let first_line = text.split('\n').next().unwrap_or(text);
            return DecodedFrame::Degraded {
                subject: first_line.to_string(),
                text: text.to_string(),
            };
        };

        let (header_line, body) = match rest.split_once('\n') {
            Some((header, body)) => (header, body),
            None => (rest, ""),
        };

        let parts: Vec<&str> = header_line.split(DELIMITER).collect();
        if parts.len() < HEADER_FIELDS {
            return DecodedFrame::Degraded {
                subject: text.to_string(),
                text: text.to_string(),
            };
        }

        let subject = parts[HEADER_FIELDS - 1..].join(DELIMITER);

        DecodedFrame::FullyParsed {
            header: CommitHeader {
                hash: parts[0].to_string(),
                short_hash: parts[1].to_string(),
                author: parts[2].to_string(),
                date: parts[3].to_string(),
                subject,
            },
            body: body.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, DecodedFrame::Degraded { .. })
    }

    pub fn into_hit(self, score: f32) -> SearchHit {
        match self {
            DecodedFrame::FullyParsed { header, body } => SearchHit {
                hash: header.hash,
                short_hash: header.short_hash,
                author: header.author,
                date: header.date,
                subject: header.subject,
                score,
                preview_text: body,
            },
            DecodedFrame::Degraded { subject, text } => SearchHit {
                hash: String::new(),
                short_hash: String::new(),
                author: String::new(),
                date: String::new(),
                subject,
                score,
                preview_text: text,
            },
        }
    }
}

/// Fixed-position fields may not carry the delimiter or a line break
fn fixed_field(value: &str) -> String {
    single_line(value).replace(DELIMITER, DELIMITER_REPLACEMENT)
}

fn single_line(value: &str) -> String {
    if value.contains(['\n', '\r']) {
        value.replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    }
}
