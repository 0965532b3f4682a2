//! The decoder's output record.

use chrono::{DateTime, Utc};

use super::attachment::Attachment;

/// A normalized inbound email, ready to be published.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParsedEmail {
    /// First `Subject:` header, trimmed (or the configured default title).
    pub subject: String,

    /// Raw value of the first `From:` header, not parsed.
    pub from: String,

    /// Lowercased bare address found in `from`; empty when none was found.
    pub sender_email: String,

    /// Markdown body: blank lines collapsed, MIME artifacts stripped.
    pub body: String,

    /// Decoded images, in the order their parts appeared in the message.
    pub attachments: Vec<Attachment>,

    /// Parsed `Date:` header, if present and understood.
    pub date: Option<DateTime<Utc>>,

    /// The `Message-ID` header value, if present.
    pub message_id: Option<String>,
}

/// Why a message produced nothing to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The subject is missing or whitespace-only and no default applies.
    EmptySubject,
    /// No body text survived selection and normalization.
    EmptyBody,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySubject => write!(f, "empty subject"),
            Self::EmptyBody => write!(f, "empty body"),
        }
    }
}

/// Result of decoding one message.
///
/// `Skip` is a normal outcome meaning "do not publish", not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Email(ParsedEmail),
    Skip(SkipReason),
}

impl Decoded {
    /// The decoded email, or `None` for a skipped message.
    pub fn email(self) -> Option<ParsedEmail> {
        match self {
            Self::Email(email) => Some(email),
            Self::Skip(_) => None,
        }
    }

    /// Whether the message should not be published.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}
