//! Decoded image attachments.

/// An image carried by the message, already decoded to raw bytes.
///
/// Only `image/*` parts ever become an `Attachment`; everything else is
/// dropped by the extractor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Declared filename, else the Content-ID, else `"attachment"`.
    /// Not sanitized: callers that touch a filesystem must clean it.
    pub filename: String,

    /// Lowercased MIME type, always starting with `image/`.
    pub content_type: String,

    /// Decoded payload.
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Content-ID without angle brackets, used to resolve `cid:` references
    /// in the body.
    pub content_id: Option<String>,
}

impl Attachment {
    /// Size of the decoded payload in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
