//! Decoder entry point: raw bytes in, [`Decoded`] out.

use std::io::Read;

use tracing::debug;

use super::header::{extract_angle_bracket, parse_date, split_header_block, HeaderSet};
use super::{attachment, body, mime, text};
use crate::error::Result;
use crate::model::address::Sender;
use crate::model::email::{Decoded, ParsedEmail, SkipReason};

/// Caller policy applied while decoding.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Title used when the `Subject:` header is missing or blank
    /// (e.g. `"Email to Issue"`). Without it such messages are skipped.
    pub default_subject: Option<String>,
}

impl DecodeOptions {
    pub fn with_default_subject(subject: impl Into<String>) -> Self {
        Self {
            default_subject: Some(subject.into()),
        }
    }
}

/// Decode one complete message with no default subject.
pub fn decode(raw: &[u8]) -> Decoded {
    decode_with(raw, &DecodeOptions::default())
}

/// Drain `reader` completely, then decode what it produced.
pub fn decode_reader(reader: impl Read, options: &DecodeOptions) -> Result<Decoded> {
    let raw = text::read_message(reader)?;
    Ok(decode_with(&raw, options))
}

/// Decode one complete message.
///
/// Never fails: a message without a usable subject or body comes back as
/// [`Decoded::Skip`].
pub fn decode_with(raw: &[u8], options: &DecodeOptions) -> Decoded {
    let full_text = text::bytes_to_text(raw);
    let message = text::skip_from_line(&full_text);

    let (header_block, _) = split_header_block(message);
    let headers = HeaderSet::parse(header_block);

    let mut subject = headers.get("subject").unwrap_or_default().trim().to_string();
    if subject.is_empty() {
        if let Some(default) = options.default_subject.as_deref() {
            subject = default.trim().to_string();
        }
    }
    if subject.is_empty() {
        debug!("Skipping message without subject");
        return Decoded::Skip(SkipReason::EmptySubject);
    }

    let parts = mime::walk_parts(message);
    let body = body::select_body(&parts, message);
    if body.is_empty() {
        debug!(subject = %subject, "Skipping message without body");
        return Decoded::Skip(SkipReason::EmptyBody);
    }
    let attachments = attachment::extract_attachments(&parts);

    let from = headers.get("from").unwrap_or_default().to_string();
    let sender_email = Sender::from_header(&from).email;

    Decoded::Email(ParsedEmail {
        subject,
        from,
        sender_email,
        body,
        attachments,
        date: headers.get("date").and_then(parse_date),
        message_id: headers.get("message-id").map(extract_angle_bracket),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message() {
        let raw = b"From: a@x.com\nSubject: Hello\n\nHi there\n";
        let email = decode(raw).email().unwrap();
        assert_eq!(email.subject, "Hello");
        assert_eq!(email.from, "a@x.com");
        assert_eq!(email.sender_email, "a@x.com");
        assert_eq!(email.body, "Hi there");
        assert!(email.attachments.is_empty());
        assert!(email.date.is_none());
    }

    #[test]
    fn test_missing_subject_skips() {
        assert_eq!(
            decode(b"From: a@x.com\n\nbody\n"),
            Decoded::Skip(SkipReason::EmptySubject)
        );
        assert_eq!(
            decode(b"From: a@x.com\nSubject:    \n\nbody\n"),
            Decoded::Skip(SkipReason::EmptySubject)
        );
    }

    #[test]
    fn test_default_subject_applies() {
        let options = DecodeOptions::with_default_subject("Email to Issue");
        let email = decode_with(b"From: a@x.com\n\nbody\n", &options).email().unwrap();
        assert_eq!(email.subject, "Email to Issue");
    }

    #[test]
    fn test_empty_body_skips() {
        assert_eq!(
            decode(b"Subject: Hello\n\n\n   \n"),
            Decoded::Skip(SkipReason::EmptyBody)
        );
    }

    #[test]
    fn test_message_without_blank_line_skips() {
        let decoded = decode(b"From: a@x.com\nSubject: Hello\nHi there");
        assert_eq!(decoded, Decoded::Skip(SkipReason::EmptyBody));
    }

    #[test]
    fn test_mbox_envelope_and_metadata() {
        let raw = b"From a@x.com Thu Jan 04 10:00:00 2024\n\
From: \"A. Person\" <A@X.com>\n\
Subject: Status\n\
Date: Thu, 04 Jan 2024 10:00:00 +0000\n\
Message-ID: <m1@x.com>\n\
\n\
All good.\n";
        let email = decode(raw).email().unwrap();
        assert_eq!(email.from, "\"A. Person\" <A@X.com>");
        assert_eq!(email.sender_email, "a@x.com");
        assert_eq!(email.message_id.as_deref(), Some("<m1@x.com>"));
        assert!(email.date.is_some());
        assert_eq!(email.body, "All good.");
    }

    #[test]
    fn test_decode_reader() {
        let raw = std::io::Cursor::new(b"Subject: s\n\nb\n".to_vec());
        let decoded = decode_reader(raw, &DecodeOptions::default()).unwrap();
        assert!(!decoded.is_skip());
    }
}
