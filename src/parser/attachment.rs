//! Image extraction from classified MIME parts.

use tracing::{debug, warn};

use super::codec;
use super::mime::{MimePart, TransferEncoding};
use crate::error::{MailError, Result};
use crate::model::attachment::Attachment;

/// Decode every eligible image part, in encounter order.
///
/// A part that fails to decode is logged and dropped; the others still come
/// through.
pub fn extract_attachments(parts: &[MimePart<'_>]) -> Vec<Attachment> {
    parts
        .iter()
        .filter(|part| is_eligible(part))
        .filter_map(|part| match decode_attachment(part) {
            Ok(attachment) => {
                debug!(
                    filename = %attachment.filename,
                    content_type = %attachment.content_type,
                    size = attachment.size(),
                    "Extracted image"
                );
                Some(attachment)
            }
            Err(e) => {
                warn!(error = %e, "Dropping undecodable image part");
                None
            }
        })
        .collect()
}

/// An image part qualifies if it is a named attachment/inline part or if it
/// can be referenced through a Content-ID.
pub fn is_eligible(part: &MimePart<'_>) -> bool {
    part.is_image()
        && ((part.disposition.is_some() && part.filename.is_some()) || part.content_id.is_some())
}

/// Decode one image part into an [`Attachment`].
pub fn decode_attachment(part: &MimePart<'_>) -> Result<Attachment> {
    let filename = part
        .filename
        .clone()
        .or_else(|| part.content_id.clone())
        .unwrap_or_else(|| "attachment".to_string());

    let data = match part.transfer_encoding {
        TransferEncoding::Base64 => {
            codec::decode_base64(part.raw_body).map_err(|e| MailError::AttachmentDecode {
                filename: filename.clone(),
                reason: e.to_string(),
            })?
        }
        TransferEncoding::QuotedPrintable => codec::decode_quoted_printable(part.raw_body),
        TransferEncoding::Identity => {
            codec::bytes_per_char(part.raw_body).ok_or_else(|| MailError::AttachmentDecode {
                filename: filename.clone(),
                reason: "identity body has characters above U+00FF".to_string(),
            })?
        }
    };

    Ok(Attachment {
        filename,
        content_type: part.content_type.clone(),
        data,
        content_id: part.content_id.clone(),
    })
}
