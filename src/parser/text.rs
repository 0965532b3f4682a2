//! Raw bytes to text: draining the input, UTF-8 decoding, line-block splitting.

use std::io::Read;

use tracing::debug;

use crate::error::Result;

/// Read a whole message from `reader`.
///
/// The decoder only ever sees a fully drained buffer, never a partial read.
pub fn read_message(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(64 * 1024);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Decode raw message bytes as UTF-8.
///
/// A leading BOM is removed and invalid sequences become U+FFFD, so this
/// never fails.
pub fn bytes_to_text(raw: &[u8]) -> String {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(raw);
    if had_errors {
        debug!(len = raw.len(), "Message contains invalid UTF-8, replaced lossily");
    }
    text.into_owned()
}

/// Skip the `From ` envelope line that mbox framing puts before the headers.
pub fn skip_from_line(text: &str) -> &str {
    if text.starts_with("From ") {
        return match text.find('\n') {
            Some(pos) => &text[pos + 1..],
            None => "",
        };
    }
    text
}

/// Split `text` at its first line that is empty after trimming.
///
/// Returns `(before, after)` with the blank line itself in neither half.
/// Without a blank line the whole text is `before` and `after` is empty.
pub fn split_on_blank_line(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            return (&text[..offset], &text[offset + line.len()..]);
        }
        offset += line.len();
    }
    (text, "")
}

/// Decode bytes using a named charset, defaulting to UTF-8.
pub fn decode_charset(charset: Option<&str>, bytes: &[u8]) -> String {
    let Some(label) = charset else {
        return String::from_utf8_lossy(bytes).into_owned();
    };
    match encoding_rs::Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            debug!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
