//! MIME part walker: boundary discovery, part splitting, part classification.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::codec;
use super::header::HeaderSet;
use super::text::{decode_charset, split_on_blank_line};

/// Multipart levels followed below the top-level boundary.
const MAX_NESTING: usize = 1;

/// `Content-Transfer-Encoding` of a part. Unknown values (`7bit`, `8bit`,
/// `binary`, garbage) are all treated as identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    #[default]
    Identity,
}

impl TransferEncoding {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }
}

/// The disposition keyword of a `Content-Disposition` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    pub fn parse(value: &str) -> Option<Self> {
        let kind = value.split(';').next().unwrap_or("").trim();
        if kind.eq_ignore_ascii_case("attachment") {
            Some(Self::Attachment)
        } else if kind.eq_ignore_ascii_case("inline") {
            Some(Self::Inline)
        } else {
            None
        }
    }
}

/// One body segment of a multipart message.
///
/// Borrows its body from the message text; parts live only for the duration
/// of one decode call.
#[derive(Debug, Clone, PartialEq)]
pub struct MimePart<'a> {
    /// Lowercased media type without parameters (`"text/plain"`), may be empty.
    pub content_type: String,
    pub transfer_encoding: TransferEncoding,
    pub disposition: Option<Disposition>,
    /// Content-ID without angle brackets.
    pub content_id: Option<String>,
    /// `filename=` parameter, else `name=`.
    pub filename: Option<String>,
    pub charset: Option<String>,
    /// Body text before transfer decoding.
    pub raw_body: &'a str,
}

impl MimePart<'_> {
    pub fn is_plain_text(&self) -> bool {
        self.content_type.starts_with("text/plain")
    }

    pub fn is_html(&self) -> bool {
        self.content_type.starts_with("text/html")
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// The body as text, transfer-decoded and charset-decoded.
    ///
    /// A text part whose base64 is broken keeps its raw text.
    pub fn decoded_text(&self) -> String {
        let charset = self.charset.as_deref();
        match self.transfer_encoding {
            TransferEncoding::Base64 => match codec::decode_base64(self.raw_body) {
                Ok(bytes) => decode_charset(charset, &bytes),
                Err(e) => {
                    debug!(error = %e, "Text part is not valid base64, keeping raw text");
                    self.raw_body.to_string()
                }
            },
            TransferEncoding::QuotedPrintable => {
                decode_charset(charset, &codec::decode_quoted_printable(self.raw_body))
            }
            TransferEncoding::Identity => self.raw_body.to_string(),
        }
    }
}

/// Split a message into its MIME parts, in encounter order.
///
/// A message without a multipart boundary is a single implicit part when its
/// own headers make it a decodable text body (see [`implicit_part`]).
/// Otherwise no parts come back and the body selector falls back to raw
/// extraction.
pub fn walk_parts(text: &str) -> Vec<MimePart<'_>> {
    let Some((boundary, decl_end)) = find_boundary(text) else {
        debug!("No multipart boundary declared");
        return implicit_part(text).into_iter().collect();
    };
    let mut parts = Vec::new();
    split_parts(&text[decl_end..], &boundary, 0, &mut parts);
    debug!(boundary = %boundary, parts = parts.len(), "Walked MIME parts");
    parts
}

/// The whole message as one part, classified from its top-level headers.
///
/// Only kept when it is `text/plain` or `text/html`, or when it declares a
/// base64 or quoted-printable transfer encoding without a content type (which
/// then means `text/plain`).
fn implicit_part(message: &str) -> Option<MimePart<'_>> {
    let mut parts = Vec::with_capacity(1);
    push_part(message, MAX_NESTING, &mut parts);
    let mut part = parts.pop()?;
    if part.content_type.is_empty() && part.transfer_encoding != TransferEncoding::Identity {
        part.content_type = "text/plain".to_string();
    }
    (part.is_plain_text() || part.is_html()).then_some(part)
}

/// Find the first `Content-Type: multipart/*; boundary=...` declaration.
///
/// Returns the boundary and the byte offset just past the declaration.
pub fn find_boundary(text: &str) -> Option<(String, usize)> {
    let caps = boundary_decl_regex().captures(text)?;
    let end = caps.get(0)?.end();
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Some((value.as_str().to_string(), end))
}

fn boundary_decl_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?i)content-type:[ \t]*multipart/[a-z0-9.+\-]+[^:]*?boundary[ \t]*=[ \t]*(?:"([^"]+)"|([^\s;"]+))"#,
        )
        .expect("valid boundary declaration regex")
    })
}

/// Parameter `name=value` pairs anywhere in a header block.
fn param_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|[;\s])([a-z][a-z0-9*_\-]*)[ \t]*=[ \t]*(?:"([^"]*)"|([^;\s"]+))"#)
            .expect("valid header parameter regex")
    })
}

/// First value of parameter `name` in a header block (`charset`, `filename`, ...).
fn find_param(block: &str, name: &str) -> Option<String> {
    param_regex().captures_iter(block).find_map(|caps| {
        let key = caps.get(1)?.as_str().trim_end_matches('*');
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3))?.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Split `text` on delimiter lines of `boundary`, appending parts to `out`.
///
/// The boundary is matched literally (regex-escaped): generated boundaries
/// routinely contain `+`, `.`, `=`, `?` and parentheses.
fn split_parts<'a>(text: &'a str, boundary: &str, depth: usize, out: &mut Vec<MimePart<'a>>) {
    let pattern = format!(r"(?m)^[ \t]*--{}(--)?[ \t]*\r?$", regex::escape(boundary));
    let delimiter = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!(error = %e, "Unusable boundary, treating message as unstructured");
            return;
        }
    };

    let mut segment_start: Option<usize> = None;
    for caps in delimiter.captures_iter(text) {
        let Some(line) = caps.get(0) else { continue };
        if let Some(start) = segment_start {
            push_part(&text[start..line.start()], depth, out);
        }
        if caps.get(1).is_some() {
            // Closing delimiter: the epilogue is not a part.
            return;
        }
        let after = line.end();
        segment_start = Some(if text[after..].starts_with('\n') {
            after + 1
        } else {
            after
        });
    }

    // Unterminated final part.
    if let Some(start) = segment_start {
        push_part(&text[start..], depth, out);
    }
}

/// Classify one segment and append it, or its nested parts, to `out`.
fn push_part<'a>(segment: &'a str, depth: usize, out: &mut Vec<MimePart<'a>>) {
    let (header_block, body) = split_on_blank_line(segment);
    if body.trim().is_empty() {
        return;
    }

    let headers = HeaderSet::parse(header_block);
    let content_type = headers
        .get("content-type")
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    if content_type.starts_with("multipart/") && depth < MAX_NESTING {
        if let Some((inner, _)) = find_boundary(header_block) {
            split_parts(body, &inner, depth + 1, out);
            return;
        }
    }

    let content_id = headers
        .get("content-id")
        .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').trim().to_string())
        .filter(|v| !v.is_empty());

    out.push(MimePart {
        content_type,
        transfer_encoding: headers
            .get("content-transfer-encoding")
            .map(TransferEncoding::parse)
            .unwrap_or_default(),
        disposition: headers.get("content-disposition").and_then(Disposition::parse),
        content_id,
        filename: find_param(header_block, "filename").or_else(|| find_param(header_block, "name")),
        charset: find_param(header_block, "charset"),
        raw_body: body,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALTERNATIVE: &str = "From: a@x.com\n\
Subject: Hi\n\
Content-Type: multipart/alternative; boundary=\"XYZ\"\n\
\n\
This is a multi-part message in MIME format.\n\
--XYZ\n\
Content-Type: text/plain; charset=\"utf-8\"\n\
\n\
Plain body\n\
--XYZ\n\
Content-Type: text/html; charset=utf-8\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
<p>Hello =3D world</p>\n\
--XYZ--\n\
epilogue\n";

    #[test]
    fn test_find_boundary_quoted_and_folded() {
        let text = "Content-Type: multipart/mixed;\n\tboundary=\"a+b.c=(d)?\"\n\nbody";
        let (boundary, _) = find_boundary(text).unwrap();
        assert_eq!(boundary, "a+b.c=(d)?");
    }

    #[test]
    fn test_find_boundary_unquoted() {
        let (boundary, _) = find_boundary("content-type: Multipart/Related; boundary=abc123\n").unwrap();
        assert_eq!(boundary, "abc123");
    }

    #[test]
    fn test_no_boundary_means_no_parts() {
        assert!(walk_parts("Subject: x\n\nHello\n").is_empty());
        assert!(walk_parts("Subject: x\nContent-Type: image/png\n\nAAEC\n").is_empty());
        assert!(walk_parts("Subject: x\nContent-Type: text/plain\nHello\n").is_empty());
    }

    #[test]
    fn test_single_part_message_is_implicit_part() {
        let text = "Subject: x\n\
Content-Type: text/plain; charset=utf-8\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
It=E2=80=99s soft=\n wrapped =3D done\n";
        let parts = walk_parts(text);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_plain_text());
        assert_eq!(parts[0].transfer_encoding, TransferEncoding::QuotedPrintable);
        assert_eq!(parts[0].decoded_text(), "It\u{2019}s soft wrapped = done\n");

        let parts = walk_parts("Content-Transfer-Encoding: base64\n\nSGk=\n");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].content_type, "text/plain");
        assert_eq!(parts[0].decoded_text(), "Hi");
    }

    #[test]
    fn test_walk_alternative_parts() {
        let parts = walk_parts(ALTERNATIVE);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].content_type, "text/plain");
        assert_eq!(parts[0].charset.as_deref(), Some("utf-8"));
        assert_eq!(parts[0].raw_body.trim(), "Plain body");
        assert!(parts[1].is_html());
        assert_eq!(parts[1].transfer_encoding, TransferEncoding::QuotedPrintable);
        assert_eq!(parts[1].decoded_text().trim(), "<p>Hello = world</p>");
    }

    #[test]
    fn test_boundary_with_regex_metacharacters() {
        let text = "Content-Type: multipart/mixed; boundary=\"=_(1.2)+*?\"\n\n\
--=_(1.2)+*?\nContent-Type: text/plain\n\nfirst\n\
--=_(1.2)+*?\nContent-Type: text/plain\n\nsecond\n\
--=_(1.2)+*?--\n";
        let parts = walk_parts(text);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].raw_body.trim(), "second");
    }

    #[test]
    fn test_empty_parts_are_discarded() {
        let text = "Content-Type: multipart/mixed; boundary=\"B\"\n\n\
--B\nContent-Type: text/plain\n\n   \n\
--B\nContent-Type: text/plain\n\nkept\n--B--\n";
        let parts = walk_parts(text);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].raw_body.trim(), "kept");
    }

    #[test]
    fn test_image_part_classification() {
        let text = "Content-Type: multipart/related; boundary=\"R\"\n\n\
--R\n\
Content-Type: image/PNG; name=\"logo.png\"\n\
Content-Transfer-Encoding: BASE64\n\
Content-Disposition: inline;\n\tfilename=\"logo.png\"\n\
Content-ID: <img1@example>\n\
\n\
iVBORw0KGgo=\n\
--R--\n";
        let parts = walk_parts(text);
        assert_eq!(parts.len(), 1);
        let part = &parts[0];
        assert!(part.is_image());
        assert_eq!(part.content_type, "image/png");
        assert_eq!(part.transfer_encoding, TransferEncoding::Base64);
        assert_eq!(part.disposition, Some(Disposition::Inline));
        assert_eq!(part.content_id.as_deref(), Some("img1@example"));
        assert_eq!(part.filename.as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_one_nested_level_is_flattened() {
        let text = "Content-Type: multipart/mixed; boundary=\"OUTER\"\n\n\
--OUTER\n\
Content-Type: multipart/alternative; boundary=\"INNER\"\n\
\n\
--INNER\nContent-Type: text/plain\n\ninner plain\n\
--INNER\nContent-Type: text/html\n\n<b>inner</b>\n\
--INNER--\n\
--OUTER\n\
Content-Type: image/gif\nContent-ID: <g>\n\nR0lGODlh\n\
--OUTER--\n";
        let parts = walk_parts(text);
        let types: Vec<&str> = parts.iter().map(|p| p.content_type.as_str()).collect();
        assert_eq!(types, ["text/plain", "text/html", "image/gif"]);
    }

    #[test]
    fn test_crlf_delimiters() {
        let text = "Content-Type: multipart/mixed; boundary=\"C\"\r\n\r\n\
--C\r\nContent-Type: text/plain\r\n\r\nline\r\n--C--\r\n";
        let parts = walk_parts(text);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].raw_body.trim(), "line");
    }

    #[test]
    fn test_transfer_encoding_and_disposition_parsing() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::Identity);
        assert_eq!(TransferEncoding::parse(" Quoted-Printable "), TransferEncoding::QuotedPrintable);
        assert_eq!(Disposition::parse("Attachment; filename=a.png"), Some(Disposition::Attachment));
        assert_eq!(Disposition::parse("form-data"), None);
    }
}
