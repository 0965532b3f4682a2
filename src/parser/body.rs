//! Body selection and final normalization.
//!
//! Priority: concatenated `text/plain` parts, then concatenated `text/html`
//! parts converted to markdown, then a raw line scan of the whole message.
//! The chosen text is always run through [`normalize_body`].

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::html::html_to_markdown;
use super::mime::MimePart;
use super::text::split_on_blank_line;

/// Pick the best body for a message and normalize it to markdown.
///
/// `message` is the full message text, used only by the raw fallback.
pub fn select_body(parts: &[MimePart<'_>], message: &str) -> String {
    let mut plain: Vec<String> = Vec::new();
    let mut html: Vec<String> = Vec::new();

    for part in parts {
        if part.is_plain_text() {
            plain.push(part.decoded_text());
        } else if part.is_html() {
            html.push(part.decoded_text());
        }
    }

    let from_plain = normalize_body(plain.join("\n").trim());
    if !from_plain.is_empty() {
        debug!(parts = plain.len(), "Using text/plain body");
        return from_plain;
    }

    let from_html = normalize_body(html_to_markdown(&html.join("\n")).trim());
    if !from_html.is_empty() {
        debug!(parts = html.len(), "Using text/html body converted to markdown");
        return from_html;
    }

    debug!("No usable text part, falling back to raw body scan");
    normalize_body(&fallback_body(message))
}

/// Best-effort body recovery for messages whose structure was not classified.
///
/// Everything after the first blank line, minus lines that look like MIME
/// headers (`Content-…`) or delimiters (`--…`).
pub fn fallback_body(message: &str) -> String {
    let (_, body) = split_on_blank_line(message);
    body.lines()
        .filter(|line| !line.starts_with("Content-") && !line.starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Final cleanup applied to every body, whatever produced it.
///
/// Removes `[image: …]`/`[cid: …]` placeholders, MIME closing delimiters,
/// stray `Content-Type:`/`Content-Transfer-Encoding:` lines and blank lines,
/// then trims. Running it on its own output changes nothing.
pub fn normalize_body(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = strip_placeholders(line);
        let trimmed = line.trim();
        if trimmed.is_empty() || is_closing_delimiter(trimmed) || is_stray_mime_header(trimmed) {
            continue;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}

/// Remove placeholders until none are left; removing one can expose another.
fn strip_placeholders(line: &str) -> String {
    let mut current = line.to_string();
    while placeholder_regex().is_match(&current) {
        current = placeholder_regex().replace_all(&current, "").into_owned();
    }
    current
}

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\[(?:image|cid):[^\]\n]*\]").expect("valid placeholder regex")
    })
}

fn is_closing_delimiter(line: &str) -> bool {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX
        .get_or_init(|| {
            Regex::new(r"^--[0-9A-Za-z'()+_,./:=?\-]*[0-9A-Za-z][0-9A-Za-z'()+_,./:=?\-]*--$")
                .expect("valid closing delimiter regex")
        })
        .is_match(line)
}

fn is_stray_mime_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("content-type:") || lower.starts_with("content-transfer-encoding:")
}
