//! Header block parsing: single-line header lookup and date parsing.
//!
//! Header folding is not supported: a header's value is the rest
//! of its own line and continuation lines are ignored.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use super::text::split_on_blank_line;

/// Header names mapped to their first raw value.
///
/// Lookups are case-insensitive and only the first occurrence of a name is
/// ever returned.
#[derive(Debug, Clone, Default)]
pub struct HeaderSet {
    headers: Vec<(String, String)>,
}

impl HeaderSet {
    /// Build a header set from a header block.
    ///
    /// Lines starting with whitespace (folded continuations) and lines
    /// without a colon are skipped.
    pub fn parse(block: &str) -> Self {
        let mut headers = Vec::new();
        for line in block.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                continue;
            }
            if let Some(colon_pos) = line.find(':') {
                let name = line[..colon_pos].trim();
                if name.is_empty() || name.contains(char::is_whitespace) {
                    continue;
                }
                headers.push((name.to_ascii_lowercase(), line[colon_pos + 1..].trim().to_string()));
            }
        }
        Self { headers }
    }

    /// The first value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of header lines kept (duplicates included).
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Split a message into its header block and body block.
///
/// Without a blank line the whole message is headers and the body is empty.
pub fn split_header_block(text: &str) -> (&str, &str) {
    split_on_blank_line(text)
}

/// Extract content between `<` and `>` (for Message-ID, Content-ID).
pub fn extract_angle_bracket(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return trimmed[start..start + end + 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Formats tried after RFC 2822 and RFC 3339, once a leading weekday has been
/// dropped and a zone abbreviation turned into an offset.
const LENIENT_DATE_FORMATS: [&str; 5] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Zone abbreviations seen in the wild, with their offsets.
const ZONE_OFFSETS: [(&str, &str); 11] = [
    ("CEST", "+0200"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
];

/// Parse a `Date:` header value.
///
/// Accepts RFC 2822, RFC 3339 and the common malformed variants; anything
/// else goes through `mail-parser`'s grammar before giving up.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_lenient(value))
        .or_else(|| parse_with_mail_parser(value));

    if parsed.is_none() {
        warn!(date = value, "Unparseable Date header");
    }
    parsed
}

fn parse_lenient(value: &str) -> Option<DateTime<Utc>> {
    let normalized = zone_to_offset(without_weekday(value));
    LENIENT_DATE_FORMATS.iter().find_map(|fmt| {
        DateTime::parse_from_str(&normalized, fmt)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(&normalized, fmt).map(|ndt| Utc.from_utc_datetime(&ndt))
            })
            .ok()
    })
}

fn parse_with_mail_parser(value: &str) -> Option<DateTime<Utc>> {
    let header = format!("Date: {value}\n\n");
    let message = mail_parser::MessageParser::default().parse(header.as_bytes())?;
    DateTime::parse_from_rfc3339(&message.date()?.to_rfc3339())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `"Thu, 04 Jan ..."` and `"Thu 04 Jan ..."` both become `"04 Jan ..."`.
fn without_weekday(value: &str) -> &str {
    match value.get(..3) {
        Some(day) if ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"].contains(&day) => {
            let rest = &value[3..];
            let rest = rest.strip_prefix(',').unwrap_or(rest);
            if rest.starts_with(' ') {
                rest.trim_start()
            } else {
                value
            }
        }
        _ => value,
    }
}

fn zone_to_offset(value: &str) -> String {
    ZONE_OFFSETS
        .iter()
        .find_map(|(zone, offset)| value.strip_suffix(zone).map(|head| format!("{head}{offset}")))
        .unwrap_or_else(|| value.to_string())
}
