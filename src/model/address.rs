//! Sender identity taken from a raw `From:` header value.

use std::sync::OnceLock;

use regex::Regex;

/// Who sent a message, as far as the `From:` header tells.
///
/// `"Reporter <Rep@Example.org>"` becomes `name = Some("Reporter")` and
/// `email = "rep@example.org"`. A value with no address in it leaves
/// `email` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Sender {
    pub name: Option<String>,
    /// Bare lowercased address, or empty.
    pub email: String,
}

impl Sender {
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        let name = value
            .rfind('<')
            .filter(|&open| value[open..].contains('>'))
            .map(|open| unquote(&value[..open]))
            .filter(|name| !name.is_empty());

        Self {
            name,
            email: extract_email(value),
        }
    }

    /// Short label for notifications: the name when there is one, otherwise
    /// the address.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) if !self.email.is_empty() => write!(f, "{name} <{}>", self.email),
            _ => f.write_str(self.label()),
        }
    }
}

/// Find the first address-shaped token (`local@domain.tld`) and lowercase it.
///
/// Returns an empty string when the value contains no address.
pub fn extract_email(value: &str) -> String {
    address_regex()
        .find(value)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default()
}

fn address_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
            .expect("valid address regex")
    })
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
        .trim()
        .to_string()
}
