//! HTML to markdown, for messages that only carry an HTML body.
//!
//! Only inline emphasis and line structure survive:
//! - `<b>`/`<strong>` → `**…**`, `<i>`/`<em>` → `*…*`
//! - `<br>` and `<p>`/`</p>` → newline
//! - `<script>`, `<style>` and `<head>` blocks are dropped with their contents
//! - every other tag is removed, its contents kept
//! - common entities and non-breaking spaces are decoded
//!
//! Matching is non-greedy and does not understand nesting; an unterminated
//! `<b>` is simply stripped by the generic tag rule.

use std::sync::OnceLock;

use regex::Regex;

use super::codec::decode_html_entities;

struct Rules {
    blocks: Regex,
    bold: Regex,
    strong: Regex,
    italic: Regex,
    em: Regex,
    line_break: Regex,
    paragraph: Regex,
    any_tag: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("valid HTML rule regex");
        Rules {
            blocks: re(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>"),
            bold: re(r"(?is)<b(?:\s[^>]*)?>(.*?)</b\s*>"),
            strong: re(r"(?is)<strong(?:\s[^>]*)?>(.*?)</strong\s*>"),
            italic: re(r"(?is)<i(?:\s[^>]*)?>(.*?)</i\s*>"),
            em: re(r"(?is)<em(?:\s[^>]*)?>(.*?)</em\s*>"),
            line_break: re(r"(?i)<br\s*/?\s*>"),
            paragraph: re(r"(?i)</?p(?:\s[^>]*)?>"),
            any_tag: re(r"(?s)<[^>]*>"),
        }
    })
}

/// Convert an HTML body to markdown.
pub fn html_to_markdown(html: &str) -> String {
    let rules = rules();

    let text = rules.blocks.replace_all(html, "");
    let text = rules.bold.replace_all(&text, "**${1}**");
    let text = rules.strong.replace_all(&text, "**${1}**");
    let text = rules.italic.replace_all(&text, "*${1}*");
    let text = rules.em.replace_all(&text, "*${1}*");
    let text = rules.line_break.replace_all(&text, "\n");
    let text = rules.paragraph.replace_all(&text, "\n");
    let text = rules.any_tag.replace_all(&text, "");

    let text = decode_html_entities(&text)
        .replace("=C2=A0", " ")
        .replace('\u{a0}', " ");

    collapse_blank_lines(&text)
}

/// Trim every line and collapse runs of blank lines into one.
fn collapse_blank_lines(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut prev_was_blank = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }
    cleaned.trim().to_string()
}
