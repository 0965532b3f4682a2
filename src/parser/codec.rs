//! Transfer-encoding and entity primitives. Pure functions, no shared state.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Decode a base64 body, ignoring all whitespace (line wrapping).
///
/// Invalid alphabet or padding is an error; callers decide whether to drop
/// the part or keep the raw text.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned)
}

/// Decode quoted-printable: `=XX` → byte, `=` at end of line → soft break.
///
/// Anything that is not a valid escape passes through unchanged.
pub fn decode_quoted_printable(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }
        match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(b'\n'), _) => i += 2,
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    result.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    result.push(b'=');
                    i += 1;
                }
            },
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }
    result
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Bytes of an identity-encoded body, one byte per character.
///
/// Only characters up to U+00FF have a byte; anything above returns `None`.
pub fn bytes_per_char(input: &str) -> Option<Vec<u8>> {
    input.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

/// Decode the handful of HTML entities mail clients actually emit.
///
/// `&amp;` goes last so `&amp;lt;` decodes once, to `&lt;`.
pub fn decode_html_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_ignores_line_wrapping() {
        let decoded = decode_base64("SGVs\r\nbG8g\n d29y bGQ=\n").unwrap();
        assert_eq!(decoded, b"Hello world");
    }

    #[test]
    fn test_base64_rejects_invalid_alphabet() {
        assert!(decode_base64("SGVsbG8*!!").is_err());
    }

    #[test]
    fn test_quoted_printable_escapes() {
        assert_eq!(decode_quoted_printable("caf=C3=A9"), "café".as_bytes());
        assert_eq!(decode_quoted_printable("a=3Db"), b"a=b");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        assert_eq!(decode_quoted_printable("long =\nline"), b"long line");
        assert_eq!(decode_quoted_printable("long =\r\nline"), b"long line");
    }

    #[test]
    fn test_quoted_printable_passes_invalid_escapes() {
        assert_eq!(decode_quoted_printable("100=ZZ ="), b"100=ZZ =");
    }

    #[test]
    fn test_bytes_per_char() {
        assert_eq!(bytes_per_char("GIF\n"), Some(b"GIF\n".to_vec()));
        assert_eq!(bytes_per_char("\u{e9}\u{ff}\0"), Some(vec![0xE9, 0xFF, 0x00]));
        assert_eq!(bytes_per_char("\u{100}"), None);
        assert_eq!(bytes_per_char("\u{fffd}"), None);
    }

    #[test]
    fn test_html_entities() {
        assert_eq!(
            decode_html_entities("Tom &amp; Jerry &lt;3&gt; &quot;hi&quot; it&#x27;s&nbsp;ok"),
            "Tom & Jerry <3> \"hi\" it's ok"
        );
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
    }
}
