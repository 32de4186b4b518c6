//! Escaping of keys, values and group names in the INI format.

use std::{fmt::Write, str};

/// Which part of a line a string is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// A group name inside `[...]`.
    Group,
    /// An entry key, left of `=`.
    Key,
    /// An entry value, right of `=`.
    Value,
}

/// Render `text` so that reading it back through [`unescape`] reproduces it.
pub fn escape(text: &str, field: Field) -> String {
    let mut out = String::with_capacity(text.len());
    let last = text.chars().count().saturating_sub(1);
    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if field != Field::Group && (i == 0 || i == last) => out.push_str("\\s"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '=' if field == Field::Key => push_hex(&mut out, c),
            '[' | ']' if field != Field::Value => push_hex(&mut out, c),
            '#' if field == Field::Key && i == 0 => push_hex(&mut out, c),
            '$' if field == Field::Group && i == 0 => push_hex(&mut out, c),
            c if c.is_ascii_control() => push_hex(&mut out, c),
            c => out.push(c),
        }
    }
    out
}

/// Append `\xNN` for an ASCII character.
fn push_hex(out: &mut String, c: char) {
    let _ignored = write!(out, "\\x{:02x}", u32::from(c));
}

/// Decode the escapes in `raw`.
///
/// `\;` and `\,` are kept verbatim so list parsers still see them. An unknown
/// escape keeps its backslash and is reported through `warn`.
pub fn unescape(raw: &str, mut warn: impl FnMut(String)) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let Some(&next) = bytes.get(i + 1) else {
            out.push(b'\\');
            break;
        };
        i += 2;
        match next {
            b's' => out.push(b' '),
            b't' => out.push(b'\t'),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b'\\' => out.push(b'\\'),
            b';' | b',' => out.extend_from_slice(&[b'\\', next]),
            b'x' => match bytes.get(i..i + 2).and_then(hex_byte) {
                Some(v) => {
                    out.push(v);
                    i += 2;
                }
                None => {
                    warn(format!("invalid \\x escape in {raw:?}"));
                    out.extend_from_slice(b"\\x");
                }
            },
            other => {
                warn(format!("invalid escape sequence \\{}", char::from(other)));
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse two hex digits.
fn hex_byte(pair: &[u8]) -> Option<u8> {
    let s = str::from_utf8(pair).ok()?;
    u8::from_str_radix(s, 16).ok()
}
