//! Conversion between typed values and raw entry strings.
//!
//! Parsing is locale-independent and never fails loudly: a value that does not
//! parse yields `None` and the caller falls back to its default.

use std::{env, mem, path::Path};

/// Types that can be written as a raw entry string.
pub trait ToConfig {
    /// Render as a raw entry value.
    fn to_config(&self) -> String;
}

/// Types that can be read back from a raw entry string.
pub trait FromConfig: Sized {
    /// Parse a raw entry value. `None` means "use the default".
    fn from_config(raw: &str) -> Option<Self>;
}

impl<T: ToConfig + ?Sized> ToConfig for &T {
    fn to_config(&self) -> String {
        (**self).to_config()
    }
}

impl ToConfig for str {
    fn to_config(&self) -> String {
        self.to_string()
    }
}

impl ToConfig for String {
    fn to_config(&self) -> String {
        self.clone()
    }
}

impl FromConfig for String {
    fn from_config(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl ToConfig for bool {
    fn to_config(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }
}

impl FromConfig for bool {
    fn from_config(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Implement both conversions for types with `Display` and `FromStr`.
macro_rules! numeric {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToConfig for $t {
                fn to_config(&self) -> String {
                    self.to_string()
                }
            }

            impl FromConfig for $t {
                fn from_config(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

numeric!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64);

impl<T: ToConfig> ToConfig for [T] {
    fn to_config(&self) -> String {
        let items: Vec<String> = self.iter().map(ToConfig::to_config).collect();
        join_list(&items)
    }
}

impl<T: ToConfig> ToConfig for Vec<T> {
    fn to_config(&self) -> String {
        self.as_slice().to_config()
    }
}

impl<T: FromConfig> FromConfig for Vec<T> {
    fn from_config(raw: &str) -> Option<Self> {
        split_list(raw).iter().map(|s| T::from_config(s)).collect()
    }
}

/// Encode a list with `,` separators. `\` and `,` inside items are escaped.
///
/// The empty list is the empty string; a list holding one empty item is `\0`.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] if only.as_ref().is_empty() => "\\0".to_string(),
        _ => items
            .iter()
            .map(|s| s.as_ref().replace('\\', "\\\\").replace(',', "\\,"))
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Decode a `,`-separated list written by [`join_list`].
pub fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    if raw == "\\0" {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    for c in raw.chars() {
        if quoted {
            cur.push(c);
            quoted = false;
        } else if c == '\\' {
            quoted = true;
        } else if c == ',' {
            out.push(mem::take(&mut cur));
        } else {
            cur.push(c);
        }
    }
    out.push(cur);
    out
}

/// Encode an XDG-style list: every item is followed by `;`.
pub fn join_xdg_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for s in items {
        out.push_str(&s.as_ref().replace('\\', "\\\\").replace(';', "\\;"));
        out.push(';');
    }
    out
}

/// Decode an XDG-style `;`-separated list. A trailing empty item is dropped.
pub fn split_xdg_list(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    for c in raw.chars() {
        if quoted {
            cur.push(c);
            quoted = false;
        } else if c == '\\' {
            quoted = true;
        } else if c == ';' {
            out.push(mem::take(&mut cur));
        } else {
            cur.push(c);
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Expand `$VAR`, `${VAR}` and `$$` using the process environment.
pub fn expand_env(raw: &str) -> String {
    expand_with(raw, |name| env::var(name).ok())
}

/// Expand `$VAR`, `${VAR}` and `$$` using `lookup`. Unknown variables expand to nothing.
pub fn expand_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                    rest = &braced[end + 1..];
                }
                None => {
                    out.push('$');
                    rest = after;
                }
            }
        } else {
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                out.push('$');
            } else {
                out.push_str(&lookup(&after[..len]).unwrap_or_default());
            }
            rest = &after[len..];
        }
    }
    out.push_str(rest);
    out
}

/// Prepare a path for storage: `$` is doubled and a leading home directory
/// becomes `$HOME`, so the entry can be read back with expansion on.
pub fn translate_path(path: &str, home: Option<&Path>) -> String {
    if path.is_empty() {
        return String::new();
    }
    let escaped = path.replace('$', "$$");
    if !Path::new(path).is_absolute() {
        return escaped;
    }
    let Some(home) = home.and_then(Path::to_str).map(|h| h.replace('$', "$$")) else {
        return escaped;
    };
    let home = home.trim_end_matches('/');
    match escaped.strip_prefix(home) {
        Some(rest) if !home.is_empty() && (rest.is_empty() || rest.starts_with('/')) => {
            format!("$HOME{rest}")
        }
        _ => escaped,
    }
}
