//! Record codec: packs a list of string fields into one line and back.
//!
//! Packed line format:
//!   field ( ',' field )*
//!
//! Every field is escaped individually:
//!   \     -> \\
//!   ,     -> \c
//!   "     -> \"
//!   (CR)  -> \r
//!   (LF)  -> \n
//!   (TAB) -> \t
//!
//! An empty field is written as the quoted-empty marker `""` so it stays
//! visible between separators. The empty field list packs to the empty line,
//! `[""]` packs to `""` and `["", ""]` packs to `"",""`.
//!
//! Other characters (even unprintable ones) are written as-is. The codec is
//! purely textual: no I/O, no state.

/// Field separator inside a packed line
pub const SEPARATOR: char = ',';

/// Escape marker
pub const ESCAPE: char = '\\';

/// Packed form of an empty field
pub const QUOTED_EMPTY: &str = "\"\"";

/// Line terminator written after every record
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";

/// Line terminator written after every record
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Pack fields into a single line. The result never contains a raw CR or LF.
pub fn encode<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(SEPARATOR);
        }
        escape_into(field.as_ref(), &mut line);
    }
    line
}

/// Unpack a line produced by [`encode`].
///
/// Splits on every raw separator (keeping leading and trailing empty splits),
/// strips the exact quoted-empty marker and unescapes everything else.
/// An unknown escape such as `\x` yields `x`; a dangling `\` at the end of a
/// field is dropped.
pub fn decode(line: &str) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    line.split(SEPARATOR).map(unescape).collect()
}

fn escape_into(value: &str, out: &mut String) {
    if value.is_empty() {
        out.push_str(QUOTED_EMPTY);
        return;
    }
    out.reserve(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\c"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
}

fn unescape(value: &str) -> String {
    if value == QUOTED_EMPTY {
        return String::new();
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != ESCAPE {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('c') => out.push(','),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
