//! Keeps template text and user input on a single log line.

/// Escape control characters and cap the preview length.
/// Escape sequences emitted by color instructions show up as `\x1B`.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Lossy single-line preview of raw output bytes.
pub fn preview_bytes(bytes: &[u8]) -> String {
    escape_log(&String::from_utf8_lossy(bytes))
}
