//! Context-specific output encoding.
//!
//! These are for embedding decisions: rendering untrusted text into a
//! specific syntactic context instead of stripping it. They are independent
//! of the policy-driven sanitizer; a caller chooses encode vs. strip per
//! context. All three are stateless and defined for every input string.

/// Encode a string for placement inside an HTML attribute value.
///
/// Replaces `&`, `"`, `'`, `<`, `>`, newline, carriage return, and tab with
/// character references. The single pass guarantees `&` is never re-encoded
/// inside an already-inserted reference.
pub fn encode_for_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Encode a string for placement inside a CSS value or selector.
///
/// Every character outside `[A-Za-z0-9_-]` becomes a zero-padded six-digit
/// hex escape (`\XXXXXX`), which is unambiguous in any CSS context.
pub fn encode_for_css(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
        } else {
            out.push_str(&format!("\\{:06X}", ch as u32));
        }
    }
    out
}

/// Encode a string for placement inside a script string literal.
///
/// A fixed character table: quotes, backslash, forward slash, and control
/// characters map to escape sequences; everything else passes through.
pub fn encode_for_script_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for ch in input.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}
