use std::{borrow::Cow, fmt::Write as _};

/// Escape the C0 and C1 control characters (and DEL) found in `input`
/// as `\xHH` sequences, so that client controlled text can not
/// inject fake log lines or terminal escape codes.
///
/// Returns the input as-is if nothing had to be escaped.
pub fn escape_control_chars(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_escaped_control_char) {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if is_escaped_control_char(c) {
            let _ = write!(output, "\\x{:02x}", c as u32);
        } else {
            output.push(c);
        }
    }
    Cow::Owned(output)
}

#[inline(always)]
fn is_escaped_control_char(c: char) -> bool {
    matches!(c as u32, 0x00..=0x1f | 0x7f..=0x9f)
}
