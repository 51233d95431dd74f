//! Cleanup applied to assistant output before it is sent to LINE.

/// Strip ANSI escape sequences (colors, cursor movement) and surrounding
/// whitespace. LINE renders them as garbage.
pub fn clean_output(raw: &str) -> String {
    let stripped = strip_ansi_escapes::strip(raw.as_bytes());
    String::from_utf8_lossy(&stripped).trim().to_string()
}
