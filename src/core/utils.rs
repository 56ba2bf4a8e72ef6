//! Small string and size helpers shared by the download and Telegram layers.

/// Bytes in one MiB.
pub const MIB: u64 = 1_048_576;

/// File size in whole MiB, rounded to nearest.
///
/// # Example
///
/// ```
/// use drivelink::core::utils::size_in_mib;
///
/// assert_eq!(size_in_mib(1_572_864), 2);
/// assert_eq!(size_in_mib(500_000), 0);
/// ```
pub fn size_in_mib(bytes: u64) -> u64 {
    (bytes as f64 / MIB as f64).round() as u64
}

/// Escapes text for Telegram's HTML parse mode.
///
/// Only `&`, `<`, `>` and `"` need escaping; `&` goes first so entities are not doubled.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 16);

    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }

    result
}

/// Turns an untrusted file name (URL segment, Content-Disposition) into a single safe
/// path component.
///
/// Path separators and control characters become `_`, leading dots are stripped so the
/// result can never be `.`/`..` or hidden, and an empty result becomes `download`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.').trim();
    if trimmed.is_empty() {
        return "download".to_string();
    }

    // Keep well under common filesystem limits (255 bytes)
    let mut out = String::with_capacity(trimmed.len().min(200));
    for c in trimmed.chars() {
        if out.len() + c.len_utf8() > 200 {
            break;
        }
        out.push(c);
    }
    out
}

/// Shortens error text for a chat message; long reqwest/io chains are useless to users.
pub fn truncate_for_chat(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
