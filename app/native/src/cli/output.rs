//! Terminal rendering shared by the commands.

use std::borrow::Cow;

use colored::Colorize;
use serde::Serialize;

/// Pretty-prints `value` as JSON with object keys highlighted.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let pretty = serde_json::to_string_pretty(value)?;
    for line in pretty.lines() {
        println!("{}", highlight_key(line));
    }
    Ok(())
}

/// Colors the key of a `"key": value` line; any other line is left alone.
fn highlight_key(line: &str) -> Cow<'_, str> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    match split_key(body) {
        Some((key, rest)) => Cow::Owned(format!("{indent}{}{rest}", key.cyan())),
        None => Cow::Borrowed(line),
    }
}

/// Splits `"key": value` right after the key's closing quote.
fn split_key(body: &str) -> Option<(&str, &str)> {
    if !body.starts_with('"') {
        return None;
    }

    let mut escaped = false;
    for (i, ch) in body.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                let (key, rest) = body.split_at(i + 1);
                return rest.starts_with(':').then_some((key, rest));
            }
            _ => {}
        }
    }
    None
}

/// Cuts `text` to at most `max_chars` characters, ending in `…` when shortened.
#[must_use]
pub fn shorten(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.char_indices().nth(max_chars).is_none() {
        return Cow::Borrowed(text);
    }
    let cut = text.char_indices().nth(max_chars.saturating_sub(1)).map_or(0, |(i, _)| i);
    Cow::Owned(format!("{}…", &text[..cut]))
}
