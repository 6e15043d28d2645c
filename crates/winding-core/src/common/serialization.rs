use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

/// Pretty JSON with a trailing newline.
pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    write_text_artifact(path, &content)
}

/// Drops spaces and colons, then replaces every character outside
/// `[A-Za-z0-9._+-]` with `_`.
pub fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .filter(|character| !matches!(character, ' ' | ':'))
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '.' | '_' | '+' | '-') {
                character
            } else {
                '_'
            }
        })
        .collect()
}
