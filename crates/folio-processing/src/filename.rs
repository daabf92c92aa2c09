//! Filename sanitizer and secure name generator
//!
//! Stored names never contain a path separator or any character outside
//! `[A-Za-z0-9._-]`, and their extension always comes from an allow-list.

use folio_core::ImageKind;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Extensions a stored file may carry. Anything else is stored as `.bin`.
pub const SAFE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "heic", "heif"];

const FALLBACK_NAME: &str = "upload";
const FALLBACK_EXTENSION: &str = "bin";
const THUMBNAIL_SUFFIX: &str = "-thumb.webp";
const TOKEN_LENGTH: usize = 13;
const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Reduce an untrusted name to a safe basename.
pub fn sanitize(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = basename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Lowercased extension of a sanitized name, if it is on the allow-list.
pub fn safe_extension(sanitized: &str) -> Option<String> {
    let (_, ext) = sanitized.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    SAFE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn random_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// `{unix_ms}-{13 random alnum}-{0..=999999}.{ext}`
pub fn generate_secure_name(original_name: &str) -> String {
    let sanitized = sanitize(original_name);
    let extension = safe_extension(&sanitized).unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: u32 = rand::rng().random_range(0..1_000_000);

    format!("{}-{}-{}.{}", timestamp_ms, random_token(), suffix, extension)
}

/// Swap a stored name's extension so it matches the bytes actually stored.
///
/// Names whose extension already denotes `kind` (`.jpeg` for JPEG) are left alone.
pub fn secure_name_for_format(stored_name: &str, kind: ImageKind) -> String {
    let (stem, ext) = stored_name.rsplit_once('.').unwrap_or((stored_name, ""));
    if ImageKind::from_extension(ext) == Some(kind) {
        return stored_name.to_string();
    }
    format!("{}.{}", stem, kind.extension())
}

/// `photo.jpg` -> `photo-thumb.webp`
pub fn thumbnail_name(original_name: &str) -> String {
    let basename = sanitize(original_name);
    let stem = match basename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => basename.as_str(),
    };
    format!("{}{}", stem, THUMBNAIL_SUFFIX)
}
