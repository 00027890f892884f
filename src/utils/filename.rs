//! Portable report filenames.
//!
//! Permission set names end up in inline policy filenames, and those names
//! may contain characters that are awkward or invalid on some filesystems.

use unicode_normalization::UnicodeNormalization;

/// Longest filename most filesystems accept.
pub const MAX_FILENAME_LEN: usize = 255;

const EXTRA_CHARS: &str = "-_.() ";

/// Make `filename` portable.
///
/// Spaces become underscores, accented letters lose their accents, and
/// anything other than ASCII letters, digits and `-_.() ` is dropped. The
/// result is cut to [`MAX_FILENAME_LEN`] characters.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .replace(' ', "_")
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || EXTRA_CHARS.contains(*c))
        .collect();

    if cleaned.len() > MAX_FILENAME_LEN {
        eprintln!(
            "⚠️  Filename truncated to {} characters, it may no longer be unique: {}",
            MAX_FILENAME_LEN, cleaned
        );
        return cleaned[..MAX_FILENAME_LEN].to_string();
    }

    cleaned
}
