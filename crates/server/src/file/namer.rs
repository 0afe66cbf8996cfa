//! Stored filename generation.
//!
//! Names are `<millis>-<random><ext>`: milliseconds since the Unix epoch, a
//! random integer below one billion, and the extension of the client-supplied
//! name. Nothing here touches the filesystem.

use std::path::Path;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Exclusive upper bound of the random component.
const RANDOM_SPAN: u32 = 1_000_000_000;

/// Generate a stored filename from an explicit clock reading and random source.
pub fn generate_name<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    rng: &mut R,
    original_name: &str,
) -> String {
    let random = rng.gen_range(0..RANDOM_SPAN);
    format!(
        "{}-{}{}",
        now.timestamp_millis(),
        random,
        extension_of(original_name)
    )
}

/// Generate a stored filename using the system clock and thread-local RNG.
pub fn fresh_name(original_name: &str) -> String {
    generate_name(Utc::now(), &mut rand::thread_rng(), original_name)
}

/// Extension of `original_name` including the leading dot, or `""`.
///
/// The extension is copied verbatim from the client's name, case included.
/// Only the final path component is considered, and a leading dot alone
/// (`.bashrc`) does not count as an extension. `photo.` keeps its dot.
pub fn extension_of(original_name: &str) -> String {
    // Normalize Windows separators so `C:\photos\a.jpg` yields `.jpg`.
    let normalized = original_name.replace('\\', "/");
    match Path::new(&normalized).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{ext}"),
        None => String::new(),
    }
}
