//! ID generation utilities.

use uuid::Uuid;

/// Generate a new UUID v4, used as a connection profile id.
pub fn uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Check whether `id` could be a profile id prefix (hex digits and dashes).
pub fn is_id_like(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}
