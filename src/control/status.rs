use crate::error::{Result, ServiceError};

/// Parse a textual relay status.
///
/// `ON` / `TRUE` / `1` → `true`, `OFF` / `FALSE` / `0` → `false`.
/// Alphabetic forms are case-insensitive and surrounding whitespace is ignored.
pub fn parse_relay_status(token: &str) -> Result<bool> {
    let trimmed = token.trim();
    match trimmed.to_ascii_uppercase().as_str() {
        "ON" | "TRUE" | "1" => Ok(true),
        "OFF" | "FALSE" | "0" => Ok(false),
        _ => Err(ServiceError::InvalidStatus(trimmed.to_owned())),
    }
}

/// `"ON"` / `"OFF"`, as shown on the dashboard.
pub fn relay_label(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}
