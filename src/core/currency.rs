//! Currency code handling

use anyhow::{Result, bail};

/// Normalizes a currency code to its canonical upper-case form.
///
/// Codes are ISO-4217-like: any non-empty run of ASCII letters or digits
/// is accepted, so the backend stays the authority on which codes exist.
pub fn normalize_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        bail!("Currency code must not be empty");
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("Invalid currency code: {}", trimmed);
    }
    Ok(trimmed.to_ascii_uppercase())
}
