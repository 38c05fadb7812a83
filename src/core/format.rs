/// Formats an exchange rate with a precision that depends on its magnitude.
///
/// Large rates get 2 decimals, rates from 1 up to 1000 get 4, and
/// fractional rates get 6. Both boundaries are inclusive on the upper side.
pub fn format_rate(rate: f64) -> String {
    if rate >= 1000.0 {
        format!("{rate:.2}")
    } else if rate >= 1.0 {
        format!("{rate:.4}")
    } else {
        format!("{rate:.6}")
    }
}

/// Formats a signed percentage change.
pub fn format_change(change: f64) -> String {
    format!("{change:+.2}%")
}
