//! Display formatting helpers for amounts and prices

/// Format a signed amount trimmed to 8 decimal places, dropping trailing
/// zeros.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{amount:.8}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');

    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format a price at the given decimal precision.
pub fn format_price(price: f64, precision: u32) -> String {
    format!("{:.1$}", price, precision as usize)
}
