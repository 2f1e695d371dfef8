/// Parse `HH:MM:SS` into milliseconds.
///
/// Exactly three colon-separated non-negative integers are required; minute
/// and second fields above 59 are accepted and simply add up. Anything else
/// yields `None`.
pub fn parse_hms(text: &str) -> Option<u64> {
    let mut fields = text.trim().split(':');
    let hours = parse_field(fields.next()?)?;
    let minutes = parse_field(fields.next()?)?;
    let seconds = parse_field(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    total.checked_mul(1000)
}

fn parse_field(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() || !field.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Render `ms` as zero-padded `HH:MM:SS`, dropping sub-second precision.
pub fn format_hms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
