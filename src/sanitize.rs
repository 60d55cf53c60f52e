/// Placeholder written by spreadsheet automations for "no value".
const SENTINEL: &str = "N/A";

/// Cleans an optional attribution field (`fbp`, `fbc`, `event_id`, `click_id`, `test_event_code`).
///
/// Returns `None` for absent, blank or `N/A` (any case) values, otherwise the
/// trimmed string. Applying it twice gives the same result as applying it once.
pub fn sanitize_field(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(SENTINEL) {
        return None;
    }

    Some(trimmed.to_string())
}
