use chrono::NaiveDateTime;

/// Timestamp layout produced by the dashboard's `datetime-local` inputs
pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Reformat a stored timestamp for display, leaving unknown layouts untouched
pub fn display(value: &str) -> String {
    NaiveDateTime::parse_from_str(value, INPUT_FORMAT)
        .map(|time| time.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|_| value.to_owned())
}
