/// Financial terms pushing a message towards positive pertinency
pub const POSITIVE: &[(&str, i32)] = &[
    ("growth", 3),
    ("profit", 3),
    ("increase", 2),
    ("rise", 2),
    ("gain", 2),
    ("revenue", 2),
    ("strong", 3),
    ("surge", 4),
    ("outperform", 4),
    ("upgrade", 2),
    ("bullish", 3),
    ("record-high", 3),
    ("forecast", 3),
];

/// Financial terms pushing a message towards negative pertinency
pub const NEGATIVE: &[(&str, i32)] = &[
    ("decline", 3),
    ("loss", 3),
    ("drop", 2),
    ("fall", 2),
    ("decrease", 2),
    ("underperform", 4),
    ("weak", 3),
    ("plunge", 4),
    ("downgrade", 3),
    ("bearish", 3),
    ("recession", 4),
    ("sell-off", 4),
    ("warning", 4),
];

/// Phrases worth an extra point each when present
const EARNINGS_PHRASES: &[&str] = &["earnings report"];
const OUTLOOK_PHRASES: &[&str] = &["forecast", "dividends"];

/// Signed keyword weight of already lower-cased content.
///
/// Containment, not counting: each keyword contributes at most once.
pub fn weight(lowered: &str) -> i32 {
    let gains: i32 = POSITIVE
        .iter()
        .filter(|(word, _)| lowered.contains(word))
        .map(|(_, weight)| weight)
        .sum();
    let losses: i32 = NEGATIVE
        .iter()
        .filter(|(word, _)| lowered.contains(word))
        .map(|(_, weight)| weight)
        .sum();
    gains - losses
}

/// Context bonus of already lower-cased content
pub fn phrase_bonus(lowered: &str) -> i32 {
    let mentions = |phrases: &[&str]| phrases.iter().any(|phrase| lowered.contains(phrase));
    i32::from(mentions(EARNINGS_PHRASES)) + i32::from(mentions(OUTLOOK_PHRASES))
}
