/// Express market reaction as a magnitude between `1` & `5`.
/// Polarity is not part of it: a 10% drop scores like a 10% jump.
pub type Value = u8;

/// Volatility thresholds in percent, highest first
const BUCKETS: [(f64, Value); 4] = [(10.0, 5), (7.5, 4), (5.0, 3), (2.5, 2)];

/// Absolute price move around the news, as a percentage of `start_price`
pub fn volatility(start_price: f64, end_price: f64) -> f64 {
    // Multiplying first keeps round inputs exact at the bucket boundaries
    (end_price - start_price).abs() * 100.0 / start_price
}

pub fn from_volatility(volatility: f64) -> Value {
    BUCKETS
        .iter()
        .find(|(threshold, _)| volatility >= *threshold)
        .map(|(_, value)| *value)
        .unwrap_or(1)
}
