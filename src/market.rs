use crate::config::MarketDataConfig;
use log::debug;
use reqwest::Client;
use serde_derive::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-sibyl/0.1)";

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("market data request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("No data found for the ticker")]
    NoData,
    #[error("market data provider error: {0}")]
    Upstream(String),
}

/// Daily OHLC candle, timestamp in epoch milliseconds
#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
pub struct Candle {
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Price history source backed by the Yahoo chart API
pub struct PriceHistory {
    client: Client,
    config: MarketDataConfig,
}

impl PriceHistory {
    pub fn new(config: MarketDataConfig) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn candles(&self, ticker: &str) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.config.base_url.trim_end_matches('/'),
            ticker
        );
        debug!("Fetching price history from {}", url);
        let body = self
            .client
            .get(&url)
            .query(&[
                ("range", self.config.range.as_str()),
                ("interval", self.config.interval.as_str()),
            ])
            .send()
            .await?
            .text()
            .await?;
        parse_chart(&body)
    }
}

fn parse_chart(body: &str) -> Result<Vec<Candle>, MarketDataError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|err| MarketDataError::Upstream(err.to_string()))?;
    if let Some(error) = envelope.chart.error {
        return match error.code.as_str() {
            "Not Found" => Err(MarketDataError::NoData),
            _ => Err(MarketDataError::Upstream(format!(
                "{}: {}",
                error.code, error.description
            ))),
        };
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or(MarketDataError::NoData)?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    // Rows with a missing value are holidays or partial sessions
    let candles: Vec<Candle> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &seconds)| {
            Some(Candle {
                t: seconds * 1000,
                o: (*quote.open.get(i)?)?,
                h: (*quote.high.get(i)?)?,
                l: (*quote.low.get(i)?)?,
                c: (*quote.close.get(i)?)?,
            })
        })
        .collect();

    if candles.is_empty() {
        return Err(MarketDataError::NoData);
    }
    Ok(candles)
}
