use crate::error::ApiError;
use crate::scorer::{ScoreError, ScoreInput, ScoreOutput};
use crate::store::{Announcement, MessageFields, SentimentSummary, Stock};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

const MISSING_FIELDS: &str = "Missing required fields";
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// News item as posted by the dashboard. Every field is optional here so that
/// absent values surface as a 400 instead of a deserialization failure.
#[derive(Deserialize, Debug, Default)]
pub struct MessageRequest {
    pub stock_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub source: Option<String>,
    pub start_price: Option<Value>,
    pub end_price: Option<Value>,
    pub date_time: Option<String>,
}

/// A message that passed boundary validation
#[derive(Debug)]
pub struct Submission {
    pub stock_id: i64,
    pub fields: MessageFields,
    pub input: ScoreInput,
}

impl MessageRequest {
    pub fn into_submission(mut self) -> Result<Submission, ApiError> {
        let stock_id = self
            .stock_id
            .take()
            .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.into()))?;
        let (fields, input) = self.into_fields()?;
        Ok(Submission {
            stock_id,
            fields,
            input,
        })
    }

    pub fn into_fields(self) -> Result<(MessageFields, ScoreInput), ApiError> {
        let title = required(self.title)?;
        let source = required(self.source)?;
        let date_time = required(self.date_time)?;
        let content = self
            .content
            .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.into()))?;
        let start_price = price(self.start_price, "start_price")?;
        let end_price = price(self.end_price, "end_price")?;

        let input = ScoreInput::new(content, title, start_price, end_price)?;
        let fields = MessageFields {
            title: input.title().to_owned(),
            content: input.content().to_owned(),
            source,
            start_price,
            end_price,
            date_time,
        };
        Ok((fields, input))
    }
}

/// A non-blank string field
pub fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.into()))
}

/// Prices arrive as JSON numbers or numeric strings
fn price(value: Option<Value>, name: &str) -> Result<f64, ApiError> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS.into()))?;
    let parsed = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ScoreError::InvalidInput(format!("{} is not a number", name)).into())
}

#[derive(Deserialize, Debug)]
pub struct NewStock {
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NewAnnouncement {
    pub stock_id: Option<i64>,
    pub title: Option<String>,
    pub date_time: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NewDescription {
    pub stock_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DescriptionUpdate {
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SearchRequest {
    pub query: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StockQuery {
    pub stock_id: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct MessagesQuery {
    pub stock_id: Option<i64>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Deserialize, Debug)]
pub struct AnnouncementsQuery {
    pub symbol: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct Confirmation {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Confirmation {
    pub fn new(message: &'static str) -> Self {
        Self { message, id: None }
    }

    pub fn with_id(message: &'static str, id: i64) -> Self {
        Self {
            message,
            id: Some(id),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct MessageScored {
    pub message: &'static str,
    pub id: i64,
    #[serde(flatten)]
    pub score: ScoreOutput,
}

#[derive(Serialize, Debug)]
pub struct StockInfo {
    pub id: i64,
    pub name: String,
    pub latest_announcement: Option<Announcement>,
    pub mean_sentiment: f64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub buy_sell: &'static str,
}

impl StockInfo {
    pub fn new(
        stock: Stock,
        latest_announcement: Option<Announcement>,
        summary: SentimentSummary,
    ) -> Self {
        Self {
            id: stock.id,
            name: stock.name,
            latest_announcement,
            mean_sentiment: summary.mean_sentiment,
            positive_count: summary.positive_count,
            negative_count: summary.negative_count,
            buy_sell: summary.recommendation(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct DashboardSettings {
    pub symbol: String,
}

#[derive(Serialize, Debug)]
pub struct DescriptionBody {
    pub description: Option<String>,
}
