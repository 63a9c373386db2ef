use crate::market::MarketDataError;
use crate::scorer::ScoreError;
use crate::store::StoreError;
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_derive::Serialize;
use thiserror::Error;

/// JSON body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
    #[error("worker pool unavailable")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Score(ScoreError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Score(ScoreError::ClassifierUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::MarketData(MarketDataError::NoData) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::MarketData(_) | ApiError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
