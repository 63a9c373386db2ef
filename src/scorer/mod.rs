use crate::classifier::{Classification, Classifier, ClassifierError, Label};
use crate::config::{FailurePolicy, ScorerConfig};
use log::{info, warn};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;

mod keywords;
pub mod sentiment;

/// Scores at or beyond this magnitude leave the neutral band
const PERTINENCY_THRESHOLD: f64 = 5.0;
/// Weight of a fully confident classifier verdict
const CLASSIFIER_WEIGHT: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(#[from] ClassifierError),
}

/// Financial direction of a news item, stored as its numeric code
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Pertinency {
    Neutral = 0,
    Positive = 1,
    Negative = 2,
}

impl Pertinency {
    pub fn from_score(score: f64) -> Self {
        if score >= PERTINENCY_THRESHOLD {
            Pertinency::Positive
        } else if score <= -PERTINENCY_THRESHOLD {
            Pertinency::Negative
        } else {
            Pertinency::Neutral
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

impl Serialize for Pertinency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

/// A validated news item, ready to be scored
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInput {
    content: String,
    title: String,
    start_price: f64,
    end_price: f64,
}

impl ScoreInput {
    pub fn new(
        content: String,
        title: String,
        start_price: f64,
        end_price: f64,
    ) -> Result<Self, ScoreError> {
        if content.trim().is_empty() {
            return Err(ScoreError::InvalidInput(String::from("content is empty")));
        }
        for (name, price) in [("start_price", start_price), ("end_price", end_price)] {
            if !price.is_finite() {
                return Err(ScoreError::InvalidInput(format!("{} is not a number", name)));
            }
            if price <= 0.0 {
                return Err(ScoreError::InvalidInput(format!("{} must be positive", name)));
            }
        }
        Ok(Self {
            content,
            title,
            start_price,
            end_price,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_price(&self) -> f64 {
        self.start_price
    }

    pub fn end_price(&self) -> f64 {
        self.end_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutput {
    pub pertinency: Pertinency,
    pub sentiment: sentiment::Value,
    pub pertinency_score: f64,
    /// Price move in percent
    pub volatility: f64,
    /// Raw classifier verdict, absent when scoring fell back to keywords
    pub sentiment_label: Option<Label>,
    pub sentiment_confidence: Option<f64>,
}

/// Derives pertinency and sentiment for submitted news
pub struct Scorer {
    classifier: Arc<dyn Classifier>,
    on_failure: FailurePolicy,
}

impl Scorer {
    pub fn new(classifier: Arc<dyn Classifier>, config: &ScorerConfig) -> Self {
        Self {
            classifier,
            on_failure: config.on_classifier_failure,
        }
    }

    pub async fn score(&self, input: &ScoreInput) -> Result<ScoreOutput, ScoreError> {
        let lowered = input.content.to_lowercase();
        let classification = self.classify(&input.content).await?;

        let mut pertinency_score = f64::from(keywords::weight(&lowered));
        if let Some(Classification { label, confidence }) = classification {
            match label {
                Label::Positive => pertinency_score += confidence * CLASSIFIER_WEIGHT,
                Label::Negative => pertinency_score -= confidence * CLASSIFIER_WEIGHT,
                Label::Neutral => {}
            }
        }
        pertinency_score += f64::from(keywords::phrase_bonus(&lowered));

        let volatility = sentiment::volatility(input.start_price, input.end_price);
        let output = ScoreOutput {
            pertinency: Pertinency::from_score(pertinency_score),
            sentiment: sentiment::from_volatility(volatility),
            pertinency_score,
            volatility,
            sentiment_label: classification.map(|c| c.label),
            sentiment_confidence: classification.map(|c| c.confidence),
        };
        info!(
            "Scored \"{title}\": pertinency {pertinency:?} ({score:.2}), sentiment {sentiment}, classifier {label:?} @ {confidence:?}",
            title = input.title,
            pertinency = output.pertinency,
            score = output.pertinency_score,
            sentiment = output.sentiment,
            label = output.sentiment_label,
            confidence = output.sentiment_confidence,
        );
        Ok(output)
    }

    async fn classify(&self, content: &str) -> Result<Option<Classification>, ScoreError> {
        match self.classifier.classify(content).await {
            Ok(classification) => Ok(Some(classification)),
            Err(err) => match self.on_failure {
                FailurePolicy::Reject => Err(ScoreError::ClassifierUnavailable(err)),
                FailurePolicy::KeywordsOnly => {
                    warn!("Classifier unavailable, scoring on keywords only: {}", err);
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::testing::{Fixed, Recording, Scripted};

    fn scorer(classifier: impl Classifier + 'static) -> Scorer {
        Scorer::new(Arc::new(classifier), &ScorerConfig::default())
    }

    fn input(content: &str, start_price: f64, end_price: f64) -> ScoreInput {
        ScoreInput::new(content.into(), "Headline".into(), start_price, end_price).unwrap()
    }

    #[actix_rt::test]
    async fn plain_news_is_neutral() {
        let output = scorer(Fixed::neutral())
            .score(&input("The company holds its annual meeting", 100.0, 101.0))
            .await
            .unwrap();
        assert_eq!(output.pertinency_score, 0.0);
        assert_eq!(output.pertinency, Pertinency::Neutral);
        assert_eq!(output.sentiment, 1);
        assert_eq!(output.sentiment_label, Some(Label::Neutral));
    }

    #[actix_rt::test]
    async fn classifier_reads_content_as_written() {
        let recording = Arc::new(Recording::default());
        let scorer = Scorer::new(recording.clone(), &ScorerConfig::default());
        let output = scorer
            .score(&input("Strong GROWTH Ahead", 100.0, 105.0))
            .await
            .unwrap();
        assert_eq!(recording.seen(), vec![String::from("Strong GROWTH Ahead")]);
        // keywords still match case-insensitively: strong(3) + growth(3)
        assert_eq!(output.pertinency_score, 6.0);
        assert_eq!(output.pertinency, Pertinency::Positive);
    }

    #[actix_rt::test]
    async fn bullish_forecast_is_positive() {
        let output = scorer(Fixed::neutral())
            .score(&input("Analysts turn bullish on the forecast", 100.0, 110.0))
            .await
            .unwrap();
        // bullish(3) + forecast(3) + outlook bonus(1)
        assert_eq!(output.pertinency_score, 7.0);
        assert_eq!(output.pertinency, Pertinency::Positive);
        assert_eq!(output.sentiment, 5);
    }

    #[actix_rt::test]
    async fn confident_classifier_alone_reaches_threshold() {
        let output = scorer(Fixed::new(Label::Positive, 1.0))
            .score(&input("The company holds its annual meeting", 100.0, 102.5))
            .await
            .unwrap();
        assert_eq!(output.pertinency_score, 5.0);
        assert_eq!(output.pertinency, Pertinency::Positive);
        assert_eq!(output.sentiment, 2);
    }

    #[actix_rt::test]
    async fn negative_news_is_negative() {
        let output = scorer(Fixed::new(Label::Negative, 0.5))
            .score(&input("Shares plunge on recession fears", 100.0, 92.0))
            .await
            .unwrap();
        // -4 - 4 - 2.5
        assert_eq!(output.pertinency_score, -10.5);
        assert_eq!(output.pertinency, Pertinency::Negative);
        assert_eq!(output.sentiment, 4);
        assert_eq!(output.sentiment_confidence, Some(0.5));
    }

    #[actix_rt::test]
    async fn phrase_bonus_applies_before_thresholding() {
        // profit(3) + earnings report(1) + dividends(1)
        let output = scorer(Fixed::neutral())
            .score(&input(
                "Earnings report shows profit, dividends maintained",
                100.0,
                100.0,
            ))
            .await
            .unwrap();
        assert_eq!(output.pertinency_score, 5.0);
        assert_eq!(output.pertinency, Pertinency::Positive);
    }

    #[actix_rt::test]
    async fn scoring_is_idempotent() {
        let scorer = scorer(Fixed::new(Label::Negative, 0.7));
        let news = input("Weak guidance triggers a sell-off", 20.0, 18.0);
        let first = scorer.score(&news).await.unwrap();
        let second = scorer.score(&news).await.unwrap();
        assert_eq!(first, second);
    }

    #[actix_rt::test]
    async fn classifier_failure_is_rejected_by_default() {
        let err = scorer(Scripted::failing())
            .score(&input("Revenue growth continues", 100.0, 101.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::ClassifierUnavailable(_)));
    }

    #[actix_rt::test]
    async fn classifier_failure_can_degrade_to_keywords() {
        let config = ScorerConfig {
            on_classifier_failure: FailurePolicy::KeywordsOnly,
        };
        let scorer = Scorer::new(Arc::new(Scripted::failing()), &config);
        let output = scorer
            .score(&input("Revenue growth continues", 100.0, 101.0))
            .await
            .unwrap();
        // revenue(2) + growth(3)
        assert_eq!(output.pertinency_score, 5.0);
        assert_eq!(output.pertinency, Pertinency::Positive);
        assert_eq!(output.sentiment_label, None);
        assert_eq!(output.sentiment_confidence, None);
    }

    #[test]
    fn zero_start_price_is_invalid() {
        for end_price in [0.0, 10.0, 1e9] {
            let err = ScoreInput::new("news".into(), "t".into(), 0.0, end_price).unwrap_err();
            assert!(matches!(err, ScoreError::InvalidInput(_)));
        }
    }

    #[test]
    fn malformed_input_is_invalid() {
        assert!(ScoreInput::new("  ".into(), "t".into(), 1.0, 2.0).is_err());
        assert!(ScoreInput::new("news".into(), "t".into(), f64::NAN, 2.0).is_err());
        assert!(ScoreInput::new("news".into(), "t".into(), 1.0, f64::INFINITY).is_err());
        assert!(ScoreInput::new("news".into(), "t".into(), -1.0, 2.0).is_err());
        assert!(ScoreInput::new("news".into(), "".into(), 1.0, 2.0).is_ok());
    }

    #[test]
    fn pertinency_codes_match_storage() {
        assert_eq!(Pertinency::Neutral.code(), 0);
        assert_eq!(Pertinency::Positive.code(), 1);
        assert_eq!(Pertinency::Negative.code(), 2);
        assert_eq!(Pertinency::from_score(-5.0), Pertinency::Negative);
        assert_eq!(Pertinency::from_score(4.99), Pertinency::Neutral);
    }
}
