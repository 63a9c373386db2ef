use super::{Classification, Classifier, ClassifierError, Label};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde_derive::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize, Debug)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Text-classification payloads as returned by Hugging Face style inference servers
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Failure { error: String },
}

/// Classifier served over HTTP, e.g. a FinBERT inference endpoint
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl RemoteClassifier {
    pub fn new(
        endpoint: String,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_token,
            timeout,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ClassifierError {
        if err.is_timeout() {
            ClassifierError::Timeout(self.timeout)
        } else {
            ClassifierError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&InferenceRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!("Classifier answered {}: {}", status, body);

        parse_response(&accepted(status, body)?)
    }
}

/// Any 2xx answer carries a verdict, everything else is a rejection
fn accepted(status: StatusCode, body: String) -> Result<String, ClassifierError> {
    if !status.is_success() {
        return Err(ClassifierError::Rejected {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(body)
}

/// Pick the highest scoring label of an inference response
fn parse_response(body: &str) -> Result<Classification, ClassifierError> {
    let parsed: InferenceResponse =
        serde_json::from_str(body).map_err(|err| ClassifierError::Malformed(err.to_string()))?;
    let candidates = match parsed {
        InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        InferenceResponse::Flat(candidates) => candidates,
        InferenceResponse::Failure { error } => return Err(ClassifierError::Malformed(error)),
    };
    let best = candidates
        .into_iter()
        .filter(|candidate| candidate.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| ClassifierError::Malformed(String::from("no labels returned")))?;
    Classification::new(Label::parse(&best.label), best.score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_response_picks_top_label() {
        let body = r#"[[{"label":"neutral","score":0.1},{"label":"negative","score":0.85},{"label":"positive","score":0.05}]]"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.label, Label::Negative);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn flat_response_is_accepted() {
        let body = r#"[{"label":"positive","score":0.97}]"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.label, Label::Positive);
    }

    #[test]
    fn server_side_errors_are_malformed() {
        let err = parse_response(r#"{"error":"Model is loading"}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::Malformed(msg) if msg == "Model is loading"));
    }

    #[test]
    fn any_success_status_is_accepted() {
        assert!(accepted(StatusCode::OK, String::new()).is_ok());
        assert!(accepted(StatusCode::CREATED, String::new()).is_ok());
        let err = accepted(StatusCode::SERVICE_UNAVAILABLE, String::from("busy")).unwrap_err();
        assert!(matches!(err, ClassifierError::Rejected { status: 503, .. }));
        assert!(err.is_transient());
        let err = accepted(StatusCode::BAD_REQUEST, String::new()).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn empty_or_invalid_payloads_are_rejected() {
        assert!(parse_response("[]").is_err());
        assert!(parse_response("[[]]").is_err());
        assert!(parse_response("not json").is_err());
        assert!(parse_response(r#"[{"label":"positive","score":3.0}]"#).is_err());
    }
}
