use crate::config::{ClassifierConfig, ClassifierKind};
use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod lexicon;
mod remote;
mod retry;

pub use lexicon::LexiconClassifier;
pub use remote::RemoteClassifier;
pub use retry::Retrying;

/// Polarity reported by a sentiment classifier
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Negative,
    Neutral,
}

impl Label {
    /// Anything other than `positive`/`negative` counts as neutral
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Label::Positive,
            "negative" => Label::Negative,
            _ => Label::Neutral,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Label::Positive => "positive",
            Label::Negative => "negative",
            Label::Neutral => "neutral",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
pub struct Classification {
    pub label: Label,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: Label, confidence: f64) -> Result<Self, ClassifierError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ClassifierError::Malformed(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }
        Ok(Self { label, confidence })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("classifier transport error: {0}")]
    Transport(String),
    #[error("classifier rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

impl ClassifierError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifierError::Timeout(_) | ClassifierError::Transport(_) => true,
            ClassifierError::Rejected { status, .. } => *status == 429 || *status >= 500,
            ClassifierError::Malformed(_) => false,
        }
    }
}

/// Black-box text sentiment model
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

/// Build the configured classifier, wrapped with timeout and retry handling
pub fn from_config(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, String> {
    let retry = retry::Policy {
        timeout: Duration::from_millis(config.timeout_ms),
        retries: config.retries,
        backoff: Duration::from_millis(config.backoff_ms),
    };
    let classifier: Arc<dyn Classifier> = match config.kind {
        ClassifierKind::Lexicon => Arc::new(Retrying::new(LexiconClassifier::default(), retry)),
        ClassifierKind::Remote => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| String::from("A remote classifier requires an `endpoint`"))?;
            let remote = RemoteClassifier::new(endpoint, config.api_token.clone(), retry.timeout)
                .map_err(|e| format!("Could not build the classifier client. Reason: {}", e))?;
            Arc::new(Retrying::new(remote, retry))
        }
    };
    Ok(classifier)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Always answers with the same classification
    pub struct Fixed(pub Classification);

    impl Fixed {
        pub fn new(label: Label, confidence: f64) -> Self {
            Fixed(Classification { label, confidence })
        }

        pub fn neutral() -> Self {
            Self::new(Label::Neutral, 0.9)
        }
    }

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            Ok(self.0)
        }
    }

    /// Keeps every text it is asked about, answers neutral
    #[derive(Default)]
    pub struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        pub fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Classifier for Recording {
        async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
            self.seen.lock().unwrap().push(text.to_owned());
            Ok(Classification {
                label: Label::Neutral,
                confidence: 0.9,
            })
        }
    }

    /// Replays a scripted sequence of results, counting calls
    pub struct Scripted {
        pub calls: AtomicUsize,
        script: Mutex<Vec<Result<Classification, ClassifierError>>>,
    }

    impl Scripted {
        pub fn new(mut script: Vec<Result<Classification, ClassifierError>>) -> Self {
            script.reverse();
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script),
            }
        }

        pub fn failing() -> Self {
            Self::new(vec![Err(ClassifierError::Malformed("model exploded".into()))])
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for Scripted {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            // The last entry repeats forever
            if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script
                    .last()
                    .cloned()
                    .unwrap_or_else(|| Err(ClassifierError::Malformed("empty script".into())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_labels_are_neutral() {
        assert_eq!(Label::parse("Positive"), Label::Positive);
        assert_eq!(Label::parse("negative "), Label::Negative);
        assert_eq!(Label::parse("mixed"), Label::Neutral);
    }

    #[test]
    fn confidence_must_be_a_probability() {
        assert!(Classification::new(Label::Positive, 1.0).is_ok());
        assert!(Classification::new(Label::Positive, 1.2).is_err());
        assert!(Classification::new(Label::Negative, f64::NAN).is_err());
    }

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        let rejected = |status| ClassifierError::Rejected {
            status,
            message: String::new(),
        };
        assert!(rejected(429).is_transient());
        assert!(rejected(503).is_transient());
        assert!(!rejected(400).is_transient());
        assert!(!ClassifierError::Malformed("x".into()).is_transient());
        assert!(ClassifierError::Timeout(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn remote_without_endpoint_is_a_config_error() {
        let config = ClassifierConfig {
            kind: ClassifierKind::Remote,
            endpoint: None,
            ..ClassifierConfig::default()
        };
        assert!(from_config(&config).is_err());
    }
}
