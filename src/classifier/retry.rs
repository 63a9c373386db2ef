use super::{Classification, Classifier, ClassifierError};
use async_trait::async_trait;
use log::{error, warn};
use std::time::Duration;

/// Longest pause between two attempts
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Attempts made after the first one
    pub retries: u32,
    /// Delay before the first retry, doubled on each further retry up to `MAX_BACKOFF`
    pub backoff: Duration,
}

enum Action {
    RetryAfter(Duration),
    GiveUp,
}

/// Applies a per-attempt timeout and bounded exponential backoff to a classifier
pub struct Retrying<C> {
    inner: C,
    policy: Policy,
}

impl<C: Classifier> Retrying<C> {
    pub fn new(inner: C, policy: Policy) -> Self {
        Self { inner, policy }
    }

    /// Derive what to do after a failed attempt
    fn next_action(&self, attempt: u32, err: &ClassifierError) -> Action {
        if !err.is_transient() || attempt >= self.policy.retries {
            return Action::GiveUp;
        }
        Action::RetryAfter(backoff_delay(self.policy.backoff, attempt))
    }

    async fn attempt(&self, text: &str) -> Result<Classification, ClassifierError> {
        tokio::time::timeout(self.policy.timeout, self.inner.classify(text))
            .await
            .unwrap_or(Err(ClassifierError::Timeout(self.policy.timeout)))
    }
}

fn backoff_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

#[async_trait]
impl<C: Classifier> Classifier for Retrying<C> {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let mut attempt = 0;
        loop {
            let err = match self.attempt(text).await {
                Ok(classification) => return Ok(classification),
                Err(err) => err,
            };
            match self.next_action(attempt, &err) {
                Action::RetryAfter(delay) => {
                    warn!(
                        "Classifier attempt {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Action::GiveUp => {
                    error!("Classifier failed after {} attempt(s): {}", attempt + 1, err);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::testing::Scripted;
    use crate::classifier::Label;

    fn policy(retries: u32) -> Policy {
        Policy {
            timeout: Duration::from_millis(200),
            retries,
            backoff: Duration::from_millis(1),
        }
    }

    fn positive() -> Result<Classification, ClassifierError> {
        Ok(Classification {
            label: Label::Positive,
            confidence: 0.8,
        })
    }

    struct Stalled;

    #[async_trait]
    impl Classifier for Stalled {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(ClassifierError::Transport("unreachable".into()))
        }
    }

    #[actix_rt::test]
    async fn transient_failures_are_retried() {
        let script = Scripted::new(vec![
            Err(ClassifierError::Transport("connection reset".into())),
            Err(ClassifierError::Rejected {
                status: 503,
                message: "busy".into(),
            }),
            positive(),
        ]);
        let classifier = Retrying::new(script, policy(2));
        let result = classifier.classify("text").await.unwrap();
        assert_eq!(result.label, Label::Positive);
        assert_eq!(classifier.inner.calls(), 3);
    }

    #[actix_rt::test]
    async fn retries_are_bounded() {
        let script = Scripted::new(vec![Err(ClassifierError::Transport("down".into()))]);
        let classifier = Retrying::new(script, policy(2));
        assert!(classifier.classify("text").await.is_err());
        assert_eq!(classifier.inner.calls(), 3);
    }

    #[actix_rt::test]
    async fn permanent_failures_are_not_retried() {
        let classifier = Retrying::new(Scripted::failing(), policy(5));
        let err = classifier.classify("text").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Malformed(_)));
        assert_eq!(classifier.inner.calls(), 1);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 0), base);
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 40), MAX_BACKOFF);
        assert_eq!(backoff_delay(Duration::from_secs(u64::MAX), 3), MAX_BACKOFF);
    }

    #[test]
    fn late_retries_wait_at_most_the_cap() {
        let classifier = Retrying::new(
            Scripted::failing(),
            Policy {
                timeout: Duration::from_millis(10),
                retries: u32::MAX,
                backoff: Duration::from_secs(3600),
            },
        );
        let err = ClassifierError::Transport("down".into());
        match classifier.next_action(1000, &err) {
            Action::RetryAfter(delay) => assert_eq!(delay, MAX_BACKOFF),
            Action::GiveUp => panic!("transient error within the retry budget"),
        }
    }

    #[actix_rt::test]
    async fn slow_classifier_times_out() {
        let classifier = Retrying::new(
            Stalled,
            Policy {
                timeout: Duration::from_millis(10),
                retries: 0,
                backoff: Duration::from_millis(1),
            },
        );
        let err = classifier.classify("text").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Timeout(_)));
    }
}
