use super::{Classification, Classifier, ClassifierError, Label};
use async_trait::async_trait;

/// AFINN score at which the lexicon is considered fully confident
const SATURATION: f64 = 10.0;

/// Offline classifier backed by the AFINN word list of the `sentiment` crate.
///
/// The polarity follows the sign of the summed word scores; the confidence grows
/// linearly with its magnitude until it saturates.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    saturation: f64,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self {
            saturation: SATURATION,
        }
    }
}

impl LexiconClassifier {
    pub fn analyze(&self, text: &str) -> Classification {
        // Note: the crate wants an owned String, so this copies once per message
        let score = sentiment::analyze(text.to_owned()).score as f64;
        let strength = (score.abs() / self.saturation).min(1.0);
        if score > 0.0 {
            Classification {
                label: Label::Positive,
                confidence: strength,
            }
        } else if score < 0.0 {
            Classification {
                label: Label::Negative,
                confidence: strength,
            }
        } else {
            Classification {
                label: Label::Neutral,
                confidence: 1.0,
            }
        }
    }
}

#[async_trait]
impl Classifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        Ok(self.analyze(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_follows_word_list() {
        let classifier = LexiconClassifier::default();
        let good = classifier.analyze("A great excellent and happy quarter");
        assert_eq!(good.label, Label::Positive);
        assert!(good.confidence > 0.0 && good.confidence <= 1.0);

        let bad = classifier.analyze("A terrible awful and sad quarter");
        assert_eq!(bad.label, Label::Negative);
        assert!(bad.confidence > 0.0 && bad.confidence <= 1.0);
    }

    #[test]
    fn text_without_scored_words_is_neutral() {
        let classifier = LexiconClassifier::default();
        let result = classifier.analyze("The board meets on Tuesday");
        assert_eq!(result.label, Label::Neutral);
    }

    #[actix_rt::test]
    async fn classify_never_fails() {
        let classifier = LexiconClassifier::default();
        assert!(classifier.classify("").await.is_ok());
    }
}
