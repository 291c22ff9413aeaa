//! Response Classification
//!
//! Maps a vendor API response to an [`OutcomeKind`]. Vendors such as Slack
//! answer HTTP 200 with `{"ok": false, "error": "..."}`, so the vendor error
//! code decides before the status does.

use std::collections::HashSet;

use crate::domain::ports::OutcomeKind;

/// Slack error codes that mean the installation can never work again.
pub const SLACK_FATAL_ERRORS: &[&str] = &[
    "account_inactive",
    "invalid_auth",
    "token_revoked",
    "team_disabled",
];

/// Per-provider rules for classifying responses.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    provider: String,
    fatal_error_codes: HashSet<String>,
}

impl ResponseClassifier {
    /// Classifier for `provider` treating `fatal_error_codes` as fatal.
    pub fn new<I, S>(provider: impl Into<String>, fatal_error_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: provider.into(),
            fatal_error_codes: fatal_error_codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in Slack rules.
    pub fn slack() -> Self {
        Self::new("slack", SLACK_FATAL_ERRORS.iter().copied())
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn is_fatal_code(&self, code: &str) -> bool {
        self.fatal_error_codes.contains(code)
    }

    /// Classify a response by HTTP status and optional vendor error code.
    pub fn classify(&self, status: u16, error_code: Option<&str>) -> OutcomeKind {
        match error_code {
            Some(code) if self.is_fatal_code(code) => OutcomeKind::Fatal,
            Some(_) => OutcomeKind::Error,
            None if (200..300).contains(&status) => OutcomeKind::Success,
            None => OutcomeKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_account_inactive_is_fatal() {
        let classifier = ResponseClassifier::slack();
        assert_eq!(
            classifier.classify(200, Some("account_inactive")),
            OutcomeKind::Fatal
        );
        assert_eq!(classifier.provider(), "slack");
    }

    #[test]
    fn test_slack_not_found_is_error() {
        let classifier = ResponseClassifier::slack();
        assert_eq!(
            classifier.classify(404, Some("The requested resource does not exist")),
            OutcomeKind::Error
        );
        assert_eq!(classifier.classify(200, Some("ratelimited")), OutcomeKind::Error);
        assert_eq!(classifier.classify(503, None), OutcomeKind::Error);
    }

    #[test]
    fn test_plain_success() {
        let classifier = ResponseClassifier::slack();
        assert_eq!(classifier.classify(200, None), OutcomeKind::Success);
        assert_eq!(classifier.classify(204, None), OutcomeKind::Success);
    }

    #[test]
    fn test_custom_rules() {
        let classifier = ResponseClassifier::new("opsgenie", ["key_revoked"]);
        assert_eq!(classifier.classify(401, Some("key_revoked")), OutcomeKind::Fatal);
        assert!(!classifier.is_fatal_code("account_inactive"));
    }
}
