//! Decides whether a failed call was caused by a rejected credential.

use serde::{Deserialize, Serialize};

use super::types::{ApiError, GraphQLErrorEntry, GraphQLResponse};

/// Message fragments that mark an error as an auth error (matched case-insensitively)
pub const DEFAULT_MESSAGE_SIGNATURES: &[&str] = &[
    "jwt expired",
    "token expired",
    "invalid token",
    "jwt malformed",
    "invalid signature",
    "unauthorized",
    "unauthenticated",
];

/// `extensions.code` values that mark an error as an auth error
pub const DEFAULT_ERROR_CODES: &[&str] = &[
    "UNAUTHENTICATED",
    "UNAUTHORIZED",
    "TOKEN_EXPIRED",
    "INVALID_TOKEN",
];

/// How a response mixing auth and non-auth errors is classified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Any matching entry is enough to attempt a refresh
    #[default]
    Any,
    /// Every entry must match
    All,
}

/// Predicate deciding whether a failure means "credential rejected"
///
/// Must be pure: no side effects, no mutation.
pub trait AuthErrorClassifier: Send + Sync {
    fn is_auth_error(&self, failure: &ApiError) -> bool;
}

impl<F> AuthErrorClassifier for F
where
    F: Fn(&ApiError) -> bool + Send + Sync,
{
    fn is_auth_error(&self, failure: &ApiError) -> bool {
        self(failure)
    }
}

/// Classifier matching error messages and codes against known signatures
#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    messages: Vec<String>,
    codes: Vec<String>,
    policy: ErrorPolicy,
}

impl Default for SignatureClassifier {
    fn default() -> Self {
        Self::new(ErrorPolicy::default())
    }
}

impl SignatureClassifier {
    /// Creates a classifier with the default signatures
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            messages: DEFAULT_MESSAGE_SIGNATURES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            codes: DEFAULT_ERROR_CODES.iter().map(|s| (*s).to_string()).collect(),
            policy,
        }
    }

    /// Creates a classifier with custom signatures
    pub fn with_signatures<M, C>(messages: M, codes: C, policy: ErrorPolicy) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            messages: messages
                .into_iter()
                .map(|m| m.into().to_lowercase())
                .collect(),
            codes: codes.into_iter().map(Into::into).collect(),
            policy,
        }
    }

    /// Returns the configured mixed-error policy
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Returns true if a single error entry matches a signature
    pub fn matches_entry(&self, entry: &GraphQLErrorEntry) -> bool {
        let message = entry.message.to_lowercase();
        if self.messages.iter().any(|sig| message.contains(sig.as_str())) {
            return true;
        }
        entry
            .code()
            .is_some_and(|code| self.codes.iter().any(|c| c.eq_ignore_ascii_case(code)))
    }

    /// Classifies a response according to the policy
    pub fn is_auth_response(&self, response: &GraphQLResponse) -> bool {
        let entries = response.error_entries();
        if entries.is_empty() {
            return false;
        }
        match self.policy {
            ErrorPolicy::Any => entries.iter().any(|e| self.matches_entry(e)),
            ErrorPolicy::All => entries.iter().all(|e| self.matches_entry(e)),
        }
    }
}

impl AuthErrorClassifier for SignatureClassifier {
    fn is_auth_error(&self, failure: &ApiError) -> bool {
        match failure {
            ApiError::GraphQL(response) => self.is_auth_response(response),
            ApiError::Http { status, .. } => *status == 401,
            ApiError::Network(_) | ApiError::InvalidResponse(_) | ApiError::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graphql_failure(errors: serde_json::Value) -> ApiError {
        ApiError::GraphQL(serde_json::from_value(json!({ "errors": errors })).unwrap())
    }

    #[test]
    fn known_message_signatures_are_auth_errors() {
        let classifier = SignatureClassifier::default();

        for message in [
            "jwt expired",
            "JWT Expired",
            "Access token expired",
            "invalid token",
            "jwt malformed",
            "invalid signature",
            "Unauthorized",
            "User is unauthenticated",
        ] {
            let failure = graphql_failure(json!([{ "message": message }]));
            assert!(classifier.is_auth_error(&failure), "{message}");
        }
    }

    #[test]
    fn other_messages_are_not_auth_errors() {
        let classifier = SignatureClassifier::default();

        for message in [
            "Post not found",
            "Cannot query field \"foo\" on type \"Query\"",
            "Internal server error",
            "Forbidden resource",
        ] {
            let failure = graphql_failure(json!([{ "message": message }]));
            assert!(!classifier.is_auth_error(&failure), "{message}");
        }
    }

    #[test]
    fn error_code_extension_is_an_auth_signature() {
        let classifier = SignatureClassifier::default();
        let failure = graphql_failure(json!([{
            "message": "Session is gone",
            "extensions": { "code": "UNAUTHENTICATED" }
        }]));

        assert!(classifier.is_auth_error(&failure));
    }

    #[test]
    fn mixed_errors_match_with_any_policy() {
        let classifier = SignatureClassifier::new(ErrorPolicy::Any);
        let failure = graphql_failure(json!([
            { "message": "Post not found" },
            { "message": "jwt expired" }
        ]));

        assert!(classifier.is_auth_error(&failure));
    }

    #[test]
    fn mixed_errors_do_not_match_with_all_policy() {
        let classifier = SignatureClassifier::new(ErrorPolicy::All);
        let mixed = graphql_failure(json!([
            { "message": "Post not found" },
            { "message": "jwt expired" }
        ]));
        let only_auth = graphql_failure(json!([
            { "message": "jwt expired" },
            { "message": "Unauthorized" }
        ]));

        assert!(!classifier.is_auth_error(&mixed));
        assert!(classifier.is_auth_error(&only_auth));
    }

    #[test]
    fn transport_failures_are_never_auth_errors() {
        let classifier = SignatureClassifier::default();

        assert!(!classifier.is_auth_error(&ApiError::Network("unauthorized proxy".into())));
        assert!(!classifier.is_auth_error(&ApiError::InvalidResponse("jwt expired".into())));
        assert!(!classifier.is_auth_error(&ApiError::Decode("jwt expired".into())));
    }

    #[test]
    fn http_401_is_an_auth_error() {
        let classifier = SignatureClassifier::default();

        assert!(classifier.is_auth_error(&ApiError::Http {
            status: 401,
            body: String::new()
        }));
        assert!(!classifier.is_auth_error(&ApiError::Http {
            status: 500,
            body: String::new()
        }));
    }

    #[test]
    fn custom_signatures_replace_defaults() {
        let classifier =
            SignatureClassifier::with_signatures(["Session Timed Out"], ["E_AUTH"], ErrorPolicy::Any);

        assert!(classifier.is_auth_error(&graphql_failure(json!([{ "message": "session timed out" }]))));
        assert!(classifier.is_auth_error(&graphql_failure(json!([{
            "message": "nope",
            "extensions": { "code": "E_AUTH" }
        }]))));
        assert!(!classifier.is_auth_error(&graphql_failure(json!([{ "message": "jwt expired" }]))));
    }

    #[test]
    fn policy_defaults_to_any() {
        assert_eq!(SignatureClassifier::default().policy(), ErrorPolicy::Any);
        assert_eq!(
            SignatureClassifier::new(ErrorPolicy::All).policy(),
            ErrorPolicy::All
        );
    }

    #[test]
    fn closures_are_classifiers() {
        let classifier = |failure: &ApiError| matches!(failure, ApiError::Http { status: 419, .. });

        assert!(classifier.is_auth_error(&ApiError::Http {
            status: 419,
            body: String::new()
        }));
    }
}
