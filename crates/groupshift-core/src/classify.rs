//! Provider error classification.
//!
//! Maps a [`ProviderError`] onto a small taxonomy through an ordered rule
//! table; the first rule that matches wins. Classification is pure, so
//! the policy is unit-testable without a client.
//!
//! ```text
//! not_found        resource / cluster / service / group missing  → NotFound(code)
//! already_absent   "trying to remove ... not part of the group"  → AlreadyAbsent
//! benign_no_op     "no updates are to be performed"              → BenignNoOp
//! access_denied    authorization-shaped codes, 401 / 403         → AccessDenied
//! credentials      client error naming the instance-role path    → CredentialsNotConfigured
//! transient        throttling, 5xx, 429, client timeouts         → Transient
//! (fallthrough)                                                  → Unknown
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, info};

use crate::error::{ErrorOrigin, GroupError, GroupResult, NotFoundCode, ProviderError, Service};

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound(NotFoundCode),
    /// The thing being removed is already gone.
    AlreadyAbsent,
    /// The requested change is already in effect.
    BenignNoOp,
    AccessDenied,
    CredentialsNotConfigured,
    Transient,
    Unknown,
}

impl ErrorClass {
    /// Classes whose desired end state already holds; callers may swallow them.
    pub fn is_swallowed(&self) -> bool {
        matches!(self, Self::AlreadyAbsent | Self::BenignNoOp)
    }
}

struct Rule {
    name: &'static str,
    matches: fn(&ProviderError) -> Option<ErrorClass>,
}

static RULES: &[Rule] = &[
    Rule { name: "not_found", matches: not_found },
    Rule { name: "already_absent", matches: already_absent },
    Rule { name: "benign_no_op", matches: benign_no_op },
    Rule { name: "access_denied", matches: access_denied },
    Rule { name: "credentials", matches: credentials },
    Rule { name: "transient", matches: transient },
];

static NOT_PART_OF_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)trying to remove (target groups|load balancers)\b.*\bnot part of the group")
        .expect("valid regex")
});

static NO_UPDATES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)no updates are to be performed").expect("valid regex"));

static GROUP_NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(auto ?scaling ?group|group)\b.*\bnot found").expect("valid regex")
});

static CLIENT_TRANSIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(timed out|timeout|connection (reset|refused|closed))").expect("valid regex")
});

const CREDENTIALS_PATH: &str = "/meta-data/iam/security-credentials/";

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "UnauthorizedException",
    "AuthFailure",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "ExpiredTokenException",
];

const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "ServiceUnavailable",
    "InternalFailure",
    "InternalError",
    "RequestTimeout",
    "RequestTimeoutException",
];

/// Classify a provider error. First matching rule wins.
pub fn classify(err: &ProviderError) -> ErrorClass {
    RULES
        .iter()
        .find_map(|rule| (rule.matches)(err))
        .unwrap_or(ErrorClass::Unknown)
}

/// Name of the rule that classified `err`, for diagnostics.
pub fn matching_rule(err: &ProviderError) -> Option<&'static str> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(err).is_some())
        .map(|rule| rule.name)
}

fn not_found(err: &ProviderError) -> Option<ErrorClass> {
    let ErrorOrigin::Service { service, code, .. } = &err.origin else {
        return None;
    };
    let code = match code.as_str() {
        "ClusterNotFoundException" => NotFoundCode::Cluster,
        "ServiceNotFoundException" => NotFoundCode::Service,
        "ResourceNotFoundException" | "NoSuchEntity" | "NotFound" => NotFoundCode::Resource,
        "ValidationError"
            if *service == Service::AutoScaling && GROUP_NOT_FOUND.is_match(&err.message) =>
        {
            NotFoundCode::Group
        }
        _ => return None,
    };
    Some(ErrorClass::NotFound(code))
}

fn already_absent(err: &ProviderError) -> Option<ErrorClass> {
    NOT_PART_OF_GROUP
        .is_match(&err.message)
        .then_some(ErrorClass::AlreadyAbsent)
}

fn benign_no_op(err: &ProviderError) -> Option<ErrorClass> {
    NO_UPDATES.is_match(&err.message).then_some(ErrorClass::BenignNoOp)
}

fn access_denied(err: &ProviderError) -> Option<ErrorClass> {
    let ErrorOrigin::Service { code, status, .. } = &err.origin else {
        return None;
    };
    let denied = ACCESS_DENIED_CODES.contains(&code.as_str()) || matches!(status, Some(401 | 403));
    denied.then_some(ErrorClass::AccessDenied)
}

fn credentials(err: &ProviderError) -> Option<ErrorClass> {
    (err.origin == ErrorOrigin::Client && err.message.contains(CREDENTIALS_PATH))
        .then_some(ErrorClass::CredentialsNotConfigured)
}

fn transient(err: &ProviderError) -> Option<ErrorClass> {
    let is_transient = match &err.origin {
        ErrorOrigin::Service { code, status, .. } => {
            TRANSIENT_CODES.contains(&code.as_str())
                || matches!(status, Some(s) if *s >= 500 || *s == 429)
        }
        ErrorOrigin::Client => CLIENT_TRANSIENT.is_match(&err.message),
    };
    is_transient.then_some(ErrorClass::Transient)
}

/// Strict conversion: every class becomes an error. Swallowable classes
/// surface as `InvalidOperation` here; use [`absorb`] where they may be
/// ignored.
impl From<ProviderError> for GroupError {
    fn from(err: ProviderError) -> Self {
        let class = classify(&err);
        if class == ErrorClass::Unknown {
            error!(error = %err, "unhandled provider error");
        }
        match class {
            ErrorClass::NotFound(code) => GroupError::NotFound {
                code,
                message: err.message,
            },
            ErrorClass::AccessDenied => GroupError::AccessDenied(err.message),
            ErrorClass::CredentialsNotConfigured => GroupError::CredentialsNotConfigured,
            ErrorClass::Transient => GroupError::Transient(err.to_string()),
            ErrorClass::AlreadyAbsent | ErrorClass::BenignNoOp | ErrorClass::Unknown => {
                GroupError::InvalidOperation(err.message)
            }
        }
    }
}

/// Lenient conversion: `AlreadyAbsent` and `BenignNoOp` are logged at info
/// level and mapped to `Ok(None)`; everything else converts strictly.
pub fn absorb<T>(result: Result<T, ProviderError>) -> GroupResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            let class = classify(&err);
            if class.is_swallowed() {
                info!(?class, message = %err.message, "desired end state already holds");
                Ok(None)
            } else {
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asg(code: &str, message: &str) -> ProviderError {
        ProviderError::service(Service::AutoScaling, code, message)
    }

    #[test]
    fn cluster_and_service_not_found_carry_codes() {
        let err = ProviderError::service(Service::Ecs, "ClusterNotFoundException", "Cluster not found.");
        assert_eq!(classify(&err), ErrorClass::NotFound(NotFoundCode::Cluster));

        let err = ProviderError::service(Service::Ecs, "ServiceNotFoundException", "Service not found.");
        assert_eq!(classify(&err), ErrorClass::NotFound(NotFoundCode::Service));
    }

    #[test]
    fn missing_group_validation_error_is_not_found() {
        let err = asg("ValidationError", "AutoScalingGroup name not found - web__3");
        assert_eq!(classify(&err), ErrorClass::NotFound(NotFoundCode::Group));

        // Other validation errors fall through.
        let err = asg("ValidationError", "Desired capacity:9 must be between 0 and 4");
        assert_eq!(classify(&err), ErrorClass::Unknown);
    }

    #[test]
    fn detaching_absent_targets_is_already_absent() {
        let err = asg(
            "ValidationError",
            "Trying to remove Target Groups that are not part of the group web__2",
        );
        assert_eq!(classify(&err), ErrorClass::AlreadyAbsent);

        let err = asg(
            "ValidationError",
            "Trying to remove Load Balancers that are not part of the group web__2",
        );
        assert_eq!(classify(&err), ErrorClass::AlreadyAbsent);
    }

    #[test]
    fn no_updates_is_benign() {
        let err = ProviderError::service(
            Service::CloudFormation,
            "ValidationError",
            "No updates are to be performed.",
        );
        assert_eq!(classify(&err), ErrorClass::BenignNoOp);
        assert_eq!(matching_rule(&err), Some("benign_no_op"));
    }

    #[test]
    fn authorization_errors_are_access_denied() {
        let err = ProviderError::service(Service::Ec2, "UnauthorizedOperation", "not allowed");
        assert_eq!(classify(&err), ErrorClass::AccessDenied);

        let err = asg("Forbidden", "nope").with_status(403);
        assert_eq!(classify(&err), ErrorClass::AccessDenied);
    }

    #[test]
    fn rule_order_prefers_not_found_over_access_denied() {
        let err = ProviderError::service(Service::Ecs, "ClusterNotFoundException", "gone")
            .with_status(403);
        assert_eq!(classify(&err), ErrorClass::NotFound(NotFoundCode::Cluster));
    }

    #[test]
    fn missing_instance_role_is_credentials_error() {
        let err = ProviderError::client(
            "Unable to load credentials from http://169.254.169.254/latest/meta-data/iam/security-credentials/",
        );
        assert_eq!(classify(&err), ErrorClass::CredentialsNotConfigured);
        assert_eq!(GroupError::from(err), GroupError::CredentialsNotConfigured);
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        assert_eq!(classify(&asg("Throttling", "Rate exceeded")), ErrorClass::Transient);
        assert_eq!(classify(&asg("Weird", "oops").with_status(502)), ErrorClass::Transient);
        assert_eq!(
            classify(&ProviderError::client("connection reset by peer")),
            ErrorClass::Transient
        );
    }

    #[test]
    fn everything_else_is_unknown_and_invalid_operation() {
        let err = asg("LimitExceeded", "too many groups");
        assert_eq!(classify(&err), ErrorClass::Unknown);
        assert_eq!(
            GroupError::from(err),
            GroupError::InvalidOperation("too many groups".to_string())
        );
    }

    #[test]
    fn absorb_swallows_only_satisfied_end_states() {
        let ok: Result<u32, ProviderError> = Ok(3);
        assert_eq!(absorb(ok).unwrap(), Some(3));

        let absent: Result<(), ProviderError> = Err(asg(
            "ValidationError",
            "Trying to remove Target Groups that are not part of the group",
        ));
        assert_eq!(absorb(absent).unwrap(), None);

        let denied: Result<(), ProviderError> = Err(asg("AccessDenied", "no"));
        assert_eq!(
            absorb(denied).unwrap_err(),
            GroupError::AccessDenied("no".to_string())
        );
    }
}
