//! Error types for group lifecycle operations.
//!
//! `ProviderError` is what a control-plane client returns. `GroupError` is
//! what this crate surfaces to callers after classification; see
//! [`crate::classify`] for the mapping between the two.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for group lifecycle operations.
pub type GroupResult<T> = Result<T, GroupError>;

/// Provider service that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    AutoScaling,
    Ec2,
    Elb,
    CodeDeploy,
    Ecs,
    Ecr,
    CloudFormation,
    Other,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AutoScaling => "autoscaling",
            Self::Ec2 => "ec2",
            Self::Elb => "elb",
            Self::CodeDeploy => "codedeploy",
            Self::Ecs => "ecs",
            Self::Ecr => "ecr",
            Self::CloudFormation => "cloudformation",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Where a provider failure originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The service answered with an error response.
    Service {
        service: Service,
        /// Provider error code, e.g. "ValidationError" or "Throttling".
        code: String,
        status: Option<u16>,
    },
    /// The request never produced a service response (credentials, network).
    Client,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service { service, code, status: Some(status) } => {
                write!(f, "{service} {code} ({status})")
            }
            Self::Service { service, code, status: None } => write!(f, "{service} {code}"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// A failure reported by the cloud control-plane client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{origin}: {message}")]
pub struct ProviderError {
    pub origin: ErrorOrigin,
    pub message: String,
}

impl ProviderError {
    /// A service-side error with the given provider code.
    pub fn service(service: Service, code: &str, message: impl Into<String>) -> Self {
        Self {
            origin: ErrorOrigin::Service {
                service,
                code: code.to_string(),
                status: None,
            },
            message: message.into(),
        }
    }

    /// A client-side error (no service response).
    pub fn client(message: impl Into<String>) -> Self {
        Self {
            origin: ErrorOrigin::Client,
            message: message.into(),
        }
    }

    /// Attach an HTTP status to a service error.
    pub fn with_status(mut self, status: u16) -> Self {
        if let ErrorOrigin::Service { status: s, .. } = &mut self.origin {
            *s = Some(status);
        }
        self
    }

    pub fn code(&self) -> Option<&str> {
        match &self.origin {
            ErrorOrigin::Service { code, .. } => Some(code),
            ErrorOrigin::Client => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match &self.origin {
            ErrorOrigin::Service { status, .. } => *status,
            ErrorOrigin::Client => None,
        }
    }

    pub fn service_name(&self) -> Option<Service> {
        match &self.origin {
            ErrorOrigin::Service { service, .. } => Some(*service),
            ErrorOrigin::Client => None,
        }
    }
}

/// Which kind of resource was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotFoundCode {
    Group,
    Cluster,
    Service,
    Resource,
}

impl NotFoundCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "GROUP_NOT_FOUND",
            Self::Cluster => "CLUSTER_NOT_FOUND",
            Self::Service => "SERVICE_NOT_FOUND",
            Self::Resource => "RESOURCE_NOT_FOUND",
        }
    }
}

impl fmt::Display for NotFoundCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by group lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("no credentials are configured for the control-plane client")]
    CredentialsNotConfigured,

    #[error("{code}: {message}")]
    NotFound { code: NotFoundCode, message: String },

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("timed out after {}s: {operation}", waited.as_secs())]
    Timeout { operation: String, waited: Duration },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GroupError {
    /// Stable code for upstream decision making.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::CredentialsNotConfigured => "CREDENTIALS_NOT_CONFIGURED",
            Self::NotFound { code, .. } => code.as_str(),
            Self::Transient(_) => "TRANSIENT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::Serialization(_) => "SERIALIZATION",
        }
    }

    /// Errors the operator has to fix (credentials, permissions).
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::CredentialsNotConfigured)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_includes_origin() {
        let err = ProviderError::service(Service::AutoScaling, "Throttling", "Rate exceeded")
            .with_status(400);
        assert_eq!(err.to_string(), "autoscaling Throttling (400): Rate exceeded");
        assert_eq!(ProviderError::client("boom").to_string(), "client: boom");
    }

    #[test]
    fn status_is_ignored_for_client_errors() {
        let err = ProviderError::client("no route").with_status(503);
        assert_eq!(err.status(), None);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn codes_are_stable() {
        let err = GroupError::NotFound {
            code: NotFoundCode::Cluster,
            message: "x".to_string(),
        };
        assert_eq!(err.code(), "CLUSTER_NOT_FOUND");
        assert!(err.is_not_found());

        let timeout = GroupError::Timeout {
            operation: "steady state".to_string(),
            waited: Duration::from_secs(120),
        };
        assert_eq!(timeout.to_string(), "timed out after 120s: steady state");
        assert!(timeout.is_timeout());
        assert!(!timeout.is_user_error());
    }
}
