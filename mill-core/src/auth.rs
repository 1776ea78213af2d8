//! Sign-in contract with the authentication collaborator.
//!
//! Sign-in is interactive and may wait indefinitely for the operator. A
//! cancelled sign-in is an ordinary outcome, not an error.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Identity;

/// Result of a sign-in attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Identity),
    /// The operator dismissed the sign-in surface.
    Cancelled,
}

impl AuthOutcome {
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("origin '{0}' is not authorized for sign-in")]
    UnauthorizedOrigin(String),

    #[error("sign-in method is disabled")]
    MethodDisabled,

    #[error("sign-in failed: {0}")]
    Failed(String),
}

impl AuthError {
    /// Actionable message shown to the operator, one per category.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnauthorizedOrigin(origin) => format!(
                "This site ({origin}) is not authorized to sign in. \
                 Add it to the authorized origins of the authentication provider."
            ),
            Self::MethodDisabled => {
                "Sign-in is disabled. Enable the sign-in method in the authentication \
                 provider settings."
                    .to_string()
            }
            Self::Failed(reason) => format!("Sign-in failed: {reason}"),
        }
    }
}

/// Anything able to resolve an [`Identity`] for the current operator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<AuthOutcome, AuthError>;
}
