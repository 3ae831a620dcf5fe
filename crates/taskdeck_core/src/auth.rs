//! Credential boundary.
//!
//! The core never handles raw passwords or tokens. A [`CredentialService`]
//! resolves whatever the transport received into an owner id, or reports
//! that the caller is not authenticated.

use crate::error::CoreError;
use crate::model::user::{User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Authentication failure.
#[derive(Debug)]
pub enum AuthError {
    Unauthenticated,
    Backend(RepoError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "credential did not match a registered user"),
            Self::Backend(err) => write!(f, "credential lookup failed: {err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unauthenticated => None,
            Self::Backend(err) => Some(err),
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        Self::Backend(value)
    }
}

impl From<AuthError> for CoreError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::Backend(err) => Self::Persistence(err),
        }
    }
}

/// Resolves a transport-level credential into an owner identity.
pub trait CredentialService {
    fn authenticate(&self, credential: &str) -> Result<UserId, AuthError>;
}

/// Credential service that accepts a registered email as the credential.
///
/// Suitable for a local single-machine transport such as the CLI.
pub struct EmailCredentials<U: UserRepository> {
    users: U,
}

impl<U: UserRepository> EmailCredentials<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// Registers a user and returns the stored record.
    pub fn register(&self, email: &str, credential_hash: &str) -> Result<User, CoreError> {
        match self.users.create_user(email, credential_hash) {
            Ok(user) => {
                info!(
                    "event=user_register module=auth status=ok user_id={}",
                    user.id
                );
                Ok(user)
            }
            Err(err) => {
                let err = CoreError::from(err);
                info!(
                    "event=user_register module=auth status=rejected error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }
}

impl<U: UserRepository> CredentialService for EmailCredentials<U> {
    fn authenticate(&self, credential: &str) -> Result<UserId, AuthError> {
        match self.users.find_by_email(credential) {
            Ok(Some(user)) => Ok(user.id),
            Ok(None) => {
                info!("event=auth_check module=auth status=rejected");
                Err(AuthError::Unauthenticated)
            }
            Err(err) => {
                error!(
                    "event=auth_check module=auth status=error error={}",
                    err
                );
                Err(err.into())
            }
        }
    }
}

/// Authenticates `credential`, mapping failures to request-level errors.
pub fn authenticate_owner(
    service: &impl CredentialService,
    credential: &str,
) -> Result<UserId, CoreError> {
    service.authenticate(credential).map_err(CoreError::from)
}
