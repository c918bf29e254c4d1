//! Identity provider: email/password registration and sign-in.
//!
//! The provider owns credentials and returns an opaque user identifier; the
//! application keeps profile data (role, display name) in its own documents.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Minimum password length accepted by the hosted identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Errors reported by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// An account with this email already exists.
    #[error("Email already in use: {0}")]
    EmailInUse(String),

    /// The email address is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// The password is shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password must be at least 6 characters")]
    WeakPassword,

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Provider unavailable or other failure.
    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Email/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Plain-text password, only ever handed to the provider
    pub password: String,
}

impl Credentials {
    /// Creates new `Credentials`
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated account as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    /// Opaque user identifier
    pub uid: String,
    /// Account email
    pub email: String,
}

/// Identity provider abstraction.
pub trait IdentityProvider: Send + Sync {
    /// Create an account.
    ///
    /// # Errors
    ///
    /// `EmailInUse`, `InvalidEmail`, `WeakPassword` or `Provider`.
    fn register(
        &self,
        credentials: Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthUser, IdentityError>> + Send + '_>>;

    /// Check credentials.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` or `Provider`.
    fn sign_in(
        &self,
        credentials: Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthUser, IdentityError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("ana@example.com", "hunter22");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("ana@example.com"));
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn weak_password_message_names_minimum() {
        assert!(IdentityError::WeakPassword.to_string().contains('6'));
    }
}
