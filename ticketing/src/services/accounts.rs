//! Accounts: registration, sign-in, session resolution and profiles.

use super::{PhotoUpload, upload_photo};
use crate::collections;
use crate::error::{Result, TicketingError};
use crate::forms::{ProfileForm, RegistrationForm};
use crate::metrics;
use crate::session::Session;
use crate::types::{UserId, UserProfile};
use evently_core::blob_store::BlobStore;
use evently_core::document::to_fields;
use evently_core::document_store::{DocumentStore, DocumentStoreError};
use evently_core::environment::Clock;
use evently_core::identity::{Credentials, IdentityProvider};
use std::sync::Arc;

/// Account operations backed by the identity provider and `users/{uid}`
/// profile documents.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    default_avatar_url: String,
}

impl Accounts {
    /// Creates a new `Accounts`
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        default_avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            blobs,
            clock,
            default_avatar_url: default_avatar_url.into(),
        }
    }

    /// Create an account and its profile, returning the new session.
    ///
    /// # Errors
    ///
    /// - `Auth`: the identity provider refused the credentials
    /// - `Store`: the profile could not be written
    #[tracing::instrument(skip(self, form), fields(email = %form.credentials.email))]
    pub async fn register(&self, form: RegistrationForm) -> Result<Session> {
        let user = self
            .identity
            .register(form.credentials)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Registration refused"))?;

        let profile = UserProfile {
            email: user.email,
            first_name: form.first_name,
            last_name: form.last_name,
            username: form.username,
            birth_date: form.birth_date,
            role: form.role,
            photo_url: self.default_avatar_url.clone(),
        };
        let user_id = UserId::new(user.uid);
        self.store
            .set(collections::users(), user_id.document_id(), to_fields(&profile)?)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Profile write failed after account creation");
            })?;

        metrics::record_account("registered");
        tracing::info!(user_id = %user_id, role = profile.role.as_str(), "Account registered");
        Ok(Session::new(user_id, profile.username, profile.role))
    }

    /// Check credentials and resolve the session from the stored profile.
    ///
    /// # Errors
    ///
    /// `Auth` for wrong credentials or a missing profile.
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let user = self
            .identity
            .sign_in(Credentials::new(email.trim(), password))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Sign-in refused"))?;

        let session = self.resolve_session(&UserId::new(user.uid)).await?;
        metrics::record_account("signed_in");
        tracing::info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Build the session of an already authenticated user.
    ///
    /// # Errors
    ///
    /// `Auth` if the profile is missing or cannot be decoded, `Store` on
    /// backend failure.
    pub async fn resolve_session(&self, user_id: &UserId) -> Result<Session> {
        let profile = self
            .load_profile(user_id)
            .await?
            .ok_or_else(|| TicketingError::Auth(format!("no profile for user {user_id}")))?;
        Ok(Session::new(user_id.clone(), profile.username, profile.role))
    }

    /// The session user's profile.
    ///
    /// # Errors
    ///
    /// `NotFound` if the profile does not exist.
    pub async fn profile(&self, session: &Session) -> Result<UserProfile> {
        self.load_profile(&session.user_id)
            .await?
            .ok_or_else(|| TicketingError::NotFound {
                entity: "profile",
                id: session.user_id.to_string(),
            })
    }

    /// Apply a partial profile edit and an optional new avatar.
    ///
    /// Nothing is written when the form is empty and no photo is given.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the profile does not exist
    /// - `Blob`, `Store`: upload or write failed
    #[tracing::instrument(skip(self, session, form, photo), fields(user_id = %session.user_id))]
    pub async fn update_profile(
        &self,
        session: &Session,
        form: ProfileForm,
        photo: Option<PhotoUpload>,
    ) -> Result<UserProfile> {
        let mut patch = form.to_patch();
        if let Some(photo) = photo {
            let url = upload_photo(self.blobs.as_ref(), self.clock.as_ref(), photo).await?;
            patch = patch.set("photoURL", url);
        }

        if patch.is_empty() {
            tracing::debug!("Empty profile edit");
        } else {
            self.store
                .update(collections::users(), session.user_id.document_id(), patch)
                .await
                .map_err(|e| match e {
                    DocumentStoreError::NotFound { .. } => TicketingError::NotFound {
                        entity: "profile",
                        id: session.user_id.to_string(),
                    },
                    other => TicketingError::Store(other),
                })?;
            tracing::info!("Profile updated");
        }

        self.profile(session).await
    }

    async fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let Some(document) = self
            .store
            .get(collections::users(), user_id.document_id())
            .await?
        else {
            return Ok(None);
        };
        document.decode().map(Some).map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Undecodable profile");
            TicketingError::Auth(format!("invalid profile for user {user_id}"))
        })
    }
}
