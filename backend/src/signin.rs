//! Session bootstrap and role routing after an OAuth redirect.
//!
//! `SignInFlow::complete_sign_in` runs once per OAuth return:
//!
//! 1. resolve the principal behind the caller's provider credential
//! 2. find the principal's profile, creating it on first sign-in and
//!    refreshing its avatar when the derived URL changed
//! 3. publish a session built from principal and profile
//! 4. pick a landing destination from the profile role
//!
//! Every remote call goes through the retry policy. Failures never escape:
//! they become a [`SignInOutcome`] carrying a notice and a destination.
//! Redirect query parameters are logged for diagnostics only; routing
//! depends on the resolved principal and profile alone.

use std::collections::HashMap;
use std::sync::Arc;

use petcare_common::{Notice, Principal, Profile, RoleCategory, Session};
use reqwest::Url;

use crate::avatar::AvatarResolver;
use crate::config::{DestinationsConfig, OAuthConfig};
use crate::identity::{Credential, IdentityError, IdentityProvider, EXPANDED_SCOPES};
use crate::profiles::ProfileStore;
use crate::retry::{RetryError, RetryPolicy};
use crate::session::SessionRegistry;

/// Where the browser is sent after sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    AdminConsole,
    BoardingConsole,
    UserDashboard,
    Login,
    Landing,
}

impl Destination {
    pub fn for_role(category: RoleCategory) -> Self {
        match category {
            RoleCategory::Admin => Destination::AdminConsole,
            RoleCategory::Boarding => Destination::BoardingConsole,
            RoleCategory::User => Destination::UserDashboard,
        }
    }

    pub fn path<'a>(&self, paths: &'a DestinationsConfig) -> &'a str {
        match self {
            Destination::AdminConsole => &paths.admin,
            Destination::BoardingConsole => &paths.boarding,
            Destination::UserDashboard => &paths.dashboard,
            Destination::Login => &paths.login,
            Destination::Landing => &paths.landing,
        }
    }
}

/// Terminal result of one sign-in attempt.
#[derive(Debug, Clone)]
pub enum SignInOutcome {
    SignedIn {
        session_id: String,
        session: Session,
        destination: Destination,
        notice: Notice,
        new_user: bool,
    },
    /// The provider needs more grants; restart OAuth at `url`.
    Reauthorize { url: Url },
    Failed {
        destination: Destination,
        notice: Notice,
    },
}

pub struct SignInFlow {
    provider: Arc<dyn IdentityProvider>,
    profiles: ProfileStore,
    sessions: Arc<SessionRegistry>,
    avatars: AvatarResolver,
    retry: RetryPolicy,
    oauth: OAuthConfig,
}

impl SignInFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: ProfileStore,
        sessions: Arc<SessionRegistry>,
        avatars: AvatarResolver,
        retry: RetryPolicy,
        oauth: OAuthConfig,
    ) -> Self {
        Self {
            provider,
            profiles,
            sessions,
            avatars,
            retry,
            oauth,
        }
    }

    /// Establish a session for the caller and decide where to send them.
    pub async fn complete_sign_in(
        &self,
        credential: &Credential,
        redirect_params: &HashMap<String, String>,
    ) -> SignInOutcome {
        tracing::debug!(params = ?redirect_params, "OAuth redirect received");

        match self.bootstrap(credential).await {
            Ok(outcome) => outcome,
            Err(e) => self.recover(e),
        }
    }

    async fn bootstrap(
        &self,
        credential: &Credential,
    ) -> Result<SignInOutcome, RetryError<IdentityError>> {
        let principal = self
            .retry
            .run(|| self.provider.current_session(credential))
            .await?;

        let (profile, new_user) = self.resolve_profile(&principal).await?;

        let session = Session::new(&principal, &profile);
        let session_id = self.sessions.publish(session.clone()).await;

        let (destination, notice) = if new_user {
            (Destination::UserDashboard, Notice::welcome_new(&principal.name))
        } else {
            (
                Destination::for_role(profile.role_category()),
                Notice::welcome_back(&principal.name),
            )
        };

        tracing::info!(
            principal = %principal.id,
            role = %profile.role,
            new_user,
            destination = ?destination,
            "Sign-in completed"
        );

        Ok(SignInOutcome::SignedIn {
            session_id,
            session,
            destination,
            notice,
            new_user,
        })
    }

    /// Look up the principal's profile, creating it on first sign-in.
    async fn resolve_profile(
        &self,
        principal: &Principal,
    ) -> Result<(Profile, bool), RetryError<IdentityError>> {
        let avatar = self.avatars.resolve(principal);

        let existing = self
            .retry
            .run(|| self.profiles.find_by_account(&principal.id))
            .await?;

        match existing {
            None => {
                let profile = self
                    .retry
                    .run(|| self.profiles.create(principal, &avatar))
                    .await?;
                Ok((profile, true))
            }
            Some(profile) if profile.avatar != avatar => {
                tracing::debug!("Refreshing avatar of profile {}", profile.id);
                let profile = self
                    .retry
                    .run(|| self.profiles.update_avatar(&profile.id, &avatar))
                    .await?;
                Ok((profile, false))
            }
            Some(profile) => Ok((profile, false)),
        }
    }

    fn recover(&self, error: RetryError<IdentityError>) -> SignInOutcome {
        match error {
            RetryError::MaxRetriesReached { attempts } => {
                tracing::warn!("Sign-in abandoned after {} rate-limited attempts", attempts);
                SignInOutcome::Failed {
                    destination: Destination::Login,
                    notice: Notice::server_busy(),
                }
            }
            RetryError::Failed(IdentityError::ScopeInsufficient(message)) => {
                tracing::info!("Missing OAuth scope ({}), requesting expanded scopes", message);
                match self.provider.oauth_redirect_url(
                    &self.oauth.provider,
                    &self.oauth.success_url,
                    &self.oauth.failure_url,
                    &EXPANDED_SCOPES,
                ) {
                    Ok(url) => SignInOutcome::Reauthorize { url },
                    Err(e) => {
                        tracing::error!("Could not build OAuth redirect: {}", e);
                        Self::auth_failed()
                    }
                }
            }
            RetryError::Failed(IdentityError::NoSession) => {
                tracing::warn!("Sign-in callback without an active session");
                Self::auth_failed()
            }
            RetryError::Failed(e) => {
                tracing::error!("Sign-in failed: {}", e);
                Self::auth_failed()
            }
        }
    }

    fn auth_failed() -> SignInOutcome {
        SignInOutcome::Failed {
            destination: Destination::Landing,
            notice: Notice::auth_failed(),
        }
    }
}
