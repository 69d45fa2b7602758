//! Identity exchange
//!
//! Turns a credential issued by the external identity provider into a client
//! session. The credential is forwarded uninspected; the backend decides who
//! the user is and whether they still need onboarding.
//!
//! Each attempt walks `Idle → Pending → Succeeded | Failed`. The state is
//! observable so a front end can disable its login trigger while pending.

use crush_common::Route;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{AuthError, Rejection};
use crate::session::{Session, SessionStore};

/// Whether the backend considers the identity new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    New,
    Existing,
}

/// Progress of the current login attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoginState {
    #[default]
    Idle,
    Pending,
    Succeeded(IdentityKind),
    /// Failure message, suitable for display
    Failed(String),
}

/// Result of a successful exchange
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub is_new_identity: bool,
}

impl LoginOutcome {
    /// Where the user lands after login: onboarding for new identities
    pub fn landing_route(&self) -> Route {
        if self.is_new_identity {
            Route::SignUp
        } else {
            Route::User
        }
    }

    pub fn identity_kind(&self) -> IdentityKind {
        if self.is_new_identity {
            IdentityKind::New
        } else {
            IdentityKind::Existing
        }
    }
}

/// Identity exchange adapter
pub struct IdentityExchange {
    api: ApiClient,
    store: SessionStore,
    state: Mutex<LoginState>,
}

impl IdentityExchange {
    pub fn new(api: ApiClient, store: SessionStore) -> Self {
        Self {
            api,
            store,
            state: Mutex::new(LoginState::Idle),
        }
    }

    pub fn state(&self) -> LoginState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == LoginState::Pending
    }

    /// Exchange `artifact` for a session
    ///
    /// One network call, no retry. On success the session store holds the
    /// new session before this returns.
    pub async fn exchange(&self, artifact: &str) -> Result<LoginOutcome, AuthError> {
        self.set_state(LoginState::Pending);
        debug!("Identity exchange started");

        let result = self.run(artifact).await;
        match &result {
            Ok(outcome) => {
                info!(
                    identity = outcome.session.identity().unwrap_or_default(),
                    new_identity = outcome.is_new_identity,
                    "Identity exchange succeeded"
                );
                self.set_state(LoginState::Succeeded(outcome.identity_kind()));
            }
            Err(e) => {
                warn!("Identity exchange failed: {}", e);
                self.set_state(LoginState::Failed(e.to_string()));
            }
        }
        result
    }

    /// Record a failure reported by the identity provider itself
    ///
    /// No network call is made and the session is left as it is.
    pub fn provider_failed(&self) -> AuthError {
        let err = AuthError::ProviderFailed;
        warn!("Identity provider reported failure");
        self.set_state(LoginState::Failed(err.to_string()));
        err
    }

    async fn run(&self, artifact: &str) -> Result<LoginOutcome, AuthError> {
        let response = self
            .api
            .exchange_credential(artifact)
            .await
            .map_err(classify)?;

        let is_new_identity = response.is_new_identity();
        let token = response.token.unwrap_or_else(|| artifact.to_string());
        let session = self.store.set(token, response.email)?;

        Ok(LoginOutcome {
            session,
            is_new_identity,
        })
    }

    fn set_state(&self, state: LoginState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

// A 2xx whose body cannot be decoded is a transport-level failure, not a
// backend refusal.
fn classify(rejection: Rejection) -> AuthError {
    match rejection.status {
        Some(status) if (200..300).contains(&status) => AuthError::Transport(rejection),
        _ => AuthError::from_exchange(rejection),
    }
}
