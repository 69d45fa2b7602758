//! # Crush Client
//!
//! Session and profile-synchronization layer for the Crush matching service:
//! - Session store with durable storage ([`session`])
//! - Identity exchange turning a provider credential into a session ([`auth`])
//! - Route guard for session-gated views ([`guard`])
//! - Profile load/update between the wire and edit shapes ([`profile`])
//! - Direct-to-object-store picture upload ([`upload`])
//! - Stale-result protection for views ([`view`])

pub mod api;
pub mod auth;
pub mod error;
pub mod guard;
pub mod profile;
pub mod session;
pub mod upload;
pub mod view;

pub use api::ApiClient;
pub use auth::{IdentityExchange, IdentityKind, LoginOutcome, LoginState};
pub use error::{AuthError, FetchError, FieldError, Rejection, UpdateError, UploadError};
pub use guard::{admit, navigate, Admission};
pub use profile::model::EditProfile;
pub use profile::ProfileReconciler;
pub use session::{Credentials, Session, SessionStore};
pub use upload::{UploadCoordinator, UploadSlot};
pub use view::{MountOutcome, ProfileView, ViewLifecycle};
