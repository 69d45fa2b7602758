//! Request/response bodies for the auth and upload endpoints
//!
//! Profile bodies live with the profile model in `crate::profile::model`.

use serde::{Deserialize, Serialize};

/// `POST /v1/auth` request: the identity provider's credential, forwarded as-is
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest<'a> {
    pub token: &'a str,
}

/// `POST /v1/auth` response
///
/// Backends either report `active` (inactive identities still need
/// onboarding) or an explicit `isNewIdentity`. When the backend mints its own
/// session token it is returned in `token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub email: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub active: Option<bool>,

    #[serde(default, rename = "isNewIdentity")]
    pub is_new_identity: Option<bool>,
}

impl AuthResponse {
    /// Whether the caller should route to onboarding
    ///
    /// Explicit flag wins, then `!active`; with neither present the identity
    /// is treated as new.
    pub fn is_new_identity(&self) -> bool {
        self.is_new_identity
            .or(self.active.map(|active| !active))
            .unwrap_or(true)
    }
}

/// `GET /v1/user/picture/{identity}` response
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSlotResponse {
    #[serde(default)]
    pub url: Option<String>,
}
