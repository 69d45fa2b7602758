//! REST client for the Crush backend
//!
//! Thin wrapper over `reqwest` that knows the endpoint layout, attaches the
//! bearer token to protected calls and turns every non-success outcome into a
//! [`Rejection`]. Components map rejections onto their own error types.
//!
//! # Endpoints
//! - `POST /v1/auth` (no auth)
//! - `GET|PUT /v1/user/info/{identity}`
//! - `PUT /v1/user/answers/{identity}`
//! - `GET /v1/user/picture/{identity}`
//! - `PUT {slot url}` on the external object store (pre-authorized, no auth)

pub mod types;

use reqwest::{header, Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::Rejection;
use crate::profile::model::{AnswersPayload, BasicInfoPayload, ProfileRecord};
use types::{AuthRequest, AuthResponse, UploadSlotResponse};

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("crush-client/", env!("CARGO_PKG_VERSION"));

/// Backend API client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    /// Create a client for `base_url`
    ///
    /// No timeout is applied unless one is given; the transport decides when
    /// a call settles.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> crush_common::Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            crush_common::Error::Config(format!("Invalid API base URL {:?}: {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(crush_common::Error::Config(format!(
                "API base URL {:?} cannot carry a path",
                base_url
            )));
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| crush_common::Error::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ========================================
    // Endpoints
    // ========================================

    /// Exchange an identity-provider credential for a session
    pub async fn exchange_credential(&self, artifact: &str) -> Result<AuthResponse, Rejection> {
        let url = self.endpoint(&["v1", "auth"]);
        debug!(url = %url, "Exchanging identity credential");

        let response = send(self.http.post(url).json(&AuthRequest { token: artifact })).await?;
        decode(response).await
    }

    /// Fetch the wire-shape profile for `identity`
    pub async fn get_profile(&self, identity: &str, token: &str) -> Result<ProfileRecord, Rejection> {
        let url = self.endpoint(&["v1", "user", "info", identity]);
        debug!(identity = %identity, "Loading profile");

        let response = send(self.http.get(url).bearer_auth(token)).await?;
        decode(response).await
    }

    /// Replace the basic-info resource for `identity`
    pub async fn put_basic_info(
        &self,
        identity: &str,
        token: &str,
        payload: &BasicInfoPayload,
    ) -> Result<(), Rejection> {
        let url = self.endpoint(&["v1", "user", "info", identity]);
        self.put_json(url, token, payload).await
    }

    /// Replace the survey-answers resource for `identity`
    pub async fn put_answers(
        &self,
        identity: &str,
        token: &str,
        payload: &AnswersPayload,
    ) -> Result<(), Rejection> {
        let url = self.endpoint(&["v1", "user", "answers", identity]);
        self.put_json(url, token, payload).await
    }

    /// Ask the backend for a single-use picture upload slot
    pub async fn request_upload_slot(
        &self,
        identity: &str,
        token: &str,
    ) -> Result<UploadSlotResponse, Rejection> {
        let url = self.endpoint(&["v1", "user", "picture", identity]);
        debug!(identity = %identity, "Requesting upload slot");

        let response = send(self.http.get(url).bearer_auth(token)).await?;
        decode(response).await
    }

    /// Write raw bytes to a pre-authorized object-store URL
    pub async fn put_object(
        &self,
        destination: &Url,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Rejection> {
        debug!(
            host = destination.host_str().unwrap_or(""),
            len = bytes.len(),
            content_type = %content_type,
            "Transferring object"
        );

        let request = self
            .http
            .put(destination.clone())
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        send(request).await.map(|_| ())
    }

    async fn put_json<T: Serialize>(&self, url: Url, token: &str, body: &T) -> Result<(), Rejection> {
        debug!(url = %url, "PUT");
        send(self.http.put(url).bearer_auth(token).json(body))
            .await
            .map(|_| ())
    }
}

/// Send a request; non-success statuses become rejections
async fn send(request: RequestBuilder) -> Result<Response, Rejection> {
    let response = request.send().await.map_err(Rejection::transport)?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Rejection::from_status(status.as_u16(), &body))
}

/// Decode a JSON success body
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Rejection> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(Rejection::transport)?;
    serde_json::from_str(&body).map_err(|e| Rejection::malformed(status, e))
}
