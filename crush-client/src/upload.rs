//! Profile picture upload
//!
//! Two steps: ask the backend for a single-use, pre-authorized upload slot,
//! then write the bytes straight to the object store at that slot. The
//! backend is not told about completion; the slot's location is canonical.

use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{Rejection, UploadError};

/// Fallback when the content type cannot be determined
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    /// Pre-authorized URL the bytes were written to
    pub destination: Url,
    /// Content type sent with the bytes
    pub content_type: String,
}

impl UploadSlot {
    /// Destination without its authorization query
    pub fn public_location(&self) -> Url {
        let mut url = self.destination.clone();
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

/// Single-flight picture uploader
#[derive(Clone)]
pub struct UploadCoordinator {
    api: ApiClient,
    uploading: Arc<AtomicBool>,
}

/// Resets the in-flight flag however the upload ends
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UploadCoordinator {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            uploading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::Acquire)
    }

    /// Upload `bytes` as the picture of `identity`
    ///
    /// Returns [`UploadError::Busy`] if another upload from this coordinator
    /// is still in flight. A failed slot request never reaches the transfer
    /// step.
    pub async fn upload_picture(
        &self,
        identity: &str,
        token: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadSlot, UploadError> {
        if self
            .uploading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(UploadError::Busy);
        }
        let _in_flight = InFlight(Arc::clone(&self.uploading));

        let destination = self.request_slot(identity, token).await?;

        let len = bytes.len();
        if let Err(rejection) = self.api.put_object(&destination, bytes, content_type).await {
            warn!(identity = %identity, status = ?rejection.status, "Picture transfer failed: {}", rejection);
            return Err(UploadError::TransferFailed(rejection));
        }

        info!(identity = %identity, len, "Picture uploaded");
        Ok(UploadSlot {
            destination,
            content_type: content_type.to_string(),
        })
    }

    async fn request_slot(&self, identity: &str, token: &str) -> Result<Url, UploadError> {
        let response = self
            .api
            .request_upload_slot(identity, token)
            .await
            .map_err(|rejection| {
                warn!(identity = %identity, status = ?rejection.status, "Upload slot refused: {}", rejection);
                UploadError::SlotUnavailable(rejection)
            })?;

        let raw = response
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                UploadError::SlotUnavailable(Rejection::malformed(200, "no upload URL in response"))
            })?;

        Url::parse(&raw).map_err(|e| {
            UploadError::SlotUnavailable(Rejection::malformed(200, format!("bad upload URL: {}", e)))
        })
    }
}

/// Best guess at the content type of `bytes`
///
/// Magic bytes win; otherwise the file extension; otherwise
/// [`OCTET_STREAM`].
pub fn content_type_for(bytes: &[u8], file_name: Option<&str>) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }

    let extension = file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => OCTET_STREAM,
    }
    .to_string()
}
