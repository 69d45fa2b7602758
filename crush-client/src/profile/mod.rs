//! Profile reconciler
//!
//! Loads the wire-shape profile into the flat edit shape and writes edits
//! back as two independent resources: basic info and survey answers. Either
//! update can succeed while the other fails; neither touches the edit record.

pub mod model;

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{FetchError, UpdateError};
use model::{answers_payload, basic_info_payload, flatten, EditProfile};

/// Profile load/update service
#[derive(Clone)]
pub struct ProfileReconciler {
    api: ApiClient,
}

impl ProfileReconciler {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch the profile for `identity` and flatten it for editing
    pub async fn load(&self, identity: &str, token: &str) -> Result<EditProfile, FetchError> {
        match self.api.get_profile(identity, token).await {
            Ok(record) => {
                info!(identity = %identity, "Profile loaded");
                Ok(flatten(&record))
            }
            Err(rejection) => {
                warn!(identity = %identity, status = ?rejection.status, "Profile load failed: {}", rejection);
                Err(FetchError::LoadFailed(rejection))
            }
        }
    }

    /// Submit the basic-info subset of `edit`
    pub async fn update_basic_info(
        &self,
        identity: &str,
        token: &str,
        edit: &EditProfile,
    ) -> Result<(), UpdateError> {
        let payload = basic_info_payload(edit);
        match self.api.put_basic_info(identity, token, &payload).await {
            Ok(()) => {
                info!(identity = %identity, "Basic info updated");
                Ok(())
            }
            Err(rejection) => {
                warn!(identity = %identity, status = ?rejection.status, "Basic info update rejected: {}", rejection);
                Err(UpdateError::BasicInfoRejected(rejection))
            }
        }
    }

    /// Submit all twelve survey answers of `edit`
    pub async fn update_answers(
        &self,
        identity: &str,
        token: &str,
        edit: &EditProfile,
    ) -> Result<(), UpdateError> {
        let payload = answers_payload(edit);
        match self.api.put_answers(identity, token, &payload).await {
            Ok(()) => {
                info!(identity = %identity, "Survey answers updated");
                Ok(())
            }
            Err(rejection) => {
                warn!(identity = %identity, status = ?rejection.status, "Survey answers update rejected: {}", rejection);
                Err(UpdateError::AnswersRejected(rejection))
            }
        }
    }
}
