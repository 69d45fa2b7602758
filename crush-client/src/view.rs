//! View lifecycle and the profile editor view
//!
//! Network calls are never cancelled. Instead every result is checked on
//! arrival: it is applied only if the view that asked for it is still mounted
//! (same [`ViewTicket`] generation) and the session has not changed since the
//! request went out (same session epoch). Anything else is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crush_common::Route;

use crate::error::{FetchError, UpdateError};
use crate::guard::{admit, Admission};
use crate::profile::model::EditProfile;
use crate::profile::ProfileReconciler;
use crate::session::{Credentials, SessionStore};

/// Proof of a particular mount of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket {
    generation: u64,
}

/// Mount generation counter shared by a view and whoever tears it down
#[derive(Debug, Clone, Default)]
pub struct ViewLifecycle {
    generation: Arc<AtomicU64>,
}

impl ViewLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new mount, invalidating any earlier ticket
    pub fn mount(&self) -> ViewTicket {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        ViewTicket { generation }
    }

    /// Invalidate every outstanding ticket
    pub fn unmount(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: &ViewTicket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.generation
    }
}

/// What happened when the view mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Profile loaded and applied
    Ready,
    /// No session; navigate here instead
    Redirect(Route),
    /// The view was unmounted or the session changed while loading; the
    /// result was discarded
    Stale,
}

struct Loaded {
    record: EditProfile,
    ticket: ViewTicket,
    epoch: u64,
}

/// Profile editor view state
pub struct ProfileView {
    reconciler: ProfileReconciler,
    store: SessionStore,
    lifecycle: ViewLifecycle,
    loaded: Option<Loaded>,
}

impl ProfileView {
    pub fn new(reconciler: ProfileReconciler, store: SessionStore) -> Self {
        Self {
            reconciler,
            store,
            lifecycle: ViewLifecycle::new(),
            loaded: None,
        }
    }

    /// Handle for tearing the view down from elsewhere
    ///
    /// Unmounting through the handle invalidates in-flight loads and the
    /// loaded record alike.
    pub fn lifecycle(&self) -> ViewLifecycle {
        self.lifecycle.clone()
    }

    /// Guard, then load the profile for the current session
    ///
    /// A load failure is returned only if its result would still have been
    /// applied; otherwise it is dropped like any other stale result.
    pub async fn mount(&mut self) -> Result<MountOutcome, FetchError> {
        let session = self.store.get();
        let credentials = match (admit(&session), session.credentials()) {
            (Admission::Render, Some(c)) => c.clone(),
            (Admission::Redirect(route), _) => return Ok(MountOutcome::Redirect(route)),
            (Admission::Render, None) => return Ok(MountOutcome::Redirect(Route::Start)),
        };

        let ticket = self.lifecycle.mount();
        let epoch = self.store.epoch();
        self.loaded = None;

        let result = self
            .reconciler
            .load(credentials.identity(), credentials.token())
            .await;

        if !self.lifecycle.is_current(&ticket) || self.store.epoch() != epoch {
            debug!(identity = %credentials.identity(), "Discarding stale profile load");
            return Ok(MountOutcome::Stale);
        }

        let record = result?;
        self.loaded = Some(Loaded {
            record,
            ticket,
            epoch,
        });
        Ok(MountOutcome::Ready)
    }

    /// Tear down: drop the record and invalidate in-flight loads
    pub fn unmount(&mut self) {
        self.lifecycle.unmount();
        self.loaded = None;
    }

    /// Loaded record, if it belongs to the current mount and session
    pub fn record(&self) -> Option<&EditProfile> {
        self.current().map(|l| &l.record)
    }

    pub fn record_mut(&mut self) -> Option<&mut EditProfile> {
        let epoch = self.store.epoch();
        let lifecycle = &self.lifecycle;
        self.loaded
            .as_mut()
            .filter(|l| l.epoch == epoch && lifecycle.is_current(&l.ticket))
            .map(|l| &mut l.record)
    }

    /// Submit the basic-info part of the loaded record
    pub async fn save_basic_info(&self) -> Result<(), UpdateError> {
        let (record, credentials) = self.submission()?;
        self.reconciler
            .update_basic_info(credentials.identity(), credentials.token(), record)
            .await
    }

    /// Submit the survey answers of the loaded record
    pub async fn save_answers(&self) -> Result<(), UpdateError> {
        let (record, credentials) = self.submission()?;
        self.reconciler
            .update_answers(credentials.identity(), credentials.token(), record)
            .await
    }

    fn current(&self) -> Option<&Loaded> {
        let epoch = self.store.epoch();
        self.loaded
            .as_ref()
            .filter(|l| l.epoch == epoch && self.lifecycle.is_current(&l.ticket))
    }

    fn submission(&self) -> Result<(&EditProfile, Credentials), UpdateError> {
        let loaded = self.current().ok_or(UpdateError::NotLoaded)?;
        let credentials = self
            .store
            .get()
            .credentials()
            .cloned()
            .ok_or(UpdateError::NotLoaded)?;
        Ok((&loaded.record, credentials))
    }
}
