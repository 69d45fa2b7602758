//! Test helper modules for crush-client integration tests
//!
//! - MockBackend: in-process backend + object store on an ephemeral port
//! - Wiring helpers that build a client stack against it

#![allow(dead_code)]

pub mod mock_backend;

pub use mock_backend::{MockBackend, MockConfig, RecordedRequest};

use crush_client::session::storage::MemoryStorage;
use crush_client::{ApiClient, SessionStore};
use crush_common::EventBus;

pub const IDENTITY: &str = "ada@yale.edu";
pub const TOKEN: &str = "header.payload.signature";

/// API client pointed at `backend`
pub fn api_for(backend: &MockBackend) -> ApiClient {
    ApiClient::new(&backend.base_url(), None).unwrap()
}

/// Session store with nothing stored
pub fn empty_store() -> SessionStore {
    SessionStore::open(MemoryStorage::new(), EventBus::new(16))
}

/// Session store already logged in as [`IDENTITY`]
pub fn logged_in_store() -> SessionStore {
    let store = empty_store();
    store.set(TOKEN, IDENTITY).unwrap();
    store
}
