//! # Collaboration Engine
//!
//! Applies operations to shared documents: validation, permission checks,
//! transformation of stale operations, content splicing, persistence and
//! event emission.
//!
//! Storage and permission lookups are traits; in-memory implementations
//! are provided for tests and the developer CLI.

pub mod config;
pub mod errors;
pub mod events;
pub mod locks;
pub mod orchestrator;
pub mod permissions;
pub mod store;

pub use config::EngineConfig;
pub use errors::{CollabError, CollabResult, ConfigError, ConfigResult, StoreError, StoreResult};
pub use events::CollabEvent;
pub use locks::{DocumentGuard, DocumentLocks};
pub use orchestrator::{Orchestrator, ProcessOutcome};
pub use permissions::{MembershipPermissions, OpenAccess, PermissionChecker, Role};
pub use store::{
    DeltaRecord, DeltaStore, DocumentSnapshot, DocumentStore, InMemoryDeltaStore,
    InMemoryDocumentStore,
};
