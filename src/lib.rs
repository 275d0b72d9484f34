//! Selective synchronization engine for a multi-tenant document archive.
//!
//! Every mutation to the archive lands in an append-only change log. One
//! dispatcher worker per registered replica replays that log through a
//! policy-driven projector and pushes redacted records to the replica's
//! endpoint, advancing a durable cursor only on confirmed delivery.

#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod projector;
pub mod replica;
pub mod store;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    ChangeRecord, Connection, ConnectionId, Cursor, Entity, EntityId, FileId, FileRecord, HubId,
    Namespace, Policy, PropertyId, PropertyKind, RelationType, RelationTypeId, Settings, Template,
    TemplateId, TemplateProperty, TemplateRule, Thesaurus, ThesaurusId, Timestamp, Translation,
    TranslationId,
};
pub use crate::dispatcher::{
    CursorStore, DispatchContext, Dispatcher, FsCursorStore, HttpTransport, SyncDelivery,
    SyncTransport,
};
pub use crate::projector::{ProjectError, Projector, SkipReason, Verdict};
pub use crate::replica::{ReplicaEntry, ReplicaRegistry};
pub use crate::store::{ChangeLog, DocumentStore, MemoryStore, StoreError};
