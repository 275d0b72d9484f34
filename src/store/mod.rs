//! Read seams onto the master archive.
//!
//! The document store and the change log are external collaborators; the
//! engine only consumes these traits. [`memory`] provides an in-process
//! implementation used by tests and embedders.

pub mod memory;

pub use memory::MemoryStore;

use serde_json::Value;
use thiserror::Error;

use crate::core::{
    ChangeRecord, Connection, ConnectionId, Cursor, Entity, EntityId, FileId, FileRecord, HubId,
    Namespace, RelationType, RelationTypeId, Settings, Template, TemplateId, Thesaurus,
    ThesaurusId, Translation, TranslationId,
};
use crate::error::{Effect, Transience};

/// Store access failed for a reason other than the record not existing.
/// "Not found" is an expected state and is expressed as `Ok(None)`.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("store backend unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("store data corrupt: {reason}")]
    Corrupt { reason: String },
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::Unavailable { .. } => Transience::Retryable,
            StoreError::Corrupt { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

pub type Lookup<T> = Result<Option<T>, StoreError>;

/// Read-only accessors over the archive's collections.
pub trait DocumentStore: Send + Sync {
    fn settings(&self) -> Lookup<Settings>;
    fn template(&self, id: &TemplateId) -> Lookup<Template>;
    fn entity(&self, id: &EntityId) -> Lookup<Entity>;
    fn connection(&self, id: &ConnectionId) -> Lookup<Connection>;
    fn file(&self, id: &FileId) -> Lookup<FileRecord>;
    fn thesaurus(&self, id: &ThesaurusId) -> Lookup<Thesaurus>;
    fn relation_type(&self, id: &RelationTypeId) -> Lookup<RelationType>;
    fn translation(&self, id: &TranslationId) -> Lookup<Translation>;

    /// Every other connection on `hub`. Must be a consistent snapshot of
    /// the sibling set; the reachability rules are evaluated against it.
    fn connections_by_hub(
        &self,
        hub: &HubId,
        excluding: &ConnectionId,
    ) -> Result<Vec<Connection>, StoreError>;

    /// Raw lookup for namespaces without a dedicated redaction rule.
    fn raw(&self, namespace: &Namespace, id: &str) -> Lookup<Value>;
}

/// Ordered read access to the append-only change log.
pub trait ChangeLog: Send + Sync {
    /// Records strictly newer than `cursor`, ascending by timestamp with
    /// ties in insertion order; at most `limit` records.
    fn changes_since(&self, cursor: Cursor, limit: usize) -> Result<Vec<ChangeRecord>, StoreError>;
}
