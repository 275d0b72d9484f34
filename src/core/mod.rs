//! Core domain types for the sync engine.
//!
//! Module hierarchy follows type dependency order:
//! - identity: validated record identifiers
//! - namespace: change-log namespace tags
//! - change: log records and replica cursors
//! - document: archive record shapes as read from the master store
//! - policy: per-replica data-sharing rules

pub mod change;
pub mod document;
pub mod error;
pub mod identity;
pub mod namespace;
pub mod policy;

pub use change::{ChangeRecord, Cursor, Timestamp};
pub use document::{
    Connection, Entity, FileRecord, PropertyKind, RelationType, SYSTEM_CONTEXT, Settings,
    Template, TemplateProperty, Thesaurus, Translation, TranslationContext, TranslationValue,
};
pub use error::{CoreError, InvalidId};
pub use identity::{
    ConnectionId, EntityId, FileId, HubId, PropertyId, RelationTypeId, TemplateId, ThesaurusId,
    TranslationId,
};
pub use namespace::Namespace;
pub use policy::{FilterError, Policy, TemplateRule, matches_filter};
