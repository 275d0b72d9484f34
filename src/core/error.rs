//! Core domain errors (identifier parsing and validation).
//!
//! These are bounded and stable: core errors represent refusal states on
//! input data, not library implementation details.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Invalid record identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("template id `{raw}` is invalid: {reason}")]
    Template { raw: String, reason: String },
    #[error("property id `{raw}` is invalid: {reason}")]
    Property { raw: String, reason: String },
    #[error("entity id `{raw}` is invalid: {reason}")]
    Entity { raw: String, reason: String },
    #[error("connection id `{raw}` is invalid: {reason}")]
    Connection { raw: String, reason: String },
    #[error("thesaurus id `{raw}` is invalid: {reason}")]
    Thesaurus { raw: String, reason: String },
    #[error("relation type id `{raw}` is invalid: {reason}")]
    RelationType { raw: String, reason: String },
    #[error("hub id `{raw}` is invalid: {reason}")]
    Hub { raw: String, reason: String },
    #[error("file id `{raw}` is invalid: {reason}")]
    File { raw: String, reason: String },
    #[error("translation id `{raw}` is invalid: {reason}")]
    Translation { raw: String, reason: String },
}

/// Canonical error enum for the core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Core errors are pure input failures.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
