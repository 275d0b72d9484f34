//! The sync projector: per-record visibility and redaction.
//!
//! Given one change record and a replica's policy, decide whether the
//! record is visible at all, and if so produce the redacted projection
//! the replica is entitled to. Redaction failures fail closed (skip);
//! store inconsistencies fail loud (halt the batch).

mod connections;
mod entities;
mod translations;

use std::fmt;

use serde_json::{Value, json};
use thiserror::Error;

use crate::core::{
    ChangeRecord, ConnectionId, CoreError, EntityId, FileId, Namespace, Policy, RelationTypeId,
    TemplateId, ThesaurusId, TranslationId,
};
use crate::error::{Effect, Transience};
use crate::store::{DocumentStore, StoreError};

/// Outcome of projecting one change record for one replica.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Send the redacted projection.
    Publish(Value),
    /// Forward a deletion marker; deletions carry no payload.
    Delete,
    /// Not visible to this replica. The cursor still advances past it.
    Skip(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The record vanished between log append and sync.
    Missing,
    /// The whitelists do not cover the record.
    NotWhitelisted,
    /// The entity failed its template's filter predicate.
    FilterRejected,
    /// The filter predicate could not be evaluated safely; withholding
    /// beats leaking.
    FilterUnsafe { reason: String },
    /// No reachability rule admits the connection.
    Unreachable,
    /// The file hangs off an entity outside the whitelist, or one that
    /// cannot be resolved.
    HiddenAttachment,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Missing => write!(f, "record missing"),
            SkipReason::NotWhitelisted => write!(f, "not whitelisted"),
            SkipReason::FilterRejected => write!(f, "filter rejected"),
            SkipReason::FilterUnsafe { reason } => write!(f, "filter unsafe: {reason}"),
            SkipReason::Unreachable => write!(f, "relationship unreachable"),
            SkipReason::HiddenAttachment => write!(f, "attached entity hidden"),
        }
    }
}

/// Projection failed in a way that must halt the replica's batch.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("connection {connection} references missing entity {entity}")]
    MissingEntity {
        connection: ConnectionId,
        entity: EntityId,
    },
    #[error("entity {entity} references missing template {template}")]
    MissingTemplate {
        entity: EntityId,
        template: TemplateId,
    },
    #[error("record {id} vanished from unhandled namespace {namespace}")]
    MissingRaw { namespace: Namespace, id: String },
    #[error("change record for {namespace} carries invalid id: {source}")]
    BadRecordId {
        namespace: Namespace,
        #[source]
        source: CoreError,
    },
    #[error("failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProjectError {
    pub fn transience(&self) -> Transience {
        match self {
            ProjectError::Store(err) => err.transience(),
            // Dangling references may heal once the store catches up.
            ProjectError::MissingEntity { .. }
            | ProjectError::MissingTemplate { .. }
            | ProjectError::MissingRaw { .. } => Transience::Unknown,
            ProjectError::BadRecordId { .. } | ProjectError::Encode(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Stateless projection over a store snapshot and one replica's policy.
/// Both are passed in explicitly; there is no ambient tenant state.
pub struct Projector<'a> {
    store: &'a dyn DocumentStore,
    policy: &'a Policy,
}

impl<'a> Projector<'a> {
    pub fn new(store: &'a dyn DocumentStore, policy: &'a Policy) -> Self {
        Self { store, policy }
    }

    /// Decide visibility and produce the redacted projection for one
    /// change record.
    pub fn project(&self, record: &ChangeRecord) -> Result<Verdict, ProjectError> {
        if record.deleted {
            // Deletions bypass projection: the replica drops the record
            // if it ever had it, which is idempotent either way.
            return Ok(Verdict::Delete);
        }

        match &record.namespace {
            Namespace::Settings => self.settings(),
            Namespace::Templates => {
                let id: TemplateId = parse_record_id(record)?;
                self.template(&id)
            }
            Namespace::Entities => {
                let id: EntityId = parse_record_id(record)?;
                entities::project_entity(self.store, self.policy, &id)
            }
            Namespace::Connections => {
                let id: ConnectionId = parse_record_id(record)?;
                connections::project_connection(self.store, self.policy, &id)
            }
            Namespace::Files => {
                let id: FileId = parse_record_id(record)?;
                self.file(&id)
            }
            Namespace::Dictionaries => {
                let id: ThesaurusId = parse_record_id(record)?;
                self.thesaurus(&id)
            }
            Namespace::Relationtypes => {
                let id: RelationTypeId = parse_record_id(record)?;
                self.relation_type(&id)
            }
            Namespace::Translations => {
                let id: TranslationId = parse_record_id(record)?;
                translations::project_translation(self.store, self.policy, &id)
            }
            Namespace::Other(_) => self.raw(record),
        }
    }

    fn settings(&self) -> Result<Verdict, ProjectError> {
        let Some(settings) = self.store.settings()? else {
            return Ok(Verdict::Skip(SkipReason::Missing));
        };
        // Only the language roster is replicable.
        Ok(Verdict::Publish(json!({
            "id": settings.id,
            "languages": settings.languages,
        })))
    }

    fn template(&self, id: &TemplateId) -> Result<Verdict, ProjectError> {
        let Some(mut template) = self.store.template(id)? else {
            return Ok(Verdict::Skip(SkipReason::Missing));
        };
        let Some(rule) = self.policy.template_rule(id) else {
            return Ok(Verdict::Skip(SkipReason::NotWhitelisted));
        };
        template.properties.retain(|p| rule.allows_property(&p.id));
        Ok(Verdict::Publish(serde_json::to_value(&template)?))
    }

    fn file(&self, id: &FileId) -> Result<Verdict, ProjectError> {
        let Some(file) = self.store.file(id)? else {
            return Ok(Verdict::Skip(SkipReason::Missing));
        };
        if let Some(entity_id) = &file.entity {
            match self.store.entity(entity_id)? {
                Some(entity) if self.policy.template_allowed(&entity.template) => {}
                _ => return Ok(Verdict::Skip(SkipReason::HiddenAttachment)),
            }
        }
        Ok(Verdict::Publish(serde_json::to_value(&file)?))
    }

    fn thesaurus(&self, id: &ThesaurusId) -> Result<Verdict, ProjectError> {
        let Some(thesaurus) = self.store.thesaurus(id)? else {
            return Ok(Verdict::Skip(SkipReason::Missing));
        };
        if !self.policy.thesaurus_allowed(id) {
            return Ok(Verdict::Skip(SkipReason::NotWhitelisted));
        }
        // No partial redaction of thesaurus values.
        Ok(Verdict::Publish(serde_json::to_value(&thesaurus)?))
    }

    fn relation_type(&self, id: &RelationTypeId) -> Result<Verdict, ProjectError> {
        let Some(relation_type) = self.store.relation_type(id)? else {
            return Ok(Verdict::Skip(SkipReason::Missing));
        };
        if !self.policy.relation_type_allowed(id) {
            return Ok(Verdict::Skip(SkipReason::NotWhitelisted));
        }
        Ok(Verdict::Publish(serde_json::to_value(&relation_type)?))
    }

    fn raw(&self, record: &ChangeRecord) -> Result<Verdict, ProjectError> {
        let Some(value) = self.store.raw(&record.namespace, &record.record_id)? else {
            // No redaction rule means no grounds to treat absence as a
            // benign race; surface it.
            return Err(ProjectError::MissingRaw {
                namespace: record.namespace.clone(),
                id: record.record_id.clone(),
            });
        };
        Ok(Verdict::Publish(value))
    }
}

fn parse_record_id<T>(record: &ChangeRecord) -> Result<T, ProjectError>
where
    T: TryFrom<String, Error = CoreError>,
{
    T::try_from(record.record_id.clone()).map_err(|source| ProjectError::BadRecordId {
        namespace: record.namespace.clone(),
        source,
    })
}
