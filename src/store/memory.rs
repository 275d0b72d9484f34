//! In-memory archive store and change log.
//!
//! Backs the unit and integration tests; also usable by embedders that
//! keep the archive in process.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::{ChangeLog, DocumentStore, Lookup, StoreError};
use crate::core::{
    ChangeRecord, Connection, ConnectionId, Cursor, Entity, EntityId, FileId, FileRecord, HubId,
    Namespace, RelationType, RelationTypeId, Settings, Template, TemplateId, Thesaurus,
    ThesaurusId, Translation, TranslationId,
};

#[derive(Default)]
struct Inner {
    settings: Option<Settings>,
    templates: BTreeMap<TemplateId, Template>,
    entities: BTreeMap<EntityId, Entity>,
    connections: BTreeMap<ConnectionId, Connection>,
    files: BTreeMap<FileId, FileRecord>,
    thesauri: BTreeMap<ThesaurusId, Thesaurus>,
    relation_types: BTreeMap<RelationTypeId, RelationType>,
    translations: BTreeMap<TranslationId, Translation>,
    raw: BTreeMap<(String, String), Value>,
    changes: Vec<ChangeRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Corrupt {
            reason: "memory store mutex poisoned".to_string(),
        })
    }

    fn write(&self) -> MutexGuard<'_, Inner> {
        // Writers are test/embedder setup code; poisoning there is a bug.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put_settings(&self, settings: Settings) {
        self.write().settings = Some(settings);
    }

    pub fn put_template(&self, template: Template) {
        self.write().templates.insert(template.id.clone(), template);
    }

    pub fn put_entity(&self, entity: Entity) {
        self.write().entities.insert(entity.id.clone(), entity);
    }

    pub fn put_connection(&self, connection: Connection) {
        self.write()
            .connections
            .insert(connection.id.clone(), connection);
    }

    pub fn put_file(&self, file: FileRecord) {
        self.write().files.insert(file.id.clone(), file);
    }

    pub fn put_thesaurus(&self, thesaurus: Thesaurus) {
        self.write().thesauri.insert(thesaurus.id.clone(), thesaurus);
    }

    pub fn put_relation_type(&self, relation_type: RelationType) {
        self.write()
            .relation_types
            .insert(relation_type.id.clone(), relation_type);
    }

    pub fn put_translation(&self, translation: Translation) {
        self.write()
            .translations
            .insert(translation.id.clone(), translation);
    }

    pub fn put_raw(&self, namespace: &Namespace, id: &str, value: Value) {
        self.write()
            .raw
            .insert((namespace.as_str().to_string(), id.to_string()), value);
    }

    pub fn remove_entity(&self, id: &EntityId) {
        self.write().entities.remove(id);
    }

    pub fn remove_connection(&self, id: &ConnectionId) {
        self.write().connections.remove(id);
    }

    pub fn remove_template(&self, id: &TemplateId) {
        self.write().templates.remove(id);
    }

    /// Append one record to the change log. Callers log in mutation
    /// order; `changes_since` keeps that order for equal timestamps.
    pub fn log_change(&self, record: ChangeRecord) {
        self.write().changes.push(record);
    }
}

impl DocumentStore for MemoryStore {
    fn settings(&self) -> Lookup<Settings> {
        Ok(self.lock()?.settings.clone())
    }

    fn template(&self, id: &TemplateId) -> Lookup<Template> {
        Ok(self.lock()?.templates.get(id).cloned())
    }

    fn entity(&self, id: &EntityId) -> Lookup<Entity> {
        Ok(self.lock()?.entities.get(id).cloned())
    }

    fn connection(&self, id: &ConnectionId) -> Lookup<Connection> {
        Ok(self.lock()?.connections.get(id).cloned())
    }

    fn file(&self, id: &FileId) -> Lookup<FileRecord> {
        Ok(self.lock()?.files.get(id).cloned())
    }

    fn thesaurus(&self, id: &ThesaurusId) -> Lookup<Thesaurus> {
        Ok(self.lock()?.thesauri.get(id).cloned())
    }

    fn relation_type(&self, id: &RelationTypeId) -> Lookup<RelationType> {
        Ok(self.lock()?.relation_types.get(id).cloned())
    }

    fn translation(&self, id: &TranslationId) -> Lookup<Translation> {
        Ok(self.lock()?.translations.get(id).cloned())
    }

    fn connections_by_hub(
        &self,
        hub: &HubId,
        excluding: &ConnectionId,
    ) -> Result<Vec<Connection>, StoreError> {
        Ok(self
            .lock()?
            .connections
            .values()
            .filter(|c| &c.hub == hub && &c.id != excluding)
            .cloned()
            .collect())
    }

    fn raw(&self, namespace: &Namespace, id: &str) -> Lookup<Value> {
        Ok(self
            .lock()?
            .raw
            .get(&(namespace.as_str().to_string(), id.to_string()))
            .cloned())
    }
}

impl ChangeLog for MemoryStore {
    fn changes_since(&self, cursor: Cursor, limit: usize) -> Result<Vec<ChangeRecord>, StoreError> {
        let inner = self.lock()?;
        let mut batch: Vec<ChangeRecord> = inner
            .changes
            .iter()
            .filter(|record| record.timestamp > cursor.timestamp())
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        batch.sort_by_key(|record| record.timestamp);
        batch.truncate(limit);
        Ok(batch)
    }
}
