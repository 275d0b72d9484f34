//! Archive document shapes, as read from the master store.
//!
//! Only the fields the projector inspects are typed. Everything else is
//! carried in `extra` untouched, so a projection stays faithful to the
//! stored record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identity::{
    ConnectionId, EntityId, FileId, HubId, PropertyId, RelationTypeId, TemplateId, ThesaurusId,
    TranslationId,
};

/// Fixed id of the system vocabulary context in translation records.
pub const SYSTEM_CONTEXT: &str = "System";

/// A stored entity. `metadata` maps property names to value lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub template: TemplateId,
    #[serde(default)]
    pub metadata: BTreeMap<String, Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Property type tags. Only `Relationship` is significant to the sync
/// rules; everything else passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Text,
    Numeric,
    Select,
    Multiselect,
    Relationship,
    Date,
    Daterange,
    Markdown,
    Link,
    Image,
    Media,
    Geolocation,
    Preview,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateProperty {
    pub id: PropertyId,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    /// For select properties the backing thesaurus; for relationship
    /// properties the template the edge may point at. Empty means any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<RelationTypeId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateProperty {
    /// An empty or absent `content` means the property may reach
    /// entities of any template.
    pub fn generic_content(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<TemplateProperty>,
    /// Fixed properties every template carries (title among them).
    #[serde(default)]
    pub common_properties: Vec<TemplateProperty>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Template {
    /// Label of the fixed title property, if present.
    pub fn title_label(&self) -> Option<&str> {
        self.common_properties
            .iter()
            .find(|p| p.name == "title")
            .map(|p| p.label.as_str())
    }
}

/// One edge of an n-ary relationship. Edges sharing a `hub` belong to
/// the same relationship instance.
///
/// Invariant: `entity` resolves to a stored [`Entity`]; a dangling edge
/// is a store inconsistency, not a policy outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub entity: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<RelationTypeId>,
    pub hub: HubId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Entity the file is attached to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thesaurus {
    pub id: ThesaurusId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationType {
    pub id: RelationTypeId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranslationValue {
    pub key: String,
    pub value: String,
}

/// One vocabulary inside a translation record: the system context, a
/// template's labels, a relation type's labels or a thesaurus's labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranslationContext {
    pub id: String,
    #[serde(default)]
    pub values: Vec<TranslationValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub locale: String,
    #[serde(default)]
    pub contexts: Vec<TranslationContext>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tenant settings. Only `id` and `languages` are replicable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: String,
    #[serde(default)]
    pub languages: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
