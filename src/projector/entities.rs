//! Entity visibility and metadata redaction.

use std::collections::BTreeMap;

use crate::core::{EntityId, Policy, matches_filter};
use crate::store::DocumentStore;

use super::{ProjectError, SkipReason, Verdict};

pub(super) fn project_entity(
    store: &dyn DocumentStore,
    policy: &Policy,
    id: &EntityId,
) -> Result<Verdict, ProjectError> {
    let Some(mut entity) = store.entity(id)? else {
        return Ok(Verdict::Skip(SkipReason::Missing));
    };
    let Some(rule) = policy.template_rule(&entity.template) else {
        return Ok(Verdict::Skip(SkipReason::NotWhitelisted));
    };

    if let Some(filter) = &rule.filter {
        let doc = serde_json::to_value(&entity)?;
        match matches_filter(&doc, filter) {
            Ok(true) => {}
            Ok(false) => return Ok(Verdict::Skip(SkipReason::FilterRejected)),
            Err(err) => {
                tracing::warn!(entity = %entity.id, error = %err, "unsafe entity filter, withholding record");
                return Ok(Verdict::Skip(SkipReason::FilterUnsafe {
                    reason: err.to_string(),
                }));
            }
        }
    }

    let Some(template) = store.template(&entity.template)? else {
        return Err(ProjectError::MissingTemplate {
            entity: entity.id.clone(),
            template: entity.template.clone(),
        });
    };

    // Rebuild metadata from the whitelist; properties the entity never
    // filled in stay absent rather than becoming null.
    let mut metadata = BTreeMap::new();
    for property in &template.properties {
        if !rule.allows_property(&property.id) {
            continue;
        }
        if let Some(values) = entity.metadata.get(&property.name) {
            metadata.insert(property.name.clone(), values.clone());
        }
    }
    entity.metadata = metadata;

    Ok(Verdict::Publish(serde_json::to_value(&entity)?))
}
