//! Relationship reachability over hub siblings.
//!
//! A connection is an edge of an n-ary relationship; whether a replica
//! may see it depends not just on the edge itself but on the properties
//! of the other entities in the same hub. Evaluated per edge at sync
//! time so the verdict always reflects the current policy and template
//! shape.

use crate::core::{Connection, ConnectionId, Entity, Policy, PropertyKind};
use crate::store::DocumentStore;

use super::{ProjectError, SkipReason, Verdict};

pub(super) fn project_connection(
    store: &dyn DocumentStore,
    policy: &Policy,
    id: &ConnectionId,
) -> Result<Verdict, ProjectError> {
    let Some(connection) = store.connection(id)? else {
        return Ok(Verdict::Skip(SkipReason::Missing));
    };

    // Rule 1: the edge's own relation type is shared outright.
    if let Some(relation_type) = &connection.template {
        if policy.relation_type_allowed(relation_type) {
            return Ok(Verdict::Publish(serde_json::to_value(&connection)?));
        }
    }

    let entity = store
        .entity(&connection.entity)?
        .ok_or_else(|| ProjectError::MissingEntity {
            connection: connection.id.clone(),
            entity: connection.entity.clone(),
        })?;

    // Rule 2: a template-less edge emitted from a shared relationship
    // property on its own entity, independent of what it points at.
    if connection.template.is_none() && owns_shared_relationship_property(store, policy, &entity)? {
        return Ok(Verdict::Publish(serde_json::to_value(&connection)?));
    }

    // Rule 3: some sibling's entity carries a shared relationship
    // property that reaches this edge from the other side of the hub.
    if reachable_through_siblings(store, policy, &connection, &entity)? {
        return Ok(Verdict::Publish(serde_json::to_value(&connection)?));
    }

    Ok(Verdict::Skip(SkipReason::Unreachable))
}

fn owns_shared_relationship_property(
    store: &dyn DocumentStore,
    policy: &Policy,
    entity: &Entity,
) -> Result<bool, ProjectError> {
    let Some(rule) = policy.template_rule(&entity.template) else {
        return Ok(false);
    };
    let Some(template) = store.template(&entity.template)? else {
        return Err(ProjectError::MissingTemplate {
            entity: entity.id.clone(),
            template: entity.template.clone(),
        });
    };
    Ok(template
        .properties
        .iter()
        .any(|p| p.kind == PropertyKind::Relationship && rule.allows_property(&p.id)))
}

fn reachable_through_siblings(
    store: &dyn DocumentStore,
    policy: &Policy,
    connection: &Connection,
    entity: &Entity,
) -> Result<bool, ProjectError> {
    let siblings = store.connections_by_hub(&connection.hub, &connection.id)?;
    for sibling in &siblings {
        let sibling_entity =
            store
                .entity(&sibling.entity)?
                .ok_or_else(|| ProjectError::MissingEntity {
                    connection: sibling.id.clone(),
                    entity: sibling.entity.clone(),
                })?;
        let Some(rule) = policy.template_rule(&sibling_entity.template) else {
            continue;
        };
        let Some(template) = store.template(&sibling_entity.template)? else {
            return Err(ProjectError::MissingTemplate {
                entity: sibling_entity.id.clone(),
                template: sibling_entity.template.clone(),
            });
        };
        for property in &template.properties {
            if property.kind != PropertyKind::Relationship || !rule.allows_property(&property.id) {
                continue;
            }
            // An edge with its own relation type must match the
            // property's; a template-less edge adopts it (the hub's
            // relation type lives on the sibling property, not on the
            // edge).
            let relation_matches = match &connection.template {
                Some(relation_type) => property.relation_type.as_ref() == Some(relation_type),
                None => true,
            };
            // Empty content is a deliberate broad match: the property
            // reaches entities of any template.
            let content_matches = property.generic_content()
                || property.content.as_deref() == Some(entity.template.as_str());
            if relation_matches && content_matches {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
