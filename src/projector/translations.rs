//! Translation context filtering.

use std::collections::BTreeSet;
use std::mem;

use crate::core::{Policy, SYSTEM_CONTEXT, Template, TemplateId, TemplateRule, TranslationId};
use crate::store::DocumentStore;

use super::{ProjectError, SkipReason, Verdict};

pub(super) fn project_translation(
    store: &dyn DocumentStore,
    policy: &Policy,
    id: &TranslationId,
) -> Result<Verdict, ProjectError> {
    let Some(mut translation) = store.translation(id)? else {
        return Ok(Verdict::Skip(SkipReason::Missing));
    };

    let mut kept = Vec::with_capacity(translation.contexts.len());
    for mut context in mem::take(&mut translation.contexts) {
        let whole_context_allowed = context.id == SYSTEM_CONTEXT
            || policy
                .relation_types
                .iter()
                .any(|rt| rt.as_str() == context.id)
            || policy.thesauri.iter().any(|t| t.as_str() == context.id);
        if whole_context_allowed {
            kept.push(context);
            continue;
        }

        let Ok(template_id) = TemplateId::parse(context.id.as_str()) else {
            continue;
        };
        let Some(rule) = policy.template_rule(&template_id) else {
            // Matches no vocabulary the replica may see; dropped whole.
            continue;
        };
        let Some(template) = store.template(&template_id)? else {
            // Template vanished; its labels are no longer meaningful.
            continue;
        };

        let allowed = allowed_keys(&template, rule);
        context.values.retain(|v| allowed.contains(v.key.as_str()));
        if !context.values.is_empty() {
            kept.push(context);
        }
    }
    translation.contexts = kept;

    Ok(Verdict::Publish(serde_json::to_value(&translation)?))
}

/// Keys a whitelisted template contributes to its translation context:
/// the template's own name, its title label, and the labels of allowed
/// properties.
fn allowed_keys<'t>(template: &'t Template, rule: &TemplateRule) -> BTreeSet<&'t str> {
    let mut keys = BTreeSet::new();
    keys.insert(template.name.as_str());
    if let Some(label) = template.title_label() {
        keys.insert(label);
    }
    for property in &template.properties {
        if rule.allows_property(&property.id) {
            keys.insert(property.label.as_str());
        }
    }
    keys
}
