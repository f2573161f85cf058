//! Interpretation of tagged block sequences into an [`EntityRegistry`].
//!
//! A source is a sequence of single-key mappings. The key selects the block
//! kind from the capability's [`Vocabulary`](super::Vocabulary); the value
//! holds the block's fields. Blocks are applied strictly in order and each one
//! is committed as soon as it succeeds.

use super::{ContextVocabulary, EntityKind, EntityRegistry, Group, Member};
use crate::capability::ConfigArgs;
use crate::error::{Error, Namespace, Result};
use crate::schema_loader;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Apply every block of `source` to `registry`, stopping at the first error.
pub(crate) fn load_blocks<K: EntityKind>(
    registry: &mut EntityRegistry<K>,
    source: &Value,
    origin: &str,
    base_dir: &Path,
) -> Result<()> {
    let Some(blocks) = source.as_array() else {
        return Err(Error::schema(origin, "source must be a sequence of blocks", Vec::new()));
    };
    let schema = schema_loader::block_schema()?;
    let vocab = K::VOCABULARY;
    for (index, block) in blocks.iter().enumerate() {
        schema.check(block, &format!("{origin} block {index}"))?;
        let Some((kind, body)) = single_entry(block) else {
            return Err(Error::schema(
                format!("{origin} block {index}"),
                "each block must be a single-key mapping",
                block_keys(block),
            ));
        };
        let Some(fields) = body.as_object() else {
            return Err(Error::schema(
                format!("{origin} block {index} ({kind})"),
                "block body must be a mapping",
                Vec::new(),
            ));
        };
        let fields = fields.clone();
        if kind == vocab.item {
            load_item(registry, fields)?;
        } else if kind == vocab.group {
            load_group(registry, fields)?;
        } else if let Some(context) = vocab.context.filter(|ctx| ctx.block == kind) {
            load_context(registry, context, fields, base_dir)?;
        } else {
            return Err(Error::schema(
                format!("{origin} block {index}"),
                format!(
                    "unrecognized block kind '{kind}'; expected one of {:?}",
                    vocab.block_kinds()
                ),
                block_keys(block),
            ));
        }
    }
    Ok(())
}

fn load_item<K: EntityKind>(registry: &mut EntityRegistry<K>, mut fields: ConfigArgs) -> Result<()> {
    let vocab = K::VOCABULARY;
    let name = take_string(&mut fields, "name", vocab.item)?;
    let selector = take_string(&mut fields, vocab.selector, vocab.item)?;
    registry.ensure_vacant(Namespace::Item, &name)?;

    let constructor = registry.classes.resolve(&selector)?;
    let item = K::build_item(registry, constructor, &name, &selector, fields)?;
    tracing::debug!(registry = vocab.registry, item = %name, class = %selector, "registered item");
    registry.items.insert(name, item);
    Ok(())
}

fn load_group<K: EntityKind>(registry: &mut EntityRegistry<K>, mut fields: ConfigArgs) -> Result<()> {
    let vocab = K::VOCABULARY;
    let name = take_string(&mut fields, "name", vocab.group)?;
    let Some(members) = fields.remove(vocab.members) else {
        return Err(missing_field(vocab.group, vocab.members, &fields));
    };
    registry.ensure_vacant(Namespace::Group, &name)?;

    let entries = member_entries(&name, vocab.members, &members)?;
    let mut resolved = Vec::with_capacity(entries.len());
    for (label, member) in entries {
        let Some(item) = registry.items.get(&member) else {
            return Err(Error::UnresolvedReference {
                registry: vocab.registry,
                group: name,
                member,
                known: registry.items.keys().cloned().collect(),
            });
        };
        resolved.push(Member {
            label,
            name: member,
            item: Arc::clone(item),
        });
    }
    tracing::debug!(
        registry = vocab.registry,
        group = %name,
        members = resolved.len(),
        "registered group"
    );
    registry.groups.insert(
        name.clone(),
        Group {
            name,
            members: resolved,
        },
    );
    Ok(())
}

fn load_context<K: EntityKind>(
    registry: &mut EntityRegistry<K>,
    vocab: ContextVocabulary,
    mut fields: ConfigArgs,
    base_dir: &Path,
) -> Result<()> {
    let name = take_string(&mut fields, "name", vocab.block)?;
    let source = take_string(&mut fields, vocab.source, vocab.block)?;
    registry.ensure_vacant(Namespace::Context, &name)?;

    let path = base_dir.join(&source);
    let context = K::build_context(&name, &path)?;
    tracing::debug!(
        registry = K::VOCABULARY.registry,
        context = %name,
        source = %path.display(),
        "registered context"
    );
    registry.contexts.insert(name, Arc::new(context));
    Ok(())
}

/// `(label, item name)` pairs from a list or a label → name mapping.
fn member_entries(group: &str, key: &str, members: &Value) -> Result<Vec<(String, String)>> {
    let invalid = || {
        Error::schema(
            group,
            format!("'{key}' must be a list of names or a mapping of label to name"),
            Vec::new(),
        )
    };
    match members {
        Value::Array(names) => names
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(|name| (name.to_string(), name.to_string()))
                    .ok_or_else(invalid)
            })
            .collect(),
        Value::Object(mapping) => {
            let mut entries = mapping
                .iter()
                .map(|(label, entry)| {
                    entry
                        .as_str()
                        .map(|name| (label.clone(), name.to_string()))
                        .ok_or_else(invalid)
                })
                .collect::<Result<Vec<_>>>()?;
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(entries)
        }
        _ => Err(invalid()),
    }
}

/// Remove a required string field from a block body.
fn take_string(fields: &mut ConfigArgs, key: &str, block: &str) -> Result<String> {
    match fields.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        Some(other) => {
            let keys = {
                let mut keys: Vec<String> = fields.keys().cloned().collect();
                keys.push(key.to_string());
                keys.sort();
                keys
            };
            Err(Error::schema(
                block,
                format!(
                    "'{key}' must be a non-empty string, got {}",
                    crate::capability::value_type_name(&other)
                ),
                keys,
            ))
        }
        None => Err(missing_field(block, key, fields)),
    }
}

fn missing_field(block: &str, key: &str, fields: &ConfigArgs) -> Error {
    Error::schema(
        block,
        format!("expected '{key}' in block"),
        fields.keys().cloned().collect(),
    )
}

fn single_entry(block: &Value) -> Option<(&str, &Value)> {
    let map = block.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.iter().next().map(|(kind, body)| (kind.as_str(), body))
}

fn block_keys(block: &Value) -> Vec<String> {
    block
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}
