use std::collections::HashMap;

use crate::types::{Combined, Entry, Instance, Tunable};
use crate::Error;

const MAX_DEPTH: u32 = 64;

/// Expands every `<r>` reference placeholder in `combined` into a deep copy
/// of the subtree registered under its `x` key, recursing into the
/// substituted subtree so a chain of references resolves fully.
pub fn expand(combined: Combined) -> Result<Combined, Error> {
    let mut registry = HashMap::new();
    for entry in &combined.entries {
        for instance in entry.all_instances() {
            for tunable in &instance.tunables {
                collect(tunable, &mut registry);
            }
        }
    }

    let entries = combined
        .entries
        .into_iter()
        .map(|entry| expand_entry(entry, &registry))
        .collect::<Result<_, _>>()?;

    Ok(Combined { entries })
}

fn collect(tunable: &Tunable, registry: &mut HashMap<i64, Tunable>) {
    if let Some(id) = tunable.reference_id {
        registry.entry(id).or_insert_with(|| tunable.clone());
    }
    for child in &tunable.tunables {
        collect(child, registry);
    }
}

fn expand_entry(entry: Entry, registry: &HashMap<i64, Tunable>) -> Result<Entry, Error> {
    let instances = entry
        .instances
        .into_iter()
        .map(|i| expand_instance(i, registry))
        .collect::<Result<_, _>>()?;
    let modules = entry
        .modules
        .into_iter()
        .map(|i| expand_instance(i, registry))
        .collect::<Result<_, _>>()?;

    Ok(Entry {
        type_name: entry.type_name,
        instances,
        modules,
    })
}

fn expand_instance(instance: Instance, registry: &HashMap<i64, Tunable>) -> Result<Instance, Error> {
    let tunables = instance
        .tunables
        .iter()
        .map(|t| expand_tunable(t, registry, 0))
        .collect::<Result<_, _>>()?;
    Ok(Instance { tunables, ..instance })
}

fn expand_tunable(node: &Tunable, registry: &HashMap<i64, Tunable>, depth: u32) -> Result<Tunable, Error> {
    if depth > MAX_DEPTH {
        return Err(Error::Malformed(
            "reference expansion exceeded maximum depth (cyclic <r> chain?)".into(),
        ));
    }

    if node.xml_tag == "r" {
        let key = node
            .reference_id
            .ok_or_else(|| Error::Malformed("<r> element missing x attribute".into()))?;
        let target = registry.get(&key).ok_or(Error::UnresolvedReference(key))?;
        let mut expanded = expand_tunable(target, registry, depth + 1)?;
        if node.name.is_some() {
            expanded.name = node.name.clone();
        }
        return Ok(expanded);
    }

    let tunables = node
        .tunables
        .iter()
        .map(|c| expand_tunable(c, registry, depth + 1))
        .collect::<Result<_, _>>()?;
    Ok(Tunable {
        tunables,
        ..node.clone()
    })
}
