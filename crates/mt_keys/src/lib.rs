//! Resource identity and the filter algebra used to select subsets of a
//! package's resources.

use std::fmt;

/// A resource's identity triple: `(type, group, instance)`.
///
/// Equality is componentwise, which `#[derive(PartialEq)]` gives us for
/// free since there's no padding or interior mutability to worry about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub type_id: u32,
    pub group: u32,
    pub instance: u64,
}

impl Key {
    pub fn new(type_id: u32, group: u32, instance: u64) -> Self {
        Self {
            type_id,
            group,
            instance,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}!{:08x}!{:016x}",
            self.type_id, self.group, self.instance
        )
    }
}

/// A filter over [`Key`]s: three optional sets, one per component.
///
/// A missing (`None`) set matches anything for that component; a present
/// set requires membership. Order within a set has no semantic meaning for
/// `Include`, but [`Filter::merge`] preserves first-seen order when unioning
/// sets, matching how the original engine builds filters incrementally from
/// script `include`/`exclude` statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub types: Option<Vec<u32>>,
    pub groups: Option<Vec<u32>>,
    pub instances: Option<Vec<u64>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(types: Vec<u32>) -> Self {
        Self {
            types: Some(types),
            ..Self::default()
        }
    }

    pub fn with_groups(groups: Vec<u32>) -> Self {
        Self {
            groups: Some(groups),
            ..Self::default()
        }
    }

    pub fn with_instances(instances: Vec<u64>) -> Self {
        Self {
            instances: Some(instances),
            ..Self::default()
        }
    }

    /// Whether `key` passes this filter: for every non-empty component set,
    /// the key's corresponding component must be a member.
    pub fn includes(&self, key: &Key) -> bool {
        component_matches(&self.types, &key.type_id)
            && component_matches(&self.groups, &key.group)
            && component_matches(&self.instances, &key.instance)
    }

    /// Unions `self` with `other`, per component. A missing set on either
    /// side means "anything" and wins (propagates as missing); two present
    /// sets are unioned with duplicates removed and first-seen order kept.
    pub fn merge(&self, other: &Filter) -> Filter {
        Filter {
            types: merge_component(&self.types, &other.types),
            groups: merge_component(&self.groups, &other.groups),
            instances: merge_component(&self.instances, &other.instances),
        }
    }
}

fn component_matches<T: PartialEq>(set: &Option<Vec<T>>, value: &T) -> bool {
    match set {
        None => true,
        Some(members) => members.iter().any(|m| m == value),
    }
}

fn merge_component<T: PartialEq + Clone>(a: &Option<Vec<T>>, b: &Option<Vec<T>>) -> Option<Vec<T>> {
    match (a, b) {
        (None, None) => None,
        (None, Some(_)) => b.clone(),
        (Some(_), None) => a.clone(),
        (Some(a), Some(b)) => {
            let mut out = a.clone();
            for item in b {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_respects_each_component() {
        let key = Key::new(1, 2, 3);
        let filter = Filter::with_types(vec![1]);
        let filter = Filter {
            instances: Some(vec![3]),
            ..filter
        };
        assert!(filter.includes(&key));

        let filter_mismatch = Filter {
            instances: Some(vec![4]),
            ..filter
        };
        assert!(!filter_mismatch.includes(&key));
    }

    #[test]
    fn empty_filter_includes_everything() {
        let key = Key::new(9, 9, 9);
        assert!(Filter::new().includes(&key));
    }

    #[test]
    fn merge_unions_each_component() {
        let a = Filter::with_types(vec![1]);
        let b = Filter::with_types(vec![2]);
        let merged = a.merge(&b);
        assert_eq!(merged.types, Some(vec![1, 2]));
        assert_eq!(merged.groups, None);
        assert_eq!(merged.instances, None);
    }

    #[test]
    fn merge_deduplicates() {
        let a = Filter::with_types(vec![1, 2]);
        let b = Filter::with_types(vec![2, 3]);
        let merged = a.merge(&b);
        assert_eq!(merged.types, Some(vec![1, 2, 3]));
    }

    #[test]
    fn merge_with_missing_component_yields_missing() {
        let a = Filter::with_types(vec![1]);
        let b = Filter::new();
        let merged = a.merge(&b);
        assert_eq!(merged.types, None);
    }
}
