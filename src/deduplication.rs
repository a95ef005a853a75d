// 🔍 Deduplication - soft-key duplicate removal
// Datasets are loosely keyed (patient name, guide number), so duplicates are
// resolved by position: either the first or the last occurrence of a key wins.
// Survivors always keep their original relative order.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    /// First occurrence of a key wins (billing lines)
    First,
    /// Last occurrence of a key wins (latest APAC / census entry per patient)
    Last,
}

/// Drop every item whose key was already seen, keeping the first occurrence
pub fn keep_first_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Keep only the last occurrence of every key
pub fn keep_last_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let items: Vec<T> = items.into_iter().collect();
    let mut seen = HashSet::new();
    let mut keep = vec![false; items.len()];

    for (i, item) in items.iter().enumerate().rev() {
        if seen.insert(key(item)) {
            keep[i] = true;
        }
    }

    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, kept)| kept.then_some(item))
        .collect()
}

pub fn dedup_by<T, K, F>(items: impl IntoIterator<Item = T>, policy: KeepPolicy, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    match policy {
        KeepPolicy::First => keep_first_by(items, key),
        KeepPolicy::Last => keep_last_by(items, key),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_first_preserves_order() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let kept = keep_first_by(rows, |r| r.0);
        assert_eq!(kept, vec![("a", 1), ("b", 2), ("c", 4)]);
    }

    #[test]
    fn test_keep_last_preserves_order_of_survivors() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let kept = keep_last_by(rows, |r| r.0);
        assert_eq!(kept, vec![("a", 3), ("c", 4), ("b", 5)]);
    }

    #[test]
    fn test_composite_key() {
        let rows = vec![
            ("Maria Silva", "123", "HEMODIÁLISE", 10.0),
            ("Maria Silva", "123", "HEMODIÁLISE", 99.0),
            ("Maria Silva", "124", "HEMODIÁLISE", 5.0),
        ];
        let kept = dedup_by(rows, KeepPolicy::First, |r| (r.0, r.1, r.2));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].3, 10.0);
    }

    #[test]
    fn test_empty_input() {
        let kept: Vec<(i32, i32)> = keep_last_by(Vec::new(), |r: &(i32, i32)| r.0);
        assert!(kept.is_empty());
    }
}
