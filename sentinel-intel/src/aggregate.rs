//! Group-by and reduce helpers shared by baseline and pattern detection.

use std::collections::BTreeMap;

/// Running count/sum for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupStats {
    pub count: usize,
    pub sum: f64,
}

impl GroupStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    /// Arithmetic mean, or `None` for an empty group.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Reduce a flat sequence of values.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut stats = Self::default();
        for value in values {
            stats.push(value);
        }
        stats
    }
}

/// Group `(key, value)` pairs and reduce each group to count and sum.
///
/// Keys come back sorted so downstream output is deterministic.
pub fn group_stats<K, I>(pairs: I) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut groups: BTreeMap<K, GroupStats> = BTreeMap::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    groups
}

/// Count occurrences per key and divide by `total`.
///
/// Returns an empty map when `total` is zero.
pub fn frequencies<K, I>(keys: I, total: usize) -> BTreeMap<K, f64>
where
    K: Ord,
    I: IntoIterator<Item = K>,
{
    if total == 0 {
        return BTreeMap::new();
    }
    group_stats(keys.into_iter().map(|k| (k, 1.0)))
        .into_iter()
        .map(|(key, stats)| (key, stats.count as f64 / total as f64))
        .collect()
}
