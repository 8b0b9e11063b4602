//! # Reconciliation
//!
//! Set algebra between the vehicles reported live and the trips the store
//! holds as active. Pure: no I/O and no ordering guarantee on the output.

use std::collections::HashMap;
use std::hash::Hash;

use crate::records::TripRef;

/// Result of comparing live keys against stored keys. The three maps are
/// disjoint and together cover every key of either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<K: Eq + Hash> {
    /// Live only, by live index.
    pub new: HashMap<K, usize>,

    /// Live and stored, by (live index, store index).
    pub continuing: HashMap<K, (usize, usize)>,

    /// Stored only, by store index.
    pub ended: HashMap<K, usize>,
}

/// Map each key to the position of the item carrying it. When a key repeats,
/// the last occurrence wins.
pub fn index_by_key<T, K, F>(items: &[T], key: F) -> HashMap<K, usize>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    items.iter().enumerate().map(|(idx, item)| (key(item), idx)).collect()
}

/// Classify keys into new, continuing and ended.
#[must_use]
pub fn classify<K>(live: &HashMap<K, usize>, store: &HashMap<K, usize>) -> Classification<K>
where
    K: Eq + Hash + Clone,
{
    let mut new = HashMap::new();
    let mut continuing = HashMap::new();

    for (key, &live_idx) in live {
        match store.get(key) {
            Some(&store_idx) => {
                continuing.insert(key.clone(), (live_idx, store_idx));
            }
            None => {
                new.insert(key.clone(), live_idx);
            }
        }
    }

    let ended = store
        .iter()
        .filter(|(key, _)| !live.contains_key(*key))
        .map(|(key, &idx)| (key.clone(), idx))
        .collect();

    Classification { new, continuing, ended }
}

/// Keep the most recent active trip per plate. Older trips sharing a plate
/// are returned separately for closure, so at most one trip per plate stays
/// active. Both sides keep input order.
#[must_use]
pub fn split_duplicates(active: Vec<TripRef>) -> (Vec<TripRef>, Vec<TripRef>) {
    let mut latest: HashMap<String, usize> = HashMap::new();
    for (idx, trip) in active.iter().enumerate() {
        latest
            .entry(trip.key.plate_number.clone())
            .and_modify(|kept| {
                if trip.key.initiation_time > active[*kept].key.initiation_time {
                    *kept = idx;
                }
            })
            .or_insert(idx);
    }

    let mut unique = Vec::with_capacity(latest.len());
    let mut duplicates = Vec::new();
    for (idx, trip) in active.into_iter().enumerate() {
        if latest.get(&trip.key.plate_number) == Some(&idx) {
            unique.push(trip);
        } else {
            duplicates.push(trip);
        }
    }

    (unique, duplicates)
}
