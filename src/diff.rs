//! Semantic diff between two versions of a document

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::document::{Record, RecordDatabase};

/// One semantic difference between two document versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum DatabaseChange {
    Added(Record),
    Removed(Record),
    Modified { before: Record, after: Record },
    PreambleChanged {
        before: Option<String>,
        after: Option<String>,
    },
}

impl DatabaseChange {
    /// Key of the affected record, if the change concerns one
    pub fn key(&self) -> Option<&str> {
        match self {
            DatabaseChange::Added(r) | DatabaseChange::Removed(r) => Some(r.key.as_str()),
            DatabaseChange::Modified { after, .. } => Some(after.key.as_str()),
            DatabaseChange::PreambleChanged { .. } => None,
        }
    }

    /// Names of fields that were added, removed or changed.
    /// Empty for anything but `Modified`.
    pub fn changed_fields(&self) -> Vec<&str> {
        let DatabaseChange::Modified { before, after } = self else {
            return Vec::new();
        };
        let names: BTreeSet<&str> = before
            .fields
            .keys()
            .chain(after.fields.keys())
            .map(String::as_str)
            .collect();
        names
            .into_iter()
            .filter(|name| before.fields.get(*name) != after.fields.get(*name))
            .collect()
    }
}

/// Produces the ordered list of changes turning `old` into `new`
pub trait DiffEngine: Send + Sync {
    fn compute_diff(&self, old: &RecordDatabase, new: &RecordDatabase) -> Vec<DatabaseChange>;
}

/// Key-matching diff.
///
/// Output order: preamble, then records of `old` in their order (removed or
/// modified), then records only present in `new` in their order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDiffEngine;

impl DiffEngine for RecordDiffEngine {
    fn compute_diff(&self, old: &RecordDatabase, new: &RecordDatabase) -> Vec<DatabaseChange> {
        let mut changes = Vec::new();

        if old.preamble != new.preamble {
            changes.push(DatabaseChange::PreambleChanged {
                before: old.preamble.clone(),
                after: new.preamble.clone(),
            });
        }

        let new_by_key: HashMap<&str, &Record> =
            new.records.iter().map(|r| (r.key.as_str(), r)).collect();

        for before in &old.records {
            match new_by_key.get(before.key.as_str()) {
                None => changes.push(DatabaseChange::Removed(before.clone())),
                Some(after) if *after != before => changes.push(DatabaseChange::Modified {
                    before: before.clone(),
                    after: (*after).clone(),
                }),
                Some(_) => {}
            }
        }

        let old_keys: HashSet<&str> = old.records.iter().map(|r| r.key.as_str()).collect();
        changes.extend(
            new.records
                .iter()
                .filter(|r| !old_keys.contains(r.key.as_str()))
                .cloned()
                .map(DatabaseChange::Added),
        );

        changes
    }
}
