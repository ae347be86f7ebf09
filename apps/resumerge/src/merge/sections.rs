//! Keyed merge for the secondary resume sections (projects, certificates,
//! awards, publications, volunteer, languages, interests, references).
//!
//! Entries sharing normalized identity fields collapse into one: scalar
//! fields fill gaps in first-seen order and list fields are unioned.

use std::collections::HashMap;

use crate::merge::fuzzy::{dedupe, normalize};
use crate::merge::models::{SectionEntry, SectionKind};

fn section_key(kind: SectionKind, entry: &SectionEntry) -> Option<Vec<String>> {
    let key: Vec<String> = kind
        .identity_fields()
        .iter()
        .map(|f| normalize(entry.field(f)))
        .collect();
    key.iter().any(|part| !part.is_empty()).then_some(key)
}

/// Merges one section across records. `entries` must be in canonical record
/// order; output keeps the first-seen order of each identity.
pub fn merge_section<I>(kind: SectionKind, entries: I, threshold: f32) -> Vec<SectionEntry>
where
    I: IntoIterator<Item = SectionEntry>,
{
    let mut merged: Vec<SectionEntry> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();

    for entry in entries {
        let Some(key) = section_key(kind, &entry) else {
            continue;
        };
        match index.get(&key) {
            Some(&slot) => absorb(&mut merged[slot], entry, threshold),
            None => {
                index.insert(key, merged.len());
                let mut entry = entry;
                for list in entry.lists.values_mut() {
                    *list = dedupe(list.iter(), threshold);
                }
                entry.lists.retain(|_, list| !list.is_empty());
                merged.push(entry);
            }
        }
    }
    merged
}

fn absorb(target: &mut SectionEntry, other: SectionEntry, threshold: f32) {
    for (field, value) in other.fields {
        let slot = target.fields.entry(field).or_default();
        if slot.trim().is_empty() {
            *slot = value;
        }
    }
    for (field, values) in other.lists {
        let slot = target.lists.entry(field).or_default();
        *slot = dedupe(slot.iter().chain(values.iter()), threshold);
    }
    target.lists.retain(|_, list| !list.is_empty());
}
