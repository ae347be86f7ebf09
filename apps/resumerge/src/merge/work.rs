//! Work history and education merging.
//!
//! Dated work entries are grouped by (employer, title, start_date) with
//! normalized employer/title. Undated entries are never merged: they are
//! kept as-is and placed after every dated entry.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::merge::fuzzy::{dedupe, normalize};
use crate::merge::models::{EducationEntry, EndDate, WorkEntry};

/// Internal invariant violations. These indicate a bug, not bad input.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("work history holds two entries for {employer} / {title} starting {start}")]
    DuplicateIdentity {
        employer: String,
        title: String,
        start: NaiveDate,
    },

    #[error("work history is out of order at position {index}")]
    OrderViolation { index: usize },
}

/// Summaries are joined unless nearly identical.
const SUMMARY_THRESHOLD: f32 = 0.98;

type WorkKey = (String, String, NaiveDate);

fn work_key(entry: &WorkEntry, start: NaiveDate) -> WorkKey {
    (normalize(&entry.employer), normalize(&entry.title), start)
}

/// Merges entries from every record into one history, most recent first.
/// `entries` must already be in canonical record order; within a group the
/// first-seen employer/title spelling and bullet order are kept.
pub fn merge_work_history<I>(entries: I, threshold: f32) -> Result<Vec<WorkEntry>, MergeError>
where
    I: IntoIterator<Item = WorkEntry>,
{
    let mut groups: Vec<Vec<WorkEntry>> = Vec::new();
    let mut index: HashMap<WorkKey, usize> = HashMap::new();
    let mut undated: Vec<WorkEntry> = Vec::new();

    for entry in entries {
        let Some(start) = entry.start_date else {
            undated.push(WorkEntry {
                bullets: dedupe(&entry.bullets, threshold),
                ..entry
            });
            continue;
        };
        let key = work_key(&entry, start);
        match index.get(&key) {
            Some(&slot) => groups[slot].push(entry),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![entry]);
            }
        }
    }

    let mut merged: Vec<WorkEntry> = groups
        .into_iter()
        .filter_map(|group| merge_group(group, threshold))
        .collect();

    merged.sort_by(compare_dated);
    undated.sort_by(|a, b| {
        normalize(&a.employer)
            .cmp(&normalize(&b.employer))
            .then_with(|| normalize(&a.title).cmp(&normalize(&b.title)))
    });

    verify_ordering(&merged)?;
    merged.extend(undated);
    Ok(merged)
}

fn merge_group(group: Vec<WorkEntry>, threshold: f32) -> Option<WorkEntry> {
    let first = group.first()?;
    let end_date = EndDate::resolve(group.iter().map(|e| e.end_date));
    let bullets = dedupe(group.iter().flat_map(|e| e.bullets.iter()), threshold);
    let summary = dedupe(group.iter().map(|e| &e.summary), SUMMARY_THRESHOLD).join(" ");
    let url = group
        .iter()
        .map(|e| e.url.trim())
        .find(|u| !u.is_empty())
        .unwrap_or_default()
        .to_string();
    Some(WorkEntry {
        employer: first.employer.clone(),
        title: first.title.clone(),
        url,
        start_date: first.start_date,
        end_date,
        summary,
        bullets,
    })
}

/// Start date descending, then employer and title ascending.
fn compare_dated(a: &WorkEntry, b: &WorkEntry) -> Ordering {
    b.start_date
        .cmp(&a.start_date)
        .then_with(|| normalize(&a.employer).cmp(&normalize(&b.employer)))
        .then_with(|| normalize(&a.title).cmp(&normalize(&b.title)))
}

fn verify_ordering(dated: &[WorkEntry]) -> Result<(), MergeError> {
    for (i, pair) in dated.windows(2).enumerate() {
        match compare_dated(&pair[0], &pair[1]) {
            Ordering::Less => {}
            Ordering::Greater => return Err(MergeError::OrderViolation { index: i + 1 }),
            Ordering::Equal => {
                return Err(MergeError::DuplicateIdentity {
                    employer: pair[1].employer.clone(),
                    title: pair[1].title.clone(),
                    start: pair[1].start_date.unwrap_or(NaiveDate::MIN),
                })
            }
        }
    }
    Ok(())
}

type EducationKey = (String, String, String);

/// Merges education entries by (institution, area, study type). The earliest
/// start and the resolved end date win; courses are deduplicated.
pub fn merge_education<I>(entries: I, threshold: f32) -> Vec<EducationEntry>
where
    I: IntoIterator<Item = EducationEntry>,
{
    let mut groups: Vec<Vec<EducationEntry>> = Vec::new();
    let mut index: HashMap<EducationKey, usize> = HashMap::new();

    for entry in entries {
        let key = (
            normalize(&entry.institution),
            normalize(&entry.area),
            normalize(&entry.study_type),
        );
        match index.get(&key) {
            Some(&slot) => groups[slot].push(entry),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![entry]);
            }
        }
    }

    let mut merged: Vec<EducationEntry> = groups
        .into_iter()
        .filter_map(|group| {
            let first = group.first()?;
            Some(EducationEntry {
                institution: first.institution.clone(),
                area: first.area.clone(),
                study_type: first.study_type.clone(),
                start_date: group.iter().filter_map(|e| e.start_date).min(),
                end_date: EndDate::resolve(group.iter().map(|e| e.end_date)),
                courses: dedupe(group.iter().flat_map(|e| e.courses.iter()), threshold),
            })
        })
        .collect();

    // Dated entries first (most recent start), then undated, each by institution.
    merged.sort_by(|a, b| match (a.start_date, b.start_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| normalize(&a.institution).cmp(&normalize(&b.institution)))
    .then_with(|| normalize(&a.area).cmp(&normalize(&b.area)))
    .then_with(|| normalize(&a.study_type).cmp(&normalize(&b.study_type))));
    merged
}
