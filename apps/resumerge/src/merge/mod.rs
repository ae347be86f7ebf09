//! Merge Engine: folds per-resume JSON records into one master resume.
//! Pure and synchronous; file loading and writing live in `pipeline`.

pub mod coerce;
pub mod fuzzy;
pub mod models;
pub mod sections;
pub mod work;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::merge::coerce::SchemaError;
use crate::merge::fuzzy::{
    dedupe, dedupe_canonical, is_near_duplicate, normalize, similarity,
    DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::merge::models::{MasterResume, ResumeRecord, SectionKind, Sections, SkillLevel};
use crate::merge::sections::merge_section;
pub use crate::merge::work::MergeError;
use crate::merge::work::{merge_education, merge_work_history};

/// One raw per-resume document together with a label naming where it came from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub similarity_threshold: f32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub merged: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
}

impl MergeReport {
    pub fn skip(&mut self, source: impl Into<String>, reason: impl ToString) {
        self.skipped.push(SkippedRecord {
            source: source.into(),
            reason: reason.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub master: MasterResume,
    pub report: MergeReport,
}

/// Coerces every source, skips the ones that fail schema coercion, and folds
/// the rest into a `MasterResume`.
///
/// The result does not depend on the order of `sources`: valid records are
/// sorted by their canonical serialized form before any first-seen rule applies.
pub fn merge_records(
    sources: Vec<SourceDocument>,
    opts: &MergeOptions,
) -> Result<MergeOutcome, MergeError> {
    let mut report = MergeReport::default();
    let mut records: Vec<(String, String, ResumeRecord)> = Vec::new();

    for source in sources {
        match ResumeRecord::from_value(&source.value) {
            Ok(record) => {
                let key = serde_json::to_string(&record).unwrap_or_default();
                records.push((key, source.label, record));
            }
            Err(e) => {
                warn!("Skipping {}: {e}", source.label);
                report.skip(source.label, e);
            }
        }
    }

    records.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    report.merged = records.iter().map(|(_, label, _)| label.clone()).collect();
    let records: Vec<ResumeRecord> = records.into_iter().map(|(_, _, r)| r).collect();

    let master = fold_records(records, opts)?;
    debug!(
        "Merged {} records: {} skills, {} highlights, {} work entries",
        report.merged.len(),
        master.skills.len(),
        master.highlights.len(),
        master.work_history.len()
    );

    Ok(MergeOutcome { master, report })
}

/// Coerces a single raw value; exposed so callers can validate before writing.
pub fn validate(value: &Value) -> Result<ResumeRecord, SchemaError> {
    ResumeRecord::from_value(value)
}

fn fold_records(records: Vec<ResumeRecord>, opts: &MergeOptions) -> Result<MasterResume, MergeError> {
    let threshold = opts.similarity_threshold;

    // Header fields come from the most complete record; ties keep the earliest.
    let header = records
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.completeness().cmp(&b.completeness()).then(ib.cmp(ia)))
        .map(|(_, r)| (r.name.clone(), r.contact.clone(), r.summary.clone()))
        .unwrap_or_default();

    let mut skills = dedupe_canonical(records.iter().flat_map(|r| r.skills.iter()), threshold);
    skills.sort_by(|a, b| normalize(a).cmp(&normalize(b)).then_with(|| a.cmp(b)));

    let skill_levels = rank_skill_levels(&records, &skills, threshold);

    let highlights = dedupe(records.iter().flat_map(|r| r.highlights.iter()), threshold);

    let mut work = Vec::new();
    let mut education = Vec::new();
    let mut section_entries = Sections::default();
    for record in records {
        work.extend(record.work_history);
        education.extend(record.education);
        for kind in SectionKind::ALL {
            section_entries
                .get_mut(kind)
                .extend(record.sections.get(kind).iter().cloned());
        }
    }

    let mut sections = Sections::default();
    for kind in SectionKind::ALL {
        let entries = std::mem::take(section_entries.get_mut(kind));
        *sections.get_mut(kind) = merge_section(kind, entries, threshold);
    }

    Ok(MasterResume {
        name: header.0,
        contact: header.1,
        summary: header.2,
        skills,
        skill_levels,
        highlights,
        work_history: merge_work_history(work, threshold)?,
        education: merge_education(education, threshold),
        sections,
    })
}

/// Attaches every recorded level to the closest kept skill it duplicates.
/// The highest level per skill wins.
fn rank_skill_levels(
    records: &[ResumeRecord],
    skills: &[String],
    threshold: f32,
) -> BTreeMap<String, SkillLevel> {
    let mut levels: BTreeMap<String, SkillLevel> = BTreeMap::new();
    for (name, level) in records.iter().flat_map(|r| r.skill_levels.iter()) {
        let target = skills
            .iter()
            .filter(|skill| is_near_duplicate(name, skill, threshold))
            .max_by(|a, b| similarity(name, a).total_cmp(&similarity(name, b)));
        if let Some(skill) = target {
            let slot = levels.entry(skill.clone()).or_insert(*level);
            *slot = (*slot).max(*level);
        }
    }
    levels
}
