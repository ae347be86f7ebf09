//! Schema validation and best-effort coercion of untrusted LLM output.
//!
//! Every raw field is first classified into a [`Shape`], then coerced along
//! the path that shape allows. Wrong shapes are read as well as they can be
//! (a number becomes a one-item list, a mapping contributes its values) or,
//! for entry collections with no entry in them, dropped with a warning. Only
//! a non-object root or a record with nothing recognizable is a [`SchemaError`].

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::merge::models::{
    EducationEntry, EndDate, ResumeRecord, SectionEntry, SectionKind, Sections, SkillLevel,
    WorkEntry,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),

    #[error("no recognizable resume fields")]
    NoContent,
}

/// Keys tried, in order, when a mapping stands in for a single string.
const TEXT_KEYS: &[&str] = &[
    "text",
    "bullet",
    "content",
    "value",
    "description",
    "summary",
    "highlight",
];

const OPEN_END_WORDS: &[&str] = &["present", "current", "now", "ongoing", "today"];

const WORK_EMPLOYER_KEYS: &[&str] = &["employer", "company", "name", "organization"];
const WORK_TITLE_KEYS: &[&str] = &["title", "position", "role"];
const WORK_BULLET_KEYS: &[&str] = &["bullets", "highlights", "achievements"];
const WORK_SUMMARY_KEYS: &[&str] = &["summary", "description"];
const START_KEYS: &[&str] = &["start_date", "startDate", "start"];
const END_KEYS: &[&str] = &["end_date", "endDate", "end"];

const EDU_INSTITUTION_KEYS: &[&str] = &["institution", "school", "university"];
const EDU_AREA_KEYS: &[&str] = &["area", "field", "major"];
const EDU_TYPE_KEYS: &[&str] = &["study_type", "studyType", "degree"];

const SECTION_LIST_FIELDS: &[&str] = &["highlights", "courses", "keywords"];
const SECTION_DATE_FIELDS: &[&str] = &["date", "startDate", "endDate", "releaseDate"];

/// Shape of a raw field, decided before any coercion happens.
#[derive(Debug, Clone, Copy)]
enum Shape<'a> {
    Missing,
    Text(&'a str),
    Scalar(&'a Value),
    Sequence(&'a [Value]),
    Mapping(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Shape::Missing,
            Some(Value::String(s)) => Shape::Text(s),
            Some(v @ (Value::Bool(_) | Value::Number(_))) => Shape::Scalar(v),
            Some(Value::Array(items)) => Shape::Sequence(items),
            Some(Value::Object(map)) => Shape::Mapping(map),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ResumeRecord {
    /// Builds a well-typed record from an arbitrary JSON value.
    ///
    /// Accepts both the flat shape (`name`, `contact`, `skills`, `highlights`,
    /// `work_history`) and the JSON Resume shape (`basics`, `work`,
    /// `education`, skill objects with `keywords`, keyed sections).
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let root = value
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(kind_of(value)))?;
        let basics = root.get("basics").and_then(Value::as_object);

        let name = first_text(root, &["name"])
            .or_else(|| basics.and_then(|b| first_text(b, &["name"])))
            .unwrap_or_default();
        let summary = first_text(root, &["summary"])
            .or_else(|| basics.and_then(|b| first_text(b, &["summary"])))
            .unwrap_or_default();

        let mut contact = coerce_contact(root);
        if let Some(basics) = basics {
            merge_basics_contact(basics, &mut contact);
        }

        let (skills, mut skill_levels) = coerce_skills(root.get("skills"));
        read_skill_levels(root.get("skill_levels"), &mut skill_levels);

        let mut sections = Sections::default();
        for kind in SectionKind::ALL {
            *sections.get_mut(kind) = coerce_section(kind, root.get(kind.field()));
        }

        let record = ResumeRecord {
            name,
            contact,
            summary,
            skills,
            skill_levels,
            highlights: coerce_string_list(root.get("highlights")),
            work_history: coerce_work_history(root),
            education: coerce_education(root.get("education")),
            sections,
        };

        if record.is_empty() {
            return Err(SchemaError::NoContent);
        }
        Ok(record)
    }
}

/// Flattens any JSON value into display text.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            for key in TEXT_KEYS {
                if let Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) =
                    map.get(*key)
                {
                    return to_text(v);
                }
            }
            map.iter()
                .filter_map(|(k, v)| {
                    let text = to_text(v);
                    (!text.is_empty()).then(|| format!("{k}: {text}"))
                })
                .collect::<Vec<_>>()
                .join("; ")
        }
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .map(|v| to_text(v).trim().to_string())
        .find(|s| !s.is_empty())
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| map.get(*k)).find(|v| !v.is_null())
}

/// Coerces a list-of-strings field. A mapping contributes its values, a
/// single string or scalar becomes a one-element list.
fn coerce_string_list(value: Option<&Value>) -> Vec<String> {
    let texts: Vec<String> = match Shape::of(value) {
        Shape::Missing => return Vec::new(),
        Shape::Text(s) => vec![s.to_string()],
        Shape::Scalar(v) => vec![to_text(v)],
        Shape::Sequence(items) => items.iter().map(to_text).collect(),
        Shape::Mapping(map) => map.values().map(to_text).collect(),
    };
    texts
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn coerce_contact(root: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut contact = BTreeMap::new();
    let field = if root.contains_key("contact") {
        "contact"
    } else {
        "contact_info"
    };
    match Shape::of(root.get(field)) {
        Shape::Missing => {}
        Shape::Mapping(map) => {
            for (key, value) in map {
                let text = to_text(value).trim().to_string();
                if !text.is_empty() {
                    contact.insert(key.clone(), text);
                }
            }
        }
        Shape::Text(_) | Shape::Scalar(_) | Shape::Sequence(_) => {
            let text = root.get(field).map(to_text).unwrap_or_default();
            if !text.trim().is_empty() {
                contact.insert("details".to_string(), text.trim().to_string());
            }
        }
    }
    contact
}

/// Folds JSON Resume `basics` into the contact map without overriding
/// explicit `contact` values.
fn merge_basics_contact(basics: &Map<String, Value>, contact: &mut BTreeMap<String, String>) {
    for key in ["email", "phone", "url", "label"] {
        if let Some(text) = first_text(basics, &[key]) {
            contact.entry(key.to_string()).or_insert(text);
        }
    }

    if let Some(location) = basics.get("location") {
        let text = match location.as_object() {
            Some(loc) => ["address", "city", "region", "postalCode", "countryCode"]
                .iter()
                .filter_map(|k| first_text(loc, &[*k]))
                .collect::<Vec<_>>()
                .join(", "),
            None => to_text(location).trim().to_string(),
        };
        if !text.is_empty() {
            contact.entry("location".to_string()).or_insert(text);
        }
    }

    if let Some(profiles) = basics.get("profiles").and_then(Value::as_array) {
        for profile in profiles.iter().filter_map(Value::as_object) {
            let Some(network) = first_text(profile, &["network"]) else {
                continue;
            };
            if let Some(handle) = first_text(profile, &["url", "username"]) {
                contact.entry(network.to_lowercase()).or_insert(handle);
            }
        }
    }
}

type SkillLevels = BTreeMap<String, SkillLevel>;

/// Skills arrive as plain strings, comma separated strings, JSON Resume
/// objects (`name`, `level`, `keywords`), or category mappings of lists.
/// A ranked `level` is attached to the object's `name`.
fn coerce_skills(value: Option<&Value>) -> (Vec<String>, SkillLevels) {
    let mut skills = Vec::new();
    let mut levels = SkillLevels::new();
    match Shape::of(value) {
        Shape::Missing => {}
        Shape::Text(s) => skills.extend(split_skill_text(s)),
        Shape::Scalar(v) => skills.push(to_text(v)),
        Shape::Sequence(items) => {
            for item in items {
                collect_skill_item(item, &mut skills, &mut levels);
            }
        }
        Shape::Mapping(map) => {
            for item in map.values() {
                match item {
                    Value::Array(inner) => inner
                        .iter()
                        .for_each(|i| collect_skill_item(i, &mut skills, &mut levels)),
                    other => collect_skill_item(other, &mut skills, &mut levels),
                }
            }
        }
    }
    let skills = skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (skills, levels)
}

fn collect_skill_item(item: &Value, skills: &mut Vec<String>, levels: &mut SkillLevels) {
    match item {
        Value::Object(map) if map.contains_key("name") || map.contains_key("keywords") => {
            if let Some(name) = first_text(map, &["name"]) {
                if let Some(level) = first_text(map, &["level"]).and_then(|l| SkillLevel::parse(&l))
                {
                    raise_level(levels, &name, level);
                }
                skills.push(name);
            }
            if let Some(keywords) = map.get("keywords") {
                match keywords {
                    Value::Array(kws) => skills.extend(kws.iter().map(to_text)),
                    Value::String(s) => skills.extend(split_skill_text(s)),
                    other => skills.push(to_text(other)),
                }
            }
        }
        other => skills.push(to_text(other)),
    }
}

/// Reads the `skill_levels` mapping a merged master carries.
fn read_skill_levels(value: Option<&Value>, levels: &mut SkillLevels) {
    let Some(map) = value.and_then(Value::as_object) else {
        return;
    };
    for (name, level) in map {
        if let Some(level) = SkillLevel::parse(&to_text(level)) {
            raise_level(levels, name.trim(), level);
        }
    }
}

fn raise_level(levels: &mut SkillLevels, name: &str, level: SkillLevel) {
    if name.is_empty() {
        return;
    }
    let slot = levels.entry(name.to_string()).or_insert(level);
    *slot = (*slot).max(level);
}

fn split_skill_text(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Returns the items of a collection of entries. A mapping is read as a
/// single entry when it carries any of `entry_keys`, otherwise its values are
/// the entries. A bare string or scalar holds no entries and is dropped.
fn entry_items<'a>(field: &str, value: Option<&'a Value>, entry_keys: &[&str]) -> Vec<&'a Value> {
    match Shape::of(value) {
        Shape::Missing => Vec::new(),
        Shape::Sequence(items) => items.iter().collect(),
        Shape::Mapping(map) if entry_keys.iter().any(|k| map.contains_key(*k)) => {
            value.into_iter().collect()
        }
        Shape::Mapping(map) => map.values().collect(),
        Shape::Text(_) | Shape::Scalar(_) => {
            warn!(
                "Dropping field '{field}': expected entries, found {}",
                value.map(kind_of).unwrap_or("null")
            );
            Vec::new()
        }
    }
}

/// Keeps the mapping items of an entry collection, dropping the rest.
fn entry_maps<'a>(field: &str, items: Vec<&'a Value>) -> Vec<&'a Map<String, Value>> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                warn!("Dropping {field}[{i}]: expected an object, found {}", kind_of(other));
                None
            }
        })
        .collect()
}

fn coerce_work_history(root: &Map<String, Value>) -> Vec<WorkEntry> {
    let field = if root.contains_key("work_history") {
        "work_history"
    } else {
        "work"
    };
    let entry_keys: Vec<&str> = WORK_EMPLOYER_KEYS
        .iter()
        .chain(WORK_TITLE_KEYS)
        .copied()
        .collect();

    let items = entry_items(field, root.get(field), &entry_keys);
    entry_maps(field, items)
        .into_iter()
        .map(|map| WorkEntry {
            employer: first_text(map, WORK_EMPLOYER_KEYS).unwrap_or_default(),
            title: first_text(map, WORK_TITLE_KEYS).unwrap_or_default(),
            url: first_text(map, &["url"]).unwrap_or_default(),
            start_date: first_text(map, START_KEYS).and_then(|s| parse_date(&s)),
            end_date: first_text(map, END_KEYS)
                .map(|s| parse_end_date(&s))
                .unwrap_or_default(),
            summary: first_text(map, WORK_SUMMARY_KEYS).unwrap_or_default(),
            bullets: coerce_string_list(first_present(map, WORK_BULLET_KEYS)),
        })
        .filter(|entry| {
            !(entry.employer.is_empty()
                && entry.title.is_empty()
                && entry.start_date.is_none()
                && entry.summary.is_empty()
                && entry.bullets.is_empty())
        })
        .collect()
}

fn coerce_education(value: Option<&Value>) -> Vec<EducationEntry> {
    let items = entry_items("education", value, EDU_INSTITUTION_KEYS);
    entry_maps("education", items)
        .into_iter()
        .map(|map| EducationEntry {
            institution: first_text(map, EDU_INSTITUTION_KEYS).unwrap_or_default(),
            area: first_text(map, EDU_AREA_KEYS).unwrap_or_default(),
            study_type: first_text(map, EDU_TYPE_KEYS).unwrap_or_default(),
            start_date: first_text(map, START_KEYS).and_then(|s| parse_date(&s)),
            end_date: first_text(map, END_KEYS)
                .map(|s| parse_end_date(&s))
                .unwrap_or_default(),
            courses: coerce_string_list(map.get("courses")),
        })
        .filter(|entry| {
            !(entry.institution.is_empty() && entry.area.is_empty() && entry.study_type.is_empty())
        })
        .collect()
}

/// Reads a keyed section. Object items keep every field; a bare string item
/// becomes an entry named by the section's first identity field. Entries
/// whose identity fields are all empty are dropped.
fn coerce_section(kind: SectionKind, value: Option<&Value>) -> Vec<SectionEntry> {
    let identity = kind.identity_fields();
    let items: Vec<&Value> = match Shape::of(value) {
        Shape::Text(_) | Shape::Scalar(_) => value.into_iter().collect(),
        _ => entry_items(kind.field(), value, identity),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::Object(map) => Some(section_entry(map)),
            other => {
                let text = to_text(other).trim().to_string();
                let mut entry = SectionEntry::default();
                if !text.is_empty() {
                    entry.fields.insert(identity[0].to_string(), text);
                }
                Some(entry)
            }
        })
        .filter(|entry| identity.iter().any(|f| !entry.field(f).is_empty()))
        .collect()
}

fn section_entry(map: &Map<String, Value>) -> SectionEntry {
    let mut entry = SectionEntry::default();
    for (key, value) in map {
        if SECTION_LIST_FIELDS.contains(&key.as_str()) {
            let list = coerce_string_list(Some(value));
            if !list.is_empty() {
                entry.lists.insert(key.clone(), list);
            }
            continue;
        }
        let text = to_text(value).trim().to_string();
        if text.is_empty() {
            continue;
        }
        let text = if SECTION_DATE_FIELDS.contains(&key.as_str()) {
            normalize_date_text(&text)
        } else {
            text
        };
        entry.fields.insert(key.clone(), text);
    }
    entry
}

/// Rewrites a parseable date as `YYYY-MM-DD`; anything else is kept as written.
fn normalize_date_text(s: &str) -> String {
    parse_date(s).map_or_else(|| s.to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})$").expect("valid regex"))
}

fn month_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+((?:19|20)\d{2})\b",
        )
        .expect("valid regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:19|20)\d{2}").expect("valid regex"))
}

/// Parses the date formats LLMs tend to emit. Partial dates resolve to the
/// first day of the month or year. Returns `None` for anything without a year.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    if let Some(caps) = year_month_re().captures(s) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    if let Some(caps) = month_name_re().captures(s) {
        let month = match caps[1].to_lowercase().as_str() {
            "jan" => 1,
            "feb" => 2,
            "mar" => 3,
            "apr" => 4,
            "may" => 5,
            "jun" => 6,
            "jul" => 7,
            "aug" => 8,
            "sep" => 9,
            "oct" => 10,
            "nov" => 11,
            _ => 12,
        };
        let year = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    let year = year_re().find(s)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

pub fn parse_end_date(s: &str) -> EndDate {
    let lowered = s.trim().to_lowercase();
    if OPEN_END_WORDS.contains(&lowered.as_str()) {
        return EndDate::Present;
    }
    parse_date(s).map_or(EndDate::Unknown, EndDate::On)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_flat_shape() {
        let record = ResumeRecord::from_value(&json!({
            "name": "Jane Doe",
            "contact": {"email": "jane@example.com"},
            "skills": ["Rust", "Go"],
            "highlights": ["Built a compiler"],
            "work_history": [{
                "employer": "Acme",
                "title": "Engineer",
                "start_date": "2020-01",
                "end_date": "present",
                "bullets": ["Shipped v2"]
            }]
        }))
        .unwrap();

        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.contact["email"], "jane@example.com");
        assert_eq!(record.skills, vec!["Rust", "Go"]);
        assert_eq!(record.work_history.len(), 1);
        let work = &record.work_history[0];
        assert_eq!(work.start_date, Some(ymd(2020, 1, 1)));
        assert_eq!(work.end_date, EndDate::Present);
        assert_eq!(work.bullets, vec!["Shipped v2"]);
    }

    #[test]
    fn test_json_resume_shape() {
        let record = ResumeRecord::from_value(&json!({
            "basics": {
                "name": "Jane Doe",
                "email": "jane@example.com",
                "summary": "Systems engineer",
                "location": {"city": "Berlin", "countryCode": "DE"},
                "profiles": [{"network": "GitHub", "username": "jdoe", "url": ""}]
            },
            "work": [{
                "name": "Acme",
                "position": "Engineer",
                "startDate": "2019-03-01",
                "endDate": "2021-06-01",
                "highlights": ["Cut p99 latency by 40%"]
            }],
            "skills": [{"name": "Languages", "level": "", "keywords": ["Rust", "Python"]}],
            "education": [{
                "institution": "TU Berlin",
                "area": "Computer Science",
                "studyType": "BSc",
                "courses": ["Compilers"]
            }]
        }))
        .unwrap();

        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.summary, "Systems engineer");
        assert_eq!(record.contact["location"], "Berlin, DE");
        assert_eq!(record.contact["github"], "jdoe");
        assert_eq!(record.skills, vec!["Languages", "Rust", "Python"]);
        assert_eq!(record.work_history[0].employer, "Acme");
        assert_eq!(record.work_history[0].title, "Engineer");
        assert_eq!(record.work_history[0].end_date, EndDate::On(ymd(2021, 6, 1)));
        assert_eq!(record.education[0].study_type, "BSc");
        assert_eq!(record.education[0].courses, vec!["Compilers"]);
    }

    #[test]
    fn test_highlights_mapping_takes_values() {
        let record = ResumeRecord::from_value(&json!({
            "name": "Jane",
            "highlights": {"first": "Led team of 4", "second": {"text": "Open source maintainer"}}
        }))
        .unwrap();
        assert_eq!(
            record.highlights,
            vec!["Led team of 4", "Open source maintainer"]
        );
    }

    #[test]
    fn test_highlight_items_of_mixed_shape() {
        let record = ResumeRecord::from_value(&json!({
            "highlights": ["Plain", {"bullet": "From bullet key"}, {"impact": "40%", "area": "latency"}, 7, null]
        }))
        .unwrap();
        assert_eq!(
            record.highlights,
            vec!["Plain", "From bullet key", "area: latency; impact: 40%", "7"]
        );
    }

    #[test]
    fn test_number_for_list_keeps_record() {
        let record = ResumeRecord::from_value(&json!({
            "name": "Jane",
            "skills": ["Rust"],
            "work": [{"name": "Acme", "position": "Engineer", "startDate": "2020"}],
            "highlights": 3
        }))
        .unwrap();
        assert_eq!(record.highlights, vec!["3"]);
        assert_eq!(record.skills, vec!["Rust"]);
        assert_eq!(record.work_history.len(), 1);
    }

    #[test]
    fn test_wrong_shaped_entries_are_dropped() {
        let record = ResumeRecord::from_value(&json!({
            "name": "Jane",
            "contact": 5551234,
            "work_history": ["Acme, 2020", {"employer": "Initech", "title": "Intern"}],
            "education": "BSc somewhere"
        }))
        .unwrap();
        assert_eq!(record.contact["details"], "5551234");
        assert_eq!(record.work_history.len(), 1);
        assert_eq!(record.work_history[0].employer, "Initech");
        assert!(record.education.is_empty());
    }

    #[test]
    fn test_work_summary_and_url() {
        let record = ResumeRecord::from_value(&json!({
            "work": [{"name": "Acme", "position": "SRE", "url": "https://acme.example",
                      "summary": "Ran the platform team", "startDate": "2021-02"}]
        }))
        .unwrap();
        let work = &record.work_history[0];
        assert_eq!(work.url, "https://acme.example");
        assert_eq!(work.summary, "Ran the platform team");
    }

    #[test]
    fn test_skill_levels_from_objects_and_master_map() {
        let record = ResumeRecord::from_value(&json!({
            "skills": [
                {"name": "Rust", "level": "Advanced", "keywords": ["tokio"]},
                {"name": "Go", "level": "fluent"}
            ],
            "skill_levels": {"Rust": "expert", "SQL": "beginner"}
        }))
        .unwrap();
        assert_eq!(record.skills, vec!["Rust", "tokio", "Go"]);
        assert_eq!(record.skill_levels["Rust"], SkillLevel::Expert);
        assert_eq!(record.skill_levels["SQL"], SkillLevel::Beginner);
        assert!(!record.skill_levels.contains_key("Go"));
    }

    #[test]
    fn test_keyed_sections() {
        let record = ResumeRecord::from_value(&json!({
            "certificates": [{"name": "CKA", "issuer": "CNCF", "date": "2022-03"}, {"url": "orphan"}],
            "languages": ["English", {"language": "German", "fluency": "B2"}],
            "projects": {"name": "resumerge", "highlights": "Fuzzy merge", "startDate": "2024"},
            "interests": 7
        }))
        .unwrap();
        let certs = &record.sections.certificates;
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].field("date"), "2022-03-01");
        assert_eq!(record.sections.languages[0].field("language"), "English");
        assert_eq!(record.sections.languages[1].field("fluency"), "B2");
        let project = &record.sections.projects[0];
        assert_eq!(project.field("startDate"), "2024-01-01");
        assert_eq!(project.lists["highlights"], vec!["Fuzzy merge"]);
        assert_eq!(record.sections.interests[0].field("name"), "7");
    }

    #[test]
    fn test_sections_alone_are_content() {
        let record = ResumeRecord::from_value(&json!({"awards": [{"title": "Hackathon winner"}]})).unwrap();
        assert_eq!(record.sections.awards.len(), 1);
    }

    #[test]
    fn test_root_must_be_object() {
        assert_eq!(
            ResumeRecord::from_value(&json!([1, 2])).unwrap_err(),
            SchemaError::NotAnObject("an array")
        );
    }

    #[test]
    fn test_empty_object_has_no_content() {
        assert_eq!(
            ResumeRecord::from_value(&json!({"skills": [], "work": []})).unwrap_err(),
            SchemaError::NoContent
        );
    }

    #[test]
    fn test_comma_separated_skills_string() {
        let record = ResumeRecord::from_value(&json!({"skills": "Rust, Go; SQL"})).unwrap();
        assert_eq!(record.skills, vec!["Rust", "Go", "SQL"]);
    }

    #[test]
    fn test_skill_category_mapping() {
        let record =
            ResumeRecord::from_value(&json!({"skills": {"languages": ["Rust", "Go"], "cloud": "AWS"}}))
                .unwrap();
        assert_eq!(record.skills, vec!["AWS", "Rust", "Go"]);
    }

    #[test]
    fn test_single_work_object_is_one_entry() {
        let record = ResumeRecord::from_value(&json!({
            "work": {"company": "Acme", "role": "Engineer", "start": "2018"}
        }))
        .unwrap();
        assert_eq!(record.work_history.len(), 1);
        assert_eq!(record.work_history[0].start_date, Some(ymd(2018, 1, 1)));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-05-17"), Some(ymd(2020, 5, 17)));
        assert_eq!(parse_date("2020/05/17"), Some(ymd(2020, 5, 17)));
        assert_eq!(parse_date("2020.05"), Some(ymd(2020, 5, 1)));
        assert_eq!(parse_date("2020"), Some(ymd(2020, 1, 1)));
        assert_eq!(parse_date("Sept. 2019"), Some(ymd(2019, 9, 1)));
        assert_eq!(parse_date("Summer 2017"), Some(ymd(2017, 1, 1)));
        assert_eq!(parse_date("sometime"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_end_date_open_words() {
        assert_eq!(parse_end_date("Present"), EndDate::Present);
        assert_eq!(parse_end_date(" current "), EndDate::Present);
        assert_eq!(parse_end_date("2022-02"), EndDate::On(ymd(2022, 2, 1)));
        assert_eq!(parse_end_date("n/a"), EndDate::Unknown);
    }

    #[test]
    fn test_to_text_prefers_known_keys() {
        assert_eq!(to_text(&json!({"content": "x", "other": "y"})), "x");
        assert_eq!(to_text(&json!(["a", "", "b"])), "a, b");
        assert_eq!(to_text(&json!(null)), "");
    }
}
