use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// End of a dated range. `Present` marks an ongoing position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndDate {
    #[default]
    Unknown,
    Present,
    On(NaiveDate),
}

impl EndDate {
    pub const PRESENT: &'static str = "present";

    /// Resolves the end of a merged range: the latest concrete date wins,
    /// otherwise `Present` if any source is open-ended.
    pub fn resolve<I: IntoIterator<Item = EndDate>>(ends: I) -> EndDate {
        let mut latest: Option<NaiveDate> = None;
        let mut open = false;
        for end in ends {
            match end {
                EndDate::On(d) => latest = Some(latest.map_or(d, |l| l.max(d))),
                EndDate::Present => open = true,
                EndDate::Unknown => {}
            }
        }
        match (latest, open) {
            (Some(d), _) => EndDate::On(d),
            (None, true) => EndDate::Present,
            (None, false) => EndDate::Unknown,
        }
    }
}

impl Serialize for EndDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EndDate::Unknown => serializer.serialize_none(),
            EndDate::Present => serializer.serialize_str(Self::PRESENT),
            EndDate::On(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkEntry {
    pub employer: String,
    pub title: String,
    pub url: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: EndDate,
    pub summary: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EducationEntry {
    pub institution: String,
    pub area: String,
    pub study_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: EndDate,
    pub courses: Vec<String>,
}

/// Self-assessed proficiency attached to a skill. Ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl SkillLevel {
    /// Reads a level name case-insensitively. Unranked wording yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(SkillLevel::Beginner),
            "intermediate" => Some(SkillLevel::Intermediate),
            "advanced" => Some(SkillLevel::Advanced),
            "expert" => Some(SkillLevel::Expert),
            "master" => Some(SkillLevel::Master),
            _ => None,
        }
    }
}

/// Resume sections merged generically by their identity fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Projects,
    Certificates,
    Awards,
    Publications,
    Volunteer,
    Languages,
    Interests,
    References,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Projects,
        SectionKind::Certificates,
        SectionKind::Awards,
        SectionKind::Publications,
        SectionKind::Volunteer,
        SectionKind::Languages,
        SectionKind::Interests,
        SectionKind::References,
    ];

    /// JSON key the section is read from and written to.
    pub fn field(self) -> &'static str {
        match self {
            SectionKind::Projects => "projects",
            SectionKind::Certificates => "certificates",
            SectionKind::Awards => "awards",
            SectionKind::Publications => "publications",
            SectionKind::Volunteer => "volunteer",
            SectionKind::Languages => "languages",
            SectionKind::Interests => "interests",
            SectionKind::References => "references",
        }
    }

    /// Fields whose normalized values identify an entry. The first one also
    /// names a bare string item.
    pub fn identity_fields(self) -> &'static [&'static str] {
        match self {
            SectionKind::Projects => &["name", "startDate", "endDate", "url"],
            SectionKind::Certificates => &["name", "issuer", "date"],
            SectionKind::Awards => &["title", "awarder", "date"],
            SectionKind::Publications => &["name", "publisher", "releaseDate"],
            SectionKind::Volunteer => &["organization", "position", "startDate", "endDate"],
            SectionKind::Languages => &["language", "fluency"],
            SectionKind::Interests | SectionKind::References => &["name"],
        }
    }
}

/// One entry of a keyed section. Scalar fields are kept as text (dates
/// normalized to `YYYY-MM-DD` when they parse); `highlights`, `courses` and
/// `keywords` are string lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionEntry {
    pub fields: BTreeMap<String, String>,
    pub lists: BTreeMap<String, Vec<String>>,
}

impl SectionEntry {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }
}

impl Serialize for SectionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.lists.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        for (key, values) in &self.lists {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sections {
    pub projects: Vec<SectionEntry>,
    pub certificates: Vec<SectionEntry>,
    pub awards: Vec<SectionEntry>,
    pub publications: Vec<SectionEntry>,
    pub volunteer: Vec<SectionEntry>,
    pub languages: Vec<SectionEntry>,
    pub interests: Vec<SectionEntry>,
    pub references: Vec<SectionEntry>,
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> &[SectionEntry] {
        match kind {
            SectionKind::Projects => &self.projects,
            SectionKind::Certificates => &self.certificates,
            SectionKind::Awards => &self.awards,
            SectionKind::Publications => &self.publications,
            SectionKind::Volunteer => &self.volunteer,
            SectionKind::Languages => &self.languages,
            SectionKind::Interests => &self.interests,
            SectionKind::References => &self.references,
        }
    }

    pub fn get_mut(&mut self, kind: SectionKind) -> &mut Vec<SectionEntry> {
        match kind {
            SectionKind::Projects => &mut self.projects,
            SectionKind::Certificates => &mut self.certificates,
            SectionKind::Awards => &mut self.awards,
            SectionKind::Publications => &mut self.publications,
            SectionKind::Volunteer => &mut self.volunteer,
            SectionKind::Languages => &mut self.languages,
            SectionKind::Interests => &mut self.interests,
            SectionKind::References => &mut self.references,
        }
    }

    pub fn is_empty(&self) -> bool {
        SectionKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }
}

/// One structured resume, as coerced from a single per-file JSON document.
/// The merge engine only ever reads these.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumeRecord {
    pub name: String,
    pub contact: BTreeMap<String, String>,
    pub summary: String,
    pub skills: Vec<String>,
    pub skill_levels: BTreeMap<String, SkillLevel>,
    pub highlights: Vec<String>,
    pub work_history: Vec<WorkEntry>,
    pub education: Vec<EducationEntry>,
    #[serde(flatten)]
    pub sections: Sections,
}

impl ResumeRecord {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.contact.is_empty()
            && self.summary.is_empty()
            && self.skills.is_empty()
            && self.highlights.is_empty()
            && self.work_history.is_empty()
            && self.education.is_empty()
            && self.sections.is_empty()
    }

    /// Number of populated identity fields, used to pick the header of the master.
    pub fn completeness(&self) -> usize {
        usize::from(!self.name.is_empty())
            + usize::from(!self.summary.is_empty())
            + self.contact.values().filter(|v| !v.is_empty()).count()
    }
}

/// The merged aggregate written to `master_resume.json`.
///
/// Serializes with the same field names a `ResumeRecord` is read from, so a
/// master can be fed back through the merge unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MasterResume {
    pub name: String,
    pub contact: BTreeMap<String, String>,
    pub summary: String,
    pub skills: Vec<String>,
    pub skill_levels: BTreeMap<String, SkillLevel>,
    pub highlights: Vec<String>,
    pub work_history: Vec<WorkEntry>,
    pub education: Vec<EducationEntry>,
    #[serde(flatten)]
    pub sections: Sections,
}
