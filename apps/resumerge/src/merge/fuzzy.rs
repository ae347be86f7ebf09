//! Fuzzy deduplication shared by skills, highlights, bullets and courses.
//!
//! Two strings are near-duplicates when their normalized char-level diff ratio
//! reaches the threshold AND they carry the same digit runs, so "Python" and
//! "Python3" or "team of 5" and "team of 50" stay distinct.

use similar::TextDiff;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.92;

/// Trims, lowercases and collapses inner whitespace.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Similarity ratio in `[0, 1]` over the normalized forms.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return 1.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

fn digit_runs(s: &str) -> Vec<&str> {
    s.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .collect()
}

pub fn is_near_duplicate(a: &str, b: &str, threshold: f32) -> bool {
    digit_runs(a) == digit_runs(b) && similarity(a, b) >= threshold
}

/// Deduplicates in first-seen order. Empty strings are dropped; every kept
/// string is trimmed.
pub fn dedupe<I, S>(items: I, threshold: f32) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let candidate = item.as_ref().trim();
        if candidate.is_empty() {
            continue;
        }
        if out
            .iter()
            .any(|kept| is_near_duplicate(candidate, kept, threshold))
        {
            continue;
        }
        out.push(candidate.to_string());
    }
    out
}

struct Cluster {
    anchor: String,
    display: String,
}

/// Like [`dedupe`], but each kept slot shows the most canonical variant seen
/// for it (see [`is_more_canonical`]).
///
/// A display change can bring two slots within the threshold of each other,
/// so passes repeat until no slot merges. The output is then stable under
/// another call.
pub fn dedupe_canonical<I, S>(items: I, threshold: f32) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = canonical_pass(items, threshold);
    loop {
        let next = canonical_pass(&out, threshold);
        if next.len() == out.len() {
            return next;
        }
        out = next;
    }
}

fn canonical_pass<I, S>(items: I, threshold: f32) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut clusters: Vec<Cluster> = Vec::new();
    for item in items {
        let candidate = item.as_ref().trim();
        if candidate.is_empty() {
            continue;
        }
        let existing = clusters.iter_mut().find(|c| {
            is_near_duplicate(candidate, &c.anchor, threshold)
                || is_near_duplicate(candidate, &c.display, threshold)
        });
        match existing {
            Some(cluster) => {
                if is_more_canonical(candidate, &cluster.display) {
                    cluster.display = candidate.to_string();
                }
            }
            None => clusters.push(Cluster {
                anchor: candidate.to_string(),
                display: candidate.to_string(),
            }),
        }
    }
    clusters.into_iter().map(|c| c.display).collect()
}

/// Casing tie-break: mixed case beats single case ("Python" over "python" or
/// "PYTHON"), then the longer string, then the lexicographically smaller one.
pub fn is_more_canonical(candidate: &str, current: &str) -> bool {
    let rank = |s: &str| {
        let mixed =
            s.chars().any(char::is_uppercase) && s.chars().any(char::is_lowercase);
        (mixed, s.chars().count())
    };
    match rank(candidate).cmp(&rank(current)) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate < current,
    }
}
