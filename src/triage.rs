//! Severity prediction for incoming appointment requests.
//!
//! The label is advisory. It orders the doctor's queue display and is
//! never used to gate a transition.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Severity;

pub trait SeverityPredictor: Send + Sync {
    fn predict(&self, reason: &str, notes: Option<&str>) -> Severity;
}

/// Red-flag phrases. Any match marks the request Very Serious.
static RED_FLAG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bchest\s+(?:pain|tightness|pressure)\b",
        r"(?i)\b(?:difficulty|trouble|shortness\s+of)\s+breath(?:ing)?\b",
        r"(?i)\bcan(?:'|no)?t\s+breathe\b",
        r"(?i)\bunconscious(?:ness)?\b|\bfaint(?:ed|ing)\b|\bpassed\s+out\b",
        r"(?i)\bseizures?\b|\bconvulsions?\b",
        r"(?i)\bstroke\b|\bslurred\s+speech\b|\bface\s+droop(?:ing)?\b",
        r"(?i)\b(?:heavy|severe|uncontrolled)\s+bleeding\b|\bvomiting\s+blood\b",
        r"(?i)\bsuicid(?:e|al)\b",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

/// Acute but not immediately dangerous complaints.
static ACUTE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:high\s+)?fever\b",
        r"(?i)\bvomit(?:ing)?\b|\bdiarrh(?:o)?ea\b",
        r"(?i)\b(?:severe|sharp|intense)\s+(?:pain|headache)\b",
        r"(?i)\binfection\b|\bswelling\b|\brash\b",
        r"(?i)\bfracture\b|\bsprain\b|\binjur(?:y|ed)\b",
        r"(?i)\bdizz(?:y|iness)\b|\bpalpitations?\b",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid triage regex pattern")
}

/// Keyword classifier over the reason and the patient's notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordTriage;

impl SeverityPredictor for KeywordTriage {
    fn predict(&self, reason: &str, notes: Option<&str>) -> Severity {
        let text = match notes {
            Some(n) => format!("{reason}\n{n}"),
            None => reason.to_string(),
        };

        if RED_FLAG_PATTERNS.iter().any(|re| re.is_match(&text)) {
            Severity::VerySerious
        } else if ACUTE_PATTERNS.iter().any(|re| re.is_match(&text)) {
            Severity::Moderate
        } else {
            Severity::Normal
        }
    }
}
