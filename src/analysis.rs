//! Heuristic extraction of structured implementation details from
//! free-text ticket descriptions. Pure text processing, no I/O.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

const MAX_REQUIREMENTS: usize = 10;
const MAX_CRITERIA: usize = 10;
const MAX_SCANNED_DEPENDENCIES: usize = 5;
const HIGH_COMPLEXITY_LEN: usize = 1000;
const MEDIUM_COMPLEXITY_LEN: usize = 300;

const COMPLEXITY_KEYWORDS: [&str; 5] =
    ["complex", "multiple", "integration", "architecture", "refactor"];

/// A named markdown section: a level 1-3 heading matching one of the alias
/// spellings, running until the next level 1-3 heading or end of text.
struct Section {
    heading: Regex,
}

impl Section {
    fn new(aliases: &str) -> Self {
        let pattern =
            format!(r"(?si)(?:^|\n)#{{1,3}}\s*(?:{aliases})\s*\n(.*?)(?:\n#{{1,3}}|\z)");
        Self {
            heading: Regex::new(&pattern).unwrap(),
        }
    }

    fn body<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.heading
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

lazy_static! {
    static ref REQUIREMENTS_SECTION: Section = Section::new("Requirements?|Required Features?");
    static ref AC_SECTION: Section = Section::new("Acceptance Criteria|AC|Definition of Done");
    static ref TECH_SECTION: Section =
        Section::new("Technical Notes?|Implementation Notes?|Tech Details?");
    static ref DEP_SECTION: Section = Section::new("Dependencies?|Depends On|Related Tickets?");
    static ref BULLET_POINT: Regex = Regex::new(r"(?:^|\n)\s*[-*•]\s*(.+)").unwrap();
    static ref NUMBERED_ITEM: Regex = Regex::new(r"(?:^|\n)\s*\d+[.)]\s*(.+)").unwrap();
    static ref CHECKBOX: Regex = Regex::new(r"(?:^|\n)\s*-\s*\[\s*[x ]?\s*\]\s*(.+)").unwrap();
    static ref TICKET_KEY: Regex = Regex::new(r"\b([A-Z]+-\d+)\b").unwrap();
    static ref CODE_BLOCK: Regex = Regex::new(r"```[\s\S]*?```").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Structured view derived from a ticket's description text.
#[derive(Debug, Clone, Serialize)]
pub struct TicketAnalysis {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub complexity: Complexity,
    pub requirements: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub technical_notes: String,
    pub dependencies: Vec<String>,
}

fn captured(regex: &Regex, text: &str) -> Vec<String> {
    regex
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Requirements: bullets and numbered items from a Requirements section,
/// falling back to checkbox items anywhere in the text.
fn extract_requirements(description: &str) -> Vec<String> {
    let mut requirements = Vec::new();

    if let Some(section) = REQUIREMENTS_SECTION.body(description) {
        requirements.extend(captured(&BULLET_POINT, section));
        requirements.extend(captured(&NUMBERED_ITEM, section));
    }

    if requirements.is_empty() {
        requirements.extend(captured(&CHECKBOX, description));
    }

    requirements.truncate(MAX_REQUIREMENTS);
    requirements
}

/// Acceptance criteria: bullets and checkboxes from an AC section only.
fn extract_acceptance_criteria(description: &str) -> Vec<String> {
    let mut criteria = Vec::new();

    if let Some(section) = AC_SECTION.body(description) {
        criteria.extend(captured(&BULLET_POINT, section));
        criteria.extend(captured(&CHECKBOX, section));
    }

    criteria.truncate(MAX_CRITERIA);
    criteria
}

/// Technical notes section verbatim, else all fenced code blocks.
fn extract_technical_notes(description: &str) -> String {
    if let Some(section) = TECH_SECTION.body(description) {
        return section.trim().to_string();
    }

    let blocks: Vec<&str> = CODE_BLOCK
        .find_iter(description)
        .map(|m| m.as_str())
        .collect();
    blocks.join("\n\n")
}

/// Ticket keys from a Dependencies section; without one, the first five keys
/// found anywhere in the text. Deduplicated preserving first occurrence.
fn extract_dependencies(description: &str) -> Vec<String> {
    let mut dependencies = Vec::new();

    if let Some(section) = DEP_SECTION.body(description) {
        dependencies.extend(captured(&TICKET_KEY, section));
    }

    if dependencies.is_empty() {
        dependencies.extend(
            captured(&TICKET_KEY, description)
                .into_iter()
                .take(MAX_SCANNED_DEPENDENCIES),
        );
    }

    let mut seen = std::collections::HashSet::new();
    dependencies.retain(|key| seen.insert(key.clone()));
    dependencies
}

/// Length and keyword heuristic. Empty text is Low.
fn estimate_complexity(description: &str) -> Complexity {
    if description.is_empty() {
        return Complexity::Low;
    }

    let lowered = description.to_lowercase();
    let has_keywords = COMPLEXITY_KEYWORDS.iter().any(|kw| lowered.contains(kw));

    if description.len() > HIGH_COMPLEXITY_LEN || has_keywords {
        Complexity::High
    } else if description.len() > MEDIUM_COMPLEXITY_LEN {
        Complexity::Medium
    } else {
        Complexity::Low
    }
}

pub fn analyze(description: &str, issue_type: &str) -> TicketAnalysis {
    TicketAnalysis {
        issue_type: issue_type.to_string(),
        complexity: estimate_complexity(description),
        requirements: extract_requirements(description),
        acceptance_criteria: extract_acceptance_criteria(description),
        technical_notes: extract_technical_notes(description),
        dependencies: extract_dependencies(description),
    }
}
