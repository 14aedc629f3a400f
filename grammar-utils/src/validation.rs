//! Content quality checks for authored sections.
//!
//! MCQ questions:
//! - fewer than 2 choices
//! - no correct choice, or more than one
//! - duplicate choice texts (case-insensitive)
//! - more than 2 choices from the same determiner family (near-duplicates)
//! - empty choice explanations (warning)
//!
//! Input questions:
//! - phrase missing, or without exactly one blank
//! - empty answer or explanation
//! - fewer than 2 wrong answers
//! - duplicate wrong answers, or a wrong answer equal to the answer
//! - empty wrong-answer explanations (warning)
//!
//! Catalog-wide: questions pointing at a rule outside their section, rule ids that do not fit the
//! `SS-RR` layout, and duplicate question ids.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::text_cleanup::count_blanks;
use crate::{Catalog, InputQuestion, McqQuestion, Question, Section, parse_rule_id};

/// Choices from the same family are near-duplicates: a question listing "le", "la" and "les"
/// tests recognition of the family, not the rule.
const DETERMINER_FAMILIES: &[(&str, &[&str])] = &[
    ("défini", &["le", "la", "l'", "les"]),
    ("indéfini", &["un", "une", "des"]),
    ("partitif", &["du", "de la", "de l'"]),
    ("contracté-à", &["au", "aux"]),
    ("possessif-3s", &["son", "sa", "ses"]),
    ("possessif-1s", &["mon", "ma", "mes"]),
    ("possessif-2s", &["ton", "ta", "tes"]),
    ("possessif-3p", &["leur", "leurs"]),
    ("possessif-1p", &["notre", "nos"]),
    ("possessif-2p", &["votre", "vos"]),
    ("démonstratif", &["ce", "cet", "cette", "ces"]),
];

const MAX_CHOICES_PER_FAMILY: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, parse_display::Display)]
#[display(style = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, parse_display::Display)]
#[display("{severity} [{question_id}]: {message}")]
pub struct ContentIssue {
    pub question_id: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ContentIssue>,
}

impl ValidationReport {
    fn error(&mut self, question_id: &str, message: String) {
        self.issues.push(ContentIssue {
            question_id: question_id.to_string(),
            severity: Severity::Error,
            message,
        });
    }

    fn warn(&mut self, question_id: &str, message: String) {
        self.issues.push(ContentIssue {
            question_id: question_id.to_string(),
            severity: Severity::Warning,
            message,
        });
    }

    pub fn errors(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warnings(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.errors() == 0
    }
}

fn families_of(choice_text: &str) -> impl Iterator<Item = &'static str> {
    let normalized = choice_text.trim().to_lowercase();
    DETERMINER_FAMILIES
        .iter()
        .filter(move |(_, members)| members.contains(&normalized.as_str()))
        .map(|(family, _)| *family)
}

fn validate_mcq(q: &McqQuestion, report: &mut ValidationReport) {
    if q.choices.len() < 2 {
        report.error(
            &q.id,
            format!("Only {} choice(s), need at least 2", q.choices.len()),
        );
    }

    match q.choices.iter().filter(|c| c.correct).count() {
        0 => report.error(&q.id, "No correct answer marked".to_string()),
        1 => {}
        n => report.error(
            &q.id,
            format!("{n} correct answers marked, should be exactly 1"),
        ),
    }

    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    for (i, choice) in q.choices.iter().enumerate() {
        let normalized = choice.text.trim().to_lowercase();
        if let Some(first) = seen.get(&normalized) {
            report.error(
                &q.id,
                format!(
                    "Exact duplicate choice: {:?} (indices {first} and {i})",
                    choice.text
                ),
            );
        }
        seen.insert(normalized, i);
    }

    let mut by_family: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for choice in &q.choices {
        for family in families_of(&choice.text) {
            by_family.entry(family).or_default().push(&choice.text);
        }
    }
    let mut crowded: Vec<_> = by_family
        .into_iter()
        .filter(|(_, members)| members.len() > MAX_CHOICES_PER_FAMILY)
        .collect();
    crowded.sort();
    for (family, members) in crowded {
        report.error(
            &q.id,
            format!(
                "{} choices from same family {family:?}: {}, max {MAX_CHOICES_PER_FAMILY} allowed",
                members.len(),
                members.join(", ")
            ),
        );
    }

    for choice in &q.choices {
        if choice.explanation.trim().is_empty() {
            report.warn(
                &q.id,
                format!("Empty explanation for choice {:?}", choice.text),
            );
        }
    }
}

fn validate_input(q: &InputQuestion, report: &mut ValidationReport) {
    if q.phrase.trim().is_empty() {
        report.error(&q.id, "Missing or empty phrase".to_string());
    } else {
        match count_blanks(&q.phrase) {
            0 => report.error(
                &q.id,
                "Phrase has no blank (need 2+ consecutive underscores)".to_string(),
            ),
            1 => {}
            n => report.error(&q.id, format!("Phrase has {n} blanks, must have exactly 1")),
        }
    }

    if q.answer.trim().is_empty() {
        report.error(&q.id, "Missing or empty answer".to_string());
    }

    if q.explanation.trim().is_empty() {
        report.error(&q.id, "Missing or empty explanation".to_string());
    }

    if q.wrong_answers.len() < 2 {
        report.error(
            &q.id,
            format!(
                "Only {} wrong answer(s), need at least 2",
                q.wrong_answers.len()
            ),
        );
    }

    let answer = q.answer.trim().to_lowercase();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    for (i, wrong) in q.wrong_answers.iter().enumerate() {
        let normalized = wrong.text.trim().to_lowercase();
        if let Some(first) = seen.get(&normalized) {
            report.error(
                &q.id,
                format!(
                    "Duplicate wrong answer: {:?} (indices {first} and {i})",
                    wrong.text
                ),
            );
        }
        if normalized == answer {
            report.error(
                &q.id,
                format!("Wrong answer {:?} matches the correct answer", wrong.text),
            );
        }
        if wrong.explanation.trim().is_empty() {
            report.warn(
                &q.id,
                format!("Empty explanation for wrong answer {:?}", wrong.text),
            );
        }
        seen.insert(normalized, i);
    }
}

fn validate_section(section: &Section, report: &mut ValidationReport) {
    let rule_ids: FxHashSet<&str> = section.rules.iter().map(|r| r.id.as_str()).collect();

    for rule in &section.rules {
        if parse_rule_id(&rule.id).is_none() {
            report.error(
                &rule.id,
                format!("Rule id in section {} does not fit the SS-RR layout", section.id),
            );
        }
    }

    for question in &section.questions {
        if !rule_ids.contains(question.rule_id()) {
            report.error(
                question.id(),
                format!(
                    "Rule {} is not one of the rules of section {}",
                    question.rule_id(),
                    section.id
                ),
            );
        }
        match question {
            Question::Mcq(q) => validate_mcq(q, report),
            Question::Input(q) => validate_input(q, report),
        }
    }
}

/// Check every section of the catalog.
pub fn validate_catalog(catalog: &Catalog) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut question_ids: FxHashSet<&str> = FxHashSet::default();

    for section in catalog.sections() {
        validate_section(section, &mut report);
        for question in &section.questions {
            if !question_ids.insert(question.id()) {
                report.error(question.id(), "Duplicate question id".to_string());
            }
        }
    }

    report
}
