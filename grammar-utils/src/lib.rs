pub mod catalog;
pub mod text_cleanup;
pub mod validation;

pub use catalog::{Catalog, CatalogError};

/// Number of sections in the curriculum.
pub const SECTION_COUNT: usize = 28;
/// Number of rule slots reserved for every section.
pub const RULES_PER_SECTION: usize = 20;

/// Parse a rule id of the form `SS-RR` into its 1-based section and rule numbers.
///
/// Returns `None` unless the id has exactly two dash-separated integer parts with the section in
/// `1..=SECTION_COUNT` and the rule in `1..=RULES_PER_SECTION`.
pub fn parse_rule_id(rule_id: &str) -> Option<(usize, usize)> {
    let (section, rule) = rule_id.split_once('-')?;
    if rule.contains('-') {
        return None;
    }
    let section: usize = section.parse().ok()?;
    let rule: usize = rule.parse().ok()?;
    let in_range = (1..=SECTION_COUNT).contains(&section) && (1..=RULES_PER_SECTION).contains(&rule);
    in_range.then_some((section, rule))
}

/// Format 1-based section and rule numbers as a rule id (`(1, 3)` is `"01-03"`).
pub fn format_rule_id(section: usize, rule: usize) -> String {
    format!("{section:02}-{rule:02}")
}

#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
pub struct Choice {
    pub text: String,
    pub correct: bool,
    pub explanation: String,
}

#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
pub struct WrongAnswer {
    pub text: String,
    pub explanation: String,
}

#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct McqQuestion {
    pub id: String,
    pub rule_id: String,
    pub prompt: String,
    pub choices: Vec<Choice>,
}

/// A fill-in-the-blank question. `phrase` holds the sentence with a run of underscores where the
/// answer goes, e.g. `« Je ___ avec mes amis. »`.
#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct InputQuestion {
    pub id: String,
    pub rule_id: String,
    pub prompt: String,
    pub phrase: String,
    pub answer: String,
    pub explanation: String,
    pub wrong_answers: Vec<WrongAnswer>,
}

#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    Mcq(McqQuestion),
    Input(InputQuestion),
}

impl Question {
    pub fn id(&self) -> &str {
        match self {
            Question::Mcq(q) => &q.id,
            Question::Input(q) => &q.id,
        }
    }

    pub fn rule_id(&self) -> &str {
        match self {
            Question::Mcq(q) => &q.rule_id,
            Question::Input(q) => &q.rule_id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::Mcq(q) => &q.prompt,
            Question::Input(q) => &q.prompt,
        }
    }

    pub fn as_mcq(&self) -> Option<&McqQuestion> {
        match self {
            Question::Mcq(q) => Some(q),
            Question::Input(_) => None,
        }
    }

    pub fn as_input(&self) -> Option<&InputQuestion> {
        match self {
            Question::Input(q) => Some(q),
            Question::Mcq(_) => None,
        }
    }

    /// Whether picking choice `index` answers this question correctly.
    /// Always false for input questions and out-of-range indices.
    pub fn is_correct_choice(&self, index: usize) -> bool {
        match self {
            Question::Mcq(q) => q.choices.get(index).is_some_and(|c| c.correct),
            Question::Input(_) => false,
        }
    }
}

#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub section_id: String,
    pub title: String,
}

/// One curriculum section: its rules in teaching order and every question written for them.
#[derive(
    Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    /// The section number encoded in the leading digits of the id (`"01-present-indicatif"` is 1).
    pub fn number(&self) -> Option<u8> {
        section_number(&self.id)
    }

    pub fn has_questions(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn position_of_rule(&self, rule_id: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.id == rule_id)
    }
}

/// Parse the leading digits of a section id.
pub fn section_number(section_id: &str) -> Option<u8> {
    let digits_end = section_id
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(section_id.len());
    section_id[..digits_end].parse().ok()
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionMeta {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_count: usize,
}

pub mod autograde {
    use super::*;
    use crate::text_cleanup::edit_distance_within_one;

    /// How a typed answer relates to the question's expected answers.
    ///
    /// Variants are listed in the order they are tested; the first match wins.
    #[derive(
        Clone,
        Copy,
        Debug,
        serde::Serialize,
        serde::Deserialize,
        parse_display::Display,
        parse_display::FromStr,
        PartialEq,
        Eq,
        Hash,
    )]
    #[serde(rename_all = "kebab-case")]
    #[display(style = "kebab-case")]
    pub enum GradeKind {
        Exact,
        CaseWarning,
        WrongPrepared,
        TypoCorrect,
        TypoWrong,
        Unknown,
    }

    #[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct InputGrade {
        pub kind: GradeKind,
        pub is_correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub matched_answer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub wrong_explanation: Option<String>,
    }

    impl InputGrade {
        fn new(kind: GradeKind) -> Self {
            Self {
                kind,
                is_correct: matches!(kind, GradeKind::Exact | GradeKind::CaseWarning),
                matched_answer: None,
                wrong_explanation: None,
            }
        }

        fn matching(kind: GradeKind, answer: &str) -> Self {
            Self {
                matched_answer: Some(answer.to_string()),
                ..Self::new(kind)
            }
        }

        fn matching_wrong(kind: GradeKind, wrong: &WrongAnswer) -> Self {
            Self {
                matched_answer: Some(wrong.text.clone()),
                wrong_explanation: Some(wrong.explanation.clone()),
                ..Self::new(kind)
            }
        }
    }

    /// Grade a typed answer to a fill-in-the-blank question.
    ///
    /// Typos are never accepted as correct; a one-edit slip on the right answer is reported as
    /// [`GradeKind::TypoCorrect`] so the learner can be told they were close.
    pub fn grade_input(user_input: &str, question: &InputQuestion) -> InputGrade {
        let trimmed = user_input.trim();
        let answer = question.answer.as_str();

        if trimmed == answer {
            return InputGrade::new(GradeKind::Exact);
        }

        let lowered = trimmed.to_lowercase();
        let answer_lowered = answer.to_lowercase();

        if lowered == answer_lowered {
            return InputGrade::matching(GradeKind::CaseWarning, answer);
        }

        if let Some(wrong) = question
            .wrong_answers
            .iter()
            .find(|wrong| wrong.text.to_lowercase() == lowered)
        {
            return InputGrade::matching_wrong(GradeKind::WrongPrepared, wrong);
        }

        if edit_distance_within_one(&lowered, &answer_lowered) == 1 {
            return InputGrade::matching(GradeKind::TypoCorrect, answer);
        }

        if let Some(wrong) = question
            .wrong_answers
            .iter()
            .find(|wrong| edit_distance_within_one(&lowered, &wrong.text.to_lowercase()) == 1)
        {
            return InputGrade::matching_wrong(GradeKind::TypoWrong, wrong);
        }

        InputGrade::new(GradeKind::Unknown)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn mange_question() -> InputQuestion {
            InputQuestion {
                id: "02-05-003".to_string(),
                rule_id: "02-05".to_string(),
                prompt: "Complétez avec le participe passé.".to_string(),
                phrase: "« Nous avons ___ une pizza. »".to_string(),
                answer: "mangé".to_string(),
                explanation: "Participe passé du verbe manger.".to_string(),
                wrong_answers: vec![
                    WrongAnswer {
                        text: "manger".to_string(),
                        explanation: "C'est l'infinitif.".to_string(),
                    },
                    WrongAnswer {
                        text: "mangés".to_string(),
                        explanation: "Pas d'accord avec avoir ici.".to_string(),
                    },
                ],
            }
        }

        #[test]
        fn test_exact() {
            let grade = grade_input("mangé", &mange_question());
            assert_eq!(grade.kind, GradeKind::Exact);
            assert!(grade.is_correct);
            assert_eq!(grade.matched_answer, None);
        }

        #[test]
        fn test_exact_ignores_surrounding_whitespace() {
            let grade = grade_input("  mangé \n", &mange_question());
            assert_eq!(grade.kind, GradeKind::Exact);
        }

        #[test]
        fn test_case_warning() {
            let grade = grade_input("MANGÉ", &mange_question());
            assert_eq!(grade.kind, GradeKind::CaseWarning);
            assert!(grade.is_correct);
            assert_eq!(grade.matched_answer.as_deref(), Some("mangé"));
        }

        #[test]
        fn test_wrong_prepared() {
            let grade = grade_input("manger", &mange_question());
            assert_eq!(grade.kind, GradeKind::WrongPrepared);
            assert!(!grade.is_correct);
            assert_eq!(grade.matched_answer.as_deref(), Some("manger"));
            assert_eq!(grade.wrong_explanation.as_deref(), Some("C'est l'infinitif."));
        }

        #[test]
        fn test_wrong_prepared_is_case_insensitive() {
            let grade = grade_input("Mangés", &mange_question());
            assert_eq!(grade.kind, GradeKind::WrongPrepared);
            assert_eq!(grade.matched_answer.as_deref(), Some("mangés"));
        }

        #[test]
        fn test_typo_correct_wins_over_typo_wrong() {
            // "mange" is one edit from both "mangé" and "manger"
            let grade = grade_input("mange", &mange_question());
            assert_eq!(grade.kind, GradeKind::TypoCorrect);
            assert!(!grade.is_correct);
            assert_eq!(grade.matched_answer.as_deref(), Some("mangé"));
            assert_eq!(grade.wrong_explanation, None);
        }

        #[test]
        fn test_typo_wrong() {
            let grade = grade_input("mangerr", &mange_question());
            assert_eq!(grade.kind, GradeKind::TypoWrong);
            assert_eq!(grade.matched_answer.as_deref(), Some("manger"));
            assert_eq!(grade.wrong_explanation.as_deref(), Some("C'est l'infinitif."));
        }

        #[test]
        fn test_unknown() {
            let grade = grade_input("xyzzy", &mange_question());
            assert_eq!(grade.kind, GradeKind::Unknown);
            assert!(!grade.is_correct);
            assert_eq!(grade.matched_answer, None);
        }

        #[test]
        fn test_kind_display() {
            assert_eq!(GradeKind::CaseWarning.to_string(), "case-warning");
            assert_eq!("typo-wrong".parse::<GradeKind>().unwrap(), GradeKind::TypoWrong);
        }
    }
}
