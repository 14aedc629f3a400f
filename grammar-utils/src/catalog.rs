use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::{Question, Rule, Section, SectionMeta};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid section file {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only view of every loaded section.
///
/// The catalog is an immutable value: the picker and the grader receive it by reference and never
/// modify it.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    sections: Vec<Section>,
}

impl Catalog {
    pub fn new(mut sections: Vec<Section>) -> Self {
        for section in &mut sections {
            for rule in &mut section.rules {
                if rule.section_id.is_empty() {
                    rule.section_id = section.id.clone();
                }
            }
        }
        Self { sections }
    }

    /// Parse a JSON array of sections.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let sections: Vec<Section> = serde_json::from_str(json)?;
        Ok(Self::new(sections))
    }

    /// Load every `*.json` file in `dir`, one section per file, in file name order.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sections = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let section: Section =
                serde_json::from_str(&content).map_err(|source| CatalogError::Json {
                    path: path.clone(),
                    source,
                })?;
            log::debug!(
                "Loaded section {} ({} rules, {} questions) from {}",
                section.id,
                section.rules.len(),
                section.questions.len(),
                path.display()
            );
            sections.push(section);
        }

        log::info!("Loaded {} sections from {}", sections.len(), dir.display());
        Ok(Self::new(sections))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Sections that currently have at least one question.
    pub fn loaded_sections(&self) -> Vec<&Section> {
        self.sections.iter().filter(|s| s.has_questions()).collect()
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn find_question(&self, question_id: &str) -> Option<(&Section, &Question)> {
        self.sections.iter().find_map(|section| {
            section
                .questions
                .iter()
                .find(|q| q.id() == question_id)
                .map(|q| (section, q))
        })
    }

    /// Questions of `section` that belong to `rule_id`, in authoring order.
    pub fn questions_for_rule<'a>(section: &'a Section, rule_id: &str) -> Vec<&'a Question> {
        section
            .questions
            .iter()
            .filter(|q| q.rule_id() == rule_id)
            .collect()
    }

    /// Rules of `section` with at least one question, in the section's rule order.
    pub fn rules_with_questions(section: &Section) -> Vec<&Rule> {
        let covered: FxHashSet<&str> = section.questions.iter().map(|q| q.rule_id()).collect();
        section
            .rules
            .iter()
            .filter(|r| covered.contains(r.id.as_str()))
            .collect()
    }

    pub fn all_questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    pub fn question_count(&self) -> usize {
        self.all_questions().count()
    }

    pub fn meta(&self) -> Vec<SectionMeta> {
        self.sections
            .iter()
            .map(|s| SectionMeta {
                id: s.id.clone(),
                title: s.title.clone(),
                description: s.description.clone(),
                question_count: s.questions.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Choice, McqQuestion};

    fn mcq(id: &str, rule_id: &str) -> Question {
        Question::Mcq(McqQuestion {
            id: id.to_string(),
            rule_id: rule_id.to_string(),
            prompt: "?".to_string(),
            choices: vec![
                Choice {
                    text: "a".to_string(),
                    correct: true,
                    explanation: String::new(),
                },
                Choice {
                    text: "b".to_string(),
                    correct: false,
                    explanation: String::new(),
                },
            ],
        })
    }

    fn rule(id: &str) -> Rule {
        Rule {
            id: id.to_string(),
            section_id: String::new(),
            title: format!("Rule {id}"),
        }
    }

    fn sample() -> Catalog {
        Catalog::new(vec![
            Section {
                id: "01-present".to_string(),
                title: "Présent".to_string(),
                description: String::new(),
                rules: vec![rule("01-01"), rule("01-02"), rule("01-03")],
                questions: vec![mcq("q1", "01-01"), mcq("q2", "01-01"), mcq("q3", "01-03")],
            },
            Section {
                id: "02-passe".to_string(),
                title: "Passé".to_string(),
                description: String::new(),
                rules: vec![rule("02-01")],
                questions: vec![],
            },
        ])
    }

    #[test]
    fn test_new_fills_rule_section_ids() {
        let catalog = sample();
        assert_eq!(catalog.sections()[0].rules[1].section_id, "01-present");
    }

    #[test]
    fn test_loaded_sections_skip_empty() {
        let catalog = sample();
        let loaded: Vec<&str> = catalog.loaded_sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(loaded, vec!["01-present"]);
    }

    #[test]
    fn test_rules_with_questions_keeps_order() {
        let catalog = sample();
        let rules: Vec<&str> = Catalog::rules_with_questions(&catalog.sections()[0])
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(rules, vec!["01-01", "01-03"]);
    }

    #[test]
    fn test_find_question() {
        let catalog = sample();
        let (section, question) = catalog.find_question("q3").unwrap();
        assert_eq!(section.id, "01-present");
        assert_eq!(question.rule_id(), "01-03");
        assert!(catalog.find_question("missing").is_none());
    }

    #[test]
    fn test_from_json_str() {
        let json = serde_json::to_string(sample().sections()).unwrap();
        let catalog = Catalog::from_json_str(&json).unwrap();
        assert_eq!(catalog.sections().len(), 2);
        assert_eq!(catalog.question_count(), 3);
        let ids: Vec<&str> = catalog.all_questions().map(|q| q.id()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);

        assert!(Catalog::from_json_str("{\"not\": \"a list\"}").is_err());
    }

    #[test]
    fn test_meta_counts() {
        let meta = sample().meta();
        assert_eq!(meta[0].question_count, 3);
        assert_eq!(meta[1].question_count, 0);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sections = sample().sections().to_vec();
        for section in &sections {
            std::fs::write(
                dir.path().join(format!("{}.json", section.id)),
                serde_json::to_string(section).unwrap(),
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("README.md"), "not a section").unwrap();

        let catalog = Catalog::load_dir(dir.path()).unwrap();
        assert_eq!(catalog.sections().len(), 2);
        assert_eq!(catalog.sections()[0].id, "01-present");
        assert_eq!(catalog.question_count(), 3);
    }

    #[test]
    fn test_load_dir_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        let err = Catalog::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Json { .. }));
    }
}
