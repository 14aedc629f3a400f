use grammar_utils::Catalog;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use crate::picker::pick_learn_questions;
use crate::power::Powers;
use crate::score::{QuizScore, Verdict};

/// Outcome of one simulated learn set.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub round: usize,
    pub asked: usize,
    pub correct: usize,
    pub verdict: Verdict,
    pub global_power: f64,
    pub attempted_rules: usize,
    pub mastered_rules: usize,
}

/// Iterator that simulates a learner working through learn sets, yielding a report per round.
///
/// The learner answers a question on a rule correctly with a hidden probability that starts at
/// `initial_skill` and closes `learning_rate` of the remaining gap after every question seen on
/// that rule. Ends only if the catalog has nothing to ask.
pub struct LearnerSimulation<'a> {
    catalog: &'a Catalog,
    powers: Powers,
    skill: FxHashMap<String, f64>,
    initial_skill: f64,
    learning_rate: f64,
    rng: ChaCha8Rng,
    round: usize,
}

impl<'a> LearnerSimulation<'a> {
    pub const DEFAULT_INITIAL_SKILL: f64 = 0.3;
    pub const DEFAULT_LEARNING_RATE: f64 = 0.15;

    pub fn new(catalog: &'a Catalog, seed: u64) -> Self {
        Self {
            catalog,
            powers: Powers::empty(),
            skill: FxHashMap::default(),
            initial_skill: Self::DEFAULT_INITIAL_SKILL,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            rng: weighted_sampler::seeded_rng(seed),
            round: 0,
        }
    }

    pub fn with_initial_skill(mut self, skill: f64) -> Self {
        self.initial_skill = skill.clamp(0.0, 1.0);
        self
    }

    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Start from existing progress instead of a blank record.
    pub fn with_powers(mut self, powers: Powers) -> Self {
        self.powers = powers;
        self
    }

    pub fn powers(&self) -> &Powers {
        &self.powers
    }

    pub fn into_powers(self) -> Powers {
        self.powers
    }

    fn answer(&mut self, rule_id: &str) -> bool {
        let skill = self
            .skill
            .entry(rule_id.to_string())
            .or_insert(self.initial_skill);
        let correct = self.rng.gen_bool(*skill);
        *skill += (1.0 - *skill) * self.learning_rate;
        correct
    }
}

impl Iterator for LearnerSimulation<'_> {
    type Item = RoundReport;

    fn next(&mut self) -> Option<Self::Item> {
        let questions = pick_learn_questions(self.catalog, &self.powers, &mut self.rng);
        if questions.is_empty() {
            return None;
        }

        let mut score = QuizScore::new();
        for question in &questions {
            let correct = self.answer(question.rule_id());
            self.powers.record_answer(question.rule_id(), correct);
            score.record(question.rule_id(), correct);
        }

        self.round += 1;
        log::debug!(
            "Round {}: {}/{} correct",
            self.round,
            score.correct,
            score.total
        );
        Some(RoundReport {
            round: self.round,
            asked: questions.len(),
            correct: score.correct as usize,
            verdict: score.verdict(),
            global_power: self.powers.global_power(),
            attempted_rules: self.powers.attempted_count(),
            mastered_rules: self.powers.mastered_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grammar_utils::{Choice, McqQuestion, Question, Rule, Section};

    fn catalog() -> Catalog {
        let sections = (1..=4)
            .map(|s| {
                let rules: Vec<Rule> = (1..=4)
                    .map(|r| Rule {
                        id: format!("{s:02}-{r:02}"),
                        section_id: String::new(),
                        title: String::new(),
                    })
                    .collect();
                let questions = rules
                    .iter()
                    .flat_map(|rule| {
                        (0..6).map(move |q| {
                            Question::Mcq(McqQuestion {
                                id: format!("{}-{q}", rule.id),
                                rule_id: rule.id.clone(),
                                prompt: String::new(),
                                choices: vec![Choice {
                                    text: "oui".to_string(),
                                    correct: true,
                                    explanation: String::new(),
                                }],
                            })
                        })
                    })
                    .collect();
                Section {
                    id: format!("{s:02}-s"),
                    title: String::new(),
                    description: String::new(),
                    rules,
                    questions,
                }
            })
            .collect();
        Catalog::new(sections)
    }

    #[test]
    fn test_deterministic_for_a_seed() {
        let catalog = catalog();
        let a: Vec<RoundReport> = LearnerSimulation::new(&catalog, 42).take(10).collect();
        let b: Vec<RoundReport> = LearnerSimulation::new(&catalog, 42).take(10).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|r| r.asked == 20));
        assert_eq!(a.last().map(|r| r.round), Some(10));
    }

    #[test]
    fn test_perfect_learner_reaches_mastery() {
        let catalog = catalog();
        let reports: Vec<RoundReport> = LearnerSimulation::new(&catalog, 1)
            .with_initial_skill(1.0)
            .take(60)
            .collect();
        assert!(reports.iter().all(|r| r.correct == r.asked));
        let last = reports.last().unwrap();
        assert_eq!(last.attempted_rules, 16);
        assert!(last.global_power > reports[0].global_power);
    }

    #[test]
    fn test_resumes_from_existing_powers() {
        let catalog = catalog();
        // 09-01 is outside the catalog, so only the starting powers can carry it
        let start = Powers::empty().with_answer("09-01", true);
        let mut simulation = LearnerSimulation::new(&catalog, 7).with_powers(start.clone());
        assert_eq!(simulation.powers(), &start);

        let rounds = simulation.by_ref().take(3).count();
        assert_eq!(rounds, 3);
        let end = simulation.into_powers();
        assert_eq!(end.raw_for_rule("09-01"), start.raw_for_rule("09-01"));
        assert!(end.attempted_count() > start.attempted_count());
    }

    #[test]
    fn test_empty_catalog_ends_immediately() {
        let catalog = Catalog::default();
        assert_eq!(LearnerSimulation::new(&catalog, 0).count(), 0);
    }
}
