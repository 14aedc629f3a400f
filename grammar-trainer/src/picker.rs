//! Adaptive selection of practice questions.
//!
//! A learn set is built in phases, each with its own budget:
//!
//! 1. a *focus* section and a *focus* rule inside it, both weighted towards weakness, and up to
//!    [`LearnBudget::FOCUS`] questions on that rule (topped up from the section's other weak rules)
//! 2. one *encouragement* question from a rule the learner is already good at
//! 3. questions from the rules next to the focus rule in the section's teaching order
//! 4. a few *leftfield* questions from two or three other sections
//! 5. whatever is still missing, drawn uniformly from every loaded question
//!
//! A question is never picked twice, whichever phase reaches it first.

use grammar_utils::{Catalog, Question, Rule, Section};
use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet;
use weighted_sampler::{shuffle, weighted_random_index, weighted_sample_without_replacement};

use crate::power::Powers;
use crate::weight::rule_weight;

/// Question budgets of a learn set.
pub struct LearnBudget;

impl LearnBudget {
    pub const TOTAL: usize = 20;
    pub const FOCUS: usize = 9;
    pub const FOCUS_ENCOURAGE: usize = 1;
    pub const ADJACENT: usize = 4;
    pub const ADJACENT_ENCOURAGE: usize = 1;
    pub const LEFTFIELD: usize = 4;
    pub const LEFTFIELD_ENCOURAGE: usize = 1;
    /// Minimum display power for a rule to serve as encouragement.
    pub const ENCOURAGE_THRESHOLD: f64 = 0.6;
}

/// Number of questions in a per-section quiz.
pub const QUESTIONS_PER_QUIZ: usize = 20;

/// Positions, relative to the focus rule, of the rules considered adjacent to it.
const ADJACENT_OFFSETS: [isize; 4] = [-2, -1, 1, 2];

/// Read access to a learner's mastery, as display powers in `[0, 1]` (`0` = never attempted).
pub trait MasteryView {
    fn rule_power(&self, rule_id: &str) -> f64;
    fn section_power(&self, section_id: &str) -> f64;

    fn rule_weight(&self, rule_id: &str) -> f64 {
        let power = self.rule_power(rule_id);
        rule_weight(power, power > 0.0)
    }

    fn section_weight(&self, section_id: &str) -> f64 {
        let power = self.section_power(section_id);
        rule_weight(power, power > 0.0)
    }
}

impl MasteryView for Powers {
    fn rule_power(&self, rule_id: &str) -> f64 {
        Powers::rule_power(self, rule_id)
    }

    fn section_power(&self, section_id: &str) -> f64 {
        self.section_power_for_id(section_id)
    }
}

/// The questions picked so far, in pick order, deduplicated by id.
#[derive(Default)]
struct Collector<'a> {
    collected: FxHashSet<&'a str>,
    picked: Vec<&'a Question>,
}

impl<'a> Collector<'a> {
    fn len(&self) -> usize {
        self.picked.len()
    }

    /// Add up to `limit` not-yet-collected questions, chosen at random among `candidates`.
    fn add<R: Rng + ?Sized>(
        &mut self,
        candidates: impl IntoIterator<Item = &'a Question>,
        limit: usize,
        rng: &mut R,
    ) -> usize {
        let mut candidates: Vec<&'a Question> = candidates.into_iter().collect();
        shuffle(&mut candidates, rng);

        let mut added = 0;
        for question in candidates {
            if added >= limit {
                break;
            }
            if self.collected.insert(question.id()) {
                self.picked.push(question);
                added += 1;
            }
        }
        added
    }

    fn add_from_rule<R: Rng + ?Sized>(
        &mut self,
        section: &'a Section,
        rule_id: &str,
        limit: usize,
        rng: &mut R,
    ) -> usize {
        self.add(Catalog::questions_for_rule(section, rule_id), limit, rng)
    }

    fn finish<R: Rng + ?Sized>(self, rng: &mut R) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .picked
            .into_iter()
            .take(LearnBudget::TOTAL)
            .cloned()
            .collect();
        for question in &mut questions {
            shuffle_choices(question, rng);
        }
        shuffle(&mut questions, rng);
        questions
    }
}

fn shuffle_choices<R: Rng + ?Sized>(question: &mut Question, rng: &mut R) {
    if let Question::Mcq(mcq) = question {
        shuffle(&mut mcq.choices, rng);
    }
}

fn pick_weighted<'r, M, R>(rules: &[&'r Rule], mastery: &M, rng: &mut R) -> Option<&'r Rule>
where
    M: MasteryView + ?Sized,
    R: Rng + ?Sized,
{
    let weights: Vec<f64> = rules.iter().map(|r| mastery.rule_weight(&r.id)).collect();
    weighted_random_index(&weights, rng).map(|i| rules[i])
}

/// Rules at [`ADJACENT_OFFSETS`] from `focus_rule_id` in the section's rule order, restricted to
/// rules that have questions.
pub fn adjacent_rules<'a>(section: &'a Section, focus_rule_id: &str) -> Vec<&'a Rule> {
    let Some(position) = section.position_of_rule(focus_rule_id) else {
        return Vec::new();
    };
    let covered: FxHashSet<&str> = section.questions.iter().map(|q| q.rule_id()).collect();
    ADJACENT_OFFSETS
        .iter()
        .filter_map(|offset| position.checked_add_signed(*offset))
        .filter_map(|i| section.rules.get(i))
        .filter(|r| covered.contains(r.id.as_str()))
        .collect()
}

struct Focus<'a> {
    section: &'a Section,
    rules: Vec<&'a Rule>,
    rule: &'a Rule,
}

fn fill_focus<'a, M, R>(focus: &Focus<'a>, collector: &mut Collector<'a>, mastery: &M, rng: &mut R)
where
    M: MasteryView + ?Sized,
    R: Rng + ?Sized,
{
    collector.add_from_rule(focus.section, &focus.rule.id, LearnBudget::FOCUS, rng);
    if collector.len() >= LearnBudget::FOCUS {
        return;
    }

    // Weakest first
    let mut others: Vec<&Rule> = focus
        .rules
        .iter()
        .copied()
        .filter(|r| r.id != focus.rule.id)
        .collect();
    others.sort_by(|a, b| {
        mastery
            .rule_weight(&b.id)
            .total_cmp(&mastery.rule_weight(&a.id))
    });
    for rule in others {
        if collector.len() >= LearnBudget::FOCUS {
            break;
        }
        let missing = LearnBudget::FOCUS - collector.len();
        collector.add_from_rule(focus.section, &rule.id, missing, rng);
    }
}

fn encourage_in_focus<'a, M, R>(
    focus: &Focus<'a>,
    collector: &mut Collector<'a>,
    mastery: &M,
    rng: &mut R,
) where
    M: MasteryView + ?Sized,
    R: Rng + ?Sized,
{
    let mut strong: Vec<&Rule> = focus
        .rules
        .iter()
        .copied()
        .filter(|r| mastery.rule_power(&r.id) >= LearnBudget::ENCOURAGE_THRESHOLD)
        .collect();
    strong.sort_by(|a, b| {
        mastery
            .rule_power(&b.id)
            .total_cmp(&mastery.rule_power(&a.id))
    });

    let source = strong
        .first()
        .or_else(|| focus.rules.iter().find(|r| r.id != focus.rule.id));
    if let Some(rule) = source {
        collector.add_from_rule(focus.section, &rule.id, LearnBudget::FOCUS_ENCOURAGE, rng);
    }
}

fn fill_adjacent<'a, M, R>(
    focus: &Focus<'a>,
    collector: &mut Collector<'a>,
    mastery: &M,
    rng: &mut R,
) where
    M: MasteryView + ?Sized,
    R: Rng + ?Sized,
{
    let mut adjacent = adjacent_rules(focus.section, &focus.rule.id);
    shuffle(&mut adjacent, rng);
    let target = collector.len() + LearnBudget::ADJACENT;
    for rule in adjacent {
        if collector.len() >= target {
            break;
        }
        collector.add_from_rule(focus.section, &rule.id, 1, rng);
    }

    let strong: Vec<&Rule> = focus
        .rules
        .iter()
        .copied()
        .filter(|r| {
            r.id != focus.rule.id
                && mastery.rule_power(&r.id) >= LearnBudget::ENCOURAGE_THRESHOLD
        })
        .collect();
    if let Some(rule) = strong.choose(rng) {
        collector.add_from_rule(
            focus.section,
            &rule.id,
            LearnBudget::ADJACENT_ENCOURAGE,
            rng,
        );
    }
}

fn fill_leftfield<'a, M, R>(
    others: &[&'a Section],
    collector: &mut Collector<'a>,
    mastery: &M,
    rng: &mut R,
) where
    M: MasteryView + ?Sized,
    R: Rng + ?Sized,
{
    if others.is_empty() {
        return;
    }

    let weights: Vec<f64> = others.iter().map(|s| mastery.section_weight(&s.id)).collect();
    let wanted = others.len().min(2 + rng.gen_range(0..=1));
    let picked = weighted_sample_without_replacement(&weights, wanted, rng);
    let per_section = LearnBudget::LEFTFIELD.div_ceil(wanted);
    log::debug!(
        "Leftfield sections: {:?}",
        picked.iter().map(|i| &others[*i].id).collect::<Vec<_>>()
    );

    let target = collector.len() + LearnBudget::LEFTFIELD;
    for index in picked {
        if collector.len() >= target {
            break;
        }
        let section = others[index];
        let rules = Catalog::rules_with_questions(section);
        if let Some(rule) = pick_weighted(&rules, mastery, rng) {
            collector.add_from_rule(section, &rule.id, per_section, rng);
        }
    }

    let mut strong: Vec<(&'a Section, &'a Rule)> = Vec::new();
    for section in others.iter().copied() {
        for rule in Catalog::rules_with_questions(section) {
            if mastery.rule_power(&rule.id) >= LearnBudget::ENCOURAGE_THRESHOLD {
                strong.push((section, rule));
            }
        }
    }
    if let Some(&(section, rule)) = strong.choose(rng) {
        collector.add_from_rule(section, &rule.id, LearnBudget::LEFTFIELD_ENCOURAGE, rng);
    }
}

/// Assemble an adaptive practice set of up to [`LearnBudget::TOTAL`] distinct questions.
///
/// Only sections with questions take part. MCQ choices come back shuffled, and so does the order
/// of the questions.
pub fn pick_learn_questions<M, R>(catalog: &Catalog, mastery: &M, rng: &mut R) -> Vec<Question>
where
    M: MasteryView + ?Sized,
    R: Rng + ?Sized,
{
    let loaded = catalog.loaded_sections();
    let section_weights: Vec<f64> = loaded.iter().map(|s| mastery.section_weight(&s.id)).collect();
    let Some(focus_index) = weighted_random_index(&section_weights, rng) else {
        return Vec::new();
    };
    let focus_section = loaded[focus_index];
    let all_loaded: Vec<&Question> = loaded
        .iter()
        .copied()
        .flat_map(|s| s.questions.iter())
        .collect();

    let mut collector = Collector::default();
    let focus_rules = Catalog::rules_with_questions(focus_section);
    let Some(focus_rule) = pick_weighted(&focus_rules, mastery, rng) else {
        log::debug!(
            "Section {} has no rule with questions, drawing from every section",
            focus_section.id
        );
        collector.add(all_loaded, LearnBudget::TOTAL, rng);
        return collector.finish(rng);
    };
    log::debug!("Focus: section {}, rule {}", focus_section.id, focus_rule.id);

    let focus = Focus {
        section: focus_section,
        rules: focus_rules,
        rule: focus_rule,
    };
    fill_focus(&focus, &mut collector, mastery, rng);
    encourage_in_focus(&focus, &mut collector, mastery, rng);
    fill_adjacent(&focus, &mut collector, mastery, rng);

    let others: Vec<&Section> = loaded
        .iter()
        .copied()
        .filter(|s| s.id != focus_section.id)
        .collect();
    fill_leftfield(&others, &mut collector, mastery, rng);

    if collector.len() < LearnBudget::TOTAL {
        let missing = LearnBudget::TOTAL - collector.len();
        let added = collector.add(all_loaded, missing, rng);
        log::debug!("Filled {added} of {missing} missing questions from the whole catalog");
    }

    collector.finish(rng)
}

/// A plain quiz over one section: up to [`QUESTIONS_PER_QUIZ`] random questions with shuffled
/// choices.
pub fn pick_section_quiz<R: Rng + ?Sized>(section: &Section, rng: &mut R) -> Vec<Question> {
    let mut questions = section.questions.clone();
    shuffle(&mut questions, rng);
    questions.truncate(QUESTIONS_PER_QUIZ);
    for question in &mut questions {
        shuffle_choices(question, rng);
    }
    questions
}
