use grammar_utils::{RULES_PER_SECTION, SECTION_COUNT, format_rule_id, parse_rule_id, section_number};

/// Total number of rule slots: 28 sections of 20 rules.
pub const RULE_SLOTS: usize = SECTION_COUNT * RULES_PER_SECTION;

pub const MAX_POWER: u16 = u16::MAX;
/// `old >> DECAY_SHIFT` is the share of the old value lost on every answer (1/16).
pub const DECAY_SHIFT: u32 = 4;
/// Added on a correct answer: `MAX_POWER >> DECAY_SHIFT`.
pub const CORRECT_BUMP: u32 = 4095;
/// Display power at which a rule counts as mastered.
pub const MASTERY_THRESHOLD: f64 = 0.95;

/// Map a rule id like `"01-01"` to its slot in `0..RULE_SLOTS`.
///
/// Malformed or out-of-range ids have no slot.
pub fn slot_index(rule_id: &str) -> Option<usize> {
    let (section, rule) = parse_rule_id(rule_id)?;
    Some((section - 1) * RULES_PER_SECTION + (rule - 1))
}

/// Inverse of [`slot_index`].
pub fn rule_id_for_slot(slot: usize) -> Option<String> {
    (slot < RULE_SLOTS).then(|| {
        format_rule_id(slot / RULES_PER_SECTION + 1, slot % RULES_PER_SECTION + 1)
    })
}

/// `0` for a rule never attempted, otherwise `raw / 65535` in `(0, 1]`.
pub fn display_power(raw: u16) -> f64 {
    if raw == 0 {
        0.0
    } else {
        f64::from(raw) / f64::from(MAX_POWER)
    }
}

/// One integer EWMA step: lose 1/16 of the current value, then add a full bump if correct.
///
/// The result is never 0, so a slot that has seen an answer always reads as attempted.
pub fn next_power(old: u16, correct: bool) -> u16 {
    let old = u32::from(old);
    let bump = if correct { CORRECT_BUMP } else { 0 };
    let next = old - (old >> DECAY_SHIFT) + bump;
    // The clamp makes the narrowing cast lossless.
    next.clamp(1, u32::from(MAX_POWER)) as u16
}

fn mean_display_power(raw: &[u16]) -> f64 {
    let (sum, count) = raw
        .iter()
        .filter(|r| **r != 0)
        .fold((0.0, 0usize), |(sum, count), r| {
            (sum + display_power(*r), count + 1)
        });
    if count > 0 { sum / count as f64 } else { 0.0 }
}

/// The power of every rule slot of one learner.
///
/// The owner of a `Powers` value is its only writer: answers must be applied one at a time in the
/// order they were given, since decay-then-bump does not commute.
#[derive(Clone, PartialEq, Eq)]
pub struct Powers {
    slots: Box<[u16; RULE_SLOTS]>,
}

impl Default for Powers {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Powers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Powers")
            .field("attempted", &self.attempted_count())
            .field("global_power", &self.global_power())
            .finish()
    }
}

impl Powers {
    /// Every rule unattempted.
    pub fn empty() -> Self {
        Self {
            slots: Box::new([0; RULE_SLOTS]),
        }
    }

    pub fn from_raw(slots: [u16; RULE_SLOTS]) -> Self {
        Self {
            slots: Box::new(slots),
        }
    }

    /// Build from a slice of exactly [`RULE_SLOTS`] values.
    pub fn from_slice(raw: &[u16]) -> Option<Self> {
        let slots: [u16; RULE_SLOTS] = raw.try_into().ok()?;
        Some(Self::from_raw(slots))
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.slots[..]
    }

    /// Raw value of a slot, `None` past the last slot.
    pub fn raw(&self, slot: usize) -> Option<u16> {
        self.slots.get(slot).copied()
    }

    /// Raw value for a rule, `0` for ids without a slot.
    pub fn raw_for_rule(&self, rule_id: &str) -> u16 {
        slot_index(rule_id).map_or(0, |slot| self.slots[slot])
    }

    /// Apply one answer in place. Ids without a slot are ignored.
    pub fn record_answer(&mut self, rule_id: &str, correct: bool) {
        let Some(slot) = slot_index(rule_id) else {
            log::debug!("Ignoring answer for unknown rule {rule_id:?}");
            return;
        };
        self.slots[slot] = next_power(self.slots[slot], correct);
    }

    /// Apply answers in order.
    pub fn record_answers<'a>(&mut self, answers: impl IntoIterator<Item = (&'a str, bool)>) {
        for (rule_id, correct) in answers {
            self.record_answer(rule_id, correct);
        }
    }

    /// Non-mutating variant of [`Powers::record_answer`].
    pub fn with_answer(&self, rule_id: &str, correct: bool) -> Self {
        let mut next = self.clone();
        next.record_answer(rule_id, correct);
        next
    }

    pub fn rule_power(&self, rule_id: &str) -> f64 {
        display_power(self.raw_for_rule(rule_id))
    }

    pub fn is_rule_attempted(&self, rule_id: &str) -> bool {
        self.raw_for_rule(rule_id) != 0
    }

    /// Mean display power of the attempted rules of section `section` (1-based), `0` if none.
    pub fn section_power(&self, section: usize) -> f64 {
        if !(1..=SECTION_COUNT).contains(&section) {
            return 0.0;
        }
        let start = (section - 1) * RULES_PER_SECTION;
        mean_display_power(&self.slots[start..start + RULES_PER_SECTION])
    }

    /// [`Powers::section_power`] for a section id such as `"01-present-indicatif"`.
    pub fn section_power_for_id(&self, section_id: &str) -> f64 {
        section_number(section_id).map_or(0.0, |n| self.section_power(usize::from(n)))
    }

    /// Mean display power over every attempted rule.
    pub fn global_power(&self) -> f64 {
        mean_display_power(&self.slots[..])
    }

    pub fn attempted_count(&self) -> usize {
        self.slots.iter().filter(|r| **r != 0).count()
    }

    pub fn mastered_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|r| display_power(**r) >= MASTERY_THRESHOLD)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slot_index_corners() {
        assert_eq!(slot_index("01-01"), Some(0));
        assert_eq!(slot_index("01-20"), Some(19));
        assert_eq!(slot_index("02-01"), Some(20));
        assert_eq!(slot_index("28-20"), Some(559));
        assert_eq!(slot_index("29-01"), None);
        assert_eq!(slot_index("bogus"), None);
    }

    #[test]
    fn test_slot_bijection() {
        let mut seen = HashSet::new();
        for section in 1..=SECTION_COUNT {
            for rule in 1..=RULES_PER_SECTION {
                let id = format_rule_id(section, rule);
                let slot = slot_index(&id).unwrap();
                assert!(seen.insert(slot), "slot {slot} used twice");
                assert_eq!(rule_id_for_slot(slot).as_deref(), Some(id.as_str()));
            }
        }
        assert_eq!(seen.len(), RULE_SLOTS);
        assert_eq!(rule_id_for_slot(RULE_SLOTS), None);
    }

    #[test]
    fn test_first_answers() {
        assert_eq!(next_power(0, true), 4095);
        assert_eq!(next_power(0, false), 1);
        assert_eq!(next_power(MAX_POWER, true), MAX_POWER);
        assert_eq!(next_power(MAX_POWER, false), MAX_POWER - 4095);
    }

    #[test]
    fn test_ewma_bounds_and_convergence() {
        let mut value = 0u16;
        for _ in 0..300 {
            let next = next_power(value, true);
            assert!(next >= value);
            assert!(next >= 1);
            value = next;
        }
        // Integer decay stalls within 1/16 of a bump of the ceiling
        assert!(value >= MAX_POWER - 15, "value {value} did not converge");

        for _ in 0..300 {
            let next = next_power(value, false);
            assert!(next <= value);
            assert!(next >= 1);
            value = next;
        }
        assert!(value < 16, "value {value} did not converge downwards");
    }

    #[test]
    fn test_wrong_answer_on_fresh_rule_marks_it_attempted() {
        let mut powers = Powers::empty();
        assert!(!powers.is_rule_attempted("03-04"));
        powers.record_answer("03-04", false);
        assert!(powers.is_rule_attempted("03-04"));
        assert_eq!(powers.raw_for_rule("03-04"), 1);
    }

    #[test]
    fn test_invalid_rule_is_ignored() {
        let mut powers = Powers::empty();
        powers.record_answer("99-99", true);
        powers.record_answer("", true);
        assert_eq!(powers, Powers::empty());
    }

    #[test]
    fn test_order_matters() {
        let mut a = Powers::empty();
        a.record_answers([("01-01", true), ("01-01", false)]);
        let mut b = Powers::empty();
        b.record_answers([("01-01", false), ("01-01", true)]);
        assert_ne!(a.raw_for_rule("01-01"), b.raw_for_rule("01-01"));
    }

    #[test]
    fn test_with_answer_leaves_original_untouched() {
        let powers = Powers::empty();
        let next = powers.with_answer("05-05", true);
        assert_eq!(powers.raw_for_rule("05-05"), 0);
        assert_eq!(next.raw_for_rule("05-05"), 4095);
    }

    #[test]
    fn test_section_power_ignores_unattempted_rules() {
        let mut slots = [0u16; RULE_SLOTS];
        slots[20] = MAX_POWER; // 02-01
        slots[21] = MAX_POWER / 2 + 1; // 02-02, about 0.5
        let powers = Powers::from_raw(slots);

        let expected = (1.0 + display_power(MAX_POWER / 2 + 1)) / 2.0;
        assert!((powers.section_power(2) - expected).abs() < 1e-12);
        assert!((powers.section_power_for_id("02-passe-compose") - expected).abs() < 1e-12);
        assert_eq!(powers.section_power(1), 0.0);
        assert_eq!(powers.section_power(0), 0.0);
        assert_eq!(powers.section_power(29), 0.0);
        assert!((powers.global_power() - expected).abs() < 1e-12);
        assert_eq!(powers.attempted_count(), 2);
        assert_eq!(powers.mastered_count(), 1);
    }

    #[test]
    fn test_from_slice_length() {
        assert!(Powers::from_slice(&[0; RULE_SLOTS]).is_some());
        assert!(Powers::from_slice(&[0; 10]).is_none());
    }
}
