use rustc_hash::FxHashMap;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, parse_display::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    #[display("Excellent !")]
    Excellent,
    #[display("Bien !")]
    Good,
    #[display("Peut mieux faire")]
    CouldDoBetter,
    #[display("À retravailler")]
    NeedsWork,
}

impl Verdict {
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Verdict::Excellent,
            70..=89 => Verdict::Good,
            50..=69 => Verdict::CouldDoBetter,
            _ => Verdict::NeedsWork,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuleTally {
    pub correct: u32,
    pub total: u32,
}

/// Running result of one quiz.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizScore {
    pub correct: u32,
    pub total: u32,
    pub per_rule: FxHashMap<String, RuleTally>,
}

impl QuizScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rule_id: &str, correct: bool) {
        self.total += 1;
        let tally = self.per_rule.entry(rule_id.to_string()).or_default();
        tally.total += 1;
        if correct {
            self.correct += 1;
            tally.correct += 1;
        }
    }

    /// Rounded share of correct answers, `0` for an empty quiz.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (f64::from(self.correct) * 100.0 / f64::from(self.total)).round() as u32
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::for_percentage(self.percentage())
    }

    /// Rules with at least one wrong answer, worst ratio first.
    pub fn rules_to_review(&self) -> Vec<(&str, RuleTally)> {
        let mut rules: Vec<(&str, RuleTally)> = self
            .per_rule
            .iter()
            .filter(|(_, tally)| tally.correct < tally.total)
            .map(|(rule_id, tally)| (rule_id.as_str(), *tally))
            .collect();
        rules.sort_by(|(a_id, a), (b_id, b)| {
            let a_ratio = f64::from(a.correct) / f64::from(a.total);
            let b_ratio = f64::from(b.correct) / f64::from(b.total);
            a_ratio.total_cmp(&b_ratio).then_with(|| a_id.cmp(b_id))
        });
        rules
    }
}
