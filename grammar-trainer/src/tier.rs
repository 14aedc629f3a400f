/// Display tier of a rule or section, from its display power.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    parse_display::Display,
)]
#[serde(rename_all = "kebab-case")]
#[display(style = "kebab-case")]
pub enum Tier {
    Beginner,
    InProgress,
    Intermediate,
    Advanced,
    VeryAdvanced,
    Mastered,
}

impl Tier {
    /// Highest first, so the first tier whose minimum is reached wins.
    pub const ALL: [Tier; 6] = [
        Tier::Mastered,
        Tier::VeryAdvanced,
        Tier::Advanced,
        Tier::Intermediate,
        Tier::InProgress,
        Tier::Beginner,
    ];

    /// `None` for anything never attempted.
    pub fn for_power(power: f64, attempted: bool) -> Option<Tier> {
        if !attempted {
            return None;
        }
        Some(
            Self::ALL
                .into_iter()
                .find(|tier| power >= tier.min_power())
                .unwrap_or(Tier::Beginner),
        )
    }

    pub fn min_power(self) -> f64 {
        match self {
            Tier::Mastered => 0.95,
            Tier::VeryAdvanced => 0.80,
            Tier::Advanced => 0.60,
            Tier::Intermediate => 0.40,
            Tier::InProgress => 0.20,
            Tier::Beginner => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Mastered => "Maîtrisé !",
            Tier::VeryAdvanced => "Très avancé",
            Tier::Advanced => "Avancé",
            Tier::Intermediate => "Intermédiaire",
            Tier::InProgress => "En progrès",
            Tier::Beginner => "Débutant",
        }
    }

    /// Message shown when a learner reaches this tier.
    pub fn promo(self) -> &'static str {
        match self {
            Tier::Mastered => "Bravo, vous maîtrisez ce sujet !",
            Tier::VeryAdvanced => "La maîtrise approche !",
            Tier::Advanced => "Vous devenez solide !",
            Tier::Intermediate => "Niveau intermédiaire atteint !",
            Tier::InProgress => "Vous progressez, continuez !",
            Tier::Beginner => "Première étape franchie !",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tier::Mastered => "#facc15",
            Tier::VeryAdvanced => "#34d399",
            Tier::Advanced => "#fb923c",
            Tier::Intermediate => "#fbbf24",
            Tier::InProgress => "#2dd4bf",
            Tier::Beginner => "#38bdf8",
        }
    }
}
