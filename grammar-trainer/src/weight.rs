/// Weight of a rule nobody has tried yet. Higher than any attempted rule above ~0.33 power.
pub const WEIGHT_UNATTEMPTED: f64 = 0.5;
pub const WEIGHT_EXPONENT: i32 = 2;
/// Keeps mastered rules resurfacing now and then.
pub const WEIGHT_FLOOR: f64 = 0.05;

/// Sampling weight for a rule (or a section) with display power `power`.
pub fn rule_weight(power: f64, attempted: bool) -> f64 {
    if !attempted {
        return WEIGHT_UNATTEMPTED;
    }
    (1.0 - power.clamp(0.0, 1.0)).powi(WEIGHT_EXPONENT) + WEIGHT_FLOOR
}
