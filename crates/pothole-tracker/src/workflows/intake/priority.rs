use super::domain::{PriorityTier, Severity};

const MEDIUM_FROM: u8 = 4;
const HIGH_FROM: u8 = 7;

/// Maps severity to a repair priority: 1-3 Low, 4-6 Medium, 7-10 High.
pub fn classify(severity: Severity) -> PriorityTier {
    match severity.value() {
        value if value >= HIGH_FROM => PriorityTier::High,
        value if value >= MEDIUM_FROM => PriorityTier::Medium,
        _ => PriorityTier::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(value: i64) -> PriorityTier {
        classify(Severity::new(value).expect("valid severity"))
    }

    #[test]
    fn thresholds() {
        assert_eq!(tier(1), PriorityTier::Low);
        assert_eq!(tier(3), PriorityTier::Low);
        assert_eq!(tier(4), PriorityTier::Medium);
        assert_eq!(tier(6), PriorityTier::Medium);
        assert_eq!(tier(7), PriorityTier::High);
        assert_eq!(tier(8), PriorityTier::High);
        assert_eq!(tier(10), PriorityTier::High);
    }

    #[test]
    fn monotonic_over_scale() {
        let tiers: Vec<_> = (1..=10).map(tier).collect();
        assert!(tiers.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
