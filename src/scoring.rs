//! Elimination scoring with chain multipliers.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringSystem {
    total: u64,
    /// 0 = no active chain; 1 = first link; n = n-th consecutive link.
    chain_level: u32,
}

/// `floor(10 * sqrt(cells))`.
pub fn calculate_base_score(cells_eliminated: usize) -> u64 {
    (10.0 * (cells_eliminated as f64).sqrt()).floor() as u64
}

impl ScoringSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one chain link and add it to the total. A link that does not continue a chain
    /// restarts the multiplier at 1. Returns the points awarded.
    pub fn add_elimination_score(
        &mut self,
        cells_eliminated: usize,
        is_chain_continuation: bool,
    ) -> u64 {
        if is_chain_continuation {
            self.chain_level = self.chain_level.saturating_add(1);
        } else {
            self.chain_level = 1;
        }
        let score = calculate_base_score(cells_eliminated) * u64::from(self.chain_level);
        self.total += score;
        score
    }

    /// No elimination found: the chain is over.
    pub fn reset_chain(&mut self) {
        self.chain_level = 0;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn chain_level(&self) -> u32 {
        self.chain_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_score() {
        assert_eq!(calculate_base_score(0), 0);
        assert_eq!(calculate_base_score(1), 10);
        assert_eq!(calculate_base_score(2), 14);
        assert_eq!(calculate_base_score(100), 100);
        assert_eq!(calculate_base_score(400), 200);
    }

    #[test]
    fn test_chain_sequence() {
        let mut s = ScoringSystem::new();
        let scores: Vec<u64> = [false, true, true]
            .into_iter()
            .map(|chain| s.add_elimination_score(100, chain))
            .collect();
        assert_eq!(scores, vec![100, 200, 300]);
        assert_eq!(s.chain_level(), 3);
        assert_eq!(s.total(), 600);
    }

    #[test]
    fn test_new_chain_restarts_at_one() {
        let mut s = ScoringSystem::new();
        s.add_elimination_score(100, false);
        s.add_elimination_score(100, true);
        assert_eq!(s.add_elimination_score(100, false), 100);
        assert_eq!(s.chain_level(), 1);
    }

    #[test]
    fn test_reset_chain_is_zero_not_one() {
        let mut s = ScoringSystem::new();
        s.add_elimination_score(25, false);
        s.reset_chain();
        assert_eq!(s.chain_level(), 0);
        assert_eq!(s.total(), 50);
        // Continuing from "no chain" gives multiplier 1.
        assert_eq!(s.add_elimination_score(25, true), 50);
    }
}
