//! Score, coins and lives accumulated during a session.

/// Running totals credited by completed devices and debited by failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    score: u32,
    coins: u32,
    lives: u32,
    max_lives: u32,
}

impl Ledger {
    /// Creates a ledger with a full set of lives.
    #[must_use]
    pub const fn new(max_lives: u32) -> Self {
        Self {
            score: 0,
            coins: 0,
            lives: max_lives,
            max_lives,
        }
    }

    /// Cumulative score.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Coins available to spend.
    #[must_use]
    pub const fn coins(&self) -> u32 {
        self.coins
    }

    /// Lives left.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Lives granted at the start of a session.
    #[must_use]
    pub const fn max_lives(&self) -> u32 {
        self.max_lives
    }

    /// Reports whether every life has been lost.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.lives == 0
    }

    /// Credits a completed device.
    pub fn add_rewards(&mut self, score: u32, coins: u32) {
        self.score = self.score.saturating_add(score);
        self.coins = self.coins.saturating_add(coins);
    }

    /// Debits `amount` coins when affordable.
    pub fn spend(&mut self, amount: u32) -> bool {
        match self.coins.checked_sub(amount) {
            Some(left) => {
                self.coins = left;
                true
            }
            None => false,
        }
    }

    /// Removes one life, returning the lives left. `None` once already at zero.
    pub fn lose_life(&mut self) -> Option<u32> {
        if self.lives == 0 {
            return None;
        }
        self.lives -= 1;
        Some(self.lives)
    }

    /// Clears score and coins and restores every life.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_lives);
    }
}

#[cfg(test)]
mod tests {
    use super::Ledger;

    #[test]
    fn lives_stop_at_zero() {
        let mut ledger = Ledger::new(2);
        assert_eq!(ledger.lose_life(), Some(1));
        assert_eq!(ledger.lose_life(), Some(0));
        assert!(ledger.is_game_over());
        assert_eq!(ledger.lose_life(), None);
    }

    #[test]
    fn spending_requires_enough_coins() {
        let mut ledger = Ledger::new(3);
        ledger.add_rewards(15, 10);
        assert!(!ledger.spend(11));
        assert!(ledger.spend(10));
        assert_eq!(ledger.coins(), 0);
        assert_eq!(ledger.score(), 15);

        ledger.reset();
        assert_eq!((ledger.score(), ledger.lives()), (0, 3));
    }
}
