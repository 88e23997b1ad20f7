use std::fmt;

use crate::strategy::Strategy;

/// Permanent lifecycle of a player. Once busted or retired a player places
/// no more bets and receives no more cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Active,
    Busted { round: u32 },
    Retired { round: u32 },
}

/// Bankroll owner. The strategy is shared by every box the player owns.
pub struct Player {
    id: u32,
    owner: String,
    balance: f64,
    initial_balance: f64,
    target_balance: Option<f64>,
    round_start_balance: f64,
    status: PlayerStatus,
    strategy: Box<dyn Strategy>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("balance", &self.balance)
            .field("status", &self.status)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Player {
    pub fn new(
        id: u32,
        owner: impl Into<String>,
        initial_balance: f64,
        target_balance: Option<f64>,
        strategy: Box<dyn Strategy>,
    ) -> Player {
        Player {
            id,
            owner: owner.into(),
            balance: initial_balance,
            initial_balance,
            target_balance: target_balance.filter(|target| *target > 0.0),
            round_start_balance: initial_balance,
            status: PlayerStatus::Active,
            strategy,
        }
    }

    pub fn can_afford(&self, amount: f64) -> bool {
        self.balance >= amount
    }

    /// Debits `amount` if the balance covers it. Returns whether the bet was
    /// placed; the balance is untouched otherwise.
    pub fn place_bet(&mut self, amount: f64) -> bool {
        if !self.is_active() || !self.can_afford(amount) {
            return false;
        }
        self.balance -= amount;
        true
    }

    pub fn receive_payout(&mut self, amount: f64) {
        if self.is_active() {
            self.balance += amount;
        }
    }

    /// Snapshot of the balance every hand of this round is reported against.
    pub fn begin_round(&mut self) {
        self.round_start_balance = self.balance;
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Marks the player busted when the balance can no longer cover the
    /// table minimum, or retired once the target is reached. Busting wins
    /// when both apply.
    pub fn update_status(&mut self, min_bet: f64, round: u32) -> PlayerStatus {
        if !self.is_active() {
            return self.status;
        }
        if self.balance < min_bet {
            self.status = PlayerStatus::Busted { round };
        } else if self.target_balance.map_or(false, |target| self.balance >= target) {
            self.status = PlayerStatus::Retired { round };
        }
        self.status
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn target_balance(&self) -> Option<f64> {
        self.target_balance
    }

    pub fn round_start_balance(&self) -> f64 {
        self.round_start_balance
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn is_busted(&self) -> bool {
        matches!(self.status, PlayerStatus::Busted { .. })
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.status, PlayerStatus::Retired { .. })
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Action, TableStrategy};
    use std::collections::HashMap;

    fn player(balance: f64, target: Option<f64>) -> Player {
        let strategy = TableStrategy::new("basic", HashMap::new(), Action::Stand, false).unwrap();
        Player::new(1, "alice", balance, target, Box::new(strategy))
    }

    #[test]
    fn bets_never_overdraw() {
        let mut player = player(15.0, None);
        assert!(player.place_bet(10.0));
        assert_eq!(player.balance(), 5.0);
        assert!(!player.place_bet(10.0));
        assert_eq!(player.balance(), 5.0);
        assert!(player.place_bet(5.0));
        assert_eq!(player.balance(), 0.0);
    }

    #[test]
    fn busts_below_table_minimum() {
        let mut player = player(15.0, Some(100.0));
        player.place_bet(10.0);
        assert_eq!(player.update_status(10.0, 4), PlayerStatus::Busted { round: 4 });
        assert!(!player.place_bet(1.0));

        player.receive_payout(500.0);
        assert_eq!(player.balance(), 5.0);
        assert_eq!(player.update_status(10.0, 5), PlayerStatus::Busted { round: 4 });
    }

    #[test]
    fn retires_on_reaching_target() {
        let mut player = player(90.0, Some(100.0));
        assert_eq!(player.update_status(10.0, 1), PlayerStatus::Active);
        player.receive_payout(10.0);
        assert_eq!(player.update_status(10.0, 2), PlayerStatus::Retired { round: 2 });
        assert!(player.is_retired());
        assert!(!player.is_active());
    }

    #[test]
    fn zero_target_means_no_retirement() {
        let mut player = player(90.0, Some(0.0));
        assert_eq!(player.target_balance(), None);
        player.receive_payout(1000.0);
        assert_eq!(player.update_status(10.0, 1), PlayerStatus::Active);
    }

    #[test]
    fn round_snapshot_is_taken_on_request() {
        let mut player = player(50.0, None);
        player.begin_round();
        player.place_bet(20.0);
        assert_eq!(player.round_start_balance(), 50.0);
        player.begin_round();
        assert_eq!(player.round_start_balance(), 30.0);
    }
}
