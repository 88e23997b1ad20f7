use std::collections::BTreeMap;
use std::fmt;
use std::io;

use simjack::{HandRecord, HandResult, HandSink, Player, PlayerStatus, Strategy};
use tracing::info;

use self::private::Statistics;

mod private {
    use simjack::HandResult;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Statistics {
        hands: u64,
        wins: u64,
        pushes: u64,
        losses: u64,
        blackjacks: u64,
        surrenders: u64,
        total_bet: f64,
        total_returned: f64,
    }

    impl Statistics {
        pub fn record(&mut self, result: Option<HandResult>, bet: f64, payout: f64) {
            self.hands += 1;
            self.total_bet += bet;
            self.total_returned += payout;
            match result {
                Some(HandResult::Win) => self.wins += 1,
                Some(HandResult::Push) => self.pushes += 1,
                Some(HandResult::Lose) => self.losses += 1,
                Some(HandResult::Blackjack) => self.blackjacks += 1,
                Some(HandResult::Surrender) => self.surrenders += 1,
                None => {}
            }
        }

        pub fn get_hands(&self) -> u64 {
            self.hands
        }

        pub fn get_wins(&self) -> u64 {
            self.wins
        }

        pub fn get_pushes(&self) -> u64 {
            self.pushes
        }

        pub fn get_losses(&self) -> u64 {
            self.losses
        }

        pub fn get_blackjacks(&self) -> u64 {
            self.blackjacks
        }

        pub fn get_surrenders(&self) -> u64 {
            self.surrenders
        }

        /// Main-bet return per unit staked, 1.0 meaning break-even.
        pub fn get_rate(&self) -> f64 {
            if self.total_bet > 0.0 {
                self.total_returned / self.total_bet
            } else {
                0.0
            }
        }
    }
}

/// Tallies settled hands per player and hands every record on to `inner`.
pub struct SummaryCollector<S> {
    inner: S,
    round_count: u32,
    progress_step: u32,
    per_player: BTreeMap<u32, Statistics>,
}

impl<S: HandSink> SummaryCollector<S> {
    pub fn new(inner: S, round_count: u32) -> Self {
        SummaryCollector {
            inner,
            round_count,
            progress_step: (round_count / 10).max(1),
            per_player: BTreeMap::new(),
        }
    }

    pub fn into_inner(self) -> (S, Summary) {
        let summary = Summary {
            per_player: self.per_player,
        };
        (self.inner, summary)
    }
}

impl<S: HandSink> HandSink for SummaryCollector<S> {
    fn on_hand_settled(&mut self, record: &HandRecord) -> io::Result<()> {
        self.per_player.entry(record.player_id).or_default().record(
            record.result,
            record.hand_bet,
            record.hand_payout,
        );
        self.inner.on_hand_settled(record)
    }

    fn on_round_complete(&mut self, round: u32) -> io::Result<()> {
        if round % self.progress_step == 0 {
            info!(
                round,
                total = self.round_count,
                percent = u64::from(round) * 100 / u64::from(self.round_count.max(1)),
                "simulation progress"
            );
        }
        self.inner.on_round_complete(round)
    }
}

/// Hand tallies of a finished run, keyed by player id.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    per_player: BTreeMap<u32, Statistics>,
}

impl Summary {
    pub fn players(&self, players: &[Player]) -> Vec<PlayerSummary> {
        players
            .iter()
            .map(|player| PlayerSummary {
                player_id: player.id(),
                owner: player.owner().to_string(),
                strategy: player.strategy().name().to_string(),
                initial_balance: player.initial_balance(),
                final_balance: player.balance(),
                status: player.status(),
                statistics: self
                    .per_player
                    .get(&player.id())
                    .copied()
                    .unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PlayerSummary {
    pub player_id: u32,
    pub owner: String,
    pub strategy: String,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub status: PlayerStatus,
    statistics: Statistics,
}

impl PlayerSummary {
    pub fn net(&self) -> f64 {
        self.final_balance - self.initial_balance
    }

    pub fn hands(&self) -> u64 {
        self.statistics.get_hands()
    }

    pub fn count(&self, result: HandResult) -> u64 {
        match result {
            HandResult::Win => self.statistics.get_wins(),
            HandResult::Push => self.statistics.get_pushes(),
            HandResult::Lose => self.statistics.get_losses(),
            HandResult::Blackjack => self.statistics.get_blackjacks(),
            HandResult::Surrender => self.statistics.get_surrenders(),
        }
    }
}

impl fmt::Display for PlayerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Player {} ({}) with strategy '{}'",
            self.player_id, self.owner, self.strategy
        )?;
        writeln!(
            f,
            "  balance: {:.2} -> {:.2} (net {:+.2})",
            self.initial_balance,
            self.final_balance,
            self.net()
        )?;
        writeln!(
            f,
            "  hands: {}  wins: {}  pushes: {}  losses: {}  blackjacks: {}  surrenders: {}",
            self.hands(),
            self.statistics.get_wins(),
            self.statistics.get_pushes(),
            self.statistics.get_losses(),
            self.statistics.get_blackjacks(),
            self.statistics.get_surrenders()
        )?;
        write!(f, "  main bet return rate: {:.4}", self.statistics.get_rate())?;
        match self.status {
            PlayerStatus::Active => Ok(()),
            PlayerStatus::Busted { round } => write!(f, "\n  busted in round {}", round),
            PlayerStatus::Retired { round } => write!(f, "\n  retired in round {}", round),
        }
    }
}
