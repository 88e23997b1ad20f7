pub mod bet_box;
pub mod card;
pub mod hand;
pub mod player;
pub mod record;
pub mod shoe;
pub mod sidebet;
pub mod strategy;
pub mod table;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use thiserror::Error;

pub use bet_box::{BetBox, BoxBets, InsuranceOutcome};
pub use card::{Card, Rank, Suit};
pub use hand::{DecisionRecord, Hand, HandResult};
pub use player::{Player, PlayerStatus};
pub use record::{BoxTotals, HandRecord, HandSink};
pub use shoe::Shoe;
pub use sidebet::{PerfectPairsHand, SideBetOutcome, TwentyOnePlusThreeHand};
pub use strategy::{
    Action, Advice, BetTier, CountingStrategy, Deviation, Strategy, StrategyError, TableStrategy,
};
pub use table::{BoxSetup, PlayerSetup, RoundPhase, RunReport, Table};

/// Seats are numbered 1 to `MAX_SEATS` from the dealer's left.
pub const MAX_SEATS: u8 = 7;

/// Table rules shared by every round of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_surrender: bool,
    pub allow_surrender_against_ace: bool,
    pub dealer_takes_hole_card: bool,
    pub peek_policy: PeekPolicy,
    pub max_splits: u8,
    pub min_bet: f64,
    pub max_bet: f64,
}

impl Rule {
    /// Side bets are limited to a fifth of the main-bet range.
    pub fn min_side_bet(&self) -> f64 {
        self.min_bet / 5.0
    }

    pub fn max_side_bet(&self) -> f64 {
        self.max_bet / 5.0
    }
}

/// When a dealer holding a hole card checks it for blackjack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum PeekPolicy {
    UpAceOrTen,
    UpAce,
    NoPeek,
}

impl PeekPolicy {
    pub fn peeks_on(self, upcard: Card) -> bool {
        match self {
            PeekPolicy::UpAceOrTen => upcard.rank == Rank::Ace || upcard.value() == 10,
            PeekPolicy::UpAce => upcard.rank == Rank::Ace,
            PeekPolicy::NoPeek => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("forced card '{card}' exceeds available copies in shoe ({requested} > {available})")]
    ForcedCardOverflow {
        card: Card,
        requested: usize,
        available: usize,
    },
    #[error("cannot parse card '{0}', expected e.g. \"10 of Hearts\"")]
    InvalidCard(String),
    #[error("no cards left in shoe")]
    EmptyShoe,
    #[error("{operation} is only allowed in {expected:?} phase, current phase is {actual:?}")]
    WrongPhase {
        operation: &'static str,
        expected: RoundPhase,
        actual: RoundPhase,
    },
    #[error("box index {0} is outside 1..=7")]
    InvalidSeat(u8),
    #[error("box {0} is claimed by more than one player")]
    SeatTaken(u8),
    #[error("failed to record settled hand: {0}")]
    Sink(#[from] std::io::Error),
}
