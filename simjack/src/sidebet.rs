use crate::card::Card;

/// A winning side-bet classification.
pub trait SideBetOutcome {
    /// Paid "for 1", stake not included.
    fn odds(&self) -> f64;

    fn label(&self) -> &'static str;

    /// Amount returned for a winning stake, stake included.
    fn payout(&self, bet: f64) -> f64 {
        (self.odds() + 1.0) * bet
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfectPairsHand {
    Perfect,
    Colored,
    Mixed,
}

impl SideBetOutcome for PerfectPairsHand {
    fn odds(&self) -> f64 {
        match self {
            PerfectPairsHand::Perfect => 25.0,
            PerfectPairsHand::Colored => 12.0,
            PerfectPairsHand::Mixed => 6.0,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PerfectPairsHand::Perfect => "Perfect Pair",
            PerfectPairsHand::Colored => "Colored Pair",
            PerfectPairsHand::Mixed => "Mixed Pair",
        }
    }
}

/// Classifies a box's first two cards. `None` when they are not a pair.
pub fn perfect_pairs(first: Card, second: Card) -> Option<PerfectPairsHand> {
    if first.rank != second.rank {
        None
    } else if first.suit == second.suit {
        Some(PerfectPairsHand::Perfect)
    } else if first.suit.is_red() == second.suit.is_red() {
        Some(PerfectPairsHand::Colored)
    } else {
        Some(PerfectPairsHand::Mixed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwentyOnePlusThreeHand {
    SuitedTrips,
    StraightFlush,
    ThreeOfAKind,
    Straight,
    Flush,
}

impl SideBetOutcome for TwentyOnePlusThreeHand {
    fn odds(&self) -> f64 {
        match self {
            TwentyOnePlusThreeHand::SuitedTrips => 100.0,
            TwentyOnePlusThreeHand::StraightFlush => 40.0,
            TwentyOnePlusThreeHand::ThreeOfAKind => 30.0,
            TwentyOnePlusThreeHand::Straight => 10.0,
            TwentyOnePlusThreeHand::Flush => 5.0,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TwentyOnePlusThreeHand::SuitedTrips => "Suited Trips",
            TwentyOnePlusThreeHand::StraightFlush => "Straight Flush",
            TwentyOnePlusThreeHand::ThreeOfAKind => "Three of a Kind",
            TwentyOnePlusThreeHand::Straight => "Straight",
            TwentyOnePlusThreeHand::Flush => "Flush",
        }
    }
}

/// Classifies the box's two cards plus the dealer's upcard as a three-card
/// poker hand, most specific classification first.
pub fn twenty_one_plus_three(cards: [Card; 3]) -> Option<TwentyOnePlusThreeHand> {
    let same_suit = cards.iter().all(|card| card.suit == cards[0].suit);
    let same_rank = cards.iter().all(|card| card.rank == cards[0].rank);
    let straight = is_straight(&cards);

    if same_suit && same_rank {
        Some(TwentyOnePlusThreeHand::SuitedTrips)
    } else if same_suit && straight {
        Some(TwentyOnePlusThreeHand::StraightFlush)
    } else if same_rank {
        Some(TwentyOnePlusThreeHand::ThreeOfAKind)
    } else if straight {
        Some(TwentyOnePlusThreeHand::Straight)
    } else if same_suit {
        Some(TwentyOnePlusThreeHand::Flush)
    } else {
        None
    }
}

/// Three consecutive ranks, with the ace either below the two or above the
/// king.
fn is_straight(cards: &[Card; 3]) -> bool {
    let mut ordinals = cards.map(|card| card.rank.ordinal());
    ordinals.sort_unstable();
    if ordinals == [1, 12, 13] {
        return true;
    }
    ordinals[1] == ordinals[0] + 1 && ordinals[2] == ordinals[1] + 1
}
