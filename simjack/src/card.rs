use std::fmt;
use std::str::FromStr;

use strum_macros::EnumIter;

use crate::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }

    pub fn name(self) -> &'static str {
        match self {
            Suit::Hearts => "Hearts",
            Suit::Diamonds => "Diamonds",
            Suit::Clubs => "Clubs",
            Suit::Spades => "Spades",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Rank {
    Two = 2,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// Blackjack value before soft adjustment: an ace counts 11, faces 10.
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Jack | Rank::Queen | Rank::King => 10,
            _ => self as u8,
        }
    }

    /// Position in a poker straight with the ace low (A = 1, K = 13).
    pub fn ordinal(self) -> u8 {
        match self {
            Rank::Ace => 1,
            _ => self as u8,
        }
    }

    /// Hi-Lo tag of the rank.
    pub fn hi_lo(self) -> i32 {
        match self {
            Rank::Two | Rank::Three | Rank::Four | Rank::Five | Rank::Six => 1,
            Rank::Seven | Rank::Eight | Rank::Nine => 0,
            _ => -1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    /// Label of a dealer upcard in strategy keys. Face cards collapse to "10".
    pub fn upcard_label(self) -> &'static str {
        match self {
            Rank::Jack | Rank::Queen | Rank::King => "10",
            _ => self.symbol(),
        }
    }
}

impl FromStr for Rank {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rank = match s.trim().to_ascii_uppercase().as_str() {
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "T" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "A" => Rank::Ace,
            _ => return Err(SimError::InvalidCard(s.to_string())),
        };
        Ok(rank)
    }
}

/// Represents a card in the real world with a rank and a suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn is_ace(&self) -> bool {
        self.rank == Rank::Ace
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.rank.symbol(), self.suit.name())
    }
}

/// Parses the text form written by `Display`, e.g. `"A of Spades"`.
impl FromStr for Card {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SimError::InvalidCard(s.to_string());
        let (rank, suit) = s.trim().split_once(" of ").ok_or_else(invalid)?;
        let rank = rank.parse::<Rank>().map_err(|_| invalid())?;
        let suit = match suit.trim().to_ascii_lowercase().as_str() {
            "hearts" => Suit::Hearts,
            "diamonds" => Suit::Diamonds,
            "clubs" => Suit::Clubs,
            "spades" => Suit::Spades,
            _ => return Err(invalid()),
        };
        Ok(Card { rank, suit })
    }
}

/// Joins cards with `;`, the separator used for hands in the hand log.
pub fn join_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn values_before_soft_adjustment() {
        assert_eq!(Rank::Ace.value(), 11);
        assert_eq!(Rank::King.value(), 10);
        assert_eq!(Rank::Ten.value(), 10);
        assert_eq!(Rank::Seven.value(), 7);
        assert_eq!(Rank::Two.value(), 2);
    }

    #[test]
    fn hi_lo_tags_sum_to_zero_over_a_deck() {
        let sum: i32 = Rank::iter().map(|rank| rank.hi_lo() * 4).sum();
        assert_eq!(sum, 0);
        assert_eq!(Rank::Six.hi_lo(), 1);
        assert_eq!(Rank::Nine.hi_lo(), 0);
        assert_eq!(Rank::Queen.hi_lo(), -1);
    }

    #[test]
    fn text_form_round_trips() {
        let card = Card::new(Rank::Ten, Suit::Hearts);
        assert_eq!(card.to_string(), "10 of Hearts");
        assert_eq!("10 of Hearts".parse::<Card>().unwrap(), card);
        assert_eq!(
            "a of spades".parse::<Card>().unwrap(),
            Card::new(Rank::Ace, Suit::Spades)
        );
    }

    #[test]
    fn rejects_malformed_card_text() {
        assert!(matches!(
            "11 of Hearts".parse::<Card>(),
            Err(SimError::InvalidCard(_))
        ));
        assert!("K of Stars".parse::<Card>().is_err());
        assert!("KH".parse::<Card>().is_err());
    }

    #[test]
    fn faces_collapse_in_upcard_label() {
        assert_eq!(Rank::Queen.upcard_label(), "10");
        assert_eq!(Rank::Ace.upcard_label(), "A");
        assert_eq!(Rank::Queen.symbol(), "Q");
    }
}
