use serde::Serialize;
use serde_enum_str::Serialize_enum_str;

use crate::card::Card;
use crate::strategy::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum HandResult {
    Win,
    Lose,
    Push,
    Blackjack,
    Surrender,
}

impl HandResult {
    /// Amount returned to the player for a hand with the given stake,
    /// stake included.
    pub fn payout(self, bet: f64) -> f64 {
        match self {
            HandResult::Blackjack => bet * 2.5,
            HandResult::Win => bet * 2.0,
            HandResult::Push => bet,
            HandResult::Surrender => bet / 2.0,
            HandResult::Lose => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandResult::Win => "win",
            HandResult::Lose => "lose",
            HandResult::Push => "push",
            HandResult::Blackjack => "blackjack",
            HandResult::Surrender => "surrender",
        }
    }
}

/// One decision point of a hand: what the strategy offered and what the
/// engine could actually do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub key: String,
    pub actions: Vec<Action>,
    pub final_action: Action,
    pub is_deviation: bool,
    pub is_fallback: bool,
}

/// A player hand, or the dealer's hand when the bet is zero.
#[derive(Debug, Clone)]
pub struct Hand {
    id: String,
    cards: Vec<Card>,
    bet: f64,
    payout: f64,
    result: Option<HandResult>,
    is_split_child: bool,
    is_doubled: bool,
    trace: Vec<DecisionRecord>,
}

impl Hand {
    pub fn new(id: impl Into<String>, bet: f64) -> Hand {
        Hand {
            id: id.into(),
            cards: Vec::with_capacity(3),
            bet,
            payout: 0.0,
            result: None,
            is_split_child: false,
            is_doubled: false,
            trace: Vec::new(),
        }
    }

    /// Starts one half of a split. The child keeps the parent's stake and a
    /// copy of the decisions taken before the split.
    pub fn split_child(parent: &Hand, id: impl Into<String>, first: Card) -> Hand {
        let mut child = Hand::new(id, parent.bet);
        child.is_split_child = true;
        child.trace = parent.trace.clone();
        child.cards.push(first);
        child
    }

    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Best total: aces count 11 and drop to 1 one at a time while the hand
    /// would otherwise bust.
    pub fn value(&self) -> u32 {
        self.value_and_softness().0
    }

    /// Whether an ace is still counted as 11.
    pub fn is_soft(&self) -> bool {
        self.value_and_softness().1
    }

    fn value_and_softness(&self) -> (u32, bool) {
        let mut total: u32 = self.cards.iter().map(|card| card.value() as u32).sum();
        let mut aces = self.cards.iter().filter(|card| card.is_ace()).count();
        while total > 21 && aces > 0 {
            total -= 10;
            aces -= 1;
        }
        (total, aces > 0)
    }

    /// Two-card 21 that did not come from a split.
    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.value() == 21 && !self.is_split_child
    }

    pub fn is_bust(&self) -> bool {
        self.value() > 21
    }

    /// Two cards of the same rank. Ten-valued cards of different ranks do not
    /// form a pair.
    pub fn can_split(&self) -> bool {
        self.cards.len() == 2 && self.cards[0].rank == self.cards[1].rank
    }

    /// Split aces take exactly one card each and never act again.
    pub fn is_split_ace(&self) -> bool {
        self.is_split_child && self.cards.first().map_or(false, Card::is_ace)
    }

    pub fn double_down(&mut self) {
        self.is_doubled = true;
        self.bet *= 2.0;
    }

    pub fn record_decision(&mut self, record: DecisionRecord) {
        self.trace.push(record);
    }

    pub fn set_result(&mut self, result: HandResult) {
        self.result = Some(result);
    }

    /// Outcome of this hand against the dealer's final hand.
    pub fn compare_with(&self, dealer: &Hand) -> HandResult {
        if self.is_blackjack() && !dealer.is_blackjack() {
            HandResult::Blackjack
        } else if self.is_bust() {
            HandResult::Lose
        } else if dealer.is_bust() {
            HandResult::Win
        } else if self.value() > dealer.value() {
            HandResult::Win
        } else if self.value() < dealer.value() {
            HandResult::Lose
        } else {
            HandResult::Push
        }
    }

    /// Fixes the result and payout. A result decided earlier (surrender,
    /// dealer blackjack) is kept.
    pub fn settle(&mut self, dealer: &Hand) -> f64 {
        let result = match self.result {
            Some(result) => result,
            None => self.compare_with(dealer),
        };
        self.result = Some(result);
        self.payout = result.payout(self.bet);
        self.payout
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Cards drawn after the initial two.
    pub fn draws(&self) -> &[Card] {
        self.cards.get(2..).unwrap_or(&[])
    }

    pub fn upcard(&self) -> Option<Card> {
        self.cards.first().copied()
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn payout(&self) -> f64 {
        self.payout
    }

    pub fn result(&self) -> Option<HandResult> {
        self.result
    }

    pub fn is_split_child(&self) -> bool {
        self.is_split_child
    }

    pub fn is_doubled(&self) -> bool {
        self.is_doubled
    }

    pub fn trace(&self) -> &[DecisionRecord] {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_of(cards: &[&str]) -> Hand {
        let mut hand = Hand::new("B1-1", 10.0);
        for text in cards {
            hand.add_card(text.parse().unwrap());
        }
        hand
    }

    #[test]
    fn aces_drop_to_one_only_when_needed() {
        assert_eq!(hand_of(&["A of Spades", "A of Hearts", "9 of Clubs"]).value(), 21);
        assert_eq!(hand_of(&["A of Spades", "A of Hearts"]).value(), 12);
        assert_eq!(hand_of(&["A of Spades", "5 of Hearts", "K of Clubs"]).value(), 16);
        assert_eq!(hand_of(&["K of Spades", "Q of Hearts", "5 of Clubs"]).value(), 25);
        assert!(hand_of(&["A of Spades", "6 of Hearts"]).is_soft());
        assert!(!hand_of(&["A of Spades", "6 of Hearts", "10 of Clubs"]).is_soft());
    }

    #[test]
    fn blackjack_needs_two_cards_outside_a_split() {
        let natural = hand_of(&["A of Spades", "K of Hearts"]);
        assert!(natural.is_blackjack());
        assert!(!hand_of(&["7 of Spades", "7 of Hearts", "7 of Clubs"]).is_blackjack());

        let parent = hand_of(&["A of Spades", "A of Hearts"]);
        let mut child = Hand::split_child(&parent, "B1-2", "A of Spades".parse().unwrap());
        child.add_card("K of Clubs".parse().unwrap());
        assert_eq!(child.value(), 21);
        assert!(!child.is_blackjack());
        assert!(child.is_split_ace());
    }

    #[test]
    fn pairs_need_matching_rank() {
        assert!(hand_of(&["8 of Spades", "8 of Hearts"]).can_split());
        assert!(!hand_of(&["K of Spades", "Q of Hearts"]).can_split());
        assert!(!hand_of(&["8 of Spades", "8 of Hearts", "2 of Clubs"]).can_split());
    }

    #[test]
    fn split_child_copies_trace_prefix() {
        let mut parent = hand_of(&["8 of Spades", "8 of Hearts"]);
        parent.record_decision(DecisionRecord {
            key: "pair_8_vs_6".to_string(),
            actions: vec![Action::Split],
            final_action: Action::Split,
            is_deviation: false,
            is_fallback: false,
        });
        let mut child = Hand::split_child(&parent, "B1-2", "8 of Spades".parse().unwrap());
        child.record_decision(DecisionRecord {
            key: "hard_18_vs_6".to_string(),
            actions: vec![Action::Stand],
            final_action: Action::Stand,
            is_deviation: false,
            is_fallback: false,
        });
        assert_eq!(parent.trace().len(), 1);
        assert_eq!(child.trace().len(), 2);
        assert_eq!(child.trace()[0], parent.trace()[0]);
        assert_eq!(child.bet(), parent.bet());
    }

    #[test]
    fn settles_against_dealer() {
        let dealer = hand_of(&["10 of Spades", "7 of Hearts"]);
        let mut natural = hand_of(&["A of Spades", "K of Hearts"]);
        assert_eq!(natural.settle(&dealer), 25.0);
        assert_eq!(natural.result(), Some(HandResult::Blackjack));

        let mut twenty = hand_of(&["10 of Clubs", "K of Clubs"]);
        assert_eq!(twenty.settle(&dealer), 20.0);

        let mut seventeen = hand_of(&["10 of Clubs", "7 of Clubs"]);
        assert_eq!(seventeen.settle(&dealer), 10.0);
        assert_eq!(seventeen.result(), Some(HandResult::Push));

        let mut bust = hand_of(&["10 of Clubs", "6 of Clubs", "9 of Diamonds"]);
        let dealer_bust = hand_of(&["10 of Spades", "6 of Hearts", "8 of Hearts"]);
        assert_eq!(bust.settle(&dealer_bust), 0.0);
        assert_eq!(bust.result(), Some(HandResult::Lose));

        let dealer_natural = hand_of(&["K of Hearts", "A of Diamonds"]);
        let mut three_card_21 = hand_of(&["7 of Clubs", "7 of Hearts", "7 of Spades"]);
        assert_eq!(three_card_21.settle(&dealer_natural), 10.0);
        assert_eq!(three_card_21.result(), Some(HandResult::Push));
        assert_eq!(natural.compare_with(&dealer_natural), HandResult::Push);
    }

    #[test]
    fn settle_keeps_an_earlier_result() {
        let dealer = hand_of(&["10 of Spades", "7 of Hearts"]);
        let mut surrendered = hand_of(&["10 of Clubs", "6 of Clubs"]);
        surrendered.set_result(HandResult::Surrender);
        assert_eq!(surrendered.settle(&dealer), 5.0);
        assert_eq!(surrendered.result(), Some(HandResult::Surrender));
    }

    #[test]
    fn doubling_doubles_the_stake() {
        let mut hand = hand_of(&["5 of Clubs", "6 of Clubs"]);
        hand.double_down();
        assert!(hand.is_doubled());
        assert_eq!(hand.bet(), 20.0);
    }
}
