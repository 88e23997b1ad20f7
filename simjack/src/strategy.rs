use std::collections::HashMap;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use thiserror::Error;

use crate::card::Card;
use crate::hand::Hand;
use crate::shoe::Shoe;

/// True count at or above which a counting strategy always insures.
const INSURANCE_TRUE_COUNT: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
    Surrender,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Hit => "hit",
            Action::Stand => "stand",
            Action::Double => "double",
            Action::Split => "split",
            Action::Surrender => "surrender",
        }
    }
}

/// What a strategy recommends at one decision point: candidate actions in
/// order of preference and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub actions: Vec<Action>,
    pub is_fallback: bool,
    pub is_deviation: bool,
    pub key: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("strategy '{0}' has no fallback action")]
    MissingFallback(String),
    #[error("unknown action '{action}' for '{key}'")]
    UnknownAction { key: String, action: String },
    #[error("no actions listed for '{0}'")]
    EmptyActions(String),
    #[error("bet ramp multiplier must be positive, got {0}")]
    InvalidMultiplier(f64),
}

/// A player's decision policy. The shoe is passed in read-only so that a
/// counting strategy sees the live count of the shoe the table is dealing
/// from.
pub trait Strategy {
    fn name(&self) -> &str;

    fn advise(&self, hand: &Hand, dealer_upcard: Card, shoe: &Shoe) -> Advice;

    fn should_take_insurance(&self, shoe: &Shoe) -> bool;

    /// Main bet for the next round given the configured base bet.
    fn bet_size(&self, base_bet: f64, _shoe: &Shoe) -> f64 {
        base_bet
    }

    fn is_counting(&self) -> bool {
        false
    }
}

/// Key of a decision point: `pair_8_vs_10`, `soft_17_vs_6` or `hard_12_vs_A`.
pub fn lookup_key(hand: &Hand, dealer_upcard: Card) -> String {
    let dealer = dealer_upcard.rank.upcard_label();
    let cards = hand.cards();
    if hand.can_split() {
        format!("pair_{}_vs_{}", cards[0].rank.symbol(), dealer)
    } else if cards.len() == 2 && cards.iter().filter(|card| card.is_ace()).count() == 1 {
        format!("soft_{}_vs_{}", hand.value(), dealer)
    } else {
        format!("hard_{}_vs_{}", hand.value(), dealer)
    }
}

/// Static decision table.
#[derive(Debug, Clone)]
pub struct TableStrategy {
    name: String,
    actions: HashMap<String, Vec<Action>>,
    fallback: Action,
    accept_insurance: bool,
}

impl TableStrategy {
    pub fn new(
        name: impl Into<String>,
        actions: HashMap<String, Vec<Action>>,
        fallback: Action,
        accept_insurance: bool,
    ) -> Result<TableStrategy, StrategyError> {
        if let Some(key) = actions.iter().find_map(|(key, list)| list.is_empty().then_some(key)) {
            return Err(StrategyError::EmptyActions(key.clone()));
        }
        Ok(TableStrategy {
            name: name.into(),
            actions,
            fallback,
            accept_insurance,
        })
    }
}

impl Strategy for TableStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn advise(&self, hand: &Hand, dealer_upcard: Card, _shoe: &Shoe) -> Advice {
        let key = lookup_key(hand, dealer_upcard);
        match self.actions.get(&key) {
            Some(actions) => Advice {
                actions: actions.clone(),
                is_fallback: false,
                is_deviation: false,
                key,
            },
            None => Advice {
                actions: vec![self.fallback],
                is_fallback: true,
                is_deviation: false,
                key,
            },
        }
    }

    fn should_take_insurance(&self, _shoe: &Shoe) -> bool {
        self.accept_insurance
    }
}

/// Count-gated override of the table's action for one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub threshold: i32,
    pub action: Action,
}

/// One step of a bet ramp: from `min_true_count` up, bet `multiplier` times
/// the base bet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetTier {
    pub min_true_count: i32,
    pub multiplier: f64,
}

/// Hi-Lo counting player: deviations and a bet ramp on top of a table.
#[derive(Debug, Clone)]
pub struct CountingStrategy {
    base: TableStrategy,
    deviations: HashMap<String, Deviation>,
    bet_ramp: Vec<BetTier>,
}

impl CountingStrategy {
    pub fn new(
        base: TableStrategy,
        deviations: HashMap<String, Deviation>,
        mut bet_ramp: Vec<BetTier>,
    ) -> Result<CountingStrategy, StrategyError> {
        if let Some(tier) = bet_ramp.iter().find(|tier| !(tier.multiplier > 0.0)) {
            return Err(StrategyError::InvalidMultiplier(tier.multiplier));
        }
        // Highest threshold first.
        bet_ramp.sort_by(|a, b| b.min_true_count.cmp(&a.min_true_count));
        Ok(CountingStrategy {
            base,
            deviations,
            bet_ramp,
        })
    }
}

impl Strategy for CountingStrategy {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn advise(&self, hand: &Hand, dealer_upcard: Card, shoe: &Shoe) -> Advice {
        let key = lookup_key(hand, dealer_upcard);
        match self.deviations.get(&key) {
            Some(deviation) if shoe.true_count_truncated() >= deviation.threshold => Advice {
                actions: vec![deviation.action],
                is_fallback: false,
                is_deviation: true,
                key,
            },
            _ => self.base.advise(hand, dealer_upcard, shoe),
        }
    }

    fn should_take_insurance(&self, shoe: &Shoe) -> bool {
        shoe.true_count_truncated() >= INSURANCE_TRUE_COUNT || self.base.should_take_insurance(shoe)
    }

    fn bet_size(&self, base_bet: f64, shoe: &Shoe) -> f64 {
        let true_count = shoe.true_count_truncated();
        self.bet_ramp
            .iter()
            .find(|tier| true_count >= tier.min_true_count)
            .map_or(base_bet, |tier| base_bet * tier.multiplier)
    }

    fn is_counting(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    fn hand_of(cards: &[&str]) -> Hand {
        let mut hand = Hand::new("B1-1", 10.0);
        for text in cards {
            hand.add_card(card(text));
        }
        hand
    }

    /// A one-deck shoe whose first `low_cards` cards are all +1 in Hi-Lo,
    /// already dealt.
    fn shoe_with_count(low_cards: usize) -> Shoe {
        let forced = ["2", "3", "4", "5", "6"]
            .iter()
            .flat_map(|rank| {
                ["Hearts", "Spades"]
                    .iter()
                    .map(move |suit| card(&format!("{} of {}", rank, suit)))
            })
            .take(low_cards)
            .collect();
        let mut shoe = Shoe::with_seed(1, forced, Some(3)).unwrap();
        for _ in 0..low_cards {
            shoe.deal().unwrap();
        }
        shoe
    }

    fn basic_table() -> TableStrategy {
        let mut actions = HashMap::new();
        actions.insert("hard_16_vs_10".to_string(), vec![Action::Surrender, Action::Hit]);
        actions.insert("pair_8_vs_10".to_string(), vec![Action::Split, Action::Hit]);
        actions.insert("soft_17_vs_6".to_string(), vec![Action::Double, Action::Hit]);
        TableStrategy::new("basic", actions, Action::Stand, false).unwrap()
    }

    #[test]
    fn keys_follow_hand_shape() {
        let king = card("K of Clubs");
        assert_eq!(lookup_key(&hand_of(&["8 of Spades", "8 of Hearts"]), king), "pair_8_vs_10");
        assert_eq!(lookup_key(&hand_of(&["A of Spades", "A of Hearts"]), king), "pair_A_vs_10");
        assert_eq!(lookup_key(&hand_of(&["A of Spades", "6 of Hearts"]), card("6 of Clubs")), "soft_17_vs_6");
        assert_eq!(lookup_key(&hand_of(&["10 of Spades", "6 of Hearts"]), card("A of Clubs")), "hard_16_vs_A");
        assert_eq!(
            lookup_key(&hand_of(&["A of Spades", "2 of Hearts", "3 of Clubs"]), card("9 of Clubs")),
            "hard_16_vs_9"
        );
        assert_eq!(lookup_key(&hand_of(&["J of Spades", "Q of Hearts"]), card("J of Clubs")), "hard_20_vs_10");
    }

    #[test]
    fn table_lookup_and_fallback() {
        let strategy = basic_table();
        let shoe = shoe_with_count(0);
        let advice = strategy.advise(&hand_of(&["10 of Spades", "6 of Hearts"]), card("Q of Clubs"), &shoe);
        assert_eq!(advice.actions, vec![Action::Surrender, Action::Hit]);
        assert!(!advice.is_fallback);
        assert_eq!(advice.key, "hard_16_vs_10");

        let advice = strategy.advise(&hand_of(&["10 of Spades", "9 of Hearts"]), card("Q of Clubs"), &shoe);
        assert_eq!(advice.actions, vec![Action::Stand]);
        assert!(advice.is_fallback);
        assert!(!advice.is_deviation);
    }

    #[test]
    fn empty_action_list_is_rejected() {
        let mut actions = HashMap::new();
        actions.insert("hard_12_vs_2".to_string(), Vec::new());
        let result = TableStrategy::new("broken", actions, Action::Stand, false);
        assert_eq!(result.unwrap_err(), StrategyError::EmptyActions("hard_12_vs_2".to_string()));
    }

    #[test]
    fn deviation_applies_only_at_threshold() {
        let mut deviations = HashMap::new();
        deviations.insert(
            "hard_16_vs_10".to_string(),
            Deviation {
                threshold: 2,
                action: Action::Stand,
            },
        );
        let strategy = CountingStrategy::new(basic_table(), deviations, Vec::new()).unwrap();
        let hand = hand_of(&["10 of Spades", "6 of Hearts"]);

        let cold = shoe_with_count(1);
        let advice = strategy.advise(&hand, card("K of Clubs"), &cold);
        assert_eq!(advice.actions, vec![Action::Surrender, Action::Hit]);
        assert!(!advice.is_deviation);

        let hot = shoe_with_count(3);
        let advice = strategy.advise(&hand, card("K of Clubs"), &hot);
        assert_eq!(advice.actions, vec![Action::Stand]);
        assert!(advice.is_deviation);
        assert!(!advice.is_fallback);
    }

    #[test]
    fn bet_ramp_uses_highest_met_tier() {
        let ramp = vec![
            BetTier {
                min_true_count: 2,
                multiplier: 2.0,
            },
            BetTier {
                min_true_count: 4,
                multiplier: 4.0,
            },
        ];
        let strategy = CountingStrategy::new(basic_table(), HashMap::new(), ramp).unwrap();
        assert_eq!(strategy.bet_size(10.0, &shoe_with_count(0)), 10.0);
        assert_eq!(strategy.bet_size(10.0, &shoe_with_count(2)), 20.0);
        assert_eq!(strategy.bet_size(10.0, &shoe_with_count(5)), 40.0);
        assert_eq!(basic_table().bet_size(10.0, &shoe_with_count(5)), 10.0);
    }

    #[test]
    fn non_positive_multiplier_is_rejected() {
        let ramp = vec![BetTier {
            min_true_count: 1,
            multiplier: 0.0,
        }];
        let result = CountingStrategy::new(basic_table(), HashMap::new(), ramp);
        assert_eq!(result.unwrap_err(), StrategyError::InvalidMultiplier(0.0));
    }

    #[test]
    fn counting_strategy_insures_on_high_count() {
        let strategy = CountingStrategy::new(basic_table(), HashMap::new(), Vec::new()).unwrap();
        assert!(!strategy.should_take_insurance(&shoe_with_count(2)));
        assert!(strategy.should_take_insurance(&shoe_with_count(3)));
        assert!(!basic_table().should_take_insurance(&shoe_with_count(3)));
        assert!(strategy.is_counting());
    }

    #[test]
    fn actions_parse_from_strategy_text() {
        assert_eq!("surrender".parse::<Action>().unwrap(), Action::Surrender);
        assert!("fold".parse::<Action>().is_err());
    }
}
