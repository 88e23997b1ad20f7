use crate::card::Card;
use crate::hand::Hand;
use crate::sidebet::{
    perfect_pairs, twenty_one_plus_three, PerfectPairsHand, SideBetOutcome, TwentyOnePlusThreeHand,
};

/// Stakes of one box: the main bet and its two side bets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxBets {
    pub main: f64,
    pub perfect_pairs: f64,
    pub twenty_one_plus_three: f64,
}

impl BoxBets {
    pub fn total(&self) -> f64 {
        self.main + self.perfect_pairs + self.twenty_one_plus_three
    }
}

/// One side bet of one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideBet<T> {
    pub bet: f64,
    pub win: f64,
    pub outcome: Option<T>,
}

impl<T> Default for SideBet<T> {
    fn default() -> Self {
        SideBet {
            bet: 0.0,
            win: 0.0,
            outcome: None,
        }
    }
}

impl<T: SideBetOutcome + Copy> SideBet<T> {
    fn resolve(&mut self, outcome: Option<T>) {
        self.outcome = outcome;
        self.win = outcome.map_or(0.0, |outcome| outcome.payout(self.bet));
    }

    pub fn label(&self) -> &'static str {
        self.outcome.as_ref().map_or("none", |outcome| outcome.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsuranceOutcome {
    Win,
    Lose,
}

impl InsuranceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            InsuranceOutcome::Win => "win",
            InsuranceOutcome::Lose => "lose",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Insurance {
    pub taken: bool,
    pub bet: f64,
    pub outcome: Option<InsuranceOutcome>,
    pub payout: f64,
}

impl Insurance {
    /// Settles an open insurance bet. A win returns double the stake.
    pub(crate) fn resolve(&mut self, dealer_blackjack: bool) {
        if !self.taken || self.outcome.is_some() {
            return;
        }
        if dealer_blackjack {
            self.outcome = Some(InsuranceOutcome::Win);
            self.payout = self.bet * 2.0;
        } else {
            self.outcome = Some(InsuranceOutcome::Lose);
            self.payout = 0.0;
        }
    }
}

/// A seat at the table. `owner` indexes the table's players; a box whose
/// owner has busted is vacated and stays empty for the rest of the run.
#[derive(Debug, Clone)]
pub struct BetBox {
    seat: u8,
    id: String,
    pub(crate) owner: Option<usize>,
    configured: BoxBets,
    pub(crate) recommended_main_bet: f64,
    pub(crate) bets: BoxBets,
    pub(crate) perfect_pairs: SideBet<PerfectPairsHand>,
    pub(crate) twenty_one_plus_three: SideBet<TwentyOnePlusThreeHand>,
    pub(crate) insurance: Insurance,
    pub(crate) hands: Vec<Hand>,
    pub(crate) total_payout: f64,
    pub(crate) split_count: u32,
    next_hand_number: u32,
}

impl BetBox {
    pub fn new(seat: u8, owner: Option<usize>, configured: BoxBets) -> BetBox {
        let mut bet_box = BetBox {
            seat,
            id: format!("B{}", seat),
            owner,
            configured,
            recommended_main_bet: configured.main,
            bets: configured,
            perfect_pairs: SideBet::default(),
            twenty_one_plus_three: SideBet::default(),
            insurance: Insurance::default(),
            hands: Vec::new(),
            total_payout: 0.0,
            split_count: 0,
            next_hand_number: 1,
        };
        bet_box.reset();
        bet_box
    }

    /// Clears the round state and restores the configured bets.
    pub fn reset(&mut self) {
        self.hands.clear();
        self.recommended_main_bet = self.configured.main;
        self.bets = self.configured;
        self.perfect_pairs = SideBet::default();
        self.twenty_one_plus_three = SideBet::default();
        self.insurance = Insurance::default();
        self.total_payout = 0.0;
        self.split_count = 0;
        self.next_hand_number = 1;
    }

    /// Drops the owner for good.
    pub fn vacate(&mut self) {
        self.owner = None;
        self.reset();
    }

    /// Fixes the stakes debited for this round and opens the first hand.
    pub(crate) fn commit(&mut self, bets: BoxBets) {
        self.bets = bets;
        self.perfect_pairs.bet = bets.perfect_pairs;
        self.twenty_one_plus_three.bet = bets.twenty_one_plus_three;
        let id = self.next_hand_id();
        self.hands.push(Hand::new(id, bets.main));
    }

    /// Sits the box out: no stakes, no hand.
    pub(crate) fn sit_out(&mut self) {
        self.bets = BoxBets::default();
    }

    pub(crate) fn next_hand_id(&mut self) -> String {
        let id = format!("{}-{}", self.id, self.next_hand_number);
        self.next_hand_number += 1;
        id
    }

    /// Perfect Pairs on the first two cards, 21+3 on those plus the dealer's
    /// upcard. Wins are recorded whatever the main hand later does.
    pub(crate) fn evaluate_side_bets(&mut self, dealer_upcard: Card) {
        let (first, second) = match self.hands.first().map(Hand::cards) {
            Some([first, second, ..]) => (*first, *second),
            _ => return,
        };
        if self.perfect_pairs.bet > 0.0 {
            self.perfect_pairs.resolve(perfect_pairs(first, second));
        }
        if self.twenty_one_plus_three.bet > 0.0 {
            self.twenty_one_plus_three
                .resolve(twenty_one_plus_three([first, second, dealer_upcard]));
        }
    }

    pub fn side_bet_winnings(&self) -> f64 {
        self.perfect_pairs.win + self.twenty_one_plus_three.win
    }

    /// Everything staked on the box this round.
    pub fn invested(&self) -> f64 {
        self.hands.iter().map(Hand::bet).sum::<f64>()
            + self.perfect_pairs.bet
            + self.twenty_one_plus_three.bet
            + self.insurance.bet
    }

    pub fn seat(&self) -> u8 {
        self.seat
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Option<usize> {
        self.owner
    }

    pub fn is_vacant(&self) -> bool {
        self.owner.is_none()
    }

    /// Whether the box has a hand in the current round.
    pub fn is_playing(&self) -> bool {
        !self.hands.is_empty()
    }

    pub fn configured(&self) -> BoxBets {
        self.configured
    }

    pub fn recommended_main_bet(&self) -> f64 {
        self.recommended_main_bet
    }

    pub fn bets(&self) -> BoxBets {
        self.bets
    }

    pub fn perfect_pairs(&self) -> &SideBet<PerfectPairsHand> {
        &self.perfect_pairs
    }

    pub fn twenty_one_plus_three(&self) -> &SideBet<TwentyOnePlusThreeHand> {
        &self.twenty_one_plus_three
    }

    pub fn insurance(&self) -> &Insurance {
        &self.insurance
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn total_payout(&self) -> f64 {
        self.total_payout
    }

    pub fn split_count(&self) -> u32 {
        self.split_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    fn configured() -> BoxBets {
        BoxBets {
            main: 10.0,
            perfect_pairs: 2.0,
            twenty_one_plus_three: 2.0,
        }
    }

    #[test]
    fn hand_ids_count_up_per_box() {
        let mut bet_box = BetBox::new(3, Some(0), configured());
        assert_eq!(bet_box.id(), "B3");
        bet_box.commit(configured());
        assert_eq!(bet_box.hands()[0].id(), "B3-1");
        assert_eq!(bet_box.next_hand_id(), "B3-2");
        bet_box.reset();
        assert_eq!(bet_box.next_hand_id(), "B3-1");
    }

    #[test]
    fn side_bets_are_evaluated_on_first_two_cards() {
        let mut bet_box = BetBox::new(1, Some(0), configured());
        bet_box.commit(configured());
        bet_box.hands[0].add_card(card("9 of Hearts"));
        bet_box.hands[0].add_card(card("9 of Diamonds"));
        bet_box.evaluate_side_bets(card("9 of Clubs"));

        assert_eq!(bet_box.perfect_pairs().outcome, Some(PerfectPairsHand::Colored));
        assert_eq!(bet_box.perfect_pairs().win, 26.0);
        assert_eq!(bet_box.twenty_one_plus_three().label(), "Three of a Kind");
        assert_eq!(bet_box.twenty_one_plus_three().win, 62.0);
        assert_eq!(bet_box.side_bet_winnings(), 88.0);
    }

    #[test]
    fn unstaked_side_bets_stay_unresolved() {
        let mut bets = configured();
        bets.perfect_pairs = 0.0;
        let mut bet_box = BetBox::new(1, Some(0), bets);
        bet_box.commit(bets);
        bet_box.hands[0].add_card(card("9 of Hearts"));
        bet_box.hands[0].add_card(card("9 of Hearts"));
        bet_box.evaluate_side_bets(card("2 of Clubs"));
        assert_eq!(bet_box.perfect_pairs().label(), "none");
        assert_eq!(bet_box.perfect_pairs().win, 0.0);
    }

    #[test]
    fn insurance_resolves_once() {
        let mut insurance = Insurance {
            taken: true,
            bet: 5.0,
            ..Insurance::default()
        };
        insurance.resolve(true);
        assert_eq!(insurance.outcome, Some(InsuranceOutcome::Win));
        assert_eq!(insurance.payout, 10.0);
        insurance.resolve(false);
        assert_eq!(insurance.outcome, Some(InsuranceOutcome::Win));

        let mut declined = Insurance::default();
        declined.resolve(true);
        assert_eq!(declined.outcome, None);
    }

    #[test]
    fn vacating_drops_owner_and_hands() {
        let mut bet_box = BetBox::new(2, Some(1), configured());
        bet_box.commit(configured());
        bet_box.vacate();
        assert!(bet_box.is_vacant());
        assert!(!bet_box.is_playing());
        assert_eq!(bet_box.bets(), configured());
    }

    #[test]
    fn invested_counts_every_stake() {
        let mut bet_box = BetBox::new(1, Some(0), configured());
        bet_box.commit(configured());
        bet_box.insurance.taken = true;
        bet_box.insurance.bet = 5.0;
        assert_eq!(bet_box.invested(), 19.0);
    }
}
