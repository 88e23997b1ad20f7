use std::io;

use crate::bet_box::InsuranceOutcome;
use crate::card::Card;
use crate::hand::{DecisionRecord, HandResult};

/// Stakes and returns of a whole box for one round. Only the last hand of a
/// box carries them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxTotals {
    pub invested: f64,
    pub earned: f64,
}

/// Everything known about one settled hand once its round is over.
#[derive(Debug, Clone, PartialEq)]
pub struct HandRecord {
    pub round: u32,
    pub shoe: u32,
    pub running_count: i32,
    pub true_count: i32,
    pub real_count_till_cut_card: i32,

    pub box_id: String,
    pub player_id: u32,
    pub hand_id: String,
    pub owner: String,
    pub strategy: String,

    pub configured_bet: f64,
    pub recommended_bet: f64,
    pub hand_bet: f64,
    pub hand_payout: f64,
    pub box_payout: f64,
    pub perfect_pairs_bet: f64,
    pub perfect_pairs_win: f64,
    pub perfect_pairs_label: &'static str,
    pub twenty_one_plus_three_bet: f64,
    pub twenty_one_plus_three_win: f64,
    pub twenty_one_plus_three_label: &'static str,
    pub insurance_taken: bool,
    pub insurance_bet: f64,
    pub insurance_payout: f64,
    pub insurance_outcome: Option<InsuranceOutcome>,

    pub initial_balance: f64,
    pub round_start_balance: f64,
    pub balance: f64,

    pub cards: Vec<Card>,
    pub result: Option<HandResult>,
    pub is_blackjack: bool,
    pub is_doubled: bool,
    pub is_split_child: bool,
    pub split_count: u32,
    pub player_bust: bool,
    pub draws: Vec<Card>,

    pub dealer_upcard: Option<Card>,
    pub dealer_cards: Vec<Card>,
    pub dealer_blackjack: bool,
    pub dealer_bust: bool,

    pub player_busted: bool,
    pub player_retired: bool,

    pub number_of_decks: u8,
    pub cut_card_position: usize,
    pub cards_drawn_total: usize,
    pub cards_drawn_round: usize,
    pub cards_left: usize,

    pub decision_trace: Vec<DecisionRecord>,
    pub box_totals: Option<BoxTotals>,
}

/// Receives settled hands from the table. Implemented by log writers and
/// collectors outside the engine.
pub trait HandSink {
    fn on_hand_settled(&mut self, record: &HandRecord) -> io::Result<()>;

    /// Called once every box of the round has been reported.
    fn on_round_complete(&mut self, _round: u32) -> io::Result<()> {
        Ok(())
    }
}

impl HandSink for Vec<HandRecord> {
    fn on_hand_settled(&mut self, record: &HandRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<T: HandSink + ?Sized> HandSink for &mut T {
    fn on_hand_settled(&mut self, record: &HandRecord) -> io::Result<()> {
        (**self).on_hand_settled(record)
    }

    fn on_round_complete(&mut self, round: u32) -> io::Result<()> {
        (**self).on_round_complete(round)
    }
}
