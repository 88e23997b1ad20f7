use simjack_macros::allowed_phase;
use tracing::{info, trace};

use crate::bet_box::{BetBox, BoxBets};
use crate::card::Card;
use crate::hand::{DecisionRecord, Hand, HandResult};
use crate::player::{Player, PlayerStatus};
use crate::record::{BoxTotals, HandRecord, HandSink};
use crate::shoe::Shoe;
use crate::strategy::{Action, Strategy};
use crate::{Rule, SimError, MAX_SEATS};

/// Steps of one round, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    ResetRound,
    Bet,
    DealInitial,
    SideBetEval,
    InsuranceOffer,
    DealerPeek,
    PlayerActions,
    DealerPlay,
    Settlement,
    Cleanup,
}

/// A seat claimed by a player together with its configured bets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSetup {
    pub seat: u8,
    pub bets: BoxBets,
}

pub struct PlayerSetup {
    pub id: u32,
    pub owner: String,
    pub initial_balance: f64,
    pub target_balance: Option<f64>,
    pub strategy: Box<dyn Strategy>,
    pub boxes: Vec<BoxSetup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub rounds_played: u32,
    pub shoes_used: u32,
    /// Whether the run ended before the requested rounds because no player
    /// was left active.
    pub stopped_early: bool,
}

/// Simulates a blackjack table: one shoe, one dealer, and the boxes of every
/// player, played round after round.
pub struct Table {
    rule: Rule,
    phase: RoundPhase,
    shoe: Shoe,
    dealer: Hand,
    boxes: Vec<BetBox>,
    players: Vec<Player>,
    round: u32,
    shoe_number: u32,
}

impl Table {
    /// Seats every player. Boxes are played in seat order.
    pub fn new(rule: Rule, setups: Vec<PlayerSetup>, shoe: Shoe) -> Result<Table, SimError> {
        let mut players = Vec::with_capacity(setups.len());
        let mut boxes: Vec<BetBox> = Vec::new();
        for (owner, setup) in setups.into_iter().enumerate() {
            for box_setup in &setup.boxes {
                if !(1..=MAX_SEATS).contains(&box_setup.seat) {
                    return Err(SimError::InvalidSeat(box_setup.seat));
                }
                if boxes.iter().any(|bet_box| bet_box.seat() == box_setup.seat) {
                    return Err(SimError::SeatTaken(box_setup.seat));
                }
                boxes.push(BetBox::new(box_setup.seat, Some(owner), box_setup.bets));
            }
            players.push(Player::new(
                setup.id,
                setup.owner,
                setup.initial_balance,
                setup.target_balance,
                setup.strategy,
            ));
        }
        boxes.sort_by_key(BetBox::seat);

        Ok(Table {
            rule,
            phase: RoundPhase::ResetRound,
            shoe,
            dealer: Hand::new("dealer", 0.0),
            boxes,
            players,
            round: 0,
            shoe_number: 1,
        })
    }

    /// Plays rounds until `round_count` have been played or no player is
    /// active any more.
    pub fn run<S: HandSink + ?Sized>(
        &mut self,
        round_count: u32,
        sink: &mut S,
    ) -> Result<RunReport, SimError> {
        let mut report = RunReport {
            rounds_played: 0,
            shoes_used: self.shoe_number,
            stopped_early: false,
        };
        for _ in 0..round_count {
            if !self.players.iter().any(Player::is_active) {
                report.stopped_early = true;
                break;
            }
            self.play_round(sink)?;
            report.rounds_played += 1;
        }
        report.shoes_used = self.shoe_number;
        Ok(report)
    }

    /// Runs every step of one round.
    pub fn play_round<S: HandSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SimError> {
        self.reset_round()?;
        self.take_bets()?;
        self.deal_initial_cards()?;
        self.evaluate_side_bets()?;
        self.offer_insurance()?;
        if !self.dealer_peeks_if_necessary()? {
            self.play_boxes()?;
            self.dealer_plays()?;
        }
        self.settle()?;
        self.clean_up(sink)
    }

    /// Can be called at ResetRound phase.
    /// Takes the round-start balance of every active player once, before any
    /// box is touched.
    #[allowed_phase(ResetRound)]
    pub fn reset_round(&mut self) -> Result<(), SimError> {
        self.round += 1;
        self.shoe.reset_round_counter();
        self.dealer = Hand::new("dealer", 0.0);
        for player in self.players.iter_mut().filter(|player| player.is_active()) {
            player.begin_round();
        }
        self.phase = RoundPhase::Bet;
        Ok(())
    }

    /// Can be called at Bet phase.
    /// Sizes, clamps and debits the bets of every box whose owner is active.
    /// A box whose owner cannot cover even the table minimum sits out.
    #[allowed_phase(Bet)]
    pub fn take_bets(&mut self) -> Result<(), SimError> {
        let rule = self.rule;
        for bet_box in &mut self.boxes {
            bet_box.reset();
            let Some(owner) = bet_box.owner else {
                continue;
            };
            let player = &mut self.players[owner];
            if !player.is_active() {
                bet_box.sit_out();
                continue;
            }

            let configured = bet_box.configured();
            let recommended = if player.strategy().is_counting() {
                player.strategy().bet_size(configured.main, &self.shoe)
            } else {
                configured.main
            };
            bet_box.recommended_main_bet = recommended;
            let wanted = BoxBets {
                main: recommended.clamp(rule.min_bet, rule.max_bet),
                perfect_pairs: clamp_side_bet(configured.perfect_pairs, &rule),
                twenty_one_plus_three: clamp_side_bet(configured.twenty_one_plus_three, &rule),
            };

            match choose_stake(player.balance(), wanted, rule.min_bet) {
                Some(bets) if player.place_bet(bets.total()) => bet_box.commit(bets),
                _ => bet_box.sit_out(),
            }
        }
        self.phase = RoundPhase::DealInitial;
        Ok(())
    }

    /// Can be called at DealInitial phase.
    /// One card to each box, the dealer's upcard, a second card to each box,
    /// and the hole card if the dealer takes one.
    #[allowed_phase(DealInitial)]
    pub fn deal_initial_cards(&mut self) -> Result<(), SimError> {
        for pass in 0..2 {
            for bet_box in self.boxes.iter_mut().filter(|bet_box| bet_box.is_playing()) {
                bet_box.hands[0].add_card(self.shoe.deal()?);
            }
            if pass == 0 || self.rule.dealer_takes_hole_card {
                self.dealer.add_card(self.shoe.deal()?);
            }
        }
        self.phase = RoundPhase::SideBetEval;
        Ok(())
    }

    /// Can be called at SideBetEval phase.
    #[allowed_phase(SideBetEval)]
    pub fn evaluate_side_bets(&mut self) -> Result<(), SimError> {
        let upcard = self.upcard();
        for bet_box in &mut self.boxes {
            bet_box.evaluate_side_bets(upcard);
        }
        self.phase = RoundPhase::InsuranceOffer;
        Ok(())
    }

    /// Can be called at InsuranceOffer phase.
    /// Insurance is only offered against an ace and costs half the main bet.
    #[allowed_phase(InsuranceOffer)]
    pub fn offer_insurance(&mut self) -> Result<(), SimError> {
        if self.upcard().is_ace() {
            for bet_box in self.boxes.iter_mut().filter(|bet_box| bet_box.is_playing()) {
                let Some(owner) = bet_box.owner else {
                    continue;
                };
                let player = &mut self.players[owner];
                if !player.strategy().should_take_insurance(&self.shoe) {
                    continue;
                }
                let amount = bet_box.bets.main / 2.0;
                if player.place_bet(amount) {
                    bet_box.insurance.taken = true;
                    bet_box.insurance.bet = amount;
                }
            }
        }
        self.phase = RoundPhase::DealerPeek;
        Ok(())
    }

    /// Can be called at DealerPeek phase.
    /// Returns true if the dealer peeked and has a natural, in which case the
    /// round goes straight to settlement.
    #[allowed_phase(DealerPeek)]
    pub fn dealer_peeks_if_necessary(&mut self) -> Result<bool, SimError> {
        let dealer_peeks =
            self.dealer.cards().len() == 2 && self.rule.peek_policy.peeks_on(self.upcard());
        if dealer_peeks {
            if self.dealer.is_blackjack() {
                self.resolve_dealer_blackjack();
                self.phase = RoundPhase::Settlement;
                return Ok(true);
            }
            self.resolve_insurance(false);
        }
        self.phase = RoundPhase::PlayerActions;
        Ok(false)
    }

    /// Can be called at PlayerActions phase.
    /// Plays every hand left to right. Hands created by a split are inserted
    /// right after their parent and played before the hands to their right.
    #[allowed_phase(PlayerActions)]
    pub fn play_boxes(&mut self) -> Result<(), SimError> {
        let upcard = self.upcard();
        for box_index in 0..self.boxes.len() {
            let Some(owner) = self.boxes[box_index].owner else {
                continue;
            };
            let mut hand_index = 0;
            while hand_index < self.boxes[box_index].hands.len() {
                let hand = &self.boxes[box_index].hands[hand_index];
                if hand.is_split_ace() || hand.value() >= 21 {
                    hand_index += 1;
                    continue;
                }

                let advice = self.players[owner].strategy().advise(hand, upcard, &self.shoe);
                let action = advice
                    .actions
                    .iter()
                    .copied()
                    .find(|action| self.is_allowed(box_index, hand_index, owner, *action, upcard))
                    .unwrap_or(Action::Stand);
                trace!(
                    round = self.round,
                    hand = hand.id(),
                    key = advice.key.as_str(),
                    action = action.as_str(),
                    deviation = advice.is_deviation,
                    "player decision"
                );
                self.boxes[box_index].hands[hand_index].record_decision(DecisionRecord {
                    key: advice.key,
                    actions: advice.actions,
                    final_action: action,
                    is_deviation: advice.is_deviation,
                    is_fallback: advice.is_fallback,
                });

                match action {
                    Action::Hit => {
                        let card = self.shoe.deal()?;
                        self.boxes[box_index].hands[hand_index].add_card(card);
                    }
                    Action::Stand => hand_index += 1,
                    Action::Surrender => {
                        self.boxes[box_index].hands[hand_index].set_result(HandResult::Surrender);
                        hand_index += 1;
                    }
                    Action::Double => {
                        let stake = self.boxes[box_index].hands[hand_index].bet();
                        let debited = self.players[owner].place_bet(stake);
                        debug_assert!(debited, "double allowed without funds");
                        if debited {
                            let card = self.shoe.deal()?;
                            let hand = &mut self.boxes[box_index].hands[hand_index];
                            hand.double_down();
                            hand.add_card(card);
                        }
                        hand_index += 1;
                    }
                    Action::Split => self.split_hand(box_index, hand_index, owner)?,
                }
            }
        }
        self.phase = RoundPhase::DealerPlay;
        Ok(())
    }

    /// Can be called at DealerPlay phase.
    /// The dealer only plays out while some hand is still live. Without a
    /// hole card the second card is dealt here and may still be a natural.
    #[allowed_phase(DealerPlay)]
    pub fn dealer_plays(&mut self) -> Result<(), SimError> {
        let live_hand = self
            .boxes
            .iter()
            .flat_map(|bet_box| bet_box.hands.iter())
            .any(|hand| !hand.is_bust() && !hand.is_blackjack());
        let open_insurance = self
            .boxes
            .iter()
            .any(|bet_box| bet_box.insurance.taken && bet_box.insurance.outcome.is_none());
        self.phase = RoundPhase::Settlement;

        if !live_hand && !open_insurance {
            return Ok(());
        }
        if self.dealer.cards().len() < 2 {
            self.dealer.add_card(self.shoe.deal()?);
            if self.dealer.is_blackjack() {
                self.resolve_dealer_blackjack();
                return Ok(());
            }
        }
        // An unpeeked hole card leaves the hands to settlement, so a
        // surrender keeps half its bet even against a natural.
        let dealer_blackjack = self.dealer.is_blackjack();
        self.resolve_insurance(dealer_blackjack);
        if live_hand {
            self.draw_dealer_hand()?;
        }
        Ok(())
    }

    /// Can be called at Settlement phase.
    /// Pays every box once, then busts or retires players.
    #[allowed_phase(Settlement)]
    pub fn settle(&mut self) -> Result<(), SimError> {
        for bet_box in &mut self.boxes {
            let Some(owner) = bet_box.owner else {
                continue;
            };
            if !bet_box.is_playing() {
                continue;
            }
            let hands_payout: f64 = bet_box
                .hands
                .iter_mut()
                .map(|hand| hand.settle(&self.dealer))
                .sum();
            bet_box.total_payout =
                hands_payout + bet_box.side_bet_winnings() + bet_box.insurance.payout;
            self.players[owner].receive_payout(bet_box.total_payout);
        }

        let round = self.round;
        for player in self.players.iter_mut().filter(|player| player.is_active()) {
            match player.update_status(self.rule.min_bet, round) {
                PlayerStatus::Busted { .. } => info!(
                    player_id = player.id(),
                    owner = player.owner(),
                    round,
                    balance = player.balance(),
                    "player busted"
                ),
                PlayerStatus::Retired { .. } => info!(
                    player_id = player.id(),
                    owner = player.owner(),
                    round,
                    balance = player.balance(),
                    "player retired"
                ),
                PlayerStatus::Active => {}
            }
        }
        self.phase = RoundPhase::Cleanup;
        Ok(())
    }

    /// Can be called at Cleanup phase.
    /// Reports every settled hand to `sink`, resets the boxes and starts a
    /// new shoe if the cut card came out this round.
    #[allowed_phase(Cleanup)]
    pub fn clean_up<S: HandSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SimError> {
        for bet_box in &self.boxes {
            for record in self.hand_records(bet_box) {
                sink.on_hand_settled(&record)?;
            }
        }
        sink.on_round_complete(self.round)?;

        for bet_box in &mut self.boxes {
            match bet_box.owner {
                Some(owner) if self.players[owner].is_busted() => bet_box.vacate(),
                _ => bet_box.reset(),
            }
        }
        if self.shoe.reshuffle_if_needed()? {
            self.shoe_number += 1;
        }
        self.phase = RoundPhase::ResetRound;
        Ok(())
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn shoe_number(&self) -> u32 {
        self.shoe_number
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    pub fn boxes(&self) -> &[BetBox] {
        &self.boxes
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    fn upcard(&self) -> Card {
        self.dealer.cards()[0]
    }

    fn is_allowed(
        &self,
        box_index: usize,
        hand_index: usize,
        owner: usize,
        action: Action,
        upcard: Card,
    ) -> bool {
        let bet_box = &self.boxes[box_index];
        let hand = &bet_box.hands[hand_index];
        let player = &self.players[owner];
        match action {
            Action::Hit | Action::Stand => true,
            Action::Surrender => {
                self.rule.allow_surrender
                    && hand.cards().len() == 2
                    && !hand.is_split_child()
                    && (!upcard.is_ace() || self.rule.allow_surrender_against_ace)
            }
            Action::Split => {
                hand.can_split()
                    && bet_box.hands.len() < self.rule.max_splits as usize + 1
                    && player.can_afford(hand.bet())
            }
            Action::Double => {
                (self.rule.allow_das || !hand.is_split_child()) && player.can_afford(hand.bet())
            }
        }
    }

    /// Replaces the hand with two children, each keeping one of its cards and
    /// drawing a second.
    fn split_hand(
        &mut self,
        box_index: usize,
        hand_index: usize,
        owner: usize,
    ) -> Result<(), SimError> {
        let bet_box = &mut self.boxes[box_index];
        let parent = bet_box.hands[hand_index].clone();
        let debited = self.players[owner].place_bet(parent.bet());
        debug_assert!(debited, "split allowed without funds");
        if !debited {
            return Ok(());
        }

        let mut left = Hand::split_child(&parent, bet_box.next_hand_id(), parent.cards()[0]);
        left.add_card(self.shoe.deal()?);
        let mut right = Hand::split_child(&parent, bet_box.next_hand_id(), parent.cards()[1]);
        right.add_card(self.shoe.deal()?);

        bet_box.hands[hand_index] = left;
        bet_box.hands.insert(hand_index + 1, right);
        bet_box.split_count += 1;
        Ok(())
    }

    /// Insurance wins and every hand but a player natural loses.
    fn resolve_dealer_blackjack(&mut self) {
        for bet_box in &mut self.boxes {
            bet_box.insurance.resolve(true);
            for hand in &mut bet_box.hands {
                if hand.is_blackjack() {
                    hand.set_result(HandResult::Push);
                } else {
                    hand.set_result(HandResult::Lose);
                }
            }
        }
    }

    fn resolve_insurance(&mut self, dealer_blackjack: bool) {
        for bet_box in &mut self.boxes {
            bet_box.insurance.resolve(dealer_blackjack);
        }
    }

    /// Hits below 17, and on a soft 17 if the rule says so.
    fn draw_dealer_hand(&mut self) -> Result<(), SimError> {
        loop {
            let value = self.dealer.value();
            let hits = value < 17
                || (value == 17 && self.dealer.is_soft() && self.rule.dealer_hit_on_soft17);
            if !hits {
                return Ok(());
            }
            self.dealer.add_card(self.shoe.deal()?);
        }
    }

    fn hand_records(&self, bet_box: &BetBox) -> Vec<HandRecord> {
        let Some(owner) = bet_box.owner else {
            return Vec::new();
        };
        let player = &self.players[owner];
        let last = bet_box.hands.len().saturating_sub(1);
        bet_box
            .hands
            .iter()
            .enumerate()
            .map(|(index, hand)| HandRecord {
                round: self.round,
                shoe: self.shoe_number,
                running_count: self.shoe.running_count(),
                true_count: self.shoe.true_count_truncated(),
                real_count_till_cut_card: self.shoe.real_count_till_cut_card(),
                box_id: bet_box.id().to_string(),
                player_id: player.id(),
                hand_id: hand.id().to_string(),
                owner: player.owner().to_string(),
                strategy: player.strategy().name().to_string(),
                configured_bet: bet_box.configured().main,
                recommended_bet: bet_box.recommended_main_bet(),
                hand_bet: hand.bet(),
                hand_payout: hand.payout(),
                box_payout: bet_box.total_payout(),
                perfect_pairs_bet: bet_box.perfect_pairs().bet,
                perfect_pairs_win: bet_box.perfect_pairs().win,
                perfect_pairs_label: bet_box.perfect_pairs().label(),
                twenty_one_plus_three_bet: bet_box.twenty_one_plus_three().bet,
                twenty_one_plus_three_win: bet_box.twenty_one_plus_three().win,
                twenty_one_plus_three_label: bet_box.twenty_one_plus_three().label(),
                insurance_taken: bet_box.insurance().taken,
                insurance_bet: bet_box.insurance().bet,
                insurance_payout: bet_box.insurance().payout,
                insurance_outcome: bet_box.insurance().outcome,
                initial_balance: player.initial_balance(),
                round_start_balance: player.round_start_balance(),
                balance: player.balance(),
                cards: hand.cards().to_vec(),
                result: hand.result(),
                is_blackjack: hand.is_blackjack(),
                is_doubled: hand.is_doubled(),
                is_split_child: hand.is_split_child(),
                split_count: bet_box.split_count(),
                player_bust: hand.is_bust(),
                draws: hand.draws().to_vec(),
                dealer_upcard: self.dealer.upcard(),
                dealer_cards: self.dealer.cards().to_vec(),
                dealer_blackjack: self.dealer.is_blackjack(),
                dealer_bust: self.dealer.is_bust(),
                player_busted: player.is_busted(),
                player_retired: player.is_retired(),
                number_of_decks: self.shoe.number_of_decks(),
                cut_card_position: self.shoe.cut_card_position(),
                cards_drawn_total: self.shoe.drawn_this_shoe(),
                cards_drawn_round: self.shoe.drawn_this_round(),
                cards_left: self.shoe.remaining(),
                decision_trace: hand.trace().to_vec(),
                box_totals: (index == last).then(|| BoxTotals {
                    invested: bet_box.invested(),
                    earned: bet_box.total_payout(),
                }),
            })
            .collect()
    }
}

/// Non-zero side bets are kept inside the side-bet range.
fn clamp_side_bet(bet: f64, rule: &Rule) -> f64 {
    if bet > 0.0 {
        bet.clamp(rule.min_side_bet(), rule.max_side_bet())
    } else {
        0.0
    }
}

/// Picks the stakes a box can cover. Side bets are dropped 21+3 last, first
/// at the wanted main bet and then at the table minimum. `None` when even
/// the table minimum alone is out of reach.
pub fn choose_stake(balance: f64, wanted: BoxBets, min_bet: f64) -> Option<BoxBets> {
    [wanted.main, min_bet].into_iter().find_map(|main| {
        [
            BoxBets { main, ..wanted },
            BoxBets {
                main,
                perfect_pairs: 0.0,
                ..wanted
            },
            BoxBets {
                main,
                twenty_one_plus_three: 0.0,
                ..wanted
            },
            BoxBets {
                main,
                perfect_pairs: 0.0,
                twenty_one_plus_three: 0.0,
            },
        ]
        .into_iter()
        .find(|bets| bets.total() <= balance)
    })
}
