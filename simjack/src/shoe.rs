use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::card::{Card, Rank, Suit};
use crate::SimError;

/// Represents a shoe in the real world: one or more decks, a cut card and a
/// Hi-Lo count of everything dealt since the last shuffle.
#[derive(Debug, Clone)]
pub struct Shoe {
    number_of_decks: u8,
    forced_cards: Vec<Card>,
    cards: Vec<Card>,
    current_index: usize,
    cut_card_position: usize,
    needs_new_shoe: bool,
    running_count: i32,
    real_count_till_cut_card: i32,
    drawn_this_shoe: usize,
    drawn_this_round: usize,
    rng: StdRng,
}

impl Shoe {
    /// Builds and shuffles a shoe. `forced_cards` are placed at the front of
    /// this and every later shuffle, in the given order.
    pub fn new(number_of_decks: u8, forced_cards: Vec<Card>, rng: StdRng) -> Result<Shoe, SimError> {
        let mut shoe = Shoe {
            number_of_decks,
            forced_cards,
            cards: Vec::with_capacity(number_of_decks as usize * 52),
            current_index: 0,
            cut_card_position: 0,
            needs_new_shoe: false,
            running_count: 0,
            real_count_till_cut_card: 0,
            drawn_this_shoe: 0,
            drawn_this_round: 0,
            rng,
        };
        shoe.build()?;
        Ok(shoe)
    }

    /// Same as `new`, seeding the shuffle RNG when a seed is given and from
    /// the OS otherwise.
    pub fn with_seed(
        number_of_decks: u8,
        forced_cards: Vec<Card>,
        seed: Option<u64>,
    ) -> Result<Shoe, SimError> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Shoe::new(number_of_decks, forced_cards, rng)
    }

    /// Replaces the whole card sequence with a freshly shuffled one and
    /// resets the count and the per-shoe counters.
    pub fn build(&mut self) -> Result<(), SimError> {
        let mut pool = Vec::with_capacity(self.number_of_decks as usize * 52);
        for _ in 0..self.number_of_decks {
            for suit in Suit::iter() {
                for rank in Rank::iter() {
                    pool.push(Card { rank, suit });
                }
            }
        }
        pool.shuffle(&mut self.rng);

        if self.forced_cards.is_empty() {
            self.cards = pool;
        } else {
            let mut requested: BTreeMap<Card, usize> = BTreeMap::new();
            for card in &self.forced_cards {
                *requested.entry(*card).or_default() += 1;
            }
            let available = self.number_of_decks as usize;
            if let Some((card, count)) = requested.iter().find(|(_, count)| **count > available) {
                return Err(SimError::ForcedCardOverflow {
                    card: *card,
                    requested: *count,
                    available,
                });
            }

            pool.retain(|card| match requested.get_mut(card) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    false
                }
                _ => true,
            });
            pool.shuffle(&mut self.rng);

            self.cards = self.forced_cards.clone();
            self.cards.append(&mut pool);
        }

        let min_cut = self.cards.len() * 50 / 100;
        let max_cut = self.cards.len() * 60 / 100;
        self.cut_card_position = self.rng.gen_range(min_cut..max_cut);
        self.real_count_till_cut_card = self.cards[..self.cut_card_position]
            .iter()
            .map(|card| card.rank.hi_lo())
            .sum();

        self.current_index = 0;
        self.needs_new_shoe = false;
        self.running_count = 0;
        self.drawn_this_shoe = 0;

        debug!(
            decks = self.number_of_decks,
            cut_card_position = self.cut_card_position,
            real_count_till_cut_card = self.real_count_till_cut_card,
            "built new shoe"
        );
        Ok(())
    }

    /// Deals the front card. The count is updated before the card is handed
    /// out, and the cut card is checked once the card has left the shoe.
    pub fn deal(&mut self) -> Result<Card, SimError> {
        let card = *self
            .cards
            .get(self.current_index)
            .ok_or(SimError::EmptyShoe)?;
        self.current_index += 1;
        self.drawn_this_round += 1;
        self.drawn_this_shoe += 1;
        self.running_count += card.rank.hi_lo();
        if self.remaining() <= self.cut_card_position {
            self.needs_new_shoe = true;
        }
        Ok(card)
    }

    /// Rebuilds the shoe if the cut card has been reached. Only called
    /// between rounds. Returns whether a new shoe was built.
    pub fn reshuffle_if_needed(&mut self) -> Result<bool, SimError> {
        if !self.needs_new_shoe {
            return Ok(false);
        }
        self.build()?;
        Ok(true)
    }

    pub fn reset_round_counter(&mut self) {
        self.drawn_this_round = 0;
    }

    /// Running count divided by the number of decks left.
    pub fn true_count(&self) -> f64 {
        let remaining = self.remaining();
        if remaining == 0 {
            return 0.0;
        }
        self.running_count as f64 / (remaining as f64 / 52.0)
    }

    /// True count truncated toward zero, as compared against count thresholds.
    pub fn true_count_truncated(&self) -> i32 {
        self.true_count() as i32
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.current_index
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }

    pub fn running_count(&self) -> i32 {
        self.running_count
    }

    pub fn real_count_till_cut_card(&self) -> i32 {
        self.real_count_till_cut_card
    }

    pub fn cut_card_position(&self) -> usize {
        self.cut_card_position
    }

    pub fn needs_new_shoe(&self) -> bool {
        self.needs_new_shoe
    }

    pub fn drawn_this_shoe(&self) -> usize {
        self.drawn_this_shoe
    }

    pub fn drawn_this_round(&self) -> usize {
        self.drawn_this_round
    }

    /// The undealt cards, front first.
    pub fn preview_next_few_cards(&self, number: usize) -> &[Card] {
        let end = (self.current_index + number).min(self.cards.len());
        &self.cards[self.current_index..end]
    }
}
