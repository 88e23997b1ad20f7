use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use simjack::card::join_cards;
use simjack::{HandRecord, HandSink};
use tracing::debug;

const FLUSH_EVERY: u64 = 10_000;

pub const HEADER: [&str; 50] = [
    "round",
    "shoe",
    "deck_running_count",
    "true_count",
    "real_count_till_cut_card",
    "box_id",
    "player_id",
    "hand_id",
    "owner",
    "strategy",
    "bet_from_config",
    "recommended_bet",
    "bet_unit_used",
    "hand_payout",
    "main_payout",
    "pp_bet",
    "pp_win",
    "pp_type",
    "p21_bet",
    "p21_win",
    "p21_type",
    "insurance_taken",
    "insurance_bet",
    "insurance_payout",
    "insurance_result",
    "initial_balance",
    "round_start_balance",
    "player_balance",
    "hand",
    "result",
    "is_blackjack",
    "is_doubled",
    "is_split_child",
    "split_count",
    "dealer_upcard",
    "dealer_final_hand",
    "dealer_blackjack",
    "dealer_bust",
    "player_bust",
    "player_draws",
    "player_is_bankrupt",
    "player_is_retired",
    "num_decks",
    "cut_card_position",
    "cards_drawn_total",
    "cards_drawn_round",
    "cards_left_after_round",
    "decision_trace",
    "box_total_invested",
    "box_total_earned",
];

enum LogWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl LogWriter {
    /// Flushes everything, writing the gzip trailer if there is one.
    fn finish(self) -> io::Result<()> {
        match self {
            LogWriter::Plain(mut writer) => writer.flush(),
            LogWriter::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogWriter::Plain(writer) => writer.write(buf),
            LogWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogWriter::Plain(writer) => writer.flush(),
            LogWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Writes one CSV row per settled hand. Rows go to `<path>.partial` until
/// `finish` renames the file into place. A gzip log gets `.gz` appended to
/// both names.
pub struct CsvHandLog {
    writer: LogWriter,
    partial_path: PathBuf,
    path: PathBuf,
    rows: u64,
}

impl CsvHandLog {
    pub fn create(path: impl AsRef<Path>, gzip: bool) -> io::Result<CsvHandLog> {
        let mut path = path.as_ref().to_path_buf();
        if gzip {
            path = with_suffix(&path, ".gz");
        }
        let partial_path = with_suffix(&path, ".partial");

        let file = BufWriter::new(File::create(&partial_path)?);
        let mut writer = if gzip {
            LogWriter::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            LogWriter::Plain(file)
        };
        writeln!(writer, "{}", HEADER.join(","))?;
        Ok(CsvHandLog {
            writer,
            partial_path,
            path,
            rows: 0,
        })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes and moves the log to its final name.
    pub fn finish(self) -> io::Result<PathBuf> {
        self.writer.finish()?;
        fs::rename(&self.partial_path, &self.path)?;
        debug!(path = ?self.path, rows = self.rows, "hand log complete");
        Ok(self.path)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl HandSink for CsvHandLog {
    fn on_hand_settled(&mut self, record: &HandRecord) -> io::Result<()> {
        let row = to_row(record)?;
        let line = row
            .iter()
            .map(|field| escape(field))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.writer, "{}", line)?;
        self.rows += 1;
        if self.rows % FLUSH_EVERY == 0 {
            self.writer.flush()?;
        }
        Ok(())
    }
}

fn to_row(record: &HandRecord) -> io::Result<Vec<String>> {
    let trace = serde_json::to_string(&record.decision_trace)?;
    let (invested, earned) = match record.box_totals {
        Some(totals) => (money(totals.invested), money(totals.earned)),
        None => (String::new(), String::new()),
    };
    Ok(vec![
        record.round.to_string(),
        record.shoe.to_string(),
        record.running_count.to_string(),
        record.true_count.to_string(),
        record.real_count_till_cut_card.to_string(),
        record.box_id.clone(),
        record.player_id.to_string(),
        record.hand_id.clone(),
        record.owner.clone(),
        record.strategy.clone(),
        money(record.configured_bet),
        money(record.recommended_bet),
        money(record.hand_bet),
        money(record.hand_payout),
        money(record.box_payout),
        money(record.perfect_pairs_bet),
        money(record.perfect_pairs_win),
        record.perfect_pairs_label.to_string(),
        money(record.twenty_one_plus_three_bet),
        money(record.twenty_one_plus_three_win),
        record.twenty_one_plus_three_label.to_string(),
        flag(record.insurance_taken),
        money(record.insurance_bet),
        money(record.insurance_payout),
        record
            .insurance_outcome
            .map_or("", |outcome| outcome.as_str())
            .to_string(),
        money(record.initial_balance),
        money(record.round_start_balance),
        money(record.balance),
        join_cards(&record.cards),
        record.result.map_or("", |result| result.as_str()).to_string(),
        flag(record.is_blackjack),
        flag(record.is_doubled),
        flag(record.is_split_child),
        record.split_count.to_string(),
        record
            .dealer_upcard
            .map(|card| card.to_string())
            .unwrap_or_default(),
        join_cards(&record.dealer_cards),
        flag(record.dealer_blackjack),
        flag(record.dealer_bust),
        flag(record.player_bust),
        join_cards(&record.draws),
        flag(record.player_busted),
        flag(record.player_retired),
        record.number_of_decks.to_string(),
        record.cut_card_position.to_string(),
        record.cards_drawn_total.to_string(),
        record.cards_drawn_round.to_string(),
        record.cards_left.to_string(),
        trace,
        invested,
        earned,
    ])
}

fn money(amount: f64) -> String {
    format!("{:.2}", amount)
}

fn flag(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

/// Quotes a field holding a separator, quote or line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
