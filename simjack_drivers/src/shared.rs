pub mod csv_log;
pub mod logging;
pub mod strategy_file;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use simjack::{BoxBets, BoxSetup, Card, PeekPolicy, PlayerSetup, Shoe, SimError, Table, MAX_SEATS};

use crate::strategy_file::{load_strategy, StrategyFileError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub rule: ConfigRule,
    pub simulation: ConfigSimulation,
    pub players: Vec<ConfigPlayer>,
    #[serde(default)]
    pub logging: ConfigLogging,
}

impl Config {
    /// Loads and validates a YAML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        let config: Config =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                source,
                path: path.to_path_buf(),
            })?;
        config.validate().map_err(|source| ConfigError::Invalid {
            source,
            path: path.to_path_buf(),
        })?;
        Ok(config)
    }

    /// Loads and validates a config given inline as JSON.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text).map_err(ConfigError::ParseInline)?;
        config.validate().map_err(ConfigError::InvalidInline)?;
        Ok(config)
    }

    /// Checks everything that can be checked without touching the disk.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.rule.validate()?;
        self.simulation.validate()?;
        self.logging.validate()?;
        if self.players.is_empty() {
            return Err(invalid("players", "at least one player is required"));
        }

        let mut player_ids = HashSet::new();
        let mut seats = HashSet::new();
        for (index, player) in self.players.iter().enumerate() {
            let field = |name: &str| format!("players[{}].{}", index, name);
            if !player_ids.insert(player.player_id) {
                return Err(invalid(field("player_id"), "player ids must be unique"));
            }
            if player.strategy.trim().is_empty() {
                return Err(invalid(field("strategy"), "strategy name must not be empty"));
            }
            if !(player.initial_balance >= 0.0) {
                return Err(invalid(field("initial_balance"), "must not be negative"));
            }
            if player.target_balance.map_or(false, |target| target < 0.0) {
                return Err(invalid(field("target_balance"), "must not be negative"));
            }
            for bet_box in &player.boxes {
                if !(1..=MAX_SEATS).contains(&bet_box.index) {
                    return Err(invalid(
                        field("boxes"),
                        format!("box index {} is outside 1..={}", bet_box.index, MAX_SEATS),
                    ));
                }
                if !seats.insert(bet_box.index) {
                    return Err(invalid(
                        field("boxes"),
                        format!("box {} is claimed more than once", bet_box.index),
                    ));
                }
                let bets = [
                    bet_box.main_bet,
                    bet_box.sidebets.perfect_pairs,
                    bet_box.sidebets.twenty_one_plus_three,
                ];
                if bets.iter().any(|bet| !(*bet >= 0.0)) {
                    return Err(invalid(field("boxes"), "bets must not be negative"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_surrender: bool,
    #[serde(default)]
    pub allow_surrender_against_ace: bool,
    pub dealer_takes_hole_card: bool,
    #[serde(default = "default_peek_policy")]
    pub peek_policy: String,
    pub max_splits: u8,
    pub min_bet: f64,
    pub max_bet: f64,
}

fn default_peek_policy() -> String {
    String::from("UpAce")
}

impl ConfigRule {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.number_of_decks == 0 {
            return Err(invalid("rule.number_of_decks", "at least one deck is required"));
        }
        if !(self.min_bet > 0.0) {
            return Err(invalid("rule.min_bet", "must be greater than zero"));
        }
        if !(self.min_bet <= self.max_bet) {
            return Err(invalid("rule.max_bet", "must not be below min_bet"));
        }
        if self.peek_policy.parse::<PeekPolicy>().is_err() {
            return Err(invalid(
                "rule.peek_policy",
                format!("unknown policy '{}'", self.peek_policy),
            ));
        }
        Ok(())
    }
}

impl TryFrom<ConfigRule> for simjack::Rule {
    type Error = serde::de::value::Error;

    fn try_from(rule: ConfigRule) -> Result<Self, Self::Error> {
        Ok(simjack::Rule {
            number_of_decks: rule.number_of_decks,
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            allow_das: rule.allow_das,
            allow_surrender: rule.allow_surrender,
            allow_surrender_against_ace: rule.allow_surrender_against_ace,
            dealer_takes_hole_card: rule.dealer_takes_hole_card,
            peek_policy: rule.peek_policy.parse()?,
            max_splits: rule.max_splits,
            min_bet: rule.min_bet,
            max_bet: rule.max_bet,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSimulation {
    pub round_count: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub forced_cards: Vec<String>,
}

impl ConfigSimulation {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.round_count == 0 {
            return Err(invalid("simulation.round_count", "must be greater than zero"));
        }
        for text in &self.forced_cards {
            if let Err(error) = text.parse::<Card>() {
                return Err(invalid("simulation.forced_cards", error.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigPlayer {
    pub player_id: u32,
    pub owner: String,
    pub initial_balance: f64,
    #[serde(default)]
    pub target_balance: Option<f64>,
    pub strategy: String,
    pub boxes: Vec<ConfigBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigBox {
    pub index: u8,
    pub main_bet: f64,
    #[serde(default)]
    pub sidebets: ConfigSidebets,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSidebets {
    #[serde(default, alias = "perfect_pair")]
    pub perfect_pairs: f64,
    #[serde(default, alias = "21+3")]
    pub twenty_one_plus_three: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigLogging {
    #[serde(default)]
    pub level: Option<String>,
    /// Compress the hand log.
    #[serde(default, alias = "gzip_log")]
    pub gzip: bool,
}

impl ConfigLogging {
    fn validate(&self) -> Result<(), ValidationError> {
        match &self.level {
            Some(level) if level.parse::<tracing::Level>().is_err() => Err(invalid(
                "logging.level",
                format!("unknown level '{}'", level),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        #[source]
        source: ValidationError,
        path: PathBuf,
    },
    #[error("failed to parse inline config: {0}")]
    ParseInline(#[source] serde_json::Error),
    #[error("invalid inline configuration: {0}")]
    InvalidInline(#[source] ValidationError),
}

impl ConfigError {
    /// The config file involved, if the config came from a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => Some(path.as_path()),
            ConfigError::ParseInline(_) | ConfigError::InvalidInline(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.into(),
        message: message.into(),
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid rule: {0}")]
    Rule(#[from] serde::de::value::Error),
    #[error(transparent)]
    Strategy(#[from] StrategyFileError),
    #[error(transparent)]
    Table(#[from] SimError),
}

/// Builds the shoe, loads each player's strategy from `strategy_dir` and
/// seats everyone. `seed` overrides the configured seed.
pub fn build_table(
    config: &Config,
    strategy_dir: &Path,
    seed: Option<u64>,
) -> Result<Table, SetupError> {
    let rule: simjack::Rule = config.rule.clone().try_into()?;
    let forced_cards = config
        .simulation
        .forced_cards
        .iter()
        .map(|text| text.parse::<Card>())
        .collect::<Result<Vec<_>, _>>()?;
    let shoe = Shoe::with_seed(
        rule.number_of_decks,
        forced_cards,
        seed.or(config.simulation.seed),
    )?;

    let mut setups = Vec::with_capacity(config.players.len());
    for player in &config.players {
        let strategy = load_strategy(strategy_dir, &player.strategy)?;
        setups.push(PlayerSetup {
            id: player.player_id,
            owner: player.owner.clone(),
            initial_balance: player.initial_balance,
            target_balance: player.target_balance,
            strategy,
            boxes: player
                .boxes
                .iter()
                .map(|bet_box| BoxSetup {
                    seat: bet_box.index,
                    bets: BoxBets {
                        main: bet_box.main_bet,
                        perfect_pairs: bet_box.sidebets.perfect_pairs,
                        twenty_one_plus_three: bet_box.sidebets.twenty_one_plus_three,
                    },
                })
                .collect(),
        });
    }
    Ok(Table::new(rule, setups, shoe)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simjack::Strategy;
    use std::fs;

    const BASIC_YAML: &str = r#"
rule:
  number_of_decks: 6
  dealer_hit_on_soft17: false
  allow_das: true
  allow_surrender: true
  dealer_takes_hole_card: true
  max_splits: 3
  min_bet: 10
  max_bet: 500
simulation:
  round_count: 1000
  seed: 42
  forced_cards: ["A of Spades", "K of hearts"]
players:
  - player_id: 1
    owner: "alice"
    initial_balance: 1000
    target_balance: 1500
    strategy: "basic"
    boxes:
      - index: 1
        main_bet: 10
        sidebets:
          perfect_pairs: 2
          "21+3": 2
      - index: 2
        main_bet: 20
logging:
  level: "debug"
  gzip_log: true
"#;

    const BASIC_STRATEGY: &str = r#"{
  "fallback": "stand",
  "decide_insurance": false,
  "actions": { "hard_16_vs_10": ["surrender", "hit"] }
}"#;

    fn basic_config() -> Config {
        serde_yaml::from_str(BASIC_YAML).unwrap()
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let config = basic_config();
        config.validate().unwrap();

        assert_eq!(config.rule.peek_policy, "UpAce");
        assert!(!config.rule.allow_surrender_against_ace);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.players[0].target_balance, Some(1500.0));
        assert_eq!(config.players[0].boxes[0].sidebets.twenty_one_plus_three, 2.0);
        assert_eq!(config.players[0].boxes[1].sidebets, ConfigSidebets::default());
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert!(config.logging.gzip);
    }

    #[test]
    fn inline_json_config_matches_the_file_form() {
        let json = serde_json::to_string(&basic_config()).unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), basic_config());

        let error = Config::from_json("{\"rule\": 3}").unwrap_err();
        assert!(matches!(error, ConfigError::ParseInline(_)));
        assert_eq!(error.path(), None);

        let mut config = basic_config();
        config.players.clear();
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(
            Config::from_json(&json),
            Err(ConfigError::InvalidInline(ValidationError::InvalidField { .. }))
        ));
    }

    #[test]
    fn can_convert_rule() {
        let rule: simjack::Rule = basic_config().rule.try_into().unwrap();
        assert_eq!(rule.number_of_decks, 6);
        assert_eq!(rule.max_splits, 3);
        assert_eq!(rule.peek_policy, PeekPolicy::UpAce);
        assert_eq!(rule.max_side_bet(), 100.0);
    }

    #[test]
    fn should_return_error_when_converting_rule() {
        let mut config_rule = basic_config().rule;
        config_rule.peek_policy = String::from("Not a policy");
        let convert_result: Result<simjack::Rule, serde::de::value::Error> =
            config_rule.try_into();
        assert!(convert_result.is_err());
    }

    #[test]
    fn rejects_duplicate_seats() {
        let mut config = basic_config();
        config.players[0].boxes[1].index = 1;
        let error = config.validate().unwrap_err();
        assert_eq!(
            error,
            ValidationError::InvalidField {
                field: "players[0].boxes".to_string(),
                message: "box 1 is claimed more than once".to_string(),
            }
        );
    }

    #[test]
    fn rejects_bad_limits_and_counts() {
        let mut config = basic_config();
        config.rule.min_bet = 600.0;
        assert!(config.validate().is_err());

        let mut config = basic_config();
        config.simulation.round_count = 0;
        assert!(config.validate().is_err());

        let mut config = basic_config();
        config.players[0].boxes[0].index = 8;
        assert!(config.validate().is_err());

        let mut config = basic_config();
        config.simulation.forced_cards.push("Z of Hearts".to_string());
        assert!(config.validate().is_err());

        let mut config = basic_config();
        config.logging.level = Some("chatty".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_path_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        fs::write(&path, "rule: [").unwrap();
        let error = Config::from_path(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert_eq!(error.path(), Some(path.as_path()));

        let missing = dir.path().join("missing.yml");
        assert!(matches!(
            Config::from_path(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn builds_a_table_from_config_and_strategy_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("basic.json"), BASIC_STRATEGY).unwrap();
        let config_path = dir.path().join("simjack.yml");
        fs::write(&config_path, BASIC_YAML).unwrap();

        let config = Config::from_path(&config_path).unwrap();
        let table = build_table(&config, dir.path(), None).unwrap();
        assert_eq!(table.players().len(), 1);
        assert_eq!(table.boxes().len(), 2);
        assert_eq!(table.players()[0].strategy().name(), "basic");
        assert_eq!(table.shoe().len(), 312);
        assert_eq!(
            table.shoe().preview_next_few_cards(2),
            &["A of Spades".parse::<Card>().unwrap(), "K of Hearts".parse().unwrap()]
        );
    }

    #[test]
    fn missing_strategy_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_table(&basic_config(), dir.path(), None);
        assert!(matches!(result, Err(SetupError::Strategy(StrategyFileError::Read { .. }))));
    }
}
