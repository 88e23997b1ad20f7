//! JSON strategy definitions, one file per strategy name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use simjack::{
    Action, BetTier, CountingStrategy, Deviation, Strategy, StrategyError, TableStrategy,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StrategyFile {
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub decide_insurance: bool,
    #[serde(default)]
    pub actions: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub counting_enabled: bool,
    #[serde(default)]
    pub deviations: HashMap<String, DeviationEntry>,
    #[serde(default)]
    pub bet_ramp: Vec<BetRampEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviationEntry {
    pub threshold: i32,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BetRampEntry {
    pub min_true_count: i32,
    pub multiplier: f64,
}

impl StrategyFile {
    /// Turns the file into a table strategy, wrapped in a counting strategy
    /// when counting is enabled.
    pub fn into_strategy(self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        let fallback = match self.fallback.as_deref() {
            Some(text) if !text.trim().is_empty() => parse_action("fallback", text)?,
            _ => return Err(StrategyError::MissingFallback(name.to_string())),
        };
        let actions = self
            .actions
            .into_iter()
            .map(|(key, texts)| {
                let list = texts
                    .iter()
                    .map(|text| parse_action(&key, text))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((key, list))
            })
            .collect::<Result<HashMap<_, _>, StrategyError>>()?;
        let table = TableStrategy::new(name, actions, fallback, self.decide_insurance)?;
        if !self.counting_enabled {
            return Ok(Box::new(table));
        }

        let deviations = self
            .deviations
            .into_iter()
            .map(|(key, entry)| {
                let action = parse_action(&key, &entry.action)?;
                Ok((
                    key,
                    Deviation {
                        threshold: entry.threshold,
                        action,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>, StrategyError>>()?;
        let bet_ramp = self
            .bet_ramp
            .into_iter()
            .map(|entry| BetTier {
                min_true_count: entry.min_true_count,
                multiplier: entry.multiplier,
            })
            .collect();
        Ok(Box::new(CountingStrategy::new(table, deviations, bet_ramp)?))
    }
}

fn parse_action(key: &str, text: &str) -> Result<Action, StrategyError> {
    text.trim()
        .to_lowercase()
        .parse()
        .map_err(|_| StrategyError::UnknownAction {
            key: key.to_string(),
            action: text.to_string(),
        })
}

#[derive(Debug, Error)]
pub enum StrategyFileError {
    #[error("failed to read strategy {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse strategy {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("invalid strategy {path:?}: {source}")]
    Invalid {
        #[source]
        source: StrategyError,
        path: PathBuf,
    },
}

/// Loads `<dir>/<name>.json`.
pub fn load_strategy(dir: &Path, name: &str) -> Result<Box<dyn Strategy>, StrategyFileError> {
    let path = dir.join(format!("{}.json", name));
    let file = File::open(&path).map_err(|source| StrategyFileError::Read {
        source,
        path: path.clone(),
    })?;
    let strategy_file: StrategyFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| StrategyFileError::Parse {
            source,
            path: path.clone(),
        })?;
    strategy_file
        .into_strategy(name)
        .map_err(|source| StrategyFileError::Invalid { source, path })
}
