use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::positions::SLOT_COUNT_RANGE;

/// How collection and position identifiers are computed
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommitmentMode {
    /// Keccak-256 in process. Canonical.
    #[default]
    Local,
    /// Ask the conditional tokens contract for every identifier
    Oracle,
    /// Hash locally and verify each identifier against the contract
    CrossCheck,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file `{path}`")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file `{path}`")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(
        "default outcome slot count {count} is outside {:?}",
        SLOT_COUNT_RANGE
    )]
    DefaultSlotCount { count: u32 },
}

#[cfg_attr(feature = "clap", derive(clap::Args))]
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the LMDB environment
    #[cfg_attr(feature = "clap", arg(long, default_value = "outcome_ledger"))]
    pub data_dir: PathBuf,
    /// LMDB map size in bytes
    #[cfg_attr(feature = "clap", arg(long, default_value_t = Config::DEFAULT_MAP_SIZE))]
    pub map_size: usize,
    /// Slot count used when the oracle cannot report one
    #[cfg_attr(feature = "clap", arg(long, default_value_t = 2))]
    pub default_outcome_slot_count: u32,
    /// Largest number of atomic positions derived for a single market
    #[cfg_attr(feature = "clap", arg(long, default_value_t = 4096))]
    pub max_atomic_positions: usize,
    #[cfg_attr(feature = "clap", arg(long, value_enum, default_value_t))]
    pub commitment: CommitmentMode,
    /// Append a log row for every applied outcome-token transfer
    #[cfg_attr(
        feature = "clap",
        arg(long, default_value_t = true, action = clap::ArgAction::Set)
    )]
    pub transfer_log: bool,
}

impl Config {
    pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.to_owned(),
                source,
            })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| Error::Parse {
                path: path.to_owned(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let count = self.default_outcome_slot_count;
        if !SLOT_COUNT_RANGE.contains(&count) {
            return Err(Error::DefaultSlotCount { count });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("outcome_ledger"),
            map_size: Self::DEFAULT_MAP_SIZE,
            default_outcome_slot_count: 2,
            max_atomic_positions: 4096,
            commitment: CommitmentMode::Local,
            transfer_log: true,
        }
    }
}
