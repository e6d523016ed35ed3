use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tlafuzz_graph::{Variant, DEFAULT_MODULE_COUNT};
use tlafuzz_strategies::{by_name, flattened, inline_await, native, registry, Strategy};

use crate::error::ConfigError;

pub const DEFAULT_TRIALS: u32 = 300;
pub const DEFAULT_REPORT_PATH: &str = "tlafuzz-report.md";

/// How a variant's trial budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Run every trial and report pass rates.
    #[default]
    Fixed,
    /// Stop a variant once every candidate has diverged at least once.
    EarlyExit,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Fixed => write!(f, "fixed"),
            RunMode::EarlyExit => write!(f, "early-exit"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(RunMode::Fixed),
            "early-exit" | "early_exit" => Ok(RunMode::EarlyExit),
            other => Err(format!("unknown run mode: {other}")),
        }
    }
}

/// Settings for one fuzzing campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    pub trials: u32,
    pub module_count: usize,
    pub mode: RunMode,
    pub variants: Vec<Variant>,
    pub oracle: String,
    pub candidates: Vec<String>,
    /// Parent of the per-trial scratch directories; system temp when unset.
    pub scratch_root: Option<PathBuf>,
    pub keep_divergent: bool,
    pub report_path: PathBuf,
    pub json_report: Option<PathBuf>,
    pub readme: Option<PathBuf>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        FuzzConfig {
            trials: DEFAULT_TRIALS,
            module_count: DEFAULT_MODULE_COUNT,
            mode: RunMode::Fixed,
            variants: Variant::ALL.to_vec(),
            oracle: native::NAME.to_string(),
            candidates: vec![
                registry::NAME.to_string(),
                inline_await::NAME.to_string(),
                flattened::NAME.to_string(),
            ],
            scratch_root: None,
            keep_divergent: true,
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            json_report: None,
            readme: None,
        }
    }
}

impl FuzzConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FuzzConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.module_count == 0 {
            return Err(ConfigError::ZeroModules);
        }
        if self.variants.is_empty() {
            return Err(ConfigError::NoVariants);
        }
        if self.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        if by_name(&self.oracle).is_none() {
            return Err(ConfigError::UnknownStrategy(self.oracle.clone()));
        }
        let mut seen = BTreeSet::new();
        for name in &self.candidates {
            if by_name(name).is_none() {
                return Err(ConfigError::UnknownStrategy(name.clone()));
            }
            if *name == self.oracle {
                return Err(ConfigError::OracleIsCandidate(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateCandidate(name.clone()));
            }
        }
        Ok(())
    }

    /// Validate, then resolve the oracle and candidates from the built-in
    /// catalogue, preserving the configured candidate order.
    pub fn strategies(&self) -> Result<StrategySet, ConfigError> {
        self.validate()?;
        let lookup =
            |name: &str| by_name(name).ok_or_else(|| ConfigError::UnknownStrategy(name.into()));
        let oracle = lookup(&self.oracle)?;
        let candidates = self
            .candidates
            .iter()
            .map(|n| lookup(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StrategySet { oracle, candidates })
    }
}

/// The active oracle and the ordered candidates compared against it.
pub struct StrategySet {
    pub oracle: Box<dyn Strategy>,
    pub candidates: Vec<Box<dyn Strategy>>,
}
