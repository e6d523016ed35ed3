//! Differential fuzzer for module evaluation order.
//!
//! A [`Campaign`] generates random module graphs, runs the oracle strategy
//! and every candidate on each, and records where their traces disagree.

pub mod campaign;
pub mod comparator;
pub mod config;
pub mod error;
pub mod executor;
pub mod progress;
pub mod report;
pub mod scratch;

pub use campaign::{Campaign, CaseSource, FixedCase};
pub use comparator::{CandidateResult, CandidateStats, Counterexample, VariantResult, Verdict};
pub use config::{FuzzConfig, RunMode, StrategySet};
pub use error::{ConfigError, FuzzError};
pub use executor::{Executor, Outcome};
pub use progress::{ProgressLine, TrialProgress};
pub use report::{render_markdown, write_reports, CampaignReport};
