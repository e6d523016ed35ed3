use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tlafuzz_graph::{TestCase, Variant};
use tlafuzz_strategies::StrategyDescriptor;

use crate::executor::Outcome;

/// The first mismatching test case seen for a (variant, candidate) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterexample {
    pub case: TestCase,
    pub fingerprint: String,
    pub expected: Outcome,
    pub observed: Outcome,
    /// Trials in this variant where the candidate diverged, this one included.
    pub count: u32,
    /// 1-based trial at which the case was captured.
    pub trial: u32,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateStats {
    pub trials: u32,
    pub passes: u32,
    pub divergences: u32,
    /// Trials where the candidate itself produced a failure.
    pub failures: u32,
}

impl CandidateStats {
    /// Percentage of trials that agreed with the oracle.
    pub fn pass_rate(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        f64::from(self.passes) * 100.0 / f64::from(self.trials)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub descriptor: StrategyDescriptor,
    pub stats: CandidateStats,
    pub counterexample: Option<Counterexample>,
}

/// Verdict for one candidate in one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Agree,
    /// `first` is set when this trial created the counterexample.
    Diverged { first: bool },
}

/// Exact comparison. Failures compare by description, and a trace never
/// equals a failure.
pub fn agrees(expected: &Outcome, observed: &Outcome) -> bool {
    expected == observed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant: Variant,
    pub trials_run: u32,
    pub stopped_early: bool,
    pub candidates: Vec<CandidateResult>,
}

impl VariantResult {
    pub fn new(variant: Variant, descriptors: impl IntoIterator<Item = StrategyDescriptor>) -> Self {
        VariantResult {
            variant,
            trials_run: 0,
            stopped_early: false,
            candidates: descriptors
                .into_iter()
                .map(|descriptor| CandidateResult {
                    descriptor,
                    stats: CandidateStats::default(),
                    counterexample: None,
                })
                .collect(),
        }
    }

    /// Compare one candidate's outcome against the oracle's and update its
    /// tallies and counterexample.
    pub fn record(
        &mut self,
        candidate: usize,
        case: &TestCase,
        trial: u32,
        expected: &Outcome,
        observed: Outcome,
    ) -> Verdict {
        let result = &mut self.candidates[candidate];
        result.stats.trials += 1;
        if observed.is_failure() {
            result.stats.failures += 1;
        }
        if agrees(expected, &observed) {
            result.stats.passes += 1;
            return Verdict::Agree;
        }

        result.stats.divergences += 1;
        match &mut result.counterexample {
            Some(existing) => {
                existing.count += 1;
                Verdict::Diverged { first: false }
            }
            None => {
                result.counterexample = Some(Counterexample {
                    case: case.clone(),
                    fingerprint: case.fingerprint(),
                    expected: expected.clone(),
                    observed,
                    count: 1,
                    trial,
                    scratch_dir: None,
                });
                Verdict::Diverged { first: true }
            }
        }
    }

    /// Whether every candidate has a counterexample.
    pub fn all_diverged(&self) -> bool {
        self.candidates.iter().all(|c| c.counterexample.is_some())
    }

    /// Candidates by ascending divergence count, ties broken by name.
    pub fn ranking(&self) -> Vec<&CandidateResult> {
        let mut ranked: Vec<&CandidateResult> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| {
            a.stats
                .divergences
                .cmp(&b.stats.divergences)
                .then_with(|| a.descriptor.name.cmp(&b.descriptor.name))
        });
        ranked
    }
}
