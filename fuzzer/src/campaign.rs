use chrono::Utc;
use rand::Rng;
use tracing::{debug, info};

use tlafuzz_graph::{GraphGenerator, TestCase, Variant};

use crate::comparator::{VariantResult, Verdict};
use crate::config::{FuzzConfig, RunMode, StrategySet};
use crate::error::FuzzError;
use crate::executor::Executor;
use crate::progress::TrialProgress;
use crate::report::CampaignReport;
use crate::scratch::TrialDir;

/// Supplies one test case per trial.
pub trait CaseSource {
    fn next_case(&mut self, variant: Variant) -> TestCase;
}

impl<R: Rng> CaseSource for GraphGenerator<R> {
    fn next_case(&mut self, variant: Variant) -> TestCase {
        self.generate(variant)
    }
}

/// Replays one fixed test case, relabelled with the requested variant.
#[derive(Debug, Clone)]
pub struct FixedCase(pub TestCase);

impl CaseSource for FixedCase {
    fn next_case(&mut self, variant: Variant) -> TestCase {
        TestCase {
            variant,
            modules: self.0.modules.clone(),
        }
    }
}

/// The differential fuzzing loop: per variant, generate a case, run the
/// oracle, run every candidate and compare.
pub struct Campaign<S = GraphGenerator> {
    config: FuzzConfig,
    strategies: StrategySet,
    source: S,
    executor: Executor,
}

impl Campaign<GraphGenerator> {
    /// Resolve strategies from the catalogue and generate random graphs.
    pub fn from_config(config: FuzzConfig) -> Result<Self, FuzzError> {
        let strategies = config.strategies()?;
        let source = GraphGenerator::new(config.module_count);
        Ok(Campaign::new(config, strategies, source))
    }
}

impl<S: CaseSource> Campaign<S> {
    pub fn new(config: FuzzConfig, strategies: StrategySet, source: S) -> Self {
        Campaign {
            config,
            strategies,
            source,
            executor: Executor::new(),
        }
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    /// Run every configured variant. `observer` sees each completed trial.
    pub fn run(
        &mut self,
        mut observer: impl FnMut(&TrialProgress<'_>),
    ) -> Result<CampaignReport, FuzzError> {
        let started_at = Utc::now();
        let variants = self.config.variants.clone();
        let mut results = Vec::with_capacity(variants.len());
        for variant in variants {
            results.push(self.run_variant(variant, &mut observer)?);
        }
        Ok(CampaignReport {
            run_id: started_at.format("%Y%m%dT%H%M%SZ").to_string(),
            started_at,
            finished_at: Utc::now(),
            mode: self.config.mode,
            trial_budget: self.config.trials,
            module_count: self.config.module_count,
            oracle: self.strategies.oracle.descriptor().clone(),
            variants: results,
        })
    }

    fn run_variant(
        &mut self,
        variant: Variant,
        observer: &mut impl FnMut(&TrialProgress<'_>),
    ) -> Result<VariantResult, FuzzError> {
        let budget = self.config.trials;
        info!(variant = %variant, trials = budget, mode = %self.config.mode, "variant started");

        let mut result = VariantResult::new(
            variant,
            self.strategies
                .candidates
                .iter()
                .map(|s| s.descriptor().clone()),
        );
        let oracle = self.strategies.oracle.as_ref();

        for trial in 1..=budget {
            let case = self.source.next_case(variant);
            let scratch = TrialDir::create(self.config.scratch_root.as_deref(), &case, trial)?;

            let expected = self
                .executor
                .run(oracle, &case, &scratch.strategy_dir(oracle.name()));

            let mut captured = Vec::new();
            let mut diverged = false;
            for (idx, candidate) in self.strategies.candidates.iter().enumerate() {
                let observed =
                    self.executor
                        .run(candidate.as_ref(), &case, &scratch.strategy_dir(candidate.name()));
                if let Verdict::Diverged { first } =
                    result.record(idx, &case, trial, &expected, observed)
                {
                    diverged = true;
                    debug!(
                        variant = %variant,
                        trial,
                        candidate = candidate.name(),
                        first,
                        "candidate diverged from oracle"
                    );
                    if first {
                        captured.push(idx);
                    }
                }
            }

            if diverged && self.config.keep_divergent {
                let kept = scratch.keep();
                debug!(path = %kept.display(), "retained scratch directory");
                for idx in captured {
                    if let Some(cx) = result.candidates[idx].counterexample.as_mut() {
                        cx.scratch_dir = Some(kept.clone());
                    }
                }
            } else {
                scratch.discard();
            }

            result.trials_run = trial;
            observer(&TrialProgress {
                variant,
                trial,
                budget,
                oracle: oracle.name(),
                result: &result,
            });

            if self.config.mode == RunMode::EarlyExit && result.all_diverged() {
                result.stopped_early = trial < budget;
                break;
            }
        }

        let divergent = result
            .candidates
            .iter()
            .filter(|c| c.counterexample.is_some())
            .count();
        info!(
            variant = %variant,
            trials = result.trials_run,
            divergent_candidates = divergent,
            stopped_early = result.stopped_early,
            "variant finished"
        );
        Ok(result)
    }
}
