mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;

use common::*;
use tlafuzz::{Campaign, FixedCase, Outcome, RunMode, StrategySet};
use tlafuzz_graph::{GraphGenerator, Variant};
use tlafuzz_runtime::Trace;

const ACYCLIC: Variant = Variant::new(false, false);
const CYCLIC: Variant = Variant::new(true, false);

#[test]
fn test_swapped_events_are_captured_exactly() {
    let root = tempfile::tempdir().unwrap();
    let mut campaign = Campaign::new(
        config(root.path(), 1, &[ACYCLIC]),
        native_oracle(vec![Rigged::boxed("swapper", Rig::SwapFirstTwo)]),
        FixedCase(sync_chain()),
    );
    let report = campaign.run(|_| {}).unwrap();

    let candidate = &report.variants[0].candidates[0];
    let cx = candidate.counterexample.as_ref().unwrap();
    assert_eq!(cx.count, 1);
    assert_eq!(cx.trial, 1);
    assert_eq!(cx.case.modules, sync_chain().modules);

    let expected: Trace = ["0 before", "1 before", "2 before"].into_iter().collect();
    let observed: Trace = ["1 before", "0 before", "2 before"].into_iter().collect();
    assert_eq!(cx.expected, Outcome::Trace(expected.clone()));
    assert_eq!(cx.observed, Outcome::Trace(observed.clone()));

    let differing: Vec<usize> = (0..expected.len())
        .filter(|&i| expected.events()[i] != observed.events()[i])
        .collect();
    assert_eq!(differing, vec![0, 1]);
}

#[test]
fn test_repeated_divergence_increments_count() {
    let root = tempfile::tempdir().unwrap();
    let mut campaign = Campaign::new(
        config(root.path(), 4, &[ACYCLIC]),
        native_oracle(vec![Rigged::boxed("swapper", Rig::SwapFirstTwo)]),
        FixedCase(sync_chain()),
    );
    let report = campaign.run(|_| {}).unwrap();
    let candidate = &report.variants[0].candidates[0];
    let cx = candidate.counterexample.as_ref().unwrap();
    assert_eq!(cx.count, 4);
    assert_eq!(cx.trial, 1);
    assert_eq!(candidate.stats.divergences, 4);
    assert_eq!(candidate.stats.passes, 0);
}

#[test]
fn test_pass_rates_over_fixed_budget() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path(), 300, &[ACYCLIC, CYCLIC]);
    cfg.keep_divergent = false;
    let mut campaign = Campaign::new(
        cfg,
        native_oracle(vec![Rigged::boxed("acyclic-only", Rig::FailOnCyclic)]),
        GraphGenerator::with_rng(StdRng::seed_from_u64(300), 10),
    );
    let report = campaign.run(|_| {}).unwrap();

    let acyclic = &report.variants[0];
    assert_eq!(acyclic.variant, ACYCLIC);
    assert_eq!(acyclic.trials_run, 300);
    assert_eq!(acyclic.candidates[0].stats.trials, 300);
    assert_eq!(acyclic.candidates[0].stats.pass_rate(), 100.0);
    assert!(acyclic.candidates[0].counterexample.is_none());

    let cyclic = &report.variants[1];
    assert_eq!(cyclic.trials_run, 300);
    let stats = cyclic.candidates[0].stats;
    assert_eq!(stats.pass_rate(), 0.0);
    assert_eq!(stats.divergences, 300);
    assert_eq!(stats.failures, 300);
    assert_eq!(cyclic.candidates[0].counterexample.as_ref().unwrap().count, 300);

    assert_eq!(entries(root.path()), 0);
}

#[test]
fn test_oracle_agrees_with_itself() {
    let root = tempfile::tempdir().unwrap();
    let mut campaign = Campaign::new(
        config(root.path(), 20, &Variant::ALL),
        native_oracle(vec![Rigged::boxed("native-again", Rig::Faithful)]),
        FixedCase(diamond()),
    );
    let report = campaign.run(|_| {}).unwrap();
    assert_eq!(report.counterexample_count(), 0);
    for variant in &report.variants {
        assert_eq!(variant.candidates[0].stats.passes, 20);
        assert!(!variant.stopped_early);
    }
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn test_identical_failures_agree() {
    let root = tempfile::tempdir().unwrap();
    let strategies = StrategySet {
        oracle: Rigged::boxed("oracle", Rig::AlwaysFail("boom")),
        candidates: vec![
            Rigged::boxed("same", Rig::AlwaysFail("boom")),
            Rigged::boxed("other", Rig::AlwaysFail("bang")),
            Rigged::boxed("working", Rig::Faithful),
        ],
    };
    let mut campaign = Campaign::new(
        config(root.path(), 3, &[ACYCLIC]),
        strategies,
        FixedCase(sync_chain()),
    );
    let report = campaign.run(|_| {}).unwrap();
    let candidates = &report.variants[0].candidates;

    assert_eq!(candidates[0].stats.passes, 3);
    assert_eq!(candidates[0].stats.failures, 3);
    assert!(candidates[0].counterexample.is_none());

    let other = candidates[1].counterexample.as_ref().unwrap();
    assert_eq!(other.expected, Outcome::Failure("boom".into()));
    assert_eq!(other.observed, Outcome::Failure("bang".into()));

    // A trace never equals a failure.
    assert_eq!(candidates[2].stats.divergences, 3);
    assert_eq!(candidates[2].stats.failures, 0);
}

#[test]
fn test_early_exit_stops_once_all_diverged() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path(), 50, &[ACYCLIC, CYCLIC]);
    cfg.mode = RunMode::EarlyExit;
    let mut trials_seen = Vec::new();
    let mut campaign = Campaign::new(
        cfg,
        native_oracle(vec![
            Rigged::boxed("broken", Rig::AlwaysFail("nope")),
            Rigged::boxed("swapper", Rig::SwapFirstTwo),
        ]),
        FixedCase(sync_chain()),
    );
    let report = campaign
        .run(|p| trials_seen.push((p.variant, p.trial)))
        .unwrap();

    for variant in &report.variants {
        assert_eq!(variant.trials_run, 1);
        assert!(variant.stopped_early);
        assert!(variant.all_diverged());
    }
    assert_eq!(trials_seen, vec![(ACYCLIC, 1), (CYCLIC, 1)]);
}

#[test]
fn test_early_exit_runs_full_budget_while_a_candidate_agrees() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path(), 5, &[ACYCLIC]);
    cfg.mode = RunMode::EarlyExit;
    let mut campaign = Campaign::new(
        cfg,
        native_oracle(vec![
            Rigged::boxed("broken", Rig::AlwaysFail("nope")),
            Rigged::boxed("faithful", Rig::Faithful),
        ]),
        FixedCase(sync_chain()),
    );
    let report = campaign.run(|_| {}).unwrap();
    let variant = &report.variants[0];
    assert_eq!(variant.trials_run, 5);
    assert!(!variant.stopped_early);
    assert_eq!(variant.candidates[0].counterexample.as_ref().unwrap().count, 5);
}

#[test]
fn test_scratch_kept_only_for_divergent_trials() {
    let root = tempfile::tempdir().unwrap();
    let mut campaign = Campaign::new(
        config(root.path(), 3, &[ACYCLIC]),
        native_oracle(vec![Rigged::boxed("swapper", Rig::SwapFirstTwo)]),
        FixedCase(sync_chain()),
    );
    let report = campaign.run(|_| {}).unwrap();
    assert_eq!(entries(root.path()), 3);

    let cx = report.variants[0].candidates[0]
        .counterexample
        .as_ref()
        .unwrap();
    let kept = cx.scratch_dir.as_ref().unwrap();
    assert!(kept.starts_with(root.path()));
    assert!(kept.join("native").join("2.mjs").is_file());
    assert!(kept.join("swapper").join("0.mjs").is_file());

    let clean = tempfile::tempdir().unwrap();
    let mut campaign = Campaign::new(
        config(clean.path(), 3, &[ACYCLIC]),
        native_oracle(vec![Rigged::boxed("faithful", Rig::Faithful)]),
        FixedCase(sync_chain()),
    );
    campaign.run(|_| {}).unwrap();
    assert_eq!(entries(clean.path()), 0);
}

#[test]
fn test_retention_can_be_disabled() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path(), 2, &[ACYCLIC]);
    cfg.keep_divergent = false;
    let mut campaign = Campaign::new(
        cfg,
        native_oracle(vec![Rigged::boxed("swapper", Rig::SwapFirstTwo)]),
        FixedCase(sync_chain()),
    );
    let report = campaign.run(|_| {}).unwrap();
    let cx = report.variants[0].candidates[0]
        .counterexample
        .as_ref()
        .unwrap();
    assert!(cx.scratch_dir.is_none());
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn test_builtin_campaign_runs_from_config() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path(), 5, &[ACYCLIC]);
    cfg.module_count = 4;
    cfg.keep_divergent = false;
    let mut campaign = Campaign::from_config(cfg).unwrap();
    let mut lines = Vec::new();
    let report = campaign.run(|p| lines.push(p.line())).unwrap();

    assert_eq!(report.oracle.name, "native");
    assert_eq!(report.variants[0].candidates.len(), 3);
    assert_eq!(lines.len(), 5);
    assert!(lines[4].starts_with("5/5 runs (acyclic): ✅ native"));
    for candidate in &report.variants[0].candidates {
        assert_eq!(candidate.stats.trials, 5);
        assert_eq!(
            candidate.stats.passes + candidate.stats.divergences,
            candidate.stats.trials
        );
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path(), 5, &[ACYCLIC]);
    cfg.candidates = vec!["native".into()];
    assert!(matches!(
        Campaign::from_config(cfg),
        Err(tlafuzz::FuzzError::Config(tlafuzz::ConfigError::OracleIsCandidate(_)))
    ));
}
