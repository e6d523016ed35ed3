mod common;

use common::*;
use tlafuzz::report::{render_results_section, splice_results, RESULTS_HEADING};
use tlafuzz::{render_markdown, write_reports, Campaign, CampaignReport, FixedCase};
use tlafuzz_graph::Variant;

fn sample_report(root: &std::path::Path) -> CampaignReport {
    let mut campaign = Campaign::new(
        config(root, 2, &[Variant::new(false, false), Variant::new(true, false)]),
        native_oracle(vec![
            Rigged::boxed("swapper", Rig::SwapFirstTwo),
            Rigged::boxed("zz-faithful", Rig::Faithful),
            Rigged::boxed("aa-faithful", Rig::Faithful),
        ]),
        FixedCase(sync_chain()),
    );
    campaign.run(|_| {}).unwrap()
}

#[test]
fn test_markdown_ranks_and_shows_counterexamples() {
    let root = tempfile::tempdir().unwrap();
    let report = sample_report(root.path());
    let markdown = render_markdown(&report);

    assert!(markdown.starts_with(&format!("# tlafuzz report {}\n", report.run_id)));
    assert!(markdown.contains("- Oracle: `native` (ECMAScript module evaluation (TLA))"));
    assert!(markdown.contains("\n## acyclic\n"));
    assert!(markdown.contains("\n## cyclic\n"));

    let aa = markdown.find("| 1 | aa-faithful |").unwrap();
    let zz = markdown.find("| 2 | zz-faithful |").unwrap();
    let swapper = markdown.find("| 3 | swapper | rigged swapper | 0 | 2 | 0 | 0.0% |").unwrap();
    assert!(aa < zz && zz < swapper);

    assert!(markdown.contains("### 🚫 swapper (diverged 2 times)"));
    assert!(markdown.contains("`1.mjs`\n\n```js\ntlaTrace('1 before')\nimport \"./0.mjs\"\n```"));
    assert!(markdown.contains("Expected (native):\n\n```\n0 before\n1 before\n2 before\n```"));
    assert!(markdown.contains("Observed (swapper):\n\n```\n1 before\n0 before\n2 before\n```"));
    assert!(markdown.contains(&report.variants[0].candidates[0]
        .counterexample
        .as_ref()
        .unwrap()
        .fingerprint));
}

#[test]
fn test_json_report_round_trips() {
    let root = tempfile::tempdir().unwrap();
    let report = sample_report(root.path());
    let json = report.to_json().unwrap();
    let back: CampaignReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.run_id, report.run_id);
    assert_eq!(back.variants.len(), 2);
    assert_eq!(
        back.variants[1].candidates[0].counterexample.as_ref().unwrap().observed,
        report.variants[1].candidates[0].counterexample.as_ref().unwrap().observed
    );
}

#[test]
fn test_results_section() {
    let root = tempfile::tempdir().unwrap();
    let section = render_results_section(&sample_report(root.path()));
    assert!(section.starts_with(RESULTS_HEADING));
    assert!(section.contains(
        "\nAcyclic:\n\n* rigged swapper: 🚫 Incorrect\n* rigged zz-faithful: ✅ Correct\n* rigged aa-faithful: ✅ Correct\n"
    ));
    assert!(section.contains("\nCyclic:\n\n* rigged swapper: 🚫 Incorrect\n"));
}

#[test]
fn test_splice_replaces_tail_only() {
    let readme = "# Project\n\nIntro.\n\n## Current results\n\nstale\n";
    let updated = splice_results(readme, "## Current results\n\nfresh\n").unwrap();
    assert_eq!(updated, "# Project\n\nIntro.\n\n## Current results\n\nfresh\n");
    assert!(splice_results("# No section\n", "x").is_none());
}

#[test]
fn test_write_reports() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let report = sample_report(root.path());

    let readme = out.path().join("README.md");
    std::fs::write(&readme, "# tla\n\n## Current results\n\nold\n").unwrap();
    let untouched = out.path().join("OTHER.md");
    std::fs::write(&untouched, "# nothing here\n").unwrap();

    let mut cfg = config(root.path(), 2, &Variant::ALL);
    cfg.report_path = out.path().join("report.md");
    cfg.json_report = Some(out.path().join("report.json"));
    cfg.readme = Some(readme.clone());
    let written = write_reports(&report, &cfg).unwrap();
    assert_eq!(written.len(), 3);
    assert!(std::fs::read_to_string(&cfg.report_path)
        .unwrap()
        .contains("swapper"));
    let readme_text = std::fs::read_to_string(&readme).unwrap();
    assert!(readme_text.starts_with("# tla\n\n## Current results\n"));
    assert!(!readme_text.contains("old"));

    cfg.readme = Some(untouched.clone());
    cfg.json_report = None;
    let written = write_reports(&report, &cfg).unwrap();
    assert_eq!(written, vec![cfg.report_path.clone()]);
    assert_eq!(
        std::fs::read_to_string(&untouched).unwrap(),
        "# nothing here\n"
    );

    cfg.report_path = out.path().join("missing").join("report.md");
    assert!(matches!(
        write_reports(&report, &cfg),
        Err(tlafuzz::FuzzError::Report { .. })
    ));
}
