use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tlafuzz_strategies::StrategyDescriptor;

use crate::comparator::{Counterexample, VariantResult};
use crate::config::{FuzzConfig, RunMode};
use crate::error::FuzzError;

pub const RESULTS_HEADING: &str = "## Current results\n";

/// Everything a campaign observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mode: RunMode,
    pub trial_budget: u32,
    pub module_count: usize,
    pub oracle: StrategyDescriptor,
    pub variants: Vec<VariantResult>,
}

impl CampaignReport {
    pub fn counterexample_count(&self) -> usize {
        self.variants
            .iter()
            .flat_map(|v| &v.candidates)
            .filter(|c| c.counterexample.is_some())
            .count()
    }

    pub fn to_json(&self) -> Result<String, FuzzError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn render_markdown(report: &CampaignReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# tlafuzz report {}\n", report.run_id);
    let _ = writeln!(
        out,
        "- Oracle: `{}` ({})",
        report.oracle.name, report.oracle.version
    );
    let _ = writeln!(
        out,
        "- Mode: {}, budget {} trials per variant, {} modules per graph",
        report.mode, report.trial_budget, report.module_count
    );
    let _ = writeln!(
        out,
        "- Started {}, finished {}",
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339()
    );

    for variant in &report.variants {
        render_variant(&mut out, report, variant);
    }
    out
}

fn render_variant(out: &mut String, report: &CampaignReport, result: &VariantResult) {
    let _ = writeln!(out, "\n## {}\n", result.variant.label());
    let _ = write!(out, "Trials run: {}", result.trials_run);
    if result.stopped_early {
        out.push_str(" (stopped early: every candidate diverged)");
    }
    out.push_str("\n\n");

    out.push_str("| Rank | Strategy | Version | Passes | Divergences | Failures | Pass rate |\n");
    out.push_str("|---:|---|---|---:|---:|---:|---:|\n");
    for (rank, candidate) in result.ranking().iter().enumerate() {
        let stats = &candidate.stats;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {:.1}% |",
            rank + 1,
            candidate.descriptor.name,
            candidate.descriptor.version,
            stats.passes,
            stats.divergences,
            stats.failures,
            stats.pass_rate()
        );
    }

    let mut any = false;
    for candidate in result.ranking() {
        if let Some(cx) = &candidate.counterexample {
            any = true;
            render_counterexample(out, &report.oracle.name, &candidate.descriptor.name, cx);
        }
    }
    if !any {
        out.push_str("\nNo divergences.\n");
    }
}

fn render_counterexample(out: &mut String, oracle: &str, candidate: &str, cx: &Counterexample) {
    let times = if cx.count == 1 { "time" } else { "times" };
    let _ = writeln!(
        out,
        "\n### 🚫 {} (diverged {} {})\n",
        candidate, cx.count, times
    );
    let _ = writeln!(
        out,
        "Fingerprint `{}`, first seen in trial {}.",
        cx.fingerprint, cx.trial
    );
    if let Some(dir) = &cx.scratch_dir {
        let _ = writeln!(out, "Artifacts kept in `{}`.", dir.display());
    }
    for (file, source) in cx.case.sources() {
        let _ = writeln!(out, "\n`{file}`\n\n```js\n{}\n```", source.trim_end());
    }
    let _ = writeln!(
        out,
        "\nExpected ({oracle}):\n\n```\n{}\n```",
        cx.expected.render()
    );
    let _ = writeln!(
        out,
        "\nObserved ({candidate}):\n\n```\n{}\n```",
        cx.observed.render()
    );
}

/// The README results section: one Correct/Incorrect line per strategy
/// version, grouped by variant.
pub fn render_results_section(report: &CampaignReport) -> String {
    let mut out = String::from(RESULTS_HEADING);
    out.push('\n');
    out.push_str(
        "\"Correct\" here means that the strategy evaluates modules exactly like the oracle. \
         \"Incorrect\" here means that it evaluates them in a different order.\n",
    );
    for result in &report.variants {
        let label = result.variant.label();
        let mut heading = label.to_string();
        if let Some(first) = heading.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        let _ = writeln!(out, "\n{heading}:\n");
        for candidate in &result.candidates {
            let verdict = if candidate.counterexample.is_some() {
                "🚫 Incorrect"
            } else {
                "✅ Correct"
            };
            let _ = writeln!(out, "* {}: {}", candidate.descriptor.version, verdict);
        }
    }
    out
}

/// Replace everything from the results heading onward. Returns `None` when
/// the README has no such heading.
pub fn splice_results(readme: &str, section: &str) -> Option<String> {
    let index = readme.find(RESULTS_HEADING)?;
    let mut updated = readme[..index].to_string();
    updated.push_str(section);
    Some(updated)
}

fn write_file(path: &Path, contents: &str) -> Result<(), FuzzError> {
    std::fs::write(path, contents).map_err(|source| FuzzError::Report {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist the Markdown report and, when configured, the JSON report and the
/// README section. Returns the paths written.
pub fn write_reports(report: &CampaignReport, config: &FuzzConfig) -> Result<Vec<PathBuf>, FuzzError> {
    let mut written = Vec::new();

    write_file(&config.report_path, &render_markdown(report))?;
    written.push(config.report_path.clone());

    if let Some(path) = &config.json_report {
        write_file(path, &report.to_json()?)?;
        written.push(path.clone());
    }

    if let Some(path) = &config.readme {
        let readme = std::fs::read_to_string(path).map_err(|source| FuzzError::Report {
            path: path.clone(),
            source,
        })?;
        match splice_results(&readme, &render_results_section(report)) {
            Some(updated) => {
                write_file(path, &updated)?;
                written.push(path.clone());
            }
            None => tracing::warn!(
                path = %path.display(),
                "README has no results section; left unchanged"
            ),
        }
    }

    Ok(written)
}
