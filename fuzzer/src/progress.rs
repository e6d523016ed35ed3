use std::io::Write;

use tlafuzz_graph::Variant;

use crate::comparator::VariantResult;

/// Snapshot passed to the campaign observer after every trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialProgress<'a> {
    pub variant: Variant,
    /// 1-based.
    pub trial: u32,
    pub budget: u32,
    pub oracle: &'a str,
    pub result: &'a VariantResult,
}

impl TrialProgress<'_> {
    /// Share of candidate executions in this variant that agreed so far.
    pub fn pass_rate(&self) -> f64 {
        let (passes, trials) = self
            .result
            .candidates
            .iter()
            .fold((0u32, 0u32), |(p, t), c| (p + c.stats.passes, t + c.stats.trials));
        if trials == 0 {
            return 100.0;
        }
        f64::from(passes) * 100.0 / f64::from(trials)
    }

    /// One status line: trial count, a mark per strategy and the pass rate.
    pub fn line(&self) -> String {
        let runs = if self.trial == 1 { "run" } else { "runs" };
        let mut line = format!(
            "{}/{} {} ({}): ✅ {}",
            self.trial,
            self.budget,
            runs,
            self.variant.label(),
            self.oracle
        );
        for candidate in &self.result.candidates {
            let mark = if candidate.counterexample.is_some() {
                "🚫"
            } else {
                "✅"
            };
            line.push_str(&format!("  {} {}", mark, candidate.descriptor.name));
        }
        line.push_str(&format!("  [{:.1}% agree]", self.pass_rate()));
        line
    }
}

/// Rewrites the current terminal line on stderr after every trial.
#[derive(Debug, Default)]
pub struct ProgressLine {
    open: bool,
}

impl ProgressLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, progress: &TrialProgress<'_>) {
        let mut stderr = std::io::stderr().lock();
        if progress.trial == 1 && self.open {
            let _ = writeln!(stderr);
        }
        let _ = write!(stderr, "\r{}", progress.line());
        let _ = stderr.flush();
        self.open = true;
    }

    /// Terminate the last line so later output starts on a fresh one.
    pub fn finish(&mut self) {
        if self.open {
            eprintln!();
            self.open = false;
        }
    }
}
