use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tlafuzz::{Campaign, Executor, FuzzConfig, ProgressLine, RunMode};
use tlafuzz_graph::{GraphGenerator, Variant, DEFAULT_MODULE_COUNT};
use tlafuzz_strategies::builtin;

#[derive(Parser)]
#[command(
    name = "tlafuzz",
    about = "Differential fuzzer for module evaluation order"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a fuzzing campaign and write the report.
    Run {
        /// JSON config file. Flags below override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Trials per variant.
        #[arg(short, long)]
        trials: Option<u32>,
        /// Modules per generated graph.
        #[arg(long)]
        modules: Option<usize>,
        /// "fixed" or "early-exit".
        #[arg(long)]
        mode: Option<RunMode>,
        /// Variant label, repeatable (acyclic, acyclic-deferred, cyclic, cyclic-deferred).
        #[arg(long = "variant")]
        variants: Vec<Variant>,
        /// Oracle strategy name.
        #[arg(long)]
        oracle: Option<String>,
        /// Candidate strategy names, comma-separated.
        #[arg(long, value_delimiter = ',')]
        candidates: Vec<String>,
        /// Parent directory for per-trial scratch directories.
        #[arg(long)]
        scratch_root: Option<PathBuf>,
        /// Remove scratch directories even when a candidate diverged.
        #[arg(long)]
        discard_divergent: bool,
        /// Markdown report path.
        #[arg(short, long)]
        report: Option<PathBuf>,
        /// Also write the report as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
        /// README whose "Current results" section is rewritten.
        #[arg(long)]
        readme: Option<PathBuf>,
    },
    /// List the built-in strategies.
    Strategies,
    /// Generate one graph and print every strategy's trace for it.
    Sample {
        /// Variant label.
        #[arg(long, default_value = "acyclic")]
        variant: Variant,
        /// Modules in the graph.
        #[arg(long, default_value_t = DEFAULT_MODULE_COUNT)]
        modules: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TLAFUZZ_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Run {
            config,
            trials,
            modules,
            mode,
            variants,
            oracle,
            candidates,
            scratch_root,
            discard_divergent,
            report,
            json,
            readme,
        } => {
            let mut cfg = match config {
                Some(path) => FuzzConfig::load(&path)?,
                None => FuzzConfig::default(),
            };
            if let Some(trials) = trials {
                cfg.trials = trials;
            }
            if let Some(modules) = modules {
                cfg.module_count = modules;
            }
            if let Some(mode) = mode {
                cfg.mode = mode;
            }
            if !variants.is_empty() {
                cfg.variants = variants;
            }
            if let Some(oracle) = oracle {
                cfg.oracle = oracle;
            }
            if !candidates.is_empty() {
                cfg.candidates = candidates;
            }
            if scratch_root.is_some() {
                cfg.scratch_root = scratch_root;
            }
            if discard_divergent {
                cfg.keep_divergent = false;
            }
            if let Some(report) = report {
                cfg.report_path = report;
            }
            if json.is_some() {
                cfg.json_report = json;
            }
            if readme.is_some() {
                cfg.readme = readme;
            }

            let mut campaign = Campaign::from_config(cfg)?;
            let mut progress = ProgressLine::new();
            let result = campaign.run(|p| progress.update(p));
            progress.finish();
            let report = result?;

            for variant in &report.variants {
                for candidate in &variant.candidates {
                    if let Some(cx) = &candidate.counterexample {
                        println!(
                            "🚫 {} ({}): diverged in {}/{} trials, first at trial {}",
                            candidate.descriptor.name,
                            variant.variant,
                            cx.count,
                            candidate.stats.trials,
                            cx.trial
                        );
                    }
                }
            }
            for path in tlafuzz::write_reports(&report, campaign.config())? {
                println!("wrote {}", path.display());
            }
        }
        Command::Strategies => {
            for strategy in builtin() {
                let descriptor = strategy.descriptor();
                println!("{:<14} {}", descriptor.name, descriptor.version);
            }
        }
        Command::Sample { variant, modules } => {
            let case = GraphGenerator::new(modules).generate(variant);
            for (file, source) in case.sources() {
                println!("[{file}]");
                for line in source.lines() {
                    println!("  {line}");
                }
                println!();
            }
            let scratch = tempfile::tempdir()?;
            let mut executor = Executor::new();
            for strategy in builtin() {
                let dir = scratch.path().join(strategy.name());
                let outcome = executor.run(strategy.as_ref(), &case, &dir);
                println!("[{}]", strategy.name());
                for line in outcome.render().lines() {
                    println!("  {line}");
                }
                println!();
            }
        }
    }
    Ok(())
}
