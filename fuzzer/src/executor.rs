use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tlafuzz_graph::TestCase;
use tlafuzz_runtime::{Trace, TraceSink};
use tlafuzz_strategies::{Strategy, StrategyError};

/// What one strategy produced for one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    Trace(Trace),
    /// Build or execution failed; compared by description.
    Failure(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn render(&self) -> String {
        match self {
            Outcome::Trace(trace) => trace.render(),
            Outcome::Failure(description) => description.clone(),
        }
    }
}

thread_local! {
    /// Set while a strategy runs under `catch_unwind` on this thread.
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

static INSTALL_HOOK: Once = Once::new();

/// Wrap the process panic hook so panics caught by [`Executor::run`] are
/// logged at debug level instead of printed to stderr. Panics anywhere else
/// still reach the previous hook.
fn install_quiet_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if QUIET.with(Cell::get) {
                tracing::debug!(%info, "strategy panicked");
            } else {
                previous(info);
            }
        }));
    });
}

/// Runs one strategy at a time against a sink it owns exclusively.
#[derive(Debug, Default)]
pub struct Executor {
    sink: TraceSink,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and execute `strategy` for `case` inside `dir`. Errors and
    /// panics from the strategy become [`Outcome::Failure`].
    pub fn run(&mut self, strategy: &dyn Strategy, case: &TestCase, dir: &Path) -> Outcome {
        install_quiet_hook();
        let mut lease = self.sink.lease();

        QUIET.with(|q| q.set(true));
        let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), StrategyError> {
            std::fs::create_dir_all(dir)?;
            let mut artifact = strategy.build(case, dir)?;
            artifact.execute(&mut lease)
        }));
        QUIET.with(|q| q.set(false));

        match result {
            Ok(Ok(())) => Outcome::Trace(lease.finish()),
            Ok(Err(e)) => Outcome::Failure(e.to_string()),
            Err(payload) => Outcome::Failure(format!("panic: {}", panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".into()
    }
}
