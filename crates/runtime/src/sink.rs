use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// Ordered events produced by one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(pub Vec<String>);

impl Trace {
    pub fn events(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One event per line.
    pub fn render(&self) -> String {
        self.0.join("\n")
    }
}

impl<S: Into<String>> FromIterator<S> for Trace {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Trace(iter.into_iter().map(Into::into).collect())
    }
}

/// Append-only event log for a single run.
///
/// The only state an executing artifact can observe or mutate.
#[derive(Debug, Default)]
pub struct TraceSink {
    events: Vec<String>,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Take every recorded event, leaving the sink empty.
    pub fn drain(&mut self) -> Trace {
        Trace(std::mem::take(&mut self.events))
    }

    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Borrow the sink for one run. The sink is empty when the lease starts
    /// and is cleared again when the lease is dropped, whatever the outcome.
    pub fn lease(&mut self) -> SinkLease<'_> {
        self.reset();
        SinkLease { sink: self }
    }
}

/// Exclusive, self-resetting borrow of a [`TraceSink`].
pub struct SinkLease<'a> {
    sink: &'a mut TraceSink,
}

impl SinkLease<'_> {
    /// End the run and hand back its trace.
    pub fn finish(mut self) -> Trace {
        self.sink.drain()
    }
}

impl Deref for SinkLease<'_> {
    type Target = TraceSink;
    fn deref(&self) -> &TraceSink {
        self.sink
    }
}

impl DerefMut for SinkLease<'_> {
    fn deref_mut(&mut self) -> &mut TraceSink {
        self.sink
    }
}

impl Drop for SinkLease<'_> {
    fn drop(&mut self) {
        self.sink.reset();
    }
}
