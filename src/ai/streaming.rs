//! Streaming-response reconciliation.
//!
//! Model streams are ambiguous about chunk shape: some providers emit
//! cumulative chunks (each chunk contains all prior text), some emit deltas,
//! and some alternate mid-stream. [`reconcile`] classifies every chunk
//! against the previous one and converges both shapes into a single growing
//! display string without duplication.
//!
//! [`RenderGate`] batches the resulting updates so the UI sees at most one
//! new display string per animation frame, whatever the chunk arrival rate.

use crate::error::{Error, Result};

/// Classify one raw chunk and fold it into the display string.
///
/// Returns the new `(displayed, prior_raw)` pair. If `new_raw` starts with
/// `prior_raw` the provider is cumulative: only the suffix past `prior_raw`
/// is appended and the raw chunk becomes the new baseline. Otherwise the
/// chunk is a delta: it is appended verbatim and the *accumulated display
/// string* becomes the baseline, so that a provider switching back to
/// cumulative chunks re-enters the prefix branch instead of duplicating
/// everything it already sent.
pub fn reconcile(prior_displayed: &str, prior_raw: &str, new_raw: &str) -> (String, String) {
    if new_raw.starts_with(prior_raw) {
        let mut displayed = String::with_capacity(prior_displayed.len() + new_raw.len());
        displayed.push_str(prior_displayed);
        displayed.push_str(&new_raw[prior_raw.len()..]);
        (displayed, new_raw.to_string())
    } else {
        let mut displayed = String::with_capacity(prior_displayed.len() + new_raw.len());
        displayed.push_str(prior_displayed);
        displayed.push_str(new_raw);
        let raw = displayed.clone();
        (displayed, raw)
    }
}

/// Folds a whole response stream through [`reconcile`].
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    displayed: String,
    prior_raw: String,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk and return the current display string.
    pub fn push(&mut self, chunk: &str) -> &str {
        let (displayed, raw) = reconcile(&self.displayed, &self.prior_raw, chunk);
        self.displayed = displayed;
        self.prior_raw = raw;
        &self.displayed
    }

    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// Close the stream. Whitespace-only output is a failed generation.
    pub fn finish(self) -> Result<String> {
        if self.displayed.trim().is_empty() {
            Err(Error::EmptyGeneration)
        } else {
            Ok(self.displayed)
        }
    }
}

/// Coalesces display updates to at most one per rendering frame.
///
/// `offer` records the latest candidate; `take` hands it out once per frame
/// tick. Intermediate states between ticks are dropped in favor of the
/// latest (deliberate backpressure), and re-offering an identical string
/// produces no update at all, so rendering stays idempotent.
#[derive(Debug, Default)]
pub struct RenderGate {
    pending: Option<String>,
    last_emitted: Option<String>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest display candidate, replacing any pending one.
    pub fn offer(&mut self, displayed: String) {
        if self.last_emitted.as_deref() == Some(displayed.as_str()) {
            self.pending = None;
            return;
        }
        self.pending = Some(displayed);
    }

    /// Drain the pending update, if any. Called once per frame tick; a
    /// pending update left at stream end is superseded by the terminal
    /// event and never rendered.
    pub fn take(&mut self) -> Option<String> {
        let update = self.pending.take()?;
        self.last_emitted = Some(update.clone());
        Some(update)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&str]) -> ChunkAccumulator {
        let mut acc = ChunkAccumulator::new();
        for chunk in chunks {
            acc.push(chunk);
        }
        acc
    }

    #[test]
    fn cumulative_stream_ends_at_last_chunk() {
        let acc = run(&["The", "The qu", "The quick", "The quick fox"]);
        assert_eq!(acc.displayed(), "The quick fox");
        assert_eq!(acc.finish().unwrap(), "The quick fox");
    }

    #[test]
    fn incremental_stream_concatenates() {
        let acc = run(&["alpha ", "beta ", "gamma"]);
        assert_eq!(acc.displayed(), "alpha beta gamma");
    }

    #[test]
    fn duplicate_cumulative_chunk_adds_nothing() {
        let acc = run(&["hello", "hello", "hello world"]);
        assert_eq!(acc.displayed(), "hello world");
    }

    #[test]
    fn provider_may_alternate_shapes_mid_stream() {
        // Cumulative run, then a delta, then cumulative again relative to
        // the accumulated text. The delta branch rebases the comparison
        // baseline on the display string, so the final cumulative chunk is
        // recognized as a superset prefix and only its tail is appended.
        let acc = run(&["Hel", "Hello", " wor", "Hello world"]);
        assert_eq!(acc.displayed(), "Hello world");
    }

    #[test]
    fn first_chunk_goes_through_the_prefix_branch() {
        // Every string starts with the empty baseline.
        let (displayed, raw) = reconcile("", "", "first");
        assert_eq!(displayed, "first");
        assert_eq!(raw, "first");
    }

    #[test]
    fn whitespace_only_generation_is_an_error() {
        let acc = run(&["  ", "\n\t", " "]);
        assert!(matches!(acc.finish(), Err(Error::EmptyGeneration)));

        let empty = ChunkAccumulator::new();
        assert!(matches!(empty.finish(), Err(Error::EmptyGeneration)));
    }

    #[test]
    fn gate_keeps_only_the_latest_pending_update() {
        let mut gate = RenderGate::new();
        gate.offer("a".into());
        gate.offer("ab".into());
        gate.offer("abc".into());
        // One frame tick: only the latest state is observable.
        assert_eq!(gate.take().as_deref(), Some("abc"));
        assert_eq!(gate.take(), None);
    }

    #[test]
    fn gate_suppresses_identical_rerenders() {
        let mut gate = RenderGate::new();
        gate.offer("same".into());
        assert_eq!(gate.take().as_deref(), Some("same"));
        gate.offer("same".into());
        assert!(!gate.has_pending());
        assert_eq!(gate.take(), None);

        gate.offer("changed".into());
        assert_eq!(gate.take().as_deref(), Some("changed"));
    }
}
