//! Per-request metrics and in-memory aggregates.
//!
//! Metrics observe the pipeline and never influence it. Nothing is
//! persisted; the recorder only keeps a bounded window of recent requests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;
use ulid::Ulid;

use rag_core::Strategy;

/// Number of recent requests kept for inspection.
const RECENT_CAPACITY: usize = 100;

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub analyze_ms: f64,
    pub retrieve_ms: f64,
    pub combine_ms: f64,
    pub assemble_ms: f64,
}

/// Counts and timings for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMetrics {
    pub request_id: Ulid,
    pub strategy: Strategy,
    pub chunks_scanned: usize,
    pub chunks_skipped: usize,
    pub chunks_after_filter: usize,
    pub chunks_selected: usize,
    pub duplicates_removed: usize,
    pub variants_used: usize,

    /// Share of query keywords present in at least one selected chunk.
    pub keyword_coverage: f32,

    pub timings: StageTimings,
    pub elapsed_ms: f64,
}

/// Read-only view of the aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub avg_chunks_analyzed: f64,
    pub avg_elapsed_ms: f64,

    /// Requests per strategy name.
    pub strategy_usage: BTreeMap<String, u64>,

    /// Most recent requests, oldest first.
    pub recent: Vec<RequestMetrics>,
}

#[derive(Debug, Default)]
struct MetricsState {
    total_queries: u64,
    total_chunks_analyzed: u64,
    total_elapsed_ms: f64,
    strategy_usage: BTreeMap<String, u64>,
    recent: VecDeque<RequestMetrics>,
}

/// Thread-safe recorder shared between requests.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    state: Mutex<MetricsState>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request.
    pub fn record(&self, metrics: RequestMetrics) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        state.total_queries += 1;
        state.total_chunks_analyzed += metrics.chunks_scanned as u64;
        state.total_elapsed_ms += metrics.elapsed_ms;
        *state
            .strategy_usage
            .entry(metrics.strategy.as_str().to_string())
            .or_default() += 1;

        if state.recent.len() == RECENT_CAPACITY {
            state.recent.pop_front();
        }
        state.recent.push_back(metrics);
    }

    /// Current aggregates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let (avg_chunks_analyzed, avg_elapsed_ms) = if state.total_queries == 0 {
            (0.0, 0.0)
        } else {
            let n = state.total_queries as f64;
            (
                state.total_chunks_analyzed as f64 / n,
                state.total_elapsed_ms / n,
            )
        };

        MetricsSnapshot {
            total_queries: state.total_queries,
            avg_chunks_analyzed,
            avg_elapsed_ms,
            strategy_usage: state.strategy_usage.clone(),
            recent: state.recent.iter().cloned().collect(),
        }
    }

    /// Reset all aggregates.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = MetricsState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(strategy: Strategy, scanned: usize) -> RequestMetrics {
        RequestMetrics {
            request_id: Ulid::new(),
            strategy,
            chunks_scanned: scanned,
            chunks_skipped: 0,
            chunks_after_filter: scanned,
            chunks_selected: 1,
            duplicates_removed: 0,
            variants_used: 0,
            keyword_coverage: 1.0,
            timings: StageTimings::default(),
            elapsed_ms: 2.0,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsRecorder::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_aggregates() {
        let recorder = MetricsRecorder::new();
        recorder.record(metrics(Strategy::Hybrid, 10));
        recorder.record(metrics(Strategy::Rerank, 20));
        recorder.record(metrics(Strategy::Hybrid, 30));

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_queries, 3);
        assert_eq!(snapshot.avg_chunks_analyzed, 20.0);
        assert_eq!(snapshot.avg_elapsed_ms, 2.0);
        assert_eq!(snapshot.strategy_usage.get("hybrid"), Some(&2));
        assert_eq!(snapshot.strategy_usage.get("rerank"), Some(&1));
        assert_eq!(snapshot.recent.len(), 3);
        assert_eq!(snapshot.recent[0].chunks_scanned, 10);

        recorder.reset();
        assert_eq!(recorder.snapshot().total_queries, 0);
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let recorder = MetricsRecorder::new();
        for i in 0..(RECENT_CAPACITY + 5) {
            recorder.record(metrics(Strategy::MultiQuery, i));
        }
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.recent.len(), RECENT_CAPACITY);
        assert_eq!(snapshot.recent[0].chunks_scanned, 5);
        assert_eq!(snapshot.total_queries, (RECENT_CAPACITY + 5) as u64);
    }
}
