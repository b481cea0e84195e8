//! Run statistics: monotone counters, wall-clock time, memory, and the
//! string-map rendering external tooling consumes.

use memory_stats::memory_stats;
use std::collections::BTreeMap;
use std::time::Instant;

/// Statistics of one reachability run. Counters only ever grow.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    visited_states: u64,
    visited_transitions: u64,
    reachable: bool,
    start: Option<Instant>,
    end: Option<Instant>,
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    pub fn set_start_time(&mut self) {
        self.start = Some(Instant::now());
    }

    pub fn set_end_time(&mut self) {
        self.end = Some(Instant::now());
    }

    #[inline]
    pub fn incr_visited_states(&mut self) {
        self.visited_states += 1;
    }

    #[inline]
    pub fn incr_visited_transitions(&mut self) {
        self.visited_transitions += 1;
    }

    pub fn visited_states(&self) -> u64 {
        self.visited_states
    }

    pub fn visited_transitions(&self) -> u64 {
        self.visited_transitions
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Seconds between start and end; 0 when either is missing.
    pub fn running_time(&self) -> f64 {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.duration_since(start).as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Resident set size of the process in bytes, when the platform
    /// reports it.
    pub fn max_rss(&self) -> Option<usize> {
        memory_stats().map(|s| s.physical_mem)
    }

    /// The stats as a string map, keyed the way downstream tooling expects.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert(
            "RUNNING_TIME_SECONDS".to_string(),
            format!("{}", self.running_time()),
        );
        m.insert(
            "MEMORY_MAX_RSS".to_string(),
            self.max_rss()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-1".to_string()),
        );
        m.insert("VISITED_STATES".to_string(), self.visited_states.to_string());
        m.insert(
            "VISITED_TRANSITIONS".to_string(),
            self.visited_transitions.to_string(),
        );
        m.insert("REACHABLE".to_string(), self.reachable.to_string());
        m
    }
}
