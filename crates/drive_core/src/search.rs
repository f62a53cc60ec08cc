use std::time::Duration;

use crate::SearchHits;

/// Quiet period after the last keystroke before a query is issued.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    Pending,
    Resolved,
    Failed,
}

/// What the caller must do with the debounce timer after a keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    /// Re-arm the single debounce timer for `generation`.
    Arm { generation: u64, delay: Duration },
    /// Query became empty: cancel the timer, no request.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied,
    Failed(String),
    /// Response for a superseded request; dropped without surfacing an error.
    Stale,
}

/// The single active search. Every keystroke bumps `generation`; an issued
/// request carries its generation as the token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchSession {
    query: String,
    generation: u64,
    issued: Option<u64>,
    phase: SearchPhase,
    results: Option<SearchHits>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, text: &str) -> SearchStep {
        self.generation += 1;
        self.query = text.to_string();
        if text.trim().is_empty() {
            self.reset_results();
            return SearchStep::Cleared;
        }
        self.phase = SearchPhase::Debouncing;
        SearchStep::Arm {
            generation: self.generation,
            delay: SEARCH_DEBOUNCE,
        }
    }

    /// Debounce timer fired. Returns `(token, query)` to issue, if still current.
    pub fn debounce_elapsed(&mut self, generation: u64) -> Option<(u64, String)> {
        if generation != self.generation || self.phase != SearchPhase::Debouncing {
            return None;
        }
        self.issued = Some(generation);
        self.phase = SearchPhase::Pending;
        Some((generation, self.query.trim().to_string()))
    }

    pub fn resolve(&mut self, token: u64, result: Result<SearchHits, String>) -> SearchOutcome {
        if self.issued != Some(token) {
            return SearchOutcome::Stale;
        }
        let settled = token == self.generation;
        match result {
            Ok(hits) => {
                self.results = Some(hits);
                if settled {
                    self.phase = SearchPhase::Resolved;
                }
                SearchOutcome::Applied
            }
            Err(message) => {
                // Prior results stay on screen.
                if settled {
                    self.phase = SearchPhase::Failed;
                }
                SearchOutcome::Failed(message)
            }
        }
    }

    /// Invalidates the session; anything in flight becomes stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.query.clear();
        self.reset_results();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, SearchPhase::Debouncing | SearchPhase::Pending)
    }

    pub fn results(&self) -> Option<&SearchHits> {
        self.results.as_ref()
    }

    pub fn latest_issued(&self) -> Option<u64> {
        self.issued
    }

    fn reset_results(&mut self) {
        self.issued = None;
        self.phase = SearchPhase::Idle;
        self.results = None;
    }
}
