//! Ordered fallback policy: try each candidate with its own timeout, first
//! success wins.
//!
//! Used for services with a fast local endpoint and a slower backup, so the
//! primary/fallback probing is not duplicated per service.

use serde::Serialize;
use std::time::Duration;

/// Availability of one candidate, as learned by probing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Untested,
    Available,
    Unavailable,
}

/// Outcome of running a [`FallbackChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    statuses: Vec<Availability>,
    selected: Option<usize>,
}

impl Resolution {
    /// Index of the first candidate that answered, if any.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn statuses(&self) -> &[Availability] {
        &self.statuses
    }

    pub fn is_exhausted(&self) -> bool {
        self.selected.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct FallbackChain<T> {
    candidates: Vec<(T, Duration)>,
}

impl<T> Default for FallbackChain<T> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }
}

impl<T> FallbackChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate tried after every candidate already in the chain.
    pub fn then(mut self, candidate: T, timeout: Duration) -> Self {
        self.candidates.push((candidate, timeout));
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.candidates.get(index).map(|(candidate, _)| candidate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(T, Duration)> {
        self.candidates.iter()
    }

    /// Run `attempt` over the candidates in order until one returns true.
    ///
    /// Candidates after the winner are left untested.
    pub fn resolve<F>(&self, mut attempt: F) -> Resolution
    where
        F: FnMut(&T, Duration) -> bool,
    {
        let mut statuses = vec![Availability::Untested; self.candidates.len()];
        for (index, (candidate, timeout)) in self.candidates.iter().enumerate() {
            if attempt(candidate, *timeout) {
                statuses[index] = Availability::Available;
                return Resolution {
                    statuses,
                    selected: Some(index),
                };
            }
            statuses[index] = Availability::Unavailable;
        }
        Resolution {
            statuses,
            selected: None,
        }
    }
}
