//! The part of the association table a single recompute may replace.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("exactly one of crawler selector or benchmark id must be supplied")]
pub struct InvalidScopeError;

/// Scope of a match recompute.
///
/// `Crawler` covers every association of the crawler's products against all
/// benchmarks; `Benchmark` covers every association of one benchmark against
/// all products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchScope {
    Crawler(String),
    Benchmark(i32),
}

impl MatchScope {
    /// Builds a scope from optional caller arguments.
    ///
    /// Supplying both or neither is rejected.
    pub fn from_parts(
        crawler_selector: Option<&str>,
        benchmark_id: Option<i32>,
    ) -> Result<Self, InvalidScopeError> {
        match (crawler_selector, benchmark_id) {
            (Some(selector), None) => Ok(Self::Crawler(selector.to_string())),
            (None, Some(id)) => Ok(Self::Benchmark(id)),
            _ => Err(InvalidScopeError),
        }
    }
}

impl fmt::Display for MatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawler(selector) => write!(f, "crawler {selector}"),
            Self::Benchmark(id) => write!(f, "benchmark {id}"),
        }
    }
}
