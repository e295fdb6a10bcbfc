//! Error taxonomy for roadmap construction and retrieval
//!
//! Construction-path failures are recoverable (the offending sample is
//! discarded and the loop continues); retrieval-path failures are surfaced
//! to the caller. Internal invariant violations are fatal and are raised
//! as panics from the super-debug checks, never as a variant here.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use crate::graph::SparseVertex;

/// Failures surfaced by planner operations
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// Caller passed an argument outside its valid domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A vertex or state id is no longer live
    #[error("not found: {0}")]
    NotFound(String),

    /// Entry and exit vertices exist but no graph path connects them
    #[error("no roadmap path between entry vertex {start:?} and exit vertex {goal:?}")]
    Disconnected { start: SparseVertex, goal: SparseVertex },

    /// No graph vertex is visible from the query start or goal
    #[error("no visible roadmap neighbor for the {0} state")]
    NoEntry(&'static str),

    /// The caller's termination condition tripped mid-operation
    #[error("terminated by caller condition")]
    Timeout,

    /// The sampler or validity oracle exhausted its internal budget
    #[error("oracle failure: {0}")]
    OracleFailure(String),
}

impl PlanningError {
    /// Process exit code for tool wrappers around the library.
    pub fn exit_code(&self) -> i32 {
        match self {
            PlanningError::InvalidArgument(_) | PlanningError::NotFound(_) => 2,
            PlanningError::OracleFailure(_) => 3,
            PlanningError::Disconnected { .. } | PlanningError::NoEntry(_) => 4,
            PlanningError::Timeout => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_tool_contract() {
        assert_eq!(PlanningError::InvalidArgument("x".into()).exit_code(), 2);
        assert_eq!(PlanningError::OracleFailure("sampler".into()).exit_code(), 3);
        assert_eq!(
            PlanningError::Disconnected { start: SparseVertex(4), goal: SparseVertex(9) }.exit_code(),
            4
        );
        assert_eq!(PlanningError::NoEntry("start").exit_code(), 4);
    }
}
