use thiserror::Error;

use crate::dom::DomError;

/// Errors surfaced by tour navigation.
///
/// Missing anchors, unresolved selectors and an exhausted sequence are not
/// errors; they degrade to floating steps or tour completion. What does
/// surface is a failing user hook, reported with the step it belongs to.
#[derive(Error, Debug)]
pub enum TourError {
    #[error("document query failed: {0}")]
    Dom(#[from] DomError),

    #[error("skip predicate of step {index} failed")]
    SkipPredicate {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("completion hook of step {index} failed")]
    CompleteHook {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("tour listener '{callback}' failed")]
    Listener {
        callback: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("tour is already running")]
    AlreadyActive,
}

impl TourError {
    /// Index of the step whose hook failed, if any
    pub fn step_index(&self) -> Option<usize> {
        match self {
            TourError::SkipPredicate { index, .. } | TourError::CompleteHook { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}
