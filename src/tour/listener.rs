//! Lifecycle notifications raised by a running tour.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::dom::ElementId;

/// Why a tour finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Navigated forward past the last step
    End,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::End => f.write_str("end"),
        }
    }
}

/// Observer of tour lifecycle events.
///
/// Every method has a no-op default. Errors returned from the async methods
/// propagate to whoever drove the navigation.
#[async_trait]
pub trait TourListener: Send + Sync {
    /// The highlighted element is about to change (fired before any markers move)
    fn on_change(&self, _element: ElementId) {}

    /// The new element is marked and a layout refresh has been scheduled
    async fn on_after_change(&self, _element: ElementId) -> Result<()> {
        Ok(())
    }

    /// The tour finished at `final_index`
    async fn on_complete(&self, _final_index: usize, _reason: CompletionReason) -> Result<()> {
        Ok(())
    }

    async fn on_exit(&self) -> Result<()> {
        Ok(())
    }
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

#[async_trait]
impl TourListener for NoopListener {}
