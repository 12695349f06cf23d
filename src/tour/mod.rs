//! Guided tours: step resolution, navigation and element synchronization.

pub mod attributes;
pub mod error;
pub mod listener;
pub mod manifest;
pub mod refresh;
pub mod resolver;
pub mod session;
pub mod step;
pub mod synchronizer;

pub use error::TourError;
pub use listener::{CompletionReason, NoopListener, TourListener};
pub use manifest::{StepManifest, StepSpec};
pub use refresh::{FrameScheduler, ManualFrameClock, RefreshSignal, TokioFrameClock};
pub use resolver::fetch_steps;
pub use session::{TourSession, TourState, Transition};
pub use step::{
    CompleteHook, ScrollTo, SkipPredicate, StepDefinition, StepTarget, TooltipPosition, TourStep,
};
pub use synchronizer::ElementSynchronizer;
