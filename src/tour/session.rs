//! Tour navigation state machine.
//!
//! A [`TourSession`] owns the resolved step sequence and the current index.
//! Every navigation call first *plans* a [`Transition`] (evaluating skip
//! predicates without touching state) and then *applies* it. Completion hooks
//! run during apply, before the index is committed, so a failing hook leaves
//! the session exactly where it was.

use std::sync::Arc;

use tracing::{debug, info, trace};

use super::attributes::FLOATING_ELEMENT_CLASS;
use super::error::TourError;
use super::listener::{CompletionReason, NoopListener, TourListener};
use super::refresh::{FrameScheduler, RefreshSignal};
use super::resolver::fetch_steps;
use super::step::{StepDefinition, TourStep};
use super::synchronizer::ElementSynchronizer;
use crate::config::TourOptions;
use crate::dom::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourState {
    /// Not started, or started with nothing to show
    Idle,
    /// A step is (or is about to be) displayed
    Active,
    /// Finished or exited; the sequence has been discarded
    Completed,
}

/// Outcome of planning a navigation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Show the next step directly
    Advance { from: Option<usize>, to: usize },
    /// Show `to` after bypassing `skipped`
    SkipPast {
        from: Option<usize>,
        skipped: Vec<usize>,
        to: usize,
    },
    /// Go back to `to`, running `setup`'s completion hook first
    Retreat {
        setup: Option<usize>,
        skipped: Vec<usize>,
        to: usize,
    },
    /// Leave `leaving` (if a step was shown) and finish the tour
    Complete {
        leaving: Option<usize>,
        final_index: usize,
    },
    /// Nothing to do
    Abort,
}

pub struct TourSession {
    options: TourOptions,
    document: Arc<dyn Document>,
    listener: Arc<dyn TourListener>,
    synchronizer: ElementSynchronizer,
    steps: Vec<TourStep>,
    current: Option<usize>,
    state: TourState,
}

impl TourSession {
    pub fn new(
        options: TourOptions,
        document: Arc<dyn Document>,
        frames: Arc<dyn FrameScheduler>,
    ) -> Self {
        let synchronizer = ElementSynchronizer::new(document.clone(), frames, RefreshSignal::new());
        Self {
            options,
            document,
            listener: Arc::new(NoopListener),
            synchronizer,
            steps: Vec::new(),
            current: None,
            state: TourState::Idle,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn TourListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn options(&self) -> &TourOptions {
        &self.options
    }

    pub fn state(&self) -> TourState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TourState::Active
    }

    /// Index of the displayed step
    pub fn current_step(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&TourStep> {
        self.current.and_then(|index| self.steps.get(index))
    }

    pub fn steps(&self) -> &[TourStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&TourStep> {
        self.steps.get(index)
    }

    pub fn is_last_step(&self) -> bool {
        self.current
            .is_some_and(|index| index + 1 == self.steps.len())
    }

    /// Counter the layout layer watches to know when to re-measure
    pub fn refresh_signal(&self) -> &RefreshSignal {
        self.synchronizer.refresh_signal()
    }

    /// Resolve the step sequence and show the first step that is not skipped.
    ///
    /// Returns `false` when there is nothing to show: either no steps were
    /// found (the session stays idle) or every step was skipped (the tour
    /// completes immediately).
    pub async fn start(&mut self, definitions: &[StepDefinition]) -> Result<bool, TourError> {
        if self.state == TourState::Active {
            return Err(TourError::AlreadyActive);
        }

        let steps = fetch_steps(&self.options, self.document.as_ref(), definitions)?;
        self.current = None;
        if steps.is_empty() {
            info!("No tour steps found");
            self.steps = steps;
            self.state = TourState::Idle;
            return Ok(false);
        }

        info!(steps = steps.len(), "Starting tour");
        self.steps = steps;
        self.state = TourState::Active;
        self.next_step().await
    }

    /// Advance to the next step that is not skipped.
    ///
    /// Returns `false` when the tour completed instead of advancing.
    pub async fn next_step(&mut self) -> Result<bool, TourError> {
        let transition = self.plan_forward().await?;
        self.apply(transition).await
    }

    /// Go back to the nearest earlier step that is not skipped.
    ///
    /// Returns `false` (and changes nothing) when no such step exists.
    pub async fn previous_step(&mut self) -> Result<bool, TourError> {
        let transition = self.plan_backward().await?;
        self.apply(transition).await
    }

    /// Re-synchronize the current step with the document without navigating
    pub async fn refresh(&mut self) -> Result<bool, TourError> {
        match self.current {
            Some(index) if self.is_active() => {
                self.display(index).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Tear the tour down: remove markers and the floating placeholder and
    /// discard the sequence.
    pub async fn exit(&mut self) -> Result<(), TourError> {
        let was_active = self.is_active();

        self.synchronizer.remove_show_element();
        for placeholder in self.document.query_by_class(FLOATING_ELEMENT_CLASS) {
            self.document.remove_element(placeholder);
        }

        self.steps.clear();
        self.current = None;
        self.state = TourState::Completed;

        if was_active {
            info!("Tour exited");
            self.listener
                .on_exit()
                .await
                .map_err(|source| TourError::Listener {
                    callback: "exit",
                    source,
                })?;
        }
        Ok(())
    }

    async fn plan_forward(&self) -> Result<Transition, TourError> {
        if !self.is_active() || self.steps.is_empty() {
            return Ok(Transition::Abort);
        }

        let len = self.steps.len();
        let from = self.current;
        let mut to = from.map_or(0, |index| index + 1);
        let mut skipped = Vec::new();

        while to < len && self.should_skip(to).await? {
            skipped.push(to);
            to += 1;
        }

        if to >= len {
            return Ok(Transition::Complete {
                leaving: from,
                final_index: len - 1,
            });
        }

        if skipped.is_empty() {
            Ok(Transition::Advance { from, to })
        } else {
            Ok(Transition::SkipPast { from, skipped, to })
        }
    }

    async fn plan_backward(&self) -> Result<Transition, TourError> {
        let current = match self.current {
            Some(current) if self.is_active() && current > 0 => current,
            _ => return Ok(Transition::Abort),
        };

        let mut to = current - 1;
        let mut skipped = Vec::new();
        while self.should_skip(to).await? {
            skipped.push(to);
            if to == 0 {
                return Ok(Transition::Abort);
            }
            to -= 1;
        }

        Ok(Transition::Retreat {
            setup: to.checked_sub(1),
            skipped,
            to,
        })
    }

    async fn apply(&mut self, transition: Transition) -> Result<bool, TourError> {
        debug!(?transition, "Applying tour transition");

        match transition {
            Transition::Abort => Ok(false),
            Transition::Advance { from, to } | Transition::SkipPast { from, to, .. } => {
                if let Some(from) = from.filter(|&from| from != to) {
                    self.run_complete_hook(from).await?;
                }
                self.display(to).await?;
                Ok(true)
            }
            Transition::Retreat { setup, to, .. } => {
                if let Some(setup) = setup {
                    self.run_complete_hook(setup).await?;
                }
                self.display(to).await?;
                Ok(true)
            }
            Transition::Complete {
                leaving,
                final_index,
            } => {
                if let Some(leaving) = leaving {
                    self.run_complete_hook(leaving).await?;
                }
                info!(final_index, "Tour complete");
                self.listener
                    .on_complete(final_index, CompletionReason::End)
                    .await
                    .map_err(|source| TourError::Listener {
                        callback: "complete",
                        source,
                    })?;
                self.exit().await?;
                Ok(false)
            }
        }
    }

    async fn should_skip(&self, index: usize) -> Result<bool, TourError> {
        let skip = self.steps[index]
            .should_skip()
            .await
            .map_err(|source| TourError::SkipPredicate { index, source })?;
        if skip {
            trace!(index, "Skipping step");
        }
        Ok(skip)
    }

    async fn run_complete_hook(&self, index: usize) -> Result<(), TourError> {
        let Some(hook) = self.steps.get(index).and_then(|step| step.on_complete.clone()) else {
            return Ok(());
        };
        trace!(index, "Running completion hook");
        hook.run()
            .await
            .map_err(|source| TourError::CompleteHook { index, source })
    }

    /// Commit `index` and show it
    async fn display(&mut self, index: usize) -> Result<(), TourError> {
        self.current = Some(index);
        self.synchronizer
            .show_element(
                &mut self.steps[index],
                self.options.tooltip_position,
                self.listener.as_ref(),
            )
            .await
    }
}
