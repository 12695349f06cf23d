//! Keeps the highlighted element in step with the live document.

use std::sync::Arc;

use tracing::{debug, trace};

use super::attributes::{
    ACTIVE_MARKERS, FLOATING_ELEMENT_CLASS, RELATIVE_POSITION_CLASS, SHOW_ELEMENT_CLASS,
};
use super::error::TourError;
use super::listener::TourListener;
use super::refresh::{after_frames, FrameScheduler, RefreshSignal, REFRESH_FRAME_DELAY};
use super::step::{TooltipPosition, TourStep};
use crate::dom::{Document, ElementId};

pub struct ElementSynchronizer {
    document: Arc<dyn Document>,
    frames: Arc<dyn FrameScheduler>,
    refresh: RefreshSignal,
}

impl ElementSynchronizer {
    pub fn new(
        document: Arc<dyn Document>,
        frames: Arc<dyn FrameScheduler>,
        refresh: RefreshSignal,
    ) -> Self {
        Self {
            document,
            frames,
            refresh,
        }
    }

    pub fn refresh_signal(&self) -> &RefreshSignal {
        &self.refresh
    }

    /// Show `step`: re-resolve its anchor, move the active markers onto it
    /// and schedule a layout refresh.
    ///
    /// `step` is the sequence's own entry, so a re-bound anchor is what later
    /// navigation sees. A step that still has no anchor is silently ignored.
    pub async fn show_element(
        &self,
        step: &mut TourStep,
        default_position: TooltipPosition,
        listener: &dyn TourListener,
    ) -> Result<(), TourError> {
        self.rebind(step, default_position)?;

        let Some(anchor) = step.element else {
            debug!(step = step.step, "Step has no anchor element, nothing to show");
            return Ok(());
        };

        listener.on_change(anchor);

        self.remove_show_element();
        self.set_show_element(anchor);

        let refresh = self.refresh.clone();
        after_frames(
            self.frames.clone(),
            REFRESH_FRAME_DELAY,
            Box::new(move || refresh.bump()),
        );

        listener
            .on_after_change(anchor)
            .await
            .map_err(|source| TourError::Listener {
                callback: "after_change",
                source,
            })
    }

    /// Strip the active markers from every element carrying them
    pub fn remove_show_element(&self) {
        for element in self.document.query_by_class(SHOW_ELEMENT_CLASS) {
            for marker in ACTIVE_MARKERS {
                self.document.remove_class(element, marker);
            }
        }
    }

    fn rebind(&self, step: &mut TourStep, default_position: TooltipPosition) -> Result<(), TourError> {
        let Some(ref selector) = step.element_selector else {
            return Ok(());
        };
        let Some(fresh) = self.document.query(selector)? else {
            trace!(selector = %selector, "Selector still unresolved");
            return Ok(());
        };
        if self.document.has_class(fresh, FLOATING_ELEMENT_CLASS) {
            return Ok(());
        }

        if step.element != Some(fresh) {
            debug!(step = step.step, selector = %selector, element = %fresh, "Re-bound step anchor");
        }
        step.element = Some(fresh);

        if step.floating_fallback {
            step.position = default_position;
            step.floating_fallback = false;
        }
        Ok(())
    }

    fn set_show_element(&self, element: ElementId) {
        self.document.add_class(element, SHOW_ELEMENT_CLASS);

        if !self
            .document
            .computed_position(element)
            .establishes_containing_block()
        {
            self.document.add_class(element, RELATIVE_POSITION_CLASS);
        }
    }
}
