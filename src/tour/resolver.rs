//! Step source resolution.
//!
//! Builds the canonical, ordered step sequence once per tour, either from a
//! caller-supplied list of [`StepDefinition`]s or by scanning the page for
//! elements declaring `data-intro`.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::attributes::{
    step_selector, DATA_DISABLE_INTERACTION, DATA_GROUP, DATA_HIGHLIGHT_CLASS, DATA_INTRO,
    DATA_POSITION, DATA_SCROLL_TO, DATA_STEP, DATA_TITLE, DATA_TOOLTIP_CLASS,
    FLOATING_ELEMENT_CLASS,
};
use super::error::TourError;
use super::step::{ScrollTo, StepDefinition, StepTarget, TooltipPosition, TourStep};
use crate::config::TourOptions;
use crate::dom::{Document, ElementId};

/// Resolve the step sequence for a tour.
///
/// A non-empty `definitions` list wins; otherwise the page markup is scanned.
/// The result is sorted by `step` and numbered `1..=len` without gaps. An
/// empty result means there is nothing to show.
pub fn fetch_steps(
    options: &TourOptions,
    document: &dyn Document,
    definitions: &[StepDefinition],
) -> Result<Vec<TourStep>, TourError> {
    let steps = if definitions.is_empty() {
        steps_from_markup(options, document)?
    } else {
        steps_from_definitions(options, document, definitions)?
    };

    debug!(count = steps.len(), "Resolved tour steps");
    Ok(steps)
}

/// Shared placeholder anchor for floating steps, created on first use
pub(crate) fn floating_element(document: &dyn Document) -> ElementId {
    document
        .query_by_class(FLOATING_ELEMENT_CLASS)
        .into_iter()
        .next()
        .unwrap_or_else(|| document.append_to_body(FLOATING_ELEMENT_CLASS))
}

fn steps_from_definitions(
    options: &TourOptions,
    document: &dyn Document,
    definitions: &[StepDefinition],
) -> Result<Vec<TourStep>, TourError> {
    let mut steps = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let definition = definition.clone();

        let (element, element_selector) = match definition.element {
            Some(StepTarget::Element(element)) => (Some(element), None),
            Some(StepTarget::Selector(selector)) => {
                let found = document.query(&selector)?;
                if found.is_none() {
                    debug!(selector = %selector, "Step selector not found, using floating anchor");
                }
                (found, Some(selector))
            }
            None => (None, None),
        };

        let (element, position, floating_fallback) = match element {
            Some(element) => (
                element,
                definition.position.unwrap_or(options.tooltip_position),
                false,
            ),
            None => (floating_element(document), TooltipPosition::Floating, true),
        };

        steps.push(TourStep {
            step: steps.len() + 1,
            title: definition.title.unwrap_or_default(),
            intro: definition.intro,
            tooltip_class: definition.tooltip_class,
            highlight_class: definition.highlight_class,
            element: Some(element),
            element_selector,
            position,
            scroll_to: definition.scroll_to.unwrap_or(options.scroll_to),
            disable_interaction: definition
                .disable_interaction
                .unwrap_or(options.disable_interaction),
            on_complete: definition.on_complete,
            skip_if: definition.skip_if,
            floating_fallback,
        });
    }

    Ok(steps)
}

fn steps_from_markup(
    options: &TourOptions,
    document: &dyn Document,
) -> Result<Vec<TourStep>, TourError> {
    let root = match options.root {
        Some(ref selector) => match document.query(selector)? {
            Some(root) => Some(root),
            None => {
                warn!(root = %selector, "Tour root element not found");
                return Ok(Vec::new());
            }
        },
        None => None,
    };

    // An empty group means no filter
    let group = options.group.as_deref().filter(|group| !group.is_empty());
    let mut table = SlotTable::default();
    let mut unordered = Vec::new();

    for element in document.query_all(&step_selector(), root)? {
        if let Some(group) = group {
            if document.attribute(element, DATA_GROUP).as_deref() != Some(group) {
                continue;
            }
        }

        if document.is_hidden(element) {
            continue;
        }

        let order = document
            .attribute(element, DATA_STEP)
            .map(|raw| parse_step_number(&raw))
            .unwrap_or(0);

        let step = step_from_element(options, document, element, order);
        if order > 0 {
            table.place(order, step);
        } else {
            unordered.push(step);
        }
    }

    table.fill_gaps(unordered);
    Ok(table.into_steps())
}

fn step_from_element(
    options: &TourOptions,
    document: &dyn Document,
    element: ElementId,
    order: usize,
) -> TourStep {
    let non_empty = |name: &str| document.attribute(element, name).filter(|v| !v.is_empty());

    let position = non_empty(DATA_POSITION)
        .and_then(|raw| {
            raw.parse::<TooltipPosition>()
                .map_err(|e| warn!(element = %element, error = %e, "Ignoring step position"))
                .ok()
        })
        .unwrap_or(options.tooltip_position);

    let scroll_to = non_empty(DATA_SCROLL_TO)
        .and_then(|raw| {
            raw.parse::<ScrollTo>()
                .map_err(|e| warn!(element = %element, error = %e, "Ignoring step scroll target"))
                .ok()
        })
        .unwrap_or(options.scroll_to);

    let disable_interaction = match document.attribute(element, DATA_DISABLE_INTERACTION) {
        Some(raw) => parse_flag(&raw),
        None => options.disable_interaction,
    };

    TourStep {
        step: order,
        title: document.attribute(element, DATA_TITLE).unwrap_or_default(),
        intro: document.attribute(element, DATA_INTRO).unwrap_or_default(),
        tooltip_class: non_empty(DATA_TOOLTIP_CLASS),
        highlight_class: non_empty(DATA_HIGHLIGHT_CLASS),
        element: Some(element),
        element_selector: None,
        position,
        scroll_to,
        disable_interaction,
        on_complete: None,
        skip_if: None,
        floating_fallback: false,
    }
}

/// Leading integer of `raw`; anything non-positive or unparsable is 0
fn parse_step_number(raw: &str) -> usize {
    let trimmed = raw.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "" | "false" | "0")
}

/// Slot allocation for markup steps.
///
/// Explicitly numbered steps land at `order - 1` (last write wins on
/// duplicates); unnumbered steps then take the first free slots in encounter
/// order. Slots are sparse, so a huge `data-step` costs one entry.
#[derive(Debug, Default)]
pub(crate) struct SlotTable {
    slots: BTreeMap<usize, TourStep>,
}

impl SlotTable {
    pub(crate) fn place(&mut self, order: usize, mut step: TourStep) {
        let slot = order.max(1) - 1;
        step.step = slot + 1;
        if let Some(replaced) = self.slots.insert(slot, step) {
            debug!(order, replaced = ?replaced.element, "Duplicate step order, keeping the later element");
        }
    }

    pub(crate) fn fill_gaps(&mut self, unordered: impl IntoIterator<Item = TourStep>) {
        let mut slot = 0;
        for mut step in unordered {
            while self.slots.contains_key(&slot) {
                slot += 1;
            }
            step.step = slot + 1;
            self.slots.insert(slot, step);
            slot += 1;
        }
    }

    pub(crate) fn into_steps(self) -> Vec<TourStep> {
        let mut steps: Vec<TourStep> = self.slots.into_values().collect();
        for (index, step) in steps.iter_mut().enumerate() {
            step.step = index + 1;
        }
        steps
    }
}
