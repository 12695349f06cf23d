//! Markup attribute and presentation class names

/// Declares an element as a tour step; its value is the step body text
pub const DATA_INTRO: &str = "data-intro";
pub const DATA_STEP: &str = "data-step";
pub const DATA_TITLE: &str = "data-title";
pub const DATA_TOOLTIP_CLASS: &str = "data-tooltip-class";
pub const DATA_HIGHLIGHT_CLASS: &str = "data-highlight-class";
pub const DATA_POSITION: &str = "data-position";
pub const DATA_SCROLL_TO: &str = "data-scroll-to";
pub const DATA_DISABLE_INTERACTION: &str = "data-disable-interaction";
pub const DATA_GROUP: &str = "data-intro-group";

/// Marks the element currently highlighted by the tour
pub const SHOW_ELEMENT_CLASS: &str = "tourguide-show-element";
/// Forces `position: relative` so the overlay can be placed against the anchor
pub const RELATIVE_POSITION_CLASS: &str = "tourguide-relative-position";
/// Synthetic anchor shared by every floating step
pub const FLOATING_ELEMENT_CLASS: &str = "tourguide-floating-element";

/// Classes the synchronizer applies and must clean up
pub const ACTIVE_MARKERS: &[&str] = &[SHOW_ELEMENT_CLASS, RELATIVE_POSITION_CLASS];

/// Selector matching every step-declaring element
pub fn step_selector() -> String {
    format!("*[{DATA_INTRO}]")
}
