//! Document abstraction used by the tour.
//!
//! The tour never touches a concrete DOM. Everything it needs from the page
//! (selector queries, class markers, step attributes, computed position) goes
//! through the [`Document`] trait so the same navigation code can run against
//! a browser binding or the in-memory [`MemoryDocument`].

pub mod fixture;
pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fixture::{ElementSpec, PageFixture};
pub use memory::MemoryDocument;

/// Errors raised by document queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("selector is empty")]
    EmptySelector,

    #[error("unsupported selector '{0}'")]
    UnsupportedSelector(String),
}

/// Opaque handle to an element owned by a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolved CSS `position` of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssPosition {
    #[default]
    Static,
    Relative,
    Absolute,
    Sticky,
    Fixed,
}

impl CssPosition {
    /// Whether an overlay can be positioned against this element as-is
    pub fn establishes_containing_block(self) -> bool {
        !matches!(self, CssPosition::Static)
    }
}

/// Live view of the page the tour runs on.
///
/// Implementations must reflect the current document state on every call;
/// the tour re-queries selectors precisely because elements come and go.
pub trait Document: Send + Sync {
    /// First element in document order matching `selector`
    fn query(&self, selector: &str) -> Result<Option<ElementId>, DomError>;

    /// All elements matching `selector`, in document order.
    ///
    /// When `root` is given only its descendants are searched.
    fn query_all(&self, selector: &str, root: Option<ElementId>)
        -> Result<Vec<ElementId>, DomError>;

    /// All attached elements carrying `class`, in document order
    fn query_by_class(&self, class: &str) -> Vec<ElementId>;

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn has_attribute(&self, element: ElementId, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool;

    fn add_class(&self, element: ElementId, class: &str);

    fn remove_class(&self, element: ElementId, class: &str);

    /// Whether the element is hidden with an inline `display: none`
    fn is_hidden(&self, element: ElementId) -> bool;

    fn computed_position(&self, element: ElementId) -> CssPosition;

    /// Append a bare `div` with `class` to the document body
    fn append_to_body(&self, class: &str) -> ElementId;

    /// Detach an element (and its subtree) from the document
    fn remove_element(&self, element: ElementId);
}
