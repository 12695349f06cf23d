//! Step descriptors and user hooks

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::dom::ElementId;

/// Placement hint handed to the layout layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TooltipPosition {
    /// No anchor: center on the viewport
    Floating,
    Top,
    #[default]
    Bottom,
    Left,
    Right,
    TopRightAligned,
    TopLeftAligned,
    TopMiddleAligned,
    BottomRightAligned,
    BottomLeftAligned,
    BottomMiddleAligned,
}

impl TooltipPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TooltipPosition::Floating => "floating",
            TooltipPosition::Top => "top",
            TooltipPosition::Bottom => "bottom",
            TooltipPosition::Left => "left",
            TooltipPosition::Right => "right",
            TooltipPosition::TopRightAligned => "top-right-aligned",
            TooltipPosition::TopLeftAligned => "top-left-aligned",
            TooltipPosition::TopMiddleAligned => "top-middle-aligned",
            TooltipPosition::BottomRightAligned => "bottom-right-aligned",
            TooltipPosition::BottomLeftAligned => "bottom-left-aligned",
            TooltipPosition::BottomMiddleAligned => "bottom-middle-aligned",
        }
    }
}

impl fmt::Display for TooltipPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TooltipPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "floating" => Ok(TooltipPosition::Floating),
            "top" => Ok(TooltipPosition::Top),
            "bottom" => Ok(TooltipPosition::Bottom),
            "left" => Ok(TooltipPosition::Left),
            "right" => Ok(TooltipPosition::Right),
            "top-right-aligned" => Ok(TooltipPosition::TopRightAligned),
            "top-left-aligned" => Ok(TooltipPosition::TopLeftAligned),
            "top-middle-aligned" => Ok(TooltipPosition::TopMiddleAligned),
            "bottom-right-aligned" => Ok(TooltipPosition::BottomRightAligned),
            "bottom-left-aligned" => Ok(TooltipPosition::BottomLeftAligned),
            "bottom-middle-aligned" => Ok(TooltipPosition::BottomMiddleAligned),
            other => Err(format!("unknown tooltip position '{other}'")),
        }
    }
}

/// What the page scrolls to when a step is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollTo {
    Off,
    #[default]
    Element,
    Tooltip,
}

impl fmt::Display for ScrollTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrollTo::Off => "off",
            ScrollTo::Element => "element",
            ScrollTo::Tooltip => "tooltip",
        })
    }
}

impl FromStr for ScrollTo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(ScrollTo::Off),
            "element" => Ok(ScrollTo::Element),
            "tooltip" => Ok(ScrollTo::Tooltip),
            other => Err(format!("unknown scroll target '{other}'")),
        }
    }
}

pub type HookFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

/// Async callback run when the tour leaves a step going forward
#[derive(Clone)]
pub struct CompleteHook(Arc<dyn Fn() -> HookFuture<()> + Send + Sync>);

impl CompleteHook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self(Arc::new(move || -> HookFuture<()> { Box::pin(hook()) }))
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        (self.0)().await
    }
}

impl fmt::Debug for CompleteHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompleteHook(..)")
    }
}

/// Async predicate deciding whether a step is bypassed entirely
#[derive(Clone)]
pub struct SkipPredicate(Arc<dyn Fn() -> HookFuture<bool> + Send + Sync>);

impl SkipPredicate {
    pub fn new<F, Fut>(predicate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Self(Arc::new(move || -> HookFuture<bool> { Box::pin(predicate()) }))
    }

    /// A predicate that always returns `value`
    pub fn constant(value: bool) -> Self {
        Self::new(move || async move { Ok(value) })
    }

    pub async fn evaluate(&self) -> anyhow::Result<bool> {
        (self.0)().await
    }
}

impl fmt::Debug for SkipPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SkipPredicate(..)")
    }
}

/// How a programmatic step names its anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTarget {
    Element(ElementId),
    /// Resolved against the live document, now and on every display
    Selector(String),
}

impl From<ElementId> for StepTarget {
    fn from(element: ElementId) -> Self {
        StepTarget::Element(element)
    }
}

impl From<&str> for StepTarget {
    fn from(selector: &str) -> Self {
        StepTarget::Selector(selector.to_string())
    }
}

impl From<String> for StepTarget {
    fn from(selector: String) -> Self {
        StepTarget::Selector(selector)
    }
}

/// A partially specified step supplied by the caller.
///
/// Unset fields are filled from [`TourOptions`](crate::config::TourOptions)
/// when the sequence is resolved.
#[derive(Debug, Clone, Default)]
pub struct StepDefinition {
    pub title: Option<String>,
    pub intro: String,
    pub tooltip_class: Option<String>,
    pub highlight_class: Option<String>,
    pub element: Option<StepTarget>,
    pub position: Option<TooltipPosition>,
    pub scroll_to: Option<ScrollTo>,
    pub disable_interaction: Option<bool>,
    pub on_complete: Option<CompleteHook>,
    pub skip_if: Option<SkipPredicate>,
}

impl StepDefinition {
    pub fn new(intro: impl Into<String>) -> Self {
        Self {
            intro: intro.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn element(mut self, target: impl Into<StepTarget>) -> Self {
        self.element = Some(target.into());
        self
    }

    pub fn position(mut self, position: TooltipPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn scroll_to(mut self, scroll_to: ScrollTo) -> Self {
        self.scroll_to = Some(scroll_to);
        self
    }

    pub fn disable_interaction(mut self, disable: bool) -> Self {
        self.disable_interaction = Some(disable);
        self
    }

    pub fn tooltip_class(mut self, class: impl Into<String>) -> Self {
        self.tooltip_class = Some(class.into());
        self
    }

    pub fn highlight_class(mut self, class: impl Into<String>) -> Self {
        self.highlight_class = Some(class.into());
        self
    }

    pub fn on_complete(mut self, hook: CompleteHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    pub fn skip_if(mut self, predicate: SkipPredicate) -> Self {
        self.skip_if = Some(predicate);
        self
    }
}

/// One resolved stop in the tour
#[derive(Debug, Clone)]
pub struct TourStep {
    /// 1-based position in the resolved sequence
    pub step: usize,
    pub title: String,
    pub intro: String,
    pub tooltip_class: Option<String>,
    pub highlight_class: Option<String>,
    /// Anchor element; the floating placeholder for floating steps
    pub element: Option<ElementId>,
    /// Selector the step was declared with, kept for re-resolution
    pub element_selector: Option<String>,
    pub position: TooltipPosition,
    pub scroll_to: ScrollTo,
    pub disable_interaction: bool,
    pub on_complete: Option<CompleteHook>,
    pub skip_if: Option<SkipPredicate>,
    /// Set when the position was forced to floating because nothing matched
    pub(crate) floating_fallback: bool,
}

impl TourStep {
    pub fn is_floating(&self) -> bool {
        self.position == TooltipPosition::Floating
    }

    /// Evaluate the skip predicate; steps without one are never skipped
    pub async fn should_skip(&self) -> anyhow::Result<bool> {
        match self.skip_if {
            Some(ref predicate) => predicate.evaluate().await,
            None => Ok(false),
        }
    }
}
