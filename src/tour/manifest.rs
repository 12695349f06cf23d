//! Declarative step manifests.
//!
//! The CLI cannot take closures, so steps are described in JSON and compiled
//! into [`StepDefinition`]s against a live document:
//!
//! ```json
//! {
//!   "steps": [
//!     { "intro": "Welcome", "title": "Hi" },
//!     { "intro": "Save here", "element": "#save", "position": "left" },
//!     { "intro": "Billing", "element": "#billing", "skip_unless_present": "#billing" }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::step::{ScrollTo, SkipPredicate, StepDefinition, TooltipPosition};
use crate::dom::Document;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepManifest {
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub intro: String,
    /// Anchor selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<TooltipPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_to: Option<ScrollTo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_interaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_class: Option<String>,
    /// Skip the step unless this selector matches at navigation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unless_present: Option<String>,
}

impl StepManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read step manifest {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse step manifest {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn into_definitions(self, document: &Arc<dyn Document>) -> Vec<StepDefinition> {
        self.steps
            .into_iter()
            .map(|spec| spec.into_definition(document))
            .collect()
    }
}

impl StepSpec {
    pub fn into_definition(self, document: &Arc<dyn Document>) -> StepDefinition {
        let skip_if = self
            .skip_unless_present
            .map(|selector| skip_unless_present(document.clone(), selector));

        StepDefinition {
            title: self.title,
            intro: self.intro,
            tooltip_class: self.tooltip_class,
            highlight_class: self.highlight_class,
            element: self.element.map(Into::into),
            position: self.position,
            scroll_to: self.scroll_to,
            disable_interaction: self.disable_interaction,
            on_complete: None,
            skip_if,
        }
    }
}

fn skip_unless_present(document: Arc<dyn Document>, selector: String) -> SkipPredicate {
    SkipPredicate::new(move || {
        let document = document.clone();
        let selector = selector.clone();
        async move { Ok(document.query(&selector)?.is_none()) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, MemoryDocument};
    use crate::tour::step::StepTarget;

    const MANIFEST: &str = r##"{
        "steps": [
            { "intro": "Welcome", "title": "Hi" },
            { "intro": "Save", "element": "#save", "position": "top-left-aligned", "scroll_to": "off" },
            { "intro": "Billing", "skip_unless_present": "#billing" }
        ]
    }"##;

    #[test]
    fn test_parse_manifest() {
        let manifest = StepManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.steps.len(), 3);
        assert_eq!(manifest.steps[0].title.as_deref(), Some("Hi"));
        assert_eq!(
            manifest.steps[1].position,
            Some(TooltipPosition::TopLeftAligned)
        );
        assert_eq!(manifest.steps[1].scroll_to, Some(ScrollTo::Off));
        assert_eq!(
            manifest.steps[2].skip_unless_present.as_deref(),
            Some("#billing")
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = StepManifest::from_json(r#"{"steps":[{"intro":"a","postion":"top"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("postion"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StepManifest::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[tokio::test]
    async fn test_skip_unless_present_tracks_live_document() {
        let memory = Arc::new(MemoryDocument::new());
        let document: Arc<dyn Document> = memory.clone();
        let definitions = StepManifest::from_json(MANIFEST)
            .unwrap()
            .into_definitions(&document);

        assert_eq!(
            definitions[1].element,
            Some(StepTarget::Selector("#save".to_string()))
        );
        assert!(definitions[0].skip_if.is_none());

        let predicate = definitions[2].skip_if.clone().unwrap();
        assert!(predicate.evaluate().await.unwrap());

        memory.append(memory.body(), ElementSpec::new("section").id("billing"));
        assert!(!predicate.evaluate().await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_skip_selector_surfaces_as_predicate_error() {
        let document: Arc<dyn Document> = Arc::new(MemoryDocument::new());
        let definition = StepSpec {
            intro: "x".to_string(),
            skip_unless_present: Some("ul > li".to_string()),
            ..StepSpec::default()
        }
        .into_definition(&document);

        assert!(definition.skip_if.unwrap().evaluate().await.is_err());
    }
}
