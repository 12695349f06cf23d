//! Serializable page descriptions.
//!
//! A [`PageFixture`] is a tree of [`ElementSpec`]s that can be loaded from
//! JSON (CLI) or built in code (tests) and mounted into a
//! [`MemoryDocument`](super::MemoryDocument).

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::CssPosition;

/// Page markup: the children of `<body>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default)]
    pub body: Vec<ElementSpec>,
}

impl PageFixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page fixture {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse page fixture {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One element and its subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Inline `display: none`
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub position: CssPosition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl Default for ElementSpec {
    fn default() -> Self {
        Self::new(default_tag())
    }
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            hidden: false,
            position: CssPosition::Static,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn position(mut self, position: CssPosition) -> Self {
        self.position = position;
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_defaults() {
        let fixture = PageFixture::from_json(r#"{ "body": [ { "id": "hero" } ] }"#).unwrap();
        let hero = &fixture.body[0];
        assert_eq!(hero.tag, "div");
        assert_eq!(hero.id.as_deref(), Some("hero"));
        assert!(!hero.hidden);
        assert_eq!(hero.position, CssPosition::Static);
    }

    #[test]
    fn test_fixture_nested_attributes() {
        let raw = r#"{
            "body": [
                {
                    "tag": "section",
                    "position": "relative",
                    "children": [
                        { "tag": "button", "attributes": { "data-intro": "Click me", "data-step": "2" } }
                    ]
                }
            ]
        }"#;
        let fixture = PageFixture::from_json(raw).unwrap();
        let section = &fixture.body[0];
        assert_eq!(section.position, CssPosition::Relative);
        assert_eq!(
            section.children[0].attributes.get("data-step").map(String::as_str),
            Some("2")
        );
    }

    #[test]
    fn test_fixture_rejects_malformed_json() {
        assert!(PageFixture::from_json("{ body: ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.json");
        std::fs::write(&path, r#"{ "body": [ { "tag": "nav" } ] }"#).unwrap();

        let fixture = PageFixture::load(&path).unwrap();
        assert_eq!(fixture.body[0].tag, "nav");
    }
}
