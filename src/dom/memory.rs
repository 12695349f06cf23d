//! In-memory [`Document`] implementation.
//!
//! Backs the CLI and the test suite. Elements live in an arena indexed by
//! [`ElementId`]; removed elements keep their slot but are detached from the
//! tree so stale handles never alias a new element.
//!
//! The selector engine understands comma-separated groups of compound
//! selectors (`tag`, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`) joined by
//! the descendant combinator. Other combinators and pseudo-classes are
//! rejected with [`DomError::UnsupportedSelector`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{CssPosition, Document, DomError, ElementId, ElementSpec, PageFixture};

const DOCUMENT_ROOT: usize = 0;
const BODY: usize = 1;

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    hidden: bool,
    position: CssPosition,
}

impl Node {
    fn new(tag: &str, parent: Option<usize>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            hidden: false,
            position: CssPosition::Static,
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new() -> Self {
        let mut root = Node::new("html", None);
        root.children.push(BODY);
        Self {
            nodes: vec![root, Node::new("body", Some(DOCUMENT_ROOT))],
        }
    }

    fn node(&self, element: ElementId) -> Option<&Node> {
        self.nodes.get(element.index())
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(element.index())
    }

    fn insert(&mut self, parent: usize, spec: &ElementSpec) -> usize {
        let index = self.nodes.len();
        let mut node = Node::new(&spec.tag, Some(parent));
        if let Some(ref id) = spec.id {
            node.attributes.insert("id".to_string(), id.clone());
        }
        for (name, value) in &spec.attributes {
            node.attributes
                .insert(name.to_ascii_lowercase(), value.clone());
        }
        for class in &spec.classes {
            if !node.classes.contains(class) {
                node.classes.push(class.clone());
            }
        }
        node.hidden = spec.hidden;
        node.position = spec.position;

        self.nodes.push(node);
        self.nodes[parent].children.push(index);

        for child in &spec.children {
            self.insert(index, child);
        }
        index
    }

    fn detach(&mut self, index: usize) {
        if let Some(parent) = self.nodes[index].parent.take() {
            self.nodes[parent].children.retain(|&child| child != index);
        }
    }

    fn is_attached(&self, mut index: usize) -> bool {
        loop {
            if index == DOCUMENT_ROOT {
                return true;
            }
            match self.nodes[index].parent {
                Some(parent) => index = parent,
                None => return false,
            }
        }
    }

    /// Descendants of `index` in document (pre-)order, excluding `index`
    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    fn matches_compound(&self, index: usize, compound: &Compound) -> bool {
        let node = &self.nodes[index];
        if let Some(ref tag) = compound.tag {
            if node.tag != *tag {
                return false;
            }
        }
        if let Some(ref id) = compound.id {
            if node.attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !compound
            .classes
            .iter()
            .all(|class| node.classes.contains(class))
        {
            return false;
        }
        compound.attributes.iter().all(|matcher| {
            match (node.attributes.get(&matcher.name), &matcher.value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }

    fn matches_chain(&self, index: usize, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_compound(index, last) {
            return false;
        }

        let mut remaining = ancestors;
        let mut cursor = self.nodes[index].parent;
        while let Some((wanted, rest)) = remaining.split_last() {
            let Some(candidate) = cursor else {
                return false;
            };
            if candidate != DOCUMENT_ROOT && self.matches_compound(candidate, wanted) {
                remaining = rest;
            }
            cursor = self.nodes[candidate].parent;
        }
        true
    }

    fn select(&self, groups: &[Vec<Compound>], scope: usize) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&index| groups.iter().any(|chain| self.matches_chain(index, chain)))
            .map(ElementId::new)
            .collect()
    }
}

/// Thread-safe in-memory page
#[derive(Debug)]
pub struct MemoryDocument {
    tree: Mutex<Tree>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty page with just `<html><body></body></html>`
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Tree::new()),
        }
    }

    pub fn from_fixture(fixture: &PageFixture) -> Self {
        let document = Self::new();
        for spec in &fixture.body {
            document.append(document.body(), spec.clone());
        }
        document
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn body(&self) -> ElementId {
        ElementId::new(BODY)
    }

    /// Append `spec` (and its children) as the last child of `parent`
    pub fn append(&self, parent: ElementId, spec: ElementSpec) -> ElementId {
        let mut tree = self.tree();
        let parent = if parent.index() < tree.nodes.len() {
            parent.index()
        } else {
            BODY
        };
        ElementId::new(tree.insert(parent, &spec))
    }

    pub fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        if let Some(node) = self.tree().node_mut(element) {
            node.attributes
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, element: ElementId, name: &str) {
        if let Some(node) = self.tree().node_mut(element) {
            node.attributes.remove(&name.to_ascii_lowercase());
        }
    }

    pub fn set_hidden(&self, element: ElementId, hidden: bool) {
        if let Some(node) = self.tree().node_mut(element) {
            node.hidden = hidden;
        }
    }

    pub fn set_position(&self, element: ElementId, position: CssPosition) {
        if let Some(node) = self.tree().node_mut(element) {
            node.position = position;
        }
    }

    pub fn tag_name(&self, element: ElementId) -> Option<String> {
        self.tree().node(element).map(|node| node.tag.clone())
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.tree()
            .node(element)
            .map(|node| node.classes.clone())
            .unwrap_or_default()
    }

    pub fn is_attached(&self, element: ElementId) -> bool {
        let tree = self.tree();
        element.index() < tree.nodes.len() && tree.is_attached(element.index())
    }

    /// Short human-readable label such as `button#save.primary`
    pub fn describe(&self, element: ElementId) -> String {
        let tree = self.tree();
        let Some(node) = tree.node(element) else {
            return element.to_string();
        };
        let mut label = node.tag.clone();
        if let Some(id) = node.attributes.get("id") {
            label.push('#');
            label.push_str(id);
        }
        for class in &node.classes {
            label.push('.');
            label.push_str(class);
        }
        label
    }
}

impl Document for MemoryDocument {
    fn query(&self, selector: &str) -> Result<Option<ElementId>, DomError> {
        Ok(self.query_all(selector, None)?.into_iter().next())
    }

    fn query_all(
        &self,
        selector: &str,
        root: Option<ElementId>,
    ) -> Result<Vec<ElementId>, DomError> {
        let groups = parse_selector_list(selector)?;
        let tree = self.tree();
        let scope = match root {
            Some(root) if root.index() < tree.nodes.len() => root.index(),
            Some(_) => return Ok(Vec::new()),
            None => DOCUMENT_ROOT,
        };
        Ok(tree.select(&groups, scope))
    }

    fn query_by_class(&self, class: &str) -> Vec<ElementId> {
        let tree = self.tree();
        tree.descendants(DOCUMENT_ROOT)
            .into_iter()
            .filter(|&index| tree.nodes[index].classes.iter().any(|c| c == class))
            .map(ElementId::new)
            .collect()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        let tree = self.tree();
        let node = tree.node(element)?;
        let name = name.to_ascii_lowercase();
        if name == "class" {
            return Some(node.classes.join(" "));
        }
        node.attributes.get(&name).cloned()
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.tree()
            .node(element)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn add_class(&self, element: ElementId, class: &str) {
        if let Some(node) = self.tree().node_mut(element) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&self, element: ElementId, class: &str) {
        if let Some(node) = self.tree().node_mut(element) {
            node.classes.retain(|c| c != class);
        }
    }

    fn is_hidden(&self, element: ElementId) -> bool {
        self.tree().node(element).is_some_and(|node| node.hidden)
    }

    fn computed_position(&self, element: ElementId) -> CssPosition {
        self.tree()
            .node(element)
            .map(|node| node.position)
            .unwrap_or_default()
    }

    fn append_to_body(&self, class: &str) -> ElementId {
        self.append(self.body(), ElementSpec::new("div").class(class))
    }

    fn remove_element(&self, element: ElementId) {
        let mut tree = self.tree();
        if element.index() < tree.nodes.len() && element.index() > BODY {
            tree.detach(element.index());
        }
    }
}

// ─── Selector parsing ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatcher>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeMatcher {
    name: String,
    value: Option<String>,
}

/// Split on `separator` while ignoring anything inside `[...]`
fn split_outside_brackets(input: &str, separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (offset, ch) in input.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if depth == 0 && separator(c) => {
                parts.push(&input[start..offset]);
                start = offset + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_selector_list(selector: &str) -> Result<Vec<Vec<Compound>>, DomError> {
    if selector.trim().is_empty() {
        return Err(DomError::EmptySelector);
    }

    split_outside_brackets(selector, |c| c == ',')
        .into_iter()
        .map(|group| {
            let chain = split_outside_brackets(group.trim(), char::is_whitespace)
                .into_iter()
                .filter(|part| !part.is_empty())
                .map(|part| parse_compound(part, selector))
                .collect::<Result<Vec<_>, _>>()?;
            if chain.is_empty() {
                return Err(DomError::UnsupportedSelector(selector.to_string()));
            }
            Ok(chain)
        })
        .collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(part: &str, selector: &str) -> Result<Compound, DomError> {
    let unsupported = || DomError::UnsupportedSelector(selector.to_string());
    let chars: Vec<char> = part.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos += 1;
    } else if chars.first().is_some_and(|c| c.is_ascii_alphabetic()) {
        compound.tag = Some(read_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let id = read_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err(unsupported());
                }
                compound.id = Some(id);
            }
            '.' => {
                pos += 1;
                let class = read_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err(unsupported());
                }
                compound.classes.push(class);
            }
            '[' => {
                pos += 1;
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(unsupported)?;
                let inner: String = chars[pos..pos + close].iter().collect();
                pos += close + 1;
                compound.attributes.push(parse_attribute_matcher(&inner).ok_or_else(unsupported)?);
            }
            _ => return Err(unsupported()),
        }
    }

    Ok(compound)
}

fn parse_attribute_matcher(inner: &str) -> Option<AttributeMatcher> {
    let (name, value) = match inner.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (name.trim(), Some(unquoted.to_string()))
        }
        None => (inner.trim(), None),
    };

    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(AttributeMatcher {
        name: name.to_ascii_lowercase(),
        value,
    })
}
