//! Live preview DOM: an arena of element and text nodes under one mount
//! point, with HTML serialization and markup parsing for live patches.

use indextree::{Arena, NodeId};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

use crate::address::AddressableTree;
use crate::error::CanvasResult;

/// Elements that never have children.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const WRAPPER: &str = "__canvas_root__";

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeKind {
    /// The mount point
    #[default]
    Document,
    Element { tag: String },
    Text { text: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomNode {
    pub kind: NodeKind,
    pub attrs: Vec<(String, String)>,
    /// Editor-generated container (bare-fragment wrapper, error box); never addressable
    pub synthetic: bool,
}

#[derive(Debug)]
pub struct Dom {
    arena: Arena<DomNode>,
    root: NodeId,
    instrumentation: Vec<String>,
}

impl Dom {
    /// `instrumentation` names the editor-only attributes left out of clean output.
    pub fn new(instrumentation: Vec<String>) -> Self {
        let mut arena = Arena::new();
        Self {
            root: arena.new_node(DomNode::default()),
            arena,
            instrumentation,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node, unless the id is stale (removed by a remount or a patch).
    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        let node = self.arena.get(id)?;
        (!node.is_removed()).then(|| node.get())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DomNode> {
        let node = self.arena.get_mut(id)?;
        if node.is_removed() {
            return None;
        }
        Some(node.get_mut())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Element { .. }))
    }

    pub fn is_synthetic(&self, id: NodeId) -> bool {
        self.node(id).map(|n| n.synthetic).unwrap_or(false)
    }

    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: Vec<(String, String)>,
        synthetic: bool,
    ) -> NodeId {
        let child = self.arena.new_node(DomNode {
            kind: NodeKind::Element {
                tag: tag.to_string(),
            },
            attrs,
            synthetic,
        });
        parent.append(child, &mut self.arena);
        child
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let child = self.arena.new_node(DomNode {
            kind: NodeKind::Text {
                text: text.to_string(),
            },
            ..DomNode::default()
        });
        parent.append(child, &mut self.arena);
        child
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            child.remove_subtree(&mut self.arena);
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if self.node(id).is_none() {
            return Vec::new();
        }
        id.children(&self.arena).collect()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?;
        id.parent(&self.arena)
    }

    /// Every element under the mount point, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.root
            .descendants(&self.arena)
            .filter(|id| self.is_element(*id))
            .collect()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.node(id).map(|n| n.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            match node.attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => node.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                let before = node.attrs.len();
                node.attrs.retain(|(k, _)| k != name);
                node.attrs.len() != before
            }
            None => false,
        }
    }

    pub fn is_instrumentation(&self, name: &str) -> bool {
        self.instrumentation.iter().any(|a| a == name)
    }

    /// Attributes as the snippet author wrote them, without editor markers.
    pub fn clean_attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.attributes(id)
            .iter()
            .filter(|(k, _)| !self.is_instrumentation(k))
            .cloned()
            .collect()
    }

    pub fn class_list(&self, id: NodeId) -> Vec<String> {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if self.node(id).is_none() {
            return String::new();
        }
        id.descendants(&self.arena)
            .filter_map(|d| match &self.arena[d].get().kind {
                NodeKind::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialized children. `clean` leaves out instrumentation attributes.
    pub fn inner_html(&self, id: NodeId, clean: bool) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(child, clean, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId, clean: bool) -> String {
        let mut out = String::new();
        self.write_node(id, clean, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, clean: bool, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(child, clean, out);
                }
            }
            NodeKind::Text { text } => out.push_str(&escape_html(text)),
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attrs {
                    if clean && self.is_instrumentation(name) {
                        continue;
                    }
                    let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in self.children(id) {
                    self.write_node(child, clean, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }

    /// Replaces the children of `id` with parsed `markup`. Every new element
    /// gets the `marker` attributes. Plain text skips the parser.
    pub fn set_inner_markup(
        &mut self,
        id: NodeId,
        markup: &str,
        marker: &[(String, String)],
    ) -> CanvasResult<()> {
        if !markup.contains('<') {
            self.clear_children(id);
            if !markup.is_empty() {
                let text = crate::jsx::text::decode_entities(markup);
                self.append_text(id, &text);
            }
            return Ok(());
        }

        let wrapped = format!("<{0}>{1}</{0}>", WRAPPER, to_xml(markup));
        let doc = roxmltree::Document::parse(&wrapped)?;
        self.clear_children(id);
        for child in doc.root_element().children() {
            self.append_parsed(id, child, marker);
        }
        Ok(())
    }

    fn append_parsed(&mut self, parent: NodeId, node: roxmltree::Node, marker: &[(String, String)]) {
        if node.is_text() {
            if let Some(text) = node.text() {
                self.append_text(parent, text);
            }
        } else if node.is_element() {
            let mut attrs: Vec<(String, String)> = node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect();
            for (name, value) in marker {
                if !attrs.iter().any(|(k, _)| k == name) {
                    attrs.push((name.clone(), value.clone()));
                }
            }
            let element = self.append_element(parent, node.tag_name().name(), attrs, false);
            for child in node.children() {
                self.append_parsed(element, child, marker);
            }
        }
    }
}

/// HTML markup → well-formed XML: void elements self-close, `&nbsp;` becomes numeric.
fn to_xml(markup: &str) -> String {
    static VOID_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = VOID_TAG_REGEX.get_or_init(|| {
        Regex::new(&format!(r"<({})(\s[^<>]*?)?\s*/?>", VOID_ELEMENTS.join("|"))).unwrap()
    });
    re.replace_all(markup, "<$1$2/>")
        .replace("&nbsp;", "&#160;")
}

/// Escapes text content for HTML.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes a double-quoted attribute value.
pub fn escape_attribute(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

impl AddressableTree for Dom {
    type Node = NodeId;

    fn addressable_nodes(&self) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| !self.is_synthetic(*id))
            .collect()
    }

    fn addressable_parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        if self.is_element(parent) && !self.is_synthetic(parent) {
            Some(parent)
        } else {
            None
        }
    }

    fn siblings(&self, node: NodeId) -> Vec<NodeId> {
        match self.parent(node) {
            Some(parent) => self
                .element_children(parent)
                .into_iter()
                .filter(|c| !self.is_synthetic(*c))
                .collect(),
            None => vec![node],
        }
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.tag(node).map(str::to_ascii_lowercase).unwrap_or_default()
    }

    fn element_id(&self, node: NodeId) -> Option<String> {
        self.attribute(node, "id")
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{address_of, locate};

    fn marker() -> Vec<(String, String)> {
        vec![("contenteditable".to_string(), "false".to_string())]
    }

    fn sample() -> (Dom, NodeId, NodeId) {
        let mut dom = Dom::new(vec!["contenteditable".to_string()]);
        let root = dom.root();
        let wrapper = dom.append_element(root, "div", Vec::new(), true);
        let h1 = dom.append_element(
            wrapper,
            "h1",
            vec![
                ("class".to_string(), "text-lg font-bold".to_string()),
                ("contenteditable".to_string(), "false".to_string()),
            ],
            false,
        );
        dom.append_text(h1, "Fish & Chips");
        let img = dom.append_element(wrapper, "img", vec![("alt".to_string(), "a \"b\"".to_string())], false);
        (dom, h1, img)
    }

    #[test]
    fn serializes_with_and_without_instrumentation() {
        let (dom, h1, img) = sample();
        assert_eq!(
            dom.outer_html(h1, false),
            r#"<h1 class="text-lg font-bold" contenteditable="false">Fish &amp; Chips</h1>"#
        );
        assert_eq!(dom.outer_html(h1, true), r#"<h1 class="text-lg font-bold">Fish &amp; Chips</h1>"#);
        assert_eq!(dom.outer_html(img, true), r#"<img alt="a &quot;b&quot;">"#);
        assert_eq!(dom.text_content(h1), "Fish & Chips");
        assert_eq!(dom.class_list(h1), vec!["text-lg", "font-bold"]);
    }

    #[test]
    fn synthetic_wrapper_is_not_addressed() {
        let (dom, h1, img) = sample();
        assert_eq!(address_of(&dom, h1).to_string(), "h1");
        assert_eq!(address_of(&dom, img).to_string(), "img");
        assert_eq!(locate(&dom, &"h1".parse().unwrap()).unwrap(), h1);
        assert_eq!(dom.addressable_nodes().len(), 2);
    }

    #[test]
    fn attribute_editing() {
        let (mut dom, h1, _) = sample();
        dom.set_attribute(h1, "title", "x");
        dom.set_attribute(h1, "class", "p-4");
        assert_eq!(dom.attribute(h1, "class"), Some("p-4"));
        assert!(dom.remove_attribute(h1, "title"));
        assert!(!dom.remove_attribute(h1, "title"));
        assert_eq!(
            dom.clean_attributes(h1),
            vec![("class".to_string(), "p-4".to_string())]
        );
    }

    #[test]
    fn inner_markup_replacement() {
        let (mut dom, h1, _) = sample();
        dom.set_inner_markup(h1, "Hello <em class=\"italic\">there</em><br>&nbsp;", &marker())
            .unwrap();
        assert_eq!(
            dom.inner_html(h1, false),
            "Hello <em class=\"italic\" contenteditable=\"false\">there</em><br contenteditable=\"false\">\u{a0}"
        );
        assert_eq!(dom.inner_html(h1, true), "Hello <em class=\"italic\">there</em><br>\u{a0}");

        dom.set_inner_markup(h1, "Plain &amp; simple", &marker()).unwrap();
        assert_eq!(dom.text_content(h1), "Plain & simple");

        assert!(dom.set_inner_markup(h1, "<b>unclosed", &marker()).is_err());
        assert_eq!(dom.text_content(h1), "Plain & simple");
    }

    #[test]
    fn removed_nodes_are_stale() {
        let (mut dom, h1, _) = sample();
        let root = dom.root();
        dom.clear_children(root);
        assert!(dom.node(h1).is_none());
        assert!(dom.elements().is_empty());
        assert_eq!(dom.attribute(h1, "class"), None);
    }
}
