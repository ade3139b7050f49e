//! # JSX syntax tree
//!
//! A span-preserving syntax tree for pasted React snippets. Only the JSX
//! parts of the snippet are modelled; the surrounding JavaScript is scanned
//! (strings, templates, comments, regex literals, braces) but not parsed, so
//! the tree is exactly what compiling, addressing and patching need.
//!
//! Nodes live in one arena (`Vec<SyntaxNode>`) in document order and are
//! referenced by [`NodeId`]. Every node kind is a variant of [`JsxNode`], so
//! consumers match exhaustively instead of comparing type strings.

mod parser;
pub mod text;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CanvasError, CanvasResult};

pub use parser::{is_component_definition, parse, parse_with_mode};

/// Source flavour of a snippet; selects whether type syntax is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dialect {
    #[default]
    Jsx,
    Tsx,
}

impl Dialect {
    /// Picks the dialect from a file extension (`tsx`/`ts` → TSX, anything else → JSX).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "tsx" | "ts" => Dialect::Tsx,
            _ => Dialect::Jsx,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Jsx => f.write_str("JSX"),
            Dialect::Tsx => f.write_str("TSX"),
        }
    }
}

impl FromStr for Dialect {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsx" => Ok(Dialect::Jsx),
            "tsx" => Ok(Dialect::Tsx),
            other => Err(CanvasError::Config(format!(
                "unknown dialect '{}', expected JSX or TSX",
                other
            ))),
        }
    }
}

/// Byte range `[start, end)` into the snippet text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

pub type NodeId = usize;

/// How the snippet was read: a script with bindings, or a bare markup fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMode {
    Script,
    Markup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: JsxNode,
    pub parent: Option<NodeId>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxNode {
    Element(JsxElement),
    Fragment(JsxFragment),
    Text(JsxText),
    Expression(JsxExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    /// Name as written (`div`, `Card`, `motion.div`)
    pub name: String,
    pub attributes: Vec<JsxAttribute>,
    pub children: Vec<NodeId>,
    pub self_closing: bool,
    /// The `<name ...>` or `<name ... />` tag
    pub opening: Span,
}

impl JsxElement {
    /// Lowercase tag name, the form used in structural addresses.
    pub fn tag_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Intrinsic elements start with a lowercase letter; anything else is a component reference.
    pub fn is_intrinsic(&self) -> bool {
        self.name
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase())
            .unwrap_or(false)
            && !self.name.contains('.')
    }

    /// `<Fragment>` / `<React.Fragment>` render their children only.
    pub fn is_fragment(&self) -> bool {
        self.name == "Fragment" || self.name == "React.Fragment"
    }

    pub fn attribute(&self, name: &str) -> Option<&JsxAttribute> {
        self.attributes.iter().find(|a| a.name() == Some(name))
    }

    /// Statically known value of an attribute (string literal or literal expression).
    pub fn literal_attribute(&self, name: &str) -> Option<String> {
        match self.attribute(name)? {
            JsxAttribute::Named {
                value: Some(value), ..
            } => value.literal_value(),
            JsxAttribute::Named { value: None, .. } => Some(String::new()),
            JsxAttribute::Spread { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxFragment {
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxText {
    /// Raw text exactly as in the source (entities not decoded)
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxExpression {
    /// Code between the braces
    pub code: String,
    /// JSX found inside the expression, e.g. the `<li>` of `items.map(i => <li/>)`
    pub embedded: Vec<NodeId>,
}

impl JsxExpression {
    /// `{/* comment */}` and `{}` render nothing.
    pub fn is_empty(&self) -> bool {
        text::strip_js_comments(&self.code).trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
    Named {
        name: String,
        value: Option<AttrValue>,
        span: Span,
    },
    Spread {
        code: String,
        span: Span,
    },
}

impl JsxAttribute {
    pub fn name(&self) -> Option<&str> {
        match self {
            JsxAttribute::Named { name, .. } => Some(name),
            JsxAttribute::Spread { .. } => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            JsxAttribute::Named { span, .. } | JsxAttribute::Spread { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `name="value"`; `value` has entities decoded
    Str { value: String, quote: char },
    /// `name={code}`
    Expression { code: String, embedded: Vec<NodeId> },
}

impl AttrValue {
    /// The string this value renders to, when it is knowable without running code.
    pub fn literal_value(&self) -> Option<String> {
        match self {
            AttrValue::Str { value, .. } => Some(value.clone()),
            AttrValue::Expression { code, .. } => text::literal_expression_value(code),
        }
    }
}

/// The parsed snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub mode: SourceMode,
    pub dialect: Dialect,
    nodes: Vec<SyntaxNode>,
    roots: Vec<NodeId>,
}

impl SyntaxTree {
    pub(crate) fn new(
        mode: SourceMode,
        dialect: Dialect,
        nodes: Vec<SyntaxNode>,
        roots: Vec<NodeId>,
    ) -> Self {
        Self {
            mode,
            dialect,
            nodes,
            roots,
        }
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[SyntaxNode] {
        &self.nodes
    }

    /// Top-level JSX expressions (not nested in other JSX).
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn element(&self, id: NodeId) -> Option<&JsxElement> {
        match &self.nodes.get(id)?.kind {
            JsxNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// All elements in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, JsxNode::Element(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Nearest enclosing element, looking through fragments and expression containers.
    pub fn element_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(id)?.parent;
        while let Some(p) = current {
            if let JsxNode::Element(el) = &self.nodes[p].kind {
                if !el.is_fragment() {
                    return Some(p);
                }
            }
            current = self.nodes[p].parent;
        }
        None
    }

    /// Direct children of a node (fragment, element or expression container).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id].kind {
            JsxNode::Element(el) => &el.children,
            JsxNode::Fragment(fr) => &fr.children,
            JsxNode::Expression(ex) => &ex.embedded,
            JsxNode::Text(_) => &[],
        }
    }

    /// Elements directly under `parent` as the DOM would see them: fragments,
    /// `<Fragment>` elements and expression containers are flattened. `None` means the top level.
    pub fn element_children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let start: Vec<NodeId> = match parent {
            Some(p) => self.children(p).to_vec(),
            None => self.roots.clone(),
        };
        let mut out = Vec::new();
        for id in start {
            self.collect_flattened(id, &mut out);
        }
        out
    }

    fn collect_flattened(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match &self.nodes[id].kind {
            JsxNode::Element(el) if el.is_fragment() => {
                for &c in &el.children {
                    self.collect_flattened(c, out);
                }
            }
            JsxNode::Element(_) => out.push(id),
            JsxNode::Fragment(fr) => {
                for &c in &fr.children {
                    self.collect_flattened(c, out);
                }
            }
            JsxNode::Expression(ex) => {
                for &c in &ex.embedded {
                    self.collect_flattened(c, out);
                }
            }
            JsxNode::Text(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_parsing() {
        assert_eq!("tsx".parse::<Dialect>().unwrap(), Dialect::Tsx);
        assert_eq!("JSX".parse::<Dialect>().unwrap(), Dialect::Jsx);
        assert!("vue".parse::<Dialect>().is_err());
        assert_eq!(Dialect::from_extension("TSX"), Dialect::Tsx);
        assert_eq!(Dialect::from_extension("jsx"), Dialect::Jsx);
    }

    #[test]
    fn element_children_flatten_fragments_and_expressions() {
        let src = r#"<ul><>{items.map(i => <li>{i}</li>)}</><li>last</li></ul>"#;
        let tree = parse(src, Dialect::Jsx).unwrap();
        let ul = tree.roots()[0];
        let kids = tree.element_children(Some(ul));
        assert_eq!(kids.len(), 2);
        for k in kids {
            assert_eq!(tree.element(k).unwrap().tag_name(), "li");
            assert_eq!(tree.element_parent(k), Some(ul));
        }
    }

    #[test]
    fn named_fragments_are_transparent() {
        let tree = parse("<div><React.Fragment><p>a</p><p>b</p></React.Fragment></div>", Dialect::Jsx).unwrap();
        let div = tree.roots()[0];
        let kids = tree.element_children(Some(div));
        assert_eq!(kids.len(), 2);
        assert_eq!(tree.element_parent(kids[1]), Some(div));
    }

    #[test]
    fn intrinsic_detection() {
        let tree = parse("<div><Card /><motion.div /></div>", Dialect::Jsx).unwrap();
        let names: Vec<(String, bool)> = tree
            .elements()
            .into_iter()
            .map(|id| {
                let el = tree.element(id).unwrap();
                (el.name.clone(), el.is_intrinsic())
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("div".to_string(), true),
                ("Card".to_string(), false),
                ("motion.div".to_string(), false),
            ]
        );
    }
}
