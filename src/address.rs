//! # Structural addressing
//!
//! A structural address is the tag chain from the top of a rendered tree
//! down to one element, e.g. `div > ul > li:nth-of-type(2)` or
//! `section#pricing > h2`. An element with an `id` ends the upward walk.
//!
//! [`address_of`] and [`locate`] are written once against
//! [`AddressableTree`] and used for both the live preview DOM and the
//! snippet's syntax tree, so a click in the preview and a lookup in the
//! source always agree on what an address means.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CanvasError, CanvasResult};
use crate::jsx::{NodeId, SyntaxTree};

/// One level of a structural address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Lowercase tag name
    pub tag: String,
    pub id: Option<String>,
    /// 1-based position among same-tag siblings; `None` when the element had no same-tag sibling
    pub nth: Option<usize>,
}

impl Segment {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            nth: None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        } else if let Some(nth) = self.nth {
            write!(f, ":nth-of-type({})", nth)?;
        }
        Ok(())
    }
}

/// Path from the top of a rendered tree to one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StructuralAddress {
    segments: Vec<Segment>,
}

impl StructuralAddress {
    pub fn new(segments: Vec<Segment>) -> CanvasResult<Self> {
        if segments.is_empty() {
            return Err(CanvasError::InvalidAddress {
                address: String::new(),
                reason: "an address needs at least one segment".to_string(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn leaf(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    /// Number of levels; an address never has zero.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for StructuralAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for StructuralAddress {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CanvasError::InvalidAddress {
            address: s.to_string(),
            reason,
        };
        let mut segments = Vec::new();
        for part in s.split('>').map(str::trim) {
            if part.is_empty() {
                return Err(invalid("empty segment".to_string()));
            }
            segments.push(parse_segment(part).map_err(invalid)?);
        }
        StructuralAddress::new(segments).map_err(|_| invalid("empty address".to_string()))
    }
}

fn parse_segment(part: &str) -> Result<Segment, String> {
    let valid_tag = |tag: &str| {
        !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':' | '$'))
    };

    if let Some((tag, id)) = part.split_once('#') {
        if !valid_tag(tag) || id.is_empty() || id.contains(char::is_whitespace) {
            return Err(format!("malformed segment '{}'", part));
        }
        return Ok(Segment {
            tag: tag.to_ascii_lowercase(),
            id: Some(id.to_string()),
            nth: None,
        });
    }

    if let Some((tag, rest)) = part.split_once(":nth-of-type(") {
        let nth = rest
            .strip_suffix(')')
            .and_then(|n| n.trim().parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| format!("bad ordinal in '{}'", part))?;
        if !valid_tag(tag) {
            return Err(format!("malformed segment '{}'", part));
        }
        return Ok(Segment {
            tag: tag.to_ascii_lowercase(),
            id: None,
            nth: Some(nth),
        });
    }

    if !valid_tag(part) {
        return Err(format!("malformed segment '{}'", part));
    }
    Ok(Segment::new(part.to_ascii_lowercase()))
}

impl TryFrom<String> for StructuralAddress {
    type Error = CanvasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StructuralAddress> for String {
    fn from(address: StructuralAddress) -> Self {
        address.to_string()
    }
}

/// A tree whose elements can be addressed. "Top level" is whatever the tree
/// renders at its outermost layer; synthetic containers are not part of it.
pub trait AddressableTree {
    type Node: Copy + Eq + fmt::Debug;

    /// Every addressable element, in document order.
    fn addressable_nodes(&self) -> Vec<Self::Node>;

    /// The enclosing addressable element, or `None` at the top level.
    fn addressable_parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Elements sharing `node`'s parent (top-level elements for a top-level node), in order, `node` included.
    fn siblings(&self, node: Self::Node) -> Vec<Self::Node>;

    fn tag_name(&self, node: Self::Node) -> String;

    /// Non-empty `id` attribute, if statically known.
    fn element_id(&self, node: Self::Node) -> Option<String>;
}

fn ordinal<T: AddressableTree>(tree: &T, node: T::Node, tag: &str) -> (usize, usize) {
    let same: Vec<T::Node> = tree
        .siblings(node)
        .into_iter()
        .filter(|s| tree.tag_name(*s) == tag)
        .collect();
    let position = same.iter().position(|s| *s == node).unwrap_or(0) + 1;
    (position, same.len())
}

/// Address of `node`: walks up to the top level, stopping early at an element with an id.
pub fn address_of<T: AddressableTree>(tree: &T, node: T::Node) -> StructuralAddress {
    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        let tag = tree.tag_name(n);
        if let Some(id) = tree.element_id(n) {
            segments.push(Segment {
                tag,
                id: Some(id),
                nth: None,
            });
            break;
        }
        let (position, count) = ordinal(tree, n, &tag);
        segments.push(Segment {
            nth: (count > 1).then_some(position),
            tag,
            id: None,
        });
        current = tree.addressable_parent(n);
    }
    segments.reverse();
    StructuralAddress { segments }
}

/// Compares `node`'s ancestor chain with the address from the leaf upward.
/// Ordinals are only compared where the address recorded one.
fn matches_chain<T: AddressableTree>(tree: &T, node: T::Node, address: &StructuralAddress) -> bool {
    let mut current = Some(node);
    for segment in address.segments().iter().rev() {
        let Some(n) = current else {
            return false;
        };
        let tag = tree.tag_name(n);
        if tag != segment.tag {
            return false;
        }
        if let Some(id) = &segment.id {
            if tree.element_id(n).as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(nth) = segment.nth {
            if ordinal(tree, n, &tag).0 != nth {
                return false;
            }
        }
        current = tree.addressable_parent(n);
    }
    // an id-anchored address may start anywhere; otherwise the chain must reach the top level
    address.segments()[0].id.is_some() || current.is_none()
}

/// The single element matching `address`. Zero matches is `NotFound`, more
/// than one is `AmbiguousMatch`; neither case guesses.
pub fn locate<T: AddressableTree>(tree: &T, address: &StructuralAddress) -> CanvasResult<T::Node> {
    let leaf = address.leaf();
    let candidates: Vec<T::Node> = tree
        .addressable_nodes()
        .into_iter()
        .filter(|n| tree.tag_name(*n) == leaf.tag)
        .filter(|n| matches_chain(tree, *n, address))
        .collect();
    match candidates.as_slice() {
        [only] => Ok(*only),
        [] => Err(CanvasError::NotFound {
            address: address.to_string(),
        }),
        many => Err(CanvasError::AmbiguousMatch {
            address: address.to_string(),
            candidates: many.len(),
        }),
    }
}

/// The part of a syntax tree that renders: its top level is `roots`
/// (fragments and expression containers flattened).
#[derive(Debug, Clone)]
pub struct SourceScope<'a> {
    tree: &'a SyntaxTree,
    top_level: Vec<NodeId>,
}

impl<'a> SourceScope<'a> {
    pub fn new(tree: &'a SyntaxTree, roots: &[NodeId]) -> Self {
        let mut top_level = Vec::new();
        for &root in roots {
            match tree.element(root) {
                Some(el) if !el.is_fragment() => top_level.push(root),
                _ => top_level.extend(tree.element_children(Some(root))),
            }
        }
        Self { tree, top_level }
    }

    pub fn tree(&self) -> &SyntaxTree {
        self.tree
    }

    fn collect(&self, node: NodeId, out: &mut Vec<NodeId>) {
        out.push(node);
        for child in self.tree.element_children(Some(node)) {
            self.collect(child, out);
        }
    }
}

impl AddressableTree for SourceScope<'_> {
    type Node = NodeId;

    fn addressable_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &node in &self.top_level {
            self.collect(node, &mut out);
        }
        out
    }

    fn addressable_parent(&self, node: NodeId) -> Option<NodeId> {
        if self.top_level.contains(&node) {
            return None;
        }
        self.tree.element_parent(node)
    }

    fn siblings(&self, node: NodeId) -> Vec<NodeId> {
        match self.addressable_parent(node) {
            Some(parent) => self.tree.element_children(Some(parent)),
            None => self.top_level.clone(),
        }
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.tree
            .element(node)
            .map(|el| el.tag_name())
            .unwrap_or_default()
    }

    fn element_id(&self, node: NodeId) -> Option<String> {
        self.tree
            .element(node)?
            .literal_attribute("id")
            .filter(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsx::{parse, Dialect};

    fn scope_for(tree: &SyntaxTree) -> SourceScope<'_> {
        SourceScope::new(tree, tree.roots())
    }

    #[test]
    fn display_and_parse_agree() {
        for text in ["div", "div > h1", "section#pricing > ul > li:nth-of-type(2)", "my-card > p"] {
            let address: StructuralAddress = text.parse().unwrap();
            assert_eq!(address.to_string(), text);
        }
        let address: StructuralAddress = "DIV > P:nth-of-type(3)".parse().unwrap();
        assert_eq!(address.leaf().nth, Some(3));
        assert_eq!(address.leaf().tag, "p");
    }

    #[test]
    fn malformed_addresses() {
        for text in ["", "div >", "> p", "li:nth-of-type(0)", "li:nth-of-type(x)", "div#", "a b"] {
            let err = text.parse::<StructuralAddress>().unwrap_err();
            assert!(matches!(err, CanvasError::InvalidAddress { .. }), "{}", text);
        }
    }

    #[test]
    fn serde_uses_the_string_form() {
        let address: StructuralAddress = "div > h1".parse().unwrap();
        assert_eq!(serde_json::to_string(&address).unwrap(), "\"div > h1\"");
        let back: StructuralAddress = serde_json::from_str("\"div > h1\"").unwrap();
        assert_eq!(back, address);
        assert!(serde_json::from_str::<StructuralAddress>("\"\"").is_err());
    }

    #[test]
    fn ordinals_only_with_same_tag_siblings() {
        let tree = parse("<div><h1>t</h1><p>a</p><p>b</p></div>", Dialect::Jsx).unwrap();
        let scope = scope_for(&tree);
        let addresses: Vec<String> = scope
            .addressable_nodes()
            .into_iter()
            .map(|n| address_of(&scope, n).to_string())
            .collect();
        assert_eq!(
            addresses,
            vec!["div", "div > h1", "div > p:nth-of-type(1)", "div > p:nth-of-type(2)"]
        );
    }

    #[test]
    fn id_stops_the_walk() {
        let tree = parse(
            r#"<main><section id="hero"><p>x</p></section></main>"#,
            Dialect::Jsx,
        )
        .unwrap();
        let scope = scope_for(&tree);
        let p = *scope.addressable_nodes().last().unwrap();
        let address = address_of(&scope, p);
        assert_eq!(address.to_string(), "section#hero > p");
        assert_eq!(locate(&scope, &address).unwrap(), p);
    }

    #[test]
    fn every_node_round_trips() {
        let src = r#"
const Page = () => (
  <div>
    <ul>
      <li>a</li>
      <li>b<span>x</span><span>y</span></li>
      <>{items.map(i => <li key={i}>{i}</li>)}</>
    </ul>
    <footer id="f"><p>1</p><p>2</p></footer>
    <p>outside</p>
  </div>
);"#;
        let tree = parse(src, Dialect::Jsx).unwrap();
        let scope = scope_for(&tree);
        let nodes = scope.addressable_nodes();
        assert_eq!(nodes.len(), 11);
        for node in nodes {
            let address = address_of(&scope, node);
            assert_eq!(locate(&scope, &address).unwrap(), node, "{}", address);
        }
    }

    #[test]
    fn missing_and_ambiguous() {
        let tree = parse("<div><p>a</p></div><div><p>b</p></div>", Dialect::Jsx).unwrap();
        let scope = scope_for(&tree);
        let err = locate(&scope, &"div > h2".parse().unwrap()).unwrap_err();
        assert!(matches!(err, CanvasError::NotFound { .. }));
        // an address without ordinals cannot tell the two divs apart
        let err = locate(&scope, &"div > p".parse().unwrap()).unwrap_err();
        assert!(matches!(err, CanvasError::AmbiguousMatch { candidates: 2, .. }));
        let found = locate(&scope, &"div:nth-of-type(2) > p".parse().unwrap()).unwrap();
        assert_eq!(tree.element(found).unwrap().name, "p");
    }

    #[test]
    fn chain_must_reach_the_top_level() {
        let tree = parse("<div><section><p>a</p></section></div>", Dialect::Jsx).unwrap();
        let scope = scope_for(&tree);
        assert!(locate(&scope, &"section > p".parse().unwrap()).unwrap_err().is_not_found());
        assert!(locate(&scope, &"div > section > p".parse().unwrap()).is_ok());
    }
}
