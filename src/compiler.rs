//! # Source compiler
//!
//! Turns snippet text into a [`CompiledComponent`]: the component's name,
//! a content-derived identity, and an instrumented render template. Every
//! element in the template carries the editor marker attribute so the
//! preview can make it selectable without changing how it looks.
//!
//! The template is what the snippet renders without running its JavaScript:
//! static markup, literal expressions and JSX nested in expressions.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::CanvasConfig;
use crate::dom::is_void_element;
use crate::error::{CanvasError, CanvasResult};
use crate::jsx::text::{literal_expression_value, normalize_jsx_text, strip_js_comments};
use crate::jsx::{
    self, AttrValue, Dialect, JsxAttribute, JsxNode, NodeId, SourceMode, Span, SyntaxTree,
};

/// Marker placed on every rendered element: addressable, not editable in place.
pub const INSTRUMENTATION_MARKER: (&str, &str) = ("contenteditable", "false");

/// A node of the render template.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Element(VElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<VNode>,
    /// Editor-generated wrapper, not part of the snippet
    pub synthetic: bool,
}

impl VNode {
    /// Levels of elements from this node down (text counts as zero).
    pub fn depth(&self) -> usize {
        match self {
            VNode::Text(_) => 0,
            VNode::Element(el) => 1 + el.children.iter().map(VNode::depth).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledComponent {
    /// Hex SHA-256 of dialect and source; equal ids render identically
    pub id: String,
    pub name: String,
    pub mode: SourceMode,
    pub dialect: Dialect,
    /// Top-level nodes placed in the mount point
    pub template: Vec<VNode>,
}

impl CompiledComponent {
    pub fn has_synthetic_wrapper(&self) -> bool {
        matches!(self.template.as_slice(), [VNode::Element(el)] if el.synthetic)
    }

    pub fn depth(&self) -> usize {
        self.template.iter().map(VNode::depth).max().unwrap_or(0)
    }
}

/// What a snippet renders: the component name and the JSX roots it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub name: String,
    pub roots: Vec<NodeId>,
    pub synthetic_wrapper: bool,
}

/// Compiles a snippet. Deterministic: the same text and dialect always give
/// the same component, identity included.
pub fn compile(source: &str, dialect: Dialect, config: &CanvasConfig) -> CanvasResult<CompiledComponent> {
    let result = compile_inner(source, dialect, config);
    match &result {
        Ok(component) => debug!(
            name = %component.name,
            id = %&component.id[..12],
            mode = ?component.mode,
            "compiled snippet"
        ),
        Err(e) => warn!(%dialect, error = %e, "snippet failed to compile"),
    }
    result
}

fn compile_inner(source: &str, dialect: Dialect, config: &CanvasConfig) -> CanvasResult<CompiledComponent> {
    let tree = jsx::parse(source, dialect)?;
    if dialect == Dialect::Jsx && tree.mode == SourceMode::Script {
        reject_type_syntax(source, &tree)?;
    }
    let target = render_target(&tree, source, config)?;

    let mut rendered = Vec::new();
    for &root in &target.roots {
        render_node(&tree, root, &mut rendered);
    }
    let template = if target.synthetic_wrapper {
        vec![VNode::Element(VElement {
            tag: config.wrapper_tag.clone(),
            attributes: Vec::new(),
            children: rendered,
            synthetic: true,
        })]
    } else {
        rendered
    };

    Ok(CompiledComponent {
        id: component_id(source, dialect),
        name: target.name,
        mode: tree.mode,
        dialect,
        template,
    })
}

pub fn component_id(source: &str, dialect: Dialect) -> String {
    let mut hasher = Sha256::new();
    hasher.update(dialect.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(source.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Top-level bindings (`const Name`, `function Name`, ...) at column zero.
fn bindings(source: &str) -> Vec<(String, usize)> {
    static BINDING_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = BINDING_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^(?:export\s+(?:default\s+)?)?(?:const|let|var|function)\s+([A-Za-z_$][\w$]*)")
            .unwrap()
    });
    re.captures_iter(source)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some((c[1].to_string(), whole.start()))
        })
        .collect()
}

/// Picks what the snippet renders. A bare fragment renders all of its roots
/// inside the synthetic wrapper. A script renders the first capitalized
/// binding (else the first binding), using the last JSX root inside it.
pub fn render_target(tree: &SyntaxTree, source: &str, config: &CanvasConfig) -> CanvasResult<RenderTarget> {
    if tree.mode == SourceMode::Markup {
        return Ok(RenderTarget {
            name: config.wrapper_component.clone(),
            roots: tree.roots().to_vec(),
            synthetic_wrapper: true,
        });
    }

    let found = bindings(source);
    let chosen = found
        .iter()
        .position(|(name, _)| name.starts_with(|c: char| c.is_ascii_uppercase()))
        .or(if found.is_empty() { None } else { Some(0) });
    let Some(index) = chosen else {
        return Err(CanvasError::NoComponent {
            name: String::new(),
        });
    };

    let (name, start) = &found[index];
    let end = found
        .iter()
        .map(|(_, offset)| *offset)
        .filter(|offset| offset > start)
        .min()
        .unwrap_or(source.len());
    let range = Span::new(*start, end);

    let root = tree
        .roots()
        .iter()
        .copied()
        .filter(|&r| {
            let span = tree.node(r).span;
            span.start >= range.start && span.end <= range.end
        })
        .last()
        .ok_or_else(|| CanvasError::NoComponent { name: name.clone() })?;

    Ok(RenderTarget {
        name: name.clone(),
        roots: vec![root],
        synthetic_wrapper: false,
    })
}

/// Script text with every JSX root blanked out, so type checks never see
/// markup. Byte offsets are unchanged.
fn script_text(source: &str, tree: &SyntaxTree) -> String {
    let mut masked = source.to_string();
    for &root in tree.roots() {
        let span = tree.node(root).span;
        let blank: String = source[span.start..span.end]
            .chars()
            .flat_map(|c| {
                let fill = if c == '\n' { '\n' } else { ' ' };
                std::iter::repeat(fill).take(c.len_utf8())
            })
            .collect();
        masked.replace_range(span.start..span.end, &blank);
    }
    masked
}

/// Rejects TypeScript-only constructs in the JSX dialect.
fn reject_type_syntax(source: &str, tree: &SyntaxTree) -> CanvasResult<()> {
    static TYPE_RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let rules = TYPE_RULES.get_or_init(|| {
        vec![
            (
                Regex::new(r"(?m)^\s*(?:export\s+)?interface\s+[A-Za-z_$]").unwrap(),
                "interface declaration",
            ),
            (
                Regex::new(r"(?m)^\s*(?:export\s+)?type\s+[A-Za-z_$][\w$]*\s*(?:<[^>]*>)?\s*=").unwrap(),
                "type alias",
            ),
            (
                Regex::new(r"(?m)^\s*(?:export\s+)?(?:const\s+)?enum\s+[A-Za-z_$]").unwrap(),
                "enum declaration",
            ),
            (
                Regex::new(r"\b(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*:\s*[A-Za-z_$({\[]").unwrap(),
                "type-annotated binding",
            ),
            (
                Regex::new(r"\}\s*:\s*[A-Z][\w$.]*(?:<[^>]*>)?\s*\)").unwrap(),
                "type-annotated parameter",
            ),
        ]
    });
    let script = script_text(source, tree);
    for (pattern, construct) in rules {
        if let Some(m) = pattern.find(&script) {
            let offset = m.start() + (m.as_str().len() - m.as_str().trim_start().len());
            let (line, column) = crate::error::line_column(source, offset);
            return Err(CanvasError::UnsupportedSyntax {
                dialect: Dialect::Jsx,
                construct: format!("{} at line {}, column {}", construct, line, column),
            });
        }
    }
    Ok(())
}

/// React's attribute name mapping; `None` for attributes that never reach the DOM.
pub(crate) fn dom_attribute_name(name: &str) -> Option<&str> {
    match name {
        "className" => Some("class"),
        "htmlFor" => Some("for"),
        "key" | "ref" | "children" | "dangerouslySetInnerHTML" | "suppressHydrationWarning" => None,
        _ if is_event_handler(name) => None,
        _ => Some(name),
    }
}

pub(crate) fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on") && name[2..].starts_with(|c: char| c.is_ascii_uppercase())
}

/// Value an attribute renders with, if it renders at all.
pub(crate) fn dom_attribute_value(value: &Option<AttrValue>) -> Option<String> {
    match value {
        None => Some(String::new()),
        Some(AttrValue::Str { value, .. }) => Some(value.clone()),
        Some(AttrValue::Expression { code, .. }) => {
            match strip_js_comments(code).trim() {
                "true" => Some(String::new()),
                "false" | "null" | "undefined" => None,
                _ => literal_expression_value(code),
            }
        }
    }
}

fn render_node(tree: &SyntaxTree, id: NodeId, out: &mut Vec<VNode>) {
    match &tree.node(id).kind {
        JsxNode::Text(text) => {
            let normalized = normalize_jsx_text(&text.raw);
            if !normalized.is_empty() {
                push_text(out, normalized);
            }
        }
        JsxNode::Expression(expr) => {
            if expr.is_empty() {
                return;
            }
            if let Some(value) = literal_expression_value(&expr.code) {
                push_text(out, value);
                return;
            }
            for &embedded in &expr.embedded {
                render_node(tree, embedded, out);
            }
        }
        JsxNode::Fragment(fragment) => {
            for &child in &fragment.children {
                render_node(tree, child, out);
            }
        }
        JsxNode::Element(el) if el.is_fragment() => {
            for &child in &el.children {
                render_node(tree, child, out);
            }
        }
        JsxNode::Element(el) => {
            let tag = el.tag_name();
            let mut attributes: Vec<(String, String)> = Vec::new();
            for attribute in &el.attributes {
                let JsxAttribute::Named { name, value, .. } = attribute else {
                    continue;
                };
                let Some(dom_name) = dom_attribute_name(name) else {
                    continue;
                };
                if let Some(v) = dom_attribute_value(value) {
                    attributes.retain(|(k, _)| k != dom_name);
                    attributes.push((dom_name.to_string(), v));
                }
            }
            attributes.push((
                INSTRUMENTATION_MARKER.0.to_string(),
                INSTRUMENTATION_MARKER.1.to_string(),
            ));

            let mut children = Vec::new();
            if !is_void_element(&tag) {
                for &child in &el.children {
                    render_node(tree, child, &mut children);
                }
            }
            out.push(VNode::Element(VElement {
                tag,
                attributes,
                children,
                synthetic: false,
            }));
        }
    }
}

/// Adjacent text merges into one node, as it does in the browser.
fn push_text(out: &mut Vec<VNode>, text: String) {
    if let Some(VNode::Text(previous)) = out.last_mut() {
        previous.push_str(&text);
    } else {
        out.push(VNode::Text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &VNode) -> &VElement {
        match node {
            VNode::Element(el) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    fn attr<'a>(el: &'a VElement, name: &str) -> Option<&'a str> {
        el.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn compiles_component_definition() {
        let src = r#"const C = () => <div className="p-4"><h1 className="text-lg">Hi</h1></div>"#;
        let component = compile(src, Dialect::Jsx, &CanvasConfig::default()).unwrap();
        assert_eq!(component.name, "C");
        assert_eq!(component.mode, SourceMode::Script);
        assert!(!component.has_synthetic_wrapper());

        let div = element(&component.template[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(attr(div, "class"), Some("p-4"));
        assert_eq!(attr(div, "contenteditable"), Some("false"));
        let h1 = element(&div.children[0]);
        assert_eq!(h1.children, vec![VNode::Text("Hi".to_string())]);
        assert_eq!(component.depth(), 2);
    }

    #[test]
    fn bare_markup_gets_the_synthetic_wrapper() {
        let component = compile("<h1>A</h1>\n<p>B</p>", Dialect::Jsx, &CanvasConfig::default()).unwrap();
        assert_eq!(component.name, "Sandbox");
        assert!(component.has_synthetic_wrapper());
        let wrapper = element(&component.template[0]);
        assert_eq!(wrapper.children.len(), 2);
        assert_eq!(attr(wrapper, "contenteditable"), None);
    }

    #[test]
    fn identity_is_content_derived() {
        let config = CanvasConfig::default();
        let a = compile("<p>x</p>", Dialect::Jsx, &config).unwrap();
        let b = compile("<p>x</p>", Dialect::Jsx, &config).unwrap();
        let c = compile("<p>y</p>", Dialect::Jsx, &config).unwrap();
        let d = compile("<p>x</p>", Dialect::Tsx, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id.len(), 64);
        assert_ne!(a.id, c.id);
        assert_ne!(a.id, d.id);
    }

    #[test]
    fn picks_capitalized_binding_and_its_last_root() {
        let src = r#"
const helper = () => <span>helper</span>;
function Card({ title }) {
  if (!title) return <p>empty</p>;
  return <article className="card">{title}</article>;
}
"#;
        let component = compile(src, Dialect::Jsx, &CanvasConfig::default()).unwrap();
        assert_eq!(component.name, "Card");
        assert_eq!(element(&component.template[0]).tag, "article");
    }

    #[test]
    fn react_rendering_rules() {
        let src = r#"const C = () => (
  <>
    <label htmlFor="x" key="k" onClick={go} {...rest} data-n={3} hidden={false} title={"t"}>
      Tom &amp; {"Jerry"}
      {/* comment */}
    </label>
    <img src="a.png" alt="" />
    <Badge tone="info">{cond && <b>bold</b>}</Badge>
  </>
);"#;
        let component = compile(src, Dialect::Jsx, &CanvasConfig::default()).unwrap();
        assert_eq!(component.template.len(), 3);

        let label = element(&component.template[0]);
        let names: Vec<&str> = label.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["for", "data-n", "title", "contenteditable"]);
        assert_eq!(attr(label, "data-n"), Some("3"));
        assert_eq!(label.children, vec![VNode::Text("Tom & Jerry".to_string())]);

        let img = element(&component.template[1]);
        assert!(img.children.is_empty());
        assert_eq!(attr(img, "alt"), Some(""));

        let badge = element(&component.template[2]);
        assert_eq!(badge.tag, "badge");
        assert_eq!(element(&badge.children[0]).tag, "b");
    }

    #[test]
    fn jsx_dialect_rejects_type_syntax() {
        let config = CanvasConfig::default();
        let cases = [
            "interface Props { title: string }\nconst C = (p) => <p>{p.title}</p>;",
            "type Size = 'sm' | 'lg';\nconst C = () => <p/>;",
            "enum Tone { Info }\nconst C = () => <p/>;",
            "const n: number = 3;\nconst C = () => <p>{n}</p>;",
            "const C = ({ title }: Props) => <p>{title}</p>;",
        ];
        for src in cases {
            let err = compile(src, Dialect::Jsx, &config).unwrap_err();
            assert!(matches!(err, CanvasError::UnsupportedSyntax { .. }), "{}: {:?}", src, err);
            assert!(err.is_compile_error());
            assert!(compile(src, Dialect::Tsx, &config).is_ok(), "{}", src);
        }
    }

    #[test]
    fn object_literals_and_markup_are_not_type_syntax() {
        let src = r#"const style = { color: "red" };
const C = () => <p title="type X = 1">{"const a: b"}</p>;"#;
        assert!(compile(src, Dialect::Jsx, &CanvasConfig::default()).is_ok());
    }

    #[test]
    fn compile_failures() {
        let config = CanvasConfig::default();
        let err = compile("const C = () => <div>", Dialect::Jsx, &config).unwrap_err();
        assert!(matches!(err, CanvasError::Compile { .. }));

        let err = compile("const C = () => null;", Dialect::Jsx, &config).unwrap_err();
        assert_eq!(err, CanvasError::NoComponent { name: "C".to_string() });

        let err = compile("import React from 'react';", Dialect::Jsx, &config).unwrap_err();
        assert!(matches!(err, CanvasError::NoComponent { .. }));
    }
}
