//! # Source patcher
//!
//! Writes a committed snapshot back into the snippet text. The element is
//! found again by structural address in a fresh parse, then only its
//! opening tag and (for text-only elements) its single text child are
//! spliced. Everything else in the source keeps its exact bytes.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::address::{locate, SourceScope};
use crate::compiler::{dom_attribute_name, dom_attribute_value, render_target};
use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::jsx::text::{jsx_attribute_literal, jsx_text_literal, normalize_jsx_text};
use crate::jsx::{self, Dialect, JsxAttribute, JsxElement, JsxNode, NodeId, Span, SyntaxTree};
use crate::sandbox::NodeSnapshot;
use crate::session::CommitTarget;

/// One replacement in the source text. An empty span is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Splice {
    span: Span,
    text: String,
}

/// Returns `source` with `snapshot` written into the element at its address.
/// On any error the caller's source is left as it was.
pub fn patch(source: &str, snapshot: &NodeSnapshot, dialect: Dialect, config: &CanvasConfig) -> CanvasResult<String> {
    let tree = jsx::parse(source, dialect)?;
    let target = render_target(&tree, source, config)?;
    let scope = SourceScope::new(&tree, &target.roots);
    let node = locate(&scope, &snapshot.structural_address)?;
    let element = tree.element(node).ok_or_else(|| CanvasError::NotFound {
        address: snapshot.structural_address.to_string(),
    })?;

    let mut splices = attribute_splices(source, element, snapshot, config);
    splices.extend(text_splice(&tree, element, snapshot));
    if splices.is_empty() {
        debug!(address = %snapshot.structural_address, "source already matches snapshot");
        return Ok(source.to_string());
    }

    splices.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    let mut patched = source.to_string();
    for splice in &splices {
        patched.replace_range(splice.span.start..splice.span.end, &splice.text);
    }

    // the result must still be a snippet the editor can load
    jsx::parse(&patched, dialect)?;
    info!(
        address = %snapshot.structural_address,
        splices = splices.len(),
        "patched source"
    );
    Ok(patched)
}

/// DOM attributes the snapshot wants on the element, editor markers excluded.
fn desired_attributes<'a>(snapshot: &'a NodeSnapshot, config: &CanvasConfig) -> BTreeMap<&'a str, String> {
    let mut desired: BTreeMap<&str, String> = snapshot
        .attributes
        .iter()
        .filter(|(name, _)| name.as_str() != "class" && !config.is_instrumentation(name))
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();
    if !snapshot.class_list.is_empty() {
        desired.insert("class", snapshot.class_list.join(" "));
    }
    desired
}

fn source_attribute_name(dom_name: &str) -> &str {
    match dom_name {
        "class" => "className",
        "for" => "htmlFor",
        other => other,
    }
}

fn attribute_text(name: &str, value: &str) -> String {
    if value.is_empty() {
        name.to_string()
    } else {
        format!("{}={}", name, jsx_attribute_literal(value))
    }
}

fn attribute_splices(
    source: &str,
    element: &JsxElement,
    snapshot: &NodeSnapshot,
    config: &CanvasConfig,
) -> Vec<Splice> {
    let desired = desired_attributes(snapshot, config);
    let mut written: HashSet<&str> = HashSet::new();
    let mut splices = Vec::new();

    for attribute in &element.attributes {
        let JsxAttribute::Named { name, value, span } = attribute else {
            continue;
        };
        if config.is_preserved(name) {
            continue;
        }
        let Some(dom_name) = dom_attribute_name(name) else {
            continue;
        };
        if config.is_instrumentation(dom_name) {
            continue;
        }
        let rendered = dom_attribute_value(value);
        match desired.get_key_value(dom_name) {
            Some((key, wanted)) => {
                written.insert(*key);
                if rendered.as_deref() != Some(wanted.as_str()) {
                    splices.push(Splice {
                        span: *span,
                        text: attribute_text(name, wanted),
                    });
                }
            }
            // attributes that never reached the DOM were not editable there
            None if rendered.is_none() => {}
            None => splices.push(Splice {
                span: Span::new(whitespace_start(source, span.start), span.end),
                text: String::new(),
            }),
        }
    }

    let insert_at = element
        .attributes
        .last()
        .map(|a| a.span().end)
        .unwrap_or_else(|| tag_name_end(source, element));
    let mut added = String::new();
    let missing = desired
        .iter()
        .filter(|(name, _)| !written.contains(*name))
        .map(|(name, value)| (*name, value));
    // className first, the rest in name order
    let (class, rest): (Vec<_>, Vec<_>) = missing.partition(|(name, _)| *name == "class");
    for (name, value) in class.into_iter().chain(rest) {
        added.push(' ');
        added.push_str(&attribute_text(source_attribute_name(name), value));
    }
    if !added.is_empty() {
        splices.push(Splice {
            span: Span::new(insert_at, insert_at),
            text: added,
        });
    }
    splices
}

/// Start of the whitespace run that ends at `offset`.
fn whitespace_start(source: &str, offset: usize) -> usize {
    let before = &source[..offset];
    before.trim_end().len()
}

fn tag_name_end(source: &str, element: &JsxElement) -> usize {
    let opening = element.opening.slice(source);
    opening
        .find(element.name.as_str())
        .map(|i| element.opening.start + i + element.name.len())
        .unwrap_or(element.opening.start + 1)
}

/// Rewrites the element's text when it holds exactly one text child and the
/// snapshot still describes a text-only element with non-empty text.
fn text_splice(tree: &SyntaxTree, element: &JsxElement, snapshot: &NodeSnapshot) -> Option<Splice> {
    if !snapshot.is_text_leaf() || snapshot.text_content.trim().is_empty() {
        return None;
    }
    let [child]: [NodeId; 1] = element.children.as_slice().try_into().ok()?;
    let node = tree.node(child);
    let JsxNode::Text(text) = &node.kind else {
        return None;
    };
    if normalize_jsx_text(&text.raw) == snapshot.text_content {
        return None;
    }

    // keep line-break indentation around the text, it never renders
    let raw = text.raw.as_str();
    let leading = &raw[..raw.len() - raw.trim_start().len()];
    let trailing = &raw[raw.trim_end().len()..];
    let leading = if leading.contains('\n') { leading } else { "" };
    let trailing = if trailing.contains('\n') { trailing } else { "" };
    Some(Splice {
        span: node.span,
        text: format!("{}{}{}", leading, jsx_text_literal(&snapshot.text_content), trailing),
    })
}

/// The authoritative snippet text. Commits rewrite it through [`patch`].
#[derive(Debug, Clone)]
pub struct SourceDocument {
    text: String,
    dialect: Dialect,
    config: CanvasConfig,
    revision: u64,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>, dialect: Dialect, config: CanvasConfig) -> Self {
        Self {
            text: text.into(),
            dialect,
            config,
            revision: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Bumped on every change to the text.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// Replaces the text wholesale, as an external editor would.
    pub fn replace(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.revision += 1;
        }
    }

    /// Patches `snapshot` into the text. Returns whether anything changed.
    pub fn apply(&mut self, snapshot: &NodeSnapshot) -> CanvasResult<bool> {
        let patched = patch(&self.text, snapshot, self.dialect, &self.config)?;
        if patched == self.text {
            return Ok(false);
        }
        self.text = patched;
        self.revision += 1;
        Ok(true)
    }
}

impl CommitTarget for SourceDocument {
    fn commit_snapshot(&mut self, snapshot: &NodeSnapshot) -> CanvasResult<()> {
        self.apply(snapshot).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CARD: &str = r#"export default function Card() {
  return (
    <div className="p-4">
      <h1 className="text-lg">Hello</h1>
    </div>
  );
}
"#;

    fn snapshot(address: &str, attributes: &[(&str, &str)], text: &str) -> NodeSnapshot {
        let attributes: BTreeMap<String, String> = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let class_list = attributes
            .get("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        NodeSnapshot {
            structural_address: address.parse().unwrap(),
            tag_name: address.rsplit(' ').next().unwrap().to_string(),
            attributes,
            class_list,
            inner_markup: text.to_string(),
            text_content: text.to_string(),
        }
    }

    fn config() -> CanvasConfig {
        CanvasConfig::default()
    }

    #[test]
    fn rewrites_only_the_matched_class() {
        let snap = snapshot("div > h1", &[("class", "text-2xl")], "Hello");
        let patched = patch(CARD, &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, CARD.replace("className=\"text-lg\"", "className=\"text-2xl\""));
        assert!(patched.contains(r#"<div className="p-4">"#));
    }

    #[test]
    fn patching_is_idempotent() {
        let snap = snapshot("div > h1", &[("class", "text-2xl font-bold")], "Hello there");
        let once = patch(CARD, &snap, Dialect::Jsx, &config()).unwrap();
        let twice = patch(&once, &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains(r#"<h1 className="text-2xl font-bold">Hello there</h1>"#));
    }

    #[test]
    fn missing_element_is_not_found() {
        let snap = snapshot("div > h2", &[("class", "p-2")], "Hi");
        let err = patch(CARD, &snap, Dialect::Jsx, &config()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn keeps_preserved_handlers_and_spreads() {
        let source = r#"<button key="a" onClick={() => go()} {...rest} className="p-2" disabled>Go</button>"#;
        let snap = snapshot("button", &[("class", "p-4"), ("disabled", "")], "Go");
        let patched = patch(source, &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(
            patched,
            r#"<button key="a" onClick={() => go()} {...rest} className="p-4" disabled>Go</button>"#
        );
    }

    #[test]
    fn adds_and_removes_attributes() {
        let source = r#"<a href="/x" title="t">Go</a>"#;
        let snap = snapshot("a", &[("href", "/y"), ("target", "_blank")], "Go");
        let patched = patch(source, &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, r#"<a href="/y" target="_blank">Go</a>"#);
    }

    #[test]
    fn adds_class_to_bare_and_self_closing_tags() {
        let snap = snapshot("div > p", &[("class", "italic")], "x");
        let patched = patch("<div><p>x</p></div>", &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, r#"<div><p className="italic">x</p></div>"#);

        let snap = snapshot("hr", &[("class", "border-2")], "");
        let patched = patch("<hr />", &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, r#"<hr className="border-2" />"#);
    }

    #[test]
    fn empty_class_list_drops_the_attribute() {
        let snap = snapshot("p", &[], "x");
        let patched = patch(r#"<p className="p-0">x</p>"#, &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, "<p>x</p>");
    }

    #[test]
    fn unrendered_expressions_survive() {
        let source = r#"<p className={styles.title} style={{ color: "red" }}>x</p>"#;
        let snap = snapshot("p", &[], "x");
        assert_eq!(patch(source, &snap, Dialect::Jsx, &config()).unwrap(), source);
    }

    #[test]
    fn instrumentation_is_never_written() {
        let snap = snapshot(
            "p",
            &[("class", "italic"), ("contenteditable", "false"), ("data-canvas-hover", "")],
            "x",
        );
        let patched = patch("<p>x</p>", &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, r#"<p className="italic">x</p>"#);
    }

    #[test]
    fn rewrites_text_and_keeps_indentation() {
        let source = "<div>\n  <p>\n    Hello\n  </p>\n</div>";
        let snap = snapshot("div > p", &[], "Bye");
        let patched = patch(source, &snap, Dialect::Jsx, &config()).unwrap();
        assert_eq!(patched, "<div>\n  <p>\n    Bye\n  </p>\n</div>");

        let snap = snapshot("div > p", &[], "a {b}");
        let patched = patch(source, &snap, Dialect::Jsx, &config()).unwrap();
        assert!(patched.contains(r#"{"a {b}"}"#));
    }

    #[test]
    fn nested_markup_text_is_left_alone() {
        let source = "<p>Hello <b>you</b></p>";
        let mut snap = snapshot("p", &[], "Bye");
        snap.inner_markup = "Bye <b>you</b>".to_string();
        assert_eq!(patch(source, &snap, Dialect::Jsx, &config()).unwrap(), source);
    }

    #[test]
    fn document_commit_target() {
        let mut doc = SourceDocument::new(CARD, Dialect::Jsx, config());
        let snap = snapshot("div > h1", &[("class", "text-2xl")], "Hello");
        doc.commit_snapshot(&snap).unwrap();
        assert_eq!(doc.revision(), 1);
        assert!(doc.text().contains("text-2xl"));

        assert!(!doc.apply(&snap).unwrap());
        assert_eq!(doc.revision(), 1);

        let before = doc.text().to_string();
        let gone = snapshot("section", &[], "x");
        assert!(doc.commit_snapshot(&gone).is_err());
        assert_eq!(doc.text(), before);
    }
}
