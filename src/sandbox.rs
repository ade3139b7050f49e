//! # Sandboxed renderer
//!
//! Hosts one compiled component in a mount point that survives re-renders
//! of the same component, turns clicks in selection mode into
//! [`CanvasMessage::ComponentSelected`] messages, and applies live patches
//! to the mounted DOM without re-rendering.
//!
//! The renderer talks to the host through exactly two paths: selection
//! messages on an unbounded FIFO channel, and direct [`Sandbox::apply_patch`]
//! calls. Applying a patch never produces a message.

use indextree::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::address::{address_of, locate, StructuralAddress};
use crate::compiler::{CompiledComponent, VNode, INSTRUMENTATION_MARKER};
use crate::config::CanvasConfig;
use crate::dom::{escape_attribute, escape_html, Dom};
use crate::error::{CanvasError, CanvasResult};

/// `sandbox` attribute of the preview iframe: scripts run, but the frame
/// gets an opaque origin and cannot navigate the host.
pub const IFRAME_SANDBOX: &str = "allow-scripts";

const HOVER_ATTRIBUTE: &str = "data-canvas-hover";
const ERROR_ATTRIBUTE: &str = "data-canvas-error";

const BASE_STYLES: &str = "html,body{margin:0;min-height:100%;}\
#root{padding:1rem;}\
[data-canvas-error]{font-family:monospace;color:#b91c1c;background:#fef2f2;border:1px solid #fecaca;border-radius:4px;padding:0.75rem;white-space:pre-wrap;}";

/// One selected element at the moment of capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub structural_address: StructuralAddress,
    pub tag_name: String,
    /// Attributes without editor markers; `class` always equals `class_list` joined by spaces
    pub attributes: BTreeMap<String, String>,
    pub class_list: Vec<String>,
    pub inner_markup: String,
    pub text_content: String,
}

impl NodeSnapshot {
    /// Replaces the class list and keeps the `class` attribute in step.
    pub fn set_class_list(&mut self, class_list: Vec<String>) {
        if class_list.is_empty() {
            self.attributes.remove("class");
        } else {
            self.attributes
                .insert("class".to_string(), class_list.join(" "));
        }
        self.class_list = class_list;
    }

    /// True when the element holds text only (no nested markup).
    pub fn is_text_leaf(&self) -> bool {
        !self.inner_markup.contains('<')
    }
}

/// Renderer → host messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CanvasMessage {
    #[serde(rename = "COMPONENT_SELECTED")]
    ComponentSelected(NodeSnapshot),
}

impl CanvasMessage {
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string(self).map_err(|e| CanvasError::Render {
            message: format!("serialize message: {}", e),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// New component: the mount point was rebuilt
    Fresh,
    /// Same component: the existing DOM (and its live patches) stays
    Reused,
    /// Rendering failed; the mount point shows the error inline
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// Older than a patch already applied; ignored
    Stale,
}

pub struct Sandbox {
    config: CanvasConfig,
    dom: Dom,
    mounted: Option<String>,
    render_error: Option<String>,
    selection_mode: bool,
    hovered: Option<NodeId>,
    generation: u64,
    events: UnboundedSender<CanvasMessage>,
}

impl Sandbox {
    /// A renderer and the receiving end of its message channel.
    pub fn new(config: CanvasConfig) -> (Self, UnboundedReceiver<CanvasMessage>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let dom = Dom::new(config.instrumentation_attributes.clone());
        (
            Self {
                config,
                dom,
                mounted: None,
                render_error: None,
                selection_mode: false,
                hovered: None,
                generation: 0,
                events,
            },
            receiver,
        )
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn mounted_id(&self) -> Option<&str> {
        self.mounted.as_deref()
    }

    pub fn render_error(&self) -> Option<&str> {
        self.render_error.as_deref()
    }

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Renders `component`, reusing the mount point when it is already showing it.
    pub fn mount(&mut self, component: &CompiledComponent) -> MountOutcome {
        if self.mounted.as_deref() == Some(component.id.as_str()) {
            debug!(name = %component.name, "mount reused");
            return MountOutcome::Reused;
        }

        let root = self.dom.root();
        self.dom.clear_children(root);
        self.hovered = None;
        self.generation = 0;
        self.mounted = Some(component.id.clone());

        if component.depth() > self.config.max_render_depth {
            let err = CanvasError::MaxNestingDepthExceeded {
                max_depth: self.config.max_render_depth,
            };
            return self.show_error(&component.name, err.to_string());
        }

        for node in &component.template {
            self.build(root, node);
        }
        self.render_error = None;
        info!(name = %component.name, elements = self.dom.elements().len(), "mounted component");
        MountOutcome::Fresh
    }

    /// Empties the mount point so the next [`Sandbox::mount`] rebuilds from
    /// the template, dropping any live patches.
    pub fn unmount(&mut self) {
        let root = self.dom.root();
        self.dom.clear_children(root);
        self.mounted = None;
        self.hovered = None;
        self.generation = 0;
    }

    fn show_error(&mut self, name: &str, message: String) -> MountOutcome {
        warn!(component = %name, error = %message, "render failed");
        let root = self.dom.root();
        self.dom.clear_children(root);
        let error_box = self.dom.append_element(
            root,
            "div",
            vec![
                (ERROR_ATTRIBUTE.to_string(), String::new()),
                ("role".to_string(), "alert".to_string()),
            ],
            true,
        );
        self.dom.append_text(error_box, &message);
        self.render_error = Some(message.clone());
        MountOutcome::Failed(message)
    }

    fn build(&mut self, parent: NodeId, node: &VNode) {
        match node {
            VNode::Text(text) => {
                self.dom.append_text(parent, text);
            }
            VNode::Element(el) => {
                let id = self
                    .dom
                    .append_element(parent, &el.tag, el.attributes.clone(), el.synthetic);
                for child in &el.children {
                    self.build(id, child);
                }
            }
        }
    }

    pub fn set_selection_mode(&mut self, enabled: bool) {
        self.selection_mode = enabled;
        if !enabled {
            self.clear_hover();
        }
    }

    fn clear_hover(&mut self) {
        if let Some(previous) = self.hovered.take() {
            self.dom.remove_attribute(previous, HOVER_ATTRIBUTE);
        }
    }

    /// Pointer moved onto `node`. Highlights it in selection mode, one node at a time.
    pub fn hover(&mut self, node: Option<NodeId>) {
        if !self.selection_mode {
            return;
        }
        self.clear_hover();
        if let Some(node) = node.filter(|n| self.is_selectable(*n)) {
            self.dom.set_attribute(node, HOVER_ATTRIBUTE, "");
            self.hovered = Some(node);
        }
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    fn is_selectable(&self, node: NodeId) -> bool {
        self.dom.is_element(node) && !self.dom.is_synthetic(node)
    }

    /// Click on `node`. In selection mode the click is captured (the snippet's
    /// own handlers never see it) and a selection message is sent.
    /// Returns whether a message was sent.
    pub fn click(&mut self, node: NodeId) -> bool {
        if !self.selection_mode || !self.is_selectable(node) {
            return false;
        }
        let snapshot = self.snapshot(node);
        debug!(address = %snapshot.structural_address, "element clicked");
        self.events
            .send(CanvasMessage::ComponentSelected(snapshot))
            .is_ok()
    }

    pub fn snapshot(&self, node: NodeId) -> NodeSnapshot {
        let attributes: BTreeMap<String, String> = self.dom.clean_attributes(node).into_iter().collect();
        NodeSnapshot {
            structural_address: address_of(&self.dom, node),
            tag_name: self.dom.tag(node).unwrap_or_default().to_ascii_lowercase(),
            class_list: self.dom.class_list(node),
            attributes,
            inner_markup: self.dom.inner_html(node, true),
            text_content: self.dom.text_content(node),
        }
    }

    /// Node at an address in the live DOM.
    pub fn find(&self, address: &StructuralAddress) -> CanvasResult<NodeId> {
        locate(&self.dom, address)
    }

    /// Brings the mounted element at `snapshot`'s address in line with it:
    /// attributes reconciled, class set verbatim, children replaced only if
    /// their markup changed. Patches older than `generation` are ignored.
    pub fn apply_patch(&mut self, snapshot: &NodeSnapshot, generation: u64) -> CanvasResult<PatchOutcome> {
        if generation < self.generation {
            debug!(generation, current = self.generation, "stale patch ignored");
            return Ok(PatchOutcome::Stale);
        }
        let node = match self.find(&snapshot.structural_address) {
            Ok(node) => node,
            Err(e) => {
                warn!(address = %snapshot.structural_address, error = %e, "live patch target missing");
                return Err(e);
            }
        };

        if snapshot.inner_markup != self.dom.inner_html(node, true) {
            let marker = [(
                INSTRUMENTATION_MARKER.0.to_string(),
                INSTRUMENTATION_MARKER.1.to_string(),
            )];
            self.dom.set_inner_markup(node, &snapshot.inner_markup, &marker)?;
        }

        let stale: Vec<String> = self
            .dom
            .clean_attributes(node)
            .into_iter()
            .map(|(k, _)| k)
            .filter(|k| k != "class" && !snapshot.attributes.contains_key(k))
            .collect();
        for name in stale {
            self.dom.remove_attribute(node, &name);
        }
        for (name, value) in &snapshot.attributes {
            if name == "class" || self.dom.is_instrumentation(name) {
                continue;
            }
            self.dom.set_attribute(node, name, value);
        }
        if snapshot.class_list.is_empty() {
            self.dom.remove_attribute(node, "class");
        } else {
            self.dom.set_attribute(node, "class", &snapshot.class_list.join(" "));
        }

        self.generation = generation;
        Ok(PatchOutcome::Applied)
    }

    /// The complete preview document for the iframe `srcdoc`.
    pub fn document_html(&self) -> String {
        let mut css = String::from(BASE_STYLES);
        if self.selection_mode {
            let _ = write!(
                css,
                "#root *{{cursor:crosshair;user-select:none;}}[{}]{{outline:2px solid {};outline-offset:2px;}}",
                HOVER_ATTRIBUTE,
                self.config.highlight_color
            );
        }
        let body = self.dom.inner_html(self.dom.root(), false);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<script src="{}"></script>
<style>{}</style>
</head>
<body>
<div id="root">{}</div>
</body>
</html>
"#,
            escape_attribute(&self.config.tailwind_cdn),
            css,
            body
        )
    }

    /// `<iframe>` element hosting the preview document.
    pub fn iframe_html(&self) -> String {
        format!(
            r#"<iframe title="{}" sandbox="{}" srcdoc="{}"></iframe>"#,
            escape_html(&self.config.wrapper_component),
            IFRAME_SANDBOX,
            escape_attribute(&self.document_html())
        )
    }
}
