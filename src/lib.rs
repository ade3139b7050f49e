//! # livecanvas
//!
//! Round-trip visual editing of React/JSX snippets.
//!
//! ## Features
//! - JSX/TSX snippet compiler with element instrumentation
//! - Structural addresses shared by the live preview and the source tree
//! - Sandboxed preview DOM with selection mode and live patching
//! - Utility-class style model with palette colors and control panels
//! - Edit session state machine and a minimal-diff source patcher
//! - Versioned snippet store
//!
//! ## Example
//! ```ignore
//! use livecanvas::{CanvasConfig, Dimension, Editor, MemorySnippetStore};
//! use std::sync::Arc;
//!
//! let mut editor = Editor::new(CanvasConfig::default(), Arc::new(MemorySnippetStore::new()));
//! editor.load_source(r#"<div className="p-4"><h1>Hello</h1></div>"#)?;
//! editor.set_selection_mode(true);
//! editor.click_address(&"div > h1".parse()?)?;
//! editor.update_style(Dimension::TextSize, "text-2xl")?;
//! editor.commit()?;
//! assert!(editor.source().contains(r#"<h1 className="text-2xl">"#));
//! ```

pub mod address;
pub mod compiler;
pub mod config;
pub mod dom;
pub mod editor;
pub mod error;
pub mod jsx;
pub mod patcher;
pub mod sandbox;
pub mod session;
pub mod store;
pub mod style;

// --- Core types ---
pub use address::{address_of, locate, AddressableTree, Segment, SourceScope, StructuralAddress};
pub use compiler::{CompiledComponent, VElement, VNode};
pub use config::CanvasConfig;
pub use editor::{Controls, Editor};
pub use error::{CanvasError, CanvasResult};
pub use jsx::{Dialect, SourceMode, SyntaxTree};
pub use patcher::SourceDocument;
pub use sandbox::{CanvasMessage, MountOutcome, NodeSnapshot, PatchOutcome, Sandbox};
pub use session::{CommitTarget, EditSession, SelectOutcome, SessionState};
pub use store::{MemorySnippetStore, SnippetRecord, SnippetStore};
pub use style::controls::{ControlBinding, ControlInput, ControlKind, ControlPanel};
pub use style::{classify, Dimension, ParsedStyleSet};

/// Compile a snippet into a renderable component.
pub fn compile(source: &str, dialect: Dialect, config: &CanvasConfig) -> CanvasResult<CompiledComponent> {
    compiler::compile(source, dialect, config)
}

/// Parse a snippet into its syntax tree.
pub fn parse_snippet(source: &str, dialect: Dialect) -> CanvasResult<SyntaxTree> {
    jsx::parse(source, dialect)
}

/// Write a snapshot back into snippet text.
pub fn patch_source(
    source: &str,
    snapshot: &NodeSnapshot,
    dialect: Dialect,
    config: &CanvasConfig,
) -> CanvasResult<String> {
    patcher::patch(source, snapshot, dialect, config)
}
