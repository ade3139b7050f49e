//! # Editor
//!
//! The page flow: paste a snippet, preview it, click an element, adjust its
//! styles through the controls, commit the result back into the snippet and
//! save versions of it. `Editor` owns every piece and is the only writer of
//! the source text besides commits.

use indextree::NodeId;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::address::StructuralAddress;
use crate::compiler::{compile, CompiledComponent};
use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::jsx::Dialect;
use crate::patcher::SourceDocument;
use crate::sandbox::{CanvasMessage, MountOutcome, Sandbox};
use crate::session::{EditSession, SelectOutcome};
use crate::store::{SnippetRecord, SnippetStore};
use crate::style::controls::{ControlBinding, ControlInput, ControlPanel};
use crate::style::Dimension;

/// The controls shown for the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub panel: ControlPanel,
    pub bindings: Vec<ControlBinding>,
}

pub struct Editor {
    config: CanvasConfig,
    document: SourceDocument,
    /// Last snippet that compiled; the preview keeps showing it after errors
    compiled: Option<CompiledComponent>,
    compile_error: Option<CanvasError>,
    sandbox: Sandbox,
    events: UnboundedReceiver<CanvasMessage>,
    session: EditSession,
    store: Arc<dyn SnippetStore>,
}

impl Editor {
    pub fn new(config: CanvasConfig, store: Arc<dyn SnippetStore>) -> Self {
        let (sandbox, events) = Sandbox::new(config.clone());
        let document = SourceDocument::new(String::new(), config.dialect, config.clone());
        Self {
            config,
            document,
            compiled: None,
            compile_error: None,
            sandbox,
            events,
            session: EditSession::new(),
            store,
        }
    }

    pub fn source(&self) -> &str {
        self.document.text()
    }

    pub fn dialect(&self) -> Dialect {
        self.document.dialect()
    }

    pub fn compiled(&self) -> Option<&CompiledComponent> {
        self.compiled.as_ref()
    }

    /// Error of the most recent compile, cleared by the next good one.
    pub fn compile_error(&self) -> Option<&CanvasError> {
        self.compile_error.as_ref()
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Replaces the snippet text (a paste or a hand edit). A selection
    /// survives; its pending edits are re-applied to the new preview when
    /// the element can still be found there.
    pub fn load_source(&mut self, text: impl Into<String>) -> CanvasResult<MountOutcome> {
        self.document.replace(text);
        let outcome = self.render()?;
        self.reapply_pending();
        Ok(outcome)
    }

    pub fn set_dialect(&mut self, dialect: Dialect) -> CanvasResult<MountOutcome> {
        self.document.set_dialect(dialect);
        let outcome = self.render()?;
        self.reapply_pending();
        Ok(outcome)
    }

    fn render(&mut self) -> CanvasResult<MountOutcome> {
        match compile(self.document.text(), self.document.dialect(), &self.config) {
            Ok(component) => {
                let outcome = self.sandbox.mount(&component);
                self.compiled = Some(component);
                self.compile_error = None;
                Ok(outcome)
            }
            Err(e) => {
                self.compile_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn reapply_pending(&mut self) {
        if !self.session.has_uncommitted_changes() {
            return;
        }
        if let Some(snapshot) = self.session.manipulated() {
            if let Err(e) = self.sandbox.apply_patch(snapshot, self.session.generation()) {
                debug!(error = %e, "pending edit not shown in new preview");
            }
        }
    }

    /// Turns edit (selection) mode on or off. Leaving it drops the selection
    /// and any uncommitted edits; the preview goes back to the source.
    pub fn set_selection_mode(&mut self, enabled: bool) {
        if !enabled {
            let discarded = self.session.has_uncommitted_changes();
            self.session.reset();
            while self.events.try_recv().is_ok() {}
            if discarded {
                self.sandbox.unmount();
                if let Some(component) = &self.compiled {
                    self.sandbox.mount(component);
                }
                info!("left edit mode, uncommitted edits discarded");
            }
        }
        self.sandbox.set_selection_mode(enabled);
    }

    pub fn hover(&mut self, node: Option<NodeId>) {
        self.sandbox.hover(node);
    }

    /// Click in the preview. Returns the selection it led to, if any.
    pub fn click(&mut self, node: NodeId) -> CanvasResult<Option<SelectOutcome>> {
        if !self.sandbox.click(node) {
            return Ok(None);
        }
        Ok(self.pump_events()?.last().copied())
    }

    pub fn click_address(&mut self, address: &StructuralAddress) -> CanvasResult<Option<SelectOutcome>> {
        let node = self.sandbox.find(address)?;
        self.click(node)
    }

    /// Handles queued renderer messages in arrival order.
    pub fn pump_events(&mut self) -> CanvasResult<Vec<SelectOutcome>> {
        let mut outcomes = Vec::new();
        while let Ok(CanvasMessage::ComponentSelected(snapshot)) = self.events.try_recv() {
            let outcome = self.session.select(snapshot, &mut self.document)?;
            if outcome == SelectOutcome::CommittedAndSelected {
                if let Err(e) = self.render() {
                    warn!(error = %e, "committed source does not compile");
                }
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Sets one style dimension of the selected element and shows it in the
    /// preview. Returns `false` when nothing changed.
    pub fn update_style(&mut self, dimension: Dimension, token: &str) -> CanvasResult<bool> {
        let Some(snapshot) = self.session.update_style(dimension, token)?.cloned() else {
            return Ok(false);
        };
        if let Err(e) = self.sandbox.apply_patch(&snapshot, self.session.generation()) {
            warn!(error = %e, "live patch failed; edit kept for commit");
        }
        Ok(true)
    }

    /// [`Editor::update_style`] keyed by control name (`padding`, `fontSize`, ...).
    pub fn update_style_key(&mut self, key: &str, token: &str) -> CanvasResult<bool> {
        let dimension: Dimension = key.parse()?;
        self.update_style(dimension, token)
    }

    pub fn apply_control(&mut self, dimension: Dimension, input: &ControlInput) -> CanvasResult<bool> {
        let token = input.token(dimension)?;
        self.update_style(dimension, &token)
    }

    pub fn controls(&self) -> Option<Controls> {
        let snapshot = self.session.manipulated()?;
        let panel = ControlPanel::for_tag(&snapshot.tag_name);
        Some(Controls {
            panel,
            bindings: panel.bindings(self.session.pending_styles()),
        })
    }

    /// Writes the selected element's edits into the source. On failure the
    /// source and the session are left as they were.
    pub fn commit(&mut self) -> CanvasResult<()> {
        self.session.commit(&mut self.document)?;
        if let Err(e) = self.render() {
            warn!(error = %e, "committed source does not compile");
        }
        Ok(())
    }

    pub async fn save_version(&self, entity_id: &str) -> CanvasResult<SnippetRecord> {
        self.store.save_new_version(entity_id, self.document.text()).await
    }

    pub async fn list_versions(&self, entity_id: &str) -> CanvasResult<Vec<u32>> {
        self.store.list_versions(entity_id).await
    }

    /// Loads the newest saved version, if the entity has one.
    pub async fn load_latest(&mut self, entity_id: &str) -> CanvasResult<Option<SnippetRecord>> {
        let record = self.store.get_latest(entity_id).await?;
        if let Some(record) = &record {
            self.load_record(record);
        }
        Ok(record)
    }

    pub async fn load_version(&mut self, entity_id: &str, version: u32) -> CanvasResult<Option<SnippetRecord>> {
        let record = self.store.get_version(entity_id, version).await?;
        if let Some(record) = &record {
            self.load_record(record);
        }
        Ok(record)
    }

    /// A loaded version replaces the document, so the selection goes with it.
    fn load_record(&mut self, record: &SnippetRecord) {
        self.session.reset();
        while self.events.try_recv().is_ok() {}
        self.sandbox.unmount();
        info!(entity_id = %record.entity_id, version = record.version, "loaded snippet version");
        if let Err(e) = self.load_source(record.snippet.clone()) {
            debug!(error = %e, "loaded version does not compile");
        }
    }

    /// The preview `<iframe>` with its document inlined.
    pub fn preview_html(&self) -> String {
        self.sandbox.iframe_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::store::MemorySnippetStore;

    const CARD: &str = r#"export default function Card() {
  return (
    <div className="p-4">
      <h1 className="text-lg">Hello</h1>
    </div>
  );
}
"#;

    fn editor() -> Editor {
        let mut editor = Editor::new(CanvasConfig::default(), Arc::new(MemorySnippetStore::new()));
        editor.load_source(CARD).unwrap();
        editor.set_selection_mode(true);
        editor
    }

    fn address(s: &str) -> StructuralAddress {
        s.parse().unwrap()
    }

    fn class_at(editor: &Editor, at: &str) -> Option<String> {
        let node = editor.sandbox().find(&address(at)).unwrap();
        editor.sandbox().dom().attribute(node, "class").map(str::to_string)
    }

    #[test]
    fn select_edit_commit() {
        let mut editor = editor();
        let outcome = editor.click_address(&address("div > h1")).unwrap();
        assert_eq!(outcome, Some(SelectOutcome::Selected));

        assert!(editor.update_style(Dimension::TextSize, "text-2xl").unwrap());
        assert_eq!(class_at(&editor, "div > h1").as_deref(), Some("text-2xl"));
        assert_eq!(editor.source(), CARD);

        editor.commit().unwrap();
        assert_eq!(editor.session().state(), SessionState::Idle);
        assert!(editor.source().contains(r#"<h1 className="text-2xl">Hello</h1>"#));
        assert!(editor.source().contains(r#"<div className="p-4">"#));
        assert_eq!(class_at(&editor, "div > h1").as_deref(), Some("text-2xl"));
    }

    #[test]
    fn clicks_outside_edit_mode_are_ignored() {
        let mut editor = editor();
        editor.set_selection_mode(false);
        assert_eq!(editor.click_address(&address("div > h1")).unwrap(), None);
        assert_eq!(editor.session().state(), SessionState::Idle);
    }

    #[test]
    fn external_edit_makes_commit_fail_without_touching_source() {
        let mut editor = editor();
        editor.click_address(&address("div > h1")).unwrap();
        editor.update_style(Dimension::Padding, "p-2").unwrap();

        let edited = "export default function Card() {\n  return <div className=\"p-4\"><p>Bye</p></div>;\n}\n";
        editor.load_source(edited).unwrap();
        let err = editor.commit().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(editor.source(), edited);
        assert_eq!(editor.session().state(), SessionState::Editing);
    }

    #[test]
    fn leaving_edit_mode_discards_edits() {
        let mut editor = editor();
        editor.click_address(&address("div > h1")).unwrap();
        editor.update_style(Dimension::FontWeight, "font-bold").unwrap();
        assert_eq!(class_at(&editor, "div > h1").as_deref(), Some("text-lg font-bold"));

        editor.set_selection_mode(false);
        assert_eq!(editor.session().state(), SessionState::Idle);
        assert_eq!(class_at(&editor, "div > h1").as_deref(), Some("text-lg"));
        assert_eq!(editor.source(), CARD);
    }

    #[test]
    fn selecting_another_element_commits_first() {
        let mut editor = editor();
        editor.click_address(&address("div > h1")).unwrap();
        editor.apply_control(Dimension::Padding, &ControlInput::Size(3)).unwrap();

        let outcome = editor.click_address(&address("div")).unwrap();
        assert_eq!(outcome, Some(SelectOutcome::CommittedAndSelected));
        assert!(editor.source().contains("p-3"));
        assert_eq!(editor.session().state(), SessionState::Selected);

        let controls = editor.controls().unwrap();
        assert_eq!(controls.panel, ControlPanel::Layout);
        assert_eq!(controls.bindings[0].current.as_deref(), Some("p-4"));
    }

    #[test]
    fn compile_errors_keep_the_last_good_preview() {
        let mut editor = editor();
        let mounted = editor.sandbox().mounted_id().map(str::to_string);
        assert!(editor.load_source("<div><p>broken</div>").is_err());
        assert!(editor.compile_error().unwrap().is_compile_error());
        assert_eq!(editor.sandbox().mounted_id().map(str::to_string), mounted);
        assert!(editor.preview_html().contains("Hello"));

        editor.load_source(CARD).unwrap();
        assert!(editor.compile_error().is_none());
    }

    #[test]
    fn style_keys_and_unknown_dimensions() {
        let mut editor = editor();
        editor.click_address(&address("div > h1")).unwrap();
        assert!(editor.update_style_key("fontSize", "text-sm").unwrap());
        assert!(!editor.update_style_key("textSize", "text-sm").unwrap());
        assert!(editor.update_style_key("glow", "x").is_err());
    }

    #[tokio::test]
    async fn versions_round_trip_through_the_store() {
        let mut editor = editor();
        assert_eq!(editor.save_version("card").await.unwrap().version, 1);

        editor.click_address(&address("div > h1")).unwrap();
        editor.update_style(Dimension::TextSize, "text-2xl").unwrap();
        editor.commit().unwrap();
        assert_eq!(editor.save_version("card").await.unwrap().version, 2);
        assert_eq!(editor.list_versions("card").await.unwrap(), vec![1, 2]);

        let first = editor.load_version("card", 1).await.unwrap().unwrap();
        assert_eq!(first.snippet, CARD);
        assert_eq!(editor.source(), CARD);

        let latest = editor.load_latest("card").await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert!(editor.source().contains("text-2xl"));
        assert!(editor.load_latest("missing").await.unwrap().is_none());
    }
}
