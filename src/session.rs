//! # Edit session
//!
//! `Idle → Selected → Editing → Idle`. The session owns the selected
//! element's original snapshot, the manipulated copy the style controls
//! change, and the parsed styles the manipulated class list is derived from.
//!
//! Every accepted selection or style change bumps a generation counter.
//! Live patches carry it, so the renderer can drop anything older than what
//! it already shows.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{CanvasError, CanvasResult};
use crate::sandbox::NodeSnapshot;
use crate::style::{Dimension, ParsedStyleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Selected,
    Editing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Selected => "Selected",
            SessionState::Editing => "Editing",
        };
        f.write_str(name)
    }
}

/// Where committed snapshots are written, normally the authoritative source.
pub trait CommitTarget {
    fn commit_snapshot(&mut self, snapshot: &NodeSnapshot) -> CanvasResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected,
    /// The element is already selected; nothing changed
    Unchanged,
    /// Pending edits of the previous element were committed first
    CommittedAndSelected,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    state: SessionState,
    original: Option<NodeSnapshot>,
    manipulated: Option<NodeSnapshot>,
    pending: ParsedStyleSet,
    generation: u64,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            original: None,
            manipulated: None,
            pending: ParsedStyleSet::default(),
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn original(&self) -> Option<&NodeSnapshot> {
        self.original.as_ref()
    }

    pub fn manipulated(&self) -> Option<&NodeSnapshot> {
        self.manipulated.as_ref()
    }

    pub fn pending_styles(&self) -> &ParsedStyleSet {
        &self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        self.state == SessionState::Editing
    }

    fn invalid(&self, operation: &str) -> CanvasError {
        CanvasError::InvalidTransition {
            state: self.state.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Selects the clicked element. Pending edits of a different element are
    /// committed to `target` first; if that fails the selection is refused
    /// and the session keeps editing the old element.
    pub fn select<T: CommitTarget>(
        &mut self,
        snapshot: NodeSnapshot,
        target: &mut T,
    ) -> CanvasResult<SelectOutcome> {
        if let Some(current) = &self.original {
            if current.structural_address == snapshot.structural_address {
                return Ok(SelectOutcome::Unchanged);
            }
        }

        let mut outcome = SelectOutcome::Selected;
        if self.state == SessionState::Editing {
            self.commit(target)?;
            outcome = SelectOutcome::CommittedAndSelected;
        }

        debug!(address = %snapshot.structural_address, "selected element");
        self.pending = ParsedStyleSet::parse(&snapshot.class_list);
        self.manipulated = Some(snapshot.clone());
        self.original = Some(snapshot);
        self.state = SessionState::Selected;
        self.generation += 1;
        Ok(outcome)
    }

    /// Sets one style dimension. Returns the re-derived manipulated snapshot
    /// to push to the renderer, or `None` when the dimension already held
    /// `token`.
    pub fn update_style(&mut self, dimension: Dimension, token: &str) -> CanvasResult<Option<&NodeSnapshot>> {
        if self.state == SessionState::Idle {
            return Err(self.invalid("update_style"));
        }
        if !self.pending.set(dimension, token)? {
            return Ok(None);
        }

        let class_list = self.pending.serialize();
        let manipulated = self
            .manipulated
            .as_mut()
            .ok_or_else(|| CanvasError::InvalidTransition {
                state: SessionState::Selected.to_string(),
                operation: "update_style".to_string(),
            })?;
        manipulated.set_class_list(class_list);
        self.state = SessionState::Editing;
        self.generation += 1;
        debug!(%dimension, token, generation = self.generation, "style updated");
        Ok(self.manipulated.as_ref())
    }

    /// Writes the manipulated snapshot to `target`. On success the session
    /// returns to `Idle`; on failure nothing changes so the user can retry.
    pub fn commit<T: CommitTarget>(&mut self, target: &mut T) -> CanvasResult<()> {
        let Some(manipulated) = self.manipulated.as_ref() else {
            return Err(self.invalid("commit"));
        };
        match target.commit_snapshot(manipulated) {
            Ok(()) => {
                info!(address = %manipulated.structural_address, "committed edit");
                self.reset();
                Ok(())
            }
            Err(e) => {
                warn!(address = %manipulated.structural_address, error = %e, "commit failed");
                Err(e)
            }
        }
    }

    /// Drops the selection without committing (leaving edit mode).
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.original = None;
        self.manipulated = None;
        self.pending = ParsedStyleSet::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Recorder {
        commits: Vec<NodeSnapshot>,
        fail: bool,
    }

    impl CommitTarget for Recorder {
        fn commit_snapshot(&mut self, snapshot: &NodeSnapshot) -> CanvasResult<()> {
            if self.fail {
                return Err(CanvasError::NotFound {
                    address: snapshot.structural_address.to_string(),
                });
            }
            self.commits.push(snapshot.clone());
            Ok(())
        }
    }

    fn snapshot(address: &str, class: &str) -> NodeSnapshot {
        let class_list: Vec<String> = class.split_whitespace().map(str::to_string).collect();
        let mut attributes = BTreeMap::new();
        if !class_list.is_empty() {
            attributes.insert("class".to_string(), class.to_string());
        }
        NodeSnapshot {
            structural_address: address.parse().unwrap(),
            tag_name: address.rsplit(' ').next().unwrap().to_string(),
            attributes,
            class_list,
            inner_markup: "Hi".to_string(),
            text_content: "Hi".to_string(),
        }
    }

    #[test]
    fn lifecycle() {
        let mut session = EditSession::new();
        let mut target = Recorder::default();
        assert_eq!(session.state(), SessionState::Idle);

        session.select(snapshot("div > h1", "text-lg p-0"), &mut target).unwrap();
        assert_eq!(session.state(), SessionState::Selected);
        assert_eq!(session.original(), session.manipulated());
        assert_eq!(session.pending_styles().get(Dimension::TextSize), "text-lg");

        let pushed = session.update_style(Dimension::TextSize, "text-2xl").unwrap().unwrap();
        assert_eq!(pushed.class_list, vec!["text-2xl"]);
        assert_eq!(pushed.attributes["class"], "text-2xl");
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.original().unwrap().class_list, vec!["text-lg", "p-0"]);

        session.commit(&mut target).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(target.commits.len(), 1);
        assert_eq!(target.commits[0].class_list, vec!["text-2xl"]);
    }

    #[test]
    fn identical_update_is_a_no_op() {
        let mut session = EditSession::new();
        session.select(snapshot("p", "font-bold"), &mut Recorder::default()).unwrap();
        let generation = session.generation();
        assert!(session.update_style(Dimension::FontWeight, "font-bold").unwrap().is_none());
        assert_eq!(session.generation(), generation);
        assert_eq!(session.state(), SessionState::Selected);
    }

    #[test]
    fn invalid_transitions() {
        let mut session = EditSession::new();
        let err = session.update_style(Dimension::Padding, "p-4").unwrap_err();
        assert!(matches!(err, CanvasError::InvalidTransition { .. }));
        assert!(session.commit(&mut Recorder::default()).is_err());

        session.select(snapshot("p", ""), &mut Recorder::default()).unwrap();
        assert!(session.update_style(Dimension::Padding, "text-lg").is_err());
        assert_eq!(session.state(), SessionState::Selected);
    }

    #[test]
    fn failed_commit_keeps_editing() {
        let mut session = EditSession::new();
        let mut target = Recorder {
            fail: true,
            ..Recorder::default()
        };
        session.select(snapshot("div > h1", ""), &mut target).unwrap();
        session.update_style(Dimension::Padding, "p-4").unwrap();
        assert!(session.commit(&mut target).unwrap_err().is_not_found());
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.manipulated().unwrap().class_list, vec!["p-4"]);
    }

    #[test]
    fn reselect_commits_pending_edits_first() {
        let mut session = EditSession::new();
        let mut target = Recorder::default();
        session.select(snapshot("div > h1", ""), &mut target).unwrap();
        session.update_style(Dimension::Margin, "m-2").unwrap();

        let outcome = session.select(snapshot("div > p", "italic"), &mut target).unwrap();
        assert_eq!(outcome, SelectOutcome::CommittedAndSelected);
        assert_eq!(target.commits[0].class_list, vec!["m-2"]);
        assert_eq!(session.state(), SessionState::Selected);
        assert_eq!(session.original().unwrap().structural_address.to_string(), "div > p");
    }

    #[test]
    fn reselect_is_refused_when_the_implicit_commit_fails() {
        let mut session = EditSession::new();
        let mut target = Recorder::default();
        session.select(snapshot("div > h1", ""), &mut target).unwrap();
        session.update_style(Dimension::Margin, "m-2").unwrap();

        target.fail = true;
        assert!(session.select(snapshot("div > p", ""), &mut target).is_err());
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.original().unwrap().structural_address.to_string(), "div > h1");
    }

    #[test]
    fn same_element_and_reset() {
        let mut session = EditSession::new();
        let mut target = Recorder::default();
        session.select(snapshot("div > h1", ""), &mut target).unwrap();
        session.update_style(Dimension::Padding, "p-4").unwrap();
        let generation = session.generation();
        let outcome = session.select(snapshot("div > h1", ""), &mut target).unwrap();
        assert_eq!(outcome, SelectOutcome::Unchanged);
        assert_eq!(session.generation(), generation);
        assert!(session.has_uncommitted_changes());

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(target.commits.is_empty());
    }

    #[test]
    fn rapid_edits_converge() {
        let mut a = EditSession::new();
        let mut b = EditSession::new();
        for session in [&mut a, &mut b] {
            session.select(snapshot("div", ""), &mut Recorder::default()).unwrap();
        }
        a.update_style(Dimension::Padding, "p-4").unwrap();
        a.update_style(Dimension::BackgroundColor, "bg-[#ff0000]").unwrap();
        b.update_style(Dimension::BackgroundColor, "bg-[#ff0000]").unwrap();
        b.update_style(Dimension::Padding, "p-4").unwrap();
        assert_eq!(a.manipulated(), b.manipulated());
    }
}
