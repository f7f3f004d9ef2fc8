//! The overlay interaction controller.
//!
//! `Overlay` owns the working set of comments and a single [`OverlayState`]
//! describing which transient interaction is in progress. Holding one tagged
//! state instead of several optional fields makes combinations such as
//! "dragging while drafting" or "tooltip open while placing" unrepresentable.
//!
//! ```text
//!            toggle                 click on element
//!   Idle ───────────▶ Placing ─────────────────────▶ Drafting
//!    ▲  ◀───────────     │                              │
//!    │      toggle       │ (miss: stays Placing)        │ submit / cancel
//!    │                                                  ▼
//!    ├──────────────────────────────────────────────── Idle
//!    │ pin down                       release
//!    └────────▶ Dragging ──────────────────────────────▶ Idle
//! ```
//!
//! The controller is synchronous. Storage work is returned as
//! [`StoreRequest`]s and its results come back through [`Overlay::apply`].
//!
//! Every "element under the cursor" lookup passes an exclusion predicate for the
//! overlay's own root to [`Document::element_from_point`], so the overlay never
//! resolves to itself and never has to hide itself to hit-test the page.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dom::{Document, NodeId};
use crate::locator::synthesize;
use crate::position::relative_to_element;
use crate::store::{StoreOutcome, StoreRequest};
use crate::types::{
    Anchor, Comment, DragState, NewComment, PendingComment, PositionUpdate, PositionedComment,
    Rect, Viewport,
};

/// `id` of the element the overlay mounts into the host document.
pub const OVERLAY_ROOT_ID: &str = "pinmark-feedback-root";

/// Outline drawn over the element under the cursor while placing.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub element: NodeId,
    pub rect: Rect,
    pub locator: String,
}

/// Which transient interaction is in progress. Exactly one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayState {
    /// Nothing in progress; at most one pin's tooltip may be open.
    Idle { tooltip: Option<String> },
    /// Comment mode is armed and the page is being inspected.
    Placing { highlight: Option<Highlight> },
    /// A comment is being written.
    Drafting(PendingComment),
    /// A pin is being dragged to a new anchor.
    Dragging(DragState),
}

impl Default for OverlayState {
    fn default() -> Self {
        OverlayState::Idle { tooltip: None }
    }
}

/// What the host should do with a click after the overlay saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The overlay did not consume the click; deliver it normally.
    PassThrough,
    /// The overlay consumed the click; prevent its default effect on the page.
    Suppressed,
}

/// A pin ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id: String,
    /// 1-based display number, in working-set order.
    pub number: usize,
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    pub resolved: bool,
    pub dragging: bool,
}

/// Actions the overlay rejects locally, without contacting storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("comment text is empty")]
    EmptyComment,
    #[error("no comment draft is open")]
    NoDraft,
    #[error("comment {0} is not loaded")]
    UnknownComment(String),
    #[error("another interaction is in progress")]
    Busy,
}

/// The overlay's state machine and working set.
#[derive(Debug, Default)]
pub struct Overlay {
    root: Option<NodeId>,
    comments: Vec<Comment>,
    state: OverlayState,
    revision: u64,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Inserts the overlay root into `doc`'s body and returns it.
    ///
    /// The root hosts the overlay's chrome; the caller lays it out.
    pub fn mount(&mut self, doc: &mut Document) -> NodeId {
        if let Some(root) = self.root {
            return root;
        }
        let root = doc.create_element("div");
        doc.set_attribute(root, "id", OVERLAY_ROOT_ID);
        doc.append_child(doc.body(), root);
        self.root = Some(root);
        info!("overlay mounted");
        root
    }

    /// Removes the overlay root. Outcomes that arrive afterwards are discarded.
    pub fn unmount(&mut self, doc: &mut Document) {
        if let Some(root) = self.root.take() {
            doc.remove(root);
            self.state = OverlayState::default();
            info!("overlay unmounted");
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_some()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// The working set, in display order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Incremented whenever the working set changes; hosts compare it to decide
    /// when positions must be recomputed outside the frame cadence.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_comment_mode(&self) -> bool {
        matches!(self.state, OverlayState::Placing { .. })
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        match &self.state {
            OverlayState::Placing { highlight } => highlight.as_ref(),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&PendingComment> {
        match &self.state {
            OverlayState::Drafting(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn drag(&self) -> Option<&DragState> {
        match &self.state {
            OverlayState::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    /// Id of the comment whose tooltip is open.
    pub fn tooltip(&self) -> Option<&str> {
        match &self.state {
            OverlayState::Idle { tooltip } => tooltip.as_deref(),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Hit-testing
    // -----------------------------------------------------------------------

    fn in_overlay(&self, doc: &Document, node: NodeId) -> bool {
        self.root.is_some_and(|root| doc.contains(root, node))
    }

    /// Returns `true` when the topmost element at `(x, y)` is overlay chrome.
    pub fn is_over_overlay(&self, doc: &Document, x: f64, y: f64) -> bool {
        doc.element_from_point(x, y, |_| false)
            .is_some_and(|node| self.in_overlay(doc, node))
    }

    /// The page element under `(x, y)`, looking through the overlay.
    /// The document roots never count as targets.
    pub fn target_at(&self, doc: &Document, x: f64, y: f64) -> Option<NodeId> {
        doc.element_from_point(x, y, |node| self.in_overlay(doc, node))
            .filter(|&node| !doc.is_root(node))
    }

    fn anchor_at(&self, doc: &Document, element: NodeId, x: f64, y: f64) -> Anchor {
        let (x_percentage, y_percentage) = relative_to_element(doc, element, x, y);
        Anchor {
            locator: synthesize(doc, element),
            x_percentage,
            y_percentage,
            viewport: Some(doc.viewport()),
        }
    }

    // -----------------------------------------------------------------------
    // Placing and drafting
    // -----------------------------------------------------------------------

    /// Arms or disarms comment mode. Clears the highlight and any open tooltip.
    ///
    /// Ignored while drafting or dragging; returns whether comment mode is on.
    pub fn toggle_comment_mode(&mut self) -> bool {
        self.state = match &self.state {
            OverlayState::Idle { .. } => OverlayState::Placing { highlight: None },
            OverlayState::Placing { .. } => OverlayState::default(),
            OverlayState::Drafting(_) | OverlayState::Dragging(_) => return false,
        };
        debug!(comment_mode = self.is_comment_mode(), "toggled comment mode");
        self.is_comment_mode()
    }

    /// Pointer moved to viewport point `(x, y)`.
    ///
    /// While placing, refreshes the highlight (cleared over overlay chrome or the
    /// document roots). While dragging, the dragged pin follows the cursor.
    pub fn pointer_move(&mut self, doc: &Document, x: f64, y: f64) {
        if let OverlayState::Dragging(drag) = &mut self.state {
            drag.current_x = x;
            drag.current_y = y;
            return;
        }
        if !self.is_comment_mode() {
            return;
        }
        let highlight = if self.is_over_overlay(doc, x, y) {
            None
        } else {
            self.target_at(doc, x, y).map(|element| Highlight {
                element,
                rect: doc.bounding_client_rect(element),
                locator: synthesize(doc, element),
            })
        };
        self.state = OverlayState::Placing { highlight };
    }

    /// Click at viewport point `(x, y)`.
    ///
    /// In comment mode a click on the page is consumed: if it lands on an element
    /// a draft opens anchored there. Clicks on overlay chrome pass through so the
    /// chrome can handle them.
    pub fn click(&mut self, doc: &Document, x: f64, y: f64) -> ClickOutcome {
        if !self.is_comment_mode() || self.is_over_overlay(doc, x, y) {
            return ClickOutcome::PassThrough;
        }
        let Some(element) = self.target_at(doc, x, y) else {
            return ClickOutcome::Suppressed;
        };

        let anchor = self.anchor_at(doc, element, x, y);
        debug!(locator = %anchor.locator, "opened comment draft");
        self.state = OverlayState::Drafting(PendingComment {
            locator: anchor.locator,
            x_percentage: anchor.x_percentage,
            y_percentage: anchor.y_percentage,
            click_x: x,
            click_y: y,
            text: String::new(),
        });
        ClickOutcome::Suppressed
    }

    /// Replaces the draft's text.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::NoDraft`] when no draft is open.
    pub fn set_draft_text(&mut self, text: &str) -> Result<(), OverlayError> {
        match &mut self.state {
            OverlayState::Drafting(draft) => {
                draft.text = text.to_owned();
                Ok(())
            }
            _ => Err(OverlayError::NoDraft),
        }
    }

    /// Discards the open draft, if any.
    pub fn cancel_draft(&mut self) {
        if matches!(self.state, OverlayState::Drafting(_)) {
            self.state = OverlayState::default();
        }
    }

    /// Closes the draft and returns the request that persists it.
    ///
    /// The comment joins the working set only when the `Created` outcome arrives.
    ///
    /// # Errors
    ///
    /// [`OverlayError::NoDraft`] without an open draft; [`OverlayError::EmptyComment`]
    /// when the text is empty after trimming (the draft stays open).
    pub fn submit_draft(&mut self, viewport: Viewport) -> Result<StoreRequest, OverlayError> {
        let OverlayState::Drafting(draft) = &self.state else {
            return Err(OverlayError::NoDraft);
        };
        let content = draft.text.trim();
        if content.is_empty() {
            return Err(OverlayError::EmptyComment);
        }
        let request = StoreRequest::Create(NewComment {
            locator: draft.locator.clone(),
            x_percentage: draft.x_percentage,
            y_percentage: draft.y_percentage,
            content: content.to_owned(),
            viewport,
        });
        self.state = OverlayState::default();
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Tooltips, resolve and delete
    // -----------------------------------------------------------------------

    /// Opens the tooltip for `id`, or closes it if it is already open.
    ///
    /// Only possible while idle.
    pub fn toggle_tooltip(&mut self, id: &str) {
        let OverlayState::Idle { tooltip } = &mut self.state else {
            return;
        };
        *tooltip = match tooltip.as_deref() {
            Some(open) if open == id => None,
            _ if self.comments.iter().any(|c| c.id == id) => Some(id.to_owned()),
            _ => None,
        };
    }

    /// Closes any open tooltip.
    pub fn close_tooltip(&mut self) {
        if let OverlayState::Idle { tooltip } = &mut self.state {
            *tooltip = None;
        }
    }

    fn require(&self, id: &str) -> Result<(), OverlayError> {
        if self.comment(id).is_some() {
            Ok(())
        } else {
            Err(OverlayError::UnknownComment(id.to_owned()))
        }
    }

    /// Request deleting `id`; the working set changes when the outcome arrives.
    ///
    /// # Errors
    ///
    /// [`OverlayError::UnknownComment`] if `id` is not loaded.
    pub fn request_delete(&self, id: &str) -> Result<StoreRequest, OverlayError> {
        self.require(id)?;
        Ok(StoreRequest::Delete { id: id.to_owned() })
    }

    /// Request resolving `id`; the working set changes when the outcome arrives.
    ///
    /// # Errors
    ///
    /// [`OverlayError::UnknownComment`] if `id` is not loaded.
    pub fn request_resolve(&self, id: &str) -> Result<StoreRequest, OverlayError> {
        self.require(id)?;
        Ok(StoreRequest::Resolve { id: id.to_owned() })
    }

    // -----------------------------------------------------------------------
    // Dragging
    // -----------------------------------------------------------------------

    /// Pointer pressed on the pin for `id`: starts a drag and closes any tooltip.
    ///
    /// # Errors
    ///
    /// [`OverlayError::Busy`] unless idle; [`OverlayError::UnknownComment`] if
    /// `id` is not loaded.
    pub fn pin_pointer_down(&mut self, id: &str, x: f64, y: f64) -> Result<(), OverlayError> {
        if !matches!(self.state, OverlayState::Idle { .. }) {
            return Err(OverlayError::Busy);
        }
        self.require(id)?;
        self.state = OverlayState::Dragging(DragState {
            comment_id: id.to_owned(),
            current_x: x,
            current_y: y,
        });
        Ok(())
    }

    /// Ends a drag without re-anchoring, for a press that turned out to be a click.
    pub fn cancel_drag(&mut self) {
        if matches!(self.state, OverlayState::Dragging(_)) {
            self.state = OverlayState::default();
        }
    }

    /// Pointer released at `(x, y)` while dragging.
    ///
    /// When a page element is under the release point the comment is re-anchored
    /// there immediately and the returned request persists it. With no element
    /// under the pointer the comment keeps its anchor and nothing is sent. Either
    /// way the drag ends.
    pub fn drag_release(&mut self, doc: &Document, x: f64, y: f64) -> Option<StoreRequest> {
        let OverlayState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return None;
        };
        let element = self.target_at(doc, x, y)?;
        let anchor = self.anchor_at(doc, element, x, y);
        let comment = self.comments.iter_mut().find(|c| c.id == drag.comment_id)?;

        let previous = comment.anchor();
        comment.set_anchor(anchor);
        self.revision += 1;
        debug!(id = %comment.id, locator = %comment.locator, "re-anchored comment");

        Some(StoreRequest::UpdatePosition {
            id: comment.id.clone(),
            update: PositionUpdate {
                locator: comment.locator.clone(),
                x_percentage: comment.x_percentage,
                y_percentage: comment.y_percentage,
                viewport: comment.viewport.unwrap_or_else(|| doc.viewport()),
            },
            previous,
        })
    }

    // -----------------------------------------------------------------------
    // Storage outcomes
    // -----------------------------------------------------------------------

    /// Applies a storage outcome to the working set.
    ///
    /// Failed outcomes change nothing, except a failed reposition, which rolls the
    /// comment back to its previous anchor unless a later drag has already moved it
    /// again. Outcomes arriving after [`Overlay::unmount`] are discarded. Returns
    /// `true` if the working set changed.
    pub fn apply(&mut self, outcome: StoreOutcome) -> bool {
        if !self.is_mounted() {
            debug!("discarding storage outcome after unmount");
            return false;
        }

        let changed = match outcome {
            StoreOutcome::Fetched { comments, ok: true } => {
                self.load(comments);
                return true;
            }
            StoreOutcome::Created(Some(comment)) => {
                if self.comment(&comment.id).is_none() {
                    self.comments.push(comment);
                    true
                } else {
                    false
                }
            }
            StoreOutcome::Deleted { id, ok: true } => {
                let before = self.comments.len();
                self.comments.retain(|c| c.id != id);
                self.forget(&id);
                self.comments.len() != before
            }
            StoreOutcome::Resolved { id, ok: true } => {
                self.close_tooltip();
                match self.comments.iter_mut().find(|c| c.id == id) {
                    Some(comment) if !comment.resolved => {
                        comment.resolved = true;
                        true
                    }
                    _ => false,
                }
            }
            StoreOutcome::PositionUpdated { id, update, previous, ok: false } => {
                match self.comments.iter_mut().find(|c| c.id == id) {
                    Some(comment) if comment.locator == update.locator
                        && comment.x_percentage == update.x_percentage
                        && comment.y_percentage == update.y_percentage =>
                    {
                        warn!(id = %id, "reposition not persisted, restoring previous anchor");
                        comment.set_anchor(previous);
                        true
                    }
                    _ => false,
                }
            }
            StoreOutcome::PositionUpdated { ok: true, .. } => false,
            StoreOutcome::Fetched { ok: false, .. }
            | StoreOutcome::Created(None)
            | StoreOutcome::Deleted { ok: false, .. }
            | StoreOutcome::Resolved { ok: false, .. } => false,
        };

        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Replaces the working set, e.g. with the result of a fetch.
    ///
    /// Transient state pointing at comments that are no longer loaded is dropped.
    pub fn load(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
        let stale = match &self.state {
            OverlayState::Idle { tooltip: Some(id) } => Some(id.clone()),
            OverlayState::Dragging(drag) => Some(drag.comment_id.clone()),
            _ => None,
        };
        if let Some(id) = stale.filter(|id| self.comment(id).is_none()) {
            self.forget(&id);
        }
        self.revision += 1;
    }

    /// Drops transient state that refers to a removed comment.
    fn forget(&mut self, id: &str) {
        let stale = match &self.state {
            OverlayState::Idle { tooltip } => tooltip.as_deref() == Some(id),
            OverlayState::Dragging(drag) => drag.comment_id == id,
            _ => false,
        };
        if stale {
            self.state = OverlayState::default();
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Combines the tracker's latest positions with the drag state.
    ///
    /// The dragged pin is drawn at the cursor instead of its anchor.
    pub fn render_pins(&self, positions: &[PositionedComment]) -> Vec<Pin> {
        let drag = self.drag();
        positions
            .iter()
            .enumerate()
            .map(|(index, positioned)| {
                let comment = &positioned.comment;
                let live = self.comment(&comment.id);
                match drag.filter(|d| d.comment_id == comment.id) {
                    Some(d) => Pin {
                        id: comment.id.clone(),
                        number: index + 1,
                        x: d.current_x,
                        y: d.current_y,
                        visible: true,
                        resolved: live.map_or(comment.resolved, |c| c.resolved),
                        dragging: true,
                    },
                    None => Pin {
                        id: comment.id.clone(),
                        number: index + 1,
                        x: positioned.absolute_x,
                        y: positioned.absolute_y,
                        visible: positioned.visible,
                        resolved: live.map_or(comment.resolved, |c| c.resolved),
                        dragging: false,
                    },
                }
            })
            .collect()
    }
}
