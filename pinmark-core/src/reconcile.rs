//! Position reconciliation: keeping pin coordinates in step with live layout.
//!
//! A [`PinTracker`] subscribes to every signal that can move an anchor element
//! (document and window scroll, window resize, subtree mutations of `style` and
//! `class` or of child lists) and re-derives every comment's viewport position.
//!
//! Signals never recompute directly. Each one goes through the
//! [`FrameScheduler`], which cancels any already-scheduled frame and schedules a
//! fresh one, so any burst of signals between two frames costs exactly one pass.
//! The host drives frames by calling [`PinTracker::on_frame`] from its render
//! tick; tests call [`PinTracker::trigger`] and `on_frame` directly.
//!
//! ```text
//! Idle --trigger--> Scheduled --on_frame--> Recomputing --pass done--> Idle
//!   \__________________ teardown (from any phase) __________________> TornDown
//! ```

use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info, warn};

use crate::dom::{Document, EventKind, ListenTarget, ListenerId, MutationOptions, PageSignal};
use crate::position::to_absolute;
use crate::types::{Comment, PositionedComment};

/// Attributes whose changes can move elements.
pub const LAYOUT_ATTRIBUTES: [&str; 2] = ["style", "class"];

/// Identifies one scheduled frame. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameHandle(u64);

/// Pending-flag scheduler with cancel-and-reschedule semantics.
///
/// At most one frame is scheduled at any time.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    last_handle: u64,
    scheduled: Option<FrameHandle>,
    cancelled: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the scheduled frame, if any, and schedules a new one.
    pub fn schedule(&mut self) -> FrameHandle {
        self.cancel();
        self.last_handle += 1;
        let handle = FrameHandle(self.last_handle);
        self.scheduled = Some(handle);
        handle
    }

    /// Cancels the scheduled frame. Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        let had_frame = self.scheduled.take().is_some();
        if had_frame {
            self.cancelled += 1;
        }
        had_frame
    }

    /// Consumes the scheduled frame when the host's frame arrives.
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.scheduled.take()
    }

    pub fn scheduled(&self) -> Option<FrameHandle> {
        self.scheduled
    }

    /// Total frames cancelled by rescheduling or explicit cancellation.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

/// Lifecycle phase of a [`PinTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Scheduled,
    Recomputing,
    TornDown,
}

/// Maps every comment to its current viewport position.
///
/// Each comment is mapped independently: a locator that no longer resolves
/// yields `visible: false` at `(0, 0)` and never affects the others. Output
/// order follows `comments`, so ids stay stable keys for rendering.
pub fn reconcile(doc: &Document, comments: &[Comment]) -> Vec<PositionedComment> {
    comments
        .iter()
        .map(|comment| {
            let anchor = to_absolute(doc, &comment.locator, comment.x_percentage, comment.y_percentage);
            PositionedComment {
                comment: comment.clone(),
                absolute_x: anchor.map_or(0.0, |a| a.x),
                absolute_y: anchor.map_or(0.0, |a| a.y),
                visible: anchor.is_some_and(|a| a.visible),
            }
        })
        .collect()
}

/// The reconciliation loop for one mounted comment set.
pub struct PinTracker {
    signals: Receiver<PageSignal>,
    listeners: Vec<ListenerId>,
    scheduler: FrameScheduler,
    phase: LoopPhase,
    positions: Vec<PositionedComment>,
    passes: u64,
}

impl PinTracker {
    /// Subscribes to the document's change signals and runs the initial pass.
    ///
    /// Scroll is captured at both the window and the document so scrolls from
    /// any inner scrollable element are seen, not only the document's own.
    pub fn mount(doc: &mut Document, comments: &[Comment]) -> Self {
        let (tx, signals) = unbounded();
        let body = doc.body();
        let listeners = vec![
            doc.add_event_listener(ListenTarget::Window, EventKind::Scroll, true, tx.clone()),
            doc.add_event_listener(ListenTarget::Document, EventKind::Scroll, true, tx.clone()),
            doc.add_event_listener(ListenTarget::Window, EventKind::Resize, false, tx.clone()),
            doc.observe_mutations(
                body,
                MutationOptions {
                    child_list: true,
                    attributes: true,
                    attribute_filter: Some(LAYOUT_ATTRIBUTES.iter().map(|a| a.to_string()).collect()),
                    subtree: true,
                },
                tx,
            ),
        ];
        info!(listeners = listeners.len(), comments = comments.len(), "pin tracker mounted");

        let mut tracker = Self {
            signals,
            listeners,
            scheduler: FrameScheduler::new(),
            phase: LoopPhase::Idle,
            positions: Vec::new(),
            passes: 0,
        };
        tracker.run_pass(doc, comments);
        tracker
    }

    /// Drains pending page signals, turning each into a [`PinTracker::trigger`].
    ///
    /// Returns the number of signals drained.
    pub fn pump(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(signal) = self.signals.try_recv() {
            drained += 1;
            debug!(?signal, "page signal");
            self.trigger();
        }
        drained
    }

    /// Requests a recomputation on the next frame, replacing any pending request.
    pub fn trigger(&mut self) {
        if self.phase == LoopPhase::TornDown {
            return;
        }
        self.scheduler.schedule();
        self.phase = LoopPhase::Scheduled;
    }

    /// Frame callback: runs the scheduled pass, if any. Returns `true` if a pass ran.
    pub fn on_frame(&mut self, doc: &Document, comments: &[Comment]) -> bool {
        if self.phase == LoopPhase::TornDown || self.scheduler.take_due().is_none() {
            return false;
        }
        self.run_pass(doc, comments);
        true
    }

    /// Recomputes immediately, dropping any scheduled frame.
    ///
    /// Used when the working set itself changes (a comment was added, removed or
    /// re-anchored); page signals go through [`PinTracker::trigger`] instead.
    pub fn refresh(&mut self, doc: &Document, comments: &[Comment]) {
        if self.phase == LoopPhase::TornDown {
            return;
        }
        self.scheduler.cancel();
        self.run_pass(doc, comments);
    }

    fn run_pass(&mut self, doc: &Document, comments: &[Comment]) {
        self.phase = LoopPhase::Recomputing;
        self.positions = reconcile(doc, comments);
        self.passes += 1;
        self.phase = LoopPhase::Idle;
        debug!(
            pass = self.passes,
            visible = self.positions.iter().filter(|p| p.visible).count(),
            total = self.positions.len(),
            "reconciled pin positions"
        );
    }

    /// Unsubscribes every listener and observer and cancels the pending frame.
    ///
    /// Idempotent. After teardown no further pass ever runs.
    pub fn teardown(&mut self, doc: &mut Document) {
        if self.phase == LoopPhase::TornDown {
            return;
        }
        for id in self.listeners.drain(..) {
            doc.remove_listener(id);
        }
        self.scheduler.cancel();
        while self.signals.try_recv().is_ok() {}
        self.phase = LoopPhase::TornDown;
        info!(passes = self.passes, "pin tracker torn down");
    }

    /// Positions from the most recent pass.
    pub fn positions(&self) -> &[PositionedComment] {
        &self.positions
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Number of passes run since mount, including the initial one.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }
}

impl Drop for PinTracker {
    fn drop(&mut self) {
        if self.phase != LoopPhase::TornDown {
            warn!(listeners = self.listeners.len(), "pin tracker dropped without teardown");
        }
    }
}
