//! Central application state for pinmark.
//!
//! `AppState` owns the demo page document, the overlay controller and the pin
//! tracker, plus the little UI state the harness adds on top (selected pin,
//! help overlay, status message). No rendering lives here: `ui` reads this
//! state and `input` mutates it.

use pinmark_core::dom::Document;
use pinmark_core::overlay::{Overlay, OverlayError, Pin};
use pinmark_core::reconcile::PinTracker;
use pinmark_core::store::{StoreOutcome, StoreRequest};
use pinmark_core::types::Viewport;
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::page::DemoPage;

/// Which surface has the keyboard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The page, with the overlay on top (default).
    #[default]
    Browse,
    /// Full-screen help overlay.
    Help,
}

/// A one-line message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub error: bool,
}

/// An in-progress press on a pin, before we know whether it is a click or a drag.
#[derive(Debug, Clone, PartialEq)]
pub struct PinPress {
    pub id: String,
    pub column: u16,
    pub row: u16,
    pub moved: bool,
}

pub struct AppState {
    pub mode: Mode,
    pub doc: Document,
    pub page: DemoPage,
    pub overlay: Overlay,
    pub tracker: PinTracker,
    /// Overlay revision the tracker last refreshed for.
    seen_revision: u64,
    store_tx: UnboundedSender<StoreRequest>,

    /// Screen area the page is drawn into, cached by the renderer.
    pub page_area: Rect,
    /// Pins as of the last frame, in screen order.
    pub pins: Vec<Pin>,
    /// Id of the pin selected with Tab, if any.
    pub selected: Option<String>,
    pub press: Option<PinPress>,
    pub help_scroll: u16,
    pub status: Option<Status>,
}

impl AppState {
    /// Builds the demo page, mounts the overlay on it and starts tracking pins.
    pub fn new(viewport: Viewport, store_tx: UnboundedSender<StoreRequest>) -> Self {
        let (mut doc, mut page) = DemoPage::build(viewport);
        let mut overlay = Overlay::new();
        let root = overlay.mount(&mut doc);
        page.attach_overlay(&mut doc, root);
        let tracker = PinTracker::mount(&mut doc, overlay.comments());

        Self {
            mode: Mode::default(),
            doc,
            page,
            seen_revision: overlay.revision(),
            overlay,
            tracker,
            store_tx,
            page_area: Rect::default(),
            pins: Vec::new(),
            selected: None,
            press: None,
            help_scroll: 0,
            status: None,
        }
    }

    /// Hands a request to the store worker.
    pub fn send(&mut self, request: StoreRequest) {
        debug!(?request, "store request");
        if self.store_tx.send(request).is_err() {
            warn!("store worker is gone");
            self.error("comment storage is unavailable");
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status { text: text.into(), error: false });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(Status { text: text.into(), error: true });
    }

    /// Keeps the document viewport equal to the screen area the page is drawn in.
    pub fn set_page_area(&mut self, area: Rect) {
        if area == self.page_area {
            return;
        }
        self.page_area = area;
        self.page.resize(&mut self.doc, f64::from(area.width), f64::from(area.height));
    }

    /// Fits the page to a terminal of `columns` x `rows`, leaving the status bar row.
    pub fn resize_terminal(&mut self, columns: u16, rows: u16) {
        let [page, _] = crate::ui::compute_layout(Rect::new(0, 0, columns, rows));
        self.set_page_area(page);
    }

    /// One animation frame: drain page signals, refresh for working-set changes,
    /// run the scheduled reconciliation pass, then rebuild the pin list.
    pub fn frame(&mut self) {
        self.page.place_fab(&mut self.doc);
        self.tracker.pump();
        if self.overlay.revision() != self.seen_revision {
            self.seen_revision = self.overlay.revision();
            self.tracker.refresh(&self.doc, self.overlay.comments());
        }
        self.tracker.on_frame(&self.doc, self.overlay.comments());
        self.pins = self.overlay.render_pins(self.tracker.positions());
        if let Some(id) = &self.selected {
            if self.overlay.comment(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// Feeds a storage outcome to the overlay and reports it in the status bar.
    pub fn apply_outcome(&mut self, outcome: StoreOutcome) {
        let message = match &outcome {
            StoreOutcome::Fetched { comments, ok: true } => Ok(format!("{} comments", comments.len())),
            StoreOutcome::Fetched { ok: false, .. } => Err("could not load comments".to_owned()),
            StoreOutcome::Created(Some(comment)) => {
                self.selected = Some(comment.id.clone());
                Ok("comment posted".to_owned())
            }
            StoreOutcome::Created(None) => Err("could not post comment".to_owned()),
            StoreOutcome::Deleted { ok: true, .. } => Ok("comment deleted".to_owned()),
            StoreOutcome::Deleted { ok: false, .. } => Err("could not delete comment".to_owned()),
            StoreOutcome::Resolved { ok: true, .. } => Ok("comment resolved".to_owned()),
            StoreOutcome::Resolved { ok: false, .. } => Err("could not resolve comment".to_owned()),
            StoreOutcome::PositionUpdated { ok: true, .. } => Ok("pin moved".to_owned()),
            StoreOutcome::PositionUpdated { ok: false, .. } => {
                Err("could not move pin, restored".to_owned())
            }
        };
        self.overlay.apply(outcome);
        match message {
            Ok(text) => self.info(text),
            Err(text) => self.error(text),
        }
    }

    // -----------------------------------------------------------------------
    // Page actions
    // -----------------------------------------------------------------------

    pub fn scroll_by(&mut self, rows: f64) {
        self.doc.scroll_by(0.0, rows);
    }

    pub fn scroll_to_top(&mut self) {
        self.doc.scroll_to(0.0, 0.0);
    }

    pub fn scroll_to_bottom(&mut self) {
        let bottom = self.doc.max_scroll_y();
        self.doc.scroll_to(0.0, bottom);
    }

    /// Rows scrolled by PageUp / PageDown.
    pub fn page_rows(&self) -> f64 {
        (self.doc.viewport().height - 2.0).max(1.0)
    }

    pub fn toggle_banner(&mut self) {
        let shown = self.page.toggle_banner(&mut self.doc);
        self.info(if shown { "banner shown" } else { "banner hidden" });
    }

    pub fn shuffle_cards(&mut self) {
        self.page.shuffle_cards(&mut self.doc);
        self.info("cards shuffled");
    }

    pub fn toggle_highlight(&mut self) {
        let on = self.page.toggle_highlight(&mut self.doc);
        self.info(if on { "first card highlighted" } else { "highlight removed" });
    }

    // -----------------------------------------------------------------------
    // Pin selection and comment actions
    // -----------------------------------------------------------------------

    /// Moves the selection `step` pins forward (negative: backward), wrapping.
    pub fn select_step(&mut self, step: isize) {
        let count = self.overlay.comments().len();
        if count == 0 {
            self.selected = None;
            return;
        }
        let current = self
            .selected
            .as_deref()
            .and_then(|id| self.overlay.comments().iter().position(|c| c.id == id));
        let next = match current {
            Some(index) => (index as isize + step).rem_euclid(count as isize) as usize,
            None if step < 0 => count - 1,
            None => 0,
        };
        let id = self.overlay.comments()[next].id.clone();
        self.follow(&id);
        self.selected = Some(id);
    }

    /// Scrolls so the selected comment's pin is on screen.
    fn follow(&mut self, id: &str) {
        let Some(pin) = self.tracker.positions().iter().find(|p| p.comment.id == id) else {
            return;
        };
        let height = self.doc.viewport().height;
        if !pin.visible || pin.absolute_y < 0.0 || pin.absolute_y >= height {
            let target = self.doc.scroll_offset().1 + pin.absolute_y - height / 2.0;
            self.doc.scroll_to(0.0, target);
        }
    }

    pub fn toggle_selected_tooltip(&mut self) {
        if let Some(id) = self.selected.clone() {
            self.overlay.toggle_tooltip(&id);
        }
    }

    pub fn resolve_selected(&mut self) {
        let Some(id) = self.selected.clone() else {
            self.error("select a pin first (Tab)");
            return;
        };
        if self.overlay.comment(&id).is_some_and(|c| c.resolved) {
            self.info("already resolved");
            return;
        }
        self.dispatch(self.overlay.request_resolve(&id));
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected.clone() else {
            self.error("select a pin first (Tab)");
            return;
        };
        self.dispatch(self.overlay.request_delete(&id));
    }

    pub fn refetch(&mut self) {
        self.send(StoreRequest::Fetch);
        self.info("reloading comments");
    }

    pub fn submit_draft(&mut self) {
        let viewport = self.doc.viewport();
        let request = self.overlay.submit_draft(viewport);
        self.dispatch(request);
    }

    fn dispatch(&mut self, request: Result<StoreRequest, OverlayError>) {
        match request {
            Ok(request) => self.send(request),
            Err(e) => self.error(e.to_string()),
        }
    }

    /// Tears the overlay down; called once on the way out.
    pub fn shutdown(&mut self) {
        self.tracker.teardown(&mut self.doc);
        self.overlay.unmount(&mut self.doc);
        info!("overlay shut down");
    }
}
