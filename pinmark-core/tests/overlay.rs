//! The overlay controller driven end to end: placing, drafting, persisting,
//! resolving, deleting and dragging, with storage round trips through
//! `execute`.

mod common;

use common::{author, comment, landing_page, temp_db_path, Page, VIEWPORT};
use pinmark_core::dom::NodeId;
use pinmark_core::overlay::{ClickOutcome, Overlay, OverlayError, OverlayState};
use pinmark_core::reconcile::PinTracker;
use pinmark_core::store::sqlite::SqliteStore;
use pinmark_core::store::{execute, CommentStore, StoreError, StoreOutcome, StoreRequest};
use pinmark_core::types::{Anchor, Comment, NewComment, PositionUpdate, Rect};
use pretty_assertions::assert_eq;

const PAGE: &str = "http://localhost:5173/";
const CARD_LOCATOR: &str = "main.content > div.grid:nth-of-type(1) > div.card:nth-of-type(1)";

/// A backend that is always down.
struct Offline;

impl CommentStore for Offline {
    async fn fetch_comments(&self) -> Result<Vec<Comment>, StoreError> {
        Err(StoreError::Status { action: "fetch", status: 503 })
    }

    async fn create_comment(&self, _draft: NewComment) -> Result<Comment, StoreError> {
        Err(StoreError::Status { action: "create", status: 503 })
    }

    async fn delete_comment(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Status { action: "delete", status: 503 })
    }

    async fn resolve_comment(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Status { action: "resolve", status: 503 })
    }

    async fn update_position(&self, _id: &str, _update: PositionUpdate) -> Result<(), StoreError> {
        Err(StoreError::Status { action: "reposition", status: 503 })
    }
}

/// Landing page with the overlay mounted and its floating button laid out.
fn mounted() -> (Page, Overlay, NodeId) {
    let mut page = landing_page();
    let mut overlay = Overlay::new();
    let root = overlay.mount(&mut page.doc);
    let button = page.doc.create_element("button");
    page.doc.set_layout(button, Rect::new(740.0, 540.0, 40.0, 40.0));
    page.doc.append_child(root, button);
    (page, overlay, button)
}

fn loaded(overlay: &mut Overlay, comments: Vec<Comment>) {
    assert!(overlay.apply(StoreOutcome::Fetched { comments, ok: true }));
}

#[tokio::test]
async fn click_to_place_then_submit_persists_the_comment() {
    let (mut page, mut overlay, _) = mounted();
    let store = SqliteStore::open(&temp_db_path(), PAGE, author()).await.unwrap();
    let mut tracker = PinTracker::mount(&mut page.doc, overlay.comments());

    assert!(overlay.toggle_comment_mode());
    overlay.pointer_move(&page.doc, 120.0, 330.0);
    let highlight = overlay.highlight().unwrap();
    assert_eq!(highlight.element, page.cards[0]);
    assert_eq!(highlight.locator, CARD_LOCATOR);
    assert_eq!(highlight.rect, Rect::new(20.0, 280.0, 200.0, 100.0));

    assert_eq!(overlay.click(&page.doc, 120.0, 330.0), ClickOutcome::Suppressed);
    let draft = overlay.draft().unwrap();
    assert_eq!(draft.locator, CARD_LOCATOR);
    assert_eq!((draft.x_percentage, draft.y_percentage), (50.0, 50.0));
    assert_eq!((draft.click_x, draft.click_y), (120.0, 330.0));

    overlay.set_draft_text("  nice  ").unwrap();
    let request = overlay.submit_draft(page.doc.viewport()).unwrap();
    assert_eq!(overlay.state(), &OverlayState::Idle { tooltip: None });
    assert!(overlay.comments().is_empty(), "comment appears only once stored");

    let outcome = execute(&store, request).await;
    assert!(overlay.apply(outcome));
    assert_eq!(overlay.comments().len(), 1);
    assert_eq!(overlay.comments()[0].content, "nice");

    let stored = store.fetch_comments().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "nice");
    assert_eq!(stored[0].locator, CARD_LOCATOR);

    tracker.refresh(&page.doc, overlay.comments());
    let pins = overlay.render_pins(tracker.positions());
    assert_eq!(pins.len(), 1);
    assert_eq!((pins[0].x, pins[0].y, pins[0].number), (120.0, 330.0, 1));
    assert!(pins[0].visible);

    tracker.teardown(&mut page.doc);
}

#[test]
fn empty_comments_are_rejected_and_the_draft_stays_open() {
    let (page, mut overlay, _) = mounted();
    overlay.toggle_comment_mode();
    overlay.click(&page.doc, 120.0, 330.0);

    overlay.set_draft_text("   \n ").unwrap();
    assert_eq!(overlay.submit_draft(VIEWPORT), Err(OverlayError::EmptyComment));
    assert!(overlay.draft().is_some());

    overlay.cancel_draft();
    assert_eq!(overlay.state(), &OverlayState::Idle { tooltip: None });
    assert_eq!(overlay.submit_draft(VIEWPORT), Err(OverlayError::NoDraft));
    assert_eq!(overlay.set_draft_text("late"), Err(OverlayError::NoDraft));
}

#[test]
fn clicks_outside_comment_mode_pass_through() {
    let (page, mut overlay, _) = mounted();
    assert_eq!(overlay.click(&page.doc, 120.0, 330.0), ClickOutcome::PassThrough);
    assert!(overlay.draft().is_none());
}

#[test]
fn clicking_bare_background_keeps_placing() {
    let (mut page, mut overlay, _) = mounted();
    page.doc.scroll_to(0.0, 1400.0);
    overlay.toggle_comment_mode();

    overlay.pointer_move(&page.doc, 400.0, 300.0);
    assert!(overlay.highlight().is_none(), "body is never a target");
    assert_eq!(overlay.click(&page.doc, 400.0, 300.0), ClickOutcome::Suppressed);
    assert!(overlay.is_comment_mode());
}

#[test]
fn overlay_chrome_is_never_a_target() {
    let (mut page, mut overlay, _) = mounted();
    overlay.toggle_comment_mode();

    assert!(overlay.is_over_overlay(&page.doc, 750.0, 550.0));
    overlay.pointer_move(&page.doc, 750.0, 550.0);
    assert!(overlay.highlight().is_none());
    assert_eq!(overlay.click(&page.doc, 750.0, 550.0), ClickOutcome::PassThrough);
    assert!(overlay.is_comment_mode());

    // Even a full-viewport overlay layer is looked through when hit-testing the page.
    let root = overlay.root().unwrap();
    let layer = page.doc.create_element("div");
    page.doc.set_layout(layer, Rect::new(0.0, 0.0, 800.0, 600.0));
    page.doc.append_child(root, layer);
    assert_eq!(overlay.target_at(&page.doc, 120.0, 330.0), Some(page.cards[0]));
}

#[test]
fn hidden_elements_are_skipped_when_placing() {
    let (mut page, mut overlay, _) = mounted();
    page.doc.set_attribute(page.cards[0], "style", "display: none");
    overlay.toggle_comment_mode();

    overlay.pointer_move(&page.doc, 120.0, 330.0);
    assert_eq!(overlay.highlight().map(|h| h.element), Some(page.grid));
}

#[test]
fn toggling_comment_mode_closes_the_tooltip() {
    let (_page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);

    overlay.toggle_tooltip("a");
    assert_eq!(overlay.tooltip(), Some("a"));
    overlay.toggle_tooltip("a");
    assert_eq!(overlay.tooltip(), None);
    overlay.toggle_tooltip("missing");
    assert_eq!(overlay.tooltip(), None);

    overlay.toggle_tooltip("a");
    assert!(overlay.toggle_comment_mode());
    assert_eq!(overlay.tooltip(), None);
    assert!(!overlay.toggle_comment_mode());
    assert_eq!(overlay.tooltip(), None, "tooltip does not come back");
}

#[test]
fn drag_and_draft_are_mutually_exclusive() {
    let (page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);

    overlay.toggle_comment_mode();
    overlay.click(&page.doc, 120.0, 330.0);
    assert_eq!(overlay.pin_pointer_down("a", 400.0, 30.0), Err(OverlayError::Busy));
    assert!(!overlay.toggle_comment_mode(), "drafting ignores the toggle");
    assert!(overlay.draft().is_some());

    overlay.cancel_draft();
    assert_eq!(
        overlay.pin_pointer_down("zzz", 400.0, 30.0),
        Err(OverlayError::UnknownComment("zzz".to_owned()))
    );
    overlay.toggle_tooltip("a");
    overlay.pin_pointer_down("a", 400.0, 30.0).unwrap();
    assert_eq!(overlay.tooltip(), None, "dragging closes the tooltip");
    overlay.toggle_tooltip("a");
    assert!(overlay.drag().is_some(), "tooltips cannot open mid-drag");
}

#[test]
fn dropping_a_pin_on_an_element_re_anchors_it_optimistically() {
    let (mut page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);
    let mut tracker = PinTracker::mount(&mut page.doc, overlay.comments());
    let revision = overlay.revision();

    overlay.pin_pointer_down("a", 400.0, 30.0).unwrap();
    overlay.pointer_move(&page.doc, 300.0, 200.0);
    let pins = overlay.render_pins(tracker.positions());
    assert!(pins[0].dragging);
    assert_eq!((pins[0].x, pins[0].y), (300.0, 200.0));

    let request = overlay.drag_release(&page.doc, 380.0, 330.0).unwrap();
    assert_eq!(
        request,
        StoreRequest::UpdatePosition {
            id: "a".to_owned(),
            update: PositionUpdate {
                locator: ".card.featured".to_owned(),
                x_percentage: 50.0,
                y_percentage: 50.0,
                viewport: VIEWPORT,
            },
            previous: Anchor {
                locator: "#top".to_owned(),
                x_percentage: 50.0,
                y_percentage: 50.0,
                viewport: Some(VIEWPORT),
            },
        }
    );
    assert_eq!(overlay.state(), &OverlayState::Idle { tooltip: None });
    assert_eq!(overlay.comment("a").unwrap().locator, ".card.featured");
    assert!(overlay.revision() > revision);

    tracker.refresh(&page.doc, overlay.comments());
    let pins = overlay.render_pins(tracker.positions());
    assert!(!pins[0].dragging);
    assert_eq!((pins[0].x, pins[0].y), (380.0, 330.0));

    tracker.teardown(&mut page.doc);
}

#[test]
fn dropping_a_pin_on_nothing_keeps_its_anchor() {
    let (mut page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);
    let revision = overlay.revision();
    page.doc.scroll_to(0.0, 1400.0);

    overlay.pin_pointer_down("a", 10.0, 10.0).unwrap();
    assert_eq!(overlay.drag_release(&page.doc, 400.0, 300.0), None);
    assert_eq!(overlay.state(), &OverlayState::Idle { tooltip: None });
    assert_eq!(overlay.comment("a").unwrap().locator, "#top");
    assert_eq!(overlay.revision(), revision);
}

#[tokio::test]
async fn failed_reposition_rolls_back() {
    let (page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);

    overlay.pin_pointer_down("a", 400.0, 30.0).unwrap();
    let request = overlay.drag_release(&page.doc, 380.0, 330.0).unwrap();
    assert_eq!(overlay.comment("a").unwrap().locator, ".card.featured");

    let outcome = execute(&Offline, request).await;
    assert!(matches!(outcome, StoreOutcome::PositionUpdated { ok: false, .. }));
    assert!(overlay.apply(outcome));

    let restored = overlay.comment("a").unwrap();
    assert_eq!(restored.locator, "#top");
    assert_eq!((restored.x_percentage, restored.y_percentage), (50.0, 50.0));
}

#[tokio::test]
async fn superseded_reposition_failures_do_not_roll_back() {
    let (page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);

    overlay.pin_pointer_down("a", 400.0, 30.0).unwrap();
    let first = overlay.drag_release(&page.doc, 380.0, 330.0).unwrap();
    overlay.pin_pointer_down("a", 380.0, 330.0).unwrap();
    overlay.drag_release(&page.doc, 400.0, 160.0).unwrap();
    assert_eq!(overlay.comment("a").unwrap().locator, ".hero");

    let outcome = execute(&Offline, first).await;
    assert!(!overlay.apply(outcome));
    assert_eq!(overlay.comment("a").unwrap().locator, ".hero");
}

#[tokio::test]
async fn resolve_and_delete_round_trip_through_storage() {
    let (mut page, mut overlay, _) = mounted();
    let store = SqliteStore::open(&temp_db_path(), PAGE, author()).await.unwrap();
    for (locator, content) in [("#top", "logo"), (".hero", "headline")] {
        store
            .create_comment(NewComment {
                locator: locator.to_owned(),
                x_percentage: 50.0,
                y_percentage: 50.0,
                content: content.to_owned(),
                viewport: VIEWPORT,
            })
            .await
            .unwrap();
    }
    assert!(overlay.apply(execute(&store, StoreRequest::Fetch).await));
    let ids: Vec<String> = overlay.comments().iter().map(|c| c.id.clone()).collect();
    let mut tracker = PinTracker::mount(&mut page.doc, overlay.comments());

    overlay.toggle_tooltip(&ids[0]);
    let request = overlay.request_resolve(&ids[0]).unwrap();
    assert!(overlay.apply(execute(&store, request).await));
    assert!(overlay.comment(&ids[0]).unwrap().resolved);
    assert_eq!(overlay.tooltip(), None, "resolving closes the tooltip");

    tracker.refresh(&page.doc, overlay.comments());
    let pins = overlay.render_pins(tracker.positions());
    assert!(pins[0].resolved);
    assert!(pins[0].visible, "resolved comments stay positioned");
    assert_eq!((pins[0].x, pins[0].y), (400.0, 30.0));

    let request = overlay.request_delete(&ids[1]).unwrap();
    assert!(overlay.apply(execute(&store, request).await));
    assert!(overlay.comment(&ids[1]).is_none());
    let stored = store.fetch_comments().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].resolved);

    assert_eq!(
        overlay.request_delete(&ids[1]),
        Err(OverlayError::UnknownComment(ids[1].clone()))
    );

    tracker.teardown(&mut page.doc);
}

#[tokio::test]
async fn storage_failures_leave_the_working_set_alone() {
    let (page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);
    let before = overlay.comments().to_vec();

    for request in [
        StoreRequest::Fetch,
        StoreRequest::Delete { id: "a".to_owned() },
        StoreRequest::Resolve { id: "a".to_owned() },
    ] {
        assert!(!overlay.apply(execute(&Offline, request).await));
    }

    overlay.toggle_comment_mode();
    overlay.click(&page.doc, 120.0, 330.0);
    overlay.set_draft_text("lost").unwrap();
    let request = overlay.submit_draft(VIEWPORT).unwrap();
    assert_eq!(execute(&Offline, request).await, StoreOutcome::Created(None));
    assert!(!overlay.apply(StoreOutcome::Created(None)));

    assert_eq!(overlay.comments(), before.as_slice());
}

#[test]
fn deleting_the_comment_under_a_tooltip_or_drag_clears_it() {
    let (_page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0), comment("b", ".hero", 0.0, 0.0)]);

    overlay.toggle_tooltip("a");
    assert!(overlay.apply(StoreOutcome::Deleted { id: "a".to_owned(), ok: true }));
    assert_eq!(overlay.tooltip(), None);

    overlay.pin_pointer_down("b", 0.0, 60.0).unwrap();
    assert!(overlay.apply(StoreOutcome::Deleted { id: "b".to_owned(), ok: true }));
    assert!(overlay.drag().is_none());
    assert!(overlay.comments().is_empty());
}

#[test]
fn duplicate_creations_are_ignored() {
    let (_page, mut overlay, _) = mounted();
    let created = comment("a", "#top", 50.0, 50.0);
    assert!(overlay.apply(StoreOutcome::Created(Some(created.clone()))));
    assert!(!overlay.apply(StoreOutcome::Created(Some(created))));
    assert_eq!(overlay.comments().len(), 1);
}

#[test]
fn outcomes_after_unmount_are_discarded() {
    let (mut page, mut overlay, _) = mounted();
    loaded(&mut overlay, vec![comment("a", "#top", 50.0, 50.0)]);

    overlay.unmount(&mut page.doc);
    assert!(!overlay.is_mounted());
    assert_eq!(page.doc.query_selector("#pinmark-feedback-root").unwrap(), None);

    assert!(!overlay.apply(StoreOutcome::Deleted { id: "a".to_owned(), ok: true }));
    assert!(!overlay.apply(StoreOutcome::Created(Some(comment("b", ".hero", 0.0, 0.0)))));
    assert_eq!(overlay.comments().len(), 1);
}
