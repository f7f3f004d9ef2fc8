//! The reconciliation loop: signal coalescing, teardown and stale anchors.

mod common;

use common::{comment, landing_page};
use pinmark_core::reconcile::{reconcile, FrameScheduler, LoopPhase, PinTracker};
use pinmark_core::types::Comment;
use pretty_assertions::assert_eq;

fn comments() -> Vec<Comment> {
    vec![
        comment("a", "#top", 50.0, 50.0),
        comment("b", ".card.featured", 0.0, 0.0),
        comment("c", "footer", 50.0, 50.0),
    ]
}

#[test]
fn scheduler_keeps_at_most_one_frame() {
    let mut scheduler = FrameScheduler::new();
    let first = scheduler.schedule();
    let second = scheduler.schedule();
    assert!(second > first);
    assert_eq!(scheduler.scheduled(), Some(second));
    assert_eq!(scheduler.cancelled(), 1);

    assert_eq!(scheduler.take_due(), Some(second));
    assert_eq!(scheduler.take_due(), None);
    assert!(!scheduler.cancel());
}

#[test]
fn mount_runs_the_initial_pass() {
    let mut page = landing_page();
    let comments = comments();
    let mut tracker = PinTracker::mount(&mut page.doc, &comments);

    assert_eq!(tracker.passes(), 1);
    assert_eq!(tracker.phase(), LoopPhase::Idle);
    // Window scroll, document scroll, window resize and the body observer.
    assert_eq!(page.doc.listener_count(), 4);

    let positions = tracker.positions();
    assert_eq!(positions.len(), 3);
    assert_eq!((positions[0].absolute_x, positions[0].absolute_y), (400.0, 30.0));
    assert!(positions[0].visible);
    assert_eq!((positions[1].absolute_x, positions[1].absolute_y), (280.0, 280.0));
    assert!(!positions[2].visible, "footer starts below the fold");

    tracker.teardown(&mut page.doc);
}

#[test]
fn a_burst_of_mutations_costs_one_pass() {
    let mut page = landing_page();
    let comments = comments();
    let mut tracker = PinTracker::mount(&mut page.doc, &comments);

    for i in 0..50 {
        page.doc.set_attribute(page.cards[0], "style", &format!("margin-top: {i}px"));
    }
    assert_eq!(tracker.pump(), 50);
    assert_eq!(tracker.phase(), LoopPhase::Scheduled);
    assert_eq!(tracker.scheduler().cancelled(), 49);

    assert!(tracker.on_frame(&page.doc, &comments));
    assert!(!tracker.on_frame(&page.doc, &comments), "nothing left to run");
    assert_eq!(tracker.passes(), 2);

    tracker.teardown(&mut page.doc);
}

#[test]
fn scroll_resize_and_structure_changes_all_schedule() {
    let mut page = landing_page();
    let comments = comments();
    let mut tracker = PinTracker::mount(&mut page.doc, &comments);

    page.doc.scroll_by(0.0, 1000.0);
    page.doc.resize(1024.0, 768.0);
    let banner = page.doc.create_element("aside");
    page.doc.insert_before(page.doc.body(), banner, page.header);
    page.doc.scroll_element(page.grid);
    page.doc.add_class(page.hero, "wide");

    assert!(tracker.pump() >= 5);
    assert!(tracker.on_frame(&page.doc, &comments));
    assert_eq!(tracker.passes(), 2);

    let footer = &tracker.positions()[2];
    assert!(footer.visible, "footer is in view after scrolling");
    assert_eq!(footer.absolute_y, 1460.0 - page.doc.scroll_offset().1 + 50.0);

    tracker.teardown(&mut page.doc);
}

#[test]
fn irrelevant_attributes_are_ignored() {
    let mut page = landing_page();
    let comments = comments();
    let mut tracker = PinTracker::mount(&mut page.doc, &comments);

    page.doc.set_attribute(page.cards[0], "data-track", "impression");
    page.doc.set_attribute(page.cards[0], "aria-label", "card");
    assert_eq!(tracker.pump(), 0);
    assert!(!tracker.on_frame(&page.doc, &comments));
    assert_eq!(tracker.passes(), 1);

    tracker.teardown(&mut page.doc);
}

#[test]
fn teardown_cancels_the_pending_frame_and_unsubscribes() {
    let mut page = landing_page();
    let comments = comments();
    let mut tracker = PinTracker::mount(&mut page.doc, &comments);

    page.doc.scroll_by(0.0, 200.0);
    tracker.pump();
    assert!(tracker.scheduler().scheduled().is_some());

    tracker.teardown(&mut page.doc);
    assert_eq!(tracker.phase(), LoopPhase::TornDown);
    assert_eq!(page.doc.listener_count(), 0);
    assert!(tracker.scheduler().scheduled().is_none());

    assert!(!tracker.on_frame(&page.doc, &comments));
    page.doc.scroll_by(0.0, 200.0);
    tracker.trigger();
    tracker.refresh(&page.doc, &comments);
    assert!(!tracker.on_frame(&page.doc, &comments));
    assert_eq!(tracker.passes(), 1);

    // Idempotent.
    tracker.teardown(&mut page.doc);
    assert_eq!(page.doc.listener_count(), 0);
}

#[test]
fn refresh_recomputes_immediately_for_a_new_working_set() {
    let mut page = landing_page();
    let mut comments = comments();
    let mut tracker = PinTracker::mount(&mut page.doc, &comments);

    page.doc.scroll_by(0.0, 10.0);
    tracker.pump();
    comments.push(comment("d", ".hero", 0.0, 0.0));
    tracker.refresh(&page.doc, &comments);

    assert_eq!(tracker.positions().len(), 4);
    assert_eq!(tracker.passes(), 2);
    assert!(!tracker.on_frame(&page.doc, &comments), "refresh absorbs the pending frame");

    tracker.teardown(&mut page.doc);
}

#[test]
fn stale_locators_are_hidden_without_affecting_the_rest() {
    let mut page = landing_page();
    let comments = vec![
        comment("a", "#top", 50.0, 50.0),
        comment("gone", ".card.featured", 50.0, 50.0),
        comment("bad", "div:hover", 50.0, 50.0),
        comment("c", ".hero", 50.0, 50.0),
    ];
    page.doc.remove(page.cards[1]);

    let positions = reconcile(&page.doc, &comments);
    let ids: Vec<&str> = positions.iter().map(|p| p.comment.id.as_str()).collect();
    assert_eq!(ids, ["a", "gone", "bad", "c"]);

    for stale in &positions[1..3] {
        assert!(!stale.visible);
        assert_eq!((stale.absolute_x, stale.absolute_y), (0.0, 0.0));
    }
    assert!(positions[0].visible);
    assert!(positions[3].visible);
    assert_eq!((positions[3].absolute_x, positions[3].absolute_y), (400.0, 160.0));
}
