mod common;

use common::landing_page;
use pinmark_core::position::{anchor_in_rect, relative_to_element, to_absolute, to_relative, AnchorPoint};
use pinmark_core::types::Rect;
use pretty_assertions::assert_eq;

#[test]
fn relative_coordinates_are_percentages_of_the_rect() {
    let rect = Rect::new(50.0, 100.0, 200.0, 100.0);
    assert_eq!(to_relative(rect, 150.0, 150.0), (50.0, 50.0));
    assert_eq!(to_relative(rect, 50.0, 100.0), (0.0, 0.0));
    assert_eq!(to_relative(rect, 100.0, 175.0), (25.0, 75.0));
}

#[test]
fn points_outside_the_rect_are_clamped() {
    let rect = Rect::new(50.0, 100.0, 200.0, 100.0);
    assert_eq!(to_relative(rect, 0.0, 500.0), (0.0, 100.0));
    assert_eq!(to_relative(rect, 900.0, -40.0), (100.0, 0.0));
}

#[test]
fn zero_sized_axes_yield_zero() {
    assert_eq!(to_relative(Rect::new(10.0, 10.0, 0.0, 50.0), 10.0, 35.0), (0.0, 50.0));
    assert_eq!(to_relative(Rect::new(10.0, 10.0, 0.0, 0.0), 99.0, 99.0), (0.0, 0.0));
}

#[test]
fn absolute_position_from_percentages() {
    let point = anchor_in_rect(Rect::new(50.0, 100.0, 200.0, 100.0), 50.0, 50.0, 800.0, 600.0);
    assert_eq!(point, AnchorPoint { x: 150.0, y: 150.0, visible: true });
}

#[test]
fn visibility_requires_any_overlap_with_the_viewport() {
    // Fully above the viewport.
    assert!(!anchor_in_rect(Rect::new(0.0, -120.0, 100.0, 120.0), 50.0, 50.0, 800.0, 600.0).visible);
    // Starts exactly at the bottom edge.
    assert!(!anchor_in_rect(Rect::new(0.0, 600.0, 100.0, 50.0), 50.0, 50.0, 800.0, 600.0).visible);
    // Partially above: still visible even though the anchor point is off-screen.
    let partial = anchor_in_rect(Rect::new(0.0, -90.0, 100.0, 100.0), 50.0, 10.0, 800.0, 600.0);
    assert!(partial.visible);
    assert_eq!(partial.y, -80.0);
    // Off to the right.
    assert!(!anchor_in_rect(Rect::new(800.0, 0.0, 100.0, 100.0), 0.0, 0.0, 800.0, 600.0).visible);
}

#[test]
fn relative_and_absolute_agree_on_live_elements() {
    let page = landing_page();
    let card = page.cards[0];
    let (x, y) = relative_to_element(&page.doc, card, 120.0, 330.0);
    assert_eq!((x, y), (50.0, 50.0));

    let point = to_absolute(&page.doc, ".card", x, y).unwrap();
    assert_eq!(point, AnchorPoint { x: 120.0, y: 330.0, visible: true });
}

#[test]
fn scrolling_moves_anchors_and_their_visibility() {
    let mut page = landing_page();
    page.doc.scroll_to(0.0, 500.0);

    let header = to_absolute(&page.doc, "#top", 10.0, 50.0).unwrap();
    assert_eq!(header.y, -470.0);
    assert!(!header.visible);

    let footer = to_absolute(&page.doc, "footer", 0.0, 0.0).unwrap();
    assert_eq!(footer.y, 960.0);
    assert!(!footer.visible);

    let dup = to_absolute(&page.doc, "main.content > div:nth-of-type(3)", 0.0, 0.0).unwrap();
    assert_eq!(dup.y, 200.0);
    assert!(dup.visible);
}

#[test]
fn unresolvable_locators_have_no_position() {
    let page = landing_page();
    assert_eq!(to_absolute(&page.doc, ".does-not-exist", 50.0, 50.0), None);
    assert_eq!(to_absolute(&page.doc, "div[", 50.0, 50.0), None);
    assert_eq!(to_absolute(&page.doc, "#1st", 50.0, 50.0), None);
}
