//! Mapping between viewport points and element-relative percentages.
//!
//! Both directions are pure functions of the document's current layout.

use crate::dom::{Document, NodeId};
use crate::types::{clamp_percentage, Rect};

/// Where a stored anchor lands in the viewport right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
    /// Whether the anchor element overlaps the viewport.
    pub visible: bool,
}

/// Converts a viewport point into percentages of `rect`, clamped to 0..=100.
///
/// A zero-sized (or non-finite) axis yields 0 for that axis.
pub fn to_relative(rect: Rect, client_x: f64, client_y: f64) -> (f64, f64) {
    (
        axis_percentage(client_x - rect.left, rect.width),
        axis_percentage(client_y - rect.top, rect.height),
    )
}

fn axis_percentage(offset: f64, extent: f64) -> f64 {
    if extent.is_finite() && extent > 0.0 {
        clamp_percentage(offset / extent * 100.0)
    } else {
        0.0
    }
}

/// [`to_relative`] against `element`'s current client rect.
pub fn relative_to_element(doc: &Document, element: NodeId, client_x: f64, client_y: f64) -> (f64, f64) {
    to_relative(doc.bounding_client_rect(element), client_x, client_y)
}

/// Resolves `locator` and maps the stored percentages back to a viewport point.
///
/// Returns `None` when the locator matches nothing or does not parse; the pin
/// is then simply not renderable this frame.
pub fn to_absolute(doc: &Document, locator: &str, x_pct: f64, y_pct: f64) -> Option<AnchorPoint> {
    let element = doc.query_selector(locator).ok().flatten()?;
    let rect = doc.bounding_client_rect(element);
    Some(anchor_in_rect(rect, x_pct, y_pct, doc.viewport().width, doc.viewport().height))
}

/// Computes the anchor point inside `rect` and its any-overlap visibility.
pub fn anchor_in_rect(
    rect: Rect,
    x_pct: f64,
    y_pct: f64,
    viewport_width: f64,
    viewport_height: f64,
) -> AnchorPoint {
    let visible = rect.top < viewport_height
        && rect.bottom() > 0.0
        && rect.left < viewport_width
        && rect.right() > 0.0;
    AnchorPoint {
        x: rect.left + x_pct / 100.0 * rect.width,
        y: rect.top + y_pct / 100.0 * rect.height,
        visible,
    }
}
