//! Shared data types for pinned feedback comments.
//!
//! Everything that crosses the storage boundary derives `Serialize`/`Deserialize`
//! with camelCase field names so the same structs read and write the REST wire
//! format. The positioned and transient types never leave the process.

use serde::{Deserialize, Serialize};

/// The person who wrote a comment or reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    /// URL of the author's avatar image.
    pub avatar: String,
}

/// A reply within a comment's thread.
///
/// Replies are written by other collaborators; the overlay only displays them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub content: String,
    pub author: Author,
    pub created_at: String,
}

/// Viewport size recorded when a comment's position was last written.
///
/// Advisory only: nothing re-scales positions by it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// A comment pinned to an element of the page.
///
/// `locator` is the selector produced by [`crate::locator::synthesize`]. It may
/// stop matching anything after the page changes; that is a normal state and the
/// pin is simply not rendered until it matches again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(rename = "selector")]
    pub locator: String,
    /// Horizontal anchor position within the element box, 0..=100.
    pub x_percentage: f64,
    /// Vertical anchor position within the element box, 0..=100.
    pub y_percentage: f64,
    pub content: String,
    pub author: Author,
    /// RFC 3339 creation time, assigned by storage.
    pub created_at: String,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub thread: Vec<Reply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl Comment {
    /// Re-points the comment at a new anchor. Locator, percentages and viewport
    /// always change together.
    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.locator = anchor.locator;
        self.x_percentage = clamp_percentage(anchor.x_percentage);
        self.y_percentage = clamp_percentage(anchor.y_percentage);
        self.viewport = anchor.viewport;
    }

    /// The comment's current anchor, for snapshotting before an optimistic update.
    pub fn anchor(&self) -> Anchor {
        Anchor {
            locator: self.locator.clone(),
            x_percentage: self.x_percentage,
            y_percentage: self.y_percentage,
            viewport: self.viewport,
        }
    }
}

/// Locator plus relative coordinates: everything needed to place a pin.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub locator: String,
    pub x_percentage: f64,
    pub y_percentage: f64,
    pub viewport: Option<Viewport>,
}

/// Request body for creating a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(rename = "selector")]
    pub locator: String,
    pub x_percentage: f64,
    pub y_percentage: f64,
    pub content: String,
    pub viewport: Viewport,
}

/// Request body for re-pointing an existing comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    #[serde(rename = "selector")]
    pub locator: String,
    pub x_percentage: f64,
    pub y_percentage: f64,
    pub viewport: Viewport,
}

/// A comment together with where its pin lands this frame.
///
/// Rebuilt wholesale on every reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedComment {
    pub comment: Comment,
    /// Viewport x of the anchor point.
    pub absolute_x: f64,
    /// Viewport y of the anchor point.
    pub absolute_y: f64,
    /// Whether the anchor element overlaps the viewport at all.
    pub visible: bool,
}

/// A comment being written: the user clicked to place it but has not submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingComment {
    pub locator: String,
    pub x_percentage: f64,
    pub y_percentage: f64,
    pub click_x: f64,
    pub click_y: f64,
    /// Text typed into the draft modal so far.
    pub text: String,
}

/// A pin being dragged to a new anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub comment_id: String,
    pub current_x: f64,
    pub current_y: f64,
}

/// An axis-aligned box. Used both for layout boxes (document coordinates) and
/// client rects (viewport coordinates).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Returns `true` when `(x, y)` lies inside the box (right/bottom edges exclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }

    /// Returns the same box moved by `(-dx, -dy)`.
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self { left: self.left - dx, top: self.top - dy, ..*self }
    }
}

/// Clamps a percentage into 0..=100, mapping non-finite input to 0.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
