//! Core of the pinmark feedback overlay.
//!
//! Pins comments to elements of a page and keeps them attached while the page
//! scrolls, resizes and mutates:
//!
//! - [`dom`] — the page model: elements, layout boxes, viewport, hit-testing,
//!   listeners and mutation observers.
//! - [`selector`] — the selector subset locators are written in.
//! - [`locator`] — turns a clicked element into a re-resolvable locator.
//! - [`position`] — viewport point ⇄ element-relative percentages.
//! - [`reconcile`] — the frame-coalesced loop that re-derives pin positions.
//! - [`overlay`] — the interaction state machine driving all of the above.
//! - [`store`] — the comment storage contract with SQLite and HTTP backends.

pub mod dom;
pub mod locator;
pub mod overlay;
pub mod position;
pub mod reconcile;
pub mod selector;
pub mod store;
pub mod types;
