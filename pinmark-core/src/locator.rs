//! Locator synthesis: turning a clicked element into a selector that finds it again.
//!
//! Strategies are tried from most to least robust, first success wins:
//!
//! 1. a document-unique `id` → `#id`
//! 2. a document-unique combined class list → `.a.b`
//! 3. a structural path of `tag.class` segments, positional only where same-tag
//!    siblings make it necessary, stopping early at an ancestor with a unique id
//! 4. a strict `tag:nth-child(n)` path from `body`
//!
//! Strategy 4 always resolves back to an element under `body` while the tree is
//! unchanged, so synthesis never fails; it only degrades. Elements outside
//! `body` (detached, or direct children of `html`) get [`ROOT_LOCATOR`].

use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::selector::css_escape;

/// Locator used for the document roots.
pub const ROOT_LOCATOR: &str = "body";

/// Classes kept per path segment in the structural strategy.
const MAX_SEGMENT_CLASSES: usize = 2;

/// Builds a locator that resolves back to `element` in the current document.
pub fn synthesize(doc: &Document, element: NodeId) -> String {
    if doc.is_root(element) {
        return ROOT_LOCATOR.to_owned();
    }

    if let Some(locator) = unique_id_selector(doc, element) {
        return locator;
    }

    if let Some(locator) = class_selector(doc, element) {
        if matches_only(doc, &locator, element) {
            return locator;
        }
    }

    let path = structural_path(doc, element);
    if resolves_to(doc, &path, element) {
        return path;
    }

    debug!(path = %path, "structural locator ambiguous, using positional path");
    positional_path(doc, element)
}

/// Returns `true` if `locator` currently resolves to `element`.
pub fn resolves_to(doc: &Document, locator: &str, element: NodeId) -> bool {
    matches!(doc.query_selector(locator), Ok(Some(found)) if found == element)
}

fn matches_only(doc: &Document, locator: &str, element: NodeId) -> bool {
    matches!(doc.query_selector_all(locator).as_deref(), Ok([only]) if *only == element)
}

fn unique_id_selector(doc: &Document, element: NodeId) -> Option<String> {
    let locator = format!("#{}", css_escape(doc.id_attr(element)?));
    matches_only(doc, &locator, element).then_some(locator)
}

fn class_selector(doc: &Document, element: NodeId) -> Option<String> {
    let locator: String = doc
        .classes(element)
        .map(|class| format!(".{}", css_escape(class)))
        .collect();
    (!locator.is_empty()).then_some(locator)
}

fn structural_path(doc: &Document, element: NodeId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(element);

    while let Some(node) = current.filter(|&n| !doc.is_root(n)) {
        if let Some(id_locator) = unique_id_selector(doc, node) {
            segments.push(id_locator);
            break;
        }

        let mut segment = doc.tag(node).to_owned();
        for class in doc.classes(node).take(MAX_SEGMENT_CLASSES) {
            segment.push('.');
            segment.push_str(&css_escape(class));
        }
        if doc.same_tag_siblings(node) > 1 {
            if let Some(index) = doc.type_index(node) {
                segment.push_str(&format!(":nth-of-type({index})"));
            }
        }
        segments.push(segment);
        current = doc.parent(node);
    }

    segments.reverse();
    segments.join(" > ")
}

fn positional_path(doc: &Document, element: NodeId) -> String {
    let mut segments = Vec::new();
    let mut current = element;

    while current != doc.body() {
        let (Some(parent), Some(index)) = (doc.parent(current), doc.child_index(current)) else {
            return ROOT_LOCATOR.to_owned();
        };
        segments.push(format!("{}:nth-child({index})", doc.tag(current)));
        current = parent;
    }

    segments.push(ROOT_LOCATOR.to_owned());
    segments.reverse();
    segments.join(" > ")
}
