//! The demo landing page the overlay is mounted on.
//!
//! The page is a [`Document`] laid out in terminal cells: one unit is one cell.
//! Layout is a tiny block/row pass:
//!
//! - an element without children is one line of text;
//! - a container draws a one-cell border around its children, which are stacked
//!   vertically, or split horizontally with a one-cell gap when the element has
//!   `data-layout="row"`;
//! - a container with the `highlighted` class gets two extra rows at the bottom,
//!   so toggling the class moves everything below it.
//!
//! Mutations (`toggle_banner`, `shuffle_cards`, `toggle_highlight`) change the
//! tree or class attributes, which notifies the overlay's mutation observer, and
//! then relayout immediately, the way a browser reflows before the next frame.

use pinmark_core::dom::{Document, NodeId};
use pinmark_core::types::{Rect, Viewport};

/// Element ids and handles the harness manipulates.
pub struct DemoPage {
    banner: NodeId,
    header: NodeId,
    grid: NodeId,
    cards: Vec<NodeId>,
    overlay_root: Option<NodeId>,
    fab: Option<NodeId>,
}

/// Size of the floating comment button, in cells.
const FAB_WIDTH: f64 = 5.0;
const FAB_HEIGHT: f64 = 3.0;

struct Builder<'a> {
    doc: &'a mut Document,
}

impl Builder<'_> {
    fn el(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId {
        let node = self.doc.create_element(tag);
        if !class.is_empty() {
            self.doc.set_attribute(node, "class", class);
        }
        self.doc.append_child(parent, node);
        node
    }

    fn row(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId {
        let node = self.el(parent, tag, class);
        self.doc.set_attribute(node, "data-layout", "row");
        node
    }

    fn text(&mut self, parent: NodeId, tag: &str, class: &str, text: &str) -> NodeId {
        let node = self.el(parent, tag, class);
        self.doc.set_text(node, text);
        node
    }
}

impl DemoPage {
    /// Builds the landing page into a fresh document sized to `viewport`.
    pub fn build(viewport: Viewport) -> (Document, DemoPage) {
        let mut doc = Document::new(viewport);
        let body = doc.body();
        let mut b = Builder { doc: &mut doc };

        let banner = b.text(body, "div", "banner", "★ Spring sale: 20% off every plan ★");

        let header = b.row(body, "header", "");
        b.doc.set_attribute(header, "id", "site-header");
        b.text(header, "div", "logo", "◆ Acme Feedback");
        let nav = b.row(header, "nav", "links");
        for label in ["Product", "Pricing", "Docs"] {
            b.text(nav, "a", "nav-link", label);
        }

        let hero = b.el(body, "section", "hero");
        b.text(hero, "h1", "", "Ship feedback, not screenshots");
        b.text(hero, "p", "lead", "Pin comments to any element of your running app.");
        b.text(hero, "a", "cta", "Get started →");

        let features = b.el(body, "section", "");
        b.doc.set_attribute(features, "id", "features");
        b.text(features, "h2", "", "Features");
        let grid = b.row(features, "div", "grid");
        let cards = [
            ("Anchored", "Pins follow their element."),
            ("Live", "Scroll, resize, reflow."),
            ("Shared", "One store for the team."),
        ]
        .into_iter()
        .map(|(title, blurb)| {
            let card = b.el(grid, "div", "card");
            b.text(card, "h3", "", title);
            b.text(card, "p", "", blurb);
            card
        })
        .collect();

        let pricing = b.el(body, "section", "pricing");
        b.text(pricing, "h2", "", "Pricing");
        let plans = b.row(pricing, "div", "plans");
        for (name, price, class) in [
            ("Hobby", "$0", "plan"),
            ("Team", "$12/seat", "plan popular"),
            ("Enterprise", "Talk to us", "plan"),
        ] {
            let plan = b.el(plans, "div", class);
            b.text(plan, "h3", "", name);
            b.text(plan, "p", "price", price);
        }

        let footer = b.el(body, "footer", "");
        b.text(footer, "p", "", "© 2026 Acme Inc. · Privacy · Terms");

        let page = DemoPage { banner, header, grid, cards, overlay_root: None, fab: None };
        page.relayout(&mut doc);
        (doc, page)
    }

    /// Registers the overlay root and gives it a floating comment button.
    ///
    /// Returns the button, which the host treats as the comment-mode toggle.
    pub fn attach_overlay(&mut self, doc: &mut Document, root: NodeId) -> NodeId {
        let fab = doc.create_element("button");
        doc.set_attribute(fab, "class", "fab");
        doc.set_text(fab, "✎");
        doc.append_child(root, fab);
        self.overlay_root = Some(root);
        self.fab = Some(fab);
        self.place_fab(doc);
        fab
    }

    pub fn fab(&self) -> Option<NodeId> {
        self.fab
    }

    pub fn cards(&self) -> &[NodeId] {
        &self.cards
    }

    /// Pins the floating button to the viewport's bottom-right corner.
    ///
    /// Layout boxes live in document coordinates, so this runs every frame to
    /// follow the scroll offset.
    pub fn place_fab(&self, doc: &mut Document) {
        let Some(fab) = self.fab else {
            return;
        };
        let viewport = doc.viewport();
        let (scroll_x, scroll_y) = doc.scroll_offset();
        doc.set_layout(
            fab,
            Rect::new(
                (viewport.width - FAB_WIDTH - 1.0).max(0.0) + scroll_x,
                (viewport.height - FAB_HEIGHT).max(0.0) + scroll_y,
                FAB_WIDTH,
                FAB_HEIGHT,
            ),
        );
    }

    /// Lays out the whole page for the current viewport width.
    pub fn relayout(&self, doc: &mut Document) {
        let width = doc.viewport().width;
        let body = doc.body();
        let mut top = 0.0;
        for child in doc.children(body).to_vec() {
            if Some(child) == self.overlay_root {
                continue;
            }
            top += layout_node(doc, child, 0.0, top, width);
        }
        doc.set_layout(doc.html(), Rect::new(0.0, 0.0, width, top));
        doc.set_layout(body, Rect::new(0.0, 0.0, width, top));
        self.place_fab(doc);
        // Re-clamp the scroll offset to the new content height.
        doc.scroll_by(0.0, 0.0);
    }

    /// Resizes the viewport and reflows.
    pub fn resize(&self, doc: &mut Document, width: f64, height: f64) {
        doc.resize(width, height);
        self.relayout(doc);
    }

    /// Shows or hides the promo banner above the header. Returns whether it is shown.
    pub fn toggle_banner(&self, doc: &mut Document) -> bool {
        let shown = if doc.is_connected(self.banner) {
            doc.remove(self.banner);
            false
        } else {
            doc.insert_before(doc.body(), self.banner, self.header);
            true
        };
        self.relayout(doc);
        shown
    }

    /// Moves the last feature card to the front.
    pub fn shuffle_cards(&mut self, doc: &mut Document) {
        if let (Some(&last), Some(&first)) = (self.cards.last(), self.cards.first()) {
            doc.insert_before(self.grid, last, first);
            self.cards.rotate_right(1);
        }
        self.relayout(doc);
    }

    /// Toggles the `highlighted` class on the first feature card. Returns whether
    /// it is now set.
    pub fn toggle_highlight(&self, doc: &mut Document) -> bool {
        let Some(&card) = self.cards.first() else {
            return false;
        };
        let on = !doc.has_class(card, "highlighted");
        if on {
            doc.add_class(card, "highlighted");
        } else {
            doc.remove_class(card, "highlighted");
        }
        self.relayout(doc);
        on
    }
}

/// Lays out `node` at `(left, top)` with the given width and returns its height.
fn layout_node(doc: &mut Document, node: NodeId, left: f64, top: f64, width: f64) -> f64 {
    if doc.attribute(node, "hidden").is_some() {
        doc.set_layout(node, Rect::new(left, top, width, 0.0));
        return 0.0;
    }

    let children = doc.children(node).to_vec();
    if children.is_empty() {
        doc.set_layout(node, Rect::new(left, top, width, 1.0));
        return 1.0;
    }

    let inner_left = left + 1.0;
    let inner_width = (width - 2.0).max(0.0);
    let content = if doc.attribute(node, "data-layout") == Some("row") {
        let count = children.len() as f64;
        let child_width = ((inner_width - (count - 1.0)) / count).floor().max(0.0);
        children
            .iter()
            .enumerate()
            .map(|(i, &child)| {
                let child_left = inner_left + i as f64 * (child_width + 1.0);
                layout_node(doc, child, child_left, top + 1.0, child_width)
            })
            .fold(0.0, f64::max)
    } else {
        let mut y = top + 1.0;
        for child in children {
            y += layout_node(doc, child, inner_left, y, inner_width);
        }
        y - top - 1.0
    };

    let extra = if doc.has_class(node, "highlighted") { 2.0 } else { 0.0 };
    let height = content + 2.0 + extra;
    doc.set_layout(node, Rect::new(left, top, width, height));
    height
}
