//! Shared fixtures for pinmark-core integration tests.

#![allow(dead_code)]

use pinmark_core::dom::{Document, NodeId};
use pinmark_core::types::{Author, Comment, Rect, Viewport};

pub const VIEWPORT: Viewport = Viewport { width: 800.0, height: 600.0 };

/// Handles to the interesting elements of [`landing_page`].
pub struct Page {
    pub doc: Document,
    pub header: NodeId,
    pub links: Vec<NodeId>,
    pub hero: NodeId,
    pub grid: NodeId,
    pub cards: Vec<NodeId>,
    pub items: Vec<NodeId>,
    pub dups: Vec<NodeId>,
    pub footer: NodeId,
}

fn child(doc: &mut Document, parent: NodeId, tag: &str, class: Option<&str>, rect: Rect) -> NodeId {
    let node = doc.create_element(tag);
    if let Some(class) = class {
        doc.set_attribute(node, "class", class);
    }
    doc.set_layout(node, rect);
    doc.append_child(parent, node);
    node
}

/// A small landing page, 800x600 viewport, 2000px tall.
///
/// ```text
/// body
/// ├── header#top            nav > a.link ×3
/// ├── main.content
/// │   ├── section.hero      h1
/// │   ├── div.grid          div.card, div.card.featured, div.card (each h2 + p)
/// │   ├── ul.list           li ×3
/// │   ├── div#dup
/// │   └── div#dup
/// └── footer
/// ```
pub fn landing_page() -> Page {
    let mut doc = Document::new(VIEWPORT);
    let body = doc.body();
    doc.set_layout(doc.html(), Rect::new(0.0, 0.0, 800.0, 2000.0));
    doc.set_layout(body, Rect::new(0.0, 0.0, 800.0, 2000.0));

    let header = child(&mut doc, body, "header", None, Rect::new(0.0, 0.0, 800.0, 60.0));
    doc.set_attribute(header, "id", "top");
    let nav = child(&mut doc, header, "nav", None, Rect::new(400.0, 10.0, 380.0, 40.0));
    let links = (0..3)
        .map(|i| {
            child(&mut doc, nav, "a", Some("link"), Rect::new(400.0 + 120.0 * i as f64, 10.0, 100.0, 40.0))
        })
        .collect();

    let main = child(&mut doc, body, "main", Some("content"), Rect::new(0.0, 60.0, 800.0, 1400.0));
    let hero = child(&mut doc, main, "section", Some("hero"), Rect::new(0.0, 60.0, 800.0, 200.0));
    child(&mut doc, hero, "h1", None, Rect::new(40.0, 100.0, 500.0, 60.0));

    let grid = child(&mut doc, main, "div", Some("grid"), Rect::new(0.0, 260.0, 800.0, 160.0));
    let cards: Vec<NodeId> = ["card", "card featured", "card"]
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let left = 20.0 + 260.0 * i as f64;
            let card = child(&mut doc, grid, "div", Some(class), Rect::new(left, 280.0, 200.0, 100.0));
            child(&mut doc, card, "h2", None, Rect::new(left + 10.0, 290.0, 180.0, 30.0));
            child(&mut doc, card, "p", None, Rect::new(left + 10.0, 335.0, 180.0, 35.0));
            card
        })
        .collect();

    let list = child(&mut doc, main, "ul", Some("list"), Rect::new(0.0, 440.0, 800.0, 120.0));
    let items = (0..3)
        .map(|i| child(&mut doc, list, "li", None, Rect::new(20.0, 440.0 + 40.0 * i as f64, 760.0, 40.0)))
        .collect();

    let dups = (0..2)
        .map(|i| {
            let node = child(&mut doc, main, "div", None, Rect::new(0.0, 600.0 + 100.0 * i as f64, 800.0, 100.0));
            doc.set_attribute(node, "id", "dup");
            node
        })
        .collect();

    let footer = child(&mut doc, body, "footer", None, Rect::new(0.0, 1460.0, 800.0, 100.0));

    Page { doc, header, links, hero, grid, cards, items, dups, footer }
}

pub fn author() -> Author {
    Author {
        id: "u-1".to_owned(),
        name: "Dana Reviewer".to_owned(),
        avatar: "https://example.com/avatar.png".to_owned(),
    }
}

/// A stored comment anchored at `locator`.
pub fn comment(id: &str, locator: &str, x: f64, y: f64) -> Comment {
    Comment {
        id: id.to_owned(),
        locator: locator.to_owned(),
        x_percentage: x,
        y_percentage: y,
        content: format!("comment {id}"),
        author: author(),
        created_at: "2026-01-01T00:00:00.000Z".to_owned(),
        resolved: false,
        thread: Vec::new(),
        viewport: Some(VIEWPORT),
    }
}

pub fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("comments.db");
    path.to_string_lossy().to_string()
}
