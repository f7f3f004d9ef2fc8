//! In-memory document model the overlay runs against.
//!
//! A `Document` is an arena of elements rooted at `html > body`, each with a tag,
//! attributes, an optional text label and an optional layout box in document
//! coordinates. On top of the tree it models the pieces of a browser page the
//! overlay depends on:
//!
//! - a viewport with a scroll offset, so layout boxes map to client rects;
//! - hit-testing (`element_from_point`) with an exclusion predicate;
//! - selector queries (`query_selector`, `query_selector_all`);
//! - `scroll`/`resize` event listeners and subtree mutation observers.
//!
//! Listeners deliver `PageSignal`s over `crossbeam_channel` senders supplied by
//! the subscriber, so one subscriber can multiplex several registrations onto a
//! single receiver. Send errors are ignored: a subscriber that dropped its
//! receiver without unsubscribing simply stops hearing about changes.

use crossbeam_channel::Sender;

use crate::selector::{Selector, SelectorError};
use crate::types::{Rect, Viewport};

/// Handle to an element in a [`Document`]. Handles stay valid after removal;
/// a removed element is merely disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Handle returned by listener and observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Object an event listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenTarget {
    Window,
    Document,
}

/// Event types the document dispatches to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Scroll,
    Resize,
}

/// Which mutations an observer wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOptions {
    pub child_list: bool,
    pub attributes: bool,
    /// Restricts attribute records to these names. Implies `attributes`.
    pub attribute_filter: Option<Vec<String>>,
    pub subtree: bool,
}

impl MutationOptions {
    fn accepts_attribute(&self, name: &str) -> bool {
        match &self.attribute_filter {
            Some(filter) => filter.iter().any(|allowed| allowed == name),
            None => self.attributes,
        }
    }
}

/// A change observed in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were added to or removed from `target`, or its text changed.
    ChildList { target: NodeId },
    /// Attribute `name` of `target` was set or removed.
    Attribute { target: NodeId, name: String },
}

/// A notification delivered to listeners and observers.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSignal {
    /// Something scrolled. `origin` is `None` for the document itself.
    Scroll { origin: Option<NodeId> },
    Resize { width: f64, height: f64 },
    Mutation(MutationRecord),
}

enum Registration {
    Event { target: ListenTarget, kind: EventKind, capture: bool },
    Observer { root: NodeId, options: MutationOptions },
}

struct Listener {
    id: ListenerId,
    registration: Registration,
    tx: Sender<PageSignal>,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Option<Rect>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            text: None,
            parent: None,
            children: Vec::new(),
            layout: None,
        }
    }
}

/// An element tree with layout, scrolling, queries and change notification.
pub struct Document {
    nodes: Vec<Node>,
    html: NodeId,
    body: NodeId,
    viewport: Viewport,
    scroll_x: f64,
    scroll_y: f64,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl Document {
    /// Creates a document containing only `html > body`.
    pub fn new(viewport: Viewport) -> Self {
        let mut nodes = vec![Node::new("html"), Node::new("body")];
        nodes[0].children.push(NodeId(1));
        nodes[1].parent = Some(NodeId(0));
        Self {
            nodes,
            html: NodeId(0),
            body: NodeId(1),
            viewport,
            scroll_x: 0.0,
            scroll_y: 0.0,
            listeners: Vec::new(),
            next_listener: 1,
        }
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Returns `true` for the `html` and `body` roots.
    pub fn is_root(&self, node: NodeId) -> bool {
        node == self.html || node == self.body
    }

    // -----------------------------------------------------------------------
    // Tree construction and mutation
    // -----------------------------------------------------------------------

    /// Creates a detached element. Attach it with [`Document::append_child`].
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Appends `child` as the last child of `parent`, detaching it first if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.notify(MutationRecord::ChildList { target: parent });
    }

    /// Inserts `child` into `parent` before `reference`, or appends when
    /// `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings.iter().position(|&c| c == reference).unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
        self.notify(MutationRecord::ChildList { target: parent });
    }

    /// Detaches `node` (and its subtree) from the document. The roots cannot be removed.
    pub fn remove(&mut self, node: NodeId) {
        if self.is_root(node) {
            return;
        }
        if let Some(parent) = self.detach(node) {
            self.notify(MutationRecord::ChildList { target: parent });
        }
    }

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent.take()?;
        self.nodes[parent.0].children.retain(|&c| c != node);
        Some(parent)
    }

    /// Sets attribute `name` on `node`, replacing any previous value.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let attrs = &mut self.nodes[node.0].attrs;
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => attrs.push((name.to_owned(), value.to_owned())),
        }
        self.notify(MutationRecord::Attribute { target: node, name: name.to_owned() });
    }

    /// Removes attribute `name` from `node` if present.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let attrs = &mut self.nodes[node.0].attrs;
        let before = attrs.len();
        attrs.retain(|(n, _)| n != name);
        if attrs.len() != before {
            self.notify(MutationRecord::Attribute { target: node, name: name.to_owned() });
        }
    }

    /// Adds `class` to the element's class list if not already present.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let mut classes: Vec<&str> = self.classes(node).collect();
        classes.push(class);
        let value = classes.join(" ");
        self.set_attribute(node, "class", &value);
    }

    /// Removes `class` from the element's class list if present.
    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let value = self
            .classes(node)
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &value);
    }

    /// Sets the element's text label.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.nodes[node.0].text = Some(text.to_owned());
        self.notify(MutationRecord::ChildList { target: node });
    }

    // -----------------------------------------------------------------------
    // Tree inspection
    // -----------------------------------------------------------------------

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0]
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The element's `id` attribute, or `None` when absent or empty.
    pub fn id_attr(&self, node: NodeId) -> Option<&str> {
        self.attribute(node, "id").filter(|id| !id.is_empty())
    }

    /// The element's class list in attribute order.
    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(node, "class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].text.as_deref()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// 1-based position of `node` among all its parent's children.
    pub fn child_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node).map(|i| i + 1)
    }

    /// 1-based position of `node` among its parent's children with the same tag.
    pub fn type_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        let tag = self.tag(node);
        self.children(parent)
            .iter()
            .filter(|&&c| self.tag(c) == tag)
            .position(|&c| c == node)
            .map(|i| i + 1)
    }

    /// Number of children of `node`'s parent sharing `node`'s tag (including itself).
    pub fn same_tag_siblings(&self, node: NodeId) -> usize {
        match self.parent(node) {
            Some(parent) => {
                let tag = self.tag(node);
                self.children(parent).iter().filter(|&&c| self.tag(c) == tag).count()
            }
            None => 1,
        }
    }

    /// Returns `true` when `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Returns `true` when `node` is attached under the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.html, node)
    }

    /// Connected elements in document (pre-)order, starting at `html`.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.html];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        if self.attribute(node, "hidden").is_some() {
            return true;
        }
        let style: String = self
            .attribute(node, "style")
            .unwrap_or("")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        style.contains("display:none") || style.contains("visibility:hidden")
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All connected elements matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] when `selector` does not parse.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let parsed = Selector::parse(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .filter(|&node| parsed.matches(self, node))
            .collect())
    }

    /// The first connected element matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] when `selector` does not parse.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let parsed = Selector::parse(selector)?;
        Ok(self.elements().into_iter().find(|&node| parsed.matches(self, node)))
    }

    // -----------------------------------------------------------------------
    // Layout, viewport and hit-testing
    // -----------------------------------------------------------------------

    /// Stores the element's layout box in document coordinates.
    ///
    /// Layout writes are not mutations and notify nobody.
    pub fn set_layout(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node.0].layout = Some(rect);
    }

    pub fn layout(&self, node: NodeId) -> Option<Rect> {
        self.nodes[node.0].layout
    }

    /// The element's box relative to the viewport. Elements without layout
    /// report an all-zero rect.
    pub fn bounding_client_rect(&self, node: NodeId) -> Rect {
        match self.layout(node) {
            Some(rect) => rect.shifted(self.scroll_x, self.scroll_y),
            None => Rect::default(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_offset(&self) -> (f64, f64) {
        (self.scroll_x, self.scroll_y)
    }

    /// Largest vertical scroll offset: content height minus viewport height.
    pub fn max_scroll_y(&self) -> f64 {
        let content = self
            .elements()
            .into_iter()
            .filter_map(|n| self.layout(n))
            .map(|r| r.bottom())
            .fold(0.0, f64::max);
        (content - self.viewport.height).max(0.0)
    }

    /// Resizes the viewport and dispatches `resize` to window listeners.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = Viewport { width, height };
        self.scroll_y = self.scroll_y.min(self.max_scroll_y());
        self.dispatch(EventKind::Resize, None, PageSignal::Resize { width, height });
    }

    /// Scrolls the document, clamped to the scrollable extent, and dispatches
    /// `scroll` when the offset actually changed.
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        let x = x.max(0.0);
        let y = y.clamp(0.0, self.max_scroll_y());
        if x == self.scroll_x && y == self.scroll_y {
            return;
        }
        self.scroll_x = x;
        self.scroll_y = y;
        self.dispatch(EventKind::Scroll, None, PageSignal::Scroll { origin: None });
    }

    /// Scrolls the document by a relative amount.
    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll_to(self.scroll_x + dx, self.scroll_y + dy);
    }

    /// Dispatches a `scroll` event originating at an inner scrollable element.
    ///
    /// Element scroll events do not bubble, so only capturing listeners hear them.
    pub fn scroll_element(&mut self, node: NodeId) {
        self.dispatch(EventKind::Scroll, Some(node), PageSignal::Scroll { origin: Some(node) });
    }

    /// Topmost element whose client rect contains `(x, y)`.
    ///
    /// Later siblings paint over earlier ones and children over parents. Subtrees
    /// for which `exclude` returns `true` are skipped entirely, as are hidden
    /// subtrees and elements without layout (their children are still tested).
    pub fn element_from_point<F>(&self, x: f64, y: f64, exclude: F) -> Option<NodeId>
    where
        F: Fn(NodeId) -> bool,
    {
        self.hit(self.html, x, y, &exclude)
    }

    fn hit<F>(&self, node: NodeId, x: f64, y: f64, exclude: &F) -> Option<NodeId>
    where
        F: Fn(NodeId) -> bool,
    {
        if exclude(node) || self.is_hidden(node) {
            return None;
        }
        for &child in self.children(node).iter().rev() {
            if let Some(found) = self.hit(child, x, y, exclude) {
                return Some(found);
            }
        }
        self.layout(node)
            .filter(|_| self.bounding_client_rect(node).contains(x, y))
            .map(|_| node)
    }

    // -----------------------------------------------------------------------
    // Listeners and observers
    // -----------------------------------------------------------------------

    /// Registers an event listener that forwards matching events to `tx`.
    pub fn add_event_listener(
        &mut self,
        target: ListenTarget,
        kind: EventKind,
        capture: bool,
        tx: Sender<PageSignal>,
    ) -> ListenerId {
        self.register(Registration::Event { target, kind, capture }, tx)
    }

    /// Observes mutations at `root` (and its subtree when `options.subtree`).
    pub fn observe_mutations(
        &mut self,
        root: NodeId,
        options: MutationOptions,
        tx: Sender<PageSignal>,
    ) -> ListenerId {
        self.register(Registration::Observer { root, options }, tx)
    }

    fn register(&mut self, registration: Registration, tx: Sender<PageSignal>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener { id, registration, tx });
        id
    }

    /// Removes a listener or observer. Returns `false` if `id` was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Number of live listener and observer registrations.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn dispatch(&self, kind: EventKind, origin: Option<NodeId>, signal: PageSignal) {
        for listener in &self.listeners {
            let Registration::Event { target, kind: wanted, capture } = listener.registration
            else {
                continue;
            };
            if wanted != kind {
                continue;
            }
            let reached = match (kind, origin) {
                (EventKind::Resize, _) => target == ListenTarget::Window,
                // Document scrolls bubble from the document to the window.
                (EventKind::Scroll, None) => true,
                (EventKind::Scroll, Some(_)) => capture,
            };
            if reached {
                let _ = listener.tx.send(signal.clone());
            }
        }
    }

    fn notify(&self, record: MutationRecord) {
        let (target, attribute) = match &record {
            MutationRecord::ChildList { target } => (*target, None),
            MutationRecord::Attribute { target, name } => (*target, Some(name.as_str())),
        };
        for listener in &self.listeners {
            let Registration::Observer { root, options } = &listener.registration else {
                continue;
            };
            let in_scope = if options.subtree {
                self.contains(*root, target)
            } else {
                *root == target
            };
            let wanted = match attribute {
                None => options.child_list,
                Some(name) => options.accepts_attribute(name),
            };
            if in_scope && wanted {
                let _ = listener.tx.send(PageSignal::Mutation(record.clone()));
            }
        }
    }
}
