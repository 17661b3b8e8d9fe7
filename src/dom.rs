//! In-process host document.
//!
//! Charts never talk to a browser directly; they resolve containers, write CSS
//! custom properties, toggle classes, attach listeners and emit events through
//! this model. A page embedding the crate mirrors it onto the real DOM, tests
//! inspect it directly.

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::viz::scene::SharedSurface;

/// Events kept in the bus history for inspection.
const HISTORY_LIMIT: usize = 512;

/// RAII disposer for a subscription, observer or listener registration.
///
/// Dropping the value runs the disposer; [`Subscription::forget`] keeps the
/// registration alive for the life of its owner.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Run the disposer now.
    pub fn dispose(mut self) {
        if let Some(f) = self.dispose.take() {
            f();
        }
    }

    /// Keep the registration for good.
    pub fn forget(mut self) {
        self.dispose = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.dispose.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

/// A named event with a JSON payload, dispatched on the document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEvent {
    pub name: String,
    pub detail: Value,
}

type Handler = Rc<dyn Fn(&DocumentEvent)>;

/// Publish/subscribe bus. Delivery follows subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    subscribers: RefCell<BTreeMap<u64, (Option<String>, Handler)>>,
    history: RefCell<Vec<DocumentEvent>>,
}

impl EventBus {
    /// Subscribe to events named `name`.
    pub fn subscribe(
        self: &Rc<Self>,
        name: &str,
        handler: impl Fn(&DocumentEvent) + 'static,
    ) -> Subscription {
        self.insert(Some(name.to_string()), Rc::new(handler))
    }

    /// Subscribe to every event.
    pub fn subscribe_all(self: &Rc<Self>, handler: impl Fn(&DocumentEvent) + 'static) -> Subscription {
        self.insert(None, Rc::new(handler))
    }

    fn insert(self: &Rc<Self>, name: Option<String>, handler: Handler) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().insert(id, (name, handler));
        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(bus) = weak.upgrade() {
                bus.subscribers.borrow_mut().remove(&id);
            }
        })
    }

    /// Dispatch an event. Handlers may subscribe, unsubscribe or emit while running.
    pub fn emit(&self, name: &str, detail: Value) {
        let event = DocumentEvent {
            name: name.to_string(),
            detail,
        };
        {
            let mut history = self.history.borrow_mut();
            if history.len() == HISTORY_LIMIT {
                history.remove(0);
            }
            history.push(event.clone());
        }
        let targets: Vec<Handler> = self
            .subscribers
            .borrow()
            .values()
            .filter(|(filter, _)| filter.as_deref().is_none_or(|n| n == name))
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in targets {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Recently emitted events, oldest first.
    pub fn history(&self) -> Vec<DocumentEvent> {
        self.history.borrow().clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<DocumentEvent> {
        self.history
            .borrow()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.borrow_mut().clear();
    }
}

/// Notice shown in place of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// Spinner + message.
    Loading,
    /// Info alert.
    Empty,
    /// Danger alert + icon.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub message: String,
    /// Size of the container when the panel replaced its content.
    pub width: f64,
    pub height: f64,
}

/// What a container currently shows.
#[derive(Debug, Clone, Default)]
pub enum Content {
    #[default]
    Empty,
    Surface(SharedSurface),
    Panel(Panel),
    Html(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub connected: bool,
    pub classes: BTreeSet<String>,
    pub attrs: BTreeMap<String, String>,
    pub content: Content,
}

impl Element {
    fn new(id: &str, width: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            connected: true,
            classes: BTreeSet::new(),
            attrs: BTreeMap::new(),
            content: Content::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// The host page: elements, root style, body classes, listeners and the event bus.
pub struct Document {
    elements: RefCell<BTreeMap<String, Element>>,
    root_style: RefCell<BTreeMap<String, String>>,
    body_classes: RefCell<BTreeSet<String>>,
    viewport: Cell<(f64, f64)>,
    listeners: RefCell<BTreeMap<ListenerId, (String, String)>>,
    next_listener: Cell<u64>,
    live_region: RefCell<Vec<String>>,
    bus: Rc<EventBus>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

impl Document {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            elements: RefCell::new(BTreeMap::new()),
            root_style: RefCell::new(BTreeMap::new()),
            body_classes: RefCell::new(BTreeSet::new()),
            viewport: Cell::new((viewport_width, viewport_height)),
            listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(0),
            live_region: RefCell::new(Vec::new()),
            bus: Rc::new(EventBus::default()),
        }
    }

    pub fn events(&self) -> &Rc<EventBus> {
        &self.bus
    }

    // ---------------- elements ----------------

    /// Add (or replace) a connected container element.
    pub fn add_container(&self, id: &str, width: f64, height: f64) {
        self.elements
            .borrow_mut()
            .insert(id.to_string(), Element::new(id, width, height));
    }

    pub fn remove_element(&self, id: &str) -> bool {
        self.elements.borrow_mut().remove(id).is_some()
    }

    /// Mark an element as detached from the page (it still exists but is unreachable).
    pub fn disconnect(&self, id: &str) {
        self.with_element_mut(id, |el| el.connected = false);
    }

    /// True when `id` exists and is attached.
    pub fn contains(&self, id: &str) -> bool {
        self.elements
            .borrow()
            .get(id)
            .is_some_and(|el| el.connected)
    }

    pub fn with_element<R>(&self, id: &str, f: impl FnOnce(&Element) -> R) -> Option<R> {
        self.elements.borrow().get(id).map(f)
    }

    pub fn with_element_mut<R>(&self, id: &str, f: impl FnOnce(&mut Element) -> R) -> Option<R> {
        self.elements.borrow_mut().get_mut(id).map(f)
    }

    pub fn element_ids(&self) -> Vec<String> {
        self.elements.borrow().keys().cloned().collect()
    }

    pub fn element_size(&self, id: &str) -> Option<(f64, f64)> {
        self.with_element(id, |el| (el.width, el.height))
    }

    pub fn set_element_size(&self, id: &str, width: f64, height: f64) {
        self.with_element_mut(id, |el| {
            el.width = width;
            el.height = height;
        });
    }

    pub fn set_attr(&self, id: &str, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.with_element_mut(id, |el| {
            el.attrs.insert(name.to_string(), value);
        });
    }

    pub fn remove_attr(&self, id: &str, name: &str) {
        self.with_element_mut(id, |el| {
            el.attrs.remove(name);
        });
    }

    pub fn attr(&self, id: &str, name: &str) -> Option<String> {
        self.with_element(id, |el| el.attrs.get(name).cloned())
            .flatten()
    }

    pub fn add_class(&self, id: &str, class: &str) {
        self.with_element_mut(id, |el| {
            el.classes.insert(class.to_string());
        });
    }

    pub fn remove_class(&self, id: &str, class: &str) {
        self.with_element_mut(id, |el| {
            el.classes.remove(class);
        });
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.with_element(id, |el| el.classes.contains(class))
            .unwrap_or(false)
    }

    /// Replace every class starting with `prefix` by `class`.
    pub fn swap_class(&self, id: &str, prefix: &str, class: &str) {
        self.with_element_mut(id, |el| {
            el.classes.retain(|c| !c.starts_with(prefix));
            el.classes.insert(class.to_string());
        });
    }

    // ---------------- content ----------------

    pub fn set_content(&self, id: &str, content: Content) {
        self.with_element_mut(id, |el| el.content = content);
    }

    pub fn clear_content(&self, id: &str) {
        self.set_content(id, Content::Empty);
    }

    pub fn content(&self, id: &str) -> Option<Content> {
        self.with_element(id, |el| el.content.clone())
    }

    /// Number of root drawing surfaces inside the container (0 or 1).
    pub fn surface_count(&self, id: &str) -> usize {
        self.with_element(id, |el| usize::from(matches!(el.content, Content::Surface(_))))
            .unwrap_or(0)
    }

    pub fn panel(&self, id: &str) -> Option<Panel> {
        match self.content(id)? {
            Content::Panel(p) => Some(p),
            _ => None,
        }
    }

    /// Serialized SVG of the container's surface, if it shows one.
    pub fn svg(&self, id: &str) -> Option<String> {
        match self.content(id)? {
            Content::Surface(s) => Some(s.borrow().to_svg()),
            _ => None,
        }
    }

    // ---------------- root style & body ----------------

    pub fn set_root_property(&self, name: &str, value: impl Into<String>) {
        self.root_style
            .borrow_mut()
            .insert(name.to_string(), value.into());
    }

    pub fn root_property(&self, name: &str) -> Option<String> {
        self.root_style.borrow().get(name).cloned()
    }

    pub fn root_properties(&self) -> BTreeMap<String, String> {
        self.root_style.borrow().clone()
    }

    /// Drop every root property starting with `prefix`.
    pub fn clear_root_properties(&self, prefix: &str) {
        self.root_style
            .borrow_mut()
            .retain(|k, _| !k.starts_with(prefix));
    }

    pub fn body_classes(&self) -> BTreeSet<String> {
        self.body_classes.borrow().clone()
    }

    pub fn body_has_class(&self, class: &str) -> bool {
        self.body_classes.borrow().contains(class)
    }

    /// Replace every body class starting with `prefix` by `class`.
    pub fn swap_body_class(&self, prefix: &str, class: &str) {
        let mut classes = self.body_classes.borrow_mut();
        classes.retain(|c| !c.starts_with(prefix));
        classes.insert(class.to_string());
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport.get()
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.viewport.set((width, height));
    }

    // ---------------- listeners ----------------

    pub fn add_listener(&self, id: &str, event: &str) -> ListenerId {
        let lid = ListenerId(self.next_listener.get());
        self.next_listener.set(lid.0 + 1);
        self.listeners
            .borrow_mut()
            .insert(lid, (id.to_string(), event.to_string()));
        lid
    }

    pub fn remove_listener(&self, listener: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&listener).is_some()
    }

    pub fn listener_count(&self, id: &str) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|(el, _)| el == id)
            .count()
    }

    pub fn has_listener(&self, id: &str, event: &str) -> bool {
        self.listeners
            .borrow()
            .values()
            .any(|(el, ev)| el == id && ev == event)
    }

    // ---------------- live region ----------------

    /// Polite screen-reader announcement.
    pub fn announce(&self, message: impl Into<String>) {
        self.live_region.borrow_mut().push(message.into());
    }

    pub fn announcements(&self) -> Vec<String> {
        self.live_region.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dropping_subscription_unsubscribes() {
        let doc = Document::default();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let sub = doc.events().subscribe("ping", move |_| s.set(s.get() + 1));
        doc.events().emit("ping", json!({}));
        drop(sub);
        doc.events().emit("ping", json!({}));
        assert_eq!(seen.get(), 1);
        assert_eq!(doc.events().subscriber_count(), 0);
        assert_eq!(doc.events().events_named("ping").len(), 2);
    }

    #[test]
    fn disconnected_container_is_not_reachable() {
        let doc = Document::default();
        doc.add_container("c", 100.0, 50.0);
        assert!(doc.contains("c"));
        doc.disconnect("c");
        assert!(!doc.contains("c"));
        assert!(!doc.contains("missing"));
    }

    #[test]
    fn listeners_are_counted_per_element() {
        let doc = Document::default();
        doc.add_container("c", 100.0, 50.0);
        let a = doc.add_listener("c", "keydown");
        let _b = doc.add_listener("c", "click");
        assert_eq!(doc.listener_count("c"), 2);
        assert!(doc.remove_listener(a));
        assert!(!doc.remove_listener(a));
        assert_eq!(doc.listener_count("c"), 1);
    }
}
