//! Responsive engine: viewport breakpoints, element size observation,
//! visibility tracking and lazy loading.
//!
//! The host forwards viewport changes ([`ResponsiveEngine::set_viewport`]),
//! element resizes ([`ResponsiveEngine::notify_resize`]) and intersection
//! changes ([`ResponsiveEngine::notify_intersection`]); the engine updates the
//! document and calls the registered observers.

use ahash::{AHashMap, AHashSet};
use log::{debug, warn};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Content, Document, Subscription};
use crate::error::Result;
use crate::fetch::Fetcher;

pub const ELEMENT_VISIBLE_EVENT: &str = "elementVisible";
pub const ELEMENT_HIDDEN_EVENT: &str = "elementHidden";
pub const LAZY_LOADED_EVENT: &str = "lazyLoaded";

/// Attribute holding a JSON data URL resolved on first visibility.
pub const LAZY_SRC_ATTR: &str = "data-lazy-src";
/// Attribute holding a content URL resolved on first visibility.
pub const LAZY_CONTENT_ATTR: &str = "data-lazy-content";

/// Viewports narrower than this get the mobile clamp in [`ResponsiveEngine::optimal_chart_dimensions`].
pub const MOBILE_MAX_WIDTH: f64 = 768.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Breakpoint {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
    Xxl,
}

impl Breakpoint {
    pub fn from_width(width: f64) -> Self {
        match width {
            w if w < 576.0 => Breakpoint::Xs,
            w if w < 768.0 => Breakpoint::Sm,
            w if w < 992.0 => Breakpoint::Md,
            w if w < 1200.0 => Breakpoint::Lg,
            w if w < 1400.0 => Breakpoint::Xl,
            _ => Breakpoint::Xxl,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Breakpoint::Xs => "xs",
            Breakpoint::Sm => "sm",
            Breakpoint::Md => "md",
            Breakpoint::Lg => "lg",
            Breakpoint::Xl => "xl",
            Breakpoint::Xxl => "xxl",
        }
    }

    /// Layout tokens for this breakpoint, in pixels.
    pub fn tokens(self) -> LayoutTokens {
        let (margin, padding, sidebar_width, grid_gap, font_size_base) = match self {
            Breakpoint::Xs => (10.0, 8.0, 0.0, 10.0, 12.0),
            Breakpoint::Sm => (15.0, 10.0, 0.0, 12.0, 13.0),
            Breakpoint::Md => (20.0, 15.0, 200.0, 15.0, 14.0),
            Breakpoint::Lg => (25.0, 20.0, 250.0, 20.0, 14.0),
            Breakpoint::Xl => (30.0, 20.0, 280.0, 20.0, 15.0),
            Breakpoint::Xxl => (30.0, 25.0, 300.0, 25.0, 16.0),
        };
        LayoutTokens {
            margin,
            padding,
            sidebar_width,
            grid_gap,
            font_size_base,
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutTokens {
    pub margin: f64,
    pub padding: f64,
    pub sidebar_width: f64,
    pub grid_gap: f64,
    pub font_size_base: f64,
}

impl LayoutTokens {
    fn css(&self) -> [(&'static str, String); 5] {
        let px = |v: f64| format!("{v}px");
        [
            ("--chart-margin", px(self.margin)),
            ("--chart-padding", px(self.padding)),
            ("--sidebar-width", px(self.sidebar_width)),
            ("--grid-gap", px(self.grid_gap)),
            ("--font-size-base", px(self.font_size_base)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOrientation {
    Landscape,
    Portrait,
}

impl ScreenOrientation {
    pub fn from_size(width: f64, height: f64) -> Self {
        if width >= height {
            ScreenOrientation::Landscape
        } else {
            ScreenOrientation::Portrait
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScreenOrientation::Landscape => "landscape",
            ScreenOrientation::Portrait => "portrait",
        }
    }
}

/// Width class of an observed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
}

impl SizeClass {
    pub fn from_width(width: f64) -> Self {
        match width {
            w if w < 300.0 => SizeClass::Xs,
            w if w < 500.0 => SizeClass::Sm,
            w if w < 800.0 => SizeClass::Md,
            w if w < 1100.0 => SizeClass::Lg,
            _ => SizeClass::Xl,
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            SizeClass::Xs => "size-xs",
            SizeClass::Sm => "size-sm",
            SizeClass::Md => "size-md",
            SizeClass::Lg => "size-lg",
            SizeClass::Xl => "size-xl",
        }
    }
}

/// Aspect class of an observed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClass {
    Square,
    Landscape,
    Portrait,
}

impl AspectClass {
    pub fn from_size(width: f64, height: f64) -> Self {
        if height <= 0.0 {
            return AspectClass::Landscape;
        }
        match width / height {
            r if (0.9..=1.1).contains(&r) => AspectClass::Square,
            r if r > 1.1 => AspectClass::Landscape,
            _ => AspectClass::Portrait,
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            AspectClass::Square => "ratio-square",
            AspectClass::Landscape => "ratio-landscape",
            AspectClass::Portrait => "ratio-portrait",
        }
    }
}

/// What an element observer receives on resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeReport {
    pub element: String,
    pub width: f64,
    pub height: f64,
    pub size: SizeClass,
    pub aspect: AspectClass,
}

/// Inputs to [`ResponsiveEngine::optimal_chart_dimensions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionConstraints {
    /// Lower bounds; on mobile viewports the viewport clamp still applies below them.
    pub min_width: f64,
    pub min_height: f64,
    /// Width / height; `None` keeps the container height.
    pub aspect_ratio: Option<f64>,
}

impl Default for DimensionConstraints {
    fn default() -> Self {
        Self {
            min_width: 300.0,
            min_height: 200.0,
            aspect_ratio: None,
        }
    }
}

type BreakpointCallback = Rc<dyn Fn(Breakpoint, Breakpoint)>;
type ResizeCallback = Rc<dyn Fn(&ResizeReport)>;

pub struct ResponsiveEngine {
    document: Rc<Document>,
    breakpoint: Cell<Breakpoint>,
    orientation: Cell<ScreenOrientation>,
    next_id: Cell<u64>,
    breakpoint_callbacks: RefCell<BTreeMap<u64, BreakpointCallback>>,
    observers: RefCell<BTreeMap<u64, (String, ResizeCallback)>>,
    visible: RefCell<AHashMap<String, bool>>,
    lazy_done: RefCell<AHashSet<String>>,
    fetcher: RefCell<Option<Rc<dyn Fetcher>>>,
}

impl ResponsiveEngine {
    /// Engine for `document`; applies the tokens of the current viewport immediately.
    pub fn new(document: Rc<Document>) -> Self {
        let (w, h) = document.viewport();
        let engine = Self {
            breakpoint: Cell::new(Breakpoint::from_width(w)),
            orientation: Cell::new(ScreenOrientation::from_size(w, h)),
            document,
            next_id: Cell::new(0),
            breakpoint_callbacks: RefCell::new(BTreeMap::new()),
            observers: RefCell::new(BTreeMap::new()),
            visible: RefCell::new(AHashMap::new()),
            lazy_done: RefCell::new(AHashSet::new()),
            fetcher: RefCell::new(None),
        };
        engine.apply_tokens();
        engine
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn set_fetcher(&self, fetcher: Rc<dyn Fetcher>) {
        *self.fetcher.borrow_mut() = Some(fetcher);
    }

    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint.get()
    }

    pub fn orientation(&self) -> ScreenOrientation {
        self.orientation.get()
    }

    pub fn tokens(&self) -> LayoutTokens {
        self.breakpoint.get().tokens()
    }

    fn apply_tokens(&self) {
        for (name, value) in self.tokens().css() {
            self.document.set_root_property(name, value);
        }
        self.document
            .swap_body_class("bp-", &format!("bp-{}", self.breakpoint.get()));
        self.document
            .swap_body_class("orientation-", &format!("orientation-{}", self.orientation.get().as_str()));
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Record a new viewport size. Tokens, body classes and callbacks update on a breakpoint change.
    pub fn set_viewport(&self, width: f64, height: f64) {
        self.document.set_viewport(width, height);
        let old = self.breakpoint.get();
        let new = Breakpoint::from_width(width);
        let orientation = ScreenOrientation::from_size(width, height);
        let orientation_changed = orientation != self.orientation.get();
        self.breakpoint.set(new);
        self.orientation.set(orientation);
        if old == new && !orientation_changed {
            return;
        }
        self.apply_tokens();
        if old != new {
            debug!("breakpoint {old} -> {new}");
            let callbacks: Vec<BreakpointCallback> =
                self.breakpoint_callbacks.borrow().values().cloned().collect();
            for cb in callbacks {
                cb(new, old);
            }
        }
    }

    /// Call `callback(new, old)` on every breakpoint change until the subscription is dropped.
    pub fn on_breakpoint_change(self: &Rc<Self>, callback: impl Fn(Breakpoint, Breakpoint) + 'static) -> Subscription {
        let id = self.next_id();
        self.breakpoint_callbacks
            .borrow_mut()
            .insert(id, Rc::new(callback));
        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.breakpoint_callbacks.borrow_mut().remove(&id);
            }
        })
    }

    /// Observe size changes of `element`.
    pub fn observe(self: &Rc<Self>, element: &str, callback: impl Fn(&ResizeReport) + 'static) -> Subscription {
        let id = self.next_id();
        self.observers
            .borrow_mut()
            .insert(id, (element.to_string(), Rc::new(callback)));
        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.observers.borrow_mut().remove(&id);
            }
        })
    }

    /// Number of live observations of `element`.
    pub fn observer_count(&self, element: &str) -> usize {
        self.observers
            .borrow()
            .values()
            .filter(|(el, _)| el == element)
            .count()
    }

    pub fn total_observers(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Record a new element size, update its size/ratio classes and notify observers.
    pub fn notify_resize(&self, element: &str, width: f64, height: f64) {
        if !self.document.contains(element) {
            return;
        }
        self.document.set_element_size(element, width, height);
        let report = ResizeReport {
            element: element.to_string(),
            width,
            height,
            size: SizeClass::from_width(width),
            aspect: AspectClass::from_size(width, height),
        };
        self.document.swap_class(element, "size-", report.size.class());
        self.document.swap_class(element, "ratio-", report.aspect.class());
        let targets: Vec<ResizeCallback> = self
            .observers
            .borrow()
            .values()
            .filter(|(el, _)| el == element)
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in targets {
            cb(&report);
        }
    }

    /// Record a visibility change. Transitions emit `elementVisible` / `elementHidden`;
    /// the first visibility of a lazy element resolves it.
    pub fn notify_intersection(&self, element: &str, visible: bool) {
        let previous = self
            .visible
            .borrow_mut()
            .insert(element.to_string(), visible);
        if previous == Some(visible) {
            return;
        }
        let name = if visible {
            ELEMENT_VISIBLE_EVENT
        } else {
            ELEMENT_HIDDEN_EVENT
        };
        self.document.events().emit(name, json!({ "element": element }));
        if visible && !self.lazy_done.borrow().contains(element) {
            if let Err(e) = self.load_lazy(element) {
                warn!("lazy load of #{element} failed: {e}");
                self.document.add_class(element, "lazy-error");
            }
        }
    }

    pub fn is_visible(&self, element: &str) -> bool {
        self.visible.borrow().get(element).copied().unwrap_or(false)
    }

    fn load_lazy(&self, element: &str) -> Result<()> {
        let src = self.document.attr(element, LAZY_SRC_ATTR);
        let content = self.document.attr(element, LAZY_CONTENT_ATTR);
        if src.is_none() && content.is_none() {
            return Ok(());
        }
        let Some(fetcher) = self.fetcher.borrow().clone() else {
            warn!("#{element} is lazy but no fetcher is configured");
            return Ok(());
        };
        self.lazy_done.borrow_mut().insert(element.to_string());
        if let Some(url) = src {
            let data = fetcher.fetch_json(&url)?;
            self.document.remove_attr(element, LAZY_SRC_ATTR);
            self.document.add_class(element, "lazy-loaded");
            self.document.events().emit(
                LAZY_LOADED_EVENT,
                json!({ "element": element, "kind": "data", "url": url, "data": data }),
            );
        }
        if let Some(url) = content {
            let html = fetcher.fetch_text(&url)?;
            self.document.set_content(element, Content::Html(html));
            self.document.remove_attr(element, LAZY_CONTENT_ATTR);
            self.document.add_class(element, "lazy-loaded");
            self.document.events().emit(
                LAZY_LOADED_EVENT,
                json!({ "element": element, "kind": "content", "url": url }),
            );
        }
        Ok(())
    }

    /// Chart size for `container`: responsive margin and padding removed on both sides,
    /// minimums honored, and on mobile viewports clamped to `viewport − 40` wide and 40 % of
    /// the viewport high.
    ///
    /// The mobile clamp wins over `min_width`/`min_height`: a chart never outgrows a small
    /// viewport, even when that leaves it below the requested minimum.
    pub fn optimal_chart_dimensions(&self, container: &str, constraints: DimensionConstraints) -> Option<(f64, f64)> {
        let (cw, ch) = self.document.element_size(container)?;
        let tokens = self.tokens();
        let inset = 2.0 * (tokens.margin + tokens.padding);
        let mut width = (cw - inset).max(constraints.min_width);
        let mut height = match constraints.aspect_ratio {
            Some(r) if r > 0.0 => width / r,
            _ => ch - inset,
        }
        .max(constraints.min_height);
        let (vw, vh) = self.document.viewport();
        if vw < MOBILE_MAX_WIDTH {
            width = width.min(vw - 40.0);
            height = height.min(vh * 0.4);
        }
        Some((width.max(0.0), height.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;

    fn engine(w: f64, h: f64) -> Rc<ResponsiveEngine> {
        Rc::new(ResponsiveEngine::new(Rc::new(Document::new(w, h))))
    }

    #[test]
    fn breakpoint_boundaries() {
        assert_eq!(Breakpoint::from_width(575.0), Breakpoint::Xs);
        assert_eq!(Breakpoint::from_width(576.0), Breakpoint::Sm);
        assert_eq!(Breakpoint::from_width(1399.0), Breakpoint::Xl);
        assert_eq!(Breakpoint::from_width(1400.0), Breakpoint::Xxl);
    }

    #[test]
    fn viewport_change_updates_tokens_and_callbacks() {
        let e = engine(1280.0, 800.0);
        let doc = Rc::clone(e.document());
        assert!(doc.body_has_class("bp-xl"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let sub = e.on_breakpoint_change(move |new, old| s.borrow_mut().push((new, old)));
        e.set_viewport(500.0, 900.0);
        assert_eq!(doc.root_property("--chart-padding").as_deref(), Some("8px"));
        assert!(doc.body_has_class("bp-xs") && !doc.body_has_class("bp-xl"));
        assert!(doc.body_has_class("orientation-portrait"));
        assert_eq!(*seen.borrow(), vec![(Breakpoint::Xs, Breakpoint::Xl)]);
        drop(sub);
        e.set_viewport(1500.0, 900.0);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn resize_sets_classes_and_reaches_observer() {
        let e = engine(1280.0, 800.0);
        e.document().add_container("c", 100.0, 100.0);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = e.observe("c", move |r| {
            assert_eq!(r.size, SizeClass::Md);
            h.set(h.get() + 1);
        });
        e.notify_resize("c", 600.0, 300.0);
        assert!(e.document().has_class("c", "size-md"));
        assert!(e.document().has_class("c", "ratio-landscape"));
        assert_eq!(hits.get(), 1);
        assert_eq!(e.observer_count("c"), 1);
        drop(sub);
        assert_eq!(e.observer_count("c"), 0);
    }

    #[test]
    fn mobile_dimensions_are_clamped() {
        let e = engine(375.0, 667.0);
        e.document().add_container("c", 800.0, 600.0);
        let (w, h) = e
            .optimal_chart_dimensions("c", DimensionConstraints::default())
            .unwrap();
        assert_eq!(w, 335.0);
        assert!((h - 266.8).abs() < 1e-9);
    }

    #[test]
    fn desktop_dimensions_honor_minimums_and_aspect() {
        let e = engine(1280.0, 800.0);
        e.document().add_container("c", 200.0, 100.0);
        let dims = e.optimal_chart_dimensions("c", DimensionConstraints::default());
        assert_eq!(dims, Some((300.0, 200.0)));
        e.document().set_element_size("c", 840.0, 100.0);
        let constraints = DimensionConstraints {
            aspect_ratio: Some(2.0),
            ..DimensionConstraints::default()
        };
        // xl: margin 30 + padding 20 on each side
        assert_eq!(e.optimal_chart_dimensions("c", constraints), Some((740.0, 370.0)));
        e.document().set_element_size("c", 700.0, 500.0);
        assert_eq!(
            e.optimal_chart_dimensions("c", DimensionConstraints::default()),
            Some((600.0, 400.0))
        );
    }

    #[test]
    fn mobile_clamp_overrides_minimums() {
        let e = engine(375.0, 667.0);
        e.document().add_container("c", 300.0, 150.0);
        let constraints = DimensionConstraints {
            min_width: 500.0,
            min_height: 400.0,
            aspect_ratio: None,
        };
        let (w, h) = e.optimal_chart_dimensions("c", constraints).unwrap();
        assert_eq!(w, 335.0);
        assert!((h - 266.8).abs() < 1e-9);
    }

    #[test]
    fn lazy_data_loads_once_on_first_visibility() {
        let e = engine(1280.0, 800.0);
        let doc = Rc::clone(e.document());
        doc.add_container("lazy", 300.0, 200.0);
        doc.set_attr("lazy", LAZY_SRC_ATTR, "/io.json");
        e.set_fetcher(Rc::new(StaticFetcher::new().with("/io.json", "[1,2]")));
        e.notify_intersection("lazy", true);
        e.notify_intersection("lazy", false);
        e.notify_intersection("lazy", true);
        let loaded = doc.events().events_named(LAZY_LOADED_EVENT);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].detail["data"][1], 2);
        assert_eq!(doc.events().events_named(ELEMENT_VISIBLE_EVENT).len(), 2);
        assert_eq!(doc.events().events_named(ELEMENT_HIDDEN_EVENT).len(), 1);
    }
}
