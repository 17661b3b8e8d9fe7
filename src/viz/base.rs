//! Chart lifecycle shared by every chart type.
//!
//! [`ChartBase`] owns the container binding, the surface, the animation clock,
//! listener and observer registrations, tooltip and keyboard focus. Concrete
//! charts embed it and implement [`Chart`].

use log::{debug, warn};
use serde_json::{Map, Value, json};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::anim::{Animator, Easing, Tween, TweenValue};
use super::legend::{self, LegendItem, LegendLayout};
use super::options::BaseOptions;
use super::raster;
use super::scene::{NodeId, SharedSurface, Surface, num};
use super::types::{DataFormat, ImageFormat, Key, LegendPosition};
use crate::color::Rgb;
use crate::dom::{Content, Document, ListenerId, Panel, PanelKind, Subscription};
use crate::error::{ChartError, Result};
use crate::responsive::ResponsiveEngine;
use crate::theme::{THEME_CHANGED_EVENT, Theme, ThemeRegistry};

pub const NO_DATA_MESSAGE: &str = "No data available";
pub const RENDER_FAILURE_MESSAGE: &str = "Unable to render chart";
pub const TITLE_FONT_PX: f64 = 16.0;

/// Collaborators a chart needs: the document, the theme registry and the responsive engine.
#[derive(Clone)]
pub struct ChartEnv {
    pub document: Rc<Document>,
    pub themes: Rc<ThemeRegistry>,
    pub responsive: Rc<ResponsiveEngine>,
}

impl ChartEnv {
    pub fn new(document: Rc<Document>) -> Self {
        Self {
            themes: Rc::new(ThemeRegistry::new(Rc::clone(&document))),
            responsive: Rc::new(ResponsiveEngine::new(Rc::clone(&document))),
            document,
        }
    }
}

impl Default for ChartEnv {
    fn default() -> Self {
        Self::new(Rc::new(Document::default()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    Uninitialized,
    Validated,
    Sized,
    Drawn,
    Interactive,
    Destroyed,
}

/// Tooltip content and anchor (surface coordinates).
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub x: f64,
    pub y: f64,
    pub title: String,
    pub lines: Vec<String>,
}

impl Tooltip {
    pub fn new(x: f64, y: f64, title: impl Into<String>) -> Self {
        Self {
            x,
            y,
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Title and lines, one per row.
    pub fn text(&self) -> String {
        std::iter::once(self.title.as_str())
            .chain(self.lines.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Drawing rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Result of a key press on the focused chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Activate(usize),
    Focus(usize),
    Blur,
}

pub type ChartHandle = Rc<RefCell<Box<dyn Chart>>>;

/// Pending re-render request raised by theme changes and container resizes.
#[derive(Default)]
struct Invalidation {
    dirty: Cell<bool>,
    owner: RefCell<Option<Weak<RefCell<Box<dyn Chart>>>>>,
}

impl Invalidation {
    fn invalidate(&self) {
        self.dirty.set(true);
        let owner = self.owner.borrow().as_ref().and_then(Weak::upgrade);
        let Some(handle) = owner else {
            return;
        };
        // a chart that is mid-call picks the flag up when that call re-renders
        if let Ok(mut chart) = handle.try_borrow_mut() {
            if let Err(e) = chart.refresh() {
                warn!("re-render of #{} failed: {e}", chart.base().container());
            }
        }
    }
}

/// Wrap `chart` in a shared handle that theme changes and container resizes re-render in place.
///
/// Charts only redraw themselves on those notifications once mounted; the registry mounts
/// everything it creates.
pub fn mount(chart: Box<dyn Chart>) -> ChartHandle {
    let handle: ChartHandle = Rc::new(RefCell::new(chart));
    attach(&handle);
    handle
}

fn attach(handle: &ChartHandle) {
    let chart = handle.borrow();
    *chart.base().invalidation.owner.borrow_mut() = Some(Rc::downgrade(handle));
}

pub struct ChartBase {
    env: ChartEnv,
    container: String,
    chart_type: &'static str,
    options: BaseOptions,
    state: ChartState,
    surface: Option<SharedSurface>,
    animator: Animator,
    subscriptions: Vec<Subscription>,
    listeners: Vec<ListenerId>,
    invalidation: Rc<Invalidation>,
    tooltip: Option<Tooltip>,
    focus: Option<usize>,
}

impl ChartBase {
    /// Bind to `container`: ARIA attributes, listeners, theme and resize observation.
    pub fn new(env: ChartEnv, container: &str, chart_type: &'static str, options: BaseOptions) -> Result<Self> {
        let mut base = Self {
            env,
            container: container.to_string(),
            chart_type,
            options,
            state: ChartState::Uninitialized,
            surface: None,
            animator: Animator::new(),
            subscriptions: Vec::new(),
            listeners: Vec::new(),
            invalidation: Rc::new(Invalidation::default()),
            tooltip: None,
            focus: None,
        };
        base.validate_container()?;
        base.state = ChartState::Validated;
        base.bind();
        debug!("{chart_type} chart bound to #{container}");
        Ok(base)
    }

    fn bind(&mut self) {
        let doc = Rc::clone(&self.env.document);
        let c = self.container.as_str();
        self.apply_aria();
        if self.options.accessibility.enabled {
            self.listeners.push(doc.add_listener(c, "keydown"));
        }
        for event in ["mousemove", "mouseleave", "click"] {
            self.listeners.push(doc.add_listener(c, event));
        }
        let inv = Rc::clone(&self.invalidation);
        self.subscriptions
            .push(doc.events().subscribe(THEME_CHANGED_EVENT, move |_| inv.invalidate()));
        if self.options.responsive {
            let inv = Rc::clone(&self.invalidation);
            self.subscriptions
                .push(self.env.responsive.observe(c, move |_| inv.invalidate()));
        }
    }

    /// Write `role`, `aria-label` and `tabindex` to the container when accessibility is on.
    pub(crate) fn apply_aria(&self) {
        if !self.options.accessibility.enabled {
            return;
        }
        let doc = &self.env.document;
        let c = self.container.as_str();
        doc.set_attr(c, "role", "img");
        doc.set_attr(c, "aria-label", self.aria_label());
        doc.set_attr(c, "tabindex", "0");
    }

    fn aria_label(&self) -> String {
        match &self.options.title {
            Some(t) => format!("{} chart: {t}", self.chart_type),
            None => format!("{} chart", self.chart_type),
        }
    }

    pub fn env(&self) -> &ChartEnv {
        &self.env
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.env.document
    }

    pub fn themes(&self) -> &Rc<ThemeRegistry> {
        &self.env.themes
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn chart_type(&self) -> &'static str {
        self.chart_type
    }

    pub fn options(&self) -> &BaseOptions {
        &self.options
    }

    /// Replace the common options (after an options update).
    pub fn set_options(&mut self, options: BaseOptions) {
        self.options = options;
        if self.options.accessibility.enabled && self.state != ChartState::Destroyed {
            let label = self.aria_label();
            self.env.document.set_attr(&self.container, "aria-label", label);
        }
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ChartState::Destroyed
    }

    pub fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(ChartError::DestroyedChart(self.container.clone()));
        }
        Ok(())
    }

    /// The container must exist and be connected.
    pub fn validate_container(&self) -> Result<()> {
        let connected = self
            .env
            .document
            .with_element(&self.container, |e| e.connected)
            .unwrap_or(false);
        if connected {
            Ok(())
        } else {
            Err(ChartError::ContainerNotFound(self.container.clone()))
        }
    }

    /// Surface size: fixed `width`/`height` options, else the container size.
    pub fn size(&self) -> (f64, f64) {
        let (cw, ch) = self
            .env
            .document
            .element_size(&self.container)
            .unwrap_or((0.0, 0.0));
        (
            self.options.width.unwrap_or(cw).max(0.0),
            self.options.height.unwrap_or(ch).max(0.0),
        )
    }

    /// Plot area inside the margins.
    pub fn inner_size(&self) -> (f64, f64) {
        let (w, h) = self.size();
        let m = &self.options.margin;
        ((w - m.left - m.right).max(0.0), (h - m.top - m.bottom).max(0.0))
    }

    /// Plot area inside the margins, minus the band a legend reserves.
    pub fn plot_area(&self, legend: Option<&LegendLayout>) -> PlotArea {
        let (w, h) = self.inner_size();
        let m = &self.options.margin;
        let mut area = PlotArea {
            x: m.left,
            y: m.top,
            width: w,
            height: h,
        };
        if let Some(l) = legend.filter(|l| !l.items.is_empty()) {
            match l.position {
                LegendPosition::Top => {
                    area.y += l.height;
                    area.height -= l.height;
                }
                LegendPosition::Bottom => area.height -= l.height,
                LegendPosition::Left => {
                    area.x += l.width;
                    area.width -= l.width;
                }
                LegendPosition::Right => area.width -= l.width,
            }
        }
        area.width = area.width.max(0.0);
        area.height = area.height.max(0.0);
        area
    }

    /// The chart's theme: its `theme` option, else the registry's current theme.
    pub fn theme(&self) -> Theme {
        self.env.themes.get(self.options.theme.as_deref())
    }

    /// Color `index` of palette `category`, wrapping.
    pub fn get_color(&self, index: usize, category: &str) -> String {
        self.theme().color(index, category)
    }

    pub fn duration_ms(&self) -> f64 {
        self.options.animation.duration_ms.max(0.0)
    }

    pub fn easing(&self) -> Easing {
        self.options.animation.easing
    }

    pub fn locale(&self) -> &str {
        &self.options.locale
    }

    /// Start a drawing pass: a fresh surface replaces the container content and pending tweens are dropped.
    pub fn begin_render(&mut self) -> Result<SharedSurface> {
        self.ensure_alive()?;
        self.validate_container()?;
        self.invalidation.dirty.set(false);
        self.animator.cancel();
        self.tooltip = None;
        let (w, h) = self.size();
        let surface = Rc::new(RefCell::new(Surface::new(w, h)));
        {
            let mut s = surface.borrow_mut();
            let root = s.root();
            s.set_attr(root, "class", format!("chart-surface {}-chart", self.chart_type));
            s.set_attr(root, "role", "presentation");
        }
        self.env
            .document
            .set_content(&self.container, Content::Surface(Rc::clone(&surface)));
        self.surface = Some(Rc::clone(&surface));
        self.state = ChartState::Sized;
        Ok(surface)
    }

    /// Close a drawing pass. Data and drawing errors become panels; lifecycle errors propagate.
    pub fn conclude(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.state = ChartState::Drawn;
                if self.duration_ms() <= 0.0 {
                    self.settle();
                }
                self.state = ChartState::Interactive;
                Ok(())
            }
            Err(e @ (ChartError::ContainerNotFound(_) | ChartError::DestroyedChart(_))) => Err(e),
            Err(ChartError::InvalidData(msg)) => {
                debug!("#{}: {msg}", self.container);
                self.show_empty(NO_DATA_MESSAGE);
                Ok(())
            }
            Err(e) => {
                warn!("#{} failed to render: {e}", self.container);
                self.show_error(RENDER_FAILURE_MESSAGE);
                Ok(())
            }
        }
    }

    pub fn surface(&self) -> Option<SharedSurface> {
        self.surface.clone()
    }

    pub fn svg(&self) -> Option<String> {
        self.surface.as_ref().map(|s| s.borrow().to_svg())
    }

    fn show_panel(&mut self, kind: PanelKind, message: &str) {
        if self.is_destroyed() {
            return;
        }
        self.animator.cancel();
        self.surface = None;
        self.tooltip = None;
        let (width, height) = self
            .env
            .document
            .element_size(&self.container)
            .unwrap_or((0.0, 0.0));
        self.env.document.set_content(
            &self.container,
            Content::Panel(Panel {
                kind,
                message: message.to_string(),
                width,
                height,
            }),
        );
        self.state = ChartState::Drawn;
    }

    pub fn show_empty(&mut self, message: &str) {
        self.show_panel(PanelKind::Empty, message);
    }

    pub fn show_error(&mut self, message: &str) {
        self.show_panel(PanelKind::Error, message);
    }

    pub fn show_loading(&mut self, message: &str) {
        self.show_panel(PanelKind::Loading, message);
    }

    /// Centered title at `margin.top / 2`.
    pub fn draw_title(&self, surface: &mut Surface, theme: &Theme) -> Option<NodeId> {
        let title = self.options.title.as_deref().filter(|t| !t.is_empty())?;
        let (w, _) = self.size();
        let root = surface.root();
        Some(surface.text(
            root,
            title,
            [
                ("class", "chart-title".to_string()),
                ("x", num(w / 2.0)),
                ("y", num(self.options.margin.top / 2.0)),
                ("dy", "0.35em".to_string()),
                ("text-anchor", "middle".to_string()),
                ("font-size", num(TITLE_FONT_PX)),
                ("font-weight", "bold".to_string()),
                ("fill", theme.text.clone()),
            ],
        ))
    }

    /// Legend layout for the current container width.
    pub fn layout_legend(&self, items: &[LegendItem], position: LegendPosition) -> LegendLayout {
        let (w, _) = self.size();
        legend::layout(items, position, w)
    }

    pub fn draw_legend(&self, surface: &mut Surface, layout: &LegendLayout, theme: &Theme) -> Vec<NodeId> {
        let (w, h) = self.size();
        let origin = legend::origin(layout, w, h, &self.options.margin);
        let root = surface.root();
        legend::draw(surface, root, layout, origin, &theme.text)
    }

    /// Queue a tween with the chart's animation timing.
    pub fn animate(&mut self, node: NodeId, attr: &str, value: TweenValue, delay_ms: f64) {
        let tween = Tween::new(node, attr, value).timing(self.duration_ms(), delay_ms, self.easing());
        self.animator.schedule(tween);
    }

    /// Queue a tween with explicit timing.
    pub fn schedule(&mut self, tween: Tween) {
        self.animator.schedule(tween);
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn advance(&mut self, ms: f64) {
        if let Some(surface) = &self.surface {
            self.animator.advance(ms, &mut surface.borrow_mut());
        }
    }

    /// Jump every running tween to its end state.
    pub fn settle(&mut self) {
        if let Some(surface) = &self.surface {
            self.animator.finish(&mut surface.borrow_mut());
        }
    }

    pub fn is_idle(&self) -> bool {
        self.animator.is_idle()
    }

    /// Announce a data update through the live region.
    pub fn announce_update(&self, items: usize) {
        let a11y = &self.options.accessibility;
        if a11y.enabled && a11y.announce_changes {
            self.env
                .document
                .announce(format!("Chart data updated with {items} items"));
        }
    }

    /// Emit `name` on the document with `chart` (the container id) merged into `detail`.
    pub fn emit(&self, name: &str, detail: Value) {
        let mut payload = match detail {
            Value::Object(m) => m,
            other => {
                let mut m = Map::new();
                m.insert("data".to_string(), other);
                m
            }
        };
        payload.insert("chart".to_string(), json!(self.container));
        payload.insert("chartType".to_string(), json!(self.chart_type));
        self.env.document.events().emit(name, Value::Object(payload));
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn set_tooltip(&mut self, tooltip: Option<Tooltip>) {
        self.tooltip = tooltip;
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Option<usize>) {
        self.focus = focus;
    }

    /// Keyboard navigation over `count` primary elements.
    pub fn navigate(&mut self, key: Key, count: usize) -> Option<Navigation> {
        if count == 0 {
            return None;
        }
        match key {
            Key::Enter | Key::Space => self.focus.filter(|i| *i < count).map(Navigation::Activate),
            Key::ArrowRight => {
                let next = self.focus.map_or(0, |i| (i + 1) % count);
                self.focus = Some(next);
                Some(Navigation::Focus(next))
            }
            Key::ArrowLeft => {
                let prev = self.focus.map_or(count - 1, |i| (i + count - 1) % count);
                self.focus = Some(prev);
                Some(Navigation::Focus(prev))
            }
            Key::Escape => {
                self.focus = None;
                Some(Navigation::Blur)
            }
        }
    }

    /// PNG or JPEG bytes of the current surface on the theme background.
    pub fn export_image(&self, format: ImageFormat) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| ChartError::Export("nothing has been drawn".into()))?;
        let background = Rgb::parse(&self.theme().background);
        raster::encode(&surface.borrow(), format, background)
    }

    /// Whether a theme change or resize asked for a re-render.
    pub fn is_invalidated(&self) -> bool {
        self.invalidation.dirty.get()
    }

    /// Release observers, listeners, content and animations. Idempotent.
    pub fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.animator.cancel();
        self.subscriptions.clear();
        let doc = Rc::clone(&self.env.document);
        for id in self.listeners.drain(..) {
            doc.remove_listener(id);
        }
        if doc.contains(&self.container) {
            doc.clear_content(&self.container);
            doc.remove_attr(&self.container, "tabindex");
            doc.remove_attr(&self.container, "role");
            doc.remove_attr(&self.container, "aria-label");
        }
        *self.invalidation.owner.borrow_mut() = None;
        self.surface = None;
        self.tooltip = None;
        self.focus = None;
        self.state = ChartState::Destroyed;
        debug!("{} chart on #{} destroyed", self.chart_type, self.container);
    }
}

impl Drop for ChartBase {
    fn drop(&mut self) {
        // listeners live in the shared document; subscriptions clean themselves up
        let doc = Rc::clone(&self.env.document);
        for id in self.listeners.drain(..) {
            doc.remove_listener(id);
        }
    }
}

/// The uniform chart contract.
///
/// Public methods fail with [`ChartError::DestroyedChart`] after [`Chart::destroy`];
/// queries and `destroy` itself stay usable.
pub trait Chart: Any {
    fn base(&self) -> &ChartBase;
    fn base_mut(&mut self) -> &mut ChartBase;

    /// Normalize and store `payload`, render it and announce the update.
    fn set_data(&mut self, payload: &Value) -> Result<()>;

    /// Draw the stored data.
    fn render(&mut self) -> Result<()>;

    /// Number of normalized records currently held.
    fn record_count(&self) -> usize;

    /// The normalized data as JSON (indent 2), CSV or TSV.
    fn export_data(&self, format: DataFormat) -> Result<String>;

    /// Current options (defaults merged with the caller's) as JSON.
    fn options_json(&self) -> Value;

    /// Merge `patch` onto the current options and re-render.
    fn update_options(&mut self, patch: &Value) -> Result<()>;

    /// Hover over primary element `index`.
    fn hover_item(&mut self, index: usize) -> Result<Option<Tooltip>>;

    /// Primary interaction (click) on element `index`.
    fn click_item(&mut self, index: usize) -> Result<()>;

    /// Pointer moved to surface coordinates; charts with an overlay override this.
    fn pointer_move(&mut self, _x: f64, _y: f64) -> Result<Option<Tooltip>> {
        self.base().ensure_alive()?;
        Ok(None)
    }

    fn pointer_leave(&mut self) -> Result<()> {
        self.base().ensure_alive()?;
        self.base_mut().set_tooltip(None);
        Ok(())
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        self.base().ensure_alive()?;
        let count = self.record_count();
        match self.base_mut().navigate(key, count) {
            Some(Navigation::Activate(i)) => self.click_item(i),
            Some(Navigation::Focus(i)) => self.hover_item(i).map(|_| ()),
            Some(Navigation::Blur) => self.pointer_leave(),
            None => Ok(()),
        }
    }

    fn chart_type(&self) -> &'static str {
        self.base().chart_type()
    }

    fn state(&self) -> ChartState {
        self.base().state()
    }

    fn tooltip(&self) -> Option<Tooltip> {
        self.base().tooltip().cloned()
    }

    fn svg(&self) -> Option<String> {
        self.base().svg()
    }

    /// Advance animations by `ms` (one host animation frame or more).
    fn advance(&mut self, ms: f64) -> Result<()> {
        self.base().ensure_alive()?;
        self.base_mut().advance(ms);
        Ok(())
    }

    /// Finish all animations.
    fn settle(&mut self) -> Result<()> {
        self.base().ensure_alive()?;
        self.base_mut().settle();
        Ok(())
    }

    /// Re-render if a theme change or resize is pending.
    fn refresh(&mut self) -> Result<()> {
        if self.base().is_destroyed() || !self.base().is_invalidated() {
            return Ok(());
        }
        self.render()
    }

    /// Make `name` the current theme and re-render. Unknown names change nothing.
    fn set_theme(&mut self, name: &str) -> Result<bool> {
        self.base().ensure_alive()?;
        let themes = Rc::clone(self.base().themes());
        if !themes.set_current(name) {
            return Ok(false);
        }
        if self.base().options().theme.is_some() {
            let mut opts = self.base().options().clone();
            opts.theme = Some(name.to_string());
            self.base_mut().set_options(opts);
        }
        self.render()?;
        Ok(true)
    }

    fn show_loading(&mut self, message: &str) -> Result<()> {
        self.base().ensure_alive()?;
        self.base_mut().show_loading(message);
        Ok(())
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        self.base().ensure_alive()?;
        self.base_mut().show_error(message);
        Ok(())
    }

    fn export_image(&self, format: ImageFormat) -> Result<Vec<u8>> {
        self.base().export_image(format)
    }

    fn destroy(&mut self) {
        self.base_mut().destroy();
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(id: &str) -> ChartEnv {
        let env = ChartEnv::default();
        env.document.add_container(id, 400.0, 300.0);
        env
    }

    #[test]
    fn missing_or_detached_container_is_rejected() {
        let env = ChartEnv::default();
        let err = ChartBase::new(env.clone(), "nope", "pie", BaseOptions::default()).err();
        assert!(matches!(err, Some(ChartError::ContainerNotFound(_))));
        env.document.add_container("gone", 10.0, 10.0);
        env.document.disconnect("gone");
        assert!(ChartBase::new(env, "gone", "pie", BaseOptions::default()).is_err());
    }

    #[test]
    fn binding_sets_aria_and_listeners() {
        let env = env_with("c");
        let base = ChartBase::new(env.clone(), "c", "bar", BaseOptions::default()).unwrap();
        let doc = &env.document;
        assert_eq!(doc.attr("c", "role").as_deref(), Some("img"));
        assert_eq!(doc.attr("c", "tabindex").as_deref(), Some("0"));
        assert!(doc.has_listener("c", "keydown"));
        assert_eq!(env.responsive.observer_count("c"), 1);
        assert_eq!(base.state(), ChartState::Validated);
    }

    #[test]
    fn destroy_releases_everything() {
        let env = env_with("c");
        let mut base = ChartBase::new(env.clone(), "c", "bar", BaseOptions::default()).unwrap();
        base.begin_render().unwrap();
        assert_eq!(env.document.surface_count("c"), 1);
        let subscribers = env.document.events().subscriber_count();
        base.destroy();
        assert_eq!(env.document.listener_count("c"), 0);
        assert_eq!(env.responsive.observer_count("c"), 0);
        assert_eq!(env.document.events().subscriber_count(), subscribers - 1);
        assert_eq!(env.document.surface_count("c"), 0);
        assert!(env.document.attr("c", "tabindex").is_none());
        assert!(matches!(base.begin_render(), Err(ChartError::DestroyedChart(_))));
        base.destroy();
    }

    #[test]
    fn fixed_size_overrides_container() {
        let env = env_with("c");
        let opts = BaseOptions {
            width: Some(640.0),
            ..BaseOptions::default()
        };
        let base = ChartBase::new(env, "c", "line", opts).unwrap();
        assert_eq!(base.size(), (640.0, 300.0));
        assert_eq!(base.inner_size(), (640.0 - 70.0, 300.0 - 80.0));
    }

    #[test]
    fn panels_keep_container_size() {
        let env = env_with("c");
        let mut base = ChartBase::new(env.clone(), "c", "pie", BaseOptions::default()).unwrap();
        base.conclude(Err(ChartError::InvalidData("empty".into()))).unwrap();
        let panel = env.document.panel("c").unwrap();
        assert_eq!(panel.kind, PanelKind::Empty);
        assert_eq!((panel.width, panel.height), (400.0, 300.0));
        base.conclude(Err(ChartError::RenderFailure("boom".into()))).unwrap();
        assert_eq!(env.document.panel("c").unwrap().message, RENDER_FAILURE_MESSAGE);
    }

    #[test]
    fn navigation_wraps() {
        let env = env_with("c");
        let mut base = ChartBase::new(env, "c", "pie", BaseOptions::default()).unwrap();
        assert_eq!(base.navigate(Key::Enter, 3), None);
        assert_eq!(base.navigate(Key::ArrowLeft, 3), Some(Navigation::Focus(2)));
        assert_eq!(base.navigate(Key::ArrowRight, 3), Some(Navigation::Focus(0)));
        assert_eq!(base.navigate(Key::Space, 3), Some(Navigation::Activate(0)));
        assert_eq!(base.navigate(Key::Escape, 3), Some(Navigation::Blur));
    }

    #[test]
    fn theme_change_marks_chart_invalid() {
        let env = env_with("c");
        let base = ChartBase::new(env.clone(), "c", "pie", BaseOptions::default()).unwrap();
        assert!(!base.is_invalidated());
        env.themes.set_current("dark");
        assert!(base.is_invalidated());
    }

    #[test]
    fn emitted_events_carry_the_chart() {
        let env = env_with("c");
        let base = ChartBase::new(env.clone(), "c", "bar", BaseOptions::default()).unwrap();
        base.emit("barClick", json!({"data": {"label": "a"}}));
        let ev = env.document.events().events_named("barClick");
        assert_eq!(ev[0].detail["chart"], "c");
        assert_eq!(ev[0].detail["data"]["label"], "a");
    }
}
