//! Event timeline: a zoomable main panel over a brushable context strip.
//!
//! Main-panel positions derive from one [`ZoomTransform`] applied to the
//! context scale; a brush selection is converted into the equivalent
//! transform, so brushing and zooming always agree on the visible window.

use ahash::AHashMap;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;

use super::{export, log_normalized, merge_options};
use crate::error::{ChartError, Result};
use crate::models::{Normalized, Severity, TimelineEvent};
use crate::normalize;
use crate::registry::ChartRegistry;
use crate::storage::Table;
use crate::viz::anim::Tween;
use crate::viz::axis::{self, AxisSide};
use crate::viz::base::{Chart, ChartBase, ChartEnv, PlotArea, Tooltip};
use crate::viz::legend::LegendItem;
use crate::viz::options::{BaseOptions, ChartOptions, LegendOptions, TooltipOptions, lenient, resolve};
use crate::viz::scale::{BandScale, TimeScale, format_time};
use crate::viz::scene::{NodeId, Surface, num, translate};
use crate::viz::types::{ColorBy, DataFormat, GroupBy};
use crate::viz::zoom::{ZoomBehavior, ZoomTransform};

pub const CHART_TYPE: &str = "timeline";
pub const EVENT_CLICK_EVENT: &str = "timelineEventClick";
/// Width of the stacking buckets when events are not grouped.
pub const BUCKET_MS: f64 = 60_000.0;
pub const BRUSH_TRANSITION_MS: f64 = 300.0;
pub const ZOOM_TRANSITION_MS: f64 = 300.0;
pub const RESET_TRANSITION_MS: f64 = 750.0;
pub const ZOOM_EXTENT: (f64, f64) = (1.0, 50.0);
const ZOOM_STEP: f64 = 2.0;
const CONTEXT_GAP: f64 = 30.0;
const X_TICKS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushOptions {
    pub enabled: bool,
    /// Height of the context panel.
    pub height: f64,
}

impl Default for BrushOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            height: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineZoomOptions {
    pub enabled: bool,
}

impl Default for TimelineZoomOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineOptions {
    #[serde(flatten)]
    pub base: BaseOptions,
    pub event_height: f64,
    pub event_padding: f64,
    #[serde(deserialize_with = "lenient")]
    pub group_by: GroupBy,
    #[serde(deserialize_with = "lenient")]
    pub color_by: ColorBy,
    pub brush: BrushOptions,
    pub zoom: TimelineZoomOptions,
    pub time_format: String,
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            base: BaseOptions::default(),
            event_height: 20.0,
            event_padding: 2.0,
            group_by: GroupBy::None,
            color_by: ColorBy::Category,
            brush: BrushOptions::default(),
            zoom: TimelineZoomOptions::default(),
            time_format: "%Y-%m-%d %H:%M:%S".to_string(),
            legend: LegendOptions::default(),
            tooltip: TooltipOptions::default(),
        }
    }
}

impl ChartOptions for TimelineOptions {
    fn base(&self) -> &BaseOptions {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }
}

#[derive(Debug, Clone)]
struct Layout {
    /// Main panel, surface coordinates.
    main: PlotArea,
    /// Context panel top, relative to the main panel origin.
    context_top: Option<f64>,
    full: TimeScale,
    groups: Option<BandScale>,
}

#[derive(Debug, Default)]
struct Nodes {
    plot: Option<NodeId>,
    x_axis: Option<NodeId>,
    selection: Option<NodeId>,
    events: Vec<NodeId>,
}

pub struct TimelineChart {
    base: ChartBase,
    options: TimelineOptions,
    data: Normalized<Vec<TimelineEvent>>,
    categories: Vec<String>,
    layout: Option<Layout>,
    zoom: ZoomBehavior,
    nodes: Nodes,
    /// Final `(x, y)` of each event's marker center in main-panel coordinates.
    positions: Vec<(f64, f64)>,
    hovered: Option<usize>,
}

/// Row of each event within its one-minute bucket, events in timestamp order.
pub fn bucket_rows(events: &[TimelineEvent]) -> Vec<usize> {
    let mut seen: AHashMap<i64, usize> = AHashMap::new();
    events
        .iter()
        .map(|e| {
            let bucket = (e.timestamp.timestamp_millis() as f64 / BUCKET_MS).floor() as i64;
            let row = seen.entry(bucket).or_insert(0);
            let current = *row;
            *row += 1;
            current
        })
        .collect()
}

impl TimelineChart {
    pub(crate) fn new(env: ChartEnv, container: &str, options: &Value) -> Result<Self> {
        let options: TimelineOptions = resolve(options)?;
        let base = ChartBase::new(env, container, CHART_TYPE, options.base.clone())?;
        Ok(Self {
            base,
            options,
            data: Normalized {
                records: Vec::new(),
                rejected: 0,
                anomalies: Vec::new(),
            },
            categories: Vec::new(),
            layout: None,
            zoom: ZoomBehavior::new(ZOOM_EXTENT, 0.0, 0.0),
            nodes: Nodes::default(),
            positions: Vec::new(),
            hovered: None,
        })
    }

    pub fn options(&self) -> &TimelineOptions {
        &self.options
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.data.records
    }

    pub fn zoom_transform(&self) -> ZoomTransform {
        self.zoom.transform()
    }

    /// Full data extent in epoch milliseconds.
    pub fn full_domain(&self) -> Option<(f64, f64)> {
        self.layout.as_ref().map(|l| l.full.domain())
    }

    /// Visible main-panel domain in epoch milliseconds.
    pub fn main_domain(&self) -> Option<(f64, f64)> {
        self.main_scale().map(|s| s.domain())
    }

    /// Brush extent in context-panel pixels; `None` while the full range is shown.
    pub fn brush_selection(&self) -> Option<(f64, f64)> {
        let layout = self.layout.as_ref()?;
        if self.zoom.transform().is_identity() {
            return None;
        }
        let (d0, d1) = self.main_domain()?;
        Some((layout.full.apply(d0), layout.full.apply(d1)))
    }

    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }

    fn main_scale(&self) -> Option<TimeScale> {
        self.layout.as_ref().map(|l| self.zoom.transform().rescale_time(&l.full))
    }

    fn color(&self, event: &TimelineEvent) -> String {
        let category = || {
            let i = self.categories.iter().position(|c| *c == event.category).unwrap_or(0);
            self.base.get_color(i, "categorical")
        };
        match self.options.color_by {
            ColorBy::Category => category(),
            ColorBy::Severity => event.severity.color().to_string(),
            ColorBy::Event => event.color.clone().unwrap_or_else(category),
        }
    }

    fn group_key(&self, event: &TimelineEvent) -> Option<String> {
        match self.options.group_by {
            GroupBy::None => None,
            GroupBy::Category => Some(event.category.clone()),
            GroupBy::Severity => Some(event.severity.as_str().to_string()),
        }
    }

    fn group_keys(&self) -> Vec<String> {
        match self.options.group_by {
            GroupBy::None => Vec::new(),
            GroupBy::Category => {
                let mut keys = self.categories.clone();
                normalize::sort_keys(&mut keys);
                keys
            }
            GroupBy::Severity => {
                let mut present: Vec<Severity> = self.data.records.iter().map(|e| e.severity).collect();
                present.sort();
                present.dedup();
                present.into_iter().map(|s| s.as_str().to_string()).collect()
            }
        }
    }

    fn legend_items(&self) -> Vec<LegendItem> {
        match self.options.color_by {
            ColorBy::Severity => {
                let mut present: Vec<Severity> = self.data.records.iter().map(|e| e.severity).collect();
                present.sort();
                present.dedup();
                present
                    .into_iter()
                    .map(|s| LegendItem::new(s.as_str(), s.color()))
                    .collect()
            }
            _ => self
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| LegendItem::new(c.clone(), self.base.get_color(i, "categorical")))
                .collect(),
        }
    }

    /// Marker centers for the current main scale.
    fn compute_positions(&self, layout: &Layout, x: &TimeScale) -> Vec<(f64, f64)> {
        let eh = self.options.event_height;
        let stride = eh + self.options.event_padding;
        let height = layout.main.height;
        let rows = bucket_rows(&self.data.records);
        self.data
            .records
            .iter()
            .zip(rows)
            .map(|(e, row)| {
                let top = match (&layout.groups, self.group_key(e)) {
                    (Some(band), Some(key)) => {
                        band.position(&key).unwrap_or(0.0) + (band.bandwidth() - eh).max(0.0) / 2.0
                    }
                    _ => height - (row + 1) as f64 * stride,
                };
                (x.apply_time(&e.timestamp), top + eh / 2.0)
            })
            .collect()
    }

    fn build_layout(&self, area: PlotArea) -> Layout {
        let events = &self.data.records;
        let first = events.first().map_or(0.0, |e| e.timestamp.timestamp_millis() as f64);
        let last = events.last().map_or(0.0, |e| e.timestamp.timestamp_millis() as f64);
        let domain = if last > first {
            (first, last)
        } else {
            (first - BUCKET_MS / 2.0, first + BUCKET_MS / 2.0)
        };
        let (main_height, context_top) = if self.options.brush.enabled {
            let h = (area.height - self.options.brush.height - CONTEXT_GAP).max(0.0);
            (h, Some(h + CONTEXT_GAP))
        } else {
            (area.height, None)
        };
        let main = PlotArea {
            height: main_height,
            ..area
        };
        let groups = (self.options.group_by != GroupBy::None)
            .then(|| BandScale::new(self.group_keys(), (0.0, main_height)).padding(0.1));
        Layout {
            main,
            context_top,
            full: TimeScale::new(domain, (0.0, area.width)),
            groups,
        }
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        if self.data.records.is_empty() {
            return Err(ChartError::InvalidData("no timeline events".into()));
        }
        let theme = self.base.theme();
        self.base.draw_title(surface, &theme);
        let legend = (self.options.legend.show && self.options.color_by != ColorBy::Event)
            .then(|| self.base.layout_legend(&self.legend_items(), self.options.legend.position));
        let layout = self.build_layout(self.base.plot_area(legend.as_ref()));
        let main = layout.main;
        let previous = self.zoom.transform();
        self.zoom = ZoomBehavior::new(ZOOM_EXTENT, main.width, main.height)
            .with_translate_extent([(0.0, 0.0), (main.width, main.height)]);
        self.zoom.set(previous);
        let x = self.zoom.transform().rescale_time(&layout.full);

        let root = surface.root();
        let clip_id = format!("timeline-clip-{}", self.base.container());
        let defs = surface.element(root, "defs", [("class", "timeline-defs")]);
        let clip = surface.element(defs, "clipPath", [("id", clip_id.clone())]);
        surface.element(clip, "rect", [("width", num(main.width)), ("height", num(main.height))]);
        let plot = surface.element(
            root,
            "g",
            [("class", "plot".to_string()), ("transform", translate(main.x, main.y))],
        );
        let events_g = surface.element(
            plot,
            "g",
            [("class", "events".to_string()), ("clip-path", format!("url(#{clip_id})"))],
        );

        let positions = self.compute_positions(&layout, &x);
        let duration = self.base.duration_ms();
        let easing = self.base.easing();
        let radius = num(self.options.event_height / 2.0);
        self.nodes.events.clear();
        for (i, (event, (cx, cy))) in self.data.records.iter().zip(&positions).enumerate() {
            let node = surface.element(
                events_g,
                "circle",
                [
                    ("class", format!("event-marker severity-{}", event.severity)),
                    ("cx", num(*cx)),
                    ("cy", num(*cy)),
                    ("r", radius.clone()),
                    ("fill", self.color(event)),
                    ("stroke", theme.background.clone()),
                    ("opacity", "0".to_string()),
                    ("data-index", i.to_string()),
                ],
            );
            self.base
                .schedule(Tween::number(node, "opacity", 0.0, 1.0).timing(duration, 0.0, easing));
            self.nodes.events.push(node);
        }

        self.nodes.x_axis = Some(axis::draw(
            surface,
            plot,
            AxisSide::Bottom,
            (0.0, main.width),
            &axis::time_ticks(&x, X_TICKS),
            (0.0, main.height),
            &theme.text,
        ));
        if let Some(groups) = &layout.groups {
            axis::draw(surface, plot, AxisSide::Left, (0.0, main.height), &axis::band_ticks(groups), (0.0, 0.0), &theme.text);
        }

        self.nodes.selection = None;
        if let Some(top) = layout.context_top {
            self.draw_context(surface, plot, &layout, top, &theme.text, &theme.accent);
        }
        if self.options.zoom.enabled {
            self.draw_zoom_controls(surface, plot, main.width, &theme.text, &theme.grid);
        }
        if let Some(legend) = &legend {
            self.base.draw_legend(surface, legend, &theme);
        }

        self.nodes.plot = Some(plot);
        self.positions = positions;
        self.layout = Some(layout);
        self.hovered = None;
        self.sync_selection(surface);
        Ok(())
    }

    fn draw_context(&self, surface: &mut Surface, plot: NodeId, layout: &Layout, top: f64, text: &str, accent: &str) {
        let height = self.options.brush.height;
        let width = layout.main.width;
        let g = surface.element(plot, "g", [("class", "context".to_string()), ("transform", translate(0.0, top))]);
        for e in &self.data.records {
            let x = num(layout.full.apply_time(&e.timestamp));
            surface.element(
                g,
                "line",
                [
                    ("class", "context-event".to_string()),
                    ("x1", x.clone()),
                    ("x2", x),
                    ("y1", "0".to_string()),
                    ("y2", num(height)),
                    ("stroke", self.color(e)),
                    ("stroke-opacity", "0.5".to_string()),
                ],
            );
        }
        axis::draw(surface, g, AxisSide::Bottom, (0.0, width), &axis::time_ticks(&layout.full, X_TICKS), (0.0, height), text);
        let brush = surface.element(g, "g", [("class", "brush")]);
        surface.element(
            brush,
            "rect",
            [
                ("class", "overlay".to_string()),
                ("width", num(width)),
                ("height", num(height)),
                ("fill", "none".to_string()),
                ("pointer-events", "all".to_string()),
            ],
        );
        // Node id is recorded by the caller through `sync_selection`.
        surface.element(
            brush,
            "rect",
            [
                ("class", "selection".to_string()),
                ("x", "0".to_string()),
                ("width", "0".to_string()),
                ("height", num(height)),
                ("fill", accent.to_string()),
                ("fill-opacity", "0.3".to_string()),
                ("display", "none".to_string()),
            ],
        );
    }

    fn draw_zoom_controls(&self, surface: &mut Surface, plot: NodeId, width: f64, text: &str, border: &str) {
        let g = surface.element(
            plot,
            "g",
            [("class", "zoom-controls".to_string()), ("transform", translate(width - 84.0, 4.0))],
        );
        for (i, (class, label)) in [("zoom-in", "+"), ("zoom-out", "−"), ("zoom-reset", "⟲")].into_iter().enumerate() {
            let button = surface.element(
                g,
                "g",
                [("class", format!("zoom-button {class}")), ("transform", translate(i as f64 * 28.0, 0.0))],
            );
            surface.element(
                button,
                "rect",
                [("width", "24"), ("height", "24"), ("rx", "3"), ("fill", "none"), ("stroke", border)],
            );
            surface.text(
                button,
                label,
                [("x", "12"), ("y", "12"), ("dy", "0.35em"), ("text-anchor", "middle"), ("fill", text)],
            );
        }
    }

    /// Mirror the visible window onto the context brush.
    fn sync_selection(&mut self, surface: &mut Surface) {
        if self.nodes.selection.is_none() {
            self.nodes.selection = surface.find_by_class("selection").first().copied();
        }
        let Some(node) = self.nodes.selection else {
            return;
        };
        match self.brush_selection() {
            Some((s0, s1)) => {
                surface.set_attr(node, "x", num(s0));
                surface.set_attr(node, "width", num(s1 - s0));
                surface.remove_attr(node, "display");
            }
            None => surface.set_attr(node, "display", "none"),
        }
    }

    /// Move markers and the main axis to the current transform, tweening over `duration_ms`.
    fn reposition(&mut self, duration_ms: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let (Some(layout), Some(surface), Some(plot)) = (self.layout.clone(), self.base.surface(), self.nodes.plot) else {
            return Ok(());
        };
        let x = self.zoom.transform().rescale_time(&layout.full);
        let positions = self.compute_positions(&layout, &x);
        let easing = self.base.easing();
        let theme = self.base.theme();
        let mut s = surface.borrow_mut();
        for (node, (new_x, _)) in self.nodes.events.iter().zip(&positions) {
            let from = s.attr_f64(*node, "cx").unwrap_or(*new_x);
            if duration_ms > 0.0 {
                self.base
                    .schedule(Tween::number(*node, "cx", from, *new_x).timing(duration_ms, 0.0, easing));
            } else {
                s.set_attr(*node, "cx", num(*new_x));
            }
        }
        if let Some(old) = self.nodes.x_axis.take() {
            s.remove(old);
        }
        self.nodes.x_axis = Some(axis::draw(
            &mut s,
            plot,
            AxisSide::Bottom,
            (0.0, layout.main.width),
            &axis::time_ticks(&x, X_TICKS),
            (0.0, layout.main.height),
            &theme.text,
        ));
        self.positions = positions;
        self.sync_selection(&mut s);
        Ok(())
    }

    /// Select `[x0, x1]` (context pixels) as the main window; `None` clears the brush.
    pub fn brush(&mut self, selection: Option<(f64, f64)>) -> Result<()> {
        self.base.ensure_alive()?;
        if !self.options.brush.enabled {
            return Ok(());
        }
        match selection {
            Some((a, b)) if (b - a).abs() > f64::EPSILON => {
                let (s0, s1) = if a < b { (a, b) } else { (b, a) };
                let k = self.zoom_width() / (s1 - s0);
                self.zoom.set(ZoomTransform::new(k, -s0 * k, 0.0));
            }
            _ => {
                self.zoom.reset();
            }
        }
        self.reposition(BRUSH_TRANSITION_MS)
    }

    fn zoom_width(&self) -> f64 {
        self.layout.as_ref().map_or(0.0, |l| l.main.width)
    }

    fn zoom_center(&self) -> (f64, f64) {
        self.layout
            .as_ref()
            .map_or((0.0, 0.0), |l| (l.main.width / 2.0, l.main.height / 2.0))
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.zoom_by(1.0 / ZOOM_STEP)
    }

    fn zoom_by(&mut self, factor: f64) -> Result<()> {
        self.base.ensure_alive()?;
        if !self.options.zoom.enabled {
            return Ok(());
        }
        let center = self.zoom_center();
        self.zoom.scale_by(factor, center);
        self.reposition(ZOOM_TRANSITION_MS)
    }

    pub fn reset_zoom(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        self.zoom.reset();
        self.reposition(RESET_TRANSITION_MS)
    }

    /// Wheel over the main panel at surface point `(x, y)`.
    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let Some(main) = self.layout.as_ref().map(|l| l.main) else {
            return Ok(());
        };
        if !self.options.zoom.enabled || !main.contains(x, y) {
            return Ok(());
        }
        self.zoom.wheel(delta_y, (x - main.x, y - main.y));
        self.reposition(0.0)
    }

    pub fn pan(&mut self, dx: f64) -> Result<()> {
        self.base.ensure_alive()?;
        if !self.options.zoom.enabled {
            return Ok(());
        }
        self.zoom.pan(dx, 0.0);
        self.reposition(0.0)
    }

    fn highlight(&mut self, index: Option<usize>) {
        self.hovered = index;
        let Some(surface) = self.base.surface() else {
            return;
        };
        let r = self.options.event_height / 2.0;
        let mut s = surface.borrow_mut();
        for (i, node) in self.nodes.events.iter().enumerate() {
            let radius = if Some(i) == index { r * 1.3 } else { r };
            s.set_attr(*node, "r", num(radius));
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Topmost event marker under surface point `(x, y)`.
    pub fn event_at(&self, x: f64, y: f64) -> Option<usize> {
        let main = self.layout.as_ref()?.main;
        if !main.contains(x, y) {
            return None;
        }
        let (px, py) = (x - main.x, y - main.y);
        let r = self.options.event_height / 2.0;
        self.positions
            .iter()
            .rposition(|(cx, cy)| (cx - px).hypot(cy - py) <= r)
    }

    fn export_table(&self) -> Table {
        let mut t = Table::new(["timestamp", "event", "category", "severity", "description"]);
        for e in &self.data.records {
            t.push(vec![
                e.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
                e.event.as_str().into(),
                e.category.as_str().into(),
                e.severity.as_str().into(),
                e.description.clone().into(),
            ]);
        }
        t
    }
}

impl Chart for TimelineChart {
    fn base(&self) -> &ChartBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChartBase {
        &mut self.base
    }

    fn set_data(&mut self, payload: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.data = normalize::timeline(payload);
        log_normalized(CHART_TYPE, &self.data);
        self.categories.clear();
        for e in &self.data.records {
            if !self.categories.contains(&e.category) {
                self.categories.push(e.category.clone());
            }
        }
        self.zoom.reset();
        self.render()?;
        self.base.announce_update(self.data.records.len());
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let surface = self.base.begin_render()?;
        let result = self.draw(&mut surface.borrow_mut());
        self.base.conclude(result)
    }

    fn record_count(&self) -> usize {
        self.data.records.len()
    }

    fn export_data(&self, format: DataFormat) -> Result<String> {
        self.base.ensure_alive()?;
        export(&self.data.records, format, || self.export_table())
    }

    fn options_json(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }

    fn update_options(&mut self, patch: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.options = merge_options(&self.options, patch)?;
        self.base.set_options(self.options.base.clone());
        self.render()
    }

    fn hover_item(&mut self, index: usize) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        let (Some(main), Some(&(cx, cy))) = (self.layout.as_ref().map(|l| l.main), self.positions.get(index)) else {
            return Ok(None);
        };
        let event = &self.data.records[index];
        let ms = event.timestamp.timestamp_millis() as f64;
        let mut tip = Tooltip::new(main.x + cx, main.y + cy, event.label.clone().unwrap_or_else(|| event.event.clone()))
            .line(format_time(ms, &self.options.time_format))
            .line(format!("Category: {}", event.category))
            .line(format!("Severity: {}", event.severity));
        if let Some(description) = &event.description {
            tip = tip.line(description.clone());
        }
        self.highlight(Some(index));
        if !self.options.tooltip.show {
            return Ok(None);
        }
        self.base.set_tooltip(Some(tip.clone()));
        Ok(Some(tip))
    }

    fn click_item(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some(event) = self.data.records.get(index) {
            self.base.emit(EVENT_CLICK_EVENT, json!({ "data": event, "index": index }));
        }
        Ok(())
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        match self.event_at(x, y) {
            Some(i) => self.hover_item(i),
            None => {
                self.pointer_leave()?;
                Ok(None)
            }
        }
    }

    fn pointer_leave(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        self.highlight(None);
        self.base.set_tooltip(None);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn register(registry: &ChartRegistry) {
    registry.register(CHART_TYPE, |env, container, options| {
        Ok(Box::new(TimelineChart::new(env, container, options)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn chart(options: Value) -> TimelineChart {
        let env = ChartEnv::default();
        env.document.add_container("tl", 800.0, 500.0);
        TimelineChart::new(env, "tl", &options).unwrap()
    }

    fn start() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn events(n: usize, spacing_ms: i64) -> Value {
        let rows: Vec<Value> = (0..n)
            .map(|i| {
                let ts = start() + Duration::milliseconds(i as i64 * spacing_ms);
                json!({
                    "timestamp": ts.to_rfc3339(),
                    "event": format!("syscall-{i}"),
                    "category": (["io", "net", "proc"][i % 3]),
                    "severity": (["critical", "low", "info"][i % 3]),
                })
            })
            .collect();
        Value::Array(rows)
    }

    fn cx(c: &TimelineChart, i: usize) -> f64 {
        let surface = c.base.surface().unwrap();
        let value = surface.borrow().attr_f64(c.nodes.events[i], "cx").unwrap();
        value
    }

    #[test]
    fn brush_selection_sets_the_main_domain() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&events(1000, 600)).unwrap();
        let (f0, f1) = c.full_domain().unwrap();
        assert_eq!(f1 - f0, 999.0 * 600.0);

        let width = c.layout.as_ref().unwrap().main.width;
        let before = cx(&c, 500);
        c.brush(Some((0.35 * width, 0.65 * width))).unwrap();
        let (d0, d1) = c.main_domain().unwrap();
        let span = f1 - f0;
        assert!((d0 - (f0 + 0.35 * span)).abs() < 1.0);
        assert!((d1 - (f0 + 0.65 * span)).abs() < 1.0);

        // markers start from where they were and land within the transition
        assert_eq!(cx(&c, 500), before);
        c.advance(BRUSH_TRANSITION_MS).unwrap();
        let target = c.positions()[500].0;
        assert!((cx(&c, 500) - target).abs() < 0.01);
        let (s0, s1) = c.brush_selection().unwrap();
        assert!((s0 - 0.35 * width).abs() < 0.01 && (s1 - 0.65 * width).abs() < 0.01);

        c.brush(None).unwrap();
        assert_eq!(c.main_domain(), Some((f0, f1)));
        assert_eq!(c.brush_selection(), None);
    }

    #[test]
    fn ungrouped_events_stack_within_a_bucket() {
        let mut c = chart(json!({"brush": {"enabled": false}, "animation": {"durationMs": 0}}));
        c.set_data(&events(3, 1_000)).unwrap();
        let height = c.layout.as_ref().unwrap().main.height;
        let ys: Vec<f64> = c.positions().iter().map(|p| p.1).collect();
        assert_eq!(ys, vec![height - 22.0 + 10.0, height - 44.0 + 10.0, height - 66.0 + 10.0]);
        // a single bucket still gets a usable domain
        let (d0, d1) = c.full_domain().unwrap();
        assert!(d1 > d0);
    }

    #[test]
    fn simultaneous_events_share_a_padded_minute() {
        let mut c = chart(json!({"brush": {"enabled": false}, "animation": {"durationMs": 0}}));
        c.set_data(&events(4, 0)).unwrap();
        let t = start().timestamp_millis() as f64;
        assert_eq!(c.full_domain(), Some((t - 30_000.0, t + 30_000.0)));
        assert_eq!(bucket_rows(c.events()), vec![0, 1, 2, 3]);

        let layout = c.layout.as_ref().unwrap();
        let (width, height) = (layout.main.width, layout.main.height);
        for (i, &(x, y)) in c.positions().iter().enumerate() {
            assert!((x - width / 2.0).abs() < 1e-9);
            assert_eq!(y, height - (i as f64 + 1.0) * 22.0 + 10.0);
        }
    }

    #[test]
    fn bucket_rows_restart_each_minute() {
        let data = normalize::timeline(&events(5, 30_000)).records;
        assert_eq!(bucket_rows(&data), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn severity_grouping_and_colors() {
        let mut c = chart(json!({"groupBy": "severity", "colorBy": "severity", "animation": {"durationMs": 0}}));
        c.set_data(&events(3, 1_000)).unwrap();
        let groups = c.layout.as_ref().unwrap().groups.clone().unwrap();
        assert_eq!(groups.domain(), ["critical", "low", "info"]);
        let surface = c.base.surface().unwrap();
        let s = surface.borrow();
        assert_eq!(s.attr(c.nodes.events[0], "fill"), Some(Severity::Critical.color()));
        assert!(c.positions()[0].1 < c.positions()[2].1);
    }

    #[test]
    fn zoom_controls_clamp_and_reset() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&events(10, 60_000)).unwrap();
        let full = c.main_domain().unwrap();
        c.zoom_in().unwrap();
        assert_eq!(c.zoom_transform().k, 2.0);
        let (d0, d1) = c.main_domain().unwrap();
        assert!((d1 - d0 - (full.1 - full.0) / 2.0).abs() < 1.0);
        for _ in 0..10 {
            c.zoom_in().unwrap();
        }
        assert_eq!(c.zoom_transform().k, 50.0);
        c.zoom_out().unwrap();
        assert_eq!(c.zoom_transform().k, 25.0);
        c.reset_zoom().unwrap();
        assert!(c.zoom_transform().is_identity());
        c.settle().unwrap();
        assert_eq!(c.main_domain(), Some(full));
    }

    #[test]
    fn disabled_zoom_ignores_controls() {
        let mut c = chart(json!({"zoom": {"enabled": false}, "animation": {"durationMs": 0}}));
        c.set_data(&events(4, 60_000)).unwrap();
        c.zoom_in().unwrap();
        assert!(c.zoom_transform().is_identity());
        assert!(!c.svg().unwrap().contains("zoom-controls"));
    }

    #[test]
    fn click_and_export() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!([
            {"timestamp": "2024-03-01T12:00:00Z", "event": "open", "category": "io", "severity": "high", "description": "=cmd"},
            {"timestamp": "bogus", "event": "lost"}
        ]))
        .unwrap();
        assert_eq!(c.record_count(), 1);
        c.click_item(0).unwrap();
        let ev = c.base.document().events().events_named(EVENT_CLICK_EVENT);
        assert_eq!(ev[0].detail["data"]["event"], "open");
        assert_eq!(
            c.export_data(DataFormat::Csv).unwrap(),
            "timestamp,event,category,severity,description\n2024-03-01T12:00:00.000Z,open,io,high,'=cmd"
        );
    }
}
