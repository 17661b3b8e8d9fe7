//! Single and multi-series line chart with optional areas, points and x/xy zoom.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;

use super::{export, log_normalized, merge_options};
use crate::error::{ChartError, Result};
use crate::models::{LineData, Normalized, XValue};
use crate::normalize;
use crate::registry::ChartRegistry;
use crate::storage::{Cell, Table};
use crate::viz::anim::Tween;
use crate::viz::axis::{self, AxisSide, Tick};
use crate::viz::base::{Chart, ChartBase, ChartEnv, PlotArea, Tooltip};
use crate::viz::legend::LegendItem;
use crate::viz::options::{BaseOptions, ChartOptions, LegendOptions, TooltipOptions, lenient, resolve};
use crate::viz::scale::{BandScale, LinearScale, LogScale, TimeScale, ValueScale, format_time};
use crate::viz::scene::{NodeId, Surface, num, translate};
use crate::viz::shape::{CurveType, Point, area_path, area_with_gaps, curve_path, line_with_gaps};
use crate::viz::types::{DataFormat, GridLines, ScaleType, XAxisType, ZoomType};
use crate::viz::util::{format_plain, format_value};
use crate::viz::zoom::{ZoomBehavior, ZoomTransform};

pub const CHART_TYPE: &str = "line";
pub const POINT_CLICK_EVENT: &str = "linePointClick";
pub const SERIES_STAGGER_MS: f64 = 200.0;
pub const POINT_STAGGER_MS: f64 = 50.0;
const ZOOM_EXTENT: (f64, f64) = (1.0, 10.0);
const X_TICKS: usize = 6;
const Y_TICKS: usize = 5;
const SINGLE_TIME_PAD_MS: f64 = 30.0 * 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomOptions {
    pub enabled: bool,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: ZoomType,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: ZoomType::X,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineOptions {
    #[serde(flatten)]
    pub base: BaseOptions,
    #[serde(deserialize_with = "lenient")]
    pub curve_type: CurveType,
    pub show_area: bool,
    pub show_points: bool,
    pub point_radius: f64,
    #[serde(deserialize_with = "lenient")]
    pub x_axis_type: XAxisType,
    #[serde(deserialize_with = "lenient")]
    pub y_scale: ScaleType,
    /// Leave gaps (`y: null`) undrawn; when false the line joins the neighbours.
    pub interpolate: bool,
    pub zoom: ZoomOptions,
    #[serde(deserialize_with = "lenient")]
    pub grid: GridLines,
    /// strftime pattern for time values in tooltips.
    pub time_format: String,
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            base: BaseOptions::default(),
            curve_type: CurveType::Linear,
            show_area: false,
            show_points: true,
            point_radius: 4.0,
            x_axis_type: XAxisType::Time,
            y_scale: ScaleType::Linear,
            interpolate: true,
            zoom: ZoomOptions::default(),
            grid: GridLines::Horizontal,
            time_format: "%Y-%m-%d %H:%M".to_string(),
            legend: LegendOptions::default(),
            tooltip: TooltipOptions::default(),
        }
    }
}

impl ChartOptions for LineOptions {
    fn base(&self) -> &BaseOptions {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }
}

#[derive(Debug, Clone)]
enum XScale {
    Time(TimeScale),
    Linear(LinearScale),
    Ordinal(BandScale),
}

impl XScale {
    fn position(&self, x: &XValue) -> Option<f64> {
        match self {
            XScale::Time(s) => x.as_f64().map(|ms| s.apply(ms)),
            XScale::Linear(s) => x.as_f64().map(|v| s.apply(v)),
            XScale::Ordinal(b) => b.position(&x.key()),
        }
    }

    fn ticks(&self) -> Vec<Tick> {
        match self {
            XScale::Time(s) => axis::time_ticks(s, X_TICKS),
            XScale::Linear(s) => axis::value_ticks(&ValueScale::Linear(*s), X_TICKS),
            XScale::Ordinal(b) => axis::band_ticks(b),
        }
    }

    fn zoomed(&self, t: &ZoomTransform) -> XScale {
        match self {
            XScale::Time(s) => XScale::Time(t.rescale_time(s)),
            XScale::Linear(s) => XScale::Linear(t.rescale_x(s)),
            XScale::Ordinal(b) => XScale::Ordinal(b.clone()),
        }
    }

    fn domain(&self) -> Option<(f64, f64)> {
        match self {
            XScale::Time(s) => Some(s.domain()),
            XScale::Linear(s) => Some(s.domain()),
            XScale::Ordinal(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct SeriesNodes {
    line: Option<NodeId>,
    area: Option<NodeId>,
    points: Vec<(usize, NodeId)>,
}

pub struct LineChart {
    base: ChartBase,
    options: LineOptions,
    data: Normalized<LineData>,
    x: Option<XScale>,
    y: Option<ValueScale>,
    area: PlotArea,
    zoom: Option<ZoomBehavior>,
    series_nodes: Vec<SeriesNodes>,
    guide: Option<NodeId>,
}

impl LineChart {
    pub(crate) fn new(env: ChartEnv, container: &str, options: &Value) -> Result<Self> {
        let options: LineOptions = resolve(options)?;
        let base = ChartBase::new(env, container, CHART_TYPE, options.base.clone())?;
        Ok(Self {
            base,
            options,
            data: Normalized {
                records: LineData {
                    series: Vec::new(),
                    multi: false,
                },
                rejected: 0,
                anomalies: Vec::new(),
            },
            x: None,
            y: None,
            area: PlotArea {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            },
            zoom: None,
            series_nodes: Vec::new(),
            guide: None,
        })
    }

    pub fn options(&self) -> &LineOptions {
        &self.options
    }

    pub fn data(&self) -> &LineData {
        &self.data.records
    }

    pub fn anomalies(&self) -> &[String] {
        &self.data.anomalies
    }

    /// Visible x domain (continuous axes only).
    pub fn x_domain(&self) -> Option<(f64, f64)> {
        self.x.as_ref().and_then(XScale::domain)
    }

    pub fn y_domain(&self) -> Option<(f64, f64)> {
        self.y.map(|y| y.domain())
    }

    pub fn zoom_transform(&self) -> Option<ZoomTransform> {
        self.zoom.as_ref().map(ZoomBehavior::transform)
    }

    fn continuous(&self) -> bool {
        self.options.x_axis_type != XAxisType::Ordinal
    }

    fn label_x(&self, x: &XValue) -> String {
        match x {
            XValue::Time(t) => format_time(t.timestamp_millis() as f64, &self.options.time_format),
            XValue::Number(v) => format_plain(*v),
            XValue::Category(c) => c.clone(),
        }
    }

    fn base_x_scale(&self, width: f64) -> XScale {
        let series = &self.data.records.series;
        match self.options.x_axis_type {
            XAxisType::Ordinal => {
                let mut keys: Vec<String> = Vec::new();
                for p in series.iter().flat_map(|s| &s.data) {
                    let k = p.x.key();
                    if !keys.contains(&k) {
                        keys.push(k);
                    }
                }
                XScale::Ordinal(BandScale::point(keys, (0.0, width), 0.5))
            }
            kind => {
                let xs = series.iter().flat_map(|s| &s.data).filter_map(|p| p.x.as_f64());
                let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
                let pad = if kind == XAxisType::Time { SINGLE_TIME_PAD_MS } else { 1.0 };
                let domain = if lo < hi { (lo, hi) } else { (lo - pad, lo + pad) };
                if kind == XAxisType::Time {
                    XScale::Time(TimeScale::new(domain, (0.0, width)))
                } else {
                    XScale::Linear(LinearScale::new(domain, (0.0, width)))
                }
            }
        }
    }

    fn base_y_scale(&self, height: f64) -> Option<ValueScale> {
        let ys: Vec<f64> = self
            .data
            .records
            .series
            .iter()
            .flat_map(|s| &s.data)
            .filter_map(|p| p.y)
            .collect();
        if ys.is_empty() {
            return None;
        }
        let lo = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(match self.options.y_scale {
            ScaleType::Linear => {
                let lo = lo.min(0.0);
                let hi = if hi > lo { hi } else { lo + 1.0 };
                ValueScale::Linear(LinearScale::new((lo, hi), (height, 0.0)).nice(Y_TICKS))
            }
            ScaleType::Log => ValueScale::Log(LogScale::new((lo.max(1.0), hi.max(1.0)), (height, 0.0)).nice()),
        })
    }

    fn prepare_zoom(&mut self, width: f64, height: f64) {
        if !(self.options.zoom.enabled && self.continuous()) {
            self.zoom = None;
            return;
        }
        let previous = self.zoom.as_ref().map(ZoomBehavior::transform);
        let mut zoom = ZoomBehavior::new(ZOOM_EXTENT, width, height).with_translate_extent([(0.0, 0.0), (width, height)]);
        if let Some(t) = previous {
            zoom.set(t);
        }
        self.zoom = Some(zoom);
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        if self.data.records.point_count() == 0 {
            return Err(ChartError::InvalidData("no points to draw".into()));
        }
        let theme = self.base.theme();
        self.base.draw_title(surface, &theme);
        let multi = self.data.records.multi;
        let colors: Vec<String> = (0..self.data.records.series.len())
            .map(|i| self.base.get_color(i, "primary"))
            .collect();
        let legend = (multi && self.options.legend.show).then(|| {
            let items: Vec<LegendItem> = self
                .data
                .records
                .series
                .iter()
                .zip(&colors)
                .map(|(s, c)| LegendItem::new(s.name.clone(), c.clone()))
                .collect();
            self.base.layout_legend(&items, self.options.legend.position)
        });
        let area = self.base.plot_area(legend.as_ref());
        self.area = area;
        self.prepare_zoom(area.width, area.height);

        let transform = self.zoom_transform().unwrap_or_default();
        let x = self.base_x_scale(area.width).zoomed(&transform);
        let mut y = self
            .base_y_scale(area.height)
            .ok_or_else(|| ChartError::InvalidData("every value is a gap".into()))?;
        if self.options.zoom.kind == ZoomType::Xy {
            if let ValueScale::Linear(s) = y {
                y = ValueScale::Linear(transform.rescale_y(&s));
            }
        }

        let root = surface.root();
        let clip_id = format!("clip-{}", self.base.container());
        let defs = surface.element(root, "defs", [("class", "line-defs")]);
        let clip = surface.element(defs, "clipPath", [("id", clip_id.clone())]);
        surface.element(clip, "rect", [("width", num(area.width)), ("height", num(area.height))]);
        let plot = surface.element(
            root,
            "g",
            [("class", "plot".to_string()), ("transform", translate(area.x, area.y))],
        );

        let y_ticks = axis::value_ticks(&y, Y_TICKS);
        let x_ticks = x.ticks();
        if self.options.grid.horizontal() {
            axis::draw_grid(surface, plot, true, &y_ticks, area.width, &theme.grid);
        }
        if self.options.grid.vertical() {
            axis::draw_grid(surface, plot, false, &x_ticks, area.height, &theme.grid);
        }

        let series_g = surface.element(
            plot,
            "g",
            [("class", "series-group".to_string()), ("clip-path", format!("url(#{clip_id})"))],
        );
        let duration = self.base.duration_ms();
        let easing = self.base.easing();
        let curve = self.options.curve_type;
        let baseline = y.baseline();
        self.series_nodes.clear();
        for (i, series) in self.data.records.series.iter().enumerate() {
            let color = &colors[i];
            let delay = i as f64 * SERIES_STAGGER_MS;
            let g = surface.element(series_g, "g", [("class", format!("series series-{i}"))]);
            let located: Vec<Option<Point>> = series
                .data
                .iter()
                .map(|p| match (x.position(&p.x), p.y) {
                    (Some(px), Some(v)) => Some((px, y.apply(v))),
                    _ => None,
                })
                .collect();
            let defined: Vec<Point> = located.iter().flatten().copied().collect();
            let mut nodes = SeriesNodes::default();

            if self.options.show_area && defined.len() > 1 {
                let d = if self.options.interpolate {
                    area_with_gaps(&located, baseline, curve)
                } else {
                    area_path(&defined, baseline, curve)
                };
                let node = surface.element(
                    g,
                    "path",
                    [
                        ("class", "area".to_string()),
                        ("d", d.to_string()),
                        ("fill", color.clone()),
                        ("fill-opacity", "0.2".to_string()),
                        ("opacity", "0".to_string()),
                    ],
                );
                self.base
                    .schedule(Tween::number(node, "opacity", 0.0, 1.0).timing(duration, delay, easing));
                nodes.area = Some(node);
            }

            if defined.len() > 1 {
                let d = if self.options.interpolate {
                    line_with_gaps(&located, curve)
                } else {
                    curve_path(&defined, curve)
                };
                let length = d.length();
                let node = surface.element(
                    g,
                    "path",
                    [
                        ("class", "line".to_string()),
                        ("d", d.to_string()),
                        ("fill", "none".to_string()),
                        ("stroke", color.clone()),
                        ("stroke-width", "2".to_string()),
                        ("stroke-dasharray", format!("{} {}", num(length), num(length))),
                        ("stroke-dashoffset", num(length)),
                        ("aria-label", series.name.clone()),
                    ],
                );
                self.base
                    .schedule(Tween::number(node, "stroke-dashoffset", length, 0.0).timing(duration, delay, easing));
                nodes.line = Some(node);
            }

            if self.options.show_points {
                for (j, p) in located.iter().enumerate() {
                    let Some((px, py)) = p else {
                        continue;
                    };
                    let circle = surface.element(
                        g,
                        "circle",
                        [
                            ("class", format!("point series-{i}")),
                            ("cx", num(*px)),
                            ("cy", num(*py)),
                            ("r", "0".to_string()),
                            ("fill", color.clone()),
                            ("stroke", theme.background.clone()),
                            ("stroke-width", "1.5".to_string()),
                            ("data-series", i.to_string()),
                            ("data-index", j.to_string()),
                        ],
                    );
                    self.base.schedule(
                        Tween::number(circle, "r", 0.0, self.options.point_radius).timing(
                            duration,
                            delay + j as f64 * POINT_STAGGER_MS,
                            easing,
                        ),
                    );
                    nodes.points.push((j, circle));
                }
            }
            self.series_nodes.push(nodes);
        }

        axis::draw(surface, plot, AxisSide::Bottom, (0.0, area.width), &x_ticks, (0.0, area.height), &theme.text);
        axis::draw(surface, plot, AxisSide::Left, (area.height, 0.0), &y_ticks, (0.0, 0.0), &theme.text);

        let guide = surface.element(
            plot,
            "line",
            [
                ("class", "hover-line".to_string()),
                ("x1", "0".to_string()),
                ("x2", "0".to_string()),
                ("y1", "0".to_string()),
                ("y2", num(area.height)),
                ("stroke", theme.text.clone()),
                ("stroke-dasharray", "3 3".to_string()),
                ("opacity", "0".to_string()),
            ],
        );
        self.guide = Some(guide);
        surface.element(
            plot,
            "rect",
            [
                ("class", "overlay".to_string()),
                ("width", num(area.width)),
                ("height", num(area.height)),
                ("fill", "none".to_string()),
                ("pointer-events", "all".to_string()),
            ],
        );
        if self.zoom.is_some() {
            let button = surface.element(
                plot,
                "g",
                [("class", "zoom-reset".to_string()), ("transform", translate(area.width - 80.0, 0.0))],
            );
            surface.element(
                button,
                "rect",
                [
                    ("width", "80".to_string()),
                    ("height", "22".to_string()),
                    ("rx", "3".to_string()),
                    ("fill", theme.background.clone()),
                    ("stroke", theme.grid.clone()),
                ],
            );
            surface.text(
                button,
                "Reset Zoom",
                [
                    ("x", "40".to_string()),
                    ("y", "11".to_string()),
                    ("dy", "0.35em".to_string()),
                    ("text-anchor", "middle".to_string()),
                    ("font-size", "11".to_string()),
                    ("fill", theme.text.clone()),
                ],
            );
        }

        if let Some(layout) = &legend {
            self.base.draw_legend(surface, layout, &theme);
        }
        self.x = Some(x);
        self.y = Some(y);
        Ok(())
    }

    fn redraw(&mut self, animate: bool) -> Result<()> {
        let surface = self.base.begin_render()?;
        let result = self.draw(&mut surface.borrow_mut());
        let outcome = self.base.conclude(result);
        if !animate {
            self.base.settle();
        }
        outcome
    }

    /// Zoom by `factor` around plot point `(x, y)`.
    pub fn zoom_by(&mut self, factor: f64, point: (f64, f64)) -> Result<()> {
        self.base.ensure_alive()?;
        let Some(zoom) = self.zoom.as_mut() else {
            return Ok(());
        };
        zoom.scale_by(factor, point);
        self.redraw(false)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let Some(zoom) = self.zoom.as_mut() else {
            return Ok(());
        };
        zoom.pan(dx, dy);
        self.redraw(false)
    }

    /// The reset button: back to the full domain.
    pub fn reset_zoom(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        let Some(zoom) = self.zoom.as_mut() else {
            return Ok(());
        };
        zoom.reset();
        self.redraw(false)
    }

    /// `(series, point)` of flattened point `index`.
    fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let mut rest = index;
        for (s, series) in self.data.records.series.iter().enumerate() {
            if rest < series.data.len() {
                return Some((s, rest));
            }
            rest -= series.data.len();
        }
        None
    }

    /// Nearest defined point of `series` to plot x `px`, by bisection over x.
    fn nearest(&self, series: usize, px: f64) -> Option<(usize, f64)> {
        let x = self.x.as_ref()?;
        let mut located: Vec<(usize, f64)> = self.data.records.series[series]
            .data
            .iter()
            .enumerate()
            .filter(|(_, p)| p.y.is_some())
            .filter_map(|(j, p)| x.position(&p.x).map(|pos| (j, pos)))
            .collect();
        located.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let i = located.partition_point(|(_, pos)| *pos < px);
        let candidates = [i.checked_sub(1), Some(i)];
        candidates
            .into_iter()
            .flatten()
            .filter_map(|k| located.get(k).copied())
            .min_by(|a, b| {
                (a.1 - px)
                    .abs()
                    .partial_cmp(&(b.1 - px).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    fn show_guide(&self, px: Option<f64>) {
        let (Some(surface), Some(guide)) = (self.base.surface(), self.guide) else {
            return;
        };
        let mut s = surface.borrow_mut();
        match px {
            Some(px) => {
                s.set_attr(guide, "x1", num(px));
                s.set_attr(guide, "x2", num(px));
                s.set_attr(guide, "opacity", "1");
            }
            None => s.set_attr(guide, "opacity", "0"),
        }
    }

    fn value_line(&self, series: usize, value: f64) -> String {
        let v = format_value(value, self.base.locale());
        if self.data.records.multi {
            format!("{}: {v}", self.data.records.series[series].name)
        } else {
            format!("Value: {v}")
        }
    }

    fn export_table(&self) -> Table {
        let series = &self.data.records.series;
        if !self.data.records.multi {
            let mut t = Table::new(["x", "y"]);
            for p in series.iter().flat_map(|s| &s.data) {
                t.push(vec![x_cell(&p.x), p.y.into()]);
            }
            return t;
        }
        let mut keys: Vec<XValue> = Vec::new();
        for p in series.iter().flat_map(|s| &s.data) {
            if !keys.iter().any(|k| k.key() == p.x.key()) {
                keys.push(p.x.clone());
            }
        }
        if keys.iter().all(|k| k.as_f64().is_some()) {
            keys.sort_by(|a, b| {
                a.as_f64()
                    .partial_cmp(&b.as_f64())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        let mut t = Table::new(std::iter::once("x".to_string()).chain(series.iter().map(|s| s.name.clone())));
        for k in &keys {
            let key = k.key();
            let mut row = vec![x_cell(k)];
            for s in series {
                let y = s.data.iter().find(|p| p.x.key() == key).and_then(|p| p.y);
                row.push(y.into());
            }
            t.push(row);
        }
        t
    }
}

fn x_cell(x: &XValue) -> Cell {
    match x {
        XValue::Number(v) => Cell::Number(*v),
        other => Cell::Text(other.key()),
    }
}

impl Chart for LineChart {
    fn base(&self) -> &ChartBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChartBase {
        &mut self.base
    }

    fn set_data(&mut self, payload: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.data = normalize::line_data(payload, self.options.x_axis_type, Utc::now());
        log_normalized(CHART_TYPE, &self.data);
        if let Some(zoom) = self.zoom.as_mut() {
            zoom.reset();
        }
        self.render()?;
        self.base.announce_update(self.data.records.point_count());
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        self.redraw(true)
    }

    fn record_count(&self) -> usize {
        self.data.records.point_count()
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
        let Some((s, j)) = self.locate(index) else {
            return Ok(None);
        };
        let point = &self.data.records.series[s].data[j];
        let (Some(x), Some(y), Some(value)) = (self.x.as_ref(), self.y, point.y) else {
            return Ok(None);
        };
        let Some(px) = x.position(&point.x) else {
            return Ok(None);
        };
        let tip = Tooltip::new(self.area.x + px, self.area.y + y.apply(value), self.label_x(&point.x))
            .line(self.value_line(s, value));
        self.show_guide(Some(px));
        if !self.options.tooltip.show {
            return Ok(None);
        }
        self.base.set_tooltip(Some(tip.clone()));
        Ok(Some(tip))
    }

    fn click_item(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some((s, j)) = self.locate(index) {
            let series = &self.data.records.series[s];
            self.base
                .emit(POINT_CLICK_EVENT, json!({ "data": series.data[j], "series": series.name }));
        }
        Ok(())
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        if !self.area.contains(x, y) || self.y.is_none() {
            self.pointer_leave()?;
            return Ok(None);
        }
        let px = x - self.area.x;
        let hits: Vec<(usize, usize, f64)> = (0..self.data.records.series.len())
            .filter_map(|s| self.nearest(s, px).map(|(j, pos)| (s, j, pos)))
            .collect();
        let Some(&(s0, j0, pos0)) = hits.iter().min_by(|a, b| {
            (a.2 - px)
                .abs()
                .partial_cmp(&(b.2 - px).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        }) else {
            self.pointer_leave()?;
            return Ok(None);
        };
        let anchor = &self.data.records.series[s0].data[j0];
        let key = anchor.x.key();
        let mut tip = Tooltip::new(self.area.x + pos0, y, self.label_x(&anchor.x));
        for (s, series) in self.data.records.series.iter().enumerate() {
            let value = series.data.iter().find(|p| p.x.key() == key).and_then(|p| p.y);
            if let Some(v) = value {
                tip = tip.line(self.value_line(s, v));
            }
        }
        self.show_guide(Some(pos0));
        if !self.options.tooltip.show {
            return Ok(None);
        }
        self.base.set_tooltip(Some(tip.clone()));
        Ok(Some(tip))
    }

    fn pointer_leave(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        self.show_guide(None);
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
        Ok(Box::new(LineChart::new(env, container, options)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PanelKind;

    fn chart(options: Value) -> LineChart {
        let env = ChartEnv::default();
        env.document.add_container("line", 600.0, 400.0);
        LineChart::new(env, "line", &options).unwrap()
    }

    #[test]
    fn ordinal_axis_edge_cases() {
        let mut c = chart(json!({"xAxisType": "ordinal", "animation": {"durationMs": 0}}));
        c.set_data(&json!([])).unwrap();
        let panel = c.base.document().panel("line").unwrap();
        assert_eq!(panel.kind, PanelKind::Empty);

        c.set_data(&json!([{"x": "mon", "y": 3}])).unwrap();
        let svg = c.svg().unwrap();
        assert_eq!(svg.matches("class=\"point series-0\"").count(), 1);
        assert!(!svg.contains("class=\"line\""));
    }

    #[test]
    fn multi_series_csv_uses_the_union_of_x() {
        let mut c = chart(json!({"xAxisType": "linear", "animation": {"durationMs": 0}}));
        c.set_data(&json!([
            {"name": "s1", "data": [{"x": 1, "y": 10}, {"x": 2, "y": 20}]},
            {"name": "s2", "data": [{"x": 2, "y": 5}, {"x": 3, "y": 15}]}
        ]))
        .unwrap();
        let csv = c.export_data(DataFormat::Csv).unwrap();
        assert_eq!(csv, "x,s1,s2\n1,10,\n2,20,5\n3,,15");
    }

    #[test]
    fn gaps_split_or_join_the_line() {
        let payload = json!([
            {"x": 1, "y": 1}, {"x": 2, "y": 3}, {"x": 3, "y": null}, {"x": 4, "y": 2}, {"x": 5, "y": 4}
        ]);
        let mut split = chart(json!({"xAxisType": "linear", "interpolate": true, "animation": {"durationMs": 0}}));
        split.set_data(&payload).unwrap();
        let mut joined = chart(json!({"xAxisType": "linear", "interpolate": false, "animation": {"durationMs": 0}}));
        joined.set_data(&payload).unwrap();
        let moves = |c: &LineChart| {
            let surface = c.base.surface().unwrap();
            let node = c.series_nodes[0].line.unwrap();
            let d = surface.borrow().attr(node, "d").unwrap().to_string();
            d.matches('M').count()
        };
        assert_eq!(moves(&split), 2);
        assert_eq!(moves(&joined), 1);
    }

    #[test]
    fn lines_draw_in_with_series_stagger() {
        let mut c = chart(json!({"xAxisType": "linear"}));
        c.set_data(&json!([
            {"name": "a", "data": [{"x": 0, "y": 1}, {"x": 1, "y": 2}]},
            {"name": "b", "data": [{"x": 0, "y": 2}, {"x": 1, "y": 1}]}
        ]))
        .unwrap();
        let surface = c.base.surface().unwrap();
        let (a, b) = (c.series_nodes[0].line.unwrap(), c.series_nodes[1].line.unwrap());
        c.advance(750.0).unwrap();
        let offset = |n| surface.borrow().attr_f64(n, "stroke-dashoffset").unwrap();
        assert_eq!(offset(a), 0.0);
        assert!(offset(b) > 0.0);
        c.settle().unwrap();
        assert_eq!(offset(b), 0.0);
    }

    #[test]
    fn pointer_snaps_to_nearest_x() {
        let mut c = chart(json!({"xAxisType": "linear", "animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": 0, "y": 5}, {"x": 10, "y": 7}])).unwrap();
        let area = c.area;
        let tip = c.pointer_move(area.x + area.width * 0.8, area.y + 10.0).unwrap().unwrap();
        assert_eq!(tip.title, "10");
        assert_eq!(tip.lines, vec!["Value: 7"]);
        c.pointer_leave().unwrap();
        assert!(c.tooltip().is_none());
    }

    #[test]
    fn zoom_narrows_the_domain_and_resets() {
        let mut c = chart(json!({"xAxisType": "linear", "zoom": {"enabled": true}, "animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": 0, "y": 1}, {"x": 100, "y": 2}])).unwrap();
        let full = c.x_domain().unwrap();
        c.zoom_by(4.0, (c.area.width / 2.0, 0.0)).unwrap();
        let (d0, d1) = c.x_domain().unwrap();
        assert!(d1 - d0 < (full.1 - full.0) / 3.0);
        c.zoom_by(100.0, (0.0, 0.0)).unwrap();
        assert_eq!(c.zoom_transform().map(|t| t.k), Some(10.0));
        c.reset_zoom().unwrap();
        assert_eq!(c.x_domain(), Some(full));
        assert!(c.svg().unwrap().contains("Reset Zoom"));
    }

    #[test]
    fn bad_time_becomes_an_anomaly() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": "not a date", "y": 1}, {"x": "2024-01-01T00:00:00Z", "y": 2}])).unwrap();
        assert_eq!(c.record_count(), 2);
        assert_eq!(c.anomalies().len(), 1);
    }
}
