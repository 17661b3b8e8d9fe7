//! Category × category heatmap on a sequential color scale.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;

use super::{export, log_normalized, merge_options};
use crate::color::{self, Rgb, WHITE};
use crate::error::{ChartError, Result};
use crate::models::{HeatmapCell, HeatmapData, Normalized};
use crate::normalize;
use crate::registry::ChartRegistry;
use crate::storage::Table;
use crate::viz::anim::{Tween, TweenValue};
use crate::viz::axis::{self, AxisSide};
use crate::viz::base::{Chart, ChartBase, ChartEnv, PlotArea, Tooltip};
use crate::viz::options::{BaseOptions, ChartOptions, LegendOptions, TooltipOptions, lenient, resolve};
use crate::viz::scale::{BandScale, ColorScheme, LinearScale, SequentialScale, ValueScale};
use crate::viz::scene::{NodeId, Surface, num, translate};
use crate::viz::types::DataFormat;
use crate::viz::util::format_value;

pub const CHART_TYPE: &str = "heatmap";
pub const CELL_CLICK_EVENT: &str = "heatmapCellClick";
pub const CELL_STAGGER_MS: f64 = 10.0;
pub const GRADIENT_STOPS: usize = 11;
const LEGEND_WIDTH: f64 = 60.0;
const STRIP_WIDTH: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatmapOptions {
    #[serde(flatten)]
    pub base: BaseOptions,
    /// Gap between neighbouring cells, in pixels.
    pub cell_padding: f64,
    pub corner_radius: f64,
    #[serde(deserialize_with = "lenient")]
    pub color_scheme: ColorScheme,
    /// Fixed color domain; the data extent when absent.
    pub value_range: Option<[f64; 2]>,
    pub show_values: bool,
    pub show_labels: bool,
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            base: BaseOptions::default(),
            cell_padding: 2.0,
            corner_radius: 2.0,
            color_scheme: ColorScheme::default(),
            value_range: None,
            show_values: true,
            show_labels: false,
            legend: LegendOptions::default(),
            tooltip: TooltipOptions::default(),
        }
    }
}

impl ChartOptions for HeatmapOptions {
    fn base(&self) -> &BaseOptions {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }
}

#[derive(Debug, Clone)]
struct Layout {
    area: PlotArea,
    x: BandScale,
    y: BandScale,
    color: SequentialScale,
}

pub struct HeatmapChart {
    base: ChartBase,
    options: HeatmapOptions,
    data: Normalized<HeatmapData>,
    layout: Option<Layout>,
    cells: Vec<NodeId>,
    hovered: Option<usize>,
}

/// Inset of a cell edge: half the padding, except on the outer edges of the grid.
fn inset(index: usize, count: usize, padding: f64) -> (f64, f64) {
    let lead = if index == 0 { 0.0 } else { padding / 2.0 };
    let trail = if index + 1 == count { 0.0 } else { padding / 2.0 };
    (lead, trail)
}

impl HeatmapChart {
    pub(crate) fn new(env: ChartEnv, container: &str, options: &Value) -> Result<Self> {
        let options: HeatmapOptions = resolve(options)?;
        let base = ChartBase::new(env, container, CHART_TYPE, options.base.clone())?;
        Ok(Self {
            base,
            options,
            data: Normalized {
                records: HeatmapData {
                    cells: Vec::new(),
                    x_keys: Vec::new(),
                    y_keys: Vec::new(),
                },
                rejected: 0,
                anomalies: Vec::new(),
            },
            layout: None,
            cells: Vec::new(),
            hovered: None,
        })
    }

    pub fn options(&self) -> &HeatmapOptions {
        &self.options
    }

    pub fn data(&self) -> &HeatmapData {
        &self.data.records
    }

    pub fn x_keys(&self) -> &[String] {
        &self.data.records.x_keys
    }

    pub fn y_keys(&self) -> &[String] {
        &self.data.records.y_keys
    }

    /// Configured value range, or the data extent.
    pub fn color_domain(&self) -> Option<(f64, f64)> {
        if let Some([lo, hi]) = self.options.value_range {
            return Some((lo, hi));
        }
        let values = self.data.records.cells.iter().map(|c| c.value);
        values.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
    }

    /// Target fill of cell `(x, y)`; `None` for absent cells.
    pub fn cell_color(&self, x: &str, y: &str) -> Option<Rgb> {
        let layout = self.layout.as_ref()?;
        self.data.records.cell(x, y).map(|c| layout.color.apply(c.value))
    }

    fn cell_rect(&self, layout: &Layout, cell: &HeatmapCell) -> Option<(f64, f64, f64, f64)> {
        let pad = self.options.cell_padding.max(0.0);
        let xi = layout.x.domain().iter().position(|k| *k == cell.x)?;
        let yi = layout.y.domain().iter().position(|k| *k == cell.y)?;
        let (xl, xr) = inset(xi, layout.x.domain().len(), pad);
        let (yt, yb) = inset(yi, layout.y.domain().len(), pad);
        let x = layout.x.position_at(xi)? + xl;
        let y = layout.y.position_at(yi)? + yt;
        let w = (layout.x.bandwidth() - xl - xr).max(0.0);
        let h = (layout.y.bandwidth() - yt - yb).max(0.0);
        Some((x, y, w, h))
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        let records = &self.data.records;
        if records.cells.is_empty() {
            return Err(ChartError::InvalidData("no heatmap cells".into()));
        }
        let theme = self.base.theme();
        self.base.draw_title(surface, &theme);
        let mut area = self.base.plot_area(None);
        if self.options.legend.show {
            area.width = (area.width - LEGEND_WIDTH).max(0.0);
        }
        let (d0, d1) = self.color_domain().unwrap_or((0.0, 1.0));
        let layout = Layout {
            area,
            x: BandScale::new(records.x_keys.clone(), (0.0, area.width)),
            y: BandScale::new(records.y_keys.clone(), (0.0, area.height)),
            color: SequentialScale::new((d0, d1), self.options.color_scheme),
        };

        let root = surface.root();
        let plot = surface.element(
            root,
            "g",
            [("class", "plot".to_string()), ("transform", translate(area.x, area.y))],
        );
        let grid = surface.element(plot, "g", [("class", "cells")]);
        let background = Rgb::parse(&theme.background).unwrap_or(WHITE);
        let duration = self.base.duration_ms();
        let easing = self.base.easing();
        let radius = num(self.options.corner_radius.max(0.0));
        self.cells.clear();
        for (i, cell) in records.cells.iter().enumerate() {
            let Some((x, y, w, h)) = self.cell_rect(&layout, cell) else {
                continue;
            };
            let fill = layout.color.apply(cell.value);
            let delay = i as f64 * CELL_STAGGER_MS;
            let rect = surface.element(
                grid,
                "rect",
                [
                    ("class", "heatmap-cell".to_string()),
                    ("x", num(x)),
                    ("y", num(y)),
                    ("width", num(w)),
                    ("height", num(h)),
                    ("rx", radius.clone()),
                    ("ry", radius.clone()),
                    ("fill", background.to_hex()),
                    ("data-x", cell.x.clone()),
                    ("data-y", cell.y.clone()),
                ],
            );
            self.base.schedule(
                Tween::new(rect, "fill", TweenValue::Color { from: background, to: fill }).timing(duration, delay, easing),
            );
            self.cells.push(rect);

            let ink = color::contrasting_text(fill).to_hex();
            let (cx, cy) = (x + w / 2.0, y + h / 2.0);
            let mut labels = Vec::new();
            if self.options.show_values {
                labels.push((
                    "cell-value",
                    format_value(cell.value, self.base.locale()),
                    if self.options.show_labels && cell.label.is_some() { -0.4 } else { 0.35 },
                ));
            }
            if let (true, Some(label)) = (self.options.show_labels, &cell.label) {
                labels.push(("cell-label", label.clone(), if self.options.show_values { 1.1 } else { 0.35 }));
            }
            for (class, content, dy) in labels {
                let text = surface.text(
                    grid,
                    content,
                    [
                        ("class", class.to_string()),
                        ("x", num(cx)),
                        ("y", num(cy)),
                        ("dy", format!("{dy}em")),
                        ("text-anchor", "middle".to_string()),
                        ("font-size", "11".to_string()),
                        ("fill", ink.clone()),
                        ("opacity", "0".to_string()),
                        ("pointer-events", "none".to_string()),
                    ],
                );
                self.base
                    .schedule(Tween::number(text, "opacity", 0.0, 1.0).timing(duration / 2.0, duration + delay, easing));
            }
        }

        let x_ticks = axis::band_ticks(&layout.x);
        let y_ticks = axis::band_ticks(&layout.y);
        axis::draw(surface, plot, AxisSide::Bottom, (0.0, area.width), &x_ticks, (0.0, area.height), &theme.text);
        axis::draw(surface, plot, AxisSide::Left, (0.0, area.height), &y_ticks, (0.0, 0.0), &theme.text);

        if self.options.legend.show {
            self.draw_gradient_legend(surface, plot, &layout, &theme.text);
        }
        self.layout = Some(layout);
        self.hovered = None;
        Ok(())
    }

    /// Vertical strip with evenly spaced stops over the color domain, highest value on top.
    fn draw_gradient_legend(&self, surface: &mut Surface, plot: NodeId, layout: &Layout, text: &str) {
        let (d0, d1) = layout.color.domain();
        let height = layout.area.height;
        let id = format!("heatmap-gradient-{}", self.base.container());
        let root = surface.root();
        let defs = surface.element(root, "defs", [("class", "heatmap-defs")]);
        let gradient = surface.element(
            defs,
            "linearGradient",
            [("id", id.as_str()), ("x1", "0"), ("y1", "1"), ("x2", "0"), ("y2", "0")],
        );
        for i in 0..GRADIENT_STOPS {
            let t = i as f64 / (GRADIENT_STOPS - 1) as f64;
            let color = layout.color.apply(d0 + (d1 - d0) * t);
            surface.element(
                gradient,
                "stop",
                [("offset", format!("{}%", num(t * 100.0))), ("stop-color", color.to_hex())],
            );
        }
        let left = layout.area.width + LEGEND_WIDTH - STRIP_WIDTH - 35.0;
        let g = surface.element(
            plot,
            "g",
            [("class", "legend heatmap-legend".to_string()), ("transform", translate(left, 0.0))],
        );
        surface.element(
            g,
            "rect",
            [
                ("width", num(STRIP_WIDTH)),
                ("height", num(height)),
                ("fill", format!("url(#{id})")),
            ],
        );
        let scale = ValueScale::Linear(LinearScale::new((d0, d1), (height, 0.0)));
        let ticks = axis::value_ticks(&scale, 5);
        axis::draw(surface, g, AxisSide::Right, (height, 0.0), &ticks, (STRIP_WIDTH, 0.0), text);
    }

    fn highlight(&mut self, index: Option<usize>) {
        self.hovered = index;
        let Some(surface) = self.base.surface() else {
            return;
        };
        let accent = self.base.theme().accent;
        let mut s = surface.borrow_mut();
        for (i, cell) in self.cells.iter().enumerate() {
            if Some(i) == index {
                s.set_attr(*cell, "stroke", accent.clone());
                s.set_attr(*cell, "stroke-width", "2");
            } else {
                s.remove_attr(*cell, "stroke");
                s.remove_attr(*cell, "stroke-width");
            }
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Index of the cell under surface point `(x, y)`.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<usize> {
        let layout = self.layout.as_ref()?;
        if !layout.area.contains(x, y) {
            return None;
        }
        let xi = layout.x.index_at(x - layout.area.x)?;
        let yi = layout.y.index_at(y - layout.area.y)?;
        let (xk, yk) = (&layout.x.domain()[xi], &layout.y.domain()[yi]);
        self.data.records.cells.iter().position(|c| c.x == *xk && c.y == *yk)
    }

    fn export_table(&self) -> Table {
        let mut t = Table::new(["x", "y", "value", "label"]);
        for c in &self.data.records.cells {
            t.push(vec![c.x.as_str().into(), c.y.as_str().into(), c.value.into(), c.label.clone().into()]);
        }
        t
    }
}

impl Chart for HeatmapChart {
    fn base(&self) -> &ChartBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChartBase {
        &mut self.base
    }

    fn set_data(&mut self, payload: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.data = normalize::heatmap(payload);
        log_normalized(CHART_TYPE, &self.data);
        self.render()?;
        self.base.announce_update(self.data.records.cells.len());
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let surface = self.base.begin_render()?;
        let result = self.draw(&mut surface.borrow_mut());
        self.base.conclude(result)
    }

    fn record_count(&self) -> usize {
        self.data.records.cells.len()
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
        let Some(layout) = self.layout.clone() else {
            return Ok(None);
        };
        let Some(cell) = self.data.records.cells.get(index).cloned() else {
            return Ok(None);
        };
        let Some((x, y, w, _)) = self.cell_rect(&layout, &cell) else {
            return Ok(None);
        };
        let mut tip = Tooltip::new(layout.area.x + x + w / 2.0, layout.area.y + y, format!("{}, {}", cell.x, cell.y))
            .line(format!("Value: {}", format_value(cell.value, self.base.locale())));
        if let Some(label) = &cell.label {
            tip = tip.line(label.clone());
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
        if let Some(cell) = self.data.records.cells.get(index) {
            self.base.emit(CELL_CLICK_EVENT, json!({ "data": cell, "index": index }));
        }
        Ok(())
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        match self.cell_at(x, y) {
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
        Ok(Box::new(HeatmapChart::new(env, container, options)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::types::Key;

    fn chart(options: Value) -> HeatmapChart {
        let env = ChartEnv::default();
        env.document.add_container("heat", 500.0, 300.0);
        HeatmapChart::new(env, "heat", &options).unwrap()
    }

    fn fill_of(c: &HeatmapChart, x: &str, y: &str) -> Option<String> {
        let surface = c.base.surface()?;
        let s = surface.borrow();
        let node = s
            .find_by_class("heatmap-cell")
            .into_iter()
            .find(|n| s.attr(*n, "data-x") == Some(x) && s.attr(*n, "data-y") == Some(y))?;
        s.attr(node, "fill").map(str::to_string)
    }

    #[test]
    fn viridis_grid_with_a_missing_cell() {
        let mut c = chart(json!({"colorScheme": "Viridis"}));
        c.set_data(&json!([
            {"x": "a", "y": 1, "value": 0},
            {"x": "a", "y": 2, "value": 10},
            {"x": "b", "y": 1, "value": 5}
        ]))
        .unwrap();
        assert_eq!(c.x_keys(), ["a", "b"]);
        assert_eq!(c.y_keys(), ["1", "2"]);
        assert_eq!(c.color_domain(), Some((0.0, 10.0)));

        // cells start on the background before the tween runs
        assert_eq!(fill_of(&c, "a", "2").as_deref(), Some("#ffffff"));
        c.settle().unwrap();
        let top = ColorScheme::Viridis.interpolate(1.0).to_hex();
        assert_eq!(fill_of(&c, "a", "2"), Some(top));
        assert_eq!(fill_of(&c, "b", "2"), None);
        let surface = c.base.surface().unwrap();
        assert_eq!(surface.borrow().count_class("heatmap-cell"), 3);
    }

    #[test]
    fn single_cell_fills_the_plot() {
        let mut c = chart(json!({"legend": {"show": false}, "animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": "only", "y": "one", "value": 3}])).unwrap();
        let area = c.layout.as_ref().unwrap().area;
        let surface = c.base.surface().unwrap();
        let s = surface.borrow();
        let cell = s.find_by_class("heatmap-cell")[0];
        assert_eq!(s.attr_f64(cell, "width"), Some(area.width));
        assert_eq!(s.attr_f64(cell, "height"), Some(area.height));
    }

    #[test]
    fn legend_gradient_has_eleven_stops() {
        let mut c = chart(json!({"valueRange": [0, 100], "animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": 1, "y": 1, "value": 40}])).unwrap();
        assert_eq!(c.color_domain(), Some((0.0, 100.0)));
        let svg = c.svg().unwrap();
        assert_eq!(svg.matches("<stop ").count(), GRADIENT_STOPS);
    }

    #[test]
    fn hover_strokes_with_accent_and_enter_clicks() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": "a", "y": "r", "value": 1}, {"x": "b", "y": "r", "value": 2}])).unwrap();
        c.key_down(Key::ArrowRight).unwrap();
        assert_eq!(c.hovered(), Some(0));
        let accent = c.base.theme().accent;
        let surface = c.base.surface().unwrap();
        assert_eq!(surface.borrow().attr(c.cells[0], "stroke"), Some(accent.as_str()));
        c.key_down(Key::Enter).unwrap();
        let events = c.base.document().events().events_named(CELL_CLICK_EVENT);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].detail["data"]["x"], "a");
    }

    #[test]
    fn csv_keeps_empty_labels() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!([{"x": "a", "y": "r", "value": 1.5, "label": "hot"}, {"x": "b", "y": "r", "z": 2}]))
            .unwrap();
        assert_eq!(c.export_data(DataFormat::Csv).unwrap(), "x,y,value,label\na,r,1.5,hot\nb,r,2,");
    }
}
