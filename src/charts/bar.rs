//! Vertical and horizontal bar chart.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;

use super::{categorical_table, export, log_normalized, merge_options};
use crate::color::Rgb;
use crate::error::{ChartError, Result};
use crate::models::{CategoricalPoint, Normalized};
use crate::normalize;
use crate::registry::ChartRegistry;
use crate::viz::anim::Tween;
use crate::viz::axis::{self, AxisSide};
use crate::viz::base::{Chart, ChartBase, ChartEnv, PlotArea, Tooltip};
use crate::viz::options::{BaseOptions, ChartOptions, TooltipOptions, resolve};
use crate::viz::scale::{BandScale, LinearScale, LogScale, ValueScale, nice_domain};
use crate::viz::scene::{NodeId, Surface, num, translate};
use crate::viz::types::{DataFormat, GridLines, Orientation, ScaleType};
use crate::viz::util::format_value;

pub const CHART_TYPE: &str = "bar";
pub const BAR_CLICK_EVENT: &str = "barClick";
const HEADROOM: f64 = 1.1;
const VALUE_TICKS: usize = 5;
const VALUE_FONT_PX: f64 = 11.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BarOptions {
    #[serde(flatten)]
    pub base: BaseOptions,
    #[serde(deserialize_with = "crate::viz::options::lenient")]
    pub orientation: Orientation,
    /// Fraction of a band left empty between bars.
    pub bar_padding: f64,
    pub corner_radius: f64,
    pub gradient: bool,
    pub stacked: bool,
    pub grouped: bool,
    #[serde(deserialize_with = "crate::viz::options::lenient")]
    pub y_scale: ScaleType,
    #[serde(deserialize_with = "crate::viz::options::lenient")]
    pub grid: GridLines,
    pub show_values: bool,
    pub sort_data: bool,
    pub tooltip: TooltipOptions,
}

impl Default for BarOptions {
    fn default() -> Self {
        Self {
            base: BaseOptions::default(),
            orientation: Orientation::Vertical,
            bar_padding: 0.1,
            corner_radius: 0.0,
            gradient: false,
            stacked: false,
            grouped: false,
            y_scale: ScaleType::Linear,
            grid: GridLines::Horizontal,
            show_values: false,
            sort_data: true,
            tooltip: TooltipOptions::default(),
        }
    }
}

impl ChartOptions for BarOptions {
    fn base(&self) -> &BaseOptions {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }
}

/// Value-axis domain: `[0, max × 1.1]` (log: `[max(1, min), max × 1.1]`), before nice rounding.
pub fn value_domain(points: &[CategoricalPoint], scale: ScaleType) -> (f64, f64) {
    let max = points.iter().map(|p| p.value).fold(0.0, f64::max);
    match scale {
        ScaleType::Linear => (0.0, max * HEADROOM),
        ScaleType::Log => {
            let min = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
            (min.max(1.0), (max * HEADROOM).max(1.0))
        }
    }
}

struct Layout {
    area: PlotArea,
    band: BandScale,
    value: ValueScale,
}

pub struct BarChart {
    base: ChartBase,
    options: BarOptions,
    data: Normalized<Vec<CategoricalPoint>>,
    layout: Option<Layout>,
    bars: Vec<NodeId>,
    hovered: Option<usize>,
}

impl BarChart {
    pub(crate) fn new(env: ChartEnv, container: &str, options: &Value) -> Result<Self> {
        let options: BarOptions = resolve(options)?;
        if options.stacked || options.grouped {
            debug!("bar: stacked/grouped layouts draw the first series only");
        }
        let base = ChartBase::new(env, container, CHART_TYPE, options.base.clone())?;
        Ok(Self {
            base,
            options,
            data: Normalized {
                records: Vec::new(),
                rejected: 0,
                anomalies: Vec::new(),
            },
            layout: None,
            bars: Vec::new(),
            hovered: None,
        })
    }

    pub fn options(&self) -> &BarOptions {
        &self.options
    }

    pub fn data(&self) -> &[CategoricalPoint] {
        &self.data.records
    }

    /// Nice-rounded domain of the value axis of the last render.
    pub fn axis_domain(&self) -> Option<(f64, f64)> {
        self.layout.as_ref().map(|l| l.value.domain())
    }

    fn vertical(&self) -> bool {
        self.options.orientation == Orientation::Vertical
    }

    fn color(&self, index: usize) -> String {
        self.data.records[index]
            .color
            .clone()
            .unwrap_or_else(|| self.base.get_color(index, "primary"))
    }

    fn build_layout(&self) -> Layout {
        let area = self.base.plot_area(None);
        let labels: Vec<String> = self.data.records.iter().map(|p| p.label.clone()).collect();
        let (d0, d1) = value_domain(&self.data.records, self.options.y_scale);
        let value_range = if self.vertical() {
            (area.height, 0.0)
        } else {
            (0.0, area.width)
        };
        let band_range = if self.vertical() {
            (0.0, area.width)
        } else {
            (0.0, area.height)
        };
        let value = match self.options.y_scale {
            ScaleType::Linear => {
                let domain = if d1 > d0 {
                    nice_domain(d0, d1, VALUE_TICKS)
                } else {
                    (d0, d1)
                };
                ValueScale::Linear(LinearScale::new(domain, value_range))
            }
            ScaleType::Log => ValueScale::Log(LogScale::new((d0, d1), value_range).nice()),
        };
        Layout {
            area,
            band: BandScale::new(labels, band_range).padding(self.options.bar_padding),
            value,
        }
    }

    /// `(x, y, width, height)` of bar `index` relative to the plot origin.
    fn bar_rect(layout: &Layout, vertical: bool, index: usize, value: f64) -> (f64, f64, f64, f64) {
        let pos = layout.band.position_at(index).unwrap_or(0.0);
        let bw = layout.band.bandwidth();
        let base = layout.value.baseline();
        let end = layout.value.apply(value);
        if vertical {
            (pos, end.min(base), bw, (base - end).abs())
        } else {
            (base.min(end), pos, (end - base).abs(), bw)
        }
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        if self.data.records.is_empty() {
            return Err(ChartError::InvalidData("no values to draw".into()));
        }
        let theme = self.base.theme();
        self.base.draw_title(surface, &theme);
        let layout = self.build_layout();
        let vertical = self.vertical();
        let area = layout.area;
        let root = surface.root();
        let plot = surface.element(
            root,
            "g",
            [("class", "plot".to_string()), ("transform", translate(area.x, area.y))],
        );

        let value_ticks = axis::value_ticks(&layout.value, VALUE_TICKS);
        let band_ticks = axis::band_ticks(&layout.band);
        let grid = self.options.grid;
        let (h_ticks, v_ticks) = if vertical {
            (&value_ticks, &band_ticks)
        } else {
            (&band_ticks, &value_ticks)
        };
        if grid.horizontal() {
            axis::draw_grid(surface, plot, true, h_ticks, area.width, &theme.grid);
        }
        if grid.vertical() {
            axis::draw_grid(surface, plot, false, v_ticks, area.height, &theme.grid);
        }

        let defs = self.options.gradient.then(|| surface.element(root, "defs", [("class", "bar-gradients")]));
        let bars_g = surface.element(plot, "g", [("class", "bars")]);
        let base_px = layout.value.baseline();
        let duration = self.base.duration_ms();
        let easing = self.base.easing();
        let locale = self.base.locale().to_string();
        self.bars.clear();
        for i in 0..self.data.records.len() {
            let point = self.data.records[i].clone();
            let color = self.color(i);
            let fill = match defs {
                Some(defs) => {
                    let id = format!("bar-gradient-{}-{i}", self.base.container());
                    let light = Rgb::parse(&color).map(|c| c.brighter(0.5).to_hex()).unwrap_or(color.clone());
                    let (x2, y2) = if vertical { ("0", "1") } else { ("1", "0") };
                    let grad = surface.element(
                        defs,
                        "linearGradient",
                        [("id", id.clone()), ("x1", "0".into()), ("y1", "0".into()), ("x2", x2.into()), ("y2", y2.into())],
                    );
                    surface.element(grad, "stop", [("offset", "0%"), ("stop-color", light.as_str())]);
                    surface.element(grad, "stop", [("offset", "100%"), ("stop-color", color.as_str())]);
                    format!("url(#{id})")
                }
                None => color.clone(),
            };
            let (x, y, w, h) = Self::bar_rect(&layout, vertical, i, point.value);
            // bars grow out of the baseline
            let (x0, y0, w0, h0) = if vertical { (x, base_px, w, 0.0) } else { (base_px, y, 0.0, h) };
            let rect = surface.element(
                bars_g,
                "rect",
                [
                    ("class", "bar".to_string()),
                    ("x", num(x0)),
                    ("y", num(y0)),
                    ("width", num(w0)),
                    ("height", num(h0)),
                    ("rx", num(self.options.corner_radius)),
                    ("ry", num(self.options.corner_radius)),
                    ("fill", fill),
                    ("data-index", i.to_string()),
                    ("aria-label", format!("{}: {}", point.label, format_value(point.value, &locale))),
                ],
            );
            let delay = i as f64 * 50.0;
            if vertical {
                self.base.schedule(Tween::number(rect, "y", y0, y).timing(duration, delay, easing));
                self.base.schedule(Tween::number(rect, "height", 0.0, h).timing(duration, delay, easing));
            } else {
                self.base.schedule(Tween::number(rect, "width", 0.0, w).timing(duration, delay, easing));
            }
            self.bars.push(rect);

            if self.options.show_values {
                let (tx, ty, anchor) = if vertical {
                    (x + w / 2.0, y - 5.0, "middle")
                } else {
                    (x + w + 5.0, y + h / 2.0, "start")
                };
                let label = surface.text(
                    bars_g,
                    format_value(point.value, &locale),
                    [
                        ("class", "bar-value".to_string()),
                        ("x", num(tx)),
                        ("y", num(ty)),
                        ("dy", if vertical { "0" } else { "0.35em" }.to_string()),
                        ("text-anchor", anchor.to_string()),
                        ("font-size", num(VALUE_FONT_PX)),
                        ("fill", theme.text.clone()),
                        ("opacity", "0".to_string()),
                    ],
                );
                self.base
                    .schedule(Tween::number(label, "opacity", 0.0, 1.0).timing(duration / 2.0, duration + delay, easing));
            }
        }

        let (band_side, value_side) = if vertical {
            (AxisSide::Bottom, AxisSide::Left)
        } else {
            (AxisSide::Left, AxisSide::Bottom)
        };
        let band_offset = if vertical { (0.0, area.height) } else { (0.0, 0.0) };
        let value_offset = if vertical { (0.0, 0.0) } else { (0.0, area.height) };
        let (band_len, value_len) = if vertical {
            (area.width, area.height)
        } else {
            (area.height, area.width)
        };
        let value_range = if vertical { (value_len, 0.0) } else { (0.0, value_len) };
        axis::draw(surface, plot, band_side, (0.0, band_len), &band_ticks, band_offset, &theme.text);
        axis::draw(surface, plot, value_side, value_range, &value_ticks, value_offset, &theme.text);

        self.layout = Some(layout);
        self.hovered = None;
        Ok(())
    }

    fn highlight(&mut self, index: Option<usize>) {
        self.hovered = index;
        let Some(surface) = self.base.surface() else {
            return;
        };
        let mut s = surface.borrow_mut();
        for (i, bar) in self.bars.iter().enumerate() {
            s.set_attr(*bar, "opacity", if Some(i) == index || index.is_none() { "1" } else { "0.8" });
        }
    }

    pub fn bar_at(&self, x: f64, y: f64) -> Option<usize> {
        let layout = self.layout.as_ref()?;
        if !layout.area.contains(x, y) {
            return None;
        }
        let px = if self.vertical() {
            x - layout.area.x
        } else {
            y - layout.area.y
        };
        layout.band.index_at(px)
    }
}

impl Chart for BarChart {
    fn base(&self) -> &ChartBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChartBase {
        &mut self.base
    }

    fn set_data(&mut self, payload: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.data = normalize::categorical(payload, false, self.options.sort_data);
        log_normalized(CHART_TYPE, &self.data);
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
        export(&self.data.records, format, || categorical_table(&self.data.records))
    }

    fn options_json(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }

    fn update_options(&mut self, patch: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.options = merge_options(&self.options, patch)?;
        self.base.set_options(self.options.base.clone());
        if patch.get("sortData").is_some() {
            let payload = self.data.to_payload();
            self.data = normalize::categorical(&payload, false, self.options.sort_data);
        }
        self.render()
    }

    fn hover_item(&mut self, index: usize) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        let Some(layout) = self.layout.as_ref() else {
            return Ok(None);
        };
        let Some(point) = self.data.records.get(index) else {
            return Ok(None);
        };
        let (x, y, w, _) = Self::bar_rect(layout, self.vertical(), index, point.value);
        let tip = Tooltip::new(layout.area.x + x + w / 2.0, layout.area.y + y, point.label.clone())
            .line(format_value(point.value, self.base.locale()));
        self.highlight(Some(index));
        if !self.options.tooltip.show {
            return Ok(None);
        }
        self.base.set_tooltip(Some(tip.clone()));
        Ok(Some(tip))
    }

    fn click_item(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some(point) = self.data.records.get(index) {
            self.base.emit(BAR_CLICK_EVENT, json!({ "data": point, "index": index }));
        }
        Ok(())
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        match self.bar_at(x, y) {
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
        Ok(Box::new(BarChart::new(env, container, options)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(options: Value) -> BarChart {
        let env = ChartEnv::default();
        env.document.add_container("bars", 600.0, 400.0);
        BarChart::new(env, "bars", &options).unwrap()
    }

    #[test]
    fn object_payload_sorted_descending() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!({"x": 5, "y": 7, "z": 3})).unwrap();
        let labels: Vec<&str> = c.data().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["y", "x", "z"]);
        let (d0, d1) = value_domain(c.data(), ScaleType::Linear);
        assert_eq!(d0, 0.0);
        assert!((d1 - 7.7).abs() < 1e-9);
        assert_eq!(c.axis_domain(), Some((0.0, 8.0)));
    }

    #[test]
    fn all_zero_values_draw_flat_bars() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!([{"label": "a", "value": 0}, {"label": "b", "value": 0}])).unwrap();
        assert_eq!(c.axis_domain(), Some((0.0, 0.0)));
        let surface = c.base.surface().unwrap();
        let s = surface.borrow();
        for bar in &c.bars {
            assert_eq!(s.attr(*bar, "height"), Some("0"));
        }
        assert!(!c.svg().unwrap().contains("NaN"));
    }

    #[test]
    fn horizontal_zero_bars_have_zero_width() {
        let mut c = chart(json!({"orientation": "horizontal", "animation": {"durationMs": 0}}));
        c.set_data(&json!([{"label": "a", "value": 0}])).unwrap();
        let surface = c.base.surface().unwrap();
        assert_eq!(surface.borrow().attr(c.bars[0], "width"), Some("0"));
    }

    #[test]
    fn log_domain_starts_at_one() {
        let points = vec![
            CategoricalPoint { label: "a".into(), value: 0.5, color: None },
            CategoricalPoint { label: "b".into(), value: 100.0, color: None },
        ];
        let (lo, hi) = value_domain(&points, ScaleType::Log);
        assert_eq!(lo, 1.0);
        assert!((hi - 110.0).abs() < 1e-9);
    }

    #[test]
    fn gradient_defines_one_gradient_per_bar() {
        let mut c = chart(json!({"gradient": true, "showValues": true, "animation": {"durationMs": 0}}));
        c.set_data(&json!({"a": 1500, "b": 2})).unwrap();
        let svg = c.svg().unwrap();
        assert_eq!(svg.matches("<linearGradient").count(), 2);
        assert!(svg.contains("url(#bar-gradient-bars-0)"));
        assert!(svg.contains(">1,500<"));
    }

    #[test]
    fn bad_orientation_falls_back_to_vertical() {
        let c = chart(json!({"orientation": "diagonal"}));
        assert_eq!(c.options().orientation, Orientation::Vertical);
    }
}
