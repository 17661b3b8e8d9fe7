//! Pie and donut chart.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;
use std::f64::consts::TAU;

use super::{categorical_table, export, log_normalized, merge_options};
use crate::error::{ChartError, Result};
use crate::models::{CategoricalPoint, Normalized};
use crate::normalize;
use crate::registry::ChartRegistry;
use crate::viz::anim::{Tween, TweenValue};
use crate::viz::base::{Chart, ChartBase, ChartEnv, Tooltip};
use crate::viz::legend::LegendItem;
use crate::viz::options::{BaseOptions, ChartOptions, LegendOptions, TooltipOptions, resolve};
use crate::viz::scene::{NodeId, Surface, num, translate};
use crate::viz::shape::{Arc, PieSlice, pie_layout};
use crate::viz::types::DataFormat;
use crate::viz::util::{format_percent, format_value};

pub const CHART_TYPE: &str = "pie";
pub const SLICE_CLICK_EVENT: &str = "pieSliceClick";
const HOVER_SCALE: f64 = 1.05;
const LABEL_FONT_PX: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PieOptions {
    #[serde(flatten)]
    pub base: BaseOptions,
    /// 0 draws a pie, anything larger a donut.
    pub inner_radius: f64,
    /// Defaults to `min(w, h) / 2 − 10` of the plot area.
    pub outer_radius: Option<f64>,
    pub pad_angle: f64,
    pub corner_radius: f64,
    pub sort_data: bool,
    /// Slices narrower than this (radians) get no label.
    pub min_slice_angle: f64,
    pub show_labels: bool,
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
}

impl Default for PieOptions {
    fn default() -> Self {
        Self {
            base: BaseOptions::default(),
            inner_radius: 0.0,
            outer_radius: None,
            pad_angle: 0.0,
            corner_radius: 0.0,
            sort_data: true,
            min_slice_angle: 0.1,
            show_labels: true,
            legend: LegendOptions::default(),
            tooltip: TooltipOptions::default(),
        }
    }
}

impl ChartOptions for PieOptions {
    fn base(&self) -> &BaseOptions {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }
}

pub struct PieChart {
    base: ChartBase,
    options: PieOptions,
    data: Normalized<Vec<CategoricalPoint>>,
    slices: Vec<PieSlice>,
    nodes: Vec<NodeId>,
    arc: Arc,
    center: (f64, f64),
}

impl PieChart {
    pub(crate) fn new(env: ChartEnv, container: &str, options: &Value) -> Result<Self> {
        let options: PieOptions = resolve(options)?;
        let base = ChartBase::new(env, container, CHART_TYPE, options.base.clone())?;
        Ok(Self {
            base,
            options,
            data: Normalized {
                records: Vec::new(),
                rejected: 0,
                anomalies: Vec::new(),
            },
            slices: Vec::new(),
            nodes: Vec::new(),
            arc: Arc::new(0.0, 0.0),
            center: (0.0, 0.0),
        })
    }

    pub fn options(&self) -> &PieOptions {
        &self.options
    }

    pub fn data(&self) -> &[CategoricalPoint] {
        &self.data.records
    }

    /// Layout angles, one per record.
    pub fn slices(&self) -> &[PieSlice] {
        &self.slices
    }

    /// Share of each slice, formatted `60.0%`.
    pub fn percentages(&self) -> Vec<String> {
        self.slices.iter().map(|s| format_percent(s.fraction())).collect()
    }

    fn color(&self, index: usize) -> String {
        self.data.records[index]
            .color
            .clone()
            .unwrap_or_else(|| self.base.get_color(index, "primary"))
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        if self.data.records.is_empty() {
            return Err(ChartError::InvalidData("no positive values to draw".into()));
        }
        let theme = self.base.theme();
        self.base.draw_title(surface, &theme);

        let legend = self.options.legend.show.then(|| {
            let items: Vec<LegendItem> = (0..self.data.records.len())
                .map(|i| LegendItem::new(self.data.records[i].label.clone(), self.color(i)))
                .collect();
            self.base.layout_legend(&items, self.options.legend.position)
        });
        let area = self.base.plot_area(legend.as_ref());
        let outer = self
            .options
            .outer_radius
            .unwrap_or(area.width.min(area.height) / 2.0 - 10.0)
            .max(0.0);
        self.arc = Arc::new(self.options.inner_radius.min(outer), outer)
            .pad_angle(self.options.pad_angle)
            .corner_radius(self.options.corner_radius);
        self.center = area.center();

        let values: Vec<f64> = self.data.records.iter().map(|p| p.value).collect();
        // the normalizer already ordered the records
        self.slices = pie_layout(&values, false);

        let root = surface.root();
        let g = surface.element(
            root,
            "g",
            [("class", "pie".to_string()), ("transform", translate(self.center.0, self.center.1))],
        );
        let locale = self.base.locale().to_string();
        let arc = self.arc;
        let mut tweens = Vec::with_capacity(self.slices.len());
        self.nodes.clear();
        for slice in self.slices.clone() {
            let point = &self.data.records[slice.index];
            let label = format!(
                "{}: {} ({})",
                point.label,
                format_value(point.value, &locale),
                format_percent(slice.fraction())
            );
            let path = surface.element(
                g,
                "path",
                [
                    ("class", "pie-slice".to_string()),
                    ("d", arc.path(0.0, 0.0).to_string()),
                    ("fill", self.color(slice.index)),
                    ("stroke", theme.background.clone()),
                    ("stroke-width", "2".to_string()),
                    ("data-index", slice.index.to_string()),
                    ("aria-label", label),
                ],
            );
            let (a0, a1) = (slice.start_angle, slice.end_angle);
            tweens.push((
                path,
                TweenValue::Custom(Box::new(move |t| arc.path(a0 * t, a1 * t).to_string())),
            ));
            self.nodes.push(path);
        }

        if self.options.show_labels {
            let label_arc = Arc::new(outer * 1.1, outer * 1.1);
            let labels = surface.element(g, "g", [("class", "pie-labels")]);
            for slice in &self.slices {
                if slice.angle() < self.options.min_slice_angle {
                    continue;
                }
                let (x, y) = label_arc.centroid(slice.start_angle, slice.end_angle);
                let mid = (slice.start_angle + slice.end_angle) / 2.0;
                let anchor = if mid < TAU / 2.0 { "start" } else { "end" };
                let text = surface.text(
                    labels,
                    self.data.records[slice.index].label.clone(),
                    [
                        ("class", "pie-label".to_string()),
                        ("x", num(x)),
                        ("y", num(y)),
                        ("dy", "0.35em".to_string()),
                        ("text-anchor", anchor.to_string()),
                        ("font-size", num(LABEL_FONT_PX)),
                        ("fill", theme.text.clone()),
                        ("opacity", "0".to_string()),
                    ],
                );
                let d = self.base.duration_ms();
                self.base
                    .schedule(Tween::number(text, "opacity", 0.0, 1.0).timing(d / 2.0, d, self.base.easing()));
            }
        }

        if let Some(layout) = &legend {
            self.base.draw_legend(surface, layout, &theme);
        }
        for (node, value) in tweens {
            self.base.animate(node, "d", value, 0.0);
        }
        Ok(())
    }

    /// Slice under surface point `(x, y)`.
    pub fn slice_at(&self, x: f64, y: f64) -> Option<usize> {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        let r = dx.hypot(dy);
        if r < self.arc.inner_radius || r > self.arc.outer_radius * HOVER_SCALE {
            return None;
        }
        let a = dx.atan2(-dy).rem_euclid(TAU);
        self.slices
            .iter()
            .find(|s| a >= s.start_angle && a < s.end_angle)
            .map(|s| s.index)
    }

    fn highlight(&mut self, index: Option<usize>) {
        let Some(surface) = self.base.surface() else {
            return;
        };
        let mut s = surface.borrow_mut();
        for (slice, node) in self.slices.iter().zip(&self.nodes) {
            let arc = if Some(slice.index) == index {
                self.arc.scaled(HOVER_SCALE)
            } else {
                self.arc
            };
            s.set_attr(*node, "d", arc.path(slice.start_angle, slice.end_angle).to_string());
        }
    }
}

impl Chart for PieChart {
    fn base(&self) -> &ChartBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChartBase {
        &mut self.base
    }

    fn set_data(&mut self, payload: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.data = normalize::categorical(payload, true, self.options.sort_data);
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
        let sort_changed = patch.get("sortData").is_some();
        self.options = merge_options(&self.options, patch)?;
        self.base.set_options(self.options.base.clone());
        if sort_changed {
            let payload = self.data.to_payload();
            self.data = normalize::categorical(&payload, true, self.options.sort_data);
        }
        self.render()
    }

    fn hover_item(&mut self, index: usize) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        let Some(slice) = self.slices.get(index).copied() else {
            return Ok(None);
        };
        self.highlight(Some(index));
        if !self.options.tooltip.show {
            return Ok(None);
        }
        let point = &self.data.records[index];
        let (cx, cy) = self.arc.centroid(slice.start_angle, slice.end_angle);
        let mut tip = Tooltip::new(self.center.0 + cx, self.center.1 + cy, point.label.clone());
        if self.options.tooltip.show_value {
            tip = tip.line(format!("Value: {}", format_value(point.value, self.base.locale())));
        }
        if self.options.tooltip.show_percentage {
            tip = tip.line(format!("Percentage: {}", format_percent(slice.fraction())));
        }
        self.base.set_tooltip(Some(tip.clone()));
        Ok(Some(tip))
    }

    fn click_item(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        let Some(slice) = self.slices.get(index) else {
            return Ok(());
        };
        let point = &self.data.records[index];
        self.base.emit(
            SLICE_CLICK_EVENT,
            json!({
                "data": point,
                "slice": {
                    "index": index,
                    "startAngle": slice.start_angle,
                    "endAngle": slice.end_angle,
                    "percentage": format_percent(slice.fraction()),
                },
            }),
        );
        Ok(())
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        match self.slice_at(x, y) {
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
        Ok(Box::new(PieChart::new(env, container, options)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(options: Value) -> PieChart {
        let env = ChartEnv::default();
        env.document.add_container("pie", 400.0, 400.0);
        PieChart::new(env, "pie", &options).unwrap()
    }

    #[test]
    fn single_item_spans_the_circle() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&json!([{"label": "only", "value": 100}])).unwrap();
        assert_eq!(c.slices().len(), 1);
        assert!((c.slices()[0].angle() - TAU).abs() < 1e-9);
        assert_eq!(c.percentages(), vec!["100.0%"]);
    }

    #[test]
    fn zero_and_negative_values_are_dropped() {
        let mut c = chart(json!({}));
        c.set_data(&json!({"a": 0, "b": -1, "c": 2})).unwrap();
        assert_eq!(c.record_count(), 1);
        assert_eq!(c.data()[0].label, "c");
    }

    #[test]
    fn narrow_slices_get_no_label() {
        let mut c = chart(json!({"minSliceAngle": 0.5, "animation": {"durationMs": 0}}));
        c.set_data(&json!([{"label": "big", "value": 99}, {"label": "tiny", "value": 1}])).unwrap();
        let surface = c.base.surface().unwrap();
        let s = surface.borrow();
        let labels: Vec<&str> = s
            .find_by_class("pie-label")
            .into_iter()
            .filter_map(|id| s.node(id).text.as_deref())
            .collect();
        assert_eq!(labels, ["big"]);
    }

    #[test]
    fn mounted_chart_follows_theme_changes() {
        let c = chart(json!({"animation": {"durationMs": 0}}));
        let env = c.base.env().clone();
        let handle = crate::viz::base::mount(Box::new(c));
        handle.borrow_mut().set_data(&json!({"a": 2, "b": 1})).unwrap();
        assert!(handle.borrow().svg().unwrap().contains("#4472c4"));
        assert!(env.themes.set_current("dark"));
        let svg = handle.borrow().svg().unwrap();
        assert!(svg.contains("#4fc3f7"));
        assert!(!svg.contains("#4472c4"));
        assert!(!handle.borrow().base().is_invalidated());
    }

    #[test]
    fn mounted_chart_follows_container_resizes() {
        let c = chart(json!({"animation": {"durationMs": 0}}));
        let env = c.base.env().clone();
        let handle = crate::viz::base::mount(Box::new(c));
        handle.borrow_mut().set_data(&json!({"a": 2})).unwrap();
        env.responsive.notify_resize("pie", 300.0, 200.0);
        assert!(handle.borrow().svg().unwrap().contains("viewBox=\"0 0 300 200\""));
    }

    #[test]
    fn hover_scales_the_slice() {
        let mut c = chart(json!({"animation": {"durationMs": 0}, "legend": {"show": false}}));
        c.set_data(&json!([{"label": "A", "value": 3}, {"label": "B", "value": 1}])).unwrap();
        let plain = c.arc.path(c.slices[0].start_angle, c.slices[0].end_angle).to_string();
        let tip = c.hover_item(0).unwrap().unwrap();
        assert_eq!(tip.lines, vec!["Value: 3", "Percentage: 75.0%"]);
        let surface = c.base.surface().unwrap();
        let d = surface.borrow().attr(c.nodes[0], "d").map(str::to_string);
        assert_ne!(d.as_deref(), Some(plain.as_str()));
    }

    #[test]
    fn pointer_finds_slice_by_angle() {
        let mut c = chart(json!({"animation": {"durationMs": 0}, "legend": {"show": false}}));
        c.set_data(&json!([{"label": "A", "value": 1}, {"label": "B", "value": 1}])).unwrap();
        let (cx, cy) = c.center;
        // right half belongs to the first slice (clockwise from 12 o'clock)
        assert_eq!(c.slice_at(cx + 20.0, cy), Some(0));
        assert_eq!(c.slice_at(cx - 20.0, cy), Some(1));
        assert_eq!(c.slice_at(cx + 1000.0, cy), None);
    }
}
