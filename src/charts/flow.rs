//! Force-directed flow graph: processes or hosts as nodes, flows as arrows.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;

use super::{export, log_normalized, merge_options};
use crate::error::{ChartError, Result};
use crate::models::{FlowGraph, Normalized};
use crate::normalize;
use crate::registry::ChartRegistry;
use crate::storage::Table;
use crate::viz::anim::{Tween, TweenValue};
use crate::viz::base::{Chart, ChartBase, ChartEnv, PlotArea, Tooltip};
use crate::viz::force::Simulation;
use crate::viz::options::{BaseOptions, ChartOptions, TooltipOptions, resolve};
use crate::viz::scene::{NodeId, Surface, num, translate};
use crate::viz::types::DataFormat;
use crate::viz::util::format_value;
use crate::viz::zoom::{ZoomBehavior, ZoomTransform};

pub const CHART_TYPE: &str = "flow";
pub const NODE_CLICK_EVENT: &str = "flowNodeClick";
pub const ZOOM_EXTENT: (f64, f64) = (0.3, 3.0);
pub const ZOOM_STEP: f64 = 1.5;
pub const ZOOM_TRANSITION_MS: f64 = 300.0;
pub const RESET_TRANSITION_MS: f64 = 500.0;
/// Simulation warmth while a node is dragged.
const DRAG_ALPHA: f64 = 0.3;
const MAX_TICKS: usize = 300;
/// One simulation tick per animation frame.
const FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowOptions {
    #[serde(flatten)]
    pub base: BaseOptions,
    pub link_distance: f64,
    pub charge: f64,
    pub node_radius: f64,
    /// Keep a dragged node pinned where it was dropped.
    pub sticky_drag: bool,
    pub show_labels: bool,
    pub tooltip: TooltipOptions,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            base: BaseOptions::default(),
            link_distance: 100.0,
            charge: -300.0,
            node_radius: 20.0,
            sticky_drag: true,
            show_labels: true,
            tooltip: TooltipOptions::default(),
        }
    }
}

impl ChartOptions for FlowOptions {
    fn base(&self) -> &BaseOptions {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOptions {
        &mut self.base
    }
}

/// Stroke width for a link carrying `count` flows.
pub fn link_width(count: f64) -> f64 {
    (count / 2.0).clamp(1.0, 8.0)
}

pub struct FlowChart {
    base: ChartBase,
    options: FlowOptions,
    data: Normalized<FlowGraph>,
    sim: Option<Simulation>,
    /// Simulation link index → data link index.
    link_map: Vec<usize>,
    zoom: ZoomBehavior,
    area: PlotArea,
    layer: Option<NodeId>,
    node_groups: Vec<NodeId>,
    link_lines: Vec<NodeId>,
    dragging: Option<usize>,
    hovered: Option<usize>,
}

impl FlowChart {
    pub(crate) fn new(env: ChartEnv, container: &str, options: &Value) -> Result<Self> {
        let options: FlowOptions = resolve(options)?;
        let base = ChartBase::new(env, container, CHART_TYPE, options.base.clone())?;
        Ok(Self {
            base,
            options,
            data: Normalized {
                records: FlowGraph::default(),
                rejected: 0,
                anomalies: Vec::new(),
            },
            sim: None,
            link_map: Vec::new(),
            zoom: ZoomBehavior::new(ZOOM_EXTENT, 0.0, 0.0),
            area: PlotArea {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            },
            layer: None,
            node_groups: Vec::new(),
            link_lines: Vec::new(),
            dragging: None,
            hovered: None,
        })
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.data.records
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    pub fn zoom_transform(&self) -> ZoomTransform {
        self.zoom.transform()
    }

    /// Node center in layer coordinates.
    pub fn node_position(&self, index: usize) -> Option<(f64, f64)> {
        self.sim.as_ref()?.node(index).map(|n| (n.x, n.y))
    }

    fn build_simulation(&mut self, center: (f64, f64)) {
        let graph = &self.data.records;
        let ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let index = |id: &str| graph.nodes.iter().position(|n| n.id == id);
        let mut pairs = Vec::with_capacity(graph.links.len());
        self.link_map.clear();
        for (i, l) in graph.links.iter().enumerate() {
            if let (Some(s), Some(t)) = (index(&l.source), index(&l.target)) {
                pairs.push((s, t));
                self.link_map.push(i);
            }
        }
        let mut sim = Simulation::new(ids, &pairs, center)
            .with_link_distance(self.options.link_distance)
            .with_charge(self.options.charge);
        sim.settle(MAX_TICKS);
        self.sim = Some(sim);
    }

    /// Endpoints of link `i`, trimmed so the arrowhead touches the target circle.
    fn link_endpoints(&self, sim: &Simulation, i: usize) -> Option<(f64, f64, f64, f64)> {
        let link = sim.links().get(i)?;
        let (s, t) = (sim.node(link.source)?, sim.node(link.target)?);
        let (dx, dy) = (t.x - s.x, t.y - s.y);
        let len = dx.hypot(dy);
        if len == 0.0 {
            return Some((s.x, s.y, t.x, t.y));
        }
        let r = self.options.node_radius;
        Some((s.x, s.y, t.x - dx / len * r, t.y - dy / len * r))
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        if self.data.records.nodes.is_empty() {
            return Err(ChartError::InvalidData("flow graph has no nodes".into()));
        }
        let theme = self.base.theme();
        self.base.draw_title(surface, &theme);
        let area = self.base.plot_area(None);
        self.area = area;
        let center = (area.width / 2.0, area.height / 2.0);
        match self.sim.as_mut() {
            Some(sim) => sim.set_center(center),
            None => self.build_simulation(center),
        }
        let previous = self.zoom.transform();
        self.zoom = ZoomBehavior::new(ZOOM_EXTENT, area.width, area.height);
        self.zoom.set(previous);

        let root = surface.root();
        let marker_id = format!("arrow-{}", self.base.container());
        let defs = surface.element(root, "defs", [("class", "flow-defs")]);
        let marker = surface.element(
            defs,
            "marker",
            [
                ("id", marker_id.as_str()),
                ("viewBox", "0 -5 10 10"),
                ("refX", "10"),
                ("refY", "0"),
                ("markerWidth", "6"),
                ("markerHeight", "6"),
                ("orient", "auto"),
            ],
        );
        surface.element(marker, "path", [("d", "M0,-5L10,0L0,5"), ("fill", theme.grid.as_str())]);

        let plot = surface.element(
            root,
            "g",
            [("class", "plot".to_string()), ("transform", translate(area.x, area.y))],
        );
        surface.element(
            plot,
            "rect",
            [
                ("class", "zoom-surface".to_string()),
                ("width", num(area.width)),
                ("height", num(area.height)),
                ("fill", "none".to_string()),
                ("pointer-events", "all".to_string()),
            ],
        );
        let layer = surface.element(
            plot,
            "g",
            [("class", "zoom-layer".to_string()), ("transform", self.zoom.transform().to_svg())],
        );
        let links_g = surface.element(layer, "g", [("class", "links")]);
        let nodes_g = surface.element(layer, "g", [("class", "nodes")]);

        let Some(sim) = self.sim.clone() else {
            return Err(ChartError::RenderFailure("simulation missing".into()));
        };
        self.link_lines.clear();
        for (i, &data_index) in self.link_map.iter().enumerate() {
            let link = &self.data.records.links[data_index];
            let (x1, y1, x2, y2) = self.link_endpoints(&sim, i).unwrap_or_default();
            let line = surface.element(
                links_g,
                "line",
                [
                    ("class", "flow-link".to_string()),
                    ("x1", num(x1)),
                    ("y1", num(y1)),
                    ("x2", num(x2)),
                    ("y2", num(y2)),
                    ("stroke", theme.grid.clone()),
                    ("stroke-width", num(link_width(link.count))),
                    ("marker-end", format!("url(#{marker_id})")),
                ],
            );
            self.link_lines.push(line);
        }

        let duration = self.base.duration_ms();
        let easing = self.base.easing();
        let radius = self.options.node_radius;
        self.node_groups.clear();
        for (i, (node, pos)) in self.data.records.nodes.iter().zip(sim.nodes()).enumerate() {
            let g = surface.element(
                nodes_g,
                "g",
                [
                    ("class", "flow-node".to_string()),
                    ("transform", translate(pos.x, pos.y)),
                    ("data-id", node.id.clone()),
                ],
            );
            let circle = surface.element(
                g,
                "circle",
                [
                    ("r", "0".to_string()),
                    ("fill", self.base.get_color(i, "primary")),
                    ("stroke", theme.background.clone()),
                    ("stroke-width", "2".to_string()),
                ],
            );
            self.base
                .schedule(Tween::number(circle, "r", 0.0, radius).timing(duration, 0.0, easing));
            if self.options.show_labels {
                surface.text(
                    g,
                    node.label.clone().unwrap_or_else(|| node.id.clone()),
                    [
                        ("dy", num(radius + 14.0)),
                        ("text-anchor", "middle".to_string()),
                        ("font-size", "11".to_string()),
                        ("fill", theme.text.clone()),
                    ],
                );
            }
            self.node_groups.push(g);
        }

        self.layer = Some(layer);
        self.hovered = None;
        Ok(())
    }

    /// Write simulation positions into the scene.
    fn sync_positions(&self) {
        let (Some(sim), Some(surface)) = (self.sim.as_ref(), self.base.surface()) else {
            return;
        };
        let mut s = surface.borrow_mut();
        for (g, n) in self.node_groups.iter().zip(sim.nodes()) {
            s.set_attr(*g, "transform", translate(n.x, n.y));
        }
        for (i, line) in self.link_lines.iter().enumerate() {
            if let Some((x1, y1, x2, y2)) = self.link_endpoints(sim, i) {
                s.set_attr(*line, "x1", num(x1));
                s.set_attr(*line, "y1", num(y1));
                s.set_attr(*line, "x2", num(x2));
                s.set_attr(*line, "y2", num(y2));
            }
        }
    }

    /// Move the layer to `to`, tweening over `duration_ms`.
    fn transition_to(&mut self, to: ZoomTransform, duration_ms: f64) {
        let from = self.zoom.transform();
        let to = self.zoom.set(to);
        let Some(layer) = self.layer else {
            return;
        };
        if duration_ms > 0.0 {
            let tween = Tween::new(layer, "transform", TweenValue::Transform { from, to });
            self.base
                .schedule(tween.timing(duration_ms, 0.0, self.base.easing()));
        } else if let Some(surface) = self.base.surface() {
            surface.borrow_mut().set_attr(layer, "transform", to.to_svg());
        }
    }

    fn zoom_by(&mut self, factor: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let center = self.zoom.center();
        let mut probe = self.zoom.clone();
        let target = probe.scale_by(factor, center);
        self.transition_to(target, ZOOM_TRANSITION_MS);
        Ok(())
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.zoom_by(1.0 / ZOOM_STEP)
    }

    /// Back to the identity transform. Pins are left alone.
    pub fn reset_zoom(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        self.transition_to(ZoomTransform::IDENTITY, RESET_TRANSITION_MS);
        Ok(())
    }

    /// Translate so the node bounding box sits in the middle of the panel.
    pub fn center_view(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        let Some((x0, y0, x1, y1)) = self.sim.as_ref().and_then(Simulation::bounds) else {
            return Ok(());
        };
        let k = self.zoom.transform().k;
        let (cx, cy) = self.zoom.center();
        let (bx, by) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        self.transition_to(ZoomTransform::new(k, cx - bx * k, cy - by * k), RESET_TRANSITION_MS);
        Ok(())
    }

    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let mut probe = self.zoom.clone();
        let target = probe.wheel(delta_y, (x - self.area.x, y - self.area.y));
        self.transition_to(target, 0.0);
        Ok(())
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let t = self.zoom.transform().translate(dx / self.zoom.transform().k, dy / self.zoom.transform().k);
        self.transition_to(t, 0.0);
        Ok(())
    }

    /// Surface point → layer coordinates.
    fn to_layer(&self, x: f64, y: f64) -> (f64, f64) {
        self.zoom.transform().invert((x - self.area.x, y - self.area.y))
    }

    pub fn drag_start(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        let Some(sim) = self.sim.as_mut() else {
            return Ok(());
        };
        let Some((x, y)) = sim.node(index).map(|n| (n.x, n.y)) else {
            return Ok(());
        };
        sim.set_alpha_target(DRAG_ALPHA);
        sim.pin(index, x, y);
        self.dragging = Some(index);
        Ok(())
    }

    /// Drag node `index` to surface point `(x, y)`.
    pub fn drag(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        self.base.ensure_alive()?;
        let (lx, ly) = self.to_layer(x, y);
        if let Some(sim) = self.sim.as_mut() {
            sim.pin(index, lx, ly);
            sim.tick();
        }
        self.sync_positions();
        Ok(())
    }

    pub fn drag_end(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some(sim) = self.sim.as_mut() {
            sim.set_alpha_target(0.0);
            if !self.options.sticky_drag {
                sim.release(index);
            }
        }
        self.dragging = None;
        Ok(())
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.sim
            .as_ref()
            .and_then(|s| s.node(index))
            .is_some_and(|n| n.fx.is_some() && n.fy.is_some())
    }

    pub fn node_at(&self, x: f64, y: f64) -> Option<usize> {
        if !self.area.contains(x, y) {
            return None;
        }
        let (lx, ly) = self.to_layer(x, y);
        let r = self.options.node_radius;
        self.sim
            .as_ref()?
            .nodes()
            .iter()
            .rposition(|n| (n.x - lx).hypot(n.y - ly) <= r)
    }

    fn highlight(&mut self, index: Option<usize>) {
        self.hovered = index;
        let (Some(surface), Some(sim)) = (self.base.surface(), self.sim.as_ref()) else {
            return;
        };
        let accent = self.base.theme().accent;
        let mut s = surface.borrow_mut();
        for (i, g) in self.node_groups.iter().enumerate() {
            let Some(&circle) = s.children(*g).first() else {
                continue;
            };
            if Some(i) == index {
                s.set_attr(circle, "stroke", accent.clone());
            } else {
                s.remove_attr(circle, "stroke");
            }
        }
        for (line, link) in self.link_lines.iter().zip(sim.links()) {
            let touches = index.is_none_or(|i| link.source == i || link.target == i);
            s.set_attr(*line, "stroke-opacity", if touches { "1" } else { "0.2" });
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    fn export_table(&self) -> Table {
        let mut t = Table::new(["source", "target", "count"]);
        for l in &self.data.records.links {
            t.push(vec![l.source.as_str().into(), l.target.as_str().into(), l.count.into()]);
        }
        t
    }
}

impl Chart for FlowChart {
    fn base(&self) -> &ChartBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChartBase {
        &mut self.base
    }

    fn set_data(&mut self, payload: &Value) -> Result<()> {
        self.base.ensure_alive()?;
        self.data = normalize::flow_graph(payload);
        log_normalized(CHART_TYPE, &self.data);
        self.sim = None;
        self.dragging = None;
        self.zoom.reset();
        self.render()?;
        self.base.announce_update(self.data.records.nodes.len());
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let surface = self.base.begin_render()?;
        let result = self.draw(&mut surface.borrow_mut());
        self.base.conclude(result)
    }

    fn record_count(&self) -> usize {
        self.data.records.nodes.len()
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
        self.sim = None;
        self.render()
    }

    fn hover_item(&mut self, index: usize) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        let (Some(node), Some((x, y))) = (self.data.records.nodes.get(index), self.node_position(index)) else {
            return Ok(None);
        };
        let id = node.id.clone();
        let title = node.label.clone().unwrap_or_else(|| id.clone());
        let links = &self.data.records.links;
        let outgoing: f64 = links.iter().filter(|l| l.source == id).map(|l| l.count).sum();
        let incoming: f64 = links.iter().filter(|l| l.target == id).map(|l| l.count).sum();
        let locale = self.base.locale();
        let (sx, sy) = self.zoom.transform().apply((x, y));
        let tip = Tooltip::new(self.area.x + sx, self.area.y + sy, title)
            .line(format!("Outgoing: {}", format_value(outgoing, locale)))
            .line(format!("Incoming: {}", format_value(incoming, locale)));
        self.highlight(Some(index));
        if !self.options.tooltip.show {
            return Ok(None);
        }
        self.base.set_tooltip(Some(tip.clone()));
        Ok(Some(tip))
    }

    fn click_item(&mut self, index: usize) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some(node) = self.data.records.nodes.get(index) {
            self.base.emit(NODE_CLICK_EVENT, json!({ "data": node, "index": index }));
        }
        Ok(())
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Tooltip>> {
        self.base.ensure_alive()?;
        if let Some(i) = self.dragging {
            self.drag(i, x, y)?;
            return Ok(None);
        }
        match self.node_at(x, y) {
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

    /// Tweens plus one simulation tick per elapsed frame while the layout is warm.
    fn advance(&mut self, ms: f64) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some(sim) = self.sim.as_mut() {
            let frames = (ms / FRAME_MS).ceil().max(0.0) as usize;
            for _ in 0..frames {
                if sim.is_settled() {
                    break;
                }
                sim.tick();
            }
        }
        self.sync_positions();
        self.base.advance(ms);
        Ok(())
    }

    fn settle(&mut self) -> Result<()> {
        self.base.ensure_alive()?;
        if let Some(sim) = self.sim.as_mut() {
            sim.settle(MAX_TICKS);
        }
        self.sync_positions();
        self.base.settle();
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
        Ok(Box::new(FlowChart::new(env, container, options)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(options: Value) -> FlowChart {
        let env = ChartEnv::default();
        env.document.add_container("flow", 600.0, 500.0);
        FlowChart::new(env, "flow", &options).unwrap()
    }

    fn ring(n: usize) -> Value {
        let nodes: Vec<Value> = (0..n).map(|i| json!({"id": format!("p{i}")})).collect();
        let links: Vec<Value> = (0..n)
            .map(|i| json!({"source": format!("p{i}"), "target": format!("p{}", (i + 1) % n), "count": 2 * (i + 1)}))
            .collect();
        json!({"nodes": nodes, "links": links})
    }

    fn layer_transform(c: &FlowChart) -> String {
        let surface = c.base.surface().unwrap();
        let value = surface.borrow().attr(c.layer.unwrap(), "transform").unwrap().to_string();
        value
    }

    #[test]
    fn reset_returns_to_identity_and_keeps_pins() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&ring(5)).unwrap();
        for i in 0..5 {
            c.drag_start(i).unwrap();
            c.drag(i, 100.0 + i as f64 * 60.0, 120.0).unwrap();
            c.drag_end(i).unwrap();
        }
        c.zoom_in().unwrap();
        c.settle().unwrap();
        assert_eq!(c.zoom_transform().k, 1.5);

        c.reset_zoom().unwrap();
        assert!(c.zoom_transform().is_identity());
        assert_ne!(layer_transform(&c), ZoomTransform::IDENTITY.to_svg());
        c.advance(RESET_TRANSITION_MS).unwrap();
        assert_eq!(layer_transform(&c), ZoomTransform::IDENTITY.to_svg());
        assert!((0..5).all(|i| c.is_pinned(i)));
    }

    #[test]
    fn loose_drag_releases_the_node() {
        let mut c = chart(json!({"stickyDrag": false, "animation": {"durationMs": 0}}));
        c.set_data(&ring(3)).unwrap();
        c.drag_start(0).unwrap();
        c.drag(0, 50.0, 60.0).unwrap();
        assert!(c.is_pinned(0));
        c.drag_end(0).unwrap();
        assert!(!c.is_pinned(0));
    }

    #[test]
    fn link_widths_are_clamped() {
        assert_eq!(link_width(1.0), 1.0);
        assert_eq!(link_width(6.0), 3.0);
        assert_eq!(link_width(40.0), 8.0);
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&ring(4)).unwrap();
        let svg = c.svg().unwrap();
        assert_eq!(svg.matches("class=\"flow-link\"").count(), 4);
        assert!(svg.contains("marker-end=\"url(#arrow-flow)\""));
    }

    #[test]
    fn zoom_controls_respect_the_extent() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&ring(3)).unwrap();
        for _ in 0..10 {
            c.zoom_in().unwrap();
        }
        assert_eq!(c.zoom_transform().k, 3.0);
        for _ in 0..20 {
            c.zoom_out().unwrap();
        }
        assert_eq!(c.zoom_transform().k, 0.3);
    }

    #[test]
    fn center_view_moves_the_box_to_the_middle() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&ring(4)).unwrap();
        c.pan(120.0, -40.0).unwrap();
        c.center_view().unwrap();
        let (x0, y0, x1, y1) = c.simulation().unwrap().bounds().unwrap();
        let (sx, sy) = c.zoom_transform().apply(((x0 + x1) / 2.0, (y0 + y1) / 2.0));
        let (cx, cy) = (c.area.width / 2.0, c.area.height / 2.0);
        assert!((sx - cx).abs() < 1e-6 && (sy - cy).abs() < 1e-6);
    }

    #[test]
    fn hover_sums_flows_and_click_emits() {
        let mut c = chart(json!({"animation": {"durationMs": 0}}));
        c.set_data(&ring(3)).unwrap();
        let tip = c.hover_item(1).unwrap().unwrap();
        assert_eq!(tip.title, "p1");
        assert_eq!(tip.lines, vec!["Outgoing: 4", "Incoming: 2"]);
        c.click_item(1).unwrap();
        let ev = c.base.document().events().events_named(NODE_CLICK_EVENT);
        assert_eq!(ev[0].detail["data"]["id"], "p1");
        assert_eq!(
            c.export_data(DataFormat::Csv).unwrap(),
            "source,target,count\np0,p1,2\np1,p2,4\np2,p0,6"
        );
    }

    #[test]
    fn empty_graph_shows_the_empty_panel() {
        let mut c = chart(json!({}));
        c.set_data(&json!({"nodes": [], "links": []})).unwrap();
        assert!(c.base.document().panel("flow").is_some());
        assert_eq!(c.record_count(), 0);
    }
}
