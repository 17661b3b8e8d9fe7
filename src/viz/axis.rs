//! Axes and grid lines drawn into the chart surface.

use super::scale::{BandScale, TimeScale, ValueScale, format_time};
use super::scene::{NodeId, Surface, num, translate};
use super::util::format_tick;

const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;
const FONT_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl AxisSide {
    fn horizontal(self) -> bool {
        matches!(self, AxisSide::Top | AxisSide::Bottom)
    }

    /// +1 for ticks growing down/right, −1 for up/left.
    fn direction(self) -> f64 {
        match self {
            AxisSide::Top | AxisSide::Left => -1.0,
            AxisSide::Bottom | AxisSide::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

/// Ticks at `count` nice values of a value scale.
pub fn value_ticks(scale: &ValueScale, count: usize) -> Vec<Tick> {
    scale
        .ticks(count)
        .into_iter()
        .map(|v| Tick {
            position: scale.apply(v),
            label: format_tick(v),
        })
        .collect()
}

/// One tick per band, centered.
pub fn band_ticks(scale: &BandScale) -> Vec<Tick> {
    let half = scale.bandwidth() / 2.0;
    scale
        .domain()
        .iter()
        .filter_map(|k| {
            scale.position(k).map(|p| Tick {
                position: p + half,
                label: k.clone(),
            })
        })
        .collect()
}

/// Ticks at calendar-aligned instants, labeled with the format matching the interval.
pub fn time_ticks(scale: &TimeScale, count: usize) -> Vec<Tick> {
    let pattern = scale.tick_format(count);
    scale
        .ticks(count)
        .into_iter()
        .map(|ms| Tick {
            position: scale.apply(ms),
            label: format_time(ms, pattern),
        })
        .collect()
}

/// Draw an axis: a domain path over `range` plus one `g.tick` per tick.
pub fn draw(
    surface: &mut Surface,
    parent: NodeId,
    side: AxisSide,
    range: (f64, f64),
    ticks: &[Tick],
    offset: (f64, f64),
    color: &str,
) -> NodeId {
    let class = if side.horizontal() {
        "axis x-axis"
    } else {
        "axis y-axis"
    };
    let g = surface.element(
        parent,
        "g",
        [
            ("class", class.to_string()),
            ("transform", translate(offset.0, offset.1)),
            ("font-size", num(FONT_PX)),
        ],
    );
    let k = side.direction() * TICK_SIZE;
    let (r0, r1) = range;
    let domain = if side.horizontal() {
        format!("M{},{}V0H{}V{}", num(r0), num(k), num(r1), num(k))
    } else {
        format!("M{},{}H0V{}H{}", num(k), num(r0), num(r1), num(k))
    };
    surface.element(
        g,
        "path",
        [
            ("class", "domain".to_string()),
            ("d", domain),
            ("stroke", color.to_string()),
            ("fill", "none".to_string()),
        ],
    );
    for tick in ticks {
        let (transform, line_attr, text_pos, anchor, dy) = match side {
            AxisSide::Bottom => (translate(tick.position, 0.0), "y2", ("y", k + TICK_PADDING), "middle", "0.71em"),
            AxisSide::Top => (translate(tick.position, 0.0), "y2", ("y", k - TICK_PADDING), "middle", "0em"),
            AxisSide::Left => (translate(0.0, tick.position), "x2", ("x", k - TICK_PADDING), "end", "0.32em"),
            AxisSide::Right => (translate(0.0, tick.position), "x2", ("x", k + TICK_PADDING), "start", "0.32em"),
        };
        let tg = surface.element(g, "g", [("class", "tick".to_string()), ("transform", transform)]);
        surface.element(tg, "line", [(line_attr, num(k)), ("stroke", color.to_string())]);
        surface.text(
            tg,
            tick.label.clone(),
            [
                (text_pos.0, num(text_pos.1)),
                ("dy", dy.to_string()),
                ("text-anchor", anchor.to_string()),
                ("fill", color.to_string()),
            ],
        );
    }
    g
}

/// Grid lines across the plot at each tick position.
pub fn draw_grid(
    surface: &mut Surface,
    parent: NodeId,
    horizontal: bool,
    ticks: &[Tick],
    length: f64,
    color: &str,
) -> NodeId {
    let class = if horizontal {
        "grid grid-horizontal"
    } else {
        "grid grid-vertical"
    };
    let g = surface.element(parent, "g", [("class", class)]);
    for tick in ticks {
        let p = num(tick.position);
        let (x1, y1, x2, y2) = if horizontal {
            ("0".to_string(), p.clone(), num(length), p)
        } else {
            (p.clone(), "0".to_string(), p, num(length))
        };
        surface.element(
            g,
            "line",
            [
                ("class", "grid-line".to_string()),
                ("x1", x1),
                ("y1", y1),
                ("x2", x2),
                ("y2", y2),
                ("stroke", color.to_string()),
                ("stroke-opacity", "0.7".to_string()),
                ("shape-rendering", "crispEdges".to_string()),
            ],
        );
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::scale::LinearScale;

    #[test]
    fn bottom_axis_has_domain_and_ticks() {
        let scale = ValueScale::Linear(LinearScale::new((0.0, 10.0), (0.0, 100.0)));
        let ticks = value_ticks(&scale, 5);
        assert_eq!(ticks.first().map(|t| t.label.as_str()), Some("0"));
        assert_eq!(ticks.last().map(|t| t.position), Some(100.0));
        let mut s = Surface::new(200.0, 200.0);
        let root = s.root();
        let axis = draw(&mut s, root, AxisSide::Bottom, (0.0, 100.0), &ticks, (0.0, 150.0), "#333");
        assert_eq!(s.count_class("tick"), ticks.len());
        assert_eq!(s.count_class("domain"), 1);
        assert_eq!(s.attr(axis, "transform"), Some("translate(0,150)"));
    }

    #[test]
    fn band_ticks_are_centered() {
        let band = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0));
        let ticks = band_ticks(&band);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].position, band.position("a").unwrap_or(0.0) + band.bandwidth() / 2.0);
    }

    #[test]
    fn grid_draws_one_line_per_tick() {
        let mut s = Surface::new(100.0, 100.0);
        let root = s.root();
        let ticks = vec![
            Tick { position: 10.0, label: String::new() },
            Tick { position: 20.0, label: String::new() },
        ];
        draw_grid(&mut s, root, true, &ticks, 80.0, "#eee");
        assert_eq!(s.count_class("grid-line"), 2);
    }
}
