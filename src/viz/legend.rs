//! Legend layout and drawing into the chart surface.
//!
//! Top/bottom legends pack items greedily into rows sized to the container
//! width; left/right legends are a single column. Layout and drawing share the
//! same constants so the reserved band always matches what is drawn.

use super::options::Margin;
use super::scene::{NodeId, Surface, num, translate};
use super::text::{text_width, truncate_to_width};
use super::types::LegendPosition;

pub const FONT_PX: f64 = 12.0;
const LINE_H: f64 = FONT_PX + 6.0;
const ROW_GAP: f64 = 4.0;
const SWATCH: f64 = 12.0;
const SWATCH_TO_TEXT: f64 = 6.0;
const TRAILING_GAP: f64 = 16.0;
const PAD: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub color: String,
}

impl LegendItem {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

/// One item after layout, relative to the legend origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedItem {
    pub index: usize,
    pub label: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendLayout {
    pub position: LegendPosition,
    pub items: Vec<PlacedItem>,
    pub width: f64,
    pub height: f64,
    pub rows: usize,
}

fn block_width(label: &str) -> f64 {
    SWATCH + SWATCH_TO_TEXT + text_width(label, FONT_PX) + TRAILING_GAP
}

/// Lay out `items` for `position` within `available_width` pixels.
pub fn layout(items: &[LegendItem], position: LegendPosition, available_width: f64) -> LegendLayout {
    match position {
        LegendPosition::Top | LegendPosition::Bottom => layout_rows(items, position, available_width),
        LegendPosition::Left | LegendPosition::Right => layout_column(items, position, available_width),
    }
}

fn layout_rows(items: &[LegendItem], position: LegendPosition, available_width: f64) -> LegendLayout {
    let usable = (available_width - 2.0 * PAD).max(40.0);
    // a single label never takes more than 35 % of a row (but at least 140 px)
    let text_cap = (usable * 0.35).max(140.0).min(usable - SWATCH - SWATCH_TO_TEXT - TRAILING_GAP);
    let mut placed = Vec::with_capacity(items.len());
    let (mut x, mut row) = (0.0, 0usize);
    let mut widest_row: f64 = 0.0;
    for (index, item) in items.iter().enumerate() {
        let label = truncate_to_width(&item.label, FONT_PX, text_cap.max(20.0));
        let w = block_width(&label);
        if x > 0.0 && x + w > usable {
            widest_row = widest_row.max(x);
            row += 1;
            x = 0.0;
        }
        placed.push(PlacedItem {
            index,
            label,
            color: item.color.clone(),
            x: PAD + x,
            y: PAD + row as f64 * (LINE_H + ROW_GAP),
            row,
        });
        x += w;
    }
    widest_row = widest_row.max(x);
    let rows = if items.is_empty() { 0 } else { row + 1 };
    LegendLayout {
        position,
        items: placed,
        width: widest_row + 2.0 * PAD,
        height: band_height(rows),
        rows,
    }
}

fn band_height(rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        2.0 * PAD + rows as f64 * LINE_H + (rows - 1) as f64 * ROW_GAP
    }
}

fn layout_column(items: &[LegendItem], position: LegendPosition, available_width: f64) -> LegendLayout {
    let text_cap = (available_width * 0.25).max(80.0);
    let mut placed = Vec::with_capacity(items.len());
    let mut widest: f64 = 0.0;
    for (index, item) in items.iter().enumerate() {
        let label = truncate_to_width(&item.label, FONT_PX, text_cap);
        widest = widest.max(block_width(&label));
        placed.push(PlacedItem {
            index,
            label,
            color: item.color.clone(),
            x: PAD,
            y: PAD + index as f64 * (LINE_H + ROW_GAP),
            row: index,
        });
    }
    LegendLayout {
        position,
        width: if items.is_empty() { 0.0 } else { widest + 2.0 * PAD },
        height: band_height(items.len()),
        rows: items.len(),
        items: placed,
    }
}

/// Top-left corner of the legend inside a `width`×`height` surface.
pub fn origin(layout: &LegendLayout, width: f64, height: f64, margin: &Margin) -> (f64, f64) {
    match layout.position {
        LegendPosition::Bottom => (0.0, (height - layout.height).max(0.0)),
        LegendPosition::Top => (0.0, (margin.top * 0.5).min(height - layout.height).max(0.0)),
        LegendPosition::Left => (0.0, margin.top),
        LegendPosition::Right => ((width - layout.width).max(0.0), margin.top),
    }
}

/// Draw `layout` at `origin` under `parent`. Returns the per-item groups (class `legend-item`).
pub fn draw(surface: &mut Surface, parent: NodeId, layout: &LegendLayout, origin: (f64, f64), text_color: &str) -> Vec<NodeId> {
    let position = match layout.position {
        LegendPosition::Top => "top",
        LegendPosition::Bottom => "bottom",
        LegendPosition::Left => "left",
        LegendPosition::Right => "right",
    };
    let g = surface.element(
        parent,
        "g",
        [
            ("class", format!("legend legend-{position}")),
            ("transform", translate(origin.0, origin.1)),
        ],
    );
    let mut out = Vec::with_capacity(layout.items.len());
    for item in &layout.items {
        let ig = surface.element(
            g,
            "g",
            [
                ("class", "legend-item".to_string()),
                ("transform", translate(item.x, item.y)),
                ("data-index", item.index.to_string()),
            ],
        );
        surface.element(
            ig,
            "rect",
            [
                ("class", "legend-swatch".to_string()),
                ("width", num(SWATCH)),
                ("height", num(SWATCH)),
                ("rx", "2".to_string()),
                ("fill", item.color.clone()),
                ("y", num((LINE_H - SWATCH) / 2.0)),
            ],
        );
        surface.text(
            ig,
            item.label.clone(),
            [
                ("class", "legend-label".to_string()),
                ("x", num(SWATCH + SWATCH_TO_TEXT)),
                ("y", num(LINE_H / 2.0)),
                ("dy", "0.35em".to_string()),
                ("font-size", num(FONT_PX)),
                ("fill", text_color.to_string()),
            ],
        );
        out.push(ig);
    }
    out
}
