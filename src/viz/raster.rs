//! Rasterize a [`Surface`] to PNG or JPEG.
//!
//! The scene is walked once and drawn with plotters primitives onto an
//! in-memory RGB buffer, which `image` then encodes. Supported elements:
//! `g` (translate/scale transforms), `rect`, `circle`, `line`, `path` and
//! `text`. Text is only drawn once a font was registered with
//! [`register_font_file`]; the pure-Rust font path does not discover system fonts.

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_bitmap::BitMapBackend;
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::scene::{Node, NodeId, Surface};
use super::shape::PathData;
use super::types::ImageFormat;
use crate::color::{Rgb, WHITE};
use crate::error::{ChartError, Result};

const FONT_FAMILY: &str = "sans-serif";
const JPEG_QUALITY: u8 = 90;

static FONT_READY: AtomicBool = AtomicBool::new(false);
static FONT_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Register the TTF/OTF at `path` as the sans-serif face for image export.
/// Only the first call loads a font; later calls return its outcome.
pub fn register_font_file(path: &Path) -> Result<()> {
    let outcome = FONT_INIT.get_or_init(|| {
        let bytes = std::fs::read(path).map_err(|e| format!("read {}: {e}", path.display()))?;
        // plotters keeps a reference for the life of the process
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        plotters::style::register_font(FONT_FAMILY, plotters::style::FontStyle::Normal, bytes)
            .map_err(|_| format!("{} is not a usable font", path.display()))?;
        FONT_READY.store(true, Ordering::SeqCst);
        debug!("registered font {}", path.display());
        Ok(())
    });
    outcome.clone().map_err(ChartError::Export)
}

pub fn font_registered() -> bool {
    FONT_READY.load(Ordering::SeqCst)
}

/// Uniform scale plus translation, enough for the transforms charts emit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    k: f64,
    x: f64,
    y: f64,
}

impl Affine {
    const IDENTITY: Affine = Affine { k: 1.0, x: 0.0, y: 0.0 };

    fn then(self, child: Affine) -> Affine {
        Affine {
            k: self.k * child.k,
            x: self.x + self.k * child.x,
            y: self.y + self.k * child.y,
        }
    }

    fn apply(self, x: f64, y: f64) -> (i32, i32) {
        ((self.x + self.k * x).round() as i32, (self.y + self.k * y).round() as i32)
    }
}

fn transform_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(translate|scale)\(\s*([-\d.eE]+)(?:[\s,]+([-\d.eE]+))?\s*\)").expect("static regex"))
}

fn parse_transform(s: &str) -> Affine {
    let mut t = Affine::IDENTITY;
    for caps in transform_regex().captures_iter(s) {
        let a: f64 = caps[2].parse().unwrap_or(0.0);
        let b: Option<f64> = caps.get(3).and_then(|m| m.as_str().parse().ok());
        let step = match &caps[1] {
            "translate" => Affine {
                k: 1.0,
                x: a,
                y: b.unwrap_or(0.0),
            },
            _ => Affine { k: a, x: 0.0, y: 0.0 },
        };
        t = t.then(step);
    }
    t
}

fn attr_f64(node: &Node, name: &str) -> f64 {
    node.attr(name).and_then(|v| v.trim().trim_end_matches("px").parse().ok()).unwrap_or(0.0)
}

fn opacity(node: &Node, name: &str) -> f64 {
    let own = node.attr(name).and_then(|v| v.parse::<f64>().ok()).unwrap_or(1.0);
    let all = node.attr("opacity").and_then(|v| v.parse::<f64>().ok()).unwrap_or(1.0);
    (own * all).clamp(0.0, 1.0)
}

fn paint(node: &Node, attr: &str, default: Option<&str>) -> Option<RGBAColor> {
    let value = node.attr(attr).or(default)?;
    let rgb = Rgb::parse(value)?;
    let alpha = opacity(node, &format!("{attr}-opacity"));
    if alpha <= 0.0 {
        return None;
    }
    Some(RGBColor(rgb.r, rgb.g, rgb.b).mix(alpha))
}

fn hidden(node: &Node) -> bool {
    node.attr("display") == Some("none") || node.attr("visibility") == Some("hidden") || node.attr("opacity") == Some("0")
}

struct Painter<'a, DB: DrawingBackend> {
    area: &'a DrawingArea<DB, plotters::coord::Shift>,
    surface: &'a Surface,
    draw_text: bool,
}

fn fail<E: std::fmt::Debug>(e: E) -> ChartError {
    ChartError::Export(format!("{e:?}"))
}

impl<DB: DrawingBackend> Painter<'_, DB> {
    fn walk(&self, id: NodeId, parent: Affine) -> Result<()> {
        let node = self.surface.node(id);
        if hidden(node) {
            return Ok(());
        }
        let t = match node.attr("transform") {
            Some(s) => parent.then(parse_transform(s)),
            None => parent,
        };
        match node.tag.as_str() {
            "rect" => self.rect(node, t)?,
            "circle" => self.circle(node, t)?,
            "line" => self.line(node, t)?,
            "path" => self.path(node, t)?,
            "text" if self.draw_text => self.text(node, t)?,
            _ => {}
        }
        // defs (markers, gradients) are referenced, never painted directly
        if node.tag != "defs" {
            for child in self.surface.children(id) {
                self.walk(*child, t)?;
            }
        }
        Ok(())
    }

    fn stroke_style(node: &Node, t: Affine) -> Option<ShapeStyle> {
        let color = paint(node, "stroke", None)?;
        let width = node.attr("stroke-width").map(|_| attr_f64(node, "stroke-width")).unwrap_or(1.0);
        Some(ShapeStyle {
            color,
            filled: false,
            stroke_width: (width * t.k).round().max(1.0) as u32,
        })
    }

    fn rect(&self, node: &Node, t: Affine) -> Result<()> {
        let (x, y) = (attr_f64(node, "x"), attr_f64(node, "y"));
        let (w, h) = (attr_f64(node, "width"), attr_f64(node, "height"));
        if w <= 0.0 || h <= 0.0 {
            return Ok(());
        }
        let corners = [t.apply(x, y), t.apply(x + w, y + h)];
        if let Some(fill) = paint(node, "fill", Some("black")) {
            self.area.draw(&Rectangle::new(corners, fill.filled())).map_err(fail)?;
        }
        if let Some(style) = Self::stroke_style(node, t) {
            self.area.draw(&Rectangle::new(corners, style)).map_err(fail)?;
        }
        Ok(())
    }

    fn circle(&self, node: &Node, t: Affine) -> Result<()> {
        let center = t.apply(attr_f64(node, "cx"), attr_f64(node, "cy"));
        let r = (attr_f64(node, "r") * t.k).round() as i32;
        if r <= 0 {
            return Ok(());
        }
        if let Some(fill) = paint(node, "fill", Some("black")) {
            self.area.draw(&Circle::new(center, r, fill.filled())).map_err(fail)?;
        }
        if let Some(style) = Self::stroke_style(node, t) {
            self.area.draw(&Circle::new(center, r, style)).map_err(fail)?;
        }
        Ok(())
    }

    fn line(&self, node: &Node, t: Affine) -> Result<()> {
        let Some(style) = Self::stroke_style(node, t) else {
            return Ok(());
        };
        let from = t.apply(attr_f64(node, "x1"), attr_f64(node, "y1"));
        let to = t.apply(attr_f64(node, "x2"), attr_f64(node, "y2"));
        self.area.draw(&PathElement::new(vec![from, to], style)).map_err(fail)
    }

    fn path(&self, node: &Node, t: Affine) -> Result<()> {
        let Some(d) = node.attr("d") else {
            return Ok(());
        };
        let Some(path) = PathData::parse(d) else {
            warn!("skipping unparsable path data");
            return Ok(());
        };
        let fill = paint(node, "fill", Some("black"));
        let stroke = Self::stroke_style(node, t);
        for (points, closed) in path.flatten() {
            let pixels: Vec<(i32, i32)> = points.iter().map(|&(x, y)| t.apply(x, y)).collect();
            if pixels.len() < 2 {
                continue;
            }
            if let Some(fill) = fill.filter(|_| pixels.len() > 2) {
                self.area.draw(&Polygon::new(pixels.clone(), fill.filled())).map_err(fail)?;
            }
            if let Some(style) = stroke {
                let mut outline = pixels;
                if closed {
                    outline.push(outline[0]);
                }
                self.area.draw(&PathElement::new(outline, style)).map_err(fail)?;
            }
        }
        Ok(())
    }

    fn text(&self, node: &Node, t: Affine) -> Result<()> {
        let Some(content) = node.text.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        let Some(color) = paint(node, "fill", Some("black")) else {
            return Ok(());
        };
        let size = node.attr("font-size").map(|_| attr_f64(node, "font-size")).unwrap_or(12.0) * t.k;
        let h = match node.attr("text-anchor") {
            Some("middle") => HPos::Center,
            Some("end") => HPos::Right,
            _ => HPos::Left,
        };
        let v = match node.attr("dy") {
            Some(dy) if dy.starts_with("0.3") => VPos::Center,
            Some(dy) if dy.starts_with("0.7") => VPos::Top,
            _ => VPos::Bottom,
        };
        let style = TextStyle::from((FONT_FAMILY, size.max(1.0)))
            .color(&color)
            .pos(Pos::new(h, v));
        let at = t.apply(attr_f64(node, "x"), attr_f64(node, "y"));
        self.area.draw(&Text::new(content.to_string(), at, style)).map_err(fail)
    }
}

/// Rasterize `surface` at its own size onto `background` and return RGB8 pixels.
pub fn rasterize(surface: &Surface, background: Rgb) -> Result<RgbImage> {
    let (w, h) = (surface.width().round().max(1.0) as u32, surface.height().round().max(1.0) as u32);
    let mut buf = vec![0u8; (w * h * 3) as usize];
    {
        let area = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        area.fill(&RGBColor(background.r, background.g, background.b))
            .map_err(fail)?;
        let painter = Painter {
            area: &area,
            surface,
            draw_text: font_registered(),
        };
        painter.walk(surface.root(), Affine::IDENTITY)?;
        area.present().map_err(fail)?;
    }
    RgbImage::from_raw(w, h, buf).ok_or_else(|| ChartError::Export("pixel buffer size mismatch".into()))
}

/// Encode `surface` as PNG or JPEG bytes.
pub fn encode(surface: &Surface, format: ImageFormat, background: Option<Rgb>) -> Result<Vec<u8>> {
    let img = rasterize(surface, background.unwrap_or(WHITE))?;
    let target = match format {
        ImageFormat::Png => ImageOutputFormat::Png,
        ImageFormat::Jpeg => ImageOutputFormat::Jpeg(JPEG_QUALITY),
    };
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, target)
        .map_err(|e| ChartError::Export(format!("encode {format}: {e}")))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_compose() {
        let t = parse_transform("translate(10,20) scale(2)");
        assert_eq!(t.apply(1.0, 1.0), (12, 22));
        let nested = t.then(parse_transform("translate(5, 5)"));
        assert_eq!(nested.apply(0.0, 0.0), (20, 30));
    }

    #[test]
    fn rect_pixels_take_fill_color() {
        let mut s = Surface::new(20.0, 20.0);
        let root = s.root();
        s.element(
            root,
            "rect",
            [("x", "5"), ("y", "5"), ("width", "10"), ("height", "10"), ("fill", "#ff0000")],
        );
        let img = rasterize(&s, WHITE).unwrap();
        assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn png_and_jpeg_have_magic_bytes() {
        let s = Surface::new(8.0, 8.0);
        let png = encode(&s, ImageFormat::Png, None).unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
        let jpg = encode(&s, ImageFormat::Jpeg, None).unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut s = Surface::new(10.0, 10.0);
        let root = s.root();
        let g = s.element(root, "g", [("display", "none")]);
        s.element(g, "rect", [("width", "10"), ("height", "10"), ("fill", "#000000")]);
        let img = rasterize(&s, WHITE).unwrap();
        assert_eq!(img.get_pixel(5, 5).0, [255, 255, 255]);
    }
}
