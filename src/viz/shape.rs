//! Shape generators: pie layout, arcs, curves, areas and SVG path data.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt::{self, Write as _};

use super::scene::num;

pub type Point = (f64, f64);

/// One SVG path command in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Move(Point),
    Line(Point),
    Quad(Point, Point),
    Cubic(Point, Point, Point),
    /// Circular/elliptical arc without axis rotation.
    Arc {
        rx: f64,
        ry: f64,
        large: bool,
        sweep: bool,
        to: Point,
    },
    Close,
}

/// Path builder and parser for the subset of SVG path data the charts emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    segments: Vec<Segment>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.segments.push(Segment::Move(p));
        self
    }

    pub fn line_to(&mut self, p: Point) -> &mut Self {
        self.segments.push(Segment::Line(p));
        self
    }

    pub fn quad_to(&mut self, c: Point, p: Point) -> &mut Self {
        self.segments.push(Segment::Quad(c, p));
        self
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) -> &mut Self {
        self.segments.push(Segment::Cubic(c1, c2, p));
        self
    }

    pub fn arc_to(&mut self, r: f64, large: bool, sweep: bool, p: Point) -> &mut Self {
        self.segments.push(Segment::Arc {
            rx: r,
            ry: r,
            large,
            sweep,
            to: p,
        });
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(Segment::Close);
        self
    }

    pub fn extend(&mut self, other: PathData) {
        self.segments.extend(other.segments);
    }

    /// Parse absolute `M L H V Q C A Z` commands (as written by [`fmt::Display`]).
    pub fn parse(d: &str) -> Option<Self> {
        let mut tokens = Tokenizer::new(d);
        let mut out = PathData::new();
        let mut cur: Point = (0.0, 0.0);
        let mut start: Point = (0.0, 0.0);
        let mut cmd = None;
        loop {
            let c = match tokens.command() {
                Some(c) => {
                    cmd = Some(c);
                    c
                }
                None if tokens.at_end() => break,
                None => cmd?,
            };
            match c {
                'M' => {
                    cur = (tokens.number()?, tokens.number()?);
                    start = cur;
                    out.move_to(cur);
                    cmd = Some('L');
                }
                'L' => {
                    cur = (tokens.number()?, tokens.number()?);
                    out.line_to(cur);
                }
                'H' => {
                    cur = (tokens.number()?, cur.1);
                    out.line_to(cur);
                }
                'V' => {
                    cur = (cur.0, tokens.number()?);
                    out.line_to(cur);
                }
                'Q' => {
                    let c1 = (tokens.number()?, tokens.number()?);
                    cur = (tokens.number()?, tokens.number()?);
                    out.quad_to(c1, cur);
                }
                'C' => {
                    let c1 = (tokens.number()?, tokens.number()?);
                    let c2 = (tokens.number()?, tokens.number()?);
                    cur = (tokens.number()?, tokens.number()?);
                    out.cubic_to(c1, c2, cur);
                }
                'A' => {
                    let rx = tokens.number()?;
                    let ry = tokens.number()?;
                    let _rotation = tokens.number()?;
                    let large = tokens.number()? != 0.0;
                    let sweep = tokens.number()? != 0.0;
                    cur = (tokens.number()?, tokens.number()?);
                    out.segments.push(Segment::Arc {
                        rx,
                        ry,
                        large,
                        sweep,
                        to: cur,
                    });
                }
                'Z' | 'z' => {
                    cur = start;
                    out.close();
                    cmd = None;
                }
                _ => return None,
            }
        }
        Some(out)
    }

    /// Flatten into polylines; the flag tells whether the subpath was closed.
    pub fn flatten(&self) -> Vec<(Vec<Point>, bool)> {
        let mut out: Vec<(Vec<Point>, bool)> = Vec::new();
        let mut poly: Vec<Point> = Vec::new();
        let mut cur: Point = (0.0, 0.0);
        let flush = |poly: &mut Vec<Point>, closed: bool, out: &mut Vec<(Vec<Point>, bool)>| {
            if !poly.is_empty() {
                out.push((std::mem::take(poly), closed));
            }
        };
        for seg in &self.segments {
            match *seg {
                Segment::Move(p) => {
                    flush(&mut poly, false, &mut out);
                    poly.push(p);
                    cur = p;
                }
                Segment::Line(p) => {
                    if poly.is_empty() {
                        poly.push(cur);
                    }
                    poly.push(p);
                    cur = p;
                }
                Segment::Quad(c, p) => {
                    if poly.is_empty() {
                        poly.push(cur);
                    }
                    for i in 1..=12 {
                        let t = i as f64 / 12.0;
                        let u = 1.0 - t;
                        poly.push((
                            u * u * cur.0 + 2.0 * u * t * c.0 + t * t * p.0,
                            u * u * cur.1 + 2.0 * u * t * c.1 + t * t * p.1,
                        ));
                    }
                    cur = p;
                }
                Segment::Cubic(c1, c2, p) => {
                    if poly.is_empty() {
                        poly.push(cur);
                    }
                    for i in 1..=16 {
                        let t = i as f64 / 16.0;
                        let u = 1.0 - t;
                        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
                        poly.push((
                            a * cur.0 + b * c1.0 + c * c2.0 + d * p.0,
                            a * cur.1 + b * c1.1 + c * c2.1 + d * p.1,
                        ));
                    }
                    cur = p;
                }
                Segment::Arc {
                    rx,
                    ry,
                    large,
                    sweep,
                    to,
                } => {
                    if poly.is_empty() {
                        poly.push(cur);
                    }
                    poly.extend(flatten_arc(cur, rx, ry, large, sweep, to));
                    cur = to;
                }
                Segment::Close => {
                    if let Some(first) = poly.first().copied() {
                        cur = first;
                    }
                    flush(&mut poly, true, &mut out);
                }
            }
        }
        flush(&mut poly, false, &mut out);
        out
    }

    /// Approximate rendered length, used for dash-offset draw-in.
    pub fn length(&self) -> f64 {
        self.flatten()
            .iter()
            .map(|(pts, closed)| {
                let mut len: f64 = pts.windows(2).map(|w| dist(w[0], w[1])).sum();
                if *closed && pts.len() > 1 {
                    len += dist(pts[pts.len() - 1], pts[0]);
                }
                len
            })
            .sum()
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        for seg in &self.segments {
            let _ = match *seg {
                Segment::Move(p) => write!(s, "M{},{}", num(p.0), num(p.1)),
                Segment::Line(p) => write!(s, "L{},{}", num(p.0), num(p.1)),
                Segment::Quad(c, p) => write!(s, "Q{},{},{},{}", num(c.0), num(c.1), num(p.0), num(p.1)),
                Segment::Cubic(c1, c2, p) => write!(
                    s,
                    "C{},{},{},{},{},{}",
                    num(c1.0),
                    num(c1.1),
                    num(c2.0),
                    num(c2.1),
                    num(p.0),
                    num(p.1)
                ),
                Segment::Arc {
                    rx,
                    ry,
                    large,
                    sweep,
                    to,
                } => write!(
                    s,
                    "A{},{},0,{},{},{},{}",
                    num(rx),
                    num(ry),
                    u8::from(large),
                    u8::from(sweep),
                    num(to.0),
                    num(to.1)
                ),
                Segment::Close => write!(s, "Z"),
            };
        }
        f.write_str(&s)
    }
}

fn dist(a: Point, b: Point) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

/// Endpoint-to-center arc conversion (no rotation) sampled into points.
fn flatten_arc(from: Point, rx: f64, ry: f64, large: bool, sweep: bool, to: Point) -> Vec<Point> {
    let (mut rx, mut ry) = (rx.abs(), ry.abs());
    if rx == 0.0 || ry == 0.0 || from == to {
        return vec![to];
    }
    let dx2 = (from.0 - to.0) / 2.0;
    let dy2 = (from.1 - to.1) / 2.0;
    let lambda = (dx2 * dx2) / (rx * rx) + (dy2 * dy2) / (ry * ry);
    if lambda > 1.0 {
        rx *= lambda.sqrt();
        ry *= lambda.sqrt();
    }
    let num_ = rx * rx * ry * ry - rx * rx * dy2 * dy2 - ry * ry * dx2 * dx2;
    let den = rx * rx * dy2 * dy2 + ry * ry * dx2 * dx2;
    let mut coef = if den == 0.0 { 0.0 } else { (num_ / den).max(0.0).sqrt() };
    if large == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * dy2 / ry;
    let cyp = -coef * ry * dx2 / rx;
    let cx = cxp + (from.0 + to.0) / 2.0;
    let cy = cyp + (from.1 + to.1) / 2.0;
    let angle = |ux: f64, uy: f64| uy.atan2(ux);
    let theta1 = angle((dx2 - cxp) / rx, (dy2 - cyp) / ry);
    let mut delta = angle((-dx2 - cxp) / rx, (-dy2 - cyp) / ry) - theta1;
    if sweep && delta < 0.0 {
        delta += TAU;
    } else if !sweep && delta > 0.0 {
        delta -= TAU;
    }
    let steps = ((delta.abs() / (PI / 24.0)).ceil() as usize).max(2);
    (1..=steps)
        .map(|i| {
            let a = theta1 + delta * i as f64 / steps as f64;
            (cx + rx * a.cos(), cy + ry * a.sin())
        })
        .collect()
}

/// Angles of one pie slice. Angles run clockwise from 12 o'clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieSlice {
    /// Position of the datum in the input.
    pub index: usize,
    pub value: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl PieSlice {
    pub fn angle(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// Share of the full circle.
    pub fn fraction(&self) -> f64 {
        self.angle() / TAU
    }
}

/// Pie layout over `values`. When `sort_desc` is set, larger values take earlier angles
/// (ties keep input order); the returned slices stay in input order.
pub fn pie_layout(values: &[f64], sort_desc: bool) -> Vec<PieSlice> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let k = if total > 0.0 { TAU / total } else { 0.0 };
    let mut order: Vec<usize> = (0..values.len()).collect();
    if sort_desc {
        order.sort_by(|&a, &b| {
            values[b]
                .partial_cmp(&values[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    let mut slices = vec![
        PieSlice {
            index: 0,
            value: 0.0,
            start_angle: 0.0,
            end_angle: 0.0,
        };
        values.len()
    ];
    let mut a = 0.0;
    for &i in &order {
        let v = values[i];
        let da = if v > 0.0 { v * k } else { 0.0 };
        slices[i] = PieSlice {
            index: i,
            value: v,
            start_angle: a,
            end_angle: a + da,
        };
        a += da;
    }
    if let Some(last) = order.last() {
        // Rounding must not leave a hairline gap at 12 o'clock.
        if total > 0.0 {
            slices[*last].end_angle = TAU;
        }
    }
    slices
}

/// Arc generator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub pad_angle: f64,
    pub corner_radius: f64,
}

fn polar(r: f64, a: f64) -> Point {
    (r * a.sin(), -r * a.cos())
}

impl Arc {
    pub fn new(inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            inner_radius: inner_radius.max(0.0),
            outer_radius: outer_radius.max(0.0),
            pad_angle: 0.0,
            corner_radius: 0.0,
        }
    }

    pub fn pad_angle(mut self, pad: f64) -> Self {
        self.pad_angle = pad.max(0.0);
        self
    }

    pub fn corner_radius(mut self, r: f64) -> Self {
        self.corner_radius = r.max(0.0);
        self
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        self.inner_radius *= factor;
        self.outer_radius *= factor;
        self
    }

    /// Midpoint of the slice, used for in-arc labels.
    pub fn centroid(&self, start: f64, end: f64) -> Point {
        polar((self.inner_radius + self.outer_radius) / 2.0, (start + end) / 2.0)
    }

    /// SVG path for the annular sector `[start, end]`.
    pub fn path(&self, start: f64, end: f64) -> PathData {
        let (r0, r1) = (self.inner_radius.min(self.outer_radius), self.inner_radius.max(self.outer_radius));
        let mut p = PathData::new();
        let span = (end - start).abs();
        if r1 <= 0.0 || span <= 0.0 {
            p.move_to((0.0, 0.0)).close();
            return p;
        }
        if span >= TAU - 1e-9 {
            p.move_to((0.0, -r1))
                .arc_to(r1, true, true, (0.0, r1))
                .arc_to(r1, true, true, (0.0, -r1))
                .close();
            if r0 > 0.0 {
                p.move_to((0.0, -r0))
                    .arc_to(r0, true, false, (0.0, r0))
                    .arc_to(r0, true, false, (0.0, -r0))
                    .close();
            }
            return p;
        }

        // Padding keeps a constant gap width measured at the pad radius.
        let rp = (r0 * r0 + r1 * r1).sqrt();
        let half_pad = self.pad_angle / 2.0;
        let pad_at = |r: f64| {
            if r <= 0.0 || half_pad <= 0.0 {
                0.0
            } else {
                ((rp / r) * half_pad.sin()).clamp(-1.0, 1.0).asin()
            }
        };
        let shrink = |r: f64| {
            let pa = pad_at(r);
            if span - 2.0 * pa > 0.0 {
                (start + pa, end - pa)
            } else {
                let mid = (start + end) / 2.0;
                (mid, mid)
            }
        };
        let (a0o, a1o) = shrink(r1);
        let (a0i, a1i) = shrink(r0);

        let cr = self.corner_radius.min((r1 - r0) / 2.0).max(0.0);
        let large_o = a1o - a0o > PI;
        let large_i = a1i - a0i > PI;

        if cr <= 0.0 {
            p.move_to(polar(r1, a0o));
            p.arc_to(r1, large_o, true, polar(r1, a1o));
            if r0 > 0.0 {
                p.line_to(polar(r0, a1i));
                p.arc_to(r0, large_i, false, polar(r0, a0i));
            } else {
                p.line_to((0.0, 0.0));
            }
            p.close();
            return p;
        }

        let ca_o = (cr / r1).min((a1o - a0o) / 2.0);
        p.move_to(polar(r1 - cr, a0o));
        p.quad_to(polar(r1, a0o), polar(r1, a0o + ca_o));
        p.arc_to(r1, a1o - a0o - 2.0 * ca_o > PI, true, polar(r1, a1o - ca_o));
        p.quad_to(polar(r1, a1o), polar(r1 - cr, a1o));
        if r0 > 0.0 {
            let ca_i = (cr / r0).min((a1i - a0i) / 2.0);
            p.line_to(polar(r0 + cr, a1i));
            p.quad_to(polar(r0, a1i), polar(r0, a1i - ca_i));
            p.arc_to(r0, a1i - a0i - 2.0 * ca_i > PI, false, polar(r0, a0i + ca_i));
            p.quad_to(polar(r0, a0i), polar(r0 + cr, a0i));
        } else {
            p.line_to((0.0, 0.0));
        }
        p.close();
        p
    }
}

/// Interpolation between line points (`curveType` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurveType {
    #[default]
    #[serde(alias = "curveLinear")]
    Linear,
    #[serde(alias = "curveCardinal")]
    Cardinal,
    #[serde(alias = "curveBasis")]
    Basis,
    #[serde(alias = "monotoneX", alias = "curveMonotoneX")]
    Monotone,
}

/// Path through `points` using `curve`. Fewer than two points yield a bare move.
pub fn curve_path(points: &[Point], curve: CurveType) -> PathData {
    let mut p = PathData::new();
    let Some(&first) = points.first() else {
        return p;
    };
    p.move_to(first);
    if points.len() == 1 {
        return p;
    }
    if points.len() == 2 {
        p.line_to(points[1]);
        return p;
    }
    match curve {
        CurveType::Linear => {
            for &pt in &points[1..] {
                p.line_to(pt);
            }
        }
        CurveType::Cardinal => cardinal(&mut p, points),
        CurveType::Basis => basis(&mut p, points),
        CurveType::Monotone => monotone_x(&mut p, points),
    }
    p
}

fn cardinal(p: &mut PathData, pts: &[Point]) {
    let k = 1.0 / 6.0;
    let n = pts.len();
    for i in 0..n - 1 {
        let (p1, p2) = (pts[i], pts[i + 1]);
        let c1 = if i == 0 {
            p1
        } else {
            let p0 = pts[i - 1];
            (p1.0 + k * (p2.0 - p0.0), p1.1 + k * (p2.1 - p0.1))
        };
        let c2 = if i + 2 >= n {
            p2
        } else {
            let p3 = pts[i + 2];
            (p2.0 - k * (p3.0 - p1.0), p2.1 - k * (p3.1 - p1.1))
        };
        p.cubic_to(c1, c2, p2);
    }
}

fn basis(p: &mut PathData, pts: &[Point]) {
    let seg = |p: &mut PathData, a: Point, b: Point, c: Point| {
        p.cubic_to(
            ((2.0 * a.0 + b.0) / 3.0, (2.0 * a.1 + b.1) / 3.0),
            ((a.0 + 2.0 * b.0) / 3.0, (a.1 + 2.0 * b.1) / 3.0),
            ((a.0 + 4.0 * b.0 + c.0) / 6.0, (a.1 + 4.0 * b.1 + c.1) / 6.0),
        );
    };
    let (p0, p1) = (pts[0], pts[1]);
    p.line_to(((5.0 * p0.0 + p1.0) / 6.0, (5.0 * p0.1 + p1.1) / 6.0));
    for w in pts.windows(3) {
        seg(p, w[0], w[1], w[2]);
    }
    let n = pts.len();
    let (a, b) = (pts[n - 2], pts[n - 1]);
    seg(p, a, b, b);
    p.line_to(b);
}

fn monotone_x(p: &mut PathData, pts: &[Point]) {
    let n = pts.len();
    let sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };
    let mut m = vec![0.0; n];
    for i in 1..n - 1 {
        let (x0, y0) = pts[i - 1];
        let (x1, y1) = pts[i];
        let (x2, y2) = pts[i + 1];
        let (h0, h1) = (x1 - x0, x2 - x1);
        let s0 = if h0 != 0.0 { (y1 - y0) / h0 } else { 0.0 };
        let s1 = if h1 != 0.0 { (y2 - y1) / h1 } else { 0.0 };
        let pm = if h0 + h1 != 0.0 { (s0 * h1 + s1 * h0) / (h0 + h1) } else { 0.0 };
        let v = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * pm.abs());
        m[i] = if v.is_finite() { v } else { 0.0 };
    }
    let end_slope = |a: Point, b: Point, t: f64| {
        let h = b.0 - a.0;
        if h != 0.0 { (3.0 * (b.1 - a.1) / h - t) / 2.0 } else { t }
    };
    m[0] = end_slope(pts[0], pts[1], m[1]);
    m[n - 1] = end_slope(pts[n - 2], pts[n - 1], m[n - 2]);
    for i in 0..n - 1 {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[i + 1];
        let dx = (x1 - x0) / 3.0;
        p.cubic_to((x0 + dx, y0 + dx * m[i]), (x1 - dx, y1 - dx * m[i + 1]), (x1, y1));
    }
}

/// Split at undefined points and draw each run as its own subpath.
pub fn line_with_gaps(points: &[Option<Point>], curve: CurveType) -> PathData {
    let mut out = PathData::new();
    for run in points.split(Option::is_none) {
        let run: Vec<Point> = run.iter().flatten().copied().collect();
        if !run.is_empty() {
            out.extend(curve_path(&run, curve));
        }
    }
    out
}

/// Closed area between the curve through `points` and the horizontal line `baseline`.
pub fn area_path(points: &[Point], baseline: f64, curve: CurveType) -> PathData {
    let mut p = curve_path(points, curve);
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        p.line_to((last.0, baseline));
        p.line_to((first.0, baseline));
        p.close();
    }
    p
}

/// Area for each defined run.
pub fn area_with_gaps(points: &[Option<Point>], baseline: f64, curve: CurveType) -> PathData {
    let mut out = PathData::new();
    for run in points.split(Option::is_none) {
        let run: Vec<Point> = run.iter().flatten().copied().collect();
        if !run.is_empty() {
            out.extend(area_path(&run, baseline, curve));
        }
    }
    out
}

/// Rectangle with rounded corners as path data (for gradients and clipping-free rounding).
pub fn rounded_rect(x: f64, y: f64, w: f64, h: f64, r: f64) -> PathData {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    let mut p = PathData::new();
    p.move_to((x + r, y))
        .line_to((x + w - r, y))
        .quad_to((x + w, y), (x + w, y + r))
        .line_to((x + w, y + h - r))
        .quad_to((x + w, y + h), (x + w - r, y + h))
        .line_to((x + r, y + h))
        .quad_to((x, y + h), (x, y + h - r))
        .line_to((x, y + r))
        .quad_to((x, y), (x + r, y))
        .close();
    p
}

struct Tokenizer<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(d: &'a str) -> Self {
        Self {
            s: d.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while self.pos < self.s.len() && matches!(self.s[self.pos], b' ' | b',' | b'\n' | b'\t' | b'\r') {
            self.pos += 1;
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_separators();
        self.pos >= self.s.len()
    }

    fn command(&mut self) -> Option<char> {
        self.skip_separators();
        let c = *self.s.get(self.pos)?;
        if c.is_ascii_alphabetic() && c != b'e' && c != b'E' {
            self.pos += 1;
            Some(c as char)
        } else {
            None
        }
    }

    fn number(&mut self) -> Option<f64> {
        self.skip_separators();
        let start = self.pos;
        while self.pos < self.s.len() {
            let c = self.s[self.pos];
            let sign_ok = (c == b'-' || c == b'+')
                && (self.pos == start || matches!(self.s[self.pos - 1], b'e' | b'E'));
            if c.is_ascii_digit() || c == b'.' || c == b'e' || c == b'E' || sign_ok {
                self.pos += 1;
            } else {
                break;
            }
        }
        std::str::from_utf8(&self.s[start..self.pos]).ok()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_pie_spans_full_circle() {
        let s = pie_layout(&[100.0], true);
        assert_eq!(s[0].start_angle, 0.0);
        assert_eq!(s[0].end_angle, TAU);
        assert!((s[0].fraction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sorted_pie_keeps_input_order_in_output() {
        let s = pie_layout(&[10.0, 60.0, 30.0], true);
        assert_eq!(s[1].start_angle, 0.0);
        assert!((s[2].start_angle - s[1].end_angle).abs() < 1e-12);
        assert!((s[0].fraction() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn path_round_trips_through_parser() {
        let arc = Arc::new(20.0, 50.0).pad_angle(0.02).corner_radius(3.0);
        let d = arc.path(0.0, 1.5).to_string();
        let parsed = PathData::parse(&d).unwrap();
        assert_eq!(parsed.segments().len(), arc.path(0.0, 1.5).segments().len());
        assert!(!parsed.flatten().is_empty());
    }

    #[test]
    fn straight_line_length() {
        let p = curve_path(&[(0.0, 0.0), (3.0, 4.0)], CurveType::Cardinal);
        assert!((p.length() - 5.0).abs() < 1e-9);
        assert_eq!(p.to_string(), "M0,0L3,4");
    }

    #[test]
    fn cardinal_first_control_point_is_start() {
        let p = curve_path(&[(0.0, 0.0), (10.0, 10.0), (20.0, 0.0)], CurveType::Cardinal);
        match p.segments()[1] {
            Segment::Cubic(c1, _, _) => assert_eq!(c1, (0.0, 0.0)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn gaps_split_subpaths() {
        let pts = [Some((0.0, 0.0)), Some((1.0, 1.0)), None, Some((3.0, 3.0)), Some((4.0, 4.0))];
        let p = line_with_gaps(&pts, CurveType::Linear);
        assert_eq!(p.to_string(), "M0,0L1,1M3,3L4,4");
    }
}
