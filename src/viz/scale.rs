//! Scales: map data values to pixels (and back) and pick readable ticks.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::color::{self, Rgb};

/// Step between "nice" ticks (1, 2 or 5 × 10ⁿ) so that about `count` ticks span `[start, stop]`.
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let step0 = (stop - start).abs() / count.max(1) as f64;
    if step0 == 0.0 || !step0.is_finite() {
        return 0.0;
    }
    let power = step0.log10().floor();
    let error = step0 / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * 10f64.powf(power)
}

/// Multiply `i` by `step`, dividing by the inverse for sub-unit steps to avoid `0.30000000000000004`.
fn step_value(i: f64, step: f64) -> f64 {
    if step < 1.0 {
        i / (1.0 / step).round()
    } else {
        i * step
    }
}

/// Nicely rounded values within `[start, stop]`.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let step = tick_step(lo, hi, count);
    if step == 0.0 {
        return vec![lo];
    }
    let i0 = if step < 1.0 {
        (lo * (1.0 / step).round()).ceil()
    } else {
        (lo / step).ceil()
    };
    let i1 = if step < 1.0 {
        (hi * (1.0 / step).round()).floor()
    } else {
        (hi / step).floor()
    };
    let mut out: Vec<f64> = Vec::new();
    let mut i = i0;
    while i <= i1 {
        out.push(step_value(i, step));
        i += 1.0;
    }
    if reverse {
        out.reverse();
    }
    out
}

/// Extend `[start, stop]` outward to tick-step boundaries.
pub fn nice_domain(start: f64, stop: f64, count: usize) -> (f64, f64) {
    let (mut d0, mut d1) = (start, stop);
    let reverse = d1 < d0;
    if reverse {
        std::mem::swap(&mut d0, &mut d1);
    }
    let mut prev = f64::NAN;
    for _ in 0..10 {
        let step = tick_step(d0, d1, count);
        if step == 0.0 || step == prev {
            break;
        }
        d0 = (d0 / step).floor() * step;
        d1 = (d1 / step).ceil() * step;
        prev = step;
    }
    if reverse { (d1, d0) } else { (d0, d1) }
}

/// Continuous linear scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
    clamp: bool,
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            clamp: false,
        }
    }

    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn with_domain(mut self, domain: (f64, f64)) -> Self {
        self.domain = domain;
        self
    }

    /// A degenerate domain maps everything to the start of the range.
    pub fn apply(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 || !v.is_finite() {
            return r0;
        }
        let mut t = (v - d0) / (d1 - d0);
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        r0 + t * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        let mut t = (px - r0) / (r1 - r0);
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        d0 + t * (d1 - d0)
    }

    pub fn nice(mut self, count: usize) -> Self {
        self.domain = nice_domain(self.domain.0, self.domain.1, count);
        self
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count)
    }
}

/// Base-10 logarithmic scale. Domain values below 1 are raised to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LogScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain: (domain.0.max(1.0), domain.1.max(1.0)),
            range,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn apply(&self, v: f64) -> f64 {
        let (l0, l1) = (self.domain.0.log10(), self.domain.1.log10());
        let (r0, r1) = self.range;
        if l1 == l0 {
            return r0;
        }
        let lv = v.max(self.domain.0.min(self.domain.1)).log10();
        r0 + (lv - l0) / (l1 - l0) * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (l0, l1) = (self.domain.0.log10(), self.domain.1.log10());
        let (r0, r1) = self.range;
        if r1 == r0 {
            return self.domain.0;
        }
        10f64.powf(l0 + (px - r0) / (r1 - r0) * (l1 - l0))
    }

    /// Round the domain out to whole powers of ten.
    pub fn nice(mut self) -> Self {
        let (d0, d1) = self.domain;
        let lo = 10f64.powf(d0.min(d1).log10().floor());
        let hi = 10f64.powf(d0.max(d1).log10().ceil());
        self.domain = if d0 <= d1 { (lo, hi) } else { (hi, lo) };
        self
    }

    /// Powers of ten, plus 2× and 5× when the domain spans few decades.
    pub fn ticks(&self) -> Vec<f64> {
        let (lo, hi) = (self.domain.0.min(self.domain.1), self.domain.0.max(self.domain.1));
        let (e0, e1) = (lo.log10().floor() as i32, hi.log10().ceil() as i32);
        let dense = e1 - e0 < 3;
        let mut out = Vec::new();
        for e in e0..=e1 {
            let base = 10f64.powi(e);
            let mults: &[f64] = if dense { &[1.0, 2.0, 5.0] } else { &[1.0] };
            for m in mults {
                let v = base * m;
                if v >= lo && v <= hi {
                    out.push(v);
                }
            }
        }
        out
    }
}

/// Value axis scale selected by the `yScale` option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueScale {
    Linear(LinearScale),
    Log(LogScale),
}

impl ValueScale {
    pub fn apply(&self, v: f64) -> f64 {
        match self {
            ValueScale::Linear(s) => s.apply(v),
            ValueScale::Log(s) => s.apply(v),
        }
    }

    pub fn invert(&self, px: f64) -> f64 {
        match self {
            ValueScale::Linear(s) => s.invert(px),
            ValueScale::Log(s) => s.invert(px),
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        match self {
            ValueScale::Linear(s) => s.domain(),
            ValueScale::Log(s) => s.domain(),
        }
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match self {
            ValueScale::Linear(s) => s.ticks(count),
            ValueScale::Log(s) => s.ticks(),
        }
    }

    /// Pixel position of the value baseline (0 for linear, the domain minimum for log).
    pub fn baseline(&self) -> f64 {
        match self {
            ValueScale::Linear(s) => s.apply(0.0_f64.clamp(s.domain().0.min(s.domain().1), s.domain().0.max(s.domain().1))),
            ValueScale::Log(s) => s.apply(s.domain().0),
        }
    }
}

/// Discrete scale mapping keys to evenly spaced bands.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    range: (f64, f64),
    padding_inner: f64,
    padding_outer: f64,
    align: f64,
}

impl BandScale {
    pub fn new(domain: Vec<String>, range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            padding_inner: 0.0,
            padding_outer: 0.0,
            align: 0.5,
        }
    }

    /// Point scale: zero-width bands, `padding` steps of outer padding.
    pub fn point(domain: Vec<String>, range: (f64, f64), padding: f64) -> Self {
        Self {
            domain,
            range,
            padding_inner: 1.0,
            padding_outer: padding,
            align: 0.5,
        }
    }

    /// Set inner and outer padding (fractions of a step, clamped to `[0, 1]`).
    pub fn padding(mut self, p: f64) -> Self {
        let p = p.clamp(0.0, 1.0);
        self.padding_inner = p;
        self.padding_outer = p;
        self
    }

    pub fn padding_inner(mut self, p: f64) -> Self {
        self.padding_inner = p.clamp(0.0, 1.0);
        self
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    fn layout(&self) -> (f64, f64, bool) {
        let n = self.domain.len() as f64;
        let (r0, r1) = self.range;
        let reverse = r1 < r0;
        let (start, stop) = if reverse { (r1, r0) } else { (r0, r1) };
        let step = (stop - start) / (n - self.padding_inner + self.padding_outer * 2.0).max(1.0);
        let start = start + (stop - start - step * (n - self.padding_inner)) * self.align;
        (start, step, reverse)
    }

    pub fn step(&self) -> f64 {
        self.layout().1
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    pub fn position_at(&self, index: usize) -> Option<f64> {
        let n = self.domain.len();
        if index >= n {
            return None;
        }
        let (start, step, reverse) = self.layout();
        let i = if reverse { n - 1 - index } else { index };
        Some(start + step * i as f64)
    }

    pub fn position(&self, key: &str) -> Option<f64> {
        let index = self.domain.iter().position(|k| k == key)?;
        self.position_at(index)
    }

    /// Index of the band containing pixel `px`.
    pub fn index_at(&self, px: f64) -> Option<usize> {
        (0..self.domain.len()).find(|&i| {
            self.position_at(i)
                .is_some_and(|p| px >= p && px <= p + self.bandwidth().max(self.step()))
        })
    }
}

const SECOND: f64 = 1_000.0;
const MINUTE: f64 = 60.0 * SECOND;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;

const TIME_INTERVALS: [f64; 17] = [
    SECOND,
    5.0 * SECOND,
    15.0 * SECOND,
    30.0 * SECOND,
    MINUTE,
    5.0 * MINUTE,
    15.0 * MINUTE,
    30.0 * MINUTE,
    HOUR,
    3.0 * HOUR,
    6.0 * HOUR,
    12.0 * HOUR,
    DAY,
    2.0 * DAY,
    7.0 * DAY,
    30.0 * DAY,
    365.0 * DAY,
];

/// Linear scale over UTC epoch milliseconds with calendar-friendly ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    inner: LinearScale,
}

impl TimeScale {
    pub fn new(domain_ms: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            inner: LinearScale::new(domain_ms, range),
        }
    }

    pub fn linear(&self) -> &LinearScale {
        &self.inner
    }

    pub fn domain(&self) -> (f64, f64) {
        self.inner.domain()
    }

    pub fn range(&self) -> (f64, f64) {
        self.inner.range()
    }

    pub fn with_domain(self, domain_ms: (f64, f64)) -> Self {
        Self {
            inner: self.inner.with_domain(domain_ms),
        }
    }

    pub fn apply(&self, ms: f64) -> f64 {
        self.inner.apply(ms)
    }

    pub fn apply_time(&self, t: &DateTime<Utc>) -> f64 {
        self.inner.apply(t.timestamp_millis() as f64)
    }

    pub fn invert(&self, px: f64) -> f64 {
        self.inner.invert(px)
    }

    fn interval(&self, count: usize) -> f64 {
        let (d0, d1) = self.domain();
        let target = (d1 - d0).abs() / count.max(1) as f64;
        TIME_INTERVALS
            .iter()
            .copied()
            .min_by(|a, b| {
                (a - target)
                    .abs()
                    .partial_cmp(&(b - target).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(DAY)
    }

    /// Tick positions aligned to a calendar interval near `span / count`.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (d0, d1) = self.domain();
        let (lo, hi) = (d0.min(d1), d0.max(d1));
        if lo == hi {
            return vec![lo];
        }
        let step = self.interval(count);
        let mut t = (lo / step).ceil() * step;
        let mut out = Vec::new();
        while t <= hi && out.len() < 1000 {
            out.push(t);
            t += step;
        }
        out
    }

    /// strftime pattern suited to the tick spacing.
    pub fn tick_format(&self, count: usize) -> &'static str {
        let step = self.interval(count);
        if step < MINUTE {
            "%H:%M:%S"
        } else if step < DAY {
            "%H:%M"
        } else if step < 365.0 * DAY {
            "%b %d"
        } else {
            "%Y"
        }
    }
}

/// Format epoch milliseconds (UTC) with a strftime pattern.
pub fn format_time(ms: f64, pattern: &str) -> String {
    match Utc.timestamp_millis_opt(ms as i64).single() {
        Some(t) => t.format(pattern).to_string(),
        None => String::new(),
    }
}

/// Named sequential color schemes for heatmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    #[default]
    #[serde(alias = "blues", alias = "interpolateBlues")]
    Blues,
    #[serde(alias = "reds", alias = "interpolateReds")]
    Reds,
    #[serde(alias = "greens", alias = "interpolateGreens")]
    Greens,
    #[serde(alias = "viridis", alias = "interpolateViridis")]
    Viridis,
    #[serde(alias = "plasma", alias = "interpolatePlasma")]
    Plasma,
    #[serde(alias = "magma", alias = "interpolateMagma")]
    Magma,
    #[serde(alias = "inferno", alias = "interpolateInferno")]
    Inferno,
}

impl ColorScheme {
    fn stops(self) -> &'static [&'static str] {
        match self {
            ColorScheme::Blues => &[
                "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5",
                "#08519c", "#08306b",
            ],
            ColorScheme::Reds => &[
                "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d",
                "#a50f15", "#67000d",
            ],
            ColorScheme::Greens => &[
                "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45",
                "#006d2c", "#00441b",
            ],
            ColorScheme::Viridis => &[
                "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
                "#6ece58", "#b5de2b", "#fde725",
            ],
            ColorScheme::Plasma => &[
                "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953",
                "#fb9f3a", "#fdca26", "#f0f921",
            ],
            ColorScheme::Magma => &[
                "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d",
                "#fd9668", "#feca8d", "#fcfdbf",
            ],
            ColorScheme::Inferno => &[
                "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925",
                "#fb9b06", "#f7d13d", "#fcffa4",
            ],
        }
    }

    /// Color at `t ∈ [0, 1]`.
    pub fn interpolate(self, t: f64) -> Rgb {
        let stops: Vec<Rgb> = self.stops().iter().filter_map(|s| Rgb::parse(s)).collect();
        color::interpolate_stops(&stops, t)
    }
}

/// Sequential color scale: numeric domain onto a color scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequentialScale {
    domain: (f64, f64),
    scheme: ColorScheme,
}

impl SequentialScale {
    pub fn new(domain: (f64, f64), scheme: ColorScheme) -> Self {
        Self { domain, scheme }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn apply(&self, v: f64) -> Rgb {
        let (d0, d1) = self.domain;
        let t = if d1 == d0 { 0.0 } else { (v - d0) / (d1 - d0) };
        self.scheme.interpolate(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_rounds_headroom_domain() {
        assert_eq!(nice_domain(0.0, 7.7, 10), (0.0, 8.0));
        assert_eq!(nice_domain(0.0, 0.0, 10), (0.0, 0.0));
    }

    #[test]
    fn ticks_are_clean_decimals() {
        assert_eq!(ticks(0.0, 1.0, 5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(0.0, 0.0, 5), vec![0.0]);
    }

    #[test]
    fn degenerate_linear_domain_maps_to_range_start() {
        let s = LinearScale::new((0.0, 0.0), (300.0, 0.0));
        assert_eq!(s.apply(0.0), 300.0);
        assert!(!s.apply(5.0).is_nan());
    }

    #[test]
    fn band_scale_layout() {
        let b = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0));
        assert_eq!(b.bandwidth(), 50.0);
        assert_eq!(b.position("b"), Some(50.0));
        assert_eq!(b.index_at(75.0), Some(1));
        let padded = BandScale::new(vec!["a".into()], (0.0, 100.0)).padding(0.1);
        assert!((padded.bandwidth() - 100.0 * 0.9 / 1.1).abs() < 1e-9);
    }

    #[test]
    fn log_scale_clamps_minimum() {
        let s = LogScale::new((0.0, 1000.0), (100.0, 0.0));
        assert_eq!(s.domain(), (1.0, 1000.0));
        assert_eq!(s.apply(1.0), 100.0);
        assert_eq!(s.apply(1000.0), 0.0);
    }

    #[test]
    fn viridis_endpoints() {
        let s = SequentialScale::new((0.0, 10.0), ColorScheme::Viridis);
        assert_eq!(s.apply(0.0).to_hex(), "#440154");
        assert_eq!(s.apply(10.0).to_hex(), "#fde725");
    }
}
