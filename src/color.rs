//! Color parsing, conversion and contrast math.
//!
//! Colors travel through options, themes and the scene graph as CSS strings
//! (`#4472c4`, `#fff`, `rgb(68, 114, 196)`, `steelblue`); this module turns them
//! into [`Rgb`] values for interpolation, contrast checks and rasterization.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Opaque 8-bit sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Hue/saturation/lightness triple, hue in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    pub h_deg: f64, // 0..360
    pub s: f64,     // 0..1
    pub l: f64,     // 0..1
}

pub const BLACK: Rgb = Rgb::new(0, 0, 0);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);

const NAMED: [(&str, Rgb); 16] = [
    ("black", BLACK),
    ("white", WHITE),
    ("red", Rgb::new(255, 0, 0)),
    ("green", Rgb::new(0, 128, 0)),
    ("blue", Rgb::new(0, 0, 255)),
    ("orange", Rgb::new(255, 165, 0)),
    ("yellow", Rgb::new(255, 255, 0)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("gray", Rgb::new(128, 128, 128)),
    ("grey", Rgb::new(128, 128, 128)),
    ("lightgray", Rgb::new(211, 211, 211)),
    ("darkgray", Rgb::new(169, 169, 169)),
    ("steelblue", Rgb::new(70, 130, 180)),
    ("navy", Rgb::new(0, 0, 128)),
    ("purple", Rgb::new(128, 0, 128)),
];

fn rgb_fn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[\d.]+\s*)?\)$")
            .expect("static regex")
    })
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a CSS color string. Returns `None` for `none`, gradients and anything unrecognized.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(caps) = rgb_fn_regex().captures(&lower) {
            let channel = |i: usize| caps[i].parse::<u16>().ok().map(|v| v.min(255) as u8);
            return Some(Self::new(channel(1)?, channel(2)?, channel(3)?));
        }
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, c)| *c)
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// WCAG relative luminance (sRGB, linearized channels).
    pub fn relative_luminance(self) -> f64 {
        fn linear(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    /// Scale channels up by `(1/0.7)^k`.
    pub fn brighter(self, k: f64) -> Self {
        self.scale((1.0 / 0.7f64).powf(k))
    }

    /// Scale channels down by `0.7^k`.
    pub fn darker(self, k: f64) -> Self {
        self.scale(0.7f64.powf(k))
    }

    fn scale(self, factor: f64) -> Self {
        let ch = |c: u8| (c as f64 * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(ch(self.r), ch(self.g), ch(self.b))
    }

    pub fn to_hsl(self) -> Hsl {
        let (r, g, b) = (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        );
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let delta = max - min;
        if delta == 0.0 {
            return Hsl { h_deg: 0.0, s: 0.0, l };
        }
        let s = if l > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };
        let hue = if max == r {
            60.0 * (((g - b) / delta) % 6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let h_deg = if hue < 0.0 { hue + 360.0 } else { hue };
        Hsl { h_deg, s, l }
    }

    pub fn from_hsl(hsl: Hsl) -> Self {
        let h = (hsl.h_deg.rem_euclid(360.0)) / 360.0;
        let s = hsl.s.clamp(0.0, 1.0);
        let l = hsl.l.clamp(0.0, 1.0);

        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return Self::new(v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 1.0 / 2.0 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        }

        Self::new(
            (hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0).round() as u8,
            (hue_to_rgb(p, q, h) * 255.0).round() as u8,
            (hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0).round() as u8,
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digit = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut it = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some(Rgb::new(it.next()??, it.next()??, it.next()??))
        }
        6 => Some(Rgb::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => None,
    }
}

/// Linear RGB interpolation, `t` clamped to `[0, 1]`.
pub fn interpolate(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let ch = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Rgb::new(ch(a.r, b.r), ch(a.g, b.g), ch(a.b, b.b))
}

/// Piecewise-linear interpolation across evenly spaced stops.
pub fn interpolate_stops(stops: &[Rgb], t: f64) -> Rgb {
    match stops.len() {
        0 => BLACK,
        1 => stops[0],
        n => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            let pos = t * (n - 1) as f64;
            let i = (pos.floor() as usize).min(n - 2);
            interpolate(stops[i], stops[i + 1], pos - i as f64)
        }
    }
}

/// WCAG contrast ratio between two colors, in `[1, 21]`.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (a.relative_luminance(), b.relative_luminance());
    let (hi, lo) = if la >= lb { (la, lb) } else { (lb, la) };
    (hi + 0.05) / (lo + 0.05)
}

/// Black or white, whichever reads better on `bg`.
pub fn contrasting_text(bg: Rgb) -> Rgb {
    if contrast_ratio(bg, BLACK) >= contrast_ratio(bg, WHITE) {
        BLACK
    } else {
        WHITE
    }
}

/// `steps` colors from `a` to `b` inclusive.
pub fn gradient(a: Rgb, b: Rgb, steps: usize) -> Vec<Rgb> {
    match steps {
        0 => Vec::new(),
        1 => vec![a],
        n => (0..n)
            .map(|i| interpolate(a, b, i as f64 / (n - 1) as f64))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_rgb_and_names() {
        assert_eq!(Rgb::parse("#fff"), Some(WHITE));
        assert_eq!(Rgb::parse("#4472C4"), Some(Rgb::new(68, 114, 196)));
        assert_eq!(Rgb::parse("rgb(1, 2, 3)"), Some(Rgb::new(1, 2, 3)));
        assert_eq!(Rgb::parse("SteelBlue"), Some(Rgb::new(70, 130, 180)));
        assert_eq!(Rgb::parse("url(#grad)"), None);
        assert_eq!(Rgb::parse("#12"), None);
    }

    #[test]
    fn contrast_of_black_on_white_is_21() {
        let r = contrast_ratio(BLACK, WHITE);
        assert!((r - 21.0).abs() < 1e-9);
        assert!((contrast_ratio(WHITE, WHITE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn text_color_flips_with_background() {
        assert_eq!(contrasting_text(WHITE), BLACK);
        assert_eq!(contrasting_text(Rgb::new(20, 20, 40)), WHITE);
    }

    #[test]
    fn gradient_includes_endpoints() {
        let g = gradient(BLACK, WHITE, 3);
        assert_eq!(g, vec![BLACK, Rgb::new(128, 128, 128), WHITE]);
        assert!(gradient(BLACK, WHITE, 0).is_empty());
    }

    #[test]
    fn hsl_round_trip_is_close() {
        let c = Rgb::new(68, 114, 196);
        let back = Rgb::from_hsl(c.to_hsl());
        assert!((c.r as i16 - back.r as i16).abs() <= 1);
        assert!((c.b as i16 - back.b as i16).abs() <= 1);
    }
}
