//! Scheduled attribute tweens.
//!
//! Charts schedule tweens while drawing; the host advances the clock once per
//! animation frame ([`Animator::advance`]) or jumps to the end state
//! ([`Animator::finish`]). Every render starts a new generation and drops the
//! tweens of the previous one, so the last `set_data` always wins.

use serde::{Deserialize, Serialize};

use super::scene::{NodeId, Surface, num};
use super::zoom::ZoomTransform;
use crate::color::{self, Rgb};

/// Easing curves accepted by the `animation.easing` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[serde(alias = "easeLinear")]
    Linear,
    #[serde(alias = "easeQuadInOut")]
    QuadInOut,
    #[serde(alias = "easeCubicIn")]
    CubicIn,
    #[serde(alias = "easeCubicOut")]
    CubicOut,
    #[default]
    #[serde(alias = "easeCubicInOut", alias = "easeCubic")]
    CubicInOut,
    #[serde(alias = "easeSinInOut")]
    SinInOut,
    #[serde(alias = "easeElasticOut", alias = "easeElastic")]
    ElasticOut,
    #[serde(alias = "easeBounceOut", alias = "easeBounce")]
    BounceOut,
}

impl Easing {
    /// Map normalized time `t ∈ [0, 1]` to progress. Endpoints are exact.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        match self {
            Easing::Linear => t,
            Easing::QuadInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 / 2.0
                } else {
                    let u = t2 - 1.0;
                    (u * (2.0 - u) + 1.0) / 2.0
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::CubicInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 * t2 / 2.0
                } else {
                    let u = t2 - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
            Easing::SinInOut => (1.0 - (std::f64::consts::PI * t).cos()) / 2.0,
            Easing::ElasticOut => {
                let p = 0.3;
                let s = p / 4.0;
                1.0 + 2f64.powf(-10.0 * t) * ((t - s) * std::f64::consts::TAU / p).sin()
            }
            Easing::BounceOut => bounce_out(t),
        }
    }
}

fn bounce_out(t: f64) -> f64 {
    let (b1, b2, b3, b4, b5, b6, b7, b8, b9) = (
        4.0 / 11.0,
        6.0 / 11.0,
        8.0 / 11.0,
        3.0 / 4.0,
        9.0 / 11.0,
        10.0 / 11.0,
        15.0 / 16.0,
        21.0 / 22.0,
        63.0 / 64.0,
    );
    let b0 = 1.0 / b1 / b1;
    if t < b1 {
        b0 * t * t
    } else if t < b3 {
        let u = t - b2;
        b0 * u * u + b4
    } else if t < b6 {
        let u = t - b5;
        b0 * u * u + b7
    } else {
        let u = t - b8;
        b0 * u * u + b9
    }
}

/// What a tween writes each frame.
pub enum TweenValue {
    Number { from: f64, to: f64 },
    Color { from: Rgb, to: Rgb },
    Transform { from: ZoomTransform, to: ZoomTransform },
    /// Arbitrary attribute generator, e.g. an arc path for interpolated angles.
    Custom(Box<dyn Fn(f64) -> String>),
}

impl TweenValue {
    fn at(&self, t: f64) -> String {
        match self {
            TweenValue::Number { from, to } => num(from + (to - from) * t),
            TweenValue::Color { from, to } => color::interpolate(*from, *to, t).to_hex(),
            TweenValue::Transform { from, to } => from.lerp(to, t).to_svg(),
            TweenValue::Custom(f) => f(t),
        }
    }
}

impl std::fmt::Debug for TweenValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TweenValue::Number { from, to } => write!(f, "Number({from} -> {to})"),
            TweenValue::Color { from, to } => write!(f, "Color({from} -> {to})"),
            TweenValue::Transform { from, to } => write!(f, "Transform({from:?} -> {to:?})"),
            TweenValue::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Debug)]
pub struct Tween {
    pub node: NodeId,
    pub attr: String,
    pub value: TweenValue,
    pub delay_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(node: NodeId, attr: &str, value: TweenValue) -> Self {
        Self {
            node,
            attr: attr.to_string(),
            value,
            delay_ms: 0.0,
            duration_ms: 0.0,
            easing: Easing::default(),
        }
    }

    pub fn number(node: NodeId, attr: &str, from: f64, to: f64) -> Self {
        Self::new(node, attr, TweenValue::Number { from, to })
    }

    pub fn timing(mut self, duration_ms: f64, delay_ms: f64, easing: Easing) -> Self {
        self.duration_ms = duration_ms.max(0.0);
        self.delay_ms = delay_ms.max(0.0);
        self.easing = easing;
        self
    }
}

/// Completion handle for the tweens scheduled in one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionHandle {
    generation: u64,
}

#[derive(Debug)]
struct Active {
    tween: Tween,
    start_ms: f64,
}

#[derive(Debug, Default)]
pub struct Animator {
    active: Vec<Active>,
    clock_ms: f64,
    generation: u64,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a tween. A tween already targeting the same node attribute is interrupted.
    pub fn schedule(&mut self, tween: Tween) -> TransitionHandle {
        self.active
            .retain(|a| !(a.tween.node == tween.node && a.tween.attr == tween.attr));
        self.active.push(Active {
            start_ms: self.clock_ms + tween.delay_ms,
            tween,
        });
        TransitionHandle {
            generation: self.generation,
        }
    }

    /// Advance the clock and write interpolated values. Finished tweens are dropped.
    pub fn advance(&mut self, dt_ms: f64, surface: &mut Surface) {
        self.clock_ms += dt_ms.max(0.0);
        let now = self.clock_ms;
        self.active.retain(|a| {
            if now < a.start_ms {
                return true;
            }
            let t = if a.tween.duration_ms <= 0.0 {
                1.0
            } else {
                ((now - a.start_ms) / a.tween.duration_ms).min(1.0)
            };
            let value = a.tween.value.at(a.tween.easing.apply(t));
            surface.set_attr(a.tween.node, &a.tween.attr, value);
            t < 1.0
        });
    }

    /// Jump every pending tween to its end value.
    pub fn finish(&mut self, surface: &mut Surface) {
        for a in self.active.drain(..) {
            surface.set_attr(a.tween.node, &a.tween.attr, a.tween.value.at(1.0));
        }
    }

    /// Abort all tweens without writing end values and start a new generation.
    pub fn cancel(&mut self) -> TransitionHandle {
        self.active.clear();
        self.generation += 1;
        self.clock_ms = 0.0;
        TransitionHandle {
            generation: self.generation,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.active.len()
    }

    /// True once every tween of `handle`'s generation has completed or been superseded.
    pub fn is_complete(&self, handle: TransitionHandle) -> bool {
        handle.generation != self.generation || self.active.is_empty()
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easings_hit_endpoints() {
        for e in [
            Easing::Linear,
            Easing::QuadInOut,
            Easing::CubicInOut,
            Easing::ElasticOut,
            Easing::BounceOut,
        ] {
            assert_eq!(e.apply(0.0), 0.0);
            assert_eq!(e.apply(1.0), 1.0);
        }
        assert!((Easing::CubicInOut.apply(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tween_respects_delay_and_completes() {
        let mut s = Surface::new(10.0, 10.0);
        let root = s.root();
        let r = s.element(root, "rect", [("height", "0")]);
        let mut a = Animator::new();
        let h = a.schedule(Tween::number(r, "height", 0.0, 100.0).timing(100.0, 50.0, Easing::Linear));
        a.advance(40.0, &mut s);
        assert_eq!(s.attr(r, "height"), Some("0"));
        a.advance(60.0, &mut s);
        assert_eq!(s.attr(r, "height"), Some("50"));
        assert!(!a.is_complete(h));
        a.advance(100.0, &mut s);
        assert_eq!(s.attr(r, "height"), Some("100"));
        assert!(a.is_complete(h));
    }

    #[test]
    fn cancel_supersedes_generation() {
        let mut s = Surface::new(10.0, 10.0);
        let root = s.root();
        let r = s.element(root, "rect", [("width", "0")]);
        let mut a = Animator::new();
        let h = a.schedule(Tween::number(r, "width", 0.0, 10.0).timing(100.0, 0.0, Easing::Linear));
        a.cancel();
        assert!(a.is_complete(h));
        a.finish(&mut s);
        assert_eq!(s.attr(r, "width"), Some("0"));
    }
}
