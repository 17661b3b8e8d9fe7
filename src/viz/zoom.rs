//! Pan/zoom transforms and the behavior that constrains them.

use super::scale::{LinearScale, TimeScale};
use super::scene::num;

/// Affine transform `(x, y) ↦ (x·k + tx, y·k + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn new(k: f64, x: f64, y: f64) -> Self {
        Self { k, x, y }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, p: (f64, f64)) -> (f64, f64) {
        (p.0 * self.k + self.x, p.1 * self.k + self.y)
    }

    pub fn apply_x(&self, x: f64) -> f64 {
        x * self.k + self.x
    }

    pub fn invert(&self, p: (f64, f64)) -> (f64, f64) {
        (self.invert_x(p.0), self.invert_y(p.1))
    }

    pub fn invert_x(&self, x: f64) -> f64 {
        (x - self.x) / self.k
    }

    pub fn invert_y(&self, y: f64) -> f64 {
        (y - self.y) / self.k
    }

    /// Translate in the transform's own (scaled) coordinates.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.k, self.x + self.k * dx, self.y + self.k * dy)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.k * factor, self.x, self.y)
    }

    /// Component-wise interpolation.
    pub fn lerp(&self, to: &ZoomTransform, t: f64) -> Self {
        let l = |a: f64, b: f64| a + (b - a) * t;
        Self::new(l(self.k, to.k), l(self.x, to.x), l(self.y, to.y))
    }

    /// SVG `transform` attribute value.
    pub fn to_svg(&self) -> String {
        format!("translate({},{}) scale({})", num(self.x), num(self.y), num(self.k))
    }

    /// Copy of `scale` whose domain shows what is currently visible along x.
    pub fn rescale_x(&self, scale: &LinearScale) -> LinearScale {
        let (r0, r1) = scale.range();
        scale.with_domain((scale.invert(self.invert_x(r0)), scale.invert(self.invert_x(r1))))
    }

    pub fn rescale_y(&self, scale: &LinearScale) -> LinearScale {
        let (r0, r1) = scale.range();
        scale.with_domain((scale.invert(self.invert_y(r0)), scale.invert(self.invert_y(r1))))
    }

    pub fn rescale_time(&self, scale: &TimeScale) -> TimeScale {
        TimeScale::new(self.rescale_x(scale.linear()).domain(), scale.range())
    }
}

type Extent = [(f64, f64); 2];

/// Zoom state with scale and translate limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomBehavior {
    scale_extent: (f64, f64),
    viewport: Extent,
    translate_extent: Option<Extent>,
    transform: ZoomTransform,
}

impl ZoomBehavior {
    pub fn new(scale_extent: (f64, f64), viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            scale_extent,
            viewport: [(0.0, 0.0), (viewport_width, viewport_height)],
            translate_extent: None,
            transform: ZoomTransform::IDENTITY,
        }
    }

    /// Keep the content inside `[x0, y0]–[x1, y1]` when panning.
    pub fn with_translate_extent(mut self, extent: Extent) -> Self {
        self.translate_extent = Some(extent);
        self
    }

    pub fn scale_extent(&self) -> (f64, f64) {
        self.scale_extent
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn center(&self) -> (f64, f64) {
        let [(x0, y0), (x1, y1)] = self.viewport;
        ((x0 + x1) / 2.0, (y0 + y1) / 2.0)
    }

    fn clamp_k(&self, k: f64) -> f64 {
        k.clamp(self.scale_extent.0, self.scale_extent.1)
    }

    fn constrain(&self, t: ZoomTransform) -> ZoomTransform {
        let Some([(tx0, ty0), (tx1, ty1)]) = self.translate_extent else {
            return t;
        };
        let [(vx0, vy0), (vx1, vy1)] = self.viewport;
        let dx0 = t.invert_x(vx0) - tx0;
        let dx1 = t.invert_x(vx1) - tx1;
        let dy0 = t.invert_y(vy0) - ty0;
        let dy1 = t.invert_y(vy1) - ty1;
        let pick = |d0: f64, d1: f64| {
            if d1 > d0 {
                (d0 + d1) / 2.0
            } else if d0 < 0.0 {
                d0
            } else if d1 > 0.0 {
                d1
            } else {
                0.0
            }
        };
        t.translate(pick(dx0, dx1), pick(dy0, dy1))
    }

    /// Replace the transform (scale clamped, translation constrained).
    pub fn set(&mut self, t: ZoomTransform) -> ZoomTransform {
        let t = ZoomTransform::new(self.clamp_k(t.k), t.x, t.y);
        self.transform = self.constrain(t);
        self.transform
    }

    /// Scale to `k` keeping `point` fixed on screen.
    pub fn scale_to(&mut self, k: f64, point: (f64, f64)) -> ZoomTransform {
        let k1 = self.clamp_k(k);
        let (px, py) = self.transform.invert(point);
        let t = ZoomTransform::new(k1, point.0 - px * k1, point.1 - py * k1);
        self.transform = self.constrain(t);
        self.transform
    }

    pub fn scale_by(&mut self, factor: f64, point: (f64, f64)) -> ZoomTransform {
        self.scale_to(self.transform.k * factor, point)
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) -> ZoomTransform {
        let t = self.transform;
        self.set(ZoomTransform::new(t.k, t.x + dx, t.y + dy))
    }

    /// Mouse-wheel zoom around `point` (pixel-mode `delta_y`).
    pub fn wheel(&mut self, delta_y: f64, point: (f64, f64)) -> ZoomTransform {
        self.scale_by(2f64.powf(-delta_y * 0.002), point)
    }

    pub fn reset(&mut self) -> ZoomTransform {
        self.transform = ZoomTransform::IDENTITY;
        self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_clamped_to_extent() {
        let mut z = ZoomBehavior::new((1.0, 10.0), 100.0, 100.0);
        assert_eq!(z.scale_to(50.0, (0.0, 0.0)).k, 10.0);
        assert_eq!(z.scale_to(0.1, (0.0, 0.0)).k, 1.0);
    }

    #[test]
    fn translate_extent_keeps_content_in_view() {
        let mut z = ZoomBehavior::new((1.0, 10.0), 100.0, 50.0)
            .with_translate_extent([(0.0, 0.0), (100.0, 50.0)]);
        z.scale_to(2.0, (50.0, 25.0));
        let t = z.pan(500.0, 0.0);
        assert_eq!(t.x, 0.0);
        let t = z.pan(-1000.0, 0.0);
        assert_eq!(t.x, -100.0);
    }

    #[test]
    fn rescale_shows_visible_domain() {
        let s = LinearScale::new((0.0, 10.0), (0.0, 100.0));
        let t = ZoomTransform::new(2.0, -50.0, 0.0);
        let r = t.rescale_x(&s);
        assert_eq!(r.domain(), (2.5, 7.5));
    }

    #[test]
    fn svg_transform_format() {
        assert_eq!(ZoomTransform::IDENTITY.to_svg(), "translate(0,0) scale(1)");
    }
}
