//! Uniform scale plus translation, mapping image pixels to surface pixels.
//!
//! `surface = scale * image + translate`. Zooming keeps the point under
//! the cursor fixed; panning moves the image by the cursor's travel since
//! the drag started.

/// Zoom factor per scroll line: `1 + ZOOM_STEP * lines`.
pub const ZOOM_STEP: f32 = 0.2;

/// Scale below which zooming out is refused.
pub const MIN_ZOOM_SCALE: f32 = 0.02;

/// Image-to-surface transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    scale: f32,
    translate: (f32, f32),
}

impl Viewport {
    /// The identity transform: one image pixel per surface pixel, at the origin.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translate: (0.0, 0.0),
        }
    }

    /// Current scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Current translation in surface pixels.
    pub fn translation(&self) -> (f32, f32) {
        self.translate
    }

    /// Zoom by `scroll` lines around `cursor` (surface coordinates).
    ///
    /// Returns `false`, leaving the viewport unchanged, when the zoom
    /// would shrink an already tiny image further or the factor is not
    /// positive.
    pub fn zoom_at(&mut self, cursor: (f32, f32), scroll: f32) -> bool {
        let factor = 1.0 + ZOOM_STEP * scroll;
        if factor <= 0.0 || (self.scale < MIN_ZOOM_SCALE && factor <= 1.0) {
            return false;
        }
        let (cx, cy) = cursor;
        let (tx, ty) = self.translate;
        self.scale *= factor;
        self.translate = (factor * (tx - cx) + cx, factor * (ty - cy) + cy);
        true
    }

    /// This viewport moved by `(dx, dy)` surface pixels.
    pub fn panned(&self, dx: f32, dy: f32) -> Self {
        Self {
            scale: self.scale,
            translate: (self.translate.0 + dx, self.translate.1 + dy),
        }
    }

    /// Move by `(dx, dy)` surface pixels.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        *self = self.panned(dx, dy);
    }

    /// Back to [`identity`](Self::identity).
    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    /// Surface position of image point `(x, y)`.
    pub fn to_surface(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.scale * x + self.translate.0,
            self.scale * y + self.translate.1,
        )
    }

    /// Image position under surface point `(x, y)`.
    pub fn to_image(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.translate.0) / self.scale,
            (y - self.translate.1) / self.scale,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_keeps_cursor_fixed() {
        let mut vp = Viewport::identity();
        let before = vp.to_image(40.0, 30.0);
        assert!(vp.zoom_at((40.0, 30.0), 1.0));
        assert!((vp.scale() - 1.2).abs() < 1e-6);
        let after = vp.to_image(40.0, 30.0);
        assert!((before.0 - after.0).abs() < 1e-4);
        assert!((before.1 - after.1).abs() < 1e-4);
    }

    #[test]
    fn zoom_out_stops_at_minimum_scale() {
        let mut vp = Viewport::identity();
        let mut steps = 0;
        while vp.zoom_at((0.0, 0.0), -1.0) {
            steps += 1;
            assert!(steps < 100);
        }
        assert!(vp.scale() < MIN_ZOOM_SCALE);
        assert!(!vp.zoom_at((0.0, 0.0), -1.0));
        // Zooming back in is still allowed.
        assert!(vp.zoom_at((0.0, 0.0), 1.0));
    }

    #[test]
    fn non_positive_factor_refused() {
        let mut vp = Viewport::identity();
        assert!(!vp.zoom_at((0.0, 0.0), -5.0));
        assert_eq!(vp, Viewport::identity());
    }

    #[test]
    fn pan_and_reset() {
        let mut vp = Viewport::identity();
        vp.pan_by(10.0, -4.0);
        assert_eq!(vp.to_surface(0.0, 0.0), (10.0, -4.0));
        vp.reset();
        assert_eq!(vp, Viewport::identity());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn inverse_mapping_round_trips(
                scrolls in proptest::collection::vec(-2.0f32..3.0, 0..6),
                pan in (-500.0f32..500.0, -500.0f32..500.0),
                point in (0.0f32..1000.0, 0.0f32..1000.0),
            ) {
                let mut vp = Viewport::identity();
                for s in scrolls {
                    vp.zoom_at((point.0, point.1), s);
                }
                vp.pan_by(pan.0, pan.1);
                let (sx, sy) = vp.to_surface(point.0, point.1);
                let (ix, iy) = vp.to_image(sx, sy);
                let tol = 1e-2 * (1.0 + point.0.abs().max(point.1.abs()));
                prop_assert!((ix - point.0).abs() < tol);
                prop_assert!((iy - point.1).abs() < tol);
            }
        }
    }
}
