//! Logical window size and pixel ratio, and the drawing buffer size derived
//! from them.

use winit::dpi::PhysicalSize;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Size in logical (CSS) pixels.
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl Viewport {
    /// `scale_factor` is clamped to `max_pixel_ratio`.
    pub fn new(width: f64, height: f64, scale_factor: f64, max_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio: scale_factor.min(max_pixel_ratio),
        }
    }

    /// Builds the viewport from what the window reports: a physical size at
    /// its native `scale_factor`.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64, max_pixel_ratio: f64) -> Self {
        let logical = size.to_logical::<f64>(scale_factor);
        Self::new(logical.width, logical.height, scale_factor, max_pixel_ratio)
    }

    /// Drawing buffer size in device pixels.
    pub fn drawing_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(
            (self.width * self.pixel_ratio).round() as u32,
            (self.height * self.pixel_ratio).round() as u32,
        )
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            (self.width / self.height) as f32
        } else {
            1.0
        }
    }

    pub fn is_empty(&self) -> bool {
        let size = self.drawing_size();
        size.width == 0 || size.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::new(800.0, 600.0, 3.0, 2.0);
        assert_eq!(viewport.pixel_ratio, 2.0);
        assert_eq!(viewport.drawing_size(), PhysicalSize::new(1600, 1200));
    }

    #[test]
    fn physical_size_is_converted_back_to_logical() {
        // a 3x display reports 2400x1800 physical for an 800x600 window
        let viewport = Viewport::from_physical(PhysicalSize::new(2400, 1800), 3.0, 2.0);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!(viewport.drawing_size(), PhysicalSize::new(1600, 1200));
    }

    #[test]
    fn aspect_of_logical_size() {
        let viewport = Viewport::new(1280.0, 720.0, 1.0, 2.0);
        assert!((viewport.aspect() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn zero_sized_viewport_is_empty() {
        assert!(Viewport::new(0.0, 600.0, 1.0, 2.0).is_empty());
        assert!(!Viewport::new(1.0, 1.0, 1.0, 2.0).is_empty());
    }
}
