//! Surface materials.
//!
//! A [`Material`] is plain CPU state. Every setter raises a `needs_update`
//! flag which the scene pass consumes to re-upload the uniform (and rebind
//! maps) before the next frame is drawn.

use crate::data_structures::texture::TextureHandle;

/// Linear RGB colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Interprets `hex` (0xRRGGBB) as an sRGB colour and converts it to linear.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Inverse of [`Color::from_hex`], rounding each channel to 8 bits.
    pub fn to_hex(&self) -> u32 {
        let channel = |c: f32| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }
}

impl From<[f32; 3]> for Color {
    fn from(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl From<Color> for [f32; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(0.41666) - 0.055
    }
}

/// Metal/rough material with an emissive term.
///
/// Fields are private so that no write can bypass the update flag.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    base_color: [f32; 4],
    base_color_map: Option<TextureHandle>,
    metalness: f32,
    emissive: Color,
    emissive_map: Option<TextureHandle>,
    emissive_intensity: f32,
    needs_update: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0], None, 1.0)
    }
}

impl Material {
    /// A material with no emission. Starts flagged so it gets uploaded once.
    pub fn new(base_color: [f32; 4], base_color_map: Option<TextureHandle>, metalness: f32) -> Self {
        Self {
            base_color,
            base_color_map,
            metalness,
            emissive: Color::BLACK,
            emissive_map: None,
            emissive_intensity: 1.0,
            needs_update: true,
        }
    }

    pub fn base_color(&self) -> [f32; 4] {
        self.base_color
    }

    pub fn base_color_map(&self) -> Option<TextureHandle> {
        self.base_color_map
    }

    pub fn metalness(&self) -> f32 {
        self.metalness
    }

    pub fn emissive(&self) -> Color {
        self.emissive
    }

    pub fn emissive_map(&self) -> Option<TextureHandle> {
        self.emissive_map
    }

    pub fn emissive_intensity(&self) -> f32 {
        self.emissive_intensity
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn set_emissive(&mut self, color: Color) {
        self.emissive = color;
        self.needs_update = true;
    }

    pub fn set_emissive_map(&mut self, map: Option<TextureHandle>) {
        self.emissive_map = map;
        self.needs_update = true;
    }

    pub fn set_emissive_intensity(&mut self, intensity: f32) {
        self.emissive_intensity = intensity;
        self.needs_update = true;
    }

    /// Returns whether the material changed since the last call and clears
    /// the flag.
    pub fn take_needs_update(&mut self) -> bool {
        std::mem::replace(&mut self.needs_update, false)
    }

    /// Shifts map handles by `offset`, used when a model's local texture
    /// indices are registered into a shared store.
    pub(crate) fn offset_maps(&mut self, offset: usize) {
        let shift = |map: Option<TextureHandle>| map.map(|TextureHandle(idx)| TextureHandle(idx + offset));
        self.base_color_map = shift(self.base_color_map);
        self.emissive_map = shift(self.emissive_map);
        self.needs_update = true;
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            base_color: self.base_color,
            emissive: [
                self.emissive.r,
                self.emissive.g,
                self.emissive.b,
                self.emissive_intensity,
            ],
            params: [self.metalness, 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    base_color: [f32; 4],
    // rgb = emissive colour, w = emissive intensity
    emissive: [f32; 4],
    // x = metalness
    params: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_converted_to_linear() {
        let white = Color::from_hex(0xffffff);
        assert!((white.r - 1.0).abs() < 1e-5);
        assert!((white.g - 1.0).abs() < 1e-5);
        assert!((white.b - 1.0).abs() < 1e-5);
        assert_eq!(Color::from_hex(0x000000), Color::BLACK);

        let glow = Color::from_hex(0xFB6260);
        assert!(glow.r > 0.9 && glow.r < 1.0);
        assert!(glow.g < 0.2);
        assert!(glow.b < 0.2);
    }

    #[test]
    fn setters_raise_the_update_flag() {
        let mut material = Material::default();
        assert!(material.take_needs_update());
        assert!(!material.needs_update());

        material.set_emissive_intensity(2.0);
        assert!(material.needs_update());
        assert!(material.take_needs_update());

        material.set_emissive(Color::WHITE);
        assert!(material.take_needs_update());

        material.set_emissive_map(Some(TextureHandle(3)));
        assert!(material.take_needs_update());
        assert!(!material.take_needs_update());
    }

    #[test]
    fn offsetting_moves_only_present_maps() {
        let mut material = Material::new([1.0; 4], Some(TextureHandle(0)), 0.0);
        material.offset_maps(4);

        assert_eq!(material.base_color_map(), Some(TextureHandle(4)));
        assert_eq!(material.emissive_map(), None);
    }
}
