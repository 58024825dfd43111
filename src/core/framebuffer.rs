use super::color::Rgba;
use crate::error::{ManagerError, Result};

/// How a presenting surface treats the alpha channel of uploaded pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaHandling {
    /// Alpha ignored, every pixel shown fully opaque
    Opaque,
    /// Channels passed through verbatim for the compositor to blend
    Straight,
    /// Color channels scaled by alpha before upload
    Premultiplied,
}

/// Per-window RGBA pixel grid
///
/// Row-major, origin top-left, 4 bytes per pixel. Writes outside the grid are
/// silently dropped so callers never have to bounds-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    /// Create a framebuffer filled with opaque black
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::BLACK)
    }

    /// Create a framebuffer filled with fully transparent black
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixel_count = width as usize * height as usize;
        let pixels = color.to_array().repeat(pixel_count);
        Self { pixels, width, height }
    }

    /// Like `filled`, but reports a size that overflows or cannot be allocated
    pub fn try_filled(width: u32, height: u32, color: Rgba) -> Result<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                ManagerError::WindowCreation(format!("{}x{} framebuffer overflows", width, height))
            })?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| {
            ManagerError::WindowCreation(format!("{}x{} framebuffer: {}", width, height, e))
        })?;
        pixels.resize(len, 0);

        let mut framebuffer = Self { pixels, width, height };
        framebuffer.clear_rgba(color);
        Ok(framebuffer)
    }

    /// Opaque write; alpha is set to 255
    pub fn set_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        self.write(x, y, Rgba::opaque(r, g, b));
    }

    /// Raw write; channels stored verbatim with no blending
    pub fn set_pixel_rgba(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        self.write(x, y, Rgba::new(r, g, b, a));
    }

    pub fn write(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(idx) = self.byte_index(x, y) {
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_array());
        }
    }

    /// Set every pixel to `(r, g, b, 255)`
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        self.clear_rgba(Rgba::opaque(r, g, b));
    }

    pub fn clear_black(&mut self) {
        self.clear(0, 0, 0);
    }

    pub fn clear_rgba(&mut self, color: Rgba) {
        let value = color.to_array();
        for px in bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut self.pixels) {
            *px = value;
        }
    }

    /// Fill before presentation; identical to `clear`
    pub fn fill(&mut self, r: u8, g: u8, b: u8) {
        self.clear(r, g, b);
    }

    /// Read a pixel, `None` when out of bounds
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        let idx = self.byte_index(x, y)?;
        let px: [u8; 4] = self.pixels[idx..idx + 4].try_into().ok()?;
        Some(Rgba::from_array(px))
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Produce the byte stream a surface should upload for this buffer
    pub fn compose(&self, handling: AlphaHandling) -> Vec<u8> {
        match handling {
            AlphaHandling::Straight => self.pixels.clone(),
            AlphaHandling::Opaque => self.map_pixels(Rgba::with_full_alpha),
            AlphaHandling::Premultiplied => self.map_pixels(Rgba::premultiplied),
        }
    }

    /// Copy into a `width`x`height` grid, padding uncovered pixels with `background`
    pub fn fitted(&self, width: u32, height: u32, background: Rgba) -> Framebuffer {
        if (width, height) == (self.width, self.height) {
            return self.clone();
        }
        let mut out = Framebuffer::filled(width, height, background);
        let row_bytes = self.width.min(width) as usize * 4;
        for y in 0..self.height.min(height) as usize {
            let src = y * self.width as usize * 4;
            let dst = y * width as usize * 4;
            out.pixels[dst..dst + row_bytes].copy_from_slice(&self.pixels[src..src + row_bytes]);
        }
        out
    }

    fn map_pixels(&self, f: impl Fn(Rgba) -> Rgba) -> Vec<u8> {
        let mut out = self.pixels.clone();
        for px in bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut out) {
            *px = f(Rgba::from_array(*px)).to_array();
        }
        out
    }

    fn byte_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}
