/// 8-bit RGBA color as stored in a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Color with alpha fixed at 255
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn from_array(px: [u8; 4]) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }

    /// Same color with alpha forced to 255
    pub const fn with_full_alpha(self) -> Self {
        Self::opaque(self.r, self.g, self.b)
    }

    /// Color channels scaled by alpha, rounded to nearest
    pub fn premultiplied(self) -> Self {
        let scale = |c: u8| ((c as u16 * self.a as u16 + 127) / 255) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
    }
}

impl From<[u8; 4]> for Rgba {
    fn from(px: [u8; 4]) -> Self {
        Self::from_array(px)
    }
}

impl From<Rgba> for [u8; 4] {
    fn from(color: Rgba) -> Self {
        color.to_array()
    }
}
