//! Pixel surfaces: the targets images are drawn into.

/// A 2-D framebuffer of `0x00RRGGBB` pixels, row-major.
pub trait PixelSurface {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Change the surface dimensions. Contents are unspecified afterwards.
    fn resize(&mut self, width: u32, height: u32);

    /// The framebuffer, `width * height` pixels.
    fn pixels_mut(&mut self) -> &mut [u32];

    /// Hand the current frame to whatever displays it.
    fn present(&mut self);
}

/// A `Vec<u32>`-backed surface that counts presented frames.
#[derive(Clone, Debug, Default)]
pub struct SoftwareSurface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    presents: u64,
}

impl SoftwareSurface {
    /// A black surface of `width * height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            presents: 0,
        }
    }

    /// The framebuffer.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, if inside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Number of frames presented so far.
    pub fn presents(&self) -> u64 {
        self.presents
    }
}

impl PixelSurface for SoftwareSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, 0);
    }

    fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}
