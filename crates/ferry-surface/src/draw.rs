//! Blitting RGBA pixels through a viewport.

use ferry_arena::PixelDimensions;

use crate::surface::PixelSurface;
use crate::viewport::Viewport;

/// Pack an RGBA pixel as `0x00RRGGBB`. Alpha is dropped.
pub fn pack_rgb(px: &[u8]) -> u32 {
    match *px {
        [r, g, b, ..] => u32::from_be_bytes([0, r, g, b]),
        _ => 0,
    }
}

/// Clear `surface` and draw the image in `pixels` through `viewport`.
///
/// Only the clipped, visible part of the image is visited; each surface
/// pixel samples the nearest image pixel. Samples past the end of
/// `pixels` are skipped, so a short buffer draws partially rather than
/// failing.
pub fn draw_rgba<S: PixelSurface + ?Sized>(
    pixels: &[u8],
    dimensions: PixelDimensions,
    viewport: &Viewport,
    surface: &mut S,
) {
    let (sw, sh) = surface.size();
    let frame = surface.pixels_mut();
    frame.fill(0);

    let channels = dimensions.channels.max(1) as usize;
    let image_w = dimensions.width as usize;
    let (left, top) = viewport.to_surface(0.0, 0.0);
    let (right, bottom) = viewport.to_surface(dimensions.width as f32, dimensions.height as f32);

    let x0 = left.max(0.0) as usize;
    let y0 = top.max(0.0) as usize;
    let x1 = right.min(sw as f32).max(0.0) as usize;
    let y1 = bottom.min(sh as f32).max(0.0) as usize;
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let stride = sw as usize;
    for y in y0..y1 {
        for x in x0..x1 {
            let (ix, iy) = viewport.to_image(x as f32, y as f32);
            if ix < 0.0 || iy < 0.0 {
                continue;
            }
            let (ix, iy) = (ix as usize, iy as usize);
            if ix >= image_w || iy >= dimensions.height as usize {
                continue;
            }
            let start = (iy * image_w + ix) * channels;
            let Some(px) = pixels.get(start..start + channels) else {
                continue;
            };
            if let Some(out) = frame.get_mut(y * stride + x) {
                *out = pack_rgb(px);
            }
        }
    }
}
