//! Mask-driven pasting shared by the base and text layers.

use image::{GrayImage, Rgba, RgbaImage};

/// Rounded division by 255 for products of two 8-bit values.
#[inline]
fn div255(value: u32) -> u8 {
    let v = value + 128;
    ((v + (v >> 8)) >> 8) as u8
}

/// Interpolates one channel from `dst` toward `src` by `mask / 255`.
#[inline]
fn blend_channel(dst: u8, src: u8, mask: u8) -> u8 {
    let m = u32::from(mask);
    div255(u32::from(dst) * (255 - m) + u32::from(src) * m)
}

/// Pastes `src` onto `dest` at the origin through a greyscale mask.
///
/// Every channel, alpha included, moves from the destination toward the
/// source in proportion to the mask: 0 keeps the destination, 255 copies the
/// source. Only the overlapping region of the three images is touched.
pub fn paste_with_mask(dest: &mut RgbaImage, src: &RgbaImage, mask: &GrayImage) {
    let width = dest.width().min(src.width()).min(mask.width());
    let height = dest.height().min(src.height()).min(mask.height());

    for y in 0..height {
        for x in 0..width {
            let m = mask.get_pixel(x, y)[0];
            if m == 0 {
                continue;
            }
            let s = src.get_pixel(x, y);
            let d = dest.get_pixel_mut(x, y);
            *d = if m == 255 {
                *s
            } else {
                Rgba([
                    blend_channel(d[0], s[0], m),
                    blend_channel(d[1], s[1], m),
                    blend_channel(d[2], s[2], m),
                    blend_channel(d[3], s[3], m),
                ])
            };
        }
    }
}
