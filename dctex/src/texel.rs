// Copyright (c) 2026 The dctex authors
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to	deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE
// SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Per-texel conversions between 32-bit ARGB and the 16-bit on-disk
//! encodings.

use log::error;

use crate::PixelFormat;

/// Packs channel values into a 32-bit ARGB pixel.
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Packs channel values into an opaque 32-bit ARGB pixel.
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    argb(255, r, g, b)
}

pub const fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

pub const fn red(pixel: u32) -> u8 {
    (pixel >> 16) as u8
}

pub const fn green(pixel: u32) -> u8 {
    (pixel >> 8) as u8
}

pub const fn blue(pixel: u32) -> u8 {
    pixel as u8
}

/// Converts a 32-bit ARGB pixel to a single 16-bit texel.
///
/// YUV422 and the paletted formats have no single-texel representation;
/// asking for one is an internal error and yields 0xFFFF.
pub fn to_16bpp(pixel: u32, format: PixelFormat) -> u16 {
    match format {
        PixelFormat::Argb1555 => {
            let a = if alpha(pixel) < 128 { 0u16 } else { 1 };
            let r = (red(pixel) >> 3) as u16;
            let g = (green(pixel) >> 3) as u16;
            let b = (blue(pixel) >> 3) as u16;
            (a << 15) | (r << 10) | (g << 5) | b
        }
        PixelFormat::Rgb565 => {
            let r = (red(pixel) >> 3) as u16;
            let g = (green(pixel) >> 2) as u16;
            let b = (blue(pixel) >> 3) as u16;
            (r << 11) | (g << 5) | b
        }
        PixelFormat::Argb4444 => {
            let a = (alpha(pixel) >> 4) as u16;
            let r = (red(pixel) >> 4) as u16;
            let g = (green(pixel) >> 4) as u16;
            let b = (blue(pixel) >> 4) as u16;
            (a << 12) | (r << 8) | (g << 4) | b
        }
        PixelFormat::Bumpmap => to_spherical(pixel),
        _ => {
            error!("unsupported format {:?} in to_16bpp", format);
            0xFFFF
        }
    }
}

/// Converts a single 16-bit texel back to 32-bit ARGB.
///
/// The inverse of [`to_16bpp`]; unsupported formats yield opaque white.
pub fn to_32bpp(texel: u16, format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Argb1555 => {
            let a = if (texel >> 15) == 1 { 255 } else { 0 };
            let r = (((texel >> 10) & 0x1F) << 3) as u8;
            let g = (((texel >> 5) & 0x1F) << 3) as u8;
            let b = ((texel & 0x1F) << 3) as u8;
            argb(a, r, g, b)
        }
        PixelFormat::Rgb565 => {
            let r = (((texel >> 11) & 0x1F) << 3) as u8;
            let g = (((texel >> 5) & 0x3F) << 2) as u8;
            let b = ((texel & 0x1F) << 3) as u8;
            rgb(r, g, b)
        }
        PixelFormat::Argb4444 => {
            let a = (((texel >> 12) & 0xF) << 4) as u8;
            let r = (((texel >> 8) & 0xF) << 4) as u8;
            let g = (((texel >> 4) & 0xF) << 4) as u8;
            let b = ((texel & 0xF) << 4) as u8;
            argb(a, r, g, b)
        }
        PixelFormat::Bumpmap => to_cartesian(texel),
        _ => {
            error!("unsupported format {:?} in to_32bpp", format);
            rgb(255, 255, 255)
        }
    }
}

/// Encodes a pair of horizontally adjacent pixels as YUV422.
///
/// Both pixels get their own luma; chroma comes from the averaged pair.
/// Returned as `(Y0 << 8 | U, Y1 << 8 | V)`.
pub fn rgb_to_yuv422(rgb1: u32, rgb2: u32) -> (u16, u16) {
    let avg_r = (red(rgb1) as i32 + red(rgb2) as i32) / 2;
    let avg_g = (green(rgb1) as i32 + green(rgb2) as i32) / 2;
    let avg_b = (blue(rgb1) as i32 + blue(rgb2) as i32) / 2;

    let luma = |p: u32| {
        ((0.299 * red(p) as f64 + 0.587 * green(p) as f64 + 0.114 * blue(p) as f64) as i32)
            .clamp(0, 255)
    };
    let y0 = luma(rgb1);
    let y1 = luma(rgb2);

    let u = ((-0.169 * avg_r as f64 - 0.331 * avg_g as f64 + 0.4990 * avg_b as f64 + 128.0)
        as i32)
        .clamp(0, 255);
    let v = ((0.499 * avg_r as f64 - 0.418 * avg_g as f64 - 0.0813 * avg_b as f64 + 128.0)
        as i32)
        .clamp(0, 255);

    (((y0 as u16) << 8) | u as u16, ((y1 as u16) << 8) | v as u16)
}

/// Decodes a YUV422 texel pair back to two opaque RGB pixels.
pub fn yuv422_to_rgb(yuv1: u16, yuv2: u16) -> (u32, u32) {
    let y0 = ((yuv1 & 0xFF00) >> 8) as f64;
    let y1 = ((yuv2 & 0xFF00) >> 8) as f64;
    let u = ((yuv1 & 0xFF) as i32 - 128) as f64;
    let v = ((yuv2 & 0xFF) as i32 - 128) as f64;

    let expand = |y: f64| {
        let r = ((y + 1.375 * v) as i32).clamp(0, 255) as u8;
        let g = ((y - 0.34375 * u - 0.6875 * v) as i32).clamp(0, 255) as u8;
        let b = ((y + 1.71875 * u) as i32).clamp(0, 255) as u8;
        rgb(r, g, b)
    };

    (expand(y0), expand(y1))
}

const DOUBLE_PI: f32 = std::f32::consts::PI * 2.0;
const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

// Bumpmap texels hold a surface normal in spherical coordinates. The (R, G)
// channels of the input are the x and y of a unit vector in [-1, 1], B is z
// in [0, 1]. Elevation S: 0 = flat, 255 = straight up. Azimuth R: 0..255
// covers a full revolution.
fn to_spherical(pixel: u32) -> u16 {
    let x = red(pixel) as f32 / 255.0 * 2.0 - 1.0;
    let y = green(pixel) as f32 / 255.0 * 2.0 - 1.0;
    let z = blue(pixel) as f32 / 255.0;

    let radius = (x * x + y * y + z * z).sqrt();
    let polar = (z / radius).acos();
    let azimuth = y.atan2(x);

    // acos gives 0 (straight up) to PI (straight down); remap so that
    // 0 means flat and 255 means straight up.
    let polar = HALF_PI - polar;
    let s = ((polar / HALF_PI * 255.0) as i32).clamp(0, 255);

    let azimuth = if azimuth < 0.0 {
        azimuth + DOUBLE_PI
    } else {
        azimuth
    };
    let r = ((azimuth / DOUBLE_PI * 255.0) as i32).clamp(0, 255);

    ((s as u16) << 8) | r as u16
}

fn to_cartesian(texel: u16) -> u32 {
    let s = (1.0 - (texel >> 8) as f32 / 255.0) * HALF_PI;
    let mut r = (texel & 0xFF) as f32 / 255.0 * DOUBLE_PI;
    if r > std::f32::consts::PI {
        r -= DOUBLE_PI;
    }

    let to_channel = |f: f32| (f.clamp(0.0, 1.0) * 255.0).round() as u8;
    rgb(
        to_channel((s.sin() * r.cos() + 1.0) * 0.5),
        to_channel((s.sin() * r.sin() + 1.0) * 0.5),
        to_channel((s.cos() + 1.0) * 0.5),
    )
}
