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

//! 2x2 texel quads, the unit of 16-bpp vector quantization.

use crate::texel::{rgb_to_yuv422, to_16bpp};
use crate::PixelFormat;

/// Packs a 2x2 block of ARGB pixels into one 64-bit word of 16-bpp texels,
/// `(a << 48) | (b << 32) | (c << 16) | d` with `(a, b, c, d)` being the
/// top-left, top-right, bottom-left and bottom-right texels.
///
/// YUV422 pairs up the top two and the bottom two pixels so that each pair
/// shares its chroma.
pub fn pack_quad(
    top_left: u32,
    top_right: u32,
    bottom_left: u32,
    bottom_right: u32,
    format: PixelFormat,
) -> u64 {
    let (a, b, c, d) = if format == PixelFormat::Yuv422 {
        let (a, b) = rgb_to_yuv422(top_left, top_right);
        let (c, d) = rgb_to_yuv422(bottom_left, bottom_right);
        (a, b, c, d)
    } else {
        (
            to_16bpp(top_left, format),
            to_16bpp(top_right, format),
            to_16bpp(bottom_left, format),
            to_16bpp(bottom_right, format),
        )
    };
    ((a as u64) << 48) | ((b as u64) << 32) | ((c as u64) << 16) | d as u64
}

/// Splits a packed quad into the four texels in on-disk codebook order.
///
/// The hardware expects codebook entries column first: TL, BL, TR, BR.
pub fn codebook_texels(quad: u64) -> [u16; 4] {
    [
        (quad >> 48) as u16,
        (quad >> 16) as u16,
        (quad >> 32) as u16,
        quad as u16,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texel::rgb;

    #[test]
    fn test_pack_order() {
        let tl = rgb(0xFF, 0, 0);
        let tr = rgb(0, 0xFF, 0);
        let bl = rgb(0, 0, 0xFF);
        let br = rgb(0xFF, 0xFF, 0xFF);
        let quad = pack_quad(tl, tr, bl, br, PixelFormat::Rgb565);

        assert_eq!((quad >> 48) as u16, 0xF800); // TL: pure red
        assert_eq!((quad >> 32) as u16, 0x07E0); // TR: pure green
        assert_eq!((quad >> 16) as u16, 0x001F); // BL: pure blue
        assert_eq!(quad as u16, 0xFFFF); // BR: white
    }

    #[test]
    fn test_codebook_order_is_column_first() {
        let quad = 0xAAAA_BBBB_CCCC_DDDDu64;
        assert_eq!(codebook_texels(quad), [0xAAAA, 0xCCCC, 0xBBBB, 0xDDDD]);
    }

    #[test]
    fn test_yuv_quad_pairs_rows() {
        let gray = rgb(128, 128, 128);
        let quad = pack_quad(gray, gray, gray, gray, PixelFormat::Yuv422);
        let (a, b) = rgb_to_yuv422(gray, gray);
        let expected = ((a as u64) << 48) | ((b as u64) << 32) | ((a as u64) << 16) | b as u64;
        assert_eq!(quad, expected);
    }
}
