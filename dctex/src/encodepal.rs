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

//! The paletted pipeline.
//!
//! Conversion has three modes:
//!
//! 1. The source images hold no more unique colors than the target mode
//!    allows, so indexing is quick and lossless.
//! 2. The source images hold too many colors; a 4-dimensional vector
//!    quantization reduces the palette first.
//! 3. Compression was requested. After the palette is settled, a second
//!    quantization runs over 2x4-pixel blocks with a vector dimension of
//!    32 (8 bpp) or 64 (4 bpp).

use std::io::Write;

use byteorder::WriteBytesExt;
use log::debug;

use crate::image::{ImageSet, IndexedImage};
use crate::palette::Palette;
use crate::twiddle::Twiddler;
use crate::vq::{argb_to_vec, combine_hash, vec_to_argb, Vector, VectorQuantizer};
use crate::{
    PixelFormat, Result, TextureType, MIN_MIPMAP_PALVQ, MIPMAP_OFFSET_4BPP, MIPMAP_OFFSET_8BPP,
};

pub fn convert_paletted<W: Write>(
    stream: &mut W,
    images: &ImageSet,
    texture_type: TextureType,
) -> Result<Palette> {
    let format = texture_type.format();
    let max_colors = if format == PixelFormat::Pal4bpp { 16 } else { 256 };

    let mut palette = Palette::from_images(images);
    debug!("palette contains {} colors", palette.len());

    let indexed = if palette.len() > max_colors {
        // Too many colors; quantize in ARGB space to reduce the count
        // down to what the mode can address.
        debug!("reducing palette to {} colors", max_colors);
        let mut vq = VectorQuantizer::<4>::new();
        let vectors = vectorize_pixels(images);
        vq.compress(&vectors, max_colors);
        let (indexed, reduced) = devectorize_pixels(images, &vectors, &vq);
        palette = reduced;
        indexed
    } else {
        // Convert the input images to indexed images so the writers below
        // can treat both modes the same.
        convert_to_indexed(images, &palette)
    };

    if texture_type.compressed() {
        match format {
            PixelFormat::Pal4bpp => write_compressed_4bpp(stream, &indexed, &palette)?,
            _ => write_compressed_8bpp(stream, &indexed, &palette)?,
        }
    } else {
        match format {
            PixelFormat::Pal4bpp => write_uncompressed_4bpp(stream, &indexed)?,
            _ => write_uncompressed_8bpp(stream, &indexed)?,
        }
    }

    Ok(palette)
}

/// One 4-dimensional vector per source pixel, hashed by the raw pixel
/// value.
fn vectorize_pixels(images: &ImageSet) -> Vec<Vector<4>> {
    let mut vectors = Vec::new();
    for img in images.levels() {
        for &pixel in img.pixels() {
            let mut vec = Vector::with_hash(pixel);
            argb_to_vec(pixel, &mut vec, 0);
            vectors.push(vec);
        }
    }
    vectors
}

/// Assigns every pixel to its closest code and rebuilds the palette from
/// the code vectors.
fn devectorize_pixels(
    images: &ImageSet,
    vectors: &[Vector<4>],
    vq: &VectorQuantizer<4>,
) -> (Vec<IndexedImage>, Palette) {
    let mut indexed = Vec::new();
    let mut vindex = 0;

    for img in images.levels() {
        let mut out = IndexedImage::new(img.width(), img.height());
        for y in 0..img.height() {
            for x in 0..img.width() {
                out.set_index(x, y, vq.find_closest(&vectors[vindex]) as u8);
                vindex += 1;
            }
        }
        indexed.push(out);
    }

    let mut palette = Palette::new();
    for i in 0..vq.code_count() {
        palette.insert(vec_to_argb(vq.code_vector(i), 0));
    }

    (indexed, palette)
}

/// Converts the source images to indexed images, smallest level first.
fn convert_to_indexed(images: &ImageSet, palette: &Palette) -> Vec<IndexedImage> {
    let mut indexed = Vec::new();
    for img in images.levels() {
        let mut out = IndexedImage::new(img.width(), img.height());
        for y in 0..img.height() {
            for x in 0..img.width() {
                out.set_index(x, y, palette.index_of(img.pixel(x, y)) as u8);
            }
        }
        indexed.push(out);
    }
    indexed
}

fn write_uncompressed_4bpp<W: Write>(stream: &mut W, indexed: &[IndexedImage]) -> Result<()> {
    // Mipmap offset if necessary
    if indexed.len() > 1 {
        stream.write_all(&[0u8; MIPMAP_OFFSET_4BPP])?;
    }

    // All mipmaps from smallest to largest
    for img in indexed {
        // Special case. There's only one pixel in the 1x1 mipmap level,
        // but it's stored by itself in one byte.
        if img.width() == 1 {
            stream.write_u8(img.index(0, 0))?;
            continue;
        }

        let twiddler = Twiddler::new(img.width(), img.height());
        let pixels = img.width() * img.height();

        // Pixels go in pairs: first of the pair in the low nibble, second
        // in the high nibble.
        for i in (0..pixels).step_by(2) {
            let mut pair = [0u8; 2];
            for (k, slot) in pair.iter_mut().enumerate() {
                let (x, y) = twiddler.position(i + k);
                *slot = img.index(x, y);
            }
            stream.write_u8(((pair[1] & 0xF) << 4) | (pair[0] & 0xF))?;
        }
    }
    Ok(())
}

fn write_uncompressed_8bpp<W: Write>(stream: &mut W, indexed: &[IndexedImage]) -> Result<()> {
    // Mipmap offset if necessary
    if indexed.len() > 1 {
        stream.write_all(&[0u8; MIPMAP_OFFSET_8BPP])?;
    }

    // All mipmaps from smallest to largest
    for img in indexed {
        let twiddler = Twiddler::new(img.width(), img.height());
        for i in 0..img.width() * img.height() {
            let (x, y) = twiddler.position(i);
            stream.write_u8(img.index(x, y))?;
        }
    }
    Ok(())
}

/// Where a 2x4 pixel block lands inside a block vector.
#[derive(Clone, Copy)]
enum Store {
    /// The whole of a 32-dimensional vector
    Full,
    /// Left half of a 64-dimensional vector
    Left,
    /// Right half of a 64-dimensional vector
    Right,
}

// Component offset of each of the 8 block pixels, per store placement
const STORE_LUT: [[usize; 8]; 3] = [
    [0, 4, 8, 12, 16, 20, 24, 28],
    [0, 4, 16, 20, 32, 36, 48, 52],
    [8, 12, 24, 28, 40, 44, 56, 60],
];

/// Reads the 2x4 pixel block at (x, y) into `vec`, mixing the pixels into
/// the vector's hash as it goes.
fn grab_2x4_block<const N: usize>(
    img: &IndexedImage,
    palette: &Palette,
    x: usize,
    y: usize,
    vec: &mut Vector<N>,
    store: Store,
) {
    let lut = &STORE_LUT[store as usize];
    let mut slot = 0;
    let mut hash = vec.hash();

    for yy in y..y + 4 {
        for xx in x..x + 2 {
            let pixel = palette.color_at(img.index(xx, yy) as usize);
            argb_to_vec(pixel, vec, lut[slot]);
            hash = combine_hash(pixel, hash);
            slot += 1;
        }
    }

    vec.set_hash(hash);
}

fn vectorize_palette(palette: &Palette) -> Vec<Vector<4>> {
    let mut vectors = Vec::with_capacity(palette.len());
    for i in 0..palette.len() {
        let mut vec = Vector::new();
        argb_to_vec(palette.color_at(i), &mut vec, 0);
        vectors.push(vec);
    }
    vectors
}

fn closest_palette_index(vectors: &[Vector<4>], vec: &Vector<4>) -> u8 {
    let mut closest_index = 0u8;
    let mut closest_distance = Vector::distance_squared(&vectors[0], vec);
    for (i, candidate) in vectors.iter().enumerate().skip(1) {
        let distance = Vector::distance_squared(candidate, vec);
        if distance < closest_distance {
            closest_index = i as u8;
            closest_distance = distance;
        }
    }
    closest_index
}

fn write_compressed_4bpp<W: Write>(
    stream: &mut W,
    indexed: &[IndexedImage],
    palette: &Palette,
) -> Result<()> {
    let mut vq = VectorQuantizer::<64>::new();
    let mut vectors: Vec<Vector<64>> = Vec::new();

    // Each vector covers a pair of 2x4 pixel blocks. A single image sits
    // on a byte boundary, so its 4x4 blocks map to vectors one to one.
    // Mipmapped data is aligned on a nibble boundary instead: a vector
    // covers the second half of the 4x4 block at twiddled position n and
    // the first half of the block at n + 1.
    if indexed.len() > 1 {
        let mut vec = Vector::<64>::new();

        for (i, img) in indexed.iter().enumerate() {
            if img.width() < MIN_MIPMAP_PALVQ || img.height() < MIN_MIPMAP_PALVQ {
                continue;
            }

            let blocks_w = img.width() / 4;
            let blocks = blocks_w * (img.height() / 4);
            let twiddler = Twiddler::new(blocks_w, img.height() / 4);

            for j in 0..blocks {
                let twidx = twiddler.index(j);
                let x = (twidx % blocks_w) * 4;
                let y = (twidx / blocks_w) * 4;

                // The very first vector has no preceding half. Copy this
                // block's own left slab into it rather than leave colors
                // in it that the image doesn't contain.
                if vectors.is_empty() {
                    grab_2x4_block(img, palette, x, y, &mut vec, Store::Left);
                }

                // First half of this block completes the current vector
                grab_2x4_block(img, palette, x, y, &mut vec, Store::Right);
                vectors.push(vec);
                vec.set_hash(0);

                // Second half of this block opens the next vector
                grab_2x4_block(img, palette, x + 2, y, &mut vec, Store::Left);

                // The last block of the last image has nothing following
                // it, so pad the trailing vector with its own right slab
                // and flush it.
                if i == indexed.len() - 1 && j == blocks - 1 {
                    grab_2x4_block(img, palette, x + 2, y, &mut vec, Store::Right);
                    vectors.push(vec);
                }
            }
        }
    } else {
        // Grab the blocks in twiddled order here; the mipmapped vectors
        // have to be twiddled anyway, so the index writer below can treat
        // both layouts the same.
        let img = &indexed[0];
        let blocks_w = img.width() / 4;
        let blocks = blocks_w * (img.height() / 4);
        let twiddler = Twiddler::new(blocks_w, img.height() / 4);

        for j in 0..blocks {
            let twidx = twiddler.index(j);
            let x = (twidx % blocks_w) * 4;
            let y = (twidx / blocks_w) * 4;

            let mut vec = Vector::<64>::new();
            grab_2x4_block(img, palette, x, y, &mut vec, Store::Left);
            grab_2x4_block(img, palette, x + 2, y, &mut vec, Store::Right);
            vectors.push(vec);
        }
    }

    vq.compress(&vectors, 256);

    // The palette needs to be searchable by distance for the next part
    let vectorized_palette = vectorize_palette(palette);

    // Build the codebook: 16 nibbles per code, in 4x4 twiddled order
    let mut codebook = [0u8; 2048];
    let nibble_lut = Twiddler::new(4, 4);
    for i in 0..vq.code_count() {
        let vec = vq.code_vector(i);

        for j in 0..16 {
            let mut color = Vector::<4>::new();
            for c in 0..4 {
                color.set(c, vec[nibble_lut.index(j) * 4 + c]);
            }

            let closest = closest_palette_index(&vectorized_palette, &color);

            let byte = j / 2;
            if j % 2 == 1 {
                codebook[i * 8 + byte] |= (closest & 0xF) << 4;
            } else {
                codebook[i * 8 + byte] |= closest & 0xF;
            }
        }
    }

    stream.write_all(&codebook)?;

    // No zero byte for the 1x1 mipmap here, unlike the other vq modes:
    // that level is a single nibble, and it lives inside the first index
    // byte written below.

    for vec in &vectors {
        stream.write_u8(vq.find_closest(vec) as u8)?;
    }
    Ok(())
}

fn write_compressed_8bpp<W: Write>(
    stream: &mut W,
    indexed: &[IndexedImage],
    palette: &Palette,
) -> Result<()> {
    let mut vq = VectorQuantizer::<32>::new();
    let mut vectors: Vec<Vector<32>> = Vec::new();

    // Each vector is one 2x4 pixel block; every 4x4 block contributes its
    // left and right halves in twiddled block order.
    for img in indexed {
        if img.width() < MIN_MIPMAP_PALVQ || img.height() < MIN_MIPMAP_PALVQ {
            continue;
        }

        let blocks_w = img.width() / 4;
        let blocks = blocks_w * (img.height() / 4);
        let twiddler = Twiddler::new(blocks_w, img.height() / 4);

        for j in 0..blocks {
            let twidx = twiddler.index(j);
            let x = (twidx % blocks_w) * 4;
            let y = (twidx / blocks_w) * 4;

            let mut vec = Vector::<32>::new();
            grab_2x4_block(img, palette, x, y, &mut vec, Store::Full);
            vectors.push(vec);

            let mut vec = Vector::<32>::new();
            grab_2x4_block(img, palette, x + 2, y, &mut vec, Store::Full);
            vectors.push(vec);
        }
    }

    vq.compress(&vectors, 256);

    let vectorized_palette = vectorize_palette(palette);

    // Build the codebook: 8 index bytes per code, in 2x4 twiddled order
    let mut codebook = [0u8; 2048];
    let byte_lut = Twiddler::new(2, 4);
    for i in 0..vq.code_count() {
        let vec = vq.code_vector(i);

        for j in 0..8 {
            let mut color = Vector::<4>::new();
            for c in 0..4 {
                color.set(c, vec[byte_lut.index(j) * 4 + c]);
            }
            codebook[i * 8 + j] = closest_palette_index(&vectorized_palette, &color);
        }
    }

    stream.write_all(&codebook)?;

    // The 1x1 mipmap level
    if indexed.len() > 1 {
        stream.write_u8(0)?;
    }

    for vec in &vectors {
        stream.write_u8(vq.find_closest(vec) as u8)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, MipFilter};
    use crate::texel::rgb;

    fn two_color_image(size: usize) -> Image {
        let mut img = Image::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let p = if x < size / 2 { rgb(10, 20, 30) } else { rgb(200, 210, 220) };
                img.set_pixel(x, y, p);
            }
        }
        img
    }

    #[test]
    fn test_small_palette_is_not_reduced() {
        let ttype = TextureType::new(PixelFormat::Pal8bpp).with_mipmaps();
        let images =
            ImageSet::build(vec![two_color_image(8)], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        let palette = convert_paletted(&mut body, &images, ttype).unwrap();

        assert_eq!(palette.len(), 2);
        assert_eq!(palette.color_at(0), rgb(10, 20, 30));
        assert_eq!(palette.color_at(1), rgb(200, 210, 220));
    }

    #[test]
    fn test_mipmapped_8bpp_layout() {
        let ttype = TextureType::new(PixelFormat::Pal8bpp).with_mipmaps();
        let images =
            ImageSet::build(vec![two_color_image(8)], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        convert_paletted(&mut body, &images, ttype).unwrap();

        // 3 offset bytes + 1 + 4 + 16 + 64 index bytes
        assert_eq!(body.len(), 3 + 85);
        assert_eq!(&body[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_mipmapped_4bpp_layout() {
        let ttype = TextureType::new(PixelFormat::Pal4bpp).with_mipmaps();
        let images =
            ImageSet::build(vec![two_color_image(8)], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        convert_paletted(&mut body, &images, ttype).unwrap();

        // 1 offset byte + 1 whole byte for 1x1 + (84 / 2) packed bytes
        assert_eq!(body.len(), 1 + 1 + 42);
    }

    #[test]
    fn test_4bpp_packs_low_nibble_first() {
        let ttype = TextureType::new(PixelFormat::Pal4bpp);
        let mut img = Image::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                // Twiddled neighbors (0,0) and (0,1) get indices 0 and 1
                let p = if x == 0 && y == 1 { rgb(255, 0, 0) } else { rgb(0, 0, 0) };
                img.set_pixel(x, y, p);
            }
        }
        let images = ImageSet::build(vec![img], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        convert_paletted(&mut body, &images, ttype).unwrap();

        assert_eq!(body.len(), 32);
        // First byte: pixel (0,0) = index 0 low, pixel (0,1) = index 1 high
        assert_eq!(body[0], 0x10);
    }

    #[test]
    fn test_palette_reduction_kicks_in() {
        let ttype = TextureType::new(PixelFormat::Pal4bpp);
        let mut img = Image::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                img.set_pixel(x, y, rgb((x * 32) as u8, (y * 32) as u8, 0));
            }
        }
        let images = ImageSet::build(vec![img], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        let palette = convert_paletted(&mut body, &images, ttype).unwrap();

        // 64 source colors must have been reduced to at most 16
        assert!(palette.len() <= 16);
        assert_eq!(body.len(), 32);
    }

    #[test]
    fn test_compressed_8bpp_body_size() {
        let ttype = TextureType::new(PixelFormat::Pal8bpp)
            .with_mipmaps()
            .with_compression();
        let images =
            ImageSet::build(vec![two_color_image(16)], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        convert_paletted(&mut body, &images, ttype).unwrap();

        // Codebook + zero byte + two index bytes per 4x4 block of the
        // 4x4, 8x8 and 16x16 levels
        assert_eq!(body.len(), 2048 + 1 + 2 * (1 + 4 + 16));
    }

    #[test]
    fn test_compressed_4bpp_straddled_vector_count() {
        let ttype = TextureType::new(PixelFormat::Pal4bpp)
            .with_mipmaps()
            .with_compression();
        let images =
            ImageSet::build(vec![two_color_image(16)], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        convert_paletted(&mut body, &images, ttype).unwrap();

        // Codebook + one index byte per 4x4 block plus the trailing
        // straddle flush; no mipmap pad byte in this mode
        assert_eq!(body.len(), 2048 + (1 + 4 + 16) + 1);
    }

    #[test]
    fn test_compressed_4bpp_single_image() {
        let ttype = TextureType::new(PixelFormat::Pal4bpp).with_compression();
        let images =
            ImageSet::build(vec![two_color_image(16)], ttype, MipFilter::Nearest).unwrap();

        let mut body = Vec::new();
        convert_paletted(&mut body, &images, ttype).unwrap();

        // Codebook + one byte per 4x4 block, no straddle on a single image
        assert_eq!(body.len(), 2048 + 16);
    }
}
