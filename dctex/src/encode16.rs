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

//! The 16-bpp pipeline: strided, uncompressed twiddled, and VQ-compressed
//! output for the direct-color formats.

use std::collections::HashMap;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

use crate::image::{Image, ImageSet, IndexedImage};
use crate::quad::{codebook_texels, pack_quad};
use crate::texel::{rgb_to_yuv422, to_16bpp};
use crate::twiddle::Twiddler;
use crate::vq::{argb_to_vec, combine_hash, rgb_to_vec, vec_to_argb, vec_to_rgb, Vector, VectorQuantizer};
use crate::{PixelFormat, Result, TextureType, MIN_MIPMAP_VQ, MIPMAP_OFFSET_16BPP};

pub fn convert_16bpp<W: Write>(
    stream: &mut W,
    images: &ImageSet,
    texture_type: TextureType,
) -> Result<()> {
    let format = texture_type.format();

    if texture_type.strided() {
        write_strided(stream, images.levels().next().expect("empty image set"), format)
    } else if texture_type.compressed() {
        write_compressed(stream, images, format)
    } else {
        write_uncompressed(stream, images, format)
    }
}

fn write_strided<W: Write>(stream: &mut W, img: &Image, format: PixelFormat) -> Result<()> {
    if format == PixelFormat::Yuv422 {
        for y in 0..img.height() {
            for x in (0..img.width()).step_by(2) {
                let (a, b) = rgb_to_yuv422(img.pixel(x, y), img.pixel(x + 1, y));
                stream.write_u16::<LittleEndian>(a)?;
                stream.write_u16::<LittleEndian>(b)?;
            }
        }
    } else {
        for y in 0..img.height() {
            for x in 0..img.width() {
                stream.write_u16::<LittleEndian>(to_16bpp(img.pixel(x, y), format))?;
            }
        }
    }
    Ok(())
}

fn write_uncompressed<W: Write>(
    stream: &mut W,
    images: &ImageSet,
    format: PixelFormat,
) -> Result<()> {
    // Mipmap offset
    if images.has_mipmaps() {
        stream.write_all(&[0u8; MIPMAP_OFFSET_16BPP])?;
    }

    // Texture data, from smallest to largest mipmap
    for img in images.levels() {
        // There's only one pixel in the 1x1 mipmap level of a YUV texture,
        // which can't hold a chroma pair, so it's stored as RGB565.
        if img.width() == 1 && img.height() == 1 && format == PixelFormat::Yuv422 {
            stream.write_u16::<LittleEndian>(to_16bpp(img.pixel(0, 0), PixelFormat::Rgb565))?;
            continue;
        }

        let twiddler = Twiddler::new(img.width(), img.height());
        let pixels = img.width() * img.height();

        if format == PixelFormat::Yuv422 {
            // Four consecutive twiddled texels form a 2x2 block: TL, BL,
            // TR, BR. The top and bottom pairs each share their chroma.
            for i in (0..pixels).step_by(4) {
                let at = |j: usize| {
                    let (x, y) = twiddler.position(i + j);
                    img.pixel(x, y)
                };
                let (tl, bl, tr, br) = (at(0), at(1), at(2), at(3));
                let (yuv0, yuv2) = rgb_to_yuv422(tl, tr);
                let (yuv1, yuv3) = rgb_to_yuv422(bl, br);
                for yuv in [yuv0, yuv1, yuv2, yuv3] {
                    stream.write_u16::<LittleEndian>(yuv)?;
                }
            }
        } else {
            for i in 0..pixels {
                let (x, y) = twiddler.position(i);
                stream.write_u16::<LittleEndian>(to_16bpp(img.pixel(x, y), format))?;
            }
        }
    }
    Ok(())
}

/// Counts the unique 2x2 texel blocks across all levels. If they fit in
/// `max_codes`, fills `indexed`/`codebook` with a ready lossless encoding.
/// Counting continues past the limit purely so the caller can report how
/// far over the input was.
fn encode_lossless(
    images: &ImageSet,
    format: PixelFormat,
    max_codes: usize,
) -> (usize, Vec<IndexedImage>, Vec<u64>) {
    let mut unique_quads: HashMap<u64, usize> = HashMap::new();
    let mut indexed = Vec::new();

    for img in images.levels() {
        if img.width() < MIN_MIPMAP_VQ || img.height() < MIN_MIPMAP_VQ {
            continue;
        }

        let mut indexed_image = IndexedImage::new(img.width() / 2, img.height() / 2);

        for y in (0..img.height()).step_by(2) {
            for x in (0..img.width()).step_by(2) {
                let quad = pack_quad(
                    img.pixel(x, y),
                    img.pixel(x + 1, y),
                    img.pixel(x, y + 1),
                    img.pixel(x + 1, y + 1),
                    format,
                );

                let next = unique_quads.len();
                let index = *unique_quads.entry(quad).or_insert(next);

                if unique_quads.len() <= max_codes {
                    indexed_image.set_index(x / 2, y / 2, index as u8);
                }
            }
        }

        // Only keep the level if we haven't blown the code limit
        if unique_quads.len() <= max_codes {
            indexed.push(indexed_image);
        }
    }

    let count = unique_quads.len();
    let mut codebook = Vec::new();
    if count <= max_codes {
        codebook = vec![0u64; count];
        for (&quad, &index) in unique_quads.iter() {
            codebook[index] = quad;
        }
    } else {
        indexed.clear();
    }

    (count, indexed, codebook)
}

/// Divides every level into 2x2 blocks stored as 12-dimensional vectors,
/// (R, G, B) per corner.
fn vectorize_rgb(images: &ImageSet) -> Vec<Vector<12>> {
    let mut vectors = Vec::new();
    for img in images.levels() {
        if img.width() < MIN_MIPMAP_VQ || img.height() < MIN_MIPMAP_VQ {
            continue;
        }
        for y in (0..img.height()).step_by(2) {
            for x in (0..img.width()).step_by(2) {
                let mut vec = Vector::new();
                let mut hash = 0;
                let mut offset = 0;
                for yy in y..y + 2 {
                    for xx in x..x + 2 {
                        let pixel = img.pixel(xx, yy);
                        rgb_to_vec(pixel, &mut vec, offset);
                        hash = combine_hash(pixel, hash);
                        offset += 3;
                    }
                }
                vec.set_hash(hash);
                vectors.push(vec);
            }
        }
    }
    vectors
}

/// As [`vectorize_rgb`] but with 16-dimensional (A, R, G, B) vectors.
fn vectorize_argb(images: &ImageSet) -> Vec<Vector<16>> {
    let mut vectors = Vec::new();
    for img in images.levels() {
        if img.width() < MIN_MIPMAP_VQ || img.height() < MIN_MIPMAP_VQ {
            continue;
        }
        for y in (0..img.height()).step_by(2) {
            for x in (0..img.width()).step_by(2) {
                let mut vec = Vector::new();
                let mut hash = 0;
                let mut offset = 0;
                for yy in y..y + 2 {
                    for xx in x..x + 2 {
                        let pixel = img.pixel(xx, yy);
                        argb_to_vec(pixel, &mut vec, offset);
                        hash = combine_hash(pixel, hash);
                        offset += 4;
                    }
                }
                vec.set_hash(hash);
                vectors.push(vec);
            }
        }
    }
    vectors
}

fn devectorize_rgb(
    images: &ImageSet,
    vectors: &[Vector<12>],
    vq: &VectorQuantizer<12>,
    format: PixelFormat,
) -> (Vec<IndexedImage>, Vec<u64>) {
    let mut indexed = Vec::new();
    let mut vindex = 0;

    for img in images.levels() {
        let size = img.width();
        if size == 1 {
            continue;
        }
        let mut out = IndexedImage::new(size / 2, size / 2);
        for y in 0..out.height() {
            for x in 0..out.width() {
                out.set_index(x, y, vq.find_closest(&vectors[vindex]) as u8);
                vindex += 1;
            }
        }
        indexed.push(out);
    }

    let mut codebook = Vec::with_capacity(vq.code_count());
    for i in 0..vq.code_count() {
        let vec = vq.code_vector(i);
        let tl = vec_to_rgb(vec, 0);
        let tr = vec_to_rgb(vec, 3);
        let bl = vec_to_rgb(vec, 6);
        let br = vec_to_rgb(vec, 9);
        codebook.push(pack_quad(tl, tr, bl, br, format));
    }

    (indexed, codebook)
}

fn devectorize_argb(
    images: &ImageSet,
    vectors: &[Vector<16>],
    vq: &VectorQuantizer<16>,
    format: PixelFormat,
) -> (Vec<IndexedImage>, Vec<u64>) {
    let mut indexed = Vec::new();
    let mut vindex = 0;

    for img in images.levels() {
        let size = img.width();
        if size == 1 {
            continue;
        }
        let mut out = IndexedImage::new(size / 2, size / 2);
        for y in 0..out.height() {
            for x in 0..out.width() {
                out.set_index(x, y, vq.find_closest(&vectors[vindex]) as u8);
                vindex += 1;
            }
        }
        indexed.push(out);
    }

    let mut codebook = Vec::with_capacity(vq.code_count());
    for i in 0..vq.code_count() {
        let vec = vq.code_vector(i);
        let tl = vec_to_argb(vec, 0);
        let tr = vec_to_argb(vec, 4);
        let bl = vec_to_argb(vec, 8);
        let br = vec_to_argb(vec, 12);
        codebook.push(pack_quad(tl, tr, bl, br, format));
    }

    (indexed, codebook)
}

fn write_compressed<W: Write>(
    stream: &mut W,
    images: &ImageSet,
    format: PixelFormat,
) -> Result<()> {
    let (num_quads, mut indexed, mut codebook) = encode_lossless(images, format, 256);

    debug!("source images contain {} unique quads", num_quads);

    if num_quads > 256 {
        // ARGB4444 and YUV422 quantize with full per-corner ARGB channels.
        // YUV422 takes the ARGB path even though it carries no alpha:
        // quantizing the full corners keeps the chroma detail that the
        // final pair encoding will average away.
        if format == PixelFormat::Argb4444 || format == PixelFormat::Yuv422 {
            let mut vq = VectorQuantizer::<16>::new();
            let vectors = vectorize_argb(images);
            vq.compress(&vectors, 256);
            (indexed, codebook) = devectorize_argb(images, &vectors, &vq, format);
        } else {
            let mut vq = VectorQuantizer::<12>::new();
            let vectors = vectorize_rgb(images);
            vq.compress(&vectors, 256);
            (indexed, codebook) = devectorize_rgb(images, &vectors, &vq, format);
        }
    }

    // Build the codebook: four texels per code, columns first
    let mut codes = [0u16; 1024];
    for (i, &quad) in codebook.iter().enumerate() {
        codes[i * 4..i * 4 + 4].copy_from_slice(&codebook_texels(quad));
    }

    // Write the codebook
    for code in codes {
        stream.write_u16::<LittleEndian>(code)?;
    }

    // The 1x1 mipmap level is never used in vq textures
    if images.count() > 1 {
        stream.write_u8(0)?;
    }

    // Write all mipmap levels
    for img in &indexed {
        let twiddler = Twiddler::new(img.width(), img.height());
        for i in 0..img.width() * img.height() {
            let (x, y) = twiddler.position(i);
            stream.write_u8(img.index(x, y))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MipFilter;
    use crate::texel::rgb;

    fn solid_set(size: usize, pixel: u32, texture_type: TextureType) -> ImageSet {
        ImageSet::build(
            vec![Image::filled(size, size, pixel)],
            texture_type,
            MipFilter::Bilinear,
        )
        .unwrap()
    }

    #[test]
    fn test_solid_argb1555_8x8_body() {
        let ttype = TextureType::new(PixelFormat::Argb1555);
        let images = solid_set(8, 0xFF80_8080, ttype);

        let mut body = Vec::new();
        convert_16bpp(&mut body, &images, ttype).unwrap();

        assert_eq!(body.len(), 128);
        for pair in body.chunks(2) {
            assert_eq!(pair, [0x10, 0xC2]); // 0xC210 little-endian
        }
    }

    #[test]
    fn test_strided_black_body() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_stride();
        let images = ImageSet::build(
            vec![Image::filled(64, 8, rgb(0, 0, 0))],
            ttype,
            MipFilter::Bilinear,
        )
        .unwrap();

        let mut body = Vec::new();
        convert_16bpp(&mut body, &images, ttype).unwrap();

        assert_eq!(body.len(), 1024);
        assert!(body.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mipmapped_has_offset_and_all_levels() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_mipmaps();
        let images = solid_set(8, rgb(255, 0, 0), ttype);

        let mut body = Vec::new();
        convert_16bpp(&mut body, &images, ttype).unwrap();

        // 6 zero bytes, then (1 + 4 + 16 + 64) texels
        assert_eq!(body.len(), 6 + 85 * 2);
        assert_eq!(&body[..6], &[0; 6]);
        // First real texel is the 1x1 level: pure red in RGB565
        assert_eq!(&body[6..8], &[0x00, 0xF8]);
    }

    #[test]
    fn test_lossless_quad_count() {
        // A checkerboard with 1px cells has exactly one unique quad
        let mut img = Image::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let p = if (x + y) % 2 == 0 { rgb(0, 0, 0) } else { rgb(255, 255, 255) };
                img.set_pixel(x, y, p);
            }
        }
        let ttype = TextureType::new(PixelFormat::Rgb565).with_compression();
        let images = ImageSet::build(vec![img], ttype, MipFilter::Bilinear).unwrap();

        let (count, indexed, codebook) = encode_lossless(&images, PixelFormat::Rgb565, 256);
        assert_eq!(count, 1);
        assert_eq!(codebook.len(), 1);
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[0].width(), 4);
    }

    #[test]
    fn test_lossless_gives_up_past_code_limit() {
        // 64 distinct quads with limit 16 must report and abandon.
        // One flat color per 2x2 block, spaced so RGB565 keeps them apart.
        let mut img = Image::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                let block = (y / 2) * 8 + x / 2;
                img.set_pixel(x, y, rgb(0, (block * 4) as u8, 0));
            }
        }
        let ttype = TextureType::new(PixelFormat::Rgb565).with_compression();
        let images = ImageSet::build(vec![img], ttype, MipFilter::Bilinear).unwrap();

        let (count, indexed, codebook) = encode_lossless(&images, PixelFormat::Rgb565, 16);
        assert_eq!(count, 64);
        assert!(indexed.is_empty());
        assert!(codebook.is_empty());
    }

    #[test]
    fn test_compressed_body_size() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_compression();
        let images = solid_set(32, rgb(10, 20, 30), ttype);

        let mut body = Vec::new();
        convert_16bpp(&mut body, &images, ttype).unwrap();

        // 2048-byte codebook + 16x16 index bytes
        assert_eq!(body.len(), 2048 + 256);
    }

    #[test]
    fn test_vectorize_counts() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_mipmaps();
        let images = solid_set(8, rgb(1, 2, 3), ttype);

        // Levels 2, 4, 8 contribute; the 1x1 level doesn't
        let vectors = vectorize_rgb(&images);
        assert_eq!(vectors.len(), 1 + 4 + 16);
    }
}
