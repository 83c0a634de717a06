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

//! Source rasters and the mipmap level container.

use std::collections::BTreeMap;

use log::debug;

use crate::texel::{alpha, argb, blue, green, red};
use crate::{Result, TextureError, TextureType, TEXTURE_SIZE_MAX, TEXTURE_SIZE_MIN};

/// A 32-bit ARGB raster.
#[derive(Clone, Debug)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Image {
    /// Creates a transparent black raster.
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn filled(width: usize, height: usize, pixel: u32) -> Self {
        Image {
            width,
            height,
            pixels: vec![pixel; width * height],
        }
    }

    /// Wraps an existing pixel buffer. `pixels` must hold `width * height`
    /// entries.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        assert_eq!(pixels.len(), width * height);
        Image {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: u32) {
        self.pixels[y * self.width + x] = pixel;
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Produces the next mipmap level down (half size in both directions).
    fn halved(&self, filter: MipFilter) -> Image {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = Image::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let pixel = match filter {
                    MipFilter::Nearest => self.pixel(x * 2, y * 2),
                    MipFilter::Bilinear => {
                        let quad = [
                            self.pixel(x * 2, y * 2),
                            self.pixel(x * 2 + 1, y * 2),
                            self.pixel(x * 2, y * 2 + 1),
                            self.pixel(x * 2 + 1, y * 2 + 1),
                        ];
                        let avg = |f: fn(u32) -> u8| {
                            let sum: u32 = quad.iter().map(|&p| f(p) as u32).sum();
                            ((sum + 2) / 4) as u8
                        };
                        argb(avg(alpha), avg(red), avg(green), avg(blue))
                    }
                };
                out.set_pixel(x, y, pixel);
            }
        }

        out
    }
}

/// A raster of palette indices.
#[derive(Clone)]
pub struct IndexedImage {
    width: usize,
    height: usize,
    indices: Vec<u8>,
}

impl IndexedImage {
    pub fn new(width: usize, height: usize) -> Self {
        IndexedImage {
            width,
            height,
            indices: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, x: usize, y: usize) -> u8 {
        self.indices[y * self.width + x]
    }

    pub fn set_index(&mut self, x: usize, y: usize, index: u8) {
        self.indices[y * self.width + x] = index;
    }
}

/// Filter used when synthesizing missing mipmap levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MipFilter {
    /// Picks one source pixel per output pixel. Never introduces colors
    /// that weren't in the source, which paletted targets depend on.
    Nearest,
    /// Averages the 2x2 source box.
    Bilinear,
}

/// An ordered collection of mipmap levels, keyed by side length.
///
/// Without mipmaps the set holds exactly one raster which may be
/// rectangular. With mipmaps it holds a chain of square rasters from the
/// largest supplied level down to 1x1, synthesizing any level that wasn't
/// supplied by scaling down the level above it.
#[derive(Debug)]
pub struct ImageSet {
    images: BTreeMap<usize, Image>,
    width: usize,
    height: usize,
}

impl ImageSet {
    /// Validates and assembles the mipmap chain from the supplied rasters.
    ///
    /// Only one raster may be given unless the texture is mipmapped. A
    /// raster with the same side length as an earlier one replaces it.
    pub fn build(
        rasters: Vec<Image>,
        texture_type: TextureType,
        filter: MipFilter,
    ) -> Result<ImageSet> {
        let compressed = texture_type.compressed();
        let mipmapped = texture_type.mipmapped();

        if rasters.len() > 1 && !mipmapped {
            return Err(TextureError::TooManyImages);
        }

        let mut images = BTreeMap::new();
        let mut width = 0;
        let mut height = 0;

        for raster in rasters {
            if !texture_type.is_valid_size(raster.width(), raster.height()) {
                return Err(TextureError::InvalidSize {
                    width: raster.width(),
                    height: raster.height(),
                });
            }

            if (compressed || mipmapped) && raster.width() != raster.height() {
                return Err(TextureError::NotSquare);
            }

            width = width.max(raster.width());
            height = height.max(raster.height());
            images.insert(raster.width(), raster);
        }

        if mipmapped {
            match filter {
                MipFilter::Nearest => debug!("using nearest-neighbor filtering for mipmaps"),
                MipFilter::Bilinear => debug!("using bilinear filtering for mipmaps"),
            }

            // Generate any missing levels by scaling down the level above
            let mut size = TEXTURE_SIZE_MAX / 2;
            while size >= 1 {
                if !images.contains_key(&size) {
                    let mipmap = images.get(&(size * 2)).map(|above| above.halved(filter));
                    if let Some(mipmap) = mipmap {
                        images.insert(size, mipmap);
                        debug!("generated {}x{} mipmap", size, size);
                    }
                }
                size /= 2;
            }
        }

        if width < TEXTURE_SIZE_MIN || height < TEXTURE_SIZE_MIN {
            return Err(TextureError::NoBaseLevel);
        }

        Ok(ImageSet {
            images,
            width,
            height,
        })
    }

    pub fn has_mipmaps(&self) -> bool {
        self.images.len() > 1
    }

    pub fn count(&self) -> usize {
        self.images.len()
    }

    /// Levels in ascending side-length order (smallest first), as every
    /// encoder writes them.
    pub fn levels(&self) -> impl Iterator<Item = &Image> {
        self.images.values()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texel::rgb;
    use crate::PixelFormat;

    fn gradient(size: usize) -> Image {
        let mut img = Image::new(size, size);
        for y in 0..size {
            for x in 0..size {
                img.set_pixel(x, y, rgb((x * 16) as u8, (y * 16) as u8, 0));
            }
        }
        img
    }

    #[test]
    fn test_single_image() {
        let ttype = TextureType::new(PixelFormat::Rgb565);
        let set = ImageSet::build(vec![gradient(8)], ttype, MipFilter::Bilinear).unwrap();
        assert!(!set.has_mipmaps());
        assert_eq!(set.count(), 1);
        assert_eq!((set.width(), set.height()), (8, 8));
    }

    #[test]
    fn test_rejects_multiple_without_mipmaps() {
        let ttype = TextureType::new(PixelFormat::Rgb565);
        let err = ImageSet::build(
            vec![gradient(8), gradient(16)],
            ttype,
            MipFilter::Bilinear,
        )
        .unwrap_err();
        assert!(matches!(err, TextureError::TooManyImages));
    }

    #[test]
    fn test_rejects_invalid_size() {
        let ttype = TextureType::new(PixelFormat::Rgb565);
        let err =
            ImageSet::build(vec![Image::new(12, 12)], ttype, MipFilter::Bilinear).unwrap_err();
        assert!(matches!(err, TextureError::InvalidSize { .. }));
    }

    #[test]
    fn test_rejects_too_small() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_mipmaps();
        let err =
            ImageSet::build(vec![Image::new(4, 4)], ttype, MipFilter::Nearest).unwrap_err();
        assert!(matches!(err, TextureError::NoBaseLevel));
    }

    #[test]
    fn test_mipmap_chain_synthesis() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_mipmaps();
        let set = ImageSet::build(vec![gradient(16)], ttype, MipFilter::Bilinear).unwrap();

        // 16, 8, 4, 2, 1
        assert_eq!(set.count(), 5);
        let sizes: Vec<usize> = set.levels().map(|img| img.width()).collect();
        assert_eq!(sizes, [1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_supplied_level_is_kept() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_mipmaps();
        let marker = Image::filled(8, 8, rgb(1, 2, 3));
        let set =
            ImageSet::build(vec![gradient(16), marker], ttype, MipFilter::Bilinear).unwrap();

        let eight = set.levels().find(|img| img.width() == 8).unwrap();
        assert_eq!(eight.pixel(0, 0), rgb(1, 2, 3));
    }

    #[test]
    fn test_nearest_keeps_source_colors() {
        let mut img = Image::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                img.set_pixel(x, y, if (x + y) % 2 == 0 { rgb(0, 0, 0) } else { rgb(255, 255, 255) });
            }
        }
        let ttype = TextureType::new(PixelFormat::Pal8bpp).with_mipmaps();
        let set = ImageSet::build(vec![img], ttype, MipFilter::Nearest).unwrap();
        for level in set.levels() {
            for &p in level.pixels() {
                assert!(p == rgb(0, 0, 0) || p == rgb(255, 255, 255));
            }
        }
    }

    #[test]
    fn test_bilinear_averages_box() {
        let mut img = Image::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                img.set_pixel(x, y, if x % 2 == 0 { rgb(0, 0, 0) } else { rgb(255, 255, 255) });
            }
        }
        let half = img.halved(MipFilter::Bilinear);
        assert_eq!(half.pixel(0, 0), rgb(128, 128, 128));
    }
}
