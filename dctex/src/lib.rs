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

//! Encoder and decoder for the texture format of the PowerVR2 graphics
//! unit found in the Dreamcast.
//!
//! The encoder takes one or more ARGB rasters and produces a `DTEX`
//! texture file (plus a `DPAL` sidecar palette for the paletted modes)
//! whose byte layout is exactly what the hardware expects: twiddled pixel
//! order, packed texel formats, vector-quantized codebooks. The decoder
//! reads such a file back into rasters for previewing, along with a
//! visualization of codebook usage for compressed textures.

mod decode;
mod encode16;
mod encodepal;
mod image;
mod palette;
mod quad;
mod texel;
mod twiddle;
mod vq;

pub use decode::{DecodedTexture, Texture, CODE_USAGE_COLORS};
pub use image::{Image, ImageSet, IndexedImage, MipFilter};
pub use palette::Palette;
pub use texel::{alpha, argb, blue, green, red, rgb, rgb_to_yuv422, to_16bpp, to_32bpp, yuv422_to_rgb};
pub use twiddle::Twiddler;
pub use vq::{Vector, VectorQuantizer};

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, warn};
use thiserror::Error;

pub const TEXTURE_MAGIC: &[u8; 4] = b"DTEX";
pub const PALETTE_MAGIC: &[u8; 4] = b"DPAL";

// Min/max size supported by the PVR2
pub const TEXTURE_SIZE_MIN: usize = 8;
pub const TEXTURE_SIZE_MAX: usize = 1024;
pub const TEXTURE_STRIDE_MIN: usize = 32;
pub const TEXTURE_STRIDE_MAX: usize = 992;

// Minimum mipmap sizes of the compressed modes
pub(crate) const MIN_MIPMAP_VQ: usize = 2;
pub(crate) const MIN_MIPMAP_PALVQ: usize = 4;

// Mipmapped uncompressed textures all have a small offset before the
// actual texture data starts.
pub(crate) const MIPMAP_OFFSET_4BPP: usize = 1;
pub(crate) const MIPMAP_OFFSET_8BPP: usize = 3;
pub(crate) const MIPMAP_OFFSET_16BPP: usize = 6;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("invalid texture size {width}x{height}")]
    InvalidSize { width: usize, height: usize },
    #[error("input images for compressed and mipmapped textures must be square")]
    NotSquare,
    #[error("only one input image may be given without the mipmap flag")]
    TooManyImages,
    #[error("at least one input image must be 8x8 or larger")]
    NoBaseLevel,
    #[error("unsupported pixel format tag {0}")]
    UnknownFormat(u32),
    #[error("not a valid texture file")]
    BadTextureMagic,
    #[error("not a valid palette file")]
    BadPaletteMagic,
    #[error("texture body is truncated")]
    Truncated,
    #[error("paletted textures can't be decoded without their palette")]
    MissingPalette,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextureError>;

/// The pixel encodings the PVR2 understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Argb1555,
    Rgb565,
    Argb4444,
    Yuv422,
    Bumpmap,
    Pal4bpp,
    Pal8bpp,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 7] = [
        PixelFormat::Argb1555,
        PixelFormat::Rgb565,
        PixelFormat::Argb4444,
        PixelFormat::Yuv422,
        PixelFormat::Bumpmap,
        PixelFormat::Pal4bpp,
        PixelFormat::Pal8bpp,
    ];

    /// The format tag as stored in the texture type word.
    pub fn code(self) -> u32 {
        match self {
            PixelFormat::Argb1555 => 0,
            PixelFormat::Rgb565 => 1,
            PixelFormat::Argb4444 => 2,
            PixelFormat::Yuv422 => 3,
            PixelFormat::Bumpmap => 4,
            PixelFormat::Pal4bpp => 5,
            PixelFormat::Pal8bpp => 6,
        }
    }

    pub fn from_code(code: u32) -> Option<PixelFormat> {
        PixelFormat::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Argb1555 => "ARGB1555",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Argb4444 => "ARGB4444",
            PixelFormat::Yuv422 => "YUV422",
            PixelFormat::Bumpmap => "BUMPMAP",
            PixelFormat::Pal4bpp => "PAL4BPP",
            PixelFormat::Pal8bpp => "PAL8BPP",
        }
    }

    pub fn is_paletted(self) -> bool {
        self == PixelFormat::Pal4bpp || self == PixelFormat::Pal8bpp
    }
}

const PIXELFORMAT_MASK: u32 = 7;
const PIXELFORMAT_SHIFT: u32 = 27;

const FLAG_NONTWIDDLED: u32 = 1 << 26;
const FLAG_STRIDED: u32 = 1 << 25;
const FLAG_COMPRESSED: u32 = 1 << 30;
const FLAG_MIPMAPPED: u32 = 1 << 31;

/// The 32-bit texture descriptor stored in the file header.
///
/// Bits 27..29 hold the pixel format tag, bit 25 marks stride textures,
/// bit 26 non-twiddled data, bit 30 compression and bit 31 mipmaps. On
/// stride textures, bits 0..4 are repurposed to hold `width / 32`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextureType(u32);

impl TextureType {
    pub fn new(format: PixelFormat) -> Self {
        TextureType(format.code() << PIXELFORMAT_SHIFT)
    }

    /// Parses a raw descriptor word, rejecting unknown format tags.
    pub fn from_bits(bits: u32) -> Result<Self> {
        let tag = (bits >> PIXELFORMAT_SHIFT) & PIXELFORMAT_MASK;
        if PixelFormat::from_code(tag).is_none() {
            return Err(TextureError::UnknownFormat(tag));
        }
        Ok(TextureType(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn with_mipmaps(self) -> Self {
        TextureType(self.0 | FLAG_MIPMAPPED)
    }

    pub fn with_compression(self) -> Self {
        TextureType(self.0 | FLAG_COMPRESSED)
    }

    /// Stride textures are never twiddled, so this sets both flags.
    pub fn with_stride(self) -> Self {
        TextureType(self.0 | FLAG_STRIDED | FLAG_NONTWIDDLED)
    }

    /// Stores `width / 32` in the low five bits.
    pub fn with_stride_setting(self, width: usize) -> Self {
        TextureType(self.0 | (width as u32 / 32))
    }

    pub fn format(self) -> PixelFormat {
        let tag = (self.0 >> PIXELFORMAT_SHIFT) & PIXELFORMAT_MASK;
        PixelFormat::from_code(tag).expect("validated at construction")
    }

    pub fn mipmapped(self) -> bool {
        self.0 & FLAG_MIPMAPPED != 0
    }

    pub fn compressed(self) -> bool {
        self.0 & FLAG_COMPRESSED != 0
    }

    pub fn strided(self) -> bool {
        self.0 & FLAG_STRIDED != 0
    }

    pub fn is_paletted(self) -> bool {
        self.format().is_paletted()
    }

    /// Actual width of a stride texture, recovered from the low bits.
    pub fn stride_width(self) -> usize {
        (self.0 & 31) as usize * 32
    }

    /// Whether the PVR2 accepts a texture of this size in this mode.
    pub fn is_valid_size(self, width: usize, height: usize) -> bool {
        if self.strided() {
            if width < TEXTURE_STRIDE_MIN || width > TEXTURE_STRIDE_MAX || width % 32 != 0 {
                return false;
            }
            height >= TEXTURE_SIZE_MIN && height <= TEXTURE_SIZE_MAX && height.is_power_of_two()
        } else {
            // Mipmapped textures may be supplied down to 1x1
            let min_size = if self.mipmapped() { 1 } else { TEXTURE_SIZE_MIN };
            width >= min_size
                && width <= TEXTURE_SIZE_MAX
                && width.is_power_of_two()
                && height >= min_size
                && height <= TEXTURE_SIZE_MAX
                && height.is_power_of_two()
        }
    }
}

// How many pixels a w*h texture contains, summed over mipmap levels down
// to minw*minh. For textures without mipmaps, minw = w and minh = h.
fn pixel_count(w: usize, h: usize, minw: usize, minh: usize) -> usize {
    if w < minw || h < minh {
        return 0;
    }
    w * h + pixel_count(w / 2, h / 2, minw, minh)
}

/// Byte length of the texture body, rounded up to a 32-byte multiple.
/// The header writer and the decoder both depend on this matching what
/// the encoders actually emit.
pub fn calculate_size(width: usize, height: usize, texture_type: TextureType) -> usize {
    let format = texture_type.format();
    let mut bytes = 0;

    if texture_type.mipmapped() {
        if texture_type.compressed() {
            bytes += 2048; // Codebook
            bytes += 1; // The 1x1 mipmap is never used in vq textures
            match format {
                PixelFormat::Pal4bpp => {
                    // 32x compression, smallest mipmap is 4x4
                    bytes += pixel_count(width, height, 4, 4) / 16;
                }
                PixelFormat::Pal8bpp => {
                    // 16x compression, smallest mipmap is 4x4
                    bytes += pixel_count(width, height, 4, 4) / 8;
                }
                _ => {
                    // 8x compression, smallest mipmap is 2x2
                    bytes += pixel_count(width, height, 2, 2) / 4;
                }
            }
        } else {
            let pixels = pixel_count(width, height, 1, 1);
            match format {
                PixelFormat::Pal4bpp => {
                    bytes += MIPMAP_OFFSET_4BPP;
                    bytes += 1; // The 1x1 half-pixel
                    bytes += (pixels - 1) / 2;
                }
                PixelFormat::Pal8bpp => {
                    bytes += MIPMAP_OFFSET_8BPP;
                    bytes += pixels;
                }
                _ => {
                    bytes += MIPMAP_OFFSET_16BPP;
                    bytes += pixels * 2;
                }
            }
        }
    } else {
        let pixels = width * height;
        if texture_type.compressed() {
            bytes += 2048;
            match format {
                PixelFormat::Pal4bpp => bytes += pixels / 16,
                PixelFormat::Pal8bpp => bytes += pixels / 8,
                _ => bytes += pixels / 4,
            }
        } else {
            match format {
                PixelFormat::Pal4bpp => bytes += pixels / 2,
                PixelFormat::Pal8bpp => bytes += pixels,
                _ => bytes += pixels * 2,
            }
        }
    }

    // Make it a multiple of 32
    if bytes % 32 == 0 {
        bytes
    } else {
        (bytes / 32 + 1) * 32
    }
}

/// Writes the 16-byte texture header and returns the body size it
/// declared.
pub fn write_texture_header<W: Write>(
    stream: &mut W,
    width: usize,
    height: usize,
    texture_type: TextureType,
) -> Result<usize> {
    let size = calculate_size(width, height, texture_type);

    // Stride textures still store a power-of-two width in the header; the
    // actual width lives in the stride setting. This substitution has to
    // happen after the size calculation.
    let width = if texture_type.strided() {
        width.next_power_of_two()
    } else {
        width
    };

    stream.write_all(TEXTURE_MAGIC)?;
    stream.write_i16::<LittleEndian>(width as i16)?;
    stream.write_i16::<LittleEndian>(height as i16)?;
    stream.write_i32::<LittleEndian>(texture_type.bits() as i32)?;
    stream.write_i32::<LittleEndian>(size as i32)?;

    Ok(size)
}

/// Encodes the image set as a complete texture file: header, body and
/// padding. Paletted formats return the palette for the caller to save
/// as the sidecar file.
pub fn encode<W: Write>(
    stream: &mut W,
    images: &ImageSet,
    texture_type: TextureType,
) -> Result<Option<Palette>> {
    debug!(
        "encoding {}x{} {} texture",
        images.width(),
        images.height(),
        texture_type.format().name()
    );

    let expected_size = write_texture_header(stream, images.width(), images.height(), texture_type)?;

    let mut body = Vec::with_capacity(expected_size);
    let palette = if texture_type.is_paletted() {
        Some(encodepal::convert_paletted(&mut body, images, texture_type)?)
    } else {
        encode16::convert_16bpp(&mut body, images, texture_type)?;
        None
    };

    // Pad the texture data block to the declared size
    if body.len() < expected_size {
        let padding = expected_size - body.len();
        if padding >= 32 {
            warn!("padding is {} but it should be less than 32!", padding);
        }
        body.resize(expected_size, 0);
        debug!("added {} bytes of padding", padding);
    }

    stream.write_all(&body)?;
    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_codes_roundtrip() {
        for format in PixelFormat::ALL {
            assert_eq!(PixelFormat::from_code(format.code()), Some(format));
        }
        assert_eq!(PixelFormat::from_code(7), None);
    }

    #[test]
    fn test_texture_type_bits() {
        let ttype = TextureType::new(PixelFormat::Rgb565)
            .with_stride()
            .with_stride_setting(64);
        assert_eq!(ttype.bits(), (1 << 27) | (1 << 26) | (1 << 25) | 2);
        assert_eq!(ttype.stride_width(), 64);

        let ttype = TextureType::new(PixelFormat::Pal8bpp)
            .with_mipmaps()
            .with_compression();
        assert_eq!(ttype.bits(), (6 << 27) | (1 << 31) | (1 << 30));
        assert!(ttype.mipmapped());
        assert!(ttype.compressed());
        assert!(!ttype.strided());
    }

    #[test]
    fn test_from_bits_rejects_bad_tag() {
        let err = TextureType::from_bits(7 << 27).unwrap_err();
        assert!(matches!(err, TextureError::UnknownFormat(7)));
    }

    #[test]
    fn test_valid_sizes() {
        let plain = TextureType::new(PixelFormat::Rgb565);
        assert!(plain.is_valid_size(8, 8));
        assert!(plain.is_valid_size(1024, 1024));
        assert!(plain.is_valid_size(16, 512));
        assert!(!plain.is_valid_size(4, 4));
        assert!(!plain.is_valid_size(2048, 8));
        assert!(!plain.is_valid_size(12, 8));

        let mipmapped = plain.with_mipmaps();
        assert!(mipmapped.is_valid_size(1, 1));

        let strided = plain.with_stride();
        assert!(strided.is_valid_size(32, 8));
        assert!(strided.is_valid_size(992, 1024));
        assert!(strided.is_valid_size(96, 16));
        assert!(!strided.is_valid_size(1024, 8));
        assert!(!strided.is_valid_size(48, 7));
        assert!(!strided.is_valid_size(16, 8));
    }

    #[test]
    fn test_size_solid_8x8_16bpp() {
        let ttype = TextureType::new(PixelFormat::Argb1555);
        assert_eq!(calculate_size(8, 8, ttype), 128);
    }

    #[test]
    fn test_size_strided() {
        let ttype = TextureType::new(PixelFormat::Rgb565)
            .with_stride()
            .with_stride_setting(64);
        assert_eq!(calculate_size(64, 8, ttype), 1024);
    }

    #[test]
    fn test_size_mipmapped_pal8() {
        // 3 offset bytes + 85 index bytes, padded to 96
        let ttype = TextureType::new(PixelFormat::Pal8bpp).with_mipmaps();
        assert_eq!(calculate_size(8, 8, ttype), 96);
    }

    #[test]
    fn test_size_mipmapped_pal4() {
        // 1 offset byte + 1 whole byte + 42 packed bytes, padded to 64
        let ttype = TextureType::new(PixelFormat::Pal4bpp).with_mipmaps();
        assert_eq!(calculate_size(8, 8, ttype), 64);
    }

    #[test]
    fn test_size_mipmapped_16bpp() {
        // 6 offset bytes + 85 texels, padded from 176 to 192
        let ttype = TextureType::new(PixelFormat::Yuv422).with_mipmaps();
        assert_eq!(calculate_size(8, 8, ttype), 192);
    }

    #[test]
    fn test_size_vq() {
        let ttype = TextureType::new(PixelFormat::Rgb565).with_compression();
        assert_eq!(calculate_size(32, 32, ttype), 2048 + 256);

        let mip = ttype.with_mipmaps();
        // 2048 + 1 + one index byte per 2x2 block of the 2..32 levels
        assert_eq!(calculate_size(32, 32, mip), next_32(2048 + 1 + 341));
    }

    #[test]
    fn test_size_vq_paletted() {
        let ttype = TextureType::new(PixelFormat::Pal8bpp)
            .with_mipmaps()
            .with_compression();
        // 2048 + 1 + 2 bytes per 4x4 block of the 4, 8 and 16 levels
        assert_eq!(calculate_size(16, 16, ttype), next_32(2048 + 1 + 2 * 21));

        let ttype = TextureType::new(PixelFormat::Pal4bpp)
            .with_mipmaps()
            .with_compression();
        assert_eq!(calculate_size(16, 16, ttype), next_32(2048 + 1 + 21));
    }

    fn next_32(x: usize) -> usize {
        if x % 32 == 0 {
            x
        } else {
            (x / 32 + 1) * 32
        }
    }

    #[test]
    fn test_header_bytes() {
        let ttype = TextureType::new(PixelFormat::Argb1555);
        let mut buf = Vec::new();
        let size = write_texture_header(&mut buf, 8, 8, ttype).unwrap();

        assert_eq!(size, 128);
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[0..4], b"DTEX");
        assert_eq!(&buf[4..6], &[8, 0]);
        assert_eq!(&buf[6..8], &[8, 0]);
        assert_eq!(&buf[8..12], &[0, 0, 0, 0]);
        assert_eq!(&buf[12..16], &[128, 0, 0, 0]);
    }

    #[test]
    fn test_header_strided_width_is_power_of_two() {
        let ttype = TextureType::new(PixelFormat::Rgb565)
            .with_stride()
            .with_stride_setting(96);
        let mut buf = Vec::new();
        write_texture_header(&mut buf, 96, 8, ttype).unwrap();

        // 96 rounds up to 128 in the header
        assert_eq!(&buf[4..6], &[128, 0]);
    }
}
