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

//! Decodes every encoded texture form back to ARGB rasters, plus the
//! code-usage diagnostic for compressed textures.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::image::Image;
use crate::palette::Palette;
use crate::texel::{to_32bpp, yuv422_to_rgb};
use crate::twiddle::Twiddler;
use crate::{
    calculate_size, PixelFormat, Result, TextureError, TextureType, TEXTURE_MAGIC,
};

/// A parsed texture file: header fields plus the raw body.
#[derive(Debug)]
pub struct Texture {
    width: usize,
    height: usize,
    texture_type: TextureType,
    data: Vec<u8>,
}

/// The decoded mipmap levels, largest first, plus code-usage rasters for
/// compressed textures (empty otherwise).
#[derive(Debug)]
pub struct DecodedTexture {
    pub levels: Vec<Image>,
    pub code_usage: Vec<Image>,
}

impl Texture {
    /// Reads and validates the 16-byte header, then slurps the body.
    pub fn read<R: Read>(stream: &mut R) -> Result<Texture> {
        let mut magic = [0u8; 4];
        stream.read_exact(&mut magic)?;
        if magic != *TEXTURE_MAGIC {
            return Err(TextureError::BadTextureMagic);
        }

        let width = stream.read_i16::<LittleEndian>()? as usize;
        let height = stream.read_i16::<LittleEndian>()? as usize;
        let texture_type = TextureType::from_bits(stream.read_i32::<LittleEndian>()? as u32)?;
        let size = stream.read_i32::<LittleEndian>()?;
        if size < 0 {
            return Err(TextureError::Truncated);
        }

        let mut data = vec![0u8; size as usize];
        stream
            .read_exact(&mut data)
            .map_err(|_| TextureError::Truncated)?;

        // Stride textures keep their power-of-two width in the header and
        // the real width in the stride setting.
        let width = if texture_type.strided() {
            texture_type.stride_width()
        } else {
            width
        };

        if !texture_type.is_valid_size(width, height) {
            return Err(TextureError::InvalidSize { width, height });
        }

        Ok(Texture {
            width,
            height,
            texture_type,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    /// Decodes the body. Paletted textures need their sidecar palette.
    pub fn decode(&self, palette: Option<&Palette>) -> Result<DecodedTexture> {
        // The size field drove the body allocation, so make sure the body
        // actually covers the layout the header describes before indexing
        // into it.
        let expected = calculate_size(self.width, self.height, self.texture_type);
        if self.data.len() < expected {
            return Err(TextureError::Truncated);
        }

        let ttype = self.texture_type;
        let format = ttype.format();

        let need_palette = || palette.ok_or(TextureError::MissingPalette);

        let (levels, code_usage) = if ttype.strided() {
            (self.decode_strided(format), Vec::new())
        } else if !ttype.compressed() {
            if ttype.is_paletted() {
                (self.decode_paletted(format, need_palette()?), Vec::new())
            } else {
                (self.decode_16bpp(format), Vec::new())
            }
        } else if !ttype.is_paletted() {
            self.decode_16bpp_vq(format)
        } else if format == PixelFormat::Pal8bpp {
            self.decode_pal8_vq(need_palette()?)
        } else {
            self.decode_pal4_vq(need_palette()?)
        };

        Ok(DecodedTexture { levels, code_usage })
    }

    fn texel(&self, offset: usize) -> u16 {
        LittleEndian::read_u16(&self.data[offset..offset + 2])
    }

    fn decode_strided(&self, format: PixelFormat) -> Vec<Image> {
        let mut img = Image::new(self.width, self.height);

        if format == PixelFormat::Yuv422 {
            for y in 0..self.height {
                for x in (0..self.width).step_by(2) {
                    let p0 = self.texel((y * self.width + x) * 2);
                    let p1 = self.texel((y * self.width + x + 1) * 2);
                    let (rgb0, rgb1) = yuv422_to_rgb(p0, p1);
                    img.set_pixel(x, y, rgb0);
                    img.set_pixel(x + 1, y, rgb1);
                }
            }
        } else {
            for y in 0..self.height {
                for x in 0..self.width {
                    let texel = self.texel((y * self.width + x) * 2);
                    img.set_pixel(x, y, to_32bpp(texel, format));
                }
            }
        }

        vec![img]
    }

    fn decode_16bpp(&self, format: PixelFormat) -> Vec<Image> {
        let mut levels = Vec::new();
        let (mut width, mut height, mut offset) = if self.texture_type.mipmapped() {
            (1, 1, crate::MIPMAP_OFFSET_16BPP)
        } else {
            (self.width, self.height, 0)
        };

        while width <= self.width && height <= self.height {
            let mut img = Image::new(width, height);
            let twiddler = Twiddler::new(width, height);
            let pixels = width * height;

            if format == PixelFormat::Yuv422 {
                if pixels == 1 {
                    // The 1x1 mipmap level of a YUV texture is RGB565
                    img.set_pixel(0, 0, to_32bpp(self.texel(offset), PixelFormat::Rgb565));
                } else {
                    for i in (0..pixels).step_by(4) {
                        let texels = [
                            self.texel(offset + i * 2),
                            self.texel(offset + (i + 1) * 2),
                            self.texel(offset + (i + 2) * 2),
                            self.texel(offset + (i + 3) * 2),
                        ];
                        let (p0, p2) = yuv422_to_rgb(texels[0], texels[2]);
                        let (p1, p3) = yuv422_to_rgb(texels[1], texels[3]);

                        for (j, pixel) in [p0, p1, p2, p3].into_iter().enumerate() {
                            let (x, y) = twiddler.position(i + j);
                            img.set_pixel(x, y, pixel);
                        }
                    }
                }
            } else {
                for i in 0..pixels {
                    let (x, y) = twiddler.position(i);
                    img.set_pixel(x, y, to_32bpp(self.texel(offset + i * 2), format));
                }
            }

            levels.insert(0, img);
            offset += width * height * 2;
            width *= 2;
            height *= 2;
        }

        levels
    }

    fn decode_paletted(&self, format: PixelFormat, palette: &Palette) -> Vec<Image> {
        let mut levels = Vec::new();
        let mipmapped = self.texture_type.mipmapped();

        if format == PixelFormat::Pal4bpp {
            let (mut width, mut height, mut offset) = if mipmapped {
                (1, 1, crate::MIPMAP_OFFSET_4BPP)
            } else {
                (self.width, self.height, 0)
            };

            while width <= self.width && height <= self.height {
                let mut img = Image::new(width, height);
                let twiddler = Twiddler::new(width, height);

                if width == 1 && height == 1 {
                    // A whole byte, of which only the low nibble is used
                    img.set_pixel(0, 0, palette.color_at((self.data[offset] & 0xF) as usize));
                    offset += 1;
                } else {
                    let bytes = (width * height) / 2;
                    for i in 0..bytes {
                        let pixel0 = palette.color_at((self.data[offset + i] & 0xF) as usize);
                        let pixel1 = palette.color_at((self.data[offset + i] >> 4) as usize);
                        let (x0, y0) = twiddler.position(i * 2);
                        img.set_pixel(x0, y0, pixel0);
                        let (x1, y1) = twiddler.position(i * 2 + 1);
                        img.set_pixel(x1, y1, pixel1);
                    }
                    offset += bytes;
                }

                levels.insert(0, img);
                width *= 2;
                height *= 2;
            }
        } else {
            let (mut width, mut height, mut offset) = if mipmapped {
                (1, 1, crate::MIPMAP_OFFSET_8BPP)
            } else {
                (self.width, self.height, 0)
            };

            while width <= self.width && height <= self.height {
                let mut img = Image::new(width, height);
                let twiddler = Twiddler::new(width, height);

                for i in 0..width * height {
                    let pixel = palette.color_at(self.data[offset + i] as usize);
                    let (x, y) = twiddler.position(i);
                    img.set_pixel(x, y, pixel);
                }

                levels.insert(0, img);
                offset += width * height;
                width *= 2;
                height *= 2;
            }
        }

        levels
    }

    fn decode_16bpp_vq(&self, format: PixelFormat) -> (Vec<Image>, Vec<Image>) {
        let mut levels = Vec::new();
        let mut usage = Vec::new();

        let (mut width, mut height, mut offset) = if self.texture_type.mipmapped() {
            (2, 2, 2048 + 1)
        } else {
            (self.width, self.height, 2048)
        };

        while width <= self.width && height <= self.height {
            let mut img = Image::new(width, height);
            let mut cui = Image::new(width, height);
            let twiddler = Twiddler::new(width / 2, height / 2);
            let blocks = (width / 2) * (height / 2);

            for i in 0..blocks {
                let cbidx = self.data[offset + i] as usize;
                let texels = [
                    self.texel(cbidx * 8),
                    self.texel(cbidx * 8 + 2),
                    self.texel(cbidx * 8 + 4),
                    self.texel(cbidx * 8 + 6),
                ];
                let (bx, by) = twiddler.position(i);
                let (x, y) = (bx * 2, by * 2);

                // Codebook entries hold TL, BL, TR, BR
                let pixels = if format == PixelFormat::Yuv422 {
                    let (tl, tr) = yuv422_to_rgb(texels[0], texels[2]);
                    let (bl, br) = yuv422_to_rgb(texels[1], texels[3]);
                    [tl, bl, tr, br]
                } else {
                    [
                        to_32bpp(texels[0], format),
                        to_32bpp(texels[1], format),
                        to_32bpp(texels[2], format),
                        to_32bpp(texels[3], format),
                    ]
                };
                img.set_pixel(x, y, pixels[0]);
                img.set_pixel(x, y + 1, pixels[1]);
                img.set_pixel(x + 1, y, pixels[2]);
                img.set_pixel(x + 1, y + 1, pixels[3]);

                draw_block(&mut cui, x, y, 2, 2, cbidx);
            }

            levels.insert(0, img);
            usage.insert(0, cui);
            offset += (width * height) / 4;
            width *= 2;
            height *= 2;
        }

        (levels, usage)
    }

    fn decode_pal8_vq(&self, palette: &Palette) -> (Vec<Image>, Vec<Image>) {
        let mut levels = Vec::new();
        let mut usage = Vec::new();

        let (mut width, mut height, mut offset) = if self.texture_type.mipmapped() {
            (4, 4, 2048 + 1)
        } else {
            (self.width, self.height, 2048)
        };

        while width <= self.width && height <= self.height {
            let mut img = Image::new(width, height);
            let mut cui = Image::new(width, height);
            let twiddler = Twiddler::new(width / 4, height / 4);
            let blocks = (width / 4) * (height / 4);

            for i in 0..blocks {
                let cbidx0 = self.data[offset + i * 2] as usize;
                let cbidx1 = self.data[offset + i * 2 + 1] as usize;
                let (bx, by) = twiddler.position(i);
                let (x, y) = (bx * 4, by * 4);

                self.paint_pal8_slab(&mut img, palette, x, y, cbidx0);
                self.paint_pal8_slab(&mut img, palette, x + 2, y, cbidx1);

                draw_block(&mut cui, x, y, 2, 4, cbidx0);
                draw_block(&mut cui, x + 2, y, 2, 4, cbidx1);
            }

            levels.insert(0, img);
            usage.insert(0, cui);
            offset += (width * height) / 8;
            width *= 2;
            height *= 2;
        }

        (levels, usage)
    }

    // One codebook entry covers a 2x4 slab, bytes in twiddled order
    fn paint_pal8_slab(&self, img: &mut Image, palette: &Palette, x: usize, y: usize, cbidx: usize) {
        let twiddler = Twiddler::new(2, 4);
        for j in 0..8 {
            let pixel = palette.color_at(self.data[cbidx * 8 + j] as usize);
            let offset = twiddler.index(j);
            img.set_pixel(x + offset % 2, y + offset / 2, pixel);
        }
    }

    fn decode_pal4_vq(&self, palette: &Palette) -> (Vec<Image>, Vec<Image>) {
        let mut levels = Vec::new();
        let mut usage = Vec::new();
        let mipmapped = self.texture_type.mipmapped();

        let (mut width, mut height, mut offset) = if mipmapped {
            (4, 4, 2048 + 1)
        } else {
            (self.width, self.height, 2048)
        };

        while width <= self.width && height <= self.height {
            let mut img = Image::new(width, height);
            let mut cui = Image::new(width, height);
            let twiddler = Twiddler::new(width / 4, height / 4);
            let blocks = (width / 4) * (height / 4);

            for i in 0..blocks {
                let (bx, by) = twiddler.position(i);
                let (x, y) = (bx * 4, by * 4);

                if mipmapped {
                    // Index bytes straddle the blocks: the left slab comes
                    // from the second half of the previous index's code,
                    // the right slab from the first half of this one.
                    let cbidx0 = self.data[offset + i - 1] as usize;
                    let cbidx1 = self.data[offset + i] as usize;

                    self.paint_pal4_slab(&mut img, palette, x, y, cbidx0, 4);
                    self.paint_pal4_slab(&mut img, palette, x + 2, y, cbidx1, 0);

                    draw_block(&mut cui, x, y, 2, 4, cbidx0);
                    draw_block(&mut cui, x + 2, y, 2, 4, cbidx1);
                } else {
                    let cbidx = self.data[offset + i] as usize;

                    self.paint_pal4_slab(&mut img, palette, x, y, cbidx, 0);
                    self.paint_pal4_slab(&mut img, palette, x + 2, y, cbidx, 4);

                    draw_block(&mut cui, x, y, 4, 4, cbidx);
                }
            }

            levels.insert(0, img);
            usage.insert(0, cui);
            offset += (width * height) / 16;
            width *= 2;
            height *= 2;
        }

        (levels, usage)
    }

    // One half (8 nibbles, starting at `half` bytes in) of a codebook
    // entry covers a 2x4 slab, nibbles in twiddled order
    fn paint_pal4_slab(
        &self,
        img: &mut Image,
        palette: &Palette,
        x: usize,
        y: usize,
        cbidx: usize,
        half: usize,
    ) {
        let twiddler = Twiddler::new(2, 4);
        for j in 0..8 {
            let byte = self.data[cbidx * 8 + half + j / 2];
            let nibble = if j % 2 == 1 { byte >> 4 } else { byte & 0xF };
            let pixel = palette.color_at(nibble as usize);
            let offset = twiddler.index(j);
            img.set_pixel(x + offset % 2, y + offset / 2, pixel);
        }
    }
}

fn draw_block(img: &mut Image, x: usize, y: usize, w: usize, h: usize, codebook_index: usize) {
    let color = CODE_USAGE_COLORS[codebook_index];
    for yy in y..y + h {
        for xx in x..x + w {
            img.set_pixel(xx, yy, color);
        }
    }
}

/// A more or less evenly distributed 256-color palette for visualizing
/// which codebook entry covers each block.
pub const CODE_USAGE_COLORS: [u32; 256] = [
    0xFFFFFFFF, 0xFFE3AAAA, 0xFFFFC7C7, 0xFFAAC7C7, 0xFFAAC7AA, 0xFFAAAAE3, 0xFFAAAAFF, 0xFFAAE3FF,
    0xFFFFAAE3, 0xFFE3FFAA, 0xFFFFFFAA, 0xFFFFAAFF, 0xFFAAFFC7, 0xFFE3C7FF, 0xFFC7AAAA, 0xFFE3E3E3,
    0xFFAA7171, 0xFFC78E8E, 0xFF718E8E, 0xFF718E71, 0xFF7171AA, 0xFF7171C7, 0xFF71AAC7, 0xFFC771AA,
    0xFFAAC771, 0xFFC7C771, 0xFFC771C7, 0xFF71C78E, 0xFFAA8EC7, 0xFF8E7171, 0xFFAAAAAA, 0xFFC7C7C7,
    0xFF710000, 0xFF8E1C1C, 0xFF381C1C, 0xFF381C00, 0xFF380038, 0xFF380055, 0xFF383855, 0xFF8E0038,
    0xFF715500, 0xFF8E5500, 0xFF8E0055, 0xFF38551C, 0xFF711C55, 0xFF550000, 0xFF713838, 0xFF8E5555,
    0xFFAA38AA, 0xFFC755C7, 0xFF7155C7, 0xFF7155AA, 0xFF7138E3, 0xFF7138FF, 0xFF7171FF, 0xFFC738E3,
    0xFFAA8EAA, 0xFFC78EAA, 0xFFC738FF, 0xFF718EC7, 0xFFAA55FF, 0xFF8E38AA, 0xFFAA71E3, 0xFFC78EFF,
    0xFF38AA38, 0xFF55C755, 0xFF00C755, 0xFF00C738, 0xFF00AA71, 0xFF00AA8E, 0xFF00E38E, 0xFF55AA71,
    0xFF38FF38, 0xFF55FF38, 0xFF55AA8E, 0xFF00FF55, 0xFF38C78E, 0xFF1CAA38, 0xFF38E371, 0xFF55FF8E,
    0xFFE300AA, 0xFFFF1CC7, 0xFFAA1CC7, 0xFFAA1CAA, 0xFFAA00E3, 0xFFAA00FF, 0xFFAA38FF, 0xFFFF00E3,
    0xFFE355AA, 0xFFFF55AA, 0xFFFF00FF, 0xFFAA55C7, 0xFFE31CFF, 0xFFC700AA, 0xFFE338E3, 0xFFFF55FF,
    0xFFE3AA00, 0xFFFFC71C, 0xFFAAC71C, 0xFFAAC700, 0xFFAAAA38, 0xFFAAAA55, 0xFFAAE355, 0xFFFFAA38,
    0xFFE3FF00, 0xFFFFFF00, 0xFFFFAA55, 0xFFAAFF1C, 0xFFE3C755, 0xFFC7AA00, 0xFFE3E338, 0xFFFFFF55,
    0xFFAAAA00, 0xFFC7C71C, 0xFF71C71C, 0xFF71C700, 0xFF71AA38, 0xFF71AA55, 0xFF71E355, 0xFFC7AA38,
    0xFFAAFF00, 0xFFC7FF00, 0xFFC7AA55, 0xFF71FF1C, 0xFFAAC755, 0xFF8EAA00, 0xFFAAE338, 0xFFC7FF55,
    0xFFE30071, 0xFFFF1C8E, 0xFFAA1C8E, 0xFFAA1C71, 0xFFAA00AA, 0xFFAA00C7, 0xFFAA38C7, 0xFFFF00AA,
    0xFFE35571, 0xFFFF5571, 0xFFFF00C7, 0xFFAA558E, 0xFFE31CC7, 0xFFC70071, 0xFFE338AA, 0xFFFF55C7,
    0xFF3871AA, 0xFF558EC7, 0xFF008EC7, 0xFF008EAA, 0xFF0071E3, 0xFF0071FF, 0xFF00AAFF, 0xFF5571E3,
    0xFF38C7AA, 0xFF55C7AA, 0xFF5571FF, 0xFF00C7C7, 0xFF388EFF, 0xFF1C71AA, 0xFF38AAE3, 0xFF55C7FF,
    0xFF3800AA, 0xFF551CC7, 0xFF001CC7, 0xFF001CAA, 0xFF0000E3, 0xFF0000FF, 0xFF0038FF, 0xFF5500E3,
    0xFF3855AA, 0xFF5555AA, 0xFF5500FF, 0xFF0055C7, 0xFF381CFF, 0xFF1C00AA, 0xFF3838E3, 0xFF5555FF,
    0xFF380071, 0xFF551C8E, 0xFF001C8E, 0xFF001C71, 0xFF0000AA, 0xFF0000C7, 0xFF0038C7, 0xFF5500AA,
    0xFF385571, 0xFF555571, 0xFF5500C7, 0xFF00558E, 0xFF381CC7, 0xFF1C0071, 0xFF3838AA, 0xFF5555C7,
    0xFF383800, 0xFF55551C, 0xFF00551C, 0xFF005500, 0xFF003838, 0xFF003855, 0xFF007155, 0xFF553838,
    0xFF388E00, 0xFF558E00, 0xFF553855, 0xFF008E1C, 0xFF385555, 0xFF1C3800, 0xFF387138, 0xFF558E55,
    0xFF383838, 0xFF555555, 0xFF005555, 0xFF005538, 0xFF003871, 0xFF00388E, 0xFF00718E, 0xFF553871,
    0xFF388E38, 0xFF558E38, 0xFF55388E, 0xFF008E55, 0xFF38558E, 0xFF1C3838, 0xFF387171, 0xFF558E8E,
    0xFFE33838, 0xFFFF5555, 0xFFAA5555, 0xFFAA5538, 0xFFAA3871, 0xFFAA388E, 0xFFAA718E, 0xFFFF3871,
    0xFFE38E38, 0xFFFF8E38, 0xFFFF388E, 0xFFAA8E55, 0xFFE3558E, 0xFFC73838, 0xFFE37171, 0xFFFF8E8E,
    0xFFAA0000, 0xFFC71C1C, 0xFF711C1C, 0xFF711C00, 0xFF710038, 0xFF710055, 0xFF713855, 0xFFC70038,
    0xFFAA5500, 0xFFC75500, 0xFFC70055, 0xFF71551C, 0xFFAA1C55, 0xFF8E0000, 0xFFAA3838, 0xFFC75555,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texel::rgb;

    fn header(width: u16, height: u16, ttype: u32, size: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DTEX");
        buf.extend_from_slice(&width.to_le_bytes());
        buf.extend_from_slice(&height.to_le_bytes());
        buf.extend_from_slice(&ttype.to_le_bytes());
        buf.extend_from_slice(&size.to_le_bytes());
        buf
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let mut buf = header(8, 8, 0, 0);
        buf[0] = b'X';
        let err = Texture::read(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, TextureError::BadTextureMagic));
    }

    #[test]
    fn test_read_rejects_truncated_body() {
        let mut buf = header(8, 8, 0, 128);
        buf.extend_from_slice(&[0u8; 64]);
        let err = Texture::read(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, TextureError::Truncated));
    }

    #[test]
    fn test_read_strided_width_from_type() {
        let ttype = TextureType::new(PixelFormat::Rgb565)
            .with_stride()
            .with_stride_setting(64);
        let mut buf = header(64, 8, ttype.bits(), 1024);
        buf.extend_from_slice(&vec![0u8; 1024]);
        let texture = Texture::read(&mut buf.as_slice()).unwrap();
        assert_eq!(texture.width(), 64);
        assert_eq!(texture.height(), 8);
    }

    #[test]
    fn test_decode_solid_argb1555() {
        let ttype = TextureType::new(PixelFormat::Argb1555);
        let mut buf = header(8, 8, ttype.bits(), 128);
        for _ in 0..64 {
            buf.extend_from_slice(&0xC210u16.to_le_bytes());
        }

        let texture = Texture::read(&mut buf.as_slice()).unwrap();
        let decoded = texture.decode(None).unwrap();

        assert_eq!(decoded.levels.len(), 1);
        assert!(decoded.code_usage.is_empty());
        let img = &decoded.levels[0];
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(img.pixel(x, y), rgb(0x80, 0x80, 0x80));
            }
        }
    }

    #[test]
    fn test_decode_paletted_requires_palette() {
        let ttype = TextureType::new(PixelFormat::Pal8bpp);
        let mut buf = header(8, 8, ttype.bits(), 64);
        buf.extend_from_slice(&[0u8; 64]);

        let texture = Texture::read(&mut buf.as_slice()).unwrap();
        let err = texture.decode(None).unwrap_err();
        assert!(matches!(err, TextureError::MissingPalette));
    }

    #[test]
    fn test_decode_body_shorter_than_layout() {
        // Size field admits a 32-byte body but the mipmapped layout of an
        // 8x8 texture needs more
        let ttype = TextureType::new(PixelFormat::Rgb565).with_mipmaps();
        let mut buf = header(8, 8, ttype.bits(), 32);
        buf.extend_from_slice(&[0u8; 32]);

        let texture = Texture::read(&mut buf.as_slice()).unwrap();
        let err = texture.decode(None).unwrap_err();
        assert!(matches!(err, TextureError::Truncated));
    }

    #[test]
    fn test_code_usage_palette_is_distinct_enough() {
        assert_eq!(CODE_USAGE_COLORS[0], 0xFFFF_FFFF);
        // No duplicate entries anywhere in the table
        let mut seen = std::collections::HashSet::new();
        for &color in CODE_USAGE_COLORS.iter() {
            assert!(seen.insert(color), "duplicate color {:08x}", color);
        }
    }
}
