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

//! Insertion-ordered color palettes and their sidecar file format.

use std::collections::HashMap;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::texel::rgb;
use crate::{ImageSet, Result, TextureError, PALETTE_MAGIC};

/// An ordered set of 32-bit ARGB colors.
///
/// Insertion is idempotent; a color keeps the index it got the first time
/// it was inserted.
#[derive(Clone, Default, Debug)]
pub struct Palette {
    colors: Vec<u32>,
    index: HashMap<u32, usize>,
}

impl Palette {
    pub fn new() -> Self {
        Palette::default()
    }

    /// Collects every color appearing in any level of the set.
    pub fn from_images(images: &ImageSet) -> Self {
        let mut palette = Palette::new();
        for img in images.levels() {
            for &pixel in img.pixels() {
                palette.insert(pixel);
            }
        }
        palette
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn clear(&mut self) {
        self.colors.clear();
        self.index.clear();
    }

    pub fn insert(&mut self, color: u32) {
        if !self.index.contains_key(&color) {
            self.index.insert(color, self.colors.len());
            self.colors.push(color);
        }
    }

    /// Index of `color`, or 0 for colors not in the palette.
    pub fn index_of(&self, color: u32) -> usize {
        self.index.get(&color).copied().unwrap_or(0)
    }

    /// Color at `index`, or opaque black when out of range.
    pub fn color_at(&self, index: usize) -> u32 {
        self.colors.get(index).copied().unwrap_or(rgb(0, 0, 0))
    }

    /// Writes the sidecar palette: `"DPAL"`, color count, then one 32-bit
    /// ARGB value per entry, all little-endian.
    pub fn save<W: Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_all(PALETTE_MAGIC)?;
        stream.write_i32::<LittleEndian>(self.colors.len() as i32)?;
        for &color in &self.colors {
            stream.write_u32::<LittleEndian>(color)?;
        }
        Ok(())
    }

    /// Reads the mirror of [`Palette::save`].
    pub fn load<R: Read>(stream: &mut R) -> Result<Palette> {
        let mut magic = [0u8; 4];
        stream.read_exact(&mut magic)?;
        if magic != *PALETTE_MAGIC {
            return Err(TextureError::BadPaletteMagic);
        }

        let count = stream.read_i32::<LittleEndian>()?;
        let mut palette = Palette::new();
        for _ in 0..count {
            palette.insert(stream.read_u32::<LittleEndian>()?);
        }
        Ok(palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texel::argb;

    #[test]
    fn test_insert_is_idempotent() {
        let mut palette = Palette::new();
        palette.insert(rgb(1, 2, 3));
        palette.insert(rgb(4, 5, 6));
        palette.insert(rgb(1, 2, 3));

        assert_eq!(palette.len(), 2);
        assert_eq!(palette.index_of(rgb(1, 2, 3)), 0);
        assert_eq!(palette.index_of(rgb(4, 5, 6)), 1);
    }

    #[test]
    fn test_lookup_defaults() {
        let mut palette = Palette::new();
        palette.insert(rgb(10, 20, 30));

        assert_eq!(palette.index_of(rgb(99, 99, 99)), 0);
        assert_eq!(palette.color_at(7), rgb(0, 0, 0));
    }

    #[test]
    fn test_index_color_roundtrip() {
        let mut palette = Palette::new();
        let colors = [argb(0x80, 1, 2, 3), rgb(4, 5, 6), rgb(7, 8, 9)];
        for &c in &colors {
            palette.insert(c);
        }
        for (i, &c) in colors.iter().enumerate() {
            assert_eq!(palette.index_of(c), i);
            assert_eq!(palette.color_at(i), c);
        }
    }

    #[test]
    fn test_save_format() {
        let mut palette = Palette::new();
        palette.insert(0xFF11_2233);
        palette.insert(0x8044_5566);

        let mut buf = Vec::new();
        palette.save(&mut buf).unwrap();

        assert_eq!(&buf[0..4], b"DPAL");
        assert_eq!(&buf[4..8], &[2, 0, 0, 0]);
        assert_eq!(&buf[8..12], &[0x33, 0x22, 0x11, 0xFF]);
        assert_eq!(&buf[12..16], &[0x66, 0x55, 0x44, 0x80]);
    }

    #[test]
    fn test_save_load_preserves_order() {
        let mut palette = Palette::new();
        for i in 0..16u8 {
            palette.insert(rgb(i * 10, i, 255 - i));
        }

        let mut buf = Vec::new();
        palette.save(&mut buf).unwrap();
        let loaded = Palette::load(&mut buf.as_slice()).unwrap();

        assert_eq!(loaded.len(), palette.len());
        for i in 0..16 {
            assert_eq!(loaded.color_at(i), palette.color_at(i));
        }
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let buf = b"NOPE\x00\x00\x00\x00".to_vec();
        let err = Palette::load(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, TextureError::BadPaletteMagic));
    }
}
