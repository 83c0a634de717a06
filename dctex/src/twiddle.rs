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

//! Twiddled (Morton-Z) pixel ordering as consumed by the PVR2.

/// Precomputed permutation table mapping the linear on-disk texel index to
/// its pixel offset within a `w`x`h` region.
///
/// The PVR2 fetches non-strided textures in a recursive Z order: each block
/// splits into four sub-blocks visited top-left, bottom-left, top-right,
/// bottom-right, down to single pixels. Rectangular regions repeat the
/// square `min(w, h)` twiddling along the longer axis.
pub struct Twiddler {
    width: usize,
    index: Vec<usize>,
}

impl Twiddler {
    pub fn new(width: usize, height: usize) -> Self {
        let mut index = vec![0usize; width * height];
        let mut seq = 0;

        if width < height {
            for y in (0..height).step_by(width) {
                seq += twiddle(&mut index, width, 0, y, width, seq);
            }
        } else {
            for x in (0..width).step_by(height) {
                seq += twiddle(&mut index, width, x, 0, height, seq);
            }
        }

        Twiddler { width, index }
    }

    /// Pixel offset (`y * width + x`) of the `i`-th twiddled texel.
    pub fn index(&self, i: usize) -> usize {
        self.index[i]
    }

    /// Pixel coordinates of the `i`-th twiddled texel.
    pub fn position(&self, i: usize) -> (usize, usize) {
        let offset = self.index[i];
        (offset % self.width, offset / self.width)
    }
}

fn twiddle(
    output: &mut [usize],
    stride: usize,
    x: usize,
    y: usize,
    blocksize: usize,
    seq: usize,
) -> usize {
    if blocksize == 1 {
        // Can't divide anymore
        output[seq] = y * stride + x;
        return 1;
    }

    let b = blocksize >> 1;
    let mut seq = seq;
    let before = seq;
    seq += twiddle(output, stride, x, y, b, seq);
    seq += twiddle(output, stride, x, y + b, b, seq);
    seq += twiddle(output, stride, x + b, y, b, seq);
    seq += twiddle(output, stride, x + b, y + b, b, seq);
    seq - before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_4x4_sequence() {
        let twiddler = Twiddler::new(4, 4);
        let table: Vec<usize> = (0..16).map(|i| twiddler.index(i)).collect();

        // TL, BL, TR, BR recursion over a 4x4 block
        let expected = [0, 4, 1, 5, 8, 12, 9, 13, 2, 6, 3, 7, 10, 14, 11, 15];
        assert_eq!(table, expected);
    }

    #[test]
    fn test_2x2_sequence() {
        let twiddler = Twiddler::new(2, 2);
        let table: Vec<usize> = (0..4).map(|i| twiddler.index(i)).collect();
        assert_eq!(table, [0, 2, 1, 3]);
    }

    #[test]
    fn test_single_pixel() {
        let twiddler = Twiddler::new(1, 1);
        assert_eq!(twiddler.index(0), 0);
        assert_eq!(twiddler.position(0), (0, 0));
    }

    fn assert_bijective(width: usize, height: usize) {
        let twiddler = Twiddler::new(width, height);
        let mut table: Vec<usize> = (0..width * height).map(|i| twiddler.index(i)).collect();
        table.sort_unstable();
        let identity: Vec<usize> = (0..width * height).collect();
        assert_eq!(table, identity, "not a bijection for {}x{}", width, height);
    }

    #[test]
    fn test_bijective_square() {
        for shift in 0..8 {
            let size = 1 << shift;
            assert_bijective(size, size);
        }
    }

    #[test]
    fn test_bijective_rectangular() {
        assert_bijective(8, 2);
        assert_bijective(2, 8);
        assert_bijective(64, 8);
        assert_bijective(8, 64);
    }

    #[test]
    fn test_wide_region_tiles_squares() {
        // An 8x2 region is four 2x2 twiddles laid out left to right.
        let twiddler = Twiddler::new(8, 2);
        let table: Vec<usize> = (0..16).map(|i| twiddler.index(i)).collect();
        assert_eq!(
            table,
            [0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15]
        );
    }

    #[test]
    fn test_position_matches_index() {
        let twiddler = Twiddler::new(16, 16);
        for i in 0..256 {
            let (x, y) = twiddler.position(i);
            assert_eq!(y * 16 + x, twiddler.index(i));
        }
    }
}
