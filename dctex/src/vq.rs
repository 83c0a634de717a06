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

//! N-dimensional vectors and the generalized Linde-Buzo-Gray codebook
//! builder used by every compression path.

use std::collections::HashMap;
use std::ops::{AddAssign, Index, Sub, SubAssign};
use std::time::Instant;

use log::debug;

use crate::texel::{alpha, argb, blue, green, red, rgb};

/// Mixes a pixel value into a running hash. Taken from boost's
/// hash_combine; vastly better distributed than xor-ing the pixels
/// together.
pub(crate) fn combine_hash(rgba: u32, seed: u32) -> u32 {
    seed ^ rgba
        .wrapping_add(0x9E37_79B9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// An N-tuple of floats with a precomputed hash.
///
/// The hash is derived from the pixels the vector was built from and only
/// exists to make deduplication cheap; it takes no part in arithmetic.
/// Equality is approximate: vectors are equal when every component differs
/// by less than 1e-3.
#[derive(Clone, Copy)]
pub struct Vector<const N: usize> {
    v: [f32; N],
    hash: u32,
}

impl<const N: usize> Default for Vector<N> {
    fn default() -> Self {
        Vector {
            v: [0.0; N],
            hash: 0,
        }
    }
}

impl<const N: usize> Vector<N> {
    pub fn new() -> Self {
        Vector::default()
    }

    pub fn with_hash(hash: u32) -> Self {
        Vector {
            v: [0.0; N],
            hash,
        }
    }

    pub fn set(&mut self, index: usize, value: f32) {
        self.v[index] = value;
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn set_hash(&mut self, hash: u32) {
        self.hash = hash;
    }

    pub fn approx_eq(&self, other: &Vector<N>) -> bool {
        self.v
            .iter()
            .zip(other.v.iter())
            .all(|(a, b)| (a - b).abs() <= 0.001)
    }

    fn zero(&mut self) {
        self.v = [0.0; N];
    }

    fn add_scaled(&mut self, other: &Vector<N>, scale: f32) {
        for (a, b) in self.v.iter_mut().zip(other.v.iter()) {
            *a += b * scale;
        }
    }

    fn scale(&mut self, x: f32) {
        for a in self.v.iter_mut() {
            *a *= x;
        }
    }

    pub fn length_squared(&self) -> f32 {
        self.v.iter().map(|a| a * a).sum()
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Rescales the vector to the given length.
    fn set_length(&mut self, len: f32) {
        self.scale(len / self.length());
    }

    pub fn distance_squared(a: &Vector<N>, b: &Vector<N>) -> f32 {
        a.v.iter()
            .zip(b.v.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }
}

impl<const N: usize> Index<usize> for Vector<N> {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.v[index]
    }
}

impl<'a, const N: usize> AddAssign<&'a Vector<N>> for Vector<N> {
    fn add_assign(&mut self, other: &'a Vector<N>) {
        for (a, b) in self.v.iter_mut().zip(other.v.iter()) {
            *a += b;
        }
    }
}

impl<'a, const N: usize> SubAssign<&'a Vector<N>> for Vector<N> {
    fn sub_assign(&mut self, other: &'a Vector<N>) {
        for (a, b) in self.v.iter_mut().zip(other.v.iter()) {
            *a -= b;
        }
    }
}

impl<const N: usize> Sub for Vector<N> {
    type Output = Vector<N>;

    fn sub(self, other: Vector<N>) -> Vector<N> {
        let mut out = self;
        out -= &other;
        out.hash = 0;
        out
    }
}

/// Writes (R, G, B) of a pixel into three components starting at `offset`,
/// normalized to [0, 1].
pub(crate) fn rgb_to_vec<const N: usize>(pixel: u32, vec: &mut Vector<N>, offset: usize) {
    vec.set(offset, red(pixel) as f32 / 255.0);
    vec.set(offset + 1, green(pixel) as f32 / 255.0);
    vec.set(offset + 2, blue(pixel) as f32 / 255.0);
}

/// Writes (A, R, G, B) of a pixel into four components starting at
/// `offset`, normalized to [0, 1].
pub(crate) fn argb_to_vec<const N: usize>(pixel: u32, vec: &mut Vector<N>, offset: usize) {
    vec.set(offset, alpha(pixel) as f32 / 255.0);
    vec.set(offset + 1, red(pixel) as f32 / 255.0);
    vec.set(offset + 2, green(pixel) as f32 / 255.0);
    vec.set(offset + 3, blue(pixel) as f32 / 255.0);
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Reads three components starting at `offset` as an opaque RGB pixel.
pub(crate) fn vec_to_rgb<const N: usize>(vec: &Vector<N>, offset: usize) -> u32 {
    rgb(
        to_channel(vec[offset]),
        to_channel(vec[offset + 1]),
        to_channel(vec[offset + 2]),
    )
}

/// Reads four components starting at `offset` as an ARGB pixel.
pub(crate) fn vec_to_argb<const N: usize>(vec: &Vector<N>, offset: usize) -> u32 {
    argb(
        to_channel(vec[offset]),
        to_channel(vec[offset + 1]),
        to_channel(vec[offset + 2]),
        to_channel(vec[offset + 3]),
    )
}

/// The input multiset with duplicates folded into occurrence counts.
///
/// Iteration order is insertion order, which keeps the whole quantization
/// deterministic: the codebook bytes for a given input never change
/// between runs.
struct WeightedVectors<const N: usize> {
    entries: Vec<(Vector<N>, u32)>,
    by_hash: HashMap<u32, Vec<usize>>,
}

impl<const N: usize> WeightedVectors<N> {
    fn new() -> Self {
        WeightedVectors {
            entries: Vec::new(),
            by_hash: HashMap::new(),
        }
    }

    fn push(&mut self, vec: Vector<N>) {
        let bucket = self.by_hash.entry(vec.hash()).or_default();
        for &i in bucket.iter() {
            if self.entries[i].0.approx_eq(&vec) {
                self.entries[i].1 += 1;
                return;
            }
        }
        bucket.push(self.entries.len());
        self.entries.push((vec, 1));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> impl Iterator<Item = &(Vector<N>, u32)> {
        self.entries.iter()
    }
}

#[derive(Clone, Copy)]
struct Code<const N: usize> {
    vec_count: u32,
    vec_sum: Vector<N>,
    max_distance: f32,
    max_distance_vec: Vector<N>,
    code_vec: Vector<N>,
}

impl<const N: usize> Default for Code<N> {
    fn default() -> Self {
        Code {
            vec_count: 0,
            vec_sum: Vector::new(),
            max_distance: 0.0,
            max_distance_vec: Vector::new(),
            code_vec: Vector::new(),
        }
    }
}

/// Builds codebooks of up to K code vectors with LBG splitting: seed with
/// the global centroid, double the book by perturbing every code until no
/// further doubling helps, then greedily split the worst code until K is
/// reached or nothing improves.
pub struct VectorQuantizer<const N: usize> {
    codes: Vec<Code<N>>,
}

impl<const N: usize> Default for VectorQuantizer<N> {
    fn default() -> Self {
        VectorQuantizer::new()
    }
}

impl<const N: usize> VectorQuantizer<N> {
    pub fn new() -> Self {
        VectorQuantizer { codes: Vec::new() }
    }

    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    pub fn code_vector(&self, index: usize) -> &Vector<N> {
        &self.codes[index].code_vec
    }

    /// Index of the closest code by squared Euclidean distance. Ties go to
    /// the lower index; a near-exact match short-circuits the scan.
    ///
    /// This linear search is the hot loop of every compression. At the
    /// dimensions used here a kd-tree would not beat it unless the input
    /// had far more vectors than 2^N.
    pub fn find_closest(&self, vec: &Vector<N>) -> usize {
        if self.codes.len() <= 1 {
            return 0;
        }

        let mut closest_index = 0;
        let mut closest_distance = Vector::distance_squared(&self.codes[0].code_vec, vec);

        for (i, code) in self.codes.iter().enumerate().skip(1) {
            let distance = Vector::distance_squared(&code.code_vec, vec);
            if distance < closest_distance {
                closest_index = i;
                closest_distance = distance;
                if closest_distance < 0.0001 {
                    return closest_index;
                }
            }
        }
        closest_index
    }

    /// Builds a codebook of at most `num_codes` codes from the input
    /// multiset. Never fails; the result may hold fewer codes than asked
    /// for when the input doesn't have enough variety.
    pub fn compress(&mut self, vectors: &[Vector<N>], num_codes: usize) {
        let mut splits = 0;
        let mut repairs = 0;

        let timer = Instant::now();

        // The input order carries no meaning, so fold duplicates into
        // occurrence counts up front. place() then weighs each unique
        // vector by its count, which gives the same centroids as sweeping
        // the raw sequence.
        let mut rle = WeightedVectors::new();
        for vec in vectors {
            rle.push(*vec);
        }

        debug!(
            "deduplication completed in {} ms",
            timer.elapsed().as_millis()
        );
        debug!("deduplication result: {} => {}", vectors.len(), rle.len());

        // Start out with one code holding the average of all vectors.
        self.codes.clear();
        self.codes.reserve(num_codes);
        self.codes.push(Code::default());
        self.place(&rle);

        // Split the codebook as many times as we can.
        while self.codes.len() * 2 <= num_codes {
            let codes_before = self.codes.len();

            self.split();
            self.place(&rle);
            self.place(&rle);
            self.place(&rle);
            self.remove_unused_codes();

            if self.codes.len() == codes_before {
                debug!("could not further improve the codebook by splitting");
                break;
            }

            splits += 1;
            debug!("split {} done. codes: {}", splits, self.code_count());
        }

        // Fill in the rest by splitting the code with the highest error
        // until we have all the codes we want, or can't split anymore.
        while self.codes.len() < num_codes {
            let codes_before = self.codes.len();
            let n = num_codes - codes_before;

            for _ in 0..n {
                let Some(candidate) = self.find_best_split_candidate() else {
                    break;
                };
                self.split_code(candidate);

                // Reset this so it won't be found in the next iteration
                self.codes[candidate].max_distance = 0.0;
            }

            if self.codes.len() == codes_before {
                debug!("could not further improve the codebook by repairing");
                break;
            }

            self.place(&rle);
            self.place(&rle);
            self.place(&rle);
            self.remove_unused_codes();

            if self.codes.len() == codes_before {
                debug!("could not further improve the codebook by repairing");
                break;
            }

            repairs += 1;
            debug!("repair {} done. codes: {}", repairs, self.code_count());
        }

        debug!(
            "compression completed in {} ms",
            timer.elapsed().as_millis()
        );
    }

    /// One assignment sweep: puts every weighted vector in its closest
    /// code, then moves each used code to the centroid of its assignments.
    fn place(&mut self, vecs: &WeightedVectors<N>) {
        for code in self.codes.iter_mut() {
            code.vec_count = 0;
            code.vec_sum.zero();
            code.max_distance = 0.0;
            code.max_distance_vec.zero();
        }

        for (vec, count) in vecs.iter() {
            let closest = self.find_closest(vec);
            let code = &mut self.codes[closest];

            code.vec_sum.add_scaled(vec, *count as f32);
            code.vec_count += count;

            let distance = Vector::distance_squared(&code.code_vec, vec);
            if distance > code.max_distance {
                code.max_distance = distance;
                code.max_distance_vec = *vec;
            }
        }

        for code in self.codes.iter_mut() {
            if code.vec_count > 0 {
                code.vec_sum.scale(1.0 / code.vec_count as f32);
                code.code_vec = code.vec_sum;
            }
        }
    }

    fn split(&mut self) {
        // The size changes while splitting; don't iterate over new codes.
        let size = self.codes.len();
        for i in 0..size {
            if self.codes[i].vec_count > 1 {
                self.split_code(i);
            }
        }
    }

    /// Splits one code in two: nudge the old code away from its farthest
    /// assigned vector and a new code towards it, then let the place()
    /// rounds tear them apart.
    fn split_code(&mut self, index: usize) {
        let code = &mut self.codes[index];
        let mut diff = code.max_distance_vec - code.code_vec;
        diff.set_length(0.01);

        let mut new_vec = code.code_vec;
        new_vec += &diff;
        code.code_vec -= &diff;

        let mut new_code = Code::default();
        new_code.code_vec = new_vec;
        self.codes.push(new_code);
    }

    fn find_best_split_candidate(&self) -> Option<usize> {
        let mut retval = None;
        let mut furthest = 0.0;
        for (i, code) in self.codes.iter().enumerate() {
            if code.vec_count > 1 && code.max_distance > furthest {
                furthest = code.max_distance;
                retval = Some(i);
            }
        }
        retval
    }

    fn remove_unused_codes(&mut self) {
        let before = self.codes.len();
        self.codes.retain(|code| code.vec_count > 0);
        let removed = before - self.codes.len();
        if removed > 0 {
            debug!("removed {} unused codes", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec2(x: f32, y: f32, hash: u32) -> Vector<2> {
        let mut v = Vector::with_hash(hash);
        v.set(0, x);
        v.set(1, y);
        v
    }

    #[test]
    fn test_approx_eq() {
        let a = vec2(0.5, 0.5, 1);
        let b = vec2(0.5004, 0.4996, 2);
        let c = vec2(0.51, 0.5, 1);
        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn test_distance_squared() {
        let a = vec2(0.0, 0.0, 0);
        let b = vec2(3.0, 4.0, 0);
        assert_eq!(Vector::distance_squared(&a, &b), 25.0);
    }

    #[test]
    fn test_dedup_accumulates_weight() {
        let mut set = WeightedVectors::new();
        set.push(vec2(0.1, 0.2, 7));
        set.push(vec2(0.1, 0.2, 7));
        set.push(vec2(0.9, 0.2, 8));
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries[0].1, 2);
        assert_eq!(set.entries[1].1, 1);
    }

    #[test]
    fn test_single_code_is_centroid() {
        let vectors = [vec2(0.0, 0.0, 1), vec2(1.0, 0.0, 2), vec2(0.5, 0.9, 3)];
        let mut vq = VectorQuantizer::new();
        vq.compress(&vectors, 1);

        assert_eq!(vq.code_count(), 1);
        let code = vq.code_vector(0);
        assert!((code[0] - 0.5).abs() < 1e-6);
        assert!((code[1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_two_clusters_two_codes() {
        let mut vectors = Vec::new();
        for i in 0..8 {
            vectors.push(vec2(0.01 * i as f32, 0.0, i as u32));
            vectors.push(vec2(0.9 + 0.01 * i as f32, 1.0, 100 + i as u32));
        }

        let mut vq = VectorQuantizer::new();
        vq.compress(&vectors, 2);
        assert_eq!(vq.code_count(), 2);

        // Every vector must map to a code near its own cluster
        for vec in &vectors {
            let code = vq.code_vector(vq.find_closest(vec));
            assert!(Vector::distance_squared(code, vec) < 0.1);
        }
    }

    #[test]
    fn test_code_count_never_exceeds_k() {
        let vectors: Vec<Vector<2>> = (0..300)
            .map(|i| {
                let x = (i % 17) as f32 / 17.0;
                let y = (i % 23) as f32 / 23.0;
                vec2(x, y, i as u32)
            })
            .collect();

        for k in [1, 2, 16, 256] {
            let mut vq = VectorQuantizer::new();
            vq.compress(&vectors, k);
            assert!(vq.code_count() <= k);
            assert!(vq.code_count() >= 1);
        }
    }

    #[test]
    fn test_fewer_uniques_than_codes() {
        let vectors = [vec2(0.25, 0.25, 1), vec2(0.75, 0.75, 2)];
        let mut vq = VectorQuantizer::new();
        vq.compress(&vectors, 256);

        assert!(vq.code_count() <= 2);
        for vec in &vectors {
            let code = vq.code_vector(vq.find_closest(vec));
            assert!(Vector::distance_squared(code, vec) < 1e-4);
        }
    }

    #[test]
    fn test_deterministic() {
        let vectors: Vec<Vector<3>> = (0..300)
            .map(|i| {
                let mut v = Vector::with_hash(i as u32);
                v.set(0, ((i * 7) % 31) as f32 / 31.0);
                v.set(1, ((i * 13) % 29) as f32 / 29.0);
                v.set(2, ((i * 3) % 11) as f32 / 11.0);
                v
            })
            .collect();

        let mut a = VectorQuantizer::new();
        let mut b = VectorQuantizer::new();
        a.compress(&vectors, 64);
        b.compress(&vectors, 64);

        assert_eq!(a.code_count(), b.code_count());
        for i in 0..a.code_count() {
            for c in 0..3 {
                assert_eq!(a.code_vector(i)[c].to_bits(), b.code_vector(i)[c].to_bits());
            }
        }
    }

    #[test]
    fn test_ties_break_to_lower_index() {
        let mut vq = VectorQuantizer::<2>::new();
        vq.codes.push(Code {
            code_vec: vec2(0.0, 0.0, 0),
            ..Code::default()
        });
        vq.codes.push(Code {
            code_vec: vec2(1.0, 0.0, 0),
            ..Code::default()
        });
        // Equidistant from both codes
        assert_eq!(vq.find_closest(&vec2(0.5, 0.0, 0)), 0);
    }

    #[test]
    fn test_combine_hash_mixes() {
        let a = combine_hash(0xFF00_00FF, 0);
        let b = combine_hash(0xFF00_00FE, 0);
        assert_ne!(a, b);
        // Order matters
        let ab = combine_hash(2, combine_hash(1, 0));
        let ba = combine_hash(1, combine_hash(2, 0));
        assert_ne!(ab, ba);
    }
}
