//! Separable 1D/2D Haar wavelet transforms
//!
//! Two families are provided over square row-major `f32` matrices:
//!
//! - **Non-standard** ([`HaarTransform::forward_2d`] / [`HaarTransform::inverse_2d`]):
//!   the square multiresolution decomposition used by the quadtree pipeline's
//!   math. Each pyramid step transforms the active `related × related`
//!   top-left block one butterfly level at a time, rows then columns.
//! - **Standard** ([`HaarTransform::standard_forward_2d`] /
//!   [`HaarTransform::standard_inverse_2d`]): the conventional dyadic pyramid
//!   that fully recurses the averages along each axis before switching axes.
//!
//! Scratch buffers are allocated once per instance and reused across calls, so
//! a transform instance must not be shared between threads; give each worker
//! its own (see the crate-level concurrency notes).
//!
//! The standard variants and [`keep_largest_n`] are an alternate compression
//! strategy kept as a standalone utility; the quadtree pipeline does not call
//! them.
//!
//! Author: Moroya Sakamoto

use std::f32::consts::FRAC_1_SQRT_2;

/// Separable Haar wavelet transform with pre-allocated scratch memory.
///
/// `max_len` bounds the side length accepted by every method; calls above the
/// bound panic. Matrices are row-major, columns are gathered into contiguous
/// scratch before their 1D pass.
pub struct HaarTransform {
    max_len: usize,
    row_scratch: Vec<f32>,
    col_scratch: Vec<f32>,
}

impl HaarTransform {
    /// Create a transform supporting side lengths up to `max_len`.
    ///
    /// `max_len` must be a power of two (fatal precondition).
    pub fn new(max_len: usize) -> Self {
        assert!(
            max_len.is_power_of_two(),
            "HaarTransform max_len {} is not a power of two",
            max_len
        );
        HaarTransform {
            max_len,
            row_scratch: vec![0.0; max_len],
            col_scratch: vec![0.0; max_len],
        }
    }

    /// Largest supported side length.
    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// One butterfly level of the forward 1D transform, in place.
    ///
    /// `out[i] = (a[2i] + a[2i+1]) / √2`, `out[i + len/2] = (a[2i] - a[2i+1]) / √2`.
    /// Assumes `len` is even; odd lengths lose their tail through the halved
    /// loop bound (matching the non-standard family's silent assumption).
    pub fn forward_1d(&mut self, array: &mut [f32], len: usize) {
        assert!(len <= self.max_len, "len {} exceeds max_len {}", len, self.max_len);
        let half = len / 2;
        for i in 0..half {
            self.row_scratch[i] = (array[2 * i] + array[2 * i + 1]) * FRAC_1_SQRT_2;
            self.row_scratch[i + half] = (array[2 * i] - array[2 * i + 1]) * FRAC_1_SQRT_2;
        }
        array[..len].copy_from_slice(&self.row_scratch[..len]);
    }

    /// One butterfly level of the inverse 1D transform, in place.
    pub fn inverse_1d(&mut self, array: &mut [f32], len: usize) {
        assert!(len <= self.max_len, "len {} exceeds max_len {}", len, self.max_len);
        let half = len / 2;
        for i in 0..half {
            self.row_scratch[2 * i] = (array[i] + array[i + half]) * FRAC_1_SQRT_2;
            self.row_scratch[2 * i + 1] = (array[i] - array[i + half]) * FRAC_1_SQRT_2;
        }
        array[..len].copy_from_slice(&self.row_scratch[..len]);
    }

    /// Non-standard 2D forward transform of a `len × len` row-major matrix.
    ///
    /// Pyramid over the active block: for `related` from `len` down to 2,
    /// apply one butterfly level to each active row, then to each active
    /// column (gathered through scratch).
    pub fn forward_2d(&mut self, mat: &mut [f32], len: usize) {
        assert!(len <= self.max_len, "len {} exceeds max_len {}", len, self.max_len);
        let mut related = len;
        while related > 1 {
            for row in 0..related {
                let start = row * len;
                self.forward_1d_range(mat, start, related);
            }
            for col in 0..related {
                for row in 0..related {
                    self.col_scratch[row] = mat[row * len + col];
                }
                let half = related / 2;
                for i in 0..half {
                    let a = self.col_scratch[2 * i];
                    let b = self.col_scratch[2 * i + 1];
                    self.row_scratch[i] = (a + b) * FRAC_1_SQRT_2;
                    self.row_scratch[i + half] = (a - b) * FRAC_1_SQRT_2;
                }
                for row in 0..related {
                    mat[row * len + col] = self.row_scratch[row];
                }
            }
            related /= 2;
        }
    }

    /// Non-standard 2D inverse transform of a `len × len` row-major matrix.
    pub fn inverse_2d(&mut self, mat: &mut [f32], len: usize) {
        assert!(len <= self.max_len, "len {} exceeds max_len {}", len, self.max_len);
        let mut related = 2;
        while related <= len {
            for row in 0..related {
                let start = row * len;
                self.inverse_1d_range(mat, start, related);
            }
            for col in 0..related {
                for row in 0..related {
                    self.col_scratch[row] = mat[row * len + col];
                }
                let half = related / 2;
                for i in 0..half {
                    let a = self.col_scratch[i];
                    let b = self.col_scratch[i + half];
                    self.row_scratch[2 * i] = (a + b) * FRAC_1_SQRT_2;
                    self.row_scratch[2 * i + 1] = (a - b) * FRAC_1_SQRT_2;
                }
                for row in 0..related {
                    mat[row * len + col] = self.row_scratch[row];
                }
            }
            related *= 2;
        }
    }

    /// Standard (fully recursive) 1D forward transform, in place.
    ///
    /// `len` must be a power of two (fatal precondition, never truncated).
    pub fn standard_forward_1d(&mut self, array: &mut [f32], len: usize) {
        assert!(
            len.is_power_of_two(),
            "standard Haar length {} is not a power of two",
            len
        );
        assert!(len <= self.max_len, "len {} exceeds max_len {}", len, self.max_len);
        let mut related = len;
        while related > 1 {
            self.row_scratch[..related].copy_from_slice(&array[..related]);
            let half = related / 2;
            for i in 0..half {
                array[i] = (self.row_scratch[2 * i] + self.row_scratch[2 * i + 1]) * FRAC_1_SQRT_2;
                array[i + half] =
                    (self.row_scratch[2 * i] - self.row_scratch[2 * i + 1]) * FRAC_1_SQRT_2;
            }
            related = half;
        }
    }

    /// Standard (fully recursive) 1D inverse transform, in place.
    pub fn standard_inverse_1d(&mut self, array: &mut [f32], len: usize) {
        assert!(
            len.is_power_of_two(),
            "standard Haar length {} is not a power of two",
            len
        );
        assert!(len <= self.max_len, "len {} exceeds max_len {}", len, self.max_len);
        let mut related = 2;
        while related <= len {
            let half = related / 2;
            self.row_scratch[..related].copy_from_slice(&array[..related]);
            for i in 0..half {
                array[2 * i] = (self.row_scratch[i] + self.row_scratch[i + half]) * FRAC_1_SQRT_2;
                array[2 * i + 1] =
                    (self.row_scratch[i] - self.row_scratch[i + half]) * FRAC_1_SQRT_2;
            }
            related *= 2;
        }
    }

    /// Standard 2D forward transform of a `rows × cols` row-major matrix.
    ///
    /// Every row is fully transformed, then every column. Both dimensions
    /// must be powers of two.
    pub fn standard_forward_2d(&mut self, mat: &mut [f32], rows: usize, cols: usize) {
        assert!(rows.is_power_of_two(), "row count {} is not a power of two", rows);
        assert!(cols.is_power_of_two(), "col count {} is not a power of two", cols);
        assert!(rows <= self.max_len && cols <= self.max_len);
        for row in 0..rows {
            let start = row * cols;
            let mut line = mat[start..start + cols].to_vec();
            self.standard_forward_1d(&mut line, cols);
            mat[start..start + cols].copy_from_slice(&line);
        }
        for col in 0..cols {
            for row in 0..rows {
                self.col_scratch[row] = mat[row * cols + col];
            }
            let mut line = self.col_scratch[..rows].to_vec();
            self.standard_forward_1d(&mut line, rows);
            for row in 0..rows {
                mat[row * cols + col] = line[row];
            }
        }
    }

    /// Standard 2D inverse transform of a `rows × cols` row-major matrix.
    pub fn standard_inverse_2d(&mut self, mat: &mut [f32], rows: usize, cols: usize) {
        assert!(rows.is_power_of_two(), "row count {} is not a power of two", rows);
        assert!(cols.is_power_of_two(), "col count {} is not a power of two", cols);
        assert!(rows <= self.max_len && cols <= self.max_len);
        for row in 0..rows {
            let start = row * cols;
            let mut line = mat[start..start + cols].to_vec();
            self.standard_inverse_1d(&mut line, cols);
            mat[start..start + cols].copy_from_slice(&line);
        }
        for col in 0..cols {
            for row in 0..rows {
                self.col_scratch[row] = mat[row * cols + col];
            }
            let mut line = self.col_scratch[..rows].to_vec();
            self.standard_inverse_1d(&mut line, rows);
            for row in 0..rows {
                mat[row * cols + col] = line[row];
            }
        }
    }

    // One forward butterfly over mat[start .. start + len] without borrowing
    // self twice.
    fn forward_1d_range(&mut self, mat: &mut [f32], start: usize, len: usize) {
        let half = len / 2;
        for i in 0..half {
            let a = mat[start + 2 * i];
            let b = mat[start + 2 * i + 1];
            self.row_scratch[i] = (a + b) * FRAC_1_SQRT_2;
            self.row_scratch[i + half] = (a - b) * FRAC_1_SQRT_2;
        }
        mat[start..start + len].copy_from_slice(&self.row_scratch[..len]);
    }

    fn inverse_1d_range(&mut self, mat: &mut [f32], start: usize, len: usize) {
        let half = len / 2;
        for i in 0..half {
            let a = mat[start + i];
            let b = mat[start + i + half];
            self.row_scratch[2 * i] = (a + b) * FRAC_1_SQRT_2;
            self.row_scratch[2 * i + 1] = (a - b) * FRAC_1_SQRT_2;
        }
        mat[start..start + len].copy_from_slice(&self.row_scratch[..len]);
    }
}

/// Keep the `keep_n` largest-magnitude coefficients of `mat`, zero the rest.
///
/// Sorts a copy of the coefficients by absolute value (`O(n log n)`) to find
/// the cut-off magnitude, then scans in index order recording `(index, value)`
/// for every survivor. Coefficients tied with the `keep_n`-th magnitude are
/// all kept, so the output may exceed `keep_n` entries when duplicates occur;
/// this is documented behavior, not corrected.
pub fn keep_largest_n(mat: &mut [f32], keep_n: usize) -> Vec<(usize, f32)> {
    if keep_n == 0 {
        mat.fill(0.0);
        return Vec::new();
    }
    if keep_n >= mat.len() {
        return mat.iter().copied().enumerate().collect();
    }

    let mut sorted: Vec<f32> = mat.to_vec();
    sorted.sort_by(|a, b| b.abs().total_cmp(&a.abs()));
    let cutoff = sorted[keep_n - 1].abs();

    let mut kept = Vec::with_capacity(keep_n);
    for (i, value) in mat.iter_mut().enumerate() {
        if value.abs() >= cutoff {
            kept.push((i, *value));
        } else {
            *value = 0.0;
        }
    }
    kept
}
