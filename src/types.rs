//! Core types for ALICE-PRT
//!
//! Defines the dense radiance signal that feeds the compression pipeline.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use crate::quadtree::TreeError;

/// A dense, square, row-major RGB radiance signal.
///
/// One `RadianceMap` holds the per-texel radiance (or BRDF) samples captured
/// for a single sample point. The side length must be a power of two; this is
/// validated once at construction so every downstream stage can rely on it.
///
/// Texel values are linear RGB stored as [`Vec3`]. NaN/Inf radiance is not
/// defended against and propagates through the pipeline unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceMap {
    texels: Vec<Vec3>,
    resolution: usize,
}

impl RadianceMap {
    /// Create a radiance map from a row-major texel buffer.
    ///
    /// # Errors
    /// - [`TreeError::NotPowerOfTwo`] if `resolution` is not a power of two
    /// - [`TreeError::SizeMismatch`] if `texels.len() != resolution * resolution`
    pub fn from_texels(texels: Vec<Vec3>, resolution: usize) -> Result<Self, TreeError> {
        if !resolution.is_power_of_two() {
            return Err(TreeError::NotPowerOfTwo { len: resolution });
        }
        let expected = resolution * resolution;
        if texels.len() != expected {
            return Err(TreeError::SizeMismatch {
                expected,
                actual: texels.len(),
                resolution,
            });
        }
        Ok(RadianceMap { texels, resolution })
    }

    /// Create a single-color map.
    pub fn uniform(resolution: usize, color: Vec3) -> Result<Self, TreeError> {
        Self::from_texels(vec![color; resolution * resolution], resolution)
    }

    /// Internal constructor for buffers produced by the crate itself.
    pub(crate) fn from_raw(texels: Vec<Vec3>, resolution: usize) -> Self {
        debug_assert!(resolution.is_power_of_two());
        debug_assert_eq!(texels.len(), resolution * resolution);
        RadianceMap { texels, resolution }
    }

    /// Side length of the square signal.
    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Quadtree depth of this signal: `log2(resolution)`.
    ///
    /// 0 for a 1×1 map, 7 for the typical 128×128 capture.
    #[inline]
    pub fn max_level(&self) -> u32 {
        self.resolution.trailing_zeros()
    }

    /// Row-major texel buffer.
    #[inline]
    pub fn texels(&self) -> &[Vec3] {
        &self.texels
    }

    /// Texel at `(x, y)` with `y` indexing rows from the top.
    #[inline]
    pub fn texel(&self, x: usize, y: usize) -> Vec3 {
        self.texels[y * self.resolution + x]
    }

    /// Texel at a linear row-major offset.
    #[inline]
    pub fn texel_at(&self, offset: usize) -> Vec3 {
        self.texels[offset]
    }

    /// Arithmetic mean color of the whole signal.
    pub fn mean(&self) -> Vec3 {
        let sum: Vec3 = self.texels.iter().copied().sum();
        sum / self.texels.len() as f32
    }

    /// Brute-force channelwise inner product `Σ aᵢ * bᵢ` over all texels.
    ///
    /// This is the ground truth the compressed-domain convolution must match.
    /// Both maps must share one resolution.
    pub fn texel_product(&self, other: &RadianceMap) -> Vec3 {
        assert_eq!(
            self.resolution, other.resolution,
            "texel_product requires equal resolutions"
        );
        self.texels
            .iter()
            .zip(other.texels.iter())
            .map(|(a, b)| *a * *b)
            .sum()
    }
}
