//! Quadtree cell decomposition and sparse Haar coefficient trees
//!
//! The compression pipeline in this module turns a dense [`RadianceMap`]
//! into a sparse, perceptually-thresholded wavelet tree:
//!
//! 1. [`build_cell_grid`]: breadth-first quadtree cell list (spatial addressing)
//! 2. [`build_tree`]: post-order Haar coefficient pass with threshold pruning
//! 3. [`flatten_tree`]: breadth-first flat array for pointer-free traversal
//! 4. [`decode_tree`]: inverse walk back to a dense image (round-trip / debug)
//!
//! Cell averages carry the orthonormal wavelet scaling: a cell at `level`
//! stores `(sum of its texels) / 2^(max_level - level)`, which is what makes
//! the compressed-domain convolution exact. Decoding multiplies back by
//! `0.5^(max_level - level)`.
//!
//! Author: Moroya Sakamoto

pub mod build;
pub mod decode;
pub mod decompose;
pub mod flatten;

use glam::Vec3;
use thiserror::Error;

use crate::types::RadianceMap;

pub use build::{build_tree, CoefficientNode};
pub use decode::decode_tree;
pub use decompose::build_cell_grid;
pub use flatten::{flatten_tree, FlatTree, NODE_STRIDE};

/// Child quadrant offsets in `(row, col)` order: TL, TR, BL, BR.
///
/// This ordering is load-bearing: the wavelet butterfly, the serializer's
/// child slots and the convolver's quadrant walk all assume it.
pub const QUADRANTS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Luma-weighted magnitude of an RGB coefficient.
///
/// `0.2126·|r| + 0.7152·|g| + 0.0722·|b|` — the perceptual measure the
/// pruning threshold is compared against.
#[inline]
pub fn perceived_brightness(c: Vec3) -> f32 {
    0.2126 * c.x.abs() + 0.7152 * c.y.abs() + 0.0722 * c.z.abs()
}

/// Errors from quadtree decomposition and wavelet tree construction.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Side length is not a power of two.
    #[error("side length {len} is not a power of two")]
    NotPowerOfTwo {
        /// The rejected side length.
        len: usize,
    },

    /// Texel buffer does not match the declared resolution.
    #[error("texel buffer holds {actual} texels, expected {expected} for resolution {resolution}")]
    SizeMismatch {
        /// Expected texel count (`resolution²`).
        expected: usize,
        /// Actual texel count supplied.
        actual: usize,
        /// Declared side length.
        resolution: usize,
    },

    /// Discard threshold is negative or non-finite.
    #[error("discard threshold {value} must be finite and non-negative")]
    InvalidThreshold {
        /// The rejected threshold.
        value: f32,
    },

    /// The signal has no interior cells to carry coefficients (1×1 image).
    #[error("resolution {resolution} is too small to build a coefficient tree")]
    DegenerateResolution {
        /// The rejected side length.
        resolution: usize,
    },

    /// A flat buffer is not a whole number of 16-float node records.
    #[error("flat tree length {len} is not a multiple of the node stride {stride}")]
    MalformedFlatTree {
        /// Buffer length in floats.
        len: usize,
        /// Required stride.
        stride: usize,
    },
}

/// One quadtree cell: a square sub-region of the source image.
///
/// Leaf cells (`side == 1`) receive their color at decomposition time;
/// interior cells acquire their average during the wavelet build.
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    /// Average color of the region (wavelet-scaled, see module docs).
    pub color: Vec3,
    /// Depth in the tree; 0 is the root covering the whole image.
    pub level: u32,
    /// Side length in texels; a power of two.
    pub side: u32,
    /// Linear offset of the top-left texel in the source image.
    pub image_offset: usize,
    /// True unless `side == 1`.
    pub is_interior: bool,
    /// Index of the parent cell, `None` for the root.
    pub parent: Option<u32>,
    /// Index of the first of four contiguous children, `None` for leaves.
    pub first_child: Option<u32>,
}

/// Flat breadth-first cell list for one signal.
///
/// Index into `cells` is a cell's global identity. Levels are contiguous and
/// non-decreasing with index; `level_first_index[level]` marks where each
/// level begins.
#[derive(Debug, Clone)]
pub struct CellGrid {
    /// All cells, root first, breadth-first.
    pub cells: Vec<Cell>,
    /// Global index of the first cell at each level.
    pub level_first_index: Vec<u32>,
    /// Side length of the source image.
    pub resolution: usize,
    /// Deepest level (`log2(resolution)`).
    pub max_level: u32,
}

impl CellGrid {
    /// The root cell.
    #[inline]
    pub fn root(&self) -> &Cell {
        &self.cells[0]
    }

    /// Total cell count.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the grid holds no cells (never after a successful build).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The four children of an interior cell, in quadrant order.
    pub fn children_of(&self, index: u32) -> Option<[u32; 4]> {
        let first = self.cells[index as usize].first_child?;
        Some([first, first + 1, first + 2, first + 3])
    }

    /// Number of interior cells (the maximum possible coefficient node count).
    pub fn interior_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_interior).count()
    }

    /// Collect the leaf cell indices at or below `index`, breadth-first.
    pub fn leaf_cells_under(&self, index: u32) -> Vec<u32> {
        let mut leaves = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(index);
        while let Some(i) = queue.pop_front() {
            match self.children_of(i) {
                Some(children) => queue.extend(children),
                None => leaves.push(i),
            }
        }
        leaves
    }

    /// Paint every cell of one level over its square region.
    ///
    /// Debug export of the quadtree's view of the image at a fixed depth.
    /// Interior cell colors only exist after [`build_tree`] has run; calling
    /// this earlier paints unbuilt levels black.
    pub fn level_image(&self, level: u32) -> RadianceMap {
        let mut texels = vec![Vec3::ZERO; self.resolution * self.resolution];
        let start = self.level_first_index[level as usize] as usize;
        let end = self
            .level_first_index
            .get(level as usize + 1)
            .map(|&i| i as usize)
            .unwrap_or(self.cells.len());
        for cell in &self.cells[start..end] {
            let side = cell.side as usize;
            for y in 0..side {
                for x in 0..side {
                    texels[cell.image_offset + y * self.resolution + x] = cell.color;
                }
            }
        }
        RadianceMap::from_raw(texels, self.resolution)
    }
}
