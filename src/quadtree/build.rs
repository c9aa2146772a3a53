//! Sparse wavelet tree construction with perceptual pruning
//!
//! Post-order pass over the cell grid: each interior cell applies one 2D Haar
//! butterfly level to its four child averages, stores its own average back
//! into the grid, and keeps a [`CoefficientNode`] only where the detail is
//! visible. A fully flat subtree produces no node at all; the parent's
//! average represents it implicitly.
//!
//! Author: Moroya Sakamoto

use std::f32::consts::FRAC_1_SQRT_2;

use glam::Vec3;

use super::{perceived_brightness, CellGrid, TreeError};

/// One surviving node of the sparse coefficient tree.
///
/// Carries the cell's wavelet-scaled average and the three Haar detail
/// coefficients of its 2×2 child-average block. An absent child means the
/// quadrant is below the perceptual threshold: constant at this node's
/// derived quadrant average.
#[derive(Debug, Clone)]
pub struct CoefficientNode {
    /// Detail coefficients in order: vertical, horizontal, diagonal.
    pub coeffs: [Vec3; 3],
    /// Wavelet-scaled average of the cell this node describes.
    pub average: Vec3,
    /// Owned children in quadrant order TL, TR, BL, BR.
    pub children: [Option<Box<CoefficientNode>>; 4],
    /// Back-reference to the originating cell, for diagnostics only.
    pub cell_index: u32,
}

impl CoefficientNode {
    /// True when no quadrant resolves further.
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }

    /// Number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.node_count())
            .sum::<usize>()
    }

    /// Depth of this subtree; 1 for a childless node.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }
}

/// One 2D Haar butterfly level over four quadrant averages (TL, TR, BL, BR).
///
/// Returns the parent average and the three detail coefficients
/// (vertical, horizontal, diagonal).
#[inline]
pub(crate) fn quad_butterfly(c: [Vec3; 4]) -> (Vec3, [Vec3; 3]) {
    let a1 = (c[0] + c[1]) * FRAC_1_SQRT_2;
    let d1 = (c[0] - c[1]) * FRAC_1_SQRT_2;
    let a2 = (c[2] + c[3]) * FRAC_1_SQRT_2;
    let d2 = (c[2] - c[3]) * FRAC_1_SQRT_2;

    let average = (a1 + a2) * FRAC_1_SQRT_2;
    let vertical = (a1 - a2) * FRAC_1_SQRT_2;
    let horizontal = (d1 + d2) * FRAC_1_SQRT_2;
    let diagonal = (d1 - d2) * FRAC_1_SQRT_2;
    (average, [vertical, horizontal, diagonal])
}

/// Invert one butterfly level: recover the four quadrant averages (TL, TR,
/// BL, BR) from a node's average and detail coefficients.
#[inline]
pub(crate) fn quad_butterfly_inverse(average: Vec3, coeffs: [Vec3; 3]) -> [Vec3; 4] {
    let a1 = (average + coeffs[0]) * FRAC_1_SQRT_2;
    let a2 = (average - coeffs[0]) * FRAC_1_SQRT_2;
    let d1 = (coeffs[1] + coeffs[2]) * FRAC_1_SQRT_2;
    let d2 = (coeffs[1] - coeffs[2]) * FRAC_1_SQRT_2;
    [
        (a1 + d1) * FRAC_1_SQRT_2,
        (a1 - d1) * FRAC_1_SQRT_2,
        (a2 + d2) * FRAC_1_SQRT_2,
        (a2 - d2) * FRAC_1_SQRT_2,
    ]
}

/// Build the sparse coefficient tree for a decomposed signal.
///
/// Walks the grid post-order from the root, pruning every subtree whose three
/// detail coefficients all fall below `discard_threshold` in perceived
/// brightness and whose four children were themselves pruned. Interior cell
/// averages are written back into `grid` as a side effect (they are needed by
/// [`super::decode_tree`] and the level-image debug export).
///
/// A threshold of `0.0` prunes nothing and yields the fully dense tree.
///
/// If the root itself would be pruned, its coefficients are recomputed with a
/// zero threshold and a childless root node is returned, so every valid
/// signal compresses to at least one node.
///
/// # Errors
/// - [`TreeError::InvalidThreshold`] for a negative or NaN threshold
///   (`f32::INFINITY` is legal and collapses the signal to a single root)
/// - [`TreeError::DegenerateResolution`] for a 1×1 signal (no interior cells)
pub fn build_tree(grid: &mut CellGrid, discard_threshold: f32) -> Result<CoefficientNode, TreeError> {
    // NaN and anything below zero (including -inf) are rejected; +inf is a
    // legal "collapse everything" threshold.
    if discard_threshold.is_nan() || discard_threshold < 0.0 {
        return Err(TreeError::InvalidThreshold {
            value: discard_threshold,
        });
    }
    if !grid.root().is_interior {
        return Err(TreeError::DegenerateResolution {
            resolution: grid.resolution,
        });
    }

    match process_cell(grid, 0, discard_threshold) {
        Some(root) => Ok(*root),
        None => {
            // Root collapsed entirely. Recompute its own coefficients with a
            // zero threshold from the (already averaged) child cells and
            // return a childless root, so downstream convolution always has a
            // node pair to start from.
            let children = grid
                .children_of(0)
                .map(|c| c.map(|i| grid.cells[i as usize].color))
                .unwrap_or([Vec3::ZERO; 4]);
            let (average, coeffs) = quad_butterfly(children);
            grid.cells[0].color = average;
            Ok(CoefficientNode {
                coeffs,
                average,
                children: [None, None, None, None],
                cell_index: 0,
            })
        }
    }
}

/// Post-order recursion over one cell. Leaves never produce nodes; their
/// averages are read straight from the grid by the parent.
fn process_cell(
    grid: &mut CellGrid,
    index: u32,
    discard: f32,
) -> Option<Box<CoefficientNode>> {
    let Some(child_indices) = grid.children_of(index) else {
        return None;
    };

    let children = [
        process_cell(grid, child_indices[0], discard),
        process_cell(grid, child_indices[1], discard),
        process_cell(grid, child_indices[2], discard),
        process_cell(grid, child_indices[3], discard),
    ];

    let child_colors = child_indices.map(|i| grid.cells[i as usize].color);
    let (average, coeffs) = quad_butterfly(child_colors);
    grid.cells[index as usize].color = average;

    let below_threshold = coeffs
        .iter()
        .all(|&c| perceived_brightness(c) < discard);
    if below_threshold && children.iter().all(|c| c.is_none()) {
        return None;
    }

    Some(Box::new(CoefficientNode {
        coeffs,
        average,
        children,
        cell_index: index,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::build_cell_grid;
    use crate::types::RadianceMap;

    fn checkerboard(resolution: usize) -> RadianceMap {
        let texels = (0..resolution * resolution)
            .map(|i| {
                let x = i % resolution;
                let y = i / resolution;
                if (x + y) % 2 == 0 {
                    Vec3::new(1.0, 0.0, 0.0)
                } else {
                    Vec3::new(0.0, 1.0, 0.0)
                }
            })
            .collect();
        RadianceMap::from_texels(texels, resolution).unwrap()
    }

    #[test]
    fn test_quad_butterfly_uniform_block() {
        let (avg, coeffs) = quad_butterfly([Vec3::ONE; 4]);
        // (1+1)/sqrt2 summed and halved again: average is 2.0, details vanish
        assert!((avg - Vec3::splat(2.0)).abs().max_element() < 1e-6);
        for c in coeffs {
            assert!(c.abs().max_element() < 1e-6);
        }
    }

    #[test]
    fn test_quad_butterfly_matches_inverse() {
        let block = [
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(0.0, 2.0, 1.0),
            Vec3::new(3.0, 0.0, 0.5),
            Vec3::new(0.25, 1.0, 4.0),
        ];
        let (avg, coeffs) = quad_butterfly(block);
        let s = FRAC_1_SQRT_2;
        let a1 = (avg + coeffs[0]) * s;
        let a2 = (avg - coeffs[0]) * s;
        let d1 = (coeffs[1] + coeffs[2]) * s;
        let d2 = (coeffs[1] - coeffs[2]) * s;
        let rebuilt = [
            (a1 + d1) * s,
            (a1 - d1) * s,
            (a2 + d2) * s,
            (a2 - d2) * s,
        ];
        for (original, back) in block.iter().zip(rebuilt) {
            assert!((*original - back).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn test_zero_threshold_builds_dense_tree() {
        let image = checkerboard(4);
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, 0.0).unwrap();
        // Every interior cell survives: 1 root + 4 at level 1
        assert_eq!(root.node_count(), grid.interior_count());
        assert_eq!(root.node_count(), 5);
    }

    #[test]
    fn test_uniform_image_collapses_to_root() {
        let image = RadianceMap::uniform(16, Vec3::new(0.3, 0.6, 0.9)).unwrap();
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, 0.01).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.node_count(), 1);
        for c in root.coeffs {
            assert!(c.abs().max_element() < 1e-5);
        }
        // Wavelet-scaled average: texel sum / 2^max_level = 16 * color
        let expected = Vec3::new(0.3, 0.6, 0.9) * 16.0;
        assert!((root.average - expected).abs().max_element() < 1e-3);
    }

    #[test]
    fn test_infinite_threshold_forces_single_root() {
        let image = checkerboard(8);
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, f32::INFINITY).unwrap();
        assert_eq!(root.node_count(), 1);
        // The forced root still carries its true coefficients
        let sum: Vec3 = image.texels().iter().copied().sum();
        let expected_avg = sum / 2f32.powi(image.max_level() as i32);
        assert!((root.average - expected_avg).abs().max_element() < 1e-3);
    }

    #[test]
    fn test_monotonic_sparsity() {
        let texels = (0..64)
            .map(|i| Vec3::new((i % 7) as f32 * 0.2, (i % 5) as f32 * 0.25, (i % 3) as f32 * 0.4))
            .collect();
        let image = RadianceMap::from_texels(texels, 8).unwrap();
        let mut previous = usize::MAX;
        for threshold in [0.0, 0.05, 0.2, 0.8, 3.0] {
            let mut grid = build_cell_grid(&image);
            let root = build_tree(&mut grid, threshold).unwrap();
            let count = root.node_count();
            assert!(
                count <= previous,
                "node count {} grew at threshold {}",
                count,
                threshold
            );
            previous = count;
        }
    }

    #[test]
    fn test_interior_averages_written_back() {
        let image = checkerboard(4);
        let mut grid = build_cell_grid(&image);
        build_tree(&mut grid, 0.0).unwrap();
        // Root average for a 4x4 signal: texel sum / 2^2
        let sum: Vec3 = image.texels().iter().copied().sum();
        let expected = sum / 4.0;
        assert!((grid.root().color - expected).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let image = checkerboard(4);
        let mut grid = build_cell_grid(&image);
        let err = build_tree(&mut grid, -0.5).unwrap_err();
        assert!(matches!(err, TreeError::InvalidThreshold { .. }));
    }

    #[test]
    fn test_rejects_nan_threshold() {
        let image = checkerboard(4);
        let mut grid = build_cell_grid(&image);
        let err = build_tree(&mut grid, f32::NAN).unwrap_err();
        assert!(matches!(err, TreeError::InvalidThreshold { .. }));
    }

    #[test]
    fn test_rejects_single_texel_signal() {
        let image = RadianceMap::uniform(1, Vec3::ONE).unwrap();
        let mut grid = build_cell_grid(&image);
        let err = build_tree(&mut grid, 0.0).unwrap_err();
        assert!(matches!(err, TreeError::DegenerateResolution { resolution: 1 }));
    }

    #[test]
    fn test_deterministic_rebuild() {
        let image = checkerboard(8);
        let mut grid_a = build_cell_grid(&image);
        let mut grid_b = build_cell_grid(&image);
        let root_a = build_tree(&mut grid_a, 0.1).unwrap();
        let root_b = build_tree(&mut grid_b, 0.1).unwrap();
        assert_eq!(root_a.node_count(), root_b.node_count());
        assert_eq!(root_a.average, root_b.average);
        assert_eq!(root_a.coeffs, root_b.coeffs);
    }
}
