//! Tree decoding: sparse coefficient tree → dense image
//!
//! The inverse of the build pass, used by round-trip tests and debug dumps.
//! Each node's four quadrant averages are recovered with the one-level
//! inverse butterfly; pruned quadrants paint their constant average over the
//! whole region. Averages are wavelet-scaled, so texel values are recovered
//! by multiplying with `0.5^(max_level - level)`.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use super::build::quad_butterfly_inverse;
use super::{CellGrid, CoefficientNode};
use crate::types::RadianceMap;

/// Decode a coefficient tree back into a dense radiance map.
///
/// Descends at most `levels` levels below `root` (clamped to the grid's
/// depth); regions that stop resolving — pruned during the build or cut off
/// by `levels` — are filled with their constant average. With
/// `levels == grid.max_level` and a threshold-0 tree this reproduces the
/// original input within floating-point tolerance.
pub fn decode_tree(root: &CoefficientNode, grid: &CellGrid, levels: u32) -> RadianceMap {
    let resolution = grid.resolution;
    let mut texels = vec![Vec3::ZERO; resolution * resolution];

    let cell = &grid.cells[root.cell_index as usize];
    decode_node(
        root,
        &mut texels,
        resolution,
        grid.max_level,
        levels.min(grid.max_level),
        cell.image_offset,
        cell.side as usize,
        cell.level,
    );
    RadianceMap::from_raw(texels, resolution)
}

#[allow(clippy::too_many_arguments)]
fn decode_node(
    node: &CoefficientNode,
    texels: &mut [Vec3],
    resolution: usize,
    max_level: u32,
    remaining: u32,
    image_offset: usize,
    side: usize,
    level: u32,
) {
    if remaining == 0 {
        fill_square(
            texels,
            resolution,
            image_offset,
            side,
            node.average * texel_scale(max_level, level),
        );
        return;
    }

    let quadrant_averages = quad_butterfly_inverse(node.average, node.coeffs);
    let child_side = side / 2;
    let child_level = level + 1;

    for (q, &(row, col)) in super::QUADRANTS.iter().enumerate() {
        let child_offset = image_offset + resolution * row * child_side + col * child_side;
        match &node.children[q] {
            Some(child) => decode_node(
                child,
                texels,
                resolution,
                max_level,
                remaining - 1,
                child_offset,
                child_side,
                child_level,
            ),
            None => fill_square(
                texels,
                resolution,
                child_offset,
                child_side,
                quadrant_averages[q] * texel_scale(max_level, child_level),
            ),
        }
    }
}

#[inline]
fn texel_scale(max_level: u32, level: u32) -> f32 {
    0.5f32.powi((max_level - level) as i32)
}

fn fill_square(texels: &mut [Vec3], resolution: usize, offset: usize, side: usize, value: Vec3) {
    for y in 0..side {
        let row = offset + y * resolution;
        texels[row..row + side].fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::{build_cell_grid, build_tree};

    fn assert_maps_close(a: &RadianceMap, b: &RadianceMap, tol: f32) {
        assert_eq!(a.resolution(), b.resolution());
        for (i, (x, y)) in a.texels().iter().zip(b.texels().iter()).enumerate() {
            assert!(
                (*x - *y).abs().max_element() < tol,
                "texel {}: {:?} vs {:?}",
                i, x, y
            );
        }
    }

    #[test]
    fn test_lossless_round_trip() {
        let texels = (0..64)
            .map(|i| Vec3::new((i % 8) as f32 * 0.1, (i / 8) as f32 * 0.1, (i % 3) as f32))
            .collect();
        let image = RadianceMap::from_texels(texels, 8).unwrap();
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, 0.0).unwrap();
        let decoded = decode_tree(&root, &grid, grid.max_level);
        assert_maps_close(&decoded, &image, 1e-4);
    }

    #[test]
    fn test_uniform_round_trip_after_collapse() {
        let color = Vec3::new(0.2, 0.4, 0.8);
        let image = RadianceMap::uniform(16, color).unwrap();
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, 0.05).unwrap();
        assert_eq!(root.node_count(), 1);
        let decoded = decode_tree(&root, &grid, grid.max_level);
        assert_maps_close(&decoded, &image, 1e-4);
    }

    #[test]
    fn test_zero_levels_paints_scaled_root_average() {
        let image = RadianceMap::uniform(4, Vec3::ONE).unwrap();
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, 0.0).unwrap();
        let decoded = decode_tree(&root, &grid, 0);
        // Root average 4.0 scaled by 0.5^2 = texel value 1.0
        assert_maps_close(&decoded, &image, 1e-5);
    }

    #[test]
    fn test_partial_depth_averages_blocks() {
        // 2x2 blocks of distinct colors at full depth; decoding one level
        // short reproduces per-block averages
        let texels = (0..16)
            .map(|i| {
                let block = (i % 4) / 2 + 2 * ((i / 4) / 2);
                Vec3::splat(block as f32)
            })
            .collect();
        let image = RadianceMap::from_texels(texels, 4).unwrap();
        let mut grid = build_cell_grid(&image);
        let root = build_tree(&mut grid, 0.0).unwrap();
        let decoded = decode_tree(&root, &grid, 1);
        assert_maps_close(&decoded, &image, 1e-4);
    }
}
