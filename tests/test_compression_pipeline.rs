//! Integration tests: decompose → build → flatten → decode pipeline
//!
//! Exercises the compression properties end to end: lossless round-trips,
//! threshold monotonicity, collapse behavior, and serialization determinism.
//!
//! Author: Moroya Sakamoto

mod common;

use alice_prt::prelude::*;
use common::*;

// ============================================================================
// Lossless round-trips
// ============================================================================

#[test]
fn lossless_round_trip_noise() {
    let map = noise_signal(32, 7);
    let mut grid = build_cell_grid(&map);
    let root = build_tree(&mut grid, 0.0).unwrap();
    let decoded = decode_tree(&root, &grid, grid.max_level);
    assert_maps_close(&decoded, &map, 1e-3, "threshold-0 round trip");
}

#[test]
fn lossless_round_trip_gradient_128() {
    let map = gradient_signal(128);
    let mut grid = build_cell_grid(&map);
    let root = build_tree(&mut grid, 0.0).unwrap();
    let decoded = decode_tree(&root, &grid, grid.max_level);
    assert_maps_close(&decoded, &map, 1e-2, "128x128 threshold-0 round trip");
}

// ============================================================================
// Sparsity behavior
// ============================================================================

#[test]
fn node_count_monotonic_in_threshold() {
    let map = noise_signal(32, 42);
    let mut previous = usize::MAX;
    for threshold in [0.0, 0.01, 0.05, 0.2, 1.0, 10.0] {
        let baked = bake_tree(&map, threshold).unwrap();
        assert!(
            baked.stats.node_count <= previous,
            "threshold {} grew the tree: {} > {}",
            threshold,
            baked.stats.node_count,
            previous
        );
        previous = baked.stats.node_count;
    }
}

#[test]
fn infinite_threshold_collapses_to_single_root() {
    let map = noise_signal(64, 3);
    let baked = bake_tree(&map, f32::INFINITY).unwrap();
    assert_eq!(baked.stats.node_count, 1);

    // The lone root still carries the wavelet-scaled whole-image average:
    // texel sum / 2^max_level
    let sum: Vec3 = map.texels().iter().copied().sum();
    let expected = sum / 2f32.powi(map.max_level() as i32);
    assert_color_close(baked.flat.average(0), expected, 1e-2, "collapsed root average");
}

#[test]
fn uniform_128_compresses_to_one_node() {
    let color = Vec3::new(0.4, 0.7, 0.1);
    let map = uniform_signal(128, color);
    let baked = bake_tree(&map, 0.01).unwrap();
    assert_eq!(baked.stats.node_count, 1);
    for k in 0..3 {
        assert_color_close(
            baked.flat.coeff(0, k),
            Vec3::ZERO,
            1e-3,
            "uniform signal detail coefficients",
        );
    }
}

#[test]
fn checkerboard_4x4_builds_full_tree() {
    let map = checkerboard_signal(4);
    let baked = bake_tree(&map, 0.0).unwrap();
    // 1 root + 4 level-1 nodes; level-2 cells are leaves and carry no nodes
    assert_eq!(baked.stats.node_count, 5);
    assert_eq!(baked.stats.dense_node_count, 5);
}

// ============================================================================
// Serialization determinism
// ============================================================================

#[test]
fn flatten_twice_is_identical() {
    let map = noise_signal(32, 11);
    let mut grid = build_cell_grid(&map);
    let root = build_tree(&mut grid, 0.02).unwrap();
    let first = flatten_tree(&root);
    let second = flatten_tree(&root);
    assert_eq!(first, second);
    assert_eq!(first.as_floats(), second.as_floats());
}

#[test]
fn rebuild_from_same_input_is_identical() {
    let map = noise_signal(16, 99);
    let a = bake_tree(&map, 0.03).unwrap();
    let b = bake_tree(&map, 0.03).unwrap();
    assert_eq!(a.flat, b.flat);
}

// ============================================================================
// Batch baking
// ============================================================================

#[test]
fn batch_bake_preserves_order_and_content() {
    let maps: Vec<RadianceMap> = (0..8).map(|i| noise_signal(16, 1000 + i)).collect();
    let batch = bake_batch(&maps, 0.05).unwrap();
    assert_eq!(batch.len(), maps.len());
    for (map, baked) in maps.iter().zip(&batch) {
        let single = bake_tree(map, 0.05).unwrap();
        assert_eq!(baked.flat, single.flat, "parallel bake must match serial");
    }
}

#[test]
fn batch_bake_rejects_bad_threshold() {
    let maps = vec![noise_signal(8, 1)];
    assert!(matches!(
        bake_batch(&maps, -0.1),
        Err(TreeError::InvalidThreshold { .. })
    ));
}

// ============================================================================
// Debug exports
// ============================================================================

#[test]
fn level_image_paints_averages_after_build() {
    let map = checkerboard_signal(8);
    let mut grid = build_cell_grid(&map);
    build_tree(&mut grid, 0.0).unwrap();

    // Deepest level is the raw image
    let leaves = grid.level_image(grid.max_level);
    assert_maps_close(&leaves, &map, 1e-6, "leaf level image");

    // Level 0 is the root's scaled average everywhere
    let top = grid.level_image(0);
    let root_color = top.texel(0, 0);
    for &texel in top.texels() {
        assert_eq!(texel, root_color);
    }
}

#[test]
fn leaf_enumeration_covers_image() {
    let map = gradient_signal(8);
    let grid = build_cell_grid(&map);
    let leaves = grid.leaf_cells_under(0);
    assert_eq!(leaves.len(), 64);
}
