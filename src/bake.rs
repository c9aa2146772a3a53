//! Signal baking: dense radiance map → sparse flat coefficient tree
//!
//! One bake covers one sample point: decompose the captured map into its
//! cell grid, build the pruned wavelet tree, flatten it for storage or GPU
//! upload. Batches of sample points are embarrassingly parallel — each bake
//! owns all of its state, so the batch entry point simply fans out with
//! rayon and joins.
//!
//! Author: Moroya Sakamoto

use rayon::prelude::*;

use crate::quadtree::{build_cell_grid, build_tree, flatten_tree, FlatTree, TreeError};
use crate::types::RadianceMap;

/// Size statistics for one baked signal.
#[derive(Debug, Clone, Copy)]
pub struct BakeStats {
    /// Nodes surviving the perceptual threshold.
    pub node_count: usize,
    /// Interior cell count of the source grid (the dense-tree node count).
    pub dense_node_count: usize,
}

impl BakeStats {
    /// Surviving fraction of the dense tree, in `(0, 1]`.
    pub fn compression_ratio(&self) -> f32 {
        self.node_count as f32 / self.dense_node_count as f32
    }
}

/// One compressed sample point: the flat tree plus bookkeeping.
#[derive(Debug, Clone)]
pub struct BakedSignal {
    /// Stride-16 serialized coefficient tree.
    pub flat: FlatTree,
    /// Side length of the source signal.
    pub resolution: usize,
    /// Sparsity statistics.
    pub stats: BakeStats,
}

/// Compress one radiance map end to end.
///
/// # Errors
/// Propagates [`TreeError`] from threshold validation and degenerate
/// resolutions; a successfully captured power-of-two map of side ≥ 2 cannot
/// fail.
pub fn bake_tree(map: &RadianceMap, discard_threshold: f32) -> Result<BakedSignal, TreeError> {
    let mut grid = build_cell_grid(map);
    let root = build_tree(&mut grid, discard_threshold)?;
    let flat = flatten_tree(&root);

    let stats = BakeStats {
        node_count: flat.node_count(),
        dense_node_count: grid.interior_count(),
    };
    log::debug!(
        "baked {}x{} signal at threshold {}: {} / {} nodes ({:.2}%)",
        map.resolution(),
        map.resolution(),
        discard_threshold,
        stats.node_count,
        stats.dense_node_count,
        stats.compression_ratio() * 100.0
    );

    Ok(BakedSignal {
        flat,
        resolution: map.resolution(),
        stats,
    })
}

/// Compress a batch of sample points in parallel.
///
/// Fork-join over rayon's pool; bakes share nothing, and the first error
/// (if any) aborts the batch. Output order matches input order.
pub fn bake_batch(
    maps: &[RadianceMap],
    discard_threshold: f32,
) -> Result<Vec<BakedSignal>, TreeError> {
    maps.par_iter()
        .map(|map| bake_tree(map, discard_threshold))
        .collect()
}
