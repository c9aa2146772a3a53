//! # ALICE-PRT
//!
//! **A.L.I.C.E. - Adaptive Lightweight Integral Compression Engine (PRT)**
//!
//! Compresses dense per-texel radiance/BRDF signals into sparse,
//! perceptually-thresholded quadtrees of orthonormal Haar wavelet
//! coefficients, and evaluates triple-product light-transport integrals
//! between two compressed signals without reconstructing either one.
//!
//! ## Features
//!
//! - **Decomposition**: breadth-first quadtree cell grid per square signal
//! - **Compression**: post-order Haar coefficient build with perceptual
//!   threshold pruning
//! - **Serialization**: stride-16 flat arrays traversable without pointers
//!   (GPU buffers, persisted containers)
//! - **Convolution**: compressed-domain inner products in time proportional
//!   to the sparse trees, not the texel count
//! - **Batching**: rayon fan-out over independent sample points
//! - **File I/O**: binary `.aprt` containers with CRC32 integrity
//!
//! ## Example
//!
//! ```rust
//! use alice_prt::prelude::*;
//!
//! // A 4x4 capture with a bright left half
//! let texels = (0..16)
//!     .map(|i| if i % 4 < 2 { Vec3::ONE } else { Vec3::ZERO })
//!     .collect();
//! let map = RadianceMap::from_texels(texels, 4).unwrap();
//!
//! // Compress to a sparse tree, flattened for storage or GPU upload
//! let baked = bake_tree(&map, 0.05).unwrap();
//!
//! // Triple-product integral directly in the compressed domain
//! let product = convolve_flat(&baked.flat, &baked.flat);
//! let ground_truth = map.texel_product(&map);
//! assert!((product - ground_truth).abs().max_element() < 1e-3);
//! ```
//!
//! ## Author
//!
//! Moroya Sakamoto

#![warn(missing_docs)]

pub mod bake;
pub mod convolve;
pub mod haar;
pub mod io;
pub mod quadtree;
pub mod types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::bake::{bake_batch, bake_tree, BakeStats, BakedSignal};
    pub use crate::convolve::{
        convolve, convolve_flat, convolve_flat_bounded, ConvolveError, TreeView,
        DEFAULT_QUEUE_CAPACITY,
    };
    pub use crate::haar::{keep_largest_n, HaarTransform};
    pub use crate::io::{load_aprt, save_aprt, IoError, SignalSet};
    pub use crate::quadtree::{
        build_cell_grid, build_tree, decode_tree, flatten_tree, perceived_brightness, Cell,
        CellGrid, CoefficientNode, FlatTree, TreeError, NODE_STRIDE, QUADRANTS,
    };
    pub use crate::types::RadianceMap;
    pub use glam::Vec3;
}

// Re-exports for convenience
pub use bake::{bake_batch, bake_tree};
pub use convolve::{convolve, convolve_flat};
pub use quadtree::{build_cell_grid, build_tree, flatten_tree};
pub use types::RadianceMap;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_basic_workflow() {
        // Capture a small signal with visible structure
        let texels = (0..64)
            .map(|i| Vec3::new((i % 8) as f32 * 0.1, (i / 8) as f32 * 0.1, 0.5))
            .collect();
        let map = RadianceMap::from_texels(texels, 8).unwrap();

        // Lossless build round-trips through decode
        let mut grid = build_cell_grid(&map);
        let root = build_tree(&mut grid, 0.0).unwrap();
        let decoded = decode_tree(&root, &grid, grid.max_level);
        for (a, b) in map.texels().iter().zip(decoded.texels()) {
            assert!((*a - *b).abs().max_element() < 1e-4);
        }

        // Flat serialization and compressed-domain product agree with
        // brute force
        let flat = flatten_tree(&root);
        assert_eq!(flat.node_count(), root.node_count());
        let product = convolve_flat(&flat, &flat);
        let expected = map.texel_product(&map);
        assert!((product - expected).abs().max_element() < 1e-3);
    }

    #[test]
    fn test_pruned_workflow_stays_close() {
        let texels = (0..256)
            .map(|i| {
                let x = i % 16;
                let y = i / 16;
                Vec3::new(
                    (x as f32 * 0.4).sin().abs(),
                    (y as f32 * 0.25).cos().abs(),
                    0.2,
                )
            })
            .collect();
        let map = RadianceMap::from_texels(texels, 16).unwrap();

        let dense = bake_tree(&map, 0.0).unwrap();
        let pruned = bake_tree(&map, 0.02).unwrap();
        assert!(pruned.stats.node_count <= dense.stats.node_count);

        // Pruning only ever drops coefficient energy, and only below the
        // perceptual threshold, so the self-product moves mildly
        let exact = convolve_flat(&dense.flat, &dense.flat);
        let approx = convolve_flat(&pruned.flat, &pruned.flat);
        let relative = (exact - approx).abs().max_element() / exact.max_element().max(1e-6);
        assert!(relative < 0.1, "relative error {}", relative);
    }
}
